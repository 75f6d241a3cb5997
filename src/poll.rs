use log::{debug, info, warn};

use ranked_tally::*;
use snafu::{prelude::*, Snafu};

use std::fs;
use std::path::{Path, PathBuf};

use serde_json::json;
use serde_json::Map as JSMap;
use serde_json::Value as JSValue;
use text_diff::print_diff;

use crate::poll::config_reader::*;

pub mod config_reader;
mod io_common;
mod io_csv;
mod io_json;
mod io_xlsx;

#[derive(Debug, Snafu)]
pub enum PollError {
    #[snafu(display("Error opening file {path}"))]
    OpeningExcel {
        source: calamine::XlsxError,
        path: String,
    },
    #[snafu(display("The workbook has no worksheet with this name"))]
    EmptyExcel {},
    #[snafu(display("Error opening file {path}"))]
    OpeningJson {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Error parsing JSON: {source}"))]
    ParsingJson { source: serde_json::Error },
    #[snafu(display("Expected a 1-based index (number or column letters)"))]
    ParsingJsonNumber {},
    #[snafu(display("Error opening file {path}"))]
    CsvOpen { source: csv::Error, path: String },
    #[snafu(display("Line {lineno}: could not read the row"))]
    CsvLineParse { source: csv::Error, lineno: usize },
    #[snafu(display("Line {lineno}: the row is too short"))]
    RowTooShort { lineno: usize },
    #[snafu(display("The configuration file has no parent directory"))]
    MissingParentDir {},
    #[snafu(display("Error writing the summary to {path}"))]
    WritingSummary {
        source: std::io::Error,
        path: String,
    },

    #[snafu(display("Ballot {id} was rejected: {source}"))]
    InvalidBallot { id: String, source: TallyErrors },
    #[snafu(display("The poll could not be tabulated: {source}"))]
    Tally { source: TallyErrors },

    #[snafu(whatever, display("{message}"))]
    Whatever {
        message: String,
        #[snafu(source(from(Box<dyn std::error::Error>, Some)))]
        source: Option<Box<dyn std::error::Error>>,
    },
}

pub type PollResult<T> = Result<T, PollError>;

/// A ballot as read from a source, before validation against the poll.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct ParsedBallot {
    pub id: String,
    pub choices: Vec<String>,
}

fn pairs_to_json(pairs: &[(String, u64)], value_key: &str) -> Vec<JSValue> {
    pairs
        .iter()
        .map(|(name, count)| {
            let mut obj: JSMap<String, JSValue> = JSMap::new();
            obj.insert("candidate".to_string(), json!(name));
            obj.insert(value_key.to_string(), json!(count));
            JSValue::Object(obj)
        })
        .collect()
}

fn round_to_json(record: &RoundRecord) -> JSValue {
    let transfers: Vec<JSValue> = record
        .transfers
        .iter()
        .map(|es| {
            json!({
                "eliminated": es.name,
                "transfers": pairs_to_json(&es.transfers, "votes"),
                "exhausted": es.exhausted,
            })
        })
        .collect();
    json!({
        "round": record.round,
        "tally": pairs_to_json(&record.tally, "votes"),
        "activeBallots": record.active_ballots,
        "exhausted": record.exhausted,
        "threshold": record.threshold,
        "eliminated": record.eliminated,
        "tieBrokenByBorda": record.tie_broken_by_borda,
        "bordaScores": record.borda_scores.as_ref().map(|scores| pairs_to_json(scores, "score")),
        "tied": record.tied,
        "transfers": transfers,
    })
}

fn build_summary_js(config: &PollConfig, ballots: &[Ballot], results: &PollResults) -> JSValue {
    let abstentions = ballots.iter().filter(|b| b.is_abstention()).count();
    let irv = &results.irv;
    let rounds: Vec<JSValue> = irv.rounds.iter().map(round_to_json).collect();
    json!({
        "config": {
            "poll": config.output_settings.poll_name,
            "candidates": config.candidates,
            "ballots": ballots.len(),
            "abstentions": abstentions,
        },
        "irv": {
            "winner": irv.winner.label(),
            "outcome": irv.outcome.as_str(),
            "totalRounds": irv.total_rounds,
            "rounds": rounds,
        },
        "borda": {
            "ballotsCounted": results.borda.ballots_counted,
            "scores": pairs_to_json(&results.borda.scores, "score"),
            "leaders": results.borda.leaders(),
        }
    })
}

fn read_ballots(path: &str, source: &BallotSource) -> PollResult<Vec<ParsedBallot>> {
    info!("Attempting to read ballot file {:?}", path);
    match source.provider.as_str() {
        "json" => io_json::read_json_ballots(path.to_string()),
        "csv" => io_csv::read_csv_ranking(path.to_string(), source),
        "xlsx" | "excel" => io_xlsx::read_excel_file(path.to_string(), source),
        x => whatever!("Provider not implemented: {:?}", x),
    }
}

// Stops at the first bad ballot: nothing is dropped silently.
fn validate_ballots(parsed_ballots: &[ParsedBallot], poll: &Poll) -> PollResult<Vec<Ballot>> {
    let mut res: Vec<Ballot> = Vec::with_capacity(parsed_ballots.len());
    for pb in parsed_ballots.iter() {
        let ballot = normalize_ballot(&pb.choices, poll).context(InvalidBallotSnafu {
            id: pb.id.clone(),
        })?;
        res.push(ballot);
    }
    Ok(res)
}

/// Reads every source and tabulates the poll. Returns the summary.
fn tabulate_sources(config: &PollConfig, sources: &[(String, BallotSource)]) -> PollResult<JSValue> {
    let poll = Poll::new(&config.candidates);
    let mut ballots: Vec<Ballot> = Vec::new();
    for (path, source) in sources.iter() {
        let parsed = read_ballots(path, source)?;
        let mut file_ballots = validate_ballots(&parsed, &poll)?;
        debug!(
            "tabulate_sources: {} ballots from {:?}",
            file_ballots.len(),
            path
        );
        ballots.append(&mut file_ballots);
    }
    info!("tabulate_sources: {} ballots", ballots.len());

    let results = tabulate(&poll, &ballots).context(TallySnafu {})?;
    info!(
        "tabulate_sources: winner: {} after {} rounds",
        results.irv.winner, results.irv.total_rounds
    );
    Ok(build_summary_js(config, &ballots, &results))
}

fn check_reference(summary_js: &JSValue, reference_path: &str) -> PollResult<()> {
    let summary_ref = read_summary(reference_path)?;
    let pretty_js_summary_ref =
        serde_json::to_string_pretty(&summary_ref).context(ParsingJsonSnafu {})?;
    let pretty_js_stats = serde_json::to_string_pretty(summary_js).context(ParsingJsonSnafu {})?;
    if pretty_js_summary_ref != pretty_js_stats {
        warn!("Found differences with the reference summary");
        print_diff(
            pretty_js_summary_ref.as_str(),
            pretty_js_stats.as_str(),
            "\n",
        );
        whatever!("Difference detected between calculated summary and reference summary")
    }
    Ok(())
}

/// Runs a poll described by a configuration file and/or command line options.
///
/// The summary goes to `out` if given, otherwise to the output path of the configuration,
/// otherwise to the standard output.
pub fn run_poll(
    config_path: Option<String>,
    input: Option<String>,
    input_type: Option<String>,
    candidates: Option<Vec<String>>,
    excel_worksheet_name: Option<String>,
    out: Option<String>,
    reference: Option<String>,
) -> PollResult<JSValue> {
    let (mut config, root_p): (PollConfig, PathBuf) = match &config_path {
        Some(path) => {
            let config = read_config(path)?;
            let root_p = Path::new(path)
                .parent()
                .context(MissingParentDirSnafu {})?
                .to_path_buf();
            (config, root_p)
        }
        None => {
            let config = PollConfig {
                output_settings: OutputSettings {
                    poll_name: "poll".to_string(),
                    output_path: None,
                },
                candidates: Vec::new(),
                ballot_sources: Vec::new(),
            };
            (config, PathBuf::new())
        }
    };
    if let Some(cands) = candidates {
        config.candidates = cands;
    }
    info!("config: {:?}", config);
    if config.candidates.is_empty() {
        whatever!("No candidates: use --candidates or a configuration file")
    }

    let mut sources: Vec<(String, BallotSource)> = config
        .ballot_sources
        .iter()
        .map(|s| (root_p.join(&s.file_path).display().to_string(), s.clone()))
        .collect();
    if let Some(input_path) = input {
        let provider = input_type.unwrap_or_else(|| "json".to_string());
        let mut source = BallotSource::from_provider(&provider, &input_path);
        source.excel_worksheet_name = excel_worksheet_name;
        sources.push((input_path, source));
    }
    if sources.is_empty() {
        whatever!("No ballots: use --input or ballotSources in the configuration file")
    }

    let summary_js = tabulate_sources(&config, &sources)?;

    let out_path: Option<String> = out.or_else(|| {
        config
            .output_settings
            .output_path
            .as_ref()
            .map(|p| root_p.join(p).display().to_string())
    });
    let pretty_js_stats = serde_json::to_string_pretty(&summary_js).context(ParsingJsonSnafu {})?;
    match out_path.as_deref() {
        None | Some("stdout") => println!("{}", pretty_js_stats),
        Some(path) => {
            info!("Writing the summary to {:?}", path);
            fs::write(path, pretty_js_stats.as_str()).context(WritingSummarySnafu { path })?;
        }
    }

    // The reference summary, if provided for comparison
    if let Some(reference_path) = reference {
        check_reference(&summary_js, &reference_path)?;
    }

    Ok(summary_js)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn data_path(name: &str) -> String {
        format!("{}/tests/data/{}", env!("CARGO_MANIFEST_DIR"), name)
    }

    fn init() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    fn s(names: &[&str]) -> Vec<String> {
        names.iter().map(|x| x.to_string()).collect()
    }

    #[test]
    fn lunch_matches_reference() {
        init();
        let res = run_poll(
            Some(data_path("lunch/lunch_config.json")),
            None,
            None,
            None,
            None,
            Some("stdout".to_string()),
            Some(data_path("lunch/lunch_expected_summary.json")),
        );
        let js = res.unwrap();
        assert_eq!(js["irv"]["winner"], json!("Pizza"));
        assert_eq!(js["borda"]["leaders"], json!(["Pizza"]));
    }

    #[test]
    fn excel_source_from_the_configuration() {
        init();
        let js = run_poll(
            Some(data_path("lunch/lunch_xlsx_config.json")),
            None,
            None,
            None,
            None,
            Some("stdout".to_string()),
            None,
        )
        .unwrap();
        assert_eq!(js["config"]["ballots"], json!(4));
        assert_eq!(js["config"]["abstentions"], json!(1));
        // Round 1: a three-way tie, Tacos has the lowest restricted Borda score.
        assert_eq!(js["irv"]["rounds"][0]["eliminated"], json!(["Tacos"]));
        // Round 2: Pizza and Sushi cannot be separated.
        assert_eq!(js["irv"]["winner"], json!("tie"));
        assert_eq!(js["irv"]["totalRounds"], json!(2));
        assert_eq!(js["irv"]["rounds"][1]["tied"], json!(["Pizza", "Sushi"]));
    }

    #[test]
    fn json_input_from_the_command_line() {
        init();
        let js = run_poll(
            None,
            Some(data_path("lunch/lunch_ballots.json")),
            None,
            Some(s(&["Pizza", "Sushi", "Tacos"])),
            None,
            Some("stdout".to_string()),
            Some(data_path("lunch/lunch_expected_summary_cli.json")),
        )
        .unwrap();
        assert_eq!(js["config"]["poll"], json!("poll"));
        assert_eq!(js["irv"]["totalRounds"], json!(2));
    }

    #[test]
    fn tie_with_abstention() {
        init();
        let js = run_poll(
            None,
            Some(data_path("ranks_only.csv")),
            Some("csv".to_string()),
            Some(s(&["X", "Y", "Z"])),
            None,
            Some("stdout".to_string()),
            None,
        )
        .unwrap();
        assert_eq!(js["irv"]["winner"], json!("tie"));
        assert_eq!(js["irv"]["outcome"], json!("unresolvedTie"));
        assert_eq!(js["config"]["abstentions"], json!(1));
        assert_eq!(js["config"]["ballots"], json!(3));
    }

    #[test]
    fn reference_mismatch_fails() {
        init();
        let res = run_poll(
            None,
            Some(data_path("ranks_only.csv")),
            Some("csv".to_string()),
            Some(s(&["X", "Y", "Z"])),
            None,
            Some("stdout".to_string()),
            Some(data_path("lunch/lunch_expected_summary.json")),
        );
        assert!(matches!(res, Err(PollError::Whatever { .. })));
    }

    #[test]
    fn unknown_candidate_is_reported_with_the_ballot_id() {
        init();
        let res = run_poll(
            None,
            Some(data_path("lunch/lunch_ballots.json")),
            None,
            Some(s(&["Pizza", "Sushi"])),
            None,
            Some("stdout".to_string()),
            None,
        );
        match res {
            Err(PollError::InvalidBallot { id, source }) => {
                assert_eq!(id, "v1");
                assert_eq!(
                    source,
                    TallyErrors::InvalidBallot(InvalidBallotReason::UnknownCandidate(
                        "Tacos".to_string()
                    ))
                );
            }
            x => panic!("unexpected result: {:?}", x),
        }
    }

    #[test]
    fn generated_id_names_the_rejected_ballot() {
        init();
        let res = run_poll(
            None,
            Some(data_path("bare_rankings.json")),
            None,
            Some(s(&["X"])),
            None,
            Some("stdout".to_string()),
            None,
        );
        match res {
            Err(PollError::InvalidBallot { id, .. }) => {
                assert_eq!(id, "bare_rankings.json-00000002")
            }
            x => panic!("unexpected result: {:?}", x),
        }
    }

    #[test]
    fn tie_is_not_a_candidate_label() {
        init();
        let res = run_poll(
            None,
            Some(data_path("bare_rankings.json")),
            None,
            Some(s(&["X", "Y", "tie"])),
            None,
            Some("stdout".to_string()),
            None,
        );
        assert!(matches!(
            res,
            Err(PollError::Tally {
                source: TallyErrors::ReservedCandidateName(_)
            })
        ));
    }

    #[test]
    fn duplicate_ranking_is_rejected() {
        init();
        let res = run_poll(
            None,
            Some(data_path("duplicate_ranking.json")),
            None,
            Some(s(&["A", "B"])),
            None,
            Some("stdout".to_string()),
            None,
        );
        assert!(matches!(res, Err(PollError::InvalidBallot { .. })));
    }

    #[test]
    fn missing_candidates() {
        init();
        let res = run_poll(
            None,
            Some(data_path("lunch/lunch_ballots.json")),
            None,
            None,
            None,
            Some("stdout".to_string()),
            None,
        );
        assert!(res.is_err());
    }

    #[test]
    fn unknown_provider() {
        init();
        let res = run_poll(
            None,
            Some(data_path("lunch/lunch_ballots.json")),
            Some("dominion".to_string()),
            Some(s(&["Pizza", "Sushi", "Tacos"])),
            None,
            Some("stdout".to_string()),
            None,
        );
        assert!(matches!(res, Err(PollError::Whatever { .. })));
    }
}
