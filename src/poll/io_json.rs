// Ballots stored as JSON documents.

use serde::Deserialize;

use crate::poll::{io_common::make_default_id, *};

#[derive(Debug, Deserialize)]
struct JsonBallot {
    id: Option<String>,
    ranking: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum JsonBallots {
    Wrapped { ballots: Vec<JsonBallot> },
    Bare(Vec<Vec<String>>),
}

pub fn read_json_ballots(path: String) -> PollResult<Vec<ParsedBallot>> {
    let default_id = make_default_id(&path);
    let contents = fs::read_to_string(&path).context(OpeningJsonSnafu { path: path.clone() })?;
    let parsed: JsonBallots =
        serde_json::from_str(contents.as_str()).context(ParsingJsonSnafu {})?;
    let res: Vec<ParsedBallot> = match parsed {
        JsonBallots::Wrapped { ballots } => ballots
            .into_iter()
            .enumerate()
            .map(|(idx, jb)| ParsedBallot {
                id: jb.id.unwrap_or_else(|| default_id(idx + 1)),
                choices: jb.ranking,
            })
            .collect(),
        JsonBallots::Bare(rankings) => rankings
            .into_iter()
            .enumerate()
            .map(|(idx, choices)| ParsedBallot {
                id: default_id(idx + 1),
                choices,
            })
            .collect(),
    };
    debug!("read_json_ballots: {} ballots from {:?}", res.len(), path);
    Ok(res)
}
