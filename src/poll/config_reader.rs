use crate::poll::*;

use serde::{Deserialize, Serialize};
use serde_json::Value as JSValue;

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct OutputSettings {
    #[serde(rename = "pollName")]
    pub poll_name: String,
    #[serde(rename = "outputPath")]
    pub output_path: Option<String>,
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct BallotSource {
    pub provider: String,
    #[serde(rename = "filePath")]
    pub file_path: String,
    #[serde(rename = "firstVoteColumnIndex")]
    _first_vote_column_index: Option<JSValue>,
    #[serde(rename = "firstVoteRowIndex")]
    _first_vote_row_index: Option<JSValue>,
    #[serde(rename = "idColumnIndex")]
    pub id_column_index: Option<JSValue>,
    #[serde(rename = "excelWorksheetName")]
    pub excel_worksheet_name: Option<String>,
}

impl BallotSource {
    /// A source with the default layout, as built from the command line.
    pub fn from_provider(provider: &str, file_path: &str) -> BallotSource {
        BallotSource {
            provider: provider.to_string(),
            file_path: file_path.to_string(),
            _first_vote_column_index: None,
            _first_vote_row_index: None,
            id_column_index: None,
            excel_worksheet_name: None,
        }
    }

    /// 0-based index of the first choice column (1-based in the configuration, 1 by default).
    pub fn first_vote_column_index(&self) -> PollResult<usize> {
        match &self._first_vote_column_index {
            None => Ok(0),
            x => to_zero_based(read_js_int(x)?),
        }
    }

    /// 0-based index of the first ballot row (1-based in the configuration, 2 by default).
    pub fn first_vote_row_index(&self) -> PollResult<usize> {
        match &self._first_vote_row_index {
            None => Ok(1),
            x => to_zero_based(read_js_int(x)?),
        }
    }

    /// 0-based index of the id column, if any.
    pub fn id_column_index_int(&self) -> PollResult<Option<usize>> {
        match &self.id_column_index {
            None => Ok(None),
            x => to_zero_based(read_js_int(x)?).map(Some),
        }
    }
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct PollConfig {
    #[serde(rename = "outputSettings")]
    pub output_settings: OutputSettings,
    pub candidates: Vec<String>,
    #[serde(rename = "ballotSources", default)]
    pub ballot_sources: Vec<BallotSource>,
}

pub fn read_config(path: &str) -> PollResult<PollConfig> {
    let contents = fs::read_to_string(path).context(OpeningJsonSnafu { path })?;
    let config: PollConfig =
        serde_json::from_str(contents.as_str()).context(ParsingJsonSnafu {})?;
    Ok(config)
}

pub fn read_summary(path: &str) -> PollResult<JSValue> {
    let contents = fs::read_to_string(path).context(OpeningJsonSnafu { path })?;
    debug!("read_summary: {} bytes from {:?}", contents.len(), path);
    let js: JSValue = serde_json::from_str(contents.as_str()).context(ParsingJsonSnafu {})?;
    Ok(js)
}

fn to_zero_based(x: usize) -> PollResult<usize> {
    x.checked_sub(1).context(ParsingJsonNumberSnafu {})
}

// 1-based. Numbers, numeric strings and Excel-style column letters are accepted.
fn read_js_int(x: &Option<JSValue>) -> PollResult<usize> {
    match x {
        Some(JSValue::Number(n)) => n
            .as_u64()
            .map(|x| x as usize)
            .context(ParsingJsonNumberSnafu {}),
        Some(JSValue::String(s)) if !s.is_empty() && s.chars().all(|c| c.is_ascii_alphabetic()) => {
            s.to_ascii_lowercase()
                .chars()
                .try_fold(0usize, |acc, c| {
                    acc.checked_mul(26)?
                        .checked_add(c as usize - 'a' as usize + 1)
                })
                .context(ParsingJsonNumberSnafu {})
        }
        Some(JSValue::String(s)) => s.parse::<usize>().ok().context(ParsingJsonNumberSnafu {}),
        _ => None.context(ParsingJsonNumberSnafu {}),
    }
}
