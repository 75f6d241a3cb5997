// Primitives for reading CSV files.

use std::fs::File;

use crate::poll::{
    io_common::{assemble_choices, make_default_id},
    *,
};

pub fn read_csv_ranking(path: String, cfs: &BallotSource) -> PollResult<Vec<ParsedBallot>> {
    let default_id = make_default_id(&path);

    let id_idx_o = cfs.id_column_index_int()?;
    let choices_start_col = cfs.first_vote_column_index()?;

    let mut res: Vec<ParsedBallot> = Vec::new();
    let (records, row_offset) = get_records(&path, cfs)?;

    for (idx, line_r) in records.enumerate() {
        // 1-based, as displayed by spreadsheets.
        let lineno = idx + row_offset + 1;
        let line = line_r.context(CsvLineParseSnafu { lineno })?;
        let id = if let Some(id_idx) = id_idx_o {
            line.get(id_idx)
                .context(RowTooShortSnafu { lineno })?
                .to_string()
        } else {
            default_id(lineno)
        };

        let choices = assemble_choices(line.iter().skip(choices_start_col));
        debug!("read_csv_ranking: lineno: {:?} choices: {:?}", lineno, &choices);

        res.push(ParsedBallot {
            id,
            choices,
        });
    }
    Ok(res)
}

fn get_records(
    path: &str,
    cfs: &BallotSource,
) -> PollResult<(csv::StringRecordsIntoIter<File>, usize)> {
    let first_row = cfs.first_vote_row_index()?;
    let rdr = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(path)
        .context(CsvOpenSnafu { path })?;
    let mut records = rdr.into_records();
    for _ in 0..first_row {
        _ = records.next();
    }
    Ok((records, first_row))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn data_path(name: &str) -> String {
        format!("{}/tests/data/{}", env!("CARGO_MANIFEST_DIR"), name)
    }

    #[test]
    fn reads_ids_and_choices() {
        let src: BallotSource = serde_json::from_value(serde_json::json!({
            "provider": "csv",
            "filePath": "lunch_ballots.csv",
            "idColumnIndex": 1,
            "firstVoteColumnIndex": 2
        }))
        .unwrap();
        let ballots = read_csv_ranking(data_path("lunch/lunch_ballots.csv"), &src).unwrap();
        assert_eq!(ballots.len(), 4);
        assert_eq!(ballots[0].id, "v1");
        assert_eq!(ballots[0].choices, vec!["Pizza", "Sushi", "Tacos"]);
        assert_eq!(ballots[3].choices, vec!["Pizza"]);
    }

    #[test]
    fn default_layout() {
        let src = BallotSource::from_provider("csv", "ranks_only.csv");
        let ballots = read_csv_ranking(data_path("ranks_only.csv"), &src).unwrap();
        assert_eq!(ballots.len(), 3);
        assert_eq!(ballots[0].id, "ranks_only.csv-00000002");
        assert_eq!(ballots[1].choices, vec!["Y"]);
        assert!(ballots[2].choices.is_empty());
    }
}
