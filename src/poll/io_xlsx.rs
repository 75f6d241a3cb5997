// Primitives for reading Excel workbooks.

use calamine::{open_workbook, DataType, Reader, Xlsx};

use crate::poll::{
    io_common::{assemble_choices, make_default_id},
    *,
};

pub fn read_excel_file(path: String, cfs: &BallotSource) -> PollResult<Vec<ParsedBallot>> {
    let default_id = make_default_id(&path);
    let mut workbook: Xlsx<_> =
        open_workbook(path.clone()).context(OpeningExcelSnafu { path: path.clone() })?;

    let wrange = match &cfs.excel_worksheet_name {
        Some(name) => workbook.worksheet_range(name),
        None => workbook.worksheet_range_at(0),
    }
    .context(EmptyExcelSnafu {})?
    .context(OpeningExcelSnafu { path: path.clone() })?;

    let id_idx_o = cfs.id_column_index_int()?;
    let choices_start_col = cfs.first_vote_column_index()?;
    let first_row = cfs.first_vote_row_index()?;

    let mut res: Vec<ParsedBallot> = Vec::new();
    for (idx, row) in wrange.rows().enumerate().skip(first_row) {
        let lineno = idx + 1;
        let cells: Vec<String> = row
            .iter()
            .map(|cell| read_cell(cell, lineno))
            .collect::<PollResult<Vec<String>>>()?;
        let id = match id_idx_o {
            Some(id_idx) => cells
                .get(id_idx)
                .cloned()
                .context(RowTooShortSnafu { lineno })?,
            None => default_id(lineno),
        };
        let choices = assemble_choices(cells.iter().skip(choices_start_col).map(|s| s.as_str()));
        debug!("read_excel_file: lineno: {:?} choices: {:?}", lineno, &choices);
        res.push(ParsedBallot {
            id,
            choices,
        });
    }
    Ok(res)
}

fn read_cell(cell: &DataType, lineno: usize) -> PollResult<String> {
    match cell {
        DataType::String(s) => Ok(s.clone()),
        DataType::Empty => Ok("".to_string()),
        DataType::Int(i) => Ok(i.to_string()),
        DataType::Float(f) if f.fract() == 0.0 => Ok(format!("{}", *f as i64)),
        _ => whatever!("Line {}: could not understand cell {:?}", lineno, cell),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cells() {
        assert_eq!(read_cell(&DataType::String("A".to_string()), 1).unwrap(), "A");
        assert_eq!(read_cell(&DataType::Empty, 1).unwrap(), "");
        assert_eq!(read_cell(&DataType::Float(12.0), 1).unwrap(), "12");
        assert!(read_cell(&DataType::Bool(true), 1).is_err());
    }

    fn data_path(name: &str) -> String {
        format!("{}/tests/data/{}", env!("CARGO_MANIFEST_DIR"), name)
    }

    fn ballots_sheet() -> BallotSource {
        serde_json::from_value(serde_json::json!({
            "provider": "xlsx",
            "filePath": "lunch_ballots.xlsx",
            "excelWorksheetName": "Ballots",
            "idColumnIndex": "A",
            "firstVoteColumnIndex": 2,
            "firstVoteRowIndex": 3
        }))
        .unwrap()
    }

    #[test]
    fn reads_ids_and_choices() {
        let ballots =
            read_excel_file(data_path("lunch/lunch_ballots.xlsx"), &ballots_sheet()).unwrap();
        assert_eq!(ballots.len(), 4);
        let ids: Vec<&str> = ballots.iter().map(|b| b.id.as_str()).collect();
        assert_eq!(ids, vec!["x1", "x2", "x3", "x4"]);
        assert_eq!(ballots[0].choices, vec!["Pizza", "Sushi"]);
        assert_eq!(ballots[1].choices, vec!["Tacos"]);
        // A row with only an id is an abstention.
        assert!(ballots[2].choices.is_empty());
        assert_eq!(ballots[3].choices, vec!["Sushi", "Pizza", "Tacos"]);
    }

    #[test]
    fn first_worksheet_by_default() {
        let src = BallotSource::from_provider("xlsx", "lunch_ballots.xlsx");
        let ballots = read_excel_file(data_path("lunch/lunch_ballots.xlsx"), &src).unwrap();
        // The first worksheet only holds a note in its header row.
        assert!(ballots.is_empty());
    }

    #[test]
    fn unknown_worksheet() {
        let mut src = ballots_sheet();
        src.excel_worksheet_name = Some("Form1".to_string());
        let res = read_excel_file(data_path("lunch/lunch_ballots.xlsx"), &src);
        assert!(matches!(res, Err(PollError::EmptyExcel {})));
    }

    #[test]
    fn missing_workbook() {
        let src = BallotSource::from_provider("xlsx", "missing.xlsx");
        let path = format!("{}/tests/data/missing.xlsx", env!("CARGO_MANIFEST_DIR"));
        assert!(read_excel_file(path, &src).is_err());
    }
}
