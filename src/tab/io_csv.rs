// Primitives for reading CSV files.

use crate::tab::*;

use log::debug;

use crate::tab::io_common::cell_from_text;

/// Reads a CSV file into a [ParsedSheet]. The first record holds the column
/// codes; every following record is one respondent. All cells are textual,
/// empty cells are missing values.
pub fn read_csv_sheet(path: String) -> TabResult<ParsedSheet> {
    let rdr = csv::ReaderBuilder::new()
        .has_headers(false)
        .from_path(path.clone())
        .context(CsvOpenSnafu { path })?;

    let mut records = rdr.into_records();
    let header = match records.next() {
        Some(record) => record.context(CsvLineParseSnafu {})?,
        None => whatever!("The CSV file is empty"),
    };
    let columns: Vec<String> = header.iter().map(|s| s.to_string()).collect();
    debug!("read_csv_sheet: header: {:?}", columns);

    let mut rows: Vec<Vec<survey_proportions::CellValue>> = Vec::new();
    for (idx, record) in records.enumerate() {
        let lineno = idx + 2;
        let record = record.context(CsvLineParseSnafu {})?;
        if record.len() != columns.len() {
            return Err(TabError::CsvLineTooShort { lineno });
        }
        rows.push(record.iter().map(cell_from_text).collect());
    }
    debug!("read_csv_sheet: {} rows", rows.len());
    Ok(ParsedSheet { columns, rows })
}
