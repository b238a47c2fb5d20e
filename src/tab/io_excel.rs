use crate::tab::*;

use calamine::{open_workbook, DataType, Reader, Xlsx};
use log::debug;

use crate::tab::io_common::cell_from_calamine;

/// Reads an Excel worksheet into a [ParsedSheet]. The first row holds the
/// column codes; every following row is one respondent.
pub fn read_excel_sheet(path: String, worksheet_name: Option<String>) -> TabResult<ParsedSheet> {
    let wrange = get_range(&path, worksheet_name)?;

    let mut iter = wrange.rows();
    let header = iter.next().context(EmptyExcelSnafu {})?;
    debug!("read_excel_sheet: header: {:?}", header);
    let columns = read_header(header)?;

    let mut rows: Vec<Vec<survey_proportions::CellValue>> = Vec::new();
    for (idx, row) in iter.enumerate() {
        // Line numbers are 1-based and the header is line 1.
        let lineno = (idx + 2) as u64;
        let mut cells = Vec::with_capacity(columns.len());
        for cell in row.iter().take(columns.len()) {
            cells.push(cell_from_calamine(cell, lineno)?);
        }
        // A short row at the edge of the range is padded with missing cells.
        while cells.len() < columns.len() {
            cells.push(survey_proportions::CellValue::Missing);
        }
        rows.push(cells);
    }
    debug!("read_excel_sheet: {} rows", rows.len());
    Ok(ParsedSheet { columns, rows })
}

fn read_header(header: &[DataType]) -> TabResult<Vec<String>> {
    let mut columns: Vec<String> = Vec::with_capacity(header.len());
    for cell in header {
        match cell {
            calamine::DataType::String(s) => columns.push(s.clone()),
            _ => {
                return Err(TabError::CellWrongType {
                    lineno: 1,
                    content: format!("{:?}", cell),
                })
            }
        }
    }
    Ok(columns)
}

fn get_range(path: &String, worksheet_name_o: Option<String>) -> TabResult<calamine::Range<DataType>> {
    debug!(
        "get_range: path: {:?} worksheet: {:?}",
        &path, &worksheet_name_o
    );
    let p = path.clone();
    let mut workbook: Xlsx<_> =
        open_workbook(p).context(OpeningExcelSnafu { path: path.clone() })?;

    // A worksheet name was provided, use it.
    if let Some(worksheet_name) = worksheet_name_o {
        let wrange = workbook
            .worksheet_range(&worksheet_name)
            .context(EmptyExcelSnafu {})?
            .context(OpeningExcelSnafu { path: path.clone() })?;
        Ok(wrange)
    } else {
        let all_worksheets = workbook.worksheets();
        match all_worksheets.as_slice() {
            [] => whatever!("The Excel file {} has no worksheet", path),
            [(worksheet_name, wrange)] => {
                debug!(
                    "get_range: path: {:?} worksheet: {:?}",
                    &path, &worksheet_name
                );
                Ok(wrange.clone())
            }
            _ => {
                whatever!(
                    "The Excel file {} has several worksheets, the worksheet name must be provided",
                    path
                )
            }
        }
    }
}
