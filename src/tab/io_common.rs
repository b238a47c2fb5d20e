use crate::tab::*;

use survey_proportions::CellValue;

/// Coerces a calamine cell into a table cell. Empty cells and empty strings
/// are missing values.
pub fn cell_from_calamine(cell: &calamine::DataType, lineno: u64) -> TabResult<CellValue> {
    match cell {
        calamine::DataType::String(s) if s.is_empty() => Ok(CellValue::Missing),
        calamine::DataType::String(s) => Ok(CellValue::Text(s.clone())),
        calamine::DataType::Float(f) => Ok(CellValue::Number(*f)),
        calamine::DataType::Int(i) => Ok(CellValue::Number(*i as f64)),
        calamine::DataType::Bool(b) => Ok(CellValue::Text(b.to_string())),
        calamine::DataType::Empty => Ok(CellValue::Missing),
        _ => Err(TabError::CellWrongType {
            lineno,
            content: format!("{:?}", cell),
        }),
    }
}

/// Coerces a textual cell (CSV) into a table cell.
pub fn cell_from_text(s: &str) -> CellValue {
    if s.is_empty() {
        CellValue::Missing
    } else {
        CellValue::Text(s.to_string())
    }
}
