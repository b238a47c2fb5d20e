use std::collections::HashMap;

use crate::config::{CellValue, JobError};

/// An immutable table of survey responses, stored column-major and keyed by
/// stable string codes.
///
/// The table is loaded once by the ingestion side and only read afterwards:
/// projection and filtering return new tables and never touch their input,
/// so several jobs can share one table.
#[derive(PartialEq, Debug, Clone)]
pub struct RespondentTable {
    columns: Vec<String>,
    index: HashMap<String, usize>,
    // One Vec<CellValue> per column, all of them num_rows long.
    cells: Vec<Vec<CellValue>>,
    num_rows: usize,
}

impl RespondentTable {
    pub fn column_codes(&self) -> &[String] {
        &self.columns
    }

    pub fn num_rows(&self) -> usize {
        self.num_rows
    }

    /// The cells of one column, in row order.
    pub fn column(&self, code: &str) -> Result<&[CellValue], JobError> {
        let idx = self
            .index
            .get(code)
            .ok_or_else(|| JobError::MissingColumn {
                code: code.to_string(),
            })?;
        Ok(&self.cells[*idx])
    }

    /// A row-aligned copy containing only the given columns.
    pub fn project(&self, codes: &[String]) -> Result<RespondentTable, JobError> {
        let mut builder = TableBuilder::new(codes)?;
        let cols: Vec<&[CellValue]> = codes
            .iter()
            .map(|c| self.column(c))
            .collect::<Result<_, _>>()?;
        for row in 0..self.num_rows {
            builder.push_row(cols.iter().map(|col| col[row].clone()).collect())?;
        }
        Ok(builder.build())
    }

    /// A copy keeping only the rows flagged in `keep`.
    pub(crate) fn retain_rows(&self, keep: &[bool]) -> RespondentTable {
        debug_assert_eq!(keep.len(), self.num_rows);
        let cells: Vec<Vec<CellValue>> = self
            .cells
            .iter()
            .map(|col| {
                col.iter()
                    .zip(keep.iter())
                    .filter_map(|(c, k)| if *k { Some(c.clone()) } else { None })
                    .collect()
            })
            .collect();
        let num_rows = keep.iter().filter(|k| **k).count();
        RespondentTable {
            columns: self.columns.clone(),
            index: self.index.clone(),
            cells,
            num_rows,
        }
    }
}

/// Builds a [RespondentTable] row by row.
///
/// ```
/// use survey_proportions::{CellValue, TableBuilder};
/// # use survey_proportions::JobError;
///
/// let mut builder = TableBuilder::new(&["region".to_string(), "q1".to_string()])?;
/// builder.push_row(vec![
///     CellValue::Text("N".to_string()),
///     CellValue::Text("yes".to_string()),
/// ])?;
/// let table = builder.build();
/// assert_eq!(table.num_rows(), 1);
/// # Ok::<(), JobError>(())
/// ```
#[derive(Debug)]
pub struct TableBuilder {
    columns: Vec<String>,
    cells: Vec<Vec<CellValue>>,
    num_rows: usize,
}

impl TableBuilder {
    pub fn new<S: AsRef<str>>(columns: &[S]) -> Result<TableBuilder, JobError> {
        let mut seen: HashMap<&str, ()> = HashMap::new();
        for c in columns {
            if seen.insert(c.as_ref(), ()).is_some() {
                return Err(JobError::DuplicateColumn {
                    code: c.as_ref().to_string(),
                });
            }
        }
        Ok(TableBuilder {
            columns: columns.iter().map(|c| c.as_ref().to_string()).collect(),
            cells: columns.iter().map(|_| Vec::new()).collect(),
            num_rows: 0,
        })
    }

    /// Adds one respondent. The row must match the header width.
    pub fn push_row(&mut self, row: Vec<CellValue>) -> Result<(), JobError> {
        if row.len() != self.columns.len() {
            return Err(JobError::RowLengthMismatch {
                expected: self.columns.len(),
                got: row.len(),
            });
        }
        for (col, cell) in self.cells.iter_mut().zip(row) {
            col.push(cell);
        }
        self.num_rows += 1;
        Ok(())
    }

    pub fn build(self) -> RespondentTable {
        let index = self
            .columns
            .iter()
            .enumerate()
            .map(|(idx, c)| (c.clone(), idx))
            .collect();
        RespondentTable {
            columns: self.columns,
            index,
            cells: self.cells,
            num_rows: self.num_rows,
        }
    }
}
