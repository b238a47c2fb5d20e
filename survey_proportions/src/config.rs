// ********* Input data structures ***********

use std::collections::HashMap;
use std::error::Error;
use std::fmt::Display;

/// The string form of a missing cell.
///
/// Missing cells are compared through this sentinel so that they can be
/// listed explicitly in a filter or a split, but never match a real answer
/// value by accident.
pub const MISSING: &str = "<missing>";

/// A single cell of the respondent table.
///
/// Values coming out of a spreadsheet are either text, numeric or absent.
/// All comparisons against job-supplied answer values go through
/// [CellValue::canonical].
#[derive(PartialEq, Debug, Clone)]
pub enum CellValue {
    Text(String),
    Number(f64),
    Missing,
}

impl CellValue {
    /// The canonical string form of this cell.
    ///
    /// Whole numbers render without a fractional part (`1`, not `1.0`) so
    /// that numeric answer codes compare equal to their textual form in job
    /// descriptions.
    pub fn canonical(&self) -> String {
        match self {
            CellValue::Text(s) => s.clone(),
            CellValue::Number(x) if x.is_finite() && x.fract() == 0.0 => {
                format!("{}", *x as i64)
            }
            CellValue::Number(x) => format!("{}", x),
            CellValue::Missing => MISSING.to_string(),
        }
    }
}

/// Read-only mapping from a human-readable category name (`"generation"`)
/// to the underlying column code in the respondent table (`"agegen"`).
#[derive(Eq, PartialEq, Debug, Clone, Default)]
pub struct CategoryMap {
    codes: HashMap<String, String>,
}

impl CategoryMap {
    pub fn new<I: IntoIterator<Item = (String, String)>>(entries: I) -> CategoryMap {
        CategoryMap {
            codes: entries.into_iter().collect(),
        }
    }

    /// Resolves a category name to its column code.
    pub fn resolve(&self, name: &str) -> Result<&str, JobError> {
        self.codes
            .get(name)
            .map(|s| s.as_str())
            .ok_or_else(|| JobError::UnknownCategory {
                name: name.to_string(),
            })
    }
}

/// One survey question together with the raw answer values that count as
/// "selected" for it.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct Question {
    pub code: String,
    pub selected: Vec<String>,
}

/// How the answer cells of a job are turned into boolean indicators.
///
/// Exactly one mode is active per job; the two cannot be mixed.
#[derive(Eq, PartialEq, Debug, Clone)]
pub enum QuestionMode {
    /// One indicator per question, true when the cell is one of the
    /// question's selected values.
    Plain(Vec<Question>),
    /// One indicator per candidate value of a single question. Each value
    /// becomes its own output column, true on equality with the cell.
    Split {
        question: String,
        values: Vec<String>,
    },
}

/// A named composite indicator: the row-wise OR of its member indicators.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct Aggregate {
    pub name: String,
    pub members: Vec<String>,
}

/// Chart labels. Opaque to the pipeline, passed through to the exporter.
#[derive(Eq, PartialEq, Debug, Clone, Default)]
pub struct Labels {
    pub title: Option<String>,
    pub xlabel: Option<String>,
    pub ylabel: Option<String>,
}

/// A declarative description of one analysis.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct JobSpec {
    /// Category names, in order. The first one is the default grouping
    /// dimension.
    pub categories: Vec<String>,
    /// Category name to allowed raw values. A row survives only if it
    /// matches every filter (logical AND).
    pub filters: Vec<(String, Vec<String>)>,
    pub mode: QuestionMode,
    /// When present, the output columns are the aggregate names instead of
    /// the raw indicators.
    pub aggregation: Option<Vec<Aggregate>>,
    /// When present, the melted rows are partitioned into this group order.
    /// Groups not listed are dropped from the output.
    pub sort_order: Option<Vec<String>>,
    pub labels: Option<Labels>,
}

// ******** Output data structures *********

/// The wide result of one job: output columns (in declaration order)
/// crossed with groups. `None` marks a group with no rows, for which the
/// proportion is undefined.
#[derive(PartialEq, Debug, Clone)]
pub struct ProportionsTable {
    pub output_columns: Vec<String>,
    pub groups: Vec<String>,
    /// `values[column][group]`, aligned with the two axes above.
    pub values: Vec<Vec<Option<f64>>>,
}

impl ProportionsTable {
    /// Reshapes into the tidy form consumed by charting: one row per
    /// (output column, group) pair, groups varying slowest.
    pub fn melt(&self) -> Vec<MeltedRow> {
        let mut rows = Vec::with_capacity(self.output_columns.len() * self.groups.len());
        for (gi, group) in self.groups.iter().enumerate() {
            for (ci, column) in self.output_columns.iter().enumerate() {
                rows.push(MeltedRow {
                    index: column.clone(),
                    variable: group.clone(),
                    value: self.values[ci][gi],
                });
            }
        }
        rows
    }
}

/// One row of the tidy (long) result.
#[derive(PartialEq, Debug, Clone)]
pub struct MeltedRow {
    /// Output column name: a question code, a split value or an aggregate
    /// name.
    pub index: String,
    /// Group name: a raw value of the grouping category.
    pub variable: String,
    /// Proportion in `[0, 1]`, or `None` when the group has no rows.
    pub value: Option<f64>,
}

/// Everything one job run produces.
#[derive(PartialEq, Debug, Clone)]
pub struct AnalysisResult {
    pub proportions: ProportionsTable,
    pub melted: Vec<MeltedRow>,
    pub labels: Option<Labels>,
}

/// Errors that prevent a job from running. These are all configuration
/// problems, surfaced before any proportion is computed; data-shape
/// oddities such as empty groups are represented in the result instead.
#[derive(Eq, PartialEq, Debug, Clone)]
pub enum JobError {
    /// A category name that the category map does not know.
    UnknownCategory { name: String },
    /// A required column that the respondent table does not carry.
    MissingColumn { code: String },
    /// An aggregate member that is not one of the job's indicators.
    UnknownAggregationMember { name: String, member: String },
    /// The job has no categories and no explicit grouping was supplied.
    NoGroupingCategory,
    /// Table construction: the same column code was declared twice.
    DuplicateColumn { code: String },
    /// Table construction: a row does not match the header width.
    RowLengthMismatch { expected: usize, got: usize },
}

impl Error for JobError {}

impl Display for JobError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JobError::UnknownCategory { name } => {
                write!(f, "unknown category name: {}", name)
            }
            JobError::MissingColumn { code } => {
                write!(f, "column not present in the respondent table: {}", code)
            }
            JobError::UnknownAggregationMember { name, member } => {
                write!(
                    f,
                    "aggregate {} references an undefined indicator: {}",
                    name, member
                )
            }
            JobError::NoGroupingCategory => {
                write!(f, "the job has no categories to group by")
            }
            JobError::DuplicateColumn { code } => {
                write!(f, "duplicate column code: {}", code)
            }
            JobError::RowLengthMismatch { expected, got } => {
                write!(f, "row has {} cells, the header has {}", got, expected)
            }
        }
    }
}
