mod config;
pub mod manual;
mod table;

use log::{debug, info};

use std::collections::{HashMap, HashSet};

pub use crate::config::*;
pub use crate::table::{RespondentTable, TableBuilder};

// **** Private structures ****

// A job with every category name resolved to a column code.
// Built before any data is touched: all configuration errors surface here.
#[derive(Eq, PartialEq, Debug, Clone)]
struct ResolvedJob {
    // Column code of categories[0], when the job has categories.
    default_group_code: Option<String>,
    // (column code, allowed raw values), in filter declaration order.
    filters: Vec<(String, HashSet<String>)>,
    // Every column the job reads, deduplicated, in declaration order.
    required_columns: Vec<String>,
}

// The boolean indicator columns derived from the answer cells.
// Invariant: every column is `rows` long.
#[derive(Eq, PartialEq, Debug, Clone)]
struct Indicators {
    names: Vec<String>,
    columns: Vec<Vec<bool>>,
    rows: usize,
}

/// Runs one job against the full respondent table, grouping by the job's
/// first category and deriving the group list from the filtered data.
///
/// Groups are emitted in first-observed row order, which is deterministic
/// for a given input table. Use [run_job_grouped] to pin an explicit group
/// list or to group by another category.
pub fn run_job(
    table: &RespondentTable,
    categories: &CategoryMap,
    job: &JobSpec,
) -> Result<AnalysisResult, JobError> {
    run_job_grouped(table, categories, job, None, None)
}

/// Runs one job with explicit overrides.
///
/// * `group_by` a category name to group by instead of `categories[0]`;
/// * `groups` the exact group values to report, in order. Values with no
///   matching rows yield an undefined (`None`) proportion rather than an
///   error.
pub fn run_job_grouped(
    table: &RespondentTable,
    categories: &CategoryMap,
    job: &JobSpec,
    group_by: Option<&str>,
    groups: Option<&[String]>,
) -> Result<AnalysisResult, JobError> {
    info!(
        "run_job: processing {} rows, {} filters, mode: {}",
        table.num_rows(),
        job.filters.len(),
        match &job.mode {
            QuestionMode::Plain(qs) => format!("{} questions", qs.len()),
            QuestionMode::Split { question, values } =>
                format!("split on {} ({} values)", question, values.len()),
        }
    );

    let resolved = resolve_job(categories, job)?;
    let group_code = match group_by {
        Some(name) => categories.resolve(name)?.to_string(),
        None => resolved
            .default_group_code
            .clone()
            .ok_or(JobError::NoGroupingCategory)?,
    };

    let mut required = resolved.required_columns.clone();
    if !required.contains(&group_code) {
        required.push(group_code.clone());
    }

    let projected = table.project(&required)?;
    let filtered = apply_filters(&projected, &resolved.filters)?;
    debug!(
        "run_job: {} of {} rows survive the filters",
        filtered.num_rows(),
        projected.num_rows()
    );

    let mut indicators = binarize(&filtered, &job.mode)?;
    if let Some(aggs) = &job.aggregation {
        indicators = aggregate(&indicators, aggs)?;
    }

    let group_col = filtered.column(&group_code)?;
    let group_values: Vec<String> = match groups {
        Some(g) => g.to_vec(),
        None => observed_groups(group_col),
    };
    debug!("run_job: groups: {:?}", group_values);

    let proportions = compute_proportions(group_col, &group_values, &indicators);
    let mut melted = proportions.melt();
    if let Some(order) = &job.sort_order {
        melted = apply_sort_order(melted, order);
    }

    info!(
        "run_job: produced {} output columns x {} groups",
        proportions.output_columns.len(),
        proportions.groups.len()
    );
    Ok(AnalysisResult {
        proportions,
        melted,
        labels: job.labels.clone(),
    })
}

/// Partitions melted rows into the given group order: for each name in
/// `order`, all rows whose `variable` equals that name, keeping their
/// relative order. Rows whose group is not listed are dropped from the
/// output, matching the observed behavior of the charting pipeline this
/// feeds.
pub fn apply_sort_order(rows: Vec<MeltedRow>, order: &[String]) -> Vec<MeltedRow> {
    let mut res: Vec<MeltedRow> = Vec::with_capacity(rows.len());
    for name in order {
        res.extend(rows.iter().filter(|r| &r.variable == name).cloned());
    }
    res
}

fn push_unique(columns: &mut Vec<String>, code: &str) {
    if !columns.iter().any(|c| c == code) {
        columns.push(code.to_string());
    }
}

// Resolves category names and checks the aggregation wiring. No data access.
fn resolve_job(categories: &CategoryMap, job: &JobSpec) -> Result<ResolvedJob, JobError> {
    let mut required: Vec<String> = Vec::new();

    let mut default_group_code: Option<String> = None;
    for (idx, name) in job.categories.iter().enumerate() {
        let code = categories.resolve(name)?;
        if idx == 0 {
            default_group_code = Some(code.to_string());
        }
        push_unique(&mut required, code);
    }

    let mut filters: Vec<(String, HashSet<String>)> = Vec::new();
    for (name, allowed) in &job.filters {
        let code = categories.resolve(name)?;
        push_unique(&mut required, code);
        filters.push((code.to_string(), allowed.iter().cloned().collect()));
    }

    match &job.mode {
        QuestionMode::Plain(questions) => {
            for q in questions {
                push_unique(&mut required, &q.code);
            }
        }
        QuestionMode::Split { question, .. } => {
            push_unique(&mut required, question);
        }
    }

    // The aggregates may only reference indicators this job defines.
    if let Some(aggs) = &job.aggregation {
        let indicator_names: HashSet<&str> = match &job.mode {
            QuestionMode::Plain(questions) => {
                questions.iter().map(|q| q.code.as_str()).collect()
            }
            QuestionMode::Split { values, .. } => values.iter().map(|v| v.as_str()).collect(),
        };
        for agg in aggs {
            for member in &agg.members {
                if !indicator_names.contains(member.as_str()) {
                    return Err(JobError::UnknownAggregationMember {
                        name: agg.name.clone(),
                        member: member.clone(),
                    });
                }
            }
        }
    }

    Ok(ResolvedJob {
        default_group_code,
        filters,
        required_columns: required,
    })
}

// Applies the filters in order, each one keeping the rows whose canonical
// cell value is in the allowed set. Composition is a logical AND, so the
// order does not change the result and re-application is a no-op.
fn apply_filters(
    table: &RespondentTable,
    filters: &[(String, HashSet<String>)],
) -> Result<RespondentTable, JobError> {
    let mut current = table.clone();
    for (code, allowed) in filters {
        let keep: Vec<bool> = current
            .column(code)?
            .iter()
            .map(|cell| allowed.contains(&cell.canonical()))
            .collect();
        current = current.retain_rows(&keep);
    }
    Ok(current)
}

// Turns the answer cells into boolean indicator columns.
fn binarize(table: &RespondentTable, mode: &QuestionMode) -> Result<Indicators, JobError> {
    let rows = table.num_rows();
    match mode {
        QuestionMode::Plain(questions) => {
            let mut names: Vec<String> = Vec::with_capacity(questions.len());
            let mut columns: Vec<Vec<bool>> = Vec::with_capacity(questions.len());
            for q in questions {
                let selected: HashSet<&str> = q.selected.iter().map(String::as_str).collect();
                let column = table
                    .column(&q.code)?
                    .iter()
                    .map(|cell| selected.contains(cell.canonical().as_str()))
                    .collect();
                names.push(q.code.clone());
                columns.push(column);
            }
            Ok(Indicators {
                names,
                columns,
                rows,
            })
        }
        QuestionMode::Split { question, values } => {
            // One shared source column, one indicator per candidate value.
            let rendered: Vec<String> = table
                .column(question)?
                .iter()
                .map(|cell| cell.canonical())
                .collect();
            let columns = values
                .iter()
                .map(|v| rendered.iter().map(|cell| cell == v).collect())
                .collect();
            Ok(Indicators {
                names: values.clone(),
                columns,
                rows,
            })
        }
    }
}

// Replaces the indicator set with the composites: each aggregate is the
// row-wise OR of its members.
fn aggregate(indicators: &Indicators, aggs: &[Aggregate]) -> Result<Indicators, JobError> {
    let by_name: HashMap<&str, usize> = indicators
        .names
        .iter()
        .enumerate()
        .map(|(idx, n)| (n.as_str(), idx))
        .collect();

    let mut names: Vec<String> = Vec::with_capacity(aggs.len());
    let mut columns: Vec<Vec<bool>> = Vec::with_capacity(aggs.len());
    for agg in aggs {
        let mut column = vec![false; indicators.rows];
        for member in &agg.members {
            let idx =
                by_name
                    .get(member.as_str())
                    .ok_or_else(|| JobError::UnknownAggregationMember {
                        name: agg.name.clone(),
                        member: member.clone(),
                    })?;
            for (slot, v) in column.iter_mut().zip(indicators.columns[*idx].iter()) {
                *slot = *slot || *v;
            }
        }
        names.push(agg.name.clone());
        columns.push(column);
    }
    Ok(Indicators {
        names,
        columns,
        rows: indicators.rows,
    })
}

// Distinct values of the grouping column, in first-observed row order.
fn observed_groups(group_col: &[CellValue]) -> Vec<String> {
    let mut seen: HashSet<String> = HashSet::new();
    let mut groups: Vec<String> = Vec::new();
    for cell in group_col {
        let value = cell.canonical();
        if seen.insert(value.clone()) {
            groups.push(value);
        }
    }
    groups
}

// Partitions the rows by group and computes, per group and indicator, the
// fraction of true cells. A group with no rows yields None: the proportion
// is undefined there, never zero.
fn compute_proportions(
    group_col: &[CellValue],
    groups: &[String],
    indicators: &Indicators,
) -> ProportionsTable {
    let rendered: Vec<String> = group_col.iter().map(|cell| cell.canonical()).collect();

    let mut values: Vec<Vec<Option<f64>>> =
        vec![Vec::with_capacity(groups.len()); indicators.names.len()];
    for group in groups {
        let members: Vec<usize> = rendered
            .iter()
            .enumerate()
            .filter_map(|(row, v)| if v == group { Some(row) } else { None })
            .collect();
        for (ci, column) in indicators.columns.iter().enumerate() {
            let cell = if members.is_empty() {
                None
            } else {
                let trues = members.iter().filter(|&&row| column[row]).count();
                Some(trues as f64 / members.len() as f64)
            };
            values[ci].push(cell);
        }
    }

    ProportionsTable {
        output_columns: indicators.names.clone(),
        groups: groups.to_vec(),
        values,
    }
}
