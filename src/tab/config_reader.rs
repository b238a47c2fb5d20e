use crate::tab::*;

use log::debug;
use serde::{Deserialize, Serialize};
use snafu::prelude::*;
use serde_json::Value as JSValue;
use std::collections::HashMap;
use std::fs;

use survey_proportions::{Aggregate, JobSpec, Labels, Question, QuestionMode};

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct Metadata {
    /// Category name -> column code in the respondent table.
    pub categories: HashMap<String, String>,
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct FileSource {
    /// One of "csv" or "excel".
    pub provider: String,
    #[serde(rename = "filePath")]
    pub file_path: String,
    #[serde(rename = "excelWorksheetName")]
    pub excel_worksheet_name: Option<String>,
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct QuestionConfig {
    pub code: String,
    pub selected: Vec<String>,
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct SplitConfig {
    pub question: String,
    pub values: Vec<String>,
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct AggregateConfig {
    pub name: String,
    pub members: Vec<String>,
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct LabelsConfig {
    pub title: Option<String>,
    pub xlabel: Option<String>,
    pub ylabel: Option<String>,
}

// `questions` and `aggregation` are arrays rather than JSON objects: their
// declaration order defines the output-column order and the order of keys
// in a JSON object is not contractual.
#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct JobConfig {
    pub name: String,
    pub categories: Vec<String>,
    #[serde(default)]
    pub filters: HashMap<String, Vec<String>>,
    pub questions: Option<Vec<QuestionConfig>>,
    #[serde(rename = "splitQuestion")]
    pub split_question: Option<SplitConfig>,
    pub aggregation: Option<Vec<AggregateConfig>>,
    #[serde(rename = "sortOrder")]
    pub sort_order: Option<Vec<String>>,
    pub labels: Option<LabelsConfig>,
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct TabConfig {
    pub metadata: Metadata,
    #[serde(rename = "fileSources", default)]
    pub file_sources: Vec<FileSource>,
    pub jobs: Vec<JobConfig>,
}

pub fn read_config(path: String) -> TabResult<TabConfig> {
    let contents =
        fs::read_to_string(path.clone()).context(OpeningJsonSnafu { path: path.clone() })?;
    let config: TabConfig =
        serde_json::from_str(contents.as_str()).context(ParsingJsonSnafu {})?;
    debug!("read_config: {:?}", config);
    Ok(config)
}

/// The reference summary, as stored by a previous run with --out.
pub fn read_reference(path: String) -> TabResult<JSValue> {
    let contents = fs::read_to_string(path.clone()).context(OpeningJsonSnafu { path })?;
    let js: JSValue = serde_json::from_str(contents.as_str()).context(ParsingJsonSnafu {})?;
    Ok(js)
}

/// Converts the permissive JSON shape of a job into the typed [JobSpec].
///
/// A job carries either `questions` (plain mode) or `splitQuestion` (split
/// mode); anything else is rejected here, before any data is read.
pub fn validate_job(jc: &JobConfig) -> TabResult<JobSpec> {
    let mode = match (&jc.questions, &jc.split_question) {
        (Some(questions), None) => QuestionMode::Plain(
            questions
                .iter()
                .map(|q| Question {
                    code: q.code.clone(),
                    selected: q.selected.clone(),
                })
                .collect(),
        ),
        (None, Some(split)) => QuestionMode::Split {
            question: split.question.clone(),
            values: split.values.clone(),
        },
        (Some(_), Some(_)) => {
            whatever!(
                "job {}: 'questions' and 'splitQuestion' are mutually exclusive",
                jc.name
            )
        }
        (None, None) => {
            whatever!(
                "job {}: one of 'questions' or 'splitQuestion' is required",
                jc.name
            )
        }
    };

    // Filter composition is commutative; apply in sorted key order so the
    // logs and the projected column order are reproducible.
    let mut filters: Vec<(String, Vec<String>)> = jc
        .filters
        .iter()
        .map(|(name, allowed)| (name.clone(), allowed.clone()))
        .collect();
    filters.sort_by(|a, b| a.0.cmp(&b.0));

    let aggregation = jc.aggregation.as_ref().map(|aggs| {
        aggs.iter()
            .map(|a| Aggregate {
                name: a.name.clone(),
                members: a.members.clone(),
            })
            .collect()
    });

    let labels = jc.labels.as_ref().map(|l| Labels {
        title: l.title.clone(),
        xlabel: l.xlabel.clone(),
        ylabel: l.ylabel.clone(),
    });

    Ok(JobSpec {
        categories: jc.categories.clone(),
        filters,
        mode,
        aggregation,
        sort_order: jc.sort_order.clone(),
        labels,
    })
}
