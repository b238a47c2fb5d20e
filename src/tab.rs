use log::{info, warn};

use survey_proportions::*;

use snafu::{prelude::*, Snafu};

use std::fs;
use std::path::{Path, PathBuf};

use serde_json::json;
use serde_json::Value as JSValue;
use text_diff::print_diff;

pub mod config_reader;
pub mod io_common;
pub mod io_csv;
pub mod io_excel;

use crate::tab::config_reader::*;

#[derive(Debug, Snafu)]
pub enum TabError {
    #[snafu(display("Error opening Excel file {path}"))]
    OpeningExcel {
        source: calamine::XlsxError,
        path: String,
    },
    #[snafu(display("The Excel file has no usable worksheet"))]
    EmptyExcel {},
    #[snafu(display("Error opening {path}"))]
    OpeningJson {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Error parsing JSON"))]
    ParsingJson { source: serde_json::Error },
    #[snafu(display("Error opening CSV file {path}"))]
    CsvOpen { source: csv::Error, path: String },
    #[snafu(display("Error reading a CSV record"))]
    CsvLineParse { source: csv::Error },
    #[snafu(display("Line {lineno} does not match the header width"))]
    CsvLineTooShort { lineno: usize },
    #[snafu(display("Cell at line {lineno} has an unsupported type: {content}"))]
    CellWrongType { lineno: u64, content: String },
    #[snafu(display("The data sources do not produce a well-formed table"))]
    TableShape { source: JobError },
    #[snafu(display("Job {job} failed: {source}"))]
    Job { source: JobError, job: String },
    #[snafu(display("The configuration path has no parent directory"))]
    MissingParentDir {},
    #[snafu(display("Error writing the summary to {path}"))]
    WritingOutput {
        source: std::io::Error,
        path: String,
    },

    #[snafu(whatever, display("{message}"))]
    Whatever {
        message: String,
        #[snafu(source(from(Box<dyn std::error::Error>, Some)))]
        source: Option<Box<dyn std::error::Error>>,
    },
}

pub type TabResult<T> = Result<T, TabError>;

/// One data file as parsed by the readers, before the respondent table is
/// assembled.
#[derive(PartialEq, Debug, Clone)]
pub struct ParsedSheet {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<CellValue>>,
}

/// Reads all the data sources and assembles them into one respondent
/// table. Several sources append row-wise and must agree on the header.
fn load_table(root_path: String, sources: &[FileSource]) -> TabResult<RespondentTable> {
    let mut sheets: Vec<ParsedSheet> = Vec::new();
    for source in sources {
        let p: PathBuf = [root_path.clone(), source.file_path.clone()].iter().collect();
        let p2 = p.as_path().display().to_string();
        info!("Attempting to read data file {:?}", p2);
        let sheet = match source.provider.as_str() {
            "excel" => io_excel::read_excel_sheet(p2, source.excel_worksheet_name.clone()),
            "csv" => io_csv::read_csv_sheet(p2),
            x => whatever!("Provider not implemented {:?}", x),
        }?;
        sheets.push(sheet);
    }

    let first = match sheets.first() {
        Some(sheet) => sheet.clone(),
        None => whatever!(
            "No data source: provide fileSources in the configuration or use --data"
        ),
    };
    let mut builder = TableBuilder::new(&first.columns).context(TableShapeSnafu {})?;
    for sheet in &sheets {
        if sheet.columns != first.columns {
            whatever!(
                "Data sources disagree on the header: {:?} vs {:?}",
                first.columns,
                sheet.columns
            );
        }
        for row in &sheet.rows {
            builder.push_row(row.clone()).context(TableShapeSnafu {})?;
        }
    }
    let table = builder.build();
    info!(
        "Loaded {} rows, {} columns from {} source(s)",
        table.num_rows(),
        table.column_codes().len(),
        sources.len()
    );
    Ok(table)
}

fn melted_to_json(rows: &[MeltedRow]) -> Vec<JSValue> {
    rows.iter()
        .map(|r| {
            let value = match r.value {
                Some(v) => json!(v),
                // An empty group: the proportion is undefined.
                None => JSValue::Null,
            };
            json!({"index": r.index, "variable": r.variable, "value": value})
        })
        .collect()
}

fn job_summary_js(name: &str, result: &AnalysisResult) -> JSValue {
    let mut js = json!({
        "name": name,
        "results": melted_to_json(&result.melted),
    });
    if let Some(labels) = &result.labels {
        js["labels"] = json!({
            "title": labels.title,
            "xlabel": labels.xlabel,
            "ylabel": labels.ylabel,
        });
    }
    js
}

fn build_summary_js(results: &[(String, AnalysisResult)]) -> JSValue {
    let jobs: Vec<JSValue> = results
        .iter()
        .map(|(name, result)| job_summary_js(name, result))
        .collect();
    json!({ "jobs": jobs })
}

/// Runs the full batch: read the configuration, load the table, run every
/// job in order and emit the JSON summary.
pub fn run_tabulation(
    config_path: String,
    data: Option<String>,
    excel_worksheet_name: Option<String>,
    out: Option<String>,
    reference: Option<String>,
) -> TabResult<()> {
    let config = read_config(config_path.clone())?;
    info!(
        "config: {} file source(s), {} job(s)",
        config.file_sources.len(),
        config.jobs.len()
    );

    // --data overrides the configured sources; the provider is inferred
    // from the extension.
    let (root_path, sources) = match data {
        Some(path) => {
            let provider = if path.ends_with(".xlsx") { "excel" } else { "csv" };
            let source = FileSource {
                provider: provider.to_string(),
                file_path: path,
                excel_worksheet_name: excel_worksheet_name.clone(),
            };
            (".".to_string(), vec![source])
        }
        None => {
            let config_p = Path::new(config_path.as_str());
            let root_p = config_p.parent().context(MissingParentDirSnafu {})?;
            (
                root_p.as_os_str().to_string_lossy().to_string(),
                config.file_sources.clone(),
            )
        }
    };

    let table = load_table(root_path, &sources)?;
    let categories = CategoryMap::new(config.metadata.categories.clone());

    let mut results: Vec<(String, AnalysisResult)> = Vec::new();
    for jc in &config.jobs {
        info!("Running job {}", jc.name);
        let spec = validate_job(jc)?;
        let result = run_job(&table, &categories, &spec).context(JobSnafu {
            job: jc.name.clone(),
        })?;
        results.push((jc.name.clone(), result));
    }

    let summary = build_summary_js(&results);
    let pretty_js_summary = serde_json::to_string_pretty(&summary).context(ParsingJsonSnafu {})?;
    match out {
        Some(path) if path != "stdout" => {
            fs::write(&path, &pretty_js_summary).context(WritingOutputSnafu { path })?;
        }
        _ => println!("{}", pretty_js_summary),
    }

    // The reference summary, if provided for comparison
    if let Some(reference_p) = reference {
        let reference_js = read_reference(reference_p)?;
        let pretty_js_reference =
            serde_json::to_string_pretty(&reference_js).context(ParsingJsonSnafu {})?;
        if pretty_js_reference != pretty_js_summary {
            warn!("Found differences with the reference summary");
            print_diff(
                pretty_js_reference.as_str(),
                pretty_js_summary.as_ref(),
                "\n",
            );
            whatever!("Difference detected between calculated summary and reference summary")
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_table() -> RespondentTable {
        let mut builder =
            TableBuilder::new(&["REGION9", "agegen", "q1", "q2"]).unwrap();
        let rows = [
            ["East", "Gen X", "yes", "no"],
            ["East", "Gen X", "no", "no"],
            ["East", "Boomer", "yes", "yes"],
            ["West", "Boomer", "yes", "yes"],
        ];
        for row in rows {
            builder
                .push_row(row.iter().map(|s| CellValue::Text(s.to_string())).collect())
                .unwrap();
        }
        builder.build()
    }

    const JOB_JSON: &str = r#"
    {
      "metadata": {
        "categories": { "generation": "agegen", "region_small": "REGION9" }
      },
      "jobs": [
        {
          "name": "activities",
          "categories": ["generation"],
          "filters": { "region_small": ["East"] },
          "questions": [
            { "code": "q1", "selected": ["yes"] },
            { "code": "q2", "selected": ["yes"] }
          ],
          "aggregation": [
            { "name": "Either", "members": ["q1", "q2"] }
          ],
          "sortOrder": ["Boomer", "Gen X"],
          "labels": { "title": "Activities", "ylabel": "Proportion Responding Yes" }
        }
      ]
    }
    "#;

    #[test]
    fn config_round_trip_and_run() {
        let config: TabConfig = serde_json::from_str(JOB_JSON).unwrap();
        assert_eq!(config.jobs.len(), 1);

        let spec = validate_job(&config.jobs[0]).unwrap();
        let categories = CategoryMap::new(config.metadata.categories.clone());
        let result = run_job(&small_table(), &categories, &spec).unwrap();

        // Aggregation replaces the question codes; the West rows are
        // filtered out; sortOrder puts Boomer first.
        assert_eq!(
            result.proportions.output_columns,
            vec!["Either".to_string()]
        );
        assert_eq!(
            result
                .melted
                .iter()
                .map(|r| r.variable.as_str())
                .collect::<Vec<_>>(),
            vec!["Boomer", "Gen X"]
        );
        assert_eq!(result.melted[0].value, Some(1.0));
        assert_eq!(result.melted[1].value, Some(0.5));
        assert_eq!(
            result.labels.as_ref().unwrap().title.as_deref(),
            Some("Activities")
        );
    }

    #[test]
    fn job_must_pick_exactly_one_mode() {
        let config: TabConfig = serde_json::from_str(JOB_JSON).unwrap();
        let mut both = config.jobs[0].clone();
        both.split_question = Some(SplitConfig {
            question: "q1".to_string(),
            values: vec!["yes".to_string()],
        });
        assert!(validate_job(&both).is_err());

        let mut neither = config.jobs[0].clone();
        neither.questions = None;
        assert!(validate_job(&neither).is_err());
    }

    #[test]
    fn split_job_from_json() {
        let js = r#"
        {
          "name": "importance",
          "categories": ["generation"],
          "splitQuestion": { "question": "q1", "values": ["yes", "no"] }
        }
        "#;
        let jc: JobConfig = serde_json::from_str(js).unwrap();
        let spec = validate_job(&jc).unwrap();
        let categories =
            CategoryMap::new([("generation".to_string(), "agegen".to_string())]);
        let result = run_job(&small_table(), &categories, &spec).unwrap();
        assert_eq!(
            result.proportions.output_columns,
            vec!["yes".to_string(), "no".to_string()]
        );
    }

    #[test]
    fn summary_uses_null_for_undefined_proportions() {
        let result = AnalysisResult {
            proportions: ProportionsTable {
                output_columns: vec!["q1".to_string()],
                groups: vec!["S".to_string()],
                values: vec![vec![None]],
            },
            melted: vec![MeltedRow {
                index: "q1".to_string(),
                variable: "S".to_string(),
                value: None,
            }],
            labels: None,
        };
        let js = job_summary_js("empty", &result);
        assert_eq!(js["results"][0]["value"], JSValue::Null);
        assert_eq!(js["results"][0]["index"], json!("q1"));
    }

    #[test]
    fn csv_reader_handles_missing_cells() {
        let dir = std::env::temp_dir().join("svytab_test_csv");
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join("small.csv");
        fs::write(&path, "region,q1\nN,yes\nS,\n").unwrap();

        let sheet = io_csv::read_csv_sheet(path.display().to_string()).unwrap();
        assert_eq!(
            sheet.columns,
            vec!["region".to_string(), "q1".to_string()]
        );
        assert_eq!(sheet.rows.len(), 2);
        assert_eq!(sheet.rows[1][1], CellValue::Missing);
    }

    #[test]
    fn sources_must_share_the_header() {
        let dir = std::env::temp_dir().join("svytab_test_sources");
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("a.csv"), "region,q1\nN,yes\n").unwrap();
        fs::write(dir.join("b.csv"), "region,q2\nS,no\n").unwrap();

        let source = |name: &str| FileSource {
            provider: "csv".to_string(),
            file_path: name.to_string(),
            excel_worksheet_name: None,
        };

        let root = dir.display().to_string();
        let table =
            load_table(root.clone(), &[source("a.csv"), source("a.csv")]).unwrap();
        assert_eq!(table.num_rows(), 2);

        let err = load_table(root, &[source("a.csv"), source("b.csv")]).unwrap_err();
        assert!(format!("{}", err).contains("header"));
    }
}
