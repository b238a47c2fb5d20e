/*!

This is the long-form manual for `survey_proportions` and `svytab`.

## What it computes

Given a table of survey responses and a declarative job, the pipeline
produces one proportion per (output column, group) pair: the fraction of
respondents in that group whose answer counts as "selected". The result is
also reshaped into a tidy (long) table with `index` / `variable` / `value`
fields, ready for a generic bar-chart layer.

The stages, in order:

1. the category names of the job are resolved to column codes;
2. the table is narrowed to the columns the job needs;
3. the rows are filtered (every filter must match, logical AND);
4. the answer cells are turned into boolean indicators, either one per
   question (plain mode) or one per candidate value of a single question
   (split mode);
5. optionally, indicators are OR-combined into named aggregates;
6. rows are grouped by a category and the per-group proportions computed;
7. the wide table is melted and, optionally, partitioned into an explicit
   group order.

A group with no rows yields an undefined proportion (`null` in the JSON
output), never a zero and never an error: a batch of many jobs does not
abort because one group is empty.

## Input formats

The following input formats are supported by `svytab`:
* `csv` Comma Separated Values, first row holding the column codes.
* `excel` Excel spreadsheets (.xlsx), first row holding the column codes.

All cells are compared by their canonical string form: whole numbers render
without a fractional part (`3`, not `3.0`), empty cells render as the
`<missing>` sentinel.

## Configuration

`svytab` accepts a JSON file describing the category metadata, the data
sources and an ordered batch of jobs:

```text
{
  "metadata": {
    "categories": { "generation": "agegen", "region_small": "REGION9" }
  },
  "fileSources": [
    { "provider": "excel", "filePath": "wave1.xlsx", "excelWorksheetName": "Data" }
  ],
  "jobs": [
    {
      "name": "activities_2019",
      "categories": ["generation"],
      "filters": { "region_small": ["East North Central"] },
      "questions": [
        { "code": "q7_1", "selected": ["Art museum"] },
        { "code": "q7_18", "selected": ["Play (non-musical)"] },
        { "code": "q7_19", "selected": ["Musical"] }
      ],
      "aggregation": [
        { "name": "ArtMuseum", "members": ["q7_1"] },
        { "name": "Theater", "members": ["q7_18", "q7_19"] }
      ],
      "sortOrder": ["Boomers (1946-64)", "Gen X (1965-80)", "Millennials (1981-96)"],
      "labels": {
        "title": "Did you do any of the following activities last year?",
        "xlabel": "Activity",
        "ylabel": "Proportion Responding Yes"
      }
    }
  ]
}
```

Notes on the schema:

- `questions` and `aggregation` are arrays, not objects: their declaration
  order defines the order of the output columns.
- a job carries either `questions` (plain mode) or `splitQuestion` (split
  mode), never both. Split mode looks as follows:

```text
{
  "name": "importance",
  "categories": ["generation"],
  "splitQuestion": { "question": "q17", "values": ["1", "2", "3", "4", "5"] },
  "sortOrder": ["Boomers (1946-64)", "Gen X (1965-80)"]
}
```

- `sortOrder` lists the groups of the melted output in the order the chart
  should show them. Groups not listed are dropped; this mirrors the
  charting pipeline this tool feeds.
- `labels` is passed through untouched for the chart-rendering side.

## Library use

The pipeline is available without the CLI through [crate::run_job]:

```
use survey_proportions::*;

let mut builder = TableBuilder::new(&["region".to_string(), "q1".to_string()])?;
builder.push_row(vec![
    CellValue::Text("N".to_string()),
    CellValue::Text("yes".to_string()),
])?;
builder.push_row(vec![
    CellValue::Text("S".to_string()),
    CellValue::Text("no".to_string()),
])?;
let table = builder.build();

let categories = CategoryMap::new([("region".to_string(), "region".to_string())]);
let job = JobSpec {
    categories: vec!["region".to_string()],
    filters: vec![],
    mode: QuestionMode::Plain(vec![Question {
        code: "q1".to_string(),
        selected: vec!["yes".to_string()],
    }]),
    aggregation: None,
    sort_order: None,
    labels: None,
};

let result = run_job(&table, &categories, &job)?;
assert_eq!(result.proportions.groups, vec!["N".to_string(), "S".to_string()]);
# Ok::<(), JobError>(())
```

*/
