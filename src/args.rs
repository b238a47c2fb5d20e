use clap::Parser;

/// This is a survey proportions tabulation program.
#[derive(Parser, Debug, Clone)]
#[clap(author, version, about, long_about = None)]
pub struct Args {
    /// (file path) The JSON file describing the category metadata, the data sources and the batch
    /// of analysis jobs. For more information about the file format, read the documentation.
    #[clap(short, long, value_parser)]
    pub config: String,

    /// (file path) A reference file containing a previously computed summary in JSON format. If
    /// provided, svytab will check that the tabulated output matches the reference.
    #[clap(short, long, value_parser)]
    pub reference: Option<String>,

    /// (file path, 'stdout' or empty) If specified, the summary of all the jobs will be written
    /// in JSON format to the given location instead of the standard output.
    #[clap(short, long, value_parser)]
    pub out: Option<String>,

    /// (file path or empty) If specified, overrides the data sources listed in the configuration
    /// file. The format is inferred from the extension (.xlsx for Excel, anything else for CSV).
    #[clap(short, long, value_parser)]
    pub data: Option<String>,

    /// (default first worksheet) When using an Excel file, indicates the name of the worksheet
    /// to use.
    #[clap(long, value_parser)]
    pub excel_worksheet_name: Option<String>,

    // Other arguments
    /// If passed as an argument, will turn on verbose logging to the standard output.
    #[clap(long, takes_value = false)]
    pub verbose: bool,
}
