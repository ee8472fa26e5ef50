use clap::{Parser, Subcommand};

/// Conversion and reporting tools for research-proposal spreadsheets.
#[derive(Parser, Debug, Clone)]
#[clap(author, version, about, long_about = None)]
pub struct Args {
    /// (file path, optional) A JSON configuration file. The options given on the command line
    /// override the values of this file.
    #[clap(short, long, value_parser, global = true)]
    pub config: Option<String>,

    /// If passed as an argument, will turn on verbose logging to the standard output.
    #[clap(long, takes_value = false, global = true)]
    pub verbose: bool,

    #[clap(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Converts the proposal spreadsheet to a TSV file with one row per proposal.
    Convert(ConvertArgs),
    /// Lists the distinct themes (or any other category column) of a TSV file.
    Themes(ThemesArgs),
    /// Sums the total funding of every sponsor of a TSV file.
    Sponsors(SponsorsArgs),
}

#[derive(clap::Args, Debug, Clone)]
pub struct ConvertArgs {
    /// (file path) The spreadsheet or TSV file with one row per author.
    #[clap(short, long, value_parser)]
    pub input: Option<String>,

    /// (file path) Where the TSV file is written.
    #[clap(short, long, value_parser)]
    pub out: Option<String>,

    /// (xlsx, tsv or csv) The type of the input. By default it is guessed from the file extension.
    #[clap(long, value_parser)]
    pub input_type: Option<String>,

    /// (default: first worksheet) When using an Excel file, indicates the name of the worksheet to use.
    #[clap(long, value_parser)]
    pub excel_worksheet_name: Option<String>,

    /// Keeps one row per author instead of one row per proposal. The author names are still formatted.
    #[clap(long, takes_value = false)]
    pub no_aggregate: bool,

    /// Sorts the proposals by number instead of keeping the order of the input.
    #[clap(long, takes_value = false)]
    pub sorted: bool,

    /// (file path) A reference TSV file. If provided, the output is compared to it and any
    /// difference is reported as an error.
    #[clap(short, long, value_parser)]
    pub reference: Option<String>,
}

#[derive(clap::Args, Debug, Clone)]
pub struct ThemesArgs {
    /// (file path) The TSV file to read.
    #[clap(long, value_parser, default_value = "data/publication.tsv")]
    pub file: String,

    /// Applies normalization to the themes (whitespace, separators, capitalization).
    #[clap(long, takes_value = false)]
    pub normalize: bool,

    /// Outputs JSON instead of a plain list.
    #[clap(long, takes_value = false)]
    pub json: bool,

    /// Outputs mapping-style lines for the color map: `"Theme": "#hex"` when a color is known.
    #[clap(long, takes_value = false)]
    pub map_lines: bool,

    /// The name of the category column.
    #[clap(long, value_parser, default_value = "theme")]
    pub column: String,

    /// (file path) The JSON color map. Missing files are ignored.
    #[clap(long, value_parser)]
    pub colors: Option<String>,
}

#[derive(clap::Args, Debug, Clone)]
pub struct SponsorsArgs {
    /// (file path) The TSV file to read.
    #[clap(long, value_parser, default_value = "data/publication.tsv")]
    pub file: String,

    /// (file path) Where the CSV report is written.
    #[clap(short, long, value_parser, default_value = "sponsor_totals.csv")]
    pub out: String,
}
