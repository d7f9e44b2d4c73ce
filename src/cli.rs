use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::queries::Section;

pub const DEFAULT_DB_PATH: &str = "database/superstore.db";

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Load the Superstore sales extract into SQLite and run the analytics catalog",
    long_about = None
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Replace the superstore table with the contents of a CSV extract
    Load(LoadArgs),
    /// Check a CSV extract for data quality issues without loading it
    Validate(ValidateArgs),
    /// Show row count, column manifest and indexes of a loaded database
    Info(InfoArgs),
    /// List the available queries grouped by section
    Catalog,
    /// Run one catalog query
    Query(QueryArgs),
    /// Run every query of a section (or all sections) as formatted tables
    Report(ReportArgs),
}

#[derive(Debug, Args)]
pub struct LoadArgs {
    /// Source CSV file
    #[arg(short = 'i', long = "input")]
    pub input: PathBuf,
    /// SQLite database to (re)create the table in
    #[arg(long, default_value = DEFAULT_DB_PATH)]
    pub db: PathBuf,
    /// DDL script creating the superstore table (types inferred when omitted)
    #[arg(long)]
    pub schema: Option<PathBuf>,
    /// CSV delimiter character (supports ',', 'tab', ';', '|')
    #[arg(long, value_parser = parse_delimiter)]
    pub delimiter: Option<u8>,
    /// Character encoding of the input file
    #[arg(long = "input-encoding", default_value = crate::io_utils::DEFAULT_SOURCE_ENCODING)]
    pub input_encoding: String,
    /// Abort the load when any row fails validation
    #[arg(long)]
    pub strict: bool,
}

#[derive(Debug, Args)]
pub struct ValidateArgs {
    /// Source CSV file
    #[arg(short = 'i', long = "input")]
    pub input: PathBuf,
    /// DDL script declaring the column types to check against
    #[arg(long)]
    pub schema: Option<PathBuf>,
    /// CSV delimiter character (supports ',', 'tab', ';', '|')
    #[arg(long, value_parser = parse_delimiter)]
    pub delimiter: Option<u8>,
    /// Character encoding of the input file
    #[arg(long = "input-encoding", default_value = crate::io_utils::DEFAULT_SOURCE_ENCODING)]
    pub input_encoding: String,
}

#[derive(Debug, Args)]
pub struct InfoArgs {
    /// SQLite database produced by the load command
    #[arg(long, default_value = DEFAULT_DB_PATH)]
    pub db: PathBuf,
    /// Number of sample rows to display
    #[arg(long, default_value_t = 0)]
    pub sample: usize,
    /// Output format
    #[arg(long, value_enum, default_value_t = InfoFormat::Table)]
    pub format: InfoFormat,
}

#[derive(Debug, Args)]
pub struct QueryArgs {
    /// Catalog query name (see the catalog command)
    pub name: String,
    /// SQLite database produced by the load command
    #[arg(long, default_value = DEFAULT_DB_PATH)]
    pub db: PathBuf,
    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
    pub format: OutputFormat,
    /// Output file (stdout if omitted)
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,
    /// Character encoding for CSV output
    #[arg(long = "output-encoding", default_value = "utf-8")]
    pub output_encoding: String,
}

#[derive(Debug, Args)]
pub struct ReportArgs {
    /// SQLite database produced by the load command
    #[arg(long, default_value = DEFAULT_DB_PATH)]
    pub db: PathBuf,
    /// Section to run
    #[arg(long, value_enum, default_value_t = SectionArg::All)]
    pub section: SectionArg,
}

#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
#[value(rename_all = "kebab-case")]
pub enum OutputFormat {
    Table,
    Csv,
    Json,
}

#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
#[value(rename_all = "kebab-case")]
pub enum InfoFormat {
    Table,
    Json,
}

#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
#[value(rename_all = "kebab-case")]
pub enum SectionArg {
    Business,
    Customers,
    Products,
    Discounts,
    Seasonality,
    Cohorts,
    All,
}

impl SectionArg {
    pub fn sections(self) -> Vec<Section> {
        match self {
            SectionArg::Business => vec![Section::Business],
            SectionArg::Customers => vec![Section::Customers],
            SectionArg::Products => vec![Section::Products],
            SectionArg::Discounts => vec![Section::Discounts],
            SectionArg::Seasonality => vec![Section::Seasonality],
            SectionArg::Cohorts => vec![Section::Cohorts],
            SectionArg::All => Section::ALL.to_vec(),
        }
    }
}

pub fn parse_delimiter(value: &str) -> Result<u8, String> {
    match value {
        "tab" | "\t" => Ok(b'\t'),
        "comma" | "," => Ok(b','),
        "|" | "pipe" => Ok(b'|'),
        ";" | "semicolon" => Ok(b';'),
        other => {
            let mut chars = other.chars();
            let first = chars
                .next()
                .ok_or_else(|| "Delimiter cannot be empty".to_string())?;
            if chars.next().is_some() {
                return Err("Delimiter must be a single character".to_string());
            }
            if !first.is_ascii() {
                return Err("Delimiter must be ASCII".to_string());
            }
            Ok(first as u8)
        }
    }
}
