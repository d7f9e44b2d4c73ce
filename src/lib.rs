pub mod buckets;
pub mod cli;
pub mod columns;
pub mod data;
pub mod error;
pub mod io_utils;
pub mod loader;
pub mod queries;
pub mod report;
pub mod results;
pub mod source;
pub mod store;
pub mod table;
pub mod validate;

use std::{
    env, fs,
    io::{self, Write},
    path::Path,
    sync::OnceLock,
};

use anyhow::{Context, Result, bail};
use clap::Parser;
use encoding_rs::UTF_8;
use itertools::Itertools;
use log::{LevelFilter, info, warn};
use serde::Serialize;

pub use crate::error::Error;
use crate::{
    cli::{Cli, Commands, InfoFormat, OutputFormat},
    columns::ColumnInfo,
    loader::LoadOptions,
    results::{Cell, ResultSet},
    store::Store,
};

static LOGGER: OnceLock<()> = OnceLock::new();

fn init_logging() {
    LOGGER.get_or_init(|| {
        let mut builder = env_logger::Builder::from_env(env_logger::Env::default());
        if env::var("RUST_LOG").is_err() {
            builder.filter_module("superstore_analytics", LevelFilter::Info);
        }
        let _ = builder.format_timestamp_millis().try_init();
    });
}

pub fn run() -> Result<()> {
    init_logging();
    let cli = Cli::parse();
    match cli.command {
        Commands::Load(args) => handle_load(&args),
        Commands::Validate(args) => handle_validate(&args),
        Commands::Info(args) => handle_info(&args),
        Commands::Catalog => handle_catalog(),
        Commands::Query(args) => handle_query(&args),
        Commands::Report(args) => handle_report(&args),
    }
}

fn handle_load(args: &cli::LoadArgs) -> Result<()> {
    let encoding = io_utils::resolve_encoding(&args.input_encoding)?;
    let delimiter = io_utils::resolve_input_delimiter(&args.input, args.delimiter);
    info!(
        "Loading '{}' ({}, delimiter '{}') into {:?}",
        args.input.display(),
        encoding.name(),
        printable_delimiter(delimiter),
        args.db
    );
    let mut store = Store::open(&args.db).with_context(|| format!("Opening database {:?}", args.db))?;
    let mut options = LoadOptions::new(&args.input, encoding);
    options.schema_script = args.schema.as_deref();
    options.delimiter = Some(delimiter);
    options.strict = args.strict;
    let summary = loader::load(&mut store, &options)
        .with_context(|| format!("Loading {:?} into {:?}", args.input, args.db))?;
    store.close().with_context(|| format!("Closing database {:?}", args.db))?;
    println!(
        "Loaded {} row(s) x {} column(s) into {}",
        summary.row_count,
        summary.columns.len(),
        args.db.display()
    );
    if !summary.validation.is_clean() {
        println!("Validation issues: {}", summary.validation.summary());
    }
    Ok(())
}

fn handle_validate(args: &cli::ValidateArgs) -> Result<()> {
    let encoding = io_utils::resolve_encoding(&args.input_encoding)?;
    let delimiter = io_utils::resolve_input_delimiter(&args.input, args.delimiter);
    info!(
        "Validating '{}' with delimiter '{}'",
        args.input.display(),
        printable_delimiter(delimiter)
    );
    let schema = args.schema.as_deref();
    let report = validate::validate_source(&args.input, delimiter, encoding, schema)
        .with_context(|| format!("Validating {:?}", args.input))?;
    report.log();
    if report.is_clean() {
        println!("{} row(s) checked, no issues found", report.rows_checked);
        return Ok(());
    }
    let headers = ["rule", "rows", "first_row", "first_value"].map(String::from);
    let rows = report
        .issues
        .iter()
        .map(|(rule, tally)| {
            vec![
                rule.to_string(),
                tally.count.to_string(),
                tally.first_row.to_string(),
                tally.first_value.clone(),
            ]
        })
        .collect::<Vec<_>>();
    let aligns = [
        table::Align::Left,
        table::Align::Right,
        table::Align::Right,
        table::Align::Left,
    ];
    print!("{}", table::render_table(&headers, &rows, &aligns));
    report
        .into_result()
        .map(|_| ())
        .with_context(|| format!("Validating {:?}", args.input))
}

#[derive(Serialize)]
struct StoreInfo {
    database: String,
    row_count: u64,
    columns: Vec<ColumnInfo>,
    indexes: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    sample: Option<serde_json::Value>,
}

fn handle_info(args: &cli::InfoArgs) -> Result<()> {
    let store = open_store(&args.db)?;
    let row_count = store.ensure_ready()?;
    let sample = if args.sample > 0 {
        Some(store.sample(args.sample)?)
    } else {
        None
    };
    let info = StoreInfo {
        database: store.location().to_string(),
        row_count,
        columns: store.manifest()?,
        indexes: store.index_names()?,
        sample: sample.as_ref().map(ResultSet::to_json_records),
    };
    match args.format {
        InfoFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&info)?);
        }
        InfoFormat::Table => {
            println!("Database: {}", info.database);
            println!("Rows: {}", info.row_count);
            println!("Indexes: {}", info.indexes.iter().join(", "));
            let manifest = ResultSet {
                name: "columns".to_string(),
                columns: vec!["column".to_string(), "declared_type".to_string()],
                rows: info
                    .columns
                    .iter()
                    .map(|c| vec![Cell::Text(c.name.clone()), Cell::Text(c.declared_type.clone())])
                    .collect(),
            };
            println!();
            table::print_result(&manifest);
            if let Some(sample) = &sample {
                println!();
                table::print_result(sample);
            }
        }
    }
    Ok(())
}

fn handle_catalog() -> Result<()> {
    let headers = ["name", "section", "title"].map(String::from);
    let rows = queries::catalog()
        .iter()
        .map(|q| vec![q.name.to_string(), q.section.to_string(), q.title.to_string()])
        .collect::<Vec<_>>();
    print!("{}", table::render_table(&headers, &rows, &[]));
    Ok(())
}

fn handle_query(args: &cli::QueryArgs) -> Result<()> {
    let query = queries::find(&args.name)?;
    let store = open_store(&args.db)?;
    info!("Running query '{}' against {:?}", query.name, args.db);
    let result =
        queries::run(&store, query.name).with_context(|| format!("Running query '{}'", query.name))?;
    let output = args.output.as_deref();
    match args.format {
        OutputFormat::Csv => {
            let encoding = io_utils::resolve_encoding(&args.output_encoding)?;
            let mut writer = io_utils::open_csv_writer(output, encoding)?;
            result
                .write_csv(&mut writer)
                .with_context(|| format!("Writing CSV for '{}'", query.name))?;
        }
        OutputFormat::Json => {
            let text = serde_json::to_string_pretty(&result.to_json_records())?;
            write_text(output, &format!("{text}\n"))?;
        }
        OutputFormat::Table => {
            if !is_utf8_label(&args.output_encoding) {
                warn!("--output-encoding only applies to CSV output");
            }
            write_text(output, &table::render_result(&result))?;
        }
    }
    if let Some(path) = output {
        info!("Wrote {} row(s) to {:?}", result.len(), path);
    }
    Ok(())
}

fn handle_report(args: &cli::ReportArgs) -> Result<()> {
    let store = open_store(&args.db)?;
    let sections = args.section.sections();
    let report = report::run_sections(&store, &sections)?;
    let mut current = None;
    for entry in &report.entries {
        if current != Some(entry.query.section) {
            current = Some(entry.query.section);
            println!("# {}", entry.query.section);
            println!();
        }
        println!("## {} ({})", entry.query.title, entry.query.name);
        match &entry.outcome {
            Ok(result) => table::print_result(result),
            Err(err) => println!("failed: {err}"),
        }
        println!();
    }
    let failures = report.failures();
    if failures > 0 {
        bail!(
            "{failures} of {} report query(ies) failed",
            report.entries.len()
        );
    }
    info!("Report complete: {} query(ies)", report.entries.len());
    Ok(())
}

fn open_store(path: &Path) -> Result<Store> {
    Store::open_existing(path).with_context(|| format!("Opening database {path:?}"))
}

fn write_text(output: Option<&Path>, text: &str) -> Result<()> {
    match output {
        Some(path) if !io_utils::is_dash(path) => {
            fs::write(path, text).with_context(|| format!("Writing output file {path:?}"))
        }
        _ => {
            let mut stdout = io::stdout().lock();
            stdout.write_all(text.as_bytes())?;
            stdout.flush()?;
            Ok(())
        }
    }
}

fn is_utf8_label(label: &str) -> bool {
    io_utils::resolve_encoding(label).is_ok_and(|encoding| encoding == UTF_8)
}

pub(crate) fn printable_delimiter(delimiter: u8) -> String {
    match delimiter {
        b',' => ",".to_string(),
        b'\t' => "\\t".to_string(),
        other => (other as char).to_string(),
    }
}
