//! Materializes a source extract as the `superstore` table.
//!
//! A load is drop-and-recreate: inside one transaction the previous table is
//! dropped, the table is created (from a schema script or from inferred column
//! kinds), every row is inserted and the secondary indexes are built. Any
//! failure rolls the transaction back and leaves the previous table intact.

use std::{
    fs,
    path::{Path, PathBuf},
};

use encoding_rs::Encoding;
use itertools::Itertools;
use log::{debug, info};
use rusqlite::{Connection, Transaction, params_from_iter};
use serde::Serialize;

use crate::{
    columns::{ColumnInfo, ColumnKind, infer_kinds, is_date_column},
    data::Value,
    error::{Error, Result},
    io_utils,
    source::SourceTable,
    store::{self, INDEXED_COLUMNS, Store, TABLE_NAME},
    validate::{ValidationReport, validate_rows},
};

#[derive(Debug, Clone)]
pub struct LoadOptions<'a> {
    pub source: &'a Path,
    pub schema_script: Option<&'a Path>,
    pub delimiter: Option<u8>,
    pub encoding: &'static Encoding,
    /// Abort instead of warning when rows fail validation.
    pub strict: bool,
}

impl<'a> LoadOptions<'a> {
    pub fn new(source: &'a Path, encoding: &'static Encoding) -> Self {
        Self {
            source,
            schema_script: None,
            delimiter: None,
            encoding,
            strict: false,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct LoadSummary {
    pub source: PathBuf,
    pub row_count: u64,
    pub columns: Vec<ColumnInfo>,
    pub indexes: Vec<String>,
    pub missing_values: Vec<(String, usize)>,
    pub validation: ValidationReport,
}

pub fn load(store: &mut Store, options: &LoadOptions<'_>) -> Result<LoadSummary> {
    let delimiter = io_utils::resolve_input_delimiter(options.source, options.delimiter);
    let source = SourceTable::read(options.source, delimiter, options.encoding)?;
    info!(
        "Read {} row(s) x {} column(s) from {:?}",
        source.rows.len(),
        source.headers.len(),
        options.source
    );
    source.require_columns()?;
    let missing_values = source.missing_values();

    let script = options.schema_script.map(read_schema_script).transpose()?;

    let tx = store.connection_mut().transaction()?;
    tx.execute_batch(&format!("DROP TABLE IF EXISTS {TABLE_NAME}"))?;
    let kinds = match &script {
        Some(statements) => create_from_script(&tx, statements, &source.headers)?,
        None => create_from_inference(&tx, &source)?,
    };

    let typed = source.convert(&kinds)?;
    let validation = validate_rows(&source.headers, &typed);
    validation.log();
    let validation = if options.strict {
        validation.into_result()?
    } else {
        validation
    };

    insert_rows(&tx, &source.headers, &typed)?;
    let indexes = create_indexes(&tx)?;
    tx.commit()?;

    let row_count = store.row_count()?;
    let columns = store.manifest()?;
    info!(
        "Loaded {row_count} row(s) into '{TABLE_NAME}' at {} with {} index(es)",
        store.location(),
        indexes.len()
    );
    Ok(LoadSummary {
        source: options.source.to_path_buf(),
        row_count,
        columns,
        indexes,
        missing_values,
        validation,
    })
}

/// Reads a DDL script and splits it into its non-blank statements.
pub fn read_schema_script(path: &Path) -> Result<Vec<String>> {
    let text = fs::read_to_string(path)
        .map_err(|err| Error::Schema(format!("Cannot read schema script {path:?}: {err}")))?;
    let statements = split_statements(&text);
    if statements.is_empty() {
        return Err(Error::Schema(format!("Schema script {path:?} contains no statements")));
    }
    Ok(statements)
}

pub fn split_statements(script: &str) -> Vec<String> {
    script
        .split(';')
        .map(str::trim)
        .filter(|statement| !statement.is_empty())
        .map(String::from)
        .collect()
}

/// Runs the schema script on `conn` and maps each source header onto the
/// kind its declared column type implies.
pub(crate) fn create_from_script(
    conn: &Connection,
    statements: &[String],
    headers: &[String],
) -> Result<Vec<ColumnKind>> {
    for statement in statements {
        debug!("Executing schema statement:\n{statement}");
        conn.execute_batch(statement)
            .map_err(|err| Error::Schema(format!("Statement failed ({err}): {statement}")))?;
    }
    if !store::table_exists(conn)? {
        return Err(Error::Schema(format!(
            "Schema script did not create table '{TABLE_NAME}'"
        )));
    }
    let declared = store::manifest(conn)?;
    headers
        .iter()
        .map(|header| {
            let column = declared
                .iter()
                .find(|c| c.name.eq_ignore_ascii_case(header))
                .ok_or_else(|| {
                    Error::Schema(format!(
                        "Column '{header}' is not defined by the schema script"
                    ))
                })?;
            Ok(if is_date_column(header) {
                ColumnKind::Timestamp
            } else {
                ColumnKind::from_declared(&column.declared_type)
            })
        })
        .collect()
}

fn create_from_inference(tx: &Transaction<'_>, source: &SourceTable) -> Result<Vec<ColumnKind>> {
    let kinds = infer_kinds(&source.headers, &source.rows);
    let columns = source
        .headers
        .iter()
        .zip(&kinds)
        .map(|(name, kind)| format!("{} {}", quote_ident(name), kind.sql_type()))
        .join(", ");
    let ddl = format!("CREATE TABLE {TABLE_NAME} ({columns})");
    debug!("Creating table:\n{ddl}");
    tx.execute_batch(&ddl)?;
    Ok(kinds)
}

fn insert_rows(tx: &Transaction<'_>, headers: &[String], rows: &[Vec<Value>]) -> Result<()> {
    let columns = headers.iter().map(|h| quote_ident(h)).join(", ");
    let placeholders = (1..=headers.len()).map(|i| format!("?{i}")).join(", ");
    let sql = format!("INSERT INTO {TABLE_NAME} ({columns}) VALUES ({placeholders})");
    let mut statement = tx.prepare(&sql)?;
    for row in rows {
        statement.execute(params_from_iter(row.iter()))?;
    }
    Ok(())
}

fn create_indexes(tx: &Transaction<'_>) -> Result<Vec<String>> {
    let mut names = Vec::with_capacity(INDEXED_COLUMNS.len());
    for column in INDEXED_COLUMNS {
        let name = format!("idx_{column}");
        tx.execute_batch(&format!(
            "CREATE INDEX IF NOT EXISTS {name} ON {TABLE_NAME}({column})"
        ))?;
        names.push(name);
    }
    Ok(names)
}

fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}
