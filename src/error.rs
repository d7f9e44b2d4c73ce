//! Error taxonomy shared by the loader and the query engine.
//!
//! Library code returns [`Result`]; command handlers in `lib.rs` attach
//! context with `anyhow` before the error reaches `main`.

use std::path::PathBuf;

use thiserror::Error;

use crate::columns::ColumnKind;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Source file not found at {0:?}")]
    SourceNotFound(PathBuf),

    #[error("Schema error: {0}")]
    Schema(String),

    #[error("Row {row} column '{column}': cannot parse '{value}' as {expected}")]
    Parse {
        row: usize,
        column: String,
        value: String,
        expected: ColumnKind,
    },

    #[error("Database not found at {0}; run the load command first")]
    StoreNotFound(String),

    #[error("No rows available in {0}")]
    EmptySource(String),

    #[error("Unknown query '{0}'; run the catalog command to list available queries")]
    UnknownQuery(String),

    #[error("{count} row(s) failed validation: {summary}")]
    Validation { count: usize, summary: String },

    #[error("Failed to decode text with encoding {encoding} at row {row}")]
    Encoding { encoding: &'static str, row: usize },

    #[error("I/O error on {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

impl Error {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Io {
            path: path.into(),
            source,
        }
    }
}
