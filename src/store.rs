//! The SQLite handle every load and query goes through.
//!
//! A [`Store`] owns exactly one connection. It is opened at the start of a
//! command and passed explicitly to the loader and the query engine; dropping
//! it releases the connection on every exit path. Each connection gets the
//! calendar-aware day functions registered, see [`register_functions`].

use std::{fs, path::Path};

use log::debug;
use rusqlite::{Connection, OpenFlags, functions::FunctionFlags};

use crate::{
    columns::ColumnInfo,
    data::{self, parse_timestamp},
    error::{Error, Result},
    results::ResultSet,
};

pub const TABLE_NAME: &str = "superstore";

/// Columns that drive the catalog's filters and groupings.
pub const INDEXED_COLUMNS: &[&str] = &["order_date", "customer_id", "category", "region", "product_id"];

pub struct Store {
    conn: Connection,
    location: String,
}

impl Store {
    /// Read-write handle for loading; creates the database file and its
    /// parent directory when missing.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).map_err(|err| Error::io(parent, err))?;
        }
        let conn = Connection::open(path)?;
        Self::with_connection(conn, path.display().to_string())
    }

    /// Read-only handle for queries against a database produced by a load.
    pub fn open_existing(path: &Path) -> Result<Self> {
        if !path.is_file() {
            return Err(Error::StoreNotFound(path.display().to_string()));
        }
        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;
        Self::with_connection(conn, path.display().to_string())
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::with_connection(Connection::open_in_memory()?, ":memory:".to_string())
    }

    fn with_connection(conn: Connection, location: String) -> Result<Self> {
        register_functions(&conn)?;
        debug!("Opened store {location}");
        Ok(Self { conn, location })
    }

    pub fn location(&self) -> &str {
        &self.location
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    pub(crate) fn connection_mut(&mut self) -> &mut Connection {
        &mut self.conn
    }

    pub fn table_exists(&self) -> Result<bool> {
        table_exists(&self.conn)
    }

    /// Confirms the table is loaded and non-empty, returning its row count.
    pub fn ensure_ready(&self) -> Result<u64> {
        if !self.table_exists()? {
            return Err(Error::StoreNotFound(format!(
                "{} (table '{TABLE_NAME}' is missing)",
                self.location
            )));
        }
        let rows = self.row_count()?;
        if rows == 0 {
            return Err(Error::EmptySource(format!("table '{TABLE_NAME}'")));
        }
        Ok(rows)
    }

    pub fn row_count(&self) -> Result<u64> {
        let count: i64 = self
            .conn
            .query_row(&format!("SELECT COUNT(*) FROM {TABLE_NAME}"), [], |row| row.get(0))?;
        Ok(count as u64)
    }

    pub fn manifest(&self) -> Result<Vec<ColumnInfo>> {
        manifest(&self.conn)
    }

    pub fn index_names(&self) -> Result<Vec<String>> {
        let mut statement = self.conn.prepare(
            "SELECT name FROM sqlite_master
             WHERE type = 'index' AND tbl_name = ?1 AND name NOT LIKE 'sqlite_%'
             ORDER BY name",
        )?;
        let names = statement
            .query_map([TABLE_NAME], |row| row.get::<_, String>(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(names)
    }

    pub fn sample(&self, limit: usize) -> Result<ResultSet> {
        self.fetch("sample", &format!("SELECT * FROM {TABLE_NAME} LIMIT {limit}"))
    }

    pub fn fetch(&self, name: &str, sql: &str) -> Result<ResultSet> {
        debug!("Running '{name}':\n{sql}");
        ResultSet::collect(&self.conn, name, sql)
    }

    /// Closes the connection, surfacing errors that `Drop` would swallow.
    pub fn close(self) -> Result<()> {
        self.conn.close().map_err(|(_, err)| Error::Sqlite(err))
    }
}

pub(crate) fn table_exists(conn: &Connection) -> Result<bool> {
    let found: i64 = conn.query_row(
        "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?1",
        [TABLE_NAME],
        |row| row.get(0),
    )?;
    Ok(found > 0)
}

pub(crate) fn manifest(conn: &Connection) -> Result<Vec<ColumnInfo>> {
    let mut statement = conn.prepare(&format!("PRAGMA table_info({TABLE_NAME})"))?;
    let columns = statement
        .query_map([], |row| {
            Ok(ColumnInfo {
                name: row.get(1)?,
                declared_type: row.get::<_, Option<String>>(2)?.unwrap_or_default(),
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(columns)
}

/// Registers `days_between(start, end)` (fractional days) and
/// `whole_days_between(start, end)` (truncated toward zero). Either yields
/// NULL when an argument is NULL or not a recognizable timestamp.
pub fn register_functions(conn: &Connection) -> Result<()> {
    let flags = FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC;
    conn.create_scalar_function("days_between", 2, flags, |ctx| {
        let start = ctx.get::<Option<String>>(0)?;
        let end = ctx.get::<Option<String>>(1)?;
        Ok(timestamps(start, end).map(|(s, e)| data::days_between(s, e)))
    })?;
    conn.create_scalar_function("whole_days_between", 2, flags, |ctx| {
        let start = ctx.get::<Option<String>>(0)?;
        let end = ctx.get::<Option<String>>(1)?;
        Ok(timestamps(start, end).map(|(s, e)| data::whole_days_between(s, e)))
    })?;
    Ok(())
}

fn timestamps(
    start: Option<String>,
    end: Option<String>,
) -> Option<(chrono::NaiveDateTime, chrono::NaiveDateTime)> {
    Some((parse_timestamp(&start?)?, parse_timestamp(&end?)?))
}
