//! Tabular query results with named columns and typed cells.

use std::io::Write;

use rusqlite::{Connection, types::ValueRef};
use serde::Serialize;
use serde_json::{Map, Value as JsonValue};

use crate::error::Result;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Cell {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
}

impl Cell {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Cell::Integer(i) => Some(*i as f64),
            Cell::Real(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Cell::Integer(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Cell::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Cell::Null)
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, Cell::Integer(_) | Cell::Real(_))
    }

    pub fn as_display(&self) -> String {
        match self {
            Cell::Null => "NULL".to_string(),
            Cell::Integer(i) => i.to_string(),
            Cell::Real(f) => {
                if f.fract() == 0.0 && f.abs() < 1e15 {
                    format!("{f:.0}")
                } else {
                    f.to_string()
                }
            }
            Cell::Text(s) => s.clone(),
        }
    }

    fn from_sql(value: ValueRef<'_>) -> Self {
        match value {
            ValueRef::Null => Cell::Null,
            ValueRef::Integer(i) => Cell::Integer(i),
            ValueRef::Real(f) => Cell::Real(f),
            ValueRef::Text(bytes) => Cell::Text(String::from_utf8_lossy(bytes).into_owned()),
            ValueRef::Blob(bytes) => Cell::Text(format!("<{} byte blob>", bytes.len())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResultSet {
    pub name: String,
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
}

impl ResultSet {
    pub(crate) fn collect(conn: &Connection, name: &str, sql: &str) -> Result<Self> {
        let mut statement = conn.prepare(sql)?;
        let columns = statement
            .column_names()
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>();
        let width = columns.len();
        let mut rows = Vec::new();
        let mut cursor = statement.query([])?;
        while let Some(row) = cursor.next()? {
            let cells = (0..width)
                .map(|idx| row.get_ref(idx).map(Cell::from_sql))
                .collect::<rusqlite::Result<Vec<_>>>()?;
            rows.push(cells);
        }
        Ok(Self {
            name: name.to_string(),
            columns,
            rows,
        })
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, column: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == column)
    }

    pub fn cell(&self, row: usize, column: &str) -> Option<&Cell> {
        let idx = self.column_index(column)?;
        self.rows.get(row)?.get(idx)
    }

    pub fn column(&self, column: &str) -> Vec<&Cell> {
        match self.column_index(column) {
            Some(idx) => self.rows.iter().filter_map(|row| row.get(idx)).collect(),
            None => Vec::new(),
        }
    }

    /// Finds the first row whose `key` column holds the text `value`.
    pub fn find_row(&self, key: &str, value: &str) -> Option<usize> {
        let idx = self.column_index(key)?;
        self.rows
            .iter()
            .position(|row| row.get(idx).and_then(Cell::as_str) == Some(value))
    }

    pub fn display_rows(&self) -> Vec<Vec<String>> {
        self.rows
            .iter()
            .map(|row| row.iter().map(Cell::as_display).collect())
            .collect()
    }

    pub fn to_json_records(&self) -> JsonValue {
        let records = self
            .rows
            .iter()
            .map(|row| {
                let mut record = Map::new();
                for (name, cell) in self.columns.iter().zip(row) {
                    let value = serde_json::to_value(cell).unwrap_or(JsonValue::Null);
                    record.insert(name.clone(), value);
                }
                JsonValue::Object(record)
            })
            .collect();
        JsonValue::Array(records)
    }

    /// Writes a header row followed by every result row; NULL becomes an
    /// empty field.
    pub fn write_csv<W: Write>(&self, writer: &mut csv::Writer<W>) -> Result<()> {
        writer.write_record(&self.columns)?;
        for row in &self.rows {
            writer.write_record(row.iter().map(|cell| match cell {
                Cell::Null => String::new(),
                other => other.as_display(),
            }))?;
        }
        writer.flush().map_err(csv::Error::from)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> ResultSet {
        let conn = Connection::open_in_memory().expect("conn");
        ResultSet::collect(
            &conn,
            "sample",
            "SELECT 'West' AS region, 2 AS orders, 12.5 AS total, NULL AS margin
             UNION ALL SELECT 'East', 1, 3.0, 10.25",
        )
        .expect("collect")
    }

    #[test]
    fn collect_keeps_column_order_and_types() {
        let result = sample();
        assert_eq!(result.columns, vec!["region", "orders", "total", "margin"]);
        assert_eq!(result.len(), 2);
        assert_eq!(result.cell(0, "orders"), Some(&Cell::Integer(2)));
        assert_eq!(result.cell(0, "margin"), Some(&Cell::Null));
        assert_eq!(result.find_row("region", "East"), Some(1));
    }

    #[test]
    fn json_records_use_column_names() {
        let json = sample().to_json_records();
        assert_eq!(json[0]["region"], "West");
        assert_eq!(json[0]["margin"], JsonValue::Null);
        assert_eq!(json[1]["margin"], 10.25);
    }

    #[test]
    fn csv_export_writes_header_and_blank_nulls() {
        let mut writer = csv::Writer::from_writer(Vec::new());
        sample().write_csv(&mut writer).expect("write");
        let bytes = writer.into_inner().expect("inner");
        let text = String::from_utf8(bytes).expect("utf8");
        assert_eq!(text, "region,orders,total,margin\nWest,2,12.5,\nEast,1,3,10.25\n");
    }

    #[test]
    fn whole_reals_display_without_fraction() {
        assert_eq!(Cell::Real(2500.0).as_display(), "2500");
        assert_eq!(Cell::Real(-25.5).as_display(), "-25.5");
        assert_eq!(Cell::Null.as_display(), "NULL");
    }
}
