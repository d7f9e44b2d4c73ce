//! Reading the delimited source extract into memory.
//!
//! [`SourceTable::read`] decodes every row with the declared encoding and
//! normalizes the header; [`SourceTable::convert`] turns the raw strings into
//! typed [`Value`]s, failing loudly on the first cell that does not fit.

use std::{collections::HashSet, path::Path};

use encoding_rs::Encoding;
use log::{debug, warn};

use crate::{
    columns::{ColumnKind, REQUIRED_COLUMNS, normalize_column_name},
    data::{Value, parse_typed_value},
    error::{Error, Result},
    io_utils,
};

#[derive(Debug, Clone)]
pub struct SourceTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl SourceTable {
    pub fn read(path: &Path, delimiter: u8, encoding: &'static Encoding) -> Result<Self> {
        let mut reader = io_utils::open_csv_reader_from_path(path, delimiter)?;
        let raw_headers = io_utils::reader_headers(&mut reader, encoding)?;
        let headers = raw_headers
            .iter()
            .map(|h| normalize_column_name(h))
            .collect::<Vec<_>>();
        debug!("Normalized headers: {:?}", headers);

        let mut seen = HashSet::new();
        for (raw, normalized) in raw_headers.iter().zip(&headers) {
            if normalized.is_empty() {
                return Err(Error::Schema(format!("Header '{raw}' is blank")));
            }
            if !seen.insert(normalized.as_str()) {
                return Err(Error::Schema(format!(
                    "Header '{raw}' normalizes to duplicate column '{normalized}'"
                )));
            }
        }

        let mut rows = Vec::new();
        for (idx, record) in reader.byte_records().enumerate() {
            let record = record?;
            rows.push(io_utils::decode_record(&record, encoding, idx + 2)?);
        }
        if rows.is_empty() {
            return Err(Error::EmptySource(format!("{path:?}")));
        }
        Ok(Self { headers, rows })
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    /// Fails with a schema error listing every required column the header lacks.
    pub fn require_columns(&self) -> Result<()> {
        let missing = REQUIRED_COLUMNS
            .iter()
            .filter(|name| self.column_index(name).is_none())
            .copied()
            .collect::<Vec<_>>();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(Error::Schema(format!(
                "Source is missing required column(s): {}",
                missing.join(", ")
            )))
        }
    }

    /// Count of blank cells per column, only for columns that have any.
    pub fn missing_values(&self) -> Vec<(String, usize)> {
        let mut counts = vec![0usize; self.headers.len()];
        for row in &self.rows {
            for (idx, value) in row.iter().enumerate() {
                if value.trim().is_empty() {
                    counts[idx] += 1;
                }
            }
        }
        let missing = self
            .headers
            .iter()
            .zip(counts)
            .filter(|(_, count)| *count > 0)
            .map(|(name, count)| (name.clone(), count))
            .collect::<Vec<_>>();
        for (name, count) in &missing {
            warn!("Column '{name}' has {count} missing value(s)");
        }
        missing
    }

    pub fn convert(&self, kinds: &[ColumnKind]) -> Result<Vec<Vec<Value>>> {
        self.rows
            .iter()
            .enumerate()
            .map(|(idx, row)| {
                row.iter()
                    .zip(&self.headers)
                    .zip(kinds)
                    .map(|((raw, column), kind)| convert_cell(raw, column, *kind, idx + 2))
                    .collect()
            })
            .collect()
    }
}

fn convert_cell(raw: &str, column: &str, kind: ColumnKind, row: usize) -> Result<Value> {
    let parse_error = || Error::Parse {
        row,
        column: column.to_string(),
        value: raw.to_string(),
        expected: kind,
    };
    let value = parse_typed_value(raw, kind).ok_or_else(parse_error)?;
    // Downstream date arithmetic has no sensible answer for a missing date.
    if kind == ColumnKind::Timestamp && value == Value::Null {
        return Err(parse_error());
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(headers: &[&str], rows: &[&[&str]]) -> SourceTable {
        SourceTable {
            headers: headers.iter().map(|h| h.to_string()).collect(),
            rows: rows
                .iter()
                .map(|r| r.iter().map(|v| v.to_string()).collect())
                .collect(),
        }
    }

    #[test]
    fn convert_reports_row_and_column_of_bad_date() {
        let source = table(
            &["order_id", "order_date"],
            &[&["A-1", "1/3/2017"], &["A-2", "someday"]],
        );
        let err = source
            .convert(&[ColumnKind::Text, ColumnKind::Timestamp])
            .unwrap_err();
        match err {
            Error::Parse { row, column, value, .. } => {
                assert_eq!(row, 3);
                assert_eq!(column, "order_date");
                assert_eq!(value, "someday");
            }
            other => panic!("expected parse error, got {other:?}"),
        }
    }

    #[test]
    fn convert_rejects_blank_dates() {
        let source = table(&["ship_date"], &[&[""]]);
        assert!(matches!(
            source.convert(&[ColumnKind::Timestamp]),
            Err(Error::Parse { row: 2, .. })
        ));
    }

    #[test]
    fn missing_values_only_lists_gappy_columns() {
        let source = table(
            &["city", "postal_code"],
            &[&["Henderson", ""], &["Fort Worth", "76106"], &["Austin", " "]],
        );
        assert_eq!(source.missing_values(), vec![("postal_code".to_string(), 2)]);
    }

    #[test]
    fn require_columns_names_what_is_absent() {
        let source = table(&["order_id"], &[&["A-1"]]);
        let err = source.require_columns().unwrap_err().to_string();
        assert!(err.contains("order_date"));
        assert!(err.contains("profit"));
        assert!(!err.contains("order_id,"));
    }
}
