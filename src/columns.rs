//! Header normalization and column typing for the `superstore` table.
//!
//! Source headers such as `"Order Date"` or `"Sub-Category"` become SQL
//! friendly identifiers (`order_date`, `sub_category`). Each column then gets a
//! [`ColumnKind`], either from the declared type in a schema script or by
//! inference over the loaded rows.

use std::fmt;

use serde::Serialize;

/// Columns that always carry calendar timestamps regardless of inference.
pub const DATE_COLUMNS: &[&str] = &["order_date", "ship_date"];

/// Measures the catalog aggregates; a stray non-numeric cell must fail the load.
pub const REAL_COLUMNS: &[&str] = &["sales", "discount", "profit"];

pub const INTEGER_COLUMNS: &[&str] = &["quantity"];

/// Identifier-like codes where leading zeros are significant.
pub const TEXT_COLUMNS: &[&str] = &["postal_code"];

/// Columns every catalog query depends on.
pub const REQUIRED_COLUMNS: &[&str] = &[
    "order_id",
    "order_date",
    "ship_date",
    "ship_mode",
    "customer_id",
    "customer_name",
    "segment",
    "region",
    "category",
    "sub_category",
    "product_id",
    "product_name",
    "sales",
    "quantity",
    "discount",
    "profit",
];

/// Strip, lowercase, and replace spaces and hyphens with underscores.
pub fn normalize_column_name(name: &str) -> String {
    name.trim()
        .to_lowercase()
        .chars()
        .map(|c| match c {
            ' ' | '-' => '_',
            other => other,
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnKind {
    Integer,
    Real,
    Timestamp,
    Text,
}

impl ColumnKind {
    pub fn sql_type(self) -> &'static str {
        match self {
            ColumnKind::Integer => "INTEGER",
            ColumnKind::Real => "REAL",
            ColumnKind::Timestamp => "TIMESTAMP",
            ColumnKind::Text => "TEXT",
        }
    }

    /// Maps a declared SQLite column type onto a kind, following SQLite's
    /// affinity rules with date/time names taking precedence.
    pub fn from_declared(declared: &str) -> Self {
        let upper = declared.to_ascii_uppercase();
        if upper.contains("DATE") || upper.contains("TIME") {
            ColumnKind::Timestamp
        } else if upper.contains("INT") {
            ColumnKind::Integer
        } else if ["CHAR", "CLOB", "TEXT"].iter().any(|t| upper.contains(t)) {
            ColumnKind::Text
        } else if ["REAL", "FLOA", "DOUB", "NUMERIC", "DECIMAL"]
            .iter()
            .any(|t| upper.contains(t))
        {
            ColumnKind::Real
        } else {
            ColumnKind::Text
        }
    }
}

impl fmt::Display for ColumnKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ColumnKind::Integer => "integer",
            ColumnKind::Real => "real",
            ColumnKind::Timestamp => "date",
            ColumnKind::Text => "text",
        };
        f.write_str(label)
    }
}

/// One entry of the table manifest reported after a load.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColumnInfo {
    pub name: String,
    pub declared_type: String,
}

#[derive(Debug, Clone)]
struct KindCandidate {
    possible_integer: bool,
    possible_real: bool,
    seen_value: bool,
}

impl KindCandidate {
    fn new() -> Self {
        Self {
            possible_integer: true,
            possible_real: true,
            seen_value: false,
        }
    }

    fn observe(&mut self, value: &str) {
        let value = value.trim();
        if value.is_empty() {
            return;
        }
        self.seen_value = true;
        if self.possible_integer && value.parse::<i64>().is_err() {
            self.possible_integer = false;
        }
        if self.possible_real && value.parse::<f64>().is_err() {
            self.possible_real = false;
        }
    }

    fn decide(&self) -> ColumnKind {
        if !self.seen_value {
            ColumnKind::Text
        } else if self.possible_integer {
            ColumnKind::Integer
        } else if self.possible_real {
            ColumnKind::Real
        } else {
            ColumnKind::Text
        }
    }
}

/// Infers a kind per column over every row. Columns with a [`pinned_kind`]
/// skip inference; their values are checked later during conversion.
pub fn infer_kinds(headers: &[String], rows: &[Vec<String>]) -> Vec<ColumnKind> {
    let mut candidates = vec![KindCandidate::new(); headers.len()];
    for row in rows {
        for (idx, value) in row.iter().enumerate().take(headers.len()) {
            candidates[idx].observe(value);
        }
    }
    headers
        .iter()
        .zip(candidates)
        .map(|(name, candidate)| pinned_kind(name).unwrap_or_else(|| candidate.decide()))
        .collect()
}

/// The kind a known Superstore column always takes when no schema script
/// declares one.
pub fn pinned_kind(name: &str) -> Option<ColumnKind> {
    if is_date_column(name) {
        Some(ColumnKind::Timestamp)
    } else if REAL_COLUMNS.contains(&name) {
        Some(ColumnKind::Real)
    } else if INTEGER_COLUMNS.contains(&name) {
        Some(ColumnKind::Integer)
    } else if TEXT_COLUMNS.contains(&name) {
        Some(ColumnKind::Text)
    } else {
        None
    }
}

pub fn is_date_column(name: &str) -> bool {
    DATE_COLUMNS.contains(&name)
}
