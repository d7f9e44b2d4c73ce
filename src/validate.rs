//! Row-level data quality checks.
//!
//! The loader accepts rows that break soft invariants (discount outside
//! [0, 1], shipping before ordering, ...) but reports them. Each rule is
//! tallied independently; a row may fail several.

use std::{collections::BTreeMap, fmt, path::Path};

use encoding_rs::Encoding;
use itertools::Itertools;
use log::{info, warn};
use serde::Serialize;

use crate::{
    columns::infer_kinds,
    data::Value,
    error::{Error, Result},
    loader,
    source::SourceTable,
    store::Store,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Rule {
    DiscountRange,
    ShipBeforeOrder,
    QuantityPositive,
    NegativeSales,
}

impl Rule {
    pub fn description(self) -> &'static str {
        match self {
            Rule::DiscountRange => "discount outside [0, 1]",
            Rule::ShipBeforeOrder => "ship_date earlier than order_date",
            Rule::QuantityPositive => "quantity below 1",
            Rule::NegativeSales => "negative sales",
        }
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.description())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RuleTally {
    pub count: usize,
    pub first_row: usize,
    pub first_value: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ValidationReport {
    pub rows_checked: usize,
    pub issues: BTreeMap<Rule, RuleTally>,
}

impl ValidationReport {
    pub fn is_clean(&self) -> bool {
        self.issues.is_empty()
    }

    pub fn failures(&self, rule: Rule) -> usize {
        self.issues.get(&rule).map(|t| t.count).unwrap_or(0)
    }

    fn record(&mut self, rule: Rule, row: usize, value: String) {
        self.issues
            .entry(rule)
            .and_modify(|tally| tally.count += 1)
            .or_insert(RuleTally {
                count: 1,
                first_row: row,
                first_value: value,
            });
    }

    pub fn summary(&self) -> String {
        self.issues
            .iter()
            .map(|(rule, tally)| format!("{} x{} (first at row {})", rule, tally.count, tally.first_row))
            .join("; ")
    }

    pub fn log(&self) {
        if self.is_clean() {
            info!("All {} row(s) passed validation", self.rows_checked);
            return;
        }
        for (rule, tally) in &self.issues {
            warn!(
                "{} row(s) with {} (first at row {}: '{}')",
                tally.count, rule, tally.first_row, tally.first_value
            );
        }
    }

    /// Strict mode: turn any finding into an error.
    pub fn into_result(self) -> Result<Self> {
        if self.is_clean() {
            Ok(self)
        } else {
            Err(Error::Validation {
                count: self.issues.values().map(|t| t.count).sum(),
                summary: self.summary(),
            })
        }
    }
}

struct Positions {
    discount: Option<usize>,
    order_date: Option<usize>,
    ship_date: Option<usize>,
    quantity: Option<usize>,
    sales: Option<usize>,
}

impl Positions {
    fn locate(headers: &[String]) -> Self {
        let find = |name: &str| headers.iter().position(|h| h == name);
        Self {
            discount: find("discount"),
            order_date: find("order_date"),
            ship_date: find("ship_date"),
            quantity: find("quantity"),
            sales: find("sales"),
        }
    }
}

fn cell(row: &[Value], idx: Option<usize>) -> Option<&Value> {
    idx.and_then(|i| row.get(i)).filter(|v| **v != Value::Null)
}

/// Checks typed rows; `rows[i]` is reported as source row `i + 2`.
pub fn validate_rows(headers: &[String], rows: &[Vec<Value>]) -> ValidationReport {
    let positions = Positions::locate(headers);
    let mut report = ValidationReport {
        rows_checked: rows.len(),
        ..ValidationReport::default()
    };

    for (idx, row) in rows.iter().enumerate() {
        let row_number = idx + 2;
        if let Some(value) = cell(row, positions.discount)
            && let Some(discount) = value.as_f64()
            && !(0.0..=1.0).contains(&discount)
        {
            report.record(Rule::DiscountRange, row_number, value.as_display());
        }
        if let (Some(ordered), Some(shipped)) = (
            cell(row, positions.order_date).and_then(Value::as_timestamp),
            cell(row, positions.ship_date).and_then(Value::as_timestamp),
        ) && shipped < ordered
        {
            report.record(
                Rule::ShipBeforeOrder,
                row_number,
                format!("{} < {}", shipped.date(), ordered.date()),
            );
        }
        if let Some(value) = cell(row, positions.quantity)
            && let Some(quantity) = value.as_f64()
            && quantity < 1.0
        {
            report.record(Rule::QuantityPositive, row_number, value.as_display());
        }
        if let Some(value) = cell(row, positions.sales)
            && let Some(sales) = value.as_f64()
            && sales < 0.0
        {
            report.record(Rule::NegativeSales, row_number, value.as_display());
        }
    }
    report
}

/// Runs the load-time checks against a source file without touching the
/// target store. With a schema script, column kinds come from the declared
/// types of a scratch in-memory table, exactly as a load would see them.
/// Parse failures still abort, since rules only apply to typed rows.
pub fn validate_source(
    path: &Path,
    delimiter: u8,
    encoding: &'static Encoding,
    schema_script: Option<&Path>,
) -> Result<ValidationReport> {
    let source = SourceTable::read(path, delimiter, encoding)?;
    source.require_columns()?;
    source.missing_values();
    let kinds = match schema_script {
        Some(script) => {
            let statements = loader::read_schema_script(script)?;
            let scratch = Store::open_in_memory()?;
            loader::create_from_script(scratch.connection(), &statements, &source.headers)?
        }
        None => infer_kinds(&source.headers, &source.rows),
    };
    let typed = source.convert(&kinds)?;
    Ok(validate_rows(&source.headers, &typed))
}
