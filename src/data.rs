use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use rusqlite::types::{ToSql, ToSqlOutput};

use crate::columns::ColumnKind;

/// Storage format for timestamps. Lexicographic order matches calendar order,
/// so `MAX(order_date)` and `strftime` work on the stored text directly.
pub const STORED_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

const SECONDS_PER_DAY: f64 = 86_400.0;

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Integer(i64),
    Real(f64),
    Timestamp(NaiveDateTime),
    Text(String),
}

impl Value {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Integer(i) => Some(*i as f64),
            Value::Real(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_timestamp(&self) -> Option<NaiveDateTime> {
        match self {
            Value::Timestamp(ts) => Some(*ts),
            _ => None,
        }
    }

    pub fn as_display(&self) -> String {
        match self {
            Value::Null => String::new(),
            Value::Integer(i) => i.to_string(),
            Value::Real(f) => f.to_string(),
            Value::Timestamp(ts) => ts.format(STORED_TIMESTAMP_FORMAT).to_string(),
            Value::Text(s) => s.clone(),
        }
    }
}

impl ToSql for Value {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            Value::Null => ToSqlOutput::from(rusqlite::types::Null),
            Value::Integer(i) => ToSqlOutput::from(*i),
            Value::Real(f) => ToSqlOutput::from(*f),
            Value::Timestamp(ts) => {
                ToSqlOutput::from(ts.format(STORED_TIMESTAMP_FORMAT).to_string())
            }
            Value::Text(s) => ToSqlOutput::from(s.as_str()),
        })
    }
}

/// Parses dates the way the source extracts mix them: month-first slash or
/// dash dates, ISO dates, and their date-time variants. Four-digit years are
/// tried before two-digit ones.
pub fn parse_timestamp(value: &str) -> Option<NaiveDateTime> {
    const DATETIME_FORMATS: &[&str] = &[
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%d %H:%M",
        "%Y-%m-%dT%H:%M",
        "%m/%d/%Y %H:%M:%S",
        "%m/%d/%Y %H:%M",
    ];
    const DATE_FORMATS: &[&str] = &[
        "%Y-%m-%d", "%m/%d/%Y", "%Y/%m/%d", "%m-%d-%Y", "%m/%d/%y", "%m-%d-%y",
    ];

    let value = value.trim();
    if value.is_empty() {
        return None;
    }
    for fmt in DATETIME_FORMATS {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(value, fmt)
            && plausible_year(parsed.date(), fmt)
        {
            return Some(parsed);
        }
    }
    for fmt in DATE_FORMATS {
        if let Ok(parsed) = NaiveDate::parse_from_str(value, fmt)
            && plausible_year(parsed, fmt)
        {
            return Some(parsed.and_time(NaiveTime::MIN));
        }
    }
    None
}

// `%Y` happily accepts "17" as year 17; leave two-digit years to `%y`.
fn plausible_year(date: NaiveDate, fmt: &str) -> bool {
    use chrono::Datelike;
    !fmt.contains("%Y") || date.year() >= 1000
}

/// Converts one raw cell into a typed value. Empty cells become
/// [`Value::Null`]; `None` means the text does not fit `kind`.
pub fn parse_typed_value(value: &str, kind: ColumnKind) -> Option<Value> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Some(Value::Null);
    }
    match kind {
        ColumnKind::Integer => trimmed.parse::<i64>().ok().map(Value::Integer),
        ColumnKind::Real => trimmed.parse::<f64>().ok().map(Value::Real),
        ColumnKind::Timestamp => parse_timestamp(trimmed).map(Value::Timestamp),
        ColumnKind::Text => Some(Value::Text(value.to_string())),
    }
}

/// Elapsed time between two timestamps in fractional days.
pub fn days_between(start: NaiveDateTime, end: NaiveDateTime) -> f64 {
    (end - start).num_seconds() as f64 / SECONDS_PER_DAY
}

/// Elapsed whole days, truncated toward zero.
pub fn whole_days_between(start: NaiveDateTime, end: NaiveDateTime) -> i64 {
    (end - start).num_days()
}
