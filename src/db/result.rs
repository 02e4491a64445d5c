use crate::error::PipelineError;
use chrono::{NaiveDate, NaiveDateTime};
use duckdb::types::Value;
use serde::{Serialize, Serializer};
use std::fmt;

/// One scalar value of a result row.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Date(NaiveDate),
    Timestamp(NaiveDateTime),
}

impl Cell {
    pub fn text(value: impl Into<String>) -> Self {
        Cell::Text(value.into())
    }

    /// Numeric coercion used for chart measures.
    ///
    /// Numbers pass through, booleans become 1/0 and text is parsed after
    /// trimming. Everything else is a `Coercion` error.
    pub fn to_f64(&self) -> Result<f64, PipelineError> {
        match self {
            Cell::Int(v) => Ok(*v as f64),
            Cell::Float(v) => Ok(*v),
            Cell::Bool(b) => Ok(if *b { 1.0 } else { 0.0 }),
            Cell::Text(s) => s.trim().parse::<f64>().map_err(|_| PipelineError::Coercion {
                value: self.repr(),
            }),
            Cell::Null | Cell::Date(_) | Cell::Timestamp(_) => Err(PipelineError::Coercion {
                value: self.repr(),
            }),
        }
    }

    /// Text shown as a chart label.
    pub fn to_label(&self) -> String {
        match self {
            Cell::Text(s) => s.clone(),
            Cell::Date(_) | Cell::Timestamp(_) => self.to_string(),
            _ => self.repr(),
        }
    }

    /// Row-tuple rendering used when a result is quoted back to the model.
    pub fn repr(&self) -> String {
        match self {
            Cell::Null => "None".to_string(),
            Cell::Bool(true) => "True".to_string(),
            Cell::Bool(false) => "False".to_string(),
            Cell::Int(v) => v.to_string(),
            Cell::Float(v) => format_float(*v),
            Cell::Text(s) => quote(s),
            Cell::Date(d) => quote(&d.format("%Y-%m-%d").to_string()),
            Cell::Timestamp(ts) => quote(&ts.format("%Y-%m-%d %H:%M:%S").to_string()),
        }
    }
}

fn format_float(v: f64) -> String {
    if v.is_finite() && v.fract() == 0.0 && v.abs() < 1e16 {
        format!("{:.1}", v)
    } else {
        v.to_string()
    }
}

/// Single quotes unless the text holds a `'` and no `"`, in which case the
/// apostrophes stay unescaped inside double quotes.
fn quote(s: &str) -> String {
    let escaped = s.replace('\\', "\\\\");
    if s.contains('\'') && !s.contains('"') {
        format!("\"{}\"", escaped)
    } else {
        format!("'{}'", escaped.replace('\'', "\\'"))
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Null => write!(f, "NULL"),
            Cell::Bool(b) => write!(f, "{}", b),
            Cell::Int(v) => write!(f, "{}", v),
            Cell::Float(v) => write!(f, "{}", v),
            Cell::Text(s) => write!(f, "{}", s),
            Cell::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            Cell::Timestamp(ts) => write!(f, "{}", ts.format("%Y-%m-%d %H:%M:%S")),
        }
    }
}

impl Serialize for Cell {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Cell::Null => serializer.serialize_none(),
            Cell::Bool(b) => serializer.serialize_bool(*b),
            Cell::Int(v) => serializer.serialize_i64(*v),
            Cell::Float(v) => serializer.serialize_f64(*v),
            Cell::Text(s) => serializer.serialize_str(s),
            Cell::Date(d) => serializer.collect_str(&d.format("%Y-%m-%d")),
            Cell::Timestamp(ts) => serializer.collect_str(&ts.format("%Y-%m-%dT%H:%M:%S%.f")),
        }
    }
}

impl From<Value> for Cell {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => Cell::Null,
            Value::Boolean(b) => Cell::Bool(b),
            Value::TinyInt(v) => Cell::Int(v.into()),
            Value::SmallInt(v) => Cell::Int(v.into()),
            Value::Int(v) => Cell::Int(v.into()),
            Value::BigInt(v) => Cell::Int(v),
            Value::UTinyInt(v) => Cell::Int(v.into()),
            Value::USmallInt(v) => Cell::Int(v.into()),
            Value::UInt(v) => Cell::Int(v.into()),
            Value::UBigInt(v) => i64::try_from(v).map(Cell::Int).unwrap_or(Cell::Float(v as f64)),
            Value::HugeInt(v) => i64::try_from(v).map(Cell::Int).unwrap_or(Cell::Float(v as f64)),
            Value::Float(v) => Cell::Float(v.into()),
            Value::Double(v) => Cell::Float(v),
            Value::Decimal(d) => {
                let text = d.to_string();
                text.parse::<f64>().map(Cell::Float).unwrap_or(Cell::Text(text))
            }
            Value::Text(s) => Cell::Text(s),
            Value::Date32(days) => NaiveDate::from_ymd_opt(1970, 1, 1)
                .and_then(|epoch| epoch.checked_add_signed(chrono::Duration::days(days.into())))
                .map(Cell::Date)
                .unwrap_or(Cell::Int(days.into())),
            Value::Timestamp(unit, v) => chrono::DateTime::from_timestamp_micros(unit.to_micros(v))
                .map(|dt| Cell::Timestamp(dt.naive_utc()))
                .unwrap_or(Cell::Int(v)),
            other => Cell::Text(format!("{:?}", other)),
        }
    }
}

/// Rows returned by one executed query. Rows are positional; `columns` may
/// be empty when the source does not report names.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct ResultSet {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
}

impl ResultSet {
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Cell>>) -> Self {
        Self { columns, rows }
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Renders the rows as a list of tuples, e.g. `[('Zurich', 10), ('Geneva', 5)]`.
    pub fn to_prompt_text(&self) -> String {
        let rows: Vec<String> = self
            .rows
            .iter()
            .map(|row| {
                let cells: Vec<String> = row.iter().map(Cell::repr).collect();
                if cells.len() == 1 {
                    format!("({},)", cells[0])
                } else {
                    format!("({})", cells.join(", "))
                }
            })
            .collect();
        format!("[{}]", rows.join(", "))
    }
}
