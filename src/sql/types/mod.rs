use std::{cmp::Ordering, fmt::Display};

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::sql::parser::ast::Literal;

/// Supported SQL column types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DataType {
    Number,
    Integer,
    Float,
    String,
    Text,
    Boolean,
    Date,
}

impl DataType {
    pub const ALL: [DataType; 7] = [
        DataType::Number,
        DataType::String,
        DataType::Boolean,
        DataType::Date,
        DataType::Text,
        DataType::Integer,
        DataType::Float,
    ];

    /// Resolves a type name (case-insensitive)
    pub fn from_str(name: &str) -> Option<DataType> {
        Some(match name.to_uppercase().as_ref() {
            "NUMBER" => DataType::Number,
            "INTEGER" => DataType::Integer,
            "FLOAT" => DataType::Float,
            "STRING" => DataType::String,
            "TEXT" => DataType::Text,
            "BOOLEAN" => DataType::Boolean,
            "DATE" => DataType::Date,
            _ => return None,
        })
    }

    pub fn to_str(&self) -> &'static str {
        match self {
            DataType::Number => "NUMBER",
            DataType::Integer => "INTEGER",
            DataType::Float => "FLOAT",
            DataType::String => "STRING",
            DataType::Text => "TEXT",
            DataType::Boolean => "BOOLEAN",
            DataType::Date => "DATE",
        }
    }

    /// Converts a value into this column's representation.
    ///
    /// Returns None when the value's runtime type does not fit the column.
    /// NULL fits every column; DATE columns take date values or text that
    /// parses as a date.
    pub fn coerce(&self, value: Value) -> Option<Value> {
        match (self, value) {
            (_, Value::Null) => Some(Value::Null),
            (DataType::Number | DataType::Integer | DataType::Float, v @ Value::Integer(_)) => Some(v),
            (DataType::Number | DataType::Integer | DataType::Float, Value::Float(f)) if !f.is_nan() => {
                Some(Value::Float(f))
            }
            (DataType::String | DataType::Text, v @ Value::String(_)) => Some(v),
            (DataType::Boolean, v @ Value::Boolean(_)) => Some(v),
            (DataType::Date, v @ Value::Date(_)) => Some(v),
            (DataType::Date, Value::String(s)) => parse_date(&s).map(Value::Date),
            _ => None,
        }
    }
}

impl Display for DataType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.to_str())
    }
}

/// Runtime value stored in a row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Null,
    Boolean(bool),
    Integer(i64),
    Float(f64),
    String(String),
    Date(NaiveDate),
}

impl Value {
    /// Creates a Value from an AST literal
    pub fn from_literal(literal: &Literal) -> Self {
        match literal {
            Literal::Null => Self::Null,
            Literal::Boolean(b) => Self::Boolean(*b),
            Literal::Integer(i) => Self::Integer(*i),
            Literal::Float(f) => Self::Float(*f),
            Literal::String(s) => Self::String(s.clone()),
        }
    }

    /// Short runtime type name used in error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Boolean(_) => "boolean",
            Value::Integer(_) | Value::Float(_) => "number",
            Value::String(_) => "string",
            Value::Date(_) => "date",
        }
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Null => write!(f, "NULL"),
            Value::Boolean(b) if *b => write!(f, "TRUE"),
            Value::Boolean(_) => write!(f, "FALSE"),
            Value::Integer(v) => write!(f, "{}", v),
            Value::Float(v) => write!(f, "{}", v),
            Value::String(v) => write!(f, "{}", v),
            Value::Date(v) => write!(f, "{}", v),
        }
    }
}

/// Partial ordering used by WHERE comparisons.
///
/// NULL sorts before everything, integers and floats compare numerically, and
/// a date compares against text by parsing the text. Other mixes are
/// incomparable.
impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        match (self, other) {
            (Value::Null, Value::Null) => Some(Ordering::Equal),
            (Value::Null, _) => Some(Ordering::Less),
            (_, Value::Null) => Some(Ordering::Greater),
            (Value::Boolean(a), Value::Boolean(b)) => a.partial_cmp(b),
            (Value::Integer(a), Value::Integer(b)) => a.partial_cmp(b),
            (Value::Integer(a), Value::Float(b)) => (*a as f64).partial_cmp(b),
            (Value::Float(a), Value::Integer(b)) => a.partial_cmp(&(*b as f64)),
            (Value::Float(a), Value::Float(b)) => a.partial_cmp(b),
            (Value::String(a), Value::String(b)) => a.partial_cmp(b),
            (Value::Date(a), Value::Date(b)) => a.partial_cmp(b),
            (Value::Date(a), Value::String(b)) => parse_date(b).and_then(|b| a.partial_cmp(&b)),
            (Value::String(a), Value::Date(b)) => parse_date(a).and_then(|a| a.partial_cmp(b)),
            (_, _) => None,
        }
    }
}

/// A row holds one value per schema column, in schema order
pub type Row = Vec<Value>;

const DATE_FORMATS: [&str; 2] = ["%Y-%m-%d", "%Y/%m/%d"];
const DATETIME_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"];

/// Parses the date spellings accepted by DATE columns
pub fn parse_date(text: &str) -> Option<NaiveDate> {
    let text = text.trim();
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(text, fmt).ok())
        .or_else(|| {
            DATETIME_FORMATS
                .iter()
                .find_map(|fmt| NaiveDateTime::parse_from_str(text, fmt).ok())
                .map(|dt| dt.date())
        })
        .or_else(|| DateTime::parse_from_rfc3339(text).ok().map(|dt| dt.date_naive()))
}
