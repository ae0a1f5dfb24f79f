//! Scalar values bound as positional parameters.

use std::fmt;

use chrono::NaiveDate;
use serde::Serialize;
use serde_json::{Map, Value as JsonValue};

use crate::error::{QueryError, Result};

/// A database row decoded as a JSON object (column name -> value).
pub type Record = Map<String, JsonValue>;

/// Value bound to a `$n` placeholder.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Scalar {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Date(NaiveDate),
}

impl Scalar {
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Untyped conversion used for values read back from records
    /// (e.g. a foreign key that drives a relationship lookup).
    ///
    /// Arrays and objects have no scalar form and yield `None`.
    pub fn from_json(value: &JsonValue) -> Option<Self> {
        match value {
            JsonValue::Null => Some(Self::Null),
            JsonValue::Bool(b) => Some(Self::Bool(*b)),
            JsonValue::Number(n) => n
                .as_i64()
                .map(Self::Int)
                .or_else(|| n.as_f64().map(Self::Float)),
            JsonValue::String(s) => Some(Self::Text(s.clone())),
            JsonValue::Array(_) | JsonValue::Object(_) => None,
        }
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("null"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(i) => write!(f, "{i}"),
            Self::Float(x) => write!(f, "{x}"),
            Self::Text(s) => f.write_str(s),
            Self::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
        }
    }
}

impl From<bool> for Scalar {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i32> for Scalar {
    fn from(value: i32) -> Self {
        Self::Int(value.into())
    }
}

impl From<i64> for Scalar {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<u32> for Scalar {
    fn from(value: u32) -> Self {
        Self::Int(value.into())
    }
}

impl From<f64> for Scalar {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<&str> for Scalar {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for Scalar {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<NaiveDate> for Scalar {
    fn from(value: NaiveDate) -> Self {
        Self::Date(value)
    }
}

impl<T: Into<Scalar>> From<Option<T>> for Scalar {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(Self::Null)
    }
}

/// Storage class of an allow-listed column.
///
/// Used to coerce raw query-string and JSON input into a [`Scalar`] that
/// PostgreSQL accepts for the column without implicit text casts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColumnKind {
    Text,
    Integer,
    Float,
    Boolean,
    Date,
}

impl ColumnKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Integer => "integer",
            Self::Float => "float",
            Self::Boolean => "boolean",
            Self::Date => "date",
        }
    }

    /// Parse a raw query-string value for a column of this kind.
    pub fn parse_text(self, column: &'static str, raw: &str) -> Result<Scalar> {
        let invalid = || QueryError::InvalidValue {
            column,
            kind: self,
            value: raw.to_string(),
        };
        let trimmed = raw.trim();

        match self {
            Self::Text => Ok(Scalar::Text(raw.to_string())),
            Self::Integer => trimmed.parse::<i64>().map(Scalar::Int).map_err(|_| invalid()),
            Self::Float => trimmed
                .parse::<f64>()
                .ok()
                .filter(|x| x.is_finite())
                .map(Scalar::Float)
                .ok_or_else(invalid),
            Self::Boolean => match trimmed.to_ascii_lowercase().as_str() {
                "true" | "1" | "yes" => Ok(Scalar::Bool(true)),
                "false" | "0" | "no" => Ok(Scalar::Bool(false)),
                _ => Err(invalid()),
            },
            Self::Date => NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
                .map(Scalar::Date)
                .map_err(|_| invalid()),
        }
    }

    /// Coerce a JSON value (request body) for a column of this kind.
    pub fn coerce_json(self, column: &'static str, value: &JsonValue) -> Result<Scalar> {
        let invalid = || QueryError::InvalidValue {
            column,
            kind: self,
            value: value.to_string(),
        };

        match (self, value) {
            (_, JsonValue::Null) => Ok(Scalar::Null),
            (_, JsonValue::Array(_) | JsonValue::Object(_)) => Err(invalid()),
            (Self::Text, JsonValue::String(s)) => Ok(Scalar::Text(s.clone())),
            (Self::Text, JsonValue::Number(n)) => Ok(Scalar::Text(n.to_string())),
            (Self::Text, JsonValue::Bool(b)) => Ok(Scalar::Text(b.to_string())),
            (Self::Integer, JsonValue::Number(n)) => n.as_i64().map(Scalar::Int).ok_or_else(invalid),
            (Self::Float, JsonValue::Number(n)) => n.as_f64().map(Scalar::Float).ok_or_else(invalid),
            (Self::Boolean, JsonValue::Bool(b)) => Ok(Scalar::Bool(*b)),
            (_, JsonValue::String(s)) => self.parse_text(column, s),
            _ => Err(invalid()),
        }
    }
}

impl fmt::Display for ColumnKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
