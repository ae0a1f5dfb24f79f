use thiserror::Error;

use crate::value::ColumnKind;

pub type Result<T> = std::result::Result<T, QueryError>;

/// Errors raised while turning request input into typed query parts.
///
/// All of these are caller mistakes detected before any SQL is generated.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum QueryError {
    #[error("Unknown column '{column}' for {table}")]
    UnknownColumn { table: &'static str, column: String },

    #[error("Unknown operator '{0}'")]
    UnknownOperator(String),

    #[error("Operator '{operator}' on '{column}' requires {expected}")]
    InvalidOperand {
        column: &'static str,
        operator: &'static str,
        expected: &'static str,
    },

    #[error("Invalid {kind} value for '{column}': {value}")]
    InvalidValue {
        column: &'static str,
        kind: ColumnKind,
        value: String,
    },

    #[error("Invalid predicate: {0}")]
    InvalidPredicate(String),
}
