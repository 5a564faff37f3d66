//! Row validation at the sink boundary.
//!
//! The extractor hands every field over as a string; the checks here are
//! what keeps a malformed message from turning into a failed INSERT that
//! would take the other 199 rows of the batch down with it.

use std::net::IpAddr;
use thiserror::Error;

use crate::schema::{ColumnType, TableSpec};

/// A validated, typed column value ready to bind.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Text(Option<String>),
    Inet(Option<IpAddr>),
    Int(Option<i64>),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RowError {
    #[error("column count mismatch for {table}: expected {expected}, got {got}")]
    ColumnCount {
        table: &'static str,
        expected: usize,
        got: usize,
    },

    #[error("null in not-null column {table}.{column}")]
    NullViolation {
        table: &'static str,
        column: &'static str,
    },

    #[error("invalid inet value for {table}.{column}: {value:?}")]
    InvalidInet {
        table: &'static str,
        column: &'static str,
        value: String,
    },

    #[error("invalid integer value for {table}.{column}: {value:?}")]
    InvalidInt {
        table: &'static str,
        column: &'static str,
        value: String,
    },
}

/// Check one row against its table schema and convert it to typed values.
pub fn validate_row(
    spec: &TableSpec,
    values: Vec<Option<String>>,
) -> Result<Vec<SqlValue>, RowError> {
    if values.len() != spec.columns.len() {
        return Err(RowError::ColumnCount {
            table: spec.name,
            expected: spec.columns.len(),
            got: values.len(),
        });
    }

    let mut typed = Vec::with_capacity(values.len());
    for (column, value) in spec.columns.iter().zip(values) {
        if column.not_null && value.is_none() {
            return Err(RowError::NullViolation {
                table: spec.name,
                column: column.name,
            });
        }
        let converted = match column.ty {
            ColumnType::Text => SqlValue::Text(value),
            ColumnType::Inet => SqlValue::Inet(match value {
                Some(raw) => match raw.trim().parse::<IpAddr>() {
                    Ok(address) => Some(address),
                    Err(_) => {
                        return Err(RowError::InvalidInet {
                            table: spec.name,
                            column: column.name,
                            value: raw,
                        });
                    }
                },
                None => None,
            }),
            ColumnType::Int => SqlValue::Int(match value {
                Some(raw) => match raw.trim().parse::<i64>() {
                    Ok(number) => Some(number),
                    Err(_) => {
                        return Err(RowError::InvalidInt {
                            table: spec.name,
                            column: column.name,
                            value: raw,
                        });
                    }
                },
                None => None,
            }),
        };
        typed.push(converted);
    }
    Ok(typed)
}
