use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("Invalid assignment '{0}'. Expected KEY=VALUE (e.g., 'grid.cell-size=50').")]
    InvalidAssignment(String),

    #[error("Invalid value '{value}' for '{key}': {reason}")]
    InvalidValue {
        key: String,
        value: String,
        reason: String,
    },
}

/// Splits `KEY=VALUE` at the first `=`, trimming both sides.
pub fn parse_assignment(text: &str) -> Result<(&str, &str), ParseError> {
    match text.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => Ok((key.trim(), value.trim())),
        _ => Err(ParseError::InvalidAssignment(text.to_string())),
    }
}

pub fn parse_value<T>(key: &str, value: &str) -> Result<T, ParseError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value.parse().map_err(|e: T::Err| ParseError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
        reason: e.to_string(),
    })
}
