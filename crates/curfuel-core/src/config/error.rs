//! Error types for configuration loading

use thiserror::Error;

/// Errors that can occur while loading the daemon configuration
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("I/O error reading '{path}': {message}")]
    IoError { path: String, message: String },

    #[error("Parse error at line {line}: {message}")]
    ParseError { line: usize, message: String },

    #[error("Missing required section: [{0}]")]
    MissingSectionError(String),

    #[error("Missing required field '{field}' in section [{section}]")]
    MissingFieldError { section: String, field: String },

    #[error("Invalid value for '{field}': {message}")]
    InvalidValueError { field: String, message: String },
}

impl ConfigError {
    pub(crate) fn invalid(field: &str, message: impl Into<String>) -> Self {
        ConfigError::InvalidValueError {
            field: field.to_string(),
            message: message.into(),
        }
    }
}
