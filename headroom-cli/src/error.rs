//! CLI error type.

use std::fmt;

/// Errors surfaced to the terminal.
#[derive(Debug)]
pub enum CliError {
    /// Scenario file could not be followed.
    Scenario(String),
    /// Platform table problems.
    Table(headroom::TableError),
    /// File access problems.
    Io(std::io::Error),
    /// JSON problems.
    Parse(serde_json::Error),
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::Scenario(msg) => write!(f, "scenario: {msg}"),
            CliError::Table(e) => write!(f, "table: {e}"),
            CliError::Io(e) => write!(f, "{e}"),
            CliError::Parse(e) => write!(f, "parse: {e}"),
        }
    }
}

impl std::error::Error for CliError {}

impl From<headroom::TableError> for CliError {
    fn from(e: headroom::TableError) -> Self {
        CliError::Table(e)
    }
}

impl From<std::io::Error> for CliError {
    fn from(e: std::io::Error) -> Self {
        CliError::Io(e)
    }
}

impl From<serde_json::Error> for CliError {
    fn from(e: serde_json::Error) -> Self {
        CliError::Parse(e)
    }
}
