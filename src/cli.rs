//! CLI command implementations for Cartneat.

pub(crate) mod dot;
pub(crate) mod inspect;
pub(crate) mod store;
pub(crate) mod train;

use cartneat::{EvaluationError, PersistenceError, PopulationError};
use std::error::Error;
use std::fmt;

/// CLI error type.
#[derive(Debug)]
pub(crate) struct CliError {
    message: String,
}

impl CliError {
    /// Create a new CLI error.
    pub(crate) fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl Error for CliError {}

impl From<std::io::Error> for CliError {
    fn from(e: std::io::Error) -> Self {
        Self::new(e.to_string())
    }
}

impl From<PersistenceError> for CliError {
    fn from(e: PersistenceError) -> Self {
        Self::new(e.to_string())
    }
}

impl From<PopulationError> for CliError {
    fn from(e: PopulationError) -> Self {
        Self::new(e.to_string())
    }
}

impl From<EvaluationError> for CliError {
    fn from(e: EvaluationError) -> Self {
        Self::new(e.to_string())
    }
}

impl From<indicatif::style::TemplateError> for CliError {
    fn from(e: indicatif::style::TemplateError) -> Self {
        Self::new(format!("invalid progress template: {e}"))
    }
}
