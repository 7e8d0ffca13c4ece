//! Domain-level errors (no external dependencies)

use std::fmt;

use thiserror::Error;

/// A single problem found while validating a flow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    /// Location inside the flow document, e.g. `data.chats[0].source`
    pub path: String,
    pub message: String,
}

impl Diagnostic {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path, self.message)
    }
}

/// Domain errors represent business logic violations.
/// These are independent of infrastructure concerns.
#[derive(Error, Debug)]
pub enum DomainError {
    #[error("invalid flow: {} problem(s) found", diagnostics.len())]
    InvalidFlow { diagnostics: Vec<Diagnostic> },

    #[error("unsupported output format: {0} (expected .py, .ipynb or .waldiez)")]
    UnsupportedFormat(String),

    #[error("invalid dotenv line {line}: {message}")]
    InvalidDotenv { line: usize, message: String },
}
