//! Centralized error types for graph exports.

use thiserror::Error;

/// Main error type for export operations.
#[derive(Error, Debug)]
pub enum ExportError {
    #[error("Unsupported format version '{0}' (expected one of: 3.0, 2.4.0, 0.1.0)")]
    UnsupportedVersion(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Query failed ({context}): {message}")]
    Query { context: String, message: String },

    #[error("Output error: {0}")]
    Output(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for export operations.
pub type ExportResult<T> = Result<T, ExportError>;

impl ExportError {
    /// Create a query error carrying the failing query context.
    pub fn query(context: impl Into<String>, message: impl std::fmt::Display) -> Self {
        Self::Query {
            context: context.into(),
            message: message.to_string(),
        }
    }

    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// True for errors raised before any database work.
    pub fn is_config(&self) -> bool {
        matches!(self, Self::Config(_) | Self::UnsupportedVersion(_))
    }
}
