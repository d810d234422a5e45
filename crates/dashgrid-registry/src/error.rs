//! Registry and panel error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("Unknown panel type: {0}")]
    UnknownPanelType(String),

    #[error("HTTP client error: {0}")]
    HttpClient(String),

    #[error("Catalog parse error: {0}")]
    ParseError(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type RegistryResult<T> = Result<T, RegistryError>;

/// Errors raised by panel implementations.
#[derive(Debug, Error)]
pub enum PanelError {
    #[error("Configure failed: {0}")]
    Configure(String),

    #[error("Draw failed: {0}")]
    Draw(String),

    #[error("Invalid input '{field}': {reason}")]
    InvalidInput { field: String, reason: String },
}

pub type PanelResult<T> = Result<T, PanelError>;
