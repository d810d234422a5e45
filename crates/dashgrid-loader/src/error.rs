//! Loader error types.

use dashgrid_core::LoadStatus;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("HTTP {code}: {reason}")]
    Status { code: u16, reason: String },

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Decode error: {0}")]
    Decode(String),

    #[error("HTTP client error: {0}")]
    HttpClient(String),
}

impl LoadError {
    /// Status recorded for the load this error belongs to.
    pub fn status(&self) -> LoadStatus {
        match self {
            Self::Status { code, reason } => LoadStatus::new(*code, reason.clone()),
            other => LoadStatus::transport(other.to_string()),
        }
    }
}

pub type LoadResult<T> = Result<T, LoadError>;
