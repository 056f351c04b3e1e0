//! Engine client errors
//!
//! These stay inside the client. Callers of [`super::ModelEngine`] only ever
//! see the collapsed boolean / empty-list outcomes.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Cannot reach engine: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Engine returned HTTP {0}")]
    Status(reqwest::StatusCode),

    #[error("Malformed engine response: {0}")]
    MalformedBody(#[from] serde_json::Error),

    #[error("Stream read failed: {0}")]
    Stream(#[from] std::io::Error),
}

impl EngineError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, EngineError::Transport(e) if e.is_timeout())
    }
}
