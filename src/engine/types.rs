//! Engine client types

use serde::{Deserialize, Serialize};

/// Outcome of a single connectivity probe
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConnectionProbeResult {
    pub succeeded: bool,
    /// Model names as reported by the engine, order preserved
    pub installed_models: Vec<String>,
}

impl ConnectionProbeResult {
    pub fn failed() -> Self {
        Self::default()
    }

    pub fn connected(installed_models: Vec<String>) -> Self {
        Self {
            succeeded: true,
            installed_models,
        }
    }
}

/// One decoded record of the pull stream
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PullProgressEvent {
    pub status: String,
    pub completed_bytes: u64,
    /// 0 while the engine has not reported a size yet
    pub total_bytes: u64,
}

impl PullProgressEvent {
    pub const SUCCESS_STATUS: &'static str = "success";

    pub fn new(status: impl Into<String>, completed_bytes: u64, total_bytes: u64) -> Self {
        Self {
            status: status.into(),
            completed_bytes,
            total_bytes,
        }
    }

    /// Whether this record ends the pull
    pub fn is_terminal(&self) -> bool {
        self.status == Self::SUCCESS_STATUS
    }

    pub fn is_indeterminate(&self) -> bool {
        self.total_bytes == 0
    }
}

/// `/api/tags` response
#[derive(Debug, Deserialize)]
pub(crate) struct TagsResponse {
    pub models: Vec<TagsEntry>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TagsEntry {
    pub name: String,
}

/// `/api/pull` request body
#[derive(Debug, Serialize)]
pub(crate) struct PullRequest<'a> {
    pub name: &'a str,
}
