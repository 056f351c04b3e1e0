//! Contracts with the user-facing collaborators
//!
//! The workflow drives these from the consumer thread only. None of them is
//! called while it would race a worker; blocking inside a prompt is fine.

use super::acquisition::PullOutcome;
use super::catalog::CatalogEntry;
use super::negotiator::ConnectedEngine;
use super::progress::ProgressUpdate;

/// Answer to a manual endpoint prompt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ManualEntry {
    Submit { host: String, port: String },
    Cancel,
}

/// Pre-filled values for the host/port form
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManualDefaults {
    pub host: String,
    pub port: String,
}

impl Default for ManualDefaults {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: "11434".to_string(),
        }
    }
}

pub trait ConnectionPrompt {
    /// A probe against `base_url` has started; retry should look disabled
    fn probing(&mut self, base_url: &str);

    fn connected(&mut self, connection: &ConnectedEngine);

    /// The last probe failed; ask for a host and port or a cancellation
    fn request_endpoint(&mut self, failed_url: &str, defaults: &ManualDefaults) -> ManualEntry;

    /// Inline rejection of an action (e.g. empty host or port)
    fn invalid_input(&mut self, message: &str);
}

pub trait ModelPicker {
    /// `None` cancels onboarding
    fn choose_model(&mut self, entries: &[CatalogEntry]) -> Option<String>;
}

pub trait ProgressDisplay {
    fn update(&mut self, update: &ProgressUpdate);

    fn finished(&mut self, outcome: &PullOutcome);
}

/// Everything the onboarding flow talks to
pub trait OnboardingUi: ConnectionPrompt + ModelPicker + ProgressDisplay {
    /// Called between bounded waits so the front-end can process its own events
    fn pump(&mut self) {}
}
