//! First-launch onboarding
//!
//! Module structure:
//! - negotiator.rs: engine connection state machine (probe, manual retry, cancel)
//! - catalog.rs: recommended models and installed-flag matching
//! - acquisition.rs: model selection and pull orchestration
//! - progress.rs: percentage / indeterminate progress values
//! - ui.rs: collaborator traits the front-end implements
//! - flow.rs: end-to-end driver and outcome persistence
//! - error.rs: rejected-action errors

pub mod negotiator;
pub mod catalog;
pub mod acquisition;
pub mod progress;
pub mod ui;
pub mod flow;
pub mod error;

#[cfg(test)]
pub(crate) mod testing;

pub use acquisition::{AcquisitionState, ModelAcquisitionOrchestrator, PullOutcome};
pub use catalog::{candidate_models, CandidateModel, CatalogEntry};
pub use error::{AcquisitionError, NegotiationError};
pub use flow::{run_onboarding, OnboardingConfig, OnboardingOutcome};
pub use negotiator::{
    derive_default_base_url, generate_endpoint, ConnectedEngine, ConnectionNegotiator,
    NegotiationState,
};
pub use progress::{format_bytes, percent_complete, Progress, ProgressUpdate};
pub use ui::{ConnectionPrompt, ManualDefaults, ManualEntry, ModelPicker, OnboardingUi, ProgressDisplay};
