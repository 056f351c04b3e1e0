//! Onboarding workflow errors
//!
//! All of these reject an action without changing workflow state.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NegotiationError {
    /// Empty host or port on manual retry
    #[error("{0}")]
    InvalidInput(String),

    #[error("A connection attempt is already in progress")]
    ProbeInFlight,

    #[error("Manual endpoint entry is not available right now")]
    NotAwaitingInput,

    #[error("Negotiation has already started")]
    AlreadyStarted,

    #[error("Negotiation session is already finished")]
    SessionFinished,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AcquisitionError {
    #[error("Unknown model: {0}")]
    UnknownModel(String),

    #[error("A model download is in progress and cannot be interrupted")]
    PullInFlight,

    #[error("A model has already been chosen")]
    NotAwaitingSelection,
}
