//! End-to-end onboarding: connect, choose a model, pull it if needed
//!
//! Runs entirely on the calling (consumer) thread; network I/O happens on
//! workers. Settings are not touched here. The caller persists the returned
//! [`OnboardingOutcome`] once, after the workflow finishes.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;

use crate::database::{SettingsStore, AI_API_URL_KEY, AI_MODEL_KEY};
use crate::engine::ModelEngine;

use super::acquisition::{AcquisitionState, ModelAcquisitionOrchestrator};
use super::catalog::{candidate_models, CandidateModel};
use super::negotiator::{
    derive_default_base_url, generate_endpoint, ConnectedEngine, ConnectionNegotiator, NegotiationState,
};
use super::ui::{ManualDefaults, ManualEntry, OnboardingUi};

/// What onboarding produced
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OnboardingOutcome {
    /// Only ever a base URL validated in this run
    pub base_url: Option<String>,
    pub chosen_model: Option<String>,
    pub completed: bool,
}

impl OnboardingOutcome {
    /// Write the validated endpoint and the chosen model back to settings
    pub fn persist(&self, store: &dyn SettingsStore) -> Result<()> {
        if let Some(base_url) = &self.base_url {
            store.set_setting(AI_API_URL_KEY, &generate_endpoint(base_url))?;
        }
        if let Some(model) = &self.chosen_model {
            store.set_setting(AI_MODEL_KEY, model)?;
        }
        Ok(())
    }
}

/// Onboarding workflow configuration
#[derive(Debug, Clone)]
pub struct OnboardingConfig {
    /// Longest the consumer waits on a worker before pumping the UI again
    pub poll_interval: Duration,
    pub manual_defaults: ManualDefaults,
    pub catalog: Vec<CandidateModel>,
}

impl Default for OnboardingConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(50),
            manual_defaults: ManualDefaults::default(),
            catalog: candidate_models(),
        }
    }
}

/// Run the full onboarding sequence.
///
/// `stored_endpoint` is the previously persisted generate endpoint, if any; it
/// only seeds the first probe.
pub fn run_onboarding<U: OnboardingUi>(
    engine: Arc<dyn ModelEngine>,
    stored_endpoint: Option<&str>,
    ui: &mut U,
    config: &OnboardingConfig,
) -> OnboardingOutcome {
    let mut outcome = OnboardingOutcome::default();

    let Some(connection) = negotiate(Arc::clone(&engine), stored_endpoint, ui, config) else {
        return outcome;
    };
    outcome.base_url = Some(connection.base_url.clone());

    let mut acquisition = ModelAcquisitionOrchestrator::new(engine, connection, config.catalog.clone());
    loop {
        let entries = acquisition.entries();
        let Some(model) = ui.choose_model(&entries) else {
            if let Err(e) = acquisition.cancel() {
                log::warn!("Could not cancel model selection: {}", e);
            }
            return outcome;
        };

        match acquisition.select(&model) {
            Ok(()) => {
                outcome.chosen_model = Some(model);
                break;
            }
            Err(e) => ui.invalid_input(&e.to_string()),
        }
    }

    while !acquisition.is_finished() {
        ui.pump();
        acquisition.poll_timeout(config.poll_interval, ui);
    }

    outcome.completed = matches!(acquisition.state(), AcquisitionState::Completed { .. });
    log::info!(
        "Onboarding finished: model {:?}, completed {}",
        outcome.chosen_model,
        outcome.completed
    );
    outcome
}

fn negotiate<U: OnboardingUi>(
    engine: Arc<dyn ModelEngine>,
    stored_endpoint: Option<&str>,
    ui: &mut U,
    config: &OnboardingConfig,
) -> Option<ConnectedEngine> {
    let mut negotiator = ConnectionNegotiator::new(engine);
    let default_base_url = derive_default_base_url(stored_endpoint);

    if let Err(e) = negotiator.start(&default_base_url) {
        log::error!("Could not start engine negotiation: {}", e);
        return None;
    }
    ui.probing(&default_base_url);

    loop {
        ui.pump();
        match negotiator.poll_timeout(config.poll_interval).clone() {
            NegotiationState::Idle | NegotiationState::Probing { .. } => continue,
            NegotiationState::AwaitingManualInput { failed_url } => {
                match ui.request_endpoint(&failed_url, &config.manual_defaults) {
                    ManualEntry::Submit { host, port } => {
                        match negotiator.submit_manual(&host, &port) {
                            Ok(()) => {
                                if let NegotiationState::Probing { base_url } = negotiator.state() {
                                    ui.probing(base_url);
                                }
                            }
                            Err(e) => ui.invalid_input(&e.to_string()),
                        }
                    }
                    ManualEntry::Cancel => {
                        if let Err(e) = negotiator.cancel() {
                            log::warn!("Could not cancel negotiation: {}", e);
                        }
                    }
                }
            }
            NegotiationState::Connected(connection) => {
                ui.connected(&connection);
                return Some(connection);
            }
            NegotiationState::Cancelled => return None,
        }
    }
}
