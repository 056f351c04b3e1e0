//! Model selection and download
//!
//! Once a model is chosen the pull runs on a worker thread until the engine
//! reports success or failure. It cannot be cancelled: abandoning it would
//! leave a partially downloaded model the app can no longer observe.

use std::sync::Arc;
use std::time::Duration;

use crate::background::{run_in_background, BackgroundTask, TaskEvent};
use crate::engine::{ModelEngine, PullProgressEvent};

use super::catalog::{annotate, is_installed, CandidateModel, CatalogEntry};
use super::error::AcquisitionError;
use super::negotiator::ConnectedEngine;
use super::progress::ProgressUpdate;
use super::ui::ProgressDisplay;

pub const PULL_FAILED_MESSAGE: &str = "Download failed. Check your connection and try again.";
pub const PULL_FAILED_HINT: &str =
    "You can restart setup, or pull the model manually via the Ollama CLI.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AcquisitionState {
    AwaitingSelection,
    Pulling { model: String },
    Completed { model: String, pulled: bool },
    Failed { model: String, message: String },
    Cancelled,
}

impl AcquisitionState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            AcquisitionState::Completed { .. }
                | AcquisitionState::Failed { .. }
                | AcquisitionState::Cancelled
        )
    }
}

/// Terminal result of a pull, as shown to the user
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PullOutcome {
    Succeeded {
        model: String,
        /// Last status text the engine sent
        final_status: Option<String>,
        /// `true` only when the stream carried an explicit "success" record;
        /// `false` means the stream simply ended
        confirmed: bool,
    },
    Failed {
        model: String,
        message: String,
    },
}

type PullTask = BackgroundTask<PullProgressEvent, bool>;

pub struct ModelAcquisitionOrchestrator {
    engine: Arc<dyn ModelEngine>,
    connection: ConnectedEngine,
    catalog: Vec<CandidateModel>,
    state: AcquisitionState,
    pull: Option<PullTask>,
    last_status: Option<String>,
}

impl ModelAcquisitionOrchestrator {
    pub fn new(
        engine: Arc<dyn ModelEngine>,
        connection: ConnectedEngine,
        catalog: Vec<CandidateModel>,
    ) -> Self {
        Self {
            engine,
            connection,
            catalog,
            state: AcquisitionState::AwaitingSelection,
            pull: None,
            last_status: None,
        }
    }

    pub fn state(&self) -> &AcquisitionState {
        &self.state
    }

    pub fn connection(&self) -> &ConnectedEngine {
        &self.connection
    }

    pub fn is_finished(&self) -> bool {
        self.state.is_terminal()
    }

    pub fn last_status(&self) -> Option<&str> {
        self.last_status.as_deref()
    }

    /// Catalog annotated with what the engine already has
    pub fn entries(&self) -> Vec<CatalogEntry> {
        annotate(&self.catalog, &self.connection.installed_models)
    }

    /// Choose a catalog model; starts a pull unless it is already installed
    pub fn select(&mut self, model_name: &str) -> Result<(), AcquisitionError> {
        if self.state != AcquisitionState::AwaitingSelection {
            return Err(AcquisitionError::NotAwaitingSelection);
        }
        if !self.catalog.iter().any(|m| m.name == model_name) {
            return Err(AcquisitionError::UnknownModel(model_name.to_string()));
        }

        if is_installed(model_name, &self.connection.installed_models) {
            log::info!("Model '{}' already installed, skipping pull", model_name);
            self.state = AcquisitionState::Completed {
                model: model_name.to_string(),
                pulled: false,
            };
            return Ok(());
        }

        self.begin_pull(model_name.to_string());
        Ok(())
    }

    /// Only honoured before a model is chosen
    pub fn cancel(&mut self) -> Result<(), AcquisitionError> {
        match self.state {
            AcquisitionState::AwaitingSelection => {
                log::info!("Model selection cancelled");
                self.state = AcquisitionState::Cancelled;
                Ok(())
            }
            AcquisitionState::Pulling { .. } => Err(AcquisitionError::PullInFlight),
            _ => Err(AcquisitionError::NotAwaitingSelection),
        }
    }

    /// Forward every queued pull event to `display`, without waiting
    pub fn poll(&mut self, display: &mut dyn ProgressDisplay) -> &AcquisitionState {
        while let Some(event) = self.pull.as_mut().and_then(|task| task.try_next()) {
            self.handle(event, display);
        }
        &self.state
    }

    /// Wait up to `timeout` for the next event, then forward everything queued
    pub fn poll_timeout(
        &mut self,
        timeout: Duration,
        display: &mut dyn ProgressDisplay,
    ) -> &AcquisitionState {
        if let Some(event) = self.pull.as_mut().and_then(|task| task.next_timeout(timeout)) {
            self.handle(event, display);
        }
        self.poll(display)
    }

    fn begin_pull(&mut self, model: String) {
        let engine = Arc::clone(&self.engine);
        let base_url = self.connection.base_url.clone();
        let name = model.clone();

        let spawned = run_in_background(format!("model-pull-{}", model), move |sink| {
            engine.pull(&base_url, &name, &mut |event| {
                sink.send(event);
            })
        });

        match spawned {
            Ok(task) => {
                log::info!("Pulling model '{}'", model);
                self.pull = Some(task);
                self.state = AcquisitionState::Pulling { model };
            }
            Err(e) => {
                log::error!("Could not start pull worker for '{}': {}", model, e);
                self.state = AcquisitionState::Failed {
                    model,
                    message: PULL_FAILED_MESSAGE.to_string(),
                };
            }
        }
    }

    fn handle(&mut self, event: TaskEvent<PullProgressEvent, bool>, display: &mut dyn ProgressDisplay) {
        let AcquisitionState::Pulling { model } = &self.state else {
            return;
        };
        let model = model.clone();

        let succeeded = match event {
            TaskEvent::Progress(progress) => {
                self.last_status = Some(progress.status.clone());
                display.update(&ProgressUpdate::from(&progress));
                return;
            }
            TaskEvent::Finished(succeeded) => succeeded,
            TaskEvent::Panicked(message) => {
                log::error!("Pull worker for '{}' failed: {}", model, message);
                false
            }
        };
        self.pull = None;

        let outcome = if succeeded {
            let confirmed = self.last_status.as_deref() == Some(PullProgressEvent::SUCCESS_STATUS);
            if !confirmed {
                log::warn!(
                    "Pull of '{}' ended without explicit success (last status {:?})",
                    model,
                    self.last_status
                );
            }
            self.state = AcquisitionState::Completed {
                model: model.clone(),
                pulled: true,
            };
            PullOutcome::Succeeded {
                model,
                final_status: self.last_status.clone(),
                confirmed,
            }
        } else {
            self.state = AcquisitionState::Failed {
                model: model.clone(),
                message: PULL_FAILED_MESSAGE.to_string(),
            };
            PullOutcome::Failed {
                model,
                message: PULL_FAILED_MESSAGE.to_string(),
            }
        };

        display.finished(&outcome);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::onboarding::catalog::candidate_models;
    use crate::onboarding::progress::Progress;
    use crate::onboarding::testing::{settle_acquisition, RecordingDisplay, ScriptedEngine};

    fn connection(installed: &[&str]) -> ConnectedEngine {
        ConnectedEngine {
            base_url: "http://localhost:11434".to_string(),
            installed_models: installed.iter().map(|s| s.to_string()).collect(),
        }
    }

    fn orchestrator(engine: Arc<ScriptedEngine>, installed: &[&str]) -> ModelAcquisitionOrchestrator {
        ModelAcquisitionOrchestrator::new(engine, connection(installed), candidate_models())
    }

    #[test]
    fn test_entries_flag_installed_models() {
        let engine = Arc::new(ScriptedEngine::new(vec![]));
        let acquisition = orchestrator(engine, &["llama3.2:3b-q4"]);
        let flags: Vec<_> = acquisition
            .entries()
            .iter()
            .map(|e| (e.model.name.clone(), e.installed))
            .collect();

        assert_eq!(
            flags,
            vec![
                ("qwen2.5:3b".to_string(), false),
                ("llama3.2:3b".to_string(), true),
                ("deepseek-r1:8b".to_string(), false),
            ]
        );
    }

    #[test]
    fn test_installed_model_completes_without_pull() {
        let engine = Arc::new(ScriptedEngine::new(vec![]));
        let mut acquisition = orchestrator(engine.clone(), &["qwen2.5:3b"]);

        acquisition.select("qwen2.5:3b").unwrap();
        assert_eq!(
            acquisition.state(),
            &AcquisitionState::Completed {
                model: "qwen2.5:3b".to_string(),
                pulled: false
            }
        );
        assert!(engine.pulled_models().is_empty());
    }

    #[test]
    fn test_pull_forwards_progress_in_order() {
        let engine = Arc::new(ScriptedEngine::new(vec![]).with_pull(
            vec![
                PullProgressEvent::new("pulling manifest", 0, 0),
                PullProgressEvent::new("downloading", 512, 1024),
                PullProgressEvent::new("success", 0, 0),
            ],
            true,
        ));
        let mut acquisition = orchestrator(engine.clone(), &[]);
        let mut display = RecordingDisplay::default();

        acquisition.select("llama3.2:3b").unwrap();
        settle_acquisition(&mut acquisition, &mut display);

        assert_eq!(engine.pulled_models(), vec!["llama3.2:3b"]);
        assert_eq!(display.updates.len(), 3);
        assert_eq!(display.updates[0].progress, Progress::Indeterminate);
        assert_eq!(
            display.updates[1].progress,
            Progress::Percent {
                value: 50.0,
                completed_bytes: 512,
                total_bytes: 1024
            }
        );
        assert_eq!(display.updates[2].status, "success");
        assert_eq!(
            display.outcomes,
            vec![PullOutcome::Succeeded {
                model: "llama3.2:3b".to_string(),
                final_status: Some("success".to_string()),
                confirmed: true,
            }]
        );
        assert_eq!(
            acquisition.state(),
            &AcquisitionState::Completed {
                model: "llama3.2:3b".to_string(),
                pulled: true
            }
        );
    }

    #[test]
    fn test_ambiguous_end_of_stream_is_unconfirmed_success() {
        let engine = Arc::new(ScriptedEngine::new(vec![]).with_pull(
            vec![PullProgressEvent::new("writing manifest", 0, 0)],
            true,
        ));
        let mut acquisition = orchestrator(engine, &[]);
        let mut display = RecordingDisplay::default();

        acquisition.select("deepseek-r1:8b").unwrap();
        settle_acquisition(&mut acquisition, &mut display);

        assert_eq!(acquisition.last_status(), Some("writing manifest"));
        assert_eq!(
            display.outcomes,
            vec![PullOutcome::Succeeded {
                model: "deepseek-r1:8b".to_string(),
                final_status: Some("writing manifest".to_string()),
                confirmed: false,
            }]
        );
    }

    #[test]
    fn test_pull_failure_is_terminal() {
        let engine = Arc::new(ScriptedEngine::new(vec![]).with_pull(vec![], false));
        let mut acquisition = orchestrator(engine, &[]);
        let mut display = RecordingDisplay::default();

        acquisition.select("qwen2.5:3b").unwrap();
        settle_acquisition(&mut acquisition, &mut display);

        assert_eq!(
            acquisition.state(),
            &AcquisitionState::Failed {
                model: "qwen2.5:3b".to_string(),
                message: PULL_FAILED_MESSAGE.to_string()
            }
        );
        assert!(display.updates.is_empty());
        assert!(matches!(display.outcomes[0], PullOutcome::Failed { .. }));
    }

    struct PanickingEngine;

    impl ModelEngine for PanickingEngine {
        fn probe(&self, _: &str) -> crate::engine::ConnectionProbeResult {
            crate::engine::ConnectionProbeResult::failed()
        }

        fn pull(&self, _: &str, _: &str, on_event: &mut dyn FnMut(PullProgressEvent)) -> bool {
            on_event(PullProgressEvent::new("pulling manifest", 0, 0));
            panic!("pull worker crashed");
        }
    }

    #[test]
    fn test_worker_panic_is_a_failed_pull() {
        let mut acquisition =
            ModelAcquisitionOrchestrator::new(Arc::new(PanickingEngine), connection(&[]), candidate_models());
        let mut display = RecordingDisplay::default();

        acquisition.select("qwen2.5:3b").unwrap();
        settle_acquisition(&mut acquisition, &mut display);

        assert_eq!(display.updates.len(), 1);
        assert!(matches!(acquisition.state(), AcquisitionState::Failed { .. }));
        assert!(matches!(display.outcomes[0], PullOutcome::Failed { .. }));
    }

    #[test]
    fn test_cancel_only_before_selection() {
        let engine = Arc::new(ScriptedEngine::new(vec![]));
        let mut acquisition = orchestrator(engine.clone(), &[]);
        acquisition.cancel().unwrap();
        assert_eq!(acquisition.state(), &AcquisitionState::Cancelled);
        assert_eq!(
            acquisition.select("qwen2.5:3b"),
            Err(AcquisitionError::NotAwaitingSelection)
        );
        assert!(engine.pulled_models().is_empty());
    }

    #[test]
    fn test_cancel_refused_while_pulling() {
        let (engine, gate) = ScriptedEngine::new(vec![])
            .with_pull(vec![PullProgressEvent::new("success", 0, 0)], true)
            .gated();
        let engine = Arc::new(engine);
        let mut acquisition = orchestrator(engine, &[]);
        let mut display = RecordingDisplay::default();

        acquisition.select("qwen2.5:3b").unwrap();
        assert_eq!(acquisition.cancel(), Err(AcquisitionError::PullInFlight));
        assert!(matches!(
            acquisition.poll(&mut display),
            AcquisitionState::Pulling { .. }
        ));

        gate.send(()).unwrap();
        settle_acquisition(&mut acquisition, &mut display);
        assert!(matches!(
            acquisition.state(),
            AcquisitionState::Completed { pulled: true, .. }
        ));
    }

    #[test]
    fn test_unknown_model_is_rejected() {
        let engine = Arc::new(ScriptedEngine::new(vec![]));
        let mut acquisition = orchestrator(engine, &[]);
        assert_eq!(
            acquisition.select("gpt-oss:120b"),
            Err(AcquisitionError::UnknownModel("gpt-oss:120b".to_string()))
        );
        assert_eq!(acquisition.state(), &AcquisitionState::AwaitingSelection);
    }
}
