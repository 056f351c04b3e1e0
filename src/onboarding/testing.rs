//! Fake engines and collaborators shared by the onboarding tests

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use crossbeam::channel::{self, Receiver, Sender};

use crate::engine::{ConnectionProbeResult, ModelEngine, PullProgressEvent};

use super::acquisition::{ModelAcquisitionOrchestrator, PullOutcome};
use super::negotiator::{ConnectionNegotiator, NegotiationState};
use super::progress::ProgressUpdate;
use super::ui::ProgressDisplay;

const SETTLE_DEADLINE: Duration = Duration::from_secs(5);
const SETTLE_STEP: Duration = Duration::from_millis(10);

/// Answers probes from a script (failure once the script runs out) and
/// replays a fixed pull stream
pub struct ScriptedEngine {
    probes: Mutex<VecDeque<ConnectionProbeResult>>,
    probed: Mutex<Vec<String>>,
    pull_events: Vec<PullProgressEvent>,
    pull_result: bool,
    pull_gate: Option<Receiver<()>>,
    pulled: Mutex<Vec<String>>,
}

impl ScriptedEngine {
    pub fn new(probes: Vec<ConnectionProbeResult>) -> Self {
        Self {
            probes: Mutex::new(probes.into()),
            probed: Mutex::new(Vec::new()),
            pull_events: Vec::new(),
            pull_result: true,
            pull_gate: None,
            pulled: Mutex::new(Vec::new()),
        }
    }

    pub fn with_pull(mut self, events: Vec<PullProgressEvent>, result: bool) -> Self {
        self.pull_events = events;
        self.pull_result = result;
        self
    }

    /// Pulls block until the returned sender fires
    pub fn gated(mut self) -> (Self, Sender<()>) {
        let (tx, rx) = channel::bounded(1);
        self.pull_gate = Some(rx);
        (self, tx)
    }

    pub fn probed_urls(&self) -> Vec<String> {
        self.probed.lock().unwrap().clone()
    }

    pub fn pulled_models(&self) -> Vec<String> {
        self.pulled.lock().unwrap().clone()
    }
}

impl ModelEngine for ScriptedEngine {
    fn probe(&self, base_url: &str) -> ConnectionProbeResult {
        self.probed.lock().unwrap().push(base_url.to_string());
        self.probes
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(ConnectionProbeResult::failed)
    }

    fn pull(
        &self,
        _base_url: &str,
        model_name: &str,
        on_event: &mut dyn FnMut(PullProgressEvent),
    ) -> bool {
        self.pulled.lock().unwrap().push(model_name.to_string());
        if let Some(gate) = &self.pull_gate {
            let _ = gate.recv();
        }
        for event in &self.pull_events {
            on_event(event.clone());
        }
        self.pull_result
    }
}

/// Probes block until a result is released
pub struct GatedProbeEngine {
    tx: Sender<ConnectionProbeResult>,
    rx: Receiver<ConnectionProbeResult>,
}

impl GatedProbeEngine {
    pub fn new() -> Self {
        let (tx, rx) = channel::unbounded();
        Self { tx, rx }
    }

    pub fn release(&self, result: ConnectionProbeResult) {
        self.tx.send(result).unwrap();
    }
}

impl ModelEngine for GatedProbeEngine {
    fn probe(&self, _base_url: &str) -> ConnectionProbeResult {
        self.rx
            .recv()
            .unwrap_or_else(|_| ConnectionProbeResult::failed())
    }

    fn pull(&self, _: &str, _: &str, _: &mut dyn FnMut(PullProgressEvent)) -> bool {
        false
    }
}

#[derive(Default)]
pub struct RecordingDisplay {
    pub updates: Vec<ProgressUpdate>,
    pub outcomes: Vec<PullOutcome>,
}

impl ProgressDisplay for RecordingDisplay {
    fn update(&mut self, update: &ProgressUpdate) {
        self.updates.push(update.clone());
    }

    fn finished(&mut self, outcome: &PullOutcome) {
        self.outcomes.push(outcome.clone());
    }
}

pub fn settle_negotiation(negotiator: &mut ConnectionNegotiator) {
    let deadline = Instant::now() + SETTLE_DEADLINE;
    while matches!(negotiator.poll_timeout(SETTLE_STEP), NegotiationState::Probing { .. }) {
        assert!(Instant::now() < deadline, "probe did not finish");
    }
}

pub fn settle_acquisition(acquisition: &mut ModelAcquisitionOrchestrator, display: &mut RecordingDisplay) {
    let deadline = Instant::now() + SETTLE_DEADLINE;
    while !acquisition.poll_timeout(SETTLE_STEP, display).is_terminal() {
        assert!(Instant::now() < deadline, "pull did not finish");
    }
}
