//! Engine connection negotiation
//!
//! Idle -> Probing -> Connected
//!                 -> AwaitingManualInput -> Probing (retry, unlimited)
//! Any non-terminal state -> Cancelled
//!
//! A base URL only counts as validated once a probe against it succeeds in
//! the current session, so even a previously stored endpoint is probed again.

use std::sync::Arc;
use std::time::Duration;

use url::Url;
use uuid::Uuid;

use crate::background::{run_in_background, BackgroundTask, TaskEvent};
use crate::engine::{endpoint, ConnectionProbeResult, ModelEngine, DEFAULT_ENGINE_BASE_URL, GENERATE_PATH};

use super::error::NegotiationError;

/// A validated engine connection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectedEngine {
    pub base_url: String,
    pub installed_models: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NegotiationState {
    Idle,
    Probing { base_url: String },
    AwaitingManualInput { failed_url: String },
    Connected(ConnectedEngine),
    Cancelled,
}

impl NegotiationState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, NegotiationState::Connected(_) | NegotiationState::Cancelled)
    }
}

type ProbeTask = BackgroundTask<(), ConnectionProbeResult>;

pub struct ConnectionNegotiator {
    engine: Arc<dyn ModelEngine>,
    session_id: Uuid,
    state: NegotiationState,
    probe: Option<ProbeTask>,
    attempts: u32,
}

impl ConnectionNegotiator {
    pub fn new(engine: Arc<dyn ModelEngine>) -> Self {
        Self {
            engine,
            session_id: Uuid::new_v4(),
            state: NegotiationState::Idle,
            probe: None,
            attempts: 0,
        }
    }

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    pub fn state(&self) -> &NegotiationState {
        &self.state
    }

    /// Probes started in this session
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Manual entry is only offered while no probe is outstanding
    pub fn can_submit(&self) -> bool {
        matches!(self.state, NegotiationState::AwaitingManualInput { .. })
    }

    /// Begin the session by probing `default_base_url`
    pub fn start(&mut self, default_base_url: &str) -> Result<(), NegotiationError> {
        if self.state != NegotiationState::Idle {
            return Err(NegotiationError::AlreadyStarted);
        }
        log::info!(
            "[{}] Negotiating engine connection, default {}",
            self.session_id,
            default_base_url
        );
        self.begin_probe(default_base_url.to_string());
        Ok(())
    }

    /// Retry with a user-supplied host and port
    pub fn submit_manual(&mut self, host: &str, port: &str) -> Result<(), NegotiationError> {
        match self.state {
            NegotiationState::AwaitingManualInput { .. } => {}
            NegotiationState::Probing { .. } => return Err(NegotiationError::ProbeInFlight),
            _ => return Err(NegotiationError::NotAwaitingInput),
        }

        let base_url = manual_base_url(host, port)?;
        self.begin_probe(base_url);
        Ok(())
    }

    /// Abandon the session. A probe still in flight runs to completion but its
    /// result is discarded.
    pub fn cancel(&mut self) -> Result<(), NegotiationError> {
        if self.state.is_terminal() {
            return Err(NegotiationError::SessionFinished);
        }
        if self.probe.take().is_some() {
            log::debug!("[{}] Discarding in-flight probe", self.session_id);
        }
        log::info!("[{}] Engine connection cancelled", self.session_id);
        self.state = NegotiationState::Cancelled;
        Ok(())
    }

    /// Apply a finished probe, if any, without waiting
    pub fn poll(&mut self) -> &NegotiationState {
        let event = self.probe.as_mut().and_then(|task| task.try_next());
        if let Some(event) = event {
            self.handle(event);
        }
        &self.state
    }

    /// Like [`Self::poll`] but waits up to `timeout` for the probe to finish
    pub fn poll_timeout(&mut self, timeout: Duration) -> &NegotiationState {
        let event = self.probe.as_mut().and_then(|task| task.next_timeout(timeout));
        if let Some(event) = event {
            self.handle(event);
        }
        &self.state
    }

    /// The validated connection, once `Connected`
    pub fn into_connection(self) -> Option<ConnectedEngine> {
        match self.state {
            NegotiationState::Connected(connection) => Some(connection),
            _ => None,
        }
    }

    fn begin_probe(&mut self, base_url: String) {
        self.attempts += 1;
        log::info!(
            "[{}] Probe #{} against {}",
            self.session_id,
            self.attempts,
            base_url
        );

        let engine = Arc::clone(&self.engine);
        let url = base_url.clone();
        match run_in_background(format!("engine-probe-{}", self.attempts), move |_| {
            engine.probe(&url)
        }) {
            Ok(task) => {
                self.probe = Some(task);
                self.state = NegotiationState::Probing { base_url };
            }
            Err(e) => {
                log::error!("[{}] Could not start probe worker: {}", self.session_id, e);
                self.state = NegotiationState::AwaitingManualInput { failed_url: base_url };
            }
        }
    }

    fn handle(&mut self, event: TaskEvent<(), ConnectionProbeResult>) {
        let NegotiationState::Probing { base_url } = &self.state else {
            return;
        };
        let base_url = base_url.clone();

        let result = match event {
            TaskEvent::Progress(()) => return,
            TaskEvent::Finished(result) => result,
            TaskEvent::Panicked(message) => {
                log::error!("[{}] Probe worker failed: {}", self.session_id, message);
                ConnectionProbeResult::failed()
            }
        };
        self.probe = None;

        if result.succeeded {
            log::info!("[{}] Connected to {}", self.session_id, base_url);
            self.state = NegotiationState::Connected(ConnectedEngine {
                base_url,
                installed_models: result.installed_models,
            });
        } else {
            log::warn!(
                "[{}] Could not connect to {}, waiting for manual endpoint",
                self.session_id,
                base_url
            );
            self.state = NegotiationState::AwaitingManualInput { failed_url: base_url };
        }
    }
}

/// `http://{host}:{port}` from trimmed manual input; both parts required
pub fn manual_base_url(host: &str, port: &str) -> Result<String, NegotiationError> {
    let host = host.trim();
    let port = port.trim();
    if host.is_empty() || port.is_empty() {
        return Err(NegotiationError::InvalidInput(
            "Please enter both a host and a port.".to_string(),
        ));
    }
    Ok(format!("http://{}:{}", host, port))
}

/// Starting base URL: `scheme://netloc` of a stored absolute endpoint
/// (e.g. ".../api/generate") exactly as written, otherwise the default local
/// engine address
pub fn derive_default_base_url(stored_endpoint: Option<&str>) -> String {
    let Some(stored) = stored_endpoint.map(str::trim).filter(|s| !s.is_empty()) else {
        return DEFAULT_ENGINE_BASE_URL.to_string();
    };

    match Url::parse(stored) {
        Ok(url) if url.host_str().is_some_and(|h| !h.is_empty()) => match origin_prefix(stored) {
            Some(origin) => origin.to_string(),
            None => DEFAULT_ENGINE_BASE_URL.to_string(),
        },
        Ok(_) => DEFAULT_ENGINE_BASE_URL.to_string(),
        Err(e) => {
            log::debug!("Stored endpoint '{}' is not an absolute URL: {}", stored, e);
            DEFAULT_ENGINE_BASE_URL.to_string()
        }
    }
}

// Raw text, so explicit default ports and userinfo survive
fn origin_prefix(endpoint: &str) -> Option<&str> {
    let netloc_start = endpoint.find("://")? + 3;
    let netloc_len = endpoint[netloc_start..]
        .find(|c: char| matches!(c, '/' | '?' | '#'))
        .unwrap_or(endpoint.len() - netloc_start);
    if netloc_len == 0 {
        return None;
    }
    Some(&endpoint[..netloc_start + netloc_len])
}

/// Endpoint persisted to settings for a validated base URL
pub fn generate_endpoint(base_url: &str) -> String {
    endpoint(base_url, GENERATE_PATH)
}
