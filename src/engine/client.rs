//! HTTP client for the local model-serving engine (Ollama API)
//!
//! Both operations block and are meant to run on a worker thread
//! (see [`crate::background`]). Every transport fault is logged here and
//! collapsed into the plain outcome the caller sees.

use std::io::{self, BufRead, BufReader, Read};
use std::time::Duration;

use reqwest::blocking::Client;

use super::error::EngineError;
use super::parser::parse_pull_line;
use super::types::{ConnectionProbeResult, PullProgressEvent, PullRequest, TagsResponse};

pub const DEFAULT_ENGINE_BASE_URL: &str = "http://localhost:11434";
pub const TAGS_PATH: &str = "/api/tags";
pub const PULL_PATH: &str = "/api/pull";
pub const GENERATE_PATH: &str = "/api/generate";

/// Longest pull record accepted; anything longer is dropped as noise
pub const MAX_PULL_LINE_BYTES: usize = 1024 * 1024;

/// Operations the onboarding workflow needs from an engine
pub trait ModelEngine: Send + Sync {
    /// Short connectivity check. Never fails; a broken engine is `succeeded == false`.
    fn probe(&self, base_url: &str) -> ConnectionProbeResult;

    /// Download `model_name`, handing every decoded progress record to `on_event`
    /// in stream order. Returns `false` on a non-2xx response or a transport fault.
    fn pull(
        &self,
        base_url: &str,
        model_name: &str,
        on_event: &mut dyn FnMut(PullProgressEvent),
    ) -> bool;
}

/// Engine client configuration
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub probe_timeout: Duration,
    /// `None` disables the timeout; model downloads can take arbitrarily long
    pub pull_timeout: Option<Duration>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            probe_timeout: Duration::from_secs(5),
            pull_timeout: None,
        }
    }
}

/// Join a base URL and an API path, dropping trailing slashes from the base
pub fn endpoint(base_url: &str, path: &str) -> String {
    format!("{}{}", base_url.trim_end_matches('/'), path)
}

pub struct EngineClient {
    config: EngineConfig,
    probe_client: Client,
    pull_client: Client,
}

impl EngineClient {
    pub fn new(config: EngineConfig) -> Result<Self, EngineError> {
        let probe_client = Client::builder().timeout(config.probe_timeout).build()?;
        let pull_client = Client::builder().timeout(config.pull_timeout).build()?;

        Ok(Self {
            config,
            probe_client,
            pull_client,
        })
    }

    pub fn with_default_config() -> Result<Self, EngineError> {
        Self::new(EngineConfig::default())
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    fn list_installed(&self, base_url: &str) -> Result<Vec<String>, EngineError> {
        let url = endpoint(base_url, TAGS_PATH);
        let response = self.probe_client.get(&url).send()?;

        if !response.status().is_success() {
            return Err(EngineError::Status(response.status()));
        }

        let body = response.bytes()?;
        let tags: TagsResponse = serde_json::from_slice(&body)?;

        Ok(tags.models.into_iter().map(|m| m.name).collect())
    }

    fn stream_pull(
        &self,
        base_url: &str,
        model_name: &str,
        on_event: &mut dyn FnMut(PullProgressEvent),
    ) -> Result<bool, EngineError> {
        let url = endpoint(base_url, PULL_PATH);
        let response = self
            .pull_client
            .post(&url)
            .json(&PullRequest { name: model_name })
            .send()?;

        if !response.status().is_success() {
            return Err(EngineError::Status(response.status()));
        }

        let mut reader = BufReader::new(response);
        while let Some(line) = next_line(&mut reader, MAX_PULL_LINE_BYTES)? {
            let Some(event) = parse_pull_line(&line) else {
                continue;
            };

            let terminal = event.is_terminal();
            on_event(event);
            if terminal {
                return Ok(true);
            }
        }

        // Clean end of stream counts as success even without a "success" record
        log::warn!(
            "Pull stream for '{}' ended without a success record",
            model_name
        );
        Ok(true)
    }
}

/// Next `\n`-terminated line, `None` at end of stream. A line longer than
/// `max` bytes is drained and comes back empty.
fn next_line<R: BufRead>(reader: &mut R, max: usize) -> io::Result<Option<Vec<u8>>> {
    let mut line = Vec::new();
    let read = reader.by_ref().take(max as u64 + 1).read_until(b'\n', &mut line)?;
    if read == 0 {
        return Ok(None);
    }
    if line.len() <= max || line.ends_with(b"\n") {
        return Ok(Some(line));
    }

    let mut dropped = line.len();
    loop {
        let buf = reader.fill_buf()?;
        if buf.is_empty() {
            break;
        }
        match buf.iter().position(|b| *b == b'\n') {
            Some(pos) => {
                reader.consume(pos + 1);
                dropped += pos;
                break;
            }
            None => {
                let n = buf.len();
                reader.consume(n);
                dropped += n;
            }
        }
    }
    log::warn!("Dropped oversized pull record ({} bytes)", dropped);
    Ok(Some(Vec::new()))
}

impl ModelEngine for EngineClient {
    fn probe(&self, base_url: &str) -> ConnectionProbeResult {
        match self.list_installed(base_url) {
            Ok(models) => {
                log::info!("Engine at {} reachable, {} model(s) installed", base_url, models.len());
                ConnectionProbeResult::connected(models)
            }
            Err(e) => {
                if e.is_timeout() {
                    log::warn!("Probe of {} timed out after {:?}", base_url, self.config.probe_timeout);
                } else {
                    log::warn!("Probe of {} failed: {}", base_url, e);
                }
                ConnectionProbeResult::failed()
            }
        }
    }

    fn pull(
        &self,
        base_url: &str,
        model_name: &str,
        on_event: &mut dyn FnMut(PullProgressEvent),
    ) -> bool {
        log::info!("Pulling model '{}' from {}", model_name, base_url);
        match self.stream_pull(base_url, model_name, on_event) {
            Ok(done) => done,
            Err(e) => {
                log::error!("Pull of '{}' failed: {}", model_name, e);
                false
            }
        }
    }
}
