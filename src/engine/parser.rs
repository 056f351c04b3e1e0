//! Pull stream line decoding
//!
//! The engine streams newline-delimited JSON objects while a model downloads.
//! Each line is decoded independently; anything that does not decode as a JSON
//! object is transport noise and produces no event.

use serde_json::{Map, Value};

use super::types::PullProgressEvent;

/// Decode one raw line of the pull response body
pub fn parse_pull_line(line: &[u8]) -> Option<PullProgressEvent> {
    let text = std::str::from_utf8(line).ok()?;
    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    let record: Map<String, Value> = match serde_json::from_str(text) {
        Ok(record) => record,
        Err(e) => {
            log::debug!("Skipping undecodable pull line: {}", e);
            return None;
        }
    };

    let status = record
        .get("status")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();

    Some(PullProgressEvent {
        status,
        completed_bytes: byte_count(&record, "completed"),
        total_bytes: byte_count(&record, "total"),
    })
}

fn byte_count(record: &Map<String, Value>, key: &str) -> u64 {
    match record.get(key) {
        Some(value) => value
            .as_u64()
            .or_else(|| value.as_f64().filter(|v| *v > 0.0).map(|v| v as u64))
            .unwrap_or(0),
        None => 0,
    }
}
