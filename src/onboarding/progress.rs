//! Pull progress presentation values

use crate::engine::PullProgressEvent;

/// How far along a pull is
#[derive(Debug, Clone, PartialEq)]
pub enum Progress {
    Percent {
        value: f64,
        completed_bytes: u64,
        total_bytes: u64,
    },
    /// Size not known yet; show a pulsing indicator
    Indeterminate,
}

/// One update handed to the progress display
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressUpdate {
    pub status: String,
    pub progress: Progress,
}

impl From<&PullProgressEvent> for ProgressUpdate {
    fn from(event: &PullProgressEvent) -> Self {
        let progress = match percent_complete(event.completed_bytes, event.total_bytes) {
            Some(value) => Progress::Percent {
                value,
                completed_bytes: event.completed_bytes,
                total_bytes: event.total_bytes,
            },
            None => Progress::Indeterminate,
        };

        Self {
            status: event.status.clone(),
            progress,
        }
    }
}

impl ProgressUpdate {
    /// e.g. "50.0%  (512.0 B / 1.0 KB)"; `None` when indeterminate
    pub fn detail(&self) -> Option<String> {
        match &self.progress {
            Progress::Percent {
                value,
                completed_bytes,
                total_bytes,
            } => Some(format!(
                "{:.1}%  ({} / {})",
                value,
                format_bytes(*completed_bytes),
                format_bytes(*total_bytes)
            )),
            Progress::Indeterminate => None,
        }
    }
}

/// `min(100, completed / total * 100)`, or `None` while the total is unknown
pub fn percent_complete(completed_bytes: u64, total_bytes: u64) -> Option<f64> {
    if total_bytes == 0 {
        return None;
    }
    Some((completed_bytes as f64 / total_bytes as f64 * 100.0).min(100.0))
}

/// Human-readable size, 1024-based
pub fn format_bytes(bytes: u64) -> String {
    let mut size = bytes as f64;
    for unit in ["B", "KB", "MB", "GB"] {
        if size < 1024.0 {
            return format!("{:.1} {}", size, unit);
        }
        size /= 1024.0;
    }
    format!("{:.1} TB", size)
}
