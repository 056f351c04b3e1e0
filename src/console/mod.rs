//! Terminal front-end for onboarding
//!
//! Prompts go to the given writer and answers come from the given reader, so
//! the same type drives a real terminal and scripted input. Progress is drawn
//! with indicatif on stderr.

use std::io::{self, BufRead, Write};
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};

use crate::onboarding::acquisition::{PullOutcome, PULL_FAILED_HINT};
use crate::onboarding::{
    CatalogEntry, ConnectedEngine, ConnectionPrompt, ManualDefaults, ManualEntry, ModelPicker,
    OnboardingUi, Progress, ProgressDisplay, ProgressUpdate,
};

const CANCEL_WORD: &str = "cancel";

pub struct ConsoleUi<R, W> {
    input: R,
    output: W,
    spinner: Option<ProgressBar>,
    bar: Option<ProgressBar>,
}

impl ConsoleUi<io::StdinLock<'static>, io::Stdout> {
    pub fn stdio() -> Self {
        Self::new(io::stdin().lock(), io::stdout())
    }
}

impl<R: BufRead, W: Write> ConsoleUi<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self {
            input,
            output,
            spinner: None,
            bar: None,
        }
    }

    pub fn into_output(self) -> W {
        self.output
    }

    fn say(&mut self, line: &str) {
        if let Err(e) = writeln!(self.output, "{}", line).and_then(|_| self.output.flush()) {
            log::warn!("Failed to write to console: {}", e);
        }
    }

    /// Print `prompt` and read one trimmed line; `None` on end of input
    fn ask(&mut self, prompt: &str) -> Option<String> {
        if let Err(e) = write!(self.output, "{}", prompt).and_then(|_| self.output.flush()) {
            log::warn!("Failed to write to console: {}", e);
        }

        let mut line = String::new();
        match self.input.read_line(&mut line) {
            Ok(0) => None,
            Ok(_) => Some(line.trim().to_string()),
            Err(e) => {
                log::warn!("Failed to read from console: {}", e);
                None
            }
        }
    }

    fn clear_spinner(&mut self) {
        if let Some(spinner) = self.spinner.take() {
            spinner.finish_and_clear();
        }
    }

    fn clear_bar(&mut self) {
        if let Some(bar) = self.bar.take() {
            bar.finish_and_clear();
        }
    }
}

fn spinner(message: &str) -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    let style = ProgressStyle::default_spinner()
        .template("{spinner:.cyan} {msg}")
        .unwrap_or_else(|e| {
            log::warn!("Failed to create spinner template: {}", e);
            ProgressStyle::default_spinner()
        });
    spinner.set_style(style);
    spinner.set_message(message.to_string());
    spinner.enable_steady_tick(Duration::from_millis(80));
    spinner
}

fn byte_bar(total: u64) -> ProgressBar {
    let bar = ProgressBar::new(total);
    let style = ProgressStyle::default_bar()
        .template("{msg} [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({percent}%)")
        .unwrap_or_else(|e| {
            log::warn!("Failed to create progress bar template: {}", e);
            ProgressStyle::default_bar()
        })
        .progress_chars("=>-");
    bar.set_style(style);
    bar
}

impl<R: BufRead, W: Write> ConnectionPrompt for ConsoleUi<R, W> {
    fn probing(&mut self, base_url: &str) {
        self.clear_spinner();
        self.spinner = Some(spinner(&format!("Connecting to {}...", base_url)));
    }

    fn connected(&mut self, connection: &ConnectedEngine) {
        self.clear_spinner();
        self.say(&format!(
            "Connected to {} ({} model(s) installed)",
            connection.base_url,
            connection.installed_models.len()
        ));
    }

    fn request_endpoint(&mut self, failed_url: &str, defaults: &ManualDefaults) -> ManualEntry {
        self.clear_spinner();
        self.say(&format!("Could not reach the model engine at {}.", failed_url));
        self.say(&format!(
            "Enter its host and port, or type '{}' to stop.",
            CANCEL_WORD
        ));

        let Some(host) = self.ask(&format!("Host [{}]: ", defaults.host)) else {
            return ManualEntry::Cancel;
        };
        if host.eq_ignore_ascii_case(CANCEL_WORD) {
            return ManualEntry::Cancel;
        }
        let Some(port) = self.ask(&format!("Port [{}]: ", defaults.port)) else {
            return ManualEntry::Cancel;
        };
        if port.eq_ignore_ascii_case(CANCEL_WORD) {
            return ManualEntry::Cancel;
        }

        ManualEntry::Submit {
            host: if host.is_empty() { defaults.host.clone() } else { host },
            port: if port.is_empty() { defaults.port.clone() } else { port },
        }
    }

    fn invalid_input(&mut self, message: &str) {
        self.say(message);
    }
}

impl<R: BufRead, W: Write> ModelPicker for ConsoleUi<R, W> {
    fn choose_model(&mut self, entries: &[CatalogEntry]) -> Option<String> {
        self.say("Choose a model:");
        for (i, entry) in entries.iter().enumerate() {
            self.say(&format!(
                "  {}. {}  {}",
                i + 1,
                entry.display_label(),
                entry.model.description
            ));
        }

        let default = entries.first()?;
        let prompt = format!(
            "Model [1-{}, default 1], or '{}' to stop: ",
            entries.len(),
            CANCEL_WORD
        );
        loop {
            let answer = self.ask(&prompt)?;
            if answer.is_empty() {
                return Some(default.model.name.clone());
            }
            if answer.eq_ignore_ascii_case(CANCEL_WORD) {
                return None;
            }
            match answer.parse::<usize>() {
                Ok(n) if (1..=entries.len()).contains(&n) => {
                    return Some(entries[n - 1].model.name.clone());
                }
                // Typed names go through so unknown ones are reported by the caller
                Err(_) => return Some(answer),
                Ok(_) => self.say(&format!("Please enter a number from 1 to {}.", entries.len())),
            }
        }
    }
}

impl<R: BufRead, W: Write> ProgressDisplay for ConsoleUi<R, W> {
    fn update(&mut self, update: &ProgressUpdate) {
        match &update.progress {
            Progress::Percent {
                completed_bytes,
                total_bytes,
                ..
            } => {
                self.clear_spinner();
                let bar = self.bar.get_or_insert_with(|| byte_bar(*total_bytes));
                if bar.length() != Some(*total_bytes) {
                    bar.set_length(*total_bytes);
                }
                bar.set_position(*completed_bytes);
                bar.set_message(update.status.clone());
            }
            Progress::Indeterminate => {
                self.clear_bar();
                match &self.spinner {
                    Some(spinner) => spinner.set_message(update.status.clone()),
                    None => self.spinner = Some(spinner(&update.status)),
                }
            }
        }
    }

    fn finished(&mut self, outcome: &PullOutcome) {
        self.clear_spinner();
        self.clear_bar();
        match outcome {
            PullOutcome::Succeeded { model, .. } => {
                self.say(&format!("{} is ready.", model));
            }
            PullOutcome::Failed { message, .. } => {
                self.say(message);
                self.say(PULL_FAILED_HINT);
            }
        }
    }
}

impl<R: BufRead, W: Write> OnboardingUi for ConsoleUi<R, W> {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::onboarding::{candidate_models, CatalogEntry};
    use std::io::Cursor;

    fn ui(input: &str) -> ConsoleUi<Cursor<Vec<u8>>, Vec<u8>> {
        ConsoleUi::new(Cursor::new(input.as_bytes().to_vec()), Vec::new())
    }

    fn entries() -> Vec<CatalogEntry> {
        candidate_models()
            .into_iter()
            .map(|model| CatalogEntry {
                model,
                installed: false,
            })
            .collect()
    }

    #[test]
    fn test_request_endpoint_uses_defaults_for_blank_answers() {
        let mut console = ui("\n11500\n");
        let entry = console.request_endpoint("http://localhost:11434", &ManualDefaults::default());

        assert_eq!(
            entry,
            ManualEntry::Submit {
                host: "localhost".to_string(),
                port: "11500".to_string(),
            }
        );
        let output = String::from_utf8(console.into_output()).unwrap();
        assert!(output.contains("Could not reach the model engine at http://localhost:11434."));
    }

    #[test]
    fn test_request_endpoint_cancel() {
        assert_eq!(
            ui("cancel\n").request_endpoint("http://x:1", &ManualDefaults::default()),
            ManualEntry::Cancel
        );
        assert_eq!(
            ui("").request_endpoint("http://x:1", &ManualDefaults::default()),
            ManualEntry::Cancel
        );
    }

    #[test]
    fn test_choose_model_by_number() {
        let mut console = ui("7\n2\n");
        assert_eq!(console.choose_model(&entries()), Some("llama3.2:3b".to_string()));

        let output = String::from_utf8(console.into_output()).unwrap();
        assert!(output.contains("Please enter a number from 1 to 3."));
    }

    #[test]
    fn test_choose_model_blank_picks_first_entry() {
        let mut console = ui("\n");
        assert_eq!(console.choose_model(&entries()), Some("qwen2.5:3b".to_string()));

        let output = String::from_utf8(console.into_output()).unwrap();
        assert!(output.contains("Model [1-3, default 1]"));
    }

    #[test]
    fn test_choose_model_cancel_word_and_end_of_input() {
        assert_eq!(ui("cancel\n").choose_model(&entries()), None);
        assert_eq!(ui("CANCEL\n").choose_model(&entries()), None);
        assert_eq!(ui("").choose_model(&entries()), None);
        assert_eq!(ui("\n").choose_model(&[]), None);
    }

    #[test]
    fn test_choose_model_typed_name() {
        assert_eq!(
            ui("mistral:7b\n").choose_model(&entries()),
            Some("mistral:7b".to_string())
        );
    }

    #[test]
    fn test_failed_pull_prints_hint() {
        let mut console = ui("");
        console.update(&ProgressUpdate {
            status: "downloading".to_string(),
            progress: Progress::Percent {
                value: 50.0,
                completed_bytes: 512,
                total_bytes: 1024,
            },
        });
        console.finished(&PullOutcome::Failed {
            model: "qwen2.5:3b".to_string(),
            message: "Download failed. Check your connection and try again.".to_string(),
        });

        let output = String::from_utf8(console.into_output()).unwrap();
        assert!(output.contains("Download failed."));
        assert!(output.contains(PULL_FAILED_HINT));
    }
}
