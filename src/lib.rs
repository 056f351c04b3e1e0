// SheepCat - first-launch setup for a local model-serving engine
//
// Connects to the engine (with manual host/port fallback), offers a short
// list of recommended models, pulls the chosen one with live progress and
// stores the validated endpoint and model in the settings database.

use anyhow::{Context, Result};
use std::sync::Arc;

pub mod background;
pub mod console;
pub mod database;
pub mod engine;
pub mod onboarding;

use console::ConsoleUi;
use database::{load_onboarding_settings, DatabaseManager};
use engine::{EngineClient, ModelEngine};
use onboarding::{run_onboarding, OnboardingConfig, OnboardingOutcome};

/// Initialise env_logger on stderr (reads RUST_LOG, defaults to `info`)
pub fn init_logging() {
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .try_init();
}

pub fn run() -> Result<()> {
    init_logging();
    log::info!("SheepCat setup starting...");

    let db = DatabaseManager::open_default().context("Failed to open settings database")?;
    log::info!("Settings database at {:?}", db.db_path());
    let stored = load_onboarding_settings(&db)?;

    let engine: Arc<dyn ModelEngine> =
        Arc::new(EngineClient::with_default_config().context("Failed to build engine client")?);
    let mut ui = ConsoleUi::stdio();

    let outcome = run_onboarding(
        engine,
        stored.ai_api_url.as_deref(),
        &mut ui,
        &OnboardingConfig::default(),
    );
    finish(&outcome, &db)
}

fn finish(outcome: &OnboardingOutcome, db: &DatabaseManager) -> Result<()> {
    outcome.persist(db).context("Failed to save onboarding settings")?;

    match (&outcome.base_url, &outcome.chosen_model) {
        (None, _) => log::info!("Setup cancelled before an engine was reached"),
        (Some(url), None) => log::info!("Engine {} saved; no model chosen", url),
        (Some(url), Some(model)) => log::info!(
            "Engine {} saved with model '{}' (ready: {})",
            url,
            model,
            outcome.completed
        ),
    }
    Ok(())
}
