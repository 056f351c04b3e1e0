// Database module for SheepCat
// Provides SQLite persistence for application settings

pub mod manager;
pub mod migrations;
pub mod models;
pub mod settings_repo;

pub use manager::DatabaseManager;
pub use models::*;
pub use settings_repo::{load_onboarding_settings, SettingsStore, AI_API_URL_KEY, AI_MODEL_KEY};
