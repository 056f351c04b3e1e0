// Settings repository for SheepCat
// Key/value settings plus the store contract the onboarding caller persists through

use anyhow::{Context, Result};
use rusqlite::{Connection, params};

use super::models::OnboardingSettings;
use super::DatabaseManager;

/// Stored generate endpoint of the engine, e.g. "http://localhost:11434/api/generate"
pub const AI_API_URL_KEY: &str = "ai_api_url";
/// Chosen model tag
pub const AI_MODEL_KEY: &str = "ai_model";

/// Read/write contract for persisted settings
pub trait SettingsStore {
    fn get_setting(&self, key: &str) -> Result<Option<String>>;
    fn set_setting(&self, key: &str, value: &str) -> Result<()>;
}

impl SettingsStore for DatabaseManager {
    fn get_setting(&self, key: &str) -> Result<Option<String>> {
        self.with_connection(|conn| get_setting_impl(conn, key))
    }

    fn set_setting(&self, key: &str, value: &str) -> Result<()> {
        self.with_connection(|conn| set_setting_impl(conn, key, value))
    }
}

/// Load the onboarding-related settings from any store
pub fn load_onboarding_settings(store: &dyn SettingsStore) -> Result<OnboardingSettings> {
    Ok(OnboardingSettings {
        ai_api_url: store.get_setting(AI_API_URL_KEY)?,
        ai_model: store.get_setting(AI_MODEL_KEY)?,
    })
}

fn get_setting_impl(conn: &Connection, key: &str) -> Result<Option<String>> {
    let mut stmt = conn.prepare(
        "SELECT value FROM settings WHERE key = ?"
    ).context("Failed to prepare get_setting query")?;

    let result = stmt.query_row(params![key], |row| row.get(0));

    match result {
        Ok(value) => Ok(Some(value)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e).context("Failed to get setting"),
    }
}

fn set_setting_impl(conn: &Connection, key: &str, value: &str) -> Result<()> {
    conn.execute(
        r#"
        INSERT INTO settings (key, value, updated_at)
        VALUES (?1, ?2, datetime('now'))
        ON CONFLICT(key) DO UPDATE SET
            value = excluded.value,
            updated_at = datetime('now')
        "#,
        params![key, value],
    ).context("Failed to set setting")?;

    log::debug!("Setting '{}' updated", key);
    Ok(())
}
