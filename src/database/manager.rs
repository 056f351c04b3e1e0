// Database Manager for SheepCat
// Owns the SQLite connection backing persisted settings

use anyhow::{Context, Result};
use rusqlite::Connection;
use std::path::PathBuf;
use std::sync::Mutex;

use super::migrations;

const APP_DIR_NAME: &str = "sheepcat";
const DB_FILE_NAME: &str = "sheepcat.db";

/// Database manager that owns the SQLite connection
pub struct DatabaseManager {
    conn: Mutex<Connection>,
    db_path: PathBuf,
}

impl DatabaseManager {
    /// Create a new DatabaseManager with the database at the specified path
    pub fn new(db_path: PathBuf) -> Result<Self> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)
                .context("Failed to create database directory")?;
        }

        let conn = Connection::open(&db_path)
            .context("Failed to open database")?;

        migrations::run_migrations(&conn)
            .context("Failed to run database migrations")?;

        log::info!("Database initialized at: {:?}", db_path);

        Ok(Self {
            conn: Mutex::new(conn),
            db_path,
        })
    }

    /// Open the database in the user's data directory
    pub fn open_default() -> Result<Self> {
        Self::new(Self::default_path()?)
    }

    /// `<data dir>/sheepcat/sheepcat.db`
    pub fn default_path() -> Result<PathBuf> {
        let data_dir = dirs::data_dir()
            .context("Failed to determine the user data directory")?;
        Ok(data_dir.join(APP_DIR_NAME).join(DB_FILE_NAME))
    }

    /// Execute a function with access to the database connection
    pub fn with_connection<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T>,
    {
        let conn = self.conn.lock()
            .map_err(|e| anyhow::anyhow!("Failed to lock database connection: {}", e))?;
        f(&conn)
    }

    /// Get the database path
    pub fn db_path(&self) -> &PathBuf {
        &self.db_path
    }
}
