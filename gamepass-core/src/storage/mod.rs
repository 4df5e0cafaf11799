pub mod account_store;
pub mod game_store;

pub use account_store::AccountStore;
pub use game_store::GameStore;

use crate::error::{GamePassError, Result};
use rusqlite::Connection;
use std::path::Path;
use tokio::sync::Mutex;

/// SQLite-backed durable state: the registry row, game records and
/// account balances. Mutating ledger operations persist here inside one
/// SQL transaction before committing in memory.
pub struct Storage {
    conn: Mutex<Connection>,
}

impl Storage {
    pub async fn new(db_path: &Path) -> Result<Self> {
        // Create parent directory if it doesn't exist
        if let Some(parent) = db_path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| GamePassError::internal(format!("Failed to create directory: {}", e)))?;
        }

        let conn = Connection::open(db_path)?;
        let storage = Self {
            conn: Mutex::new(conn),
        };

        storage.init_schema().await?;
        Ok(storage)
    }

    async fn init_schema(&self) -> Result<()> {
        let conn = self.conn.lock().await;

        // Singleton registry row
        conn.execute(
            "CREATE TABLE IF NOT EXISTS registry (
                id INTEGER PRIMARY KEY CHECK (id = 0),
                data TEXT NOT NULL
            )",
            [],
        )?;

        // Game records; the status column is denormalized for inspection,
        // the data column is authoritative
        conn.execute(
            "CREATE TABLE IF NOT EXISTS games (
                id INTEGER PRIMARY KEY,
                status TEXT NOT NULL,
                data TEXT NOT NULL
            )",
            [],
        )?;

        // Accounts table
        conn.execute(
            "CREATE TABLE IF NOT EXISTS accounts (
                id TEXT PRIMARY KEY,
                name TEXT UNIQUE NOT NULL,
                balance INTEGER NOT NULL,
                created_at INTEGER NOT NULL
            )",
            [],
        )?;

        Ok(())
    }

    pub async fn get_connection(&self) -> tokio::sync::MutexGuard<'_, Connection> {
        self.conn.lock().await
    }
}
