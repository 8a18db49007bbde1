pub mod game_store;

pub use game_store::GameStore;

use crate::error::{NftangoError, Result};
use rusqlite::Connection;
use std::path::Path;
use tokio::sync::Mutex;

pub struct Storage {
    conn: Mutex<Connection>,
}

impl Storage {
    pub async fn new(db_path: &Path) -> Result<Self> {
        // Create parent directory if it doesn't exist
        if let Some(parent) = db_path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| NftangoError::internal(format!("Failed to create directory: {}", e)))?;
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

        // Game snapshots
        conn.execute(
            "CREATE TABLE IF NOT EXISTS games (
                id TEXT PRIMARY KEY,
                creator TEXT NOT NULL,
                created_at INTEGER NOT NULL,
                state TEXT NOT NULL
            )",
            [],
        )?;

        // Custody ledger
        conn.execute(
            "CREATE TABLE IF NOT EXISTS assets (
                collection TEXT NOT NULL,
                item INTEGER NOT NULL,
                holder TEXT NOT NULL,
                PRIMARY KEY (collection, item)
            )",
            [],
        )?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS approvals (
                collection TEXT NOT NULL,
                owner TEXT NOT NULL,
                operator TEXT NOT NULL,
                PRIMARY KEY (collection, owner, operator)
            )",
            [],
        )?;

        Ok(())
    }

    pub async fn get_connection(&self) -> tokio::sync::MutexGuard<'_, Connection> {
        self.conn.lock().await
    }
}
