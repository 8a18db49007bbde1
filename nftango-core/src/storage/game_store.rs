use crate::error::Result;
use crate::storage::Storage;
use crate::types::Identity;
use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension};
use serde::de::DeserializeOwned;
use serde::Serialize;
use uuid::Uuid;

/// Snapshot store for wager games, one JSON row per game.
pub struct GameStore<'a> {
    storage: &'a Storage,
}

impl<'a> GameStore<'a> {
    pub fn new(storage: &'a Storage) -> Self {
        Self { storage }
    }

    pub async fn save_game<T: Serialize>(
        &self,
        id: Uuid,
        creator: &Identity,
        created_at: DateTime<Utc>,
        state: &T,
    ) -> Result<()> {
        let state_json = serde_json::to_string(state)?;
        let conn = self.storage.get_connection().await;

        conn.execute(
            "INSERT OR REPLACE INTO games (id, creator, created_at, state)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                id.to_string(),
                creator.as_str(),
                created_at.timestamp_micros(),
                state_json,
            ],
        )?;

        tracing::debug!("Saved snapshot for game {}", id);
        Ok(())
    }

    pub async fn load_game<T: DeserializeOwned>(&self, id: Uuid) -> Result<Option<T>> {
        let conn = self.storage.get_connection().await;

        let state_json: Option<String> = conn
            .query_row(
                "SELECT state FROM games WHERE id = ?1",
                params![id.to_string()],
                |row| row.get(0),
            )
            .optional()?;

        match state_json {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    /// All snapshots, oldest game first.
    pub async fn list_games<T: DeserializeOwned>(&self) -> Result<Vec<T>> {
        let conn = self.storage.get_connection().await;

        let mut stmt =
            conn.prepare("SELECT state FROM games ORDER BY created_at ASC, id ASC")?;
        let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;

        let mut games = Vec::new();
        for row in rows {
            games.push(serde_json::from_str(&row?)?);
        }

        Ok(games)
    }

    pub async fn delete_game(&self, id: Uuid) -> Result<()> {
        let conn = self.storage.get_connection().await;
        conn.execute("DELETE FROM games WHERE id = ?1", params![id.to_string()])?;
        Ok(())
    }
}
