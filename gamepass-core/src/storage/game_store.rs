use rusqlite::{params, OptionalExtension};

use crate::accounts::Account;
use crate::error::Result;
use crate::game::Game;
use crate::registry::Registry;
use crate::storage::Storage;
use crate::types::GameId;

pub struct GameStore<'a> {
    storage: &'a Storage,
}

impl<'a> GameStore<'a> {
    pub fn new(storage: &'a Storage) -> Self {
        Self { storage }
    }

    pub async fn save_registry(&self, registry: &Registry) -> Result<()> {
        let conn = self.storage.get_connection().await;

        conn.execute(
            "INSERT OR REPLACE INTO registry (id, data) VALUES (0, ?1)",
            params![serde_json::to_string(registry)?],
        )?;

        Ok(())
    }

    pub async fn load_registry(&self) -> Result<Option<Registry>> {
        let conn = self.storage.get_connection().await;

        let data: Option<String> = conn
            .query_row("SELECT data FROM registry WHERE id = 0", [], |row| {
                row.get(0)
            })
            .optional()?;

        match data {
            Some(data) => Ok(Some(serde_json::from_str(&data)?)),
            None => Ok(None),
        }
    }

    pub async fn load_game(&self, id: GameId) -> Result<Option<Game>> {
        let conn = self.storage.get_connection().await;

        let data: Option<String> = conn
            .query_row("SELECT data FROM games WHERE id = ?1", params![id], |row| {
                row.get(0)
            })
            .optional()?;

        match data {
            Some(data) => Ok(Some(serde_json::from_str(&data)?)),
            None => Ok(None),
        }
    }

    pub async fn list_games(&self) -> Result<Vec<Game>> {
        let conn = self.storage.get_connection().await;

        let mut stmt = conn.prepare("SELECT data FROM games ORDER BY id")?;
        let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;

        let mut games = Vec::new();
        for data in rows {
            games.push(serde_json::from_str(&data?)?);
        }

        Ok(games)
    }

    /// Persist one ledger operation: the mutated game, the registry (when
    /// the operation touched it) and every account row it changed, all in
    /// a single transaction.
    pub async fn commit_operation(
        &self,
        game: &Game,
        registry: Option<&Registry>,
        accounts: &[&Account],
    ) -> Result<()> {
        let mut conn = self.storage.get_connection().await;
        let tx = conn.transaction()?;

        tx.execute(
            "INSERT OR REPLACE INTO games (id, status, data) VALUES (?1, ?2, ?3)",
            params![
                game.id,
                game.status.to_string(),
                serde_json::to_string(game)?
            ],
        )?;

        if let Some(registry) = registry {
            tx.execute(
                "INSERT OR REPLACE INTO registry (id, data) VALUES (0, ?1)",
                params![serde_json::to_string(registry)?],
            )?;
        }

        for account in accounts {
            tx.execute(
                "INSERT OR REPLACE INTO accounts (id, name, balance, created_at)
                 VALUES (?1, ?2, ?3, ?4)",
                params![
                    account.id.to_string(),
                    account.name,
                    account.balance,
                    account.created_at.timestamp(),
                ],
            )?;
        }

        tx.commit()?;
        Ok(())
    }
}
