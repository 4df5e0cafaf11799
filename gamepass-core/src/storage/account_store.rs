use chrono::Utc;
use rusqlite::params;
use uuid::Uuid;

use crate::accounts::Account;
use crate::error::Result;
use crate::storage::Storage;

pub struct AccountStore<'a> {
    storage: &'a Storage,
}

impl<'a> AccountStore<'a> {
    pub fn new(storage: &'a Storage) -> Self {
        Self { storage }
    }

    pub async fn save_account(&self, account: &Account) -> Result<()> {
        let conn = self.storage.get_connection().await;

        conn.execute(
            "INSERT OR REPLACE INTO accounts (id, name, balance, created_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                account.id.to_string(),
                account.name,
                account.balance,
                account.created_at.timestamp(),
            ],
        )?;

        Ok(())
    }

    pub async fn list_accounts(&self) -> Result<Vec<Account>> {
        let conn = self.storage.get_connection().await;

        let mut stmt = conn.prepare(
            "SELECT id, name, balance, created_at FROM accounts ORDER BY created_at",
        )?;

        let account_iter = stmt.query_map([], |row| {
            let id_str: String = row.get(0)?;

            Ok(Account {
                id: Uuid::parse_str(&id_str).unwrap_or_else(|_| Uuid::nil()),
                name: row.get(1)?,
                balance: row.get(2)?,
                created_at: chrono::DateTime::from_timestamp(row.get(3)?, 0)
                    .unwrap_or_else(|| Utc::now()),
            })
        })?;

        let mut accounts = Vec::new();
        for account in account_iter {
            accounts.push(account?);
        }

        Ok(accounts)
    }

    pub async fn delete_account(&self, id: Uuid) -> Result<()> {
        let conn = self.storage.get_connection().await;

        conn.execute(
            "DELETE FROM accounts WHERE id = ?1",
            params![id.to_string()],
        )?;

        Ok(())
    }

    pub async fn account_exists(&self, name: &str) -> Result<bool> {
        let conn = self.storage.get_connection().await;

        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM accounts WHERE name = ?1",
            params![name],
            |row| row.get(0),
        )?;

        Ok(count > 0)
    }
}
