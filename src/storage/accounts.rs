use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

use crate::domain::Account;

use super::MIGRATION_002_ACCOUNTS;

/// Store for credential accounts. Shares the database file with the
/// ledger but owns a separate table.
pub struct AccountRepository {
    pool: SqlitePool,
}

impl AccountRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn migrate(&self) -> Result<()> {
        sqlx::query(MIGRATION_002_ACCOUNTS)
            .execute(&self.pool)
            .await
            .context("Failed to run migration 002")?;
        Ok(())
    }

    pub async fn insert_account(&self, voter_id: &str, password_hash: &str) -> Result<Account> {
        let created_at = Utc::now();
        let result = sqlx::query(
            "INSERT INTO voter_accounts (voter_id, password_hash, created_at) VALUES (?, ?, ?)",
        )
        .bind(voter_id)
        .bind(password_hash)
        .bind(created_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .context("Failed to save account")?;

        Ok(Account {
            id: result.last_insert_rowid(),
            voter_id: voter_id.to_string(),
            created_at,
        })
    }

    /// Fetch an account together with its stored password hash.
    pub async fn get_credentials(&self, voter_id: &str) -> Result<Option<(Account, String)>> {
        let row = sqlx::query(
            "SELECT id, voter_id, password_hash, created_at FROM voter_accounts WHERE voter_id = ?",
        )
        .bind(voter_id)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch account")?;

        match row {
            Some(row) => {
                let hash: String = row.get("password_hash");
                Ok(Some((Self::row_to_account(&row)?, hash)))
            }
            None => Ok(None),
        }
    }

    pub async fn list_accounts(&self) -> Result<Vec<Account>> {
        let rows =
            sqlx::query("SELECT id, voter_id, created_at FROM voter_accounts ORDER BY voter_id")
                .fetch_all(&self.pool)
                .await
                .context("Failed to list accounts")?;

        rows.iter().map(Self::row_to_account).collect()
    }

    fn row_to_account(row: &SqliteRow) -> Result<Account> {
        let created_at_str: String = row.get("created_at");

        Ok(Account {
            id: row.get("id"),
            voter_id: row.get("voter_id"),
            created_at: DateTime::parse_from_rfc3339(&created_at_str)
                .context("Invalid created_at timestamp")?
                .with_timezone(&Utc),
        })
    }
}
