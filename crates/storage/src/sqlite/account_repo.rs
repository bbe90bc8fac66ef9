use chrono::{DateTime, Utc};
use prep_core::model::{Account, AccountId, Username};

use super::SqliteRepository;
use super::mapping::{id_i64, map_account_row, unique_violation};
use crate::repository::{AccountRepository, StorageError};

#[async_trait::async_trait]
impl AccountRepository for SqliteRepository {
    async fn insert_account(
        &self,
        username: &Username,
        created_at: DateTime<Utc>,
    ) -> Result<Account, StorageError> {
        let res =
            sqlx::query("INSERT INTO accounts (username, points, created_at) VALUES (?1, 0, ?2)")
                .bind(username.as_str().to_owned())
                .bind(created_at)
                .execute(&self.pool)
                .await
                .map_err(|e| {
                    if unique_violation(&e) {
                        StorageError::Conflict
                    } else {
                        StorageError::Connection(e.to_string())
                    }
                })?;

        let id = u64::try_from(res.last_insert_rowid())
            .map_err(|_| StorageError::Serialization("account_id sign overflow".into()))?;
        Ok(Account::new(
            AccountId::new(id),
            username.clone(),
            0,
            created_at,
        ))
    }

    async fn get_account(&self, id: AccountId) -> Result<Option<Account>, StorageError> {
        let row = sqlx::query("SELECT id, username, points, created_at FROM accounts WHERE id = ?1")
            .bind(id_i64("account_id", id.value())?)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        match row {
            Some(row) => map_account_row(&row).map(Some),
            None => Ok(None),
        }
    }

    async fn find_by_username(
        &self,
        username: &Username,
    ) -> Result<Option<Account>, StorageError> {
        let row = sqlx::query(
            "SELECT id, username, points, created_at FROM accounts WHERE username = ?1",
        )
        .bind(username.as_str().to_owned())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        match row {
            Some(row) => map_account_row(&row).map(Some),
            None => Ok(None),
        }
    }

    async fn add_points(&self, id: AccountId, delta: u32) -> Result<Account, StorageError> {
        let account_id = id_i64("account_id", id.value())?;

        let res = sqlx::query("UPDATE accounts SET points = points + ?2 WHERE id = ?1")
            .bind(account_id)
            .bind(i64::from(delta))
            .execute(&self.pool)
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        if res.rows_affected() == 0 {
            return Err(StorageError::NotFound);
        }

        let row = sqlx::query("SELECT id, username, points, created_at FROM accounts WHERE id = ?1")
            .bind(account_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?
            .ok_or(StorageError::NotFound)?;

        map_account_row(&row)
    }

    async fn top_accounts(&self, limit: u32) -> Result<Vec<Account>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT id, username, points, created_at
            FROM accounts
            ORDER BY points DESC, username ASC
            LIMIT ?1
            ",
        )
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        let mut accounts = Vec::with_capacity(rows.len());
        for row in rows {
            accounts.push(map_account_row(&row)?);
        }
        Ok(accounts)
    }
}
