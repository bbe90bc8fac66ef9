use std::sync::Arc;

use prep_core::Clock;
use prep_core::model::{Account, AccountId, Username};
use storage::repository::{AccountRepository, StorageError};

use crate::error::LeaderboardError;

/// One row of the ranked points table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeaderboardEntry {
    /// 1-based dense rank: tied scores share a rank and the next distinct
    /// score takes the next one, so 100, 100, 90 ranks as 1, 1, 2.
    pub rank: u32,
    pub username: String,
    pub points: u64,
}

/// Competitor accounts and the points table.
#[derive(Clone)]
pub struct LeaderboardService {
    clock: Clock,
    accounts: Arc<dyn AccountRepository>,
}

impl LeaderboardService {
    #[must_use]
    pub fn new(clock: Clock, accounts: Arc<dyn AccountRepository>) -> Self {
        Self { clock, accounts }
    }

    /// Find an account by username, creating it with zero points when
    /// missing.
    ///
    /// # Errors
    ///
    /// Returns `LeaderboardError::Account` for an invalid username and
    /// `LeaderboardError::Storage` on repository failures.
    pub async fn ensure_account(&self, username: &str) -> Result<Account, LeaderboardError> {
        let username = Username::new(username)?;
        if let Some(existing) = self.accounts.find_by_username(&username).await? {
            return Ok(existing);
        }

        match self.accounts.insert_account(&username, self.clock.now()).await {
            Ok(account) => {
                tracing::debug!(username = %account.username(), "account created");
                Ok(account)
            }
            // Lost an insert race; the winner's row is the account.
            Err(StorageError::Conflict) => {
                let found = self.accounts.find_by_username(&username).await?;
                found.ok_or(LeaderboardError::Storage(StorageError::Conflict))
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Fetch an account by id.
    ///
    /// # Errors
    ///
    /// Returns `LeaderboardError::Storage` with `NotFound` when no account
    /// has that id.
    pub async fn get_account(&self, id: AccountId) -> Result<Account, LeaderboardError> {
        let account = self
            .accounts
            .get_account(id)
            .await?
            .ok_or(StorageError::NotFound)?;
        Ok(account)
    }

    /// Add points to an account and return the updated row.
    ///
    /// # Errors
    ///
    /// Returns `LeaderboardError::Storage` with `NotFound` when no account
    /// has that id.
    pub async fn award(&self, id: AccountId, points: u32) -> Result<Account, LeaderboardError> {
        let account = self.accounts.add_points(id, points).await?;
        Ok(account)
    }

    /// The ranked table: points descending, username as the tiebreak.
    ///
    /// # Errors
    ///
    /// Returns `LeaderboardError::Storage` on repository failures.
    pub async fn top(&self, limit: u32) -> Result<Vec<LeaderboardEntry>, LeaderboardError> {
        let accounts = self.accounts.top_accounts(limit).await?;

        let mut entries = Vec::with_capacity(accounts.len());
        let mut rank = 0u32;
        let mut last_points = None;
        for account in accounts {
            if last_points != Some(account.points()) {
                rank += 1;
                last_points = Some(account.points());
            }
            entries.push(LeaderboardEntry {
                rank,
                username: account.username().as_str().to_owned(),
                points: account.points(),
            });
        }
        Ok(entries)
    }
}
