use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::model::ids::AccountId;

/// Upper bound on username length, in characters.
pub const MAX_USERNAME_LEN: usize = 32;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum AccountError {
    #[error("username cannot be empty")]
    EmptyUsername,

    #[error("username is longer than {MAX_USERNAME_LEN} characters ({len})")]
    UsernameTooLong { len: usize },
}

/// Validated username (trimmed, non-empty, at most `MAX_USERNAME_LEN` characters).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Username(String);

impl Username {
    /// Create a validated username.
    ///
    /// # Errors
    ///
    /// Returns `AccountError::EmptyUsername` if the name is empty after
    /// trimming, or `AccountError::UsernameTooLong` past the character cap.
    pub fn new(value: impl Into<String>) -> Result<Self, AccountError> {
        let raw = value.into();
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(AccountError::EmptyUsername);
        }
        let len = trimmed.chars().count();
        if len > MAX_USERNAME_LEN {
            return Err(AccountError::UsernameTooLong { len });
        }
        Ok(Self(trimmed.to_string()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Username {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A competitor account: one leaderboard row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Account {
    id: AccountId,
    username: Username,
    points: u64,
    created_at: DateTime<Utc>,
}

impl Account {
    #[must_use]
    pub fn new(id: AccountId, username: Username, points: u64, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            username,
            points,
            created_at,
        }
    }

    /// Adds earned points, saturating at the ceiling.
    pub fn award_points(&mut self, delta: u32) {
        self.points = self.points.saturating_add(u64::from(delta));
    }

    #[must_use]
    pub fn id(&self) -> AccountId {
        self.id
    }

    #[must_use]
    pub fn username(&self) -> &Username {
        &self.username
    }

    #[must_use]
    pub fn points(&self) -> u64 {
        self.points
    }

    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::fixed_now;

    #[test]
    fn username_trims_whitespace() {
        let name = Username::new("  casey  ").unwrap();
        assert_eq!(name.as_str(), "casey");
    }

    #[test]
    fn username_rejects_empty() {
        let err = Username::new(" \t ").unwrap_err();
        assert_eq!(err, AccountError::EmptyUsername);
    }

    #[test]
    fn username_enforces_character_cap() {
        let at_cap = "x".repeat(MAX_USERNAME_LEN);
        assert!(Username::new(at_cap).is_ok());

        let over = "x".repeat(MAX_USERNAME_LEN + 1);
        let err = Username::new(over).unwrap_err();
        assert_eq!(
            err,
            AccountError::UsernameTooLong {
                len: MAX_USERNAME_LEN + 1
            }
        );
    }

    #[test]
    fn award_points_accumulates() {
        let mut account = Account::new(
            AccountId::new(1),
            Username::new("dana").unwrap(),
            40,
            fixed_now(),
        );

        account.award_points(60);
        assert_eq!(account.points(), 100);
    }

    #[test]
    fn award_points_saturates() {
        let mut account = Account::new(
            AccountId::new(1),
            Username::new("dana").unwrap(),
            u64::MAX - 5,
            fixed_now(),
        );

        account.award_points(100);
        assert_eq!(account.points(), u64::MAX);
    }
}
