use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

use crate::domain::{attempt::Attempt, user::SharedUser};

// UserProvider port trait and errors
#[derive(Debug, Error)]
pub enum UserProviderError {
    #[error("User {0} not found")]
    UserNotFound(String),
    #[error("Unexpected error {0}")]
    UnexpectedError(String),
}

impl PartialEq for UserProviderError {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::UserNotFound(a), Self::UserNotFound(b)) => a == b,
            (Self::UnexpectedError(_), Self::UnexpectedError(_)) => true,
            _ => false,
        }
    }
}

/// Resolves an identity token to a stored user.
///
/// Providers that guarantee presence return [`UserProviderError::UserNotFound`]
/// for unknown tokens. Providers meant to sit inside a chain return `Ok(None)`
/// so the next member gets a chance.
#[async_trait]
pub trait UserProvider: Send + Sync {
    async fn load_user(&self, token: &str) -> Result<Option<SharedUser>, UserProviderError>;
    async fn usernames(&self) -> Result<Vec<String>, UserProviderError>;
}

// AttemptStore port trait and errors
#[derive(Debug, Error)]
pub enum AttemptStoreError {
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("Corrupt attempt record: {0}")]
    CorruptRecord(String),
    #[error("Invalid attempt table name {0}")]
    InvalidTable(String),
}

impl PartialEq for AttemptStoreError {
    fn eq(&self, other: &Self) -> bool {
        matches!(
            (self, other),
            (Self::DatabaseError(_), Self::DatabaseError(_))
                | (Self::CorruptRecord(_), Self::CorruptRecord(_))
                | (Self::InvalidTable(_), Self::InvalidTable(_))
        )
    }
}

/// Persistent attempt records, at most one per hash.
#[async_trait]
pub trait AttemptStore: Send + Sync {
    async fn get(&self, hash: &str) -> Result<Option<Attempt>, AttemptStoreError>;

    /// Upserts, replacing any record stored under the same hash.
    async fn set(&self, attempt: &Attempt) -> Result<(), AttemptStoreError>;

    /// Deletes every record whose timestamp is at or behind `now - max_age`.
    async fn clear_expired(&self, max_age: Duration) -> Result<(), AttemptStoreError>;

    async fn clear(&self, hash: &str) -> Result<(), AttemptStoreError>;

    /// Records one more trial for `hash` and returns the stored record.
    ///
    /// Stores that can should override this to run lookup and upsert atomically.
    async fn increment(&self, hash: &str) -> Result<Attempt, AttemptStoreError> {
        let attempt = match self.get(hash).await? {
            Some(existing) => existing.next(),
            None => Attempt::first(hash),
        };
        self.set(&attempt).await?;
        Ok(attempt)
    }
}
