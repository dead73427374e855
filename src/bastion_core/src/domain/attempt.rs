use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

/// A failure counter keyed by a hash of (identity, request context).
///
/// Attempts are replaced, never mutated: [`Attempt::next`] returns the record
/// that should overwrite the stored one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attempt {
    hash: String,
    timestamp: DateTime<Utc>,
    trials: u32,
}

impl Attempt {
    pub fn new(hash: impl Into<String>, timestamp: DateTime<Utc>, trials: u32) -> Self {
        Self {
            hash: hash.into(),
            timestamp,
            trials,
        }
    }

    /// First recorded trial for `hash`, stamped now.
    pub fn first(hash: impl Into<String>) -> Self {
        Self::new(hash, Utc::now(), 1)
    }

    /// The replacement record after one more trial, stamped now.
    pub fn next(&self) -> Self {
        Self::new(self.hash.clone(), Utc::now(), self.trials.saturating_add(1))
    }

    pub fn hash(&self) -> &str {
        &self.hash
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn trials(&self) -> u32 {
        self.trials
    }

    /// Whether the record falls at or behind `now - window`.
    pub fn is_expired(&self, window: Duration, now: DateTime<Utc>) -> bool {
        self.timestamp <= expiry_cutoff(now, window)
    }
}

/// `now - window`, saturating at the earliest representable instant.
pub fn expiry_cutoff(now: DateTime<Utc>, window: Duration) -> DateTime<Utc> {
    TimeDelta::from_std(window)
        .ok()
        .and_then(|delta| now.checked_sub_signed(delta))
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}
