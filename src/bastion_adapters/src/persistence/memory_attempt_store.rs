use std::sync::Arc;
use std::time::Duration;

use bastion_core::{Attempt, AttemptStore, AttemptStoreError, expiry_cutoff};
use chrono::Utc;
use dashmap::DashMap;

/// Process-local attempt records.
#[derive(Debug, Default, Clone)]
pub struct MemoryAttemptStore {
    attempts: Arc<DashMap<String, Attempt>>,
}

impl MemoryAttemptStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.attempts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attempts.is_empty()
    }
}

#[async_trait::async_trait]
impl AttemptStore for MemoryAttemptStore {
    async fn get(&self, hash: &str) -> Result<Option<Attempt>, AttemptStoreError> {
        Ok(self.attempts.get(hash).map(|entry| entry.value().clone()))
    }

    async fn set(&self, attempt: &Attempt) -> Result<(), AttemptStoreError> {
        self.attempts
            .insert(attempt.hash().to_string(), attempt.clone());
        Ok(())
    }

    async fn clear_expired(&self, max_age: Duration) -> Result<(), AttemptStoreError> {
        let cutoff = expiry_cutoff(Utc::now(), max_age);
        self.attempts
            .retain(|_, attempt| attempt.timestamp() > cutoff);
        Ok(())
    }

    async fn clear(&self, hash: &str) -> Result<(), AttemptStoreError> {
        self.attempts.remove(hash);
        Ok(())
    }

    async fn increment(&self, hash: &str) -> Result<Attempt, AttemptStoreError> {
        let entry = self
            .attempts
            .entry(hash.to_string())
            .and_modify(|attempt| *attempt = attempt.next())
            .or_insert_with(|| Attempt::first(hash));
        Ok(entry.value().clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn increment_is_atomic_per_hash() {
        let store = MemoryAttemptStore::new();

        let handles: Vec<_> = (0..20)
            .map(|_| {
                let store = store.clone();
                tokio::spawn(async move { store.increment("shared").await })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        assert_eq!(store.get("shared").await.unwrap().unwrap().trials(), 20);
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn sweep_drops_only_expired_records() {
        let store = MemoryAttemptStore::new();
        store
            .set(&Attempt::new("old", Utc::now() - chrono::Duration::seconds(300), 3))
            .await
            .unwrap();
        store.set(&Attempt::first("fresh")).await.unwrap();

        store.clear_expired(Duration::from_secs(60)).await.unwrap();

        assert!(store.get("old").await.unwrap().is_none());
        assert!(store.get("fresh").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn clear_removes_the_record() {
        let store = MemoryAttemptStore::new();
        store.increment("abc").await.unwrap();
        store.clear("abc").await.unwrap();

        assert!(store.is_empty());
    }
}
