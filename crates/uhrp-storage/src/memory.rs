//! In-memory storage implementation
//!
//! Suitable for testing and simulation environments.

use async_trait::async_trait;
use dashmap::DashMap;
use tracing::trace;
use uhrp_core::{CommitmentRecord, UtxoReference};

use crate::CommitmentStore;
use crate::error::StorageError;

/// In-memory implementation of [`CommitmentStore`]
///
/// Uses `DashMap` for concurrent access; each upsert or removal is atomic
/// for its key. Secondary lookups scan the map and return the lowest
/// matching outpoint, the same choice the redb backend makes.
#[derive(Debug, Default)]
pub struct InMemoryCommitmentStore {
    records: DashMap<UtxoReference, CommitmentRecord>,
}

impl InMemoryCommitmentStore {
    /// Create a new in-memory commitment store
    pub fn new() -> Self {
        Self::default()
    }

    /// Check if the store holds no records
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    fn first_matching(&self, matches: impl Fn(&CommitmentRecord) -> bool) -> Option<UtxoReference> {
        self.records
            .iter()
            .filter(|entry| matches(entry.value()))
            .map(|entry| *entry.key())
            .min()
    }
}

#[async_trait]
impl CommitmentStore for InMemoryCommitmentStore {
    async fn upsert(&self, record: &CommitmentRecord) -> Result<bool, StorageError> {
        let outpoint = record.outpoint();
        trace!(%outpoint, "Upserting commitment");
        Ok(self.records.insert(outpoint, record.clone()).is_some())
    }

    async fn remove(&self, outpoint: &UtxoReference) -> Result<bool, StorageError> {
        trace!(%outpoint, "Removing commitment");
        Ok(self.records.remove(outpoint).is_some())
    }

    async fn get(&self, outpoint: &UtxoReference) -> Result<Option<CommitmentRecord>, StorageError> {
        Ok(self.records.get(outpoint).map(|r| r.clone()))
    }

    async fn all(&self) -> Result<Vec<UtxoReference>, StorageError> {
        let mut outpoints: Vec<_> = self.records.iter().map(|entry| *entry.key()).collect();
        outpoints.sort();
        Ok(outpoints)
    }

    async fn active_at(&self, now_unix_secs: i64) -> Result<Vec<UtxoReference>, StorageError> {
        let mut outpoints: Vec<_> = self
            .records
            .iter()
            .filter(|entry| entry.is_active_at(now_unix_secs))
            .map(|entry| *entry.key())
            .collect();
        outpoints.sort();
        Ok(outpoints)
    }

    async fn find_by_url(&self, url: &str) -> Result<Option<UtxoReference>, StorageError> {
        Ok(self.first_matching(|record| record.url == url))
    }

    async fn find_by_hash_hex(&self, hash_hex: &str) -> Result<Option<UtxoReference>, StorageError> {
        Ok(self.first_matching(|record| record.content_hash_hex() == hash_hex))
    }

    async fn count(&self) -> Result<usize, StorageError> {
        Ok(self.records.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use uhrp_core::{CommitmentToken, Txid};

    fn record(txid_byte: u8, index: u32, url: &str, expiry: i64) -> CommitmentRecord {
        let token = CommitmentToken {
            protocol_address: "1UHRPYnMHPuQ5Tgb3AF8JXqwKkmZVy5hG".into(),
            content_hash: [txid_byte; 32],
            url: url.into(),
            expiry_unix_secs: expiry,
            size_bytes: 1,
        };
        CommitmentRecord::new(
            UtxoReference::new(Txid::new([txid_byte; 32]), index),
            token,
            Utc::now(),
        )
    }

    #[tokio::test]
    async fn test_basic_operations() {
        let store = InMemoryCommitmentStore::new();
        assert!(store.is_empty());

        let rec = record(1, 0, "https://host/a", 100);
        assert!(!store.upsert(&rec).await.unwrap());
        assert!(store.upsert(&rec).await.unwrap());
        assert_eq!(store.count().await.unwrap(), 1);

        assert_eq!(store.get(&rec.outpoint()).await.unwrap(), Some(rec.clone()));
        assert!(store.remove(&rec.outpoint()).await.unwrap());
        assert!(!store.remove(&rec.outpoint()).await.unwrap());
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_secondary_lookups() {
        let store = InMemoryCommitmentStore::new();
        let a = record(1, 0, "https://host/a", 100);
        let b = record(2, 0, "https://host/b", 100);
        store.upsert(&a).await.unwrap();
        store.upsert(&b).await.unwrap();

        assert_eq!(
            store.find_by_url("https://host/b").await.unwrap(),
            Some(b.outpoint())
        );
        assert_eq!(store.find_by_url("https://host/B").await.unwrap(), None);
        assert_eq!(
            store.find_by_hash_hex(a.content_hash_hex()).await.unwrap(),
            Some(a.outpoint())
        );
    }

    #[tokio::test]
    async fn test_active_filter() {
        let store = InMemoryCommitmentStore::new();
        let old = record(1, 0, "https://host/a", 50);
        let fresh = record(1, 1, "https://host/b", 500);
        store.upsert(&old).await.unwrap();
        store.upsert(&fresh).await.unwrap();

        assert_eq!(store.active_at(100).await.unwrap(), vec![fresh.outpoint()]);
        assert_eq!(store.all().await.unwrap().len(), 2);
    }
}
