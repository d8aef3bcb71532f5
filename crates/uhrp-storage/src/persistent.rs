//! Persistent commitment storage backed by redb
//!
//! Records live in [`COMMITMENTS`] keyed by the 36-byte outpoint key. Two
//! secondary tables map URL and hash hex to outpoints. Every mutation
//! rewrites the record and its index entries inside one write transaction,
//! so readers never observe a record without its index entries.

use std::sync::Arc;

use async_trait::async_trait;
use redb::WriteTransaction;
use tracing::{debug, trace};
use uhrp_core::{CommitmentRecord, UtxoReference};

use crate::CommitmentStore;
use crate::error::StorageError;
use crate::tables::{COMMITMENTS, HASH_INDEX, RedbStorage, RedbStorageConfig, URL_INDEX};

const EMPTY: &[u8] = &[];

/// Secondary index prefix: big-endian length followed by the text
fn index_prefix(text: &str) -> Vec<u8> {
    let mut prefix = Vec::with_capacity(4 + text.len() + UtxoReference::KEY_LEN);
    prefix.extend_from_slice(&(text.len() as u32).to_be_bytes());
    prefix.extend_from_slice(text.as_bytes());
    prefix
}

fn index_key(text: &str, outpoint_key: &[u8]) -> Vec<u8> {
    let mut key = index_prefix(text);
    key.extend_from_slice(outpoint_key);
    key
}

fn outpoint_from_index_key(key: &[u8]) -> Result<UtxoReference, StorageError> {
    let start = key
        .len()
        .checked_sub(UtxoReference::KEY_LEN)
        .ok_or_else(|| StorageError::deserialization("index key shorter than an outpoint"))?;
    Ok(UtxoReference::from_key_bytes(&key[start..])?)
}

/// redb-backed [`CommitmentStore`]
pub struct RedbCommitmentStore {
    storage: Arc<RedbStorage>,
}

impl RedbCommitmentStore {
    /// Wrap an already opened database
    pub fn new(storage: Arc<RedbStorage>) -> Self {
        Self { storage }
    }

    /// Open or create the database described by `config`
    pub fn open(config: RedbStorageConfig) -> Result<Self, StorageError> {
        Ok(Self::new(Arc::new(RedbStorage::open(config)?)))
    }

    /// Get the underlying storage
    pub fn storage(&self) -> &Arc<RedbStorage> {
        &self.storage
    }

    fn decode(bytes: &[u8]) -> Result<CommitmentRecord, StorageError> {
        Ok(postcard::from_bytes(bytes)?)
    }

    /// Remove the index entries belonging to `record`
    fn unindex(
        txn: &WriteTransaction,
        record: &CommitmentRecord,
        outpoint_key: &[u8],
    ) -> Result<(), StorageError> {
        let mut by_url = txn.open_table(URL_INDEX).map_err(StorageError::database)?;
        by_url
            .remove(index_key(&record.url, outpoint_key).as_slice())
            .map_err(StorageError::database)?;

        let mut by_hash = txn.open_table(HASH_INDEX).map_err(StorageError::database)?;
        by_hash
            .remove(index_key(record.content_hash_hex(), outpoint_key).as_slice())
            .map_err(StorageError::database)?;
        Ok(())
    }

    fn index(
        txn: &WriteTransaction,
        record: &CommitmentRecord,
        outpoint_key: &[u8],
    ) -> Result<(), StorageError> {
        let mut by_url = txn.open_table(URL_INDEX).map_err(StorageError::database)?;
        by_url
            .insert(index_key(&record.url, outpoint_key).as_slice(), EMPTY)
            .map_err(StorageError::database)?;

        let mut by_hash = txn.open_table(HASH_INDEX).map_err(StorageError::database)?;
        by_hash
            .insert(index_key(record.content_hash_hex(), outpoint_key).as_slice(), EMPTY)
            .map_err(StorageError::database)?;
        Ok(())
    }

    fn first_indexed(
        &self,
        table: redb::TableDefinition<&[u8], &[u8]>,
        text: &str,
    ) -> Result<Option<UtxoReference>, StorageError> {
        let entries = self
            .storage
            .scan_prefix_limit(table, &index_prefix(text), 1)?;
        entries
            .first()
            .map(|(key, _)| outpoint_from_index_key(key))
            .transpose()
    }

    fn records(&self) -> Result<Vec<CommitmentRecord>, StorageError> {
        self.storage
            .scan_prefix(COMMITMENTS, EMPTY)?
            .iter()
            .map(|(_, value)| Self::decode(value))
            .collect()
    }
}

#[async_trait]
impl CommitmentStore for RedbCommitmentStore {
    async fn upsert(&self, record: &CommitmentRecord) -> Result<bool, StorageError> {
        let outpoint = record.outpoint();
        let key = outpoint.to_key_bytes();
        let value = postcard::to_allocvec(record)
            .map_err(|e| StorageError::Serialization(e.to_string()))?;

        let replaced = self.storage.write(|txn| {
            let previous = {
                let mut records = txn.open_table(COMMITMENTS).map_err(StorageError::database)?;
                records
                    .insert(key.as_slice(), value.as_slice())
                    .map_err(StorageError::database)?
                    .map(|old| old.value().to_vec())
            };

            if let Some(previous) = &previous {
                Self::unindex(txn, &Self::decode(previous)?, &key)?;
            }
            Self::index(txn, record, &key)?;
            Ok(previous.is_some())
        })?;

        debug!(%outpoint, replaced, "Upserted commitment");
        Ok(replaced)
    }

    async fn remove(&self, outpoint: &UtxoReference) -> Result<bool, StorageError> {
        let key = outpoint.to_key_bytes();

        let removed = self.storage.write(|txn| {
            let previous = {
                let mut records = txn.open_table(COMMITMENTS).map_err(StorageError::database)?;
                records
                    .remove(key.as_slice())
                    .map_err(StorageError::database)?
                    .map(|old| old.value().to_vec())
            };

            match previous {
                Some(previous) => {
                    Self::unindex(txn, &Self::decode(&previous)?, &key)?;
                    Ok(true)
                }
                None => Ok(false),
            }
        })?;

        trace!(%outpoint, removed, "Removed commitment");
        Ok(removed)
    }

    async fn get(&self, outpoint: &UtxoReference) -> Result<Option<CommitmentRecord>, StorageError> {
        self.storage
            .get(COMMITMENTS, &outpoint.to_key_bytes())?
            .map(|value| Self::decode(&value))
            .transpose()
    }

    async fn all(&self) -> Result<Vec<UtxoReference>, StorageError> {
        self.storage
            .scan_prefix(COMMITMENTS, EMPTY)?
            .iter()
            .map(|(key, _)| UtxoReference::from_key_bytes(key).map_err(StorageError::from))
            .collect()
    }

    async fn active_at(&self, now_unix_secs: i64) -> Result<Vec<UtxoReference>, StorageError> {
        Ok(self
            .records()?
            .into_iter()
            .filter(|record| record.is_active_at(now_unix_secs))
            .map(|record| record.outpoint())
            .collect())
    }

    async fn find_by_url(&self, url: &str) -> Result<Option<UtxoReference>, StorageError> {
        self.first_indexed(URL_INDEX, url)
    }

    async fn find_by_hash_hex(&self, hash_hex: &str) -> Result<Option<UtxoReference>, StorageError> {
        self.first_indexed(HASH_INDEX, hash_hex)
    }

    async fn count(&self) -> Result<usize, StorageError> {
        self.storage.len(COMMITMENTS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use tempfile::TempDir;
    use uhrp_core::{CommitmentToken, Txid};

    fn create_test_store() -> (RedbCommitmentStore, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let config = RedbStorageConfig::with_path(temp_dir.path().join("test.redb"));
        (RedbCommitmentStore::open(config).unwrap(), temp_dir)
    }

    fn record(txid_byte: u8, index: u32, url: &str, hash_byte: u8, expiry: i64) -> CommitmentRecord {
        let token = CommitmentToken {
            protocol_address: "1UHRPYnMHPuQ5Tgb3AF8JXqwKkmZVy5hG".into(),
            content_hash: [hash_byte; 32],
            url: url.into(),
            expiry_unix_secs: expiry,
            size_bytes: 10,
        };
        CommitmentRecord::new(
            UtxoReference::new(Txid::new([txid_byte; 32]), index),
            token,
            Utc::now(),
        )
    }

    #[tokio::test]
    async fn test_upsert_and_get() {
        let (store, _temp) = create_test_store();
        let rec = record(1, 0, "https://host/a", 0xab, 100);

        assert!(!store.upsert(&rec).await.unwrap());
        assert_eq!(store.get(&rec.outpoint()).await.unwrap(), Some(rec.clone()));
        assert_eq!(store.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_reupsert_overwrites_and_reindexes() {
        let (store, _temp) = create_test_store();
        let first = record(1, 0, "https://host/old", 0x01, 100);
        store.upsert(&first).await.unwrap();

        let second = record(1, 0, "https://host/new", 0x02, 200);
        assert!(store.upsert(&second).await.unwrap());

        assert_eq!(store.count().await.unwrap(), 1);
        assert_eq!(store.find_by_url("https://host/old").await.unwrap(), None);
        assert_eq!(
            store.find_by_url("https://host/new").await.unwrap(),
            Some(second.outpoint())
        );
        assert_eq!(
            store
                .find_by_hash_hex(first.content_hash_hex())
                .await
                .unwrap(),
            None
        );
        assert_eq!(store.storage().len(URL_INDEX).unwrap(), 1);
        assert_eq!(store.storage().len(HASH_INDEX).unwrap(), 1);
    }

    #[tokio::test]
    async fn test_remove_cleans_indexes() {
        let (store, _temp) = create_test_store();
        let rec = record(2, 1, "https://host/a", 0xcd, 100);
        store.upsert(&rec).await.unwrap();

        assert!(store.remove(&rec.outpoint()).await.unwrap());
        assert!(!store.remove(&rec.outpoint()).await.unwrap());
        assert_eq!(store.count().await.unwrap(), 0);
        assert_eq!(store.storage().len(URL_INDEX).unwrap(), 0);
        assert_eq!(store.storage().len(HASH_INDEX).unwrap(), 0);
    }

    #[tokio::test]
    async fn test_url_prefix_does_not_leak() {
        let (store, _temp) = create_test_store();
        store
            .upsert(&record(1, 0, "https://host/a/", 0x01, 100))
            .await
            .unwrap();

        assert_eq!(store.find_by_url("https://host/a").await.unwrap(), None);
        assert!(store.find_by_url("https://host/a/").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_duplicate_url_returns_lowest_outpoint() {
        let (store, _temp) = create_test_store();
        let later = record(9, 0, "https://host/same", 0x01, 100);
        let earlier = record(3, 5, "https://host/same", 0x02, 100);
        store.upsert(&later).await.unwrap();
        store.upsert(&earlier).await.unwrap();

        assert_eq!(
            store.find_by_url("https://host/same").await.unwrap(),
            Some(earlier.outpoint())
        );
    }

    #[tokio::test]
    async fn test_all_and_active() {
        let (store, _temp) = create_test_store();
        let expired = record(1, 0, "https://host/a", 0x01, 990);
        let live = record(1, 1, "https://host/b", 0x02, 2000);
        store.upsert(&expired).await.unwrap();
        store.upsert(&live).await.unwrap();

        let all = store.all().await.unwrap();
        assert_eq!(all.len(), 2);
        assert!(all.contains(&expired.outpoint()));

        assert_eq!(store.active_at(1000).await.unwrap(), vec![live.outpoint()]);
        assert!(store.active_at(2000).await.unwrap().is_empty());
    }

    #[test]
    fn test_outpoint_from_short_index_key() {
        assert!(outpoint_from_index_key(&[0u8; 8]).is_err());
    }
}
