//! # UHRP Storage
//!
//! Storage backends for the UHRP lookup index.
//!
//! ## Features
//!
//! - **CommitmentStore trait**: keyed upsert/delete plus the queries the
//!   lookup service answers
//! - **RedbCommitmentStore**: persistent redb implementation for production
//! - **InMemoryCommitmentStore**: in-memory implementation for testing/simulation
//!
//! ## Example
//!
//! ```rust,ignore
//! use uhrp_storage::{CommitmentStore, InMemoryCommitmentStore};
//!
//! #[tokio::main]
//! async fn main() {
//!     let store = InMemoryCommitmentStore::new();
//!     store.upsert(&record).await.unwrap();
//!
//!     let found = store.find_by_url("https://cdn.example.com/a").await.unwrap();
//!     assert_eq!(found, Some(record.outpoint()));
//!
//!     store.remove(&record.outpoint()).await.unwrap();
//! }
//! ```

pub mod error;
pub mod memory;
pub mod persistent;
pub mod tables;

// Re-exports
pub use error::StorageError;
pub use memory::InMemoryCommitmentStore;
pub use persistent::RedbCommitmentStore;
pub use tables::{RedbStorage, RedbStorageConfig};

use std::sync::Arc;

use async_trait::async_trait;
use uhrp_core::{CommitmentRecord, UtxoReference};

/// Storage for live commitment records
///
/// Every mutation touches exactly one key and must be atomic for that key.
/// Implementations perform no retries; failures surface to the caller.
#[async_trait]
pub trait CommitmentStore: Send + Sync {
    /// Insert or overwrite the record for its outpoint
    ///
    /// Returns `true` if an existing record was replaced.
    async fn upsert(&self, record: &CommitmentRecord) -> Result<bool, StorageError>;

    /// Delete the record for `outpoint`
    ///
    /// Returns `true` if a record was removed. Removing an absent key is
    /// not an error.
    async fn remove(&self, outpoint: &UtxoReference) -> Result<bool, StorageError>;

    /// Fetch a single record
    async fn get(&self, outpoint: &UtxoReference) -> Result<Option<CommitmentRecord>, StorageError>;

    /// Keys of every record, in the backend's natural order
    async fn all(&self) -> Result<Vec<UtxoReference>, StorageError>;

    /// Keys of records whose expiry is strictly after `now_unix_secs`
    async fn active_at(&self, now_unix_secs: i64) -> Result<Vec<UtxoReference>, StorageError>;

    /// Key of a record whose URL equals `url` exactly
    async fn find_by_url(&self, url: &str) -> Result<Option<UtxoReference>, StorageError>;

    /// Key of a record whose lower-case hash hex equals `hash_hex`
    async fn find_by_hash_hex(&self, hash_hex: &str) -> Result<Option<UtxoReference>, StorageError>;

    /// Number of stored records
    async fn count(&self) -> Result<usize, StorageError>;
}

#[async_trait]
impl<S: CommitmentStore + ?Sized> CommitmentStore for Arc<S> {
    async fn upsert(&self, record: &CommitmentRecord) -> Result<bool, StorageError> {
        (**self).upsert(record).await
    }

    async fn remove(&self, outpoint: &UtxoReference) -> Result<bool, StorageError> {
        (**self).remove(outpoint).await
    }

    async fn get(&self, outpoint: &UtxoReference) -> Result<Option<CommitmentRecord>, StorageError> {
        (**self).get(outpoint).await
    }

    async fn all(&self) -> Result<Vec<UtxoReference>, StorageError> {
        (**self).all().await
    }

    async fn active_at(&self, now_unix_secs: i64) -> Result<Vec<UtxoReference>, StorageError> {
        (**self).active_at(now_unix_secs).await
    }

    async fn find_by_url(&self, url: &str) -> Result<Option<UtxoReference>, StorageError> {
        (**self).find_by_url(url).await
    }

    async fn find_by_hash_hex(&self, hash_hex: &str) -> Result<Option<UtxoReference>, StorageError> {
        (**self).find_by_hash_hex(hash_hex).await
    }

    async fn count(&self) -> Result<usize, StorageError> {
        (**self).count().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Test that the CommitmentStore trait is object-safe
    fn _assert_object_safe(_: &dyn CommitmentStore) {}

    #[tokio::test]
    async fn test_arc_dyn_store() {
        let store: Arc<dyn CommitmentStore> = Arc::new(InMemoryCommitmentStore::new());
        assert_eq!(store.count().await.unwrap(), 0);
        assert!(store.all().await.unwrap().is_empty());
    }
}
