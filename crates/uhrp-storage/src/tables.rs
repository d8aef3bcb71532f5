//! redb table definitions and storage manager
//!
//! Defines all tables used for commitment storage.

use std::path::PathBuf;
use std::sync::Arc;

use redb::{Builder, Database, ReadableTableMetadata, TableDefinition, WriteTransaction};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use crate::error::StorageError;

/// Type alias for scan results to simplify complex type
pub type ScanResults = Vec<(Vec<u8>, Vec<u8>)>;

// Table definitions
// Key: (txid, output_index) as 36 bytes, Value: serialized CommitmentRecord
pub const COMMITMENTS: TableDefinition<&[u8], &[u8]> = TableDefinition::new("commitments");

// Key: (url length, url, outpoint) concatenated, Value: empty
pub const URL_INDEX: TableDefinition<&[u8], &[u8]> = TableDefinition::new("commitments_by_url");

// Key: (hash hex length, hash hex, outpoint) concatenated, Value: empty
pub const HASH_INDEX: TableDefinition<&[u8], &[u8]> =
    TableDefinition::new("commitments_by_hash_hex");

/// Configuration for redb storage
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RedbStorageConfig {
    /// Path to the database file
    pub db_path: PathBuf,
    /// Cache size in bytes
    pub cache_size: usize,
}

impl Default for RedbStorageConfig {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from("./data/uhrp.redb"),
            cache_size: 64 * 1024 * 1024, // 64MB
        }
    }
}

impl RedbStorageConfig {
    /// Default configuration with a custom database path
    pub fn with_path(db_path: impl Into<PathBuf>) -> Self {
        Self {
            db_path: db_path.into(),
            ..Default::default()
        }
    }
}

/// Main redb storage manager
pub struct RedbStorage {
    db: Arc<Database>,
    config: RedbStorageConfig,
}

impl RedbStorage {
    /// Open or create the database
    #[instrument(skip(config), fields(path = %config.db_path.display()))]
    pub fn open(config: RedbStorageConfig) -> Result<Self, StorageError> {
        // Ensure parent directory exists
        if let Some(parent) = config.db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let db = Builder::new()
            .set_cache_size(config.cache_size)
            .create(&config.db_path)
            .map_err(StorageError::database)?;

        info!("Opened redb database");

        let storage = Self {
            db: Arc::new(db),
            config,
        };

        storage.init_tables()?;

        Ok(storage)
    }

    /// Initialize all tables
    fn init_tables(&self) -> Result<(), StorageError> {
        self.write(|txn| {
            for table in [COMMITMENTS, URL_INDEX, HASH_INDEX] {
                txn.open_table(table).map_err(StorageError::database)?;
            }
            Ok(())
        })?;

        debug!("Initialized redb tables");
        Ok(())
    }

    /// Get a reference to the database
    pub fn db(&self) -> &Database {
        &self.db
    }

    /// Get the configuration
    pub fn config(&self) -> &RedbStorageConfig {
        &self.config
    }

    /// Run `f` inside a single write transaction and commit it
    ///
    /// Nothing is committed if `f` fails.
    pub fn write<T>(
        &self,
        f: impl FnOnce(&WriteTransaction) -> Result<T, StorageError>,
    ) -> Result<T, StorageError> {
        let write_txn = self.db.begin_write().map_err(StorageError::database)?;
        let result = f(&write_txn)?;
        write_txn.commit().map_err(StorageError::database)?;
        Ok(result)
    }

    /// Get a value from a table
    pub fn get(
        &self,
        table: TableDefinition<&[u8], &[u8]>,
        key: &[u8],
    ) -> Result<Option<Vec<u8>>, StorageError> {
        let read_txn = self.db.begin_read().map_err(StorageError::database)?;
        let table = read_txn.open_table(table).map_err(StorageError::database)?;

        let value = table
            .get(key)
            .map_err(StorageError::database)?
            .map(|v| v.value().to_vec());

        Ok(value)
    }

    /// Iterate over all entries in a table with a prefix
    pub fn scan_prefix(
        &self,
        table: TableDefinition<&[u8], &[u8]>,
        prefix: &[u8],
    ) -> Result<ScanResults, StorageError> {
        self.scan_prefix_limit(table, prefix, usize::MAX)
    }

    /// Like [`scan_prefix`](Self::scan_prefix), stopping after `limit` entries
    pub fn scan_prefix_limit(
        &self,
        table: TableDefinition<&[u8], &[u8]>,
        prefix: &[u8],
        limit: usize,
    ) -> Result<ScanResults, StorageError> {
        let read_txn = self.db.begin_read().map_err(StorageError::database)?;
        let table = read_txn.open_table(table).map_err(StorageError::database)?;

        let mut results = Vec::new();

        // Use range to get all keys >= prefix
        let range = table.range(prefix..).map_err(StorageError::database)?;

        for entry in range {
            if results.len() >= limit {
                break;
            }
            let (key, value) = entry.map_err(StorageError::database)?;
            let key_bytes = key.value();

            // Stop when we're past the prefix
            if !key_bytes.starts_with(prefix) {
                break;
            }

            results.push((key_bytes.to_vec(), value.value().to_vec()));
        }

        Ok(results)
    }

    /// Number of entries in a table
    pub fn len(&self, table: TableDefinition<&[u8], &[u8]>) -> Result<usize, StorageError> {
        let read_txn = self.db.begin_read().map_err(StorageError::database)?;
        let table = read_txn.open_table(table).map_err(StorageError::database)?;
        let len = table.len().map_err(StorageError::database)?;
        Ok(len as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn create_test_storage() -> (RedbStorage, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let config = RedbStorageConfig::with_path(temp_dir.path().join("nested/test.redb"));
        let storage = RedbStorage::open(config).unwrap();
        (storage, temp_dir)
    }

    fn put(storage: &RedbStorage, key: &[u8], value: &[u8]) {
        storage
            .write(|txn| {
                let mut table = txn.open_table(URL_INDEX).map_err(StorageError::database)?;
                table.insert(key, value).map_err(StorageError::database)?;
                Ok(())
            })
            .unwrap();
    }

    #[test]
    fn test_open_creates_parent_and_tables() {
        let (storage, temp) = create_test_storage();
        assert!(temp.path().join("nested").is_dir());
        assert_eq!(storage.len(COMMITMENTS).unwrap(), 0);
        assert_eq!(storage.len(URL_INDEX).unwrap(), 0);
        assert_eq!(storage.len(HASH_INDEX).unwrap(), 0);
    }

    #[test]
    fn test_write_and_get() {
        let (storage, _temp) = create_test_storage();
        put(&storage, b"test_key", b"test_value");

        let retrieved = storage.get(URL_INDEX, b"test_key").unwrap();
        assert_eq!(retrieved, Some(b"test_value".to_vec()));
        assert_eq!(storage.get(URL_INDEX, b"missing").unwrap(), None);
    }

    #[test]
    fn test_failed_write_is_not_committed() {
        let (storage, _temp) = create_test_storage();

        let result: Result<(), StorageError> = storage.write(|txn| {
            let mut table = txn.open_table(URL_INDEX).map_err(StorageError::database)?;
            table
                .insert(b"ghost".as_slice(), b"value".as_slice())
                .map_err(StorageError::database)?;
            Err(StorageError::database("abort"))
        });

        assert!(result.is_err());
        assert_eq!(storage.get(URL_INDEX, b"ghost").unwrap(), None);
    }

    #[test]
    fn test_scan_prefix() {
        let (storage, _temp) = create_test_storage();

        put(&storage, b"user:alice", b"data1");
        put(&storage, b"user:bob", b"data2");
        put(&storage, b"user:charlie", b"data3");
        put(&storage, b"group:admins", b"data4");

        let users = storage.scan_prefix(URL_INDEX, b"user:").unwrap();
        assert_eq!(users.len(), 3);

        let groups = storage.scan_prefix(URL_INDEX, b"group:").unwrap();
        assert_eq!(groups.len(), 1);

        let first = storage.scan_prefix_limit(URL_INDEX, b"user:", 1).unwrap();
        assert_eq!(first, vec![(b"user:alice".to_vec(), b"data1".to_vec())]);

        assert_eq!(storage.len(URL_INDEX).unwrap(), 4);
    }

    #[test]
    fn test_reopen_keeps_data() {
        let temp_dir = TempDir::new().unwrap();
        let config = RedbStorageConfig::with_path(temp_dir.path().join("reopen.redb"));
        {
            let storage = RedbStorage::open(config.clone()).unwrap();
            put(&storage, b"k", b"v");
        }
        let storage = RedbStorage::open(config).unwrap();
        assert_eq!(storage.get(URL_INDEX, b"k").unwrap(), Some(b"v".to_vec()));
    }
}
