//! Optimized storage layer using RocksDB

use crate::config::StorageConfig;
use rocksdb::{Direction, IteratorMode, Options, WriteBatch, DB};
use std::path::Path;
use std::sync::Arc;
use tracing::info;

#[derive(Clone)]
pub struct OptimizedStorage {
    db: Arc<DB>,
}

impl OptimizedStorage {
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self, rocksdb::Error> {
        Self::open(path, 64)
    }

    /// Open using storage configuration, wiping the directory first when
    /// `clear_on_start` is set. A wipe that fails aborts the open.
    pub fn new_with_config(config: &StorageConfig) -> Result<Self, rocksdb::Error> {
        if config.clear_on_start && Path::new(&config.data_directory).exists() {
            DB::destroy(&Options::default(), &config.data_directory)?;
            info!(path = %config.data_directory, "Cleared existing database");
        }
        Self::open(&config.data_directory, config.write_buffer_size_mb)
    }

    fn open<P: AsRef<Path>>(path: P, write_buffer_size_mb: usize) -> Result<Self, rocksdb::Error> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.set_write_buffer_size(write_buffer_size_mb.max(1) * 1024 * 1024);
        opts.set_max_write_buffer_number(4);
        opts.set_compression_type(rocksdb::DBCompressionType::Lz4);

        let db = DB::open(&opts, path)?;
        Ok(Self { db: Arc::new(db) })
    }

    pub fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, rocksdb::Error> {
        self.db.get(key)
    }

    pub fn put(&self, key: &[u8], value: &[u8]) -> Result<(), rocksdb::Error> {
        self.db.put(key, value)
    }

    /// Write all items atomically
    pub fn batch_write<K, V>(&self, items: &[(K, V)]) -> Result<(), rocksdb::Error>
    where
        K: AsRef<[u8]>,
        V: AsRef<[u8]>,
    {
        let mut batch = WriteBatch::default();
        for (key, value) in items {
            batch.put(key, value);
        }
        self.db.write(batch)
    }

    /// Ordered scan of at most `limit` keys under `prefix`
    pub fn scan_prefix(
        &self,
        prefix: &[u8],
        limit: usize,
    ) -> Result<Vec<(Vec<u8>, Vec<u8>)>, rocksdb::Error> {
        let mut rows = Vec::with_capacity(limit.min(256));

        for item in self.db.iterator(IteratorMode::From(prefix, Direction::Forward)) {
            let (key, value) = item?;
            if !key.starts_with(prefix) {
                break;
            }
            rows.push((key.to_vec(), value.to_vec()));
            if rows.len() >= limit {
                break;
            }
        }

        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_scan_prefix_stops_at_prefix_and_limit() {
        let dir = TempDir::new().unwrap();
        let storage = OptimizedStorage::new(dir.path()).unwrap();

        storage
            .batch_write(&[
                (b"a:1".to_vec(), b"one".to_vec()),
                (b"a:2".to_vec(), b"two".to_vec()),
                (b"a:3".to_vec(), b"three".to_vec()),
                (b"b:1".to_vec(), b"other".to_vec()),
            ])
            .unwrap();

        let first = storage.scan_prefix(b"a:", 2).unwrap();
        assert_eq!(first.len(), 2);
        assert_eq!(first[0].0, b"a:1");

        let all = storage.scan_prefix(b"a:", 10).unwrap();
        assert_eq!(all.len(), 3);
        assert_eq!(all[2].1, b"three");
    }

    #[test]
    fn test_put_get() {
        let dir = TempDir::new().unwrap();
        let storage = OptimizedStorage::new(dir.path()).unwrap();

        storage.put(b"k", b"v").unwrap();
        assert_eq!(storage.get(b"k").unwrap(), Some(b"v".to_vec()));
        assert_eq!(storage.get(b"missing").unwrap(), None);
    }

    fn config_for(dir: &TempDir, clear_on_start: bool) -> StorageConfig {
        StorageConfig {
            data_directory: dir.path().join("db").to_string_lossy().to_string(),
            clear_on_start,
            ..StorageConfig::default()
        }
    }

    #[test]
    fn test_clear_on_start_wipes_existing_data() {
        let dir = TempDir::new().unwrap();

        {
            let storage = OptimizedStorage::new_with_config(&config_for(&dir, false)).unwrap();
            storage.put(b"k", b"v").unwrap();
        }

        let kept = OptimizedStorage::new_with_config(&config_for(&dir, false)).unwrap();
        assert_eq!(kept.get(b"k").unwrap(), Some(b"v".to_vec()));
        drop(kept);

        let cleared = OptimizedStorage::new_with_config(&config_for(&dir, true)).unwrap();
        assert_eq!(cleared.get(b"k").unwrap(), None);
    }

    #[test]
    fn test_clear_on_start_with_missing_directory() {
        let dir = TempDir::new().unwrap();
        let storage = OptimizedStorage::new_with_config(&config_for(&dir, true)).unwrap();
        storage.put(b"k", b"v").unwrap();
    }

    #[test]
    fn test_clear_on_start_fails_while_database_is_open() {
        let dir = TempDir::new().unwrap();
        let _open = OptimizedStorage::new_with_config(&config_for(&dir, false)).unwrap();

        // The live handle holds the LOCK file, so the wipe cannot proceed
        assert!(OptimizedStorage::new_with_config(&config_for(&dir, true)).is_err());
    }
}
