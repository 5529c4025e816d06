//! Storage layer using RocksDB
//!
//! # Column Families
//!
//! - `balance` - The single balance row (key: `clan`)
//! - `audit` - Append-only audit trail (key: sequence, big-endian)

use crate::{
    error::{Error, Result},
    store::{checked_apply, AuditStore, BalanceStore},
    types::{AuditEvent, AuditRecord, Balance, Delta},
    Config,
};
use parking_lot::Mutex;
use rocksdb::{
    ColumnFamily, ColumnFamilyDescriptor, IteratorMode, Options, WriteBatch, WriteOptions, DB,
};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Column family names
const CF_BALANCE: &str = "balance";
const CF_AUDIT: &str = "audit";

/// Key of the one balance row
const BALANCE_KEY: &[u8] = b"clan";

/// Storage wrapper for RocksDB
pub struct Storage {
    db: Arc<DB>,

    /// Serializes read-add-write on the balance row
    write_lock: Mutex<()>,

    /// Next audit sequence number
    next_sequence: AtomicU64,

    /// fsync every write
    sync_writes: bool,
}

impl Storage {
    /// Open or create database
    pub fn open(config: &Config) -> Result<Self> {
        let path = &config.data_dir;

        // Create directory if not exists
        std::fs::create_dir_all(path)?;

        let mut db_opts = Options::default();
        db_opts.create_if_missing(true);
        db_opts.create_missing_column_families(true);

        db_opts.set_write_buffer_size(config.rocksdb.write_buffer_size_mb * 1024 * 1024);
        db_opts.set_max_write_buffer_number(config.rocksdb.max_write_buffer_number);

        if config.rocksdb.enable_statistics {
            db_opts.enable_statistics();
        }

        let cf_descriptors = vec![
            ColumnFamilyDescriptor::new(CF_BALANCE, Options::default()),
            ColumnFamilyDescriptor::new(CF_AUDIT, Self::cf_options_audit()),
        ];

        let db = DB::open_cf_descriptors(&db_opts, path, cf_descriptors)?;

        let storage = Self {
            db: Arc::new(db),
            write_lock: Mutex::new(()),
            next_sequence: AtomicU64::new(1),
            sync_writes: config.rocksdb.sync_writes,
        };

        let last_sequence = storage.last_sequence()?;
        storage
            .next_sequence
            .store(last_sequence + 1, Ordering::SeqCst);

        tracing::info!(
            path = ?path,
            last_sequence,
            "Opened RocksDB"
        );

        Ok(storage)
    }

    fn cf_options_audit() -> Options {
        let mut opts = Options::default();
        // Audit trail is written once and rarely read
        opts.set_compression_type(rocksdb::DBCompressionType::Zstd);
        opts
    }

    fn cf_handle(&self, name: &str) -> Result<&ColumnFamily> {
        self.db
            .cf_handle(name)
            .ok_or_else(|| Error::Storage(format!("Column family {} not found", name)))
    }

    fn write_options(&self) -> WriteOptions {
        let mut opts = WriteOptions::default();
        opts.set_sync(self.sync_writes);
        opts
    }

    fn decode_balance(bytes: &[u8]) -> Result<Balance> {
        let raw: [u8; 8] = bytes
            .try_into()
            .map_err(|_| Error::Storage(format!("Corrupt balance row ({} bytes)", bytes.len())))?;
        Ok(Balance::from_be_bytes(raw))
    }

    fn read_balance(&self) -> Result<Option<Balance>> {
        let cf = self.cf_handle(CF_BALANCE)?;
        self.db
            .get_cf(cf, BALANCE_KEY)?
            .map(|bytes| Self::decode_balance(&bytes))
            .transpose()
    }

    fn last_sequence(&self) -> Result<u64> {
        let cf = self.cf_handle(CF_AUDIT)?;

        match self.db.iterator_cf(cf, IteratorMode::End).next() {
            Some(item) => {
                let (key, _) = item?;
                let raw: [u8; 8] = key[..]
                    .try_into()
                    .map_err(|_| Error::Storage("Corrupt audit key".to_string()))?;
                Ok(u64::from_be_bytes(raw))
            }
            None => Ok(0),
        }
    }

    /// Number of rows in the balance column family (always 1 after bootstrap)
    pub fn balance_rows(&self) -> Result<usize> {
        let cf = self.cf_handle(CF_BALANCE)?;
        let mut rows = 0;
        for item in self.db.iterator_cf(cf, IteratorMode::Start) {
            item?;
            rows += 1;
        }
        Ok(rows)
    }

    /// Close database (graceful shutdown)
    pub fn close(self) -> Result<()> {
        drop(self.db);
        tracing::info!("RocksDB closed gracefully");
        Ok(())
    }
}

impl BalanceStore for Storage {
    fn initialize(&self) -> Result<Balance> {
        let _guard = self.write_lock.lock();

        if let Some(balance) = self.read_balance()? {
            tracing::info!(balance, "Balance row present");
            return Ok(balance);
        }

        let cf = self.cf_handle(CF_BALANCE)?;
        self.db
            .put_cf_opt(cf, BALANCE_KEY, 0i64.to_be_bytes(), &self.write_options())?;

        tracing::info!("Balance row created with 0");
        Ok(0)
    }

    fn apply_delta(&self, delta: Delta) -> Result<Balance> {
        let _guard = self.write_lock.lock();

        let current = self
            .read_balance()?
            .ok_or_else(|| Error::Storage("Balance row missing; run bootstrap".to_string()))?;
        let updated = checked_apply(current, delta)?;

        let mut batch = WriteBatch::default();
        batch.put_cf(self.cf_handle(CF_BALANCE)?, BALANCE_KEY, updated.to_be_bytes());

        // Atomic commit
        self.db.write_opt(batch, &self.write_options())?;

        Ok(updated)
    }

    fn balance(&self) -> Result<Balance> {
        self.read_balance()?
            .ok_or_else(|| Error::Storage("Balance row missing; run bootstrap".to_string()))
    }
}

impl AuditStore for Storage {
    fn initialize(&self) -> Result<()> {
        // Column family is created on open
        self.cf_handle(CF_AUDIT).map(|_| ())
    }

    fn append(&self, event: &AuditEvent) -> Result<u64> {
        let cf = self.cf_handle(CF_AUDIT)?;
        let sequence = self.next_sequence.fetch_add(1, Ordering::SeqCst);
        let record = AuditRecord::from_event(sequence, event);
        let value = bincode::serialize(&record)?;

        self.db
            .put_cf_opt(cf, sequence.to_be_bytes(), &value, &self.write_options())?;

        tracing::debug!(
            sequence,
            delta = event.delta,
            balance = event.resulting_balance,
            "Audit record appended"
        );

        Ok(sequence)
    }

    fn records(&self) -> Result<Vec<AuditRecord>> {
        let cf = self.cf_handle(CF_AUDIT)?;

        let mut records = Vec::new();
        for item in self.db.iterator_cf(cf, IteratorMode::Start) {
            let (_, value) = item?;
            records.push(bincode::deserialize(&value)?);
        }

        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn test_config() -> (Config, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let mut config = Config::default();
        config.data_dir = temp_dir.path().to_path_buf();
        (config, temp_dir)
    }

    #[test]
    fn test_storage_open() {
        let (config, _temp) = test_config();
        let storage = Storage::open(&config).unwrap();
        assert!(storage.db.cf_handle(CF_BALANCE).is_some());
        assert!(storage.db.cf_handle(CF_AUDIT).is_some());
    }

    #[test]
    fn test_apply_before_bootstrap_fails() {
        let (config, _temp) = test_config();
        let storage = Storage::open(&config).unwrap();

        assert!(matches!(storage.apply_delta(1), Err(Error::Storage(_))));
        assert_eq!(storage.balance_rows().unwrap(), 0);
    }

    #[test]
    fn test_bootstrap_is_idempotent() {
        let (config, _temp) = test_config();
        let storage = Storage::open(&config).unwrap();

        assert_eq!(BalanceStore::initialize(&storage).unwrap(), 0);
        assert_eq!(storage.apply_delta(17).unwrap(), 17);

        assert_eq!(BalanceStore::initialize(&storage).unwrap(), 17);
        assert_eq!(storage.balance_rows().unwrap(), 1);
        assert_eq!(storage.balance().unwrap(), 17);
    }

    #[test]
    fn test_apply_delta_sequence() {
        let (config, _temp) = test_config();
        let storage = Storage::open(&config).unwrap();
        BalanceStore::initialize(&storage).unwrap();

        assert_eq!(storage.apply_delta(10).unwrap(), 10);
        assert_eq!(storage.apply_delta(-25).unwrap(), -15);
        assert_eq!(storage.apply_delta(15).unwrap(), 0);
    }

    #[test]
    fn test_overflow_does_not_partially_apply() {
        let (config, _temp) = test_config();
        let storage = Storage::open(&config).unwrap();
        BalanceStore::initialize(&storage).unwrap();
        storage.apply_delta(i64::MAX).unwrap();

        assert!(matches!(storage.apply_delta(1), Err(Error::Storage(_))));
        assert_eq!(storage.balance().unwrap(), i64::MAX);
    }

    #[test]
    fn test_audit_append_and_read() {
        let (config, _temp) = test_config();
        let storage = Storage::open(&config).unwrap();
        AuditStore::initialize(&storage).unwrap();

        assert_eq!(storage.append(&AuditEvent::new(1, 1)).unwrap(), 1);
        assert_eq!(storage.append(&AuditEvent::new(-1, 0)).unwrap(), 2);

        let records = storage.records().unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].event(), AuditEvent::new(1, 1));
        assert_eq!(records[1].event(), AuditEvent::new(-1, 0));
    }

    #[test]
    fn test_reopen_preserves_state() {
        let (config, _temp) = test_config();

        {
            let storage = Storage::open(&config).unwrap();
            BalanceStore::initialize(&storage).unwrap();
            storage.apply_delta(9).unwrap();
            storage.append(&AuditEvent::new(9, 9)).unwrap();
            storage.close().unwrap();
        }

        let storage = Storage::open(&config).unwrap();
        assert_eq!(BalanceStore::initialize(&storage).unwrap(), 9);
        assert_eq!(storage.balance_rows().unwrap(), 1);

        // Sequence resumes after the last persisted record
        assert_eq!(storage.append(&AuditEvent::new(1, 10)).unwrap(), 2);
        let sequences: Vec<u64> = storage
            .records()
            .unwrap()
            .iter()
            .map(|r| r.sequence)
            .collect();
        assert_eq!(sequences, vec![1, 2]);
    }
}
