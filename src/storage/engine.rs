//! SQLite-backed key-value engine
//!
//! Exposes named partitions, point lookups, ordered full-partition iteration
//! and a persisted counter per partition. Work runs inside `view` (read-only
//! snapshot) or `update` (the single writer, committed on `Ok`, rolled back
//! on `Err`).

use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use rusqlite::{Connection, OpenFlags, OptionalExtension, TransactionBehavior, params};
use serde::{Deserialize, Serialize};

use super::schema;
use crate::{Error, Result};

/// Default busy timeout (ms).
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

/// Isolated key space inside the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Partition {
    /// Pipelines submitted for compilation
    Pending,
    /// Compiled, runnable pipelines
    Pipelines,
    /// Most recent run records per pipeline
    RunHistory,
}

impl Partition {
    /// Logical partition name
    pub fn as_str(&self) -> &'static str {
        match self {
            Partition::Pending => "pending-pipelines",
            Partition::Pipelines => "pipelines",
            Partition::RunHistory => "run-history",
        }
    }

    /// Backing table name
    pub fn table(&self) -> &'static str {
        match self {
            Partition::Pending => "pending_pipelines",
            Partition::Pipelines => "pipelines",
            Partition::RunHistory => "run_history",
        }
    }

    pub fn all() -> &'static [Partition] {
        &[Partition::Pending, Partition::Pipelines, Partition::RunHistory]
    }
}

impl std::fmt::Display for Partition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Encode a numeric id as a key that sorts in ascending numeric order.
pub fn id_key(id: u64) -> [u8; 8] {
    id.to_be_bytes()
}

/// `SQLite` sync mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncMode {
    /// Commits are flushed before returning
    #[default]
    Full,
    /// Faster; a power loss may drop the last commits
    Normal,
}

impl SyncMode {
    pub const fn pragma_value(self) -> &'static str {
        match self {
            Self::Full => "full",
            Self::Normal => "normal",
        }
    }
}

#[derive(Debug, Clone)]
pub struct EngineOptions {
    /// How long a writer waits for the lock before failing
    pub busy_timeout: Duration,
    pub sync_mode: SyncMode,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            busy_timeout: Duration::from_millis(DEFAULT_BUSY_TIMEOUT_MS),
            sync_mode: SyncMode::Full,
        }
    }
}

/// Process-wide engine handle.
///
/// Holds one writer connection and a pool of read-only connections. Writers
/// are serialized by the mutex (and `BEGIN IMMEDIATE` across processes);
/// readers run concurrently on WAL snapshots.
pub struct Engine {
    path: PathBuf,
    options: EngineOptions,
    writer: Mutex<Connection>,
    readers: Mutex<Vec<Connection>>,
}

impl Engine {
    /// Open a database file (creates it and all partitions if missing)
    pub fn open(path: &Path, options: EngineOptions) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let mut conn = Connection::open(path)?;
        conn.busy_timeout(options.busy_timeout)?;
        conn.execute_batch("PRAGMA journal_mode = wal;")?;
        conn.execute_batch(&format!(
            "PRAGMA synchronous = {};",
            options.sync_mode.pragma_value()
        ))?;
        initialize_schema(&mut conn)?;

        tracing::debug!(path = %path.display(), "opened engine");

        Ok(Self {
            path: path.to_path_buf(),
            options,
            writer: Mutex::new(conn),
            readers: Mutex::new(Vec::new()),
        })
    }

    /// Run `f` inside a read-only transaction.
    ///
    /// The snapshot is fixed by the first read and is unaffected by writes
    /// committed afterwards. The transaction is always rolled back.
    pub fn view<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&ReadTx<'_>) -> Result<T>,
    {
        let mut conn = self.checkout_reader()?;
        let result = {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Deferred)?;
            let result = f(&ReadTx { conn: &tx });
            drop(tx);
            result
        };
        self.checkin_reader(conn);
        result
    }

    /// Run `f` inside the read-write transaction.
    ///
    /// Committed when `f` returns `Ok`, rolled back otherwise. Only one
    /// update runs at a time.
    pub fn update<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&WriteTx<'_>) -> Result<T>,
    {
        // A panic inside `f` drops the transaction, which rolls it back, so
        // the connection behind a poisoned lock is still usable.
        let mut conn = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let result = f(&WriteTx { read: ReadTx { conn: &tx } });
        match result {
            Ok(value) => {
                tx.commit()?;
                Ok(value)
            }
            Err(err) => {
                if let Err(rollback_err) = tx.rollback() {
                    tracing::warn!("rollback failed: {}", rollback_err);
                }
                Err(err)
            }
        }
    }

    fn checkout_reader(&self) -> Result<Connection> {
        let pooled = self
            .readers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop();

        match pooled {
            Some(conn) => Ok(conn),
            None => {
                let conn = Connection::open_with_flags(
                    &self.path,
                    OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
                )?;
                conn.busy_timeout(self.options.busy_timeout)?;
                Ok(conn)
            }
        }
    }

    fn checkin_reader(&self, conn: Connection) {
        self.readers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(conn);
    }
}

/// Initialize all partitions and the counter table
fn initialize_schema(conn: &mut Connection) -> Result<()> {
    let tx = conn.transaction()?;
    for stmt in schema::all_schema_statements() {
        tx.execute(&stmt, [])?;
    }
    tx.commit()?;
    Ok(())
}

/// Read access to partitions inside a transaction.
pub struct ReadTx<'a> {
    conn: &'a Connection,
}

impl ReadTx<'_> {
    /// Point lookup. `None` when the key is absent.
    pub fn get(&self, partition: Partition, key: &[u8]) -> Result<Option<Vec<u8>>> {
        let sql = format!("SELECT value FROM {} WHERE key = ?1", partition.table());
        self.conn
            .query_row(&sql, [key], |row| row.get(0))
            .optional()
            .map_err(Into::into)
    }

    /// Visit every entry in ascending key order.
    ///
    /// Stops at the first error returned by `f` and returns it.
    pub fn for_each<F>(&self, partition: Partition, mut f: F) -> Result<()>
    where
        F: FnMut(&[u8], &[u8]) -> Result<()>,
    {
        let sql = format!("SELECT key, value FROM {} ORDER BY key", partition.table());
        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query([])?;

        while let Some(row) = rows.next()? {
            let key: Vec<u8> = row.get(0)?;
            let value: Vec<u8> = row.get(1)?;
            f(&key, &value)?;
        }
        Ok(())
    }

    /// Number of entries in the partition
    pub fn count(&self, partition: Partition) -> Result<u64> {
        let sql = format!("SELECT COUNT(*) FROM {}", partition.table());
        let count: i64 = self.conn.query_row(&sql, [], |row| row.get(0))?;
        Ok(count as u64)
    }

    /// Last value handed out by the partition counter (0 if never advanced)
    pub fn sequence(&self, partition: Partition) -> Result<u64> {
        let value: Option<i64> = self
            .conn
            .query_row(
                "SELECT value FROM partition_sequences WHERE partition = ?1",
                [partition.as_str()],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value.unwrap_or(0) as u64)
    }
}

/// Read-write access; reads see this transaction's own writes.
pub struct WriteTx<'a> {
    read: ReadTx<'a>,
}

impl<'a> std::ops::Deref for WriteTx<'a> {
    type Target = ReadTx<'a>;

    fn deref(&self) -> &Self::Target {
        &self.read
    }
}

impl WriteTx<'_> {
    /// Insert or replace the value under `key`
    pub fn put(&self, partition: Partition, key: &[u8], value: &[u8]) -> Result<()> {
        let sql = format!(
            "INSERT OR REPLACE INTO {} (key, value) VALUES (?1, ?2)",
            partition.table()
        );
        self.read.conn.execute(&sql, params![key, value])?;
        Ok(())
    }

    /// Remove `key`; returns whether it existed
    pub fn delete(&self, partition: Partition, key: &[u8]) -> Result<bool> {
        let sql = format!("DELETE FROM {} WHERE key = ?1", partition.table());
        let changed = self.read.conn.execute(&sql, [key])?;
        Ok(changed > 0)
    }

    /// Advance the partition counter and return the new value (first is 1).
    ///
    /// The counter lives apart from the keys, so it never rewinds when
    /// entries are removed.
    pub fn next_sequence(&self, partition: Partition) -> Result<u64> {
        let value: i64 = self
            .read
            .conn
            .query_row(
                r#"
                INSERT INTO partition_sequences (partition, value) VALUES (?1, 1)
                ON CONFLICT(partition) DO UPDATE SET value = value + 1
                RETURNING value
                "#,
                [partition.as_str()],
                |row| row.get(0),
            )
            .map_err(Error::Counter)?;
        Ok(value as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn open_engine(dir: &TempDir) -> Engine {
        Engine::open(&dir.path().join("engine.db"), EngineOptions::default()).unwrap()
    }

    #[test]
    fn test_put_get_roundtrip() {
        let dir = TempDir::new().unwrap();
        let engine = open_engine(&dir);

        engine
            .update(|tx| tx.put(Partition::Pending, b"a", b"one"))
            .unwrap();

        let value = engine.view(|tx| tx.get(Partition::Pending, b"a")).unwrap();
        assert_eq!(value.as_deref(), Some(&b"one"[..]));

        let missing = engine.view(|tx| tx.get(Partition::Pending, b"b")).unwrap();
        assert!(missing.is_none());
    }

    #[test]
    fn test_partitions_are_isolated() {
        let dir = TempDir::new().unwrap();
        let engine = open_engine(&dir);

        engine
            .update(|tx| tx.put(Partition::Pipelines, &id_key(1), b"p"))
            .unwrap();

        let other = engine
            .view(|tx| tx.get(Partition::RunHistory, &id_key(1)))
            .unwrap();
        assert!(other.is_none());
    }

    #[test]
    fn test_for_each_numeric_order() {
        let dir = TempDir::new().unwrap();
        let engine = open_engine(&dir);

        engine
            .update(|tx| {
                for id in [300u64, 2, 256, 1] {
                    tx.put(Partition::Pipelines, &id_key(id), b"x")?;
                }
                Ok(())
            })
            .unwrap();

        let mut seen = Vec::new();
        engine
            .view(|tx| {
                tx.for_each(Partition::Pipelines, |k, _| {
                    let mut buf = [0u8; 8];
                    buf.copy_from_slice(k);
                    seen.push(u64::from_be_bytes(buf));
                    Ok(())
                })
            })
            .unwrap();
        assert_eq!(seen, vec![1, 2, 256, 300]);
    }

    #[test]
    fn test_update_error_rolls_back() {
        let dir = TempDir::new().unwrap();
        let engine = open_engine(&dir);

        let result: Result<()> = engine.update(|tx| {
            tx.put(Partition::Pending, b"ghost", b"boo")?;
            Err(Error::Serialization("forced".into()))
        });
        assert!(result.unwrap_err().is_serialization());

        let value = engine.view(|tx| tx.get(Partition::Pending, b"ghost")).unwrap();
        assert!(value.is_none());
    }

    #[test]
    fn test_busy_writer_is_storage_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("engine.db");
        let options = EngineOptions {
            busy_timeout: Duration::from_millis(10),
            ..Default::default()
        };
        let first = Engine::open(&path, options.clone()).unwrap();
        let second = Engine::open(&path, options).unwrap();

        let err = first
            .update(|_| second.update(|tx| tx.put(Partition::Pending, b"k", b"v")))
            .unwrap_err();
        assert!(err.is_storage(), "unexpected error: {err}");

        let value = second.view(|tx| tx.get(Partition::Pending, b"k")).unwrap();
        assert!(value.is_none());
    }

    #[test]
    fn test_sequence_never_rewinds() {
        let dir = TempDir::new().unwrap();
        let engine = open_engine(&dir);

        let first = engine
            .update(|tx| tx.next_sequence(Partition::Pipelines))
            .unwrap();
        let second = engine
            .update(|tx| {
                let id = tx.next_sequence(Partition::Pipelines)?;
                tx.put(Partition::Pipelines, &id_key(id), b"x")?;
                Ok(id)
            })
            .unwrap();
        assert_eq!((first, second), (1, 2));

        engine
            .update(|tx| tx.delete(Partition::Pipelines, &id_key(second)))
            .unwrap();

        let third = engine
            .update(|tx| tx.next_sequence(Partition::Pipelines))
            .unwrap();
        assert_eq!(third, 3);

        // Counters are per partition
        let other = engine
            .update(|tx| tx.next_sequence(Partition::RunHistory))
            .unwrap();
        assert_eq!(other, 1);
    }

    #[test]
    fn test_sequence_survives_reopen() {
        let dir = TempDir::new().unwrap();
        {
            let engine = open_engine(&dir);
            engine
                .update(|tx| tx.next_sequence(Partition::Pipelines))
                .unwrap();
        }
        let engine = open_engine(&dir);
        let seq = engine.view(|tx| tx.sequence(Partition::Pipelines)).unwrap();
        assert_eq!(seq, 1);
    }

    #[test]
    fn test_view_snapshot_ignores_later_commits() {
        let dir = TempDir::new().unwrap();
        let engine = open_engine(&dir);

        engine
            .update(|tx| tx.put(Partition::Pending, b"a", b"1"))
            .unwrap();

        let counts = engine
            .view(|tx| {
                let before = tx.count(Partition::Pending)?;
                engine.update(|w| w.put(Partition::Pending, b"b", b"2"))?;
                let after = tx.count(Partition::Pending)?;
                Ok((before, after))
            })
            .unwrap();
        assert_eq!(counts, (1, 1));

        let now = engine.view(|tx| tx.count(Partition::Pending)).unwrap();
        assert_eq!(now, 2);
    }
}
