pub mod comments;
pub mod error;
pub mod invariants;
pub mod listing;
pub mod migrations;
pub mod models;
pub mod posts;
pub mod queries;
pub mod users;
pub mod votes;

use rusqlite::{Connection, OpenFlags, Transaction, TransactionBehavior};
use std::path::Path;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tracing::info;

pub use error::{ErrorKind, Result, StoreError};

pub const DEFAULT_READER_POOL_SIZE: usize = 4;

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Store handle with a reader/writer split: one writer connection that owns
/// every transaction, plus a round-robin pool of read-only connections. WAL
/// mode keeps readers from blocking on the writer.
pub struct Database {
    writer: Mutex<Connection>,
    readers: Vec<Mutex<Connection>>,
    reader_idx: AtomicUsize,
}

impl Database {
    pub fn open(path: &Path) -> Result<Self> {
        Self::open_with_readers(path, DEFAULT_READER_POOL_SIZE)
    }

    pub fn open_with_readers(path: &Path, reader_pool_size: usize) -> Result<Self> {
        let mut writer = Connection::open(path)?;
        configure_writer(&writer)?;

        migrations::run(&mut writer)?;

        let mut readers = Vec::with_capacity(reader_pool_size);
        for _ in 0..reader_pool_size {
            let conn = Connection::open_with_flags(
                path,
                OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
            )?;
            conn.busy_timeout(BUSY_TIMEOUT)?;
            readers.push(Mutex::new(conn));
        }

        info!(
            "Database opened at {} (1 writer + {} readers)",
            path.display(),
            reader_pool_size
        );
        Ok(Self {
            writer: Mutex::new(writer),
            readers,
            reader_idx: AtomicUsize::new(0),
        })
    }

    /// Private in-memory store. Reads go through the writer connection since
    /// an in-memory database cannot be shared across connections.
    pub fn open_in_memory() -> Result<Self> {
        let mut writer = Connection::open_in_memory()?;
        writer.pragma_update(None, "foreign_keys", "ON")?;
        migrations::run(&mut writer)?;

        Ok(Self {
            writer: Mutex::new(writer),
            readers: Vec::new(),
            reader_idx: AtomicUsize::new(0),
        })
    }

    /// Run read-only work on a pooled connection. No transaction is opened.
    pub fn with_conn<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T>,
    {
        if self.readers.is_empty() {
            let conn = self
                .writer
                .lock()
                .map_err(|e| StoreError::LockPoisoned(e.to_string()))?;
            return f(&conn);
        }

        let idx = self.reader_idx.fetch_add(1, Ordering::Relaxed) % self.readers.len();
        let conn = self.readers[idx]
            .lock()
            .map_err(|e| StoreError::LockPoisoned(e.to_string()))?;
        f(&conn)
    }

    /// Run `f` inside one IMMEDIATE transaction on the writer. The write lock
    /// is taken at BEGIN, so read-then-act logic inside `f` cannot interleave
    /// with another writer. Any error rolls back every mutation made by `f`.
    pub fn with_tx<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Transaction<'_>) -> Result<T>,
    {
        let mut conn = self
            .writer
            .lock()
            .map_err(|e| StoreError::LockPoisoned(e.to_string()))?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let out = f(&tx)?;
        tx.commit()?;
        Ok(out)
    }
}

fn configure_writer(conn: &Connection) -> Result<()> {
    // Set first so the journal switch below waits out a concurrent opener.
    conn.busy_timeout(BUSY_TIMEOUT)?;
    // WAL mode for concurrent reads
    conn.pragma_update(None, "journal_mode", "WAL")?;
    conn.pragma_update(None, "foreign_keys", "ON")?;
    Ok(())
}
