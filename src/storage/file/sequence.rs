//! File-based sequence tables.

use std::fs::{self, File, OpenOptions};
use std::io::{BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use fs2::FileExt;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::error::{StorageError, StorageResult};
use crate::storage::traits::{InsertReceipt, InsertStatement};

/// Persistent counter state of one sequence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableState {
    /// Sequence name.
    pub name: String,

    /// Key the next insert receives.
    pub next_id: u64,

    /// Width in bytes of the token column.
    pub token_width: u16,

    /// Number of committed inserts.
    pub version: u64,

    /// Last update timestamp (milliseconds since epoch).
    pub updated_at: i64,
}

impl TableState {
    fn new(name: String, token_width: u16) -> Self {
        Self {
            name,
            next_id: 1,
            token_width,
            version: 0,
            updated_at: chrono::Utc::now().timestamp_millis(),
        }
    }
}

/// One sequence "table": a JSON state file holding the counter and an
/// append-only record log of `id oid-hex` lines.
///
/// Inserts hold an exclusive lock on a sidecar `{name}.lock` file, since the
/// state file itself is replaced on every write.
pub struct FileSequenceTable {
    name: Arc<str>,
    state_path: PathBuf,
    records_path: PathBuf,
    lock_path: PathBuf,
    /// Serializes inserts within this process; the file lock covers others.
    lock: Mutex<()>,
    closed: Arc<AtomicBool>,
}

impl FileSequenceTable {
    /// Open the table, creating it if absent.
    ///
    /// An existing table keeps its counter and its original column width.
    pub fn create_if_not_exists(
        dir: &Path,
        name: &str,
        token_width: u16,
        closed: Arc<AtomicBool>,
    ) -> StorageResult<Self> {
        let table = Self {
            name: Arc::from(name),
            state_path: dir.join(format!("{name}.json")),
            records_path: dir.join(format!("{name}.log")),
            lock_path: dir.join(format!("{name}.lock")),
            lock: Mutex::new(()),
            closed,
        };

        table.with_file_lock(|| {
            if !table.state_path.exists() {
                table.write_state(&TableState::new(name.to_string(), token_width))?;
            }
            Ok(())
        })?;

        // Reading the state back is the file equivalent of preparing the
        // statement: a corrupt table fails here rather than mid-request.
        table.read_state()?;
        Ok(table)
    }

    /// Read the current state.
    ///
    /// The state file is only ever replaced by rename, so a reader sees
    /// either the old or the new state in full.
    pub fn read_state(&self) -> StorageResult<TableState> {
        let file = File::open(&self.state_path).map_err(|e| {
            StorageError::NotFound(format!("table '{}': {e}", self.name))
        })?;
        Ok(serde_json::from_reader(BufReader::new(file))?)
    }

    /// Run `f` while holding the cross-process table lock.
    fn with_file_lock<T>(&self, f: impl FnOnce() -> StorageResult<T>) -> StorageResult<T> {
        let lock_file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&self.lock_path)?;

        lock_file
            .lock_exclusive()
            .map_err(|e| StorageError::LockFailed(e.to_string()))?;

        let result = f();

        lock_file
            .unlock()
            .map_err(|e| StorageError::LockFailed(e.to_string()))?;
        result
    }

    /// Replace the state file atomically: write a sibling temp file, sync
    /// it, then rename it over the old state.
    fn write_state(&self, state: &TableState) -> StorageResult<()> {
        let tmp_path = self.state_path.with_extension("json.tmp");

        let mut tmp = File::create(&tmp_path)?;
        serde_json::to_writer_pretty(&mut tmp, state)?;
        tmp.flush()?;
        tmp.sync_all()?;
        drop(tmp);

        fs::rename(&tmp_path, &self.state_path)?;
        Ok(())
    }

    /// Advance the counter, then log the record.
    fn insert_locked(&self, token: &[u8]) -> StorageResult<u64> {
        let mut state = self.read_state()?;

        if token.len() > usize::from(state.token_width) {
            return Err(StorageError::TokenTooWide {
                len: token.len(),
                width: state.token_width,
            });
        }

        let id = state.next_id;
        state.next_id = id
            .checked_add(1)
            .ok_or_else(|| StorageError::Query(format!("table '{}' is exhausted", self.name)))?;
        state.version += 1;
        state.updated_at = chrono::Utc::now().timestamp_millis();

        // Once the counter is durable the id is never handed out again, even
        // if the record below is lost.
        self.write_state(&state)?;

        let mut records = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.records_path)?;
        writeln!(records, "{id} {}", hex(token))?;
        records.sync_data()?;

        Ok(id)
    }
}

#[async_trait]
impl InsertStatement for FileSequenceTable {
    async fn execute(&self, token: &[u8]) -> StorageResult<InsertReceipt> {
        if self.closed.load(Ordering::Acquire) {
            return Err(StorageError::Unavailable);
        }

        let _guard = self.lock.lock().await;
        let id = self.with_file_lock(|| self.insert_locked(token))?;

        Ok(InsertReceipt::new(Arc::clone(&self.name), id))
    }

    async fn close(&self) {
        // Wait for an in-flight insert before the handle goes away.
        let _guard = self.lock.lock().await;
    }
}

fn hex(bytes: &[u8]) -> String {
    use std::fmt::Write as _;

    bytes.iter().fold(String::with_capacity(bytes.len() * 2), |mut out, b| {
        let _ = write!(out, "{b:02x}");
        out
    })
}
