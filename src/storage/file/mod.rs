//! File-based storage backend.
//!
//! This backend stores each sequence as a JSON counter file plus an
//! append-only record log, with file locking for atomic inserts.
//! Suitable for development and single-node deployments.
//!
//! Directory structure:
//! ```text
//! data/
//! └── sequences/
//!     ├── {name}.json
//!     ├── {name}.lock
//!     └── {name}.log
//! ```

mod sequence;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;

use crate::config::FileBackendConfig;
use crate::domain::{SequenceDefinition, validate_sequence_name};
use crate::error::{StorageError, StorageResult};
use crate::storage::traits::{InsertStatement, SequenceBackend};

pub use sequence::{FileSequenceTable, TableState};

/// File-based storage implementation.
pub struct FileBackend {
    /// Base data directory.
    base_dir: PathBuf,
    /// Directory holding the sequence tables.
    sequences_dir: PathBuf,
    /// Shared with every table; set once by `close`.
    closed: Arc<AtomicBool>,
}

impl FileBackend {
    /// Create a new file backend.
    ///
    /// # Errors
    ///
    /// Returns an error if the data directories cannot be created.
    pub fn new(config: &FileBackendConfig) -> StorageResult<Self> {
        let base_dir = config.data_dir.clone();
        let sequences_dir = base_dir.join("sequences");

        std::fs::create_dir_all(&sequences_dir).map_err(|e| {
            StorageError::FileIO(format!(
                "Failed to create directory {}: {e}",
                sequences_dir.display()
            ))
        })?;

        Ok(Self {
            base_dir,
            sequences_dir,
            closed: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Directory holding the sequence tables.
    #[must_use]
    pub fn sequences_dir(&self) -> &Path {
        &self.sequences_dir
    }
}

#[async_trait]
impl SequenceBackend for FileBackend {
    async fn provision(
        &self,
        definition: &SequenceDefinition,
    ) -> StorageResult<Arc<dyn InsertStatement>> {
        if self.closed.load(Ordering::Acquire) {
            return Err(StorageError::Unavailable);
        }

        // Names become file names.
        validate_sequence_name(&definition.name).map_err(StorageError::Query)?;

        let table = FileSequenceTable::create_if_not_exists(
            &self.sequences_dir,
            &definition.name,
            definition.token_width,
            Arc::clone(&self.closed),
        )?;

        Ok(Arc::new(table))
    }

    async fn health_check(&self) -> StorageResult<()> {
        if self.closed.load(Ordering::Acquire) || !self.sequences_dir.exists() {
            return Err(StorageError::Unavailable);
        }

        let test_file = self.base_dir.join(".health_check");
        tokio::fs::write(&test_file, b"ok")
            .await
            .map_err(|e| StorageError::FileIO(format!("Health check failed: {e}")))?;
        tokio::fs::remove_file(&test_file)
            .await
            .map_err(|e| StorageError::FileIO(format!("Health check cleanup failed: {e}")))?;

        Ok(())
    }

    async fn close(&self) {
        self.closed.store(true, Ordering::Release);
    }

    fn backend_name(&self) -> &'static str {
        "file"
    }
}
