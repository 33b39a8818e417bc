//! Storage trait definitions.
//!
//! These traits define the interface for storage backends, enabling swapping
//! between different implementations without changing business logic.

use std::sync::Arc;

use async_trait::async_trait;

use crate::domain::SequenceDefinition;
use crate::error::{StorageError, StorageResult};

/// Result of an executed insert.
///
/// Executing and reading back the generated key are distinct steps: an
/// insert can succeed while its key stays unknown.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InsertReceipt {
    table: Arc<str>,
    generated_key: Option<u64>,
}

impl InsertReceipt {
    /// Create a receipt. A zero key is treated as no key.
    #[must_use]
    pub fn new(table: Arc<str>, generated_key: u64) -> Self {
        Self {
            table,
            generated_key: if generated_key == 0 {
                None
            } else {
                Some(generated_key)
            },
        }
    }

    /// The key generated by the insert.
    ///
    /// # Errors
    ///
    /// Returns `MissingGeneratedKey` if the store reported none.
    pub fn last_insert_id(&self) -> StorageResult<u64> {
        self.generated_key
            .ok_or_else(|| StorageError::MissingGeneratedKey(self.table.to_string()))
    }
}

/// A prepared "insert token, return generated key" statement bound to one
/// sequence's backing structure.
#[async_trait]
pub trait InsertStatement: Send + Sync {
    /// Insert one record carrying `token`.
    ///
    /// Safe to call concurrently; uniqueness and ordering of the generated
    /// keys are the store's responsibility.
    async fn execute(&self, token: &[u8]) -> StorageResult<InsertReceipt>;

    /// Release the statement. Further executions fail.
    async fn close(&self);
}

/// A durable store able to host sequences.
#[async_trait]
pub trait SequenceBackend: Send + Sync {
    /// Create the backing structure for `definition` if absent and prepare
    /// its insert statement.
    async fn provision(
        &self,
        definition: &SequenceDefinition,
    ) -> StorageResult<Arc<dyn InsertStatement>>;

    /// Check if the storage backend is healthy and reachable.
    async fn health_check(&self) -> StorageResult<()>;

    /// Release backend resources (connection pools, file handles).
    async fn close(&self);

    /// Get the storage backend name.
    fn backend_name(&self) -> &'static str;
}
