//! Sequence registry.
//!
//! Built once before the transport opens and never reshaped afterwards, so
//! lookups need no locking.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tracing::info;

use crate::domain::{SequenceDefinition, validate_sequence_name};
use crate::error::{AppError, Result};
use crate::storage::traits::{InsertStatement, SequenceBackend};

/// A provisioned sequence.
pub struct Sequence {
    name: String,
    token_width: u16,
    statement: Arc<dyn InsertStatement>,
}

impl Sequence {
    /// Sequence name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Width in bytes of the token column.
    #[must_use]
    pub const fn token_width(&self) -> u16 {
        self.token_width
    }

    /// The prepared insert bound to this sequence.
    #[must_use]
    pub fn statement(&self) -> &dyn InsertStatement {
        self.statement.as_ref()
    }
}

impl std::fmt::Debug for Sequence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Sequence")
            .field("name", &self.name)
            .field("token_width", &self.token_width)
            .finish_non_exhaustive()
    }
}

/// Immutable mapping from sequence name to its prepared insert.
pub struct SequenceRegistry {
    backend: Arc<dyn SequenceBackend>,
    sequences: HashMap<String, Sequence>,
}

impl SequenceRegistry {
    /// Provision every sequence and build the registry.
    ///
    /// All-or-nothing: the first invalid name, duplicate, or storage failure
    /// aborts the build.
    ///
    /// # Errors
    ///
    /// Returns `InvalidSequenceName`, `DuplicateSequence` or `Provisioning`.
    pub async fn build(
        backend: Arc<dyn SequenceBackend>,
        definitions: impl IntoIterator<Item = SequenceDefinition>,
    ) -> Result<Self> {
        let definitions: Vec<SequenceDefinition> = definitions.into_iter().collect();

        // Reject bad input before touching the store.
        let mut seen = HashSet::with_capacity(definitions.len());
        for definition in &definitions {
            validate_sequence_name(&definition.name).map_err(|reason| {
                AppError::InvalidSequenceName {
                    name: definition.name.clone(),
                    reason,
                }
            })?;
            if !seen.insert(definition.name.as_str()) {
                return Err(AppError::DuplicateSequence(definition.name.clone()));
            }
        }

        let mut sequences = HashMap::with_capacity(definitions.len());
        for definition in definitions {
            info!(sequence = %definition.name, "checking sequence");

            let statement = backend.provision(&definition).await.map_err(|source| {
                AppError::Provisioning {
                    sequence: definition.name.clone(),
                    source,
                }
            })?;

            let sequence = Sequence {
                name: definition.name.clone(),
                token_width: definition.token_width,
                statement,
            };

            sequences.insert(definition.name, sequence);
        }

        info!(
            backend = backend.backend_name(),
            count = sequences.len(),
            "sequence registry ready"
        );

        Ok(Self { backend, sequences })
    }

    /// Find a sequence by exact, case-sensitive name.
    #[must_use]
    pub fn lookup(&self, name: &str) -> Option<&Sequence> {
        self.sequences.get(name)
    }

    /// Sorted names of all sequences.
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.sequences.keys().cloned().collect();
        names.sort_unstable();
        names
    }

    /// Number of provisioned sequences.
    #[must_use]
    pub fn len(&self) -> usize {
        self.sequences.len()
    }

    /// Whether no sequence is provisioned.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sequences.is_empty()
    }

    /// The backend hosting the sequences.
    #[must_use]
    pub fn backend(&self) -> &dyn SequenceBackend {
        self.backend.as_ref()
    }

    /// Release every statement, then the backend.
    ///
    /// Callers drain in-flight allocations first.
    pub async fn close_all(&self) {
        for sequence in self.sequences.values() {
            sequence.statement.close().await;
        }
        self.backend.close().await;
        info!("sequence registry closed");
    }
}

impl std::fmt::Debug for SequenceRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SequenceRegistry")
            .field("backend", &self.backend.backend_name())
            .field("sequences", &self.names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use tempfile::TempDir;

    use super::*;
    use crate::config::FileBackendConfig;
    use crate::error::{StorageError, StorageResult};
    use crate::storage::file::FileBackend;

    fn file_backend() -> (Arc<dyn SequenceBackend>, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let backend = FileBackend::new(&FileBackendConfig {
            data_dir: temp_dir.path().to_path_buf(),
        })
        .unwrap();
        (Arc::new(backend), temp_dir)
    }

    /// Backend that fails to provision one named sequence.
    struct FailingBackend {
        inner: Arc<dyn SequenceBackend>,
        fail_on: &'static str,
        provisioned: AtomicUsize,
    }

    #[async_trait]
    impl SequenceBackend for FailingBackend {
        async fn provision(
            &self,
            definition: &SequenceDefinition,
        ) -> StorageResult<Arc<dyn InsertStatement>> {
            if definition.name == self.fail_on {
                return Err(StorageError::Query("table creation denied".to_string()));
            }
            self.provisioned.fetch_add(1, Ordering::SeqCst);
            self.inner.provision(definition).await
        }

        async fn health_check(&self) -> StorageResult<()> {
            self.inner.health_check().await
        }

        async fn close(&self) {
            self.inner.close().await;
        }

        fn backend_name(&self) -> &'static str {
            "failing"
        }
    }

    #[tokio::test]
    async fn test_build_and_lookup() {
        let (backend, _temp) = file_backend();

        let registry = SequenceRegistry::build(
            backend,
            [
                SequenceDefinition::new("jobs", 14),
                SequenceDefinition::new("orders", 24),
            ],
        )
        .await
        .unwrap();

        assert_eq!(registry.len(), 2);
        assert_eq!(registry.names(), vec!["jobs", "orders"]);
        assert_eq!(registry.lookup("orders").unwrap().token_width(), 24);
        assert!(registry.lookup("missing").is_none());
        // Case-sensitive.
        assert!(registry.lookup("Jobs").is_none());
    }

    #[tokio::test]
    async fn test_duplicate_names_fail() {
        let (backend, _temp) = file_backend();

        let result = SequenceRegistry::build(
            backend,
            [
                SequenceDefinition::new("jobs", 14),
                SequenceDefinition::new("jobs", 20),
            ],
        )
        .await;

        assert!(matches!(result, Err(AppError::DuplicateSequence(name)) if name == "jobs"));
    }

    #[tokio::test]
    async fn test_invalid_name_fails_before_provisioning() {
        let (inner, _temp) = file_backend();
        let backend = Arc::new(FailingBackend {
            inner,
            fail_on: "",
            provisioned: AtomicUsize::new(0),
        });

        let result = SequenceRegistry::build(
            backend.clone(),
            [
                SequenceDefinition::new("jobs", 14),
                SequenceDefinition::new("drop table", 14),
            ],
        )
        .await;

        assert!(matches!(result, Err(AppError::InvalidSequenceName { .. })));
        assert_eq!(backend.provisioned.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_provisioning_failure_aborts_build() {
        let (inner, _temp) = file_backend();
        let backend = Arc::new(FailingBackend {
            inner,
            fail_on: "orders",
            provisioned: AtomicUsize::new(0),
        });

        let result = SequenceRegistry::build(
            backend,
            [
                SequenceDefinition::new("jobs", 14),
                SequenceDefinition::new("orders", 14),
            ],
        )
        .await;

        assert!(matches!(
            result,
            Err(AppError::Provisioning { sequence, .. }) if sequence == "orders"
        ));
    }

    #[tokio::test]
    async fn test_close_all_releases_statements() {
        let (backend, _temp) = file_backend();
        let registry = SequenceRegistry::build(backend, [SequenceDefinition::new("jobs", 14)])
            .await
            .unwrap();

        let sequence = registry.lookup("jobs").unwrap();
        assert!(sequence.statement().execute(b"a").await.is_ok());

        registry.close_all().await;
        assert!(sequence.statement().execute(b"b").await.is_err());
        assert!(registry.backend().health_check().await.is_err());
    }
}
