//! Storage backend factory.
//!
//! Creates the appropriate storage backend based on configuration.

use std::sync::Arc;

use tracing::info;

use crate::config::{BackendConfig, BackendDriver};
use crate::error::AppError;
use crate::storage::file::FileBackend;
use crate::storage::mysql::MySqlBackend;
use crate::storage::traits::SequenceBackend;

/// Create a storage backend based on configuration.
///
/// # Errors
///
/// Returns an error if the storage backend cannot be reached or initialized.
pub async fn create_backend(config: &BackendConfig) -> Result<Arc<dyn SequenceBackend>, AppError> {
    match config.driver {
        BackendDriver::MySQL => {
            info!(dsn = %config.mysql.redacted_dsn(), "preparing mysql connection");
            let backend = MySqlBackend::connect(&config.mysql).await?;
            Ok(Arc::new(backend))
        }
        BackendDriver::File => {
            let backend = FileBackend::new(&config.file)?;

            // Verify storage is healthy
            backend.health_check().await?;

            Ok(Arc::new(backend))
        }
    }
}
