//! `MySQL` storage backend.
//!
//! Every sequence is a table with an `AUTO_INCREMENT` primary key; the
//! generated key of a single-row insert is the allocated id:
//!
//! ```sql
//! CREATE TABLE IF NOT EXISTS `jobs` (
//!     id BIGINT UNSIGNED PRIMARY KEY AUTO_INCREMENT,
//!     oid BINARY(14)
//! )
//! ```

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use sqlx::mysql::{MySqlPool, MySqlPoolOptions};
use sqlx::{Executor, MySql};
use tracing::debug;

use crate::config::MySqlBackendConfig;
use crate::domain::{SequenceDefinition, validate_sequence_name};
use crate::error::{StorageError, StorageResult};
use crate::storage::traits::{InsertReceipt, InsertStatement, SequenceBackend};

/// `MySQL` backend shared by all sequences.
pub struct MySqlBackend {
    pool: MySqlPool,
}

impl MySqlBackend {
    /// Connect the pool and verify the server answers.
    ///
    /// # Errors
    ///
    /// Returns an error if the server cannot be reached.
    pub async fn connect(config: &MySqlBackendConfig) -> StorageResult<Self> {
        let pool = MySqlPoolOptions::new()
            .min_connections(config.min_connections)
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(config.connect_timeout))
            .connect(&config.dsn)
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        let backend = Self { pool };
        backend.health_check().await?;
        Ok(backend)
    }
}

#[async_trait]
impl SequenceBackend for MySqlBackend {
    async fn provision(
        &self,
        definition: &SequenceDefinition,
    ) -> StorageResult<Arc<dyn InsertStatement>> {
        let ddl = create_table_sql(definition)?;
        debug!(sequence = %definition.name, "ensuring table exists");
        self.pool.execute(ddl.as_str()).await?;

        let sql = insert_sql(&definition.name)?;
        // Preparing here surfaces a broken table before any request arrives;
        // the pool's statement cache keeps it prepared per connection.
        self.pool.prepare(sql.as_str()).await?;

        Ok(Arc::new(MySqlInsertStatement {
            table: Arc::from(definition.name.as_str()),
            sql,
            token_width: definition.token_width,
            pool: self.pool.clone(),
        }))
    }

    async fn health_check(&self) -> StorageResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn close(&self) {
        self.pool.close().await;
    }

    fn backend_name(&self) -> &'static str {
        "mysql"
    }
}

/// Prepared insert for one sequence table.
struct MySqlInsertStatement {
    table: Arc<str>,
    sql: String,
    token_width: u16,
    pool: MySqlPool,
}

#[async_trait]
impl InsertStatement for MySqlInsertStatement {
    async fn execute(&self, token: &[u8]) -> StorageResult<InsertReceipt> {
        // Strict-mode servers reject this themselves; lenient ones would
        // silently truncate the token.
        if token.len() > usize::from(self.token_width) {
            return Err(StorageError::TokenTooWide {
                len: token.len(),
                width: self.token_width,
            });
        }

        let result = sqlx::query::<MySql>(&self.sql)
            .bind(token)
            .execute(&self.pool)
            .await?;

        Ok(InsertReceipt::new(
            Arc::clone(&self.table),
            result.last_insert_id(),
        ))
    }

    async fn close(&self) {
        // Statements live in the per-connection cache; closing the pool
        // releases them.
    }
}

/// DDL creating the backing table of a sequence.
fn create_table_sql(definition: &SequenceDefinition) -> StorageResult<String> {
    validate_sequence_name(&definition.name).map_err(StorageError::Query)?;
    Ok(format!(
        "CREATE TABLE IF NOT EXISTS `{}` (\
         id BIGINT UNSIGNED PRIMARY KEY AUTO_INCREMENT, \
         oid BINARY({}))",
        definition.name, definition.token_width
    ))
}

/// DML inserting one token into a sequence table.
fn insert_sql(name: &str) -> StorageResult<String> {
    validate_sequence_name(name).map_err(StorageError::Query)?;
    Ok(format!("INSERT INTO `{name}` (oid) VALUES (?)"))
}
