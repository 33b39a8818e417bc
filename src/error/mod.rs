//! Error handling module.
//!
//! Three layers of errors live here:
//! - [`StorageError`]: failures reported by a storage backend.
//! - [`AllocationError`]: per-request failures, each mapped to a [`ResultCode`].
//! - [`AppError`]: startup and provisioning failures, fatal to the process.

pub mod codes;

pub use codes::{Recovery, ResultCode};

/// Application-level error type.
///
/// Everything here happens before the transport is opened; none of these
/// variants is ever produced while serving a request.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Configuration could not be loaded or is invalid.
    #[error("Invalid configuration: {0}")]
    Config(#[from] config::ConfigError),

    /// Sequence name is not a safe identifier.
    #[error("Invalid sequence name '{name}': {reason}")]
    InvalidSequenceName {
        /// Offending name.
        name: String,
        /// Why it was rejected.
        reason: String,
    },

    /// The same sequence was configured twice.
    #[error("Sequence '{0}' is configured more than once")]
    DuplicateSequence(String),

    /// Creating the backing structure or preparing the insert failed.
    #[error("Failed to provision sequence '{sequence}': {source}")]
    Provisioning {
        /// Sequence being provisioned.
        sequence: String,
        /// Underlying storage failure.
        #[source]
        source: StorageError,
    },

    /// Storage backend error outside of provisioning.
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Storage-specific error type.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// Connection error.
    #[error("Connection failed: {0}")]
    Connection(String),

    /// Query execution error.
    #[error("Query failed: {0}")]
    Query(String),

    /// The correlation token does not fit the backing column.
    #[error("Token of {len} bytes exceeds column width {width}")]
    TokenTooWide {
        /// Supplied token length.
        len: usize,
        /// Column width of the sequence.
        width: u16,
    },

    /// The insert ran but produced no generated key.
    #[error("No generated key for insert into '{0}'")]
    MissingGeneratedKey(String),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Lock acquisition failed.
    #[error("Failed to acquire lock: {0}")]
    LockFailed(String),

    /// File I/O error.
    #[error("File I/O error: {0}")]
    FileIO(String),

    /// Data not found.
    #[error("Data not found: {0}")]
    NotFound(String),

    /// Backend not available (closed or unreachable).
    #[error("Storage backend unavailable")]
    Unavailable,
}

impl From<std::io::Error> for StorageError {
    fn from(err: std::io::Error) -> Self {
        Self::FileIO(err.to_string())
    }
}

impl From<serde_json::Error> for StorageError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl From<sqlx::Error> for StorageError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::PoolClosed => Self::Unavailable,
            sqlx::Error::Io(_) | sqlx::Error::Tls(_) | sqlx::Error::PoolTimedOut => {
                Self::Connection(err.to_string())
            }
            other => Self::Query(other.to_string()),
        }
    }
}

/// Per-request allocation failure.
#[derive(Debug, thiserror::Error)]
pub enum AllocationError {
    /// Empty sequence name.
    #[error("sequence is required")]
    SequenceRequired,

    /// Sequence is not configured.
    #[error("sequence '{0}' is undefined")]
    SequenceUndefined(String),

    /// Insert failed.
    #[error("statement execute failed: {0}")]
    StatementExecuteFailed(#[source] StorageError),

    /// Insert ran but the generated key is unknown.
    #[error("failed to get last insert id: {0}")]
    FailedToGetLastInsertId(#[source] StorageError),
}

impl AllocationError {
    /// Get the result code for this error.
    #[must_use]
    pub const fn code(&self) -> ResultCode {
        match self {
            Self::SequenceRequired => ResultCode::SequenceRequired,
            Self::SequenceUndefined(_) => ResultCode::SequenceUndefined,
            Self::StatementExecuteFailed(_) => ResultCode::StatementExecuteFailed,
            Self::FailedToGetLastInsertId(_) => ResultCode::FailedToGetLastInsertId,
        }
    }
}

/// Result type alias using `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Result type alias using `StorageError`.
pub type StorageResult<T> = std::result::Result<T, StorageError>;
