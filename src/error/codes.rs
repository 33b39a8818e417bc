//! Allocation result codes.
//!
//! These values are the caller-visible contract of `Generate`: a reply always
//! carries one of them, zero meaning success.

use serde::{Deserialize, Serialize};

/// Outcome code returned with every allocation reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "i32", try_from = "i32")]
#[repr(i32)]
pub enum ResultCode {
    /// Allocation completed.
    Success = 0,
    /// The request carried an empty sequence name.
    SequenceRequired = 1,
    /// The sequence name is not configured.
    SequenceUndefined = 2,
    /// The durable insert failed.
    StatementExecuteFailed = 3,
    /// The insert ran but its generated key could not be read back.
    FailedToGetLastInsertId = 4,
}

impl ResultCode {
    /// All codes in wire order.
    pub const ALL: [Self; 5] = [
        Self::Success,
        Self::SequenceRequired,
        Self::SequenceUndefined,
        Self::StatementExecuteFailed,
        Self::FailedToGetLastInsertId,
    ];

    /// Get the code as an i32.
    #[must_use]
    pub const fn as_i32(self) -> i32 {
        self as i32
    }

    /// Stable snake-case label, used for metrics and logs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::SequenceRequired => "sequence_required",
            Self::SequenceUndefined => "sequence_undefined",
            Self::StatementExecuteFailed => "statement_execute_failed",
            Self::FailedToGetLastInsertId => "failed_to_get_last_insert_id",
        }
    }

    /// Whether the allocation succeeded.
    #[must_use]
    pub const fn is_success(self) -> bool {
        matches!(self, Self::Success)
    }

    /// How a caller is expected to react to this code.
    #[must_use]
    pub const fn recovery(self) -> Recovery {
        match self {
            Self::Success => Recovery::NotApplicable,
            Self::SequenceRequired | Self::SequenceUndefined => Recovery::FixRequest,
            Self::StatementExecuteFailed => Recovery::Retry,
            Self::FailedToGetLastInsertId => Recovery::Uncertain,
        }
    }
}

impl std::fmt::Display for ResultCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_i32())
    }
}

impl From<ResultCode> for i32 {
    fn from(code: ResultCode) -> Self {
        code.as_i32()
    }
}

impl TryFrom<i32> for ResultCode {
    type Error = String;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        Self::ALL
            .into_iter()
            .find(|code| code.as_i32() == value)
            .ok_or_else(|| format!("unknown result code {value}"))
    }
}

/// Caller-side recovery class of a result code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recovery {
    /// Nothing to recover from.
    NotApplicable,
    /// The request itself is wrong.
    FixRequest,
    /// Transient store failure; retry with backoff at the caller's discretion.
    Retry,
    /// The id may or may not have been allocated.
    Uncertain,
}

impl std::fmt::Display for Recovery {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotApplicable => write!(f, "n/a"),
            Self::FixRequest => write!(f, "fix_request"),
            Self::Retry => write!(f, "retry"),
            Self::Uncertain => write!(f, "uncertain"),
        }
    }
}
