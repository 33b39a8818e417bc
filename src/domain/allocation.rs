//! Allocation request and result types.

use bytes::Bytes;

use crate::error::AllocationError;

/// Input to one allocation attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AllocationRequest {
    /// Sequence to allocate from.
    pub sequence: String,
    /// Opaque correlation token, stored beside the id and echoed back.
    pub token: Bytes,
}

impl AllocationRequest {
    /// Create a new allocation request.
    pub fn new(sequence: impl Into<String>, token: impl Into<Bytes>) -> Self {
        Self {
            sequence: sequence.into(),
            token: token.into(),
        }
    }
}

/// A successful allocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Allocation {
    /// Newly allocated id.
    pub id: u64,
    /// The request's token, unchanged.
    pub token: Bytes,
}

/// Outcome of one allocation attempt.
pub type AllocationResult = Result<Allocation, AllocationError>;
