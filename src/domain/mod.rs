//! Domain models for the SID service.
//!
//! This module contains the sequence and allocation types plus the wire
//! contract of the `Generate` call.

pub mod allocation;
pub mod dto;
pub mod sequence;

pub use allocation::{Allocation, AllocationRequest, AllocationResult};
pub use dto::{GenerateReply, GenerateRequest, SequenceListResponse};
pub use sequence::{MAX_SEQUENCE_NAME_LEN, SequenceDefinition, validate_sequence_name};
