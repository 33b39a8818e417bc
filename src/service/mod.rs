//! Service layer module.
//!
//! Contains the sequence registry and the allocation logic built on it.

pub mod allocation;
pub mod registry;

pub use allocation::AllocationService;
pub use registry::{Sequence, SequenceRegistry};
