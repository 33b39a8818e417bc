//! Allocation service.
//!
//! Turns one [`AllocationRequest`] into exactly one [`AllocationResult`].
//! Ordinary failures are values, never transport errors.

use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, warn};

use crate::domain::{Allocation, AllocationRequest, AllocationResult};
use crate::error::{AllocationError, ResultCode};
use crate::service::registry::SequenceRegistry;

/// Metric label used for names that are not in the registry.
const UNREGISTERED_LABEL: &str = "<unregistered>";

/// Service allocating ids from registered sequences.
#[derive(Debug, Clone)]
pub struct AllocationService {
    registry: Arc<SequenceRegistry>,
}

impl AllocationService {
    /// Create a new allocation service over a built registry.
    #[must_use]
    pub const fn new(registry: Arc<SequenceRegistry>) -> Self {
        Self { registry }
    }

    /// The registry this service allocates from.
    #[must_use]
    pub fn registry(&self) -> &SequenceRegistry {
        &self.registry
    }

    /// Allocate the next id of `request.sequence`.
    ///
    /// Performs at most one durable insert and never retries. Validation
    /// failures touch no storage. Safe to call concurrently; uniqueness and
    /// ordering across racing callers come from the store.
    pub async fn generate(&self, request: &AllocationRequest) -> AllocationResult {
        let started = Instant::now();

        if request.sequence.is_empty() {
            record(UNREGISTERED_LABEL, ResultCode::SequenceRequired, started);
            return Err(AllocationError::SequenceRequired);
        }

        let Some(sequence) = self.registry.lookup(&request.sequence) else {
            debug!(sequence = %request.sequence, "sequence undefined");
            record(UNREGISTERED_LABEL, ResultCode::SequenceUndefined, started);
            return Err(AllocationError::SequenceUndefined(request.sequence.clone()));
        };

        let result = match sequence.statement().execute(&request.token).await {
            Err(err) => {
                warn!(sequence = sequence.name(), error = %err, "statement execute failed");
                Err(AllocationError::StatementExecuteFailed(err))
            }
            Ok(receipt) => match receipt.last_insert_id() {
                Err(err) => {
                    warn!(sequence = sequence.name(), error = %err, "failed to get last insert id");
                    Err(AllocationError::FailedToGetLastInsertId(err))
                }
                Ok(id) => {
                    debug!(sequence = sequence.name(), id, oid = ?request.token, "generated id");
                    Ok(Allocation {
                        id,
                        token: request.token.clone(),
                    })
                }
            },
        };

        let code = result.as_ref().map_or_else(AllocationError::code, |_| ResultCode::Success);
        record(sequence.name(), code, started);

        result
    }
}

fn record(sequence: &str, code: ResultCode, started: Instant) {
    let sequence = sequence.to_string();
    metrics::counter!(
        "sid_allocations_total",
        "sequence" => sequence.clone(),
        "code" => code.as_str()
    )
    .increment(1);
    metrics::histogram!("sid_allocation_duration_seconds", "sequence" => sequence)
        .record(started.elapsed().as_secs_f64());
}
