//! Application state for Axum handlers.

use std::sync::Arc;
use std::time::Duration;

use metrics_exporter_prometheus::PrometheusHandle;

use crate::service::{AllocationService, SequenceRegistry};

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Allocation service.
    pub allocation_service: AllocationService,
    /// Per-request allocation deadline.
    pub request_timeout: Option<Duration>,
    /// Prometheus renderer, when metrics are enabled.
    pub metrics: Option<PrometheusHandle>,
}

impl AppState {
    /// Create a new application state.
    #[must_use]
    pub const fn new(registry: Arc<SequenceRegistry>) -> Self {
        Self {
            allocation_service: AllocationService::new(registry),
            request_timeout: None,
            metrics: None,
        }
    }

    /// Bound every allocation by `timeout`.
    #[must_use]
    pub fn with_request_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Render metrics through `handle`.
    #[must_use]
    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }

    /// The registry behind the allocation service.
    #[must_use]
    pub fn registry(&self) -> &SequenceRegistry {
        self.allocation_service.registry()
    }
}
