//! # SID Server
//!
//! A unique-identifier allocation service. Clients name a *sequence* and
//! pass an opaque correlation token; the service returns the next id of that
//! sequence, durably recorded beside the token.
//!
//! Uniqueness and monotonicity come from the store's atomic auto-increment:
//! every configured sequence is a table with an `AUTO_INCREMENT` key, and an
//! allocation is a single-row insert.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                            SID Server                             │
//! ├──────────────────────────────────────────────────────────────────┤
//! │  ┌─────────────┐  ┌──────────────┐  ┌────────────┐  ┌──────────┐ │
//! │  │  API Layer  │  │  Allocation  │  │  Sequence  │  │ Storage  │ │
//! │  │  (Axum)     │→ │  Service     │→ │  Registry  │→ │ Backend  │ │
//! │  └─────────────┘  └──────────────┘  └────────────┘  └──────────┘ │
//! └──────────────────────────────────────────────────────────────────┘
//! ```

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![forbid(unsafe_code)]

pub mod api;
pub mod config;
pub mod domain;
pub mod error;
pub mod service;
pub mod storage;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use metrics_exporter_prometheus::PrometheusBuilder;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{info, warn};

use crate::api::create_router;
use crate::api::state::AppState;
use crate::config::AppConfig;
use crate::service::SequenceRegistry;
use crate::storage::create_backend;

const METRICS_UPKEEP_INTERVAL: Duration = Duration::from_secs(5);

/// Run the SID server.
///
/// This function:
/// 1. Loads configuration from files and environment
/// 2. Connects the storage backend
/// 3. Provisions every configured sequence
/// 4. Starts the HTTP server
/// 5. Handles graceful shutdown and releases the sequences
///
/// # Errors
///
/// Returns an error if:
/// - Configuration cannot be loaded
/// - The storage backend is unreachable
/// - Any sequence fails to provision
/// - HTTP server fails to bind
pub async fn run() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // Load configuration
    let config = AppConfig::load()?;

    // Initialize logging
    init_logging(&config);

    info!(
        version = env!("CARGO_PKG_VERSION"),
        "Starting SID server"
    );

    // Connect storage and provision sequences before opening the transport
    let backend = create_backend(&config.backend).await?;
    info!(backend = %config.backend.driver, "Storage initialized");

    let registry = Arc::new(
        SequenceRegistry::build(backend, config.sequence_definitions()).await?,
    );

    let mut state = AppState::new(Arc::clone(&registry))
        .with_request_timeout(config.server.request_timeout());

    if config.observability.metrics_enabled {
        let handle = PrometheusBuilder::new().install_recorder()?;

        // Histograms are drained by periodic upkeep.
        let upkeep = handle.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(METRICS_UPKEEP_INTERVAL);
            loop {
                ticker.tick().await;
                upkeep.run_upkeep();
            }
        });

        state = state.with_metrics(handle);
    }

    let app = create_router(state);

    let addr = SocketAddr::new(config.server.host, config.server.port);
    let listener = TcpListener::bind(addr).await?;
    info!(%addr, "listening");

    // Start server with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // In-flight requests have drained
    registry.close_all().await;

    info!("Server shutdown complete");
    Ok(())
}

/// Initialize logging based on configuration.
fn init_logging(config: &AppConfig) {
    use tracing_subscriber::{EnvFilter, fmt, prelude::*};

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.observability.log_level));

    let subscriber = tracing_subscriber::registry().with(filter);

    if config.observability.log_format == "json" {
        subscriber.with(fmt::layer().json()).init();
    } else {
        subscriber.with(fmt::layer()).init();
    }
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            warn!("Received Ctrl+C, initiating graceful shutdown");
        }
        () = terminate => {
            warn!("Received SIGTERM, initiating graceful shutdown");
        }
    }
}
