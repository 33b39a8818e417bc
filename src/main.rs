//! SID Server Entry Point
//!
//! Loads configuration, provisions the configured sequences, and serves
//! allocations over HTTP until shut down.

use sid_server::run;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    run().await
}
