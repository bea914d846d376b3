//! Strikeball server binary.
//!
//! # Usage
//!
//! ```bash
//! strikeball-server --bind 0.0.0.0:8080
//!
//! # Same, configured from the environment
//! STRIKEBALL_BIND=0.0.0.0:8080 STRIKEBALL_LOG=debug strikeball-server
//! ```

mod cli;

use clap::Parser;
use strikeball::prelude::*;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::cli::Cli;

#[tokio::main]
async fn main() -> Result<(), StrikeballError> {
    let cli = Cli::parse();
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log));

    tracing_subscriber::registry().with(fmt::layer()).with(filter).init();

    let server = StrikeballServer::builder()
        .config(cli.server_config())
        .build()
        .await?;

    tracing::info!(addr = %server.local_addr()?, "Strikeball server listening");

    server
        .run_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "failed to listen for ctrl-c");
                std::future::pending::<()>().await;
            }
        })
        .await?;

    tracing::info!("Strikeball server stopped");
    Ok(())
}
