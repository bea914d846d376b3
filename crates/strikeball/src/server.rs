//! `StrikeballServer` builder, accept loop and reaper.
//!
//! This is the entry point for running a Strikeball server. It ties
//! together all the layers: transport → protocol → session → room.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use strikeball_protocol::{Codec, JsonCodec};
use strikeball_room::{RegistryConfig, RoomRegistry};
use strikeball_transport::{Transport, WebSocketTransport};

use crate::handler::handle_connection;
use crate::{ServerConfig, StrikeballError};

/// Shared server state passed to each connection handler task.
///
/// Wrapped in `Arc` so it can be cheaply cloned across tasks. The
/// registry synchronizes itself and never holds its lock while a room
/// actor is awaited, so intents in different rooms run in parallel.
pub(crate) struct ServerState<C: Codec> {
    pub(crate) registry: RoomRegistry,
    pub(crate) codec: C,
    pub(crate) connection_timeout: Duration,
}

/// Builder for configuring and starting a Strikeball server.
///
/// # Example
///
/// ```rust,ignore
/// use strikeball::prelude::*;
///
/// let server = StrikeballServer::builder()
///     .bind("0.0.0.0:8080")
///     .connection_timeout(Duration::from_secs(60))
///     .build()
///     .await?;
/// server.run().await
/// ```
#[derive(Debug, Clone, Default)]
pub struct StrikeballServerBuilder {
    config: ServerConfig,
}

impl StrikeballServerBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the whole configuration.
    pub fn config(mut self, config: ServerConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the address to bind the server to.
    pub fn bind(mut self, addr: &str) -> Self {
        self.config.bind_addr = addr.to_string();
        self
    }

    /// Sets how long a silent connection is kept open.
    pub fn connection_timeout(mut self, timeout: Duration) -> Self {
        self.config.connection_timeout = timeout;
        self
    }

    /// Sets how often idle rooms are swept.
    pub fn reap_interval(mut self, interval: Duration) -> Self {
        self.config.reap_interval = interval;
        self
    }

    /// Sets the room registry thresholds.
    pub fn registry_config(mut self, registry: RegistryConfig) -> Self {
        self.config.registry = registry;
        self
    }

    /// Binds the listener and builds the server with the JSON codec.
    pub async fn build(self) -> Result<StrikeballServer<JsonCodec>, StrikeballError> {
        self.build_with_codec(JsonCodec).await
    }

    /// Binds the listener and builds the server with a custom codec.
    pub async fn build_with_codec<C: Codec>(
        self,
        codec: C,
    ) -> Result<StrikeballServer<C>, StrikeballError> {
        let transport = WebSocketTransport::bind(&self.config.bind_addr).await?;

        let state = Arc::new(ServerState {
            registry: RoomRegistry::new(self.config.registry.clone()),
            codec,
            connection_timeout: self.config.connection_timeout,
        });

        Ok(StrikeballServer {
            transport,
            state,
            reap_interval: self.config.reap_interval,
        })
    }
}

/// A bound Strikeball server.
///
/// Call [`run()`](Self::run) to start accepting connections.
pub struct StrikeballServer<C: Codec = JsonCodec> {
    transport: WebSocketTransport,
    state: Arc<ServerState<C>>,
    reap_interval: Duration,
}

impl StrikeballServer<JsonCodec> {
    /// Creates a new builder.
    pub fn builder() -> StrikeballServerBuilder {
        StrikeballServerBuilder::new()
    }
}

impl<C: Codec> StrikeballServer<C> {
    /// Returns the local address the server is bound to.
    pub fn local_addr(&self) -> Result<std::net::SocketAddr, StrikeballError> {
        Ok(self.transport.local_addr()?)
    }

    /// Runs the server until the process is terminated.
    pub async fn run(self) -> Result<(), StrikeballError> {
        self.run_until(std::future::pending()).await
    }

    /// Runs the accept loop and the reaper until `shutdown` completes.
    ///
    /// Each accepted connection gets its own handler task. Connections
    /// still open at shutdown are left to finish on their own.
    pub async fn run_until(
        mut self,
        shutdown: impl Future<Output = ()>,
    ) -> Result<(), StrikeballError> {
        tracing::info!(addr = ?self.transport.local_addr().ok(), "Strikeball server running");

        let reaper = tokio::spawn(reap_loop(Arc::clone(&self.state), self.reap_interval));
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    tracing::info!("shutdown requested");
                    break;
                }
                accepted = self.transport.accept() => match accepted {
                    Ok(conn) => {
                        let state = Arc::clone(&self.state);
                        tokio::spawn(async move {
                            if let Err(e) = handle_connection(conn, state).await {
                                tracing::debug!(error = %e, "connection ended with error");
                            }
                        });
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "accept failed");
                    }
                },
            }
        }

        reaper.abort();
        Ok(())
    }
}

/// Periodically expires rooms that tripped a reaper threshold.
async fn reap_loop<C: Codec>(state: Arc<ServerState<C>>, period: Duration) {
    // `interval` panics on a zero period.
    let mut ticker = tokio::time::interval(period.max(Duration::from_millis(1)));
    // The first tick completes immediately.
    ticker.tick().await;

    loop {
        ticker.tick().await;
        let reaped = state.registry.reap().await;
        if !reaped.is_empty() {
            tracing::debug!(rooms = ?reaped, "reaper pass finished");
        }
    }
}
