//! `SkyfallServer` builder and accept loop.
//!
//! This is the entry point for running a Skyfall server. It ties the
//! layers together: transport → protocol → arena.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use skyfall_arena::{ArenaHandle, spawn_arena};
use skyfall_protocol::{Codec, JsonCodec};
use skyfall_transport::{
    PendingConnection, PendingWebSocket, Transport, WebSocketConnection, WebSocketTransport,
};

use crate::handler::handle_connection;
use crate::{ServerConfig, SkyfallError};

/// Shared state passed to each connection handler task.
pub(crate) struct ServerState<C: Codec> {
    pub(crate) arena: ArenaHandle,
    pub(crate) codec: C,
    pub(crate) idle_timeout: Duration,
    pub(crate) handshake_timeout: Duration,
}

/// Builder for configuring and starting a Skyfall server.
///
/// # Example
///
/// ```rust,no_run
/// use skyfall::prelude::*;
///
/// # async fn start() -> Result<(), SkyfallError> {
/// let server = SkyfallServer::builder()
///     .bind("0.0.0.0:8080")
///     .build()
///     .await?;
/// server.run().await
/// # }
/// ```
pub struct SkyfallServerBuilder {
    config: ServerConfig,
}

impl SkyfallServerBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self {
            config: ServerConfig::default(),
        }
    }

    /// Sets the address to bind the server to.
    pub fn bind(mut self, addr: &str) -> Self {
        self.config.bind_addr = addr.to_string();
        self
    }

    /// Replaces the whole configuration. Call before [`bind`](Self::bind)
    /// if you want both.
    pub fn config(mut self, config: ServerConfig) -> Self {
        self.config = config;
        self
    }

    /// Binds the listener and starts the arena actor.
    ///
    /// Uses `JsonCodec` over `WebSocketTransport`. Must be called from
    /// within a Tokio runtime.
    pub async fn build(self) -> Result<SkyfallServer, SkyfallError> {
        let transport = WebSocketTransport::bind(&self.config.bind_addr).await?;
        let arena = spawn_arena(self.config.arena);

        let state = Arc::new(ServerState {
            arena,
            codec: JsonCodec,
            idle_timeout: self.config.idle_timeout,
            handshake_timeout: self.config.handshake_timeout,
        });

        Ok(SkyfallServer { transport, state })
    }
}

impl Default for SkyfallServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A bound Skyfall server.
///
/// Call [`run()`](Self::run) to start accepting connections.
pub struct SkyfallServer<C: Codec = JsonCodec> {
    transport: WebSocketTransport,
    state: Arc<ServerState<C>>,
}

impl SkyfallServer {
    /// Creates a new builder.
    pub fn builder() -> SkyfallServerBuilder {
        SkyfallServerBuilder::new()
    }
}

impl<C: Codec> SkyfallServer<C> {
    /// Returns the local address the server is bound to.
    pub fn local_addr(&self) -> Result<SocketAddr, SkyfallError> {
        Ok(self.transport.local_addr()?)
    }

    /// A handle to the server's arena.
    pub fn arena(&self) -> ArenaHandle {
        self.state.arena.clone()
    }

    /// Runs the accept loop.
    ///
    /// Spawns one task per accepted peer. The WebSocket handshake runs in
    /// that task, so a peer that stalls it only holds up itself. Runs
    /// until the process is terminated.
    pub async fn run(mut self) -> Result<(), SkyfallError> {
        tracing::info!(addr = ?self.transport.local_addr().ok(), "Skyfall server running");

        loop {
            match self.transport.accept().await {
                Ok(pending) => {
                    let state = Arc::clone(&self.state);
                    tokio::spawn(async move {
                        let Some(conn) = complete_handshake(pending, &state).await else {
                            return;
                        };
                        if let Err(e) = handle_connection(conn, state).await {
                            tracing::debug!(
                                error = %e,
                                "connection ended with error"
                            );
                        }
                    });
                }
                Err(e) => {
                    tracing::error!(error = %e, "accept failed");
                }
            }
        }
    }
}

/// Upgrades an accepted peer, giving up after the handshake timeout.
async fn complete_handshake<C: Codec>(
    pending: PendingWebSocket,
    state: &ServerState<C>,
) -> Option<WebSocketConnection> {
    let conn_id = pending.id();
    let peer = pending.peer_addr();

    match tokio::time::timeout(state.handshake_timeout, pending.upgrade()).await {
        Ok(Ok(conn)) => Some(conn),
        Ok(Err(e)) => {
            tracing::debug!(%conn_id, %peer, error = %e, "handshake failed");
            None
        }
        Err(_) => {
            tracing::debug!(%conn_id, %peer, "handshake timed out");
            None
        }
    }
}
