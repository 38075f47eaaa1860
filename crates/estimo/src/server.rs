//! `EstimoServer` builder and accept loop.
//!
//! Ties the layers together: transport → protocol → room hub.

use std::sync::Arc;
use std::time::Duration;

use estimo_protocol::{Codec, JsonCodec};
use estimo_room::{Diagnostics, HubHandle, RoomConfig, TracingDiagnostics, spawn_hub};
use estimo_transport::{DEFAULT_HANDSHAKE_TIMEOUT, Transport, Upgrade, WebSocketTransport};

use crate::config::{DEFAULT_PATH, ServerConfig};
use crate::handler::handle_connection;
use crate::EstimoError;

/// Shared server state passed to each connection handler task.
pub(crate) struct ServerState<C: Codec> {
    pub(crate) hub: HubHandle,
    pub(crate) codec: C,
}

/// Builder for configuring and starting an Estimo server.
///
/// # Example
///
/// ```rust,no_run
/// # async fn run() -> Result<(), estimo::EstimoError> {
/// let server = estimo::EstimoServer::builder()
///     .bind("0.0.0.0:3000")
///     .build()
///     .await?;
/// server.run().await
/// # }
/// ```
pub struct EstimoServerBuilder {
    bind_addr: String,
    path: Option<String>,
    handshake_timeout: Duration,
    room_config: RoomConfig,
}

impl EstimoServerBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self {
            bind_addr: "127.0.0.1:3000".to_string(),
            path: Some(DEFAULT_PATH.to_string()),
            handshake_timeout: DEFAULT_HANDSHAKE_TIMEOUT,
            room_config: RoomConfig::default(),
        }
    }

    /// Creates a builder from settings read by [`ServerConfig`].
    pub fn from_config(config: ServerConfig) -> Self {
        Self {
            bind_addr: config.bind_addr(),
            path: config.path,
            handshake_timeout: config.handshake_timeout,
            room_config: config.room,
        }
    }

    /// Sets the address to bind the server to.
    pub fn bind(mut self, addr: &str) -> Self {
        self.bind_addr = addr.to_string();
        self
    }

    /// Only accept WebSocket upgrades on `path`.
    pub fn path(mut self, path: &str) -> Self {
        self.path = Some(path.to_string());
        self
    }

    /// Accept WebSocket upgrades on any path.
    pub fn any_path(mut self) -> Self {
        self.path = None;
        self
    }

    /// Sets how long a new socket may take to finish the WebSocket upgrade.
    pub fn handshake_timeout(mut self, timeout: Duration) -> Self {
        self.handshake_timeout = timeout;
        self
    }

    /// Sets the room configuration (mask, command buffer).
    pub fn room_config(mut self, config: RoomConfig) -> Self {
        self.room_config = config;
        self
    }

    /// Builds the server, logging rejected actions through `tracing`.
    pub async fn build(self) -> Result<EstimoServer<JsonCodec>, EstimoError> {
        self.build_with(TracingDiagnostics).await
    }

    /// Builds the server with a custom sink for rejected actions.
    ///
    /// Binds the listener and starts the room hub. Uses `JsonCodec` and
    /// `WebSocketTransport`.
    pub async fn build_with(
        self,
        diagnostics: impl Diagnostics,
    ) -> Result<EstimoServer<JsonCodec>, EstimoError> {
        let mut transport = WebSocketTransport::bind(&self.bind_addr)
            .await?
            .with_handshake_timeout(self.handshake_timeout);
        if let Some(path) = self.path {
            transport = transport.with_path(path);
        }

        let state = Arc::new(ServerState {
            hub: spawn_hub(self.room_config, diagnostics),
            codec: JsonCodec,
        });

        Ok(EstimoServer { transport, state })
    }
}

impl Default for EstimoServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A bound Estimo server.
///
/// Call [`run()`](Self::run) to start accepting connections.
pub struct EstimoServer<C: Codec> {
    transport: WebSocketTransport,
    state: Arc<ServerState<C>>,
}

impl EstimoServer<JsonCodec> {
    /// Creates a new builder.
    pub fn builder() -> EstimoServerBuilder {
        EstimoServerBuilder::new()
    }
}

impl<C: Codec> EstimoServer<C> {
    /// Returns the local address the server is bound to.
    pub fn local_addr(&self) -> std::io::Result<std::net::SocketAddr> {
        self.transport.local_addr()
    }

    /// Returns a handle to the room hub, e.g. to inspect rooms.
    pub fn hub(&self) -> HubHandle {
        self.state.hub.clone()
    }

    /// Runs the accept loop.
    ///
    /// Spawns a task per accepted socket. The WebSocket upgrade runs in
    /// that task, so a peer stalling its handshake never holds up the
    /// listener. Runs until the process is terminated.
    pub async fn run(mut self) -> Result<(), EstimoError> {
        tracing::info!("Estimo server running");

        loop {
            match self.transport.accept().await {
                Ok(upgrade) => {
                    let state = Arc::clone(&self.state);
                    tokio::spawn(async move {
                        let peer = upgrade.peer_addr();
                        let conn = match upgrade.upgrade().await {
                            Ok(conn) => conn,
                            Err(e) => {
                                tracing::debug!(%peer, error = %e, "upgrade failed");
                                return;
                            }
                        };
                        if let Err(e) = handle_connection(conn, state).await {
                            tracing::debug!(error = %e, "connection ended with error");
                        }
                    });
                }
                Err(e) => {
                    tracing::warn!(error = %e, "accept failed");
                }
            }
        }
    }
}
