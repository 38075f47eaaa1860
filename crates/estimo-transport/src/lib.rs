//! Transport abstraction layer for Estimo.
//!
//! Provides the [`Transport`] and [`Connection`] traits that hide the
//! network protocol from the room hub. The hub only ever sees a
//! [`ConnectionId`] and raw frames.
//!
//! # Feature Flags
//!
//! - `websocket` (default): WebSocket transport via `tokio-tungstenite`

#![allow(async_fn_in_trait)]

mod error;
#[cfg(feature = "websocket")]
mod websocket;

pub use error::TransportError;
#[cfg(feature = "websocket")]
pub use websocket::{
    DEFAULT_HANDSHAKE_TIMEOUT, WebSocketConnection, WebSocketTransport, WebSocketUpgrade,
};

use std::fmt;

use serde::{Deserialize, Serialize};

/// Opaque identifier for a live connection.
///
/// Assigned by the transport when a connection is accepted and stable for
/// the connection's lifetime. Serializes as the bare number so it can
/// appear in participant records on the wire.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Creates a new `ConnectionId` from a raw `u64`.
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the underlying `u64` value.
    pub fn into_inner(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// Listens for raw incoming sockets.
///
/// `accept` hands back as soon as a peer connects. The protocol handshake
/// runs later through [`Upgrade`], off the accept loop, so a peer that
/// never finishes it only ties up its own task.
pub trait Transport: Send + Sync + 'static {
    /// The not-yet-upgraded socket produced by this transport.
    type Upgrade: Upgrade<Error = Self::Error>;
    /// The error type for transport operations.
    type Error: std::error::Error + Send + Sync;

    /// Waits for the next peer to connect.
    async fn accept(&mut self) -> Result<Self::Upgrade, Self::Error>;
}

/// An accepted socket whose handshake has not run yet.
pub trait Upgrade: Send + 'static {
    /// The connection produced once the handshake succeeds.
    type Connection: Connection;
    /// The error type for the handshake.
    type Error: std::error::Error + Send + Sync;

    /// Completes the handshake, bounded by the transport's timeout.
    async fn upgrade(self) -> Result<Self::Connection, Self::Error>;
}

/// A single connection that can send and receive frames.
///
/// `send` and `recv` may be called concurrently from different tasks:
/// a reader parked in `recv` must not hold up outbound broadcasts.
pub trait Connection: Send + Sync + 'static {
    /// The error type for connection operations.
    type Error: std::error::Error + Send + Sync;

    /// Sends a frame to the remote peer.
    async fn send(&self, data: &[u8]) -> Result<(), Self::Error>;

    /// Receives the next frame from the remote peer.
    ///
    /// Returns `Ok(None)` when the connection is cleanly closed.
    async fn recv(&self) -> Result<Option<Vec<u8>>, Self::Error>;

    /// Sends a close frame and flushes the write half.
    async fn close(&self) -> Result<(), Self::Error>;

    /// Returns the unique identifier for this connection.
    fn id(&self) -> ConnectionId;
}
