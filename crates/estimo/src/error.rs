//! Unified error type for the Estimo server.

use estimo_protocol::ProtocolError;
use estimo_room::RoomError;
use estimo_transport::TransportError;

/// Top-level error that wraps all crate-specific errors.
///
/// The `#[from]` attribute on each variant generates the `From` impl, so
/// `?` converts sub-crate errors automatically.
#[derive(Debug, thiserror::Error)]
pub enum EstimoError {
    /// A transport-level error (bind, accept, send, recv).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A protocol-level error (encode, decode).
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// A room-level error. In practice only `HubUnavailable` escapes the
    /// hub; action rejections are reported to diagnostics instead.
    #[error(transparent)]
    Room(#[from] RoomError),

    /// An I/O error outside the transport (e.g. reading the local address).
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// A configuration value could not be parsed.
    #[error("invalid configuration: {0}")]
    Config(String),
}
