/// Errors that can occur in the transport layer.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Sending a frame failed.
    #[error("send failed: {0}")]
    SendFailed(#[source] std::io::Error),

    /// Receiving a frame failed.
    #[error("receive failed: {0}")]
    ReceiveFailed(#[source] std::io::Error),

    /// Binding the listener or accepting a connection failed.
    #[error("accept failed: {0}")]
    AcceptFailed(#[source] std::io::Error),

    /// The WebSocket upgrade was refused (wrong path or bad request).
    #[error("handshake rejected: {0}")]
    HandshakeRejected(String),

    /// The peer did not finish the WebSocket upgrade in time.
    #[error("handshake with {peer} timed out after {timeout:?}")]
    HandshakeTimedOut {
        peer: std::net::SocketAddr,
        timeout: std::time::Duration,
    },
}
