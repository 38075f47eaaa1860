//! WebSocket transport implementation using `tokio-tungstenite`.

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Mutex;
use tokio_tungstenite::tungstenite::handshake::server::{
    ErrorResponse, Request, Response,
};
use tokio_tungstenite::tungstenite::http::StatusCode;
use tokio_tungstenite::tungstenite::Message;

use crate::{Connection, ConnectionId, Transport, TransportError, Upgrade};

/// Counter for generating unique connection IDs.
static NEXT_CONNECTION_ID: AtomicU64 = AtomicU64::new(1);

type WsStream = tokio_tungstenite::WebSocketStream<TcpStream>;

/// How long a peer gets to complete the upgrade unless configured otherwise.
pub const DEFAULT_HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(10);

/// A WebSocket-based [`Transport`] that listens for incoming connections.
///
/// When a path is configured, upgrade requests for any other path are
/// answered with `404 Not Found` and never become connections.
pub struct WebSocketTransport {
    listener: TcpListener,
    path: Option<Arc<str>>,
    handshake_timeout: Duration,
}

impl WebSocketTransport {
    /// Binds a new WebSocket transport to the given address, accepting
    /// upgrades on any path.
    pub async fn bind(addr: &str) -> Result<Self, TransportError> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(TransportError::AcceptFailed)?;
        tracing::info!(addr, "WebSocket transport listening");
        Ok(Self {
            listener,
            path: None,
            handshake_timeout: DEFAULT_HANDSHAKE_TIMEOUT,
        })
    }

    /// Restricts upgrades to a single request path (e.g. `/planning-poker`).
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(normalize_path(&path.into()).into());
        self
    }

    /// Sets how long an accepted socket may take to finish the upgrade.
    pub fn with_handshake_timeout(mut self, timeout: Duration) -> Self {
        self.handshake_timeout = timeout;
        self
    }

    /// Returns the local address the listener is bound to.
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }
}

/// Strips a trailing slash so `/room/` and `/room` compare equal.
fn normalize_path(path: &str) -> &str {
    match path.strip_suffix('/') {
        Some(stripped) if !stripped.is_empty() => stripped,
        _ => path,
    }
}

/// Answers the upgrade request, or refuses it with 404 if `expected` is set
/// and the request asked for another path.
fn check_path(
    expected: Option<&str>,
    req: &Request,
    resp: Response,
) -> Result<Response, ErrorResponse> {
    let requested = normalize_path(req.uri().path());
    match expected {
        Some(path) if path != requested => {
            let mut err = ErrorResponse::new(Some(format!("no endpoint at {requested}")));
            *err.status_mut() = StatusCode::NOT_FOUND;
            Err(err)
        }
        _ => Ok(resp),
    }
}

impl Transport for WebSocketTransport {
    type Upgrade = WebSocketUpgrade;
    type Error = TransportError;

    async fn accept(&mut self) -> Result<Self::Upgrade, Self::Error> {
        let (stream, peer_addr) = self
            .listener
            .accept()
            .await
            .map_err(TransportError::AcceptFailed)?;
        tracing::trace!(%peer_addr, "socket accepted");

        Ok(WebSocketUpgrade {
            stream,
            peer_addr,
            path: self.path.clone(),
            timeout: self.handshake_timeout,
        })
    }
}

/// A TCP socket waiting to be upgraded to a WebSocket.
pub struct WebSocketUpgrade {
    stream: TcpStream,
    peer_addr: SocketAddr,
    path: Option<Arc<str>>,
    timeout: Duration,
}

impl WebSocketUpgrade {
    /// Returns the remote address of the peer.
    pub fn peer_addr(&self) -> SocketAddr {
        self.peer_addr
    }
}

impl Upgrade for WebSocketUpgrade {
    type Connection = WebSocketConnection;
    type Error = TransportError;

    async fn upgrade(self) -> Result<Self::Connection, Self::Error> {
        let Self {
            stream,
            peer_addr,
            path,
            timeout,
        } = self;

        let callback = |req: &Request, resp: Response| check_path(path.as_deref(), req, resp);
        let handshake = tokio_tungstenite::accept_hdr_async(stream, callback);

        let ws = match tokio::time::timeout(timeout, handshake).await {
            Ok(Ok(ws)) => ws,
            Ok(Err(e)) => {
                tracing::debug!(%peer_addr, error = %e, "WebSocket handshake failed");
                return Err(TransportError::HandshakeRejected(e.to_string()));
            }
            Err(_) => {
                tracing::debug!(%peer_addr, ?timeout, "WebSocket handshake timed out");
                return Err(TransportError::HandshakeTimedOut {
                    peer: peer_addr,
                    timeout,
                });
            }
        };

        let id = ConnectionId::new(NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed));
        tracing::debug!(%id, %peer_addr, "accepted WebSocket connection");

        let (sink, stream) = ws.split();
        Ok(WebSocketConnection {
            id,
            peer_addr,
            sink: Mutex::new(sink),
            stream: Mutex::new(stream),
        })
    }
}

/// A single WebSocket connection.
///
/// The socket is split so the write half can be driven by a broadcast
/// forwarder while the read half is parked waiting for the next frame.
pub struct WebSocketConnection {
    id: ConnectionId,
    peer_addr: SocketAddr,
    sink: Mutex<SplitSink<WsStream, Message>>,
    stream: Mutex<SplitStream<WsStream>>,
}

impl WebSocketConnection {
    /// Returns the remote address of the peer.
    pub fn peer_addr(&self) -> SocketAddr {
        self.peer_addr
    }
}

impl Connection for WebSocketConnection {
    type Error = TransportError;

    /// Sends UTF-8 payloads as text frames and anything else as binary.
    async fn send(&self, data: &[u8]) -> Result<(), Self::Error> {
        let msg = match std::str::from_utf8(data) {
            Ok(text) => Message::Text(text.to_owned().into()),
            Err(_) => Message::Binary(data.to_vec().into()),
        };
        self.sink.lock().await.send(msg).await.map_err(|e| {
            TransportError::SendFailed(std::io::Error::new(
                std::io::ErrorKind::BrokenPipe,
                e,
            ))
        })
    }

    async fn recv(&self) -> Result<Option<Vec<u8>>, Self::Error> {
        let mut stream = self.stream.lock().await;
        loop {
            match stream.next().await {
                Some(Ok(Message::Binary(data))) => {
                    return Ok(Some(data.into()));
                }
                Some(Ok(Message::Text(text))) => {
                    return Ok(Some(text.as_bytes().to_vec()));
                }
                Some(Ok(Message::Close(_))) | None => return Ok(None),
                Some(Ok(_)) => continue, // ping/pong/frame
                Some(Err(e)) => {
                    return Err(TransportError::ReceiveFailed(
                        std::io::Error::new(
                            std::io::ErrorKind::ConnectionReset,
                            e,
                        ),
                    ));
                }
            }
        }
    }

    async fn close(&self) -> Result<(), Self::Error> {
        self.sink.lock().await.close().await.map_err(|e| {
            TransportError::SendFailed(std::io::Error::new(
                std::io::ErrorKind::BrokenPipe,
                e,
            ))
        })
    }

    fn id(&self) -> ConnectionId {
        self.id
    }
}
