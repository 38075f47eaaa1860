//! Integration tests for the WebSocket transport.
//!
//! These spin up a real listener and a `tokio-tungstenite` client to check
//! that frames flow both ways and that the path filter is enforced.

#[cfg(feature = "websocket")]
mod websocket {
    use std::sync::Arc;
    use std::time::Duration;

    use estimo_transport::{
        Connection, Transport, TransportError, Upgrade, WebSocketConnection, WebSocketTransport,
    };
    use tokio::net::TcpStream;
    use futures_util::{SinkExt, StreamExt};
    use tokio_tungstenite::tungstenite::Message;

    type ClientWs = tokio_tungstenite::WebSocketStream<
        tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
    >;

    async fn bind(path: Option<&str>) -> (WebSocketTransport, String) {
        let mut transport = WebSocketTransport::bind("127.0.0.1:0")
            .await
            .expect("should bind");
        if let Some(path) = path {
            transport = transport.with_path(path);
        }
        let addr = transport.local_addr().expect("local addr").to_string();
        (transport, addr)
    }

    /// Accepts one socket and runs its upgrade.
    async fn accept_one(
        transport: &mut WebSocketTransport,
    ) -> Result<WebSocketConnection, TransportError> {
        transport.accept().await?.upgrade().await
    }

    async fn connect_client(url: &str) -> ClientWs {
        let (ws, _) = tokio_tungstenite::connect_async(url)
            .await
            .expect("client should connect");
        ws
    }

    #[tokio::test]
    async fn test_websocket_accept_and_send_receive() {
        let (mut transport, addr) = bind(None).await;

        let server_handle = tokio::spawn(async move {
            accept_one(&mut transport).await.expect("should accept")
        });

        let mut client_ws = connect_client(&format!("ws://{addr}")).await;
        let server_conn = server_handle.await.expect("task should complete");
        assert!(server_conn.id().into_inner() > 0);

        // UTF-8 payloads go out as text frames.
        server_conn
            .send(br#"{"event":"state"}"#)
            .await
            .expect("send should succeed");
        let msg = client_ws.next().await.unwrap().unwrap();
        assert!(msg.is_text());
        assert_eq!(msg.into_data().as_ref(), br#"{"event":"state"}"#);

        client_ws
            .send(Message::Text(r#"{"event":"get_rooms"}"#.to_string().into()))
            .await
            .unwrap();
        let received = server_conn
            .recv()
            .await
            .expect("recv should succeed")
            .expect("should have data");
        assert_eq!(received, br#"{"event":"get_rooms"}"#);

        server_conn.close().await.expect("close should succeed");
    }

    #[tokio::test]
    async fn test_websocket_recv_returns_none_on_client_close() {
        let (mut transport, addr) = bind(None).await;

        let server_handle = tokio::spawn(async move {
            accept_one(&mut transport).await.expect("should accept")
        });

        let mut client_ws = connect_client(&format!("ws://{addr}")).await;
        let server_conn = server_handle.await.unwrap();

        client_ws.send(Message::Close(None)).await.unwrap();

        let result = server_conn.recv().await.expect("recv should not error");
        assert!(result.is_none(), "should return None on client close");
    }

    #[tokio::test]
    async fn test_send_is_not_blocked_by_pending_recv() {
        let (mut transport, addr) = bind(None).await;

        let server_handle = tokio::spawn(async move {
            accept_one(&mut transport).await.expect("should accept")
        });

        let mut client_ws = connect_client(&format!("ws://{addr}")).await;
        let server_conn = Arc::new(server_handle.await.unwrap());

        // Park a reader on the connection; nothing will arrive for it yet.
        let reader = Arc::clone(&server_conn);
        let pending = tokio::spawn(async move { reader.recv().await });
        tokio::time::sleep(Duration::from_millis(20)).await;

        tokio::time::timeout(Duration::from_secs(1), server_conn.send(b"hi"))
            .await
            .expect("send must not wait for the reader")
            .expect("send should succeed");
        let msg = client_ws.next().await.unwrap().unwrap();
        assert_eq!(msg.into_data().as_ref(), b"hi");

        pending.abort();
    }

    #[tokio::test]
    async fn test_path_filter_accepts_matching_path() {
        let (mut transport, addr) = bind(Some("/planning-poker")).await;

        let server_handle = tokio::spawn(async move { accept_one(&mut transport).await });

        let _client = connect_client(&format!("ws://{addr}/planning-poker")).await;
        let accepted = server_handle.await.unwrap();
        assert!(accepted.is_ok());
    }

    #[tokio::test]
    async fn test_path_filter_rejects_other_paths() {
        let (mut transport, addr) = bind(Some("/planning-poker")).await;

        let server_handle = tokio::spawn(async move { accept_one(&mut transport).await });

        let client = tokio_tungstenite::connect_async(format!("ws://{addr}/other")).await;
        assert!(client.is_err(), "upgrade on the wrong path must fail");

        let accepted = server_handle.await.unwrap();
        assert!(accepted.is_err());
    }

    #[tokio::test]
    async fn test_accept_returns_before_the_handshake() {
        let (mut transport, addr) = bind(Some("/planning-poker")).await;

        // Connects but never sends the upgrade request.
        let _silent = TcpStream::connect(&addr).await.unwrap();
        let upgrade = tokio::time::timeout(Duration::from_secs(1), transport.accept())
            .await
            .expect("accept must not wait for the handshake")
            .expect("should accept");
        drop(upgrade);

        let server_handle = tokio::spawn(async move { accept_one(&mut transport).await });
        let _client = connect_client(&format!("ws://{addr}/planning-poker")).await;
        assert!(server_handle.await.unwrap().is_ok());
    }

    #[tokio::test]
    async fn test_silent_peer_times_out() {
        let (transport, addr) = bind(None).await;
        let mut transport = transport.with_handshake_timeout(Duration::from_millis(50));

        let _silent = TcpStream::connect(&addr).await.unwrap();
        let upgrade = transport.accept().await.expect("should accept");
        let peer = upgrade.peer_addr();

        let result = tokio::time::timeout(Duration::from_secs(1), upgrade.upgrade())
            .await
            .expect("upgrade should give up on its own");
        match result {
            Err(TransportError::HandshakeTimedOut { peer: p, timeout }) => {
                assert_eq!(p, peer);
                assert_eq!(timeout, Duration::from_millis(50));
            }
            Err(other) => panic!("expected timeout, got {other}"),
            Ok(_) => panic!("expected timeout, got a connection"),
        }
    }
}
