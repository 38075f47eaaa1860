//! Per-connection handler: register with the hub, forward frames in,
//! forward broadcasts out.
//!
//! Each accepted connection gets its own Tokio task running this handler.
//! The flow is:
//!   1. Register with the hub → receive an outbound channel
//!   2. Spawn a writer task draining that channel onto the socket
//!   3. Loop: receive frames → decode → hand to the hub
//!   4. On close, report the disconnect so the hub can update rooms and
//!      send our own close frame

use std::sync::Arc;

use estimo_protocol::{ClientEvent, Codec};
use estimo_room::{ConnectionReceiver, HubHandle};
use estimo_transport::{Connection, ConnectionId, WebSocketConnection};

use crate::server::ServerState;
use crate::EstimoError;

/// Drop guard that reports the disconnect when the handler exits.
///
/// Fires even if the handler returns early with an error. Since `Drop` is
/// synchronous, we spawn a fire-and-forget task for the async send.
struct DisconnectGuard {
    conn_id: ConnectionId,
    hub: HubHandle,
}

impl Drop for DisconnectGuard {
    fn drop(&mut self) {
        let conn_id = self.conn_id;
        let hub = self.hub.clone();
        tokio::spawn(async move {
            if hub.disconnect(conn_id).await.is_err() {
                tracing::debug!(%conn_id, "hub gone before disconnect");
            }
        });
    }
}

/// Handles a single connection from accept to close.
pub(crate) async fn handle_connection<C: Codec>(
    conn: WebSocketConnection,
    state: Arc<ServerState<C>>,
) -> Result<(), EstimoError> {
    let conn_id = conn.id();
    tracing::debug!(%conn_id, peer = %conn.peer_addr(), "handling new connection");
    let conn = Arc::new(conn);

    let outbound = state.hub.connect(conn_id).await?;
    let _guard = DisconnectGuard {
        conn_id,
        hub: state.hub.clone(),
    };

    let writer = tokio::spawn(forward_outbound(
        Arc::clone(&conn),
        outbound,
        Arc::clone(&state),
    ));

    loop {
        let data = match conn.recv().await {
            Ok(Some(data)) => data,
            Ok(None) => {
                tracing::info!(%conn_id, "connection closed");
                break;
            }
            Err(e) => {
                tracing::debug!(%conn_id, error = %e, "recv error");
                break;
            }
        };

        let event: ClientEvent = match state.codec.decode(&data) {
            Ok(event) => event,
            Err(e) => {
                tracing::debug!(%conn_id, error = %e, "ignoring undecodable frame");
                continue;
            }
        };

        tracing::debug!(%conn_id, event = event.name(), "event received");
        state.hub.dispatch(conn_id, event).await?;
    }

    // Socket is done; anything still queued has nowhere to go.
    writer.abort();
    if let Err(e) = conn.close().await {
        tracing::trace!(%conn_id, error = %e, "close after disconnect");
    }
    Ok(())
}

/// Drains broadcasts for one connection onto its socket, in order.
async fn forward_outbound<C: Codec>(
    conn: Arc<WebSocketConnection>,
    mut outbound: ConnectionReceiver,
    state: Arc<ServerState<C>>,
) {
    let conn_id = conn.id();
    while let Some(event) = outbound.recv().await {
        let bytes = match state.codec.encode(&event) {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::error!(%conn_id, error = %e, "failed to encode event");
                continue;
            }
        };
        if let Err(e) = conn.send(&bytes).await {
            tracing::debug!(%conn_id, error = %e, "send failed, stopping writer");
            break;
        }
    }
}
