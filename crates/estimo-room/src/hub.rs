//! Hub actor: the single task that owns the room registry.
//!
//! Every connection talks to the hub through an mpsc channel. Commands are
//! applied strictly one at a time, and the broadcasts a command causes are
//! queued on the recipients' channels before the next command is read. No
//! lock guards the registry because nothing else can reach it.

use std::collections::HashMap;

use estimo_protocol::{ClientEvent, RoomsSnapshot, ServerEvent};
use estimo_transport::ConnectionId;
use tokio::sync::{mpsc, oneshot};

use crate::dispatch::{Dispatcher, Outbound};
use crate::{Diagnostics, RoomConfig, RoomError};

/// Channel sender for delivering outbound events to one connection.
pub type ConnectionSender = mpsc::UnboundedSender<ServerEvent>;

/// Receiving end handed to a connection's writer task.
pub type ConnectionReceiver = mpsc::UnboundedReceiver<ServerEvent>;

/// Commands sent to the hub through its channel.
pub(crate) enum HubCommand {
    /// Register a connection's outbound channel.
    Connect {
        conn: ConnectionId,
        sender: ConnectionSender,
    },

    /// Apply an inbound event from a connection.
    Event {
        conn: ConnectionId,
        event: ClientEvent,
    },

    /// The connection is gone: leave every room and forget its channel.
    Disconnect { conn: ConnectionId },

    /// Request an unmasked copy of every room.
    Snapshot {
        reply: oneshot::Sender<RoomsSnapshot>,
    },

    /// Stop the hub.
    Shutdown,
}

/// Handle to the running hub. Used to send commands to it.
///
/// Cheap to clone; every connection task holds one.
#[derive(Clone)]
pub struct HubHandle {
    sender: mpsc::Sender<HubCommand>,
}

impl HubHandle {
    /// Registers a connection and returns the receiver its broadcasts
    /// will arrive on.
    pub async fn connect(&self, conn: ConnectionId) -> Result<ConnectionReceiver, RoomError> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.send(HubCommand::Connect { conn, sender: tx }).await?;
        Ok(rx)
    }

    /// Submits an inbound event (fire-and-forget).
    pub async fn dispatch(&self, conn: ConnectionId, event: ClientEvent) -> Result<(), RoomError> {
        self.send(HubCommand::Event { conn, event }).await
    }

    /// Reports that a connection has gone away.
    pub async fn disconnect(&self, conn: ConnectionId) -> Result<(), RoomError> {
        self.send(HubCommand::Disconnect { conn }).await
    }

    /// Returns an unmasked copy of every room, taken after all previously
    /// sent commands have been applied.
    pub async fn snapshot(&self) -> Result<RoomsSnapshot, RoomError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(HubCommand::Snapshot { reply: reply_tx }).await?;
        reply_rx.await.map_err(|_| RoomError::HubUnavailable)
    }

    /// Tells the hub to stop.
    pub async fn shutdown(&self) -> Result<(), RoomError> {
        self.send(HubCommand::Shutdown).await
    }

    async fn send(&self, cmd: HubCommand) -> Result<(), RoomError> {
        self.sender
            .send(cmd)
            .await
            .map_err(|_| RoomError::HubUnavailable)
    }
}

/// The internal hub state. Runs inside a Tokio task.
struct Hub<D: Diagnostics> {
    dispatcher: Dispatcher<D>,
    /// Per-connection outbound channels.
    senders: HashMap<ConnectionId, ConnectionSender>,
    receiver: mpsc::Receiver<HubCommand>,
}

impl<D: Diagnostics> Hub<D> {
    /// Runs the actor loop, processing commands until shutdown or until
    /// every handle is dropped.
    async fn run(mut self) {
        tracing::info!("room hub started");

        while let Some(cmd) = self.receiver.recv().await {
            match cmd {
                HubCommand::Connect { conn, sender } => {
                    tracing::debug!(%conn, "connection registered");
                    self.senders.insert(conn, sender);
                }
                HubCommand::Event { conn, event } => {
                    if let Some(outbound) = self.dispatcher.handle(conn, event) {
                        self.deliver(outbound);
                    }
                }
                HubCommand::Disconnect { conn } => {
                    self.senders.remove(&conn);
                    for outbound in self.dispatcher.leave(conn) {
                        self.deliver(outbound);
                    }
                    tracing::debug!(%conn, "connection unregistered");
                }
                HubCommand::Snapshot { reply } => {
                    let _ = reply.send(self.dispatcher.registry().snapshot());
                }
                HubCommand::Shutdown => {
                    tracing::info!("room hub shutting down");
                    break;
                }
            }
        }

        tracing::info!(rooms = self.dispatcher.registry().room_count(), "room hub stopped");
    }

    /// Queues an event for each recipient. Recipients whose writer has
    /// already gone are skipped.
    fn deliver(&self, outbound: Outbound) {
        for conn in &outbound.recipients {
            if let Some(sender) = self.senders.get(conn) {
                let _ = sender.send(outbound.event.clone());
            }
        }
    }
}

/// Spawns the hub task and returns a handle to communicate with it.
///
/// `config.command_buffer` bounds the command channel; senders wait when
/// it is full.
pub fn spawn_hub<D: Diagnostics>(config: RoomConfig, diagnostics: D) -> HubHandle {
    let (tx, rx) = mpsc::channel(config.command_buffer.max(1));

    let hub = Hub {
        dispatcher: Dispatcher::new(&config, diagnostics),
        senders: HashMap::new(),
        receiver: rx,
    };

    tokio::spawn(hub.run());

    HubHandle { sender: tx }
}
