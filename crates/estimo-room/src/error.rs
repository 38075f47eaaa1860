//! Error types for the room layer.

use estimo_protocol::RoomKey;
use estimo_transport::ConnectionId;

/// Reasons an inbound event is rejected.
///
/// None of these are sent back to the client. The dispatcher hands them to
/// [`Diagnostics`](crate::Diagnostics) and skips the mutation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RoomError {
    /// The action requires room membership and the caller has none.
    #[error("{0} is not in a room")]
    NotInRoom(ConnectionId),

    /// An estimate was submitted after the room was flipped.
    #[error("room {0} is flipped; estimates are locked")]
    RoomLocked(RoomKey),

    /// Flip or reset requested by someone other than the owner.
    #[error("{username} ({conn}) is not the owner of room {room}")]
    Unauthorized {
        conn: ConnectionId,
        username: String,
        room: RoomKey,
    },

    /// The connection is already a participant of this room.
    #[error("{0} already joined room {1}")]
    AlreadyInRoom(ConnectionId, RoomKey),

    /// The hub task has stopped and can no longer take commands.
    #[error("room hub is unavailable")]
    HubUnavailable,
}
