//! Core protocol types for Estimo's wire format.
//!
//! Every frame is a JSON object with an `event` name and an optional
//! `data` payload:
//!
//! ```text
//! {"event": "join", "data": {"id": "abc", "username": "alice"}}
//! {"event": "flip_cards"}
//! ```
//!
//! Inbound frames decode into [`ClientEvent`], outbound frames encode
//! from [`ServerEvent`].

use std::collections::BTreeMap;
use std::fmt;

use estimo_transport::ConnectionId;
use serde::{Deserialize, Serialize};

/// An estimate is any JSON value the client chooses to send.
///
/// The server never interprets it. The empty string means "not yet
/// submitted" and is what every estimate is reset to.
pub type Estimate = serde_json::Value;

/// Returns the estimate every participant starts with.
pub fn empty_estimate() -> Estimate {
    Estimate::String(String::new())
}

// ---------------------------------------------------------------------------
// Identity types
// ---------------------------------------------------------------------------

/// Identifier of a room.
///
/// Either supplied by the client on `join` or minted by the server. It is
/// opaque: any string is a valid key. Serializes as the bare string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoomKey(pub String);

impl RoomKey {
    /// Returns the key as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RoomKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RoomKey {
    fn from(key: &str) -> Self {
        Self(key.to_string())
    }
}

impl From<String> for RoomKey {
    fn from(key: String) -> Self {
        Self(key)
    }
}

// ---------------------------------------------------------------------------
// Inbound
// ---------------------------------------------------------------------------

/// Payload of a `join` event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinRequest {
    /// Room to join. Omitted (or `null`) creates a new room.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<RoomKey>,
    /// Display name. Also decides room ownership on creation.
    pub username: String,
}

/// Events a client sends to the server.
///
/// Connection teardown is not an event here; the transport reports it and
/// the hub treats it as a departure from every room.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ClientEvent {
    /// List every room with unmasked state. Answered to the caller only.
    GetRooms,
    /// Join a room by key, or create one.
    Join(JoinRequest),
    /// Submit the caller's estimate for the current round.
    SetEstimate(Estimate),
    /// Reveal all estimates. Owner only.
    FlipCards,
    /// Clear all estimates and hide them again. Owner only.
    ResetCards,
}

impl ClientEvent {
    /// Wire name of the event, used in logs.
    pub fn name(&self) -> &'static str {
        match self {
            Self::GetRooms => "get_rooms",
            Self::Join(_) => "join",
            Self::SetEstimate(_) => "set_estimate",
            Self::FlipCards => "flip_cards",
            Self::ResetCards => "reset_cards",
        }
    }

    /// Returns `true` if the event may be sent by a connection that has
    /// not joined any room.
    pub fn allowed_outside_room(&self) -> bool {
        matches!(self, Self::GetRooms | Self::Join(_))
    }
}

// ---------------------------------------------------------------------------
// Outbound
// ---------------------------------------------------------------------------

/// A participant as seen on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParticipantView {
    pub id: ConnectionId,
    pub username: String,
    pub estimate: Estimate,
}

/// The externally visible state of a room, broadcast as `state`.
///
/// While the room is not flipped every `estimate` holds the mask.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoomView {
    pub owner: String,
    pub participants: Vec<ParticipantView>,
}

/// Unmasked state of a room as listed by `get_rooms`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoomSnapshot {
    pub owner: String,
    pub participants: Vec<ParticipantView>,
    pub flipped: bool,
}

/// Every room in the registry, keyed by room key.
pub type RoomsSnapshot = BTreeMap<RoomKey, RoomSnapshot>;

/// Events the server sends to clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ServerEvent {
    /// Reply to `get_rooms`.
    GetRooms(RoomsSnapshot),
    /// New state of the room the recipient is in.
    State(RoomView),
}
