//! Room and participant records, and the masked view of a room.

use estimo_protocol::{
    Estimate, ParticipantView, RoomSnapshot, RoomView, empty_estimate,
};
use estimo_transport::ConnectionId;

/// One connection's membership in a room.
#[derive(Debug, Clone, PartialEq)]
pub struct Participant {
    pub connection_id: ConnectionId,
    pub username: String,
    pub estimate: Estimate,
}

impl Participant {
    /// Creates a participant with no estimate yet.
    pub fn new(connection_id: ConnectionId, username: impl Into<String>) -> Self {
        Self {
            connection_id,
            username: username.into(),
            estimate: empty_estimate(),
        }
    }

    fn view(&self, estimate: Estimate) -> ParticipantView {
        ParticipantView {
            id: self.connection_id,
            username: self.username.clone(),
            estimate,
        }
    }
}

/// A planning session: one owner, participants in join order, and whether
/// their estimates are currently revealed.
///
/// Ownership is a username, fixed at creation. Any participant whose
/// username equals it may flip and reset, whichever connection they are on.
#[derive(Debug, Clone, PartialEq)]
pub struct Room {
    owner: String,
    participants: Vec<Participant>,
    flipped: bool,
}

impl Room {
    /// Creates an empty, unflipped room owned by `owner`.
    pub fn new(owner: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            participants: Vec::new(),
            flipped: false,
        }
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub fn is_flipped(&self) -> bool {
        self.flipped
    }

    pub fn participants(&self) -> &[Participant] {
        &self.participants
    }

    pub fn is_empty(&self) -> bool {
        self.participants.is_empty()
    }

    pub fn len(&self) -> usize {
        self.participants.len()
    }

    /// Connections that should receive this room's broadcasts.
    pub fn connection_ids(&self) -> Vec<ConnectionId> {
        self.participants.iter().map(|p| p.connection_id).collect()
    }

    pub fn participant(&self, conn: ConnectionId) -> Option<&Participant> {
        self.participants.iter().find(|p| p.connection_id == conn)
    }

    pub fn contains(&self, conn: ConnectionId) -> bool {
        self.participant(conn).is_some()
    }

    /// Returns `true` if `username` owns this room.
    pub fn is_owner(&self, username: &str) -> bool {
        self.owner == username
    }

    /// Appends a participant. The caller guarantees `connection_id` is not
    /// already present.
    pub(crate) fn push(&mut self, participant: Participant) {
        debug_assert!(!self.contains(participant.connection_id));
        self.participants.push(participant);
    }

    /// Overwrites the estimate of the participant on `conn`. Returns
    /// `false` if no such participant exists.
    pub(crate) fn set_estimate(&mut self, conn: ConnectionId, estimate: Estimate) -> bool {
        match self.participants.iter_mut().find(|p| p.connection_id == conn) {
            Some(participant) => {
                participant.estimate = estimate;
                true
            }
            None => false,
        }
    }

    pub(crate) fn flip(&mut self) {
        self.flipped = true;
    }

    /// Hides estimates again and clears every one of them.
    pub(crate) fn reset(&mut self) {
        self.flipped = false;
        for participant in &mut self.participants {
            participant.estimate = empty_estimate();
        }
    }

    /// Removes the participant on `conn`. Returns `true` if membership
    /// changed.
    pub(crate) fn remove(&mut self, conn: ConnectionId) -> bool {
        let before = self.participants.len();
        self.participants.retain(|p| p.connection_id != conn);
        self.participants.len() != before
    }

    /// The state participants are allowed to see.
    ///
    /// Unflipped rooms replace every estimate with `mask`, submitted or
    /// not, so nobody can tell who has voted from the broadcast alone.
    pub fn view(&self, mask: &Estimate) -> RoomView {
        let participants = self
            .participants
            .iter()
            .map(|p| {
                if self.flipped {
                    p.view(p.estimate.clone())
                } else {
                    p.view(mask.clone())
                }
            })
            .collect();
        RoomView {
            owner: self.owner.clone(),
            participants,
        }
    }

    /// Full unmasked state, as listed by `get_rooms`.
    pub fn snapshot(&self) -> RoomSnapshot {
        RoomSnapshot {
            owner: self.owner.clone(),
            participants: self
                .participants
                .iter()
                .map(|p| p.view(p.estimate.clone()))
                .collect(),
            flipped: self.flipped,
        }
    }
}
