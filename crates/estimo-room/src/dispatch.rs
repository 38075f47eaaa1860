//! The estimate state machine: validates inbound events against the
//! registry and produces the broadcasts each transition causes.
//!
//! Every transition either applies fully and yields its broadcast, or is
//! rejected before anything changes. Rejections go to [`Diagnostics`] and
//! yield nothing, so a client cannot tell "rejected" from "ignored".

use estimo_protocol::{ClientEvent, Estimate, JoinRequest, RoomKey, ServerEvent};
use estimo_transport::ConnectionId;

use crate::registry::RoomRegistry;
use crate::room::Room;
use crate::{Diagnostics, RoomConfig, RoomError};

/// An event to deliver and the connections to deliver it to.
#[derive(Debug, Clone, PartialEq)]
pub struct Outbound {
    pub recipients: Vec<ConnectionId>,
    pub event: ServerEvent,
}

impl Outbound {
    fn to(conn: ConnectionId, event: ServerEvent) -> Self {
        Self {
            recipients: vec![conn],
            event,
        }
    }
}

/// The caller's room, provided the caller's username owns it.
fn owned_room(
    registry: &mut RoomRegistry,
    conn: ConnectionId,
) -> Result<(RoomKey, &mut Room), RoomError> {
    let (key, room) = registry
        .find_room_by_connection_mut(conn)
        .ok_or(RoomError::NotInRoom(conn))?;
    let username = room
        .participant(conn)
        .map(|p| p.username.clone())
        .ok_or(RoomError::NotInRoom(conn))?;

    if !room.is_owner(&username) {
        return Err(RoomError::Unauthorized {
            conn,
            username,
            room: key,
        });
    }
    Ok((key, room))
}

/// The room's current view, addressed to everyone in it.
fn broadcast(room: &Room, mask: &Estimate) -> Outbound {
    Outbound {
        recipients: room.connection_ids(),
        event: ServerEvent::State(room.view(mask)),
    }
}

/// Owns the registry and applies events to it one at a time.
pub struct Dispatcher<D: Diagnostics> {
    registry: RoomRegistry,
    mask: Estimate,
    diagnostics: D,
}

impl<D: Diagnostics> Dispatcher<D> {
    /// Creates a dispatcher over an empty registry.
    pub fn new(config: &RoomConfig, diagnostics: D) -> Self {
        Self {
            registry: RoomRegistry::new(),
            mask: config.mask.clone(),
            diagnostics,
        }
    }

    /// Read-only access to the registry.
    pub fn registry(&self) -> &RoomRegistry {
        &self.registry
    }

    /// Applies one inbound event from `conn`.
    ///
    /// Returns the event to deliver, or `None` if the action was rejected
    /// (and reported to diagnostics).
    pub fn handle(&mut self, conn: ConnectionId, event: ClientEvent) -> Option<Outbound> {
        let name = event.name();
        match self.apply(conn, event) {
            Ok(outbound) => Some(outbound),
            Err(error) => {
                self.diagnostics.rejected(conn, name, &error);
                None
            }
        }
    }

    fn apply(&mut self, conn: ConnectionId, event: ClientEvent) -> Result<Outbound, RoomError> {
        self.check_membership(conn, &event)?;
        match event {
            ClientEvent::GetRooms => Ok(Outbound::to(
                conn,
                ServerEvent::GetRooms(self.registry.snapshot()),
            )),
            ClientEvent::Join(request) => self.join(conn, request),
            ClientEvent::SetEstimate(estimate) => self.set_estimate(conn, estimate),
            ClientEvent::FlipCards => self.flip(conn),
            ClientEvent::ResetCards => self.reset(conn),
        }
    }

    /// Everything except `join` and `get_rooms` needs the caller to be in
    /// a room already.
    fn check_membership(&self, conn: ConnectionId, event: &ClientEvent) -> Result<(), RoomError> {
        if event.allowed_outside_room() || self.registry.find_room_by_connection(conn).is_some() {
            Ok(())
        } else {
            Err(RoomError::NotInRoom(conn))
        }
    }

    /// Adds `conn` to the requested room (creating it if needed) and
    /// broadcasts the masked view.
    pub fn join(&mut self, conn: ConnectionId, request: JoinRequest) -> Result<Outbound, RoomError> {
        let (_, room) = self.registry.join(request.id, &request.username, conn)?;
        Ok(broadcast(room, &self.mask))
    }

    /// Records the caller's estimate. Locked while the room is flipped.
    pub fn set_estimate(
        &mut self,
        conn: ConnectionId,
        estimate: Estimate,
    ) -> Result<Outbound, RoomError> {
        let (key, room) = self
            .registry
            .find_room_by_connection_mut(conn)
            .ok_or(RoomError::NotInRoom(conn))?;

        if room.is_flipped() {
            return Err(RoomError::RoomLocked(key));
        }
        if !room.set_estimate(conn, estimate) {
            return Err(RoomError::NotInRoom(conn));
        }
        tracing::debug!(room_key = %key, %conn, "estimate submitted");
        Ok(broadcast(room, &self.mask))
    }

    /// Reveals every estimate. Owner only.
    pub fn flip(&mut self, conn: ConnectionId) -> Result<Outbound, RoomError> {
        let (key, room) = owned_room(&mut self.registry, conn)?;
        room.flip();
        tracing::info!(room_key = %key, %conn, "cards flipped");
        Ok(broadcast(room, &self.mask))
    }

    /// Clears every estimate and hides them again. Owner only.
    pub fn reset(&mut self, conn: ConnectionId) -> Result<Outbound, RoomError> {
        let (key, room) = owned_room(&mut self.registry, conn)?;
        room.reset();
        tracing::info!(room_key = %key, %conn, "cards reset");
        Ok(broadcast(room, &self.mask))
    }

    /// Removes `conn` from every room. Rooms left empty are pruned
    /// silently; the others get their new state. Rooms `conn` was not in
    /// hear nothing.
    pub fn leave(&mut self, conn: ConnectionId) -> Vec<Outbound> {
        let departures = self.registry.remove_connection(conn);
        departures
            .into_iter()
            .filter(|departure| !departure.pruned)
            .filter_map(|departure| self.registry.room(&departure.key))
            .map(|room| broadcast(room, &self.mask))
            .collect()
    }
}
