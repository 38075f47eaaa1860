//! Room registry: owns every room and knows which connection is where.

use std::collections::HashMap;

use estimo_protocol::{RoomKey, RoomsSnapshot};
use estimo_transport::ConnectionId;
use uuid::Uuid;

use crate::room::{Participant, Room};
use crate::RoomError;

/// Outcome of removing a connection from one room.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Departure {
    /// The room the connection was removed from.
    pub key: RoomKey,
    /// `true` if that left the room empty and it was deleted.
    pub pruned: bool,
}

/// Maps room keys to rooms, plus a `connection → rooms` index kept in
/// sync on every join and leave.
///
/// Invariant: a key is present iff its room has at least one participant.
/// Rooms are only created by [`join`](RoomRegistry::join), which adds the
/// joiner in the same call.
#[derive(Debug, Default)]
pub struct RoomRegistry {
    rooms: HashMap<RoomKey, Room>,

    /// Rooms each connection has joined, in join order. A well-behaved
    /// client joins once, but nothing stops it from joining a second room.
    connection_rooms: HashMap<ConnectionId, Vec<RoomKey>>,
}

impl RoomRegistry {
    /// Creates a new, empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Finds the room a connection belongs to.
    ///
    /// If it joined several, the first one it joined wins, regardless of
    /// the order the rooms were created in.
    pub fn find_room_by_connection(
        &self,
        conn: ConnectionId,
    ) -> Option<(&RoomKey, &Room)> {
        self.connection_rooms
            .get(&conn)?
            .iter()
            .find_map(|key| self.rooms.get_key_value(key))
    }

    /// Mutable variant of [`find_room_by_connection`].
    ///
    /// [`find_room_by_connection`]: RoomRegistry::find_room_by_connection
    pub(crate) fn find_room_by_connection_mut(
        &mut self,
        conn: ConnectionId,
    ) -> Option<(RoomKey, &mut Room)> {
        let key = self
            .connection_rooms
            .get(&conn)?
            .iter()
            .find(|key| self.rooms.contains_key(*key))?
            .clone();
        let room = self.rooms.get_mut(&key)?;
        Some((key, room))
    }

    /// Returns the room under `key`, creating it if needed.
    ///
    /// An existing room keeps its owner. A new room is owned by
    /// `owner`. With no key a fresh one is minted.
    pub(crate) fn create_or_get_room(
        &mut self,
        key: Option<RoomKey>,
        owner: &str,
    ) -> (RoomKey, &mut Room) {
        let key = key.unwrap_or_else(|| self.mint_key());
        let room = self.rooms.entry(key.clone()).or_insert_with(|| {
            tracing::info!(room_key = %key, owner, "room created");
            Room::new(owner)
        });
        (key, room)
    }

    /// Adds `conn` as `username` to the room under `key` (or a new room),
    /// and indexes the connection.
    ///
    /// An empty key counts as no key: the joiner gets a freshly minted room.
    ///
    /// # Errors
    /// [`RoomError::AlreadyInRoom`] if the connection is already a
    /// participant of that room. Nothing is created in that case.
    pub fn join(
        &mut self,
        key: Option<RoomKey>,
        username: &str,
        conn: ConnectionId,
    ) -> Result<(RoomKey, &Room), RoomError> {
        let key = key.filter(|k| !k.as_str().is_empty());
        if let Some(k) = &key {
            if self.rooms.get(k).is_some_and(|room| room.contains(conn)) {
                return Err(RoomError::AlreadyInRoom(conn, k.clone()));
            }
        }

        let (key, room) = self.create_or_get_room(key, username);
        room.push(Participant::new(conn, username));
        tracing::info!(
            room_key = %key,
            %conn,
            username,
            participants = room.len(),
            "participant joined"
        );

        self.connection_rooms
            .entry(conn)
            .or_default()
            .push(key.clone());

        let room = self
            .rooms
            .get(&key)
            .ok_or_else(|| RoomError::NotInRoom(conn))?;
        Ok((key, room))
    }

    /// Removes `conn` from every room it appears in.
    ///
    /// Scans all rooms rather than trusting the index alone. Rooms left
    /// empty are pruned. Rooms the connection was not in are untouched
    /// and do not appear in the result.
    pub fn remove_connection(&mut self, conn: ConnectionId) -> Vec<Departure> {
        self.connection_rooms.remove(&conn);

        let mut changed: Vec<RoomKey> = self
            .rooms
            .iter_mut()
            .filter_map(|(key, room)| room.remove(conn).then(|| key.clone()))
            .collect();
        changed.sort();

        changed
            .into_iter()
            .map(|key| {
                tracing::info!(room_key = %key, %conn, "participant left");
                let pruned = self.remove_if_empty(&key);
                Departure { key, pruned }
            })
            .collect()
    }

    /// Deletes the room under `key` if it has no participants left.
    /// Returns `true` if it was deleted.
    pub fn remove_if_empty(&mut self, key: &RoomKey) -> bool {
        let empty = self.rooms.get(key).is_some_and(Room::is_empty);
        if empty {
            self.rooms.remove(key);
            tracing::info!(room_key = %key, "room pruned");
        }
        empty
    }

    /// Returns the room under `key`, if it exists.
    pub fn room(&self, key: &RoomKey) -> Option<&Room> {
        self.rooms.get(key)
    }

    /// Full unmasked copy of every room.
    pub fn snapshot(&self) -> RoomsSnapshot {
        self.rooms
            .iter()
            .map(|(key, room)| (key.clone(), room.snapshot()))
            .collect()
    }

    /// Returns the number of rooms.
    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    /// Lists every room key.
    pub fn room_keys(&self) -> Vec<RoomKey> {
        self.rooms.keys().cloned().collect()
    }

    fn mint_key(&self) -> RoomKey {
        loop {
            let key = RoomKey(Uuid::new_v4().to_string());
            if !self.rooms.contains_key(&key) {
                return key;
            }
        }
    }
}
