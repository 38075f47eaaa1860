//! Rooms, estimates, and broadcasts for Estimo.
//!
//! A single hub task owns every room. Connections send it events; it runs
//! them through the state machine one at a time and fans the resulting
//! room view out to everyone in the room.
//!
//! # Key types
//!
//! - [`HubHandle`] / [`spawn_hub`]: start the hub and talk to it
//! - [`Dispatcher`]: join, estimate, flip, reset, and leave transitions
//! - [`RoomRegistry`]: room key → room, plus the connection index
//! - [`Room`] / [`Participant`]: the records, and the masked view
//! - [`Diagnostics`]: where rejected actions are reported

mod config;
mod diagnostics;
mod dispatch;
mod error;
mod hub;
mod registry;
mod room;

pub use config::RoomConfig;
pub use diagnostics::{Diagnostics, TracingDiagnostics};
pub use dispatch::{Dispatcher, Outbound};
pub use error::RoomError;
pub use hub::{ConnectionReceiver, ConnectionSender, HubHandle, spawn_hub};
pub use registry::{Departure, RoomRegistry};
pub use room::{Participant, Room};
