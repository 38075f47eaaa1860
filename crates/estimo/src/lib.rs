//! # Estimo
//!
//! Real-time planning-poker room server.
//!
//! Clients connect over WebSocket, join a room by key (or create one),
//! submit hidden estimates, and the room owner flips the cards to reveal
//! them or resets the round. Every change is broadcast to the whole room;
//! estimates stay masked until the flip.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use estimo::prelude::*;
//!
//! # async fn run() -> Result<(), EstimoError> {
//! let server = EstimoServer::builder()
//!     .bind("0.0.0.0:3000")
//!     .build()
//!     .await?;
//! server.run().await
//! # }
//! ```

mod config;
mod error;
mod handler;
mod server;

pub use config::{DEFAULT_PATH, DEFAULT_PORT, ServerConfig};
pub use error::EstimoError;
pub use server::{EstimoServer, EstimoServerBuilder};

/// Everything needed to run a server or talk to one in tests.
pub mod prelude {
    pub use crate::{
        DEFAULT_PATH, EstimoError, EstimoServer, EstimoServerBuilder, ServerConfig,
    };
    pub use estimo_protocol::{
        ClientEvent, Codec, Estimate, JoinRequest, JsonCodec, ParticipantView,
        RoomKey, RoomSnapshot, RoomView, RoomsSnapshot, ServerEvent,
    };
    pub use estimo_room::{Diagnostics, HubHandle, RoomConfig, RoomError, TracingDiagnostics};
    pub use estimo_transport::ConnectionId;
}
