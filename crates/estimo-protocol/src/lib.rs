//! Wire protocol for Estimo.
//!
//! - **Types** ([`ClientEvent`], [`ServerEvent`], [`RoomView`], ...):
//!   the events that travel on the wire.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]): how events become
//!   frames and back.
//! - **Errors** ([`ProtocolError`]).
//!
//! The protocol layer knows nothing about rooms as mutable state; it only
//! describes what clients send and what they are shown.
//!
//! ```text
//! Transport (frames) → Protocol (events) → Room hub (state machine)
//! ```

mod codec;
mod error;
mod types;

pub use codec::{Codec, JsonCodec};
pub use error::ProtocolError;
pub use types::{
    ClientEvent, Estimate, JoinRequest, ParticipantView, RoomKey, RoomSnapshot,
    RoomView, RoomsSnapshot, ServerEvent, empty_estimate,
};
