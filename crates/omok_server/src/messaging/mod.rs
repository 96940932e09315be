//! Message types and parsing for the omok protocol.
//!
//! Inbound frames are parsed once into a closed [`ClientMessage`]; everything
//! the server emits is a [`ServerMessage`].

pub mod inbound;
pub mod types;

pub use inbound::{ClientMessage, JoinRequest, MoveRequest, DEFAULT_PLAYER_ID, DEFAULT_ROOM_ID};
pub use types::{
    AssignRolePayload, ErrorPayload, GameOverPayload, GameStartPayload, MessageType, MovePayload,
    PongPayload, ServerMessage, Snapshot,
};
