//! Wire message definitions for client-server communication.
//!
//! Every frame is a JSON object of the form `{"type": ..., "payload": {...}}`.
//! Outbound messages are modelled by [`ServerMessage`], an adjacently tagged
//! enum whose variants carry their own payload structs.
//!
//! # Example
//!
//! ```json
//! {
//!   "type": "move",
//!   "payload": {
//!     "row": 7, "col": 8, "player": "black", "nextTurn": "white",
//!     "moveNo": 3, "serverTs": "2025-01-01T12:00:00.000+09:00"
//!   }
//! }
//! ```

use crate::error::ErrorCode;
use crate::game::{GameOverReason, Stone};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Canonical message type names.
///
/// Inbound type strings are case-folded and mapped onto this set once, at
/// the boundary. Anything unrecognized is kept verbatim in [`MessageType::Other`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageType {
    JoinGame,
    AssignRole,
    State,
    GameStart,
    Move,
    GameOver,
    Resign,
    Sync,
    Ping,
    Pong,
    Error,
    Timeout,
    Other(String),
}

impl MessageType {
    pub fn normalize(raw: &str) -> Self {
        match raw.to_lowercase().as_str() {
            "joingame" => MessageType::JoinGame,
            "assignrole" => MessageType::AssignRole,
            "state" => MessageType::State,
            "gamestart" => MessageType::GameStart,
            "move" => MessageType::Move,
            "gameover" => MessageType::GameOver,
            "resign" => MessageType::Resign,
            "sync" => MessageType::Sync,
            "ping" => MessageType::Ping,
            "pong" => MessageType::Pong,
            "error" => MessageType::Error,
            "timeout" => MessageType::Timeout,
            _ => MessageType::Other(raw.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            MessageType::JoinGame => "joinGame",
            MessageType::AssignRole => "assignRole",
            MessageType::State => "state",
            MessageType::GameStart => "gameStart",
            MessageType::Move => "move",
            MessageType::GameOver => "gameOver",
            MessageType::Resign => "resign",
            MessageType::Sync => "sync",
            MessageType::Ping => "ping",
            MessageType::Pong => "pong",
            MessageType::Error => "error",
            MessageType::Timeout => "timeout",
            MessageType::Other(raw) => raw,
        }
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A message sent from the server to a client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "camelCase")]
pub enum ServerMessage {
    AssignRole(AssignRolePayload),
    State(Snapshot),
    GameStart(GameStartPayload),
    Move(MovePayload),
    GameOver(GameOverPayload),
    Pong(PongPayload),
    Error(ErrorPayload),
}

impl ServerMessage {
    /// Builds an `error` message from any coded error.
    pub fn error<E: ErrorCode + fmt::Display>(err: &E) -> Self {
        ServerMessage::Error(ErrorPayload {
            code: err.code(),
            message: err.to_string(),
        })
    }

    pub fn message_type(&self) -> MessageType {
        match self {
            ServerMessage::AssignRole(_) => MessageType::AssignRole,
            ServerMessage::State(_) => MessageType::State,
            ServerMessage::GameStart(_) => MessageType::GameStart,
            ServerMessage::Move(_) => MessageType::Move,
            ServerMessage::GameOver(_) => MessageType::GameOver,
            ServerMessage::Pong(_) => MessageType::Pong,
            ServerMessage::Error(_) => MessageType::Error,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignRolePayload {
    pub role: Stone,
    pub server_ts: String,
}

/// Complete, self-contained description of a room. Safe to send at any time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub room_id: String,
    pub board: Vec<Vec<Option<Stone>>>,
    pub current_turn: Stone,
    pub black_player_id: Option<String>,
    pub white_player_id: Option<String>,
    pub game_over: bool,
    pub winner: Option<Stone>,
    pub move_no: u64,
    pub server_ts: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameStartPayload {
    pub black_player: String,
    pub white_player: String,
    pub current_turn: Stone,
    pub server_ts: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MovePayload {
    pub row: i64,
    pub col: i64,
    pub player: Stone,
    pub next_turn: Stone,
    pub move_no: u64,
    pub server_ts: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameOverPayload {
    pub winner: Stone,
    pub reason: GameOverReason,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub move_no: Option<u64>,
    pub server_ts: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PongPayload {
    pub server_ts: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorPayload {
    pub code: u16,
    pub message: String,
}
