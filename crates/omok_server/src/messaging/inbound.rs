//! Parsing of client frames into [`ClientMessage`].

use super::types::MessageType;
use crate::error::ProtocolError;
use serde::Deserialize;
use serde_json::{Map, Value};

/// Room joined when a join request names none.
pub const DEFAULT_ROOM_ID: &str = "default";

/// Player id used when a join request names none.
pub const DEFAULT_PLAYER_ID: &str = "anonymous";

#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(rename = "type", default)]
    kind: Option<String>,
    #[serde(default)]
    payload: Option<Value>,
}

/// A message received from a client, after type normalization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientMessage {
    JoinGame(JoinRequest),
    Move(MoveRequest),
    Resign,
    Sync,
    Ping,
    /// Any other type, carrying its (normalized) name.
    Unsupported(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinRequest {
    pub room_id: String,
    pub player_id: String,
}

/// Raw move coordinates; either may be missing or not an integer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MoveRequest {
    pub row: Option<i64>,
    pub col: Option<i64>,
}

impl ClientMessage {
    /// Parses one text frame.
    ///
    /// Fails only for frames that are not a JSON envelope, or for a join
    /// whose payload is not an object.
    pub fn parse(text: &str) -> Result<Self, ProtocolError> {
        let envelope: Envelope =
            serde_json::from_str(text).map_err(|e| ProtocolError::Malformed(e.to_string()))?;

        let payload = match envelope.payload {
            None | Some(Value::Null) => Some(Map::new()),
            Some(Value::Object(map)) => Some(map),
            Some(_) => None,
        };

        let kind = match envelope.kind.as_deref() {
            Some(raw) => MessageType::normalize(raw),
            None => return Ok(ClientMessage::Unsupported(String::new())),
        };

        Ok(match kind {
            MessageType::JoinGame => {
                let payload = payload.ok_or_else(|| {
                    ProtocolError::Malformed("joinGame payload must be an object".to_string())
                })?;
                ClientMessage::JoinGame(JoinRequest::from_payload(&payload))
            }
            MessageType::Move => {
                ClientMessage::Move(MoveRequest::from_payload(&payload.unwrap_or_default()))
            }
            MessageType::Resign => ClientMessage::Resign,
            MessageType::Sync => ClientMessage::Sync,
            MessageType::Ping => ClientMessage::Ping,
            other => ClientMessage::Unsupported(other.as_str().to_string()),
        })
    }
}

impl JoinRequest {
    /// Reads `roomId` (or the legacy `gameId`) and `playerId`, falling back
    /// to the defaults for missing, empty or non-string values.
    pub fn from_payload(payload: &Map<String, Value>) -> Self {
        let room_id = non_empty_str(payload, "roomId")
            .or_else(|| non_empty_str(payload, "gameId"))
            .unwrap_or(DEFAULT_ROOM_ID);
        let player_id = non_empty_str(payload, "playerId").unwrap_or(DEFAULT_PLAYER_ID);
        Self {
            room_id: room_id.to_string(),
            player_id: player_id.to_string(),
        }
    }
}

impl MoveRequest {
    pub fn from_payload(payload: &Map<String, Value>) -> Self {
        Self {
            row: payload.get("row").and_then(Value::as_i64),
            col: payload.get("col").and_then(Value::as_i64),
        }
    }

    pub fn coordinates(&self) -> Result<(i64, i64), ProtocolError> {
        match (self.row, self.col) {
            (Some(row), Some(col)) => Ok((row, col)),
            _ => Err(ProtocolError::InvalidCoordinates),
        }
    }
}

fn non_empty_str<'a>(payload: &'a Map<String, Value>, key: &str) -> Option<&'a str> {
    payload
        .get(key)
        .and_then(Value::as_str)
        .filter(|value| !value.is_empty())
}
