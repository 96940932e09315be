//! Error types for the omok server.
//!
//! Three families live here:
//!
//! * [`MoveError`] - rejections produced by the rule engine. The board is
//!   always left exactly as it was before the attempt.
//! * [`ProtocolError`] - violations of the connection protocol (wrong first
//!   message, unsupported types, move preconditions checked by the room).
//! * [`ServerError`] - infrastructure failures (binding, handshakes, config).
//!
//! Every error that is reported to a client carries a stable numeric code
//! through the [`ErrorCode`] trait.

use thiserror::Error;

/// Stable numeric codes sent to clients inside `error` messages.
pub trait ErrorCode {
    /// The protocol-level error code for this error.
    fn code(&self) -> u16;
}

/// A placement rejected by the rule engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum MoveError {
    #[error("Cell occupied")]
    CellOccupied,
    #[error("Out of bounds")]
    OutOfBounds,
    #[error("Forbidden: overline")]
    Overline,
    #[error("Game is already over")]
    GameOver,
    #[error("Forbidden: double three")]
    DoubleThree,
    #[error("Forbidden: double four")]
    DoubleFour,
}

impl ErrorCode for MoveError {
    fn code(&self) -> u16 {
        match self {
            MoveError::CellOccupied => 4001,
            MoveError::OutOfBounds => 4002,
            MoveError::Overline => 4003,
            MoveError::GameOver => 4004,
            MoveError::DoubleThree => 4005,
            MoveError::DoubleFour => 4006,
        }
    }
}

/// A protocol violation detected by the dispatcher or the room.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
    #[error("Not your turn")]
    NotYourTurn,
    #[error("Not joined")]
    NotJoined,
    #[error("First message must be joinGame")]
    JoinRequired,
    #[error("row/col must be integers")]
    InvalidCoordinates,
    #[error("Waiting for opponent")]
    WaitingForOpponent,
    #[error("Room is full")]
    RoomFull,
    #[error("Unsupported type: {0}")]
    UnsupportedType(String),
    #[error("Malformed message: {0}")]
    Malformed(String),
}

impl ProtocolError {
    /// Whether the connection must be closed after reporting this error.
    pub fn closes_connection(&self) -> bool {
        matches!(self, ProtocolError::JoinRequired | ProtocolError::RoomFull)
    }
}

impl ErrorCode for ProtocolError {
    fn code(&self) -> u16 {
        match self {
            ProtocolError::NotYourTurn => 4007,
            ProtocolError::NotJoined => 4008,
            ProtocolError::JoinRequired => 4009,
            ProtocolError::InvalidCoordinates => 4010,
            ProtocolError::WaitingForOpponent => 4090,
            ProtocolError::RoomFull => 4091,
            ProtocolError::UnsupportedType(_) | ProtocolError::Malformed(_) => 4999,
        }
    }
}

/// Any rejection of an in-game action, reported back to the acting client.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GameError {
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
    #[error(transparent)]
    Move(#[from] MoveError),
}

impl ErrorCode for GameError {
    fn code(&self) -> u16 {
        match self {
            GameError::Protocol(e) => e.code(),
            GameError::Move(e) => e.code(),
        }
    }
}

/// Infrastructure-level failures.
#[derive(Error, Debug)]
pub enum ServerError {
    #[error("Network error: {0}")]
    Network(String),
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("Internal error: {0}")]
    Internal(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_move_error_codes() {
        assert_eq!(MoveError::CellOccupied.code(), 4001);
        assert_eq!(MoveError::OutOfBounds.code(), 4002);
        assert_eq!(MoveError::Overline.code(), 4003);
        assert_eq!(MoveError::GameOver.code(), 4004);
        assert_eq!(MoveError::DoubleThree.code(), 4005);
        assert_eq!(MoveError::DoubleFour.code(), 4006);
    }

    #[test]
    fn test_protocol_error_codes() {
        assert_eq!(ProtocolError::NotYourTurn.code(), 4007);
        assert_eq!(ProtocolError::NotJoined.code(), 4008);
        assert_eq!(ProtocolError::JoinRequired.code(), 4009);
        assert_eq!(ProtocolError::InvalidCoordinates.code(), 4010);
        assert_eq!(ProtocolError::WaitingForOpponent.code(), 4090);
        assert_eq!(ProtocolError::RoomFull.code(), 4091);
        assert_eq!(ProtocolError::UnsupportedType("foo".into()).code(), 4999);
    }

    #[test]
    fn test_only_join_violations_close() {
        assert!(ProtocolError::JoinRequired.closes_connection());
        assert!(ProtocolError::RoomFull.closes_connection());
        assert!(!ProtocolError::NotYourTurn.closes_connection());
        assert!(!ProtocolError::UnsupportedType("x".into()).closes_connection());
    }

    #[test]
    fn test_game_error_wraps_codes_and_messages() {
        let err: GameError = MoveError::DoubleThree.into();
        assert_eq!(err.code(), 4005);
        assert_eq!(err.to_string(), "Forbidden: double three");

        let err: GameError = ProtocolError::UnsupportedType("dance".into()).into();
        assert_eq!(err.code(), 4999);
        assert_eq!(err.to_string(), "Unsupported type: dance");
    }
}
