//! Per-connection protocol state machine.
//!
//! A [`Dispatcher`] is fed one text frame at a time by its connection's read
//! loop. Until a `joinGame` arrives nothing else is accepted; after that the
//! connection is bound to a room and role for the rest of its life.
//!
//! ```text
//! AwaitingJoin --joinGame--> (bind) --ok--> Active --disconnect--> Closed
//!       |                       |
//!       +--anything else--------+--room full--> Closed
//! ```

use crate::connection::ConnectionHandle;
use crate::error::{GameError, ProtocolError};
use crate::game::Stone;
use crate::messaging::{ClientMessage, JoinRequest, PongPayload, ServerMessage};
use crate::records::{MatchRecord, RecordSender};
use crate::room::{Room, RoomRegistry};
use crate::utils::ServerClock;
use std::sync::Arc;
use tracing::{debug, warn};

/// What the read loop should do after a frame has been handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Close,
}

#[derive(Debug)]
enum Phase {
    AwaitingJoin,
    Active { room: Arc<Room>, role: Stone },
    Closed,
}

/// Drives one connection through join and play.
#[derive(Debug)]
pub struct Dispatcher {
    handle: ConnectionHandle,
    registry: Arc<RoomRegistry>,
    records: Option<RecordSender>,
    clock: ServerClock,
    phase: Phase,
}

impl Dispatcher {
    pub fn new(
        handle: ConnectionHandle,
        registry: Arc<RoomRegistry>,
        records: Option<RecordSender>,
        clock: ServerClock,
    ) -> Self {
        Self {
            handle,
            registry,
            records,
            clock,
            phase: Phase::AwaitingJoin,
        }
    }

    /// The role this connection plays, once joined.
    pub fn role(&self) -> Option<Stone> {
        match &self.phase {
            Phase::Active { role, .. } => Some(*role),
            _ => None,
        }
    }

    pub fn room_id(&self) -> Option<&str> {
        match &self.phase {
            Phase::Active { room, .. } => Some(room.id()),
            _ => None,
        }
    }

    pub fn is_closed(&self) -> bool {
        matches!(self.phase, Phase::Closed)
    }

    /// Handles one inbound text frame.
    pub async fn handle_text(&mut self, text: &str) -> Flow {
        match &self.phase {
            Phase::Closed => Flow::Close,
            Phase::AwaitingJoin => self.handle_join(text).await,
            Phase::Active { room, role } => {
                let (room, role) = (room.clone(), *role);
                self.handle_active(&room, role, text).await;
                Flow::Continue
            }
        }
    }

    /// Handles a frame whose bytes could not be read as text at all.
    ///
    /// Before a join this is as fatal as any other non-join first frame.
    /// Afterwards it is reported and ignored.
    pub fn handle_unreadable(&mut self, reason: &str) -> Flow {
        match &self.phase {
            Phase::Closed => Flow::Close,
            Phase::AwaitingJoin => {
                warn!("Connection {} sent an unreadable first frame: {}", self.handle.id(), reason);
                self.reject(ProtocolError::JoinRequired)
            }
            Phase::Active { .. } => {
                self.send_error(ProtocolError::Malformed(reason.to_string()));
                Flow::Continue
            }
        }
    }

    async fn handle_join(&mut self, text: &str) -> Flow {
        let JoinRequest { room_id, player_id } = match ClientMessage::parse(text) {
            Ok(ClientMessage::JoinGame(join)) => join,
            Ok(other) => {
                warn!("Connection {} sent {:?} before joining", self.handle.id(), other);
                return self.reject(ProtocolError::JoinRequired);
            }
            Err(e) => {
                warn!("Connection {} sent an unreadable first frame: {}", self.handle.id(), e);
                return self.reject(ProtocolError::JoinRequired);
            }
        };

        match self
            .registry
            .join(&room_id, &player_id, self.handle.clone())
            .await
        {
            Ok((room, role)) => {
                debug!("Connection {} bound to room {} as {}", self.handle.id(), room_id, role);
                self.phase = Phase::Active { room, role };
                Flow::Continue
            }
            Err(e) => {
                warn!("Join to room {} by {} refused: {}", room_id, player_id, e);
                self.reject(e)
            }
        }
    }

    async fn handle_active(&self, room: &Room, role: Stone, text: &str) {
        let message = match ClientMessage::parse(text) {
            Ok(message) => message,
            Err(e) => {
                debug!("Unreadable frame from {}: {}", self.handle.id(), e);
                self.handle.send(ServerMessage::error(&e));
                return;
            }
        };

        match message {
            ClientMessage::Ping => self.handle.send(ServerMessage::Pong(PongPayload {
                server_ts: self.clock.now(),
            })),
            ClientMessage::Sync => self.handle.send(ServerMessage::State(room.snapshot().await)),
            ClientMessage::Move(request) => {
                let result = room.apply_move(self.handle.id(), role, request).await;
                self.settle(result);
            }
            ClientMessage::Resign => {
                let result = room.resign(self.handle.id(), role).await;
                self.settle(result);
            }
            ClientMessage::JoinGame(_) => {
                self.send_error(ProtocolError::UnsupportedType("joinGame".to_string()))
            }
            ClientMessage::Unsupported(kind) => {
                self.send_error(ProtocolError::UnsupportedType(kind))
            }
        }
    }

    /// Reports a rejection to the sender, or forwards a finished match.
    fn settle(&self, result: Result<Option<MatchRecord>, GameError>) {
        match result {
            Ok(Some(record)) => {
                if let Some(records) = &self.records {
                    if let Err(e) = records.send(record) {
                        warn!(
                            "Recorder is gone, dropping record for room {}",
                            e.0.room_id
                        );
                    }
                }
            }
            Ok(None) => {}
            Err(e) => {
                debug!("Rejected action from {}: {}", self.handle.id(), e);
                self.handle.send(ServerMessage::error(&e));
            }
        }
    }

    fn send_error(&self, error: ProtocolError) {
        debug!("Protocol error for {}: {}", self.handle.id(), error);
        self.handle.send(ServerMessage::error(&error));
    }

    /// Sends `error`, closing the connection when the error demands it.
    fn reject(&mut self, error: ProtocolError) -> Flow {
        self.handle.send(ServerMessage::error(&error));
        if error.closes_connection() {
            self.handle.close();
            self.phase = Phase::Closed;
            Flow::Close
        } else {
            Flow::Continue
        }
    }

    /// Releases whatever this connection holds. Call exactly once, on any
    /// disconnect.
    pub async fn close(&mut self) {
        self.phase = Phase::Closed;
        self.registry.detach(self.handle.id()).await;
    }
}
