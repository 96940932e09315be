//! Rooms: one match, its two seats and the lock that orders its moves.
//!
//! Everything that reads or changes a room goes through [`Room`]'s async
//! methods, each of which holds the room's mutex for its whole duration.
//! Broadcasts are enqueued on the seated connections' outbound queues before
//! the lock is released, so every client sees messages in the exact order the
//! room accepted them.

pub mod registry;

pub use registry::RoomRegistry;

use crate::connection::{ConnectionHandle, ConnectionId};
use crate::error::{GameError, ProtocolError};
use crate::game::{GameOverReason, GameState, Stone};
use crate::messaging::{
    AssignRolePayload, GameOverPayload, GameStartPayload, MovePayload, MoveRequest, ServerMessage,
    Snapshot,
};
use crate::records::MatchRecord;
use crate::utils::ServerClock;
use tokio::sync::Mutex;
use tracing::{debug, info};

/// A bound connection and the player id it joined with.
#[derive(Debug, Clone)]
struct Seat {
    player_id: String,
    handle: ConnectionHandle,
}

#[derive(Debug)]
struct RoomState {
    game: GameState,
    black: Option<Seat>,
    white: Option<Seat>,
    move_no: u64,
}

impl RoomState {
    fn seat(&self, role: Stone) -> Option<&Seat> {
        match role {
            Stone::Black => self.black.as_ref(),
            Stone::White => self.white.as_ref(),
        }
    }

    fn seat_mut(&mut self, role: Stone) -> &mut Option<Seat> {
        match role {
            Stone::Black => &mut self.black,
            Stone::White => &mut self.white,
        }
    }

    fn holds(&self, role: Stone, connection: ConnectionId) -> bool {
        self.seat(role)
            .is_some_and(|seat| seat.handle.id() == connection)
    }

    fn is_full(&self) -> bool {
        self.black.is_some() && self.white.is_some()
    }

    fn is_empty(&self) -> bool {
        self.black.is_none() && self.white.is_none()
    }

    fn player_id(&self, role: Stone) -> Option<String> {
        self.seat(role).map(|seat| seat.player_id.clone())
    }

    /// Enqueues `message` for black, then white.
    fn broadcast(&self, message: &ServerMessage) {
        for seat in [&self.black, &self.white].into_iter().flatten() {
            seat.handle.send(message.clone());
        }
    }
}

/// One match between at most two connections.
#[derive(Debug)]
pub struct Room {
    id: String,
    state: Mutex<RoomState>,
    clock: ServerClock,
}

impl Room {
    pub fn new(id: impl Into<String>, board_size: usize, clock: ServerClock) -> Self {
        Self {
            id: id.into(),
            state: Mutex::new(RoomState {
                game: GameState::new(board_size),
                black: None,
                white: None,
                move_no: 0,
            }),
            clock,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Seats a connection in the first free role, black before white.
    ///
    /// The joiner receives `assignRole` and a snapshot. If this fills the
    /// room, both seats then receive `gameStart` followed by a fresh snapshot.
    pub async fn bind(
        &self,
        player_id: &str,
        handle: ConnectionHandle,
    ) -> Result<Stone, ProtocolError> {
        let mut state = self.state.lock().await;

        let role = if state.black.is_none() {
            Stone::Black
        } else if state.white.is_none() {
            Stone::White
        } else {
            return Err(ProtocolError::RoomFull);
        };

        *state.seat_mut(role) = Some(Seat {
            player_id: player_id.to_string(),
            handle: handle.clone(),
        });
        info!("🎯 Player {} joined room {} as {}", player_id, self.id, role);

        handle.send(ServerMessage::AssignRole(AssignRolePayload {
            role,
            server_ts: self.clock.now(),
        }));
        handle.send(ServerMessage::State(self.snapshot_of(&state)));

        if state.is_full() {
            let start = ServerMessage::GameStart(GameStartPayload {
                black_player: state.player_id(Stone::Black).unwrap_or_default(),
                white_player: state.player_id(Stone::White).unwrap_or_default(),
                current_turn: state.game.current_player(),
                server_ts: self.clock.now(),
            });
            state.broadcast(&start);
            state.broadcast(&ServerMessage::State(self.snapshot_of(&state)));
            info!("🚀 Game started in room {}", self.id);
        }

        Ok(role)
    }

    /// A complete read of the room's current state.
    pub async fn snapshot(&self) -> Snapshot {
        let state = self.state.lock().await;
        self.snapshot_of(&state)
    }

    fn snapshot_of(&self, state: &RoomState) -> Snapshot {
        Snapshot {
            room_id: self.id.clone(),
            board: state.game.board().rows(),
            current_turn: state.game.current_player(),
            black_player_id: state.player_id(Stone::Black),
            white_player_id: state.player_id(Stone::White),
            game_over: state.game.is_game_over(),
            winner: state.game.winner(),
            move_no: state.move_no,
            server_ts: self.clock.now(),
        }
    }

    /// Validates and applies a move from `connection` playing `role`.
    ///
    /// Checks run in order: seat held, room full, turn, coordinates, then the
    /// rule engine. On success `move` (and `gameOver` for a winning move) is
    /// broadcast before the lock is released. Returns the match record when
    /// the move ended the game.
    pub async fn apply_move(
        &self,
        connection: ConnectionId,
        role: Stone,
        request: MoveRequest,
    ) -> Result<Option<MatchRecord>, GameError> {
        let mut state = self.state.lock().await;

        if !state.holds(role, connection) {
            return Err(ProtocolError::NotJoined.into());
        }
        if !state.is_full() {
            return Err(ProtocolError::WaitingForOpponent.into());
        }
        if state.game.current_player() != role {
            return Err(ProtocolError::NotYourTurn.into());
        }
        let (row, col) = request.coordinates()?;

        let placement = state.game.place(row, col)?;
        state.move_no += 1;
        let move_no = state.move_no;
        debug!("Room {}: {} played ({}, {}) as move {}", self.id, role, row, col, move_no);

        state.broadcast(&ServerMessage::Move(MovePayload {
            row,
            col,
            player: role,
            next_turn: placement.next_player,
            move_no,
            server_ts: self.clock.now(),
        }));

        let Some(reason) = placement.terminal else {
            return Ok(None);
        };
        state.broadcast(&ServerMessage::GameOver(GameOverPayload {
            winner: role,
            reason,
            move_no: Some(move_no),
            server_ts: self.clock.now(),
        }));
        info!("🏆 {} wins room {} by {:?} on move {}", role, self.id, reason, move_no);

        Ok(self.record_for(&state, role, reason))
    }

    /// Forfeits the game for `role`, broadcasting `gameOver` with reason
    /// `resign`.
    pub async fn resign(
        &self,
        connection: ConnectionId,
        role: Stone,
    ) -> Result<Option<MatchRecord>, GameError> {
        let mut state = self.state.lock().await;

        if !state.holds(role, connection) {
            return Err(ProtocolError::NotJoined.into());
        }
        let winner = state.game.resign(role)?;

        state.broadcast(&ServerMessage::GameOver(GameOverPayload {
            winner,
            reason: GameOverReason::Resign,
            move_no: None,
            server_ts: self.clock.now(),
        }));
        info!("🏳️ {} resigned in room {}", role, self.id);

        Ok(self.record_for(&state, winner, GameOverReason::Resign))
    }

    /// Clears every seat bound to `connection`. Returns whether one was held.
    ///
    /// The game itself is left as is; a later joiner takes over the freed
    /// role mid-game.
    pub async fn detach(&self, connection: ConnectionId) -> bool {
        let mut state = self.state.lock().await;
        let mut removed = false;
        for role in [Stone::Black, Stone::White] {
            if state.holds(role, connection) {
                if let Some(seat) = state.seat_mut(role).take() {
                    info!("👋 Player {} left room {} ({})", seat.player_id, self.id, role);
                }
                removed = true;
            }
        }
        removed
    }

    pub async fn is_empty(&self) -> bool {
        self.state.lock().await.is_empty()
    }

    /// Number of occupied seats.
    pub async fn occupancy(&self) -> usize {
        let state = self.state.lock().await;
        usize::from(state.black.is_some()) + usize::from(state.white.is_some())
    }

    /// Asks every seated connection to close and empties both seats.
    pub async fn close_all(&self) {
        let mut state = self.state.lock().await;
        for seat in [state.black.take(), state.white.take()].into_iter().flatten() {
            seat.handle.close();
        }
    }

    fn record_for(
        &self,
        state: &RoomState,
        winner: Stone,
        reason: GameOverReason,
    ) -> Option<MatchRecord> {
        let black = state.player_id(Stone::Black)?;
        let white = state.player_id(Stone::White)?;
        let winner_id = match winner {
            Stone::Black => black.clone(),
            Stone::White => white.clone(),
        };
        Some(MatchRecord {
            room_id: self.id.clone(),
            player1_id: black,
            player2_id: white,
            winner_id,
            winner,
            reason,
            move_count: state.move_no,
            finished_at: self.clock.now(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::{Outbound, OutboundQueue};
    use crate::error::MoveError;

    fn room() -> Room {
        Room::new("r1", 15, ServerClock::default())
    }

    fn connect() -> (ConnectionHandle, OutboundQueue) {
        ConnectionHandle::new(ConnectionId::new())
    }

    fn drain(rx: &mut OutboundQueue) -> Vec<ServerMessage> {
        let mut messages = Vec::new();
        while let Ok(item) = rx.try_recv() {
            if let Outbound::Message(message) = item {
                messages.push(message);
            }
        }
        messages
    }

    fn at(row: i64, col: i64) -> MoveRequest {
        MoveRequest { row: Some(row), col: Some(col) }
    }

    async fn seated() -> (
        Room,
        (ConnectionHandle, OutboundQueue),
        (ConnectionHandle, OutboundQueue),
    ) {
        let room = room();
        let (black, mut black_rx) = connect();
        let (white, mut white_rx) = connect();
        room.bind("alice", black.clone()).await.unwrap();
        room.bind("bob", white.clone()).await.unwrap();
        drain(&mut black_rx);
        drain(&mut white_rx);
        (room, (black, black_rx), (white, white_rx))
    }

    #[tokio::test]
    async fn test_bind_assigns_black_then_white_then_full() {
        let room = room();
        let (a, mut a_rx) = connect();
        let (b, mut b_rx) = connect();
        let (c, _c_rx) = connect();

        assert_eq!(room.bind("alice", a).await, Ok(Stone::Black));
        let first = drain(&mut a_rx);
        assert_eq!(first.len(), 2);
        assert!(matches!(&first[0], ServerMessage::AssignRole(p) if p.role == Stone::Black));
        match &first[1] {
            ServerMessage::State(snapshot) => {
                assert_eq!(snapshot.black_player_id.as_deref(), Some("alice"));
                assert_eq!(snapshot.white_player_id, None);
            }
            other => panic!("unexpected {:?}", other),
        }

        assert_eq!(room.bind("bob", b).await, Ok(Stone::White));
        let kinds: Vec<_> = drain(&mut b_rx).iter().map(|m| m.message_type().to_string()).collect();
        assert_eq!(kinds, ["assignRole", "state", "gameStart", "state"]);
        let kinds: Vec<_> = drain(&mut a_rx).iter().map(|m| m.message_type().to_string()).collect();
        assert_eq!(kinds, ["gameStart", "state"]);

        assert_eq!(room.bind("carol", c).await, Err(ProtocolError::RoomFull));
        assert_eq!(room.occupancy().await, 2);
    }

    #[tokio::test]
    async fn test_game_start_names_both_players() {
        let room = room();
        let (a, _a_rx) = connect();
        let (b, mut b_rx) = connect();
        room.bind("alice", a).await.unwrap();
        room.bind("bob", b).await.unwrap();

        let start = drain(&mut b_rx)
            .into_iter()
            .find_map(|m| match m {
                ServerMessage::GameStart(p) => Some(p),
                _ => None,
            })
            .unwrap();
        assert_eq!(start.black_player, "alice");
        assert_eq!(start.white_player, "bob");
        assert_eq!(start.current_turn, Stone::Black);
    }

    #[tokio::test]
    async fn test_move_validation_order() {
        let room = room();
        let (black, _black_rx) = connect();
        room.bind("alice", black.clone()).await.unwrap();

        let stranger = ConnectionId::new();
        assert_eq!(
            room.apply_move(stranger, Stone::Black, at(7, 7)).await,
            Err(ProtocolError::NotJoined.into())
        );
        assert_eq!(
            room.apply_move(black.id(), Stone::Black, at(7, 7)).await,
            Err(ProtocolError::WaitingForOpponent.into())
        );

        let (white, _white_rx) = connect();
        room.bind("bob", white.clone()).await.unwrap();
        assert_eq!(
            room.apply_move(white.id(), Stone::White, MoveRequest { row: None, col: None }).await,
            Err(ProtocolError::NotYourTurn.into())
        );
        assert_eq!(
            room.apply_move(black.id(), Stone::Black, MoveRequest { row: Some(1), col: None }).await,
            Err(ProtocolError::InvalidCoordinates.into())
        );
        assert_eq!(
            room.apply_move(black.id(), Stone::Black, at(15, 0)).await,
            Err(MoveError::OutOfBounds.into())
        );
        assert_eq!(room.snapshot().await.move_no, 0);
    }

    #[tokio::test]
    async fn test_accepted_move_is_broadcast_to_both() {
        let (room, (black, mut black_rx), (_white, mut white_rx)) = seated().await;

        let record = room.apply_move(black.id(), Stone::Black, at(7, 7)).await.unwrap();
        assert!(record.is_none());

        for rx in [&mut black_rx, &mut white_rx] {
            let messages = drain(rx);
            assert_eq!(messages.len(), 1);
            match &messages[0] {
                ServerMessage::Move(p) => {
                    assert_eq!((p.row, p.col), (7, 7));
                    assert_eq!(p.player, Stone::Black);
                    assert_eq!(p.next_turn, Stone::White);
                    assert_eq!(p.move_no, 1);
                }
                other => panic!("unexpected {:?}", other),
            }
        }
    }

    #[tokio::test]
    async fn test_rejected_move_changes_nothing() {
        let (room, (black, mut black_rx), (white, mut white_rx)) = seated().await;
        room.apply_move(black.id(), Stone::Black, at(7, 7)).await.unwrap();
        drain(&mut black_rx);
        drain(&mut white_rx);

        let before = room.snapshot().await;
        assert_eq!(
            room.apply_move(white.id(), Stone::White, at(7, 7)).await,
            Err(MoveError::CellOccupied.into())
        );
        let after = room.snapshot().await;
        assert_eq!(before.board, after.board);
        assert_eq!(after.current_turn, Stone::White);
        assert_eq!(after.move_no, 1);
        assert!(drain(&mut black_rx).is_empty());
        assert!(drain(&mut white_rx).is_empty());
    }

    #[tokio::test]
    async fn test_five_in_a_row_ends_game_with_record() {
        let (room, (black, mut black_rx), (white, _white_rx)) = seated().await;
        let moves = [
            (Stone::Black, 7, 7),
            (Stone::White, 0, 0),
            (Stone::Black, 7, 8),
            (Stone::White, 0, 2),
            (Stone::Black, 7, 9),
            (Stone::White, 0, 4),
            (Stone::Black, 7, 10),
            (Stone::White, 0, 6),
        ];
        for (role, r, c) in moves {
            let id = if role == Stone::Black { black.id() } else { white.id() };
            assert_eq!(room.apply_move(id, role, at(r, c)).await, Ok(None));
        }
        drain(&mut black_rx);

        let record = room
            .apply_move(black.id(), Stone::Black, at(7, 11))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(record.winner_id, "alice");
        assert_eq!(record.player2_id, "bob");
        assert_eq!(record.move_count, 9);

        let messages = drain(&mut black_rx);
        assert_eq!(messages.len(), 2);
        assert!(matches!(&messages[0], ServerMessage::Move(p) if p.move_no == 9));
        match &messages[1] {
            ServerMessage::GameOver(p) => {
                assert_eq!(p.winner, Stone::Black);
                assert_eq!(p.reason, GameOverReason::FiveInARow);
                assert_eq!(p.move_no, Some(9));
            }
            other => panic!("unexpected {:?}", other),
        }

        assert_eq!(
            room.apply_move(white.id(), Stone::White, at(1, 1)).await,
            Err(ProtocolError::NotYourTurn.into())
        );
        assert_eq!(
            room.apply_move(black.id(), Stone::Black, at(1, 1)).await,
            Err(MoveError::GameOver.into())
        );
    }

    #[tokio::test]
    async fn test_resign_awards_opponent() {
        let (room, (black, mut black_rx), (white, mut white_rx)) = seated().await;

        let record = room.resign(white.id(), Stone::White).await.unwrap().unwrap();
        assert_eq!(record.winner, Stone::Black);
        assert_eq!(record.reason, GameOverReason::Resign);

        let messages = drain(&mut black_rx);
        match &messages[..] {
            [ServerMessage::GameOver(p)] => {
                assert_eq!(p.winner, Stone::Black);
                assert_eq!(p.reason, GameOverReason::Resign);
                assert_eq!(p.move_no, None);
            }
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(drain(&mut white_rx).len(), 1);

        let snapshot = room.snapshot().await;
        assert!(snapshot.game_over);
        assert_eq!(snapshot.winner, Some(Stone::Black));

        assert_eq!(
            room.resign(black.id(), Stone::Black).await,
            Err(MoveError::GameOver.into())
        );
    }

    #[tokio::test]
    async fn test_resign_while_waiting_has_no_record() {
        let room = room();
        let (black, _rx) = connect();
        room.bind("alice", black.clone()).await.unwrap();
        assert_eq!(room.resign(black.id(), Stone::Black).await, Ok(None));
        assert_eq!(room.snapshot().await.winner, Some(Stone::White));
    }

    #[tokio::test]
    async fn test_detach_frees_role_for_next_joiner() {
        let (room, (black, _black_rx), (_white, _white_rx)) = seated().await;
        room.apply_move(black.id(), Stone::Black, at(7, 7)).await.unwrap();

        assert!(room.detach(black.id()).await);
        assert!(!room.detach(black.id()).await);
        assert_eq!(room.occupancy().await, 1);
        assert!(!room.is_empty().await);

        let (newcomer, _rx) = connect();
        assert_eq!(room.bind("dave", newcomer).await, Ok(Stone::Black));
        let snapshot = room.snapshot().await;
        assert_eq!(snapshot.black_player_id.as_deref(), Some("dave"));
        assert_eq!(snapshot.move_no, 1);
    }

    #[tokio::test]
    async fn test_detached_connection_can_no_longer_move() {
        let (room, (black, _black_rx), (_white, _white_rx)) = seated().await;
        room.detach(black.id()).await;
        assert_eq!(
            room.apply_move(black.id(), Stone::Black, at(7, 7)).await,
            Err(ProtocolError::NotJoined.into())
        );
    }

    #[tokio::test]
    async fn test_close_all_empties_room() {
        let (room, (_black, mut black_rx), (_white, mut white_rx)) = seated().await;
        room.close_all().await;
        assert!(room.is_empty().await);
        assert!(matches!(black_rx.try_recv(), Ok(Outbound::Close)));
        assert!(matches!(white_rx.try_recv(), Ok(Outbound::Close)));
    }
}
