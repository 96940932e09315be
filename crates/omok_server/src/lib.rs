//! # Omok Server - Real-time Gomoku with Renju rules
//!
//! A WebSocket server for two-player Gomoku (five in a row). Black moves
//! first and is bound by the Renju restrictions; white is not. Two clients
//! join a room by id, receive their roles, and play with every accepted move
//! broadcast to both of them in a single, per-room order.
//!
//! ## Architecture Overview
//!
//! ### Core Components
//!
//! * **Rule Engine** ([`game`]) - Board, turn bookkeeping, win detection and
//!   forbidden-move checks. Pure logic with no I/O.
//! * **Rooms** ([`room`]) - One match each: the game, the two seats and a
//!   lock that orders moves and their broadcasts.
//! * **Registry** ([`room::RoomRegistry`]) - Creates rooms on first join and
//!   removes them when the last player leaves.
//! * **Dispatcher** ([`dispatcher`]) - Per-connection state machine that
//!   turns inbound frames into room operations.
//! * **Server** ([`server`]) - Listener, accept loop and connection tasks.
//!
//! ### Message Flow
//!
//! 1. Client opens a WebSocket and sends `{"type": "joinGame", "payload": {...}}`
//! 2. The registry resolves the room and seats the connection as black or white
//! 3. The client receives `assignRole` and a `state` snapshot
//! 4. Once both seats are filled, both clients receive `gameStart`
//! 5. Each `move` is validated, applied under the room lock and broadcast
//! 6. A winning move or a resignation is followed by `gameOver`
//!
//! ## Error Handling
//!
//! Rejected actions are reported to the acting client as `error` messages
//! carrying a stable numeric code ([`error::ErrorCode`]). Only two errors
//! close a connection: a first message that is not `joinGame`, and a join to
//! a full room. Infrastructure failures use [`ServerError`].
//!
//! ## Example
//!
//! ```rust,no_run
//! use omok_server::{create_server_with_config, ServerConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), omok_server::ServerError> {
//!     let server = create_server_with_config(ServerConfig::default());
//!     server.start().await
//! }
//! ```

pub use config::ServerConfig;
pub use connection::ConnectionId;
pub use dispatcher::{Dispatcher, Flow};
pub use error::{ErrorCode, GameError, MoveError, ProtocolError, ServerError};
pub use game::{GameOverReason, GameState, Stone};
pub use records::{MatchRecord, MatchRecorder, TracingRecorder};
pub use room::{Room, RoomRegistry};
pub use server::GameServer;
pub use utils::{create_server, create_server_with_config, ServerClock};

pub mod config;
pub mod connection;
pub mod dispatcher;
pub mod error;
pub mod game;
pub mod messaging;
pub mod records;
pub mod room;
pub mod server;
pub mod utils;
