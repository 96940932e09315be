//! Board and rule engine.
//!
//! Pure game logic with no I/O: a fixed-size board, turn bookkeeping, win
//! detection for both colors and the Renju restrictions (overline, double
//! three, double four) that apply to black only.

pub mod board;
pub mod renju;
pub mod state;

pub use board::{Board, Stone, DEFAULT_BOARD_SIZE};
pub use state::{GameOverReason, GameState, Placement};
