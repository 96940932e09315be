//! Game state and the single placement operation.

use super::board::{Board, Stone, DEFAULT_BOARD_SIZE};
use super::renju;
use crate::error::MoveError;
use serde::{Deserialize, Serialize};

/// Why a game ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum GameOverReason {
    FiveInARow,
    Resign,
}

/// Result of an accepted placement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placement {
    /// Player to move next. On a terminal move this is still the mover.
    pub next_player: Stone,
    /// Set when the placement ended the game.
    pub terminal: Option<GameOverReason>,
}

/// Board plus turn and terminal bookkeeping for one match.
#[derive(Debug, Clone)]
pub struct GameState {
    board: Board,
    current_player: Stone,
    game_over: bool,
    winner: Option<Stone>,
}

impl GameState {
    pub fn new(size: usize) -> Self {
        Self {
            board: Board::new(size),
            current_player: Stone::Black,
            game_over: false,
            winner: None,
        }
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn size(&self) -> usize {
        self.board.size()
    }

    pub fn current_player(&self) -> Stone {
        self.current_player
    }

    pub fn is_game_over(&self) -> bool {
        self.game_over
    }

    pub fn winner(&self) -> Option<Stone> {
        self.winner
    }

    /// Places a stone for the current player.
    ///
    /// Rejections leave the game untouched. Black is additionally bound by
    /// the Renju restrictions; white is not.
    pub fn place(&mut self, row: i64, col: i64) -> Result<Placement, MoveError> {
        if self.game_over {
            return Err(MoveError::GameOver);
        }
        if !self.board.contains(row, col) {
            return Err(MoveError::OutOfBounds);
        }
        let (r, c) = (row as usize, col as usize);
        if self.board.get(row, col).is_some() {
            return Err(MoveError::CellOccupied);
        }

        let mover = self.current_player;
        self.board.set(r, c, Some(mover));

        if mover == Stone::Black {
            if let Some(violation) = renju::forbidden_move(&self.board, row, col) {
                self.board.set(r, c, None);
                return Err(violation);
            }
        }

        if renju::makes_five(&self.board, row, col, mover) {
            self.game_over = true;
            self.winner = Some(mover);
            return Ok(Placement {
                next_player: mover,
                terminal: Some(GameOverReason::FiveInARow),
            });
        }

        self.current_player = mover.opponent();
        Ok(Placement {
            next_player: self.current_player,
            terminal: None,
        })
    }

    /// Ends the game in favour of `loser`'s opponent. Returns the winner.
    pub fn resign(&mut self, loser: Stone) -> Result<Stone, MoveError> {
        if self.game_over {
            return Err(MoveError::GameOver);
        }
        let winner = loser.opponent();
        self.game_over = true;
        self.winner = Some(winner);
        Ok(winner)
    }

    /// Back to an empty board with black to move.
    pub fn reset(&mut self) {
        self.board.clear();
        self.current_player = Stone::Black;
        self.game_over = false;
        self.winner = None;
    }
}

impl Default for GameState {
    fn default() -> Self {
        Self::new(DEFAULT_BOARD_SIZE)
    }
}
