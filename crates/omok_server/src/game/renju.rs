//! Line scanning and Renju restrictions.
//!
//! All scans look along the four axes through a single cell: horizontal,
//! vertical and both diagonals. They are evaluated with the candidate stone
//! already on the board.

use super::board::{Board, Stone};
use crate::error::MoveError;

/// Axis step vectors: horizontal, vertical, diagonal, anti-diagonal.
pub const AXES: [(i64, i64); 4] = [(0, 1), (1, 0), (1, 1), (1, -1)];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Slot {
    Empty,
    Stone,
}

const OPEN_THREE: [Slot; 5] = [Slot::Empty, Slot::Stone, Slot::Stone, Slot::Stone, Slot::Empty];
const OPEN_FOUR: [Slot; 6] = [
    Slot::Empty,
    Slot::Stone,
    Slot::Stone,
    Slot::Stone,
    Slot::Stone,
    Slot::Empty,
];

/// Length of the contiguous run of `player` through `(row, col)` along one
/// axis, counting both directions and the cell itself.
pub fn count_direction(board: &Board, row: i64, col: i64, dr: i64, dc: i64, player: Stone) -> usize {
    let mut count = 1;
    for sign in [1, -1] {
        let (mut r, mut c) = (row + dr * sign, col + dc * sign);
        while board.get(r, c) == Some(player) {
            count += 1;
            r += dr * sign;
            c += dc * sign;
        }
    }
    count
}

/// Longest run through `(row, col)` on any axis.
pub fn longest_run(board: &Board, row: i64, col: i64, player: Stone) -> usize {
    AXES.iter()
        .map(|&(dr, dc)| count_direction(board, row, col, dr, dc, player))
        .max()
        .unwrap_or(0)
}

/// Six or more black stones in a row through the cell.
pub fn is_overline(board: &Board, row: i64, col: i64) -> bool {
    longest_run(board, row, col, Stone::Black) >= 6
}

/// Five or more of `player` in a row through the cell.
pub fn makes_five(board: &Board, row: i64, col: i64, player: Stone) -> bool {
    longest_run(board, row, col, player) >= 5
}

/// Number of open threes (`_XXX_`) the cell takes part in, over all axes.
pub fn count_open_threes(board: &Board, row: i64, col: i64, player: Stone) -> usize {
    AXES.iter()
        .map(|&(dr, dc)| count_pattern(board, row, col, dr, dc, player, &OPEN_THREE))
        .sum()
}

/// Number of open fours (`_XXXX_`) the cell takes part in, over all axes.
pub fn count_open_fours(board: &Board, row: i64, col: i64, player: Stone) -> usize {
    AXES.iter()
        .map(|&(dr, dc)| count_pattern(board, row, col, dr, dc, player, &OPEN_FOUR))
        .sum()
}

/// The first Renju restriction a black stone at `(row, col)` violates.
///
/// Checked in order: overline, double three, double four.
pub fn forbidden_move(board: &Board, row: i64, col: i64) -> Option<MoveError> {
    if is_overline(board, row, col) {
        Some(MoveError::Overline)
    } else if count_open_threes(board, row, col, Stone::Black) > 1 {
        Some(MoveError::DoubleThree)
    } else if count_open_fours(board, row, col, Stone::Black) > 1 {
        Some(MoveError::DoubleFour)
    } else {
        None
    }
}

/// Counts windows along one axis that contain `(row, col)` and match
/// `pattern` exactly. An off-board cell matches an empty slot.
fn count_pattern(
    board: &Board,
    row: i64,
    col: i64,
    dr: i64,
    dc: i64,
    player: Stone,
    pattern: &[Slot],
) -> usize {
    let len = pattern.len() as i64;
    (-(len - 1)..=0)
        .filter(|&offset| {
            // The cell itself holds `player`, so a match always places it on a stone slot.
            pattern.iter().enumerate().all(|(i, slot)| {
                let step = offset + i as i64;
                let cell = board.cell(row + dr * step, col + dc * step);
                match slot {
                    Slot::Empty => matches!(cell, None | Some(None)),
                    Slot::Stone => cell == Some(Some(player)),
                }
            })
        })
        .count()
}
