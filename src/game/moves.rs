//! Move-Availability Oracle
//!
//! Tries every adjacent swap on the board (row-major, then East, North,
//! West, South) and reports the first one that would do something: create
//! a run, or involve a rainbow tile. Every hypothetical swap is undone, so
//! the board is unchanged when these functions return.

use serde::{Serialize, Deserialize};

use crate::game::board::{Board, Coord, Direction};
use crate::game::matcher::has_match;

/// A legal adjacent swap.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Move {
    /// First cell
    pub from: Coord,
    /// Neighbor it swaps with
    pub to: Coord,
}

/// Would swapping `a` and `b` be a legal move?
///
/// Takes `&mut` to swap in place; the board is restored before returning.
pub fn is_legal_swap(board: &mut Board, a: Coord, b: Coord) -> bool {
    board.swap(a, b);
    let rainbow = board.get(a).is_some_and(|c| c.is_rainbow())
        || board.get(b).is_some_and(|c| c.is_rainbow());
    let legal = rainbow || has_match(board);
    board.swap(a, b);
    legal
}

/// First legal move in deterministic scan order, if any.
pub fn find_first_legal_move(board: &Board) -> Option<Move> {
    let mut scratch = board.clone();
    let (rows, cols) = (board.rows(), board.cols());

    for from in board.coords() {
        for dir in Direction::ALL {
            let Some(to) = from.step(dir, rows, cols) else {
                continue;
            };
            if is_legal_swap(&mut scratch, from, to) {
                return Some(Move { from, to });
            }
        }
    }

    None
}

/// Does the board have at least one legal move?
pub fn has_any_legal_move(board: &Board) -> bool {
    find_first_legal_move(board).is_some()
}

// =============================================================================
// TESTS
// =============================================================================
