//! Reshuffle Engine
//!
//! Redistributes the colors already on the board until it is match-free and
//! has a legal move. The color multiset is preserved; kinds are not (every
//! tile comes back `Normal`).
//!
//! Some color distributions have no valid arrangement at all (60 reds and
//! 4 blues on an 8x8 board). The shuffle loop is therefore bounded; when it
//! runs out the board is regenerated from the palette instead.

use serde::{Serialize, Deserialize};
use tracing::{debug, warn};

use crate::core::rng::DeterministicRng;
use crate::game::board::{Board, Cell, Color};
use crate::game::matcher::has_match;
use crate::game::moves::has_any_legal_move;

/// Permutations tried before falling back to regeneration.
pub const MAX_RESHUFFLE_ATTEMPTS: u32 = 10_000;

/// Fresh boards drawn after the shuffle loop gives up.
const MAX_REGENERATION_ATTEMPTS: u32 = 1_000;

/// How a reshuffle ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReshuffleOutcome {
    /// Colors were permuted; `attempts` permutations were tried
    Shuffled {
        /// Number of permutations tried (1 = first one was valid)
        attempts: u32,
    },
    /// No valid permutation found; colors were redrawn from the palette
    Regenerated,
}

fn is_playable(board: &Board) -> bool {
    !has_match(board) && has_any_legal_move(board)
}

fn write_back(board: &mut Board, colors: &[Color]) {
    let coords: Vec<_> = board.coords().collect();
    for (coord, &color) in coords.into_iter().zip(colors) {
        board.set(coord, Cell::normal(color));
    }
}

/// Permute the board's colors until it is match-free and has a legal move.
///
/// # Panics
///
/// Panics if the board has empty slots; only settled boards are reshuffled.
/// Also panics if regeneration cannot produce a playable board, which a
/// validated palette does not hit.
pub fn reshuffle(board: &mut Board, palette: &[Color], rng: &mut DeterministicRng) -> ReshuffleOutcome {
    assert!(board.is_full(), "reshuffle of a board with holes");

    let mut colors: Vec<Color> = board
        .coords()
        .filter_map(|c| board.get(c).map(|cell| cell.color))
        .collect();

    for attempt in 1..=MAX_RESHUFFLE_ATTEMPTS {
        rng.shuffle(&mut colors);
        write_back(board, &colors);
        if is_playable(board) {
            debug!(attempts = attempt, "board reshuffled");
            return ReshuffleOutcome::Shuffled { attempts: attempt };
        }
    }

    warn!(
        attempts = MAX_RESHUFFLE_ATTEMPTS,
        "no playable permutation of current colors, regenerating board"
    );
    for _ in 0..MAX_REGENERATION_ATTEMPTS {
        board.fill_without_runs(palette, rng);
        if is_playable(board) {
            return ReshuffleOutcome::Regenerated;
        }
    }
    panic!(
        "no playable {}x{} board from a {}-color palette after {} regenerations",
        board.rows(),
        board.cols(),
        palette.len(),
        MAX_REGENERATION_ATTEMPTS
    );
}

// =============================================================================
// TESTS
// =============================================================================
