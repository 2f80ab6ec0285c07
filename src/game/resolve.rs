//! Cascade Resolution
//!
//! One chain step is: promote specials, clear every other cell of every
//! group, score, collapse columns, refill from the top, re-detect. The
//! caller repeats steps (depth + 1 each time) until detection comes back
//! empty. Steps are plain functions over a [`Board`], so the level state
//! machine in [`crate::game::actions`] can pace them however it likes.

use std::collections::BTreeSet;

use serde::{Serialize, Deserialize};
use tracing::debug;

use crate::core::rng::DeterministicRng;
use crate::game::board::{Board, Cell, Color, Coord};
use crate::game::matcher::{find_matches, MatchGroup};
use crate::game::promote::{promote_specials, Promotion};

/// Points per cleared cell before the chain multiplier.
pub const POINTS_PER_CELL: u64 = 110;

/// Remaining count toward the level's color goal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GoalState {
    /// Color whose clears count toward the goal
    pub target_color: Color,
    /// Clears still needed (never below zero)
    pub remaining: u32,
}

impl GoalState {
    /// Create a goal.
    pub fn new(target_color: Color, remaining: u32) -> Self {
        Self { target_color, remaining }
    }

    /// Count one cleared cell.
    #[inline]
    pub fn record_clear(&mut self, color: Color) {
        if color == self.target_color {
            self.remaining = self.remaining.saturating_sub(1);
        }
    }

    /// Has the goal been reached?
    #[inline]
    pub fn is_met(&self) -> bool {
        self.remaining == 0
    }
}

/// What one chain step did.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainStep {
    /// 1 for the step triggered by the action itself
    pub chain_depth: u32,
    /// Cells removed this step (promoted survivors excluded)
    pub cleared: u32,
    /// `cleared * POINTS_PER_CELL * chain_depth`
    pub score_delta: u64,
    /// Specials created this step
    pub promotions: Vec<Promotion>,
}

/// Score for one chain step.
#[inline]
pub fn step_score(cleared: u32, chain_depth: u32) -> u64 {
    cleared as u64 * POINTS_PER_CELL * chain_depth as u64
}

/// Remove every present cell in `groups` except `survivors`.
///
/// Returns how many cells were removed; each one counts toward `goal`.
pub fn clear_groups(
    board: &mut Board,
    groups: &[MatchGroup],
    survivors: &BTreeSet<Coord>,
    goal: &mut GoalState,
) -> u32 {
    let mut cleared = 0;
    for group in groups {
        for coord in &group.cells {
            if survivors.contains(coord) {
                continue;
            }
            if let Some(cell) = board.take(*coord) {
                goal.record_clear(cell.color);
                cleared += 1;
            }
        }
    }
    cleared
}

/// Let every column fall toward the bottom and refill the vacated top slots
/// with random normal cells. Returns the number of cells spawned.
pub fn collapse_and_refill(board: &mut Board, palette: &[Color], rng: &mut DeterministicRng) -> u32 {
    let rows = board.rows();
    let mut spawned = 0;
    let mut column: Vec<Cell> = Vec::with_capacity(rows);

    for col in 0..board.cols() {
        column.clear();
        for row in 0..rows {
            if let Some(cell) = board.take(Coord::new(row, col)) {
                column.push(cell);
            }
        }

        let gaps = rows - column.len();
        for row in 0..gaps {
            let color = rng.choose(palette).copied().unwrap_or(Color::Red);
            board.set(Coord::new(row, col), Cell::normal(color));
        }
        for (i, cell) in column.iter().enumerate() {
            board.set(Coord::new(gaps + i, col), *cell);
        }
        spawned += gaps as u32;
    }

    spawned
}

/// Run one chain step over `groups` and return it together with the groups
/// found on the collapsed board (empty means the cascade has settled).
pub fn run_chain_step(
    board: &mut Board,
    groups: &[MatchGroup],
    chain_depth: u32,
    palette: &[Color],
    rng: &mut DeterministicRng,
    goal: &mut GoalState,
) -> (ChainStep, Vec<MatchGroup>) {
    let promotions = promote_specials(board, groups, palette, rng);
    let survivors: BTreeSet<Coord> = promotions.iter().map(|p| p.coord).collect();

    let cleared = clear_groups(board, groups, &survivors, goal);
    let score_delta = step_score(cleared, chain_depth);
    let spawned = collapse_and_refill(board, palette, rng);

    debug!(
        chain_depth,
        groups = groups.len(),
        cleared,
        spawned,
        promotions = promotions.len(),
        score_delta,
        "chain step"
    );
    #[cfg(feature = "debug-tracing")]
    for line in board.to_pattern() {
        debug!("  {}", line);
    }

    let next = find_matches(board);
    let step = ChainStep {
        chain_depth,
        cleared,
        score_delta,
        promotions,
    };
    (step, next)
}

// =============================================================================
// TESTS
// =============================================================================
