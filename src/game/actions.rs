//! Level Actions
//!
//! The request surface of the engine. Every function takes the level state
//! by exclusive borrow, validates the request before touching the board,
//! and either rejects it (state unchanged) or runs it to a settled board.
//!
//! ## Resolution
//!
//! ```text
//!  request ──► validate ──► apply (swap / booster) ──► groups
//!                                                        │
//!                      ┌──────── chain step ◄────────────┤ non-empty
//!                      │  promote, clear, score,         │
//!                      │  collapse, refill, re-detect ───┘
//!                      ▼
//!                   settle: win/loss check, oracle, reshuffle if stuck
//! ```
//!
//! `request_*` drives a cascade to completion in one call. The `begin_*`
//! variants stop after applying the input; the caller then calls
//! [`advance`] once per chain step, owning whatever delay sits between
//! steps. While a cascade is pending the phase is
//! [`LevelPhase::Resolving`] and every other request is rejected `Busy`.

use serde::{Serialize, Deserialize};
use tracing::{debug, info};

use crate::game::board::{BoardSnapshot, Color, Coord};
use crate::game::config::{Booster, ConfigError, LevelConfig};
use crate::game::events::GameEvent;
use crate::game::matcher::{find_matches, MatchGroup};
use crate::game::moves::{find_first_legal_move, has_any_legal_move, Move};
use crate::game::reshuffle::{reshuffle, ReshuffleOutcome};
use crate::game::resolve::{run_chain_step, ChainStep, GoalState};
use crate::game::state::{LevelPhase, LevelState, LossReason};

/// Seconds added by a time bonus.
pub const TIME_BONUS_SECONDS: u32 = 30;

/// Extra points per cell hit by an area blast.
pub const AREA_BLAST_BONUS: u64 = 60;

/// Extra points per cell hit by a color clear.
pub const COLOR_CLEAR_BONUS: u64 = 50;

// =============================================================================
// TYPES
// =============================================================================

/// Why a request was refused. The level state is unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum Rejected {
    /// Coordinate outside the board.
    #[error("({row}, {col}) is outside the board")]
    OutOfBounds {
        /// Requested row
        row: i32,
        /// Requested column
        col: i32,
    },

    /// Swapped cells are not orthogonal neighbors.
    #[error("cells are not adjacent")]
    NotAdjacent,

    /// A cascade is still resolving.
    #[error("a cascade is still resolving")]
    Busy,

    /// The level has been won or lost.
    #[error("level is over")]
    LevelOver,

    /// Booster inventory is empty.
    #[error("no {0} charges left")]
    NoChargesLeft(Booster),

    /// No legal move exists on the board.
    #[error("no legal move available")]
    NoMoveAvailable,
}

/// The input that started a resolution.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActionKind {
    /// Adjacent swap
    Swap {
        /// First cell
        from: Coord,
        /// Second cell
        to: Coord,
    },
    /// 3x3 blast around `center`
    AreaBlast {
        /// Blast center
        center: Coord,
    },
    /// Clear every cell of `color`
    ColorClear {
        /// Target color
        color: Color,
    },
}

/// How the input was handled.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActionOutcome {
    /// Input applied and the cascade ran
    Resolved,
    /// Swap matched nothing and was undone
    Reverted,
    /// Swap matched nothing but a free-swap token let it stand
    FreeSwap,
}

/// Returned once a cascade has settled.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ResolutionResult {
    /// Input that started the resolution
    pub action: ActionKind,
    /// How the input was handled
    pub outcome: ActionOutcome,
    /// Cascade score: sum of `cleared * 110 * depth` over the steps
    pub total_score_delta: u64,
    /// Booster points, added to the level score on top of the cascade
    pub booster_bonus: u64,
    /// Cells cleared over all steps
    pub cleared_cell_count: u32,
    /// Number of chain steps (0 if nothing cleared)
    pub chain_depth: u32,
    /// Per-step breakdown
    pub steps: Vec<ChainStep>,
    /// Settled board
    pub board: BoardSnapshot,
    /// Goal progress after the action
    pub goal: GoalState,
    /// Did the settled board have a legal move before any reshuffle?
    pub had_any_move: bool,
    /// Set when the board was reshuffled because it had no move
    pub reshuffled: Option<ReshuffleOutcome>,
    /// Phase after settling
    pub phase: LevelPhase,
    /// Swaps left
    pub moves_left: u32,
    /// Events raised by this action, in order
    pub events: Vec<GameEvent>,
}

/// One increment of a paced cascade.
#[derive(Clone, Debug)]
pub enum Progress {
    /// A chain step ran; more may follow
    Step(ChainStep),
    /// The cascade settled
    Settled(Box<ResolutionResult>),
}

/// A cascade between its input and its settlement.
#[derive(Clone, Debug)]
pub(crate) struct Cascade {
    action: ActionKind,
    outcome: ActionOutcome,
    groups: Vec<MatchGroup>,
    depth: u32,
    steps: Vec<ChainStep>,
    booster_bonus: u64,
    events: Vec<GameEvent>,
}

impl Cascade {
    fn new(action: ActionKind, outcome: ActionOutcome, groups: Vec<MatchGroup>) -> Self {
        Self {
            action,
            outcome,
            groups,
            depth: 0,
            steps: Vec::new(),
            booster_bonus: 0,
            events: Vec::new(),
        }
    }

    fn record(&mut self, state: &mut LevelState, event: GameEvent) {
        self.events.push(event.clone());
        state.push_event(event);
    }
}

// =============================================================================
// LEVEL START
// =============================================================================

/// Validate `config` and generate the level's first board.
pub fn start_level(config: LevelConfig, seed: u64) -> Result<LevelState, ConfigError> {
    config.validate()?;
    let state = LevelState::new(config, seed);
    info!(
        seed,
        rows = state.config.rows,
        cols = state.config.cols,
        target = state.config.target_score,
        goal_color = ?state.goal.target_color,
        goal_count = state.goal.remaining,
        "level started"
    );
    Ok(state)
}

fn ensure_idle(state: &LevelState) -> Result<(), Rejected> {
    match state.phase {
        LevelPhase::Idle => Ok(()),
        LevelPhase::Resolving { .. } => Err(Rejected::Busy),
        LevelPhase::Won | LevelPhase::Lost(_) => Err(Rejected::LevelOver),
    }
}

fn checked_coord(state: &LevelState, row: i32, col: i32) -> Result<Coord, Rejected> {
    Coord::checked(row, col, state.board.rows(), state.board.cols())
        .ok_or(Rejected::OutOfBounds { row, col })
}

// =============================================================================
// INPUT
// =============================================================================

fn prepare_swap(state: &mut LevelState, r1: i32, c1: i32, r2: i32, c2: i32) -> Result<Cascade, Rejected> {
    ensure_idle(state)?;
    let from = checked_coord(state, r1, c1)?;
    let to = checked_coord(state, r2, c2)?;
    if !from.is_adjacent(&to) {
        return Err(Rejected::NotAdjacent);
    }

    state.action_count += 1;
    let action = ActionKind::Swap { from, to };
    state.board.swap(from, to);

    // A rainbow's forced group replaces the detector's output for this step
    let groups = match rainbow_group(state, from, to) {
        Some(group) => vec![group],
        None => find_matches(&state.board),
    };

    if !groups.is_empty() {
        state.moves_left = state.moves_left.saturating_sub(1);
        let event = GameEvent::swap_applied(state.action_count, from, to);
        let mut cascade = Cascade::new(action, ActionOutcome::Resolved, groups);
        cascade.record(state, event);
        return Ok(cascade);
    }

    if state.free_swap_armed && state.inventory.spend(Booster::FreeSwap) {
        state.free_swap_armed = false;
        debug!(%from, %to, "free swap token consumed");
        let event = GameEvent::free_swap_used(state.action_count, from, to);
        let mut cascade = Cascade::new(action, ActionOutcome::FreeSwap, Vec::new());
        cascade.record(state, event);
        return Ok(cascade);
    }

    state.board.swap(from, to);
    debug!(%from, %to, "swap matched nothing, reverted");
    let event = GameEvent::swap_reverted(state.action_count, from, to);
    let mut cascade = Cascade::new(action, ActionOutcome::Reverted, Vec::new());
    cascade.record(state, event);
    Ok(cascade)
}

/// Group forced by a rainbow in a swap.
///
/// One rainbow clears every cell of its partner's color, by the same rule
/// as a color clear. Two rainbows clear each other.
fn rainbow_group(state: &LevelState, a: Coord, b: Coord) -> Option<MatchGroup> {
    let cell_a = *state.board.get(a)?;
    let cell_b = *state.board.get(b)?;

    let (rainbow, partner) = match (cell_a.is_rainbow(), cell_b.is_rainbow()) {
        (true, true) => return Some(MatchGroup::synthetic([a, b])),
        (true, false) => (a, cell_b),
        (false, true) => (b, cell_a),
        (false, false) => return None,
    };

    debug!(%rainbow, color = ?partner.color, "rainbow swap forces a color clear");
    Some(MatchGroup::synthetic(state.board.coords_of_color(partner.color)))
}

fn blast_area(state: &LevelState, center: Coord) -> MatchGroup {
    let rows = state.board.rows();
    let cols = state.board.cols();
    let row_range = center.row.saturating_sub(1)..=(center.row + 1).min(rows - 1);
    let col_range = center.col.saturating_sub(1)..=(center.col + 1).min(cols - 1);

    MatchGroup::synthetic(
        row_range.flat_map(|r| col_range.clone().map(move |c| Coord::new(r, c))),
    )
}

fn prepare_area_blast(state: &mut LevelState, row: i32, col: i32) -> Result<Cascade, Rejected> {
    ensure_idle(state)?;
    let center = checked_coord(state, row, col)?;
    if !state.inventory.spend(Booster::AreaBlast) {
        return Err(Rejected::NoChargesLeft(Booster::AreaBlast));
    }

    state.action_count += 1;
    let group = blast_area(state, center);
    let cells = group.len() as u32;
    let bonus = cells as u64 * AREA_BLAST_BONUS;
    state.score += bonus;

    let event = GameEvent::booster_used(state.action_count, Booster::AreaBlast, cells, bonus);
    let mut cascade = Cascade::new(ActionKind::AreaBlast { center }, ActionOutcome::Resolved, vec![group]);
    cascade.booster_bonus = bonus;
    cascade.record(state, event);
    Ok(cascade)
}

fn prepare_color_clear(state: &mut LevelState, color: Color) -> Result<Cascade, Rejected> {
    ensure_idle(state)?;
    if !state.inventory.spend(Booster::ColorClear) {
        return Err(Rejected::NoChargesLeft(Booster::ColorClear));
    }

    state.action_count += 1;
    let cells = state.board.coords_of_color(color);
    let count = cells.len() as u32;
    let bonus = count as u64 * COLOR_CLEAR_BONUS;
    state.score += bonus;

    // A color absent from the board still spends the charge
    let groups = if cells.is_empty() {
        Vec::new()
    } else {
        vec![MatchGroup::synthetic(cells)]
    };

    let event = GameEvent::booster_used(state.action_count, Booster::ColorClear, count, bonus);
    let mut cascade = Cascade::new(ActionKind::ColorClear { color }, ActionOutcome::Resolved, groups);
    cascade.booster_bonus = bonus;
    cascade.record(state, event);
    Ok(cascade)
}

// =============================================================================
// CASCADE
// =============================================================================

fn run_step(state: &mut LevelState, cascade: &mut Cascade) -> ChainStep {
    cascade.depth += 1;
    let depth = cascade.depth;

    let (step, next) = run_chain_step(
        &mut state.board,
        &cascade.groups,
        depth,
        &state.config.colors,
        &mut state.rng,
        &mut state.goal,
    );
    state.score += step.score_delta;
    state.phase = LevelPhase::Resolving { chain_depth: depth };

    let action = state.action_count;
    let event = GameEvent::chain_step_cleared(action, depth, step.cleared, step.score_delta, state.score);
    cascade.record(state, event);
    for promotion in &step.promotions {
        cascade.record(state, GameEvent::special_created(action, depth, promotion.coord, promotion.kind));
    }

    cascade.groups = next;
    cascade.steps.push(step.clone());
    step
}

fn settle(state: &mut LevelState, mut cascade: Cascade) -> ResolutionResult {
    let action = state.action_count;
    let depth = cascade.depth;

    state.phase = if state.score >= state.config.target_score && state.goal.is_met() {
        LevelPhase::Won
    } else if state.moves_left == 0 {
        LevelPhase::Lost(LossReason::OutOfMoves)
    } else if state.time_expired {
        LevelPhase::Lost(LossReason::OutOfTime)
    } else {
        LevelPhase::Idle
    };

    match state.phase {
        LevelPhase::Won => {
            info!(score = state.score, moves_left = state.moves_left, "level won");
            let event = GameEvent::level_won(action, depth, state.score, state.moves_left);
            cascade.record(state, event);
        }
        LevelPhase::Lost(reason) => {
            info!(score = state.score, ?reason, "level lost");
            let event = GameEvent::level_lost(action, depth, reason, state.score);
            cascade.record(state, event);
        }
        _ => {}
    }

    let had_any_move = has_any_legal_move(&state.board);
    let reshuffled = if had_any_move {
        None
    } else {
        let outcome = reshuffle(&mut state.board, &state.config.colors, &mut state.rng);
        debug!(?outcome, "no legal move after settling, board reshuffled");
        cascade.record(state, GameEvent::board_reshuffled(action, depth, outcome, false));
        Some(outcome)
    };

    let total_score_delta: u64 = cascade.steps.iter().map(|s| s.score_delta).sum();
    let cleared_cell_count: u32 = cascade.steps.iter().map(|s| s.cleared).sum();

    ResolutionResult {
        action: cascade.action,
        outcome: cascade.outcome,
        total_score_delta,
        booster_bonus: cascade.booster_bonus,
        cleared_cell_count,
        chain_depth: depth,
        steps: cascade.steps,
        board: state.board.snapshot(),
        goal: state.goal,
        had_any_move,
        reshuffled,
        phase: state.phase,
        moves_left: state.moves_left,
        events: cascade.events,
    }
}

fn resolve(state: &mut LevelState, mut cascade: Cascade) -> ResolutionResult {
    while !cascade.groups.is_empty() {
        run_step(state, &mut cascade);
    }
    settle(state, cascade)
}

fn park(state: &mut LevelState, cascade: Cascade) {
    state.phase = LevelPhase::Resolving { chain_depth: 0 };
    state.cascade = Some(cascade);
}

/// Run the pending cascade one step further.
///
/// Returns `None` when nothing is pending. The final call returns
/// [`Progress::Settled`] and leaves the state idle (or over).
pub fn advance(state: &mut LevelState) -> Option<Progress> {
    let mut cascade = state.cascade.take()?;
    if cascade.groups.is_empty() {
        return Some(Progress::Settled(Box::new(settle(state, cascade))));
    }
    let step = run_step(state, &mut cascade);
    state.cascade = Some(cascade);
    Some(Progress::Step(step))
}

// =============================================================================
// REQUESTS
// =============================================================================

/// Swap two adjacent cells and resolve the result.
///
/// A swap that matches nothing is undone and spends no move, unless a
/// free-swap token is armed, in which case it stands.
pub fn request_swap(state: &mut LevelState, r1: i32, c1: i32, r2: i32, c2: i32) -> Result<ResolutionResult, Rejected> {
    let cascade = prepare_swap(state, r1, c1, r2, c2)?;
    Ok(resolve(state, cascade))
}

/// Clear the 3x3 neighborhood of (row, col), clipped to the board.
pub fn request_area_blast(state: &mut LevelState, row: i32, col: i32) -> Result<ResolutionResult, Rejected> {
    let cascade = prepare_area_blast(state, row, col)?;
    Ok(resolve(state, cascade))
}

/// Clear every cell whose stored color is `color`.
pub fn request_color_clear(state: &mut LevelState, color: Color) -> Result<ResolutionResult, Rejected> {
    let cascade = prepare_color_clear(state, color)?;
    Ok(resolve(state, cascade))
}

/// Paced [`request_swap`]: applies the swap, then wait for [`advance`].
pub fn begin_swap(state: &mut LevelState, r1: i32, c1: i32, r2: i32, c2: i32) -> Result<(), Rejected> {
    let cascade = prepare_swap(state, r1, c1, r2, c2)?;
    park(state, cascade);
    Ok(())
}

/// Paced [`request_area_blast`].
pub fn begin_area_blast(state: &mut LevelState, row: i32, col: i32) -> Result<(), Rejected> {
    let cascade = prepare_area_blast(state, row, col)?;
    park(state, cascade);
    Ok(())
}

/// Paced [`request_color_clear`].
pub fn begin_color_clear(state: &mut LevelState, color: Color) -> Result<(), Rejected> {
    let cascade = prepare_color_clear(state, color)?;
    park(state, cascade);
    Ok(())
}

/// First legal move in scan order.
pub fn request_hint(state: &LevelState) -> Result<Move, Rejected> {
    ensure_idle(state)?;
    find_first_legal_move(&state.board).ok_or(Rejected::NoMoveAvailable)
}

/// Arm a free-swap token for the next swap that would fail.
///
/// The charge is only spent if that happens.
pub fn arm_free_swap(state: &mut LevelState) -> Result<(), Rejected> {
    ensure_idle(state)?;
    if state.inventory.charges(Booster::FreeSwap) == 0 {
        return Err(Rejected::NoChargesLeft(Booster::FreeSwap));
    }
    state.free_swap_armed = true;
    Ok(())
}

/// Put an armed token back unused.
pub fn disarm_free_swap(state: &mut LevelState) {
    state.free_swap_armed = false;
}

/// Spend a time bonus charge. Returns the new countdown.
pub fn request_time_bonus(state: &mut LevelState) -> Result<u32, Rejected> {
    ensure_idle(state)?;
    if !state.inventory.spend(Booster::TimeBonus) {
        return Err(Rejected::NoChargesLeft(Booster::TimeBonus));
    }
    state.action_count += 1;
    state.time_left += TIME_BONUS_SECONDS;
    state.push_event(GameEvent::time_bonus(state.action_count, TIME_BONUS_SECONDS, state.time_left));
    Ok(state.time_left)
}

/// Rearrange the board on demand.
pub fn request_reshuffle(state: &mut LevelState) -> Result<ReshuffleOutcome, Rejected> {
    ensure_idle(state)?;
    state.action_count += 1;
    let outcome = reshuffle(&mut state.board, &state.config.colors, &mut state.rng);
    state.push_event(GameEvent::board_reshuffled(state.action_count, 0, outcome, true));
    Ok(outcome)
}

/// Run the countdown down by `seconds`.
///
/// Reaching zero loses the level at once when idle. A pending cascade is
/// never interrupted; the loss is applied when it settles.
pub fn tick_timer(state: &mut LevelState, seconds: u32) -> LevelPhase {
    if state.is_over() {
        return state.phase;
    }
    state.time_left = state.time_left.saturating_sub(seconds);
    if state.time_left > 0 {
        return state.phase;
    }

    match state.phase {
        LevelPhase::Resolving { .. } => state.time_expired = true,
        _ => {
            state.time_expired = true;
            state.phase = LevelPhase::Lost(LossReason::OutOfTime);
            info!(score = state.score, "level lost: out of time");
            state.push_event(GameEvent::level_lost(state.action_count, 0, LossReason::OutOfTime, state.score));
        }
    }
    state.phase
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::board::{Board, Cell, Kind};
    use crate::game::config::Inventory;
    use crate::game::events::GameEventData;
    use crate::game::matcher::has_match;
    use crate::game::resolve::step_score;
    use proptest::prelude::*;

    const BACKGROUND: [Color; 5] = [Color::Blue, Color::Green, Color::Purple, Color::Yellow, Color::Orange];

    /// Run-free filler: no two neighbors in a row or column share a color.
    fn background(rows: usize, cols: usize) -> Board {
        let mut board = Board::new(rows, cols);
        for r in 0..rows {
            for c in 0..cols {
                board.set(Coord::new(r, c), Cell::normal(BACKGROUND[(r + 2 * c) % 5]));
            }
        }
        board
    }

    fn level(board: Board) -> LevelState {
        let config = LevelConfig {
            target_score: 1_000_000,
            goal_color: Color::Red,
            goal_count: 1_000,
            ..LevelConfig::default()
        };
        LevelState::with_board(config, 42, board)
    }

    fn assert_settled(state: &LevelState) {
        assert!(state.board.is_full());
        assert!(!has_match(&state.board));
        assert!(has_any_legal_move(&state.board));
    }

    /// Settled board whose only reds sit one swap away from a run:
    /// swapping (0, 2) and (1, 2) completes R R R on row 0.
    fn playable_board() -> Board {
        let mut board = background(8, 8);
        for coord in [(0, 0), (0, 1), (1, 2)] {
            board.set(Coord::new(coord.0, coord.1), Cell::normal(Color::Red));
        }
        board
    }

    /// Row 0 starts R R R; bringing a fourth red to (0, 3) makes a line of 4.
    fn scenario_board() -> Board {
        let mut board = background(8, 8);
        for c in 0..3 {
            board.set(Coord::new(0, c), Cell::normal(Color::Red));
        }
        board.set(Coord::new(1, 3), Cell::normal(Color::Red));
        board
    }

    #[test]
    fn test_swap_completes_four_and_stripes() {
        // Green refills land as G S G G on row 0: no run, and (0, 0) <-> (0, 1)
        // stays a legal move, so the board settles without a reshuffle
        let config = LevelConfig {
            colors: vec![Color::Green],
            target_score: 1_000_000,
            goal_color: Color::Red,
            goal_count: 1_000,
            ..LevelConfig::default()
        };
        let mut state = LevelState::with_board(config, 42, scenario_board());
        let result = request_swap(&mut state, 0, 3, 1, 3).unwrap();

        assert_eq!(result.outcome, ActionOutcome::Resolved);
        assert_eq!(result.chain_depth, 1);
        assert_eq!(result.steps[0].chain_depth, 1);
        assert_eq!(result.steps[0].cleared, 3);
        assert_eq!(result.steps[0].score_delta, 330);
        assert_eq!(result.total_score_delta, 330);
        assert_eq!(result.steps[0].promotions.len(), 1);
        assert_eq!(result.steps[0].promotions[0].coord, Coord::new(0, 1));
        assert_eq!(result.steps[0].promotions[0].kind, Kind::StripedH);
        assert_eq!(result.moves_left, 19);
        assert_eq!(state.goal.remaining, 997);
        assert!(result.had_any_move);
        assert_eq!(result.reshuffled, None);

        let stripe = result.board.cell(0, 1).unwrap();
        assert_eq!(stripe.kind, Kind::StripedH);
        assert_eq!(stripe.color, Color::Red);
        assert_settled(&state);
    }

    #[test]
    fn test_l_shape_merges_into_wrapped() {
        let mut board = background(5, 5);
        for coord in [(2, 0), (2, 1), (0, 2), (1, 2), (3, 2)] {
            board.set(Coord::new(coord.0, coord.1), Cell::normal(Color::Red));
        }
        let mut state = level(board);

        let result = request_swap(&mut state, 2, 2, 3, 2).unwrap();
        let first = &result.steps[0];
        // Row 2 cols 0..=2 and column 2 rows 0..=2 share (2, 2)
        assert_eq!(first.cleared, 4);
        assert_eq!(first.score_delta, step_score(4, 1));
        assert_eq!(first.promotions.len(), 1);
        assert_eq!(first.promotions[0].coord, Coord::new(2, 2));
        assert_eq!(first.promotions[0].kind, Kind::Wrapped);
        assert_settled(&state);
    }

    #[test]
    fn test_failed_swap_is_idempotent() {
        let board = playable_board();
        let mut state = level(board.clone());

        // (7, 0) and (7, 1) are background colors that stay run-free when swapped
        let mut swapped = board.clone();
        swapped.swap(Coord::new(7, 0), Coord::new(7, 1));
        assert!(!has_match(&swapped));

        let result = request_swap(&mut state, 7, 0, 7, 1).unwrap();
        assert_eq!(result.outcome, ActionOutcome::Reverted);
        assert_eq!(result.total_score_delta, 0);
        assert_eq!(result.chain_depth, 0);
        assert!(result.steps.is_empty());
        assert_eq!(state.board, board);
        assert_eq!(state.moves_left, 20);
        assert!(state.is_idle());
    }

    #[test]
    fn test_rejections_leave_state_untouched() {
        let mut state = level(playable_board());
        let before = state.compute_hash();

        assert_eq!(
            request_swap(&mut state, -1, 0, 0, 0).unwrap_err(),
            Rejected::OutOfBounds { row: -1, col: 0 }
        );
        assert_eq!(
            request_swap(&mut state, 0, 0, 0, 8).unwrap_err(),
            Rejected::OutOfBounds { row: 0, col: 8 }
        );
        assert_eq!(request_swap(&mut state, 0, 0, 1, 1).unwrap_err(), Rejected::NotAdjacent);
        assert_eq!(request_swap(&mut state, 0, 0, 0, 0).unwrap_err(), Rejected::NotAdjacent);
        assert_eq!(
            request_area_blast(&mut state, 9, 9).unwrap_err(),
            Rejected::OutOfBounds { row: 9, col: 9 }
        );

        assert_eq!(state.compute_hash(), before);
        assert_eq!(state.inventory, Inventory::default());
    }

    #[test]
    fn test_area_blast_clears_clipped_square() {
        let mut state = level(playable_board());
        let result = request_area_blast(&mut state, 7, 7).unwrap();

        assert_eq!(result.action, ActionKind::AreaBlast { center: Coord::new(7, 7) });
        assert_eq!(result.steps[0].cleared, 4);
        assert_eq!(result.booster_bonus, 4 * AREA_BLAST_BONUS);
        assert_eq!(state.inventory.area_blast, 2);
        assert_eq!(state.moves_left, 20);
        let cascade: u64 = result.steps.iter().map(|s| s.score_delta).sum();
        assert_eq!(state.score, cascade + result.booster_bonus);
        assert_settled(&state);
    }

    #[test]
    fn test_area_blast_center_clears_nine() {
        let mut state = level(playable_board());
        let result = request_area_blast(&mut state, 4, 4).unwrap();
        assert_eq!(result.steps[0].cleared, 9);
        assert_eq!(result.booster_bonus, 540);
    }

    #[test]
    fn test_color_clear_counts_goal() {
        let mut state = level(playable_board());
        let result = request_color_clear(&mut state, Color::Red).unwrap();

        assert_eq!(result.steps[0].cleared, 3);
        assert_eq!(result.booster_bonus, 3 * COLOR_CLEAR_BONUS);
        assert!(state.goal.remaining <= 997);
        assert_eq!(state.inventory.color_clear, 1);
        assert_settled(&state);
    }

    #[test]
    fn test_color_clear_of_absent_color_spends_charge() {
        // No red anywhere; swapping (0, 2) and (0, 3) makes G G G
        let mut board = background(6, 6);
        board.set(Coord::new(0, 0), Cell::normal(Color::Green));
        board.set(Coord::new(0, 1), Cell::normal(Color::Green));
        assert!(has_any_legal_move(&board));
        let mut state = level(board.clone());
        let result = request_color_clear(&mut state, Color::Red).unwrap();

        assert_eq!(result.cleared_cell_count, 0);
        assert_eq!(result.booster_bonus, 0);
        assert_eq!(state.inventory.color_clear, 1);
        assert_eq!(state.board, board);
    }

    #[test]
    fn test_boosters_run_out() {
        let mut state = level(playable_board());
        state.inventory = Inventory { area_blast: 0, color_clear: 0, free_swap: 0, time_bonus: 0 };

        assert_eq!(
            request_area_blast(&mut state, 1, 1).unwrap_err(),
            Rejected::NoChargesLeft(Booster::AreaBlast)
        );
        assert_eq!(
            request_color_clear(&mut state, Color::Blue).unwrap_err(),
            Rejected::NoChargesLeft(Booster::ColorClear)
        );
        assert_eq!(arm_free_swap(&mut state).unwrap_err(), Rejected::NoChargesLeft(Booster::FreeSwap));
        assert_eq!(request_time_bonus(&mut state).unwrap_err(), Rejected::NoChargesLeft(Booster::TimeBonus));
        assert_eq!(state.action_count, 0);
    }

    #[test]
    fn test_free_swap_keeps_failed_swap() {
        let board = playable_board();
        let mut state = level(board.clone());
        arm_free_swap(&mut state).unwrap();

        let result = request_swap(&mut state, 7, 0, 7, 1).unwrap();
        assert_eq!(result.outcome, ActionOutcome::FreeSwap);
        assert_eq!(state.moves_left, 20);
        assert_eq!(state.inventory.free_swap, 4);
        assert!(!state.free_swap_armed);
        assert_eq!(state.board.get(Coord::new(7, 0)), board.get(Coord::new(7, 1)));
        assert_eq!(state.board.get(Coord::new(7, 1)), board.get(Coord::new(7, 0)));
    }

    #[test]
    fn test_armed_token_survives_matching_swap() {
        let mut state = level(playable_board());
        arm_free_swap(&mut state).unwrap();
        let result = request_swap(&mut state, 0, 2, 1, 2).unwrap();
        assert_eq!(result.outcome, ActionOutcome::Resolved);
        assert!(state.free_swap_armed);
        assert_eq!(state.inventory.free_swap, 5);

        disarm_free_swap(&mut state);
        assert!(!state.free_swap_armed);
    }

    /// 4x4 with no runs; the rainbow at (0, 0) stores red, (0, 1) is blue.
    fn rainbow_board() -> Board {
        let mut board = Board::from_pattern(&[
            "RBGR",
            "GRYB",
            "YGBR",
            "BYRG",
        ]);
        board.set(Coord::new(0, 0), Cell::new(Color::Red, Kind::Rainbow));
        board
    }

    #[test]
    fn test_rainbow_swap_clears_partner_color() {
        let board = rainbow_board();
        assert!(!has_match(&board));
        let blues = board.coords_of_color(Color::Blue);
        assert_eq!(blues.len(), 4);
        let mut state = level(board);

        let result = request_swap(&mut state, 0, 0, 0, 1).unwrap();
        assert_eq!(result.outcome, ActionOutcome::Resolved);

        // Only the blues: the rainbow and the natural run through it are spared
        let first = &result.steps[0];
        assert_eq!(first.chain_depth, 1);
        assert_eq!(first.cleared, 4);
        assert_eq!(first.score_delta, step_score(4, 1));
        assert!(first.promotions.is_empty());
        assert_eq!(state.moves_left, 19);
        assert_settled(&state);
    }

    #[test]
    fn test_two_rainbows_clear_each_other() {
        let mut board = rainbow_board();
        board.set(Coord::new(1, 0), Cell::new(Color::Green, Kind::Rainbow));
        let mut state = level(board);

        let result = request_swap(&mut state, 0, 0, 1, 0).unwrap();
        assert_eq!(result.outcome, ActionOutcome::Resolved);

        // The pair alone; the column run the rainbows form is left to re-detection
        let first = &result.steps[0];
        assert_eq!(first.cleared, 2);
        assert_eq!(first.score_delta, step_score(2, 1));
        assert!(first.promotions.is_empty());
        assert_eq!(state.moves_left, 19);
        assert_settled(&state);
    }

    #[test]
    fn test_paced_cascade() {
        let mut state = level(playable_board());
        begin_swap(&mut state, 0, 2, 1, 2).unwrap();
        assert_eq!(state.phase, LevelPhase::Resolving { chain_depth: 0 });

        assert_eq!(request_swap(&mut state, 7, 0, 7, 1).unwrap_err(), Rejected::Busy);
        assert_eq!(request_hint(&state).unwrap_err(), Rejected::Busy);
        assert_eq!(request_reshuffle(&mut state).unwrap_err(), Rejected::Busy);

        let mut depth = 0;
        let result = loop {
            match advance(&mut state).unwrap() {
                Progress::Step(step) => {
                    depth += 1;
                    assert_eq!(step.chain_depth, depth);
                    assert_eq!(state.phase, LevelPhase::Resolving { chain_depth: depth });
                }
                Progress::Settled(result) => break result,
            }
        };
        assert_eq!(result.chain_depth, depth);
        assert!(state.is_idle());
        assert!(advance(&mut state).is_none());
        assert_settled(&state);
    }

    #[test]
    fn test_paced_matches_direct() {
        let mut direct = level(scenario_board());
        let mut paced = level(scenario_board());

        let expected = request_swap(&mut direct, 0, 3, 1, 3).unwrap();
        begin_swap(&mut paced, 0, 3, 1, 3).unwrap();
        let result = loop {
            if let Some(Progress::Settled(result)) = advance(&mut paced) {
                break result;
            }
        };

        assert_eq!(result.total_score_delta, expected.total_score_delta);
        assert_eq!(result.board, expected.board);
        assert_eq!(paced.compute_hash(), direct.compute_hash());
    }

    #[test]
    fn test_win_on_target_and_goal() {
        let mut state = level(scenario_board());
        state.config.target_score = 300;
        state.goal.remaining = 1;

        let result = request_swap(&mut state, 0, 3, 1, 3).unwrap();
        assert_eq!(result.phase, LevelPhase::Won);
        assert!(result.events.iter().any(|e| matches!(e.data, GameEventData::LevelWon { .. })));
        assert_eq!(request_swap(&mut state, 7, 0, 7, 1).unwrap_err(), Rejected::LevelOver);
    }

    #[test]
    fn test_loss_on_last_move() {
        let mut state = level(scenario_board());
        state.moves_left = 1;

        let result = request_swap(&mut state, 0, 3, 1, 3).unwrap();
        assert_eq!(result.phase, LevelPhase::Lost(LossReason::OutOfMoves));
        assert_eq!(result.moves_left, 0);
        // Settling still leaves a playable board
        assert_settled(&state);
    }

    #[test]
    fn test_timer_expiry_when_idle() {
        let mut state = level(playable_board());
        assert_eq!(tick_timer(&mut state, 100), LevelPhase::Idle);
        assert_eq!(state.time_left, 20);

        assert_eq!(request_time_bonus(&mut state).unwrap(), 50);
        assert_eq!(tick_timer(&mut state, 60), LevelPhase::Lost(LossReason::OutOfTime));
        assert_eq!(state.time_left, 0);
        assert_eq!(request_swap(&mut state, 0, 2, 1, 2).unwrap_err(), Rejected::LevelOver);
        assert_eq!(request_hint(&state).unwrap_err(), Rejected::LevelOver);
    }

    #[test]
    fn test_timer_expiry_waits_for_cascade() {
        let mut state = level(scenario_board());
        begin_swap(&mut state, 0, 3, 1, 3).unwrap();

        let phase = tick_timer(&mut state, 500);
        assert!(matches!(phase, LevelPhase::Resolving { .. }));

        let result = loop {
            if let Some(Progress::Settled(result)) = advance(&mut state) {
                break result;
            }
        };
        assert!(result.total_score_delta > 0);
        assert_eq!(result.phase, LevelPhase::Lost(LossReason::OutOfTime));
    }

    #[test]
    fn test_hint_is_legal() {
        let mut state = level(playable_board());
        let hint = request_hint(&state).unwrap();
        let result = request_swap(
            &mut state,
            hint.from.row as i32,
            hint.from.col as i32,
            hint.to.row as i32,
            hint.to.col as i32,
        )
        .unwrap();
        assert_eq!(result.outcome, ActionOutcome::Resolved);
    }

    #[test]
    fn test_manual_reshuffle() {
        let mut state = level(playable_board());
        let counts = state.board.color_counts();
        let outcome = request_reshuffle(&mut state).unwrap();

        assert!(matches!(outcome, ReshuffleOutcome::Shuffled { .. }));
        assert_eq!(state.board.color_counts(), counts);
        assert_settled(&state);
        let events = state.take_events();
        assert!(matches!(events[0].data, GameEventData::BoardReshuffled { manual: true, .. }));
    }

    #[test]
    fn test_events_reported_and_queued() {
        let mut state = level(scenario_board());
        let result = request_swap(&mut state, 0, 3, 1, 3).unwrap();

        assert!(matches!(result.events[0].data, GameEventData::SwapApplied { .. }));
        assert!(result
            .events
            .iter()
            .any(|e| matches!(e.data, GameEventData::SpecialCreated { kind: Kind::StripedH, .. })));
        assert_eq!(state.take_events().len(), result.events.len());
    }

    #[test]
    fn test_start_level_validates() {
        let config = LevelConfig { move_budget: 0, ..LevelConfig::default() };
        assert!(matches!(start_level(config, 1), Err(ConfigError::ZeroMoveBudget)));

        let state = start_level(LevelConfig::standard(3, Color::Green), 1).unwrap();
        assert_eq!(state.goal, GoalState::new(Color::Green, 21));
        assert_settled(&state);
    }

    #[test]
    fn test_replay_determinism() {
        let play = |seed: u64| {
            let mut state = start_level(LevelConfig::default(), seed).unwrap();
            for _ in 0..8 {
                let Ok(hint) = request_hint(&state) else { break };
                let _ = request_swap(
                    &mut state,
                    hint.from.row as i32,
                    hint.from.col as i32,
                    hint.to.row as i32,
                    hint.to.col as i32,
                );
            }
            let _ = request_area_blast(&mut state, 3, 3);
            state.compute_hash()
        };

        assert_eq!(play(2024), play(2024));
        assert_ne!(play(2024), play(2025));
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(48))]

        #[test]
        fn prop_settled_after_every_request(
            seed in any::<u64>(),
            actions in prop::collection::vec((0i32..8, 0i32..8, 0u8..4), 1..12),
        ) {
            let mut state = start_level(LevelConfig::default(), seed).unwrap();

            for (row, col, kind) in actions {
                let before = state.score;
                let outcome = match kind {
                    0 => request_swap(&mut state, row, col, row, col + 1),
                    1 => request_swap(&mut state, row, col, row + 1, col),
                    2 => request_area_blast(&mut state, row, col),
                    _ => request_color_clear(&mut state, Color::ALL[(row as usize + col as usize) % 6]),
                };

                let Ok(result) = outcome else { continue };
                prop_assert!(state.board.is_full());
                prop_assert!(!has_match(&state.board));
                prop_assert!(has_any_legal_move(&state.board));

                let expected: u64 = result
                    .steps
                    .iter()
                    .enumerate()
                    .map(|(i, s)| step_score(s.cleared, i as u32 + 1))
                    .sum();
                prop_assert_eq!(result.total_score_delta, expected);
                prop_assert_eq!(state.score, before + result.total_score_delta + result.booster_bonus);
                prop_assert_eq!(result.chain_depth as usize, result.steps.len());

                if state.is_over() {
                    break;
                }
            }
        }
    }
}
