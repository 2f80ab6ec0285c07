//! Level State
//!
//! Everything that changes while a level is played. A `LevelState` is
//! created per level start, mutated in place by the functions in
//! [`crate::game::actions`], and dropped at level end.

use serde::{de::Error as _, Deserialize, Deserializer, Serialize};

use crate::core::rng::DeterministicRng;
use crate::core::hash::{StateHash, StateHasher, compute_state_hash};
use crate::game::actions::Cascade;
use crate::game::board::{Board, BoardSnapshot};
use crate::game::config::{Inventory, LevelConfig};
use crate::game::events::GameEvent;
use crate::game::resolve::GoalState;

/// Why a level was lost.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum LossReason {
    /// Move budget spent without reaching the target
    OutOfMoves = 0,
    /// Countdown hit zero
    OutOfTime = 1,
}

/// Level state machine.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[derive(Default)]
pub enum LevelPhase {
    /// Waiting for input
    #[default]
    Idle,
    /// A cascade is pending; other requests are rejected
    Resolving {
        /// Depth of the last completed chain step (0 before the first)
        chain_depth: u32,
    },
    /// Target score and goal reached
    Won,
    /// Level over
    Lost(LossReason),
}

impl LevelPhase {
    /// Has the level ended?
    #[inline]
    pub fn is_over(self) -> bool {
        matches!(self, LevelPhase::Won | LevelPhase::Lost(_))
    }

    fn hash_tag(self) -> (u8, u32) {
        match self {
            LevelPhase::Idle => (0, 0),
            LevelPhase::Resolving { chain_depth } => (1, chain_depth),
            LevelPhase::Won => (2, 0),
            LevelPhase::Lost(reason) => (3, reason as u32),
        }
    }
}

/// Complete state of one level.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LevelState {
    /// Level parameters (validated)
    pub config: LevelConfig,

    /// RNG seed (for verification)
    pub rng_seed: u64,

    /// Deterministic RNG state
    #[serde(skip)]
    pub rng: DeterministicRng,

    /// The tile grid
    pub board: Board,

    /// Current phase. Only settled states can be restored: the pending
    /// cascade is not serialized.
    #[serde(deserialize_with = "settled_phase")]
    pub phase: LevelPhase,

    /// Accumulated score (cascades and booster bonuses)
    pub score: u64,

    /// Swaps left
    pub moves_left: u32,

    /// Countdown seconds left
    pub time_left: u32,

    /// Color goal progress
    pub goal: GoalState,

    /// Booster charges left
    pub inventory: Inventory,

    /// Is a free-swap token waiting for the next failing swap?
    pub free_swap_armed: bool,

    /// Accepted actions so far (monotonic counter)
    pub action_count: u32,

    /// Countdown reached zero while a cascade was pending
    pub time_expired: bool,

    /// Cascade being paced by `advance`
    #[serde(skip)]
    pub(crate) cascade: Option<Cascade>,

    /// Events not yet taken by the caller
    #[serde(skip)]
    pub pending_events: Vec<GameEvent>,
}

impl LevelState {
    /// Create a level with a freshly generated board.
    ///
    /// Assumes `config` has been validated; use
    /// [`start_level`](crate::game::actions::start_level) from outside.
    pub fn new(config: LevelConfig, rng_seed: u64) -> Self {
        let mut rng = DeterministicRng::new(rng_seed);
        let board = Board::random(config.rows, config.cols, &config.colors, &mut rng);
        Self::with_rng(config, rng_seed, rng, board)
    }

    /// Create a level around a given board (puzzles, tests, tools).
    ///
    /// The board's dimensions replace the config's. The board is used as
    /// is: it should be full, match-free and have a legal move.
    pub fn with_board(mut config: LevelConfig, rng_seed: u64, board: Board) -> Self {
        config.rows = board.rows();
        config.cols = board.cols();
        Self::with_rng(config, rng_seed, DeterministicRng::new(rng_seed), board)
    }

    fn with_rng(config: LevelConfig, rng_seed: u64, rng: DeterministicRng, board: Board) -> Self {
        Self {
            rng_seed,
            rng,
            board,
            phase: LevelPhase::Idle,
            score: 0,
            moves_left: config.move_budget,
            time_left: config.time_budget_seconds,
            goal: GoalState::new(config.goal_color, config.goal_count),
            inventory: config.boosters,
            free_swap_armed: false,
            action_count: 0,
            time_expired: false,
            cascade: None,
            pending_events: Vec::new(),
            config,
        }
    }

    /// Is the level waiting for input?
    #[inline]
    pub fn is_idle(&self) -> bool {
        self.phase == LevelPhase::Idle
    }

    /// Has the level ended?
    #[inline]
    pub fn is_over(&self) -> bool {
        self.phase.is_over()
    }

    /// Copy of the current board.
    ///
    /// # Panics
    ///
    /// Panics mid-cascade, while the board has holes.
    pub fn snapshot(&self) -> BoardSnapshot {
        self.board.snapshot()
    }

    /// Compute state hash for verification.
    pub fn compute_hash(&self) -> StateHash {
        compute_state_hash(self.action_count, self.rng_seed, |hasher| {
            hash_board(&self.board, hasher);

            hasher.update_u64(self.score);
            hasher.update_u32(self.moves_left);
            hasher.update_u32(self.time_left);
            hasher.update_bool(self.time_expired);

            hasher.update_u8(self.goal.target_color as u8);
            hasher.update_u32(self.goal.remaining);

            hasher.update_u32(self.inventory.area_blast);
            hasher.update_u32(self.inventory.color_clear);
            hasher.update_u32(self.inventory.free_swap);
            hasher.update_u32(self.inventory.time_bonus);
            hasher.update_bool(self.free_swap_armed);

            let (tag, detail) = self.phase.hash_tag();
            hasher.update_u8(tag);
            hasher.update_u32(detail);

            // RNG position, so future refills are covered too
            let [s0, s1] = self.rng.state();
            hasher.update_u64(s0);
            hasher.update_u64(s1);
        })
    }

    /// Take pending events (clears the queue).
    pub fn take_events(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.pending_events)
    }

    /// Push a game event.
    pub fn push_event(&mut self, event: GameEvent) {
        self.pending_events.push(event);
    }
}

fn settled_phase<'de, D: Deserializer<'de>>(deserializer: D) -> Result<LevelPhase, D::Error> {
    match LevelPhase::deserialize(deserializer)? {
        LevelPhase::Resolving { chain_depth } => Err(D::Error::custom(format!(
            "level state saved mid-cascade (chain depth {})",
            chain_depth
        ))),
        phase => Ok(phase),
    }
}

fn hash_board(board: &Board, hasher: &mut StateHasher) {
    hasher.update_u32(board.rows() as u32);
    hasher.update_u32(board.cols() as u32);
    for coord in board.coords() {
        match board.get(coord) {
            Some(cell) => {
                hasher.update_bool(true);
                hasher.update_u8(cell.color as u8);
                hasher.update_u8(cell.kind as u8);
            }
            None => hasher.update_bool(false),
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
