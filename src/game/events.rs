//! Game Events
//!
//! Events recorded while an action resolves, for the presentation layer and
//! for replay verification.

use serde::{Serialize, Deserialize};

use crate::game::board::{Coord, Kind};
use crate::game::config::Booster;
use crate::game::reshuffle::ReshuffleOutcome;
use crate::game::state::LossReason;

/// Ordering of events raised within the same action and chain depth.
///
/// Lower value = reported first.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(u8)]
pub enum EventPriority {
    /// The player's input (swap, booster)
    Input = 0,
    /// Cells leaving the board
    Clear = 1,
    /// Specials created by the clear
    Promotion = 2,
    /// Board rearranged after settling
    Board = 3,
    /// Level won or lost
    Outcome = 4,
    /// Everything else
    Other = 255,
}

/// Game event data.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameEventData {
    /// A swap produced matches and was kept
    SwapApplied {
        from: Coord,
        to: Coord,
    },

    /// A swap produced nothing and was undone
    SwapReverted {
        from: Coord,
        to: Coord,
    },

    /// A swap produced nothing but a free-swap token let it stand
    FreeSwapUsed {
        from: Coord,
        to: Coord,
    },

    /// A booster charge was spent
    BoosterUsed {
        booster: Booster,
        cells: u32,
        bonus: u64,
    },

    /// One cascade step cleared cells
    ChainStepCleared {
        cleared: u32,
        score_delta: u64,
        score: u64,
    },

    /// A cell was promoted to a special
    SpecialCreated {
        coord: Coord,
        kind: Kind,
    },

    /// The board was rearranged
    BoardReshuffled {
        outcome: ReshuffleOutcome,
        manual: bool,
    },

    /// Time was added to the countdown
    TimeBonus {
        seconds: u32,
        time_left: u32,
    },

    /// Target score and goal reached
    LevelWon {
        score: u64,
        moves_left: u32,
    },

    /// Level ended without reaching the target
    LevelLost {
        reason: LossReason,
        score: u64,
    },
}

/// A game event with its position in the action log.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GameEvent {
    /// Action counter when the event occurred
    pub action: u32,

    /// Cascade depth (0 before the first chain step)
    pub chain_depth: u32,

    /// Reporting priority
    pub priority: EventPriority,

    /// Event data
    pub data: GameEventData,
}

impl GameEvent {
    /// Create a new event.
    pub fn new(action: u32, chain_depth: u32, priority: EventPriority, data: GameEventData) -> Self {
        Self {
            action,
            chain_depth,
            priority,
            data,
        }
    }

    /// Create swap applied event.
    pub fn swap_applied(action: u32, from: Coord, to: Coord) -> Self {
        Self::new(action, 0, EventPriority::Input, GameEventData::SwapApplied { from, to })
    }

    /// Create swap reverted event.
    pub fn swap_reverted(action: u32, from: Coord, to: Coord) -> Self {
        Self::new(action, 0, EventPriority::Input, GameEventData::SwapReverted { from, to })
    }

    /// Create free swap used event.
    pub fn free_swap_used(action: u32, from: Coord, to: Coord) -> Self {
        Self::new(action, 0, EventPriority::Input, GameEventData::FreeSwapUsed { from, to })
    }

    /// Create booster used event.
    pub fn booster_used(action: u32, booster: Booster, cells: u32, bonus: u64) -> Self {
        Self::new(
            action,
            0,
            EventPriority::Input,
            GameEventData::BoosterUsed { booster, cells, bonus },
        )
    }

    /// Create chain step event.
    pub fn chain_step_cleared(action: u32, chain_depth: u32, cleared: u32, score_delta: u64, score: u64) -> Self {
        Self::new(
            action,
            chain_depth,
            EventPriority::Clear,
            GameEventData::ChainStepCleared {
                cleared,
                score_delta,
                score,
            },
        )
    }

    /// Create special created event.
    pub fn special_created(action: u32, chain_depth: u32, coord: Coord, kind: Kind) -> Self {
        Self::new(
            action,
            chain_depth,
            EventPriority::Promotion,
            GameEventData::SpecialCreated { coord, kind },
        )
    }

    /// Create board reshuffled event.
    pub fn board_reshuffled(action: u32, chain_depth: u32, outcome: ReshuffleOutcome, manual: bool) -> Self {
        Self::new(
            action,
            chain_depth,
            EventPriority::Board,
            GameEventData::BoardReshuffled { outcome, manual },
        )
    }

    /// Create time bonus event.
    pub fn time_bonus(action: u32, seconds: u32, time_left: u32) -> Self {
        Self::new(action, 0, EventPriority::Other, GameEventData::TimeBonus { seconds, time_left })
    }

    /// Create level won event.
    pub fn level_won(action: u32, chain_depth: u32, score: u64, moves_left: u32) -> Self {
        Self::new(
            action,
            chain_depth,
            EventPriority::Outcome,
            GameEventData::LevelWon { score, moves_left },
        )
    }

    /// Create level lost event.
    pub fn level_lost(action: u32, chain_depth: u32, reason: LossReason, score: u64) -> Self {
        Self::new(
            action,
            chain_depth,
            EventPriority::Outcome,
            GameEventData::LevelLost { reason, score },
        )
    }
}

impl PartialEq for GameEvent {
    fn eq(&self, other: &Self) -> bool {
        self.action == other.action
            && self.chain_depth == other.chain_depth
            && self.priority == other.priority
    }
}

impl Eq for GameEvent {}

impl PartialOrd for GameEvent {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for GameEvent {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        // Sort by: action, then chain depth, then priority
        self.action
            .cmp(&other.action)
            .then(self.chain_depth.cmp(&other.chain_depth))
            .then(self.priority.cmp(&other.priority))
    }
}
