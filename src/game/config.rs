//! Level Configuration
//!
//! Everything a level needs before the first board is drawn. Configs are
//! plain serde structs; missing JSON fields fall back to [`LevelConfig::default`].

use std::collections::BTreeSet;

use serde::{Serialize, Deserialize};

use crate::game::board::Color;

/// Smallest supported board dimension. A reshuffle needs room for a move.
pub const MIN_BOARD_DIM: usize = 3;

/// Largest supported board dimension.
pub const MAX_BOARD_DIM: usize = 32;

// =============================================================================
// BOOSTERS
// =============================================================================

/// Player-activated power-ups.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum Booster {
    /// Clears a 3x3 neighborhood
    AreaBlast = 0,
    /// Clears every tile of one color
    ColorClear = 1,
    /// Lets a non-matching swap stand
    FreeSwap = 2,
    /// Adds time to the countdown
    TimeBonus = 3,
}

impl std::fmt::Display for Booster {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Booster::AreaBlast => "area blast",
            Booster::ColorClear => "color clear",
            Booster::FreeSwap => "free swap",
            Booster::TimeBonus => "time bonus",
        };
        f.write_str(name)
    }
}

/// Remaining booster charges.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Inventory {
    /// Area blast charges
    pub area_blast: u32,
    /// Color clear charges
    pub color_clear: u32,
    /// Free swap tokens
    pub free_swap: u32,
    /// Time bonus charges
    pub time_bonus: u32,
}

impl Default for Inventory {
    fn default() -> Self {
        Self {
            area_blast: 3,
            color_clear: 2,
            free_swap: 5,
            time_bonus: 2,
        }
    }
}

impl Inventory {
    /// Charges left for `booster`.
    pub fn charges(&self, booster: Booster) -> u32 {
        match booster {
            Booster::AreaBlast => self.area_blast,
            Booster::ColorClear => self.color_clear,
            Booster::FreeSwap => self.free_swap,
            Booster::TimeBonus => self.time_bonus,
        }
    }

    fn slot(&mut self, booster: Booster) -> &mut u32 {
        match booster {
            Booster::AreaBlast => &mut self.area_blast,
            Booster::ColorClear => &mut self.color_clear,
            Booster::FreeSwap => &mut self.free_swap,
            Booster::TimeBonus => &mut self.time_bonus,
        }
    }

    /// Spend one charge. Returns false (and spends nothing) when empty.
    pub fn spend(&mut self, booster: Booster) -> bool {
        let slot = self.slot(booster);
        if *slot == 0 {
            return false;
        }
        *slot -= 1;
        true
    }
}

// =============================================================================
// LEVEL CONFIG
// =============================================================================

/// Parameters of one level.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LevelConfig {
    /// Board height
    pub rows: usize,
    /// Board width
    pub cols: usize,
    /// Colors tiles are drawn from
    pub colors: Vec<Color>,
    /// Score needed to win
    pub target_score: u64,
    /// Swaps allowed
    pub move_budget: u32,
    /// Countdown length in seconds
    pub time_budget_seconds: u32,
    /// Color whose clears count toward the goal
    pub goal_color: Color,
    /// Clears of `goal_color` needed to win
    pub goal_count: u32,
    /// Starting booster charges
    pub boosters: Inventory,
}

impl Default for LevelConfig {
    fn default() -> Self {
        Self {
            rows: 8,
            cols: 8,
            colors: Color::ALL.to_vec(),
            target_score: 5000,
            move_budget: 20,
            time_budget_seconds: 120,
            goal_color: Color::Blue,
            goal_count: 20,
            boosters: Inventory::default(),
        }
    }
}

impl LevelConfig {
    /// Campaign defaults for `level`: goal count grows by 3 every two levels.
    pub fn standard(level: u32, goal_color: Color) -> Self {
        Self {
            goal_color,
            goal_count: 18 + (level / 2) * 3,
            ..Self::default()
        }
    }

    /// Parse a config from JSON. Does not validate.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Serialize to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Check the config can produce a playable level.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.colors.len() < 2 {
            return Err(ConfigError::TooFewColors(self.colors.len()));
        }
        let mut seen = BTreeSet::new();
        for &color in &self.colors {
            if !seen.insert(color) {
                return Err(ConfigError::DuplicateColor(color));
            }
        }
        if self.rows < MIN_BOARD_DIM || self.cols < MIN_BOARD_DIM {
            return Err(ConfigError::BoardTooSmall { rows: self.rows, cols: self.cols });
        }
        if self.rows > MAX_BOARD_DIM || self.cols > MAX_BOARD_DIM {
            return Err(ConfigError::BoardTooLarge { rows: self.rows, cols: self.cols });
        }
        if !seen.contains(&self.goal_color) {
            return Err(ConfigError::GoalColorNotInPalette(self.goal_color));
        }
        if self.move_budget == 0 {
            return Err(ConfigError::ZeroMoveBudget);
        }
        Ok(())
    }
}

/// Invalid level configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Matching needs at least two colors.
    #[error("palette has {0} color(s), need at least 2")]
    TooFewColors(usize),

    /// A color is listed twice.
    #[error("color {0:?} appears twice in the palette")]
    DuplicateColor(Color),

    /// Board below the minimum size.
    #[error("board {rows}x{cols} is smaller than {min}x{min}", min = MIN_BOARD_DIM)]
    BoardTooSmall {
        /// Requested rows
        rows: usize,
        /// Requested columns
        cols: usize,
    },

    /// Board above the maximum size.
    #[error("board {rows}x{cols} is larger than {max}x{max}", max = MAX_BOARD_DIM)]
    BoardTooLarge {
        /// Requested rows
        rows: usize,
        /// Requested columns
        cols: usize,
    },

    /// Goal color can never appear.
    #[error("goal color {0:?} is not in the palette")]
    GoalColorNotInPalette(Color),

    /// A level with no moves is lost before it starts.
    #[error("move budget must be at least 1")]
    ZeroMoveBudget,

    /// Malformed JSON.
    #[error("invalid config JSON: {0}")]
    Json(#[from] serde_json::Error),
}

// =============================================================================
// TESTS
// =============================================================================
