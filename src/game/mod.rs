//! Game Logic Module
//!
//! Board model and resolution engine. 100% deterministic.
//!
//! ## Module Structure
//!
//! - `board`: Colors, cells, coordinates, the tile grid
//! - `matcher`: Run detection and merging into match groups
//! - `promote`: Special tile creation from group shapes
//! - `resolve`: Chain steps (clear, score, collapse, refill)
//! - `moves`: Legal-move oracle and hints
//! - `reshuffle`: Deadlock recovery
//! - `config`: Level parameters and booster inventory
//! - `state`: Level state and hashing
//! - `actions`: Request surface and cascade state machine
//! - `events`: Game events for presentation and replay

pub mod board;
pub mod matcher;
pub mod promote;
pub mod resolve;
pub mod moves;
pub mod reshuffle;
pub mod config;
pub mod state;
pub mod actions;
pub mod events;

// Re-export key types
pub use board::{Board, BoardSnapshot, Cell, Color, Coord, Kind};
pub use matcher::{find_matches, MatchGroup};
pub use moves::Move;
pub use reshuffle::ReshuffleOutcome;
pub use resolve::{ChainStep, GoalState};
pub use config::{Booster, ConfigError, Inventory, LevelConfig};
pub use state::{LevelPhase, LevelState, LossReason};
pub use actions::{ActionKind, ActionOutcome, Progress, Rejected, ResolutionResult};
pub use events::GameEvent;
