//! # Tile Cascade
//!
//! Deterministic match-3 resolution engine: swap validation, run detection,
//! special tile promotion, cascading clears with chain scoring, deadlock
//! detection and reshuffling.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      TILE CASCADE                            │
//! ├─────────────────────────────────────────────────────────────┤
//! │  core/           - Deterministic primitives                  │
//! │  ├── rng.rs      - Deterministic Xorshift128+ PRNG           │
//! │  └── hash.rs     - State hashing for verification            │
//! │                                                              │
//! │  game/           - Engine (deterministic)                    │
//! │  ├── board.rs    - Grid model                                │
//! │  ├── matcher.rs  - Match detection and merging               │
//! │  ├── promote.rs  - Special tile promotion                    │
//! │  ├── resolve.rs  - Chain steps and scoring                   │
//! │  ├── moves.rs    - Move-availability oracle                  │
//! │  ├── reshuffle.rs- Deadlock recovery                         │
//! │  ├── config.rs   - Level parameters, boosters                │
//! │  ├── state.rs    - Level state                               │
//! │  ├── actions.rs  - Requests and the cascade state machine    │
//! │  └── events.rs   - Events for presentation and replay        │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Determinism Guarantee
//!
//! Given the same level config, seed and sequence of requests, the engine
//! produces **identical boards, scores and state hashes**:
//! - No floating-point arithmetic
//! - No HashMap (uses BTreeMap/BTreeSet for sorted iteration)
//! - No system time dependencies; the countdown is driven by the caller
//! - All randomness from seeded Xorshift128+
//!
//! ## Example
//!
//! ```
//! use tile_cascade::game::{actions, LevelConfig};
//!
//! let mut level = actions::start_level(LevelConfig::default(), 7).unwrap();
//! let hint = actions::request_hint(&level).unwrap();
//! let result = actions::request_swap(
//!     &mut level,
//!     hint.from.row as i32,
//!     hint.from.col as i32,
//!     hint.to.row as i32,
//!     hint.to.col as i32,
//! )
//! .unwrap();
//! assert!(result.total_score_delta > 0);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod core;
pub mod game;

// Re-export commonly used types
pub use crate::core::rng::{derive_level_seed, DeterministicRng};
pub use game::actions::{
    advance, request_area_blast, request_color_clear, request_hint, request_swap, start_level,
};
pub use game::board::{Board, Cell, Color, Coord, Kind};
pub use game::config::LevelConfig;
pub use game::state::{LevelPhase, LevelState};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
