//! Tile Cascade demo runner
//!
//! Plays one level by following hints, logs every event, then replays the
//! same inputs and checks the state hash matches.
//!
//! Usage: `tile-cascade [config.json] [seed]`

use std::path::Path;

use anyhow::{Context, Result};
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use tile_cascade::{
    VERSION,
    core::rng::derive_level_seed,
    game::{
        actions::{self, Progress},
        events::GameEventData,
        LevelConfig, LevelState,
    },
};

/// Seconds the demo player "thinks" between moves.
const SECONDS_PER_MOVE: u32 = 4;

/// Recorded input, replayed for the determinism check.
#[derive(Clone, Copy, Debug)]
enum Input {
    Swap(i32, i32, i32, i32),
    AreaBlast(i32, i32),
    Tick(u32),
}

fn main() -> Result<()> {
    // Initialize logging
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = FmtSubscriber::builder().with_env_filter(filter).finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("failed to set tracing subscriber")?;

    info!("Tile Cascade v{}", VERSION);

    let mut args = std::env::args().skip(1);
    let config = match args.next() {
        Some(path) => load_config(Path::new(&path))?,
        None => LevelConfig::standard(1, tile_cascade::Color::Blue),
    };
    let seed = match args.next() {
        Some(raw) => raw.parse::<u64>().with_context(|| format!("invalid seed {:?}", raw))?,
        None => derive_level_seed(12345, 1),
    };

    demo_level(config, seed)
}

fn load_config(path: &Path) -> Result<LevelConfig> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config {}", path.display()))?;
    let config = LevelConfig::from_json(&json)
        .with_context(|| format!("failed to parse config {}", path.display()))?;
    Ok(config)
}

/// Play a level by hints and verify the replay.
fn demo_level(config: LevelConfig, seed: u64) -> Result<()> {
    info!("=== Starting Demo Level ===");
    info!("Seed: {}", seed);

    let mut state = actions::start_level(config.clone(), seed).context("invalid level config")?;
    for line in state.board.to_pattern() {
        info!("  {}", line);
    }

    let mut inputs = Vec::new();
    let mut blast_used = false;

    while !state.is_over() {
        let hint = match actions::request_hint(&state) {
            Ok(hint) => hint,
            Err(err) => {
                warn!("no hint: {}", err);
                break;
            }
        };

        // Spend one area blast halfway through, paced step by step
        if !blast_used && state.moves_left <= state.config.move_budget / 2 {
            blast_used = true;
            let (row, col) = (state.config.rows as i32 / 2, state.config.cols as i32 / 2);
            if actions::begin_area_blast(&mut state, row, col).is_ok() {
                inputs.push(Input::AreaBlast(row, col));
                while let Some(progress) = actions::advance(&mut state) {
                    match progress {
                        Progress::Step(step) => {
                            info!("  blast chain {}: {} cleared, +{}", step.chain_depth, step.cleared, step.score_delta);
                        }
                        Progress::Settled(result) => {
                            info!("Area blast settled: bonus {}, depth {}", result.booster_bonus, result.chain_depth);
                        }
                    }
                }
                continue;
            }
        }

        let swap = (
            hint.from.row as i32,
            hint.from.col as i32,
            hint.to.row as i32,
            hint.to.col as i32,
        );
        inputs.push(Input::Swap(swap.0, swap.1, swap.2, swap.3));
        let result = actions::request_swap(&mut state, swap.0, swap.1, swap.2, swap.3)
            .context("hinted swap rejected")?;
        info!(
            "Swap {} <-> {}: {:?}, +{} over {} step(s), {} moves left",
            hint.from, hint.to, result.outcome, result.total_score_delta, result.chain_depth, result.moves_left
        );

        for event in &result.events {
            match &event.data {
                GameEventData::SpecialCreated { coord, kind } => {
                    info!("  special {:?} at {}", kind, coord);
                }
                GameEventData::BoardReshuffled { outcome, .. } => {
                    info!("  board reshuffled: {:?}", outcome);
                }
                GameEventData::LevelWon { score, moves_left } => {
                    info!("Level won! Score {} with {} moves left", score, moves_left);
                }
                GameEventData::LevelLost { reason, score } => {
                    info!("Level lost ({:?}) with score {}", reason, score);
                }
                _ => {}
            }
        }

        inputs.push(Input::Tick(SECONDS_PER_MOVE));
        actions::tick_timer(&mut state, SECONDS_PER_MOVE);
    }

    // Print final results
    info!("=== Level Results ===");
    info!("Phase: {:?}", state.phase);
    info!("Score: {} / {}", state.score, state.config.target_score);
    info!("Goal: {} {:?} remaining", state.goal.remaining, state.goal.target_color);
    info!("Total events: {}", state.take_events().len());
    let hash = state.compute_hash();
    info!("Final State Hash: {}", hex::encode(hash));

    // Verify determinism by replaying
    info!("=== Verifying Determinism ===");
    let replay = replay(config, seed, &inputs)?;
    let replay_hash = replay.compute_hash();
    info!("Replay State Hash: {}", hex::encode(replay_hash));

    if hash == replay_hash {
        info!("DETERMINISM VERIFIED: Hashes match!");
    } else {
        warn!("DETERMINISM FAILURE: Hashes differ!");
    }
    Ok(())
}

fn replay(config: LevelConfig, seed: u64, inputs: &[Input]) -> Result<LevelState> {
    let mut state = actions::start_level(config, seed).context("invalid level config")?;
    for input in inputs {
        match *input {
            Input::Swap(r1, c1, r2, c2) => {
                actions::request_swap(&mut state, r1, c1, r2, c2).context("replayed swap rejected")?;
            }
            Input::AreaBlast(row, col) => {
                actions::request_area_blast(&mut state, row, col).context("replayed blast rejected")?;
            }
            Input::Tick(seconds) => {
                actions::tick_timer(&mut state, seconds);
            }
        }
    }
    Ok(state)
}
