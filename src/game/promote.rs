//! Special Tile Promotion
//!
//! Before a group is cleared, at most one of its cells is upgraded in place
//! and survives the clear. Rules are checked in priority order:
//!
//! | Shape                         | Special   | Cell                 |
//! |-------------------------------|-----------|----------------------|
//! | straight line of 5+           | Rainbow   | median of the line   |
//! | row run crossing a column run | Wrapped   | first crossing cell  |
//! | straight line of exactly 4    | Striped   | second cell in line  |
//!
//! Groups of 3 (and any other shape) get nothing.

use serde::{Serialize, Deserialize};

use crate::core::rng::DeterministicRng;
use crate::game::board::{Board, Cell, Color, Coord, Kind};
use crate::game::matcher::{MatchGroup, Orientation};

/// One upgraded cell.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Promotion {
    /// Where the special was created
    pub coord: Coord,
    /// What it became
    pub kind: Kind,
}

/// Decide which cell of `group` to promote, if any. Does not touch the board.
pub fn classify(group: &MatchGroup) -> Option<Promotion> {
    let orientation = group.line_orientation();
    let line: Vec<Coord> = group.cells.iter().copied().collect();

    if line.len() >= 5 && orientation.is_some() {
        return Some(Promotion {
            coord: line[line.len() / 2],
            kind: Kind::Rainbow,
        });
    }

    if let Some(&coord) = group.overlaps.first() {
        return Some(Promotion {
            coord,
            kind: Kind::Wrapped,
        });
    }

    match orientation {
        Some(orientation) if line.len() == 4 => Some(Promotion {
            coord: line[1],
            kind: match orientation {
                Orientation::Horizontal => Kind::StripedH,
                Orientation::Vertical => Kind::StripedV,
            },
        }),
        _ => None,
    }
}

/// Upgrade one cell per qualifying group. Returns the promotions applied;
/// their coordinates must be spared by the following clear.
///
/// Rainbow tiles get a fresh random palette color (cosmetic only); other
/// specials keep the color of the cell they replace.
pub fn promote_specials(
    board: &mut Board,
    groups: &[MatchGroup],
    palette: &[Color],
    rng: &mut DeterministicRng,
) -> Vec<Promotion> {
    let mut promotions = Vec::new();

    for group in groups {
        let Some(promotion) = classify(group) else {
            continue;
        };
        let Some(current) = board.get(promotion.coord).copied() else {
            continue;
        };

        let color = if promotion.kind == Kind::Rainbow {
            rng.choose(palette).copied().unwrap_or(current.color)
        } else {
            current.color
        };
        board.set(promotion.coord, Cell::new(color, promotion.kind));
        promotions.push(promotion);
    }

    promotions
}

// =============================================================================
// TESTS
// =============================================================================
