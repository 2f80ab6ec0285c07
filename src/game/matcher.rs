//! Match Detection
//!
//! Two phases:
//! 1. Independent row and column scans emit every run of 3+ compatible cells.
//! 2. Runs sharing a coordinate are merged into one group, so an L, T or plus
//!    shape is cleared and scored once instead of twice.
//!
//! Coordinates that belonged to two runs before merging are kept as the
//! group's `overlaps`; the promoter turns one of them into a wrapped tile.

use std::collections::BTreeSet;

use crate::game::board::{Board, Coord};

/// Minimum run length that clears.
pub const MIN_RUN: usize = 3;

/// Orientation of a straight run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Orientation {
    /// Along a row
    Horizontal,
    /// Along a column
    Vertical,
}

/// A contiguous straight run of 3+ compatible cells.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Run {
    /// First coordinate (leftmost / topmost)
    pub start: Coord,
    /// Number of cells
    pub len: usize,
    /// Direction of the run
    pub orientation: Orientation,
}

impl Run {
    /// Coordinates covered, in line order.
    pub fn coords(&self) -> impl Iterator<Item = Coord> + '_ {
        (0..self.len).map(move |i| match self.orientation {
            Orientation::Horizontal => Coord::new(self.start.row, self.start.col + i),
            Orientation::Vertical => Coord::new(self.start.row + i, self.start.col),
        })
    }
}

/// A connected set of coordinates cleared together.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MatchGroup {
    /// Every coordinate in the group (row-major order)
    pub cells: BTreeSet<Coord>,
    /// Coordinates counted by two or more of the merged runs
    pub overlaps: BTreeSet<Coord>,
}

impl MatchGroup {
    /// Build a synthetic group (boosters, rainbow swaps). No overlaps.
    pub fn synthetic<I: IntoIterator<Item = Coord>>(coords: I) -> Self {
        Self {
            cells: coords.into_iter().collect(),
            overlaps: BTreeSet::new(),
        }
    }

    /// Number of coordinates.
    #[inline]
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// Is the group empty?
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Does the group contain `coord`?
    #[inline]
    pub fn contains(&self, coord: &Coord) -> bool {
        self.cells.contains(coord)
    }

    /// If every coordinate lies on one row or one column, its orientation.
    ///
    /// A single cell counts as horizontal.
    pub fn line_orientation(&self) -> Option<Orientation> {
        let first = self.cells.first()?;
        if self.cells.iter().all(|c| c.row == first.row) {
            Some(Orientation::Horizontal)
        } else if self.cells.iter().all(|c| c.col == first.col) {
            Some(Orientation::Vertical)
        } else {
            None
        }
    }
}

/// Scan rows and columns for runs of 3+ compatible cells.
pub fn find_runs(board: &Board) -> Vec<Run> {
    let mut runs = Vec::new();

    for row in 0..board.rows() {
        scan_line(board, Orientation::Horizontal, row, board.cols(), &mut runs);
    }
    for col in 0..board.cols() {
        scan_line(board, Orientation::Vertical, col, board.rows(), &mut runs);
    }

    runs
}

fn scan_line(board: &Board, orientation: Orientation, line: usize, len: usize, runs: &mut Vec<Run>) {
    let at = |i: usize| match orientation {
        Orientation::Horizontal => Coord::new(line, i),
        Orientation::Vertical => Coord::new(i, line),
    };

    let mut run_start = 0;
    for i in 1..=len {
        let continues = i < len && board.compatible(at(i - 1), at(i));
        if continues {
            continue;
        }
        let run_len = i - run_start;
        // A lone empty slot is a "run" of length 1 and never reaches MIN_RUN
        if run_len >= MIN_RUN {
            runs.push(Run {
                start: at(run_start),
                len: run_len,
                orientation,
            });
        }
        run_start = i;
    }
}

/// Merge runs that share a coordinate into connected groups.
///
/// Fixed-point absorption: a component keeps absorbing any unused run that
/// intersects it until a full pass absorbs nothing.
pub fn merge_runs(runs: &[Run]) -> Vec<MatchGroup> {
    let run_sets: Vec<BTreeSet<Coord>> = runs.iter().map(|r| r.coords().collect()).collect();
    let mut used = vec![false; run_sets.len()];
    let mut groups = Vec::new();

    for i in 0..run_sets.len() {
        if used[i] {
            continue;
        }
        used[i] = true;
        let mut cells = run_sets[i].clone();
        let mut members = vec![i];

        let mut changed = true;
        while changed {
            changed = false;
            for j in 0..run_sets.len() {
                if used[j] || run_sets[j].is_disjoint(&cells) {
                    continue;
                }
                cells.extend(run_sets[j].iter().copied());
                used[j] = true;
                members.push(j);
                changed = true;
            }
        }

        let mut seen = BTreeSet::new();
        let mut overlaps = BTreeSet::new();
        for &m in &members {
            for &coord in &run_sets[m] {
                if !seen.insert(coord) {
                    overlaps.insert(coord);
                }
            }
        }

        groups.push(MatchGroup { cells, overlaps });
    }

    groups
}

/// Find every match group on the board.
pub fn find_matches(board: &Board) -> Vec<MatchGroup> {
    merge_runs(&find_runs(board))
}

/// Does the board contain at least one run? Stops at the first one.
pub fn has_match(board: &Board) -> bool {
    let rows = board.rows();
    let cols = board.cols();

    for row in 0..rows {
        let mut len = 1;
        for col in 1..cols {
            if board.compatible(Coord::new(row, col - 1), Coord::new(row, col)) {
                len += 1;
                if len >= MIN_RUN {
                    return true;
                }
            } else {
                len = 1;
            }
        }
    }

    for col in 0..cols {
        let mut len = 1;
        for row in 1..rows {
            if board.compatible(Coord::new(row - 1, col), Coord::new(row, col)) {
                len += 1;
                if len >= MIN_RUN {
                    return true;
                }
            } else {
                len = 1;
            }
        }
    }

    false
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::board::{Cell, Color, Kind};

    fn coords(list: &[(usize, usize)]) -> BTreeSet<Coord> {
        list.iter().map(|&(r, c)| Coord::new(r, c)).collect()
    }

    #[test]
    fn test_no_matches_on_settled_board() {
        let board = Board::from_pattern(&["RGB", "GBR", "BRG"]);
        assert!(find_runs(&board).is_empty());
        assert!(find_matches(&board).is_empty());
        assert!(!has_match(&board));
    }

    #[test]
    fn test_horizontal_run() {
        let board = Board::from_pattern(&["GRRRB", "BGYOP"]);
        let runs = find_runs(&board);
        assert_eq!(runs.len(), 1);
        assert_eq!(runs[0].start, Coord::new(0, 1));
        assert_eq!(runs[0].len, 3);
        assert_eq!(runs[0].orientation, Orientation::Horizontal);

        let groups = find_matches(&board);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].cells, coords(&[(0, 1), (0, 2), (0, 3)]));
        assert!(groups[0].overlaps.is_empty());
        assert!(has_match(&board));
    }

    #[test]
    fn test_run_at_line_end() {
        let board = Board::from_pattern(&["GBYYYY"]);
        let runs = find_runs(&board);
        assert_eq!(runs.len(), 1);
        assert_eq!(runs[0].start, Coord::new(0, 2));
        assert_eq!(runs[0].len, 4);
    }

    #[test]
    fn test_vertical_run() {
        let board = Board::from_pattern(&["RG", "BG", "YG", "OB"]);
        let groups = find_matches(&board);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].cells, coords(&[(0, 1), (1, 1), (2, 1)]));
        assert_eq!(groups[0].line_orientation(), Some(Orientation::Vertical));
    }

    #[test]
    fn test_empty_slots_never_match() {
        let board = Board::from_pattern(&["...", "RGB"]);
        assert!(find_runs(&board).is_empty());
        assert!(!has_match(&board));
    }

    #[test]
    fn test_rainbow_bridges_run() {
        let mut board = Board::from_pattern(&["RGRB"]);
        board.set(Coord::new(0, 1), Cell::new(Color::Green, Kind::Rainbow));
        let groups = find_matches(&board);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].cells, coords(&[(0, 0), (0, 1), (0, 2)]));
    }

    #[test]
    fn test_cross_shape_merges_into_one_group() {
        // T shape: row 2 cols 0..3 and column 1 rows 0..3
        let board = Board::from_pattern(&[
            "BRGYO",
            "YRBGP",
            "RRRBG",
            "GBYOP",
            "OYPGB",
        ]);
        let runs = find_runs(&board);
        assert_eq!(runs.len(), 2);

        let groups = find_matches(&board);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].len(), 5);
        assert_eq!(groups[0].overlaps, coords(&[(2, 1)]));
        assert_eq!(groups[0].line_orientation(), None);
    }

    #[test]
    fn test_disjoint_runs_stay_separate() {
        let board = Board::from_pattern(&["RRRGB", "GBYOP", "BBBYO"]);
        let groups = find_matches(&board);
        assert_eq!(groups.len(), 2);
        assert!(groups.iter().all(|g| g.len() == 3 && g.overlaps.is_empty()));
    }

    #[test]
    fn test_chain_of_runs_merges_transitively() {
        // Horizontal run on row 0 and row 4, joined by a vertical run in col 2
        let runs = vec![
            Run { start: Coord::new(0, 0), len: 3, orientation: Orientation::Horizontal },
            Run { start: Coord::new(4, 2), len: 3, orientation: Orientation::Horizontal },
            Run { start: Coord::new(0, 2), len: 5, orientation: Orientation::Vertical },
        ];
        let groups = merge_runs(&runs);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].len(), 9);
        assert_eq!(groups[0].overlaps, coords(&[(0, 2), (4, 2)]));
    }

    #[test]
    fn test_synthetic_group() {
        let group = MatchGroup::synthetic([Coord::new(1, 1), Coord::new(1, 2)]);
        assert_eq!(group.len(), 2);
        assert!(group.overlaps.is_empty());
        assert_eq!(group.line_orientation(), Some(Orientation::Horizontal));
        assert!(MatchGroup::default().line_orientation().is_none());
    }
}
