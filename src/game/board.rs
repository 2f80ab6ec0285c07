//! Grid Model
//!
//! Fixed-size rectangular grid of tile cells, row-major, addressed by
//! [`Coord`]. A slot is `Option<Cell>`: `None` only exists while a cascade
//! step is clearing and refilling, never on a settled board.
//!
//! The model does not validate requests. Out-of-bounds access is a contract
//! violation and panics; bounds and adjacency are checked at the request
//! boundary in [`crate::game::actions`].

use std::collections::BTreeMap;
use std::fmt;

use serde::{Serialize, Deserialize};

use crate::core::rng::DeterministicRng;
use crate::game::matcher::has_match;
use crate::game::moves::has_any_legal_move;
use crate::game::reshuffle::reshuffle;

// =============================================================================
// COLOR / KIND / CELL
// =============================================================================

/// Tile color.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum Color {
    /// R
    Red = 0,
    /// B
    Blue = 1,
    /// G
    Green = 2,
    /// P
    Purple = 3,
    /// Y
    Yellow = 4,
    /// O
    Orange = 5,
}

impl Color {
    /// Every color, in palette order.
    pub const ALL: [Color; 6] = [
        Color::Red,
        Color::Blue,
        Color::Green,
        Color::Purple,
        Color::Yellow,
        Color::Orange,
    ];

    /// One-letter code used by board patterns.
    pub fn letter(self) -> char {
        match self {
            Color::Red => 'R',
            Color::Blue => 'B',
            Color::Green => 'G',
            Color::Purple => 'P',
            Color::Yellow => 'Y',
            Color::Orange => 'O',
        }
    }

    /// Parse a one-letter code (case-insensitive).
    pub fn from_letter(letter: char) -> Option<Color> {
        match letter.to_ascii_uppercase() {
            'R' => Some(Color::Red),
            'B' => Some(Color::Blue),
            'G' => Some(Color::Green),
            'P' => Some(Color::Purple),
            'Y' => Some(Color::Yellow),
            'O' => Some(Color::Orange),
            _ => None,
        }
    }
}

/// Tile kind. Everything except `Normal` is a special created by promotion.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(u8)]
#[derive(Default)]
pub enum Kind {
    /// Plain tile
    #[default]
    Normal = 0,
    /// Created from a horizontal line of 4
    StripedH = 1,
    /// Created from a vertical line of 4
    StripedV = 2,
    /// Created at the crossing of a row run and a column run
    Wrapped = 3,
    /// Created from a line of 5+; wildcard for matching
    Rainbow = 4,
}

/// A tile on the board.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Cell {
    /// Stored color (cosmetic for rainbow tiles)
    pub color: Color,
    /// Tile kind
    pub kind: Kind,
}

impl Cell {
    /// Create a cell of any kind.
    pub const fn new(color: Color, kind: Kind) -> Self {
        Self { color, kind }
    }

    /// Create a normal cell.
    pub const fn normal(color: Color) -> Self {
        Self::new(color, Kind::Normal)
    }

    /// Is this a rainbow tile?
    #[inline]
    pub fn is_rainbow(&self) -> bool {
        self.kind == Kind::Rainbow
    }

    /// Can these two cells belong to the same run?
    ///
    /// Rainbow tiles are wildcards for matching only.
    #[inline]
    pub fn compatible(&self, other: &Cell) -> bool {
        self.color == other.color || self.is_rainbow() || other.is_rainbow()
    }
}

// =============================================================================
// COORD
// =============================================================================

/// Board coordinate. Orders row-major, so a sorted set of coordinates on a
/// straight line is in line order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Coord {
    /// Row, 0 at the top
    pub row: usize,
    /// Column, 0 at the left
    pub col: usize,
}

impl Coord {
    /// Create a coordinate.
    pub const fn new(row: usize, col: usize) -> Self {
        Self { row, col }
    }

    /// Convert signed request coordinates, rejecting anything off the board.
    pub fn checked(row: i32, col: i32, rows: usize, cols: usize) -> Option<Coord> {
        if row < 0 || col < 0 {
            return None;
        }
        let (row, col) = (row as usize, col as usize);
        if row >= rows || col >= cols {
            return None;
        }
        Some(Coord { row, col })
    }

    /// Are the two coordinates orthogonal neighbors?
    pub fn is_adjacent(&self, other: &Coord) -> bool {
        self.row.abs_diff(other.row) + self.col.abs_diff(other.col) == 1
    }

    /// Step one cell in `dir`, staying inside a `rows x cols` board.
    pub fn step(&self, dir: Direction, rows: usize, cols: usize) -> Option<Coord> {
        let (dr, dc) = dir.delta();
        let row = self.row as i64 + dr;
        let col = self.col as i64 + dc;
        if row < 0 || col < 0 || row >= rows as i64 || col >= cols as i64 {
            return None;
        }
        Some(Coord::new(row as usize, col as usize))
    }
}

impl fmt::Display for Coord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.row, self.col)
    }
}

/// Axis-aligned neighbor direction.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    /// col + 1
    East,
    /// row - 1
    North,
    /// col - 1
    West,
    /// row + 1
    South,
}

impl Direction {
    /// Scan order used by the move oracle.
    pub const ALL: [Direction; 4] = [
        Direction::East,
        Direction::North,
        Direction::West,
        Direction::South,
    ];

    /// (row delta, col delta)
    #[inline]
    pub fn delta(self) -> (i64, i64) {
        match self {
            Direction::East => (0, 1),
            Direction::North => (-1, 0),
            Direction::West => (0, -1),
            Direction::South => (1, 0),
        }
    }
}

// =============================================================================
// BOARD
// =============================================================================

/// Attempts at drawing a match-free, playable board before giving up on the
/// constructive fill and accepting a reshuffle instead.
const MAX_GENERATION_ATTEMPTS: u32 = 1_000;

/// The tile grid.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Board {
    rows: usize,
    cols: usize,
    /// Row-major slots (row * cols + col)
    cells: Vec<Option<Cell>>,
}

impl Board {
    /// Create an empty board.
    pub fn new(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            cells: vec![None; rows * cols],
        }
    }

    /// Generate a full board with no runs and at least one legal move.
    ///
    /// Colors are drawn so no 3-run forms while filling; if the palette is
    /// too small for that (or the result has no move), the board is redrawn.
    pub fn random(rows: usize, cols: usize, palette: &[Color], rng: &mut DeterministicRng) -> Self {
        let mut board = Self::new(rows, cols);
        for _ in 0..MAX_GENERATION_ATTEMPTS {
            board.fill_without_runs(palette, rng);
            if !has_match(&board) && has_any_legal_move(&board) {
                return board;
            }
        }
        // Palette of 2 on a tight board: let the reshuffle loop finish the job.
        reshuffle(&mut board, palette, rng);
        board
    }

    /// Build a board from text rows: one color letter per cell, `.` for empty.
    ///
    /// # Panics
    ///
    /// Panics on ragged rows or unknown letters.
    pub fn from_pattern(pattern: &[&str]) -> Self {
        let rows = pattern.len();
        let cols = pattern.first().map(|r| r.chars().count()).unwrap_or(0);
        let mut board = Self::new(rows, cols);
        for (r, line) in pattern.iter().enumerate() {
            assert_eq!(line.chars().count(), cols, "ragged pattern row {}", r);
            for (c, ch) in line.chars().enumerate() {
                if ch == '.' {
                    continue;
                }
                let color = Color::from_letter(ch)
                    .unwrap_or_else(|| panic!("unknown color letter {:?}", ch));
                board.set(Coord::new(r, c), Cell::normal(color));
            }
        }
        board
    }

    /// Number of rows.
    #[inline]
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Number of columns.
    #[inline]
    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Is the coordinate on the board?
    #[inline]
    pub fn in_bounds(&self, coord: Coord) -> bool {
        coord.row < self.rows && coord.col < self.cols
    }

    #[inline]
    fn index(&self, coord: Coord) -> usize {
        assert!(
            self.in_bounds(coord),
            "coordinate {} outside {}x{} board",
            coord,
            self.rows,
            self.cols
        );
        coord.row * self.cols + coord.col
    }

    /// Cell at `coord`, `None` for an empty slot.
    #[inline]
    pub fn get(&self, coord: Coord) -> Option<&Cell> {
        self.cells[self.index(coord)].as_ref()
    }

    /// Put a cell at `coord`.
    #[inline]
    pub fn set(&mut self, coord: Coord, cell: Cell) {
        let idx = self.index(coord);
        self.cells[idx] = Some(cell);
    }

    /// Remove and return the cell at `coord`.
    #[inline]
    pub fn take(&mut self, coord: Coord) -> Option<Cell> {
        let idx = self.index(coord);
        self.cells[idx].take()
    }

    /// Exchange two slots. No adjacency check.
    #[inline]
    pub fn swap(&mut self, a: Coord, b: Coord) {
        let ia = self.index(a);
        let ib = self.index(b);
        self.cells.swap(ia, ib);
    }

    /// Are both slots present and compatible?
    #[inline]
    pub fn compatible(&self, a: Coord, b: Coord) -> bool {
        match (self.get(a), self.get(b)) {
            (Some(x), Some(y)) => x.compatible(y),
            _ => false,
        }
    }

    /// All coordinates, row-major.
    pub fn coords(&self) -> impl Iterator<Item = Coord> {
        let cols = self.cols;
        (0..self.rows * cols).map(move |i| Coord::new(i / cols, i % cols))
    }

    /// Is every slot present?
    pub fn is_full(&self) -> bool {
        self.cells.iter().all(Option::is_some)
    }

    /// Count of each color on the board.
    pub fn color_counts(&self) -> BTreeMap<Color, usize> {
        let mut counts = BTreeMap::new();
        for cell in self.cells.iter().flatten() {
            *counts.entry(cell.color).or_insert(0) += 1;
        }
        counts
    }

    /// Every coordinate whose stored color equals `color`.
    pub fn coords_of_color(&self, color: Color) -> Vec<Coord> {
        self.coords()
            .filter(|&c| self.get(c).is_some_and(|cell| cell.color == color))
            .collect()
    }

    /// Copy of a settled board for the presentation layer.
    ///
    /// # Panics
    ///
    /// Panics if a slot is empty; snapshots are only taken after settling.
    pub fn snapshot(&self) -> BoardSnapshot {
        assert!(self.is_full(), "snapshot of a board with holes");
        BoardSnapshot {
            rows: self.rows,
            cols: self.cols,
            cells: self.cells.iter().flatten().copied().collect(),
        }
    }

    /// Text rendering, one string per row. Specials are lowercase, empty
    /// slots are `.`.
    pub fn to_pattern(&self) -> Vec<String> {
        (0..self.rows)
            .map(|r| {
                (0..self.cols)
                    .map(|c| match self.get(Coord::new(r, c)) {
                        None => '.',
                        Some(cell) if cell.kind == Kind::Normal => cell.color.letter(),
                        Some(cell) => cell.color.letter().to_ascii_lowercase(),
                    })
                    .collect()
            })
            .collect()
    }

    /// Fill every slot with a color that does not complete a run to the left
    /// or above. Falls back to any palette color when none qualifies.
    pub(crate) fn fill_without_runs(&mut self, palette: &[Color], rng: &mut DeterministicRng) {
        let cols = self.cols;
        let mut allowed = Vec::with_capacity(palette.len());
        for i in 0..self.rows * cols {
            let coord = Coord::new(i / cols, i % cols);
            allowed.clear();
            allowed.extend(palette.iter().copied().filter(|&color| {
                !self.completes_run(coord, color)
            }));
            let pool: &[Color] = if allowed.is_empty() { palette } else { &allowed };
            let color = rng.choose(pool).copied().unwrap_or(Color::Red);
            self.set(coord, Cell::normal(color));
        }
    }

    fn completes_run(&self, coord: Coord, color: Color) -> bool {
        let same = |r: usize, c: usize| {
            self.get(Coord::new(r, c)).is_some_and(|cell| cell.color == color)
        };
        let left = coord.col >= 2 && same(coord.row, coord.col - 1) && same(coord.row, coord.col - 2);
        let up = coord.row >= 2 && same(coord.row - 1, coord.col) && same(coord.row - 2, coord.col);
        left || up
    }
}

impl fmt::Display for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for line in self.to_pattern() {
            writeln!(f, "{}", line)?;
        }
        Ok(())
    }
}

// =============================================================================
// SNAPSHOT
// =============================================================================

/// Settled board handed to the presentation layer.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoardSnapshot {
    /// Number of rows
    pub rows: usize,
    /// Number of columns
    pub cols: usize,
    /// Row-major cells
    pub cells: Vec<Cell>,
}

impl BoardSnapshot {
    /// Cell at (row, col).
    pub fn cell(&self, row: usize, col: usize) -> Option<&Cell> {
        if row >= self.rows || col >= self.cols {
            return None;
        }
        self.cells.get(row * self.cols + col)
    }

    /// Serialize to JSON string.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserialize from JSON string.
    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }

    /// Serialize to binary.
    pub fn to_bytes(&self) -> Result<Vec<u8>, bincode::Error> {
        bincode::serialize(self)
    }

    /// Deserialize from binary.
    pub fn from_bytes(data: &[u8]) -> Result<Self, bincode::Error> {
        bincode::deserialize(data)
    }
}

// =============================================================================
// TESTS
// =============================================================================
