//! Board: 9x9 grid of cells, each empty or holding one flower.

use rand::Rng;
use rand::distr::{Distribution, StandardUniform};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Board side length in cells.
pub const GRID_SIZE: usize = 9;

/// Number of distinct flower types (0..7).
pub const NUM_TYPES: u8 = 7;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GridError {
    #[error("cell ({row}, {col}) is outside the 9x9 board")]
    OutOfBounds { row: usize, col: usize },
    #[error("flower type {0} is not in 0..7")]
    InvalidFlower(u8),
    #[error("board text has {0} rows, expected 9")]
    RowCount(usize),
    #[error("board row {row} has {len} cells, expected 9")]
    RowLength { row: usize, len: usize },
    #[error("unexpected character {0:?} in board text")]
    BadChar(char),
}

/// A cell coordinate, always inside the board.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GridPos {
    row: usize,
    col: usize,
}

impl GridPos {
    pub fn new(row: usize, col: usize) -> Result<Self, GridError> {
        if row < GRID_SIZE && col < GRID_SIZE {
            Ok(Self { row, col })
        } else {
            Err(GridError::OutOfBounds { row, col })
        }
    }

    #[inline]
    pub fn row(self) -> usize {
        self.row
    }

    #[inline]
    pub fn col(self) -> usize {
        self.col
    }

    /// Neighbour at (row + dr, col + dc), or None when it falls off the board.
    pub fn offset(self, dr: isize, dc: isize) -> Option<Self> {
        let row = self.row.checked_add_signed(dr)?;
        let col = self.col.checked_add_signed(dc)?;
        Self::new(row, col).ok()
    }
}

impl fmt::Display for GridPos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.row, self.col)
    }
}

/// Flower type in 0..NUM_TYPES.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Flower(u8);

impl Flower {
    pub fn new(kind: u8) -> Result<Self, GridError> {
        if kind < NUM_TYPES {
            Ok(Self(kind))
        } else {
            Err(GridError::InvalidFlower(kind))
        }
    }

    /// Type index 0..7, used by renderers to pick colour and glyph.
    #[inline]
    pub fn index(self) -> u8 {
        self.0
    }
}

/// Uniform over all flower types.
impl Distribution<Flower> for StandardUniform {
    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Flower {
        Flower(rng.random_range(0..NUM_TYPES))
    }
}

/// Single cell: either empty or a flower.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Cell {
    #[default]
    Empty,
    Flower(Flower),
}

impl Cell {
    #[inline]
    pub fn flower(self) -> Option<Flower> {
        match self {
            Self::Flower(f) => Some(f),
            Self::Empty => None,
        }
    }

    #[inline]
    pub fn is_empty(self) -> bool {
        self == Self::Empty
    }
}

/// The playing grid. `cells[row][col]`, row 0 is the top.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Board {
    cells: [[Cell; GRID_SIZE]; GRID_SIZE],
}

impl Board {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn get(&self, pos: GridPos) -> Cell {
        self.cells[pos.row][pos.col]
    }

    #[inline]
    pub fn set(&mut self, pos: GridPos, cell: Cell) {
        self.cells[pos.row][pos.col] = cell;
    }

    #[inline]
    pub fn flower_at(&self, pos: GridPos) -> Option<Flower> {
        self.get(pos).flower()
    }

    #[inline]
    pub fn is_empty(&self, pos: GridPos) -> bool {
        self.get(pos).is_empty()
    }

    /// All 81 positions in row-major order.
    pub fn positions() -> impl Iterator<Item = GridPos> {
        (0..GRID_SIZE).flat_map(|row| (0..GRID_SIZE).map(move |col| GridPos { row, col }))
    }

    /// Unoccupied cells in row-major order.
    pub fn empty_cells(&self) -> Vec<GridPos> {
        Self::positions().filter(|&p| self.is_empty(p)).collect()
    }

    pub fn is_full(&self) -> bool {
        Self::positions().all(|p| !self.is_empty(p))
    }

    /// Empty every cell.
    pub fn clear(&mut self) {
        self.cells = [[Cell::Empty; GRID_SIZE]; GRID_SIZE];
    }
}

impl fmt::Display for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, row) in self.cells.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            for cell in row {
                match cell {
                    Cell::Empty => write!(f, ".")?,
                    Cell::Flower(fl) => write!(f, "{}", fl.index())?,
                }
            }
        }
        Ok(())
    }
}

/// Parses the `Display` format: nine rows of nine characters, `.` for empty and
/// `0`..`6` for flowers. Blank lines and surrounding whitespace are ignored.
impl FromStr for Board {
    type Err = GridError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let rows: Vec<&str> = s.lines().map(str::trim).filter(|l| !l.is_empty()).collect();
        if rows.len() != GRID_SIZE {
            return Err(GridError::RowCount(rows.len()));
        }
        let mut board = Self::new();
        for (r, line) in rows.iter().enumerate() {
            let len = line.chars().count();
            if len != GRID_SIZE {
                return Err(GridError::RowLength { row: r, len });
            }
            for (c, ch) in line.chars().enumerate() {
                board.cells[r][c] = match ch {
                    '.' => Cell::Empty,
                    d => {
                        let kind = d.to_digit(10).ok_or(GridError::BadChar(d))?;
                        Cell::Flower(Flower::new(kind as u8)?)
                    }
                };
            }
        }
        Ok(board)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grid_pos_bounds() {
        assert!(GridPos::new(8, 8).is_ok());
        assert_eq!(
            GridPos::new(9, 0),
            Err(GridError::OutOfBounds { row: 9, col: 0 })
        );
        let corner = GridPos::new(0, 0).unwrap();
        assert_eq!(corner.offset(-1, 0), None);
        assert_eq!(corner.offset(1, 1), GridPos::new(1, 1).ok());
    }

    #[test]
    fn test_flower_range() {
        assert!(Flower::new(6).is_ok());
        assert_eq!(Flower::new(7), Err(GridError::InvalidFlower(7)));
    }

    #[test]
    fn test_empty_cells_row_major() {
        let mut board = Board::new();
        assert_eq!(board.empty_cells().len(), 81);
        board.set(GridPos::new(0, 1).unwrap(), Cell::Flower(Flower::new(3).unwrap()));
        let empties = board.empty_cells();
        assert_eq!(empties.len(), 80);
        assert_eq!(empties[0], GridPos::new(0, 0).unwrap());
        assert_eq!(empties[1], GridPos::new(0, 2).unwrap());
        board.clear();
        assert_eq!(board, Board::new());
    }

    #[test]
    fn test_text_format() {
        let text = "\
            0123456..
            .........
            .........
            .........
            .........
            .........
            .........
            .........
            ........6";
        let board: Board = text.parse().unwrap();
        assert_eq!(board.flower_at(GridPos::new(0, 3).unwrap()).map(Flower::index), Some(3));
        assert!(board.is_empty(GridPos::new(0, 7).unwrap()));
        let again: Board = board.to_string().parse().unwrap();
        assert_eq!(again, board);
    }

    #[test]
    fn test_text_format_errors() {
        assert_eq!("...".parse::<Board>(), Err(GridError::RowCount(1)));
        let bad = ".........\n".repeat(8) + "....7....";
        assert_eq!(bad.parse::<Board>(), Err(GridError::InvalidFlower(7)));
        let bad = ".........\n".repeat(8) + "....x....";
        assert_eq!(bad.parse::<Board>(), Err(GridError::BadChar('x')));
    }
}
