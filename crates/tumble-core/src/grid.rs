//! Grid primitives: type codes, cell coordinates, and the settled matrix.
//!
//! A [`Grid`] is the rectangular snapshot of a settled board: every cell
//! holds a [`TypeCode`] from the configured alphabet. Grids are validated at
//! construction — wrong shapes are programmer errors and rejected
//! immediately, never tolerated at detection time.
//!
//! # Example
//!
//! ```
//! use tumble_core::grid::{Cell, Grid, TypeCode};
//!
//! let grid = Grid::parse_rows(&["337", "137", "111"]).unwrap();
//! assert_eq!(grid.rows(), 3);
//! assert_eq!(grid.cols(), 3);
//! assert_eq!(grid.get(Cell::new(0, 1)), TypeCode::new('3'));
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::EngineError;

/// A single token type from the game alphabet.
///
/// `TypeCode` is a newtype wrapper around `char`. The alphabet is finite and
/// configured on the board; one member is designated the wildcard. Codes are
/// ordered and hashable so cluster output can be sorted deterministically.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TypeCode(char);

impl TypeCode {
    /// Creates a type code from a raw character.
    #[must_use]
    pub const fn new(code: char) -> Self {
        Self(code)
    }

    /// Returns the raw character of this code.
    #[must_use]
    pub const fn as_char(self) -> char {
        self.0
    }
}

impl fmt::Debug for TypeCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TypeCode({})", self.0)
    }
}

impl fmt::Display for TypeCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<char> for TypeCode {
    fn from(code: char) -> Self {
        Self::new(code)
    }
}

impl From<TypeCode> for char {
    fn from(code: TypeCode) -> Self {
        code.0
    }
}

/// A (row, column) board coordinate.
///
/// Rows count downward from the top of the visible window, columns from the
/// left. Cells order row-major, which is the scan and reporting order used
/// throughout the engine.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Cell {
    /// Row index, 0 at the top.
    pub row: usize,
    /// Column index, 0 at the left.
    pub col: usize,
}

impl Cell {
    /// Creates a cell coordinate.
    #[must_use]
    pub const fn new(row: usize, col: usize) -> Self {
        Self { row, col }
    }

    /// Returns the linear index `row * cols + col` used by the wire format.
    #[must_use]
    pub const fn to_index(self, cols: usize) -> usize {
        self.row * cols + self.col
    }

    /// Builds a cell from a linear wire index.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::CellOutOfRange`] if the index does not fall on
    /// a `rows`x`cols` board.
    pub fn from_index(index: usize, rows: usize, cols: usize) -> Result<Self, EngineError> {
        if cols == 0 || index >= rows * cols {
            return Err(EngineError::CellOutOfRange { index, rows, cols });
        }
        Ok(Self::new(index / cols, index % cols))
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.row, self.col)
    }
}

/// A settled ROWSxCOLS matrix of type codes, stored row-major.
///
/// # Invariants
///
/// - Rectangular with non-zero dimensions.
/// - Every cell occupied: a `Grid` only exists for settled board states;
///   transient gaps during a cascade are represented on the columns, not
///   here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Grid {
    rows: usize,
    cols: usize,
    cells: Vec<TypeCode>,
}

impl Grid {
    /// Builds a grid from rows of type codes.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidDimensions`] for an empty matrix and
    /// [`EngineError::RaggedMatrix`] if row lengths differ.
    pub fn from_rows(rows: Vec<Vec<TypeCode>>) -> Result<Self, EngineError> {
        let row_count = rows.len();
        let col_count = rows.first().map_or(0, Vec::len);
        if row_count == 0 || col_count == 0 {
            return Err(EngineError::InvalidDimensions {
                rows: row_count,
                cols: col_count,
            });
        }
        for (i, row) in rows.iter().enumerate() {
            if row.len() != col_count {
                return Err(EngineError::RaggedMatrix {
                    row: i,
                    len: row.len(),
                    expected: col_count,
                });
            }
        }
        Ok(Self {
            rows: row_count,
            cols: col_count,
            cells: rows.into_iter().flatten().collect(),
        })
    }

    /// Builds a grid by evaluating `f` for every cell in row-major order.
    ///
    /// # Panics
    ///
    /// Panics if `rows` or `cols` is zero; generator construction with a
    /// known shape is an internal convenience, not a validation boundary.
    #[must_use]
    pub fn from_fn(rows: usize, cols: usize, mut f: impl FnMut(Cell) -> TypeCode) -> Self {
        assert!(rows > 0 && cols > 0, "grid shape must be non-zero");
        let mut cells = Vec::with_capacity(rows * cols);
        for row in 0..rows {
            for col in 0..cols {
                cells.push(f(Cell::new(row, col)));
            }
        }
        Self { rows, cols, cells }
    }

    /// Builds a grid from string rows, one character per cell.
    ///
    /// Convenience for tests and fixtures.
    ///
    /// # Errors
    ///
    /// Same shape errors as [`Grid::from_rows`].
    pub fn parse_rows(rows: &[&str]) -> Result<Self, EngineError> {
        Self::from_rows(
            rows.iter()
                .map(|r| r.chars().map(TypeCode::new).collect())
                .collect(),
        )
    }

    /// Returns the row count.
    #[must_use]
    pub const fn rows(&self) -> usize {
        self.rows
    }

    /// Returns the column count.
    #[must_use]
    pub const fn cols(&self) -> usize {
        self.cols
    }

    /// Returns the type code at `cell`.
    ///
    /// # Panics
    ///
    /// Panics if `cell` is out of range; grids are always accessed with
    /// coordinates derived from their own shape.
    #[must_use]
    pub fn get(&self, cell: Cell) -> TypeCode {
        assert!(
            cell.row < self.rows && cell.col < self.cols,
            "cell {cell} out of range for {}x{} grid",
            self.rows,
            self.cols,
        );
        self.cells[cell.to_index(self.cols)]
    }

    /// Returns the types of one column, top-down.
    ///
    /// # Panics
    ///
    /// Panics if `col` is out of range.
    #[must_use]
    pub fn column(&self, col: usize) -> Vec<TypeCode> {
        assert!(col < self.cols, "column {col} out of range");
        (0..self.rows).map(|r| self.get(Cell::new(r, col))).collect()
    }

    /// Iterates all cells in row-major order with their coordinates.
    pub fn iter(&self) -> impl Iterator<Item = (Cell, TypeCode)> + '_ {
        self.cells.iter().enumerate().map(|(i, &code)| {
            (Cell::new(i / self.cols, i % self.cols), code)
        })
    }
}

impl fmt::Display for Grid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for row in 0..self.rows {
            for col in 0..self.cols {
                write!(f, "{}", self.get(Cell::new(row, col)))?;
            }
            if row + 1 < self.rows {
                writeln!(f)?;
            }
        }
        Ok(())
    }
}
