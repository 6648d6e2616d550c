//! Error types for the cascade engine.
//!
//! The engine distinguishes two failure classes (see the error handling
//! design notes in the crate docs):
//!
//! - **Construction-time rejections**: malformed configuration, grids of the
//!   wrong shape, out-of-alphabet type codes. These are programmer errors
//!   and are reported when the offending value is built, never recovered
//!   from mid-round.
//! - **Wire faults**: hint strings from the outcome service that fail to
//!   parse.
//!
//! Runtime shortfalls (a refill reply with too few tokens) are *not* errors:
//! the column substitutes a random valid type and logs a warning instead.

use thiserror::Error;

use crate::grid::TypeCode;
use crate::reel::ReelState;

/// Errors produced by the cascade engine.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    /// Board dimensions must both be non-zero.
    #[error("board dimensions must be non-zero (got {rows}x{cols})")]
    InvalidDimensions {
        /// Configured row count.
        rows: usize,
        /// Configured column count.
        cols: usize,
    },

    /// The alphabet needs at least one non-wildcard code.
    #[error("alphabet must contain at least two codes (got {len})")]
    AlphabetTooSmall {
        /// Number of codes supplied.
        len: usize,
    },

    /// The designated wildcard must be a member of the alphabet.
    #[error("wildcard {wildcard} is not in the configured alphabet")]
    WildcardNotInAlphabet {
        /// The configured wildcard code.
        wildcard: TypeCode,
    },

    /// A minimum cluster size of zero can never be satisfied meaningfully.
    #[error("minimum cluster size must be at least 1")]
    InvalidMinClusterSize,

    /// A matrix did not match the configured board shape.
    #[error("matrix is {rows}x{cols}, expected {expected_rows}x{expected_cols}")]
    DimensionMismatch {
        /// Expected row count.
        expected_rows: usize,
        /// Expected column count.
        expected_cols: usize,
        /// Actual row count.
        rows: usize,
        /// Actual column count.
        cols: usize,
    },

    /// Rows of a matrix literal had differing lengths.
    #[error("matrix rows have unequal lengths (row {row} has {len}, expected {expected})")]
    RaggedMatrix {
        /// Index of the offending row.
        row: usize,
        /// Length of the offending row.
        len: usize,
        /// Expected row length.
        expected: usize,
    },

    /// A type code outside the configured alphabet was supplied.
    #[error("type code {code} is not in the configured alphabet")]
    UnknownTypeCode {
        /// The offending code.
        code: TypeCode,
    },

    /// A linear cell index in a cluster hint was out of board range.
    #[error("cell index {index} is out of range for a {rows}x{cols} board")]
    CellOutOfRange {
        /// The offending linear index.
        index: usize,
        /// Board row count.
        rows: usize,
        /// Board column count.
        cols: usize,
    },

    /// A cluster hint string from the outcome service failed to parse.
    #[error("malformed cluster hint {raw:?}: {reason}")]
    MalformedHint {
        /// The raw wire string.
        raw: String,
        /// Human-readable parse failure.
        reason: String,
    },

    /// A column operation was requested in a state that does not allow it.
    #[error("column {col} cannot {op} while {state}")]
    ColumnState {
        /// Column index.
        col: usize,
        /// Operation that was attempted.
        op: &'static str,
        /// State the column was in.
        state: ReelState,
    },

    /// A round was triggered while the previous one was still resolving.
    #[error("a round is already in progress")]
    RoundInProgress,

    /// Detection was requested against a board with unresolved gaps.
    #[error("board is not settled (column {col} has gaps or animations in flight)")]
    UnsettledBoard {
        /// First unsettled column.
        col: usize,
    },
}
