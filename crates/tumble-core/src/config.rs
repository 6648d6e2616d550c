//! Board and timing configuration.
//!
//! Configuration is validated once, at construction, per the error model:
//! a zero-sized board, a wildcard outside the alphabet, or a matrix of the
//! wrong shape is a programmer error, rejected before any round starts.
//!
//! Timing values default to the tuning of the reference game; they are
//! plain data so tests can shrink every duration and fast-forward the
//! virtual clock.

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::EngineError;
use crate::grid::{Grid, TypeCode};

/// Default alphabet: digits `'0'..'9'` plus the `'K'` wildcard.
#[must_use]
pub fn default_alphabet() -> Vec<TypeCode> {
    "0123456789K".chars().map(TypeCode::new).collect()
}

/// Board shape, alphabet, and match rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoardConfig {
    /// Visible rows per column.
    pub rows: usize,
    /// Number of columns.
    pub cols: usize,
    /// Finite set of token types, including the wildcard.
    pub alphabet: Vec<TypeCode>,
    /// The code that joins any cluster but can never seed one.
    pub wildcard: TypeCode,
    /// Minimum number of cells (same-type plus wildcard) in a cluster.
    pub min_cluster_size: usize,
}

impl Default for BoardConfig {
    fn default() -> Self {
        Self {
            rows: 5,
            cols: 5,
            alphabet: default_alphabet(),
            wildcard: TypeCode::new('K'),
            min_cluster_size: 4,
        }
    }
}

impl BoardConfig {
    /// Checks the configuration invariants.
    ///
    /// # Errors
    ///
    /// - [`EngineError::InvalidDimensions`] for a zero-sized board
    /// - [`EngineError::AlphabetTooSmall`] for fewer than two codes
    /// - [`EngineError::WildcardNotInAlphabet`] when the wildcard is missing
    /// - [`EngineError::InvalidMinClusterSize`] for a zero minimum
    pub fn validate(&self) -> Result<(), EngineError> {
        if self.rows == 0 || self.cols == 0 {
            return Err(EngineError::InvalidDimensions {
                rows: self.rows,
                cols: self.cols,
            });
        }
        if self.alphabet.len() < 2 {
            return Err(EngineError::AlphabetTooSmall {
                len: self.alphabet.len(),
            });
        }
        if !self.alphabet.contains(&self.wildcard) {
            return Err(EngineError::WildcardNotInAlphabet {
                wildcard: self.wildcard,
            });
        }
        if self.min_cluster_size == 0 {
            return Err(EngineError::InvalidMinClusterSize);
        }
        Ok(())
    }

    /// Returns true if `code` belongs to the alphabet.
    #[must_use]
    pub fn contains(&self, code: TypeCode) -> bool {
        self.alphabet.contains(&code)
    }

    /// Iterates the non-wildcard codes.
    pub fn non_wild(&self) -> impl Iterator<Item = TypeCode> + '_ {
        self.alphabet.iter().copied().filter(|&c| c != self.wildcard)
    }

    /// Samples a uniformly random code from the full alphabet.
    ///
    /// Used for cosmetic wrap re-skinning and as the last-resort substitute
    /// when a refill reply comes up short.
    ///
    /// # Panics
    ///
    /// Panics if the alphabet is empty, which `validate` rules out.
    pub fn uniform_type<R: Rng + ?Sized>(&self, rng: &mut R) -> TypeCode {
        *self
            .alphabet
            .choose(rng)
            .expect("validated alphabet is non-empty")
    }

    /// Checks a matrix against the board shape and alphabet.
    ///
    /// # Errors
    ///
    /// [`EngineError::DimensionMismatch`] for a wrong shape,
    /// [`EngineError::UnknownTypeCode`] for a code outside the alphabet.
    pub fn validate_matrix(&self, grid: &Grid) -> Result<(), EngineError> {
        if grid.rows() != self.rows || grid.cols() != self.cols {
            return Err(EngineError::DimensionMismatch {
                expected_rows: self.rows,
                expected_cols: self.cols,
                rows: grid.rows(),
                cols: grid.cols(),
            });
        }
        for (_, code) in grid.iter() {
            if !self.contains(code) {
                return Err(EngineError::UnknownTypeCode { code });
            }
        }
        Ok(())
    }
}

/// Durations and tuning for the animation layer, in milliseconds.
///
/// Spin speed is given in rows per second; every column randomizes its own
/// speed once within `[spin_speed_min, spin_speed_max]` for visual variety.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimingConfig {
    /// Floor on total spin time regardless of how fast the service replies.
    pub min_spin_ms: u64,
    /// Per-column offset for spin starts and stop anchoring.
    pub stagger_ms: u64,
    /// Duration of the decelerating stop tween.
    pub stop_ms: u64,
    /// Duration of the explode fade/shrink.
    pub explode_ms: u64,
    /// Duration of the drop animation.
    pub drop_ms: u64,
    /// Pause after all columns settle, before the first detection.
    pub settle_pause_ms: u64,
    /// How long matched cells stay highlighted before exploding.
    pub highlight_hold_ms: u64,
    /// Pause between the refill arriving and the drop starting.
    pub refill_pause_ms: u64,
    /// Whole extra rotations added to the stop target, plus one per column
    /// index for the staggered settle feel.
    pub stop_extra_rows: u32,
    /// Lower bound of the per-column spin speed band (rows/second).
    pub spin_speed_min: f32,
    /// Upper bound of the per-column spin speed band (rows/second).
    pub spin_speed_max: f32,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            min_spin_ms: 2000,
            stagger_ms: 300,
            stop_ms: 900,
            explode_ms: 450,
            drop_ms: 420,
            settle_pause_ms: 1000,
            highlight_hold_ms: 500,
            refill_pause_ms: 500,
            stop_extra_rows: 6,
            spin_speed_min: 18.0,
            spin_speed_max: 24.0,
        }
    }
}

impl TimingConfig {
    /// A configuration with every duration collapsed to a single tick.
    ///
    /// Keeps integration tests fast without changing any sequencing.
    #[must_use]
    pub fn instant() -> Self {
        Self {
            min_spin_ms: 1,
            stagger_ms: 1,
            stop_ms: 1,
            explode_ms: 1,
            drop_ms: 1,
            settle_pause_ms: 1,
            highlight_hold_ms: 1,
            refill_pause_ms: 1,
            stop_extra_rows: 1,
            spin_speed_min: 18.0,
            spin_speed_max: 24.0,
        }
    }
}
