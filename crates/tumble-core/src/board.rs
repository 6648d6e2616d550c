//! Whole-board container: one [`Reel`] per column plus the shared symbol
//! pool, with fan-out helpers the round orchestrator drives.
//!
//! The board never decides *when* anything happens — it validates and
//! forwards. Phase sequencing lives in [`crate::round`].

use rand::Rng;
use tracing::debug;

use crate::cluster::Cluster;
use crate::config::{BoardConfig, TimingConfig};
use crate::error::EngineError;
use crate::grid::{Cell, Grid, TypeCode};
use crate::pool::SymbolPool;
use crate::reel::{AnimTag, Reel, ReelState};
use crate::tween::{TweenFrame, TweenScheduler};

/// The playfield: a column of reels over one shared symbol pool.
#[derive(Debug)]
pub struct Board {
    config: BoardConfig,
    reels: Vec<Reel>,
    pool: SymbolPool,
}

impl Board {
    /// Builds a settled board from a starting matrix.
    ///
    /// # Errors
    ///
    /// Propagates configuration validation failures, plus
    /// [`EngineError::DimensionMismatch`] or
    /// [`EngineError::UnknownTypeCode`] if the matrix does not fit the
    /// configuration.
    pub fn new<R: Rng + ?Sized>(
        config: BoardConfig,
        start: &Grid,
        rng: &mut R,
        timing: &TimingConfig,
    ) -> Result<Self, EngineError> {
        config.validate()?;
        config.validate_matrix(start)?;

        let mut pool = SymbolPool::new();
        let reels = (0..config.cols)
            .map(|col| {
                let column = start.column(col);
                Reel::new(col, config.rows, &column, &mut pool, rng, timing)
            })
            .collect();
        Ok(Self {
            config,
            reels,
            pool,
        })
    }

    /// Board configuration.
    #[must_use]
    pub const fn config(&self) -> &BoardConfig {
        &self.config
    }

    /// Shared symbol pool.
    #[must_use]
    pub const fn pool(&self) -> &SymbolPool {
        &self.pool
    }

    /// One column's state machine.
    ///
    /// # Panics
    ///
    /// Panics if `col` is out of range.
    #[must_use]
    pub fn reel(&self, col: usize) -> &Reel {
        &self.reels[col]
    }

    /// Type at `cell`, or `None` for a gap or invisible slot.
    #[must_use]
    pub fn type_at(&self, cell: Cell) -> Option<TypeCode> {
        self.reels
            .get(cell.col)
            .and_then(|reel| reel.type_at(cell.row, &self.pool))
    }

    /// True while any column is mid-transition or animating.
    #[must_use]
    pub fn any_busy(&self) -> bool {
        self.reels.iter().any(Reel::is_busy)
    }

    /// Reads the settled matrix.
    ///
    /// # Errors
    ///
    /// [`EngineError::UnsettledBoard`] if any column is busy or has gaps.
    pub fn snapshot(&self) -> Result<Grid, EngineError> {
        if let Some(reel) = self.reels.iter().find(|r| r.is_busy()) {
            return Err(EngineError::UnsettledBoard { col: reel.index() });
        }
        let mut rows = Vec::with_capacity(self.config.rows);
        for row in 0..self.config.rows {
            let mut line = Vec::with_capacity(self.config.cols);
            for col in 0..self.config.cols {
                let code = self
                    .type_at(Cell { row, col })
                    .ok_or(EngineError::UnsettledBoard { col })?;
                line.push(code);
            }
            rows.push(line);
        }
        Grid::from_rows(rows)
    }

    /// Arms every column's spin start, staggered left to right by
    /// `stagger_ms` per column.
    ///
    /// # Errors
    ///
    /// [`EngineError::ColumnState`] if any column is not idle; earlier
    /// columns may already be armed when this fails.
    pub fn begin_spin_all(&mut self, now_ms: u64, timing: &TimingConfig) -> Result<(), EngineError> {
        for reel in &mut self.reels {
            reel.begin_spin(reel.index() as u64 * timing.stagger_ms, now_ms)?;
        }
        debug!(cols = self.reels.len(), "spin armed");
        Ok(())
    }

    /// Begins stopping one column toward `final_types` (top-down).
    ///
    /// # Errors
    ///
    /// [`EngineError::ColumnState`] unless the column is spinning;
    /// [`EngineError::DimensionMismatch`] on wrong arity.
    pub fn begin_stop_column(
        &mut self,
        col: usize,
        final_types: Vec<TypeCode>,
        now_ms: u64,
        scheduler: &mut TweenScheduler<AnimTag>,
        timing: &TimingConfig,
    ) -> Result<(), EngineError> {
        self.reels[col].begin_stop(final_types, now_ms, scheduler, timing)
    }

    /// State of one column.
    #[must_use]
    pub fn column_state(&self, col: usize) -> ReelState {
        self.reels[col].state()
    }

    /// Sets the highlight flag on every member of every cluster.
    pub fn set_highlights(&mut self, clusters: &[Cluster], on: bool) {
        for cluster in clusters {
            for &cell in &cluster.cells {
                if let Some(id) = self.reels[cell.col].symbol_at(cell.row) {
                    self.pool.get_mut(id).set_highlight(on);
                }
            }
        }
    }

    /// Starts explode animations on every cluster member, returning the
    /// number of symbols that actually started exploding.
    pub fn explode(
        &mut self,
        clusters: &[Cluster],
        scheduler: &mut TweenScheduler<AnimTag>,
        timing: &TimingConfig,
    ) -> usize {
        let mut started = 0;
        for (col, rows) in Cluster::rows_by_column(clusters) {
            started += self.reels[col].explode_rows(&rows, scheduler, &self.pool, timing);
        }
        started
    }

    /// Number of gaps per column, left to right.
    #[must_use]
    pub fn missing_per_column(&self) -> Vec<usize> {
        self.reels
            .iter()
            .map(|reel| reel.missing_count(&self.pool))
            .collect()
    }

    /// Starts the concurrent drop-and-refill on every column.
    ///
    /// `new_types_per_col[c]` lists the replacement types for column `c`,
    /// top-down. Columns with no gaps still re-seat their survivors so the
    /// whole board settles together.
    pub fn drop_and_refill<R: Rng + ?Sized>(
        &mut self,
        new_types_per_col: &[Vec<TypeCode>],
        scheduler: &mut TweenScheduler<AnimTag>,
        rng: &mut R,
        timing: &TimingConfig,
    ) {
        let empty = Vec::new();
        for reel in &mut self.reels {
            let new_types = new_types_per_col.get(reel.index()).unwrap_or(&empty);
            reel.drop_and_refill(new_types, scheduler, &mut self.pool, rng, &self.config, timing);
        }
    }

    /// Forces every column to a settled state immediately.
    ///
    /// The scheduler tweens driving the columns must be dropped alongside;
    /// see [`Reel::halt`].
    pub fn halt_all(&mut self) {
        for reel in &mut self.reels {
            reel.halt(&mut self.pool);
        }
        debug!(cols = self.reels.len(), "board halted");
    }

    /// Routes a batch of tween frames to their columns.
    pub fn apply_frames(&mut self, frames: &[TweenFrame<AnimTag>]) {
        for frame in frames {
            let col = frame.tag.col();
            if let Some(reel) = self.reels.get_mut(col) {
                reel.apply_frame(frame, &mut self.pool);
            }
        }
    }

    /// Advances every column by one clock tick.
    pub fn tick<R: Rng>(&mut self, now_ms: u64, dt_ms: u64, rng: &mut R) {
        for reel in &mut self.reels {
            reel.tick(now_ms, dt_ms, &mut self.pool, rng, &self.config);
        }
    }
}
