//! Column ("reel") state machine.
//!
//! One reel per grid column. A reel owns its slot array of pooled symbols
//! and drives the spin/stop/explode/refill transitions under the injected
//! clock:
//!
//! ```text
//! Idle --begin_spin (after stagger)--> Spinning --begin_stop--> Stopping --tween done--> Idle
//! ```
//!
//! Timer-chained transitions from the reference implementation become
//! explicit: `begin_spin` only *arms* the transition, and the reel flips to
//! Spinning when `tick` observes the due time — no wall-clock waits.
//!
//! Explode and drop are not states: they run as ad-hoc tweens while the reel
//! is Idle, and [`Reel::is_busy`] reports them so the orchestrator can
//! barrier on a whole phase.

use std::fmt;

use rand::{Rng, RngCore};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::{BoardConfig, TimingConfig};
use crate::error::EngineError;
use crate::grid::TypeCode;
use crate::pool::SymbolPool;
use crate::symbol::SymbolId;
use crate::tween::{Easing, TweenFrame, TweenScheduler};

/// Routing tag attached to every tween the engine schedules.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum AnimTag {
    /// The column's continuous position during the stop tween.
    ReelPosition {
        /// Column index.
        col: usize,
    },
    /// Explode fade/shrink of one symbol.
    Explode {
        /// Column index.
        col: usize,
        /// The exploding symbol.
        symbol: SymbolId,
    },
    /// Drop of one symbol toward its target row.
    Drop {
        /// Column index.
        col: usize,
        /// The dropping symbol.
        symbol: SymbolId,
    },
}

impl AnimTag {
    /// Returns the column this tag routes to.
    #[must_use]
    pub const fn col(self) -> usize {
        match self {
            Self::ReelPosition { col }
            | Self::Explode { col, .. }
            | Self::Drop { col, .. } => col,
        }
    }
}

/// Reel lifecycle state.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReelState {
    /// Settled; slots are authoritative.
    Idle,
    /// Advancing continuously; slot contents are cosmetic.
    Spinning,
    /// Decelerating toward the settle target.
    Stopping,
}

impl fmt::Display for ReelState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Spinning => write!(f, "spinning"),
            Self::Stopping => write!(f, "stopping"),
        }
    }
}

/// Samples a cosmetic replacement type for a symbol that wrapped around the
/// visible window while spinning.
///
/// Pure rendering-time variety: the settled types are fully overwritten when
/// the reel stops, so this never affects resolution state.
pub fn sample_wrap_type<R: Rng + ?Sized>(rng: &mut R, config: &BoardConfig) -> TypeCode {
    config.uniform_type(rng)
}

#[derive(Debug, Clone, Copy)]
struct DropAnim {
    symbol: SymbolId,
    from: f32,
    to: f32,
}

#[derive(Debug, Clone, Copy)]
struct ExplodeAnim {
    symbol: SymbolId,
    row: usize,
}

/// One grid column and its animation state machine.
#[derive(Debug)]
pub struct Reel {
    index: usize,
    rows: usize,
    slots: Vec<Option<SymbolId>>,
    state: ReelState,
    /// Continuous position in row units; integral when settled.
    position: f32,
    prev_position: f32,
    /// Rows per second, randomized once per column within a narrow band.
    spin_speed: f32,
    /// Armed Idle -> Spinning transition.
    spin_due_ms: Option<u64>,
    /// Final types to commit when the stop tween completes.
    pending_stop: Option<Vec<TypeCode>>,
    drops: Vec<DropAnim>,
    explosions: Vec<ExplodeAnim>,
}

impl Reel {
    /// Builds a settled reel populated from `start_types`, top-down.
    ///
    /// The per-column spin speed is drawn once from the configured band.
    ///
    /// # Panics
    ///
    /// Panics if `start_types` does not cover every row; the board validates
    /// the starting matrix before construction.
    pub fn new<R: Rng + ?Sized>(
        index: usize,
        rows: usize,
        start_types: &[TypeCode],
        pool: &mut SymbolPool,
        rng: &mut R,
        timing: &TimingConfig,
    ) -> Self {
        assert_eq!(start_types.len(), rows, "start types must cover every row");
        let slots = start_types
            .iter()
            .enumerate()
            .map(|(row, &code)| {
                let id = pool.acquire(code);
                pool.get_mut(id).set_offset(row as f32);
                Some(id)
            })
            .collect();
        Self {
            index,
            rows,
            slots,
            state: ReelState::Idle,
            position: 0.0,
            prev_position: 0.0,
            spin_speed: rng.gen_range(timing.spin_speed_min..=timing.spin_speed_max),
            spin_due_ms: None,
            pending_stop: None,
            drops: Vec::new(),
            explosions: Vec::new(),
        }
    }

    /// Column index.
    #[must_use]
    pub const fn index(&self) -> usize {
        self.index
    }

    /// Current lifecycle state.
    #[must_use]
    pub const fn state(&self) -> ReelState {
        self.state
    }

    /// Continuous position in row units.
    #[must_use]
    pub const fn position(&self) -> f32 {
        self.position
    }

    /// Position change over the last tick. Consumers derive motion blur
    /// from this.
    #[must_use]
    pub fn position_delta(&self) -> f32 {
        self.position - self.prev_position
    }

    /// True while any transition or entity animation is in flight.
    #[must_use]
    pub fn is_busy(&self) -> bool {
        self.state != ReelState::Idle
            || self.spin_due_ms.is_some()
            || !self.drops.is_empty()
            || !self.explosions.is_empty()
    }

    /// Type at `row`, or `None` for an empty or invisible slot.
    #[must_use]
    pub fn type_at(&self, row: usize, pool: &SymbolPool) -> Option<TypeCode> {
        self.slots.get(row).copied().flatten().and_then(|id| {
            let symbol = pool.get(id);
            symbol.is_visible().then(|| symbol.type_code())
        })
    }

    /// Symbol occupying `row`, if any.
    #[must_use]
    pub fn symbol_at(&self, row: usize) -> Option<SymbolId> {
        self.slots.get(row).copied().flatten()
    }

    /// Number of slots that are empty or hold an invisible symbol.
    #[must_use]
    pub fn missing_count(&self, pool: &SymbolPool) -> usize {
        (0..self.rows)
            .filter(|&row| self.type_at(row, pool).is_none())
            .count()
    }

    /// Arms the Idle -> Spinning transition to fire `stagger_ms` from now.
    ///
    /// # Errors
    ///
    /// [`EngineError::ColumnState`] unless the reel is idle.
    pub fn begin_spin(&mut self, stagger_ms: u64, now_ms: u64) -> Result<(), EngineError> {
        if self.state != ReelState::Idle {
            return Err(EngineError::ColumnState {
                col: self.index,
                op: "begin spin",
                state: self.state,
            });
        }
        self.spin_due_ms = Some(now_ms + stagger_ms);
        Ok(())
    }

    /// Begins decelerating toward a settle target and stages `final_types`
    /// for commit when the tween lands.
    ///
    /// The target is `ceil(position) + extra` whole rows, where `extra`
    /// grows with the column index for the staggered settle feel.
    ///
    /// # Errors
    ///
    /// [`EngineError::ColumnState`] unless the reel is spinning;
    /// [`EngineError::DimensionMismatch`] if `final_types` does not cover
    /// every row.
    pub fn begin_stop(
        &mut self,
        final_types: Vec<TypeCode>,
        now_ms: u64,
        scheduler: &mut TweenScheduler<AnimTag>,
        timing: &TimingConfig,
    ) -> Result<(), EngineError> {
        if self.state != ReelState::Spinning {
            return Err(EngineError::ColumnState {
                col: self.index,
                op: "begin stop",
                state: self.state,
            });
        }
        if final_types.len() != self.rows {
            return Err(EngineError::DimensionMismatch {
                expected_rows: self.rows,
                expected_cols: 1,
                rows: final_types.len(),
                cols: 1,
            });
        }

        self.state = ReelState::Stopping;
        self.pending_stop = Some(final_types);

        let extra = (timing.stop_extra_rows as usize + self.index) as f32;
        let target = self.position.ceil() + extra;
        scheduler.animate(
            AnimTag::ReelPosition { col: self.index },
            self.position,
            target,
            timing.stop_ms,
            Easing::Backout(0.2),
            now_ms,
        );
        debug!(col = self.index, target, "reel stopping");
        Ok(())
    }

    /// Advances the reel by one clock tick.
    ///
    /// Fires an armed spin start when its stagger elapses, advances the
    /// position while spinning, and keeps the cosmetic slot layout in sync,
    /// re-skinning symbols that wrap past the top of the window.
    pub fn tick<R: Rng>(
        &mut self,
        now_ms: u64,
        dt_ms: u64,
        pool: &mut SymbolPool,
        rng: &mut R,
        config: &BoardConfig,
    ) {
        if let Some(due) = self.spin_due_ms {
            if now_ms >= due {
                self.spin_due_ms = None;
                self.state = ReelState::Spinning;
                self.prev_position = self.position;
                debug!(col = self.index, "reel spinning");
            }
        }

        match self.state {
            ReelState::Idle => (),
            ReelState::Spinning => {
                self.prev_position = self.position;
                self.position += self.spin_speed * dt_ms as f32 / 1000.0;
                self.layout_spinning(pool, Some((rng as &mut dyn RngCore, config)));
            }
            ReelState::Stopping => {
                // Position is driven by the stop tween; only the layout
                // follows here, with wrap re-skinning disabled.
                self.layout_spinning(pool, None);
            }
        }
    }

    /// Places every resident symbol at its wrapped spin offset.
    ///
    /// Mirrors the reference layout: slot `i` sits at
    /// `((position + i) mod rows) - 1`, giving one row of lead-in above the
    /// window. When `reskin` is supplied, a symbol that wraps from the
    /// bottom back to the top is re-skinned with a random type.
    fn layout_spinning(
        &mut self,
        pool: &mut SymbolPool,
        mut reskin: Option<(&mut dyn RngCore, &BoardConfig)>,
    ) {
        let n = self.rows as f32;
        for (i, slot) in self.slots.iter().enumerate() {
            let Some(id) = *slot else { continue };
            let prev = pool.get(id).offset();
            let offset = (self.position + i as f32).rem_euclid(n) - 1.0;
            pool.get_mut(id).set_offset(offset);

            if offset < 0.0 && prev > 1.0 {
                if let Some((rng, config)) = reskin.as_mut() {
                    let code = sample_wrap_type(*rng, config);
                    pool.get_mut(id).set_type_code(code);
                }
            }
        }
    }

    /// Routes a tween frame addressed to this reel.
    pub fn apply_frame(&mut self, frame: &TweenFrame<AnimTag>, pool: &mut SymbolPool) {
        match frame.tag {
            AnimTag::ReelPosition { .. } => {
                self.prev_position = self.position;
                self.position = frame.value;
                self.layout_spinning(pool, None);
                if frame.done {
                    self.finish_stop(pool);
                }
            }
            AnimTag::Explode { symbol, .. } => {
                let s = pool.get_mut(symbol);
                s.set_scale(1.0 - frame.value);
                s.set_alpha(1.0 - frame.value);
                if frame.done {
                    self.finish_explode(symbol, pool);
                }
            }
            AnimTag::Drop { symbol, .. } => {
                if let Some(anim) = self.drops.iter().find(|d| d.symbol == symbol).copied() {
                    let eased = frame.value;
                    let offset = anim.from + (anim.to - anim.from) * eased;
                    pool.get_mut(symbol).set_offset(offset);
                    if frame.done {
                        self.finish_drop(anim, pool);
                    }
                }
            }
        }
    }

    /// Commits the staged stop: snap to the integer target, populate every
    /// slot with the final types, and return to Idle.
    fn finish_stop(&mut self, pool: &mut SymbolPool) {
        self.position = self.position.ceil();
        self.prev_position = self.position;

        let types = self
            .pending_stop
            .take()
            .expect("stop tween completed without staged types");
        for (row, &code) in types.iter().enumerate() {
            let id = match self.slots[row] {
                Some(id) => id,
                None => {
                    let id = pool.acquire(code);
                    self.slots[row] = Some(id);
                    id
                }
            };
            // Resident symbols are reused in place, re-skinned and reset.
            let symbol = pool.get_mut(id);
            symbol.reset(code);
            symbol.set_offset(row as f32);
        }
        self.state = ReelState::Idle;
        debug!(col = self.index, "reel settled");
    }

    /// Forces the column to a settled state immediately.
    ///
    /// An armed spin is disarmed and a staged stop is discarded; in-flight
    /// explode and drop animations jump straight to their end state. The
    /// caller drops the scheduler tweens that were driving them.
    pub fn halt(&mut self, pool: &mut SymbolPool) {
        self.spin_due_ms = None;
        self.pending_stop = None;

        for anim in std::mem::take(&mut self.explosions) {
            self.slots[anim.row] = None;
            pool.release(anim.symbol);
        }
        for anim in std::mem::take(&mut self.drops) {
            self.finish_drop(anim, pool);
        }

        self.position = self.position.ceil();
        self.prev_position = self.position;
        for row in 0..self.rows {
            if let Some(id) = self.slots[row] {
                pool.get_mut(id).set_offset(row as f32);
            }
        }
        self.state = ReelState::Idle;
        debug!(col = self.index, "reel halted");
    }

    /// Starts the explode animation on every visible occupied slot among
    /// `rows`, and returns how many actually started.
    ///
    /// Already-empty or invisible slots are silently skipped. Each
    /// completion releases the symbol back to the pool and leaves a gap.
    pub fn explode_rows(
        &mut self,
        rows: &[usize],
        scheduler: &mut TweenScheduler<AnimTag>,
        pool: &SymbolPool,
        timing: &TimingConfig,
    ) -> usize {
        let mut started = 0;
        for &row in rows {
            debug_assert!(row < self.rows, "explode row {row} out of range");
            let Some(id) = self.slots.get(row).copied().flatten() else {
                continue;
            };
            if !pool.get(id).is_visible() {
                continue;
            }
            scheduler.run(
                AnimTag::Explode {
                    col: self.index,
                    symbol: id,
                },
                timing.explode_ms,
                Easing::OutCubic,
            );
            self.explosions.push(ExplodeAnim { symbol: id, row });
            started += 1;
        }
        debug!(col = self.index, started, "explode started");
        started
    }

    fn finish_explode(&mut self, symbol: SymbolId, pool: &mut SymbolPool) {
        if let Some(pos) = self.explosions.iter().position(|e| e.symbol == symbol) {
            let anim = self.explosions.swap_remove(pos);
            self.slots[anim.row] = None;
            pool.release(symbol);
        }
    }

    /// Rebuilds the column after explosions: survivors keep their relative
    /// order and fall to the bottom, new symbols typed from
    /// `new_types_top_down` fill the gap from the top, and everything drops
    /// to its target row concurrently.
    ///
    /// If the caller supplied fewer types than there are gaps, the rest are
    /// padded with uniformly random codes — a still-visible survivor is
    /// never duplicated into two slots. Oversupply is truncated.
    pub fn drop_and_refill<R: Rng + ?Sized>(
        &mut self,
        new_types_top_down: &[TypeCode],
        scheduler: &mut TweenScheduler<AnimTag>,
        pool: &mut SymbolPool,
        rng: &mut R,
        config: &BoardConfig,
        timing: &TimingConfig,
    ) {
        debug_assert_eq!(self.state, ReelState::Idle, "refill on a moving reel");

        let survivors: Vec<SymbolId> = (0..self.rows)
            .filter_map(|row| self.slots[row])
            .filter(|&id| pool.get(id).is_visible())
            .collect();

        let missing = self.rows - survivors.len();
        if new_types_top_down.len() < missing {
            warn!(
                col = self.index,
                supplied = new_types_top_down.len(),
                missing,
                "refill shortfall, padding with random types"
            );
        }

        let mut column = Vec::with_capacity(self.rows);
        for i in 0..missing {
            let code = new_types_top_down
                .get(i)
                .copied()
                .unwrap_or_else(|| config.uniform_type(rng));
            let id = pool.acquire(code);
            // Spawn above the visible window, stacked so the block falls
            // as one contiguous run.
            pool.get_mut(id).set_offset(i as f32 - missing as f32);
            column.push(id);
        }
        column.extend(survivors);

        for (row, &id) in column.iter().enumerate() {
            self.slots[row] = Some(id);
            let from = pool.get(id).offset();
            pool.get_mut(id).set_highlight(false);
            scheduler.run(
                AnimTag::Drop {
                    col: self.index,
                    symbol: id,
                },
                timing.drop_ms,
                Easing::InCubic,
            );
            self.drops.push(DropAnim {
                symbol: id,
                from,
                to: row as f32,
            });
        }
        debug!(col = self.index, missing, "drop and refill started");
    }

    fn finish_drop(&mut self, anim: DropAnim, pool: &mut SymbolPool) {
        let symbol = pool.get_mut(anim.symbol);
        symbol.set_offset(anim.to);
        symbol.set_visible(true);
        symbol.set_alpha(1.0);
        symbol.set_scale(1.0);
        self.drops.retain(|d| d.symbol != anim.symbol);
    }
}
