//! Round orchestrator: the phase machine that carries one spin from
//! trigger to settled board through any number of cascade steps.
//!
//! ```text
//! Idle -> Spinning -> Stopping -> SettlePause -> Detect
//!           ^                                      |
//!           |              no clusters <-----------+----> clusters found
//!           |                   |                              |
//!         Idle <----------------+                        HighlightHold
//!                                                              |
//!                  Dropping <- RefillPause <- AwaitingRefill <- Exploding
//!                     |
//!                     +--------------------> Detect (cascade continues)
//! ```
//!
//! Everything advances through [`Engine::tick`]; no phase ever blocks. The
//! cascade terminates because every step removes at least `min_cluster_size`
//! symbols and the refill is finite, so a round always returns to Idle.

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::board::Board;
use crate::clock::TickClock;
use crate::cluster::{find_clusters, Cluster};
use crate::config::{BoardConfig, TimingConfig};
use crate::error::EngineError;
use crate::grid::{Grid, TypeCode};
use crate::reel::{AnimTag, ReelState};
use crate::service::{ClusterHint, OutcomeService, SpinOutcome};
use crate::tween::TweenScheduler;

/// One detect-explode-refill iteration of a cascade.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CascadeStep {
    /// The clusters resolved in this step, with their scores.
    pub clusters: Vec<ClusterHint>,
}

impl CascadeStep {
    /// Sum of this step's cluster scores.
    #[must_use]
    pub fn score(&self) -> f64 {
        self.clusters.iter().map(|c| c.score).sum()
    }

    /// Total cells removed by this step, wildcards included.
    #[must_use]
    pub fn cells_removed(&self) -> usize {
        self.clusters.iter().map(|c| c.cells.len()).sum()
    }
}

/// Accumulated result of the current (or most recent) round.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RoundReport {
    /// Cascade steps in resolution order.
    pub steps: Vec<CascadeStep>,
    /// True once the round has returned to idle.
    pub complete: bool,
}

impl RoundReport {
    /// Total score across all steps so far.
    #[must_use]
    pub fn total_score(&self) -> f64 {
        self.steps.iter().map(CascadeStep::score).sum()
    }
}

#[derive(Debug)]
enum RoundPhase {
    Idle,
    /// Columns spinning; waiting for the outcome and the minimum spin time.
    Spinning { started_ms: u64 },
    /// Outcome in hand; issuing staggered per-column stops.
    Stopping {
        matrix: Grid,
        anchor_ms: u64,
        next_col: usize,
    },
    /// Board settled after the stop; brief hold before detection.
    SettlePause { until_ms: u64 },
    Detect,
    /// Clusters highlighted; hold before they explode.
    HighlightHold { until_ms: u64, clusters: Vec<Cluster> },
    /// Explode animations in flight.
    Exploding,
    /// Refill requested; polling for the replacement symbols.
    AwaitingRefill,
    /// Refill in hand; brief hold before the drop.
    RefillPause {
        until_ms: u64,
        columns: Vec<Vec<TypeCode>>,
    },
    /// Drop animations in flight; detection repeats when they land.
    Dropping,
}

/// The resolution engine: board, animation scheduler, outcome service, and
/// the round phase machine, all under one injected clock.
pub struct Engine {
    timing: TimingConfig,
    clock: TickClock,
    scheduler: TweenScheduler<AnimTag>,
    board: Board,
    service: Box<dyn OutcomeService>,
    rng: ChaCha8Rng,
    phase: RoundPhase,
    report: RoundReport,
    /// Parsed hints from the last spin outcome, consumed by the first
    /// detection pass.
    pending_hints: Vec<ClusterHint>,
}

impl Engine {
    /// Builds an engine over a settled starting matrix.
    ///
    /// `seed` drives only presentation randomness (spin speeds, wrap
    /// re-skins, refill shortfall padding); outcomes come from `service`.
    ///
    /// # Errors
    ///
    /// Propagates configuration and matrix validation failures.
    pub fn new(
        config: BoardConfig,
        timing: TimingConfig,
        start: &Grid,
        service: Box<dyn OutcomeService>,
        seed: u64,
    ) -> Result<Self, EngineError> {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let board = Board::new(config, start, &mut rng, &timing)?;
        Ok(Self {
            timing,
            clock: TickClock::new(),
            scheduler: TweenScheduler::new(),
            board,
            service,
            rng,
            phase: RoundPhase::Idle,
            report: RoundReport::default(),
            pending_hints: Vec::new(),
        })
    }

    /// The playfield.
    #[must_use]
    pub const fn board(&self) -> &Board {
        &self.board
    }

    /// The injected clock.
    #[must_use]
    pub const fn clock(&self) -> &TickClock {
        &self.clock
    }

    /// Result of the current or most recent round.
    #[must_use]
    pub const fn report(&self) -> &RoundReport {
        &self.report
    }

    /// True while a round is resolving.
    #[must_use]
    pub const fn is_busy(&self) -> bool {
        !matches!(self.phase, RoundPhase::Idle)
    }

    /// Triggers a round: arms the staggered spin and fires the outcome
    /// request.
    ///
    /// # Errors
    ///
    /// [`EngineError::RoundInProgress`] if the previous round has not
    /// finished.
    pub fn start_round(&mut self) -> Result<(), EngineError> {
        if self.is_busy() || self.board.any_busy() {
            return Err(EngineError::RoundInProgress);
        }
        let now = self.clock.now_ms();
        self.report = RoundReport::default();
        self.pending_hints.clear();
        self.board.begin_spin_all(now, &self.timing)?;
        self.service.request_spin(now);
        self.phase = RoundPhase::Spinning { started_ms: now };
        info!(now, "round started");
        Ok(())
    }

    /// Advances the engine by `dt_ms` of virtual time.
    ///
    /// # Errors
    ///
    /// Propagates malformed outcome data from the service. The failed round
    /// is abandoned and the board forced back to a settled state, so a new
    /// round can start afterwards. Animation and phase progress never fail.
    pub fn tick(&mut self, dt_ms: u64) -> Result<(), EngineError> {
        self.clock.advance(dt_ms);
        let now = self.clock.now_ms();

        self.board.tick(now, dt_ms, &mut self.rng);
        let frames = self.scheduler.tick(now, dt_ms);
        self.board.apply_frames(&frames);

        self.advance_phase(now)
    }

    fn advance_phase(&mut self, now: u64) -> Result<(), EngineError> {
        match std::mem::replace(&mut self.phase, RoundPhase::Idle) {
            RoundPhase::Idle => {}

            RoundPhase::Spinning { started_ms } => {
                // Poll only after the minimum spin time: polling consumes
                // the outcome, and an early reply must not shorten the spin.
                let min_elapsed = now >= started_ms + self.timing.min_spin_ms;
                let outcome = if min_elapsed {
                    self.service.poll_spin(now)
                } else {
                    None
                };
                match outcome {
                    Some(outcome) => match self.ingest_outcome(outcome, now) {
                        Ok(phase) => self.phase = phase,
                        Err(err) => {
                            // A bad outcome must not strand the columns
                            // mid-spin: abandon the round so a new one can
                            // start.
                            self.abort_round();
                            return Err(err);
                        }
                    },
                    None => self.phase = RoundPhase::Spinning { started_ms },
                }
            }

            RoundPhase::Stopping {
                matrix,
                anchor_ms,
                next_col,
            } => {
                self.phase = self.step_stops(matrix, anchor_ms, next_col, now)?;
            }

            RoundPhase::SettlePause { until_ms } => {
                self.phase = if now >= until_ms {
                    RoundPhase::Detect
                } else {
                    RoundPhase::SettlePause { until_ms }
                };
            }

            RoundPhase::Detect => {
                // The first iteration trusts the hints the service already
                // computed, scores included; every later iteration detects
                // against the current settled grid and scores locally.
                let hints = std::mem::take(&mut self.pending_hints);
                let scored: Vec<ClusterHint> = if hints.is_empty() {
                    let snapshot = self.board.snapshot()?;
                    let config = self.board.config();
                    find_clusters(&snapshot, config.wildcard, config.min_cluster_size)
                        .iter()
                        .map(ClusterHint::from_cluster)
                        .collect()
                } else {
                    hints
                };
                if scored.is_empty() {
                    self.report.complete = true;
                    info!(
                        steps = self.report.steps.len(),
                        total = self.report.total_score(),
                        "round complete"
                    );
                    self.phase = RoundPhase::Idle;
                } else {
                    let clusters: Vec<Cluster> = scored
                        .iter()
                        .map(|h| Cluster {
                            type_code: h.type_code,
                            cells: h.cells.clone(),
                        })
                        .collect();
                    self.report.steps.push(CascadeStep { clusters: scored });
                    self.board.set_highlights(&clusters, true);
                    debug!(clusters = clusters.len(), "cascade step detected");
                    self.phase = RoundPhase::HighlightHold {
                        until_ms: now + self.timing.highlight_hold_ms,
                        clusters,
                    };
                }
            }

            RoundPhase::HighlightHold { until_ms, clusters } => {
                if now >= until_ms {
                    self.board.explode(&clusters, &mut self.scheduler, &self.timing);
                    self.phase = RoundPhase::Exploding;
                } else {
                    self.phase = RoundPhase::HighlightHold { until_ms, clusters };
                }
            }

            RoundPhase::Exploding => {
                if self.board.any_busy() {
                    self.phase = RoundPhase::Exploding;
                } else {
                    let missing = self.board.missing_per_column();
                    self.service.request_refill(&missing, now);
                    self.phase = RoundPhase::AwaitingRefill;
                }
            }

            RoundPhase::AwaitingRefill => {
                self.phase = match self.service.poll_refill(now) {
                    Some(outcome) => RoundPhase::RefillPause {
                        until_ms: now + self.timing.refill_pause_ms,
                        columns: outcome.columns,
                    },
                    None => RoundPhase::AwaitingRefill,
                };
            }

            RoundPhase::RefillPause { until_ms, columns } => {
                if now >= until_ms {
                    self.board.drop_and_refill(
                        &columns,
                        &mut self.scheduler,
                        &mut self.rng,
                        &self.timing,
                    );
                    self.phase = RoundPhase::Dropping;
                } else {
                    self.phase = RoundPhase::RefillPause { until_ms, columns };
                }
            }

            RoundPhase::Dropping => {
                self.phase = if self.board.any_busy() {
                    RoundPhase::Dropping
                } else {
                    // A refill can create new clusters; the cascade loops
                    // back to detection until none remain.
                    RoundPhase::Detect
                };
            }
        }
        Ok(())
    }

    /// Validates a spin outcome, stages its hints, and issues the first
    /// stops.
    fn ingest_outcome(
        &mut self,
        outcome: SpinOutcome,
        now: u64,
    ) -> Result<RoundPhase, EngineError> {
        let config = self.board.config();
        config.validate_matrix(&outcome.matrix)?;
        self.pending_hints = outcome
            .hints
            .iter()
            .map(|raw| ClusterHint::parse(raw, config.rows, config.cols))
            .collect::<Result<_, _>>()?;
        debug!(hints = self.pending_hints.len(), "outcome received");
        // The arrival tick anchors the stop stagger, and column 0's stop
        // is issued on it.
        self.step_stops(outcome.matrix, now, 0, now)
    }

    /// Abandons the in-flight round: every tween is dropped and every column
    /// forced to a settled state, returning the engine to idle.
    fn abort_round(&mut self) {
        self.scheduler.clear();
        self.board.halt_all();
        self.pending_hints.clear();
        self.phase = RoundPhase::Idle;
        info!("round aborted");
    }

    /// Issues every stop whose stagger slot has arrived, then reports the
    /// phase to hold.
    ///
    /// Stops are anchored to the outcome's arrival tick and staggered per
    /// column; a column must have actually begun spinning before its stop
    /// can be issued.
    fn step_stops(
        &mut self,
        matrix: Grid,
        anchor_ms: u64,
        mut next_col: usize,
        now: u64,
    ) -> Result<RoundPhase, EngineError> {
        while next_col < matrix.cols()
            && now >= anchor_ms + next_col as u64 * self.timing.stagger_ms
            && self.board.column_state(next_col) == ReelState::Spinning
        {
            self.board.begin_stop_column(
                next_col,
                matrix.column(next_col),
                now,
                &mut self.scheduler,
                &self.timing,
            )?;
            next_col += 1;
        }
        if next_col == matrix.cols() && !self.board.any_busy() {
            Ok(RoundPhase::SettlePause {
                until_ms: now + self.timing.settle_pause_ms,
            })
        } else {
            Ok(RoundPhase::Stopping {
                matrix,
                anchor_ms,
                next_col,
            })
        }
    }
}
