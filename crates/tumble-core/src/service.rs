//! Outcome service: where final matrices and refill symbols come from.
//!
//! The round engine never invents its own results. It requests a spin
//! outcome (the full settled matrix plus pre-scored cluster hints) and,
//! after each explosion, a refill batch. Both are served through the
//! poll-based [`OutcomeService`] trait so the engine stays tick-driven:
//! a request is fired once and polled every tick until the response is due.
//!
//! [`SimulatedService`] is the built-in implementation. It answers from a
//! seeded generator with a latency model shaped like a real backend: a
//! baseline, uniform jitter, and an occasional long stall.

use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::cluster::{find_clusters, Cluster};
use crate::config::BoardConfig;
use crate::error::EngineError;
use crate::grid::{Cell, Grid, TypeCode};

/// Points awarded per cluster member.
pub const SCORE_PER_CELL: f64 = 0.5;

/// Share of generated cells that come up wildcard.
const WILDCARD_WEIGHT: f64 = 0.1;

/// One pre-scored cluster in a spin outcome.
///
/// Travels as a compact wire string `"<type>;<idx>,<idx>,...;<score>"`
/// where each index is `row * cols + col` and the score carries two
/// decimals. The engine treats the score as authoritative and never
/// recomputes it for hinted clusters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterHint {
    /// Matched type (never the wildcard).
    pub type_code: TypeCode,
    /// Member cells in detector order.
    pub cells: Vec<Cell>,
    /// Points awarded for this cluster.
    pub score: f64,
}

impl ClusterHint {
    /// Builds a hint from a detected cluster with the standard per-cell
    /// scoring.
    #[must_use]
    pub fn from_cluster(cluster: &Cluster) -> Self {
        Self {
            type_code: cluster.type_code,
            cells: cluster.cells.clone(),
            score: cluster.cells.len() as f64 * SCORE_PER_CELL,
        }
    }

    /// Encodes the hint as its wire string.
    #[must_use]
    pub fn to_wire(&self, cols: usize) -> String {
        let cells = self
            .cells
            .iter()
            .map(|cell| cell.to_index(cols).to_string())
            .collect::<Vec<_>>()
            .join(",");
        format!("{};{};{:.2}", self.type_code, cells, self.score)
    }

    /// Parses a wire string against a board of `rows` x `cols`.
    ///
    /// # Errors
    ///
    /// [`EngineError::MalformedHint`] on any structural problem, or
    /// [`EngineError::CellOutOfRange`] for an index outside the board.
    pub fn parse(raw: &str, rows: usize, cols: usize) -> Result<Self, EngineError> {
        let malformed = |reason: &str| EngineError::MalformedHint {
            raw: raw.to_owned(),
            reason: reason.to_owned(),
        };

        let mut fields = raw.split(';');
        let (Some(type_field), Some(cell_field), Some(score_field), None) =
            (fields.next(), fields.next(), fields.next(), fields.next())
        else {
            return Err(malformed("expected 3 semicolon-separated fields"));
        };

        let mut chars = type_field.chars();
        let (Some(code), None) = (chars.next(), chars.next()) else {
            return Err(malformed("type field must be a single character"));
        };

        let mut cells = Vec::new();
        for part in cell_field.split(',') {
            let index: usize = part
                .parse()
                .map_err(|_| malformed("cell index is not a number"))?;
            cells.push(Cell::from_index(index, rows, cols)?);
        }
        if cells.is_empty() {
            return Err(malformed("no cells"));
        }

        let score: f64 = score_field
            .parse()
            .map_err(|_| malformed("score is not a number"))?;

        Ok(Self {
            type_code: TypeCode::new(code),
            cells,
            score,
        })
    }
}

/// A complete spin result: the matrix every column settles to, plus the
/// clusters the backend already found and scored in it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpinOutcome {
    /// Final settled matrix.
    pub matrix: Grid,
    /// Wire-encoded cluster hints, possibly empty.
    pub hints: Vec<String>,
}

/// Replacement symbols for one refill, top-down per column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RefillOutcome {
    /// `columns[c]` lists the new types for column `c`.
    pub columns: Vec<Vec<TypeCode>>,
}

/// Source of spin and refill results.
///
/// Requests fire once; the engine polls with the current virtual time until
/// the response is due. At most one request of each kind is in flight.
pub trait OutcomeService {
    /// Fires a spin request at `now_ms`.
    fn request_spin(&mut self, now_ms: u64);

    /// Returns the spin outcome once due, consuming it.
    fn poll_spin(&mut self, now_ms: u64) -> Option<SpinOutcome>;

    /// Fires a refill request for `missing[c]` symbols per column.
    fn request_refill(&mut self, missing: &[usize], now_ms: u64);

    /// Returns the refill outcome once due, consuming it.
    fn poll_refill(&mut self, now_ms: u64) -> Option<RefillOutcome>;
}

/// Deterministic stand-in for a remote outcome backend.
///
/// All randomness flows from one seeded stream, so a given seed and request
/// sequence always produces the same matrices, hints, and latencies.
#[derive(Debug)]
pub struct SimulatedService {
    config: BoardConfig,
    rng: ChaCha8Rng,
    pending_spin: Option<(u64, SpinOutcome)>,
    pending_refill: Option<(u64, RefillOutcome)>,
}

impl SimulatedService {
    /// Creates a service answering for boards shaped by `config`.
    #[must_use]
    pub fn new(config: BoardConfig, seed: u64) -> Self {
        Self {
            config,
            rng: ChaCha8Rng::seed_from_u64(seed),
            pending_spin: None,
            pending_refill: None,
        }
    }

    /// Samples one cell type: wildcard at [`WILDCARD_WEIGHT`], otherwise
    /// uniform over the non-wild alphabet.
    fn weighted_type(&mut self) -> TypeCode {
        if self.rng.gen_bool(WILDCARD_WEIGHT) {
            self.config.wildcard
        } else {
            let non_wild: Vec<TypeCode> = self.config.non_wild().collect();
            non_wild[self.rng.gen_range(0..non_wild.len())]
        }
    }

    fn generate_matrix(&mut self) -> Grid {
        let (rows, cols) = (self.config.rows, self.config.cols);
        let mut lines = Vec::with_capacity(rows);
        for _ in 0..rows {
            lines.push((0..cols).map(|_| self.weighted_type()).collect());
        }
        Grid::from_rows(lines).expect("generated matrix is rectangular")
    }

    /// Spin latency: 100ms baseline, up to 1.5s jitter, and a 20% chance
    /// of a 2s stall.
    fn spin_latency_ms(&mut self) -> u64 {
        let jitter = self.rng.gen_range(0.0..1500.0) as u64;
        let stall = if self.rng.gen::<f64>() > 0.8 { 2000 } else { 0 };
        100 + jitter + stall
    }

    /// Refill latency: 120ms baseline plus up to 200ms jitter.
    fn refill_latency_ms(&mut self) -> u64 {
        120 + self.rng.gen_range(0.0..200.0) as u64
    }
}

impl OutcomeService for SimulatedService {
    fn request_spin(&mut self, now_ms: u64) {
        debug_assert!(self.pending_spin.is_none(), "spin request already in flight");
        let matrix = self.generate_matrix();
        let clusters = find_clusters(&matrix, self.config.wildcard, self.config.min_cluster_size);
        let hints = clusters
            .iter()
            .map(|c| ClusterHint::from_cluster(c).to_wire(self.config.cols))
            .collect();
        let due = now_ms + self.spin_latency_ms();
        debug!(due, "spin outcome staged");
        self.pending_spin = Some((due, SpinOutcome { matrix, hints }));
    }

    fn poll_spin(&mut self, now_ms: u64) -> Option<SpinOutcome> {
        match self.pending_spin {
            Some((due, _)) if now_ms >= due => self.pending_spin.take().map(|(_, o)| o),
            _ => None,
        }
    }

    fn request_refill(&mut self, missing: &[usize], now_ms: u64) {
        debug_assert!(
            self.pending_refill.is_none(),
            "refill request already in flight"
        );
        let columns = missing
            .iter()
            .map(|&count| (0..count).map(|_| self.weighted_type()).collect())
            .collect();
        let due = now_ms + self.refill_latency_ms();
        debug!(due, "refill outcome staged");
        self.pending_refill = Some((due, RefillOutcome { columns }));
    }

    fn poll_refill(&mut self, now_ms: u64) -> Option<RefillOutcome> {
        match self.pending_refill {
            Some((due, _)) if now_ms >= due => self.pending_refill.take().map(|(_, o)| o),
            _ => None,
        }
    }
}
