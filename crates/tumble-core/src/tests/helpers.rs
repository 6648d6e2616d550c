//! Test setup utilities: a scripted outcome service and stepping helpers.

use std::collections::VecDeque;

use crate::cluster::find_clusters;
use crate::config::{BoardConfig, TimingConfig};
use crate::grid::{Grid, TypeCode};
use crate::round::Engine;
use crate::service::{ClusterHint, OutcomeService, RefillOutcome, SpinOutcome};

/// Parses a type string into a column of codes.
pub fn codes(s: &str) -> Vec<TypeCode> {
    s.chars().map(TypeCode::new).collect()
}

/// Parses a grid from row strings.
pub fn grid(rows: &[&str]) -> Grid {
    Grid::parse_rows(rows).expect("test grid is well formed")
}

/// A checkerboard matrix in which no cluster can ever form.
pub fn quiet_grid() -> Grid {
    grid(&["01010", "10101", "01010", "10101", "01010"])
}

/// Builds a spin outcome for `matrix` with hints computed the way the
/// backend would.
pub fn outcome_for(matrix: &Grid, config: &BoardConfig) -> SpinOutcome {
    let clusters = find_clusters(matrix, config.wildcard, config.min_cluster_size);
    let hints = clusters
        .iter()
        .map(|c| ClusterHint::from_cluster(c).to_wire(config.cols))
        .collect();
    SpinOutcome {
        matrix: matrix.clone(),
        hints,
    }
}

/// An outcome service that replays a fixed script with fixed latencies.
///
/// Every `request_refill` call is recorded so tests can assert the engine
/// asked for exactly the gaps the explosions left.
pub struct ScriptedService {
    spin_latency_ms: u64,
    refill_latency_ms: u64,
    spins: VecDeque<SpinOutcome>,
    refills: VecDeque<RefillOutcome>,
    pending_spin: Option<(u64, SpinOutcome)>,
    pending_refill: Option<(u64, RefillOutcome)>,
    /// The `missing` slice of every refill request, in order.
    pub refill_requests: std::rc::Rc<std::cell::RefCell<Vec<Vec<usize>>>>,
}

impl Default for ScriptedService {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptedService {
    /// Creates a service with 200ms spin latency and 120ms refill latency.
    pub fn new() -> Self {
        Self {
            spin_latency_ms: 200,
            refill_latency_ms: 120,
            spins: VecDeque::new(),
            refills: VecDeque::new(),
            pending_spin: None,
            pending_refill: None,
            refill_requests: std::rc::Rc::new(std::cell::RefCell::new(Vec::new())),
        }
    }

    /// Queues a spin outcome for `matrix`, hints included.
    pub fn push_spin(&mut self, matrix: &Grid, config: &BoardConfig) -> &mut Self {
        self.spins.push_back(outcome_for(matrix, config));
        self
    }

    /// Queues a raw spin outcome, hints and all.
    pub fn push_spin_raw(&mut self, outcome: SpinOutcome) -> &mut Self {
        self.spins.push_back(outcome);
        self
    }

    /// Queues one refill batch, one type string per column (top-down).
    pub fn push_refill(&mut self, columns: &[&str]) -> &mut Self {
        self.refills.push_back(RefillOutcome {
            columns: columns.iter().map(|s| codes(s)).collect(),
        });
        self
    }

    /// Shared handle to the recorded refill requests.
    pub fn request_log(&self) -> std::rc::Rc<std::cell::RefCell<Vec<Vec<usize>>>> {
        std::rc::Rc::clone(&self.refill_requests)
    }
}

impl OutcomeService for ScriptedService {
    fn request_spin(&mut self, now_ms: u64) {
        let outcome = self.spins.pop_front().expect("spin script exhausted");
        self.pending_spin = Some((now_ms + self.spin_latency_ms, outcome));
    }

    fn poll_spin(&mut self, now_ms: u64) -> Option<SpinOutcome> {
        match self.pending_spin {
            Some((due, _)) if now_ms >= due => self.pending_spin.take().map(|(_, o)| o),
            _ => None,
        }
    }

    fn request_refill(&mut self, missing: &[usize], now_ms: u64) {
        self.refill_requests.borrow_mut().push(missing.to_vec());
        let outcome = self.refills.pop_front().expect("refill script exhausted");
        self.pending_refill = Some((now_ms + self.refill_latency_ms, outcome));
    }

    fn poll_refill(&mut self, now_ms: u64) -> Option<RefillOutcome> {
        match self.pending_refill {
            Some((due, _)) if now_ms >= due => self.pending_refill.take().map(|(_, o)| o),
            _ => None,
        }
    }
}

/// Builds an engine over the quiet starting board and the given script.
pub fn scripted_engine(service: ScriptedService, timing: TimingConfig, seed: u64) -> Engine {
    Engine::new(
        BoardConfig::default(),
        timing,
        &quiet_grid(),
        Box::new(service),
        seed,
    )
    .expect("engine construction")
}

/// Starts a round and ticks with `dt_ms` until the engine returns to idle.
///
/// Panics if the round does not complete within five virtual minutes.
pub fn run_round(engine: &mut Engine, dt_ms: u64) {
    engine.start_round().expect("round start");
    let deadline = engine.clock().now_ms() + 300_000;
    while engine.is_busy() {
        engine.tick(dt_ms).expect("engine tick");
        assert!(engine.clock().now_ms() < deadline, "round never completed");
    }
}
