//! # Tumble Core
//!
//! Deterministic resolution engine for a grid-based cluster-matching game.
//!
//! The engine drives one round from trigger to settled board: columns spin
//! and stop against a service-provided matrix, matched clusters of four or
//! more orthogonally connected symbols (wildcards joining any group) explode,
//! replacements drop in, and detection repeats until the board holds no
//! cluster. Everything runs off an injected virtual clock, so a full round
//! with seconds of animation resolves in microseconds of wall time and two
//! engines with the same seed and service produce identical rounds.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use tumble_core::{BoardConfig, Engine, Grid, SimulatedService, TimingConfig};
//!
//! let config = BoardConfig::default();
//! let service = Box::new(SimulatedService::new(config.clone(), 42));
//! let start = Grid::parse_rows(&["01010", "10101", "01010", "10101", "01010"])?;
//! let mut engine = Engine::new(config, TimingConfig::default(), &start, service, 42)?;
//!
//! engine.start_round()?;
//! while engine.is_busy() {
//!     engine.tick(16)?; // one 60fps frame of virtual time
//! }
//! println!("score: {}", engine.report().total_score());
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::cast_precision_loss)]

pub mod board;
pub mod clock;
pub mod cluster;
pub mod config;
pub mod error;
pub mod grid;
pub mod pool;
pub mod reel;
pub mod round;
pub mod service;
pub mod symbol;
pub mod tween;

#[cfg(test)]
mod tests;

pub use board::Board;
pub use clock::TickClock;
pub use cluster::{find_clusters, Cluster};
pub use config::{BoardConfig, TimingConfig};
pub use error::EngineError;
pub use grid::{Cell, Grid, TypeCode};
pub use pool::SymbolPool;
pub use reel::{AnimTag, Reel, ReelState};
pub use round::{CascadeStep, Engine, RoundReport};
pub use service::{ClusterHint, OutcomeService, RefillOutcome, SimulatedService, SpinOutcome};
pub use symbol::{Symbol, SymbolFlags, SymbolId};
pub use tween::{Easing, TweenFrame, TweenId, TweenScheduler};
