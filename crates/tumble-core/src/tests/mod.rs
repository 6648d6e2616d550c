//! Engine-level test module.
//!
//! - `integration.rs`: full rounds through the phase machine, cascades,
//!   stagger timing, and refill accounting
//! - `determinism.rs`: same seed, same round; tick granularity independence
//! - `helpers.rs`: scripted outcome service and stepping utilities

mod helpers;
mod integration;

pub use helpers::*;
