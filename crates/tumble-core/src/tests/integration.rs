//! End-to-end rounds through the phase machine.

use crate::config::{BoardConfig, TimingConfig};
use crate::error::EngineError;
use crate::grid::Cell;
use crate::reel::ReelState;
use crate::service::SpinOutcome;

use super::helpers::{grid, quiet_grid, run_round, scripted_engine, ScriptedService};

// =============================================================================
// Round Completion
// =============================================================================

#[test]
fn round_with_no_clusters_completes_without_steps() {
    let config = BoardConfig::default();
    let matrix = grid(&["10101", "01010", "10101", "01010", "10101"]);
    let mut service = ScriptedService::new();
    service.push_spin(&matrix, &config);

    let mut engine = scripted_engine(service, TimingConfig::instant(), 1);
    run_round(&mut engine, 16);

    assert!(engine.report().complete);
    assert!(engine.report().steps.is_empty());
    assert_eq!(engine.report().total_score(), 0.0);
    assert_eq!(engine.board().snapshot().unwrap(), matrix);
}

#[test]
fn single_cascade_step_resolves_and_scores() {
    let config = BoardConfig::default();
    let matrix = grid(&["77777", "10101", "01010", "10101", "01010"]);
    let mut service = ScriptedService::new();
    service.push_spin(&matrix, &config);
    service.push_refill(&["5", "6", "5", "6", "5"]);

    let mut engine = scripted_engine(service, TimingConfig::instant(), 1);
    run_round(&mut engine, 16);

    let report = engine.report();
    assert!(report.complete);
    assert_eq!(report.steps.len(), 1);
    // Five cells at half a point each.
    assert_eq!(report.steps[0].score(), 2.5);
    assert_eq!(
        engine.board().snapshot().unwrap(),
        grid(&["56565", "10101", "01010", "10101", "01010"])
    );
}

#[test]
fn cascade_chains_until_no_clusters_remain() {
    let config = BoardConfig::default();
    let matrix = grid(&["77777", "10101", "01010", "10101", "01010"]);
    let mut service = ScriptedService::new();
    service.push_spin(&matrix, &config);
    // The first refill lands a fresh cluster; the second is quiet.
    service.push_refill(&["3", "3", "3", "3", "3"]);
    service.push_refill(&["5", "6", "5", "6", "5"]);

    let mut engine = scripted_engine(service, TimingConfig::instant(), 1);
    run_round(&mut engine, 16);

    let report = engine.report();
    assert!(report.complete);
    assert_eq!(report.steps.len(), 2);
    assert_eq!(report.total_score(), 5.0);
    assert_eq!(
        engine.board().snapshot().unwrap(),
        grid(&["56565", "10101", "01010", "10101", "01010"])
    );
}

// =============================================================================
// Refill Accounting
// =============================================================================

#[test]
fn refill_request_matches_the_gaps_explosions_left() {
    let config = BoardConfig::default();
    // One L-shaped cluster of '7': three cells down column 0, one beside it.
    let matrix = grid(&["70101", "71010", "77101", "01010", "10101"]);
    let mut service = ScriptedService::new();
    let log = service.request_log();
    service.push_spin(&matrix, &config);
    service.push_refill(&["898", "9", "", "", ""]);

    let mut engine = scripted_engine(service, TimingConfig::instant(), 1);
    run_round(&mut engine, 16);

    assert_eq!(*log.borrow(), vec![vec![3, 1, 0, 0, 0]]);
    // Survivors slid down, new types filled from the top.
    assert_eq!(
        engine.board().snapshot().unwrap(),
        grid(&["89101", "90010", "81101", "01010", "10101"])
    );
}

// =============================================================================
// Wildcards
// =============================================================================

#[test]
fn wildcard_member_explodes_with_its_cluster() {
    let config = BoardConfig::default();
    let matrix = grid(&["777K1", "10101", "01010", "10101", "01010"]);
    let mut service = ScriptedService::new();
    service.push_spin(&matrix, &config);
    service.push_refill(&["5", "6", "5", "6", ""]);

    let mut engine = scripted_engine(service, TimingConfig::instant(), 1);
    run_round(&mut engine, 16);

    let report = engine.report();
    assert_eq!(report.steps.len(), 1);
    let step = &report.steps[0];
    assert_eq!(step.clusters.len(), 1);
    // Four cells, wildcard included.
    assert_eq!(step.cells_removed(), 4);
    assert_eq!(step.score(), 2.0);
    assert!(step.clusters[0].cells.contains(&Cell { row: 0, col: 3 }));
    assert_eq!(
        engine.board().snapshot().unwrap(),
        grid(&["56561", "10101", "01010", "10101", "01010"])
    );
}

// =============================================================================
// Scores
// =============================================================================

#[test]
fn hinted_scores_are_carried_verbatim() {
    let matrix = grid(&["77777", "10101", "01010", "10101", "01010"]);
    let mut service = ScriptedService::new();
    // The backend says this cluster is worth 9.9; the engine must not
    // recompute it.
    service.push_spin_raw(SpinOutcome {
        matrix: matrix.clone(),
        hints: vec!["7;0,1,2,3,4;9.90".to_owned()],
    });
    service.push_refill(&["5", "6", "5", "6", "5"]);

    let mut engine = scripted_engine(service, TimingConfig::instant(), 1);
    run_round(&mut engine, 16);

    assert_eq!(engine.report().total_score(), 9.9);
}

#[test]
fn later_cascade_steps_score_locally() {
    let config = BoardConfig::default();
    let matrix = grid(&["77777", "10101", "01010", "10101", "01010"]);
    let mut service = ScriptedService::new();
    service.push_spin_raw(SpinOutcome {
        matrix: matrix.clone(),
        hints: vec!["7;0,1,2,3,4;9.90".to_owned()],
    });
    service.push_refill(&["3", "3", "3", "3", "3"]);
    service.push_refill(&["5", "6", "5", "6", "5"]);

    let mut engine = scripted_engine(service, TimingConfig::instant(), 1);
    run_round(&mut engine, 16);

    let report = engine.report();
    assert_eq!(report.steps.len(), 2);
    assert_eq!(report.steps[0].score(), 9.9);
    // The second step was never hinted: five cells at half a point.
    assert_eq!(report.steps[1].score(), 2.5);
}

// =============================================================================
// Outcome Validation
// =============================================================================

#[test]
fn malformed_hint_aborts_the_round_and_the_engine_recovers() {
    let config = BoardConfig::default();
    let mut service = ScriptedService::new();
    service.push_spin_raw(SpinOutcome {
        matrix: quiet_grid(),
        hints: vec!["garbage-no-semicolons".to_owned()],
    });
    service.push_spin(&quiet_grid(), &config);

    let mut engine = scripted_engine(service, TimingConfig::instant(), 1);
    engine.start_round().unwrap();
    let err = loop {
        match engine.tick(16) {
            Err(err) => break err,
            Ok(()) => assert!(engine.clock().now_ms() < 60_000, "error never surfaced"),
        }
    };
    assert!(matches!(err, EngineError::MalformedHint { .. }));

    // The abort left nothing in flight: the board is settled and a second
    // round runs to completion.
    assert!(!engine.is_busy());
    assert!(!engine.board().any_busy());
    engine.board().snapshot().unwrap();
    run_round(&mut engine, 16);
    assert!(engine.report().complete);
}

#[test]
fn mismatched_outcome_matrix_aborts_the_round() {
    let mut service = ScriptedService::new();
    service.push_spin_raw(SpinOutcome {
        matrix: grid(&["010", "101", "010"]),
        hints: vec![],
    });

    let mut engine = scripted_engine(service, TimingConfig::instant(), 1);
    engine.start_round().unwrap();
    let err = loop {
        match engine.tick(16) {
            Err(err) => break err,
            Ok(()) => assert!(engine.clock().now_ms() < 60_000, "error never surfaced"),
        }
    };
    assert!(matches!(err, EngineError::DimensionMismatch { .. }));
    assert!(!engine.is_busy());
    assert!(!engine.board().any_busy());
}

// =============================================================================
// Stop Stagger
// =============================================================================

#[test]
fn columns_begin_stopping_on_the_stagger_grid() {
    let config = BoardConfig::default();
    let mut service = ScriptedService::new();
    service.push_spin(&quiet_grid(), &config);

    let timing = TimingConfig::default();
    let stagger = timing.stagger_ms;
    let mut engine = scripted_engine(service, timing, 1);
    engine.start_round().unwrap();

    let mut stop_at: Vec<Option<u64>> = vec![None; 5];
    let deadline = 60_000;
    while engine.is_busy() {
        engine.tick(10).unwrap();
        for col in 0..5 {
            if stop_at[col].is_none()
                && engine.board().column_state(col) == ReelState::Stopping
            {
                stop_at[col] = Some(engine.clock().now_ms());
            }
        }
        assert!(engine.clock().now_ms() < deadline, "round never completed");
    }

    let stop_at: Vec<u64> = stop_at
        .into_iter()
        .map(|t| t.expect("every column stopped"))
        .collect();
    for col in 1..5 {
        assert_eq!(stop_at[col] - stop_at[col - 1], stagger);
    }
    // Column 4 begins a full stagger span after column 0.
    assert_eq!(stop_at[4] - stop_at[0], 4 * stagger);
}

// =============================================================================
// Consecutive Rounds
// =============================================================================

#[test]
fn back_to_back_rounds_reuse_the_same_pool() {
    let config = BoardConfig::default();
    let mut service = ScriptedService::new();
    service.push_spin(&quiet_grid(), &config);
    let second = grid(&["77777", "10101", "01010", "10101", "01010"]);
    service.push_spin(&second, &config);
    service.push_refill(&["5", "6", "5", "6", "5"]);

    let mut engine = scripted_engine(service, TimingConfig::instant(), 1);
    run_round(&mut engine, 16);
    assert_eq!(engine.report().steps.len(), 0);

    run_round(&mut engine, 16);
    assert_eq!(engine.report().steps.len(), 1);

    // Symbols were recycled, never leaked: the pool holds exactly one
    // symbol per cell, all live, none free.
    let pool = engine.board().pool();
    assert_eq!(pool.capacity(), 25);
    assert_eq!(pool.live_count(), 25);
    assert_eq!(pool.free_count(), 0);
}
