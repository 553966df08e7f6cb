//! End-to-end scenario tests
//!
//! Closed-loop runs of the named scenarios with both controller profiles:
//! - noise-free braking outcomes
//! - crash rates under missed detections
//! - trajectory consistency across seeds

mod common;

use aebs_core::{
    ControlMode, LeadBehavior, Outcome, ProfileKind, Scenario, SimulationConfig,
};
use common::{assert_crash_is_terminal, assert_physical, batch, run_once};

#[test]
fn industry_stops_short_of_static_obstacle_at_36m() {
    let scenario = Scenario::urban_static().with_gap(36.0);
    let config = SimulationConfig::new(scenario, ProfileKind::Industry);
    let traj = run_once(&config);

    assert!(!traj.crashed(), "outcome {:?}", traj.outcome);
    assert!(matches!(traj.outcome, Outcome::Standstill { .. }));
    assert!(traj.min_gap() > 0.0);
    assert_eq!(traj.max_mode(), ControlMode::EmergencyBraking);
    assert_physical(&traj);
}

#[test]
fn safe_stops_early_in_every_noise_free_preset() {
    for name in Scenario::PRESET_NAMES {
        let scenario = Scenario::preset(name).unwrap();
        if scenario.lead_behavior != LeadBehavior::Static {
            continue;
        }
        let traj = run_once(&SimulationConfig::new(scenario, ProfileKind::Safe));
        assert!(!traj.crashed(), "{}: {:?}", name, traj.outcome);
        assert_physical(&traj);
    }
}

#[test]
fn highway_cutout_safe_profile_beats_industry() {
    let runs = 200;
    let industry = SimulationConfig::new(Scenario::highway_cutout(), ProfileKind::Industry)
        .with_noise_rate(0.5);
    let safe = SimulationConfig::new(Scenario::highway_cutout(), ProfileKind::Safe)
        .with_noise_rate(0.5);

    let industry = batch(&industry, runs);
    let safe = batch(&safe, runs);

    assert_eq!(industry.runs, runs);
    assert!(industry.crash_rate() > 0.0);
    assert!(
        safe.crash_rate() < industry.crash_rate(),
        "safe {} vs industry {}",
        safe.crash_rate(),
        industry.crash_rate()
    );
}

#[test]
fn noisy_runs_stay_physical() {
    for seed in 0..20 {
        let config = SimulationConfig::new(Scenario::highway_traffic(), ProfileKind::Industry)
            .with_noise_rate(0.3)
            .with_seed(seed);
        let traj = run_once(&config);
        assert_physical(&traj);
        assert_crash_is_terminal(&traj);
    }
}

#[test]
fn missed_detections_never_escalate() {
    let config = SimulationConfig::new(Scenario::highway_cutout(), ProfileKind::Safe)
        .with_noise_rate(0.5)
        .with_seed(3);
    let traj = run_once(&config);

    // an undetected step can only hold or relax the mode
    for pair in traj.samples.windows(2) {
        if !pair[1].detected {
            assert!(pair[1].mode <= pair[0].mode, "{:?}", pair);
        }
    }
}

#[test]
fn batch_seeds_are_consecutive() {
    let config = SimulationConfig::new(Scenario::highway_cutout(), ProfileKind::Safe)
        .with_noise_rate(0.5)
        .with_seed(100);

    let stats = batch(&config, 5);
    let manual = (100..105)
        .filter(|&seed| run_once(&config.with_seed(seed)).crashed())
        .count();
    assert_eq!(stats.crashes, manual);
}
