//! Every built model must hold a distribution in each row

mod common;

use aebs_core::{ControlMode, ProfileKind};
use aebs_imdp::{
    imdp::COVERAGE_TOLERANCE, AbstractionConfig, AbstractionEngine, GridPreset, ProcessNoise,
    Successor,
};
use common::{build, debug_config};

fn assert_well_formed(config: &AbstractionConfig) {
    let imdp = build(config);
    imdp.validate().unwrap();

    assert_eq!(imdp.num_rows(), imdp.num_cells() * ControlMode::ALL.len());
    for (cell, action, row) in imdp.rows() {
        assert!(!row.is_empty(), "empty row at cell {} {:?}", cell, action);

        let lower: f64 = row.iter().map(|t| t.lower).sum();
        let upper: f64 = row.iter().map(|t| t.upper).sum();
        assert!(lower <= 1.0 + COVERAGE_TOLERANCE);
        assert!(upper >= 1.0 - COVERAGE_TOLERANCE);

        for t in row {
            assert!(0.0 <= t.lower && t.lower <= t.upper && t.upper <= 1.0);
            assert!(t.upper > 0.0);
        }
        for pair in row.windows(2) {
            assert!(pair[0].target < pair[1].target, "targets unsorted or repeated");
        }
    }
}

#[test]
fn noise_free_models_are_well_formed() {
    for profile in [ProfileKind::Industry, ProfileKind::Safe] {
        assert_well_formed(&debug_config(0.0).with_profile(profile));
    }
}

#[test]
fn noisy_perception_models_are_well_formed() {
    for profile in [ProfileKind::Industry, ProfileKind::Safe] {
        assert_well_formed(&debug_config(0.5).with_profile(profile));
    }
}

#[test]
fn process_noise_models_are_well_formed() {
    let noise = ProcessNoise { gap: 0.5, speed: 0.3, accel: 0.2 };
    assert_well_formed(&debug_config(0.2).with_process_noise(noise));
}

#[test]
fn certain_miss_uses_fallback_only() {
    let config = debug_config(1.0).with_profile(ProfileKind::Safe);
    let engine = AbstractionEngine::new(&config).unwrap();
    let profile = config.profile.profile();

    for mode in ControlMode::ALL {
        let branches = engine.branches(mode);
        assert_eq!(branches.len(), 1);
        let fallback = profile.next_mode(mode, aebs_core::TimeToCollision::NotClosing);
        assert_eq!(branches[0].command, profile.command(fallback));
    }
    assert_well_formed(&config);
}

#[test]
fn crash_is_reachable_from_the_near_fast_corner() {
    let imdp = build(&debug_config(0.0));
    let grid = imdp.grid();
    let (_, nv, _) = grid.dims();
    // nearest gap bin, fastest speed bin, coasting
    let cell = grid.flat(aebs_imdp::CellIndex { gap: 0, speed: nv - 1, accel: 10 });

    for action in ControlMode::ALL {
        let row = imdp.transitions(cell, action);
        let crash = row.iter().find(|t| t.target == Successor::Crash);
        assert!(crash.map_or(false, |t| t.upper > 0.0), "{:?}", action);
    }
}

#[test]
fn far_slow_cells_never_crash() {
    let imdp = build(&debug_config(0.5));
    let grid = imdp.grid();
    let (ng, _, _) = grid.dims();
    let cell = grid.flat(aebs_imdp::CellIndex { gap: ng - 2, speed: 0, accel: 10 });

    for action in ControlMode::ALL {
        assert!(imdp
            .transitions(cell, action)
            .iter()
            .all(|t| t.target != Successor::Crash));
    }
}

#[test]
fn coarse_grid_builds() {
    let imdp = build(&AbstractionConfig::new(GridPreset::Coarse).with_noise_rate(0.1));
    assert_eq!(imdp.grid().dims(), (50, 30, 30));
    imdp.validate().unwrap();
}
