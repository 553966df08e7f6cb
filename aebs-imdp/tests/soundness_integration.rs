//! The interval bounds must contain the true transition probabilities
//!
//! Without process noise the true probability of every successor is a
//! finite sum over perception branches and is checked exactly. With process
//! noise it is estimated by sampling and checked up to a Hoeffding margin.

mod common;

use std::collections::BTreeMap;

use aebs_core::{ControlMode, ProfileKind};
use aebs_imdp::{AbstractionEngine, Imdp, ProcessNoise, Successor};
use common::{build, debug_config, hoeffding_epsilon, sample_in, Sampler};
use rand::{rngs::StdRng, Rng, SeedableRng};

const STATES_PER_CELL: usize = 8;

fn bounds_of(imdp: &Imdp, cell: usize, action: ControlMode, target: Successor) -> (f64, f64) {
    imdp.transitions(cell, action)
        .iter()
        .find(|t| t.target == target)
        .map_or((0.0, 0.0), |t| (t.lower, t.upper))
}

fn check_noise_free(profile: ProfileKind, noise_rate: f64, seed: u64) {
    let config = debug_config(noise_rate).with_profile(profile);
    let engine = AbstractionEngine::new(&config).unwrap();
    let imdp = engine.build().unwrap();
    let sampler = Sampler::new(&config);
    let grid = imdp.grid();
    let mut rng = StdRng::seed_from_u64(seed);

    for _ in 0..400 {
        let cell = rng.gen_range(0..grid.num_cells());
        let cell_box = grid.cell_box(grid.cell(cell));
        for action in ControlMode::ALL {
            for _ in 0..STATES_PER_CELL {
                let state = sample_in(&cell_box, &mut rng);

                let mut exact: BTreeMap<Successor, f64> = BTreeMap::new();
                for branch in engine.branches(action) {
                    let next = sampler.plant().step_following(&state, branch.command, config.dt);
                    *exact.entry(grid.locate(&next)).or_insert(0.0) += branch.weight;
                }

                for (target, p) in exact {
                    let (lower, upper) = bounds_of(&imdp, cell, action, target);
                    assert!(
                        lower - 1e-9 <= p && p <= upper + 1e-9,
                        "cell {} {:?} -> {}: P = {} outside [{}, {}] from {:?}",
                        cell, action, target, p, lower, upper, state
                    );
                }
            }
        }
    }
}

#[test]
fn noise_free_industry_bounds_are_exact_enclosures() {
    check_noise_free(ProfileKind::Industry, 0.0, 1);
}

#[test]
fn noise_free_safe_bounds_are_exact_enclosures() {
    check_noise_free(ProfileKind::Safe, 0.0, 2);
}

#[test]
fn perception_branches_are_enclosed() {
    check_noise_free(ProfileKind::Industry, 0.4, 3);
    check_noise_free(ProfileKind::Safe, 0.25, 4);
}

#[test]
fn sampled_frequencies_respect_bounds_under_process_noise() {
    const DRAWS: usize = 4000;
    let config = debug_config(0.3)
        .with_profile(ProfileKind::Safe)
        .with_process_noise(ProcessNoise { gap: 1.0, speed: 0.5, accel: 0.3 });
    let imdp = build(&config);
    let sampler = Sampler::new(&config);
    let grid = imdp.grid();
    let eps = hoeffding_epsilon(DRAWS);
    let mut rng = StdRng::seed_from_u64(7);

    for _ in 0..12 {
        let cell = rng.gen_range(0..grid.num_cells());
        let cell_box = grid.cell_box(grid.cell(cell));
        let action = ControlMode::ALL[rng.gen_range(0..ControlMode::ALL.len())];
        let state = sample_in(&cell_box, &mut rng);

        let mut counts: BTreeMap<Successor, usize> = BTreeMap::new();
        for _ in 0..DRAWS {
            let next = sampler.successor(&state, action, &mut rng);
            *counts.entry(grid.locate(&next)).or_insert(0) += 1;
        }

        for t in imdp.transitions(cell, action) {
            let freq = counts.get(&t.target).copied().unwrap_or(0) as f64 / DRAWS as f64;
            assert!(
                t.lower - eps <= freq && freq <= t.upper + eps,
                "cell {} {:?} -> {}: frequency {} outside [{}, {}] ± {}",
                cell, action, t.target, freq, t.lower, t.upper, eps
            );
        }
        for (target, n) in counts {
            if imdp.transitions(cell, action).iter().all(|t| t.target != target) {
                panic!("cell {} {:?} reached {} ({} times) outside the row", cell, action, target, n);
            }
        }
    }
}

#[test]
fn hoeffding_margin_shrinks_with_draws() {
    assert!(hoeffding_epsilon(4000) < 0.05);
    assert!(hoeffding_epsilon(16000) < hoeffding_epsilon(4000));
}
