//! Configuration loading and rejection

mod common;

use aebs_core::{ConfigError, Environment, PlantParams, ProfileKind, Scenario, SimulationConfig};

#[test]
fn invalid_configs_never_reach_the_simulator() {
    let bad = [
        SimulationConfig::default().with_noise_rate(1.5),
        SimulationConfig::default().with_dt(-0.1),
        SimulationConfig::default().with_horizon(0),
        SimulationConfig::default().with_sensor_range(0.0),
        SimulationConfig::new(Scenario::urban_static().with_gap(f64::INFINITY), ProfileKind::Safe),
        SimulationConfig::default().with_plant(PlantParams {
            lag_time_constant: 0.0,
            ..PlantParams::default()
        }),
    ];
    for config in bad {
        assert!(Environment::try_new(&config).is_err(), "{:?}", config);
    }
}

#[cfg(feature = "serde")]
#[test]
fn full_json_config_loads() {
    let json = r#"{
        "scenario": {
            "initial_gap": 40.0,
            "ego_velocity": 25.0,
            "lead_velocity": 0.0,
            "lead_behavior": "Static",
            "lead_accel_bound": 2.0
        },
        "profile": "Safe",
        "noise_rate": 0.5,
        "dt": 0.1,
        "horizon_steps": 300,
        "seed": 7,
        "stop_at_standstill": true
    }"#;

    let config = SimulationConfig::from_json(json).unwrap();
    assert_eq!(config.scenario, Scenario::highway_cutout());
    assert_eq!(config.seed, 7);

    let traj = common::run_once(&config);
    common::assert_physical(&traj);
}

#[cfg(feature = "serde")]
#[test]
fn json_with_bad_values_is_rejected_after_decoding() {
    let json = r#"{ "scenario": { "initial_gap": -5.0, "ego_velocity": 10.0,
        "lead_velocity": 0.0, "lead_behavior": "Static", "lead_accel_bound": 2.0 } }"#;
    assert!(matches!(
        SimulationConfig::from_json(json),
        Err(ConfigError::NonPositive { field: "scenario.initial_gap", .. })
    ));
}

#[cfg(feature = "serde")]
#[test]
fn trajectories_serialize() {
    let traj = common::run_once(&SimulationConfig::default());
    let json = serde_json::to_string(&traj).unwrap();
    assert!(json.contains("\"samples\""));
    assert!(json.contains("Standstill"));
}
