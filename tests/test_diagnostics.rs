use thermostasis::simulation::agent::{scenario_a, thermostat};
use thermostasis::simulation::diagnostics::{divergence_report, run_ensemble, running_mean};
use thermostasis::simulation::params::DIVERGENCE_CEILING;
use thermostasis::simulation::{ConfigError, Simulation};

fn assert_float_eq(a: f64, b: f64, msg: &str) {
    assert!((a - b).abs() < 1e-10, "{msg}: expected {b}, got {a}");
}

#[test]
fn test_running_mean_matches_edge_padded_average() {
    let values = [4.0, 0.0, 8.0, 2.0, 6.0];
    let smoothed = running_mean(&values, 3);
    // Left edge padded with 4.0
    let expected = [4.0, 8.0 / 3.0, 4.0, 10.0 / 3.0, 16.0 / 3.0];
    for (got, want) in smoothed.iter().zip(expected) {
        assert_float_eq(*got, want, "smoothed value");
    }
}

#[test]
fn test_stable_run_reports_no_divergence() {
    let mut sim = Simulation::new(&scenario_a()).unwrap();
    sim.run();
    assert_eq!(divergence_report(&sim, DIVERGENCE_CEILING), None);
}

#[test]
fn test_unstable_run_is_reported_not_raised() {
    let mut config = scenario_a();
    config.dt = 0.5;
    config.sim_time = 100.0;
    config.levels[0].level.learning_rate = 50.0;

    let mut sim = Simulation::new(&config).unwrap();
    sim.run();
    assert!(sim.is_finished(), "a diverging run still completes");

    let report = divergence_report(&sim, DIVERGENCE_CEILING).unwrap();
    assert!(report.series.starts_with("interoception/"), "{}", report.series);
    assert!(report.tick < sim.horizon());
    assert!(!report.value.is_finite() || report.value.abs() > DIVERGENCE_CEILING);
}

#[test]
fn test_ensemble_is_reproducible_per_seed() {
    let mut config = thermostat();
    config.sim_time = 60.0;
    let seeds = [1, 2, 3, 1];

    let members = run_ensemble(&config, &seeds).unwrap();
    assert_eq!(members.len(), seeds.len());
    for (member, seed) in members.iter().zip(seeds) {
        assert_eq!(member.seed, seed);
        assert_eq!(member.viability.total, 600);
        assert!(member.final_vfe >= 0.0);
        assert!(member.divergence.is_none());
    }
    assert_eq!(members[0], members[3]);
    assert_ne!(members[0].final_vfe, members[1].final_vfe);

    let again = run_ensemble(&config, &seeds).unwrap();
    assert_eq!(members, again);
}

#[test]
fn test_ensemble_scores_against_preset_band() {
    let members = run_ensemble(&scenario_a(), &[0, 7]).unwrap();
    for member in &members {
        // The still pond sits at 4, far outside the default band around 30
        assert_eq!(member.viability.inside, member.viability.total);
        assert_float_eq(member.viability.fraction(), 1.0, "scenario A viability");
    }
}

#[test]
fn test_ensemble_surfaces_configuration_errors() {
    let mut config = thermostat();
    config.levels[0].level.variances.w0 = 0.0;
    assert!(matches!(
        run_ensemble(&config, &[1, 2]),
        Err(ConfigError::InvalidVariance { channel: "e_w0", .. })
    ));
}
