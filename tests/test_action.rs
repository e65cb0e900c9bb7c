use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use thermostasis::simulation::action::{ActionConfig, ActionController, Perturbation};
use thermostasis::simulation::inference::Variance;
use thermostasis::simulation::noise::{GaussianNoise, Silent};

fn controller(bound: f64, perturbation: Perturbation) -> ActionController {
    let config = ActionConfig {
        bound,
        perturbation,
        ..ActionConfig::default()
    };
    ActionController::new(&config, Variance::new("e_z1", 0.1).unwrap(), 0.1).unwrap()
}

#[test]
fn test_clamp_respects_bound_for_any_candidate() {
    let mut rng = StdRng::seed_from_u64(9);
    for _ in 0..500 {
        let bound = rng.random_range(0.1..10.0);
        let c = controller(bound, Perturbation::Disabled);
        let candidate = rng.random_range(-100.0..100.0);
        let clamped = c.clamp(candidate);
        assert!(clamped.abs() <= bound);
        if candidate.abs() <= bound {
            assert!((clamped - candidate).abs() < 1e-15);
        }
    }
}

#[test]
fn test_perturb_then_clamp_never_leaves_bound() {
    let c = controller(1.0, Perturbation::PerturbThenClamp);
    let mut noise = GaussianNoise::new(5.0, 3).unwrap();
    let mut rng = StdRng::seed_from_u64(4);
    let mut value = 0.0;
    for _ in 0..2000 {
        value = c.step(rng.random_range(-20.0..20.0), value, &mut noise);
        assert!(value.abs() <= 1.0);
    }
}

#[test]
fn test_clamp_then_perturb_stays_near_bound() {
    let c = controller(1.0, Perturbation::ClampThenPerturb);
    let mut noise = GaussianNoise::new(1.0, 3).unwrap();
    let mut exceeded = false;
    let mut value = 0.0;
    for _ in 0..2000 {
        value = c.step(-10.0, value, &mut noise);
        // One perturbation scales the clamped value by at most 1 + |noise| * dt
        assert!(value.abs() <= 1.0 * (1.0 + 10.0 * 0.1));
        exceeded |= value.abs() > 1.0;
    }
    assert!(exceeded, "perturbing after the clamp can leave the bound");
}

#[test]
fn test_action_opposes_error_sign() {
    let mut c = controller(5.8, Perturbation::Disabled);
    assert!(c.act(1.0, &mut Silent) < 0.0);
    let mut c = controller(5.8, Perturbation::Disabled);
    assert!(c.act(-1.0, &mut Silent) > 0.0);
}
