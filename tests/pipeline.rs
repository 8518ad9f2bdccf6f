use std::path::Path;

use rand::SeedableRng;
use rand::rngs::StdRng;

use refl_fisher::app::pipeline::run_trial;
use refl_fisher::app::sweep::{SweepConfig, run_sweep};
use refl_fisher::data::FluxProfile;
use refl_fisher::domain::{DEFAULT_FLUX_FILE, SampleKind, SimulationConfig};
use refl_fisher::fisher::{DEFAULT_ANGLE_STEP, all_ellipses};
use refl_fisher::fit::FitOptions;

fn bundled_flux() -> FluxProfile {
    FluxProfile::load(&Path::new(env!("CARGO_MANIFEST_DIR")).join(DEFAULT_FLUX_FILE)).unwrap()
}

#[test]
fn single_layer_fit_recovers_true_structure() {
    let config = SimulationConfig {
        noise_constant: 1e6,
        seed: Some(2024),
        ..SimulationConfig::default()
    };
    let trial = run_trial(
        SampleKind::SingleLayer,
        &config,
        &FitOptions::default(),
        &bundled_flux(),
        &mut StdRng::seed_from_u64(2024),
    )
    .unwrap();

    assert_eq!(trial.points, 300);
    assert_eq!(trial.parameters.len(), 2);

    let sld = &trial.parameters[0];
    let thick = &trial.parameters[1];
    assert!(sld.name.ends_with("- sld"));
    assert!(thick.name.ends_with("- thick"));

    // Started at the upper bound, landed near the truth.
    assert_eq!(sld.start, 6.0);
    assert_eq!(thick.start, 300.0);
    assert!((sld.fitted - 4.0).abs() < 0.08, "sld {}", sld.fitted);
    assert!((thick.fitted - 200.0).abs() < 4.0, "thick {}", thick.fitted);

    for p in &trial.parameters {
        assert!(p.fit_error.is_some_and(|e| e > 0.0 && e.is_finite()), "{p:?}");
        assert!(p.fisher_error.is_some_and(|e| e > 0.0 && e.is_finite()), "{p:?}");
        assert!(p.note.is_none());
    }

    let g = trial.information.matrix();
    assert_eq!(g.shape(), (2, 2));
    assert_eq!(g[(0, 1)], g[(1, 0)]);

    let ellipses = all_ellipses(&trial.information, &trial.fitted_values(), 2.0, DEFAULT_ANGLE_STEP).unwrap();
    assert_eq!(ellipses.len(), 1);
    let e = ellipses[0].as_ref().unwrap();
    assert_eq!((e.x_index, e.y_index), (0, 1));
    assert_eq!(e.centre, (sld.fitted, thick.fitted));
}

#[test]
fn fixed_seed_reproduces_trial() {
    let config = SimulationConfig {
        points: 120,
        noise_constant: 1e5,
        seed: Some(5),
        ..SimulationConfig::default()
    };
    let flux = bundled_flux();
    let run = || {
        run_trial(
            SampleKind::SingleLayer,
            &config,
            &FitOptions::default(),
            &flux,
            &mut StdRng::seed_from_u64(5),
        )
        .unwrap()
    };
    let a = run();
    let b = run();
    assert_eq!(a.fitted_values(), b.fitted_values());
    assert_eq!(a.chi2, b.chi2);
}

#[test]
fn bare_substrate_sweep_handles_empty_parameter_set() {
    let config = SimulationConfig {
        points: 60,
        seed: Some(11),
        ..SimulationConfig::default()
    };
    let sweep = SweepConfig {
        log10_start: 3.0,
        log10_stop: 4.0,
        log10_step: 0.5,
    };
    let result = run_sweep(
        SampleKind::BareSubstrate,
        &config,
        &sweep,
        &FitOptions::default(),
        &bundled_flux(),
    )
    .unwrap();

    assert_eq!(result.base_seed, 11);
    assert_eq!(result.levels.len(), 2);
    assert_eq!(result.failures(), 0);
    for (_, trial) in result.succeeded() {
        assert!(trial.parameters.is_empty());
        assert_eq!(trial.information.dim(), 0);
    }
    assert!(result.error_series().is_empty());
}

#[test]
fn sweep_records_failed_levels_and_continues() {
    // No beam at all: every measured flux is zero.
    let dark = FluxProfile::from_knots(vec![(0.001, 0.0), (1.0, 0.0)]).unwrap();
    let config = SimulationConfig {
        points: 40,
        seed: Some(3),
        ..SimulationConfig::default()
    };
    let sweep = SweepConfig {
        log10_start: 3.0,
        log10_stop: 4.0,
        log10_step: 0.25,
    };
    let result = run_sweep(SampleKind::SingleLayer, &config, &sweep, &FitOptions::default(), &dark).unwrap();

    assert_eq!(result.levels.len(), 4);
    assert_eq!(result.failures(), 4);
    for level in &result.levels {
        let msg = level.outcome.as_ref().unwrap_err();
        assert!(msg.contains("Non-positive measured flux"), "{msg}");
    }
    let seeds: std::collections::HashSet<u64> = result.levels.iter().map(|l| l.seed).collect();
    assert_eq!(seeds.len(), 4);
}

#[test]
fn missing_flux_file_is_data_unavailable() {
    let err = FluxProfile::load(Path::new("does/not/exist.dat")).unwrap_err();
    assert_eq!(err.exit_code(), 3);
}

#[test]
fn multi_layer_fit_converges_with_default_options() {
    let config = SimulationConfig {
        noise_constant: 1e6,
        seed: Some(7),
        ..SimulationConfig::default()
    };
    let options = FitOptions::default();
    let trial = run_trial(
        SampleKind::Easy,
        &config,
        &options,
        &bundled_flux(),
        &mut StdRng::seed_from_u64(7),
    )
    .unwrap();

    assert!(trial.parameters.len() >= 4);
    assert!(trial.iterations < options.max_iterations, "{}", trial.iterations);
    assert!(trial.chi2.is_finite());
    for p in &trial.parameters {
        assert!(p.fitted >= p.bounds.lower && p.fitted <= p.bounds.upper, "{p:?}");
        assert!(p.fisher_error.is_some_and(|e| e > 0.0 && e.is_finite()), "{p:?}");
    }
}
