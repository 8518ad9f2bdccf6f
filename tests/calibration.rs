//! Statistical calibration of the fit's standard errors.
//!
//! The random detector background is switched off so the simulated data are
//! drawn from exactly the model being fitted; only then is the curvature
//! error a calibrated 1σ.

use std::path::Path;

use rand::SeedableRng;
use rand::rngs::StdRng;

use refl_fisher::app::pipeline::run_trial;
use refl_fisher::data::FluxProfile;
use refl_fisher::domain::{DEFAULT_FLUX_FILE, SampleKind, SimulationConfig};
use refl_fisher::fit::FitOptions;

#[test]
fn single_layer_sld_is_covered_by_reported_error() {
    let flux = FluxProfile::load(&Path::new(env!("CARGO_MANIFEST_DIR")).join(DEFAULT_FLUX_FILE)).unwrap();
    let trials = 40;
    let mut covered = 0;

    for seed in 0..trials {
        let config = SimulationConfig {
            noise_constant: 1e6,
            background_rate: 0.0,
            seed: Some(seed),
            ..SimulationConfig::default()
        };
        let trial = run_trial(
            SampleKind::SingleLayer,
            &config,
            &FitOptions::default(),
            &flux,
            &mut StdRng::seed_from_u64(seed),
        )
        .unwrap();
        assert!(trial.reduced_chi2 < 1.5, "seed {seed}: reduced chi2 {}", trial.reduced_chi2);
        let sld = &trial.parameters[0];
        let err = sld.fit_error.unwrap();
        // 2σ: a calibrated 1σ interval only covers ~68 %.
        if (sld.fitted - sld.true_value).abs() <= 2.0 * err {
            covered += 1;
        }
    }

    // Expected 2σ coverage is 95.4 %; 34 of 40 leaves room for ~1 % bad luck
    // in the seed set while still failing for an error off by a factor ~1.5.
    let fraction = covered as f64 / trials as f64;
    assert!(fraction >= 0.85, "covered {covered}/{trials}");
}
