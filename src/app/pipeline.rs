//! One uncertainty trial, shared by `rfi fisher` and the sweep driver.
//!
//! simulate -> noise -> release interior layers -> fit -> sensitivities at the
//! fit -> Fisher information -> per-parameter comparison
//!
//! Every stage works on explicit values: the true structure is never mutated,
//! and the fitted structure is only touched once, by the bounds initializer.

use rand::Rng;
use serde::Serialize;
use tracing::info;

use crate::data::{FluxProfile, NoiseModel, add_noise};
use crate::domain::{Bounds, SampleKind, SimulationConfig};
use crate::error::ReflError;
use crate::fisher::{DEFAULT_RELATIVE_STEP, FisherInformation, fisher_information, jacobian};
use crate::fit::{FitOptions, fit, vary_interior_layers};
use crate::math::log_space;
use crate::models::{ForwardModel, StructureModel, reflectivity};

/// Fit and Fisher estimates for one free parameter.
#[derive(Debug, Clone, Serialize)]
pub struct ParameterReport {
    pub name: String,
    pub true_value: f64,
    pub start: f64,
    pub bounds: Bounds,
    pub fitted: f64,
    pub fit_error: Option<f64>,
    pub fisher_error: Option<f64>,
    /// Why an estimate is missing, if one is.
    pub note: Option<String>,
}

impl ParameterReport {
    /// Fisher / fit error, when both exist.
    pub fn ratio(&self) -> Option<f64> {
        match (self.fisher_error, self.fit_error) {
            (Some(fisher), Some(fit)) if fit > 0.0 => Some(fisher / fit),
            _ => None,
        }
    }
}

/// All outputs of a single trial.
#[derive(Debug, Clone, Serialize)]
pub struct TrialResult {
    pub sample: SampleKind,
    pub structure: String,
    pub noise_constant: f64,
    pub seed: Option<u64>,
    pub points: usize,
    pub chi2: f64,
    pub reduced_chi2: f64,
    pub iterations: usize,
    pub parameters: Vec<ParameterReport>,
    /// Information matrix at the fitted values (for confidence ellipses).
    #[serde(skip)]
    pub information: FisherInformation,
}

impl TrialResult {
    pub fn fitted_values(&self) -> Vec<f64> {
        self.parameters.iter().map(|p| p.fitted).collect()
    }
}

/// Run the full pipeline for `sample` at the noise level in `config`.
pub fn run_trial<R: Rng + ?Sized>(
    sample: SampleKind,
    config: &SimulationConfig,
    fit_options: &FitOptions,
    flux: &FluxProfile,
    rng: &mut R,
) -> Result<TrialResult, ReflError> {
    if config.points < 2 {
        return Err(ReflError::InvalidInput(format!(
            "Need at least 2 Q points, got {}.",
            config.points
        )));
    }

    // 1) Noise-free curve of the true structure on the log Q grid.
    let q = log_space(config.q_min, config.q_max, config.points)?;
    let truth = sample.build();
    let r_true = reflectivity(&truth, &config.instrument, &q)?;

    // 2) Synthetic measurement.
    let noise = NoiseModel {
        noise_constant: config.noise_constant,
        background_rate: config.background_rate,
    };
    let noisy = add_noise(&q, &r_true, flux, &noise, rng)?;

    // 3) Fresh copy with interior layers released at their upper bounds.
    let mut structure = sample.build();
    vary_interior_layers(&mut structure)?;
    let model = StructureModel::new(structure, config.instrument);
    let start = model.initial_values();
    let bounds = model.bounds();

    // 4) Fit.
    let outcome = fit(&model, &noisy.observations, &start, &bounds, fit_options)?;

    // 5) Sensitivities at the fitted values, weighted by the true curve.
    let j = jacobian(&model, &outcome.values, &q, DEFAULT_RELATIVE_STEP)?;
    let information = fisher_information(&j, &noisy.flux, &r_true, model.parameter_names())?;

    // 6) Per-parameter comparison.
    let fisher_errors = information.uncertainties();
    let parameters = model
        .free_parameters()
        .iter()
        .enumerate()
        .map(|(idx, p)| {
            let true_value = truth.layers[p.id.layer].param(p.id.kind).value();
            let fit_error = outcome.standard_errors[idx];
            let (fisher_error, fisher_note) = match &fisher_errors[idx] {
                Ok(v) => (Some(*v), None),
                Err(e) => (None, Some(e.to_string())),
            };
            let note = fisher_note.or_else(|| {
                fit_error
                    .is_none()
                    .then(|| "fit curvature matrix is singular".to_string())
            });
            ParameterReport {
                name: p.name.clone(),
                true_value,
                start: start[idx],
                bounds: bounds[idx],
                fitted: outcome.values[idx],
                fit_error,
                fisher_error,
                note,
            }
        })
        .collect();

    info!(
        sample = ?sample,
        noise_constant = config.noise_constant,
        parameters = model.parameter_count(),
        chi2 = outcome.chi2,
        "trial complete"
    );

    Ok(TrialResult {
        sample,
        structure: truth.name.clone(),
        noise_constant: config.noise_constant,
        seed: config.seed,
        points: q.len(),
        chi2: outcome.chi2,
        reduced_chi2: outcome.reduced_chi2,
        iterations: outcome.iterations,
        parameters,
        information,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn flat_flux() -> FluxProfile {
        FluxProfile::from_knots(vec![(0.001, 1.0), (1.0, 1.0)]).unwrap()
    }

    #[test]
    fn bare_substrate_trial_has_no_parameters() {
        let config = SimulationConfig {
            points: 50,
            noise_constant: 1e5,
            seed: Some(1),
            ..SimulationConfig::default()
        };
        let out = run_trial(
            SampleKind::BareSubstrate,
            &config,
            &FitOptions::default(),
            &flat_flux(),
            &mut StdRng::seed_from_u64(1),
        )
        .unwrap();
        assert!(out.parameters.is_empty());
        assert_eq!(out.information.dim(), 0);
        assert_eq!(out.points, 50);
        assert!(out.chi2.is_finite());
    }

    #[test]
    fn ratio_needs_both_estimates() {
        let mut p = ParameterReport {
            name: "x".to_string(),
            true_value: 1.0,
            start: 1.5,
            bounds: Bounds::new(0.5, 1.5).unwrap(),
            fitted: 1.0,
            fit_error: Some(0.2),
            fisher_error: Some(0.1),
            note: None,
        };
        assert_eq!(p.ratio(), Some(0.5));
        p.fisher_error = None;
        assert_eq!(p.ratio(), None);
    }

    #[test]
    fn rejects_too_few_points() {
        let config = SimulationConfig {
            points: 1,
            ..SimulationConfig::default()
        };
        let err = run_trial(
            SampleKind::SingleLayer,
            &config,
            &FitOptions::default(),
            &flat_flux(),
            &mut StdRng::seed_from_u64(0),
        )
        .unwrap_err();
        assert!(matches!(err, ReflError::InvalidInput(_)));
    }
}
