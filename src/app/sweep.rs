//! Noise-level sweep: repeat the trial across log-spaced noise constants and
//! collect, per parameter, the fit and Fisher error trends.
//!
//! A failing level does not end the sweep; its error is recorded in its slot
//! and the remaining levels still run.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::app::pipeline::{TrialResult, run_trial};
use crate::data::FluxProfile;
use crate::domain::{SampleKind, SimulationConfig};
use crate::error::ReflError;
use crate::fit::FitOptions;
use crate::math::decades;

/// Exponent range of the sweep: `10^start, 10^(start+step), …` below `10^stop`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SweepConfig {
    pub log10_start: f64,
    pub log10_stop: f64,
    pub log10_step: f64,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            log10_start: 3.0,
            log10_stop: 6.0,
            log10_step: 0.25,
        }
    }
}

impl SweepConfig {
    pub fn noise_constants(&self) -> Result<Vec<f64>, ReflError> {
        decades(self.log10_start, self.log10_stop, self.log10_step)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SweepLevel {
    pub noise_constant: f64,
    pub seed: u64,
    /// Trial output, or the message of the error that ended this level.
    pub outcome: Result<TrialResult, String>,
}

/// Error trend of one parameter over the successful levels.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorSeries {
    pub name: String,
    pub noise_constants: Vec<f64>,
    pub fit_errors: Vec<Option<f64>>,
    pub fisher_errors: Vec<Option<f64>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SweepResult {
    pub sample: SampleKind,
    pub base_seed: u64,
    pub levels: Vec<SweepLevel>,
}

impl SweepResult {
    pub fn succeeded(&self) -> impl Iterator<Item = (&SweepLevel, &TrialResult)> {
        self.levels
            .iter()
            .filter_map(|level| level.outcome.as_ref().ok().map(|t| (level, t)))
    }

    pub fn failures(&self) -> usize {
        self.levels.iter().filter(|l| l.outcome.is_err()).count()
    }

    /// Per-parameter series, in the parameter order of the trials.
    pub fn error_series(&self) -> Vec<ErrorSeries> {
        let Some((_, first)) = self.succeeded().next() else {
            return Vec::new();
        };
        let mut series: Vec<ErrorSeries> = first
            .parameters
            .iter()
            .map(|p| ErrorSeries {
                name: p.name.clone(),
                noise_constants: Vec::new(),
                fit_errors: Vec::new(),
                fisher_errors: Vec::new(),
            })
            .collect();

        for (level, trial) in self.succeeded() {
            for (s, p) in series.iter_mut().zip(&trial.parameters) {
                s.noise_constants.push(level.noise_constant);
                s.fit_errors.push(p.fit_error);
                s.fisher_errors.push(p.fisher_error);
            }
        }
        series
    }
}

/// Run one trial per noise constant of `sweep`.
///
/// `base.seed` fixes the whole sweep; without it a random base seed is drawn
/// (and reported in the result so the run can be repeated).
pub fn run_sweep(
    sample: SampleKind,
    base: &SimulationConfig,
    sweep: &SweepConfig,
    fit_options: &FitOptions,
    flux: &FluxProfile,
) -> Result<SweepResult, ReflError> {
    let noise_constants = sweep.noise_constants()?;
    let base_seed = base.seed.unwrap_or_else(rand::random);

    let mut levels = Vec::with_capacity(noise_constants.len());
    for noise_constant in noise_constants {
        let seed = level_seed(base_seed, noise_constant, sample);
        let config = SimulationConfig {
            noise_constant,
            seed: Some(seed),
            ..base.clone()
        };

        let mut rng = StdRng::seed_from_u64(seed);
        let outcome = match run_trial(sample, &config, fit_options, flux, &mut rng) {
            Ok(trial) => {
                info!(noise_constant, seed, "sweep level done");
                Ok(trial)
            }
            Err(err) => {
                warn!(noise_constant, seed, error = %err, "sweep level failed; continuing");
                Err(err.to_string())
            }
        };
        levels.push(SweepLevel {
            noise_constant,
            seed,
            outcome,
        });
    }

    Ok(SweepResult {
        sample,
        base_seed,
        levels,
    })
}

/// Deterministic per-level seed.
fn level_seed(base_seed: u64, noise_constant: f64, sample: SampleKind) -> u64 {
    let mut hasher = DefaultHasher::new();
    base_seed.hash(&mut hasher);
    noise_constant.to_bits().hash(&mut hasher);
    sample.hash(&mut hasher);
    hasher.finish()
}
