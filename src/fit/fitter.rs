//! Bounded χ² fitting of a forward model to noisy observations.
//!
//! Given:
//! - observations `(q_i, y_i, σ_i)`
//! - a forward model `f(θ, q)`
//! - a starting vector and per-parameter bounds
//!
//! we minimise `χ² = Σ ((y_i - f(θ, q_i)) / σ_i)²` in two deterministic stages:
//!
//! 1. **Coordinate scan.** Each parameter in turn is scanned over an even grid
//!    spanning its bounds with the others held fixed; candidates are evaluated
//!    in parallel and the lowest χ² wins (ties go to the lower grid index).
//!    Reflectivity fringes make χ² highly multimodal in thickness, and the scan
//!    moves the start into the right basin.
//! 2. **Levenberg–Marquardt polish.** Marquardt-scaled damping on an active
//!    set: parameters on a bound whose downhill direction points outward are
//!    held there and the step is solved (augmented least squares, SVD) for the
//!    others, then clamped into the bounds. Stops on a small relative step, a
//!    small χ² gain or a small projected gradient.
//!
//! Standard errors come from the curvature at the optimum:
//! `σ_j = sqrt(((JᵀWJ)⁻¹)_jj)` with `W = diag(1/σ_i²)`.

use nalgebra::{DMatrix, DVector};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::domain::{Bounds, Observations};
use crate::error::ReflError;
use crate::fisher::jacobian;
use crate::math::{solve_least_squares, spd_inverse};
use crate::models::ForwardModel;

const LAMBDA_INIT: f64 = 1e-3;
const LAMBDA_MIN: f64 = 1e-12;
const LAMBDA_MAX: f64 = 1e12;

/// Fitting options.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FitOptions {
    /// Levenberg–Marquardt iteration budget.
    pub max_iterations: usize,
    /// Stop once an accepted step improves χ² by less than `tolerance · χ²`.
    pub tolerance: f64,
    /// Stop once no parameter moves by more than this fraction of its value.
    pub step_tolerance: f64,
    /// Stop once every free Jacobian column is this close to orthogonal to
    /// the residuals (cosine).
    pub gradient_tolerance: f64,
    /// Grid size per parameter in the coordinate scan (`< 2` disables it).
    pub scan_points: usize,
    /// Passes over all parameters in the coordinate scan.
    pub scan_sweeps: usize,
    /// Relative finite-difference step for the fit Jacobian.
    pub relative_step: f64,
}

impl Default for FitOptions {
    fn default() -> Self {
        Self {
            max_iterations: 200,
            tolerance: 1e-10,
            step_tolerance: 1e-8,
            gradient_tolerance: 1e-8,
            scan_points: 201,
            scan_sweeps: 3,
            relative_step: 1e-4,
        }
    }
}

/// Best fit and its curvature-based standard errors.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FitOutcome {
    pub values: Vec<f64>,
    /// `None` where the curvature matrix could not be inverted.
    pub standard_errors: Vec<Option<f64>>,
    pub chi2: f64,
    pub reduced_chi2: f64,
    pub iterations: usize,
}

/// Fit `model` to `data`, starting from `start` and staying inside `bounds`.
pub fn fit<M: ForwardModel + ?Sized>(
    model: &M,
    data: &Observations,
    start: &[f64],
    bounds: &[Bounds],
    opts: &FitOptions,
) -> Result<FitOutcome, ReflError> {
    data.validate()?;
    let m = model.parameter_count();
    if start.len() != m || bounds.len() != m {
        return Err(ReflError::DimensionMismatch(format!(
            "Model has {m} parameters; got {} starting values and {} bounds.",
            start.len(),
            bounds.len()
        )));
    }
    if data.is_empty() {
        return Err(ReflError::InvalidInput("No observations to fit.".to_string()));
    }

    let n = data.len();
    let mut x: Vec<f64> = start.iter().zip(bounds).map(|(&v, b)| b.clamp(v)).collect();

    if m == 0 {
        let chi2 = chi_squared(model, data, &x)?;
        return Ok(FitOutcome {
            values: x,
            standard_errors: Vec::new(),
            chi2,
            reduced_chi2: chi2 / n as f64,
            iterations: 0,
        });
    }

    if opts.scan_points >= 2 {
        coordinate_scan(model, data, &mut x, bounds, opts)?;
    }

    let (x, chi2, iterations) = levenberg_marquardt(model, data, x, bounds, opts)?;
    let standard_errors = standard_errors(model, data, &x, opts.relative_step)?;

    let dof = n.saturating_sub(m).max(1);
    debug!(chi2, iterations, "fit converged");
    Ok(FitOutcome {
        values: x,
        standard_errors,
        chi2,
        reduced_chi2: chi2 / dof as f64,
        iterations,
    })
}

/// `Σ ((y - f) / σ)²` at `params`.
pub fn chi_squared<M: ForwardModel + ?Sized>(
    model: &M,
    data: &Observations,
    params: &[f64],
) -> Result<f64, ReflError> {
    Ok(weighted_residuals(model, data, params)?.norm_squared())
}

fn weighted_residuals<M: ForwardModel + ?Sized>(
    model: &M,
    data: &Observations,
    params: &[f64],
) -> Result<DVector<f64>, ReflError> {
    let predicted = model.evaluate(params, &data.q)?;
    if predicted.len() != data.len() {
        return Err(ReflError::DimensionMismatch(format!(
            "Model returned {} values for {} Q points.",
            predicted.len(),
            data.len()
        )));
    }
    Ok(DVector::from_iterator(
        data.len(),
        data.reflectivity
            .iter()
            .zip(&predicted)
            .zip(&data.uncertainty)
            .map(|((&y, &f), &s)| (y - f) / s),
    ))
}

/// Jacobian of the model scaled row-wise by `1/σ_i`.
fn weighted_jacobian<M: ForwardModel + ?Sized>(
    model: &M,
    data: &Observations,
    params: &[f64],
    relative_step: f64,
) -> Result<DMatrix<f64>, ReflError> {
    let mut j = jacobian(model, params, &data.q, relative_step)?;
    for (i, &s) in data.uncertainty.iter().enumerate() {
        j.row_mut(i).scale_mut(1.0 / s);
    }
    Ok(j)
}

fn coordinate_scan<M: ForwardModel + ?Sized>(
    model: &M,
    data: &Observations,
    x: &mut [f64],
    bounds: &[Bounds],
    opts: &FitOptions,
) -> Result<(), ReflError> {
    let mut current = chi_squared(model, data, x).unwrap_or(f64::INFINITY);
    let steps = opts.scan_points - 1;

    for sweep in 0..opts.scan_sweeps {
        for j in 0..x.len() {
            let b = bounds[j];
            if b.width() <= 0.0 {
                continue;
            }

            // Evaluate each grid value independently (parallel).
            let base: &[f64] = x;
            let candidates: Vec<(usize, f64, f64)> = (0..=steps)
                .into_par_iter()
                .filter_map(|k| {
                    let v = b.lower + b.width() * k as f64 / steps as f64;
                    let mut trial = base.to_vec();
                    trial[j] = v;
                    chi_squared(model, data, &trial)
                        .ok()
                        .filter(|c| c.is_finite())
                        .map(|c| (k, v, c))
                })
                .collect();

            // Deterministic selection: minimum χ², ties broken by grid index.
            let best = candidates
                .iter()
                .min_by(|l, r| l.2.total_cmp(&r.2).then(l.0.cmp(&r.0)));
            if let Some(&(_, v, c)) = best {
                if c < current {
                    x[j] = v;
                    current = c;
                }
            }
        }
        debug!(sweep, chi2 = current, "coordinate scan sweep");
    }

    if !current.is_finite() {
        return Err(ReflError::OptimizerDidNotConverge {
            iterations: 0,
            chi2: current,
            reason: "no finite chi-squared anywhere on the scan grid".to_string(),
        });
    }
    Ok(())
}

fn levenberg_marquardt<M: ForwardModel + ?Sized>(
    model: &M,
    data: &Observations,
    mut x: Vec<f64>,
    bounds: &[Bounds],
    opts: &FitOptions,
) -> Result<(Vec<f64>, f64, usize), ReflError> {
    let n = data.len();
    let m = x.len();

    let mut r = weighted_residuals(model, data, &x)?;
    let mut chi2 = r.norm_squared();
    if !chi2.is_finite() {
        return Err(ReflError::OptimizerDidNotConverge {
            iterations: 0,
            chi2,
            reason: "non-finite chi-squared at the starting point".to_string(),
        });
    }

    let mut lambda = LAMBDA_INIT;
    for iteration in 1..=opts.max_iterations {
        let jw = weighted_jacobian(model, data, &x, opts.relative_step)?;
        // Downhill direction for δ (χ² gradient is -2g).
        let g = jw.transpose() * &r;

        // Active set: parameters sitting on a bound that the step would push
        // through are held there; the step is solved on the rest.
        let free: Vec<usize> = (0..m)
            .filter(|&j| !pinned_outward(x[j], &bounds[j], g[j]))
            .collect();
        if free.is_empty() {
            debug!(iteration, chi2, "every parameter pinned at a bound");
            return Ok((x, chi2, iteration));
        }
        if projected_gradient_is_small(&jw, &g, r.norm(), &free, opts.gradient_tolerance) {
            debug!(iteration, chi2, "projected gradient below tolerance");
            return Ok((x, chi2, iteration));
        }

        let jf = jw.select_columns(free.iter());
        let f = free.len();
        let scale: Vec<f64> = (0..f).map(|c| jf.column(c).norm()).collect();

        let mut accepted = None;
        while lambda <= LAMBDA_MAX {
            // [ Jw_free   ] δ ≈ [ r ]
            // [ √λ·diag D ]     [ 0 ]
            let sqrt_lambda = lambda.sqrt();
            let a = DMatrix::from_fn(n + f, f, |row, col| {
                if row < n {
                    jf[(row, col)]
                } else if row - n == col {
                    sqrt_lambda * scale[col]
                } else {
                    0.0
                }
            });
            let b = DVector::from_fn(n + f, |row, _| if row < n { r[row] } else { 0.0 });

            let Some(delta) = solve_least_squares(&a, &b) else {
                lambda *= 10.0;
                continue;
            };
            let mut x_new = x.clone();
            for (c, &j) in free.iter().enumerate() {
                x_new[j] = bounds[j].clamp(x[j] + delta[c]);
            }
            if x_new == x {
                lambda *= 10.0;
                continue;
            }

            let r_new = weighted_residuals(model, data, &x_new)?;
            let chi2_new = r_new.norm_squared();
            if chi2_new.is_finite() && chi2_new < chi2 {
                lambda = (lambda / 10.0).max(LAMBDA_MIN);
                accepted = Some((x_new, r_new, chi2_new));
                break;
            }
            lambda *= 10.0;
        }

        // No downhill step at any damping: a (possibly bounded) minimum.
        let Some((x_new, r_new, chi2_new)) = accepted else {
            return Ok((x, chi2, iteration));
        };

        let improvement = chi2 - chi2_new;
        let step = relative_step_size(&x, &x_new);
        x = x_new;
        r = r_new;
        chi2 = chi2_new;
        debug!(iteration, chi2, lambda, step, "levenberg-marquardt step");

        // Small steps or gains only mean convergence near the Gauss-Newton
        // regime; under heavy damping they are an artefact of λ.
        if lambda <= 1.0
            && (step <= opts.step_tolerance
                || improvement <= opts.tolerance * chi2.max(f64::MIN_POSITIVE))
        {
            return Ok((x, chi2, iteration));
        }
    }

    Err(ReflError::OptimizerDidNotConverge {
        iterations: opts.max_iterations,
        chi2,
        reason: "iteration budget exhausted".to_string(),
    })
}

/// On a bound (within rounding of the bound width) with the downhill
/// direction `g` pointing outside.
fn pinned_outward(value: f64, bounds: &Bounds, g: f64) -> bool {
    let eps = 1e-10 * bounds.width().max(f64::MIN_POSITIVE);
    let at_lower = value - bounds.lower <= eps;
    let at_upper = bounds.upper - value <= eps;
    bounds.width() <= 0.0 || (at_lower && g < 0.0) || (at_upper && g > 0.0)
}

/// `max_j |g_j| / (‖J_j‖ ‖r‖)` over the free columns, against `tolerance`.
fn projected_gradient_is_small(
    jw: &DMatrix<f64>,
    g: &DVector<f64>,
    r_norm: f64,
    free: &[usize],
    tolerance: f64,
) -> bool {
    if r_norm == 0.0 {
        return true;
    }
    free.iter().all(|&j| {
        let col = jw.column(j).norm();
        col == 0.0 || g[j].abs() / (col * r_norm) <= tolerance
    })
}

/// `max_j |Δx_j| / (|x_j| + ε)`.
fn relative_step_size(old: &[f64], new: &[f64]) -> f64 {
    old.iter()
        .zip(new)
        .map(|(&a, &b)| (b - a).abs() / (a.abs() + 1e-12))
        .fold(0.0, f64::max)
}

fn standard_errors<M: ForwardModel + ?Sized>(
    model: &M,
    data: &Observations,
    x: &[f64],
    relative_step: f64,
) -> Result<Vec<Option<f64>>, ReflError> {
    let jw = weighted_jacobian(model, data, x, relative_step)?;
    let curvature = jw.transpose() * &jw;
    let Some(cov) = spd_inverse(&curvature) else {
        return Ok(vec![None; x.len()]);
    };
    Ok((0..x.len())
        .map(|j| {
            let v = cov[(j, j)];
            (v.is_finite() && v > 0.0).then(|| v.sqrt())
        })
        .collect())
}
