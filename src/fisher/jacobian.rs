//! Finite-difference sensitivities of a forward model.
//!
//! `J[i, j] = ∂R(q_i) / ∂θ_j`, estimated with a symmetric difference around the
//! current value:
//!
//! ```text
//! h      = relative_step · θ_j
//! J[i,j] = (R(θ_j + h) - R(θ_j - h)) / ((θ_j + h) - (θ_j - h))
//! ```
//!
//! Every cell is an independent pair of single-point model evaluations, so
//! rows are computed in parallel. Each worker owns a scratch copy of the
//! parameter vector; perturbations go through [`Perturbation`], which puts the
//! original value back when it goes out of scope, including on an early error
//! return.

use nalgebra::DMatrix;
use rayon::prelude::*;
use tracing::warn;

use crate::error::ReflError;
use crate::models::ForwardModel;

/// Default step: 0.5 % of the parameter's current value.
pub const DEFAULT_RELATIVE_STEP: f64 = 0.005;

/// Scoped change of one entry of a parameter vector.
struct Perturbation<'a> {
    params: &'a mut [f64],
    index: usize,
    original: f64,
}

impl<'a> Perturbation<'a> {
    fn new(params: &'a mut [f64], index: usize) -> Self {
        let original = params[index];
        Self {
            params,
            index,
            original,
        }
    }

    /// Move the entry to `value`; returns the value actually stored.
    fn set(&mut self, value: f64) -> f64 {
        self.params[self.index] = value;
        self.params[self.index]
    }

    fn params(&self) -> &[f64] {
        self.params
    }
}

impl Drop for Perturbation<'_> {
    fn drop(&mut self) {
        self.params[self.index] = self.original;
    }
}

/// Derivative of the model at `q` with respect to parameter `index`.
pub fn gradient<M: ForwardModel + ?Sized>(
    model: &M,
    params: &[f64],
    index: usize,
    q: f64,
    relative_step: f64,
) -> Result<f64, ReflError> {
    let mut scratch = params.to_vec();
    gradient_with_scratch(model, &mut scratch, index, q, relative_step)
}

/// As [`gradient`], perturbing `scratch` in place.
///
/// `scratch` holds exactly the values it held on entry when this returns,
/// whether it returns `Ok` or `Err`.
pub fn gradient_with_scratch<M: ForwardModel + ?Sized>(
    model: &M,
    scratch: &mut [f64],
    index: usize,
    q: f64,
    relative_step: f64,
) -> Result<f64, ReflError> {
    if index >= scratch.len() {
        return Err(ReflError::DimensionMismatch(format!(
            "Parameter index {index} out of range for {} parameters.",
            scratch.len()
        )));
    }
    if !(relative_step.is_finite() && relative_step > 0.0) {
        return Err(ReflError::InvalidInput(format!(
            "Relative step must be finite and > 0, got {relative_step}."
        )));
    }

    let value = scratch[index];
    let step = value * relative_step;
    if step == 0.0 {
        // A zero-valued parameter has no relative step; its sensitivity column
        // stays zero and shows up as degenerate in the information matrix.
        warn!(index, q, "zero finite-difference step; derivative reported as 0");
        return Ok(0.0);
    }

    let mut probe = Perturbation::new(scratch, index);
    let x1 = probe.set(value - step);
    let y1 = model.evaluate_point(probe.params(), q)?;
    let x2 = probe.set(value + step);
    let y2 = model.evaluate_point(probe.params(), q)?;

    Ok((y2 - y1) / (x2 - x1))
}

/// Full `n × m` sensitivity matrix on the grid `q` at `params`.
pub fn jacobian<M: ForwardModel + ?Sized>(
    model: &M,
    params: &[f64],
    q: &[f64],
    relative_step: f64,
) -> Result<DMatrix<f64>, ReflError> {
    let m = params.len();
    if m != model.parameter_count() {
        return Err(ReflError::DimensionMismatch(format!(
            "Model has {} parameters but {m} values supplied.",
            model.parameter_count()
        )));
    }

    let rows: Vec<Vec<f64>> = q
        .par_iter()
        .map_init(
            || params.to_vec(),
            |scratch, &qi| {
                (0..m)
                    .map(|j| gradient_with_scratch(model, scratch, j, qi, relative_step))
                    .collect::<Result<Vec<f64>, ReflError>>()
            },
        )
        .collect::<Result<Vec<_>, ReflError>>()?;

    Ok(DMatrix::from_fn(q.len(), m, |i, j| rows[i][j]))
}
