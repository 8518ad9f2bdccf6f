//! Fisher information matrix.
//!
//! With sensitivities `J` (n × m), scaled flux `F` and noise-free reflectivity
//! `R` on the same grid:
//!
//! ```text
//! M = diag(F_i / R_i)
//! G = Jᵀ M J
//! σ_j = 1 / sqrt(G_jj)
//! ```
//!
//! `G` is symmetric positive semi-definite by construction; it is explicitly
//! symmetrized after assembly so floating-point asymmetry never leaks into the
//! ellipse geometry. A diagonal entry `≤ 0` means the data carry no
//! information about that parameter; its uncertainty is reported as
//! [`ReflError::DegenerateSensitivity`] while the others are still returned.

use nalgebra::{DMatrix, Matrix2};
use tracing::warn;

use crate::error::ReflError;

#[derive(Debug, Clone)]
pub struct FisherInformation {
    matrix: DMatrix<f64>,
    names: Vec<String>,
}

/// Assemble `G = Jᵀ·diag(flux/reflectance)·J`.
pub fn fisher_information(
    jacobian: &DMatrix<f64>,
    flux: &[f64],
    reflectance: &[f64],
    names: Vec<String>,
) -> Result<FisherInformation, ReflError> {
    let (n, m) = jacobian.shape();
    if flux.len() != n || reflectance.len() != n {
        return Err(ReflError::DimensionMismatch(format!(
            "Jacobian has {n} rows but flux has {} and reflectance {} entries.",
            flux.len(),
            reflectance.len()
        )));
    }
    if names.len() != m {
        return Err(ReflError::DimensionMismatch(format!(
            "Jacobian has {m} columns but {} parameter names were given.",
            names.len()
        )));
    }

    let mut weighted = jacobian.clone();
    for i in 0..n {
        let (f, r) = (flux[i], reflectance[i]);
        if !(r.is_finite() && r > 0.0) {
            return Err(ReflError::InvalidInput(format!(
                "Reflectance at point {i} is {r:e}; the information weight flux/reflectance is undefined."
            )));
        }
        if !(f.is_finite() && f >= 0.0) {
            return Err(ReflError::InvalidInput(format!(
                "Flux at point {i} is {f:e}; it must be finite and non-negative."
            )));
        }
        let w = f / r;
        weighted.row_mut(i).scale_mut(w);
    }

    let g = jacobian.transpose() * weighted;
    let matrix = (&g + g.transpose()) * 0.5;

    Ok(FisherInformation { matrix, names })
}

impl FisherInformation {
    pub fn matrix(&self) -> &DMatrix<f64> {
        &self.matrix
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Number of parameters.
    pub fn dim(&self) -> usize {
        self.matrix.nrows()
    }

    /// Per-parameter `1 / sqrt(G_jj)`; degenerate entries are `Err`.
    pub fn uncertainties(&self) -> Vec<Result<f64, ReflError>> {
        (0..self.dim())
            .map(|j| {
                let d = self.matrix[(j, j)];
                if d.is_finite() && d > 0.0 {
                    Ok(1.0 / d.sqrt())
                } else {
                    warn!(parameter = %self.names[j], diagonal = d, "degenerate Fisher diagonal");
                    Err(ReflError::DegenerateSensitivity {
                        parameter: self.names[j].clone(),
                        diagonal: d,
                    })
                }
            })
            .collect()
    }

    /// `[[G_ii, G_ij], [G_ji, G_jj]]`.
    pub fn sub_block(&self, i: usize, j: usize) -> Result<Matrix2<f64>, ReflError> {
        let m = self.dim();
        if i >= m || j >= m {
            return Err(ReflError::DimensionMismatch(format!(
                "Sub-block ({i}, {j}) out of range for {m} parameters."
            )));
        }
        let g = &self.matrix;
        Ok(Matrix2::new(g[(i, i)], g[(i, j)], g[(j, i)], g[(j, j)]))
    }
}
