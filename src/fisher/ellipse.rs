//! Joint confidence regions from the information matrix.
//!
//! For a parameter pair `(x, y)` with information sub-block `g`, the boundary
//! at confidence multiplier `k` is traced in polar form around the fitted
//! values:
//!
//! ```text
//! X(θ) = (sin θ, cos θ)
//! ε(θ) = k / sqrt(Xᵀ g X)
//! (x, y) = (x̂ + ε sin θ, ŷ + ε cos θ),   θ ∈ [0, 2π)
//! ```
//!
//! Only data are produced here; drawing lives in `plot`.

use nalgebra::Vector2;
use serde::{Deserialize, Serialize};

use crate::error::ReflError;
use crate::fisher::information::FisherInformation;

/// Confidence multiplier (≈ 2σ).
pub const DEFAULT_CONFIDENCE_K: f64 = 2.0;

/// Angular resolution of the traced boundary (radians).
pub const DEFAULT_ANGLE_STEP: f64 = 0.001;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfidenceEllipse {
    pub x_index: usize,
    pub y_index: usize,
    pub x_name: String,
    pub y_name: String,
    pub k: f64,
    pub centre: (f64, f64),
    pub points: Vec<(f64, f64)>,
}

/// Trace the ellipse for parameters `x_index` (horizontal) and `y_index`.
pub fn confidence_ellipse(
    info: &FisherInformation,
    x_index: usize,
    y_index: usize,
    centre: (f64, f64),
    k: f64,
    angle_step: f64,
) -> Result<ConfidenceEllipse, ReflError> {
    if !(k.is_finite() && k > 0.0) {
        return Err(ReflError::InvalidInput(format!("Confidence multiplier must be > 0, got {k}.")));
    }
    if !(angle_step.is_finite() && angle_step > 0.0) {
        return Err(ReflError::InvalidInput(format!("Angle step must be > 0, got {angle_step}.")));
    }
    let g = info.sub_block(x_index, y_index)?;
    let names = info.names();

    let count = (std::f64::consts::TAU / angle_step).ceil() as usize;
    let mut points = Vec::with_capacity(count);
    for idx in 0..count {
        let theta = idx as f64 * angle_step;
        let (s, c) = theta.sin_cos();
        let x = Vector2::new(s, c);
        let quad = x.dot(&(g * x));
        if !(quad.is_finite() && quad > 0.0) {
            return Err(ReflError::DegenerateSensitivity {
                parameter: format!("{} / {}", names[x_index], names[y_index]),
                diagonal: quad,
            });
        }
        let eps = k / quad.sqrt();
        points.push((centre.0 + eps * s, centre.1 + eps * c));
    }

    Ok(ConfidenceEllipse {
        x_index,
        y_index,
        x_name: names[x_index].clone(),
        y_name: names[y_index].clone(),
        k,
        centre,
        points,
    })
}

/// Ellipses for every pair `i > j`, with parameter `j` on the horizontal axis.
///
/// A degenerate pair yields an `Err` in its slot; the other pairs are unaffected.
pub fn all_ellipses(
    info: &FisherInformation,
    centres: &[f64],
    k: f64,
    angle_step: f64,
) -> Result<Vec<Result<ConfidenceEllipse, ReflError>>, ReflError> {
    let m = info.dim();
    if centres.len() != m {
        return Err(ReflError::DimensionMismatch(format!(
            "{m} parameters but {} centre values.",
            centres.len()
        )));
    }
    let mut out = Vec::with_capacity(m * m.saturating_sub(1) / 2);
    for i in 0..m {
        for j in 0..i {
            out.push(confidence_ellipse(info, j, i, (centres[j], centres[i]), k, angle_step));
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fisher::information::fisher_information;
    use nalgebra::DMatrix;

    fn diagonal_info(a: f64, b: f64) -> FisherInformation {
        // J = diag(sqrt(a), sqrt(b)) with unit weights gives G = diag(a, b).
        let j = DMatrix::from_row_slice(2, 2, &[a.sqrt(), 0.0, 0.0, b.sqrt()]);
        fisher_information(&j, &[1.0, 1.0], &[1.0, 1.0], vec!["x".into(), "y".into()]).unwrap()
    }

    #[test]
    fn diagonal_information_gives_axis_aligned_ellipse() {
        let info = diagonal_info(4.0, 16.0);
        let e = confidence_ellipse(&info, 0, 1, (1.0, 2.0), 2.0, 0.01).unwrap();
        // Semi-axes: k / sqrt(G_xx) = 1, k / sqrt(G_yy) = 0.5
        let max_dx = e.points.iter().map(|p| (p.0 - 1.0).abs()).fold(0.0, f64::max);
        let max_dy = e.points.iter().map(|p| (p.1 - 2.0).abs()).fold(0.0, f64::max);
        assert!((max_dx - 1.0).abs() < 1e-3, "{max_dx}");
        assert!((max_dy - 0.5).abs() < 1e-3, "{max_dy}");
        // Every point satisfies the quadratic form at level k².
        for &(x, y) in &e.points {
            let (dx, dy) = (x - 1.0, y - 2.0);
            let q = 4.0 * dx * dx + 16.0 * dy * dy;
            assert!((q - 4.0).abs() < 1e-9);
        }
    }

    #[test]
    fn default_step_covers_full_turn() {
        let info = diagonal_info(1.0, 1.0);
        let e = confidence_ellipse(&info, 0, 1, (0.0, 0.0), DEFAULT_CONFIDENCE_K, DEFAULT_ANGLE_STEP).unwrap();
        assert_eq!(e.points.len(), 6284);
    }

    #[test]
    fn pairs_cover_lower_triangle() {
        let j = DMatrix::<f64>::identity(3, 3);
        let info = fisher_information(
            &j,
            &[1.0; 3],
            &[1.0; 3],
            vec!["a".into(), "b".into(), "c".into()],
        )
        .unwrap();
        let all = all_ellipses(&info, &[0.0, 0.0, 0.0], 2.0, 0.1).unwrap();
        let pairs: Vec<(usize, usize)> = all
            .iter()
            .map(|e| {
                let e = e.as_ref().unwrap();
                (e.x_index, e.y_index)
            })
            .collect();
        assert_eq!(pairs, vec![(0, 1), (0, 2), (1, 2)]);
    }

    #[test]
    fn degenerate_block_is_an_error() {
        let j = DMatrix::from_row_slice(2, 2, &[1.0, 0.0, 0.0, 0.0]);
        let info = fisher_information(&j, &[1.0, 1.0], &[1.0, 1.0], vec!["x".into(), "y".into()]).unwrap();
        assert!(confidence_ellipse(&info, 0, 1, (0.0, 0.0), 2.0, 0.1).is_err());
    }
}
