//! Piecewise-linear interpolation over tabulated knots.
//!
//! Outside the tabulated range the end values are held flat, so a calibration
//! table never extrapolates into negative intensities.

fn linear_interp(a: (f64, f64), b: (f64, f64), x: f64) -> f64 {
    let (x0, y0) = a;
    let (x1, y1) = b;
    if (x1 - x0).abs() < 1e-12 {
        return y0;
    }
    let u = (x - x0) / (x1 - x0);
    y0 + u * (y1 - y0)
}

/// Interpolate `knots` (sorted by x, non-empty) at `x`.
pub fn interp(knots: &[(f64, f64)], x: f64) -> f64 {
    let Some(&first) = knots.first() else {
        return f64::NAN;
    };
    let last = knots[knots.len() - 1];
    if x <= first.0 {
        return first.1;
    }
    if x >= last.0 {
        return last.1;
    }

    // First knot strictly greater than x; x lies in [knots[i-1], knots[i]).
    let i = knots.partition_point(|&(k, _)| k <= x);
    linear_interp(knots[i - 1], knots[i], x)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interp_linear_between_knots_and_flat_outside() {
        let knots = [(0.0, 0.0), (1.0, 10.0), (3.0, 30.0)];
        assert!((interp(&knots, 0.5) - 5.0).abs() < 1e-12);
        assert!((interp(&knots, 2.0) - 20.0).abs() < 1e-12);
        assert_eq!(interp(&knots, 1.0), 10.0);
        assert_eq!(interp(&knots, -1.0), 0.0);
        assert_eq!(interp(&knots, 5.0), 30.0);
    }

    #[test]
    fn interp_empty_is_nan() {
        assert!(interp(&[], 1.0).is_nan());
    }
}
