//! Logarithmic sampling grids.
//!
//! The momentum-transfer axis and the noise-constant sweep are both sampled
//! uniformly in `ln`, endpoints included.

use crate::error::ReflError;

/// Generate `steps` log-spaced points between `min` and `max` (inclusive).
pub fn log_space(min: f64, max: f64, steps: usize) -> Result<Vec<f64>, ReflError> {
    if !(min.is_finite() && max.is_finite() && min > 0.0 && max > 0.0 && max > min) {
        return Err(ReflError::InvalidInput(format!(
            "Invalid log range: min={min}, max={max} (must be finite, >0, and max>min)."
        )));
    }
    if steps < 2 {
        return Err(ReflError::InvalidInput("Grid steps must be >= 2.".to_string()));
    }

    let ln_min = min.ln();
    let ln_max = max.ln();
    let step = (ln_max - ln_min) / (steps as f64 - 1.0);

    let mut out = Vec::with_capacity(steps);
    for i in 0..steps {
        out.push((ln_min + step * i as f64).exp());
    }
    // Pin the endpoints exactly; exp(ln(x)) can drift by an ulp.
    out[0] = min;
    out[steps - 1] = max;
    Ok(out)
}

/// Powers of ten `10^e` for `e = start, start+step, …` strictly below `stop`.
pub fn decades(start: f64, stop: f64, step: f64) -> Result<Vec<f64>, ReflError> {
    if !(start.is_finite() && stop.is_finite() && step.is_finite() && step > 0.0 && stop > start) {
        return Err(ReflError::InvalidInput(format!(
            "Invalid exponent range: start={start}, stop={stop}, step={step}."
        )));
    }
    let count = ((stop - start) / step - 1e-9).ceil().max(0.0) as usize;
    Ok((0..count)
        .map(|i| 10f64.powf(start + step * i as f64))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_space_includes_endpoints() {
        let v = log_space(0.005, 0.3, 300).unwrap();
        assert_eq!(v.len(), 300);
        assert_eq!(v[0], 0.005);
        assert_eq!(v[299], 0.3);
        assert!(v.windows(2).all(|w| w[1] > w[0]));
    }

    #[test]
    fn log_space_rejects_bad_ranges() {
        assert!(log_space(0.0, 1.0, 10).is_err());
        assert!(log_space(1.0, 0.5, 10).is_err());
        assert!(log_space(0.1, 1.0, 1).is_err());
    }

    #[test]
    fn decades_exclude_stop() {
        let v = decades(3.0, 6.0, 0.25).unwrap();
        assert_eq!(v.len(), 12);
        assert!((v[0] - 1e3).abs() < 1e-9);
        assert!((v[11] - 10f64.powf(5.75)).abs() < 1e-6);
    }
}
