//! Parameter bounds initialization.
//!
//! For every interior layer (ambient and substrate excluded) and each of its
//! two tunable quantities, SLD and thickness:
//!
//! - search bounds become `[0.5·v, 1.5·v]` of the present value `v`
//! - the quantity is released for fitting
//! - the starting value is moved to `1.5·v`, the upper bound for positive `v`
//!
//! Bounds are installed before the value is overwritten because value setting
//! is bound-checked. Applying the routine twice would compound the range, so a
//! second call on the same structure is rejected with
//! [`ReflError::AlreadyVarying`] and leaves the structure untouched.

use tracing::debug;

use crate::domain::{Bounds, ParamKind, Structure};
use crate::error::ReflError;

/// Release every interior SLD and thickness for fitting.
///
/// Returns the number of parameters that are now free (`2 ×` interior layers).
pub fn vary_interior_layers(structure: &mut Structure) -> Result<usize, ReflError> {
    // Validate everything first so a failure never leaves a half-varied structure.
    let mut plan = Vec::new();
    for idx in structure.interior_range() {
        let layer = &structure.layers[idx];
        for kind in ParamKind::TUNABLE {
            let p = layer.param(kind);
            if p.is_varying() {
                return Err(ReflError::AlreadyVarying {
                    parameter: p.name.clone(),
                });
            }
            let original = p.value();
            plan.push((idx, kind, Bounds::scaled_around(original)?, original * 1.5));
        }
    }

    for &(idx, kind, bounds, start) in &plan {
        let p = structure.layers[idx].param_mut(kind);
        p.set_vary(bounds);
        p.set_value(start)?;
        debug!(
            parameter = %p.name,
            lower = bounds.lower,
            upper = bounds.upper,
            start,
            "parameter released for fitting"
        );
    }

    Ok(plan.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{bare_substrate_sample, many_param_sample, single_layer_sample};

    #[test]
    fn interior_parameters_get_scaled_bounds_and_upper_start() {
        let original = many_param_sample();
        let mut s = original.clone();
        let n = vary_interior_layers(&mut s).unwrap();
        assert_eq!(n, 2 * original.interior_count());

        let free = s.free_parameters();
        assert_eq!(free.len(), n);
        for p in &free {
            let before = original.layers[p.id.layer].param(p.id.kind).value();
            assert_eq!(p.bounds.lower, before * 0.5);
            assert_eq!(p.bounds.upper, before * 1.5);
            assert_eq!(p.value, p.bounds.upper);
        }
    }

    #[test]
    fn ambient_and_substrate_stay_fixed() {
        let mut s = single_layer_sample();
        vary_interior_layers(&mut s).unwrap();
        let last = s.layers.len() - 1;
        for kind in ParamKind::TUNABLE {
            assert!(!s.layers[0].param(kind).is_varying());
            assert!(!s.layers[last].param(kind).is_varying());
        }
    }

    #[test]
    fn second_invocation_is_rejected_without_changes() {
        let mut s = single_layer_sample();
        vary_interior_layers(&mut s).unwrap();
        let snapshot = s.clone();
        let err = vary_interior_layers(&mut s).unwrap_err();
        assert!(matches!(err, ReflError::AlreadyVarying { .. }));
        assert_eq!(s, snapshot);
    }

    #[test]
    fn no_interior_layers_means_no_free_parameters() {
        let mut s = bare_substrate_sample();
        assert_eq!(vary_interior_layers(&mut s).unwrap(), 0);
        assert!(s.free_parameters().is_empty());
    }
}
