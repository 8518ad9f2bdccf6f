//! Forward models.
//!
//! The fitter and the sensitivity engine only ever see a [`ForwardModel`]: a
//! pure function from an explicit parameter vector and a set of Q values to
//! reflectivity. No stage mutates shared model state; each evaluation builds
//! its own structure snapshot.

use crate::domain::{Bounds, FreeParameter, Instrument, ParamId, Structure};
use crate::error::ReflError;
use crate::models::abeles::{Slab, abeles, smeared};

/// Capability interface for anything that predicts reflectivity.
///
/// Implementations must be pure for a fixed parameter vector and safe to call
/// from several threads at once.
pub trait ForwardModel: Sync {
    /// Names of the free parameters, in parameter-vector order.
    fn parameter_names(&self) -> Vec<String>;

    fn parameter_count(&self) -> usize {
        self.parameter_names().len()
    }

    /// Predicted reflectivity at each of `q` for parameter vector `params`.
    fn evaluate(&self, params: &[f64], q: &[f64]) -> Result<Vec<f64>, ReflError>;

    /// Single-point convenience wrapper around [`ForwardModel::evaluate`].
    fn evaluate_point(&self, params: &[f64], q: f64) -> Result<f64, ReflError> {
        self.evaluate(params, &[q])?
            .first()
            .copied()
            .ok_or_else(|| ReflError::DimensionMismatch("Model returned no value for a single Q.".to_string()))
    }
}

/// Reflectivity of a complete structure (all current parameter values).
pub fn reflectivity(structure: &Structure, instrument: &Instrument, q: &[f64]) -> Result<Vec<f64>, ReflError> {
    if let Some(&bad) = q.iter().find(|x| !(x.is_finite() && **x > 0.0)) {
        return Err(ReflError::InvalidInput(format!(
            "Q values must be finite and > 0, got {bad}."
        )));
    }
    let slabs: Vec<Slab> = structure.layers.iter().map(Slab::from).collect();
    Ok(q.iter()
        .map(|&x| {
            let r = smeared(x, instrument.dq_percent, |qk| abeles(qk, &slabs));
            instrument.scale * r + instrument.background
        })
        .collect())
}

/// A structure + instrument whose varying parameters form the model's
/// parameter vector.
#[derive(Debug, Clone)]
pub struct StructureModel {
    structure: Structure,
    instrument: Instrument,
    free: Vec<FreeParameter>,
    ids: Vec<ParamId>,
}

impl StructureModel {
    pub fn new(structure: Structure, instrument: Instrument) -> Self {
        let free = structure.free_parameters();
        let ids = free.iter().map(|p| p.id).collect();
        Self {
            structure,
            instrument,
            free,
            ids,
        }
    }

    pub fn structure(&self) -> &Structure {
        &self.structure
    }

    pub fn instrument(&self) -> &Instrument {
        &self.instrument
    }

    pub fn free_parameters(&self) -> &[FreeParameter] {
        &self.free
    }

    /// Current values of the free parameters (the fit's starting point).
    pub fn initial_values(&self) -> Vec<f64> {
        self.free.iter().map(|p| p.value).collect()
    }

    pub fn bounds(&self) -> Vec<Bounds> {
        self.free.iter().map(|p| p.bounds).collect()
    }

    /// Structure snapshot at `params`.
    pub fn snapshot(&self, params: &[f64]) -> Result<Structure, ReflError> {
        self.structure.with_free_values(&self.ids, params)
    }
}

impl ForwardModel for StructureModel {
    fn parameter_names(&self) -> Vec<String> {
        self.free.iter().map(|p| p.name.clone()).collect()
    }

    fn parameter_count(&self) -> usize {
        self.free.len()
    }

    fn evaluate(&self, params: &[f64], q: &[f64]) -> Result<Vec<f64>, ReflError> {
        let snapshot = self.snapshot(params)?;
        reflectivity(&snapshot, &self.instrument, q)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Layer, ParamKind};

    fn film() -> Structure {
        Structure::new(
            "film",
            vec![
                Layer::medium("air", 0.0, 0.0),
                Layer::new("layer", 4.0, 200.0, 2.0),
                Layer::medium("Si", 2.047, 2.0),
            ],
        )
        .unwrap()
    }

    #[test]
    fn background_and_scale_are_applied() {
        let inst = Instrument {
            scale: 0.5,
            background: 1e-6,
            dq_percent: 0.0,
        };
        let bare = Instrument {
            scale: 1.0,
            background: 0.0,
            dq_percent: 0.0,
        };
        let s = film();
        let a = reflectivity(&s, &inst, &[0.1]).unwrap()[0];
        let b = reflectivity(&s, &bare, &[0.1]).unwrap()[0];
        assert!((a - (0.5 * b + 1e-6)).abs() < 1e-18);
    }

    #[test]
    fn non_positive_q_is_rejected() {
        assert!(reflectivity(&film(), &Instrument::default(), &[0.0]).is_err());
    }

    #[test]
    fn structure_model_evaluates_snapshots() {
        let mut s = film();
        s.layers[1]
            .param_mut(ParamKind::Thick)
            .set_vary(Bounds::new(100.0, 300.0).unwrap());
        let model = StructureModel::new(s.clone(), Instrument::default());
        assert_eq!(model.parameter_count(), 1);
        assert_eq!(model.parameter_names(), vec!["layer - thick".to_string()]);

        let q = [0.02, 0.05, 0.1];
        let at_200 = model.evaluate(&[200.0], &q).unwrap();
        let direct = reflectivity(&s, &Instrument::default(), &q).unwrap();
        assert_eq!(at_200, direct);

        let at_250 = model.evaluate(&[250.0], &q).unwrap();
        assert_ne!(at_200, at_250);
        assert_eq!(model.evaluate_point(&[200.0], 0.05).unwrap(), at_200[1]);
    }
}
