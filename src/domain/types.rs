//! Shared domain types.
//!
//! These types are intentionally kept lightweight and serializable so they can be:
//!
//! - passed by value between pipeline stages (snapshots instead of shared state)
//! - printed as JSON reports
//! - constructed directly in tests

use std::path::PathBuf;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::error::ReflError;

/// Closed search interval for a free parameter.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub lower: f64,
    pub upper: f64,
}

impl Bounds {
    pub fn new(lower: f64, upper: f64) -> Result<Self, ReflError> {
        if !(lower.is_finite() && upper.is_finite()) || lower > upper {
            return Err(ReflError::InvalidInput(format!(
                "Invalid bounds: lower={lower}, upper={upper} (must be finite and ordered)."
            )));
        }
        Ok(Self { lower, upper })
    }

    /// `[0.5·v, 1.5·v]`, ordered so the interval stays valid for negative `v`.
    pub fn scaled_around(value: f64) -> Result<Self, ReflError> {
        let a = value * 0.5;
        let b = value * 1.5;
        Self::new(a.min(b), a.max(b))
    }

    pub fn contains(&self, value: f64) -> bool {
        value >= self.lower && value <= self.upper
    }

    pub fn clamp(&self, value: f64) -> f64 {
        value.clamp(self.lower, self.upper)
    }

    pub fn width(&self) -> f64 {
        self.upper - self.lower
    }
}

/// A named scalar of the structure that may be released for fitting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parameter {
    pub name: String,
    value: f64,
    bounds: Option<Bounds>,
    vary: bool,
}

impl Parameter {
    /// A fixed parameter (not varying, no bounds).
    pub fn fixed(name: impl Into<String>, value: f64) -> Self {
        Self {
            name: name.into(),
            value,
            bounds: None,
            vary: false,
        }
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    pub fn bounds(&self) -> Option<Bounds> {
        self.bounds
    }

    pub fn is_varying(&self) -> bool {
        self.vary
    }

    /// Set the value, rejecting anything outside the configured bounds.
    pub fn set_value(&mut self, value: f64) -> Result<(), ReflError> {
        if !value.is_finite() {
            return Err(ReflError::InvalidInput(format!(
                "Parameter '{}' cannot take non-finite value {value}.",
                self.name
            )));
        }
        if let Some(b) = self.bounds {
            if !b.contains(value) {
                return Err(ReflError::OutOfBounds {
                    parameter: self.name.clone(),
                    value,
                    lower: b.lower,
                    upper: b.upper,
                });
            }
        }
        self.value = value;
        Ok(())
    }

    /// Release the parameter for fitting within `bounds`.
    ///
    /// The current value is left untouched even if it falls outside `bounds`;
    /// a subsequent [`Parameter::set_value`] is what enforces them.
    pub fn set_vary(&mut self, bounds: Bounds) {
        self.bounds = Some(bounds);
        self.vary = true;
    }

    /// Overwrite the value without a bound check (snapshot evaluation only).
    pub(crate) fn assign_unchecked(&mut self, value: f64) {
        self.value = value;
    }
}

/// Which tunable quantity of a layer a free parameter refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamKind {
    Sld,
    Thick,
}

impl ParamKind {
    pub const TUNABLE: [ParamKind; 2] = [ParamKind::Sld, ParamKind::Thick];

    pub fn label(self) -> &'static str {
        match self {
            ParamKind::Sld => "sld",
            ParamKind::Thick => "thick",
        }
    }
}

/// One slab of a layered structure.
///
/// Units: SLD in 1e-6 Å⁻², thickness and roughness in Å. `rough` is the
/// roughness of the interface *above* this layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Layer {
    pub name: String,
    pub sld: Parameter,
    pub isld: f64,
    pub thick: Parameter,
    pub rough: f64,
}

impl Layer {
    pub fn new(name: &str, sld: f64, thick: f64, rough: f64) -> Self {
        Self {
            name: name.to_string(),
            sld: Parameter::fixed(format!("{name} - sld"), sld),
            isld: 0.0,
            thick: Parameter::fixed(format!("{name} - thick"), thick),
            rough,
        }
    }

    /// Semi-infinite ambient / substrate medium (thickness is ignored).
    pub fn medium(name: &str, sld: f64, rough: f64) -> Self {
        Self::new(name, sld, 0.0, rough)
    }

    pub fn param(&self, kind: ParamKind) -> &Parameter {
        match kind {
            ParamKind::Sld => &self.sld,
            ParamKind::Thick => &self.thick,
        }
    }

    pub fn param_mut(&mut self, kind: ParamKind) -> &mut Parameter {
        match kind {
            ParamKind::Sld => &mut self.sld,
            ParamKind::Thick => &mut self.thick,
        }
    }
}

/// Location of a free parameter inside a structure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ParamId {
    pub layer: usize,
    pub kind: ParamKind,
}

/// Flattened view of one varying parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FreeParameter {
    pub id: ParamId,
    pub name: String,
    pub value: f64,
    pub bounds: Bounds,
}

/// Ordered stack of layers: ambient first, substrate last.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Structure {
    pub name: String,
    pub layers: Vec<Layer>,
}

impl Structure {
    pub fn new(name: &str, layers: Vec<Layer>) -> Result<Self, ReflError> {
        if layers.len() < 2 {
            return Err(ReflError::InvalidInput(format!(
                "Structure '{name}' needs at least an ambient and a substrate layer (got {}).",
                layers.len()
            )));
        }
        Ok(Self {
            name: name.to_string(),
            layers,
        })
    }

    /// Layers strictly between the ambient medium and the substrate.
    pub fn interior_range(&self) -> std::ops::Range<usize> {
        1..self.layers.len().saturating_sub(1).max(1)
    }

    pub fn interior_count(&self) -> usize {
        self.interior_range().len()
    }

    /// Varying parameters in layer order, SLD before thickness.
    pub fn free_parameters(&self) -> Vec<FreeParameter> {
        let mut out = Vec::new();
        for (idx, layer) in self.layers.iter().enumerate() {
            for kind in ParamKind::TUNABLE {
                let p = layer.param(kind);
                if let (true, Some(bounds)) = (p.is_varying(), p.bounds()) {
                    out.push(FreeParameter {
                        id: ParamId { layer: idx, kind },
                        name: p.name.clone(),
                        value: p.value(),
                        bounds,
                    });
                }
            }
        }
        out
    }

    /// Immutable snapshot with the free parameters replaced by `values`.
    ///
    /// No bound check: finite-difference probes may step just past a bound.
    pub fn with_free_values(&self, ids: &[ParamId], values: &[f64]) -> Result<Structure, ReflError> {
        if ids.len() != values.len() {
            return Err(ReflError::DimensionMismatch(format!(
                "{} free parameters but {} values supplied.",
                ids.len(),
                values.len()
            )));
        }
        let mut out = self.clone();
        for (id, &v) in ids.iter().zip(values) {
            let layer = out.layers.get_mut(id.layer).ok_or_else(|| {
                ReflError::DimensionMismatch(format!("Layer index {} out of range.", id.layer))
            })?;
            layer.param_mut(id.kind).assign_unchecked(v);
        }
        Ok(out)
    }
}

/// Instrument settings applied by the forward model.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Instrument {
    pub scale: f64,
    /// Constant additive background of the model.
    pub background: f64,
    /// Resolution dQ/Q in percent (FWHM); 0 disables smearing.
    pub dq_percent: f64,
}

impl Default for Instrument {
    fn default() -> Self {
        Self {
            scale: 1.0,
            background: 1e-6,
            dq_percent: 2.0,
        }
    }
}

/// Built-in structure factories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum SampleKind {
    SingleLayer,
    Easy,
    #[value(name = "thin-layer-1")]
    #[serde(rename = "thin-layer-1")]
    ThinLayer1,
    #[value(name = "thin-layer-2")]
    #[serde(rename = "thin-layer-2")]
    ThinLayer2,
    #[value(name = "similar-sld-1")]
    #[serde(rename = "similar-sld-1")]
    SimilarSld1,
    #[value(name = "similar-sld-2")]
    #[serde(rename = "similar-sld-2")]
    SimilarSld2,
    ManyParam,
    BareSubstrate,
}

impl SampleKind {
    pub const ALL: [SampleKind; 8] = [
        SampleKind::SingleLayer,
        SampleKind::Easy,
        SampleKind::ThinLayer1,
        SampleKind::ThinLayer2,
        SampleKind::SimilarSld1,
        SampleKind::SimilarSld2,
        SampleKind::ManyParam,
        SampleKind::BareSubstrate,
    ];
}

/// Simulation settings for one trial.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationConfig {
    pub points: usize,
    pub q_min: f64,
    pub q_max: f64,
    pub instrument: Instrument,
    /// Mean rate of the random detector background added by the noise model.
    pub background_rate: f64,
    /// Multiplies the flux profile; larger means less noise.
    pub noise_constant: f64,
    pub flux_file: PathBuf,
    pub seed: Option<u64>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            points: 300,
            q_min: 0.005,
            q_max: 0.3,
            instrument: Instrument::default(),
            background_rate: 5e-7,
            noise_constant: 5e5,
            flux_file: PathBuf::from(DEFAULT_FLUX_FILE),
            seed: None,
        }
    }
}

/// Reference direct-beam profile shipped with the crate.
pub const DEFAULT_FLUX_FILE: &str = "assets/directbeam_noise.dat";

/// Noisy synthetic measurement on a Q grid.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Observations {
    pub q: Vec<f64>,
    pub reflectivity: Vec<f64>,
    pub uncertainty: Vec<f64>,
}

impl Observations {
    pub fn len(&self) -> usize {
        self.q.len()
    }

    pub fn is_empty(&self) -> bool {
        self.q.is_empty()
    }

    pub fn validate(&self) -> Result<(), ReflError> {
        let n = self.q.len();
        if self.reflectivity.len() != n || self.uncertainty.len() != n {
            return Err(ReflError::DimensionMismatch(format!(
                "Observations have {n} Q values, {} reflectivities and {} uncertainties.",
                self.reflectivity.len(),
                self.uncertainty.len()
            )));
        }
        if let Some(i) = self.uncertainty.iter().position(|s| !(s.is_finite() && *s > 0.0)) {
            return Err(ReflError::InvalidInput(format!(
                "Uncertainty at point {i} is not strictly positive."
            )));
        }
        Ok(())
    }
}
