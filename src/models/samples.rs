//! Built-in sample structures.
//!
//! Each factory returns a fresh structure with every parameter fixed; the
//! bounds initializer decides what varies. Ambient is air, substrate is
//! silicon (SLD 2.047e-6 Å⁻²).

use crate::domain::{Layer, SampleKind, Structure};

const SI_SLD: f64 = 2.047;
const ROUGH: f64 = 2.0;

fn stack(name: &str, interior: &[(&str, f64, f64)]) -> Structure {
    let mut layers = Vec::with_capacity(interior.len() + 2);
    layers.push(Layer::medium("Air", 0.0, 0.0));
    for &(layer_name, sld, thick) in interior {
        layers.push(Layer::new(layer_name, sld, thick, ROUGH));
    }
    layers.push(Layer::medium("Si Substrate", SI_SLD, ROUGH));
    Structure {
        name: name.to_string(),
        layers,
    }
}

/// One 200 Å film of SLD 4.0.
pub fn single_layer_sample() -> Structure {
    stack("single_layer", &[("Layer 1", 4.0, 200.0)])
}

/// Two well-separated layers.
pub fn easy_sample() -> Structure {
    stack("easy", &[("Layer 1", 4.0, 100.0), ("Layer 2", 8.0, 150.0)])
}

/// Thick layer over a very thin one.
pub fn thin_layer_sample_1() -> Structure {
    stack("thin_layer_1", &[("Layer 1", 4.0, 200.0), ("Layer 2", 6.0, 6.0)])
}

pub fn thin_layer_sample_2() -> Structure {
    stack(
        "thin_layer_2",
        &[("Layer 1", 4.0, 200.0), ("Layer 2", 5.0, 30.0), ("Layer 3", 6.0, 6.0)],
    )
}

/// Two layers with nearly matching SLD.
pub fn similar_sld_sample_1() -> Structure {
    stack("similar_sld_1", &[("Layer 1", 0.9, 80.0), ("Layer 2", 1.0, 50.0)])
}

pub fn similar_sld_sample_2() -> Structure {
    stack(
        "similar_sld_2",
        &[("Layer 1", 3.0, 50.0), ("Layer 2", 5.5, 30.0), ("Layer 3", 6.0, 35.0)],
    )
}

pub fn many_param_sample() -> Structure {
    stack(
        "many_param",
        &[
            ("Layer 1", 2.0, 50.0),
            ("Layer 2", 1.7, 15.0),
            ("Layer 3", 0.8, 60.0),
            ("Layer 4", 3.2, 40.0),
            ("Layer 5", 4.0, 18.0),
        ],
    )
}

/// Ambient directly on substrate: no interior layers at all.
pub fn bare_substrate_sample() -> Structure {
    stack("bare_substrate", &[])
}

impl SampleKind {
    pub fn build(self) -> Structure {
        match self {
            SampleKind::SingleLayer => single_layer_sample(),
            SampleKind::Easy => easy_sample(),
            SampleKind::ThinLayer1 => thin_layer_sample_1(),
            SampleKind::ThinLayer2 => thin_layer_sample_2(),
            SampleKind::SimilarSld1 => similar_sld_sample_1(),
            SampleKind::SimilarSld2 => similar_sld_sample_2(),
            SampleKind::ManyParam => many_param_sample(),
            SampleKind::BareSubstrate => bare_substrate_sample(),
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            SampleKind::SingleLayer => "single 200 A film, SLD 4.0",
            SampleKind::Easy => "two well-separated layers",
            SampleKind::ThinLayer1 => "thick layer over a 6 A layer",
            SampleKind::ThinLayer2 => "three layers ending in a 6 A layer",
            SampleKind::SimilarSld1 => "two layers with SLD 0.9 / 1.0",
            SampleKind::SimilarSld2 => "three layers, two with close SLD",
            SampleKind::ManyParam => "five layers (ten free parameters)",
            SampleKind::BareSubstrate => "air on silicon, nothing to fit",
        }
    }
}
