//! Measurement simulation inputs: the direct-beam flux profile and the noise model.

pub mod flux;
pub mod noise;

pub use flux::FluxProfile;
pub use noise::{NoiseModel, NoisyData, add_noise};
