//! Synthetic measurement noise.
//!
//! Turns a noise-free reflectivity curve into a noisy "measured" dataset:
//!
//! 1. interpolate the direct-beam flux onto the Q grid, scaled by the noise
//!    constant (larger constant = more counts = less noise)
//! 2. add a random, non-negative detector background to every point:
//!    `max(N(1, 0.5) · background_rate, 0)`
//! 3. counting-noise width per point: `1 / (c · sqrt(R · flux))`
//! 4. draw the measured value from `N(R, width)`; the width is the reported
//!    uncertainty
//!
//! All background multipliers are drawn before any measurement draw, so a
//! given seed reproduces the same sequence regardless of the noise constant.

use rand::Rng;
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};

use crate::data::flux::FluxProfile;
use crate::domain::Observations;
use crate::error::ReflError;

/// Noise settings for one simulated measurement.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NoiseModel {
    pub noise_constant: f64,
    pub background_rate: f64,
}

/// Output of [`add_noise`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NoisyData {
    pub observations: Observations,
    /// Flux interpolated on the Q grid and multiplied by the noise constant.
    pub flux: Vec<f64>,
    /// Background-added reflectivity each measurement was drawn around.
    pub signal: Vec<f64>,
}

/// Simulate a noisy measurement of `reflectivity` on the grid `q`.
pub fn add_noise<R: Rng + ?Sized>(
    q: &[f64],
    reflectivity: &[f64],
    flux_profile: &FluxProfile,
    noise: &NoiseModel,
    rng: &mut R,
) -> Result<NoisyData, ReflError> {
    if q.len() != reflectivity.len() {
        return Err(ReflError::DimensionMismatch(format!(
            "{} Q values but {} reflectivity values.",
            q.len(),
            reflectivity.len()
        )));
    }
    let c = noise.noise_constant;
    if !(c.is_finite() && c > 0.0) {
        return Err(ReflError::InvalidInput(format!(
            "Noise constant must be finite and > 0, got {c}."
        )));
    }
    if !(noise.background_rate.is_finite() && noise.background_rate >= 0.0) {
        return Err(ReflError::InvalidInput(format!(
            "Background rate must be finite and >= 0, got {}.",
            noise.background_rate
        )));
    }

    let flux = flux_profile.scaled_on(q, c);

    // Background always adds to the signal; a negative draw contributes nothing.
    let background = Normal::new(1.0, 0.5)
        .map_err(|e| ReflError::InvalidInput(format!("Background distribution error: {e}")))?;
    let signal: Vec<f64> = reflectivity
        .iter()
        .map(|&r| r + (background.sample(rng) * noise.background_rate).max(0.0))
        .collect();

    let mut measured = Vec::with_capacity(q.len());
    let mut uncertainty = Vec::with_capacity(q.len());
    for (i, (&r, &f)) in signal.iter().zip(&flux).enumerate() {
        let measured_flux = r * f;
        if !(measured_flux.is_finite() && measured_flux > 0.0) {
            return Err(ReflError::NonPositiveReflectance {
                index: i,
                q: q[i],
                reflectance: r,
                flux: f,
            });
        }
        let width = 1.0 / (c * measured_flux.sqrt());
        let dist = Normal::new(r, width)
            .map_err(|e| ReflError::InvalidInput(format!("Noise distribution error at point {i}: {e}")))?;
        measured.push(dist.sample(rng));
        uncertainty.push(width);
    }

    Ok(NoisyData {
        observations: Observations {
            q: q.to_vec(),
            reflectivity: measured,
            uncertainty,
        },
        flux,
        signal,
    })
}
