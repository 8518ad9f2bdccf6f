//! Abeles characteristic-matrix reflectivity.
//!
//! For a stack of slabs (ambient, interior layers, substrate) the specular
//! reflectivity at momentum transfer `Q` is `|M01 / M00|²`, where `M` is the
//! product of one 2×2 characteristic matrix per interface:
//!
//! ```text
//! k_n  = sqrt(Q²/4 - 4π (ρ_n - ρ_0) · 1e-6)
//! r_n  = (k_{n-1} - k_n) / (k_{n-1} + k_n) · exp(-2 k_{n-1} k_n σ_n²)
//! β_n  = exp(i k_{n-1} d_{n-1})   (β_1 = 1)
//! M_n  = [[β, r β], [r / β, 1 / β]]
//! ```
//!
//! Roughness uses the Névot–Croce factor. SLDs are in 1e-6 Å⁻², lengths in Å.

use num_complex::Complex64;

use crate::domain::Layer;

/// Keeps `k_n` off the branch cut for non-absorbing media.
const TINY: f64 = 1e-30;

/// Flat numeric view of one layer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Slab {
    pub sld: f64,
    pub isld: f64,
    pub thick: f64,
    pub rough: f64,
}

impl From<&Layer> for Slab {
    fn from(layer: &Layer) -> Self {
        Self {
            sld: layer.sld.value(),
            isld: layer.isld,
            thick: layer.thick.value(),
            rough: layer.rough,
        }
    }
}

/// Unsmeared `|r(Q)|²` for `slabs` (ambient first, substrate last).
///
/// `q` must be strictly positive; with fewer than two slabs there is no
/// interface and the result is 0.
pub fn abeles(q: f64, slabs: &[Slab]) -> f64 {
    let Some(ambient) = slabs.first() else {
        return 0.0;
    };
    if slabs.len() < 2 {
        return 0.0;
    }

    let q2_4 = q * q / 4.0;
    let wavevector = |slab: &Slab| {
        let rho = Complex64::new(
            (slab.sld - ambient.sld) * 1e-6,
            (slab.isld.abs() + TINY) * 1e-6,
        );
        (Complex64::new(q2_4, 0.0) - 4.0 * std::f64::consts::PI * rho).sqrt()
    };

    let one = Complex64::new(1.0, 0.0);
    let zero = Complex64::new(0.0, 0.0);
    let (mut m00, mut m01, mut m10, mut m11) = (one, zero, zero, one);

    let mut k_prev = wavevector(ambient);
    for idx in 1..slabs.len() {
        let slab = &slabs[idx];
        let k_next = wavevector(slab);

        let roughness = (-2.0 * k_prev * k_next * slab.rough * slab.rough).exp();
        let rj = (k_prev - k_next) / (k_prev + k_next) * roughness;

        let beta = if idx == 1 {
            one
        } else {
            (Complex64::i() * k_prev * slabs[idx - 1].thick).exp()
        };
        let mi00 = beta;
        let mi11 = one / beta;
        let mi10 = rj * mi00;
        let mi01 = rj * mi11;

        let p0 = m00 * mi00 + m10 * mi01;
        let p1 = m00 * mi10 + m10 * mi11;
        m00 = p0;
        m10 = p1;

        let p0 = m01 * mi00 + m11 * mi01;
        let p1 = m01 * mi10 + m11 * mi11;
        m01 = p0;
        m11 = p1;

        k_prev = k_next;
    }

    (m01.norm_sqr() / m00.norm_sqr()).min(1.0)
}

/// Quadrature nodes (in units of σ) for Gaussian resolution smearing.
const SMEAR_POINTS: usize = 17;
const SMEAR_SPAN: f64 = 3.5;

/// Convolve `kernel` with a Gaussian of constant relative width.
///
/// `dq_percent` is the FWHM as a percentage of `q`; `0` returns `kernel(q)`.
pub fn smeared(q: f64, dq_percent: f64, kernel: impl Fn(f64) -> f64) -> f64 {
    if dq_percent <= 0.0 {
        return kernel(q);
    }
    let fwhm_to_sigma = 1.0 / (2.0 * (2.0 * std::f64::consts::LN_2).sqrt());
    let sigma = q * dq_percent / 100.0 * fwhm_to_sigma;

    let mut acc = 0.0;
    let mut norm = 0.0;
    for k in 0..SMEAR_POINTS {
        let x = -SMEAR_SPAN + 2.0 * SMEAR_SPAN * k as f64 / (SMEAR_POINTS as f64 - 1.0);
        let w = (-0.5 * x * x).exp();
        let qk = q + x * sigma;
        if qk > 0.0 {
            acc += w * kernel(qk);
            norm += w;
        }
    }
    if norm > 0.0 { acc / norm } else { kernel(q) }
}
