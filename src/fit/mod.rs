//! Fitting a structure to noisy data.
//!
//! Responsibilities:
//!
//! - release interior layers for fitting with default bounds
//! - bounded χ² minimisation (parallel coordinate scan, then LM polish)
//! - curvature-based standard errors at the optimum

pub mod bounds;
pub mod fitter;

pub use bounds::*;
pub use fitter::*;
