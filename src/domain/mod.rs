//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - the layered structure description (`Structure`, `Layer`, `Parameter`, `Bounds`)
//! - instrument and simulation settings (`Instrument`, `SimulationConfig`)
//! - noisy synthetic measurements (`Observations`)

pub mod types;

pub use types::*;
