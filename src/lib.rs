//! `refl-fisher` library crate.
//!
//! The binary (`rfi`) is a thin wrapper around this library so that:
//!
//! - core logic is testable without spawning processes
//! - the pipeline stages (noise, bounds, fit, sensitivities, Fisher) are reusable
//! - presentation (`report`, `plot`) stays separate from computation

pub mod app;
pub mod cli;
pub mod data;
pub mod domain;
pub mod error;
pub mod fisher;
pub mod fit;
pub mod logging;
pub mod math;
pub mod models;
pub mod plot;
pub mod report;
