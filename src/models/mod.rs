//! Reflectivity forward models.
//!
//! Models are implemented as pure functions of an explicit parameter vector so
//! that fitting and sensitivity code can stay generic.

pub mod abeles;
pub mod model;
pub mod samples;

pub use model::*;
pub use samples::*;
