//! Terminal plots (presentation only).

pub mod ascii;

pub use ascii::*;
