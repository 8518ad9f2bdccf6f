//! Reporting utilities: trial and sweep tables.

pub mod format;

pub use format::*;
