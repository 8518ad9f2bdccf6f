//! Fisher-information uncertainty estimation.
//!
//! - finite-difference sensitivities (`jacobian`)
//! - information matrix assembly and per-parameter errors (`information`)
//! - joint confidence ellipses as plain data (`ellipse`)

pub mod ellipse;
pub mod information;
pub mod jacobian;

pub use ellipse::*;
pub use information::*;
pub use jacobian::*;
