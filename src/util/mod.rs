//! Utility types and functions for PDX assets.
//!
//! - [`Error`] / [`Result`] / [`ErrorKind`] - Error handling
//! - Math type re-exports from glam, [`Aabb`] and fixed-precision rounding

mod error;
mod math;

pub use error::*;
pub use math::*;
