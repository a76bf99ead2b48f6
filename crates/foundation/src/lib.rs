//! Geodesy, projection and vector primitives shared by the scene and overlay crates.

pub mod bounds;
pub mod math;

pub use bounds::*;
