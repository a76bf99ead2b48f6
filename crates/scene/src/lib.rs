pub mod components;
pub mod graph;
pub mod placement;

pub use graph::*;
pub use placement::*;
