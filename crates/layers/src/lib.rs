pub mod buildings;
pub mod layer;
pub mod map;
pub mod overlay;
pub mod style;

pub use buildings::*;
pub use layer::*;
pub use map::*;
pub use overlay::*;
pub use style::*;
