pub mod fetch;
pub mod locator;

pub use fetch::*;
pub use locator::*;
