pub mod diagnostics;
pub mod frame;
pub mod task;

pub use diagnostics::*;
pub use frame::*;
pub use task::*;
