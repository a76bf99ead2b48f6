pub mod config;
pub mod error;
pub mod flow;
pub mod page;
pub mod status;

pub use config::*;
pub use error::*;
pub use flow::*;
pub use page::*;
pub use status::*;
