pub mod asset;
pub mod fixtures;
pub mod gltf_import;
pub mod inspect;
pub mod obj_import;
pub mod parser;

pub use asset::*;
pub use inspect::{ProbeError, RawStructureProbe, StructuralProbe, StructureReport};
pub use parser::{ImporterParser, ParseError, ParseFuture, PrimaryParser};
