pub mod model;
pub mod parser;

pub use model::{DeclaredFile, ParsedConfig};
pub use parser::{ConfigParser, IgnitionParser};
