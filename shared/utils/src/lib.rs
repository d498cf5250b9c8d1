pub mod config;
pub mod logging;
pub mod error;
pub mod validation;
pub mod reference;
pub mod bom;

pub use self::config::*;
pub use logging::*;
pub use error::*;
pub use validation::*;
pub use reference::*;
pub use bom::*;
