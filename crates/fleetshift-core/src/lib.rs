pub mod config;
pub mod types;
pub mod validate;

pub use config::FleetshiftConfig;
pub use types::*;
pub use validate::{ImageId, ValidationError};
