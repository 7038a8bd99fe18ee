pub mod config;
pub mod types;

pub use config::{ConfigError, SimConfig};
pub use types::*;
