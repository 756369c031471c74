//! Configuration module
//!
//! Loads the `[server]`, `[security]`, `[identity]` and `[logging]` sections
//! from TOML files and environment variables, validating rules on load.

pub mod loader;
pub mod types;

pub use loader::{load_config, load_config_from_str};
pub use types::*;
