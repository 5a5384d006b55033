//! Layered intake configuration
//!
//! Layers, lowest precedence first:
//! 1. Built-in defaults
//! 2. Host config file (TOML)
//! 3. CLI overrides

mod defaults;
mod effective;
mod merge;

pub use defaults::BuiltinDefaults;
pub use effective::{ConfigError, ConfigOrigin, ConfigSource, IntakeConfig};
pub use merge::{deep_merge, merge_layers};
