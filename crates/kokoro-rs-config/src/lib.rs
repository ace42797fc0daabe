//! Configuration models and layered config loading.
//!
//! This crate owns the Kokoro config schema, validation, and the layer
//! merging used by the SDK and the `kokoro` CLI.

mod error;
mod loader;
mod model;

/// Public error type returned by config loading and validation APIs.
pub use error::ConfigError;
/// Layered config types and loader options.
pub use loader::{ConfigLayer, ConfigLayerSource, LayeredConfig, LayeredConfigOptions};
/// Configuration schema models.
pub use model::*;
