//! Error type for assembling a store from config.

use kokoro_rs_config::ConfigError;
use kokoro_rs_memory::MemoryError;
use thiserror::Error;

/// Errors returned while opening a configured store.
#[derive(Debug, Error)]
pub enum KokoroError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Memory(#[from] MemoryError),
    /// Semantic recall was configured but no embedder was supplied.
    #[error("semantic recall requires an embedder; use open_store_with_embedder")]
    EmbedderRequired,
}
