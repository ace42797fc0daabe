//! Public SDK surface for Kokoro.
//!
//! This crate re-exports the memory engine and configuration crates and
//! wires a `KokoroConfig` into a ready-to-use `MemoryStore`.

mod error;
mod setup;

/// Re-export for convenience.
pub use kokoro_rs_config as config;
/// Re-export for convenience.
pub use kokoro_rs_memory as memory;

pub use error::KokoroError;
pub use setup::{
    DEFAULT_MEMORY_PATH, capacity_policy, consolidation_policy, open_store,
    open_store_with_embedder, quality_policy, recall_options, relation_policy,
};

#[inline]
/// Initialize logging using env_logger if the "logging" feature is enabled.
///
/// This is a no-op if the feature is not enabled. Binaries are still expected
/// to call this early in startup to ensure log output is wired up.
pub fn init_logging() {
    #[cfg(feature = "logging")]
    {
        let _ = env_logger::builder()
            .format_timestamp_millis()
            .parse_default_env()
            .try_init();
    }
}
