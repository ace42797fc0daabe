//! Test helpers shared across Kokoro crates.

pub mod embedder;
pub mod memory;
pub mod records;

pub use embedder::FixedEmbedder;
pub use memory::FailingProvider;
pub use records::RecordBuilder;
