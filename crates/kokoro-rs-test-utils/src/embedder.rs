use kokoro_rs_memory::{Embedder, MemoryError};

/// Embeds text as one axis per configured keyword present in it.
#[derive(Debug, Clone, Default)]
pub struct FixedEmbedder {
    keywords: Vec<String>,
}

impl FixedEmbedder {
    pub fn new<I, S>(keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            keywords: keywords.into_iter().map(Into::into).collect(),
        }
    }
}

impl Embedder for FixedEmbedder {
    fn embed(&self, text: &str) -> Result<Vec<f32>, MemoryError> {
        let lowered = text.to_lowercase();
        Ok(self
            .keywords
            .iter()
            .map(|keyword| {
                if lowered.contains(keyword.as_str()) {
                    1.0
                } else {
                    0.0
                }
            })
            .collect())
    }
}
