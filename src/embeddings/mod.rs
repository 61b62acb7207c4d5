// Embeddings module
// Ollama integration for text embedding and answer generation

pub mod ollama;

use anyhow::Result;

pub use ollama::OllamaClient;

/// Seam between the retrieval core and the embedding service. The
/// production implementation is `OllamaClient`; tests substitute a
/// deterministic stub.
pub trait Embedder: Send + Sync {
    /// Embed a single text into a fixed-length, L2-normalized vector.
    fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Embed a batch of texts. The returned vectors correspond
    /// one-to-one, in order, with the input texts; implementations must
    /// fail rather than return a shorter or reordered sequence.
    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;
}
