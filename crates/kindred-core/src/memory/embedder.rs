//! Embedder trait for text-to-vector conversion.
//!
//! The embedding function is an external collaborator: text in, fixed-length
//! vector out. Implementations (e.g., an OpenAI-compatible HTTP endpoint)
//! live in kindred-infra.

use kindred_types::error::EmbeddingError;

/// Trait for converting text into an embedding vector.
///
/// Uses RPITIT (native async fn in traits, Rust 2024 edition).
/// Callers invoke it at most once per text; there is no retry.
pub trait Embedder: Send + Sync {
    /// Embed a single text.
    ///
    /// An empty vector is a valid outcome and means "no embedding".
    fn embed(
        &self,
        text: &str,
    ) -> impl std::future::Future<Output = Result<Vec<f32>, EmbeddingError>> + Send;

    /// The model name used for embeddings (e.g., "text-embedding-3-small").
    fn model_name(&self) -> &str;

    /// The dimensionality of the output vectors.
    fn dimension(&self) -> usize;
}
