//! Embedding generation for recipe similarity detection
//!
//! The engine treats the embedder as an external collaborator behind the
//! `EmbeddingService` trait; the remote implementation calls an HTTP
//! embeddings API. Vectors must keep a fixed dimensionality per model so
//! similarity scans stay meaningful.

pub mod remote;

pub use remote::RemoteEmbeddingService;

use crate::error::Result;
use async_trait::async_trait;

/// Embedding service contract
#[async_trait]
pub trait EmbeddingService: Send + Sync {
    /// Generate an embedding for a single text
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Fixed embedding dimensionality for this model
    fn dimensions(&self) -> usize;

    /// Identifier of the embedding model in use
    fn model_name(&self) -> &str;
}
