// Embedding generation: the Embedder seam, the Ollama backend, the text
// builders feeding it and line-window chunking of source files

pub mod chunking;
pub mod ollama;
pub mod text;

use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

use crate::config::OllamaConfig;
use crate::{DocsError, Result};

pub use chunking::{ChunkingConfig, LineChunk, chunk_lines};
pub use ollama::OllamaClient;
pub use text::{api_embedding_text, document_embedding_text, source_embedding_text};

/// Turns text into fixed-length vectors
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Embed a single text
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Embed several texts; the output has one vector per input, in input order
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    /// Length of every vector this embedder produces
    fn dimension(&self) -> usize;

    /// Verify the backend is reachable and able to embed
    async fn health_check(&self) -> Result<()> {
        Ok(())
    }
}

/// [`Embedder`] backed by a local Ollama server
#[derive(Debug, Clone)]
pub struct OllamaEmbedder {
    client: Arc<OllamaClient>,
}

impl OllamaEmbedder {
    #[inline]
    pub fn new(config: &OllamaConfig) -> Result<Self> {
        Ok(Self::from_client(OllamaClient::new(config)?))
    }

    #[inline]
    pub fn from_client(client: OllamaClient) -> Self {
        Self {
            client: Arc::new(client),
        }
    }

    async fn run_blocking<T, F>(&self, operation: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&OllamaClient) -> anyhow::Result<T> + Send + 'static,
    {
        let client = Arc::clone(&self.client);
        tokio::task::spawn_blocking(move || operation(&client))
            .await
            .map_err(|e| DocsError::Embedding(format!("Embedding task failed: {}", e)))?
            .map_err(|e| DocsError::Embedding(format!("{:#}", e)))
    }
}

#[async_trait]
impl Embedder for OllamaEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let text = text.to_string();
        self.run_blocking(move |client| client.generate_embedding(&text))
            .await
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        debug!("Embedding batch of {} texts via Ollama", texts.len());
        let texts = texts.to_vec();
        self.run_blocking(move |client| client.generate_embeddings_batch(&texts))
            .await
    }

    #[inline]
    fn dimension(&self) -> usize {
        self.client.dimension()
    }

    async fn health_check(&self) -> Result<()> {
        self.run_blocking(|client| client.health_check()).await
    }
}
