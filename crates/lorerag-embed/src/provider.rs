//! The embedding seam used by the index build and by query-time retrieval.

use lorerag_core::config::ModelSettings;
use lorerag_core::error::{Error, Result};
use lorerag_core::lazy::LazyBackend;
use lorerag_core::traits::Embedder;
use lorerag_core::types::EmbeddingVector;

use crate::fake::FakeEmbedder;
use crate::minilm::MiniLmEmbedder;
use crate::model_dir::resolve_model_dir;

/// Wraps an [`Embedder`] that is loaded on first use, at most once, and
/// checks every answer for cardinality and dimensionality.
pub struct EmbeddingProvider {
    backend: LazyBackend<dyn Embedder>,
}

impl EmbeddingProvider {
    pub fn new(backend: LazyBackend<dyn Embedder>) -> Self {
        Self { backend }
    }

    /// A provider around an already constructed embedder.
    pub fn ready(name: &str, embedder: Box<dyn Embedder>) -> Self {
        Self::new(LazyBackend::ready(name, embedder))
    }

    /// A lazily loaded provider configured from `[models]`.
    ///
    /// `APP_USE_FAKE_EMBEDDINGS=1` (or `models.use_fake_embeddings`) selects the
    /// deterministic [`FakeEmbedder`].
    pub fn from_settings(settings: &ModelSettings) -> Self {
        let settings = settings.clone();
        if use_fake_embeddings(&settings) {
            let dim = settings.fake_dim;
            return Self::new(LazyBackend::new("fake-embedder", move || {
                tracing::info!(dim, "using FakeEmbedder");
                Ok(Box::new(FakeEmbedder::new(dim)) as Box<dyn Embedder>)
            }));
        }
        Self::new(LazyBackend::new("sentence-embedder", move || {
            let dir = resolve_model_dir(&settings.embedding_dir)?;
            let embedder = MiniLmEmbedder::load(&dir, settings.embed_batch_size)?;
            Ok(Box::new(embedder) as Box<dyn Embedder>)
        }))
    }

    pub fn is_loaded(&self) -> bool {
        self.backend.is_loaded()
    }

    pub fn dim(&self) -> Result<usize> {
        Ok(self.backend.get()?.dim())
    }

    /// One vector per input text, in order. An empty batch never loads the model.
    pub fn embed_batch(&self, texts: &[String]) -> Result<Vec<EmbeddingVector>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        let embedder = self.backend.get()?;
        let vectors = embedder
            .embed_batch(texts)
            .map_err(|e| Error::backend("embed", e))?;
        if vectors.len() != texts.len() {
            return Err(Error::Validation(format!(
                "embedder returned {} vectors for {} texts",
                vectors.len(),
                texts.len()
            )));
        }
        let dim = embedder.dim();
        if let Some((i, v)) = vectors.iter().enumerate().find(|(_, v)| v.len() != dim) {
            return Err(Error::Validation(format!(
                "vector {i} has dimension {}, expected {dim}",
                v.len()
            )));
        }
        Ok(vectors)
    }

    pub fn embed_one(&self, text: &str) -> Result<EmbeddingVector> {
        let mut vectors = self.embed_batch(&[text.to_string()])?;
        vectors
            .pop()
            .ok_or_else(|| Error::Validation("embedder returned no vector".into()))
    }
}

impl std::fmt::Debug for EmbeddingProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmbeddingProvider")
            .field("backend", &self.backend)
            .finish()
    }
}

fn use_fake_embeddings(settings: &ModelSettings) -> bool {
    settings.use_fake_embeddings
        || std::env::var("APP_USE_FAKE_EMBEDDINGS")
            .ok()
            .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
            .unwrap_or(false)
}
