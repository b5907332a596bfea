use std::sync::Arc;

use lorerag_core::error::Result;
use lorerag_core::types::RetrievalResult;
use lorerag_embed::EmbeddingProvider;
use lorerag_index::LoreIndex;

/// Embeds a free-text query and looks it up in the lore index.
#[derive(Debug, Clone)]
pub struct LoreRetriever {
    embedder: Arc<EmbeddingProvider>,
    index: Arc<LoreIndex>,
}

impl LoreRetriever {
    pub fn new(embedder: Arc<EmbeddingProvider>, index: Arc<LoreIndex>) -> Self {
        Self { embedder, index }
    }

    pub fn index(&self) -> &LoreIndex {
        &self.index
    }

    pub fn retrieve(&self, query: &str, top_k: usize) -> Result<RetrievalResult> {
        if top_k == 0 || self.index.is_empty() {
            return Ok(Vec::new());
        }
        let vector = self.embedder.embed_one(query)?;
        let hits = self.index.retrieve(&vector, top_k)?;
        tracing::debug!(
            top_k,
            hits = hits.len(),
            query_chars = query.len(),
            "retrieved lore"
        );
        Ok(hits)
    }
}
