use std::path::Path;
use std::sync::Arc;

use serde::Serialize;

use lorerag_core::corpus::LoreCorpusLoader;
use lorerag_core::error::Result;
use lorerag_embed::EmbeddingProvider;
use lorerag_index::LoreIndex;

use crate::retriever::LoreRetriever;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BuildReport {
    pub documents: usize,
    pub chunks: usize,
    pub dim: Option<usize>,
    pub generation: u64,
}

/// Owns the lore index and knows how to (re)build it from a corpus directory.
#[derive(Debug)]
pub struct LoreLibrary {
    loader: LoreCorpusLoader,
    embedder: Arc<EmbeddingProvider>,
    index: Arc<LoreIndex>,
}

impl LoreLibrary {
    pub fn new(
        loader: LoreCorpusLoader,
        embedder: Arc<EmbeddingProvider>,
        index: Arc<LoreIndex>,
    ) -> Self {
        Self {
            loader,
            embedder,
            index,
        }
    }

    pub fn index(&self) -> &Arc<LoreIndex> {
        &self.index
    }

    pub fn retriever(&self) -> LoreRetriever {
        LoreRetriever::new(self.embedder.clone(), self.index.clone())
    }

    /// Loads, chunks and embeds every document in `lore_dir`, then swaps the
    /// result into the index. On failure the previous index stays in place.
    pub fn build(&self, lore_dir: &Path) -> Result<BuildReport> {
        let started = std::time::Instant::now();
        let documents = self.loader.load_texts(lore_dir)?;
        let chunks = self.loader.chunk_documents(&documents);
        tracing::info!(
            dir = %lore_dir.display(),
            documents = documents.len(),
            chunks = chunks.len(),
            "loaded lore corpus"
        );

        let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
        let vectors = self.embedder.embed_batch(&texts)?;
        let chunk_count = chunks.len();
        self.index.rebuild(chunks, vectors)?;

        let report = BuildReport {
            documents: documents.len(),
            chunks: chunk_count,
            dim: self.index.dim(),
            generation: self.index.generation(),
        };
        tracing::info!(
            chunks = report.chunks,
            dim = ?report.dim,
            generation = report.generation,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "lore index built"
        );
        Ok(report)
    }
}
