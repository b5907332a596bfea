use std::collections::HashSet;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use serde::Serialize;

use lorerag_core::config::DistanceMetric;
use lorerag_core::error::{Error, Result};
use lorerag_core::types::{EmbeddingVector, LoreChunk, RetrievalHit, RetrievalResult};

use crate::distance::distance;

struct IndexEntry {
    chunk: LoreChunk,
    vector: EmbeddingVector,
}

/// One fully built generation of the index. Never mutated once published.
#[derive(Default)]
struct Snapshot {
    entries: Vec<IndexEntry>,
    dim: Option<usize>,
    generation: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct IndexStats {
    pub len: usize,
    pub dim: Option<usize>,
    pub generation: u64,
}

/// In-memory lore store with exact nearest-neighbour retrieval.
///
/// Readers clone the current snapshot pointer, so a rebuild never shows them a
/// mix of old and new entries. Rebuilds are serialized by `writer`.
pub struct LoreIndex {
    metric: DistanceMetric,
    current: RwLock<Arc<Snapshot>>,
    writer: Mutex<()>,
}

impl Default for LoreIndex {
    fn default() -> Self {
        Self::new(DistanceMetric::default())
    }
}

impl LoreIndex {
    pub fn new(metric: DistanceMetric) -> Self {
        Self {
            metric,
            current: RwLock::new(Arc::new(Snapshot::default())),
            writer: Mutex::new(()),
        }
    }

    pub fn metric(&self) -> DistanceMetric {
        self.metric
    }

    /// Replaces the whole index. On any validation failure the previous
    /// contents stay in place.
    pub fn rebuild(&self, chunks: Vec<LoreChunk>, vectors: Vec<EmbeddingVector>) -> Result<()> {
        let _writer = self.writer.lock();
        validate(&chunks, &vectors)?;

        let dim = vectors.first().map(Vec::len);
        let generation = self.current.read().generation + 1;
        let entries: Vec<IndexEntry> = chunks
            .into_iter()
            .zip(vectors)
            .map(|(chunk, vector)| IndexEntry { chunk, vector })
            .collect();
        let len = entries.len();
        let next = Arc::new(Snapshot {
            entries,
            dim,
            generation,
        });

        *self.current.write() = next;
        tracing::info!(entries = len, ?dim, generation, "lore index rebuilt");
        Ok(())
    }

    /// Up to `top_k` entries nearest to `query`, ascending by distance; equal
    /// distances keep insertion order.
    pub fn retrieve(&self, query: &[f32], top_k: usize) -> Result<RetrievalResult> {
        let snapshot: Arc<Snapshot> = self.current.read().clone();
        if snapshot.entries.is_empty() || top_k == 0 {
            return Ok(Vec::new());
        }
        if let Some(dim) = snapshot.dim {
            if query.len() != dim {
                return Err(Error::Validation(format!(
                    "query has dimension {}, index has {dim}",
                    query.len()
                )));
            }
        }
        if query.iter().any(|x| !x.is_finite()) {
            return Err(Error::Validation(
                "query vector has non-finite values".into(),
            ));
        }

        let mut scored: Vec<(usize, f32)> = snapshot
            .entries
            .iter()
            .enumerate()
            .map(|(seq, entry)| (seq, distance(self.metric, query, &entry.vector)))
            .collect();
        scored.sort_by(|a, b| a.1.total_cmp(&b.1));
        scored.truncate(top_k);

        Ok(scored
            .into_iter()
            .map(|(seq, dist)| {
                let chunk = &snapshot.entries[seq].chunk;
                RetrievalHit {
                    id: chunk.id.clone(),
                    text: chunk.text.clone(),
                    distance: dist,
                }
            })
            .collect())
    }

    pub fn len(&self) -> usize {
        self.current.read().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn dim(&self) -> Option<usize> {
        self.current.read().dim
    }

    /// Number of successful rebuilds so far.
    pub fn generation(&self) -> u64 {
        self.current.read().generation
    }

    pub fn stats(&self) -> IndexStats {
        let snapshot = self.current.read();
        IndexStats {
            len: snapshot.entries.len(),
            dim: snapshot.dim,
            generation: snapshot.generation,
        }
    }
}

impl std::fmt::Debug for LoreIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoreIndex")
            .field("metric", &self.metric)
            .field("stats", &self.stats())
            .finish()
    }
}

fn validate(chunks: &[LoreChunk], vectors: &[EmbeddingVector]) -> Result<()> {
    if chunks.len() != vectors.len() {
        return Err(Error::Validation(format!(
            "{} chunks but {} vectors",
            chunks.len(),
            vectors.len()
        )));
    }
    if let Some(first) = vectors.first() {
        let dim = first.len();
        if dim == 0 {
            return Err(Error::Validation("vectors must not be empty".into()));
        }
        for (i, v) in vectors.iter().enumerate() {
            if v.len() != dim {
                return Err(Error::Validation(format!(
                    "vector {i} has dimension {}, expected {dim}",
                    v.len()
                )));
            }
            if v.iter().any(|x| !x.is_finite()) {
                return Err(Error::Validation(format!(
                    "vector {i} contains a non-finite value"
                )));
            }
        }
    }
    let mut seen = HashSet::with_capacity(chunks.len());
    if let Some(dup) = chunks.iter().find(|c| !seen.insert(c.id.as_str())) {
        return Err(Error::Validation(format!("duplicate chunk id {}", dup.id)));
    }
    Ok(())
}
