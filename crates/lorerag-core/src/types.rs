//! Domain types shared by the loader, the index and the pipelines.

use serde::{Deserialize, Serialize};

pub type ChunkId = String;

/// Dense embedding; one provider yields one dimensionality for its lifetime.
pub type EmbeddingVector = Vec<f32>;

/// A raw lore document as read from the corpus directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoreDocument {
    /// File name relative to the corpus directory.
    pub name: String,
    pub text: String,
}

/// A bounded span of words taken from one lore document.
///
/// - `id`: `chunk_{n}`, where `n` counts chunks across one corpus load
/// - `text`: the words of the chunk joined by single spaces
/// - `source_document`: file name the chunk was cut from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoreChunk {
    pub id: ChunkId,
    pub text: String,
    pub source_document: String,
}

impl LoreChunk {
    pub fn id_for(seq: usize) -> ChunkId {
        format!("chunk_{seq}")
    }
}

/// One retrieved chunk. Smaller `distance` means more relevant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievalHit {
    pub id: ChunkId,
    pub text: String,
    pub distance: f32,
}

/// Hits in ascending distance order.
pub type RetrievalResult = Vec<RetrievalHit>;

/// The two instructions handed to a text generator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptBundle {
    pub system_instruction: String,
    pub user_instruction: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GenerationParams {
    pub max_new_tokens: usize,
    pub temperature: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SynthesisParams {
    pub steps: usize,
    pub guidance_scale: f64,
}

impl Default for SynthesisParams {
    fn default() -> Self {
        Self {
            steps: 30,
            guidance_scale: 7.5,
        }
    }
}

/// Output of the image → story pipeline.
///
/// All four fields are required; see [`StoryResult::from_value`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoryResult {
    pub image_path: String,
    pub caption: String,
    pub lore_chunks: Vec<String>,
    pub story: String,
}

impl StoryResult {
    /// Parses a story result coming from another component. A missing or
    /// mistyped field is an integration fault, reported as a validation error.
    pub fn from_value(value: serde_json::Value) -> crate::Result<Self> {
        serde_json::from_value(value)
            .map_err(|e| crate::Error::Validation(format!("malformed story result: {e}")))
    }
}

/// Output of the text → image pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrichedImage {
    pub user_prompt: String,
    pub enriched_prompt: String,
    pub image_path: String,
}
