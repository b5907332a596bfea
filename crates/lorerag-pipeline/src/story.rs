use std::path::Path;
use std::sync::Arc;

use lorerag_core::context::format_lore_context;
use lorerag_core::error::{Error, Result};
use lorerag_core::traits::{Captioner, TextGenerator};
use lorerag_core::types::{GenerationParams, StoryResult};

use crate::prompts::story_prompt;
use crate::retriever::LoreRetriever;

pub const DEFAULT_TOP_K: usize = 3;
pub const DEFAULT_PARAMS: GenerationParams = GenerationParams {
    max_new_tokens: 400,
    temperature: 0.8,
};

/// Captions an image, retrieves lore matching the caption and writes a short
/// story from both. Any failing step aborts the call.
pub struct StoryComposer {
    captioner: Arc<dyn Captioner>,
    retriever: LoreRetriever,
    generator: Arc<dyn TextGenerator>,
    params: GenerationParams,
    top_k: usize,
}

impl StoryComposer {
    pub fn new(
        captioner: Arc<dyn Captioner>,
        retriever: LoreRetriever,
        generator: Arc<dyn TextGenerator>,
    ) -> Self {
        Self {
            captioner,
            retriever,
            generator,
            params: DEFAULT_PARAMS,
            top_k: DEFAULT_TOP_K,
        }
    }

    pub fn with_params(mut self, params: GenerationParams) -> Self {
        self.params = params;
        self
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    pub fn compose(&self, image_path: &Path) -> Result<StoryResult> {
        let caption = self
            .captioner
            .caption(image_path)
            .map_err(|e| Error::backend("caption", e))?;
        let caption = caption.trim().to_string();
        tracing::info!(image = %image_path.display(), %caption, "image captioned");

        let hits = self.retriever.retrieve(&caption, self.top_k)?;
        let context = format_lore_context(&hits);
        let prompt = story_prompt(&caption, &context);
        tracing::debug!(
            hits = hits.len(),
            user_chars = prompt.user_instruction.len(),
            "composing story"
        );

        let story = self
            .generator
            .generate(&prompt, &self.params)
            .map_err(|e| Error::backend("generate", e))?;
        let story = story.trim().to_string();
        tracing::info!(words = story.split_whitespace().count(), "story composed");

        Ok(StoryResult {
            image_path: image_path.display().to_string(),
            caption,
            lore_chunks: hits.into_iter().map(|h| h.text).collect(),
            story,
        })
    }
}
