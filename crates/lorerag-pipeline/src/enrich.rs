use std::sync::Arc;

use lorerag_core::context::format_lore_context;
use lorerag_core::error::{Error, Result};
use lorerag_core::traits::TextGenerator;
use lorerag_core::types::GenerationParams;

use crate::prompts::image_prompt;
use crate::retriever::LoreRetriever;

pub const DEFAULT_TOP_K: usize = 3;
pub const DEFAULT_PARAMS: GenerationParams = GenerationParams {
    max_new_tokens: 120,
    temperature: 0.7,
};

/// Turns a short scene description into a single-line diffusion prompt
/// grounded in retrieved lore.
pub struct PromptEnricher {
    retriever: LoreRetriever,
    generator: Arc<dyn TextGenerator>,
    params: GenerationParams,
    top_k: usize,
}

impl PromptEnricher {
    pub fn new(retriever: LoreRetriever, generator: Arc<dyn TextGenerator>) -> Self {
        Self {
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

    pub fn enrich(&self, user_prompt: &str) -> Result<String> {
        let hits = self.retriever.retrieve(user_prompt, self.top_k)?;
        let context = format_lore_context(&hits);
        let prompt = image_prompt(user_prompt, &context);
        tracing::debug!(
            hits = hits.len(),
            context_chars = context.len(),
            user_chars = prompt.user_instruction.len(),
            "enriching image prompt"
        );
        let raw = self
            .generator
            .generate(&prompt, &self.params)
            .map_err(|e| Error::backend("generate", e))?;
        let enriched = single_line(&raw);
        tracing::info!(chars = enriched.len(), "image prompt enriched");
        Ok(enriched)
    }
}

/// Replaces every line break (`\r\n`, `\r` or `\n`) with a space and trims.
pub fn single_line(text: &str) -> String {
    text.replace("\r\n", " ")
        .replace(['\r', '\n'], " ")
        .trim()
        .to_string()
}
