use std::path::Path;
use std::sync::Arc;

use lorerag_core::error::{Error, Result};
use lorerag_core::traits::ImageSynthesizer;
use lorerag_core::types::{EnrichedImage, SynthesisParams};

use crate::artifacts::write_image;
use crate::enrich::PromptEnricher;

/// Scene description in, lore-enriched image on disk out.
pub struct ImaginePipeline {
    enricher: PromptEnricher,
    synthesizer: Arc<dyn ImageSynthesizer>,
    params: SynthesisParams,
}

impl ImaginePipeline {
    pub fn new(enricher: PromptEnricher, synthesizer: Arc<dyn ImageSynthesizer>) -> Self {
        Self {
            enricher,
            synthesizer,
            params: SynthesisParams::default(),
        }
    }

    pub fn with_params(mut self, params: SynthesisParams) -> Self {
        self.params = params;
        self
    }

    pub fn run(&self, user_prompt: &str, output_dir: &Path) -> Result<EnrichedImage> {
        if user_prompt.trim().is_empty() {
            return Err(Error::Validation("image prompt is empty".into()));
        }
        let enriched = self.enricher.enrich(user_prompt)?;
        let png = self
            .synthesizer
            .synthesize(&enriched, &self.params)
            .map_err(|e| Error::backend("synthesize", e))?;
        let path = write_image(&png, output_dir)?;
        Ok(EnrichedImage {
            user_prompt: user_prompt.to_string(),
            enriched_prompt: enriched,
            image_path: path.display().to_string(),
        })
    }
}
