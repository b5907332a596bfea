//! Wiring from [`Settings`] to ready-to-run pipelines.
//!
//! Nothing heavy happens at construction: every model sits in a
//! [`LazyBackend`] and loads the first time a command needs it.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use lorerag_core::config::{expand_path, Settings};
use lorerag_core::corpus::LoreCorpusLoader;
use lorerag_core::error::Result;
use lorerag_core::lazy::LazyBackend;
use lorerag_core::traits::{Captioner, ImageSynthesizer, TextGenerator};
use lorerag_core::types::{GenerationParams, SynthesisParams};
use lorerag_embed::model_dir::resolve_model_dir;
use lorerag_embed::EmbeddingProvider;
use lorerag_index::LoreIndex;
use lorerag_models::{BlipCaptioner, PhiGenerator, StableDiffusionSynthesizer};
use lorerag_pipeline::{ImaginePipeline, LoreLibrary, PromptEnricher, StoryComposer};

pub struct Runtime {
    settings: Settings,
    library: LoreLibrary,
    generator: Arc<dyn TextGenerator>,
    captioner: Arc<dyn Captioner>,
    synthesizer: Arc<dyn ImageSynthesizer>,
}

impl Runtime {
    pub fn from_settings(settings: Settings) -> Result<Self> {
        let loader = LoreCorpusLoader::new(settings.lore.max_words)?;
        let embedder = Arc::new(EmbeddingProvider::from_settings(&settings.models));
        let index = Arc::new(LoreIndex::new(settings.retrieval.metric));
        let library = LoreLibrary::new(loader, embedder, index);

        let llm_dir = settings.models.llm_dir.clone();
        let seed = settings.generation.seed;
        let generator: LazyBackend<dyn TextGenerator> = LazyBackend::new("phi-2", move || {
            let dir = resolve_model_dir(&llm_dir)?;
            let generator = PhiGenerator::load(&dir, seed)?;
            Ok(Box::new(generator) as Box<dyn TextGenerator>)
        });

        let caption_dir = settings.models.caption_dir.clone();
        let caption_tokens = settings.generation.caption_max_new_tokens;
        let captioner: LazyBackend<dyn Captioner> = LazyBackend::new("blip", move || {
            let dir = resolve_model_dir(&caption_dir)?;
            let captioner = BlipCaptioner::load(&dir, caption_tokens)?;
            Ok(Box::new(captioner) as Box<dyn Captioner>)
        });

        let diffusion_dir = settings.models.diffusion_dir.clone();
        let (height, width) = (settings.diffusion.height, settings.diffusion.width);
        let synthesizer: LazyBackend<dyn ImageSynthesizer> =
            LazyBackend::new("stable-diffusion", move || {
                let dir = resolve_model_dir(&diffusion_dir)?;
                let synthesizer = StableDiffusionSynthesizer::load(&dir, height, width)?;
                Ok(Box::new(synthesizer) as Box<dyn ImageSynthesizer>)
            });

        Ok(Self::with_backends(
            settings,
            library,
            Arc::new(generator),
            Arc::new(captioner),
            Arc::new(synthesizer),
        ))
    }

    /// Assembles a runtime around caller-provided backends.
    pub fn with_backends(
        settings: Settings,
        library: LoreLibrary,
        generator: Arc<dyn TextGenerator>,
        captioner: Arc<dyn Captioner>,
        synthesizer: Arc<dyn ImageSynthesizer>,
    ) -> Self {
        Self {
            settings,
            library,
            generator,
            captioner,
            synthesizer,
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn library(&self) -> &LoreLibrary {
        &self.library
    }

    pub fn lore_dir(&self, requested: Option<&Path>) -> PathBuf {
        requested
            .map(Path::to_path_buf)
            .unwrap_or_else(|| expand_path(&self.settings.lore.dir))
    }

    pub fn images_dir(&self, requested: Option<&Path>) -> PathBuf {
        requested
            .map(Path::to_path_buf)
            .unwrap_or_else(|| expand_path(&self.settings.output.images_dir))
    }

    pub fn stories_dir(&self, requested: Option<&Path>) -> PathBuf {
        requested
            .map(Path::to_path_buf)
            .unwrap_or_else(|| expand_path(&self.settings.output.stories_dir))
    }

    pub fn top_k(&self, requested: Option<usize>) -> usize {
        requested.unwrap_or(self.settings.retrieval.top_k)
    }

    pub fn enricher(&self, top_k: usize) -> PromptEnricher {
        let g = &self.settings.generation;
        PromptEnricher::new(self.library.retriever(), self.generator.clone())
            .with_top_k(top_k)
            .with_params(GenerationParams {
                max_new_tokens: g.enrich_max_new_tokens,
                temperature: g.enrich_temperature,
            })
    }

    pub fn composer(&self, top_k: usize) -> StoryComposer {
        let g = &self.settings.generation;
        StoryComposer::new(
            self.captioner.clone(),
            self.library.retriever(),
            self.generator.clone(),
        )
        .with_top_k(top_k)
        .with_params(GenerationParams {
            max_new_tokens: g.story_max_new_tokens,
            temperature: g.story_temperature,
        })
    }

    pub fn imagine(&self, top_k: usize) -> ImaginePipeline {
        let d = &self.settings.diffusion;
        ImaginePipeline::new(self.enricher(top_k), self.synthesizer.clone())
            .with_params(SynthesisParams {
                steps: d.steps,
                guidance_scale: d.guidance_scale,
            })
    }
}
