use std::path::Path;

use crate::types::{GenerationParams, PromptBundle, SynthesisParams};

/// Maps texts to fixed-dimension vectors.
pub trait Embedder: Send + Sync {
    fn dim(&self) -> usize;
    fn max_len(&self) -> usize;
    /// One vector per input, in input order.
    fn embed_batch(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>>;
}

/// Describes an image in a short sentence.
pub trait Captioner: Send + Sync {
    fn caption(&self, image_path: &Path) -> anyhow::Result<String>;
}

/// Instruction-following text generation.
pub trait TextGenerator: Send + Sync {
    fn generate(&self, prompt: &PromptBundle, params: &GenerationParams) -> anyhow::Result<String>;
}

/// Text-to-image synthesis. Returns an encoded PNG.
pub trait ImageSynthesizer: Send + Sync {
    fn synthesize(&self, prompt: &str, params: &SynthesisParams) -> anyhow::Result<Vec<u8>>;
}
