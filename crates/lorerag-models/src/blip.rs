use anyhow::{anyhow, Result};
use parking_lot::Mutex;
use std::path::Path;

use candle_core::{DType, Device, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::generation::LogitsProcessor;
use candle_transformers::models::blip;
use tokenizers::Tokenizer;

use lorerag_core::traits::Captioner;
use lorerag_embed::device::select_device;
use lorerag_embed::model_dir::require_file;

use crate::imaging::load_normalized;
use crate::weights::safetensors_in;

const IMAGE_SIZE: u32 = 384;
/// `[DEC]`, the decoder's start-of-caption token.
const BOS_TOKEN_ID: u32 = 30522;
const SEP_TOKEN_ID: u32 = 102;

/// Unconditional image captioning with BLIP.
///
/// Decoding is greedy, so a given image always gets the same caption.
pub struct BlipCaptioner {
    model: Mutex<blip::BlipForConditionalGeneration>,
    tokenizer: Tokenizer,
    device: Device,
    max_new_tokens: usize,
}

impl BlipCaptioner {
    pub fn load(model_dir: &Path, max_new_tokens: usize) -> Result<Self> {
        let device = select_device();
        tracing::info!(dir = %model_dir.display(), "loading captioning model");
        let tokenizer_path = require_file(model_dir, "tokenizer.json")?;
        let tokenizer = Tokenizer::from_file(&tokenizer_path)
            .map_err(|e| anyhow!("loading tokenizer {}: {e}", tokenizer_path.display()))?;
        let weights = safetensors_in(model_dir)?;
        // SAFETY: the weights files are not modified while mapped.
        let vb = unsafe { VarBuilder::from_mmaped_safetensors(&weights, DType::F32, &device)? };
        let config = blip::Config::image_captioning_large();
        let model = blip::BlipForConditionalGeneration::new(&config, vb)?;
        Ok(Self {
            model: Mutex::new(model),
            tokenizer,
            device,
            max_new_tokens: max_new_tokens.max(1),
        })
    }
}

impl Captioner for BlipCaptioner {
    fn caption(&self, image_path: &Path) -> Result<String> {
        let image = load_normalized(image_path, IMAGE_SIZE, &self.device)?;
        let mut model = self.model.lock();
        model.reset_kv_cache();
        let image_embeds = image.unsqueeze(0)?.apply(model.vision_model())?;

        let mut logits_processor = LogitsProcessor::new(0, None, None);
        let mut token_ids = vec![BOS_TOKEN_ID];
        for step in 0..self.max_new_tokens {
            let context_size = if step > 0 { 1 } else { token_ids.len() };
            let start = token_ids.len().saturating_sub(context_size);
            let context = &token_ids[start..];
            let input_ids = Tensor::new(context, &self.device)?.unsqueeze(0)?;
            let logits = model.text_decoder().forward(&input_ids, &image_embeds)?;
            let logits = logits.squeeze(0)?;
            let logits = logits.get(logits.dim(0)? - 1)?;
            let token = logits_processor.sample(&logits)?;
            if token == SEP_TOKEN_ID {
                break;
            }
            token_ids.push(token);
        }
        model.reset_kv_cache();
        drop(model);

        let caption = self
            .tokenizer
            .decode(&token_ids[1..], true)
            .map_err(|e| anyhow!("decoding caption: {e}"))?;
        tracing::debug!(image = %image_path.display(), %caption, "captioned");
        Ok(caption.trim().to_string())
    }
}
