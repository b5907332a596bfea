use anyhow::{anyhow, bail, Context, Result};
use parking_lot::Mutex;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};

use candle_core::{DType, Device, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::generation::LogitsProcessor;
use candle_transformers::models::phi;
use tokenizers::Tokenizer;

use lorerag_core::traits::TextGenerator;
use lorerag_core::types::{GenerationParams, PromptBundle};
use lorerag_embed::device::select_device;
use lorerag_embed::model_dir::require_file;

use crate::weights::safetensors_in;

const EOS_TOKEN: &str = "<|endoftext|>";
const ASSISTANT_MARKER: &str = "Assistant:";
const NEXT_TURN_MARKER: &str = "\nUser:";

/// Plain completion-style prompt understood by base causal LMs.
pub fn format_prompt(prompt: &PromptBundle) -> String {
    format!(
        "{}\n\nUser: {}\n{ASSISTANT_MARKER}",
        prompt.system_instruction.trim(),
        prompt.user_instruction.trim()
    )
}

/// Cuts a completion where the model starts inventing the next user turn.
pub fn end_of_turn(completion: &str) -> &str {
    let end = completion
        .find(NEXT_TURN_MARKER)
        .unwrap_or(completion.len());
    completion[..end].trim()
}

/// Sampled text generation with microsoft/phi-2.
pub struct PhiGenerator {
    model: Mutex<phi::Model>,
    tokenizer: Tokenizer,
    device: Device,
    eos_token: u32,
    max_context: usize,
    seed: u64,
    calls: AtomicU64,
}

impl PhiGenerator {
    pub fn load(model_dir: &Path, seed: u64) -> Result<Self> {
        let device = select_device();
        tracing::info!(dir = %model_dir.display(), "loading language model");
        let tokenizer_path = require_file(model_dir, "tokenizer.json")?;
        let tokenizer = Tokenizer::from_file(&tokenizer_path)
            .map_err(|e| anyhow!("loading tokenizer {}: {e}", tokenizer_path.display()))?;
        let eos_token = tokenizer
            .token_to_id(EOS_TOKEN)
            .ok_or_else(|| anyhow!("tokenizer has no {EOS_TOKEN} token"))?;

        let config_path = require_file(model_dir, "config.json")?;
        let raw_config = std::fs::read_to_string(&config_path)
            .with_context(|| format!("reading {}", config_path.display()))?;
        let config: phi::Config = serde_json::from_str(&raw_config)?;
        let meta: serde_json::Value = serde_json::from_str(&raw_config)?;
        let max_context = meta["max_position_embeddings"].as_u64().unwrap_or(2048) as usize;

        let weights = safetensors_in(model_dir)?;
        // SAFETY: the weights files are not modified while mapped.
        let vb = unsafe { VarBuilder::from_mmaped_safetensors(&weights, DType::F32, &device)? };
        let model = phi::Model::new(&config, vb)?;
        tracing::info!(shards = weights.len(), max_context, "language model loaded");
        Ok(Self {
            model: Mutex::new(model),
            tokenizer,
            device,
            eos_token,
            max_context,
            seed,
            calls: AtomicU64::new(0),
        })
    }
}

impl TextGenerator for PhiGenerator {
    fn generate(&self, prompt: &PromptBundle, params: &GenerationParams) -> Result<String> {
        let text = format_prompt(prompt);
        let encoding = self
            .tokenizer
            .encode(text, true)
            .map_err(|e| anyhow!("tokenizing prompt: {e}"))?;
        let mut tokens = encoding.get_ids().to_vec();
        let prompt_len = tokens.len();
        if prompt_len + params.max_new_tokens > self.max_context {
            bail!(
                "prompt of {prompt_len} tokens plus {} new tokens exceeds the {} token context",
                params.max_new_tokens,
                self.max_context
            );
        }

        let call = self.calls.fetch_add(1, Ordering::Relaxed);
        let seed = self.seed.wrapping_add(call);
        let temperature = (params.temperature > 0.0).then_some(params.temperature);
        let mut logits_processor = LogitsProcessor::new(seed, temperature, None);

        let started = std::time::Instant::now();
        let mut model = self.model.lock();
        model.clear_kv_cache();
        for step in 0..params.max_new_tokens {
            let context_size = if step > 0 { 1 } else { tokens.len() };
            let context = &tokens[tokens.len().saturating_sub(context_size)..];
            let input = Tensor::new(context, &self.device)?.unsqueeze(0)?;
            let logits = model.forward(&input)?.squeeze(0)?.to_dtype(DType::F32)?;
            let next = logits_processor.sample(&logits)?;
            if next == self.eos_token {
                break;
            }
            tokens.push(next);
        }
        model.clear_kv_cache();
        drop(model);

        let generated = tokens.len() - prompt_len;
        tracing::debug!(
            prompt_len,
            generated,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "generation finished"
        );
        let decoded = self
            .tokenizer
            .decode(&tokens[prompt_len..], true)
            .map_err(|e| anyhow!("decoding completion: {e}"))?;
        Ok(end_of_turn(&decoded).to_string())
    }
}
