use anyhow::{anyhow, Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::Path;
use std::time::Instant;

use candle_core::{Device, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::models::bert::{BertModel, Config as BertConfig, DTYPE};
use tokenizers::Tokenizer;

use lorerag_core::traits::Embedder;

use crate::device::select_device;
use crate::model_dir::require_file;
use crate::pool::masked_mean_l2;
use crate::tokenize::tokenize_batch;

const SLOW_BATCH_MS: u128 = 2_000;
const PROGRESS_TEMPLATE: &str =
    "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} texts ({percent}%)";

/// Sentence embeddings from a BERT-family checkpoint
/// (`sentence-transformers/all-MiniLM-L6-v2` by default): mean pooling over
/// the last hidden state, then L2 normalization.
pub struct MiniLmEmbedder {
    model: BertModel,
    tokenizer: Tokenizer,
    device: Device,
    dim: usize,
    max_len: usize,
    pad_id: u32,
    batch_size: usize,
}

impl MiniLmEmbedder {
    /// Loads `config.json`, `tokenizer.json` and `model.safetensors`
    /// (or `pytorch_model.bin`) from `model_dir`.
    pub fn load(model_dir: &Path, batch_size: usize) -> Result<Self> {
        let device = select_device();
        tracing::info!(dir = %model_dir.display(), "loading sentence embedding model");

        let tokenizer_path = require_file(model_dir, "tokenizer.json")?;
        let tokenizer = Tokenizer::from_file(&tokenizer_path)
            .map_err(|e| anyhow!("loading tokenizer {}: {e}", tokenizer_path.display()))?;

        let config_path = require_file(model_dir, "config.json")?;
        let raw_config = std::fs::read_to_string(&config_path)
            .with_context(|| format!("reading {}", config_path.display()))?;
        let config: BertConfig = serde_json::from_str(&raw_config)?;
        let meta: serde_json::Value = serde_json::from_str(&raw_config)?;
        let dim = meta["hidden_size"]
            .as_u64()
            .ok_or_else(|| anyhow!("config.json has no hidden_size"))? as usize;
        let max_positions = meta["max_position_embeddings"].as_u64().unwrap_or(512) as usize;
        let pad_id = meta["pad_token_id"].as_u64().unwrap_or(0) as u32;

        let safetensors = model_dir.join("model.safetensors");
        let vb = if safetensors.is_file() {
            // SAFETY: the weights file is not modified while mapped.
            unsafe { VarBuilder::from_mmaped_safetensors(&[safetensors], DTYPE, &device)? }
        } else {
            let weights_path = require_file(model_dir, "pytorch_model.bin")?;
            let weights = candle_core::pickle::read_all(&weights_path)?;
            let weights_map: std::collections::HashMap<String, Tensor> =
                weights.into_iter().collect();
            VarBuilder::from_tensors(weights_map, DTYPE, &device)
        };
        let model = BertModel::load(vb, &config)?;
        tracing::info!(dim, "sentence embedding model loaded");

        Ok(Self {
            model,
            tokenizer,
            device,
            dim,
            max_len: max_positions.min(256),
            pad_id,
            batch_size: batch_size.max(1),
        })
    }

    fn embed_chunk(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let start = Instant::now();
        let batch =
            tokenize_batch(
                &self.tokenizer,
                texts,
                self.max_len,
                self.pad_id,
                &self.device,
            )?;
        let hidden = self.model.forward(
            &batch.input_ids,
            &batch.token_type_ids,
            Some(&batch.attention_mask),
        )?;
        let pooled = masked_mean_l2(&hidden, &batch.attention_mask)?;
        let rows: Vec<Vec<f32>> = pooled.to_device(&Device::Cpu)?.to_vec2()?;
        if start.elapsed().as_millis() > SLOW_BATCH_MS {
            tracing::warn!(batch = texts.len(), elapsed = ?start.elapsed(), "slow embedding batch");
        }
        Ok(rows)
    }
}

impl Embedder for MiniLmEmbedder {
    fn dim(&self) -> usize {
        self.dim
    }

    fn max_len(&self) -> usize {
        self.max_len
    }

    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let pb = if texts.len() > self.batch_size {
            let pb = ProgressBar::new(texts.len() as u64);
            if let Ok(style) = ProgressStyle::default_bar().template(PROGRESS_TEMPLATE) {
                pb.set_style(style.progress_chars("#>-"));
            }
            Some(pb)
        } else {
            None
        };
        let mut out = Vec::with_capacity(texts.len());
        for chunk in texts.chunks(self.batch_size) {
            out.extend(self.embed_chunk(chunk)?);
            if let Some(pb) = &pb {
                pb.inc(chunk.len() as u64);
            }
        }
        if let Some(pb) = pb {
            pb.finish_and_clear();
        }
        Ok(out)
    }
}
