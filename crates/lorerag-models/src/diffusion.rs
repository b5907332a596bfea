//! Text-to-image with Stable Diffusion v1.5.
//!
//! Expects the diffusers layout: `text_encoder/`, `unet/` and `vae/`
//! safetensors plus a CLIP `tokenizer.json` (in `tokenizer/` or at the root).

use anyhow::{anyhow, ensure, Result};
use std::path::{Path, PathBuf};

use candle_core::{DType, Device, Module, Tensor};
use candle_transformers::models::stable_diffusion::{
    self, clip::ClipTextTransformer, unet_2d::UNet2DConditionModel, vae::AutoEncoderKL,
    StableDiffusionConfig,
};
use tokenizers::Tokenizer;

use lorerag_core::traits::ImageSynthesizer;
use lorerag_core::types::SynthesisParams;
use lorerag_embed::device::select_device;
use lorerag_embed::model_dir::require_file;

use crate::imaging::png_from_tensor;

const VAE_SCALE: f64 = 0.18215;
const LATENT_CHANNELS: usize = 4;
const DIFFUSERS_WEIGHTS: &str = "diffusion_pytorch_model.safetensors";

pub struct StableDiffusionSynthesizer {
    config: StableDiffusionConfig,
    tokenizer: Tokenizer,
    text_model: ClipTextTransformer,
    unet: UNet2DConditionModel,
    vae: AutoEncoderKL,
    pad_id: u32,
    device: Device,
}

fn tokenizer_path(model_dir: &Path) -> Result<PathBuf> {
    let nested = model_dir.join("tokenizer").join("tokenizer.json");
    if nested.is_file() {
        return Ok(nested);
    }
    Ok(require_file(model_dir, "tokenizer.json")?)
}

impl StableDiffusionSynthesizer {
    /// Loads all three networks. `height` and `width` must be multiples of 8.
    pub fn load(model_dir: &Path, height: usize, width: usize) -> Result<Self> {
        ensure!(
            height % 8 == 0 && width % 8 == 0,
            "image size {width}x{height} is not a multiple of 8"
        );
        let device = select_device();
        tracing::info!(dir = %model_dir.display(), height, width, "loading diffusion model");

        let config = StableDiffusionConfig::v1_5(None, Some(height), Some(width));
        let tokenizer_path = tokenizer_path(model_dir)?;
        let tokenizer = Tokenizer::from_file(&tokenizer_path)
            .map_err(|e| anyhow!("loading tokenizer {}: {e}", tokenizer_path.display()))?;
        let pad_token = config
            .clip
            .pad_with
            .clone()
            .unwrap_or_else(|| "<|endoftext|>".to_string());
        let pad_id = tokenizer
            .token_to_id(&pad_token)
            .ok_or_else(|| anyhow!("tokenizer has no {pad_token} token"))?;

        let text_weights = require_file(&model_dir.join("text_encoder"), "model.safetensors")?;
        let unet_weights = require_file(&model_dir.join("unet"), DIFFUSERS_WEIGHTS)?;
        let vae_weights = require_file(&model_dir.join("vae"), DIFFUSERS_WEIGHTS)?;

        let text_model = stable_diffusion::build_clip_transformer(
            &config.clip,
            text_weights,
            &device,
            DType::F32,
        )?;
        let unet = config.build_unet(
            unet_weights,
            &device,
            LATENT_CHANNELS,
            false,
            DType::F32,
        )?;
        let vae = config.build_vae(vae_weights, &device, DType::F32)?;
        tracing::info!("diffusion model loaded");

        Ok(Self {
            config,
            tokenizer,
            text_model,
            unet,
            vae,
            pad_id,
            device,
        })
    }

    /// Token ids padded (or truncated) to the text encoder's context.
    fn encode_prompt(&self, prompt: &str) -> Result<Tensor> {
        let encoding = self
            .tokenizer
            .encode(prompt, true)
            .map_err(|e| anyhow!("tokenizing prompt: {e}"))?;
        let ids = pad_tokens(
            encoding.get_ids(),
            self.config.clip.max_position_embeddings,
            self.pad_id,
        );
        let ids = Tensor::new(ids.as_slice(), &self.device)?.unsqueeze(0)?;
        Ok(self.text_model.forward(&ids)?)
    }
}

/// Fits `ids` to exactly `len` tokens.
pub fn pad_tokens(ids: &[u32], len: usize, pad_id: u32) -> Vec<u32> {
    let mut out: Vec<u32> = ids.iter().copied().take(len).collect();
    out.resize(len, pad_id);
    out
}

impl ImageSynthesizer for StableDiffusionSynthesizer {
    fn synthesize(&self, prompt: &str, params: &SynthesisParams) -> Result<Vec<u8>> {
        ensure!(params.steps > 0, "diffusion needs at least one step");
        let started = std::time::Instant::now();
        let guided = params.guidance_scale > 1.0;

        let text_embeddings = self.encode_prompt(prompt)?;
        let text_embeddings = if guided {
            let uncond = self.encode_prompt("")?;
            Tensor::cat(&[uncond, text_embeddings], 0)?
        } else {
            text_embeddings
        };

        let mut scheduler = self.config.build_scheduler(params.steps)?;
        let timesteps = scheduler.timesteps().to_vec();
        let latents = Tensor::randn(
            0f32,
            1f32,
            (1, LATENT_CHANNELS, self.config.height / 8, self.config.width / 8),
            &self.device,
        )?;
        let mut latents = (latents * scheduler.init_noise_sigma())?;

        for (i, &timestep) in timesteps.iter().enumerate() {
            let model_input = if guided {
                Tensor::cat(&[&latents, &latents], 0)?
            } else {
                latents.clone()
            };
            let model_input = scheduler.scale_model_input(model_input, timestep)?;
            let noise_pred = self
                .unet
                .forward(&model_input, timestep as f64, &text_embeddings)?;
            let noise_pred = if guided {
                let halves = noise_pred.chunk(2, 0)?;
                let (uncond, text) = (&halves[0], &halves[1]);
                (uncond + ((text - uncond)? * params.guidance_scale)?)?
            } else {
                noise_pred
            };
            latents = scheduler.step(&noise_pred, timestep, &latents)?;
            tracing::debug!(step = i + 1, of = timesteps.len(), "denoising");
        }

        let image = self.vae.decode(&(&latents / VAE_SCALE)?)?;
        let image = ((image / 2.)? + 0.5)?.to_device(&Device::Cpu)?;
        let image = (image.clamp(0f32, 1.)? * 255.)?
            .to_dtype(DType::U8)?
            .squeeze(0)?;
        let png = png_from_tensor(&image)?;
        tracing::info!(
            steps = params.steps,
            elapsed_ms = started.elapsed().as_millis() as u64,
            bytes = png.len(),
            "image synthesized"
        );
        Ok(png)
    }
}
