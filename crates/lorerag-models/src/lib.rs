//! lorerag-models
//!
//! Local candle implementations of the generative collaborators:
//! BLIP captioning, phi-2 text generation and Stable Diffusion v1.5.
//! Each type loads its weights from a model directory in its constructor;
//! wrap it in a `LazyBackend` to defer that cost to first use.

pub mod blip;
pub mod diffusion;
pub mod imaging;
pub mod phi;
pub mod weights;

pub use blip::BlipCaptioner;
pub use diffusion::StableDiffusionSynthesizer;
pub use phi::PhiGenerator;
