//! Load-once cells for expensive backends.
//!
//! A [`LazyBackend`] is built at process start and shared by reference; the
//! wrapped model is loaded by the first caller and reused by everyone after.
//! A failed load is remembered, so later calls fail the same way instead of
//! loading again.

use std::fmt;
use std::path::Path;

use once_cell::sync::OnceCell;

use crate::error::{Error, Result};
use crate::traits::{Captioner, ImageSynthesizer, TextGenerator};
use crate::types::{GenerationParams, PromptBundle, SynthesisParams};

type Loader<T> = Box<dyn Fn() -> anyhow::Result<Box<T>> + Send + Sync>;

pub struct LazyBackend<T: ?Sized> {
    name: String,
    loader: Loader<T>,
    cell: OnceCell<std::result::Result<Box<T>, String>>,
}

impl<T: ?Sized> LazyBackend<T> {
    pub fn new<F>(name: impl Into<String>, loader: F) -> Self
    where
        F: Fn() -> anyhow::Result<Box<T>> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            loader: Box::new(loader),
            cell: OnceCell::new(),
        }
    }

    /// Wraps an already loaded backend.
    pub fn ready(name: impl Into<String>, backend: Box<T>) -> Self {
        let name = name.into();
        let backend_name = name.clone();
        Self {
            name,
            loader: Box::new(move || anyhow::bail!("{backend_name} was constructed preloaded")),
            cell: OnceCell::with_value(Ok(backend)),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_loaded(&self) -> bool {
        matches!(self.cell.get(), Some(Ok(_)))
    }

    /// Returns the backend, loading it on first use.
    pub fn get(&self) -> Result<&T> {
        let slot = self.cell.get_or_init(|| {
            tracing::info!(backend = %self.name, "loading backend");
            let started = std::time::Instant::now();
            let loaded = (self.loader)().map_err(|e| format!("{e:#}"));
            match &loaded {
                Ok(_) => tracing::info!(
                    backend = %self.name,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "backend ready"
                ),
                Err(reason) => {
                    tracing::error!(backend = %self.name, %reason, "backend failed to load")
                }
            }
            loaded
        });
        match slot {
            Ok(backend) => Ok(backend.as_ref()),
            Err(reason) => Err(Error::Initialization {
                backend: self.name.clone(),
                reason: reason.clone(),
            }),
        }
    }
}

impl<T: ?Sized> fmt::Debug for LazyBackend<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LazyBackend")
            .field("name", &self.name)
            .field("loaded", &self.is_loaded())
            .finish()
    }
}

impl<T: Captioner + ?Sized> Captioner for LazyBackend<T> {
    fn caption(&self, image_path: &Path) -> anyhow::Result<String> {
        self.get()?.caption(image_path)
    }
}

impl<T: TextGenerator + ?Sized> TextGenerator for LazyBackend<T> {
    fn generate(&self, prompt: &PromptBundle, params: &GenerationParams) -> anyhow::Result<String> {
        self.get()?.generate(prompt, params)
    }
}

impl<T: ImageSynthesizer + ?Sized> ImageSynthesizer for LazyBackend<T> {
    fn synthesize(&self, prompt: &str, params: &SynthesisParams) -> anyhow::Result<Vec<u8>> {
        self.get()?.synthesize(prompt, params)
    }
}
