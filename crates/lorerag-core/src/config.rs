//! Layered configuration and path helpers.
//!
//! Uses Figment to merge `config.toml` + `config.<env>.toml` + `APP_*` env vars
//! (`__` separates nested keys, e.g. `APP_RETRIEVAL__TOP_K=5`). [`Settings`]
//! gathers every section with defaults so a missing file is never fatal.

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

pub struct Config {
    figment: Figment,
    env_name: String,
    base_dir: Option<PathBuf>,
}

impl Config {
    /// Loads configuration files from the working directory.
    pub fn load() -> Result<Self> {
        Self::load_from(Path::new("."))
    }

    pub fn load_from(dir: &Path) -> Result<Self> {
        let env_name = env::var("RUST_ENV").unwrap_or_else(|_| "dev".to_string());

        let mut figment = Figment::from(Serialized::defaults(Settings::default()))
            .merge(Toml::file(dir.join("config.toml")));
        match env_name.as_str() {
            "dev" | "development" => {
                figment = figment.merge(Toml::file(dir.join("config.dev.toml")))
            }
            "prod" | "production" => {
                figment = figment.merge(Toml::file(dir.join("config.prod.toml")))
            }
            "test" | "testing" => figment = figment.merge(Toml::file(dir.join("config.test.toml"))),
            other => tracing::warn!(env = other, "unknown RUST_ENV, using base config only"),
        }
        figment = figment.merge(Env::prefixed("APP_").split("__"));

        let config = Self {
            figment,
            env_name,
            base_dir: Some(dir.to_path_buf()),
        };
        config.validate()?;
        Ok(config)
    }

    /// Builds a configuration from an inline TOML document over the defaults.
    pub fn from_toml_str(toml: &str) -> Result<Self> {
        let figment = Figment::from(Serialized::defaults(Settings::default()))
            .merge(Toml::string(toml));
        let config = Self {
            figment,
            env_name: "inline".to_string(),
            base_dir: None,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn env_name(&self) -> &str {
        &self.env_name
    }

    /// Directory the configuration files were read from, if any.
    pub fn base_dir(&self) -> Option<&Path> {
        self.base_dir.as_deref()
    }

    pub fn get<T>(&self, key: &str) -> Result<T>
    where
        T: serde::de::DeserializeOwned,
    {
        self.figment
            .extract_inner(key)
            .map_err(|e| Error::InvalidConfig(format!("Failed to get '{key}': {e}")))
    }

    /// Extracts every section. Relative paths are anchored at [`Config::base_dir`]
    /// when the configuration came from a directory.
    pub fn settings(&self) -> Result<Settings> {
        let mut settings: Settings = self
            .figment
            .extract()
            .map_err(|e| Error::InvalidConfig(format!("Failed to extract settings: {e}")))?;
        if let Some(base) = &self.base_dir {
            settings.resolve_paths(base);
        }
        Ok(settings)
    }

    fn validate(&self) -> Result<()> {
        let settings = self.settings()?;
        if settings.lore.max_words == 0 {
            return Err(Error::InvalidConfig(
                "lore.max_words must be positive".into(),
            ));
        }
        if settings.diffusion.steps == 0 {
            return Err(Error::InvalidConfig(
                "diffusion.steps must be positive".into(),
            ));
        }
        if settings.diffusion.height % 8 != 0 || settings.diffusion.width % 8 != 0 {
            return Err(Error::InvalidConfig(
                "diffusion height and width must be multiples of 8".into(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub lore: LoreSettings,
    pub retrieval: RetrievalSettings,
    pub models: ModelSettings,
    pub generation: GenerationSettings,
    pub diffusion: DiffusionSettings,
    pub output: OutputSettings,
}

impl Settings {
    /// Rewrites every relative directory setting as `base/<dir>`, after `~` and
    /// `$VAR` expansion.
    pub fn resolve_paths(&mut self, base: &Path) {
        for dir in [
            &mut self.lore.dir,
            &mut self.models.embedding_dir,
            &mut self.models.caption_dir,
            &mut self.models.llm_dir,
            &mut self.models.diffusion_dir,
            &mut self.output.images_dir,
            &mut self.output.stories_dir,
        ] {
            *dir = resolve_with_base(base, dir.as_str())
                .to_string_lossy()
                .into_owned();
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoreSettings {
    pub dir: String,
    pub max_words: usize,
}

impl Default for LoreSettings {
    fn default() -> Self {
        Self {
            dir: "data/lore".into(),
            max_words: 150,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DistanceMetric {
    /// Squared Euclidean distance.
    #[default]
    L2,
    /// `1 - cosine similarity`.
    Cosine,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalSettings {
    pub top_k: usize,
    pub metric: DistanceMetric,
}

impl Default for RetrievalSettings {
    fn default() -> Self {
        Self {
            top_k: 3,
            metric: DistanceMetric::L2,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelSettings {
    pub embedding_dir: String,
    pub caption_dir: String,
    pub llm_dir: String,
    pub diffusion_dir: String,
    pub use_fake_embeddings: bool,
    pub fake_dim: usize,
    pub embed_batch_size: usize,
}

impl Default for ModelSettings {
    fn default() -> Self {
        Self {
            embedding_dir: "models/all-MiniLM-L6-v2".into(),
            caption_dir: "models/blip-image-captioning-large".into(),
            llm_dir: "models/phi-2".into(),
            diffusion_dir: "models/stable-diffusion-v1-5".into(),
            use_fake_embeddings: false,
            fake_dim: 384,
            embed_batch_size: 32,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationSettings {
    pub enrich_max_new_tokens: usize,
    pub enrich_temperature: f64,
    pub story_max_new_tokens: usize,
    pub story_temperature: f64,
    pub caption_max_new_tokens: usize,
    pub seed: u64,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            enrich_max_new_tokens: 120,
            enrich_temperature: 0.7,
            story_max_new_tokens: 400,
            story_temperature: 0.8,
            caption_max_new_tokens: 30,
            seed: 299_792_458,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiffusionSettings {
    pub steps: usize,
    pub guidance_scale: f64,
    pub height: usize,
    pub width: usize,
}

impl Default for DiffusionSettings {
    fn default() -> Self {
        Self {
            steps: 30,
            guidance_scale: 7.5,
            height: 512,
            width: 512,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputSettings {
    pub images_dir: String,
    pub stories_dir: String,
}

impl Default for OutputSettings {
    fn default() -> Self {
        Self {
            images_dir: "outputs/images".into(),
            stories_dir: "outputs/stories".into(),
        }
    }
}

/// Expand a user-provided path string:
/// - Expands leading '~' to the user's home directory
/// - Expands ${VAR} and $VAR environment variables
/// - Returns a PathBuf without attempting to canonicalize
pub fn expand_path<S: AsRef<str>>(input: S) -> PathBuf {
    let s = input.as_ref();
    let expanded_env = shellexpand::env(s).unwrap_or(std::borrow::Cow::Borrowed(s));
    let expanded = shellexpand::tilde(&expanded_env);
    PathBuf::from(expanded.as_ref())
}

/// Resolve a possibly relative path against a given base directory after expansion.
/// If `p` is absolute, it's returned as-is; otherwise `base.join(p)` is returned.
pub fn resolve_with_base<S: AsRef<str>>(base: &Path, p: S) -> PathBuf {
    let p = expand_path(p);
    if p.is_absolute() { p } else { base.join(p) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_pipeline_constants() {
        let settings = Config::from_toml_str("").unwrap().settings().unwrap();
        assert_eq!(settings.lore.max_words, 150);
        assert_eq!(settings.retrieval.top_k, 3);
        assert_eq!(settings.generation.enrich_max_new_tokens, 120);
        assert_eq!(settings.generation.story_max_new_tokens, 400);
        assert_eq!(settings.diffusion.steps, 30);
    }

    #[test]
    fn toml_overrides_single_keys() {
        let config = Config::from_toml_str("[retrieval]\ntop_k = 5\nmetric = \"cosine\"\n")
            .unwrap();
        let settings = config.settings().unwrap();
        assert_eq!(settings.retrieval.top_k, 5);
        assert_eq!(settings.retrieval.metric, DistanceMetric::Cosine);
        assert_eq!(settings.lore.dir, "data/lore");
        assert_eq!(config.get::<usize>("retrieval.top_k").unwrap(), 5);
    }

    #[test]
    fn rejects_zero_word_chunks() {
        assert!(Config::from_toml_str("[lore]\nmax_words = 0\n").is_err());
    }

    #[test]
    fn settings_from_a_directory_are_anchored_there() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(
            tmp.path().join("config.toml"),
            "[lore]\ndir = \"lore\"\n[models]\nllm_dir = \"/opt/models/phi-2\"\n",
        )
        .unwrap();
        let config = Config::load_from(tmp.path()).unwrap();
        assert_eq!(config.base_dir(), Some(tmp.path()));
        let settings = config.settings().unwrap();
        assert_eq!(PathBuf::from(&settings.lore.dir), tmp.path().join("lore"));
        assert_eq!(
            PathBuf::from(&settings.output.images_dir),
            tmp.path().join("outputs/images")
        );
        assert_eq!(
            PathBuf::from(&settings.models.embedding_dir),
            tmp.path().join("models/all-MiniLM-L6-v2")
        );
        assert_eq!(settings.models.llm_dir, "/opt/models/phi-2");
    }

    #[test]
    fn resolve_keeps_absolute_paths() {
        let base = Path::new("/srv/lorerag");
        assert_eq!(
            resolve_with_base(base, "/tmp/lore"),
            PathBuf::from("/tmp/lore")
        );
        assert_eq!(resolve_with_base(base, "data/lore"), base.join("data/lore"));
    }
}
