use std::path::{Path, PathBuf};

use lorerag_core::config::expand_path;
use lorerag_core::error::{Error, Result};

/// Locates a model directory.
///
/// Checks the configured path first, then `$APP_MODEL_DIR/<name>` and
/// `$MODEL_DIR/<name>`, where `<name>` is the last component of the
/// configured path.
pub fn resolve_model_dir(configured: &str) -> Result<PathBuf> {
    let direct = expand_path(configured);
    if direct.is_dir() {
        tracing::debug!(dir = %direct.display(), "using configured model dir");
        return Ok(direct);
    }
    let name = direct
        .file_name()
        .map(Path::new)
        .unwrap_or(direct.as_path())
        .to_path_buf();
    for var in ["APP_MODEL_DIR", "MODEL_DIR"] {
        if let Ok(root) = std::env::var(var) {
            let candidate = expand_path(root).join(&name);
            if candidate.is_dir() {
                tracing::debug!(
                    dir = %candidate.display(),
                    var,
                    "using model dir from environment"
                );
                return Ok(candidate);
            }
        }
    }
    Err(Error::NotFound(format!(
        "model directory {configured}. Checked the configured path, \
         $APP_MODEL_DIR/{name} and $MODEL_DIR/{name}",
        name = name.display()
    )))
}

/// Returns `dir/file`, or a not-found error naming the missing file.
pub fn require_file(dir: &Path, file: &str) -> Result<PathBuf> {
    let path = dir.join(file);
    if path.is_file() {
        Ok(path)
    } else {
        Err(Error::NotFound(format!("model file {}", path.display())))
    }
}
