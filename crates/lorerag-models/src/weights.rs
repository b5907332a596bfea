use anyhow::{bail, Result};
use std::path::{Path, PathBuf};

/// All `*.safetensors` files directly in `dir`, sorted so shards load in order.
pub fn safetensors_in(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files: Vec<PathBuf> = std::fs::read_dir(dir)?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.is_file() && p.extension().and_then(|s| s.to_str()) == Some("safetensors"))
        .collect();
    files.sort();
    if files.is_empty() {
        bail!("no .safetensors files in {}", dir.display());
    }
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shards_are_sorted_and_other_files_skipped() {
        let tmp = tempfile::tempdir().unwrap();
        for name in [
            "model-00002-of-00002.safetensors",
            "config.json",
            "model-00001-of-00002.safetensors",
        ] {
            std::fs::write(tmp.path().join(name), b"").unwrap();
        }
        let files = safetensors_in(tmp.path()).unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
            .collect();
        assert_eq!(
            names,
            ["model-00001-of-00002.safetensors", "model-00002-of-00002.safetensors"]
        );
    }

    #[test]
    fn empty_dir_is_an_error() {
        let tmp = tempfile::tempdir().unwrap();
        assert!(safetensors_in(tmp.path()).is_err());
    }
}
