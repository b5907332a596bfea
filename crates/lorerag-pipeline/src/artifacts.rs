//! Files written by the pipelines.

use std::fs::OpenOptions;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use lorerag_core::error::{Error, Result};
use lorerag_core::types::StoryResult;

/// Local time as `YYYYmmdd_HHMMSS`.
pub fn timestamp() -> String {
    chrono::Local::now().format("%Y%m%d_%H%M%S").to_string()
}

fn ensure_dir(dir: &Path) -> Result<()> {
    std::fs::create_dir_all(dir).map_err(|e| Error::io(dir, e))
}

const MAX_SUFFIX: u32 = 10_000;

/// Creates `dir/{stem}.{ext}`, or `dir/{stem}_{n}.{ext}` with the first free `n`
/// when that name is taken. Existing files are never overwritten.
fn write_new(dir: &Path, stem: &str, ext: &str, bytes: &[u8]) -> Result<PathBuf> {
    for n in 0..MAX_SUFFIX {
        let name = if n == 0 { format!("{stem}.{ext}") } else { format!("{stem}_{n}.{ext}") };
        let path = dir.join(name);
        let mut file = match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::AlreadyExists => continue,
            Err(e) => return Err(Error::io(&path, e)),
        };
        file.write_all(bytes).map_err(|e| Error::io(&path, e))?;
        tracing::info!(path = %path.display(), bytes = bytes.len(), "wrote artifact");
        return Ok(path);
    }
    Err(Error::io(
        dir.join(format!("{stem}.{ext}")),
        std::io::Error::new(ErrorKind::AlreadyExists, "no free file name"),
    ))
}

pub fn render_story(result: &StoryResult) -> String {
    format!(
        "IMAGE PATH:\n{}\n\nCAPTION:\n{}\n\nSTORY:\n{}",
        result.image_path, result.caption, result.story
    )
}

/// Writes `dir/story_{image stem}_{timestamp}.txt`.
pub fn write_story(result: &StoryResult, dir: &Path) -> Result<PathBuf> {
    ensure_dir(dir)?;
    let stem = Path::new(&result.image_path)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "image".to_string());
    let name = format!("story_{stem}_{}", timestamp());
    write_new(dir, &name, "txt", render_story(result).as_bytes())
}

/// Writes PNG bytes to `dir/rag_image_{timestamp}.png`, adding a `_n` suffix
/// if an image from the same second already exists.
pub fn write_image(png: &[u8], dir: &Path) -> Result<PathBuf> {
    ensure_dir(dir)?;
    write_new(dir, &format!("rag_image_{}", timestamp()), "png", png)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timestamp_shape() {
        let ts = timestamp();
        assert_eq!(ts.len(), 15);
        assert_eq!(&ts[8..9], "_");
        assert!(ts.chars().filter(|c| *c != '_').all(|c| c.is_ascii_digit()));
    }

    #[test]
    fn taken_names_get_a_numeric_suffix() {
        let tmp = tempfile::tempdir().unwrap();
        let first = write_new(tmp.path(), "rag_image_x", "png", b"one").unwrap();
        let second = write_new(tmp.path(), "rag_image_x", "png", b"two").unwrap();
        let third = write_new(tmp.path(), "rag_image_x", "png", b"three")
            .unwrap();
        assert_eq!(first, tmp.path().join("rag_image_x.png"));
        assert_eq!(second, tmp.path().join("rag_image_x_1.png"));
        assert_eq!(third, tmp.path().join("rag_image_x_2.png"));
        assert_eq!(std::fs::read(&first).unwrap(), b"one");
        assert_eq!(std::fs::read(&second).unwrap(), b"two");
    }
}
