//! Lore ingestion: read `.txt` files, normalize them and cut fixed-size word chunks.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::types::{LoreChunk, LoreDocument};

pub const DEFAULT_MAX_WORDS: usize = 150;

#[derive(Debug, Clone)]
pub struct LoreCorpusLoader {
    max_words: usize,
}

impl Default for LoreCorpusLoader {
    fn default() -> Self {
        Self {
            max_words: DEFAULT_MAX_WORDS,
        }
    }
}

impl LoreCorpusLoader {
    pub fn new(max_words: usize) -> Result<Self> {
        if max_words == 0 {
            return Err(Error::Validation("max_words must be at least 1".into()));
        }
        Ok(Self { max_words })
    }

    pub fn max_words(&self) -> usize {
        self.max_words
    }

    /// Reads every `.txt` file directly inside `lore_dir`, sorted by file name.
    pub fn load_texts(&self, lore_dir: &Path) -> Result<Vec<LoreDocument>> {
        if !lore_dir.is_dir() {
            return Err(Error::NotFound(format!(
                "lore directory {}",
                lore_dir.display()
            )));
        }
        let files = list_txt_files(lore_dir);
        if files.is_empty() {
            tracing::warn!(dir = %lore_dir.display(), "no .txt files found");
        }
        let mut documents = Vec::with_capacity(files.len());
        for path in files {
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_else(|| path.to_string_lossy().to_string());
            let text = read_file_content(&path)?;
            documents.push(LoreDocument { name, text });
        }
        Ok(documents)
    }

    /// Loads, normalizes and chunks the corpus. Ids run `chunk_0`, `chunk_1`, ...
    /// in file order then chunk order.
    pub fn load_chunks(&self, lore_dir: &Path) -> Result<Vec<LoreChunk>> {
        let documents = self.load_texts(lore_dir)?;
        let chunks = self.chunk_documents(&documents);
        tracing::info!(
            documents = documents.len(),
            chunks = chunks.len(),
            dir = %lore_dir.display(),
            "loaded lore corpus"
        );
        Ok(chunks)
    }

    pub fn chunk_documents(&self, documents: &[LoreDocument]) -> Vec<LoreChunk> {
        let mut chunks = Vec::new();
        for doc in documents {
            for text in chunk_words(&normalize(&doc.text), self.max_words) {
                chunks.push(LoreChunk {
                    id: LoreChunk::id_for(chunks.len()),
                    text,
                    source_document: doc.name.clone(),
                });
            }
        }
        chunks
    }
}

/// Collapses double newlines, turns tabs into spaces and trims.
pub fn normalize(text: &str) -> String {
    text.replace("\n\n", "\n")
        .replace('\t', " ")
        .trim()
        .to_string()
}

/// Groups whitespace-separated words into chunks of at most `max_words`.
/// A `max_words` of zero is treated as one.
pub fn chunk_words(text: &str, max_words: usize) -> Vec<String> {
    let words: Vec<&str> = text.split_whitespace().collect();
    words
        .chunks(max_words.max(1))
        .map(|group| group.join(" "))
        .collect()
}

fn read_file_content(file_path: &Path) -> Result<String> {
    match fs::read_to_string(file_path) {
        Ok(content) => Ok(content),
        Err(_) => {
            let bytes = fs::read(file_path).map_err(|e| Error::io(file_path, e))?;
            tracing::warn!(
                file = %file_path.display(),
                "file is not valid UTF-8, decoding lossily"
            );
            Ok(String::from_utf8_lossy(&bytes).to_string())
        }
    }
}

fn list_txt_files(root: &Path) -> Vec<PathBuf> {
    let mut txt_files: Vec<PathBuf> = walkdir::WalkDir::new(root)
        .min_depth(1)
        .max_depth(1)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .filter(|p| p.extension().and_then(|s| s.to_str()) == Some("txt"))
        .collect();
    txt_files.sort();
    txt_files
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_collapses_and_trims() {
        assert_eq!(normalize("\n\tA city\n\nof rain\t \n"), "A city\nof rain");
    }

    #[test]
    fn chunk_words_has_no_overlap() {
        let chunks = chunk_words("a b c d e", 2);
        assert_eq!(chunks, vec!["a b", "c d", "e"]);
    }

    #[test]
    fn chunk_words_on_blank_text_is_empty() {
        assert!(chunk_words("  \n ", 10).is_empty());
    }

    #[test]
    fn zero_max_words_rejected() {
        assert!(LoreCorpusLoader::new(0).unwrap_err().is_validation());
    }
}
