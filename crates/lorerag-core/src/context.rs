//! Renders retrieved lore into one block of text for prompt injection.

use crate::types::RetrievalHit;

/// Formats hits as `[LORE n]` blocks separated by a blank line.
///
/// `n` is the hit's 1-based position in `hits`. Hits whose text is blank are
/// skipped but still consume their number.
pub fn format_lore_context(hits: &[RetrievalHit]) -> String {
    hits.iter()
        .enumerate()
        .filter_map(|(i, hit)| {
            let text = hit.text.trim();
            if text.is_empty() {
                None
            } else {
                Some(format!("[LORE {}]\n{}", i + 1, text))
            }
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hit(id: &str, text: &str) -> RetrievalHit {
        RetrievalHit {
            id: id.into(),
            text: text.into(),
            distance: 0.0,
        }
    }

    #[test]
    fn empty_input_gives_empty_string() {
        assert_eq!(format_lore_context(&[]), "");
    }

    #[test]
    fn three_hits_three_blocks_in_order() {
        let hits = [
            hit("chunk_4", "Rain over Sector 9."),
            hit("chunk_0", "The Syndicate owns the towers."),
            hit("chunk_2", "Detective Vale drinks alone."),
        ];
        let out = format_lore_context(&hits);
        assert_eq!(
            out,
            "[LORE 1]\nRain over Sector 9.\n\n\
             [LORE 2]\nThe Syndicate owns the towers.\n\n\
             [LORE 3]\nDetective Vale drinks alone."
        );
        assert_eq!(out.matches("[LORE ").count(), 3);
    }

    #[test]
    fn blank_hits_are_skipped() {
        let hits = [hit("a", "  "), hit("b", "  neon  "), hit("c", "")];
        assert_eq!(format_lore_context(&hits), "[LORE 2]\nneon");
    }
}
