//! Fixed-size overlapping text chunker.
//!
//! Splits the knowledge document into [`KnowledgeChunk`]s of roughly
//! `chunk_chars` bytes with `overlap_chars` of trailing context repeated
//! at the start of the next chunk. The overlap exists so that answers
//! spanning a chunk boundary remain retrievable from at least one chunk.
//!
//! Sizes are byte-oriented; window edges are snapped back to UTF-8 char
//! boundaries so slicing never panics on multibyte text.
//!
//! # Guarantees
//!
//! - At least one chunk is always returned (even for empty text).
//! - Chunk indices are contiguous: `0, 1, 2, …, N-1`.
//! - Every byte of the input appears in at least one chunk.

use crate::models::KnowledgeChunk;

/// Split text into overlapping fixed-size chunks.
///
/// `overlap_chars` must be smaller than `chunk_chars` (enforced by config
/// validation); the window advances by `chunk_chars - overlap_chars` each
/// step, clamped so progress is always made.
pub fn chunk_text(text: &str, chunk_chars: usize, overlap_chars: usize) -> Vec<KnowledgeChunk> {
    if text.is_empty() {
        return vec![KnowledgeChunk {
            index: 0,
            text: String::new(),
        }];
    }

    let step = chunk_chars.saturating_sub(overlap_chars).max(1);
    let mut chunks = Vec::new();
    let mut start = 0usize;
    let mut index = 0usize;

    loop {
        let end = snap_to_char_boundary(text, (start + chunk_chars).min(text.len()));
        chunks.push(KnowledgeChunk {
            index,
            text: text[start..end].to_string(),
        });
        index += 1;

        if end >= text.len() {
            break;
        }

        let mut next = snap_to_char_boundary(text, start + step);
        if next <= start {
            // Snapping landed back on the window start; force one char forward.
            next = text[start..]
                .char_indices()
                .nth(1)
                .map(|(i, _)| start + i)
                .unwrap_or(text.len());
        }
        if next >= text.len() {
            break;
        }
        start = next;
    }

    chunks
}

/// Snap a byte index back to the nearest valid UTF-8 char boundary.
fn snap_to_char_boundary(s: &str, index: usize) -> usize {
    if index >= s.len() {
        return s.len();
    }
    let mut i = index;
    while i > 0 && !s.is_char_boundary(i) {
        i -= 1;
    }
    i
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_small_text_single_chunk() {
        let chunks = chunk_text("Hello, world!", 1000, 100);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].index, 0);
        assert_eq!(chunks[0].text, "Hello, world!");
    }

    #[test]
    fn test_empty_text() {
        let chunks = chunk_text("", 1000, 100);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].index, 0);
    }

    #[test]
    fn test_chunk_indices_contiguous() {
        let text = "abcdefghij".repeat(50);
        let chunks = chunk_text(&text, 40, 10);
        assert!(chunks.len() > 1);
        for (i, c) in chunks.iter().enumerate() {
            assert_eq!(c.index, i, "Index mismatch at position {}", i);
        }
    }

    #[test]
    fn test_overlap_repeats_tail() {
        let text: String = ('a'..='z').cycle().take(100).collect();
        let chunks = chunk_text(&text, 40, 10);
        for pair in chunks.windows(2) {
            let prev = &pair[0].text;
            let tail = &prev[prev.len() - 10..];
            assert!(
                pair[1].text.starts_with(tail),
                "chunk {} does not start with the previous chunk's tail",
                pair[1].index
            );
        }
    }

    #[test]
    fn test_full_coverage() {
        let text = "0123456789".repeat(37);
        let chunks = chunk_text(&text, 50, 7);
        // Reconstruct by dropping each chunk's overlap prefix.
        let mut rebuilt = chunks[0].text.clone();
        for c in &chunks[1..] {
            rebuilt.push_str(&c.text[7..]);
        }
        assert_eq!(rebuilt, text);
    }

    #[test]
    fn test_multibyte_utf8_chars() {
        let text = "┌──────────────────┐ naïve café ☕ └──────────────────┘".repeat(20);
        let chunks = chunk_text(&text, 30, 5);
        assert!(!chunks.is_empty());
        for c in &chunks {
            assert!(!c.text.is_empty());
        }
    }

    #[test]
    fn test_deterministic() {
        let text = "Alpha beta gamma delta epsilon zeta eta theta.".repeat(30);
        let c1 = chunk_text(&text, 100, 20);
        let c2 = chunk_text(&text, 100, 20);
        assert_eq!(c1.len(), c2.len());
        for (a, b) in c1.iter().zip(c2.iter()) {
            assert_eq!(a.text, b.text);
            assert_eq!(a.index, b.index);
        }
    }
}
