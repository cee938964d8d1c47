//! Recursive character text splitter for offline ingestion.
//!
//! Splits on paragraph breaks first, then line breaks, then spaces, and
//! finally hard character windows, merging pieces into chunks of at most
//! `chunk_size` characters with up to `chunk_overlap` characters carried
//! into the next chunk.

use std::collections::VecDeque;

/// Default chunk size in characters.
pub const DEFAULT_CHUNK_SIZE: usize = 500;

/// Default overlap between consecutive chunks in characters.
pub const DEFAULT_CHUNK_OVERLAP: usize = 50;

const SEPARATORS: [&str; 4] = ["\n\n", "\n", " ", ""];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextSplitter {
    pub chunk_size: usize,
    pub chunk_overlap: usize,
}

impl Default for TextSplitter {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            chunk_overlap: DEFAULT_CHUNK_OVERLAP,
        }
    }
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

impl TextSplitter {
    /// Create a splitter. `chunk_overlap` is clamped below `chunk_size`.
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Self {
        let chunk_size = chunk_size.max(1);
        Self {
            chunk_size,
            chunk_overlap: chunk_overlap.min(chunk_size - 1),
        }
    }

    /// Split `text` into trimmed, non-empty chunks.
    pub fn split_text(&self, text: &str) -> Vec<String> {
        self.split_recursive(text, &SEPARATORS)
    }

    fn split_recursive(&self, text: &str, separators: &[&str]) -> Vec<String> {
        let (index, separator) = separators
            .iter()
            .enumerate()
            .find(|(_, sep)| sep.is_empty() || text.contains(**sep))
            .map(|(i, sep)| (i, *sep))
            .unwrap_or((separators.len().saturating_sub(1), ""));

        if separator.is_empty() {
            return self.hard_split(text);
        }
        let remaining = &separators[index + 1..];

        let mut chunks = Vec::new();
        let mut fitting: Vec<&str> = Vec::new();
        for piece in text.split(separator).filter(|p| !p.trim().is_empty()) {
            if char_len(piece) <= self.chunk_size {
                fitting.push(piece);
            } else {
                if !fitting.is_empty() {
                    chunks.extend(self.merge(&fitting, separator));
                    fitting.clear();
                }
                chunks.extend(self.split_recursive(piece, remaining));
            }
        }
        if !fitting.is_empty() {
            chunks.extend(self.merge(&fitting, separator));
        }
        chunks
    }

    fn hard_split(&self, text: &str) -> Vec<String> {
        let chars: Vec<char> = text.chars().collect();
        let step = self.chunk_size - self.chunk_overlap;
        let mut chunks = Vec::new();
        let mut start = 0;
        while start < chars.len() {
            let end = (start + self.chunk_size).min(chars.len());
            let chunk: String = chars[start..end].iter().collect();
            let chunk = chunk.trim();
            if !chunk.is_empty() {
                chunks.push(chunk.to_string());
            }
            if end == chars.len() {
                break;
            }
            start += step;
        }
        chunks
    }

    fn merge(&self, pieces: &[&str], separator: &str) -> Vec<String> {
        let sep_len = char_len(separator);
        let joined_len = |window: &VecDeque<&str>| -> usize {
            let body: usize = window.iter().map(|p| char_len(p)).sum();
            body + sep_len * window.len().saturating_sub(1)
        };

        let mut chunks = Vec::new();
        let mut window: VecDeque<&str> = VecDeque::new();
        for piece in pieces {
            let piece_len = char_len(piece);
            let extra = if window.is_empty() { 0 } else { sep_len };
            if !window.is_empty() && joined_len(&window) + extra + piece_len > self.chunk_size {
                push_chunk(&mut chunks, &window, separator);
                while !window.is_empty()
                    && (joined_len(&window) > self.chunk_overlap
                        || joined_len(&window) + sep_len + piece_len > self.chunk_size)
                {
                    window.pop_front();
                }
            }
            window.push_back(piece);
        }
        if !window.is_empty() {
            push_chunk(&mut chunks, &window, separator);
        }
        chunks
    }
}

fn push_chunk(chunks: &mut Vec<String>, window: &VecDeque<&str>, separator: &str) {
    let chunk = window.iter().copied().collect::<Vec<_>>().join(separator);
    let chunk = chunk.trim();
    if !chunk.is_empty() {
        chunks.push(chunk.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn words(n: usize) -> String {
        (0..n).map(|i| format!("word{i}")).collect::<Vec<_>>().join(" ")
    }

    #[test]
    fn test_short_text_is_single_chunk() {
        let chunks = TextSplitter::default().split_text("A short paragraph.");
        assert_eq!(chunks, vec!["A short paragraph."]);
    }

    #[test]
    fn test_empty_text_has_no_chunks() {
        assert!(TextSplitter::default().split_text("  \n\n ").is_empty());
    }

    #[test]
    fn test_chunks_respect_size_and_overlap() {
        let text = words(400);
        let splitter = TextSplitter::default();
        let chunks = splitter.split_text(&text);
        assert!(chunks.len() >= 3);
        for chunk in &chunks {
            assert!(chunk.chars().count() <= 500);
        }
        // The tail of each chunk reappears at the head of the next.
        for pair in chunks.windows(2) {
            let last_word = pair[0].split(' ').last().unwrap();
            assert!(pair[1].starts_with(last_word) || pair[1].contains(last_word));
        }
    }

    #[test]
    fn test_paragraphs_kept_together_when_they_fit() {
        let text = "First paragraph.\n\nSecond paragraph.";
        let chunks = TextSplitter::new(20, 0).split_text(text);
        assert_eq!(chunks, vec!["First paragraph.", "Second paragraph."]);
    }

    #[test]
    fn test_hard_split_without_separators() {
        let text = "x".repeat(1200);
        let chunks = TextSplitter::default().split_text(&text);
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].len(), 500);
    }

    #[test]
    fn test_overlap_clamped() {
        let s = TextSplitter::new(10, 50);
        assert_eq!(s.chunk_overlap, 9);
    }
}
