//! Boundary-aware text chunking with overlap.

use crate::models::ChunkingConfig;

/// Splits extracted text into overlapping, boundary-aware segments.
///
/// Pure and deterministic: the same `(text, max_chars, overlap)` always
/// produces the same chunks, with no side effects.
#[derive(Debug, Clone)]
pub struct TextChunker {
    /// Maximum window size in characters.
    max_chars: usize,
    /// Characters of the previous window carried into the next one.
    overlap: usize,
}

impl TextChunker {
    /// Create a chunker from validated configuration.
    ///
    /// `Config::validate` guarantees `overlap < max_chars`, which is what
    /// makes the window loop terminate.
    pub fn new(config: &ChunkingConfig) -> Self {
        Self {
            max_chars: config.max_chars as usize,
            overlap: config.overlap as usize,
        }
    }

    /// Chunk `text` into trimmed, non-empty segments of at most
    /// `max_chars` characters.
    ///
    /// Window boundaries that fall inside the text are pulled back to the
    /// nearest period, newline, or space, but only if that break point
    /// lies in the back half of the window; the delimiter stays with the
    /// preceding chunk. Each next window starts `overlap` characters
    /// before the previous window's end.
    pub fn chunk(&self, text: &str) -> Vec<String> {
        let chars: Vec<char> = text.chars().collect();
        let total = chars.len();
        let mut chunks = Vec::new();
        let mut start = 0;

        while start < total {
            // Logical window end; may point past the text.
            let mut end = start + self.max_chars;

            if end < total
                && let Some(split) = self.find_break_point(&chars, start, end)
            {
                // Include the delimiter in this chunk
                end = split + 1;
            }

            let piece: String = chars[start..end.min(total)].iter().collect();
            let trimmed = piece.trim();
            if !trimmed.is_empty() {
                chunks.push(trimmed.to_string());
            }

            let next = end.saturating_sub(self.overlap);
            if next >= total {
                break;
            }

            // Guard against a break-point adjustment stalling the window:
            // a rewound start that fails to clear end - max_chars, or to
            // advance at all, jumps straight to the window end.
            start = if next + self.max_chars <= end || next <= start {
                end
            } else {
                next
            };
        }

        chunks
    }

    /// Latest period, newline, or space at or before `end`, accepted only
    /// strictly past the window midpoint.
    fn find_break_point(&self, chars: &[char], start: usize, end: usize) -> Option<usize> {
        let midpoint = start + self.max_chars / 2;
        for i in (midpoint + 1..=end).rev() {
            if matches!(chars[i], '.' | '\n' | ' ') {
                return Some(i);
            }
        }
        None
    }
}
