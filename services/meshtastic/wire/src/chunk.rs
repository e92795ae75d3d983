//! Splitting long text messages into radio-sized pieces.
//!
//! Chunks are independent packets; the receiving node is responsible for
//! presenting them in order; nothing here reassembles them.

/// Per-chunk byte budget for text messages
pub const DEFAULT_TEXT_CHUNK_SIZE: usize = 231;

/// UTF-8 aware text splitter
#[derive(Debug, Clone, Copy)]
pub struct TextChunker {
    chunk_size: usize,
}

impl TextChunker {
    /// Create a chunker with the default budget
    pub fn new() -> Self {
        Self {
            chunk_size: DEFAULT_TEXT_CHUNK_SIZE,
        }
    }

    /// Create a chunker with a custom budget (at least 4 bytes, one code point)
    pub fn with_chunk_size(chunk_size: usize) -> Self {
        Self {
            chunk_size: chunk_size.max(4),
        }
    }

    /// Byte budget per chunk
    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Split `text` without ever cutting a code point in half.
    ///
    /// Empty text yields a single empty chunk so callers always send at
    /// least one packet.
    pub fn split<'a>(&self, text: &'a str) -> Vec<&'a str> {
        if text.len() <= self.chunk_size {
            return vec![text];
        }

        let mut chunks = Vec::with_capacity(text.len() / self.chunk_size + 1);
        let mut rest = text;
        while !rest.is_empty() {
            let mut end = rest.len().min(self.chunk_size);
            while !rest.is_char_boundary(end) {
                end -= 1;
            }
            let (head, tail) = rest.split_at(end);
            chunks.push(head);
            rest = tail;
        }
        chunks
    }
}

impl Default for TextChunker {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_text_is_one_chunk() {
        let chunker = TextChunker::new();
        assert_eq!(chunker.split("SYN"), vec!["SYN"]);
        assert_eq!(chunker.split(""), vec![""]);
    }

    #[test]
    fn test_split_at_budget() {
        let chunker = TextChunker::new();
        let text = "a".repeat(DEFAULT_TEXT_CHUNK_SIZE * 2 + 1);
        let chunks = chunker.split(&text);
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].len(), DEFAULT_TEXT_CHUNK_SIZE);
        assert_eq!(chunks[2], "a");
        assert_eq!(chunks.concat(), text);
    }

    #[test]
    fn test_multibyte_boundaries() {
        let chunker = TextChunker::with_chunk_size(5);
        // each snowman is 3 bytes
        let chunks = chunker.split("☃☃☃");
        assert_eq!(chunks, vec!["☃", "☃", "☃"]);

        let chunks = chunker.split("ab☃c");
        assert_eq!(chunks, vec!["ab☃", "c"]);
    }
}
