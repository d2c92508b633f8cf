//! Byte offset <-> character offset mapping.
//!
//! Regex matches report byte offsets, while positions in results are
//! character offsets. ASCII text maps one to one and skips the table.

/// Character boundary table for one text.
#[derive(Debug, Clone)]
pub struct TextIndex {
    byte_len: usize,
    /// Byte offset of every character start; empty for ASCII text.
    starts: Vec<usize>,
}

impl TextIndex {
    pub fn new(text: &str) -> Self {
        let starts = if text.is_ascii() {
            Vec::new()
        } else {
            text.char_indices().map(|(i, _)| i).collect()
        };
        Self {
            byte_len: text.len(),
            starts,
        }
    }

    fn is_ascii(&self) -> bool {
        self.starts.is_empty()
    }

    /// Number of characters in the text.
    pub fn char_len(&self) -> usize {
        if self.is_ascii() {
            self.byte_len
        } else {
            self.starts.len()
        }
    }

    /// Character offset of a byte offset (which must lie on a char boundary).
    pub fn char_offset(&self, byte: usize) -> usize {
        if self.is_ascii() {
            return byte.min(self.byte_len);
        }
        self.starts.partition_point(|&start| start < byte)
    }

    /// Byte offset of a character offset, clamped to the text length.
    pub fn byte_offset(&self, chars: usize) -> usize {
        if self.is_ascii() {
            return chars.min(self.byte_len);
        }
        self.starts.get(chars).copied().unwrap_or(self.byte_len)
    }
}
