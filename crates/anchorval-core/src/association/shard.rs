//! Document sharding for parallel anchor scanning.
//!
//! A shard is a slice of the document plus its base offsets. Anchors found
//! by scanning `shard.text` on its own are shard-relative; adding
//! `char_offset` to their position gives the position in the whole
//! document. `ValueAssociator::associate_sharded` instead matches against
//! the whole document from `byte_offset`, which also finds anchors whose
//! label and code sit on different lines.

/// A contiguous slice of a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextShard<'a> {
    pub text: &'a str,
    /// Byte offset of the shard in the document.
    pub byte_offset: usize,
    /// Character offset of the shard in the document.
    pub char_offset: usize,
}

/// Split `text` into shards of roughly `target_len` bytes at line ends.
///
/// A `target_len` of zero yields a single shard. Empty text yields none.
pub fn shard_by_lines(text: &str, target_len: usize) -> Vec<TextShard<'_>> {
    if text.is_empty() {
        return Vec::new();
    }
    if target_len == 0 {
        return vec![TextShard {
            text,
            byte_offset: 0,
            char_offset: 0,
        }];
    }

    let mut shards = Vec::new();
    let mut start = 0;
    let mut char_offset = 0;
    let mut end = 0;

    for line in text.split_inclusive('\n') {
        end += line.len();
        if end - start >= target_len {
            let slice = &text[start..end];
            shards.push(TextShard {
                text: slice,
                byte_offset: start,
                char_offset,
            });
            char_offset += slice.chars().count();
            start = end;
        }
    }

    if start < text.len() {
        shards.push(TextShard {
            text: &text[start..],
            byte_offset: start,
            char_offset,
        });
    }

    shards
}
