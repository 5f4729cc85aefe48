//! Word-boundary text chunker.
//!
//! Splits a document into non-overlapping chunks of at most `chunk_words`
//! whitespace-separated words, in document order. Each chunk is a slice of
//! the original text from its first word to its last, so a word is never
//! split and the spacing inside a chunk is preserved.

use crate::models::TextChunk;

/// Default words per chunk.
pub const DEFAULT_CHUNK_WORDS: usize = 500;

/// Split `text` into word-bounded chunks with contiguous indices from 0.
///
/// Text with no words yields no chunks. A `chunk_words` of 0 is treated
/// as 1.
pub fn chunk_words(text: &str, chunk_words: usize) -> Vec<TextChunk<'_>> {
    let chunk_words = chunk_words.max(1);
    let spans = word_spans(text);

    spans
        .chunks(chunk_words)
        .enumerate()
        .map(|(index, group)| {
            let start = group[0].0;
            let end = group[group.len() - 1].1;
            let word_start = index * chunk_words;
            TextChunk {
                index,
                word_start,
                word_end: word_start + group.len(),
                text: &text[start..end],
            }
        })
        .collect()
}

/// Byte ranges of every whitespace-separated word in `text`.
fn word_spans(text: &str) -> Vec<(usize, usize)> {
    let base = text.as_ptr() as usize;
    text.split_whitespace()
        .map(|word| {
            let start = word.as_ptr() as usize - base;
            (start, start + word.len())
        })
        .collect()
}

/// First `max_chars` characters of `text`, with `...` appended when cut.
pub fn preview(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}
