//! Chunk boundary detection.
//!
//! Splits generated text into natural speech fragments: sentences first,
//! then clauses for over-long sentences, then word packing as a last
//! resort. All lengths are counted in `char`s.

use std::iter;

/// Default maximum fragment length in characters.
pub const DEFAULT_MAX_FRAGMENT_CHARS: usize = 150;

/// Tunables for [`detect_with`] and [`split_complete`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DetectorConfig {
    /// Fragments longer than this are split on pauses, then on words.
    pub max_chars: usize,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            max_chars: DEFAULT_MAX_FRAGMENT_CHARS,
        }
    }
}

/// Split `text` into fragments using the default limit.
#[must_use]
pub fn detect(text: &str) -> Vec<String> {
    detect_with(text, &DetectorConfig::default())
}

/// Split `text` into ordered, trimmed, whitespace-normalized fragments.
///
/// Trailing text without a terminator becomes the final fragment. A single
/// word longer than `max_chars` is emitted unsplit.
#[must_use]
pub fn detect_with(text: &str, config: &DetectorConfig) -> Vec<String> {
    let mut fragments = Vec::new();
    let mut start = 0;

    for end in sentence_boundaries(text).into_iter().chain(iter::once(text.len())) {
        push_sentence(&text[start..end], config, &mut fragments);
        start = end;
    }

    fragments
}

/// Split off the fragments a streaming buffer has already completed.
///
/// Only text closed by a terminator followed by whitespace is split; the
/// rest comes back as the remainder, to be extended by later tokens.
#[must_use]
pub fn split_complete(buffer: &str, config: &DetectorConfig) -> (Vec<String>, String) {
    match sentence_boundaries(buffer).last() {
        Some(&end) => (
            detect_with(&buffer[..end], config),
            buffer[end..].trim_start().to_string(),
        ),
        None => (Vec::new(), buffer.to_string()),
    }
}

/// Collapse runs of whitespace into single spaces and trim the ends.
#[must_use]
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

// ── Internal helpers ───────────────────────────────────────────────

const fn is_terminator(c: char) -> bool {
    matches!(c, '.' | '!' | '?')
}

const fn is_closer(c: char) -> bool {
    matches!(c, '"' | '\'' | ')' | ']' | '\u{201d}' | '\u{2019}')
}

const fn is_pause(c: char) -> bool {
    matches!(c, ',' | ';' | ':' | '\u{2014}' | '\u{2013}')
}

/// Byte offsets just past each terminator run that is followed by whitespace.
///
/// A run may repeat terminators (`?!`, `...`) and carry closing quotes or
/// brackets.
fn sentence_boundaries(text: &str) -> Vec<usize> {
    let mut boundaries = Vec::new();
    let mut chars = text.char_indices().peekable();

    while let Some((_, c)) = chars.next() {
        if !is_terminator(c) {
            continue;
        }
        while chars.next_if(|&(_, next)| is_terminator(next)).is_some() {}
        while chars.next_if(|&(_, next)| is_closer(next)).is_some() {}

        if let Some(&(idx, next)) = chars.peek()
            && next.is_whitespace()
        {
            boundaries.push(idx);
        }
    }

    boundaries
}

fn char_len(text: &str) -> usize {
    text.chars().count()
}

fn push_sentence(raw: &str, config: &DetectorConfig, out: &mut Vec<String>) {
    let sentence = collapse_whitespace(raw);
    if sentence.is_empty() {
        return;
    }
    if char_len(&sentence) <= config.max_chars {
        out.push(sentence);
        return;
    }

    for chunk in pack(clause_parts(&sentence), config.max_chars) {
        if char_len(&chunk) > config.max_chars {
            out.extend(pack(chunk.split(' ').collect(), config.max_chars));
        } else {
            out.push(chunk);
        }
    }
}

/// Split a normalized sentence after pause punctuation followed by a space.
fn clause_parts(sentence: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut start = 0;
    let mut chars = sentence.char_indices().peekable();

    while let Some((_, c)) = chars.next() {
        if !is_pause(c) {
            continue;
        }
        if let Some(&(idx, next)) = chars.peek()
            && next.is_whitespace()
        {
            parts.push(sentence[start..idx].trim());
            start = idx;
        }
    }
    parts.push(sentence[start..].trim());
    parts.retain(|p| !p.is_empty());
    parts
}

/// Greedily join `pieces` with single spaces while staying within `max`.
///
/// A piece that alone exceeds `max` becomes its own chunk.
fn pack(pieces: Vec<&str>, max: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;

    for piece in pieces {
        let piece_len = char_len(piece);
        if !current.is_empty() && current_len + 1 + piece_len > max {
            chunks.push(std::mem::take(&mut current));
            current_len = 0;
        }
        if !current.is_empty() {
            current.push(' ');
            current_len += 1;
        }
        current.push_str(piece);
        current_len += piece_len;
    }

    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}
