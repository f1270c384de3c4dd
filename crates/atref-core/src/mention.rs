//! Mention scanner
//!
//! Finds `@token` mentions in arbitrary text. A mention is an `@` directly
//! followed by one or more non-whitespace characters; there is no escaping
//! and no quoting, so paths containing spaces cannot be mentioned.

use regex::Regex;
use std::ops::Range;
use std::sync::LazyLock;

/// The mention pattern. Group 1 is the token.
static MENTION_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"@(\S+)").expect("Failed to compile mention regex"));

/// A single `@token` found in a document
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MentionOccurrence {
    /// Text after the `@`, never empty and never containing whitespace
    pub token: String,
    /// Byte offset of the `@`
    pub start: usize,
    /// Byte offset one past the last byte of the token
    pub end: usize,
}

impl MentionOccurrence {
    /// Byte span covering the `@` and the token
    pub fn span(&self) -> Range<usize> {
        self.start..self.end
    }

    /// Whether `offset` falls inside this mention.
    ///
    /// The end is inclusive so a cursor sitting right after the last
    /// character still counts as "on" the mention.
    pub fn contains(&self, offset: usize) -> bool {
        self.start <= offset && offset <= self.end
    }
}

/// Iterator over the mentions of a text, in document order.
///
/// Created by [`scan`]. Matches never overlap.
pub struct Mentions<'t> {
    inner: regex::CaptureMatches<'static, 't>,
}

impl Iterator for Mentions<'_> {
    type Item = MentionOccurrence;

    fn next(&mut self) -> Option<Self::Item> {
        let caps = self.inner.next()?;
        let whole = caps.get(0)?;
        let token = caps.get(1)?;
        Some(MentionOccurrence {
            token: token.as_str().to_string(),
            start: whole.start(),
            end: whole.end(),
        })
    }
}

/// Scan `text` for mentions.
///
/// The returned iterator is lazy; calling `scan` again on the same text
/// yields the same sequence.
pub fn scan(text: &str) -> Mentions<'_> {
    Mentions {
        inner: MENTION_REGEX.captures_iter(text),
    }
}

/// Find the mention under a byte offset, if any.
pub fn mention_at(text: &str, offset: usize) -> Option<MentionOccurrence> {
    scan(text)
        .take_while(|m| m.start <= offset)
        .find(|m| m.contains(offset))
}
