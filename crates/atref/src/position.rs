//! Conversions between byte offsets and LSP positions
//!
//! LSP positions count UTF-16 code units within a line; the core works in
//! byte offsets.

use tower_lsp::lsp_types::{Position, Range};

/// Line start offsets of a document
pub struct LineIndex<'t> {
    text: &'t str,
    line_starts: Vec<usize>,
}

impl<'t> LineIndex<'t> {
    pub fn new(text: &'t str) -> Self {
        let mut line_starts = vec![0];
        line_starts.extend(text.match_indices('\n').map(|(i, _)| i + 1));
        Self { text, line_starts }
    }

    /// Position of a byte offset. Offsets past the end clamp to the end.
    pub fn position(&self, offset: usize) -> Position {
        let offset = offset.min(self.text.len());
        let line = self.line_starts.partition_point(|&start| start <= offset) - 1;
        let start = self.line_starts[line];
        let character = self.text[start..offset].encode_utf16().count();
        Position::new(line as u32, character as u32)
    }

    pub fn range(&self, span: std::ops::Range<usize>) -> Range {
        Range::new(self.position(span.start), self.position(span.end))
    }

    /// Byte offset of a position, if the line exists. Characters past the
    /// end of the line clamp to the end of the line.
    pub fn offset(&self, position: Position) -> Option<usize> {
        let line = self.line(position.line)?;
        let start = self.line_starts[position.line as usize];

        let mut units = 0u32;
        for (i, c) in line.char_indices() {
            if units >= position.character {
                return Some(start + i);
            }
            units += c.len_utf16() as u32;
        }
        Some(start + line.len())
    }

    /// Text of a line, without its line terminator
    pub fn line(&self, line: u32) -> Option<&'t str> {
        let start = *self.line_starts.get(line as usize)?;
        let end = self
            .line_starts
            .get(line as usize + 1)
            .map(|next| next - 1)
            .unwrap_or(self.text.len());
        let text = &self.text[start..end];
        Some(text.strip_suffix('\r').unwrap_or(text))
    }

    /// Text of a line up to a position
    pub fn line_prefix(&self, position: Position) -> Option<&'t str> {
        let start = *self.line_starts.get(position.line as usize)?;
        let offset = self.offset(position)?;
        Some(&self.text[start..offset])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_positions_ascii() {
        let text = "ab\ncd @x\n";
        let index = LineIndex::new(text);
        assert_eq!(index.position(0), Position::new(0, 0));
        assert_eq!(index.position(3), Position::new(1, 0));
        assert_eq!(index.position(6), Position::new(1, 3));
        assert_eq!(index.position(9), Position::new(2, 0));
        assert_eq!(index.position(100), Position::new(2, 0));
    }

    #[test]
    fn test_positions_utf16() {
        // 'é' is one UTF-16 unit (two bytes), '🦀' is two units (four bytes)
        let text = "é🦀 @a";
        let index = LineIndex::new(text);
        let at = text.find('@').unwrap();
        assert_eq!(at, 7);
        assert_eq!(index.position(at), Position::new(0, 4));
        assert_eq!(index.offset(Position::new(0, 4)), Some(at));
    }

    #[test]
    fn test_offset_roundtrip_and_clamp() {
        let text = "one\ntwo\r\nthree";
        let index = LineIndex::new(text);
        assert_eq!(index.offset(Position::new(1, 1)), Some(5));
        assert_eq!(index.offset(Position::new(1, 50)), Some(7));
        assert_eq!(index.offset(Position::new(2, 5)), Some(14));
        assert_eq!(index.offset(Position::new(3, 0)), None);
    }

    #[test]
    fn test_line_and_prefix() {
        let text = "first\nsee @src\r\n";
        let index = LineIndex::new(text);
        assert_eq!(index.line(0), Some("first"));
        assert_eq!(index.line(1), Some("see @src"));
        assert_eq!(index.line(2), Some(""));
        assert_eq!(index.line_prefix(Position::new(1, 5)), Some("see @"));
    }
}
