//! Source locations.
//!
//! Every token, AST node, scope, and diagnostic refers back to the source text
//! through these types. Lines and columns are 0-based; a column counts bytes
//! from the start of its line.

use std::fmt;

use serde::Serialize;

// ---------------------------------------------------------------------------
// Span: byte-offset range
// ---------------------------------------------------------------------------

/// A byte-offset range into the original SQL source text.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub struct Span {
    /// Byte offset of the first character (inclusive).
    pub start: u32,
    /// Byte offset one past the last character (exclusive).
    pub end: u32,
}

impl Span {
    /// Create a new span from start (inclusive) to end (exclusive) byte offsets.
    #[must_use]
    pub const fn new(start: u32, end: u32) -> Self {
        Self { start, end }
    }

    /// A zero-length span at position 0, used as a placeholder.
    pub const ZERO: Self = Self { start: 0, end: 0 };

    /// Merge two spans into one that covers both.
    #[must_use]
    pub const fn merge(self, other: Self) -> Self {
        let start = if self.start < other.start {
            self.start
        } else {
            other.start
        };
        let end = if self.end > other.end {
            self.end
        } else {
            other.end
        };
        Self { start, end }
    }

    /// Length in bytes.
    #[must_use]
    pub const fn len(self) -> u32 {
        self.end - self.start
    }

    /// Whether the span is empty.
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.start == self.end
    }

    /// Slice the source text covered by this span.
    ///
    /// Returns an empty string if the span does not fall on character
    /// boundaries of `source`.
    #[must_use]
    pub fn slice(self, source: &str) -> &str {
        source
            .get(self.start as usize..self.end as usize)
            .unwrap_or_default()
    }
}

impl fmt::Debug for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.start, self.end)
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.start, self.end)
    }
}

// ---------------------------------------------------------------------------
// Pos: a line/column point
// ---------------------------------------------------------------------------

/// A point in the source text. Ordered by line, then column.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize)]
pub struct Pos {
    /// 0-based line number.
    pub line: u32,
    /// 0-based byte column within the line.
    pub column: u32,
}

impl Pos {
    #[must_use]
    pub const fn new(line: u32, column: u32) -> Self {
        Self { line, column }
    }
}

impl fmt::Debug for Pos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

impl fmt::Display for Pos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Editors count from 1.
        write!(f, "{}:{}", self.line + 1, self.column + 1)
    }
}

// ---------------------------------------------------------------------------
// Range: a half-open [start, end) region
// ---------------------------------------------------------------------------

/// A half-open text region `[start, end)` expressed in line/column points.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub struct Range {
    pub start: Pos,
    pub end: Pos,
}

impl Range {
    #[must_use]
    pub const fn new(start: Pos, end: Pos) -> Self {
        Self { start, end }
    }

    /// An empty range located at `pos`.
    #[must_use]
    pub const fn point(pos: Pos) -> Self {
        Self {
            start: pos,
            end: pos,
        }
    }

    /// Smallest range covering both `self` and `other`.
    #[must_use]
    pub fn cover(self, other: Self) -> Self {
        Self {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }

    /// Whether `pos` lies inside `[start, end)`.
    #[must_use]
    pub fn contains(&self, pos: Pos) -> bool {
        self.start <= pos && pos < self.end
    }

    /// Like [`Range::contains`] but also accepts `pos == end`, which is where
    /// the cursor sits right after typing the last character of a region.
    #[must_use]
    pub fn touches(&self, pos: Pos) -> bool {
        self.start <= pos && pos <= self.end
    }

    /// Whether `other` lies entirely within `self`.
    #[must_use]
    pub fn encloses(&self, other: &Self) -> bool {
        self.start <= other.start && other.end <= self.end
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.start >= self.end
    }
}

impl fmt::Debug for Range {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}..{:?}", self.start, self.end)
    }
}

// ---------------------------------------------------------------------------
// LineIndex: byte offset <-> line/column
// ---------------------------------------------------------------------------

/// Maps byte offsets to [`Pos`] values for one source text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineIndex {
    /// Byte offset at which each line starts. Always begins with 0.
    line_starts: Vec<u32>,
    len: u32,
}

impl LineIndex {
    #[must_use]
    pub fn new(source: &str) -> Self {
        let mut line_starts = vec![0];
        line_starts.extend(
            memchr::memchr_iter(b'\n', source.as_bytes()).map(|i| (i + 1) as u32),
        );
        Self {
            line_starts,
            len: source.len() as u32,
        }
    }

    /// Position of byte `offset`. Offsets past the end clamp to the end.
    #[must_use]
    pub fn pos(&self, offset: u32) -> Pos {
        let offset = offset.min(self.len);
        let line = self.line_starts.partition_point(|&start| start <= offset) - 1;
        Pos::new(line as u32, offset - self.line_starts[line])
    }

    #[must_use]
    pub fn range(&self, span: Span) -> Range {
        Range::new(self.pos(span.start), self.pos(span.end))
    }

    /// Byte offset of `pos`, if the line exists. Columns past the end of a
    /// line clamp to the end of the text.
    #[must_use]
    pub fn offset(&self, pos: Pos) -> Option<u32> {
        let start = *self.line_starts.get(pos.line as usize)?;
        Some(start.saturating_add(pos.column).min(self.len))
    }

    #[must_use]
    pub fn line_count(&self) -> usize {
        self.line_starts.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn line_index_maps_offsets() {
        let source = "select a\nfrom t\n\nwhere";
        let index = LineIndex::new(source);
        assert_eq!(index.line_count(), 4);
        assert_eq!(index.pos(0), Pos::new(0, 0));
        assert_eq!(index.pos(7), Pos::new(0, 7));
        assert_eq!(index.pos(8), Pos::new(0, 8));
        assert_eq!(index.pos(9), Pos::new(1, 0));
        assert_eq!(index.pos(16), Pos::new(2, 0));
        assert_eq!(index.pos(17), Pos::new(3, 0));
        assert_eq!(index.pos(999), Pos::new(3, 5));
        assert_eq!(index.offset(Pos::new(1, 5)), Some(14));
        assert_eq!(index.offset(Pos::new(9, 0)), None);
        assert_eq!(
            index.range(Span::new(9, 13)),
            Range::new(Pos::new(1, 0), Pos::new(1, 4))
        );
    }

    #[test]
    fn span_merge_and_slice() {
        let a = Span::new(2, 5);
        let b = Span::new(4, 9);
        assert_eq!(a.merge(b), Span::new(2, 9));
        assert_eq!(Span::new(0, 6).slice("SELECT 1"), "SELECT");
        assert_eq!(Span::new(4, 100).slice("abc"), "");
    }

    #[test]
    fn pos_orders_by_line_then_column() {
        assert!(Pos::new(1, 0) > Pos::new(0, 40));
        assert!(Pos::new(3, 2) < Pos::new(3, 5));
    }

    #[test]
    fn range_is_half_open() {
        let r = Range::new(Pos::new(1, 4), Pos::new(1, 9));
        assert!(r.contains(Pos::new(1, 4)));
        assert!(r.contains(Pos::new(1, 8)));
        assert!(!r.contains(Pos::new(1, 9)));
        assert!(r.touches(Pos::new(1, 9)));
        assert!(!r.contains(Pos::new(0, 5)));
    }

    #[test]
    fn range_encloses() {
        let outer = Range::new(Pos::new(10, 0), Pos::new(20, 0));
        let inner = Range::new(Pos::new(12, 3), Pos::new(15, 1));
        assert!(outer.encloses(&inner));
        assert!(!inner.encloses(&outer));
        assert_eq!(inner.cover(outer), outer);
    }
}
