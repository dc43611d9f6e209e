//! Completion hints.
//!
//! The parser records, for each stretch of text between syntactic anchors,
//! what an editor should offer when the cursor sits there: columns (of every
//! visible table or of one named table), table names, and a keyword list.
//! Hints are indexed by line so a lookup only inspects the hints that touch
//! the cursor's line.

use std::collections::HashMap;

use smallvec::SmallVec;
use sqlfront_error::{Pos, Range};

/// Which columns to suggest.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ColumnSuggestion {
    #[default]
    None,
    /// Columns of every table visible at the cursor.
    All,
    /// Columns of the named table only.
    Table(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionHint {
    pub range: Range,
    pub columns: ColumnSuggestion,
    pub tables: bool,
    pub keywords: Vec<&'static str>,
    /// Text to insert before the chosen suggestion.
    pub prefix: Option<String>,
    /// Text to insert after the chosen suggestion.
    pub suffix: Option<String>,
}

impl CompletionHint {
    #[must_use]
    pub fn new(range: Range) -> Self {
        Self {
            range,
            columns: ColumnSuggestion::None,
            tables: false,
            keywords: Vec::new(),
            prefix: None,
            suffix: None,
        }
    }

    #[must_use]
    pub fn columns(mut self, columns: ColumnSuggestion) -> Self {
        self.columns = columns;
        self
    }

    #[must_use]
    pub fn tables(mut self) -> Self {
        self.tables = true;
        self
    }

    #[must_use]
    pub fn keywords(mut self, keywords: &[&'static str]) -> Self {
        self.keywords = keywords.to_vec();
        self
    }

    #[must_use]
    pub fn wrapped(mut self, prefix: &str, suffix: &str) -> Self {
        self.prefix = Some(prefix.to_owned());
        self.suffix = Some(suffix.to_owned());
        self
    }
}

/// All hints for one source text, indexed by line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompletionHints {
    hints: Vec<CompletionHint>,
    by_line: HashMap<u32, SmallVec<[usize; 4]>>,
}

impl CompletionHints {
    #[must_use]
    pub fn new(hints: Vec<CompletionHint>) -> Self {
        let mut by_line: HashMap<u32, SmallVec<[usize; 4]>> = HashMap::new();
        for (i, hint) in hints.iter().enumerate() {
            for line in hint.range.start.line..=hint.range.end.line {
                by_line.entry(line).or_default().push(i);
            }
        }
        Self { hints, by_line }
    }

    /// The innermost hint whose range touches `pos`.
    ///
    /// A range touches the position right after its last character, so the
    /// hint for a clause still applies while its last word is being typed.
    #[must_use]
    pub fn at(&self, pos: Pos) -> Option<&CompletionHint> {
        self.by_line
            .get(&pos.line)?
            .iter()
            .map(|&i| &self.hints[i])
            .filter(|h| h.range.touches(pos))
            .max_by(|a, b| {
                a.range
                    .start
                    .cmp(&b.range.start)
                    .then_with(|| b.range.end.cmp(&a.range.end))
            })
    }

    pub fn on_line(&self, line: u32) -> impl Iterator<Item = &CompletionHint> {
        self.by_line
            .get(&line)
            .into_iter()
            .flatten()
            .map(|&i| &self.hints[i])
    }

    pub fn iter(&self) -> std::slice::Iter<'_, CompletionHint> {
        self.hints.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.hints.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.hints.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn range(a: (u32, u32), b: (u32, u32)) -> Range {
        Range::new(Pos::new(a.0, a.1), Pos::new(b.0, b.1))
    }

    #[test]
    fn innermost_hint_wins() {
        let hints = CompletionHints::new(vec![
            CompletionHint::new(range((0, 5), (3, 0))).tables(),
            CompletionHint::new(range((1, 2), (1, 9))).columns(ColumnSuggestion::All),
        ]);
        let inner = hints.at(Pos::new(1, 4)).unwrap();
        assert_eq!(inner.columns, ColumnSuggestion::All);
        let outer = hints.at(Pos::new(2, 0)).unwrap();
        assert!(outer.tables);
        assert!(hints.at(Pos::new(4, 0)).is_none());
    }

    #[test]
    fn end_of_range_still_matches() {
        let hints = CompletionHints::new(vec![
            CompletionHint::new(range((0, 6), (0, 12))).keywords(&["FROM"]),
        ]);
        assert_eq!(hints.at(Pos::new(0, 12)).unwrap().keywords, ["FROM"]);
        assert!(hints.at(Pos::new(0, 13)).is_none());
    }

    #[test]
    fn multi_line_hint_indexed_on_every_line() {
        let hints = CompletionHints::new(vec![CompletionHint::new(range((2, 0), (5, 3)))]);
        for line in 2..=5 {
            assert_eq!(hints.on_line(line).count(), 1);
        }
        assert_eq!(hints.on_line(6).count(), 0);
    }
}
