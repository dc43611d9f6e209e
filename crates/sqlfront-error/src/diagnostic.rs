//! Positioned diagnostics.
//!
//! Lexing, parsing, and resolution never abort on bad input. Each stage
//! collects [`Diagnostic`] values alongside its primary result so that one
//! malformed statement does not hide problems in the rest of the source.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

use crate::location::{Pos, Range};

// ---------------------------------------------------------------------------
// Metrics
// ---------------------------------------------------------------------------

static SQLFRONT_DIAGNOSTICS_TOTAL: AtomicU64 = AtomicU64::new(0);
static SQLFRONT_DIAGNOSTICS_SUPPRESSED_TOTAL: AtomicU64 = AtomicU64::new(0);

/// Point-in-time snapshot of diagnostic counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DiagnosticMetricsSnapshot {
    pub sqlfront_diagnostics_total: u64,
    pub sqlfront_diagnostics_suppressed_total: u64,
}

#[must_use]
pub fn diagnostic_metrics_snapshot() -> DiagnosticMetricsSnapshot {
    DiagnosticMetricsSnapshot {
        sqlfront_diagnostics_total: SQLFRONT_DIAGNOSTICS_TOTAL.load(Ordering::Relaxed),
        sqlfront_diagnostics_suppressed_total: SQLFRONT_DIAGNOSTICS_SUPPRESSED_TOTAL
            .load(Ordering::Relaxed),
    }
}

pub fn reset_diagnostic_metrics() {
    SQLFRONT_DIAGNOSTICS_TOTAL.store(0, Ordering::Relaxed);
    SQLFRONT_DIAGNOSTICS_SUPPRESSED_TOTAL.store(0, Ordering::Relaxed);
}

// ---------------------------------------------------------------------------
// Diagnostic
// ---------------------------------------------------------------------------

/// How serious a diagnostic is. `Error` sorts above `Warning`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Informational; never blocks compilation.
    Warning,
    /// The statement is invalid.
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Warning => f.write_str("warning"),
            Self::Error => f.write_str("error"),
        }
    }
}

/// Which stage produced a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DiagnosticKind {
    /// Unrecognized character, unterminated string/comment, unbalanced brackets.
    Lex,
    /// Unexpected token.
    Syntax,
    /// Unknown or ambiguous name, type mismatch, arity mismatch, bad foreign key.
    Semantic,
}

/// A positioned error or warning.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub severity: Severity,
    pub message: String,
    pub range: Range,
    /// Human-readable description of a fix the editor can offer.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quick_fix: Option<String>,
}

impl Diagnostic {
    #[must_use]
    pub fn new(
        kind: DiagnosticKind,
        severity: Severity,
        message: impl Into<String>,
        range: Range,
    ) -> Self {
        Self {
            kind,
            severity,
            message: message.into(),
            range,
            quick_fix: None,
        }
    }

    #[must_use]
    pub fn lex(message: impl Into<String>, range: Range) -> Self {
        Self::new(DiagnosticKind::Lex, Severity::Error, message, range)
    }

    #[must_use]
    pub fn syntax(message: impl Into<String>, range: Range) -> Self {
        Self::new(DiagnosticKind::Syntax, Severity::Error, message, range)
    }

    #[must_use]
    pub fn semantic(message: impl Into<String>, range: Range) -> Self {
        Self::new(DiagnosticKind::Semantic, Severity::Error, message, range)
    }

    #[must_use]
    pub fn warning(message: impl Into<String>, range: Range) -> Self {
        Self::new(DiagnosticKind::Semantic, Severity::Warning, message, range)
    }

    #[must_use]
    pub fn with_quick_fix(mut self, fix: impl Into<String>) -> Self {
        self.quick_fix = Some(fix.into());
        self
    }

    #[must_use]
    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }

    #[must_use]
    pub fn start(&self) -> Pos {
        self.range.start
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}: {}", self.range.start, self.severity, self.message)?;
        if let Some(fix) = &self.quick_fix {
            write!(f, " ({fix})")?;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Diagnostics: deduplicating sink
// ---------------------------------------------------------------------------

/// Default column window for duplicate suppression.
pub const DEFAULT_DEDUP_WINDOW: u32 = 10;

/// An ordered collection of diagnostics that suppresses near-duplicates.
///
/// Two diagnostics that start on the same line less than `window` columns
/// apart are treated as the same problem; only the more severe one is kept.
/// On a tie the earlier one wins. A window of 0 disables suppression.
#[derive(Debug, Clone)]
pub struct Diagnostics {
    items: Vec<Diagnostic>,
    window: u32,
}

impl Default for Diagnostics {
    fn default() -> Self {
        Self::new(DEFAULT_DEDUP_WINDOW)
    }
}

impl Diagnostics {
    #[must_use]
    pub fn new(window: u32) -> Self {
        Self {
            items: Vec::new(),
            window,
        }
    }

    /// Add a diagnostic. Returns `false` if it was suppressed.
    pub fn push(&mut self, diagnostic: Diagnostic) -> bool {
        if self.window > 0 {
            let start = diagnostic.start();
            let clash = self.items.iter().position(|d| {
                d.start().line == start.line
                    && d.start().column.abs_diff(start.column) < self.window
            });
            if let Some(idx) = clash {
                SQLFRONT_DIAGNOSTICS_SUPPRESSED_TOTAL.fetch_add(1, Ordering::Relaxed);
                if diagnostic.severity > self.items[idx].severity {
                    self.items[idx] = diagnostic;
                    return true;
                }
                return false;
            }
        }
        SQLFRONT_DIAGNOSTICS_TOTAL.fetch_add(1, Ordering::Relaxed);
        self.items.push(diagnostic);
        true
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.items.iter().any(Diagnostic::is_error)
    }

    #[must_use]
    pub fn as_slice(&self) -> &[Diagnostic] {
        &self.items
    }

    #[must_use]
    pub fn into_vec(self) -> Vec<Diagnostic> {
        self.items
    }
}

impl Extend<Diagnostic> for Diagnostics {
    fn extend<T: IntoIterator<Item = Diagnostic>>(&mut self, iter: T) {
        for d in iter {
            self.push(d);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(line: u32, column: u32) -> Range {
        Range::new(Pos::new(line, column), Pos::new(line, column + 3))
    }

    #[test]
    fn severity_ordering() {
        assert!(Severity::Error > Severity::Warning);
    }

    #[test]
    fn display_includes_one_based_position_and_fix() {
        let d = Diagnostic::semantic("unknown identifier nmae", at(0, 7)).with_quick_fix("did you mean `name`?");
        assert_eq!(
            d.to_string(),
            "1:8: error: unknown identifier nmae (did you mean `name`?)"
        );
    }

    #[test]
    fn dedup_keeps_higher_severity() {
        let mut sink = Diagnostics::new(10);
        assert!(sink.push(Diagnostic::warning("w", at(2, 4))));
        assert!(sink.push(Diagnostic::semantic("e", at(2, 9))));
        assert_eq!(sink.len(), 1);
        assert_eq!(sink.as_slice()[0].message, "e");

        // Lower severity nearby is dropped.
        assert!(!sink.push(Diagnostic::warning("w2", at(2, 1))));
        assert_eq!(sink.len(), 1);
    }

    #[test]
    fn dedup_window_boundaries() {
        let mut sink = Diagnostics::new(10);
        sink.push(Diagnostic::semantic("a", at(0, 0)));
        sink.push(Diagnostic::semantic("b", at(0, 10)));
        sink.push(Diagnostic::semantic("c", at(1, 0)));
        assert_eq!(sink.len(), 3);
    }

    #[test]
    fn zero_window_disables_dedup() {
        let mut sink = Diagnostics::new(0);
        sink.push(Diagnostic::semantic("a", at(0, 0)));
        sink.push(Diagnostic::semantic("b", at(0, 1)));
        assert_eq!(sink.len(), 2);
        assert!(sink.has_errors());
    }
}
