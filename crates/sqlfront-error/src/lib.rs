//! Error types for the sqlfront SQL front-end.
//!
//! Language problems in user SQL (bad characters, unexpected tokens, unknown
//! names, type mismatches) are never Rust errors: they are [`Diagnostic`]
//! values returned next to each stage's output. [`FrontError`] covers the
//! remaining API-level failures such as unreadable schema input or an import
//! batch that cannot be replayed.

mod diagnostic;
mod location;

pub use diagnostic::{
    DEFAULT_DEDUP_WINDOW, Diagnostic, DiagnosticKind, DiagnosticMetricsSnapshot, Diagnostics,
    Severity, diagnostic_metrics_snapshot, reset_diagnostic_metrics,
};
pub use location::{LineIndex, Pos, Range, Span};

use thiserror::Error;

/// Primary error type for sqlfront operations.
#[derive(Error, Debug)]
pub enum FrontError {
    // === Input Errors ===
    /// File I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Schema descriptor JSON could not be decoded.
    #[error("invalid schema description: {0}")]
    SchemaFormat(#[from] serde_json::Error),

    /// A raw column type string did not match `name[(n[, n ...])]`.
    #[error("malformed column type '{raw}'")]
    MalformedType { raw: String },

    /// A raw column type named a type the registry does not know.
    #[error("unknown column type '{name}'")]
    UnknownType { name: String },

    // === Pipeline Errors ===
    /// A bulk import batch contained error-severity diagnostics.
    #[error("import rejected: {errors} error(s), first at {first}")]
    ImportRejected { errors: usize, first: String },

    /// A command-line invocation was malformed.
    #[error("usage: {0}")]
    Usage(String),

    /// Internal logic error (should never happen).
    #[error("internal error: {0}")]
    Internal(String),
}

impl FrontError {
    /// Whether the user can likely fix this by changing their input.
    pub const fn is_user_recoverable(&self) -> bool {
        matches!(
            self,
            Self::SchemaFormat(_)
                | Self::MalformedType { .. }
                | Self::UnknownType { .. }
                | Self::ImportRejected { .. }
                | Self::Usage(_)
        )
    }

    /// Human-friendly suggestion for fixing this error.
    pub const fn suggestion(&self) -> Option<&'static str> {
        match self {
            Self::SchemaFormat(_) => {
                Some("Expected a JSON array of {name, columns, foreign_keys} table objects")
            }
            Self::MalformedType { .. } => Some("Write types as name or name(n) or name(p, s)"),
            Self::ImportRejected { .. } => Some("Run `sqlfront check` to list every diagnostic"),
            Self::Usage(_) => Some("Run `sqlfront --help` for usage"),
            _ => None,
        }
    }

    /// Process exit code for this error (for CLI use).
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::Usage(_) => 2,
            Self::ImportRejected { .. } => 3,
            _ => 1,
        }
    }

    /// Create an internal error.
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }
}

/// Result type alias using `FrontError`.
pub type Result<T> = std::result::Result<T, FrontError>;
