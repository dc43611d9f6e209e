use serde::Deserialize;
use sqlfront_error::{DEFAULT_DEDUP_WINDOW, Result};

/// Knobs for one [`crate::compile`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct CompileOptions {
    /// Two resolver diagnostics on one line closer than this many columns
    /// are reported once.
    pub dedup_window: u32,
    /// Keep the parser's completion hints on the compilation.
    pub emit_hints: bool,
    /// Bind names against the schema. Without a schema nothing is resolved
    /// regardless of this flag.
    pub resolve: bool,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            dedup_window: DEFAULT_DEDUP_WINDOW,
            emit_hints: true,
            resolve: true,
        }
    }
}

impl CompileOptions {
    /// Read options from a JSON object. Missing keys keep their defaults.
    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }
}
