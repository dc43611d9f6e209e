//! Normalizing external SQL for replay against a fresh database.

use sqlfront_error::{Diagnostic, FrontError, Result};
use sqlfront_types::TableDescriptor;
use tracing::{info, warn};

use crate::compile::compile;
use crate::options::CompileOptions;

/// Run `source` through the whole pipeline starting from `schema` (which may
/// be empty) and return the canonical text of every statement.
///
/// Tables created earlier in the batch are visible to later statements. The
/// batch is rejected as a whole when any statement has an error.
pub fn normalize(source: &str, schema: &[TableDescriptor]) -> Result<Vec<String>> {
    let options = CompileOptions {
        emit_hints: false,
        ..CompileOptions::default()
    };
    let compilation = compile(source, Some(schema), &options);

    let mut errors = compilation.diagnostics().iter().filter(|d| d.is_error());
    if let Some(first) = errors.next() {
        let count = 1 + errors.count();
        warn!(target: "sqlfront.import", errors = count, first = %first, "import rejected");
        return Err(FrontError::ImportRejected {
            errors: count,
            first: first.to_string(),
        });
    }

    let statements = compilation.cleaned();
    info!(
        target: "sqlfront.import",
        statements = statements.len(),
        warnings = compilation.diagnostics().iter().filter(|d| !Diagnostic::is_error(d)).count(),
        "import normalized"
    );
    Ok(statements)
}
