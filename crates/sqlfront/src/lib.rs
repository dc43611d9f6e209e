//! Public API facade for sqlfront.
//!
//! [`compile`] runs the lexer, parser, and resolver over one source text and
//! returns a [`Compilation`] an editor can query by cursor position:
//! diagnostics, completion choices, the statement under the cursor, and the
//! table or column a name resolved to. [`import::normalize`] runs the same
//! pipeline over a batch of external SQL and returns canonical statement text.
//! The stage crates are re-exported for callers that need the AST or types.

mod compile;
mod hover;
pub mod import;
mod options;

pub use compile::{Compilation, Completion, compile};
pub use hover::Hover;
pub use options::CompileOptions;

pub use sqlfront_ast as ast;
pub use sqlfront_error::{Diagnostic, DiagnosticKind, FrontError, Pos, Range, Result, Severity};
pub use sqlfront_parser as parser;
pub use sqlfront_types as types;
pub use sqlfront_types::TableDescriptor;

/// Decode a JSON array of table descriptors, the shape the live database
/// reports its schema in.
pub fn load_schema(json: &str) -> Result<Vec<TableDescriptor>> {
    Ok(serde_json::from_str(json)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_schema_accepts_type_alias() {
        let tables = load_schema(
            r#"[{"name": "t", "columns": [{"name": "a", "type": "varchar(3)", "not_null": true}],
                 "foreign_keys": [{"from": "a", "table": "u"}]}]"#,
        )
        .unwrap();
        assert_eq!(tables.len(), 1);
        assert_eq!(tables[0].columns[0].complete_type, "varchar(3)");
        assert!(tables[0].columns[0].not_null);
        assert_eq!(tables[0].foreign_keys[0].to, None);
    }

    #[test]
    fn test_load_schema_rejects_non_array() {
        let err = load_schema(r#"{"name": "t"}"#).unwrap_err();
        assert!(matches!(err, FrontError::SchemaFormat(_)));
        assert_eq!(err.exit_code(), 1);
    }
}
