//! The lex, parse, and resolve pipeline over one source text, and the
//! position-based queries an editor runs against its result.

use serde::Serialize;
use sqlfront_ast::Statement;
use sqlfront_error::{Diagnostic, Diagnostics, LineIndex, Pos, Range};
use sqlfront_parser::{
    ColumnSuggestion, CompletionHints, Scope, ScopeTree, Token, clean, lex, parse, resolve,
};
use sqlfront_types::{Catalog, TableDescriptor};
use tracing::debug;

use crate::hover::{Hover, binding_at};
use crate::options::CompileOptions;

/// Compile `source` against `schema`.
///
/// Lex and syntax diagnostics are always produced. Names are bound only when
/// a schema is supplied and [`CompileOptions::resolve`] is set; otherwise the
/// compilation has no scopes and no catalog.
#[must_use]
pub fn compile(
    source: &str,
    schema: Option<&[TableDescriptor]>,
    options: &CompileOptions,
) -> Compilation {
    let span = tracing::debug_span!(
        target: "sqlfront",
        "compile",
        bytes = source.len(),
        statements = tracing::field::Empty,
        diagnostics = tracing::field::Empty,
    );
    let _guard = span.enter();

    let index = LineIndex::new(source);
    let lexed = lex(source);
    let mut parsed = parse(&lexed.tokens);

    let mut found = lexed.errors;
    found.append(&mut parsed.errors);

    let (scopes, catalog) = match schema {
        Some(tables) if options.resolve => {
            let resolution = resolve(
                &mut parsed.statements,
                Catalog::from_descriptors(tables),
                &index,
                options.dedup_window,
            );
            found.extend(resolution.diagnostics);
            (Some(resolution.scopes), Some(resolution.catalog))
        }
        _ => {
            debug!(target: "sqlfront", "no schema to resolve against; binding skipped");
            (None, None)
        }
    };
    // One suppression pass over every stage, in source order.
    found.sort_by_key(|d| d.range.start);
    let mut sink = Diagnostics::new(options.dedup_window);
    sink.extend(found);
    let diagnostics = sink.into_vec();

    let hints = if options.emit_hints {
        parsed.hints
    } else {
        CompletionHints::default()
    };

    span.record("statements", parsed.statements.len());
    span.record("diagnostics", diagnostics.len());

    Compilation {
        source: source.to_owned(),
        index,
        tokens: lexed.tokens,
        statements: parsed.statements,
        diagnostics,
        bracket_error: lexed.bracket_error,
        hints,
        scopes,
        catalog,
    }
}

/// Everything known about one compiled source text.
#[derive(Debug, Clone)]
pub struct Compilation {
    source: String,
    index: LineIndex,
    tokens: Vec<Token>,
    statements: Vec<Statement>,
    diagnostics: Vec<Diagnostic>,
    bracket_error: Option<String>,
    hints: CompletionHints,
    scopes: Option<ScopeTree>,
    catalog: Option<Catalog>,
}

/// Completion choices at one cursor position, with names resolved against
/// the scopes and catalog of the compilation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Completion {
    /// Text the chosen item replaces.
    pub range: Range,
    pub columns: Vec<String>,
    pub tables: Vec<String>,
    pub keywords: Vec<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prefix: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suffix: Option<String>,
}

impl Compilation {
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn line_index(&self) -> &LineIndex {
        &self.index
    }

    /// All tokens including trivia, ending with `Eof`.
    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    pub fn statements(&self) -> &[Statement] {
        &self.statements
    }

    /// Diagnostics from every stage, ordered by start position.
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn has_errors(&self) -> bool {
        self.diagnostics.iter().any(Diagnostic::is_error)
    }

    /// Names the first unbalanced parenthesis, if any.
    pub fn bracket_error(&self) -> Option<&str> {
        self.bracket_error.as_deref()
    }

    pub fn hints(&self) -> &CompletionHints {
        &self.hints
    }

    /// `None` when no schema was resolved against.
    pub fn scopes(&self) -> Option<&ScopeTree> {
        self.scopes.as_ref()
    }

    /// The schema after every statement's DDL has been applied.
    pub fn catalog(&self) -> Option<&Catalog> {
        self.catalog.as_ref()
    }

    /// Diagnostics whose range covers `line`.
    pub fn diagnostics_on_line(&self, line: u32) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics
            .iter()
            .filter(move |d| d.range.start.line <= line && line <= d.range.end.line)
    }

    /// Source range of each statement, in order.
    pub fn statement_ranges(&self) -> Vec<Range> {
        self.statements
            .iter()
            .map(|s| self.index.range(s.span))
            .collect()
    }

    /// The statement under the cursor. A cursor right after a statement's
    /// last character still selects it.
    pub fn statement_at(&self, pos: Pos) -> Option<&Statement> {
        self.statements
            .iter()
            .find(|s| self.index.range(s.span).touches(pos))
    }

    /// The innermost scope containing `pos`.
    pub fn scope_at(&self, pos: Pos) -> Option<&Scope> {
        let scopes = self.scopes.as_ref()?;
        Some(scopes.get(scopes.scope_at(pos)))
    }

    /// The table or column named at `pos`.
    pub fn hover_at(&self, pos: Pos) -> Option<Hover<'_>> {
        let catalog = self.catalog.as_ref()?;
        let offset = self.index.offset(pos)?;
        let statement = self.statement_at(pos)?;
        binding_at(statement, offset).map(|binding| Hover::new(binding, catalog))
    }

    /// What to offer at `pos`. Column and table names are filled in only when
    /// the compilation was resolved.
    pub fn completion_at(&self, pos: Pos) -> Option<Completion> {
        let hint = self.hints.at(pos)?;
        let mut completion = Completion {
            range: hint.range,
            keywords: hint.keywords.clone(),
            prefix: hint.prefix.clone(),
            suffix: hint.suffix.clone(),
            ..Completion::default()
        };
        let (Some(scopes), Some(catalog)) = (&self.scopes, &self.catalog) else {
            return Some(completion);
        };

        let scope = scopes.scope_at(pos);
        completion.columns = match &hint.columns {
            ColumnSuggestion::None => Vec::new(),
            ColumnSuggestion::All => scopes
                .visible(scope)
                .into_iter()
                .filter(|(_, symbol)| !symbol.columns.is_empty())
                .map(|(name, _)| name.to_owned())
                .collect(),
            ColumnSuggestion::Table(name) => {
                let visible = scopes
                    .lookup(scope, name, |s| !s.tables.is_empty())
                    .and_then(|s| s.tables.first().copied());
                let table = visible.or_else(|| catalog.find_tables(name).first().copied());
                table
                    .map(|t| {
                        catalog
                            .table(t)
                            .columns
                            .iter()
                            .map(|&c| catalog.column(c).name.clone())
                            .collect()
                    })
                    .unwrap_or_default()
            }
        };
        if hint.tables {
            completion.tables = catalog.table_names().into_iter().map(str::to_owned).collect();
        }
        Some(completion)
    }

    /// Canonical text of each statement.
    pub fn cleaned(&self) -> Vec<String> {
        self.statements
            .iter()
            .map(|s| clean(s, &self.source, self.catalog.as_ref()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use sqlfront_types::ColumnDescriptor;

    use super::*;

    fn schema() -> Vec<TableDescriptor> {
        vec![TableDescriptor {
            name: "customers".to_owned(),
            columns: vec![
                ColumnDescriptor {
                    name: "id".to_owned(),
                    complete_type: "int".to_owned(),
                    primary_key: true,
                    ..ColumnDescriptor::default()
                },
                ColumnDescriptor {
                    name: "name".to_owned(),
                    complete_type: "varchar(40)".to_owned(),
                    ..ColumnDescriptor::default()
                },
            ],
            ..TableDescriptor::default()
        }]
    }

    #[test]
    fn without_schema_only_syntax_is_checked() {
        let c = compile("select nmae from customers", None, &CompileOptions::default());
        assert!(c.diagnostics().is_empty());
        assert!(c.scopes().is_none());
        assert!(c.hover_at(Pos::new(0, 8)).is_none());
    }

    #[test]
    fn resolve_flag_disables_binding() {
        let options = CompileOptions {
            resolve: false,
            ..CompileOptions::default()
        };
        let c = compile("select nmae from customers", Some(&schema()), &options);
        assert!(c.diagnostics().is_empty());
    }

    #[test]
    fn hints_can_be_dropped() {
        let options = CompileOptions {
            emit_hints: false,
            ..CompileOptions::default()
        };
        let c = compile("select  from customers", Some(&schema()), &options);
        assert!(c.completion_at(Pos::new(0, 7)).is_none());
    }

    #[test]
    fn diagnostics_are_ordered_by_position() {
        let sql = "select nmae from customers;\nselect @ from customers";
        let c = compile(sql, Some(&schema()), &CompileOptions::default());
        let starts: Vec<Pos> = c.diagnostics().iter().map(Diagnostic::start).collect();
        let mut sorted = starts.clone();
        sorted.sort();
        assert_eq!(starts, sorted);
        assert_eq!(c.diagnostics_on_line(0).count(), 1);
        assert_eq!(c.diagnostics_on_line(1).count(), 1);
    }

    #[test]
    fn lex_and_syntax_errors_share_the_dedup_window() {
        let c = compile("select @ from t", None, &CompileOptions::default());
        let messages: Vec<&str> = c.diagnostics().iter().map(|d| d.message.as_str()).collect();
        assert_eq!(messages, vec!["unrecognized character '@'"]);

        let c = compile("select (a from t", None, &CompileOptions::default());
        assert_eq!(c.diagnostics().len(), 1, "{:?}", c.diagnostics());

        let options = CompileOptions {
            dedup_window: 0,
            ..CompileOptions::default()
        };
        let c = compile("select @ from t", None, &options);
        assert_eq!(c.diagnostics().len(), 2, "{:?}", c.diagnostics());
    }

    #[test]
    fn statement_lookup_by_position() {
        let sql = "select id from customers;\n  delete from customers";
        let c = compile(sql, Some(&schema()), &CompileOptions::default());
        let ranges = c.statement_ranges();
        assert_eq!(ranges.len(), 2);
        assert_eq!(ranges[0], Range::new(Pos::new(0, 0), Pos::new(0, 24)));
        assert_eq!(ranges[1].start, Pos::new(1, 2));
        assert_eq!(c.statement_at(Pos::new(0, 24)).map(|s| s.kind.keyword()), Some("SELECT"));
        assert_eq!(c.statement_at(Pos::new(1, 5)).map(|s| s.kind.keyword()), Some("DELETE"));
        assert!(c.statement_at(Pos::new(1, 0)).is_none());
    }
}
