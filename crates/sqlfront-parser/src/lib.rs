// SQL front-end stages: lexer, recursive descent parser with Pratt
// precedence climbing for expressions, scope-building resolver, and the
// statement cleaner. Produces and annotates the AST from `sqlfront-ast`.

pub mod cleaner;
pub mod completion;
pub mod expr;
pub mod lexer;
pub mod parser;
pub mod resolver;
pub mod scope;
pub mod token;

pub use cleaner::clean;
pub use completion::{ColumnSuggestion, CompletionHint, CompletionHints};
pub use expr::parse_expr;
pub use lexer::{LexOutput, Lexer, lex};
pub use parser::{LOOKAHEAD, PResult, ParseOutput, Parser, parse};
pub use resolver::{
    Resolution, ResolveMetricsSnapshot, Resolver, reset_resolve_metrics, resolve,
    resolve_metrics_snapshot,
};
pub use scope::{Scope, ScopeId, ScopeTree, Symbol};
pub use token::{Token, TokenKind};
