// Hand-written recursive descent parser. Expression parsing lives in expr.rs.
//
// The parser never gives up on a source text: a statement that fails to parse
// yields one diagnostic, the parser resynchronizes at the next `;` or
// statement keyword, and the main loop force-advances whenever an iteration
// consumed nothing. Each iteration therefore consumes at least one token,
// which bounds parsing at O(tokens).

use sqlfront_ast::{
    AlterTableAction, AlterTableStatement, Assignment, ColumnConstraint, ColumnConstraintKind,
    ColumnDef, CreateTableStatement, DeleteStatement, DropTableStatement, Expr, ExprKind,
    ForeignKeyClause, FromClause, GroupBy, Ident, InsertStatement, Join, JoinOperator, Limit,
    NullsOrder, OrderBy, OrderingTerm, ResultColumn, SelectStatement, SortDirection, Span,
    Statement, StatementKind, TableConstraint, TableConstraintKind, TableOrSubquery, TypeName,
    UpdateStatement, ValueRow,
};
use sqlfront_error::{Diagnostic, Pos, Range};
use sqlfront_types::Builtin;

use crate::completion::{ColumnSuggestion, CompletionHint, CompletionHints};
use crate::token::{Token, TokenKind};

/// Number of significant tokens the parser may inspect ahead of the cursor.
pub const LOOKAHEAD: usize = 4;

const STATEMENT_KEYWORDS: &[&str] = &[
    "SELECT",
    "INSERT INTO",
    "UPDATE",
    "DELETE FROM",
    "CREATE TABLE",
    "ALTER TABLE",
    "DROP TABLE",
];

const AFTER_FROM_KEYWORDS: &[&str] = &[
    "WHERE",
    "JOIN",
    "LEFT JOIN",
    "INNER JOIN",
    "CROSS JOIN",
    "NATURAL JOIN",
    "GROUP BY",
    "ORDER BY",
    "LIMIT",
];

const CONDITION_KEYWORDS: &[&str] = &["AND", "OR", "NOT", "IN", "LIKE", "NULL"];

const COLUMN_CONSTRAINT_KEYWORDS: &[&str] = &[
    "NOT NULL",
    "DEFAULT",
    "PRIMARY KEY",
    "AUTOINCREMENT",
    "UNIQUE",
    "REFERENCES",
    "COLLATE",
    "CHECK",
];

pub type PResult<T> = Result<T, Diagnostic>;

/// Everything the parser produces for one token stream.
#[derive(Debug, Clone)]
pub struct ParseOutput {
    pub statements: Vec<Statement>,
    pub errors: Vec<Diagnostic>,
    pub hints: CompletionHints,
}

/// Parse a token stream as produced by [`crate::lex`]. Trivia is skipped.
#[must_use]
pub fn parse(tokens: &[Token]) -> ParseOutput {
    Parser::new(tokens).parse_all()
}

// ---------------------------------------------------------------------------
// Parser
// ---------------------------------------------------------------------------

pub struct Parser {
    /// Significant tokens, always ending with `Eof`.
    pub(crate) tokens: Vec<Token>,
    pub(crate) pos: usize,
    /// Span and end position of the last consumed token.
    prev_span: Span,
    prev_end: Pos,
    errors: Vec<Diagnostic>,
    hints: Vec<CompletionHint>,
    /// Hints whose clause is still being parsed.
    open_hints: Vec<usize>,
}

impl Parser {
    #[must_use]
    pub fn new(tokens: &[Token]) -> Self {
        let mut significant: Vec<Token> = tokens
            .iter()
            .filter(|t| !t.kind.is_trivia())
            .cloned()
            .collect();
        if significant.last().is_none_or(|t| t.kind != TokenKind::Eof) {
            let (span, end) = tokens
                .last()
                .map_or((Span::ZERO, Pos::default()), |t| (Span::new(t.span.end, t.span.end), t.end));
            significant.push(Token {
                kind: TokenKind::Eof,
                span,
                line: end.line,
                column: end.column,
                end,
                leading_comment: None,
            });
        }
        Self {
            tokens: significant,
            pos: 0,
            prev_span: Span::ZERO,
            prev_end: Pos::default(),
            errors: Vec::new(),
            hints: Vec::new(),
            open_hints: Vec::new(),
        }
    }

    /// Parse every statement in the stream.
    #[must_use]
    pub fn parse_all(mut self) -> ParseOutput {
        let span = tracing::debug_span!(
            target: "sqlfront.parse",
            "parse",
            tokens = self.tokens.len(),
            statements = tracing::field::Empty,
            errors = tracing::field::Empty,
            hints = tracing::field::Empty,
        );
        let _guard = span.enter();

        let mut statements = Vec::new();
        let mut separated = true;
        loop {
            while self.eat(&TokenKind::Semicolon) {
                separated = true;
            }
            if separated {
                let gap = self.open_hint(self.hint().keywords(STATEMENT_KEYWORDS));
                self.close_hint(gap);
            }
            separated = false;
            if self.at_eof() {
                break;
            }

            let start = self.pos;
            if self.peek().is_statement_start() {
                match self.parse_statement() {
                    Ok(stmt) => {
                        tracing::debug!(
                            target: "sqlfront.parse",
                            kind = stmt.kind.keyword(),
                            span = %stmt.span,
                            "parsed statement"
                        );
                        statements.push(stmt);
                        if !self.check(&TokenKind::Semicolon) && !self.at_eof() {
                            let err = self.err_expected("';' or end of input");
                            self.errors.push(err);
                            self.synchronize();
                        }
                    }
                    Err(err) => {
                        self.close_open_hints(err.range.end);
                        self.errors.push(err);
                        self.synchronize();
                    }
                }
            } else {
                let tok = self.current();
                let err = Diagnostic::syntax(format!("unexpected token {}", tok.kind), tok.range());
                self.errors.push(err);
                self.advance();
            }

            // Termination guarantee: every iteration consumes a token.
            if self.pos == start {
                self.advance();
            }
        }

        span.record("statements", statements.len());
        span.record("errors", self.errors.len());
        span.record("hints", self.hints.len());
        ParseOutput {
            statements,
            errors: self.errors,
            hints: CompletionHints::new(self.hints),
        }
    }

    /// Skip to the next `;`, statement keyword, or end of input.
    fn synchronize(&mut self) {
        while !self.at_eof()
            && !self.check(&TokenKind::Semicolon)
            && !self.peek().is_statement_start()
        {
            self.advance();
        }
    }

    // -----------------------------------------------------------------------
    // Token navigation
    // -----------------------------------------------------------------------

    pub(crate) fn current(&self) -> &Token {
        // `tokens` always ends with Eof and `pos` never moves past it.
        &self.tokens[self.pos]
    }

    pub(crate) fn peek(&self) -> &TokenKind {
        &self.current().kind
    }

    /// Kind of the token `n` places ahead; `n` stays inside the lookahead window.
    pub(crate) fn peek_nth(&self, n: usize) -> &TokenKind {
        debug_assert!(n < LOOKAHEAD, "lookahead {n} exceeds window");
        self.tokens
            .get(self.pos + n)
            .map_or(&TokenKind::Eof, |t| &t.kind)
    }

    pub(crate) fn at_eof(&self) -> bool {
        matches!(self.peek(), TokenKind::Eof)
    }

    pub(crate) fn advance(&mut self) -> Token {
        let tok = self.tokens[self.pos].clone();
        if tok.kind != TokenKind::Eof {
            self.pos += 1;
            self.prev_span = tok.span;
            self.prev_end = tok.end;
        }
        tok
    }

    pub(crate) fn check(&self, kind: &TokenKind) -> bool {
        std::mem::discriminant(self.peek()) == std::mem::discriminant(kind)
    }

    pub(crate) fn eat(&mut self, kind: &TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    pub(crate) fn expect(&mut self, kind: &TokenKind, what: &str) -> PResult<Token> {
        if self.check(kind) {
            Ok(self.advance())
        } else {
            Err(self.err_expected(what))
        }
    }

    pub(crate) fn err_expected(&self, what: &str) -> Diagnostic {
        let tok = self.current();
        Diagnostic::syntax(format!("expected {what}, found {}", tok.kind), tok.range())
    }

    /// Span from `start` to the end of the last consumed token.
    pub(crate) fn span_from(&self, start: Span) -> Span {
        Span::new(start.start, self.prev_span.end.max(start.end))
    }

    pub(crate) fn parse_comma_sep<T>(
        &mut self,
        f: fn(&mut Self) -> PResult<T>,
    ) -> PResult<Vec<T>> {
        let mut v = vec![f(self)?];
        while self.eat(&TokenKind::Comma) {
            v.push(f(self)?);
        }
        Ok(v)
    }

    // -----------------------------------------------------------------------
    // Completion hints
    // -----------------------------------------------------------------------

    /// A hint starting right after the last consumed token.
    pub(crate) fn hint(&self) -> CompletionHint {
        CompletionHint::new(Range::point(self.prev_end))
    }

    pub(crate) fn open_hint(&mut self, hint: CompletionHint) -> usize {
        self.hints.push(hint);
        let idx = self.hints.len() - 1;
        self.open_hints.push(idx);
        idx
    }

    /// End the hint at the start of the next unconsumed token.
    pub(crate) fn close_hint(&mut self, idx: usize) {
        let end = self.current().pos();
        self.hints[idx].range.end = end.max(self.hints[idx].range.start);
        self.open_hints.retain(|&i| i != idx);
    }

    /// A failed clause leaves its hints open; they extend to the error.
    fn close_open_hints(&mut self, end: Pos) {
        for idx in std::mem::take(&mut self.open_hints) {
            let hint = &mut self.hints[idx];
            hint.range.end = end.max(hint.range.start);
        }
    }

    /// Run `f` under `hint`. The hint is closed only if `f` succeeds.
    pub(crate) fn hinted<T>(
        &mut self,
        hint: CompletionHint,
        f: impl FnOnce(&mut Self) -> PResult<T>,
    ) -> PResult<T> {
        let idx = self.open_hint(hint);
        let out = f(self)?;
        self.close_hint(idx);
        Ok(out)
    }

    // -----------------------------------------------------------------------
    // Identifiers
    // -----------------------------------------------------------------------

    pub(crate) fn is_ident_start(kind: &TokenKind) -> bool {
        matches!(kind, TokenKind::Id(_) | TokenKind::QuotedId(_)) || kind.is_soft_keyword()
    }

    pub(crate) fn parse_ident(&mut self) -> PResult<Ident> {
        let tok = self.current().clone();
        let (name, quoted) = match tok.kind {
            TokenKind::Id(name) => (name, false),
            TokenKind::QuotedId(name) => (name, true),
            ref kw if kw.is_soft_keyword() => (
                kw.keyword_str().unwrap_or_default().to_ascii_lowercase(),
                false,
            ),
            _ => return Err(self.err_expected("identifier")),
        };
        self.advance();
        Ok(Ident {
            name,
            quoted,
            span: tok.span,
        })
    }

    fn parse_ident_list(&mut self) -> PResult<Vec<Ident>> {
        self.expect(&TokenKind::LeftParen, "'('")?;
        let idents = self.parse_comma_sep(Self::parse_ident)?;
        self.expect(&TokenKind::RightParen, "')'")?;
        Ok(idents)
    }

    /// `[AS] alias`. Without `AS`, only a plain or quoted identifier counts.
    fn parse_alias(&mut self) -> PResult<Option<Ident>> {
        if self.eat(&TokenKind::KwAs) {
            return self.parse_ident().map(Some);
        }
        if matches!(self.peek(), TokenKind::Id(_) | TokenKind::QuotedId(_)) {
            return self.parse_ident().map(Some);
        }
        Ok(None)
    }

    fn table_hint(&self) -> CompletionHint {
        self.hint().tables()
    }

    fn column_hint(&self, table: &Ident) -> CompletionHint {
        self.hint()
            .columns(ColumnSuggestion::Table(table.name.clone()))
    }

    // -----------------------------------------------------------------------
    // Statement dispatch
    // -----------------------------------------------------------------------

    fn parse_statement(&mut self) -> PResult<Statement> {
        let first = self.current().clone();
        let kind = match first.kind {
            TokenKind::KwSelect => StatementKind::Select(self.parse_select()?),
            TokenKind::KwInsert => StatementKind::Insert(self.parse_insert()?),
            TokenKind::KwUpdate => StatementKind::Update(self.parse_update()?),
            TokenKind::KwDelete => StatementKind::Delete(self.parse_delete()?),
            TokenKind::KwCreate => StatementKind::CreateTable(self.parse_create_table()?),
            TokenKind::KwAlter => StatementKind::AlterTable(self.parse_alter_table()?),
            TokenKind::KwDrop => StatementKind::DropTable(self.parse_drop_table()?),
            _ => return Err(self.err_expected("statement")),
        };
        Ok(Statement {
            kind,
            span: self.span_from(first.span),
            leading_comment: first.leading_comment,
        })
    }

    // -----------------------------------------------------------------------
    // SELECT
    // -----------------------------------------------------------------------

    pub(crate) fn parse_select(&mut self) -> PResult<SelectStatement> {
        let start = self.expect(&TokenKind::KwSelect, "SELECT")?.span;
        let distinct = if self.eat(&TokenKind::KwDistinct) {
            true
        } else {
            self.eat(&TokenKind::KwAll);
            false
        };

        let columns = self.hinted(
            self.hint()
                .columns(ColumnSuggestion::All)
                .keywords(&["DISTINCT", "FROM"]),
            |p| p.parse_comma_sep(Self::parse_result_column),
        )?;

        let from = if self.eat(&TokenKind::KwFrom) {
            Some(self.hinted(
                self.table_hint().keywords(AFTER_FROM_KEYWORDS),
                Self::parse_from,
            )?)
        } else {
            None
        };

        let where_clause = if self.eat(&TokenKind::KwWhere) {
            Some(self.hinted(
                self.hint()
                    .columns(ColumnSuggestion::All)
                    .keywords(CONDITION_KEYWORDS),
                Self::parse_expr,
            )?)
        } else {
            None
        };

        let group_by = if self.check(&TokenKind::KwGroup) {
            Some(self.parse_group_by()?)
        } else {
            None
        };
        let order_by = if self.check(&TokenKind::KwOrder) {
            Some(self.parse_order_by()?)
        } else {
            None
        };
        let limit = if self.check(&TokenKind::KwLimit) {
            Some(self.parse_limit()?)
        } else {
            None
        };

        Ok(SelectStatement {
            distinct,
            columns,
            from,
            where_clause,
            group_by,
            order_by,
            limit,
            span: self.span_from(start),
            result: None,
        })
    }

    fn parse_result_column(&mut self) -> PResult<ResultColumn> {
        if self.check(&TokenKind::Star) {
            return Ok(ResultColumn::Star(self.advance().span));
        }
        if Self::is_ident_start(self.peek())
            && self.peek_nth(1) == &TokenKind::Dot
            && self.peek_nth(2) == &TokenKind::Star
        {
            let table = self.parse_ident()?;
            self.advance();
            self.advance();
            return Ok(ResultColumn::TableStar(table));
        }
        let expr = self.parse_expr()?;
        let alias = self.parse_alias()?;
        Ok(ResultColumn::Expr { expr, alias })
    }

    fn parse_from(&mut self) -> PResult<FromClause> {
        let source = self.parse_table_or_subquery()?;
        let mut joins = Vec::new();
        loop {
            let start = self.current().span;
            let natural = self.eat(&TokenKind::KwNatural);
            let operator = if !natural && self.eat(&TokenKind::Comma) {
                JoinOperator::Comma
            } else if self.eat(&TokenKind::KwLeft) {
                let outer = self.eat(&TokenKind::KwOuter);
                self.expect(&TokenKind::KwJoin, "JOIN")?;
                if outer {
                    JoinOperator::LeftOuter
                } else {
                    JoinOperator::Left
                }
            } else if self.eat(&TokenKind::KwInner) {
                self.expect(&TokenKind::KwJoin, "JOIN")?;
                JoinOperator::Inner
            } else if self.eat(&TokenKind::KwCross) {
                self.expect(&TokenKind::KwJoin, "JOIN")?;
                JoinOperator::Cross
            } else if self.eat(&TokenKind::KwJoin) {
                JoinOperator::Plain
            } else if natural {
                return Err(self.err_expected("JOIN"));
            } else {
                break;
            };

            let table = self.hinted(self.table_hint(), Self::parse_table_or_subquery)?;
            let on = if self.eat(&TokenKind::KwOn) {
                Some(self.hinted(
                    self.hint()
                        .columns(ColumnSuggestion::All)
                        .keywords(CONDITION_KEYWORDS),
                    Self::parse_expr,
                )?)
            } else {
                None
            };
            joins.push(Join {
                natural,
                operator,
                table,
                on,
                span: self.span_from(start),
            });
        }
        Ok(FromClause { source, joins })
    }

    fn parse_table_or_subquery(&mut self) -> PResult<TableOrSubquery> {
        if self.check(&TokenKind::LeftParen) && self.peek_nth(1) == &TokenKind::KwSelect {
            let open = self.advance().span;
            let select = self.parse_select()?;
            self.expect(&TokenKind::RightParen, "')'")?;
            let span = self.span_from(open);
            let alias = self.parse_alias()?;
            return Ok(TableOrSubquery::Subquery {
                select: Box::new(select),
                alias,
                span,
            });
        }
        let name = self.parse_ident()?;
        let alias = self.parse_alias()?;
        Ok(TableOrSubquery::Table {
            name,
            alias,
            binding: None,
        })
    }

    fn parse_group_by(&mut self) -> PResult<GroupBy> {
        let start = self.advance().span;
        self.expect(&TokenKind::KwBy, "BY")?;
        let exprs = self.hinted(
            self.hint()
                .columns(ColumnSuggestion::All)
                .keywords(&["HAVING", "ORDER BY", "LIMIT"]),
            |p| p.parse_comma_sep(Self::parse_expr),
        )?;
        let having = if self.eat(&TokenKind::KwHaving) {
            Some(self.hinted(
                self.hint()
                    .columns(ColumnSuggestion::All)
                    .keywords(CONDITION_KEYWORDS),
                Self::parse_expr,
            )?)
        } else {
            None
        };
        Ok(GroupBy {
            exprs,
            having,
            span: self.span_from(start),
        })
    }

    fn parse_order_by(&mut self) -> PResult<OrderBy> {
        let start = self.advance().span;
        self.expect(&TokenKind::KwBy, "BY")?;
        let terms = self.hinted(
            self.hint()
                .columns(ColumnSuggestion::All)
                .keywords(&["ASC", "DESC", "NULLS FIRST", "NULLS LAST", "LIMIT"]),
            |p| p.parse_comma_sep(Self::parse_ordering_term),
        )?;
        Ok(OrderBy {
            terms,
            span: self.span_from(start),
        })
    }

    fn parse_ordering_term(&mut self) -> PResult<OrderingTerm> {
        let expr = self.parse_expr()?;
        let direction = self.parse_direction();
        let nulls = if self.eat(&TokenKind::KwNulls) {
            if self.eat(&TokenKind::KwFirst) {
                Some(NullsOrder::First)
            } else if self.eat(&TokenKind::KwLast) {
                Some(NullsOrder::Last)
            } else {
                return Err(self.err_expected("FIRST or LAST"));
            }
        } else {
            None
        };
        Ok(OrderingTerm {
            expr,
            direction,
            nulls,
        })
    }

    fn parse_direction(&mut self) -> Option<SortDirection> {
        if self.eat(&TokenKind::KwAsc) {
            Some(SortDirection::Asc)
        } else if self.eat(&TokenKind::KwDesc) {
            Some(SortDirection::Desc)
        } else {
            None
        }
    }

    /// `LIMIT n [OFFSET m]` or `LIMIT m, n`.
    fn parse_limit(&mut self) -> PResult<Limit> {
        let start = self.advance().span;
        let first = self.parse_expr()?;
        let (limit, offset) = if self.eat(&TokenKind::KwOffset) {
            (first, Some(self.parse_expr()?))
        } else if self.eat(&TokenKind::Comma) {
            (self.parse_expr()?, Some(first))
        } else {
            (first, None)
        };
        Ok(Limit {
            limit,
            offset,
            span: self.span_from(start),
        })
    }

    // -----------------------------------------------------------------------
    // INSERT / UPDATE / DELETE
    // -----------------------------------------------------------------------

    fn parse_insert(&mut self) -> PResult<InsertStatement> {
        self.advance();
        self.expect(&TokenKind::KwInto, "INTO")?;
        let table = self.hinted(self.table_hint(), Self::parse_ident)?;

        let columns = if self.check(&TokenKind::LeftParen) {
            self.hinted(self.column_hint(&table), Self::parse_ident_list)?
        } else {
            Vec::new()
        };

        let values_hint = self.open_hint(self.hint().keywords(&["VALUES"]));
        self.expect(&TokenKind::KwValues, "VALUES")?;
        self.close_hint(values_hint);
        let rows = self.hinted(self.hint().wrapped("(", ")"), |p| {
            p.parse_comma_sep(Self::parse_value_row)
        })?;

        Ok(InsertStatement {
            table,
            binding: None,
            columns,
            rows,
            targets: Vec::new(),
        })
    }

    fn parse_value_row(&mut self) -> PResult<ValueRow> {
        let open = self.expect(&TokenKind::LeftParen, "'('")?.span;
        let values = if self.check(&TokenKind::RightParen) {
            Vec::new()
        } else {
            self.parse_comma_sep(Self::parse_expr)?
        };
        self.expect(&TokenKind::RightParen, "')'")?;
        Ok(ValueRow {
            values,
            span: self.span_from(open),
        })
    }

    fn parse_update(&mut self) -> PResult<UpdateStatement> {
        self.advance();
        let table = self.hinted(self.table_hint(), Self::parse_ident)?;
        self.expect(&TokenKind::KwSet, "SET")?;
        let assignments = self.hinted(self.column_hint(&table), |p| {
            p.parse_comma_sep(Self::parse_assignment)
        })?;
        let where_clause = self.parse_table_where(&table)?;
        Ok(UpdateStatement {
            table,
            binding: None,
            assignments,
            where_clause,
        })
    }

    fn parse_assignment(&mut self) -> PResult<Assignment> {
        let column = self.parse_ident()?;
        self.expect(&TokenKind::Eq, "'='")?;
        let value = self.parse_expr()?;
        Ok(Assignment {
            column,
            binding: None,
            value,
        })
    }

    fn parse_delete(&mut self) -> PResult<DeleteStatement> {
        self.advance();
        self.expect(&TokenKind::KwFrom, "FROM")?;
        let table = self.hinted(self.table_hint(), Self::parse_ident)?;
        let where_clause = self.parse_table_where(&table)?;
        Ok(DeleteStatement {
            table,
            binding: None,
            where_clause,
        })
    }

    /// Optional WHERE clause of a single-table statement.
    fn parse_table_where(&mut self, table: &Ident) -> PResult<Option<Expr>> {
        if !self.eat(&TokenKind::KwWhere) {
            return Ok(None);
        }
        let hint = self.column_hint(table).keywords(CONDITION_KEYWORDS);
        self.hinted(hint, Self::parse_expr).map(Some)
    }

    // -----------------------------------------------------------------------
    // CREATE TABLE
    // -----------------------------------------------------------------------

    fn parse_create_table(&mut self) -> PResult<CreateTableStatement> {
        self.advance();
        self.expect(&TokenKind::KwTable, "TABLE")?;
        let if_not_exists = if self.check(&TokenKind::KwIf) && self.peek_nth(1) == &TokenKind::KwNot {
            self.advance();
            self.advance();
            self.expect(&TokenKind::KwExists, "EXISTS")?;
            true
        } else {
            false
        };
        let name = self.parse_ident()?;
        self.expect(&TokenKind::LeftParen, "'('")?;

        let mut columns = Vec::new();
        let mut constraints = Vec::new();
        loop {
            if Self::starts_table_constraint(self.peek()) {
                constraints.push(self.parse_table_constraint()?);
            } else {
                columns.push(self.parse_column_def()?);
            }
            if !self.eat(&TokenKind::Comma) {
                break;
            }
        }
        self.expect(&TokenKind::RightParen, "')'")?;

        Ok(CreateTableStatement {
            if_not_exists,
            name,
            columns,
            constraints,
            binding: None,
        })
    }

    fn starts_table_constraint(kind: &TokenKind) -> bool {
        matches!(
            kind,
            TokenKind::KwConstraint
                | TokenKind::KwPrimary
                | TokenKind::KwUnique
                | TokenKind::KwCheck
                | TokenKind::KwForeign
        )
    }

    fn parse_column_def(&mut self) -> PResult<ColumnDef> {
        let name = self.parse_ident()?;
        let type_keywords: Vec<&'static str> = Builtin::ALL.iter().map(|b| b.name()).collect();
        let type_name = self.hinted(self.hint().keywords(&type_keywords), |p| {
            if matches!(p.peek(), TokenKind::Id(_)) {
                p.parse_type_name().map(Some)
            } else {
                Ok(None)
            }
        })?;

        let constraints = self.hinted(
            self.hint().keywords(COLUMN_CONSTRAINT_KEYWORDS),
            |p| {
                let mut constraints = Vec::new();
                while let Some(c) = p.parse_column_constraint()? {
                    constraints.push(c);
                }
                Ok(constraints)
            },
        )?;

        Ok(ColumnDef {
            span: self.span_from(name.span),
            name,
            type_name,
            constraints,
            ty: None,
            binding: None,
        })
    }

    /// Type words followed by an optional parameter list, e.g. `varchar(40)`.
    fn parse_type_name(&mut self) -> PResult<TypeName> {
        let start = self.current().span;
        let mut words = Vec::new();
        while let TokenKind::Id(word) = self.peek() {
            words.push(word.clone());
            self.advance();
        }
        if words.is_empty() {
            return Err(self.err_expected("type name"));
        }
        let params = if self.eat(&TokenKind::LeftParen) {
            let params = self.parse_comma_sep(Self::parse_type_param)?;
            self.expect(&TokenKind::RightParen, "')'")?;
            params
        } else {
            Vec::new()
        };
        Ok(TypeName {
            name: words.join(" "),
            params,
            span: self.span_from(start),
        })
    }

    fn parse_type_param(&mut self) -> PResult<u32> {
        let tok = self.current().clone();
        if let TokenKind::Integer(value) = tok.kind {
            self.advance();
            u32::try_from(value).map_err(|_| {
                Diagnostic::syntax(
                    format!("type parameter {value} is out of range"),
                    tok.range(),
                )
            })
        } else {
            Err(self.err_expected("type parameter"))
        }
    }

    fn parse_column_constraint(&mut self) -> PResult<Option<ColumnConstraint>> {
        let start = self.current().span;
        let name = if self.eat(&TokenKind::KwConstraint) {
            Some(self.parse_ident()?)
        } else {
            None
        };
        let kind = match self.peek() {
            TokenKind::KwNot => {
                self.advance();
                self.expect(&TokenKind::KwNull, "NULL")?;
                ColumnConstraintKind::NotNull
            }
            TokenKind::KwNull => {
                self.advance();
                ColumnConstraintKind::Null
            }
            TokenKind::KwDefault => {
                self.advance();
                ColumnConstraintKind::Default(self.parse_default_value()?)
            }
            TokenKind::KwPrimary => {
                self.advance();
                self.expect(&TokenKind::KwKey, "KEY")?;
                let direction = self.parse_direction();
                let autoincrement = self.eat(&TokenKind::KwAutoincrement);
                ColumnConstraintKind::PrimaryKey {
                    direction,
                    autoincrement,
                }
            }
            TokenKind::KwUnique => {
                self.advance();
                ColumnConstraintKind::Unique
            }
            TokenKind::KwReferences => {
                ColumnConstraintKind::References(self.parse_foreign_key_clause()?)
            }
            TokenKind::KwCollate => {
                self.advance();
                ColumnConstraintKind::Collate(self.parse_ident()?)
            }
            TokenKind::KwCheck => {
                self.advance();
                ColumnConstraintKind::Check(self.parse_parenthesized_expr()?)
            }
            _ if name.is_some() => return Err(self.err_expected("column constraint")),
            _ => return Ok(None),
        };
        Ok(Some(ColumnConstraint {
            name,
            kind,
            span: self.span_from(start),
        }))
    }

    /// A literal, a signed number, a bare name such as `CURRENT_TIMESTAMP`,
    /// or a parenthesized expression.
    fn parse_default_value(&mut self) -> PResult<Expr> {
        if let Some(lit) = self.parse_literal() {
            return Ok(lit);
        }
        match self.peek() {
            TokenKind::LeftParen => {
                let start = self.current().span;
                let inner = self.parse_parenthesized_expr()?;
                Ok(Expr::new(
                    ExprKind::Brackets(Box::new(inner)),
                    self.span_from(start),
                ))
            }
            TokenKind::Minus | TokenKind::Plus => {
                if matches!(self.peek_nth(1), TokenKind::Integer(_) | TokenKind::Float(_)) {
                    self.parse_expr_bp(crate::expr::UNARY_BP)
                } else {
                    Err(self.err_expected("number"))
                }
            }
            kind if Self::is_ident_start(kind) => Ok(Expr::ident(self.parse_ident()?)),
            _ => Err(self.err_expected("default value")),
        }
    }

    fn parse_parenthesized_expr(&mut self) -> PResult<Expr> {
        self.expect(&TokenKind::LeftParen, "'('")?;
        let expr = self.parse_expr()?;
        self.expect(&TokenKind::RightParen, "')'")?;
        Ok(expr)
    }

    fn parse_foreign_key_clause(&mut self) -> PResult<ForeignKeyClause> {
        self.expect(&TokenKind::KwReferences, "REFERENCES")?;
        let table = self.hinted(self.table_hint(), Self::parse_ident)?;
        let columns = if self.check(&TokenKind::LeftParen) {
            self.hinted(self.column_hint(&table), Self::parse_ident_list)?
        } else {
            Vec::new()
        };
        Ok(ForeignKeyClause { table, columns })
    }

    fn parse_table_constraint(&mut self) -> PResult<TableConstraint> {
        let start = self.current().span;
        let name = if self.eat(&TokenKind::KwConstraint) {
            Some(self.parse_ident()?)
        } else {
            None
        };
        let kind = match self.peek() {
            TokenKind::KwPrimary => {
                self.advance();
                self.expect(&TokenKind::KwKey, "KEY")?;
                TableConstraintKind::PrimaryKey(self.parse_ident_list()?)
            }
            TokenKind::KwUnique => {
                self.advance();
                TableConstraintKind::Unique(self.parse_ident_list()?)
            }
            TokenKind::KwCheck => {
                self.advance();
                TableConstraintKind::Check(self.parse_parenthesized_expr()?)
            }
            TokenKind::KwForeign => {
                self.advance();
                self.expect(&TokenKind::KwKey, "KEY")?;
                let columns = self.parse_ident_list()?;
                let clause = self.parse_foreign_key_clause()?;
                TableConstraintKind::ForeignKey { columns, clause }
            }
            _ => return Err(self.err_expected("PRIMARY KEY, UNIQUE, CHECK, or FOREIGN KEY")),
        };
        Ok(TableConstraint {
            name,
            kind,
            span: self.span_from(start),
        })
    }

    // -----------------------------------------------------------------------
    // ALTER TABLE / DROP TABLE
    // -----------------------------------------------------------------------

    fn parse_alter_table(&mut self) -> PResult<AlterTableStatement> {
        self.advance();
        self.expect(&TokenKind::KwTable, "TABLE")?;
        let table = self.hinted(self.table_hint(), Self::parse_ident)?;

        let action_hint = self.open_hint(self.hint().keywords(&[
            "ADD COLUMN",
            "DROP COLUMN",
            "RENAME TO",
            "RENAME COLUMN",
        ]));
        let action = match self.peek() {
            TokenKind::KwAdd => {
                self.advance();
                self.eat(&TokenKind::KwColumn);
                self.close_hint(action_hint);
                AlterTableAction::AddColumn(self.parse_column_def()?)
            }
            TokenKind::KwDrop => {
                self.advance();
                self.eat(&TokenKind::KwColumn);
                self.close_hint(action_hint);
                AlterTableAction::DropColumn(
                    self.hinted(self.column_hint(&table), Self::parse_ident)?,
                )
            }
            TokenKind::KwRename => {
                self.advance();
                if self.eat(&TokenKind::KwTo) {
                    self.close_hint(action_hint);
                    AlterTableAction::RenameTo(self.parse_ident()?)
                } else {
                    self.eat(&TokenKind::KwColumn);
                    self.close_hint(action_hint);
                    let from = self.hinted(self.column_hint(&table), Self::parse_ident)?;
                    self.expect(&TokenKind::KwTo, "TO")?;
                    let to = self.parse_ident()?;
                    AlterTableAction::RenameColumn { from, to }
                }
            }
            _ => return Err(self.err_expected("ADD, DROP, or RENAME")),
        };

        Ok(AlterTableStatement {
            table,
            binding: None,
            action,
        })
    }

    fn parse_drop_table(&mut self) -> PResult<DropTableStatement> {
        self.advance();
        self.expect(&TokenKind::KwTable, "TABLE")?;
        let if_exists = if self.check(&TokenKind::KwIf) && self.peek_nth(1) == &TokenKind::KwExists {
            self.advance();
            self.advance();
            true
        } else {
            false
        };
        let table = self.hinted(self.table_hint(), Self::parse_ident)?;
        Ok(DropTableStatement {
            if_exists,
            table,
            binding: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use sqlfront_ast::{BinaryOperator, Literal};

    use super::*;
    use crate::lexer::lex;

    fn parse_sql(sql: &str) -> ParseOutput {
        parse(&lex(sql).tokens)
    }

    fn parse_one(sql: &str) -> Statement {
        let out = parse_sql(sql);
        assert!(out.errors.is_empty(), "errors for {sql:?}: {:?}", out.errors);
        assert_eq!(out.statements.len(), 1);
        out.statements.into_iter().next().unwrap()
    }

    fn select(sql: &str) -> SelectStatement {
        match parse_one(sql).kind {
            StatementKind::Select(s) => s,
            other => panic!("expected SELECT, got {other:?}"),
        }
    }

    #[test]
    fn test_select_clauses() {
        let s = select(
            "SELECT DISTINCT a, b AS x FROM t WHERE a = 1 GROUP BY a HAVING count(*) > 1 \
             ORDER BY x DESC NULLS LAST LIMIT 10 OFFSET 5",
        );
        assert!(s.distinct);
        assert_eq!(s.columns.len(), 2);
        assert!(s.where_clause.is_some());
        let group = s.group_by.unwrap();
        assert_eq!(group.exprs.len(), 1);
        assert!(group.having.is_some());
        let order = s.order_by.unwrap();
        assert_eq!(order.terms[0].direction, Some(SortDirection::Desc));
        assert_eq!(order.terms[0].nulls, Some(NullsOrder::Last));
        let limit = s.limit.unwrap();
        assert!(limit.offset.is_some());
    }

    #[test]
    fn test_limit_comma_form_swaps() {
        let s = select("SELECT a FROM t LIMIT 5, 10");
        let limit = s.limit.unwrap();
        assert_eq!(limit.limit.as_literal(), Some(Literal::Integer(10)));
        assert_eq!(limit.offset.unwrap().as_literal(), Some(Literal::Integer(5)));
    }

    #[test]
    fn test_joins() {
        let s = select(
            "SELECT * FROM a, b NATURAL JOIN c LEFT OUTER JOIN d ON a.x = d.x \
             INNER JOIN e f ON 1 CROSS JOIN g",
        );
        let from = s.from.unwrap();
        let ops: Vec<_> = from.joins.iter().map(|j| (j.natural, j.operator)).collect();
        assert_eq!(
            ops,
            vec![
                (false, JoinOperator::Comma),
                (true, JoinOperator::Plain),
                (false, JoinOperator::LeftOuter),
                (false, JoinOperator::Inner),
                (false, JoinOperator::Cross),
            ]
        );
        assert!(from.joins[2].on.is_some());
        assert_eq!(from.joins[3].table.alias().unwrap().name, "f");
    }

    #[test]
    fn test_table_star_and_subquery_source() {
        let s = select("SELECT t.*, u.id FROM (SELECT id FROM x) AS u, t");
        assert!(matches!(&s.columns[0], ResultColumn::TableStar(t) if t.name == "t"));
        let from = s.from.unwrap();
        assert!(matches!(from.source, TableOrSubquery::Subquery { .. }));
        assert_eq!(from.source.alias().unwrap().name, "u");
    }

    #[test]
    fn test_insert_with_columns_and_rows() {
        let stmt = parse_one("INSERT INTO t (a, b) VALUES (1, 'x'), (2, NULL)");
        let StatementKind::Insert(ins) = stmt.kind else {
            panic!("expected INSERT");
        };
        assert_eq!(ins.columns.len(), 2);
        assert_eq!(ins.rows.len(), 2);
        assert_eq!(ins.rows[1].values[1].as_literal(), Some(Literal::Null));
    }

    #[test]
    fn test_update_and_delete() {
        let stmt = parse_one("UPDATE t SET a = a + 1, b = 'q' WHERE id = 3");
        let StatementKind::Update(up) = stmt.kind else {
            panic!("expected UPDATE");
        };
        assert_eq!(up.assignments.len(), 2);
        assert!(up.where_clause.is_some());

        let stmt = parse_one("DELETE FROM t");
        assert!(matches!(stmt.kind, StatementKind::Delete(d) if d.where_clause.is_none()));
    }

    #[test]
    fn test_create_table_constraints() {
        let stmt = parse_one(
            "CREATE TABLE IF NOT EXISTS orders (\
               id integer PRIMARY KEY AUTOINCREMENT,\
               customer integer NOT NULL REFERENCES customers(id),\
               price decimal(10, 2) DEFAULT -1.5,\
               note varchar(20) COLLATE nocase CHECK (length(note) > 0),\
               CONSTRAINT u UNIQUE (customer, price)\
             )",
        );
        let StatementKind::CreateTable(ct) = stmt.kind else {
            panic!("expected CREATE TABLE");
        };
        assert!(ct.if_not_exists);
        assert_eq!(ct.columns.len(), 4);
        assert_eq!(ct.constraints.len(), 1);
        let price = &ct.columns[2];
        let ty = price.type_name.as_ref().unwrap();
        assert_eq!((ty.name.as_str(), ty.params.as_slice()), ("decimal", &[10, 2][..]));
        assert!(price.has_constraint(|k| matches!(
            k,
            ColumnConstraintKind::Default(e) if e.as_literal() == Some(Literal::Float(-1.5))
        )));
        assert!(ct.columns[0].has_constraint(|k| matches!(
            k,
            ColumnConstraintKind::PrimaryKey { autoincrement: true, .. }
        )));
        assert_eq!(ct.constraints[0].name.as_ref().unwrap().name, "u");
    }

    #[test]
    fn test_multi_word_type_name() {
        let stmt = parse_one("CREATE TABLE t (x double precision, y)");
        let StatementKind::CreateTable(ct) = stmt.kind else {
            panic!("expected CREATE TABLE");
        };
        assert_eq!(ct.columns[0].type_name.as_ref().unwrap().name, "double precision");
        assert!(ct.columns[1].type_name.is_none());
    }

    #[test]
    fn test_alter_table_actions() {
        let cases = [
            ("ALTER TABLE t ADD COLUMN c int", "add"),
            ("ALTER TABLE t ADD c int", "add"),
            ("ALTER TABLE t DROP COLUMN c", "drop"),
            ("ALTER TABLE t RENAME TO u", "rename-table"),
            ("ALTER TABLE t RENAME COLUMN a TO b", "rename-column"),
            ("ALTER TABLE t RENAME a TO b", "rename-column"),
        ];
        for (sql, expected) in cases {
            let StatementKind::AlterTable(alter) = parse_one(sql).kind else {
                panic!("expected ALTER TABLE for {sql}");
            };
            let got = match alter.action {
                AlterTableAction::AddColumn(_) => "add",
                AlterTableAction::DropColumn(_) => "drop",
                AlterTableAction::RenameTo(_) => "rename-table",
                AlterTableAction::RenameColumn { .. } => "rename-column",
            };
            assert_eq!(got, expected, "{sql}");
        }
    }

    #[test]
    fn test_drop_table_if_exists() {
        let stmt = parse_one("DROP TABLE IF EXISTS t");
        assert!(matches!(stmt.kind, StatementKind::DropTable(d) if d.if_exists));
    }

    #[test]
    fn test_statement_span_excludes_semicolon() {
        let sql = "  select 1 ;select 2";
        let out = parse_sql(sql);
        assert_eq!(out.statements.len(), 2);
        assert_eq!(out.statements[0].span.slice(sql), "select 1");
        assert_eq!(out.statements[1].span.slice(sql), "select 2");
    }

    #[test]
    fn test_leading_comment_on_statement() {
        let sql = "-- all rows\nselect * from t";
        let stmt = parse_one(sql);
        assert_eq!(stmt.leading_comment.unwrap().slice(sql), "-- all rows");
    }

    #[test]
    fn test_recovery_continues_after_bad_statement() {
        let out = parse_sql("select from; select a from t; garbage; drop table x");
        assert_eq!(out.errors.len(), 2);
        assert_eq!(out.statements.len(), 2);
        assert_eq!(out.errors[0].message, "expected expression, found FROM");
        assert_eq!(out.errors[1].message, "unexpected token identifier garbage");
    }

    #[test]
    fn test_missing_separator_reported() {
        let out = parse_sql("select a from t u v");
        assert_eq!(out.statements.len(), 1);
        assert_eq!(out.errors.len(), 1);
        assert_eq!(
            out.errors[0].message,
            "expected ';' or end of input, found identifier v"
        );
    }

    #[test]
    fn test_error_positions_point_at_token() {
        let out = parse_sql("select a\nfrom t where");
        assert_eq!(out.errors.len(), 1);
        assert_eq!(out.errors[0].message, "expected expression, found end of input");
        assert_eq!(out.errors[0].range.start, Pos::new(1, 12));
    }

    #[test]
    fn test_hints_for_select_clauses() {
        let out = parse_sql("select a from t where b = 1");
        // Inside the column list.
        let h = out.hints.at(Pos::new(0, 8)).unwrap();
        assert_eq!(h.columns, ColumnSuggestion::All);
        assert!(!h.tables);
        // Right after the table name.
        let h = out.hints.at(Pos::new(0, 15)).unwrap();
        assert!(h.tables);
        assert!(h.keywords.contains(&"WHERE"));
        // Inside WHERE.
        let h = out.hints.at(Pos::new(0, 23)).unwrap();
        assert_eq!(h.columns, ColumnSuggestion::All);
        // Before the statement.
        let h = out.hints.at(Pos::new(0, 0)).unwrap();
        assert!(h.keywords.contains(&"SELECT"));
    }

    #[test]
    fn test_hints_survive_incomplete_input() {
        let out = parse_sql("select name from customers where ");
        assert_eq!(out.errors.len(), 1);
        let h = out.hints.at(Pos::new(0, 33)).unwrap();
        assert_eq!(h.columns, ColumnSuggestion::All);

        let out = parse_sql("select customers. from customers");
        let h = out.hints.at(Pos::new(0, 17)).unwrap();
        assert_eq!(h.columns, ColumnSuggestion::Table("customers".to_owned()));
    }

    #[test]
    fn test_hints_for_single_table_statements() {
        let out = parse_sql("update t set a = 1 where b = 2");
        let h = out.hints.at(Pos::new(0, 13)).unwrap();
        assert_eq!(h.columns, ColumnSuggestion::Table("t".to_owned()));
        let h = out.hints.at(Pos::new(0, 7)).unwrap();
        assert!(h.tables);
    }

    #[test]
    fn test_soft_keywords_as_identifiers() {
        let s = select("select first, key from t");
        let ResultColumn::Expr { expr, .. } = &s.columns[0] else {
            panic!("expected expression column");
        };
        assert!(matches!(&expr.kind, ExprKind::Identifier(i) if i.name == "first"));
    }

    #[test]
    fn test_where_precedence() {
        let s = select("select a from t where a = 1 or b = 2 and c = 3");
        let w = s.where_clause.unwrap();
        let ExprKind::BinaryOp { op, right, .. } = &w.kind else {
            panic!("expected binary op");
        };
        assert_eq!(*op, BinaryOperator::Or);
        assert!(matches!(
            right.kind,
            ExprKind::BinaryOp {
                op: BinaryOperator::And,
                ..
            }
        ));
    }
}
