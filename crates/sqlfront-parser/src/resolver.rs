//! Name resolution and type checking.
//!
//! Binds every table and column reference in a statement list against a
//! [`Catalog`], fills the `ty` and `binding` slots of the AST, and records a
//! [`ScopeTree`] for cursor queries. Problems become diagnostics; an
//! expression whose type cannot be determined resolves to `None`, which
//! silences follow-up errors for the enclosing subtree.
//!
//! CREATE, ALTER, and DROP TABLE update the working catalog, so later
//! statements in the same source see the tables earlier ones define.

use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};

use sqlfront_ast::{
    AlterTableAction, AlterTableStatement, BinaryOperator, Binding, ColumnConstraintKind, ColumnDef,
    CreateTableStatement, DeleteStatement, DropTableStatement, Expr, ExprKind, ForeignKeyClause,
    Ident, InsertStatement, MethodArgs, ResultColumn, SelectStatement, Span, Statement,
    StatementKind, TableConstraintKind, TableOrSubquery, UpdateStatement,
};
use sqlfront_error::{Diagnostic, Diagnostics, LineIndex, Pos, Range};
use sqlfront_types::datetime::{
    DATE_FORMAT_HINT, DATETIME_FORMAT_HINT, is_valid_date, is_valid_datetime,
};
use sqlfront_types::{
    Builtin, Catalog, Column, ColumnId, MethodMatch, SqlType, TableId, TableOrigin, methods,
};

use crate::scope::{ScopeId, ScopeTree};

// ---------------------------------------------------------------------------
// Metrics
// ---------------------------------------------------------------------------

static SQLFRONT_STATEMENTS_RESOLVED_TOTAL: AtomicU64 = AtomicU64::new(0);
static SQLFRONT_SEMANTIC_ERRORS_TOTAL: AtomicU64 = AtomicU64::new(0);

/// Point-in-time snapshot of resolver counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ResolveMetricsSnapshot {
    pub sqlfront_statements_resolved_total: u64,
    pub sqlfront_semantic_errors_total: u64,
}

#[must_use]
pub fn resolve_metrics_snapshot() -> ResolveMetricsSnapshot {
    ResolveMetricsSnapshot {
        sqlfront_statements_resolved_total: SQLFRONT_STATEMENTS_RESOLVED_TOTAL
            .load(Ordering::Relaxed),
        sqlfront_semantic_errors_total: SQLFRONT_SEMANTIC_ERRORS_TOTAL.load(Ordering::Relaxed),
    }
}

pub fn reset_resolve_metrics() {
    SQLFRONT_STATEMENTS_RESOLVED_TOTAL.store(0, Ordering::Relaxed);
    SQLFRONT_SEMANTIC_ERRORS_TOTAL.store(0, Ordering::Relaxed);
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

/// Result of one resolution pass.
#[derive(Debug, Clone)]
pub struct Resolution {
    pub diagnostics: Vec<Diagnostic>,
    pub scopes: ScopeTree,
    /// The working catalog after every statement has been applied.
    pub catalog: Catalog,
}

/// Resolve `statements` in order against `catalog`.
///
/// `dedup_window` is the column distance below which two diagnostics on the
/// same line count as one.
#[must_use]
pub fn resolve(
    statements: &mut [Statement],
    catalog: Catalog,
    index: &LineIndex,
    dedup_window: u32,
) -> Resolution {
    let mut resolver = Resolver::new(catalog, index, dedup_window);
    resolver.resolve_all(statements);
    resolver.finish()
}

/// Maximum edit distance for a "did you mean" suggestion.
const SUGGESTION_DISTANCE: usize = 2;

pub struct Resolver<'a> {
    catalog: Catalog,
    index: &'a LineIndex,
    diagnostics: Diagnostics,
    scopes: ScopeTree,
    /// Open scopes, innermost last.
    stack: Vec<ScopeId>,
    /// Scopes with a FROM item that failed to resolve. Unknown names below
    /// them are not reported again.
    opaque: HashSet<ScopeId>,
    tables_resolved: u64,
    columns_bound: u64,
}

impl<'a> Resolver<'a> {
    #[must_use]
    pub fn new(catalog: Catalog, index: &'a LineIndex, dedup_window: u32) -> Self {
        let module = Range::new(Pos::default(), index.pos(u32::MAX));
        Self {
            catalog,
            index,
            diagnostics: Diagnostics::new(dedup_window),
            scopes: ScopeTree::new(module),
            stack: Vec::new(),
            opaque: HashSet::new(),
            tables_resolved: 0,
            columns_bound: 0,
        }
    }

    pub fn resolve_all(&mut self, statements: &mut [Statement]) {
        let span = tracing::debug_span!(
            target: "sqlfront.resolve",
            "resolve",
            statements = statements.len(),
            tables_resolved = tracing::field::Empty,
            columns_bound = tracing::field::Empty,
            scopes = tracing::field::Empty,
            diagnostics = tracing::field::Empty,
        );
        let _guard = span.enter();

        for stmt in statements.iter_mut() {
            self.resolve_statement(stmt);
        }

        span.record("tables_resolved", self.tables_resolved);
        span.record("columns_bound", self.columns_bound);
        span.record("scopes", self.scopes.len());
        span.record("diagnostics", self.diagnostics.len());
    }

    #[must_use]
    pub fn finish(self) -> Resolution {
        let diagnostics = self.diagnostics.into_vec();
        let errors = diagnostics.iter().filter(|d| d.is_error()).count();
        SQLFRONT_SEMANTIC_ERRORS_TOTAL.fetch_add(errors as u64, Ordering::Relaxed);
        Resolution {
            diagnostics,
            scopes: self.scopes,
            catalog: self.catalog,
        }
    }

    fn resolve_statement(&mut self, stmt: &mut Statement) {
        let before = self.diagnostics.len();
        self.enter(stmt.span);
        match &mut stmt.kind {
            StatementKind::Select(select) => {
                self.resolve_select(select, "result");
            }
            StatementKind::Insert(insert) => self.resolve_insert(insert),
            StatementKind::Update(update) => self.resolve_update(update),
            StatementKind::Delete(delete) => self.resolve_delete(delete),
            StatementKind::CreateTable(create) => self.resolve_create_table(create),
            StatementKind::AlterTable(alter) => self.resolve_alter_table(alter),
            StatementKind::DropTable(drop) => self.resolve_drop_table(drop),
        }
        self.leave();
        SQLFRONT_STATEMENTS_RESOLVED_TOTAL.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(
            target: "sqlfront.resolve",
            kind = stmt.kind.keyword(),
            diagnostics = self.diagnostics.len() - before,
            "statement resolved"
        );
    }

    // -----------------------------------------------------------------------
    // Scopes and diagnostics
    // -----------------------------------------------------------------------

    fn current(&self) -> ScopeId {
        self.stack.last().copied().unwrap_or(ScopeId::ROOT)
    }

    fn enter(&mut self, span: Span) -> ScopeId {
        let id = self.scopes.push(self.current(), self.index.range(span));
        self.stack.push(id);
        id
    }

    fn leave(&mut self) {
        self.stack.pop();
    }

    fn range(&self, span: Span) -> Range {
        self.index.range(span)
    }

    fn error(&mut self, message: impl Into<String>, span: Span) {
        let range = self.range(span);
        self.diagnostics.push(Diagnostic::semantic(message, range));
    }

    fn error_with_fix(&mut self, message: impl Into<String>, span: Span, fix: Option<String>) {
        let mut diagnostic = Diagnostic::semantic(message, self.range(span));
        if let Some(fix) = fix {
            diagnostic = diagnostic.with_quick_fix(fix);
        }
        self.diagnostics.push(diagnostic);
    }

    fn warning(&mut self, message: impl Into<String>, span: Span) {
        let range = self.range(span);
        self.diagnostics.push(Diagnostic::warning(message, range));
    }

    /// Bind `table` and all of its columns in the current scope.
    fn bind_table(&mut self, visible_name: &str, table: TableId) {
        let scope = self.current();
        self.scopes.bind_table(scope, visible_name, table);
        for &column in &self.catalog.table(table).columns {
            self.scopes
                .bind_column(scope, &self.catalog.column(column).name, column);
        }
        self.tables_resolved += 1;
    }

    // -----------------------------------------------------------------------
    // Name lookup
    // -----------------------------------------------------------------------

    /// Look up a named table in the catalog, reporting unknown and
    /// ambiguous names.
    fn lookup_catalog_table(&mut self, name: &Ident) -> Option<TableId> {
        match self.catalog.find_tables(&name.name).to_vec().as_slice() {
            [only] => Some(*only),
            [] => {
                let fix = suggest(&name.name, self.catalog.table_names());
                self.error_with_fix(format!("unknown table {}", name.name), name.span, fix);
                None
            }
            _ => {
                self.error(format!("ambiguous table name {}", name.name), name.span);
                None
            }
        }
    }

    /// Look up a table visible in the current scope chain.
    fn lookup_scope_table(&mut self, name: &Ident) -> Option<TableId> {
        let found = self
            .scopes
            .lookup(self.current(), &name.name, |s| !s.tables.is_empty())
            .map(|s| s.tables.clone());
        match found.as_deref() {
            Some([only]) => Some(*only),
            Some(_) => {
                self.error(format!("ambiguous table name {}", name.name), name.span);
                None
            }
            None if self.in_opaque_scope() => None,
            None => {
                let visible: Vec<String> = self
                    .scopes
                    .visible(self.current())
                    .into_iter()
                    .filter(|(_, s)| !s.tables.is_empty())
                    .map(|(n, _)| n.to_owned())
                    .collect();
                let fix = suggest(&name.name, visible.iter().map(String::as_str));
                self.error_with_fix(format!("unknown table {}", name.name), name.span, fix);
                None
            }
        }
    }

    /// Look up a bare column name in the current scope chain.
    fn lookup_scope_column(&mut self, name: &Ident) -> Option<ColumnId> {
        let found = self
            .scopes
            .lookup(self.current(), &name.name, |s| !s.columns.is_empty())
            .map(|s| s.columns.clone());
        match found.as_deref() {
            Some([only]) => Some(*only),
            Some(many) => {
                let tables: Vec<&str> = many
                    .iter()
                    .map(|&c| self.catalog.table(self.catalog.column(c).table).name.as_str())
                    .collect();
                let message = format!(
                    "ambiguous identifier {} (found in {})",
                    name.name,
                    tables.join(", ")
                );
                self.error(message, name.span);
                None
            }
            None if self.in_opaque_scope() => None,
            None => {
                let visible: Vec<String> = self
                    .scopes
                    .visible(self.current())
                    .into_iter()
                    .filter(|(_, s)| !s.columns.is_empty())
                    .map(|(n, _)| n.to_owned())
                    .collect();
                let fix = suggest(&name.name, visible.iter().map(String::as_str));
                self.error_with_fix(format!("unknown identifier {}", name.name), name.span, fix);
                None
            }
        }
    }

    fn in_opaque_scope(&self) -> bool {
        self.scopes
            .ancestors(self.current())
            .any(|scope| self.opaque.contains(&scope))
    }

    /// Look up a column of a known table.
    fn lookup_table_column(&mut self, table: TableId, name: &Ident) -> Option<ColumnId> {
        match self.catalog.find_columns(table, &name.name).as_slice() {
            [only] => {
                self.columns_bound += 1;
                Some(*only)
            }
            [] => {
                let entry = self.catalog.table(table);
                let candidates: Vec<&str> = entry
                    .columns
                    .iter()
                    .map(|&c| self.catalog.column(c).name.as_str())
                    .collect();
                let fix = suggest(&name.name, candidates);
                let message = format!("unknown column {} in table {}", name.name, entry.name);
                self.error_with_fix(message, name.span, fix);
                None
            }
            _ => {
                let message = format!(
                    "ambiguous column {} in table {}",
                    name.name,
                    self.catalog.table(table).name
                );
                self.error(message, name.span);
                None
            }
        }
    }

    // -----------------------------------------------------------------------
    // SELECT
    // -----------------------------------------------------------------------

    /// Resolve a SELECT in a scope of its own and return the synthetic table
    /// holding its output columns.
    fn resolve_select(&mut self, select: &mut SelectStatement, name: &str) -> TableId {
        self.enter(select.span);

        let mut joined: Vec<(String, TableId)> = Vec::new();
        if let Some(from) = &mut select.from {
            self.resolve_source(&mut from.source, &mut joined);
            for join in &mut from.joins {
                self.resolve_source(&mut join.table, &mut joined);
                if let Some(on) = &mut join.on {
                    self.resolve_condition(on, "ON");
                }
            }
        }

        let result = self.catalog.add_table(name, TableOrigin::Derived);
        let mut aliases: Vec<(String, ColumnId)> = Vec::new();
        for column in &mut select.columns {
            match column {
                ResultColumn::Star(span) => {
                    if select.from.is_none() {
                        self.error("'*' requires a FROM clause", *span);
                    }
                    for &(_, table) in &joined {
                        self.copy_columns(table, result);
                    }
                }
                ResultColumn::TableStar(ident) => {
                    let found = joined
                        .iter()
                        .find(|(visible, _)| ident.matches(visible))
                        .map(|&(_, t)| t);
                    match found {
                        Some(table) => self.copy_columns(table, result),
                        None => {
                            let fix = suggest(&ident.name, joined.iter().map(|(n, _)| n.as_str()));
                            self.error_with_fix(
                                format!("unknown table {}", ident.name),
                                ident.span,
                                fix,
                            );
                        }
                    }
                }
                ResultColumn::Expr { expr, alias } => {
                    let ty = self.resolve_term(expr);
                    let column_name = match (alias.as_ref(), &expr.kind) {
                        (Some(alias), _) => alias.name.clone(),
                        (None, ExprKind::Identifier(ident)) => ident.name.clone(),
                        (None, ExprKind::Dot { right, .. }) => right.name.clone(),
                        (None, _) => expr.to_string(),
                    };
                    let id = self
                        .catalog
                        .add_column(result, Column::new(column_name, ty, result));
                    if let Some(alias) = alias {
                        aliases.push((alias.name.clone(), id));
                    }
                }
            }
        }
        select.result = Some(result);

        if let Some(where_clause) = &mut select.where_clause {
            self.resolve_condition(where_clause, "WHERE");
        }
        if let Some(group_by) = &mut select.group_by {
            for expr in &mut group_by.exprs {
                self.resolve_term(expr);
            }
            if let Some(having) = &mut group_by.having {
                self.resolve_condition(having, "HAVING");
            }
        }
        if let Some(order_by) = &mut select.order_by {
            let scope = self.enter(order_by.span);
            for (alias, id) in &aliases {
                self.scopes.bind_column(scope, alias, *id);
            }
            for term in &mut order_by.terms {
                self.resolve_term(&mut term.expr);
            }
            self.leave();
        }
        if let Some(limit) = &mut select.limit {
            for expr in std::iter::once(&mut limit.limit).chain(limit.offset.as_mut()) {
                if let Some(ty) = self.resolve_term(expr) {
                    if !ty.can_cast_to(&SqlType::builtin(Builtin::Integer)) {
                        self.error(format!("LIMIT must be an integer, found {ty}"), expr.span);
                    }
                }
            }
        }

        self.leave();
        result
    }

    /// Bind one FROM item into the current scope.
    fn resolve_source(&mut self, source: &mut TableOrSubquery, joined: &mut Vec<(String, TableId)>) {
        match source {
            TableOrSubquery::Table {
                name,
                alias,
                binding,
            } => {
                let Some(table) = self.lookup_catalog_table(name) else {
                    let scope = self.current();
                    self.opaque.insert(scope);
                    return;
                };
                *binding = Some(table);
                let visible = alias.as_ref().unwrap_or(&*name).name.clone();
                self.bind_table(&visible, table);
                joined.push((visible, table));
            }
            TableOrSubquery::Subquery { select, alias, .. } => {
                let visible = alias
                    .as_ref()
                    .map_or_else(|| "subquery".to_owned(), |a| a.name.clone());
                let table = self.resolve_select(select, &visible);
                if alias.is_some() {
                    self.bind_table(&visible, table);
                } else {
                    // Columns are usable unqualified even without an alias.
                    let scope = self.current();
                    for &column in &self.catalog.table(table).columns {
                        self.scopes
                            .bind_column(scope, &self.catalog.column(column).name, column);
                    }
                }
                joined.push((visible, table));
            }
        }
    }

    /// Append copies of `from`'s columns to the derived table `to`.
    fn copy_columns(&mut self, from: TableId, to: TableId) {
        let columns: Vec<ColumnId> = self.catalog.table(from).columns.clone();
        for id in columns {
            let source = self.catalog.column(id);
            let mut copy = Column::new(source.name.clone(), source.ty.clone(), to);
            copy.primary_key = source.primary_key;
            self.catalog.add_column(to, copy);
        }
    }

    /// Resolve a WHERE / HAVING / ON condition in its own scope and require
    /// a boolean result.
    fn resolve_condition(&mut self, expr: &mut Expr, clause: &str) {
        self.enter(expr.span);
        if let Some(ty) = self.resolve_term(expr) {
            if !ty.is(Builtin::Boolean) {
                self.error(format!("{clause} clause must be boolean, found {ty}"), expr.span);
            }
        }
        self.leave();
    }

    // -----------------------------------------------------------------------
    // Expressions
    // -----------------------------------------------------------------------

    /// Resolve `expr`, record its type on the node, and return it.
    pub fn resolve_term(&mut self, expr: &mut Expr) -> Option<SqlType> {
        let mut binding = None;
        let ty = match &mut expr.kind {
            ExprKind::Constant(literal) => literal.sql_type(),
            ExprKind::Identifier(ident) => {
                let column = self.lookup_scope_column(ident);
                binding = column.map(Binding::Column);
                if column.is_some() {
                    self.columns_bound += 1;
                }
                column.and_then(|c| self.catalog.column(c).ty.clone())
            }
            ExprKind::Dot { left, right } => {
                let column = self.resolve_dot(left, right);
                binding = column.map(Binding::Column);
                column.and_then(|c| self.catalog.column(c).ty.clone())
            }
            ExprKind::BinaryOp { left, op, right } if op.is_membership() => {
                let op = *op;
                self.resolve_membership(left, op, right)
            }
            ExprKind::BinaryOp { left, op, right } => {
                let op = *op;
                let lt = self.resolve_term(left);
                let rt = self.resolve_term(right);
                match (lt, rt) {
                    (Some(lt), Some(rt)) => {
                        let result = lt.result_type(op, &rt);
                        if result.is_none() {
                            self.error(
                                format!("operator {op} is not defined for {lt} and {rt}"),
                                expr.span,
                            );
                        }
                        result
                    }
                    _ => None,
                }
            }
            ExprKind::UnaryOp { op, operand } => {
                let op = *op;
                let operand_ty = self.resolve_term(operand)?;
                let result = operand_ty.unary_result(op);
                if result.is_none() {
                    self.error(
                        format!("operator {op} is not defined for {operand_ty}"),
                        expr.span,
                    );
                }
                result
            }
            ExprKind::MethodCall { name, args } => {
                let name = name.clone();
                self.resolve_method(&name, args, expr.span)
            }
            ExprKind::Brackets(inner) => self.resolve_term(inner),
            ExprKind::List(items) => {
                for item in items.iter_mut() {
                    self.resolve_term(item);
                }
                None
            }
            ExprKind::Subquery(select) => {
                let table = self.resolve_select(select, "subquery");
                let columns = &self.catalog.table(table).columns;
                if let [only] = columns.as_slice() {
                    self.catalog.column(*only).ty.clone()
                } else {
                    let count = columns.len();
                    self.error(
                        format!("subquery must return exactly one column, found {count}"),
                        expr.span,
                    );
                    None
                }
            }
        };
        expr.ty.clone_from(&ty);
        if binding.is_some() {
            expr.binding = binding;
        }
        ty
    }

    /// `table.column`. The left side must name exactly one visible table.
    fn resolve_dot(&mut self, left: &mut Expr, right: &Ident) -> Option<ColumnId> {
        let ExprKind::Identifier(table_name) = &left.kind else {
            self.error("expected a table name before '.'", left.span);
            return None;
        };
        let table_name = table_name.clone();
        let table = self.lookup_scope_table(&table_name)?;
        left.binding = Some(Binding::Table(table));
        self.lookup_table_column(table, right)
    }

    /// `left IN (...)` / `left NOT IN (...)`. The right side is a one-column
    /// subquery or a list whose elements must be castable to the left type.
    /// Any other term counts as a one-element list.
    fn resolve_membership(
        &mut self,
        left: &mut Expr,
        op: BinaryOperator,
        right: &mut Expr,
    ) -> Option<SqlType> {
        let lt = self.resolve_term(left);
        match &mut right.kind {
            ExprKind::Subquery(select) => {
                let table = self.resolve_select(select, "subquery");
                let columns = self.catalog.table(table).columns.clone();
                if let [only] = columns.as_slice() {
                    let element = self.catalog.column(*only).ty.clone();
                    right.ty.clone_from(&element);
                    self.check_member(lt.as_ref(), element.as_ref(), op, right.span);
                } else {
                    self.error(
                        format!(
                            "subquery in {op} must return exactly one column, found {}",
                            columns.len()
                        ),
                        right.span,
                    );
                }
            }
            ExprKind::List(items) => {
                for item in items.iter_mut() {
                    let element = self.resolve_term(item);
                    self.check_member(lt.as_ref(), element.as_ref(), op, item.span);
                }
            }
            _ => {
                let element = self.resolve_term(right);
                self.check_member(lt.as_ref(), element.as_ref(), op, right.span);
            }
        }
        Some(SqlType::builtin(Builtin::Boolean))
    }

    fn check_member(
        &mut self,
        left: Option<&SqlType>,
        element: Option<&SqlType>,
        op: BinaryOperator,
        span: Span,
    ) {
        if let (Some(left), Some(element)) = (left, element) {
            if !element.can_cast_to(left) {
                self.error(
                    format!("{op} element of type {element} is not compatible with {left}"),
                    span,
                );
            }
        }
    }

    fn resolve_method(&mut self, name: &Ident, args: &mut MethodArgs, span: Span) -> Option<SqlType> {
        let (types, star) = match args {
            MethodArgs::Star(_) => (Vec::new(), true),
            MethodArgs::List(list) => (
                list.iter_mut().map(|arg| self.resolve_term(arg)).collect(),
                false,
            ),
        };
        match methods().resolve(&name.name, &types, star) {
            MethodMatch::Resolved { ty, .. } => ty,
            MethodMatch::UnknownMethod => {
                let fix = suggest(&name.name, methods().names());
                self.error_with_fix(format!("unknown method {}", name.name), name.span, fix);
                None
            }
            MethodMatch::WrongArity { expected } => {
                let given = if star { "*".to_owned() } else { types.len().to_string() };
                self.error(
                    format!(
                        "wrong number of arguments to {} ({given}); expected {}",
                        name.name,
                        expected.join(" or ")
                    ),
                    span,
                );
                None
            }
            MethodMatch::NoMatchingSignature { expected } => {
                // Unknown argument types never cause a mismatch, so every
                // entry here is known.
                let given: Vec<String> = types
                    .iter()
                    .map(|t| t.as_ref().map_or_else(|| "?".to_owned(), ToString::to_string))
                    .collect();
                self.error(
                    format!(
                        "no matching method {}({}); expected {}",
                        name.name,
                        given.join(", "),
                        expected.join(" or ")
                    ),
                    span,
                );
                None
            }
        }
    }

    /// Check that `value` may be stored in `column`. Text destined for
    /// `date` / `datetime` columns must also match the calendar format.
    fn check_value(&mut self, value: &Expr, value_ty: Option<&SqlType>, column: ColumnId) {
        let entry = self.catalog.column(column);
        let Some(column_ty) = entry.ty.clone() else {
            return;
        };
        let column_name = entry.name.clone();
        let temporal = if column_ty.is(Builtin::Date) {
            Some((DATE_FORMAT_HINT, is_valid_date as fn(&str) -> bool))
        } else if column_ty.is(Builtin::Datetime) {
            Some((DATETIME_FORMAT_HINT, is_valid_datetime as fn(&str) -> bool))
        } else {
            None
        };

        if let Some((hint, valid)) = temporal {
            if let Some(text) = value.as_literal().as_ref().and_then(|l| l.as_text()) {
                if !valid(&text) {
                    let diagnostic = Diagnostic::semantic(
                        format!("invalid {column_ty} value '{text}' for column {column_name}"),
                        self.range(value.span),
                    )
                    .with_quick_fix(format!("write the value as {hint}"));
                    self.diagnostics.push(diagnostic);
                }
                return;
            }
        }

        let Some(value_ty) = value_ty else {
            return;
        };
        if !value_ty.can_cast_to(&column_ty) {
            let message =
                format!("cannot assign {value_ty} to column {column_name} of type {column_ty}");
            let fix = temporal.map(|(hint, _)| format!("write the value as a '{hint}' string"));
            self.error_with_fix(message, value.span, fix);
        }
    }

    // -----------------------------------------------------------------------
    // INSERT / UPDATE / DELETE
    // -----------------------------------------------------------------------

    /// Look up the target of a single-table statement and bind it.
    fn resolve_target(&mut self, name: &Ident) -> Option<TableId> {
        let table = self.lookup_catalog_table(name)?;
        self.bind_table(&name.name, table);
        Some(table)
    }

    fn resolve_insert(&mut self, insert: &mut InsertStatement) {
        let Some(table) = self.resolve_target(&insert.table) else {
            return;
        };
        insert.binding = Some(table);

        let mut targets = Vec::new();
        let mut complete = true;
        if insert.columns.is_empty() {
            targets.clone_from(&self.catalog.table(table).columns);
        } else {
            let mut seen = HashSet::new();
            for ident in &insert.columns {
                if !seen.insert(ident.name.to_ascii_lowercase()) {
                    self.error(format!("column {} listed twice", ident.name), ident.span);
                }
                match self.lookup_table_column(table, ident) {
                    Some(column) => targets.push(column),
                    None => complete = false,
                }
            }
        }

        let Some(first) = insert.rows.first() else {
            insert.targets = targets;
            return;
        };
        let values_span = insert
            .rows
            .iter()
            .fold(first.span, |acc, row| acc.merge(row.span));
        self.enter(values_span);
        for row in &mut insert.rows {
            if complete && row.values.len() != targets.len() {
                self.error(
                    format!(
                        "expected {} values, found {}",
                        targets.len(),
                        row.values.len()
                    ),
                    row.span,
                );
            }
            for (i, value) in row.values.iter_mut().enumerate() {
                let ty = self.resolve_term(value);
                if let Some(&column) = targets.get(i).filter(|_| complete) {
                    self.check_value(value, ty.as_ref(), column);
                }
            }
        }
        self.leave();
        insert.targets = targets;
    }

    fn resolve_update(&mut self, update: &mut UpdateStatement) {
        let Some(table) = self.resolve_target(&update.table) else {
            return;
        };
        update.binding = Some(table);
        for assignment in &mut update.assignments {
            let column = self.lookup_table_column(table, &assignment.column);
            assignment.binding = column;
            let ty = self.resolve_term(&mut assignment.value);
            if let Some(column) = column {
                self.check_value(&assignment.value, ty.as_ref(), column);
            }
        }
        if let Some(where_clause) = &mut update.where_clause {
            self.resolve_condition(where_clause, "WHERE");
        }
    }

    fn resolve_delete(&mut self, delete: &mut DeleteStatement) {
        let Some(table) = self.resolve_target(&delete.table) else {
            return;
        };
        delete.binding = Some(table);
        if let Some(where_clause) = &mut delete.where_clause {
            self.resolve_condition(where_clause, "WHERE");
        }
    }

    // -----------------------------------------------------------------------
    // DDL
    // -----------------------------------------------------------------------

    fn resolve_create_table(&mut self, create: &mut CreateTableStatement) {
        if !self.catalog.find_tables(&create.name.name).is_empty() {
            if !create.if_not_exists {
                self.error(
                    format!("table {} already exists", create.name.name),
                    create.name.span,
                );
            }
            return;
        }
        let table = self
            .catalog
            .add_table(&create.name.name, TableOrigin::Created);
        create.binding = Some(table);

        // Columns first so constraints and foreign keys can see all of them,
        // including self-references.
        let mut seen = HashSet::new();
        for def in &mut create.columns {
            if !seen.insert(def.name.name.to_ascii_lowercase()) {
                self.error(
                    format!("duplicate column name {}", def.name.name),
                    def.name.span,
                );
                continue;
            }
            self.add_column(table, def);
        }

        for constraint in &create.constraints {
            if let TableConstraintKind::PrimaryKey(columns) = &constraint.kind {
                for ident in columns {
                    if let Some(column) = self.lookup_table_column(table, ident) {
                        let entry = self.catalog.column_mut(column);
                        entry.primary_key = true;
                        entry.nullable = false;
                    }
                }
            }
        }

        self.bind_table(&create.name.name, table);
        for def in &mut create.columns {
            self.resolve_column_constraints(def);
        }
        for constraint in &mut create.constraints {
            match &mut constraint.kind {
                TableConstraintKind::PrimaryKey(_) => {}
                TableConstraintKind::Unique(columns) => {
                    for ident in columns.iter() {
                        self.lookup_table_column(table, ident);
                    }
                }
                TableConstraintKind::Check(expr) => self.resolve_condition(expr, "CHECK"),
                TableConstraintKind::ForeignKey { columns, clause } => {
                    let from: Vec<Option<ColumnId>> = columns
                        .iter()
                        .map(|ident| self.lookup_table_column(table, ident))
                        .collect();
                    self.resolve_foreign_key(&from, columns, clause);
                }
            }
        }
    }

    /// Register the column described by `def` in `table`.
    fn add_column(&mut self, table: TableId, def: &mut ColumnDef) -> ColumnId {
        let ty = def.type_name.as_ref().and_then(|type_name| {
            match SqlType::from_parts(&type_name.name, &type_name.params) {
                Ok(ty) => Some(ty),
                Err(err) => {
                    self.error(err.to_string(), type_name.span);
                    None
                }
            }
        });

        let mut column = Column::new(def.name.name.clone(), ty.clone(), table);
        for constraint in &def.constraints {
            match &constraint.kind {
                ColumnConstraintKind::NotNull => {
                    column.not_null = true;
                    column.nullable = false;
                }
                ColumnConstraintKind::PrimaryKey { .. } => {
                    column.primary_key = true;
                    column.nullable = false;
                }
                ColumnConstraintKind::Default(expr) => {
                    column.default_value = Some(expr.to_string());
                }
                _ => {}
            }
        }
        let id = self.catalog.add_column(table, column);
        def.ty = ty;
        def.binding = Some(id);
        id
    }

    /// DEFAULT, CHECK, and REFERENCES clauses of one column.
    fn resolve_column_constraints(&mut self, def: &mut ColumnDef) {
        let Some(column) = def.binding else {
            return;
        };
        for constraint in &mut def.constraints {
            match &mut constraint.kind {
                ColumnConstraintKind::Default(expr) => {
                    let ty = self.resolve_term(expr);
                    self.check_value(expr, ty.as_ref(), column);
                }
                ColumnConstraintKind::Check(expr) => self.resolve_condition(expr, "CHECK"),
                ColumnConstraintKind::References(clause) => {
                    let columns = std::slice::from_ref(&def.name);
                    self.resolve_foreign_key(&[Some(column)], columns, clause);
                }
                _ => {}
            }
        }
    }

    /// Link `from` columns to the columns named by `clause`.
    ///
    /// A target that is not a primary key is a warning. A pairing whose
    /// types cannot be cast is an error.
    fn resolve_foreign_key(
        &mut self,
        from: &[Option<ColumnId>],
        from_idents: &[Ident],
        clause: &ForeignKeyClause,
    ) {
        let Some(target) = self.lookup_catalog_table(&clause.table) else {
            return;
        };

        let targets: Vec<(Option<ColumnId>, Span)> = if clause.columns.is_empty() {
            match self.catalog.primary_key(target) {
                Some(pk) => vec![(Some(pk), clause.table.span)],
                None => {
                    self.error(
                        format!("table {} has no primary key", clause.table.name),
                        clause.table.span,
                    );
                    return;
                }
            }
        } else {
            clause
                .columns
                .iter()
                .map(|ident| (self.lookup_table_column(target, ident), ident.span))
                .collect()
        };

        if targets.len() != from.len() {
            self.error(
                format!(
                    "foreign key has {} column(s) but references {}",
                    from.len(),
                    targets.len()
                ),
                clause.table.span,
            );
            return;
        }

        for ((from, from_ident), (to, to_span)) in from.iter().zip(from_idents).zip(targets) {
            let (Some(from), Some(to)) = (*from, to) else {
                continue;
            };
            let referenced = self.catalog.column(to);
            if !referenced.primary_key {
                self.warning("referenced column is not a primary key", to_span);
            }
            let from_ty = self.catalog.column(from).ty.clone();
            let to_ty = self.catalog.column(to).ty.clone();
            if let (Some(from_ty), Some(to_ty)) = (from_ty, to_ty) {
                if !from_ty.can_cast_to(&to_ty) {
                    let to_name = self.catalog.column(to).name.clone();
                    self.error(
                        format!(
                            "foreign key type {from_ty} is not compatible with referenced \
                             column {to_name} of type {to_ty}"
                        ),
                        from_ident.span,
                    );
                }
            }
            self.catalog.column_mut(from).references = Some(to);
        }
    }

    fn resolve_alter_table(&mut self, alter: &mut AlterTableStatement) {
        let Some(table) = self.resolve_target(&alter.table) else {
            return;
        };
        alter.binding = Some(table);
        match &mut alter.action {
            AlterTableAction::AddColumn(def) => {
                if !self.catalog.find_columns(table, &def.name.name).is_empty() {
                    self.error(
                        format!("duplicate column name {}", def.name.name),
                        def.name.span,
                    );
                    return;
                }
                let column = self.add_column(table, def);
                let scope = self.current();
                self.scopes.bind_column(scope, &def.name.name, column);
                self.resolve_column_constraints(def);
            }
            AlterTableAction::DropColumn(ident) => {
                if let Some(column) = self.lookup_table_column(table, ident) {
                    self.catalog.remove_column(column);
                }
            }
            AlterTableAction::RenameColumn { from, to } => {
                let Some(column) = self.lookup_table_column(table, from) else {
                    return;
                };
                if !self.catalog.find_columns(table, &to.name).is_empty() {
                    self.error(format!("duplicate column name {}", to.name), to.span);
                    return;
                }
                self.catalog.rename_column(column, &to.name);
            }
            AlterTableAction::RenameTo(new_name) => {
                if !self.catalog.find_tables(&new_name.name).is_empty() {
                    self.error(
                        format!("table {} already exists", new_name.name),
                        new_name.span,
                    );
                    return;
                }
                self.catalog.rename_table(table, &new_name.name);
            }
        }
    }

    fn resolve_drop_table(&mut self, drop: &mut DropTableStatement) {
        if drop.if_exists && self.catalog.find_tables(&drop.table.name).is_empty() {
            return;
        }
        let Some(table) = self.lookup_catalog_table(&drop.table) else {
            return;
        };
        drop.binding = Some(table);
        self.catalog.drop_table(table);
    }
}

// ---------------------------------------------------------------------------
// Suggestions
// ---------------------------------------------------------------------------

/// "did you mean" text for the candidate closest to `name`, if any lies
/// within [`SUGGESTION_DISTANCE`] edits.
fn suggest<'c>(name: &str, candidates: impl IntoIterator<Item = &'c str>) -> Option<String> {
    let lower = name.to_ascii_lowercase();
    candidates
        .into_iter()
        .filter(|c| !c.eq_ignore_ascii_case(name))
        .map(|c| (edit_distance(&lower, &c.to_ascii_lowercase()), c))
        .filter(|&(d, _)| d <= SUGGESTION_DISTANCE)
        .min_by(|a, b| a.0.cmp(&b.0).then_with(|| a.1.cmp(b.1)))
        .map(|(_, c)| format!("did you mean `{c}`?"))
}

/// Levenshtein distance over chars.
fn edit_distance(a: &str, b: &str) -> usize {
    let b: Vec<char> = b.chars().collect();
    let mut row: Vec<usize> = (0..=b.len()).collect();
    for (i, ca) in a.chars().enumerate() {
        let mut diagonal = row[0];
        row[0] = i + 1;
        for (j, &cb) in b.iter().enumerate() {
            let above = row[j + 1];
            row[j + 1] = if ca == cb {
                diagonal
            } else {
                1 + diagonal.min(above).min(row[j])
            };
            diagonal = above;
        }
    }
    row[b.len()]
}

#[cfg(test)]
mod tests {
    use sqlfront_error::Severity;
    use sqlfront_types::{ColumnDescriptor, TableDescriptor};

    use super::*;
    use crate::lexer::lex;
    use crate::parser::parse;

    fn column(name: &str, ty: &str, pk: bool) -> ColumnDescriptor {
        ColumnDescriptor {
            name: name.to_owned(),
            complete_type: ty.to_owned(),
            not_null: false,
            default_value: None,
            primary_key: pk,
        }
    }

    fn schema() -> Catalog {
        Catalog::from_descriptors(&[
            TableDescriptor {
                name: "customers".to_owned(),
                create_sql: None,
                columns: vec![
                    column("id", "int", true),
                    column("name", "varchar(40)", false),
                    column("born", "date", false),
                ],
                foreign_keys: vec![],
                row_count: None,
            },
            TableDescriptor {
                name: "orders".to_owned(),
                create_sql: None,
                columns: vec![
                    column("id", "integer", true),
                    column("customer", "integer", false),
                    column("total", "decimal(10,2)", false),
                    column("code", "varchar(8)", false),
                ],
                foreign_keys: vec![],
                row_count: None,
            },
        ])
    }

    struct Run {
        statements: Vec<Statement>,
        resolution: Resolution,
    }

    fn run(sql: &str) -> Run {
        let lexed = lex(sql);
        let mut parsed = parse(&lexed.tokens);
        assert!(parsed.errors.is_empty(), "parse errors: {:?}", parsed.errors);
        let index = LineIndex::new(sql);
        let resolution = resolve(&mut parsed.statements, schema(), &index, 10);
        Run {
            statements: parsed.statements,
            resolution,
        }
    }

    fn messages(sql: &str) -> Vec<String> {
        run(sql)
            .resolution
            .diagnostics
            .iter()
            .map(|d| d.message.clone())
            .collect()
    }

    fn result_types(run: &Run, stmt: usize) -> Vec<String> {
        let StatementKind::Select(select) = &run.statements[stmt].kind else {
            panic!("expected SELECT");
        };
        let catalog = &run.resolution.catalog;
        catalog
            .table(select.result.unwrap())
            .columns
            .iter()
            .map(|&c| {
                catalog
                    .column(c)
                    .ty
                    .as_ref()
                    .map_or_else(|| "?".to_owned(), ToString::to_string)
            })
            .collect()
    }

    #[test]
    fn test_simple_select_types_output() {
        let run = run("select name from customers where id = 1");
        assert!(run.resolution.diagnostics.is_empty());
        assert_eq!(result_types(&run, 0), ["varchar(40)"]);
    }

    #[test]
    fn test_unknown_identifier_position_and_fix() {
        let run = run("select nmae from customers");
        let diags = &run.resolution.diagnostics;
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].message, "unknown identifier nmae");
        assert_eq!(diags[0].range.start, Pos::new(0, 7));
        assert_eq!(diags[0].range.end, Pos::new(0, 11));
        assert_eq!(diags[0].quick_fix.as_deref(), Some("did you mean `name`?"));
    }

    #[test]
    fn test_unknown_table() {
        let run = run("select * from customer where nme = 1");
        let diags = &run.resolution.diagnostics;
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].message, "unknown table customer");
        assert_eq!(diags[0].quick_fix.as_deref(), Some("did you mean `customers`?"));
        assert_eq!(messages("select *"), ["'*' requires a FROM clause"]);
    }

    #[test]
    fn test_ambiguous_column_in_join() {
        let msgs = messages("select id from customers, orders");
        assert_eq!(msgs, ["ambiguous identifier id (found in customers, orders)"]);
        assert!(messages("select c.id, o.id from customers c join orders o on c.id = o.customer")
            .is_empty());
    }

    #[test]
    fn test_star_expansion() {
        let run = run("select * from customers");
        assert_eq!(result_types(&run, 0), ["integer", "varchar(40)", "date"]);
        let run2 = super::tests::run("select o.* from customers c, orders o");
        assert_eq!(result_types(&run2, 0).len(), 4);
    }

    #[test]
    fn test_where_must_be_boolean() {
        assert_eq!(
            messages("select name from customers where id + 1"),
            ["WHERE clause must be boolean, found integer"]
        );
    }

    #[test]
    fn test_operator_type_error_names_both_types() {
        assert_eq!(
            messages("select born * 2 from customers"),
            ["operator * is not defined for date and integer"]
        );
    }

    #[test]
    fn test_growth_rules_flow_into_results() {
        let run = run("select name || code, total + total from customers, orders");
        assert_eq!(result_types(&run, 0), ["varchar(48)", "decimal(10,2)"]);
    }

    #[test]
    fn test_in_list_and_subquery() {
        assert!(messages("select name from customers where id in (1, 2, 3)").is_empty());
        assert!(messages(
            "select name from customers where id not in (select customer from orders)"
        )
        .is_empty());
        assert_eq!(
            messages("select name from customers where id in (select id, customer from orders)"),
            ["subquery in IN must return exactly one column, found 2"]
        );
        assert_eq!(
            messages("select name from customers where born in (1)"),
            ["IN element of type integer is not compatible with date"]
        );
    }

    #[test]
    fn test_method_resolution() {
        let run = run("select count(*), upper(name), abs(id) from customers");
        assert!(run.resolution.diagnostics.is_empty());
        assert_eq!(result_types(&run, 0), ["integer", "varchar(40)", "integer"]);
        let msgs = messages("select abs(name) from customers");
        assert_eq!(msgs.len(), 1);
        assert!(msgs[0].starts_with("no matching method abs(varchar(40))"), "{msgs:?}");
        let run = super::tests::run("select lenght(name) from customers");
        let diag = &run.resolution.diagnostics[0];
        assert_eq!(diag.message, "unknown method lenght");
        assert_eq!(diag.quick_fix.as_deref(), Some("did you mean `length`?"));
    }

    #[test]
    fn test_order_by_sees_aliases() {
        assert!(messages("select name as n from customers order by n desc").is_empty());
    }

    #[test]
    fn test_scalar_subquery_typed_by_its_column() {
        let run = run("select (select max(total) from orders) from customers");
        assert!(run.resolution.diagnostics.is_empty());
        assert_eq!(result_types(&run, 0), ["decimal(10,2)"]);
    }

    #[test]
    fn test_insert_arity_and_casts() {
        assert!(messages("insert into customers values (1, 'ann', '2020-02-29')").is_empty());
        assert_eq!(
            messages("insert into customers (id, name) values (1)"),
            ["expected 2 values, found 1"]
        );
        assert_eq!(
            messages("insert into customers (id) values ('x')"),
            ["cannot assign char(1) to column id of type integer"]
        );
    }

    #[test]
    fn test_insert_date_format_hint() {
        let run = run("insert into customers (born) values ('2021-02-29')");
        let diag = &run.resolution.diagnostics[0];
        assert_eq!(diag.message, "invalid date value '2021-02-29' for column born");
        assert_eq!(diag.quick_fix.as_deref(), Some("write the value as YYYY-MM-DD"));

        let run = super::tests::run("insert into customers (born) values (20210101)");
        let diag = &run.resolution.diagnostics[0];
        assert_eq!(diag.message, "cannot assign integer to column born of type date");
        assert!(diag.quick_fix.is_some());
    }

    #[test]
    fn test_update_and_delete_bind_target() {
        let run = run("update customers set name = 'bo' where id = 2; delete from orders where total > 1");
        assert!(run.resolution.diagnostics.is_empty());
        let StatementKind::Update(update) = &run.statements[0].kind else {
            panic!("expected UPDATE");
        };
        assert!(update.binding.is_some());
        assert!(update.assignments[0].binding.is_some());
        assert_eq!(
            messages("update customers set nme = 1"),
            ["unknown column nme in table customers"]
        );
    }

    #[test]
    fn test_create_table_then_use_it() {
        let msgs = messages(
            "create table items (sku varchar(10) primary key, qty integer);\n\
             insert into items values ('a1', 3);\n\
             select qty from items",
        );
        assert!(msgs.is_empty(), "{msgs:?}");
    }

    #[test]
    fn test_duplicate_columns_and_existing_tables() {
        assert_eq!(
            messages("create table t (a int, A text)"),
            ["duplicate column name A"]
        );
        assert_eq!(
            messages("create table customers (x int)"),
            ["table customers already exists"]
        );
        assert!(messages("create table if not exists customers (x int)").is_empty());
    }

    #[test]
    fn test_foreign_key_warning_vs_error() {
        let run = run("create table notes (author_name varchar(40) references customers(name))");
        let diags = &run.resolution.diagnostics;
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].severity, Severity::Warning);
        assert_eq!(diags[0].message, "referenced column is not a primary key");

        let run = super::tests::run(
            "create table notes (\n  author_born integer\n    references customers(name)\n)",
        );
        let diags = &run.resolution.diagnostics;
        assert_eq!(diags.len(), 1, "{diags:?}");
        assert_eq!(diags[0].severity, Severity::Warning);

        let run = super::tests::run(
            "create table notes (\n  when_born date\n    references customers(id)\n)",
        );
        let diags = &run.resolution.diagnostics;
        assert_eq!(diags.len(), 1, "{diags:?}");
        assert_eq!(diags[0].severity, Severity::Error);

        let run = super::tests::run(
            "create table notes (\n  when_born date\n    references customers(name)\n)",
        );
        let severities: Vec<Severity> =
            run.resolution.diagnostics.iter().map(|d| d.severity).collect();
        assert_eq!(severities, [Severity::Warning]);
    }

    #[test]
    fn test_incompatible_non_pk_reference_reports_both() {
        let run = run(
            "create table notes (\n  flag boolean\n    references customers(born)\n)",
        );
        let severities: Vec<Severity> =
            run.resolution.diagnostics.iter().map(|d| d.severity).collect();
        assert_eq!(severities, [Severity::Warning, Severity::Error]);
    }

    #[test]
    fn test_self_reference_and_table_constraints() {
        let msgs = messages(
            "create table tree (id integer, parent integer references tree(id), \
             primary key (id), check (id > 0), foreign key (parent) references tree)",
        );
        assert!(msgs.is_empty(), "{msgs:?}");
    }

    #[test]
    fn test_alter_and_drop_update_catalog() {
        let msgs = messages(
            "alter table customers add column email varchar(80);\n\
             select email from customers;\n\
             alter table customers rename column email to mail;\n\
             select mail from customers;\n\
             alter table customers rename to clients;\n\
             select name from clients;\n\
             drop table clients;\n\
             select name from clients",
        );
        assert_eq!(msgs, ["unknown table clients"]);
        assert!(messages("drop table if exists nothing").is_empty());
        assert_eq!(messages("drop table nothing"), ["unknown table nothing"]);
    }

    #[test]
    fn test_unknown_type_in_create() {
        assert_eq!(
            messages("create table t (a widget)"),
            ["unknown column type 'widget'"]
        );
    }

    #[test]
    fn test_scopes_nest_inside_statement() {
        let sql = "select name\nfrom customers\nwhere id in (\n  select customer\n  from orders\n)";
        let run = run(sql);
        let scopes = &run.resolution.scopes;
        let inner = scopes.scope_at(Pos::new(3, 4));
        let outer_range = scopes.get(scopes.scope_at(Pos::new(1, 0))).range;
        assert!(outer_range.encloses(&scopes.get(inner).range));
        assert!(scopes
            .lookup(inner, "customer", |s| !s.columns.is_empty())
            .is_some());
    }

    #[test]
    fn test_edit_distance() {
        assert_eq!(edit_distance("nmae", "name"), 2);
        assert_eq!(edit_distance("kitten", "sitting"), 3);
        assert_eq!(edit_distance("", "ab"), 2);
        assert_eq!(suggest("custmer", ["customers", "orders"]).as_deref(), Some("did you mean `customers`?"));
        assert_eq!(suggest("zzz", ["customers"]), None);
    }
}
