//! Locating the schema object under the cursor.

use std::fmt;

use sqlfront_ast::{
    AlterTableAction, Binding, ColumnConstraintKind, ColumnDef, Expr, ExprKind, FromClause,
    MethodArgs, ResultColumn, SelectStatement, Statement, StatementKind, TableConstraintKind,
    TableOrSubquery,
};
use sqlfront_error::Span;
use sqlfront_types::{Catalog, Column, Table};

/// A resolved table or column, borrowed from the compilation's catalog.
#[derive(Debug, Clone, Copy)]
pub enum Hover<'a> {
    Table(&'a Table),
    Column { column: &'a Column, table: &'a Table },
}

impl<'a> Hover<'a> {
    pub(crate) fn new(binding: Binding, catalog: &'a Catalog) -> Self {
        match binding {
            Binding::Table(id) => Self::Table(catalog.table(id)),
            Binding::Column(id) => {
                let column = catalog.column(id);
                Self::Column {
                    column,
                    table: catalog.table(column.table),
                }
            }
        }
    }
}

impl fmt::Display for Hover<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Table(table) => {
                write!(f, "table {} ({} columns)", table.name, table.columns.len())?;
                if let Some(rows) = table.row_count {
                    write!(f, ", ~{rows} rows")?;
                }
                Ok(())
            }
            Self::Column { column, table } => {
                write!(f, "column {}.{}", table.name, column.name)?;
                match &column.ty {
                    Some(ty) => write!(f, ": {ty}")?,
                    None => f.write_str(": unknown type")?,
                }
                if column.primary_key {
                    f.write_str(" PRIMARY KEY")?;
                } else if column.not_null {
                    f.write_str(" NOT NULL")?;
                }
                Ok(())
            }
        }
    }
}

/// The binding whose source span is the smallest one containing `offset`.
/// A span also matches at its end, where the cursor sits after the last
/// character of a name.
pub(crate) fn binding_at(statement: &Statement, offset: u32) -> Option<Binding> {
    let mut targets = Targets::default();
    targets.statement(statement);
    targets
        .found
        .into_iter()
        .filter(|(span, _)| span.start <= offset && offset <= span.end)
        .min_by_key(|(span, _)| span.len())
        .map(|(_, binding)| binding)
}

#[derive(Default)]
struct Targets {
    found: Vec<(Span, Binding)>,
}

impl Targets {
    fn push(&mut self, span: Span, binding: Option<Binding>) {
        if let Some(binding) = binding {
            self.found.push((span, binding));
        }
    }

    fn statement(&mut self, statement: &Statement) {
        match &statement.kind {
            StatementKind::Select(select) => self.select(select),
            StatementKind::Insert(insert) => {
                self.push(insert.table.span, insert.binding.map(Binding::Table));
                if insert.columns.len() == insert.targets.len() {
                    for (ident, &column) in insert.columns.iter().zip(&insert.targets) {
                        self.push(ident.span, Some(Binding::Column(column)));
                    }
                }
                for row in &insert.rows {
                    row.values.iter().for_each(|v| self.expr(v));
                }
            }
            StatementKind::Update(update) => {
                self.push(update.table.span, update.binding.map(Binding::Table));
                for assignment in &update.assignments {
                    self.push(assignment.column.span, assignment.binding.map(Binding::Column));
                    self.expr(&assignment.value);
                }
                self.opt_expr(update.where_clause.as_ref());
            }
            StatementKind::Delete(delete) => {
                self.push(delete.table.span, delete.binding.map(Binding::Table));
                self.opt_expr(delete.where_clause.as_ref());
            }
            StatementKind::CreateTable(create) => {
                self.push(create.name.span, create.binding.map(Binding::Table));
                create.columns.iter().for_each(|def| self.column_def(def));
                for constraint in &create.constraints {
                    if let TableConstraintKind::Check(expr) = &constraint.kind {
                        self.expr(expr);
                    }
                }
            }
            StatementKind::AlterTable(alter) => {
                self.push(alter.table.span, alter.binding.map(Binding::Table));
                if let AlterTableAction::AddColumn(def) = &alter.action {
                    self.column_def(def);
                }
            }
            StatementKind::DropTable(drop) => {
                self.push(drop.table.span, drop.binding.map(Binding::Table));
            }
        }
    }

    fn column_def(&mut self, def: &ColumnDef) {
        self.push(def.name.span, def.binding.map(Binding::Column));
        for constraint in &def.constraints {
            match &constraint.kind {
                ColumnConstraintKind::Default(expr) | ColumnConstraintKind::Check(expr) => {
                    self.expr(expr);
                }
                _ => {}
            }
        }
    }

    fn select(&mut self, select: &SelectStatement) {
        for column in &select.columns {
            if let ResultColumn::Expr { expr, .. } = column {
                self.expr(expr);
            }
        }
        if let Some(from) = &select.from {
            self.from(from);
        }
        self.opt_expr(select.where_clause.as_ref());
        if let Some(group_by) = &select.group_by {
            group_by.exprs.iter().for_each(|e| self.expr(e));
            self.opt_expr(group_by.having.as_ref());
        }
        if let Some(order_by) = &select.order_by {
            order_by.terms.iter().for_each(|t| self.expr(&t.expr));
        }
        if let Some(limit) = &select.limit {
            self.expr(&limit.limit);
            self.opt_expr(limit.offset.as_ref());
        }
    }

    fn from(&mut self, from: &FromClause) {
        self.source(&from.source);
        for join in &from.joins {
            self.source(&join.table);
            self.opt_expr(join.on.as_ref());
        }
    }

    fn source(&mut self, source: &TableOrSubquery) {
        match source {
            TableOrSubquery::Table {
                name,
                alias,
                binding,
            } => {
                let binding = binding.map(Binding::Table);
                self.push(name.span, binding);
                if let Some(alias) = alias {
                    self.push(alias.span, binding);
                }
            }
            TableOrSubquery::Subquery { select, .. } => self.select(select),
        }
    }

    fn opt_expr(&mut self, expr: Option<&Expr>) {
        if let Some(expr) = expr {
            self.expr(expr);
        }
    }

    fn expr(&mut self, expr: &Expr) {
        self.push(expr.span, expr.binding);
        match &expr.kind {
            ExprKind::Dot { left, .. } => self.expr(left),
            ExprKind::BinaryOp { left, right, .. } => {
                self.expr(left);
                self.expr(right);
            }
            ExprKind::UnaryOp { operand, .. } => self.expr(operand),
            ExprKind::MethodCall {
                args: MethodArgs::List(args),
                ..
            }
            | ExprKind::List(args) => args.iter().for_each(|a| self.expr(a)),
            ExprKind::Brackets(inner) => self.expr(inner),
            ExprKind::Subquery(select) => self.select(select),
            ExprKind::Constant(_) | ExprKind::Identifier(_) | ExprKind::MethodCall { .. } => {}
        }
    }
}
