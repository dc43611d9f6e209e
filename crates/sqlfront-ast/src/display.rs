//! SQL rendering via `fmt::Display` for AST nodes.
//!
//! Output re-parses to an equivalent tree: compound operands are
//! parenthesized and identifiers are quoted when their spelling requires it.

#[allow(clippy::wildcard_imports)]
use crate::*;
use std::fmt;

fn comma_list<T: fmt::Display>(f: &mut fmt::Formatter<'_>, items: &[T]) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{item}")?;
    }
    Ok(())
}

fn needs_quoting(name: &str) -> bool {
    let Some(&first) = name.as_bytes().first() else {
        return true;
    };
    if !(first.is_ascii_alphabetic() || first == b'_') {
        return true;
    }
    name.bytes().any(|b| !(b.is_ascii_alphanumeric() || b == b'_'))
}

/// Write `"name"` with embedded quotes doubled, or the bare name.
pub(crate) fn write_ident(f: &mut fmt::Formatter<'_>, name: &str, force: bool) -> fmt::Result {
    if force || needs_quoting(name) {
        write!(f, "\"{}\"", name.replace('"', "\"\""))
    } else {
        f.write_str(name)
    }
}

fn write_paren_if_compound(f: &mut fmt::Formatter<'_>, expr: &Expr) -> fmt::Result {
    if matches!(
        expr.kind,
        ExprKind::BinaryOp { .. } | ExprKind::UnaryOp { .. }
    ) {
        write!(f, "({expr})")
    } else {
        write!(f, "{expr}")
    }
}

impl fmt::Display for Ident {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_ident(f, &self.name, self.quoted)
    }
}

impl fmt::Display for TypeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)?;
        if !self.params.is_empty() {
            f.write_str("(")?;
            comma_list(f, &self.params)?;
            f.write_str(")")?;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Expressions
// ---------------------------------------------------------------------------

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            ExprKind::Constant(lit) => write!(f, "{lit}"),
            ExprKind::Identifier(ident) => write!(f, "{ident}"),
            ExprKind::Dot { left, right } => write!(f, "{left}.{right}"),
            ExprKind::BinaryOp { left, op, right } => {
                write_paren_if_compound(f, left)?;
                write!(f, " {op} ")?;
                write_paren_if_compound(f, right)
            }
            ExprKind::UnaryOp { op, operand } => {
                match op {
                    UnaryOperator::Not => f.write_str("NOT ")?,
                    UnaryOperator::Negate => f.write_str("-")?,
                }
                write_paren_if_compound(f, operand)
            }
            ExprKind::MethodCall { name, args } => {
                write!(f, "{name}(")?;
                match args {
                    MethodArgs::Star(_) => f.write_str("*")?,
                    MethodArgs::List(items) => comma_list(f, items)?,
                }
                f.write_str(")")
            }
            ExprKind::Brackets(inner) => write!(f, "({inner})"),
            ExprKind::List(items) => {
                f.write_str("(")?;
                comma_list(f, items)?;
                f.write_str(")")
            }
            ExprKind::Subquery(select) => write!(f, "({select})"),
        }
    }
}

// ---------------------------------------------------------------------------
// SELECT
// ---------------------------------------------------------------------------

impl fmt::Display for ResultColumn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Star(_) => f.write_str("*"),
            Self::TableStar(table) => write!(f, "{table}.*"),
            Self::Expr { expr, alias } => {
                write!(f, "{expr}")?;
                if let Some(alias) = alias {
                    write!(f, " AS {alias}")?;
                }
                Ok(())
            }
        }
    }
}

impl fmt::Display for TableOrSubquery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Table { name, alias, .. } => {
                write!(f, "{name}")?;
                if let Some(alias) = alias {
                    write!(f, " AS {alias}")?;
                }
            }
            Self::Subquery { select, alias, .. } => {
                write!(f, "({select})")?;
                if let Some(alias) = alias {
                    write!(f, " AS {alias}")?;
                }
            }
        }
        Ok(())
    }
}

impl fmt::Display for JoinOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Comma => ",",
            Self::Plain => "JOIN",
            Self::Inner => "INNER JOIN",
            Self::Left => "LEFT JOIN",
            Self::LeftOuter => "LEFT OUTER JOIN",
            Self::Cross => "CROSS JOIN",
        })
    }
}

impl fmt::Display for Join {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.operator == JoinOperator::Comma {
            write!(f, ", {}", self.table)?;
        } else {
            f.write_str(" ")?;
            if self.natural {
                f.write_str("NATURAL ")?;
            }
            write!(f, "{} {}", self.operator, self.table)?;
        }
        if let Some(on) = &self.on {
            write!(f, " ON {on}")?;
        }
        Ok(())
    }
}

impl fmt::Display for FromClause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.source)?;
        for join in &self.joins {
            write!(f, "{join}")?;
        }
        Ok(())
    }
}

impl fmt::Display for OrderingTerm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.expr)?;
        match self.direction {
            Some(SortDirection::Asc) => f.write_str(" ASC")?,
            Some(SortDirection::Desc) => f.write_str(" DESC")?,
            None => {}
        }
        match self.nulls {
            Some(NullsOrder::First) => f.write_str(" NULLS FIRST")?,
            Some(NullsOrder::Last) => f.write_str(" NULLS LAST")?,
            None => {}
        }
        Ok(())
    }
}

impl fmt::Display for SelectStatement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SELECT ")?;
        if self.distinct {
            f.write_str("DISTINCT ")?;
        }
        comma_list(f, &self.columns)?;
        if let Some(from) = &self.from {
            write!(f, " FROM {from}")?;
        }
        if let Some(w) = &self.where_clause {
            write!(f, " WHERE {w}")?;
        }
        if let Some(group) = &self.group_by {
            f.write_str(" GROUP BY ")?;
            comma_list(f, &group.exprs)?;
            if let Some(having) = &group.having {
                write!(f, " HAVING {having}")?;
            }
        }
        if let Some(order) = &self.order_by {
            f.write_str(" ORDER BY ")?;
            comma_list(f, &order.terms)?;
        }
        if let Some(limit) = &self.limit {
            write!(f, " LIMIT {}", limit.limit)?;
            if let Some(offset) = &limit.offset {
                write!(f, " OFFSET {offset}")?;
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// DML
// ---------------------------------------------------------------------------

impl fmt::Display for ValueRow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("(")?;
        comma_list(f, &self.values)?;
        f.write_str(")")
    }
}

impl fmt::Display for InsertStatement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "INSERT INTO {}", self.table)?;
        if !self.columns.is_empty() {
            f.write_str(" (")?;
            comma_list(f, &self.columns)?;
            f.write_str(")")?;
        }
        f.write_str(" VALUES ")?;
        comma_list(f, &self.rows)
    }
}

impl fmt::Display for Assignment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} = {}", self.column, self.value)
    }
}

impl fmt::Display for UpdateStatement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "UPDATE {} SET ", self.table)?;
        comma_list(f, &self.assignments)?;
        if let Some(w) = &self.where_clause {
            write!(f, " WHERE {w}")?;
        }
        Ok(())
    }
}

impl fmt::Display for DeleteStatement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DELETE FROM {}", self.table)?;
        if let Some(w) = &self.where_clause {
            write!(f, " WHERE {w}")?;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// DDL
// ---------------------------------------------------------------------------

impl fmt::Display for ForeignKeyClause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "REFERENCES {}", self.table)?;
        if !self.columns.is_empty() {
            f.write_str(" (")?;
            comma_list(f, &self.columns)?;
            f.write_str(")")?;
        }
        Ok(())
    }
}

impl fmt::Display for ColumnConstraintKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotNull => f.write_str("NOT NULL"),
            Self::Null => f.write_str("NULL"),
            Self::Default(expr) => {
                if matches!(expr.kind, ExprKind::Constant(_)) || expr.as_literal().is_some() {
                    write!(f, "DEFAULT {expr}")
                } else {
                    write!(f, "DEFAULT ({expr})")
                }
            }
            Self::PrimaryKey {
                direction,
                autoincrement,
            } => {
                f.write_str("PRIMARY KEY")?;
                match direction {
                    Some(SortDirection::Asc) => f.write_str(" ASC")?,
                    Some(SortDirection::Desc) => f.write_str(" DESC")?,
                    None => {}
                }
                if *autoincrement {
                    f.write_str(" AUTOINCREMENT")?;
                }
                Ok(())
            }
            Self::Unique => f.write_str("UNIQUE"),
            Self::References(clause) => write!(f, "{clause}"),
            Self::Collate(name) => write!(f, "COLLATE {name}"),
            Self::Check(expr) => write!(f, "CHECK ({expr})"),
        }
    }
}

impl fmt::Display for ColumnConstraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(name) = &self.name {
            write!(f, "CONSTRAINT {name} ")?;
        }
        write!(f, "{}", self.kind)
    }
}

impl fmt::Display for ColumnDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)?;
        if let Some(ty) = &self.type_name {
            write!(f, " {ty}")?;
        }
        for constraint in &self.constraints {
            write!(f, " {constraint}")?;
        }
        Ok(())
    }
}

impl fmt::Display for TableConstraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(name) = &self.name {
            write!(f, "CONSTRAINT {name} ")?;
        }
        match &self.kind {
            TableConstraintKind::PrimaryKey(cols) => {
                f.write_str("PRIMARY KEY (")?;
                comma_list(f, cols)?;
                f.write_str(")")
            }
            TableConstraintKind::Unique(cols) => {
                f.write_str("UNIQUE (")?;
                comma_list(f, cols)?;
                f.write_str(")")
            }
            TableConstraintKind::Check(expr) => write!(f, "CHECK ({expr})"),
            TableConstraintKind::ForeignKey { columns, clause } => {
                f.write_str("FOREIGN KEY (")?;
                comma_list(f, columns)?;
                write!(f, ") {clause}")
            }
        }
    }
}

impl fmt::Display for CreateTableStatement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("CREATE TABLE ")?;
        if self.if_not_exists {
            f.write_str("IF NOT EXISTS ")?;
        }
        write!(f, "{} (", self.name)?;
        comma_list(f, &self.columns)?;
        for constraint in &self.constraints {
            write!(f, ", {constraint}")?;
        }
        f.write_str(")")
    }
}

impl fmt::Display for AlterTableStatement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ALTER TABLE {} ", self.table)?;
        match &self.action {
            AlterTableAction::AddColumn(def) => write!(f, "ADD COLUMN {def}"),
            AlterTableAction::DropColumn(name) => write!(f, "DROP COLUMN {name}"),
            AlterTableAction::RenameColumn { from, to } => {
                write!(f, "RENAME COLUMN {from} TO {to}")
            }
            AlterTableAction::RenameTo(name) => write!(f, "RENAME TO {name}"),
        }
    }
}

impl fmt::Display for DropTableStatement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("DROP TABLE ")?;
        if self.if_exists {
            f.write_str("IF EXISTS ")?;
        }
        write!(f, "{}", self.table)
    }
}

impl fmt::Display for StatementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Select(s) => write!(f, "{s}"),
            Self::Insert(s) => write!(f, "{s}"),
            Self::Update(s) => write!(f, "{s}"),
            Self::Delete(s) => write!(f, "{s}"),
            Self::CreateTable(s) => write!(f, "{s}"),
            Self::AlterTable(s) => write!(f, "{s}"),
            Self::DropTable(s) => write!(f, "{s}"),
        }
    }
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ident(name: &str) -> Ident {
        Ident::new(name, Span::ZERO)
    }

    fn col(name: &str) -> Expr {
        Expr::ident(ident(name))
    }

    #[test]
    fn test_identifier_quoting() {
        assert_eq!(ident("name").to_string(), "name");
        assert_eq!(ident("first name").to_string(), "\"first name\"");
        assert_eq!(ident("1st").to_string(), "\"1st\"");
        assert_eq!(ident("say\"hi").to_string(), "\"say\"\"hi\"");
        let mut kw = ident("select");
        kw.quoted = true;
        assert_eq!(kw.to_string(), "\"select\"");
    }

    #[test]
    fn test_nested_binary_parenthesized() {
        let inner = Expr::binary(col("b"), BinaryOperator::And, col("c"));
        let e = Expr::binary(col("a"), BinaryOperator::Or, inner);
        assert_eq!(e.to_string(), "a OR (b AND c)");
    }

    #[test]
    fn test_method_call_and_list() {
        let call = Expr::new(
            ExprKind::MethodCall {
                name: ident("count"),
                args: MethodArgs::Star(Span::ZERO),
            },
            Span::ZERO,
        );
        assert_eq!(call.to_string(), "count(*)");
        let list = Expr::new(
            ExprKind::List(vec![
                Expr::constant(Literal::Integer(1), Span::ZERO),
                Expr::constant(Literal::String("x'y".to_owned()), Span::ZERO),
            ]),
            Span::ZERO,
        );
        assert_eq!(
            Expr::binary(col("a"), BinaryOperator::NotIn, list).to_string(),
            "a NOT IN (1, 'x''y')"
        );
    }

    #[test]
    fn test_create_table_rendering() {
        let stmt = CreateTableStatement {
            if_not_exists: true,
            name: ident("t"),
            columns: vec![ColumnDef {
                name: ident("id"),
                type_name: Some(TypeName {
                    name: "decimal".to_owned(),
                    params: vec![10, 2],
                    span: Span::ZERO,
                }),
                constraints: vec![ColumnConstraint {
                    name: None,
                    kind: ColumnConstraintKind::PrimaryKey {
                        direction: None,
                        autoincrement: false,
                    },
                    span: Span::ZERO,
                }],
                span: Span::ZERO,
                ty: None,
                binding: None,
            }],
            constraints: vec![],
            binding: None,
        };
        assert_eq!(
            stmt.to_string(),
            "CREATE TABLE IF NOT EXISTS t (id decimal(10, 2) PRIMARY KEY)"
        );
    }
}
