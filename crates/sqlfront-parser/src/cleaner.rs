//! Canonical SQL text for CREATE TABLE and INSERT statements.
//!
//! Column definitions are re-emitted with their clauses in a fixed order,
//! followed by the check constraint implied by the column type. Insert
//! values are formatted for the column they are stored in. Every other
//! statement passes through as written.

use std::fmt::Write as _;

use sqlfront_ast::{
    ColumnConstraint, ColumnConstraintKind, ColumnDef, CreateTableStatement, Expr,
    InsertStatement, Statement, StatementKind,
};
use sqlfront_types::{Catalog, SqlType};

/// Render `statement` as canonical SQL.
///
/// `source` is the text the statement was parsed from. `catalog`, when the
/// statement has been resolved against one, supplies the INSERT target
/// column types.
#[must_use]
pub fn clean(statement: &Statement, source: &str, catalog: Option<&Catalog>) -> String {
    let span = tracing::debug_span!(
        target: "sqlfront.clean",
        "clean",
        kind = statement.kind.keyword(),
        bytes = tracing::field::Empty,
    );
    let _guard = span.enter();

    let text = match &statement.kind {
        StatementKind::CreateTable(create) => clean_create_table(create),
        StatementKind::Insert(insert) => clean_insert(insert, catalog),
        _ => statement.span.slice(source).to_owned(),
    };
    span.record("bytes", text.len());
    text
}

fn clean_create_table(create: &CreateTableStatement) -> String {
    let mut out = String::from("CREATE TABLE ");
    if create.if_not_exists {
        out.push_str("IF NOT EXISTS ");
    }
    let _ = write!(out, "{} (", create.name);

    let mut lines: Vec<String> = create.columns.iter().map(clean_column).collect();
    lines.extend(create.constraints.iter().map(ToString::to_string));
    for (i, line) in lines.iter().enumerate() {
        out.push_str(if i == 0 { "\n  " } else { ",\n  " });
        out.push_str(line);
    }
    out.push_str("\n)");
    out
}

/// Clause order within a column definition. The type-implied check sits
/// between [`ClauseRank::Collate`] and user checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum ClauseRank {
    Nullability,
    Default,
    PrimaryKey,
    Unique,
    References,
    Collate,
    Check,
}

fn rank(kind: &ColumnConstraintKind) -> ClauseRank {
    match kind {
        ColumnConstraintKind::NotNull | ColumnConstraintKind::Null => ClauseRank::Nullability,
        ColumnConstraintKind::Default(_) => ClauseRank::Default,
        ColumnConstraintKind::PrimaryKey { .. } => ClauseRank::PrimaryKey,
        ColumnConstraintKind::Unique => ClauseRank::Unique,
        ColumnConstraintKind::References(_) => ClauseRank::References,
        ColumnConstraintKind::Collate(_) => ClauseRank::Collate,
        ColumnConstraintKind::Check(_) => ClauseRank::Check,
    }
}

/// The column's type: the resolved one if present, otherwise looked up from
/// the written name. Unknown names give `None`.
fn column_type(def: &ColumnDef) -> Option<SqlType> {
    def.ty.clone().or_else(|| {
        def.type_name
            .as_ref()
            .and_then(|t| SqlType::from_parts(&t.name, &t.params).ok())
    })
}

fn clean_column(def: &ColumnDef) -> String {
    let ty = column_type(def);
    let mut out = def.name.to_string();
    match (&ty, &def.type_name) {
        (Some(ty), _) => {
            let _ = write!(out, " {ty}");
        }
        (None, Some(written)) => {
            let _ = write!(out, " {written}");
        }
        (None, None) => {}
    }

    let mut constraints: Vec<&ColumnConstraint> = def.constraints.iter().collect();
    constraints.sort_by_key(|c| rank(&c.kind));

    let column_name = def.name.to_string();
    let implied = ty.as_ref().and_then(|ty| ty.constraint(&column_name)).filter(|text| {
        !def.constraints.iter().any(|c| match &c.kind {
            ColumnConstraintKind::Check(expr) => expr.to_string() == *text,
            _ => false,
        })
    });

    let mut implied_written = false;
    for constraint in constraints {
        if rank(&constraint.kind) == ClauseRank::Check && !implied_written {
            if let Some(text) = &implied {
                let _ = write!(out, " CHECK ({text})");
            }
            implied_written = true;
        }
        out.push(' ');
        out.push_str(&clean_constraint(constraint, ty.as_ref()));
    }
    if !implied_written {
        if let Some(text) = &implied {
            let _ = write!(out, " CHECK ({text})");
        }
    }
    out
}

/// A column constraint, with a literal DEFAULT formatted for the column type.
fn clean_constraint(constraint: &ColumnConstraint, ty: Option<&SqlType>) -> String {
    let (ColumnConstraintKind::Default(expr), Some(ty)) = (&constraint.kind, ty) else {
        return constraint.to_string();
    };
    let Some(literal) = expr.as_literal() else {
        return constraint.to_string();
    };
    let mut out = String::new();
    if let Some(name) = &constraint.name {
        let _ = write!(out, "CONSTRAINT {name} ");
    }
    let _ = write!(out, "DEFAULT {}", ty.format_value(&literal));
    out
}

fn clean_insert(insert: &InsertStatement, catalog: Option<&Catalog>) -> String {
    let mut out = format!("INSERT INTO {}", insert.table);
    if !insert.columns.is_empty() {
        out.push_str(" (");
        push_list(&mut out, insert.columns.iter().map(ToString::to_string));
        out.push(')');
    }
    out.push_str(" VALUES ");

    let types: Vec<Option<SqlType>> = match catalog {
        Some(catalog) => insert
            .targets
            .iter()
            .map(|&c| catalog.column(c).ty.clone())
            .collect(),
        None => Vec::new(),
    };
    for (i, row) in insert.rows.iter().enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        out.push('(');
        let values = row
            .values
            .iter()
            .enumerate()
            .map(|(j, value)| format_value(value, types.get(j).and_then(Option::as_ref)));
        push_list(&mut out, values);
        out.push(')');
    }
    out
}

/// A literal formatted for `ty`; anything else as written.
fn format_value(value: &Expr, ty: Option<&SqlType>) -> String {
    match (value.as_literal(), ty) {
        (Some(literal), Some(ty)) => ty.format_value(&literal),
        _ => value.to_string(),
    }
}

fn push_list(out: &mut String, items: impl Iterator<Item = String>) {
    for (i, item) in items.enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        out.push_str(&item);
    }
}
