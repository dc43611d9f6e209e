//! SQL abstract syntax tree for sqlfront.
//!
//! The parser builds these nodes bottom-up; every node carries the byte
//! [`Span`] of the text it was parsed from. The resolver later fills in the
//! `ty` and `binding` slots. Bindings are [`TableId`] / [`ColumnId`] handles
//! into the resolver's catalog, never owned schema objects.

mod display;

pub use sqlfront_error::Span;
pub use sqlfront_types::{BinaryOperator, ColumnId, Literal, SqlType, TableId, UnaryOperator};

// ---------------------------------------------------------------------------
// Identifiers
// ---------------------------------------------------------------------------

/// A name as written, with quotes removed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ident {
    pub name: String,
    /// Written as `"x"`, `` `x` `` or `[x]`.
    pub quoted: bool,
    pub span: Span,
}

impl Ident {
    #[must_use]
    pub fn new(name: impl Into<String>, span: Span) -> Self {
        Self {
            name: name.into(),
            quoted: false,
            span,
        }
    }

    /// Case-insensitive comparison against `other`.
    #[must_use]
    pub fn matches(&self, other: &str) -> bool {
        self.name.eq_ignore_ascii_case(other)
    }
}

/// What a name resolved to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Binding {
    Table(TableId),
    Column(ColumnId),
}

// ---------------------------------------------------------------------------
// Statements
// ---------------------------------------------------------------------------

/// One parsed statement with its source text extent.
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub kind: StatementKind,
    /// From the first keyword to the last token, excluding the `;`.
    pub span: Span,
    /// Comment immediately preceding the statement's first token.
    pub leading_comment: Option<Span>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum StatementKind {
    Select(SelectStatement),
    Insert(InsertStatement),
    Update(UpdateStatement),
    Delete(DeleteStatement),
    CreateTable(CreateTableStatement),
    AlterTable(AlterTableStatement),
    DropTable(DropTableStatement),
}

impl StatementKind {
    /// Leading keyword(s), e.g. `CREATE TABLE`.
    #[must_use]
    pub const fn keyword(&self) -> &'static str {
        match self {
            Self::Select(_) => "SELECT",
            Self::Insert(_) => "INSERT",
            Self::Update(_) => "UPDATE",
            Self::Delete(_) => "DELETE",
            Self::CreateTable(_) => "CREATE TABLE",
            Self::AlterTable(_) => "ALTER TABLE",
            Self::DropTable(_) => "DROP TABLE",
        }
    }
}

// ---------------------------------------------------------------------------
// Expressions
// ---------------------------------------------------------------------------

/// An expression (term) node.
#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    pub kind: ExprKind,
    pub span: Span,
    /// Resolved type. `None` before resolution, or when unknown.
    pub ty: Option<SqlType>,
    /// Resolved schema object for identifiers and dotted names.
    pub binding: Option<Binding>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    Constant(Literal),
    Identifier(Ident),
    /// `left.right`; chains nest to the left.
    Dot {
        left: Box<Expr>,
        right: Ident,
    },
    BinaryOp {
        left: Box<Expr>,
        op: BinaryOperator,
        right: Box<Expr>,
    },
    UnaryOp {
        op: UnaryOperator,
        operand: Box<Expr>,
    },
    MethodCall {
        name: Ident,
        args: MethodArgs,
    },
    /// A parenthesized single expression.
    Brackets(Box<Expr>),
    /// `(a, b, ...)`, including the one-element list after `IN`.
    List(Vec<Expr>),
    Subquery(Box<SelectStatement>),
}

#[derive(Debug, Clone, PartialEq)]
pub enum MethodArgs {
    /// `f(*)`; the span covers the star.
    Star(Span),
    List(Vec<Expr>),
}

impl Expr {
    #[must_use]
    pub fn new(kind: ExprKind, span: Span) -> Self {
        Self {
            kind,
            span,
            ty: None,
            binding: None,
        }
    }

    #[must_use]
    pub fn constant(literal: Literal, span: Span) -> Self {
        Self::new(ExprKind::Constant(literal), span)
    }

    #[must_use]
    pub fn ident(ident: Ident) -> Self {
        let span = ident.span;
        Self::new(ExprKind::Identifier(ident), span)
    }

    #[must_use]
    pub fn binary(left: Self, op: BinaryOperator, right: Self) -> Self {
        let span = left.span.merge(right.span);
        Self::new(
            ExprKind::BinaryOp {
                left: Box::new(left),
                op,
                right: Box::new(right),
            },
            span,
        )
    }

    /// The literal value if this is a constant, looking through a leading
    /// minus on a number.
    #[must_use]
    pub fn as_literal(&self) -> Option<Literal> {
        match &self.kind {
            ExprKind::Constant(lit) => Some(lit.clone()),
            ExprKind::UnaryOp {
                op: UnaryOperator::Negate,
                operand,
            } => match &operand.kind {
                ExprKind::Constant(Literal::Integer(i)) => Some(Literal::Integer(i.checked_neg()?)),
                ExprKind::Constant(Literal::Float(v)) => Some(Literal::Float(-v)),
                _ => None,
            },
            ExprKind::Brackets(inner) => inner.as_literal(),
            _ => None,
        }
    }

    /// Visit this node and every descendant expression, pre-order. Subquery
    /// bodies are not entered.
    pub fn walk<'a>(&'a self, visit: &mut impl FnMut(&'a Self)) {
        visit(self);
        match &self.kind {
            ExprKind::Dot { left, .. } => left.walk(visit),
            ExprKind::BinaryOp { left, right, .. } => {
                left.walk(visit);
                right.walk(visit);
            }
            ExprKind::UnaryOp { operand, .. } => operand.walk(visit),
            ExprKind::MethodCall {
                args: MethodArgs::List(args),
                ..
            }
            | ExprKind::List(args) => {
                for arg in args {
                    arg.walk(visit);
                }
            }
            ExprKind::Brackets(inner) => inner.walk(visit),
            ExprKind::Constant(_)
            | ExprKind::Identifier(_)
            | ExprKind::MethodCall { .. }
            | ExprKind::Subquery(_) => {}
        }
    }
}

// ---------------------------------------------------------------------------
// SELECT
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct SelectStatement {
    pub distinct: bool,
    pub columns: Vec<ResultColumn>,
    pub from: Option<FromClause>,
    pub where_clause: Option<Expr>,
    pub group_by: Option<GroupBy>,
    pub order_by: Option<OrderBy>,
    pub limit: Option<Limit>,
    pub span: Span,
    /// Synthetic table holding one column per output column.
    pub result: Option<TableId>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ResultColumn {
    /// `*`
    Star(Span),
    /// `table.*`
    TableStar(Ident),
    Expr { expr: Expr, alias: Option<Ident> },
}

#[derive(Debug, Clone, PartialEq)]
pub struct FromClause {
    pub source: TableOrSubquery,
    pub joins: Vec<Join>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TableOrSubquery {
    Table {
        name: Ident,
        alias: Option<Ident>,
        binding: Option<TableId>,
    },
    Subquery {
        select: Box<SelectStatement>,
        alias: Option<Ident>,
        span: Span,
    },
}

impl TableOrSubquery {
    #[must_use]
    pub fn span(&self) -> Span {
        match self {
            Self::Table { name, alias, .. } => {
                alias.as_ref().map_or(name.span, |a| name.span.merge(a.span))
            }
            Self::Subquery { span, .. } => *span,
        }
    }

    #[must_use]
    pub fn alias(&self) -> Option<&Ident> {
        match self {
            Self::Table { alias, .. } | Self::Subquery { alias, .. } => alias.as_ref(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinOperator {
    /// `a, b`
    Comma,
    /// `JOIN`
    Plain,
    Inner,
    Left,
    LeftOuter,
    Cross,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Join {
    pub natural: bool,
    pub operator: JoinOperator,
    pub table: TableOrSubquery,
    pub on: Option<Expr>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GroupBy {
    pub exprs: Vec<Expr>,
    pub having: Option<Expr>,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NullsOrder {
    First,
    Last,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrderingTerm {
    pub expr: Expr,
    pub direction: Option<SortDirection>,
    pub nulls: Option<NullsOrder>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrderBy {
    pub terms: Vec<OrderingTerm>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Limit {
    pub limit: Expr,
    pub offset: Option<Expr>,
    pub span: Span,
}

// ---------------------------------------------------------------------------
// INSERT / UPDATE / DELETE
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct InsertStatement {
    pub table: Ident,
    pub binding: Option<TableId>,
    /// Explicit column list; empty means every column in table order.
    pub columns: Vec<Ident>,
    pub rows: Vec<ValueRow>,
    /// Destination column of each value position, filled by the resolver.
    pub targets: Vec<ColumnId>,
}

/// One parenthesized `VALUES` tuple.
#[derive(Debug, Clone, PartialEq)]
pub struct ValueRow {
    pub values: Vec<Expr>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Assignment {
    pub column: Ident,
    pub binding: Option<ColumnId>,
    pub value: Expr,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UpdateStatement {
    pub table: Ident,
    pub binding: Option<TableId>,
    pub assignments: Vec<Assignment>,
    pub where_clause: Option<Expr>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DeleteStatement {
    pub table: Ident,
    pub binding: Option<TableId>,
    pub where_clause: Option<Expr>,
}

// ---------------------------------------------------------------------------
// DDL
// ---------------------------------------------------------------------------

/// A column type as written, e.g. `varchar(40)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeName {
    /// Words joined by a single space, e.g. `double precision`.
    pub name: String,
    pub params: Vec<u32>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CreateTableStatement {
    pub if_not_exists: bool,
    pub name: Ident,
    pub columns: Vec<ColumnDef>,
    pub constraints: Vec<TableConstraint>,
    pub binding: Option<TableId>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ColumnDef {
    pub name: Ident,
    pub type_name: Option<TypeName>,
    pub constraints: Vec<ColumnConstraint>,
    pub span: Span,
    /// Resolved from `type_name`.
    pub ty: Option<SqlType>,
    pub binding: Option<ColumnId>,
}

impl ColumnDef {
    #[must_use]
    pub fn has_constraint(&self, pred: impl Fn(&ColumnConstraintKind) -> bool) -> bool {
        self.constraints.iter().any(|c| pred(&c.kind))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ColumnConstraint {
    /// `CONSTRAINT name` prefix.
    pub name: Option<Ident>,
    pub kind: ColumnConstraintKind,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ColumnConstraintKind {
    NotNull,
    Null,
    Default(Expr),
    PrimaryKey {
        direction: Option<SortDirection>,
        autoincrement: bool,
    },
    Unique,
    References(ForeignKeyClause),
    Collate(Ident),
    Check(Expr),
}

/// `REFERENCES table [(columns)]`
#[derive(Debug, Clone, PartialEq)]
pub struct ForeignKeyClause {
    pub table: Ident,
    pub columns: Vec<Ident>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TableConstraint {
    pub name: Option<Ident>,
    pub kind: TableConstraintKind,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TableConstraintKind {
    PrimaryKey(Vec<Ident>),
    Unique(Vec<Ident>),
    Check(Expr),
    ForeignKey {
        columns: Vec<Ident>,
        clause: ForeignKeyClause,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct AlterTableStatement {
    pub table: Ident,
    pub binding: Option<TableId>,
    pub action: AlterTableAction,
}

#[derive(Debug, Clone, PartialEq)]
pub enum AlterTableAction {
    AddColumn(ColumnDef),
    DropColumn(Ident),
    RenameColumn { from: Ident, to: Ident },
    RenameTo(Ident),
}

#[derive(Debug, Clone, PartialEq)]
pub struct DropTableStatement {
    pub if_exists: bool,
    pub table: Ident,
    pub binding: Option<TableId>,
}
