//! The SQL type lattice.
//!
//! Every base type is built exactly once, the first time the registry is
//! touched, and never mutated afterwards. A [`SqlType`] is either a reference
//! to one of those base types or a [`DerivedType`] that adds integer
//! parameters such as the length of `varchar(40)` or the precision and scale
//! of `decimal(10,2)`.
//!
//! Casting is a directed adjacency list per base type; it is not transitive.
//! Operator results are a lookup in the left operand's table, keyed by the
//! operator and the right operand's base type.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::LazyLock;

use serde::{Serialize, Serializer};
use smallvec::SmallVec;
use sqlfront_error::{FrontError, Result};

use crate::datetime;
use crate::operator::{BinaryOperator, UnaryOperator};
use crate::value::{Literal, quote_string};

/// Generates a `CHECK` expression for a column of this type, given the
/// already-quoted column name and the type parameters.
pub type ConstraintFn = fn(column: &str, params: &[u32]) -> Option<String>;

/// Renders a literal as SQL text suitable for a column of this type.
pub type FormatFn = fn(value: &Literal) -> String;

// ---------------------------------------------------------------------------
// Builtin names
// ---------------------------------------------------------------------------

/// The built-in base types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Builtin {
    Integer,
    Real,
    Numeric,
    Decimal,
    Varchar,
    Char,
    Text,
    Boolean,
    Date,
    Datetime,
    Blob,
}

impl Builtin {
    pub const ALL: [Self; 11] = [
        Self::Integer,
        Self::Real,
        Self::Numeric,
        Self::Decimal,
        Self::Varchar,
        Self::Char,
        Self::Text,
        Self::Boolean,
        Self::Date,
        Self::Datetime,
        Self::Blob,
    ];

    /// Canonical lowercase name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Integer => "integer",
            Self::Real => "real",
            Self::Numeric => "numeric",
            Self::Decimal => "decimal",
            Self::Varchar => "varchar",
            Self::Char => "char",
            Self::Text => "text",
            Self::Boolean => "boolean",
            Self::Date => "date",
            Self::Datetime => "datetime",
            Self::Blob => "blob",
        }
    }

    /// Resolve a type name or one of its aliases (case-insensitive,
    /// internal whitespace collapsed).
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        let normalized = name
            .split_whitespace()
            .map(str::to_ascii_lowercase)
            .collect::<Vec<_>>()
            .join(" ");
        let kind = match normalized.as_str() {
            "integer" | "int" | "bigint" | "smallint" | "tinyint" | "mediumint" | "int2"
            | "int8" | "unsigned big int" => Self::Integer,
            "real" | "float" | "double" | "double precision" => Self::Real,
            "numeric" | "number" => Self::Numeric,
            "decimal" | "dec" => Self::Decimal,
            "varchar" | "character varying" | "varying character" | "nvarchar" => Self::Varchar,
            "char" | "character" | "nchar" | "native character" => Self::Char,
            "text" | "clob" | "string" => Self::Text,
            "boolean" | "bool" => Self::Boolean,
            "date" => Self::Date,
            "datetime" | "timestamp" => Self::Datetime,
            "blob" => Self::Blob,
            _ => return None,
        };
        Some(kind)
    }

    const fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for Builtin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

const NUMERIC_FAMILY: [Builtin; 4] = [
    Builtin::Integer,
    Builtin::Real,
    Builtin::Numeric,
    Builtin::Decimal,
];
const TEXT_FAMILY: [Builtin; 3] = [Builtin::Varchar, Builtin::Char, Builtin::Text];
const TEMPORAL_FAMILY: [Builtin; 2] = [Builtin::Date, Builtin::Datetime];

// ---------------------------------------------------------------------------
// BaseType
// ---------------------------------------------------------------------------

/// A named, process-wide SQL type.
pub struct BaseType {
    kind: Builtin,
    /// Human descriptions of the accepted parameters, e.g. `["length"]`.
    params: &'static [&'static str],
    constraint: ConstraintFn,
    format: FormatFn,
    casts: Vec<Builtin>,
    unary: HashSet<UnaryOperator>,
    binary: HashMap<BinaryOperator, HashMap<Builtin, Builtin>>,
}

impl BaseType {
    #[must_use]
    pub const fn kind(&self) -> Builtin {
        self.kind
    }

    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.kind.name()
    }

    #[must_use]
    pub const fn param_descriptions(&self) -> &'static [&'static str] {
        self.params
    }

    /// Whether a value of this type may be stored into `target`.
    #[must_use]
    pub fn can_cast_to(&self, target: Builtin) -> bool {
        self.casts.contains(&target)
    }

    /// Type names this type casts to, in registration order.
    pub fn cast_targets(&self) -> impl Iterator<Item = Builtin> + '_ {
        self.casts.iter().copied()
    }

    #[must_use]
    pub fn supports_unary(&self, op: UnaryOperator) -> bool {
        self.unary.contains(&op)
    }

    /// Result base type of `self op other`, if the pair is registered.
    #[must_use]
    pub fn binary_result(&self, op: BinaryOperator, other: Builtin) -> Option<&'static Self> {
        self.binary
            .get(&op)?
            .get(&other)
            .map(|&kind| registry().get(kind))
    }

    /// Generate a check expression for `column` with parameters `params`.
    #[must_use]
    pub fn constraint(&self, column: &str, params: &[u32]) -> Option<String> {
        (self.constraint)(column, params)
    }

    /// Render `value` for storage in a column of this type.
    #[must_use]
    pub fn format_value(&self, value: &Literal) -> String {
        (self.format)(value)
    }
}

impl PartialEq for BaseType {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind
    }
}

impl Eq for BaseType {}

impl Hash for BaseType {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.kind.hash(state);
    }
}

impl fmt::Debug for BaseType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BaseType")
            .field("name", &self.name())
            .field("params", &self.params)
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// Write-once table of every base type.
pub struct TypeRegistry {
    types: Vec<BaseType>,
}

static REGISTRY: LazyLock<TypeRegistry> = LazyLock::new(build_registry);

/// The process-wide type registry.
#[must_use]
pub fn registry() -> &'static TypeRegistry {
    &REGISTRY
}

impl TypeRegistry {
    /// The singleton for `kind`.
    #[must_use]
    pub fn get(&'static self, kind: Builtin) -> &'static BaseType {
        &self.types[kind.index()]
    }

    /// Look up by name or alias.
    #[must_use]
    pub fn lookup(&'static self, name: &str) -> Option<&'static BaseType> {
        Builtin::from_name(name).map(|kind| self.get(kind))
    }

    pub fn iter(&'static self) -> impl Iterator<Item = &'static BaseType> {
        self.types.iter()
    }
}

struct RegistryBuilder {
    types: Vec<BaseType>,
}

impl RegistryBuilder {
    fn define(
        &mut self,
        kind: Builtin,
        params: &'static [&'static str],
        constraint: ConstraintFn,
        format: FormatFn,
        casts: &[Builtin],
    ) {
        debug_assert_eq!(self.types.len(), kind.index());
        self.types.push(BaseType {
            kind,
            params,
            constraint,
            format,
            casts: casts.to_vec(),
            unary: HashSet::new(),
            binary: HashMap::new(),
        });
    }

    fn unary(&mut self, kind: Builtin, op: UnaryOperator) {
        self.types[kind.index()].unary.insert(op);
    }

    /// Register `left op right -> result`, and the mirrored pair when
    /// `commutative` is set.
    fn binary(
        &mut self,
        ops: &[BinaryOperator],
        left: Builtin,
        right: Builtin,
        result: Builtin,
        commutative: bool,
    ) {
        for &op in ops {
            self.types[left.index()]
                .binary
                .entry(op)
                .or_default()
                .insert(right, result);
            if commutative {
                self.types[right.index()]
                    .binary
                    .entry(op)
                    .or_default()
                    .insert(left, result);
            }
        }
    }
}

const ARITHMETIC: [BinaryOperator; 5] = [
    BinaryOperator::Add,
    BinaryOperator::Subtract,
    BinaryOperator::Multiply,
    BinaryOperator::Divide,
    BinaryOperator::Modulo,
];

const ORDERING: [BinaryOperator; 6] = [
    BinaryOperator::Eq,
    BinaryOperator::NotEq,
    BinaryOperator::Lt,
    BinaryOperator::Le,
    BinaryOperator::Gt,
    BinaryOperator::Ge,
];

const EQUALITY: [BinaryOperator; 2] = [BinaryOperator::Eq, BinaryOperator::NotEq];

const PATTERN: [BinaryOperator; 2] = [BinaryOperator::Like, BinaryOperator::NotLike];

#[allow(clippy::too_many_lines)]
fn build_registry() -> TypeRegistry {
    use Builtin::{
        Blob, Boolean, Char, Date, Datetime, Decimal, Integer, Numeric, Real, Text, Varchar,
    };

    let mut b = RegistryBuilder {
        types: Vec::with_capacity(Builtin::ALL.len()),
    };

    b.define(
        Integer,
        &[],
        no_constraint,
        format_default,
        &[Integer, Real, Numeric, Decimal, Boolean, Varchar, Char, Text],
    );
    b.define(
        Real,
        &[],
        no_constraint,
        format_default,
        &[Real, Numeric, Decimal, Varchar, Text],
    );
    b.define(
        Numeric,
        &[],
        no_constraint,
        format_default,
        &[Numeric, Real, Decimal, Integer, Varchar, Text],
    );
    b.define(
        Decimal,
        &["precision", "scale"],
        no_constraint,
        format_default,
        &[Decimal, Numeric, Real, Varchar, Text],
    );
    b.define(
        Varchar,
        &["maximum length"],
        length_constraint,
        format_text,
        &[Varchar, Char, Text, Date, Datetime],
    );
    b.define(
        Char,
        &["length"],
        length_constraint,
        format_text,
        &[Char, Varchar, Text],
    );
    b.define(
        Text,
        &[],
        no_constraint,
        format_text,
        &[Text, Varchar, Char, Date, Datetime, Blob],
    );
    b.define(
        Boolean,
        &[],
        boolean_constraint,
        format_default,
        &[Boolean, Integer],
    );
    b.define(
        Date,
        &[],
        date_constraint,
        format_date,
        &[Date, Datetime, Varchar, Text],
    );
    b.define(
        Datetime,
        &[],
        datetime_constraint,
        format_datetime,
        &[Datetime, Date, Varchar, Text],
    );
    b.define(Blob, &[], no_constraint, format_default, &[Blob]);

    // Unary.
    for kind in NUMERIC_FAMILY {
        b.unary(kind, UnaryOperator::Negate);
    }
    b.unary(Boolean, UnaryOperator::Not);

    // Arithmetic.
    b.binary(&ARITHMETIC, Integer, Integer, Integer, false);
    b.binary(&ARITHMETIC, Real, Real, Real, false);
    b.binary(&ARITHMETIC, Numeric, Numeric, Numeric, false);
    b.binary(&ARITHMETIC, Decimal, Decimal, Decimal, false);
    b.binary(&ARITHMETIC, Integer, Real, Real, true);
    b.binary(&ARITHMETIC, Integer, Numeric, Numeric, true);
    b.binary(&ARITHMETIC, Real, Numeric, Numeric, true);
    b.binary(&ARITHMETIC, Decimal, Integer, Decimal, true);
    b.binary(&ARITHMETIC, Decimal, Real, Real, true);
    b.binary(&ARITHMETIC, Decimal, Numeric, Numeric, true);

    // Concatenation. `+` on two varchars concatenates as well.
    let concat = [BinaryOperator::Concat];
    b.binary(&[BinaryOperator::Concat, BinaryOperator::Add], Varchar, Varchar, Varchar, false);
    b.binary(&concat, Char, Char, Varchar, false);
    b.binary(&concat, Varchar, Char, Varchar, true);
    for kind in TEXT_FAMILY {
        b.binary(&concat, Text, kind, Text, true);
    }
    for number in [Integer, Real] {
        b.binary(&concat, Varchar, number, Varchar, true);
        b.binary(&concat, Char, number, Varchar, true);
        b.binary(&concat, Text, number, Text, true);
    }

    // Comparison.
    for left in NUMERIC_FAMILY {
        for right in NUMERIC_FAMILY {
            b.binary(&ORDERING, left, right, Boolean, false);
        }
    }
    for left in TEXT_FAMILY {
        for right in TEXT_FAMILY {
            b.binary(&ORDERING, left, right, Boolean, false);
            b.binary(&PATTERN, left, right, Boolean, false);
        }
        for right in TEMPORAL_FAMILY {
            b.binary(&ORDERING, left, right, Boolean, true);
        }
    }
    for left in TEMPORAL_FAMILY {
        for right in TEMPORAL_FAMILY {
            b.binary(&ORDERING, left, right, Boolean, false);
        }
    }
    b.binary(&EQUALITY, Boolean, Boolean, Boolean, false);
    b.binary(&EQUALITY, Boolean, Integer, Boolean, true);
    b.binary(&EQUALITY, Blob, Blob, Boolean, false);

    // Logical.
    b.binary(
        &[BinaryOperator::And, BinaryOperator::Or],
        Boolean,
        Boolean,
        Boolean,
        false,
    );

    tracing::debug!(
        target: "sqlfront.types",
        types = b.types.len(),
        "type registry initialized"
    );
    TypeRegistry { types: b.types }
}

// ---------------------------------------------------------------------------
// Constraint and format functions
// ---------------------------------------------------------------------------

fn no_constraint(_column: &str, _params: &[u32]) -> Option<String> {
    None
}

fn length_constraint(column: &str, params: &[u32]) -> Option<String> {
    params
        .first()
        .map(|n| format!("length({column}) <= {n}"))
}

fn boolean_constraint(column: &str, _params: &[u32]) -> Option<String> {
    Some(format!("{column} IN (0, 1)"))
}

fn date_constraint(column: &str, _params: &[u32]) -> Option<String> {
    Some(format!("{column} = date({column})"))
}

fn datetime_constraint(column: &str, _params: &[u32]) -> Option<String> {
    Some(format!("{column} = datetime({column})"))
}

fn format_default(value: &Literal) -> String {
    match value {
        Literal::Boolean(b) => u8::from(*b).to_string(),
        other => other.to_sql(),
    }
}

fn format_text(value: &Literal) -> String {
    match value {
        Literal::Integer(i) => quote_string(&i.to_string()),
        Literal::Float(v) => quote_string(&format!("{v:?}")),
        other => format_default(other),
    }
}

fn format_date(value: &Literal) -> String {
    match value.as_text().and_then(|s| datetime::normalize_date(&s)) {
        Some(normalized) => quote_string(&normalized),
        None => format_text(value),
    }
}

fn format_datetime(value: &Literal) -> String {
    match value.as_text().and_then(|s| datetime::normalize_datetime(&s)) {
        Some(normalized) => quote_string(&normalized),
        None => format_text(value),
    }
}

// ---------------------------------------------------------------------------
// SqlType
// ---------------------------------------------------------------------------

/// A base type with integer parameters, e.g. `varchar(40)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DerivedType {
    base: &'static BaseType,
    params: SmallVec<[u32; 2]>,
}

impl DerivedType {
    #[must_use]
    pub const fn base(&self) -> &'static BaseType {
        self.base
    }

    #[must_use]
    pub fn params(&self) -> &[u32] {
        &self.params
    }
}

/// The resolved type of a column or expression.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SqlType {
    Base(&'static BaseType),
    Derived(DerivedType),
}

impl SqlType {
    /// The unparameterized builtin `kind`.
    #[must_use]
    pub fn builtin(kind: Builtin) -> Self {
        Self::Base(registry().get(kind))
    }

    /// `kind` with parameters. An empty parameter list yields the base type.
    #[must_use]
    pub fn derived(kind: Builtin, params: &[u32]) -> Self {
        let base = registry().get(kind);
        if params.is_empty() {
            Self::Base(base)
        } else {
            Self::Derived(DerivedType {
                base,
                params: SmallVec::from_slice(params),
            })
        }
    }

    /// Build from a type name and parameters, as written in a column
    /// definition.
    ///
    /// Parameters given to a type that takes none are ignored, matching how
    /// SQLite accepts `INTEGER(11)`.
    pub fn from_parts(name: &str, params: &[u32]) -> Result<Self> {
        let base = registry()
            .lookup(name)
            .ok_or_else(|| FrontError::UnknownType {
                name: name.trim().to_owned(),
            })?;
        let accepted = base.param_descriptions().len();
        if params.len() > accepted && accepted > 0 {
            return Err(FrontError::MalformedType {
                raw: render(base.name(), params),
            });
        }
        if accepted == 0 {
            if !params.is_empty() {
                tracing::debug!(
                    target: "sqlfront.types",
                    ty = base.name(),
                    "ignoring parameters on unparameterized type"
                );
            }
            return Ok(Self::Base(base));
        }
        Ok(Self::derived(base.kind(), params))
    }

    /// Parse a raw column type string such as `varchar(40)` or
    /// `DECIMAL(10, 2)`.
    pub fn parse(raw: &str) -> Result<Self> {
        let malformed = || FrontError::MalformedType {
            raw: raw.to_owned(),
        };
        let trimmed = raw.trim();
        let (name, rest) = match trimmed.find('(') {
            Some(open) => (&trimmed[..open], Some(&trimmed[open + 1..])),
            None => (trimmed, None),
        };
        if name.trim().is_empty() {
            return Err(malformed());
        }
        let mut params = SmallVec::<[u32; 2]>::new();
        if let Some(rest) = rest {
            let inner = rest.strip_suffix(')').ok_or_else(malformed)?;
            for part in inner.split(',') {
                let n = part.trim().parse::<u32>().map_err(|_| malformed())?;
                params.push(n);
            }
        }
        Self::from_parts(name, &params)
    }

    #[must_use]
    pub fn base(&self) -> &'static BaseType {
        match self {
            Self::Base(base) => base,
            Self::Derived(derived) => derived.base,
        }
    }

    #[must_use]
    pub fn kind(&self) -> Builtin {
        self.base().kind()
    }

    #[must_use]
    pub fn params(&self) -> &[u32] {
        match self {
            Self::Base(_) => &[],
            Self::Derived(derived) => &derived.params,
        }
    }

    #[must_use]
    pub fn is(&self, kind: Builtin) -> bool {
        self.kind() == kind
    }

    /// Directed, non-transitive cast check. Parameters do not matter.
    #[must_use]
    pub fn can_cast_to(&self, target: &Self) -> bool {
        self.base().can_cast_to(target.kind())
    }

    /// Result type of `self op other`, or `None` when the operator is not
    /// defined for the pair.
    ///
    /// Concatenation, and `+` producing a varchar, add the operands' lengths
    /// when both have one. Decimal arithmetic takes the component-wise
    /// maximum of both operands' (precision, scale); with only one
    /// parameterized decimal operand its parameters carry over.
    #[must_use]
    pub fn result_type(&self, op: BinaryOperator, other: &Self) -> Option<Self> {
        let result = self.base().binary_result(op, other.kind())?;
        let grown = match result.kind() {
            Builtin::Varchar if matches!(op, BinaryOperator::Concat | BinaryOperator::Add) => {
                match (self.params(), other.params()) {
                    ([a], [b]) => Some(Self::derived(Builtin::Varchar, &[a.saturating_add(*b)])),
                    _ => None,
                }
            }
            Builtin::Decimal if op.is_arithmetic() => {
                let left = self.decimal_params();
                let right = other.decimal_params();
                match (left, right) {
                    (Some(l), Some(r)) => {
                        let len = l.len().max(r.len());
                        let widened: SmallVec<[u32; 2]> = (0..len)
                            .map(|i| {
                                l.get(i).copied().unwrap_or(0).max(r.get(i).copied().unwrap_or(0))
                            })
                            .collect();
                        Some(Self::derived(Builtin::Decimal, &widened))
                    }
                    (Some(p), None) | (None, Some(p)) => Some(Self::derived(Builtin::Decimal, p)),
                    (None, None) => None,
                }
            }
            _ => None,
        };
        Some(grown.unwrap_or(Self::Base(result)))
    }

    fn decimal_params(&self) -> Option<&[u32]> {
        (self.is(Builtin::Decimal) && !self.params().is_empty()).then(|| self.params())
    }

    /// Result type of `op self`, or `None` when unsupported.
    #[must_use]
    pub fn unary_result(&self, op: UnaryOperator) -> Option<Self> {
        if !self.base().supports_unary(op) {
            return None;
        }
        Some(match op {
            UnaryOperator::Negate => self.clone(),
            UnaryOperator::Not => Self::builtin(Builtin::Boolean),
        })
    }

    /// Check constraint for a column of this type, if the type has one.
    #[must_use]
    pub fn constraint(&self, column: &str) -> Option<String> {
        self.base().constraint(column, self.params())
    }

    #[must_use]
    pub fn format_value(&self, value: &Literal) -> String {
        self.base().format_value(value)
    }
}

fn render(name: &str, params: &[u32]) -> String {
    if params.is_empty() {
        return name.to_owned();
    }
    let list = params
        .iter()
        .map(u32::to_string)
        .collect::<Vec<_>>()
        .join(",");
    format!("{name}({list})")
}

impl fmt::Display for SqlType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&render(self.base().name(), self.params()))
    }
}

impl Serialize for SqlType {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ty(raw: &str) -> SqlType {
        SqlType::parse(raw).unwrap()
    }

    #[test]
    fn parse_plain_and_parameterized() {
        assert_eq!(ty("INTEGER"), SqlType::builtin(Builtin::Integer));
        assert_eq!(ty("varchar(40)").to_string(), "varchar(40)");
        assert_eq!(ty(" DECIMAL ( 10 , 2 ) ").to_string(), "decimal(10,2)");
        assert_eq!(ty("int").kind(), Builtin::Integer);
        assert_eq!(ty("double precision").kind(), Builtin::Real);
        assert_eq!(ty("INTEGER(11)"), SqlType::builtin(Builtin::Integer));
    }

    #[test]
    fn parse_rejects_malformed() {
        assert!(matches!(
            SqlType::parse("varchar(40"),
            Err(FrontError::MalformedType { .. })
        ));
        assert!(matches!(
            SqlType::parse("varchar(x)"),
            Err(FrontError::MalformedType { .. })
        ));
        assert!(matches!(
            SqlType::parse("varchar(1,2)"),
            Err(FrontError::MalformedType { .. })
        ));
        assert!(matches!(
            SqlType::parse("geometry"),
            Err(FrontError::UnknownType { .. })
        ));
        assert!(matches!(SqlType::parse(""), Err(FrontError::MalformedType { .. })));
    }

    #[test]
    fn registry_singletons() {
        let a = registry().get(Builtin::Varchar);
        let b = registry().lookup("NVARCHAR").unwrap();
        assert!(std::ptr::eq(a, b));
        assert_eq!(registry().iter().count(), Builtin::ALL.len());
        for kind in Builtin::ALL {
            assert_eq!(registry().get(kind).kind(), kind);
        }
    }

    #[test]
    fn casts_are_directed() {
        assert!(ty("decimal(5,2)").can_cast_to(&ty("numeric")));
        assert!(ty("integer").can_cast_to(&ty("boolean")));
        assert!(!ty("real").can_cast_to(&ty("integer")));
        assert!(ty("varchar(10)").can_cast_to(&ty("date")));
        assert!(!ty("date").can_cast_to(&ty("integer")));
        assert!(!ty("blob").can_cast_to(&ty("text")));
    }

    #[test]
    fn casts_are_not_transitive() {
        // boolean -> integer -> real, but not boolean -> real.
        assert!(ty("boolean").can_cast_to(&ty("integer")));
        assert!(ty("integer").can_cast_to(&ty("real")));
        assert!(!ty("boolean").can_cast_to(&ty("real")));
    }

    #[test]
    fn decimal_arithmetic_widens() {
        let sum = ty("decimal(5,2)")
            .result_type(BinaryOperator::Add, &ty("decimal(3,1)"))
            .unwrap();
        assert_eq!(sum.to_string(), "decimal(5,2)");

        let product = ty("decimal(3,4)")
            .result_type(BinaryOperator::Multiply, &ty("decimal(6,1)"))
            .unwrap();
        assert_eq!(product.params(), &[6, 4]);

        let mixed = ty("decimal(7,3)")
            .result_type(BinaryOperator::Subtract, &ty("integer"))
            .unwrap();
        assert_eq!(mixed.to_string(), "decimal(7,3)");

        let bare = ty("decimal").result_type(BinaryOperator::Add, &ty("decimal")).unwrap();
        assert_eq!(bare.to_string(), "decimal");
    }

    #[test]
    fn concatenation_sums_lengths() {
        let joined = ty("varchar(10)")
            .result_type(BinaryOperator::Concat, &ty("varchar(20)"))
            .unwrap();
        assert_eq!(joined.to_string(), "varchar(30)");

        let added = ty("varchar(3)")
            .result_type(BinaryOperator::Add, &ty("varchar(4)"))
            .unwrap();
        assert_eq!(added.to_string(), "varchar(7)");

        let chars = ty("char(2)").result_type(BinaryOperator::Concat, &ty("char(1)")).unwrap();
        assert_eq!(chars.to_string(), "varchar(3)");

        let text = ty("text").result_type(BinaryOperator::Concat, &ty("varchar(5)")).unwrap();
        assert_eq!(text.to_string(), "text");

        let bare = ty("varchar(5)")
            .result_type(BinaryOperator::Concat, &ty("integer"))
            .unwrap();
        assert_eq!(bare.to_string(), "varchar");
    }

    #[test]
    fn commutative_pairs_register_both_directions() {
        assert_eq!(
            ty("integer").result_type(BinaryOperator::Add, &ty("real")),
            Some(ty("real"))
        );
        assert_eq!(
            ty("real").result_type(BinaryOperator::Add, &ty("integer")),
            Some(ty("real"))
        );
    }

    #[test]
    fn undefined_operators_yield_none() {
        assert!(ty("integer").result_type(BinaryOperator::Add, &ty("varchar(3)")).is_none());
        assert!(ty("date").result_type(BinaryOperator::Multiply, &ty("date")).is_none());
        assert!(ty("integer").result_type(BinaryOperator::And, &ty("integer")).is_none());
    }

    #[test]
    fn comparisons_yield_boolean() {
        let b = ty("integer").result_type(BinaryOperator::Eq, &ty("integer")).unwrap();
        assert!(b.is(Builtin::Boolean));
        let like = ty("varchar(4)").result_type(BinaryOperator::Like, &ty("text")).unwrap();
        assert!(like.is(Builtin::Boolean));
        let dates = ty("date").result_type(BinaryOperator::Lt, &ty("varchar(10)")).unwrap();
        assert!(dates.is(Builtin::Boolean));
    }

    #[test]
    fn unary_operators() {
        assert_eq!(ty("decimal(4,1)").unary_result(UnaryOperator::Negate), Some(ty("decimal(4,1)")));
        assert_eq!(ty("boolean").unary_result(UnaryOperator::Not), Some(ty("boolean")));
        assert!(ty("text").unary_result(UnaryOperator::Negate).is_none());
        assert!(ty("integer").unary_result(UnaryOperator::Not).is_none());
    }

    #[test]
    fn constraints() {
        assert_eq!(
            ty("varchar(40)").constraint("\"name\"").as_deref(),
            Some("length(\"name\") <= 40")
        );
        assert_eq!(ty("varchar").constraint("c"), None);
        assert_eq!(ty("date").constraint("d").as_deref(), Some("d = date(d)"));
        assert_eq!(ty("datetime").constraint("t").as_deref(), Some("t = datetime(t)"));
        assert_eq!(ty("boolean").constraint("f").as_deref(), Some("f IN (0, 1)"));
        assert_eq!(ty("integer").constraint("i"), None);
    }

    #[test]
    fn value_formatting() {
        assert_eq!(ty("boolean").format_value(&Literal::Boolean(true)), "1");
        assert_eq!(ty("integer").format_value(&Literal::Boolean(false)), "0");
        assert_eq!(ty("integer").format_value(&Literal::Integer(-4)), "-4");
        assert_eq!(
            ty("text").format_value(&Literal::String("O'Hara".to_owned())),
            "'O''Hara'"
        );
        assert_eq!(ty("varchar(5)").format_value(&Literal::Integer(42)), "'42'");
        assert_eq!(
            ty("date").format_value(&Literal::String("2024-2-9".to_owned())),
            "'2024-02-09'"
        );
        assert_eq!(ty("date").format_value(&Literal::Null), "NULL");
    }

    #[test]
    fn serializes_as_display_string() {
        let json = serde_json::to_string(&ty("decimal(10,2)")).unwrap();
        assert_eq!(json, "\"decimal(10,2)\"");
    }
}
