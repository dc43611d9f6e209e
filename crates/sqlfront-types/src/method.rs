//! Built-in SQL function signatures.
//!
//! The resolver types a call `name(args)` by filtering the overloads
//! registered under `name`, first by arity, then by whether every argument
//! casts to one of the parameter's accepted types.

use std::collections::HashMap;
use std::sync::LazyLock;

use tracing::debug;

use crate::sql_type::{Builtin, SqlType};

/// Types accepted by one parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamType {
    Any,
    /// The argument must cast to at least one of these.
    OneOf(&'static [Builtin]),
}

impl ParamType {
    fn accepts(self, arg: Option<&SqlType>) -> bool {
        match (self, arg) {
            // Unknown argument types never cascade into a signature error.
            (Self::Any, _) | (_, None) => true,
            (Self::OneOf(kinds), Some(ty)) => kinds.iter().any(|&k| ty.base().can_cast_to(k)),
        }
    }
}

/// How the call's type is derived.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultRule {
    Fixed(Builtin),
    /// Same type as the argument at this index.
    SameAs(usize),
}

/// One overload of a built-in function.
#[derive(Debug, Clone)]
pub struct SqlMethod {
    pub name: &'static str,
    pub params: Vec<ParamType>,
    /// The last parameter may repeat.
    pub variadic: bool,
    pub result: ResultRule,
    pub aggregate: bool,
    /// Accepts a lone `*` argument, as in `count(*)`.
    pub star: bool,
}

impl SqlMethod {
    fn accepts_arity(&self, count: usize) -> bool {
        if self.variadic {
            count >= self.params.len()
        } else {
            count == self.params.len()
        }
    }

    fn param(&self, index: usize) -> ParamType {
        self.params
            .get(index)
            .or_else(|| self.params.last())
            .copied()
            .unwrap_or(ParamType::Any)
    }

    /// Human-readable signature, e.g. `substr(text, integer)`.
    #[must_use]
    pub fn signature(&self) -> String {
        if self.star {
            return format!("{}(*)", self.name);
        }
        let params: Vec<String> = self
            .params
            .iter()
            .map(|p| match p {
                ParamType::Any => "any".to_owned(),
                ParamType::OneOf(kinds) => kinds
                    .iter()
                    .map(|k| k.name())
                    .collect::<Vec<_>>()
                    .join("|"),
            })
            .collect();
        let dots = if self.variadic { ", ..." } else { "" };
        format!("{}({}{dots})", self.name, params.join(", "))
    }
}

/// Outcome of resolving a call against the registry.
#[derive(Debug, Clone, PartialEq)]
pub enum MethodMatch {
    /// A signature accepted the arguments. `ty` is `None` when the result
    /// follows an argument whose type is unknown.
    Resolved {
        ty: Option<SqlType>,
        aggregate: bool,
    },
    UnknownMethod,
    /// Name known, but no overload takes this many arguments.
    WrongArity { expected: Vec<String> },
    /// Arity matched but no overload accepts the argument types.
    NoMatchingSignature { expected: Vec<String> },
}

/// All built-in functions, keyed by lowercase name.
pub struct MethodRegistry {
    methods: HashMap<&'static str, Vec<SqlMethod>>,
}

static METHODS: LazyLock<MethodRegistry> = LazyLock::new(MethodRegistry::builtin);

/// The process-wide method registry.
#[must_use]
pub fn methods() -> &'static MethodRegistry {
    &METHODS
}

const NUMBERS: &[Builtin] = &[
    Builtin::Integer,
    Builtin::Real,
    Builtin::Numeric,
    Builtin::Decimal,
];
const STRINGS: &[Builtin] = &[Builtin::Varchar, Builtin::Char, Builtin::Text];
const TIME_SOURCES: &[Builtin] = &[
    Builtin::Varchar,
    Builtin::Char,
    Builtin::Text,
    Builtin::Date,
    Builtin::Datetime,
];
const INTEGERS: &[Builtin] = &[Builtin::Integer];

impl MethodRegistry {
    fn builtin() -> Self {
        use ParamType::{Any, OneOf};
        use ResultRule::{Fixed, SameAs};

        let mut registry = Self {
            methods: HashMap::new(),
        };
        let mut add = |name: &'static str, params: Vec<ParamType>, result: ResultRule| {
            registry.register(SqlMethod {
                name,
                params,
                variadic: false,
                result,
                aggregate: false,
                star: false,
            });
        };

        add("abs", vec![OneOf(NUMBERS)], SameAs(0));
        add("round", vec![OneOf(NUMBERS)], Fixed(Builtin::Real));
        add("round", vec![OneOf(NUMBERS), OneOf(INTEGERS)], Fixed(Builtin::Real));
        add("length", vec![OneOf(STRINGS)], Fixed(Builtin::Integer));
        add("lower", vec![OneOf(STRINGS)], SameAs(0));
        add("upper", vec![OneOf(STRINGS)], SameAs(0));
        add("trim", vec![OneOf(STRINGS)], SameAs(0));
        add("trim", vec![OneOf(STRINGS), OneOf(STRINGS)], SameAs(0));
        add("substr", vec![OneOf(STRINGS), OneOf(INTEGERS)], Fixed(Builtin::Text));
        add(
            "substr",
            vec![OneOf(STRINGS), OneOf(INTEGERS), OneOf(INTEGERS)],
            Fixed(Builtin::Text),
        );
        add(
            "replace",
            vec![OneOf(STRINGS), OneOf(STRINGS), OneOf(STRINGS)],
            Fixed(Builtin::Text),
        );
        add("ifnull", vec![Any, Any], SameAs(0));
        add("date", vec![OneOf(TIME_SOURCES)], Fixed(Builtin::Date));
        add("datetime", vec![OneOf(TIME_SOURCES)], Fixed(Builtin::Datetime));
        add(
            "strftime",
            vec![OneOf(STRINGS), OneOf(TIME_SOURCES)],
            Fixed(Builtin::Text),
        );
        add("typeof", vec![Any], Fixed(Builtin::Text));
        add("random", vec![], Fixed(Builtin::Integer));

        registry.register(SqlMethod {
            name: "coalesce",
            params: vec![Any, Any],
            variadic: true,
            result: SameAs(0),
            aggregate: false,
            star: false,
        });

        let aggregate = |name, params, result, star| SqlMethod {
            name,
            params,
            variadic: false,
            result,
            aggregate: true,
            star,
        };
        registry.register(aggregate("count", vec![], Fixed(Builtin::Integer), true));
        registry.register(aggregate("count", vec![Any], Fixed(Builtin::Integer), false));
        registry.register(aggregate("sum", vec![OneOf(NUMBERS)], SameAs(0), false));
        registry.register(aggregate("avg", vec![OneOf(NUMBERS)], Fixed(Builtin::Real), false));
        registry.register(aggregate("min", vec![Any], SameAs(0), false));
        registry.register(aggregate("max", vec![Any], SameAs(0), false));

        debug!(
            target: "sqlfront.types",
            names = registry.methods.len(),
            "method registry initialized"
        );
        registry
    }

    /// Add an overload under its name.
    pub fn register(&mut self, method: SqlMethod) {
        self.methods.entry(method.name).or_default().push(method);
    }

    /// All overloads registered for `name` (case-insensitive).
    #[must_use]
    pub fn overloads(&self, name: &str) -> &[SqlMethod] {
        self.methods
            .get(name.to_ascii_lowercase().as_str())
            .map_or(&[][..], Vec::as_slice)
    }

    /// Every registered name, sorted, for completion lists.
    #[must_use]
    pub fn names(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.methods.keys().copied().collect();
        names.sort_unstable();
        names
    }

    /// Resolve `name(args)`. `star` is set for a lone `*` argument.
    #[must_use]
    pub fn resolve(&self, name: &str, args: &[Option<SqlType>], star: bool) -> MethodMatch {
        let overloads = self.overloads(name);
        if overloads.is_empty() {
            debug!(target: "sqlfront.types", name, "method lookup: unknown");
            return MethodMatch::UnknownMethod;
        }
        let expected = || overloads.iter().map(SqlMethod::signature).collect::<Vec<_>>();

        let by_arity: Vec<&SqlMethod> = overloads
            .iter()
            .filter(|m| {
                if star {
                    m.star
                } else {
                    !m.star && m.accepts_arity(args.len())
                }
            })
            .collect();
        if by_arity.is_empty() {
            return MethodMatch::WrongArity {
                expected: expected(),
            };
        }

        let found = by_arity.into_iter().find(|m| {
            args.iter()
                .enumerate()
                .all(|(i, arg)| m.param(i).accepts(arg.as_ref()))
        });
        let Some(method) = found else {
            return MethodMatch::NoMatchingSignature {
                expected: expected(),
            };
        };
        debug!(
            target: "sqlfront.types",
            name,
            arity = args.len(),
            signature = %method.signature(),
            "method lookup: resolved"
        );
        let ty = match method.result {
            ResultRule::Fixed(kind) => Some(SqlType::builtin(kind)),
            ResultRule::SameAs(index) => args.get(index).cloned().flatten(),
        };
        MethodMatch::Resolved {
            ty,
            aggregate: method.aggregate,
        }
    }
}
