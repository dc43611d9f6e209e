//! Constant values as they appear in SQL text.

use std::fmt;

use serde::Serialize;

use crate::sql_type::{Builtin, SqlType};

/// A constant written in SQL source.
///
/// The variant records the lexical kind the value was written as, so type
/// resolution can match on it exhaustively.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Literal {
    Integer(i64),
    Float(f64),
    Boolean(bool),
    /// Single-quoted string of any length other than one character.
    String(String),
    /// Single-quoted string holding exactly one character.
    Char(char),
    Null,
}

impl Literal {
    /// Build a text literal, choosing `Char` for single-character values.
    #[must_use]
    pub fn text(value: String) -> Self {
        let mut chars = value.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => Self::Char(c),
            _ => Self::String(value),
        }
    }

    /// The type this literal has on its own, or `None` for `NULL`.
    ///
    /// Strings are `varchar(n)` where `n` is their character count.
    #[must_use]
    pub fn sql_type(&self) -> Option<SqlType> {
        match self {
            Self::Integer(_) => Some(SqlType::builtin(Builtin::Integer)),
            Self::Float(_) => Some(SqlType::builtin(Builtin::Real)),
            Self::Boolean(_) => Some(SqlType::builtin(Builtin::Boolean)),
            Self::String(s) => Some(SqlType::derived(
                Builtin::Varchar,
                &[u32::try_from(s.chars().count()).unwrap_or(u32::MAX)],
            )),
            Self::Char(_) => Some(SqlType::derived(Builtin::Char, &[1])),
            Self::Null => None,
        }
    }

    /// The text of a string or char literal.
    #[must_use]
    pub fn as_text(&self) -> Option<std::borrow::Cow<'_, str>> {
        match self {
            Self::String(s) => Some(std::borrow::Cow::Borrowed(s)),
            Self::Char(c) => Some(std::borrow::Cow::Owned(c.to_string())),
            _ => None,
        }
    }

    /// Render as SQL source text.
    #[must_use]
    pub fn to_sql(&self) -> String {
        self.to_string()
    }
}

/// Quote `s` as a SQL string literal, doubling embedded quotes.
#[must_use]
pub fn quote_string(s: &str) -> String {
    format!("'{}'", s.replace('\'', "''"))
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Integer(i) => write!(f, "{i}"),
            // `{:?}` always keeps a decimal point or exponent, so the value
            // lexes back as a float.
            Self::Float(v) => write!(f, "{v:?}"),
            Self::Boolean(true) => f.write_str("TRUE"),
            Self::Boolean(false) => f.write_str("FALSE"),
            Self::String(s) => f.write_str(&quote_string(s)),
            Self::Char(c) => f.write_str(&quote_string(&c.to_string())),
            Self::Null => f.write_str("NULL"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_literal_picks_char_for_single_character() {
        assert_eq!(Literal::text("x".to_owned()), Literal::Char('x'));
        assert_eq!(
            Literal::text("xy".to_owned()),
            Literal::String("xy".to_owned())
        );
        assert_eq!(Literal::text(String::new()), Literal::String(String::new()));
    }

    #[test]
    fn literal_types() {
        assert_eq!(
            Literal::String("hello".to_owned()).sql_type().unwrap().to_string(),
            "varchar(5)"
        );
        assert_eq!(Literal::Char('a').sql_type().unwrap().to_string(), "char(1)");
        assert_eq!(Literal::Integer(3).sql_type().unwrap().to_string(), "integer");
        assert!(Literal::Null.sql_type().is_none());
    }

    #[test]
    fn display_quotes_and_floats() {
        assert_eq!(Literal::String("it's".to_owned()).to_string(), "'it''s'");
        assert_eq!(Literal::Float(1.0).to_string(), "1.0");
        assert_eq!(Literal::Float(2.5).to_string(), "2.5");
        assert_eq!(Literal::Boolean(false).to_string(), "FALSE");
        assert_eq!(Literal::Null.to_string(), "NULL");
    }
}
