// SQL token model.
//
// Every token carries a discriminant, a byte-offset Span, and the 0-based
// line/column of its first byte. Keywords are their own variants so the
// parser can match them directly.

use std::fmt;

use sqlfront_error::{Pos, Range, Span};

/// A single token produced by the lexer.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    /// Byte-offset span into the original source.
    pub span: Span,
    /// 0-based line of the first byte.
    pub line: u32,
    /// 0-based byte column of the first byte.
    pub column: u32,
    /// Position one past the last byte.
    pub end: Pos,
    /// Nearest comment preceding this token, for substantive tokens only.
    pub leading_comment: Option<Span>,
}

impl Token {
    #[must_use]
    pub const fn pos(&self) -> Pos {
        Pos::new(self.line, self.column)
    }

    #[must_use]
    pub const fn range(&self) -> Range {
        Range::new(self.pos(), self.end)
    }

    /// Length in bytes.
    #[must_use]
    pub const fn len(&self) -> u32 {
        self.span.len()
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.span.is_empty()
    }
}

/// Token discriminant.
#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    // === Literals ===
    Integer(i64),
    Float(f64),
    /// Single-quoted string of any length other than one character.
    String(String),
    /// Single-quoted string holding exactly one character.
    Char(char),

    // === Identifiers ===
    Id(String),
    /// `"name"`, `` `name` `` or `[name]`, quotes removed.
    QuotedId(String),

    // === Operators ===
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Eq,    // `=` or `==`
    NotEq, // `<>` or `!=`
    Lt,
    Le,
    Gt,
    Ge,
    Concat, // `||`

    // === Punctuation ===
    Dot,
    Comma,
    Semicolon,
    LeftParen,
    RightParen,

    // === Keywords ===
    KwAdd,
    KwAll,
    KwAlter,
    KwAnd,
    KwAs,
    KwAsc,
    KwAutoincrement,
    KwBy,
    KwCheck,
    KwCollate,
    KwColumn,
    KwConstraint,
    KwCreate,
    KwCross,
    KwDefault,
    KwDelete,
    KwDesc,
    KwDistinct,
    KwDrop,
    KwExists,
    KwFalse,
    KwFirst,
    KwForeign,
    KwFrom,
    KwGroup,
    KwHaving,
    KwIf,
    KwIn,
    KwInner,
    KwInsert,
    KwInto,
    KwJoin,
    KwKey,
    KwLast,
    KwLeft,
    KwLike,
    KwLimit,
    KwNatural,
    KwNot,
    KwNull,
    KwNulls,
    KwOffset,
    KwOn,
    KwOr,
    KwOrder,
    KwOuter,
    KwPrimary,
    KwReferences,
    KwRename,
    KwSelect,
    KwSet,
    KwTable,
    KwTo,
    KwTrue,
    KwUnique,
    KwUpdate,
    KwValues,
    KwWhere,

    // === Trivia ===
    Whitespace,
    Newline,
    LineComment,
    BlockComment,

    // === Special ===
    /// End of input.
    Eof,
}

impl TokenKind {
    /// Look up an identifier string to see if it's a keyword.
    #[must_use]
    pub fn lookup_keyword(s: &str) -> Option<Self> {
        let kw = match s.to_ascii_uppercase().as_str() {
            "ADD" => Self::KwAdd,
            "ALL" => Self::KwAll,
            "ALTER" => Self::KwAlter,
            "AND" => Self::KwAnd,
            "AS" => Self::KwAs,
            "ASC" => Self::KwAsc,
            "AUTOINCREMENT" => Self::KwAutoincrement,
            "BY" => Self::KwBy,
            "CHECK" => Self::KwCheck,
            "COLLATE" => Self::KwCollate,
            "COLUMN" => Self::KwColumn,
            "CONSTRAINT" => Self::KwConstraint,
            "CREATE" => Self::KwCreate,
            "CROSS" => Self::KwCross,
            "DEFAULT" => Self::KwDefault,
            "DELETE" => Self::KwDelete,
            "DESC" => Self::KwDesc,
            "DISTINCT" => Self::KwDistinct,
            "DROP" => Self::KwDrop,
            "EXISTS" => Self::KwExists,
            "FALSE" => Self::KwFalse,
            "FIRST" => Self::KwFirst,
            "FOREIGN" => Self::KwForeign,
            "FROM" => Self::KwFrom,
            "GROUP" => Self::KwGroup,
            "HAVING" => Self::KwHaving,
            "IF" => Self::KwIf,
            "IN" => Self::KwIn,
            "INNER" => Self::KwInner,
            "INSERT" => Self::KwInsert,
            "INTO" => Self::KwInto,
            "JOIN" => Self::KwJoin,
            "KEY" => Self::KwKey,
            "LAST" => Self::KwLast,
            "LEFT" => Self::KwLeft,
            "LIKE" => Self::KwLike,
            "LIMIT" => Self::KwLimit,
            "NATURAL" => Self::KwNatural,
            "NOT" => Self::KwNot,
            "NULL" => Self::KwNull,
            "NULLS" => Self::KwNulls,
            "OFFSET" => Self::KwOffset,
            "ON" => Self::KwOn,
            "OR" => Self::KwOr,
            "ORDER" => Self::KwOrder,
            "OUTER" => Self::KwOuter,
            "PRIMARY" => Self::KwPrimary,
            "REFERENCES" => Self::KwReferences,
            "RENAME" => Self::KwRename,
            "SELECT" => Self::KwSelect,
            "SET" => Self::KwSet,
            "TABLE" => Self::KwTable,
            "TO" => Self::KwTo,
            "TRUE" => Self::KwTrue,
            "UNIQUE" => Self::KwUnique,
            "UPDATE" => Self::KwUpdate,
            "VALUES" => Self::KwValues,
            "WHERE" => Self::KwWhere,
            _ => return None,
        };
        Some(kw)
    }

    /// Upper-case spelling for keywords, `None` for everything else.
    #[must_use]
    pub const fn keyword_str(&self) -> Option<&'static str> {
        let s = match self {
            Self::KwAdd => "ADD",
            Self::KwAll => "ALL",
            Self::KwAlter => "ALTER",
            Self::KwAnd => "AND",
            Self::KwAs => "AS",
            Self::KwAsc => "ASC",
            Self::KwAutoincrement => "AUTOINCREMENT",
            Self::KwBy => "BY",
            Self::KwCheck => "CHECK",
            Self::KwCollate => "COLLATE",
            Self::KwColumn => "COLUMN",
            Self::KwConstraint => "CONSTRAINT",
            Self::KwCreate => "CREATE",
            Self::KwCross => "CROSS",
            Self::KwDefault => "DEFAULT",
            Self::KwDelete => "DELETE",
            Self::KwDesc => "DESC",
            Self::KwDistinct => "DISTINCT",
            Self::KwDrop => "DROP",
            Self::KwExists => "EXISTS",
            Self::KwFalse => "FALSE",
            Self::KwFirst => "FIRST",
            Self::KwForeign => "FOREIGN",
            Self::KwFrom => "FROM",
            Self::KwGroup => "GROUP",
            Self::KwHaving => "HAVING",
            Self::KwIf => "IF",
            Self::KwIn => "IN",
            Self::KwInner => "INNER",
            Self::KwInsert => "INSERT",
            Self::KwInto => "INTO",
            Self::KwJoin => "JOIN",
            Self::KwKey => "KEY",
            Self::KwLast => "LAST",
            Self::KwLeft => "LEFT",
            Self::KwLike => "LIKE",
            Self::KwLimit => "LIMIT",
            Self::KwNatural => "NATURAL",
            Self::KwNot => "NOT",
            Self::KwNull => "NULL",
            Self::KwNulls => "NULLS",
            Self::KwOffset => "OFFSET",
            Self::KwOn => "ON",
            Self::KwOr => "OR",
            Self::KwOrder => "ORDER",
            Self::KwOuter => "OUTER",
            Self::KwPrimary => "PRIMARY",
            Self::KwReferences => "REFERENCES",
            Self::KwRename => "RENAME",
            Self::KwSelect => "SELECT",
            Self::KwSet => "SET",
            Self::KwTable => "TABLE",
            Self::KwTo => "TO",
            Self::KwTrue => "TRUE",
            Self::KwUnique => "UNIQUE",
            Self::KwUpdate => "UPDATE",
            Self::KwValues => "VALUES",
            Self::KwWhere => "WHERE",
            _ => return None,
        };
        Some(s)
    }

    /// Whitespace, newlines, and comments.
    #[must_use]
    pub const fn is_trivia(&self) -> bool {
        matches!(
            self,
            Self::Whitespace | Self::Newline | Self::LineComment | Self::BlockComment
        )
    }

    #[must_use]
    pub const fn is_comment(&self) -> bool {
        matches!(self, Self::LineComment | Self::BlockComment)
    }

    /// Keywords that begin a statement; error recovery resumes at these.
    #[must_use]
    pub const fn is_statement_start(&self) -> bool {
        matches!(
            self,
            Self::KwSelect
                | Self::KwInsert
                | Self::KwUpdate
                | Self::KwDelete
                | Self::KwCreate
                | Self::KwAlter
                | Self::KwDrop
        )
    }

    /// Keywords that may still be used as a bare identifier.
    ///
    /// These never begin an expression or clause where a name is expected,
    /// so `first`, `last`, `key` and friends stay usable as column names.
    #[must_use]
    pub const fn is_soft_keyword(&self) -> bool {
        matches!(
            self,
            Self::KwFirst
                | Self::KwLast
                | Self::KwKey
                | Self::KwNulls
                | Self::KwColumn
                | Self::KwAdd
                | Self::KwRename
                | Self::KwTo
                | Self::KwIf
        )
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(kw) = self.keyword_str() {
            return f.write_str(kw);
        }
        match self {
            Self::Integer(i) => write!(f, "{i}"),
            Self::Float(v) => write!(f, "{v:?}"),
            Self::String(_) | Self::Char(_) => f.write_str("string"),
            Self::Id(name) | Self::QuotedId(name) => write!(f, "identifier {name}"),
            Self::Plus => f.write_str("'+'"),
            Self::Minus => f.write_str("'-'"),
            Self::Star => f.write_str("'*'"),
            Self::Slash => f.write_str("'/'"),
            Self::Percent => f.write_str("'%'"),
            Self::Eq => f.write_str("'='"),
            Self::NotEq => f.write_str("'<>'"),
            Self::Lt => f.write_str("'<'"),
            Self::Le => f.write_str("'<='"),
            Self::Gt => f.write_str("'>'"),
            Self::Ge => f.write_str("'>='"),
            Self::Concat => f.write_str("'||'"),
            Self::Dot => f.write_str("'.'"),
            Self::Comma => f.write_str("','"),
            Self::Semicolon => f.write_str("';'"),
            Self::LeftParen => f.write_str("'('"),
            Self::RightParen => f.write_str("')'"),
            Self::Whitespace => f.write_str("whitespace"),
            Self::Newline => f.write_str("newline"),
            Self::LineComment | Self::BlockComment => f.write_str("comment"),
            Self::Eof => f.write_str("end of input"),
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keyword_lookup_is_case_insensitive() {
        assert_eq!(TokenKind::lookup_keyword("select"), Some(TokenKind::KwSelect));
        assert_eq!(TokenKind::lookup_keyword("SeLeCt"), Some(TokenKind::KwSelect));
        assert_eq!(TokenKind::lookup_keyword("customers"), None);
    }

    #[test]
    fn test_keyword_spelling_round_trips() {
        for word in ["ALTER", "AUTOINCREMENT", "NULLS", "REFERENCES", "WHERE"] {
            let kind = TokenKind::lookup_keyword(word).unwrap();
            assert_eq!(kind.keyword_str(), Some(word));
            assert_eq!(kind.to_string(), word);
        }
    }

    #[test]
    fn test_readable_names() {
        assert_eq!(TokenKind::Comma.to_string(), "','");
        assert_eq!(TokenKind::Id("nmae".to_owned()).to_string(), "identifier nmae");
        assert_eq!(TokenKind::Eof.to_string(), "end of input");
    }

    #[test]
    fn test_trivia_classification() {
        assert!(TokenKind::BlockComment.is_trivia());
        assert!(TokenKind::LineComment.is_comment());
        assert!(!TokenKind::Semicolon.is_trivia());
        assert!(TokenKind::KwDrop.is_statement_start());
    }
}
