// SQL lexer.
//
// Converts SQL text into a stream of tokens, trivia included. Uses memchr for
// accelerated string and comment scanning. Tracks 0-based line/column and
// parenthesis balance. Bad input never stops the scan: it is reported as a
// diagnostic and skipped.

use memchr::{memchr, memchr2};
use sqlfront_error::{Diagnostic, Pos, Range, Span};

use crate::token::{Token, TokenKind};

/// Everything the lexer produces for one source text.
#[derive(Debug, Clone, PartialEq)]
pub struct LexOutput {
    /// All tokens including trivia, ending with `Eof`.
    pub tokens: Vec<Token>,
    pub errors: Vec<Diagnostic>,
    /// Set when parentheses do not balance, naming the offending one.
    pub bracket_error: Option<String>,
}

impl LexOutput {
    /// Tokens other than whitespace, newlines, and comments.
    pub fn significant(&self) -> impl Iterator<Item = &Token> {
        self.tokens.iter().filter(|t| !t.kind.is_trivia())
    }
}

/// Tokenize `source`.
#[must_use]
pub fn lex(source: &str) -> LexOutput {
    let span = tracing::debug_span!(
        target: "sqlfront.lex",
        "lex",
        bytes = source.len(),
        tokens = tracing::field::Empty,
        errors = tracing::field::Empty,
    );
    let _guard = span.enter();

    let mut lexer = Lexer::new(source);
    let mut tokens = Vec::new();
    loop {
        let tok = lexer.next_token();
        let is_eof = tok.kind == TokenKind::Eof;
        tokens.push(tok);
        if is_eof {
            break;
        }
    }
    let bracket_error = lexer.finish_brackets();

    span.record("tokens", tokens.len());
    span.record("errors", lexer.errors.len());
    LexOutput {
        tokens,
        errors: lexer.errors,
        bracket_error,
    }
}

/// SQL lexer over one source text.
pub struct Lexer<'a> {
    src: &'a [u8],
    /// Current byte offset into src.
    pos: usize,
    /// Current line (0-based).
    line: u32,
    /// Current byte column (0-based).
    col: u32,
    errors: Vec<Diagnostic>,
    /// Positions of currently open `(`.
    open_parens: Vec<Pos>,
    /// First `)` seen with nothing open.
    stray_close: Option<Pos>,
    pending_comment: Option<Span>,
}

impl<'a> Lexer<'a> {
    #[must_use]
    pub fn new(source: &'a str) -> Self {
        Self {
            src: source.as_bytes(),
            pos: 0,
            line: 0,
            col: 0,
            errors: Vec::new(),
            open_parens: Vec::new(),
            stray_close: None,
            pending_comment: None,
        }
    }

    /// Produce the next token, trivia included.
    pub fn next_token(&mut self) -> Token {
        loop {
            let start = self.pos;
            let start_pos = self.here();
            let Some(kind) = self.scan() else {
                // Unrecognized input was reported and skipped.
                continue;
            };
            let span = Span::new(start as u32, self.pos as u32);
            let leading_comment = if kind.is_trivia() || kind == TokenKind::Eof {
                None
            } else {
                self.pending_comment.take()
            };
            if kind.is_comment() {
                self.pending_comment = Some(span);
            }
            return Token {
                kind,
                span,
                line: start_pos.line,
                column: start_pos.column,
                end: self.here(),
                leading_comment,
            };
        }
    }

    fn scan(&mut self) -> Option<TokenKind> {
        let Some(ch) = self.peek() else {
            return Some(TokenKind::Eof);
        };
        let kind = match ch {
            b'\n' => {
                self.advance();
                TokenKind::Newline
            }
            b'\r' if self.peek_at(1) == Some(b'\n') => {
                self.advance();
                self.advance();
                TokenKind::Newline
            }
            b' ' | b'\t' | b'\r' | b'\x0c' => {
                while matches!(self.peek(), Some(b' ' | b'\t' | b'\x0c'))
                    || (self.peek() == Some(b'\r') && self.peek_at(1) != Some(b'\n'))
                {
                    self.advance();
                }
                TokenKind::Whitespace
            }
            b'-' if self.peek_at(1) == Some(b'-') => self.lex_line_comment(),
            b'/' if self.peek_at(1) == Some(b'*') => self.lex_block_comment(),

            b'\'' => self.lex_string(),
            b'"' => self.lex_quoted_id(b'"'),
            b'`' => self.lex_quoted_id(b'`'),
            b'[' => self.lex_quoted_id(b']'),

            b'0'..=b'9' => self.lex_number(),
            b'.' if self.peek_at(1).is_some_and(|c| c.is_ascii_digit()) => self.lex_number(),

            b'a'..=b'z' | b'A'..=b'Z' | b'_' | 0x80..=0xFF => self.lex_identifier(),

            b'(' => {
                self.open_parens.push(self.here());
                self.advance();
                TokenKind::LeftParen
            }
            b')' => {
                if self.open_parens.pop().is_none() && self.stray_close.is_none() {
                    self.stray_close = Some(self.here());
                }
                self.advance();
                TokenKind::RightParen
            }

            b'+' => self.single(TokenKind::Plus),
            b'-' => self.single(TokenKind::Minus),
            b'*' => self.single(TokenKind::Star),
            b'/' => self.single(TokenKind::Slash),
            b'%' => self.single(TokenKind::Percent),
            b',' => self.single(TokenKind::Comma),
            b';' => self.single(TokenKind::Semicolon),
            b'.' => self.single(TokenKind::Dot),

            // Multi-character operators, longest match first.
            b'<' => self.lex_lt(),
            b'>' => self.lex_gt(),
            b'=' => {
                self.advance();
                if self.peek() == Some(b'=') {
                    self.advance();
                }
                TokenKind::Eq
            }
            b'!' if self.peek_at(1) == Some(b'=') => {
                self.advance();
                self.advance();
                TokenKind::NotEq
            }
            b'|' if self.peek_at(1) == Some(b'|') => {
                self.advance();
                self.advance();
                TokenKind::Concat
            }

            _ => {
                self.skip_unknown();
                return None;
            }
        };
        Some(kind)
    }

    // -----------------------------------------------------------------------
    // Helpers
    // -----------------------------------------------------------------------

    fn advance(&mut self) -> u8 {
        let ch = self.src[self.pos];
        self.pos += 1;
        if ch == b'\n' {
            self.line += 1;
            self.col = 0;
        } else {
            self.col += 1;
        }
        ch
    }

    fn advance_by(&mut self, n: usize) {
        for _ in 0..n {
            self.advance();
        }
    }

    fn advance_to_end(&mut self) {
        self.advance_by(self.src.len() - self.pos);
    }

    fn peek(&self) -> Option<u8> {
        self.src.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<u8> {
        self.src.get(self.pos + offset).copied()
    }

    const fn here(&self) -> Pos {
        Pos::new(self.line, self.col)
    }

    fn single(&mut self, kind: TokenKind) -> TokenKind {
        self.advance();
        kind
    }

    fn text(&self, start: usize) -> String {
        String::from_utf8_lossy(&self.src[start..self.pos]).into_owned()
    }

    fn error(&mut self, message: impl Into<String>, start: Pos) {
        self.errors
            .push(Diagnostic::lex(message, Range::new(start, self.here())));
    }

    /// Report and skip one unrecognized character (all of its UTF-8 bytes).
    fn skip_unknown(&mut self) {
        let start = self.here();
        let first = self.src[self.pos];
        let width = match first {
            0xC0..=0xDF => 2,
            0xE0..=0xEF => 3,
            0xF0..=0xF7 => 4,
            _ => 1,
        }
        .min(self.src.len() - self.pos);
        let shown = String::from_utf8_lossy(&self.src[self.pos..self.pos + width]).into_owned();
        self.advance_by(width);
        self.error(format!("unrecognized character '{shown}'"), start);
    }

    /// Bracket diagnostic and message, if parentheses do not balance.
    fn finish_brackets(&mut self) -> Option<String> {
        let (message, at) = if let Some(at) = self.stray_close {
            (
                format!("unmatched ')' at line {}, column {}", at.line + 1, at.column + 1),
                at,
            )
        } else {
            let at = *self.open_parens.last()?;
            (
                format!("unclosed '(' opened at line {}, column {}", at.line + 1, at.column + 1),
                at,
            )
        };
        self.errors.push(Diagnostic::lex(
            message.clone(),
            Range::new(at, Pos::new(at.line, at.column + 1)),
        ));
        Some(message)
    }

    // -----------------------------------------------------------------------
    // Comments
    // -----------------------------------------------------------------------

    fn lex_line_comment(&mut self) -> TokenKind {
        let rest = &self.src[self.pos..];
        let len = memchr2(b'\n', b'\r', rest).unwrap_or(rest.len());
        self.advance_by(len);
        TokenKind::LineComment
    }

    fn lex_block_comment(&mut self) -> TokenKind {
        let start = self.here();
        self.advance_by(2);
        loop {
            let rest = &self.src[self.pos..];
            match memchr(b'*', rest) {
                Some(offset) => {
                    self.advance_by(offset + 1);
                    if self.peek() == Some(b'/') {
                        self.advance();
                        return TokenKind::BlockComment;
                    }
                }
                None => {
                    self.advance_to_end();
                    self.error("unterminated comment", start);
                    return TokenKind::BlockComment;
                }
            }
        }
    }

    // -----------------------------------------------------------------------
    // Literal tokenizers
    // -----------------------------------------------------------------------

    /// Lex a single-quoted string. `''` is an escaped quote; backslash
    /// escapes `\n \r \t \" \' \\` are decoded, other backslashes are kept.
    fn lex_string(&mut self) -> TokenKind {
        let start = self.here();
        self.advance(); // opening quote

        let mut bytes = Vec::new();
        loop {
            let rest = &self.src[self.pos..];
            let Some(offset) = memchr2(b'\'', b'\\', rest) else {
                bytes.extend_from_slice(rest);
                self.advance_to_end();
                self.error("unterminated string", start);
                break;
            };
            bytes.extend_from_slice(&rest[..offset]);
            self.advance_by(offset);
            if self.advance() == b'\\' {
                let decoded = match self.peek() {
                    Some(b'n') => Some(b'\n'),
                    Some(b'r') => Some(b'\r'),
                    Some(b't') => Some(b'\t'),
                    Some(c @ (b'"' | b'\'' | b'\\')) => Some(c),
                    _ => None,
                };
                if let Some(byte) = decoded {
                    self.advance();
                    bytes.push(byte);
                } else {
                    bytes.push(b'\\');
                }
            } else if self.peek() == Some(b'\'') {
                self.advance();
                bytes.push(b'\'');
            } else {
                break;
            }
        }

        let value = String::from_utf8_lossy(&bytes).into_owned();
        let mut chars = value.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => TokenKind::Char(c),
            _ => TokenKind::String(value),
        }
    }

    /// Lex `"name"`, `` `name` `` or `[name]`. `close` is the closing
    /// delimiter; doubling it escapes it (except for brackets).
    fn lex_quoted_id(&mut self, close: u8) -> TokenKind {
        let start = self.here();
        self.advance(); // opening delimiter

        let mut bytes = Vec::new();
        loop {
            let rest = &self.src[self.pos..];
            let Some(offset) = memchr(close, rest) else {
                bytes.extend_from_slice(rest);
                self.advance_to_end();
                self.error("unterminated quoted identifier", start);
                break;
            };
            bytes.extend_from_slice(&rest[..offset]);
            self.advance_by(offset + 1);
            if close != b']' && self.peek() == Some(close) {
                self.advance();
                bytes.push(close);
            } else {
                break;
            }
        }
        TokenKind::QuotedId(String::from_utf8_lossy(&bytes).into_owned())
    }

    /// Lex an integer or float. Integers too large for `i64` become floats.
    fn lex_number(&mut self) -> TokenKind {
        let start = self.pos;
        let mut is_float = false;

        while self.peek().is_some_and(|c| c.is_ascii_digit()) {
            self.advance();
        }
        if self.peek() == Some(b'.') && !self.peek_at(1).is_some_and(|c| c.is_ascii_alphabetic() || c == b'_') {
            is_float = true;
            self.advance();
            while self.peek().is_some_and(|c| c.is_ascii_digit()) {
                self.advance();
            }
        }
        if matches!(self.peek(), Some(b'e' | b'E')) {
            let signed = matches!(self.peek_at(1), Some(b'+' | b'-'));
            let digit_at = if signed { 2 } else { 1 };
            if self.peek_at(digit_at).is_some_and(|c| c.is_ascii_digit()) {
                is_float = true;
                self.advance_by(digit_at);
                while self.peek().is_some_and(|c| c.is_ascii_digit()) {
                    self.advance();
                }
            }
        }

        let text = self.text(start);
        if !is_float {
            if let Ok(v) = text.parse::<i64>() {
                return TokenKind::Integer(v);
            }
        }
        // Digits and at most one dot/exponent always parse as f64.
        TokenKind::Float(text.parse::<f64>().unwrap_or(f64::INFINITY))
    }

    /// Lex an identifier or keyword.
    fn lex_identifier(&mut self) -> TokenKind {
        let start = self.pos;
        while self
            .peek()
            .is_some_and(|c| c.is_ascii_alphanumeric() || c == b'_' || c >= 0x80)
        {
            self.advance();
        }
        let text = self.text(start);
        TokenKind::lookup_keyword(&text).unwrap_or(TokenKind::Id(text))
    }

    // -----------------------------------------------------------------------
    // Multi-character operator tokenizers
    // -----------------------------------------------------------------------

    /// Lex `<`, `<=`, or `<>`.
    fn lex_lt(&mut self) -> TokenKind {
        self.advance();
        match self.peek() {
            Some(b'=') => self.single(TokenKind::Le),
            Some(b'>') => self.single(TokenKind::NotEq),
            _ => TokenKind::Lt,
        }
    }

    /// Lex `>` or `>=`.
    fn lex_gt(&mut self) -> TokenKind {
        self.advance();
        if self.peek() == Some(b'=') {
            self.single(TokenKind::Ge)
        } else {
            TokenKind::Gt
        }
    }
}
