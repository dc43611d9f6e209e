// Pratt expression parser.
//
// Precedence table, lowest to highest:
//   OR
//   AND
//   NOT (prefix)
//   = <> < <= > >= LIKE NOT LIKE
//   || + -
//   * / %
//   IN, NOT IN
//   - + (unary prefix)
//
// Binary operators are left-associative. `.`-chained names become Dot nodes
// and `name(args)` becomes a MethodCall.

use sqlfront_ast::{BinaryOperator, Expr, ExprKind, Literal, MethodArgs, UnaryOperator};

use crate::completion::ColumnSuggestion;
use crate::parser::{PResult, Parser};
use crate::token::TokenKind;

// Binding powers: higher = tighter binding.
// Left BP is checked against min_bp; right BP is passed to recursive call.
mod bp {
    pub const OR: (u8, u8) = (1, 2);
    pub const AND: (u8, u8) = (3, 4);
    // Prefix NOT right BP: binds looser than comparison.
    pub const NOT_PREFIX: u8 = 5;
    pub const COMPARISON: (u8, u8) = (7, 8);
    pub const ADD: (u8, u8) = (9, 10);
    pub const MUL: (u8, u8) = (11, 12);
    pub const IN: (u8, u8) = (13, 14);
    // Unary prefix (- +) right BP:
    pub const UNARY: u8 = 15;
}

pub(crate) const UNARY_BP: u8 = bp::UNARY;

impl Parser {
    /// Parse a single SQL expression.
    pub fn parse_expr(&mut self) -> PResult<Expr> {
        self.parse_expr_bp(0)
    }

    // ── Pratt core ──────────────────────────────────────────────────────

    pub(crate) fn parse_expr_bp(&mut self, min_bp: u8) -> PResult<Expr> {
        let mut lhs = self.parse_prefix()?;

        while let Some((op, (l_bp, r_bp))) = self.infix_op() {
            if l_bp < min_bp {
                break;
            }
            // NOT LIKE / NOT IN span two tokens.
            if self.check(&TokenKind::KwNot) {
                self.advance();
            }
            self.advance();
            lhs = if op.is_membership() {
                self.parse_in(lhs, op, r_bp)?
            } else {
                let rhs = self.parse_expr_bp(r_bp)?;
                Expr::binary(lhs, op, rhs)
            };
        }

        Ok(lhs)
    }

    fn infix_op(&self) -> Option<(BinaryOperator, (u8, u8))> {
        let op = match self.peek() {
            TokenKind::KwOr => return Some((BinaryOperator::Or, bp::OR)),
            TokenKind::KwAnd => return Some((BinaryOperator::And, bp::AND)),

            TokenKind::Eq => BinaryOperator::Eq,
            TokenKind::NotEq => BinaryOperator::NotEq,
            TokenKind::Lt => BinaryOperator::Lt,
            TokenKind::Le => BinaryOperator::Le,
            TokenKind::Gt => BinaryOperator::Gt,
            TokenKind::Ge => BinaryOperator::Ge,
            TokenKind::KwLike => BinaryOperator::Like,
            TokenKind::KwNot => match self.peek_nth(1) {
                TokenKind::KwLike => BinaryOperator::NotLike,
                TokenKind::KwIn => return Some((BinaryOperator::NotIn, bp::IN)),
                _ => return None,
            },

            TokenKind::Concat => return Some((BinaryOperator::Concat, bp::ADD)),
            TokenKind::Plus => return Some((BinaryOperator::Add, bp::ADD)),
            TokenKind::Minus => return Some((BinaryOperator::Subtract, bp::ADD)),

            TokenKind::Star => return Some((BinaryOperator::Multiply, bp::MUL)),
            TokenKind::Slash => return Some((BinaryOperator::Divide, bp::MUL)),
            TokenKind::Percent => return Some((BinaryOperator::Modulo, bp::MUL)),

            TokenKind::KwIn => return Some((BinaryOperator::In, bp::IN)),
            _ => return None,
        };
        Some((op, bp::COMPARISON))
    }

    /// Right side of `IN` / `NOT IN`, the operator already consumed.
    ///
    /// A parenthesized `(expr)` followed by `,` or `)` is a list, never a
    /// bracketed term. Any other right side is parsed as an ordinary term.
    fn parse_in(&mut self, lhs: Expr, op: BinaryOperator, r_bp: u8) -> PResult<Expr> {
        if !self.check(&TokenKind::LeftParen) {
            let rhs = self.parse_expr_bp(r_bp)?;
            return Ok(Expr::binary(lhs, op, rhs));
        }

        let open = self.advance().span;
        let kind = if self.check(&TokenKind::KwSelect) {
            ExprKind::Subquery(Box::new(self.parse_select()?))
        } else if self.check(&TokenKind::RightParen) {
            ExprKind::List(Vec::new())
        } else {
            let hint = self.hint().columns(ColumnSuggestion::All).wrapped("(", ")");
            ExprKind::List(self.hinted(hint, |p| p.parse_comma_sep(Self::parse_expr))?)
        };
        self.expect(&TokenKind::RightParen, "')'")?;
        let rhs = Expr::new(kind, self.span_from(open));
        Ok(Expr::binary(lhs, op, rhs))
    }

    // ── Terms ───────────────────────────────────────────────────────────

    fn parse_prefix(&mut self) -> PResult<Expr> {
        if let Some(lit) = self.parse_literal() {
            return Ok(lit);
        }
        match self.peek() {
            TokenKind::Minus | TokenKind::Plus | TokenKind::KwNot => {
                let tok = self.advance();
                let (op, r_bp) = match tok.kind {
                    TokenKind::Minus => (Some(UnaryOperator::Negate), bp::UNARY),
                    TokenKind::KwNot => (Some(UnaryOperator::Not), bp::NOT_PREFIX),
                    _ => (None, bp::UNARY),
                };
                let mut operand = self.parse_expr_bp(r_bp)?;
                let span = tok.span.merge(operand.span);
                let Some(op) = op else {
                    // Unary plus is a no-op.
                    operand.span = span;
                    return Ok(operand);
                };
                Ok(Expr::new(
                    ExprKind::UnaryOp {
                        op,
                        operand: Box::new(operand),
                    },
                    span,
                ))
            }
            TokenKind::LeftParen => self.parse_paren_term(),
            kind if Self::is_ident_start(kind) => self.parse_ident_term(),
            _ => Err(self.err_expected("expression")),
        }
    }

    /// Consume a literal token, if the current token is one.
    pub(crate) fn parse_literal(&mut self) -> Option<Expr> {
        let literal = match self.peek() {
            TokenKind::Integer(i) => Literal::Integer(*i),
            TokenKind::Float(v) => Literal::Float(*v),
            TokenKind::String(s) => Literal::String(s.clone()),
            TokenKind::Char(c) => Literal::Char(*c),
            TokenKind::KwTrue => Literal::Boolean(true),
            TokenKind::KwFalse => Literal::Boolean(false),
            TokenKind::KwNull => Literal::Null,
            _ => return None,
        };
        let span = self.advance().span;
        Some(Expr::constant(literal, span))
    }

    /// `( SELECT ... )`, `( expr )`, or `( expr, expr, ... )`.
    fn parse_paren_term(&mut self) -> PResult<Expr> {
        let open = self.advance().span;
        let kind = if self.check(&TokenKind::KwSelect) {
            ExprKind::Subquery(Box::new(self.parse_select()?))
        } else {
            let first = self.parse_expr()?;
            if self.check(&TokenKind::Comma) {
                let mut items = vec![first];
                while self.eat(&TokenKind::Comma) {
                    items.push(self.parse_expr()?);
                }
                ExprKind::List(items)
            } else {
                ExprKind::Brackets(Box::new(first))
            }
        };
        self.expect(&TokenKind::RightParen, "')'")?;
        Ok(Expr::new(kind, self.span_from(open)))
    }

    /// A name, a dotted name chain, or a method call.
    fn parse_ident_term(&mut self) -> PResult<Expr> {
        let name = self.parse_ident()?;
        if self.check(&TokenKind::LeftParen) {
            return self.parse_method_call(name);
        }

        let mut expr = Expr::ident(name);
        while self.eat(&TokenKind::Dot) {
            let columns = match &expr.kind {
                ExprKind::Identifier(table) => ColumnSuggestion::Table(table.name.clone()),
                _ => ColumnSuggestion::None,
            };
            let right = self.hinted(self.hint().columns(columns), Self::parse_ident)?;
            let span = expr.span.merge(right.span);
            expr = Expr::new(
                ExprKind::Dot {
                    left: Box::new(expr),
                    right,
                },
                span,
            );
        }
        Ok(expr)
    }

    fn parse_method_call(&mut self, name: sqlfront_ast::Ident) -> PResult<Expr> {
        self.advance(); // (
        let args = if self.check(&TokenKind::Star) {
            MethodArgs::Star(self.advance().span)
        } else if self.check(&TokenKind::RightParen) {
            MethodArgs::List(Vec::new())
        } else {
            let hint = self.hint().columns(ColumnSuggestion::All);
            MethodArgs::List(self.hinted(hint, |p| p.parse_comma_sep(Self::parse_expr))?)
        };
        self.expect(&TokenKind::RightParen, "')'")?;
        let span = self.span_from(name.span);
        Ok(Expr::new(ExprKind::MethodCall { name, args }, span))
    }
}

/// Parse a standalone expression.
pub fn parse_expr(sql: &str) -> PResult<Expr> {
    let lexed = crate::lexer::lex(sql);
    let mut parser = Parser::new(&lexed.tokens);
    let expr = parser.parse_expr()?;
    if parser.at_eof() {
        Ok(expr)
    } else {
        Err(parser.err_expected("end of expression"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(sql: &str) -> Expr {
        match parse_expr(sql) {
            Ok(e) => e,
            Err(e) => panic!("failed to parse {sql:?}: {e}"),
        }
    }

    fn shape(e: &Expr) -> String {
        match &e.kind {
            ExprKind::Constant(lit) => lit.to_string(),
            ExprKind::Identifier(id) => id.name.clone(),
            ExprKind::Dot { left, right } => format!("{}.{}", shape(left), right.name),
            ExprKind::BinaryOp { left, op, right } => {
                format!("({} {op} {})", shape(left), shape(right))
            }
            ExprKind::UnaryOp { op, operand } => format!("({op:?} {})", shape(operand)),
            ExprKind::MethodCall { name, args } => match args {
                MethodArgs::Star(_) => format!("{}(*)", name.name),
                MethodArgs::List(args) => format!(
                    "{}({})",
                    name.name,
                    args.iter().map(shape).collect::<Vec<_>>().join(", ")
                ),
            },
            ExprKind::Brackets(inner) => format!("[{}]", shape(inner)),
            ExprKind::List(items) => format!(
                "list({})",
                items.iter().map(shape).collect::<Vec<_>>().join(", ")
            ),
            ExprKind::Subquery(_) => "subquery".to_owned(),
        }
    }

    #[test]
    fn test_and_higher_than_or() {
        assert_eq!(shape(&parse("a OR b AND c")), "(a OR (b AND c))");
        assert_eq!(shape(&parse("a AND b OR c")), "((a AND b) OR c)");
    }

    #[test]
    fn test_arithmetic_precedence() {
        assert_eq!(shape(&parse("1 + 2 * 3")), "(1 + (2 * 3))");
        assert_eq!(shape(&parse("a - b - c")), "((a - b) - c)");
        assert_eq!(shape(&parse("a || b + c")), "((a || b) + c)");
        assert_eq!(shape(&parse("a + 1 = b * 2")), "((a + 1) = (b * 2))");
    }

    #[test]
    fn test_in_binds_tightest() {
        assert_eq!(shape(&parse("a + b IN (1, 2)")), "(a + (b IN list(1, 2)))");
        assert_eq!(shape(&parse("x NOT IN (1)")), "(x NOT IN list(1))");
    }

    #[test]
    fn test_single_element_in_is_list() {
        let e = parse("x IN (y)");
        let ExprKind::BinaryOp { right, .. } = &e.kind else {
            panic!("expected binary op");
        };
        assert!(matches!(&right.kind, ExprKind::List(items) if items.len() == 1));
        // Elsewhere a parenthesized term stays a bracket.
        assert_eq!(shape(&parse("(y) + 1")), "([y] + 1)");
    }

    #[test]
    fn test_in_subquery_and_bare_term() {
        assert_eq!(shape(&parse("x IN (SELECT id FROM t)")), "(x IN subquery)");
        assert_eq!(shape(&parse("x IN y")), "(x IN y)");
    }

    #[test]
    fn test_like_and_not_like() {
        assert_eq!(shape(&parse("name LIKE 'a%'")), "(name LIKE 'a%')");
        assert_eq!(
            shape(&parse("name NOT LIKE 'a%' AND b")),
            "((name NOT LIKE 'a%') AND b)"
        );
    }

    #[test]
    fn test_unary_operators() {
        assert_eq!(shape(&parse("-a * b")), "((Negate a) * b)");
        assert_eq!(shape(&parse("NOT a = b")), "(Not (a = b))");
        assert_eq!(shape(&parse("NOT a AND b")), "((Not a) AND b)");
        assert_eq!(shape(&parse("+5")), "5");
    }

    #[test]
    fn test_dot_chain_and_method_call() {
        assert_eq!(shape(&parse("s.t.c")), "s.t.c");
        assert_eq!(shape(&parse("count(*)")), "count(*)");
        assert_eq!(shape(&parse("substr(name, 1, 2)")), "substr(name, 1, 2)");
        assert_eq!(shape(&parse("random()")), "random()");
    }

    #[test]
    fn test_literals() {
        assert_eq!(shape(&parse("TRUE")), "TRUE");
        assert_eq!(shape(&parse("NULL")), "NULL");
        assert_eq!(shape(&parse("'it''s'")), "'it''s'");
        assert_eq!(shape(&parse("(1, 2)")), "list(1, 2)");
    }

    #[test]
    fn test_spans_cover_source() {
        let sql = "count(*) + t.col";
        let e = parse(sql);
        assert_eq!(e.span.slice(sql), sql);
        let ExprKind::BinaryOp { left, right, .. } = &e.kind else {
            panic!("expected binary op");
        };
        assert_eq!(left.span.slice(sql), "count(*)");
        assert_eq!(right.span.slice(sql), "t.col");
    }

    #[test]
    fn test_error_on_missing_operand() {
        let err = parse_expr("a +").unwrap_err();
        assert_eq!(err.message, "expected expression, found end of input");
        let err = parse_expr("a b").unwrap_err();
        assert_eq!(err.message, "expected end of expression, found identifier b");
    }
}
