//! Property tests over the lexer, parser, resolver, and cleaner.

use proptest::prelude::*;
use sqlfront_error::LineIndex;
use sqlfront_parser::{TokenKind, clean, lex, parse, resolve};
use sqlfront_types::Catalog;

fn arb_ident() -> BoxedStrategy<String> {
    "[a-z][a-z0-9]{0,5}_[a-z0-9]{0,3}".boxed()
}

fn arb_literal() -> BoxedStrategy<String> {
    prop_oneof![
        (0i64..100_000).prop_map(|n| n.to_string()),
        (0u32..1000, 1u32..100).prop_map(|(a, b)| format!("{a}.{b}")),
        "[a-z ']{0,8}".prop_map(|s| format!("'{}'", s.replace('\'', "''"))),
        Just("NULL".to_owned()),
        Just("TRUE".to_owned()),
    ]
    .boxed()
}

fn arb_expr(depth: u32) -> BoxedStrategy<String> {
    let leaf = prop_oneof![arb_literal(), arb_ident()].boxed();
    if depth == 0 {
        return leaf;
    }
    prop_oneof![
        3 => leaf,
        2 => (
            arb_expr(depth - 1),
            prop_oneof![
                Just("+"), Just("-"), Just("*"), Just("="), Just("<>"), Just("<="),
                Just("AND"), Just("OR"), Just("||"), Just("LIKE"),
            ],
            arb_expr(depth - 1),
        )
            .prop_map(|(l, op, r)| format!("({l} {op} {r})")),
        1 => arb_expr(depth - 1).prop_map(|e| format!("NOT ({e})")),
        1 => (arb_ident(), proptest::collection::vec(arb_literal(), 1..4))
            .prop_map(|(e, items)| format!("{e} IN ({})", items.join(", "))),
        1 => (arb_ident(), proptest::collection::vec(arb_expr(0), 0..3))
            .prop_map(|(name, args)| format!("{name}({})", args.join(", "))),
    ]
    .boxed()
}

fn arb_column() -> BoxedStrategy<String> {
    let ty = prop_oneof![
        Just("integer"), Just("int"), Just("varchar(20)"), Just("char(3)"),
        Just("decimal(10,2)"), Just("date"), Just("datetime"), Just("boolean"),
        Just("text"), Just("real"),
    ];
    let constraint = prop_oneof![
        Just(""), Just(" NOT NULL"), Just(" UNIQUE"), Just(" DEFAULT 0"),
        Just(" DEFAULT 'ab'"), Just(" COLLATE nocase"), Just(" PRIMARY KEY"),
        Just(" NULL"),
    ];
    (ty, proptest::collection::vec(constraint, 0..3))
        .prop_map(|(ty, cs)| format!("{ty}{}", cs.concat()))
        .boxed()
}

fn arb_create_table() -> BoxedStrategy<String> {
    (arb_ident(), proptest::collection::vec(arb_column(), 1..5))
        .prop_map(|(table, columns)| {
            let defs: Vec<String> = columns
                .iter()
                .enumerate()
                .map(|(i, c)| format!("c{i} {c}"))
                .collect();
            format!("CREATE TABLE {table} ({})", defs.join(", "))
        })
        .boxed()
}

fn arb_insert() -> BoxedStrategy<String> {
    (1usize..4)
        .prop_flat_map(|n| {
            (
                arb_ident(),
                proptest::collection::vec(arb_literal(), n..=n),
                proptest::collection::vec(arb_literal(), n..=n),
            )
        })
        .prop_map(|(table, a, b)| {
            format!("INSERT INTO {table} VALUES ({}), ({})", a.join(", "), b.join(", "))
        })
        .boxed()
}

fn arb_soup() -> BoxedStrategy<String> {
    let piece = prop_oneof![
        Just("SELECT"), Just("FROM"), Just("WHERE"), Just("("), Just(")"), Just(","),
        Just(";"), Just("IN"), Just("NOT"), Just("INSERT"), Just("INTO"), Just("VALUES"),
        Just("CREATE"), Just("TABLE"), Just("ALTER"), Just("DROP"), Just("a"), Just("b.c"),
        Just("1"), Just("'x'"), Just("*"), Just("="), Just("JOIN"), Just("ON"),
        Just("ORDER"), Just("BY"), Just("LIMIT"), Just("PRIMARY"), Just("KEY"),
        Just("REFERENCES"), Just("--c\n"), Just("/* b */"), Just("\n"), Just("@"),
    ];
    proptest::collection::vec(piece, 0..40)
        .prop_map(|pieces| pieces.join(" "))
        .boxed()
}

fn parse_single(sql: &str) -> Option<sqlfront_ast::Statement> {
    let lexed = lex(sql);
    let mut parsed = parse(&lexed.tokens);
    (parsed.errors.is_empty() && parsed.statements.len() == 1)
        .then(|| parsed.statements.remove(0))
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(300))]

    #[test]
    fn test_token_positions_reproduce_text(sql in arb_soup()) {
        let lexed = lex(&sql);
        let index = LineIndex::new(&sql);
        let lines: Vec<&str> = sql.split('\n').collect();
        for tok in lexed.significant() {
            prop_assert_eq!(index.pos(tok.span.start), tok.pos());
            prop_assert_eq!(index.pos(tok.span.end), tok.end);
            if tok.kind == TokenKind::Eof || tok.end.line != tok.line {
                continue;
            }
            let line = lines[tok.line as usize];
            let from = tok.column as usize;
            let to = from + tok.len() as usize;
            prop_assert_eq!(&line[from..to], tok.span.slice(&sql));
        }
    }

    #[test]
    fn test_bracket_error_iff_unbalanced(sql in arb_soup()) {
        let lexed = lex(&sql);
        let mut depth: i64 = 0;
        let mut broken = false;
        for tok in lexed.significant() {
            match tok.kind {
                TokenKind::LeftParen => depth += 1,
                TokenKind::RightParen => {
                    depth -= 1;
                    broken |= depth < 0;
                    depth = depth.max(0);
                }
                _ => {}
            }
        }
        prop_assert_eq!(lexed.bracket_error.is_some(), broken || depth != 0);
    }

    #[test]
    fn test_pipeline_terminates_on_token_soup(sql in arb_soup()) {
        let lexed = lex(&sql);
        let significant = lexed.significant().count();
        let mut parsed = parse(&lexed.tokens);
        prop_assert!(parsed.statements.len() <= significant);
        let index = LineIndex::new(&sql);
        let resolution = resolve(&mut parsed.statements, Catalog::new(), &index, 10);
        prop_assert!(!resolution.scopes.is_empty());
        for hint in parsed.hints.iter() {
            prop_assert!(hint.range.start <= hint.range.end);
        }
    }

    #[test]
    fn test_select_display_reparses(cols in proptest::collection::vec(arb_expr(2), 1..4),
                                    table in arb_ident(),
                                    filter in proptest::option::of(arb_expr(2))) {
        let mut sql = format!("SELECT {} FROM {table}", cols.join(", "));
        if let Some(filter) = filter {
            sql.push_str(" WHERE ");
            sql.push_str(&filter);
        }
        let first = parse_single(&sql);
        prop_assert!(first.is_some(), "failed to parse {}", sql);
        let rendered = first.unwrap().kind.to_string();
        let second = parse_single(&rendered);
        prop_assert!(second.is_some(), "failed to reparse {}", rendered);
        prop_assert_eq!(second.unwrap().kind.to_string(), rendered);
    }

    #[test]
    fn test_clean_is_idempotent(sql in prop_oneof![arb_create_table(), arb_insert()]) {
        let first = parse_single(&sql);
        prop_assert!(first.is_some(), "failed to parse {}", sql);
        let once = clean(&first.unwrap(), &sql, None);
        let reparsed = parse_single(&once);
        prop_assert!(reparsed.is_some(), "cleaned text does not parse: {}", once);
        let twice = clean(&reparsed.unwrap(), &once, None);
        prop_assert_eq!(once, twice);
    }
}

#[test]
fn test_bracket_examples() {
    assert!(lex("(a+b").bracket_error.is_some());
    assert!(lex("(a+b)").bracket_error.is_none());
}
