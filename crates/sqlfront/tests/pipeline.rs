//! End-to-end scenarios over the public API.

use proptest::prelude::*;
use sqlfront::ast::StatementKind;
use sqlfront::{CompileOptions, Hover, Pos, Severity, TableDescriptor, compile, load_schema};

const SCHEMA: &str = r#"[
  {"name": "customers", "row_count": 120, "columns": [
    {"name": "id", "type": "int", "primary_key": true},
    {"name": "name", "type": "varchar(40)"}
  ]},
  {"name": "orders", "columns": [
    {"name": "id", "type": "integer", "primary_key": true},
    {"name": "customer", "type": "integer"},
    {"name": "total", "type": "decimal(10,2)"}
  ], "foreign_keys": [{"from": "customer", "table": "customers"}]}
]"#;

fn schema() -> Vec<TableDescriptor> {
    load_schema(SCHEMA).expect("fixture schema should decode")
}

fn compiled(sql: &str) -> sqlfront::Compilation {
    compile(sql, Some(&schema()), &CompileOptions::default())
}

fn messages(sql: &str) -> Vec<String> {
    compiled(sql)
        .diagnostics()
        .iter()
        .map(|d| d.message.clone())
        .collect()
}

#[test]
fn test_select_with_filter_has_typed_output() {
    let c = compiled("select name from customers where id = 1");
    assert!(c.diagnostics().is_empty(), "{:?}", c.diagnostics());
    assert_eq!(c.statements().len(), 1);
    let StatementKind::Select(select) = &c.statements()[0].kind else {
        panic!("expected a SELECT");
    };
    let catalog = c.catalog().expect("resolved against a schema");
    let output = catalog.table(select.result.expect("result table"));
    assert_eq!(output.columns.len(), 1);
    let ty = catalog.column(output.columns[0]).ty.as_ref().expect("typed column");
    assert_eq!(ty.to_string(), "varchar(40)");
}

#[test]
fn test_misspelled_column_is_reported_once_at_its_token() {
    let c = compiled("select nmae from customers");
    assert_eq!(c.diagnostics().len(), 1);
    let d = &c.diagnostics()[0];
    assert_eq!(d.message, "unknown identifier nmae");
    assert_eq!(d.severity, Severity::Error);
    assert_eq!(d.range.start, Pos::new(0, 7));
    assert_eq!(d.range.end, Pos::new(0, 11));
    assert_eq!(d.quick_fix.as_deref(), Some("did you mean `name`?"));
}

#[test]
fn test_foreign_key_to_non_key_column() {
    let compatible = messages(
        "create table notes (id int primary key, author varchar(40) references customers(name))",
    );
    assert_eq!(compatible, vec!["referenced column is not a primary key"]);

    let c = compiled(
        "create table flags (id int primary key, owner boolean references customers(name))",
    );
    let severities: Vec<Severity> = c.diagnostics().iter().map(|d| d.severity).collect();
    assert!(severities.contains(&Severity::Warning));
    assert!(severities.contains(&Severity::Error));
}

#[test]
fn test_scope_query_stays_inside_statement() {
    let mut lines = vec![String::new(); 10];
    lines.push("select id,".to_owned());
    lines.push("  (select max(total)".to_owned());
    lines.push("   from orders) as top,".to_owned());
    lines.extend(std::iter::repeat_n(String::new(), 6));
    lines.push("  name".to_owned());
    lines.push("from customers".to_owned());
    let sql = lines.join("\n");

    let c = compiled(&sql);
    assert!(c.diagnostics().is_empty(), "{:?}", c.diagnostics());
    let scope = c.scope_at(Pos::new(15, 0)).expect("scopes exist");
    assert!(scope.range.start >= Pos::new(10, 0), "{:?}", scope.range);
    assert!(scope.range.end <= Pos::new(20, 14), "{:?}", scope.range);
    assert!(scope.symbol("name").is_some());
}

#[test]
fn test_hover_resolves_tables_and_columns() {
    let c = compiled("select c.name from customers c where id = 1");

    let Some(Hover::Table(table)) = c.hover_at(Pos::new(0, 7)) else {
        panic!("expected the alias to hover as a table");
    };
    assert_eq!(table.name, "customers");

    let hover = c.hover_at(Pos::new(0, 10)).expect("column under cursor");
    assert_eq!(hover.to_string(), "column customers.name: varchar(40)");

    let hover = c.hover_at(Pos::new(0, 38)).expect("id under cursor");
    assert_eq!(hover.to_string(), "column customers.id: integer PRIMARY KEY");

    let hover = c.hover_at(Pos::new(0, 20)).expect("table under cursor");
    assert_eq!(hover.to_string(), "table customers (2 columns), ~120 rows");

    assert!(c.hover_at(Pos::new(0, 42)).is_none());
}

#[test]
fn test_completion_lists_visible_columns_and_tables() {
    let c = compiled("select n from customers");
    let completion = c.completion_at(Pos::new(0, 8)).expect("hint in column list");
    assert_eq!(completion.columns, vec!["id", "name"]);
    assert!(completion.tables.is_empty());

    let c = compiled("select a from t where b = 1");
    let completion = c.completion_at(Pos::new(0, 15)).expect("hint after table name");
    assert_eq!(completion.tables, vec!["customers", "orders"]);
    assert!(completion.keywords.contains(&"WHERE"));

    let c = compiled("select orders. from orders");
    let completion = c.completion_at(Pos::new(0, 14)).expect("hint after the dot");
    assert_eq!(completion.columns, vec!["id", "customer", "total"]);
}

#[test]
fn test_batch_sees_its_own_ddl() {
    let sql = "create table t (a int);\n\
               select a from t;\n\
               drop table t;\n\
               select a from t";
    let c = compiled(sql);
    let lines: Vec<u32> = c.diagnostics().iter().map(|d| d.range.start.line).collect();
    assert_eq!(lines, vec![3], "{:?}", c.diagnostics());
    assert_eq!(c.diagnostics()[0].message, "unknown table t");
}

#[test]
fn test_bad_statement_does_not_hide_the_next_one() {
    let c = compiled("select from where;\nselect nmae from customers");
    assert!(c.diagnostics_on_line(0).count() >= 1);
    let second: Vec<&str> = c.diagnostics_on_line(1).map(|d| d.message.as_str()).collect();
    assert_eq!(second, vec!["unknown identifier nmae"]);
}

#[test]
fn test_stray_character_reports_one_error() {
    let c = compiled("select @ from t");
    assert_eq!(c.diagnostics().len(), 1, "{:?}", c.diagnostics());
    assert_eq!(c.diagnostics()[0].range.start, Pos::new(0, 7));
}

#[test]
fn test_import_replays_normalized_text() {
    let out = sqlfront::import::normalize(
        "insert into customers (id, name) values (1, 'O''Hara'), (2, 7)",
        &schema(),
    )
    .expect("batch is valid");
    assert_eq!(
        out,
        vec!["INSERT INTO customers (id, name) VALUES (1, 'O''Hara'), (2, '7')"]
    );
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn test_compile_accepts_any_text(sql in "[ -~\n]{0,80}") {
        let c = compiled(&sql);
        let starts: Vec<Pos> = c.diagnostics().iter().map(|d| d.range.start).collect();
        let mut sorted = starts.clone();
        sorted.sort();
        prop_assert_eq!(starts, sorted);
        let lines = c.line_index().line_count() as u32;
        for d in c.diagnostics() {
            prop_assert!(d.range.start <= d.range.end);
            prop_assert!(d.range.end.line < lines);
        }
    }
}
