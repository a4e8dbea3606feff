mod common;

use common::*;
use oxide_sql_compiler::catalog::MemoryCatalog;
use oxide_sql_compiler::{Compiler, CompilerConfig, ErrorKind};

#[test]
fn syntax_errors_point_at_the_token() {
    let sql = "SELECT name FROM customers WHERE";
    let err = compile_err(sql);
    assert!(err.is_syntax());
    assert!(matches!(err.kind, ErrorKind::UnexpectedEnd(_)));
    assert_eq!(err.code(), "42590");

    let sql = "SELECT name FROM customers ORDER name";
    let err = compile_err(sql);
    assert!(matches!(err.kind, ErrorKind::UnexpectedToken { ref found, .. } if found == "name"));
    assert_eq!(&sql[err.span.start..err.span.end], "name");
}

#[test]
fn semantic_errors_are_not_syntax_errors() {
    let sql = "SELECT nmae FROM customers";
    let err = compile_err(sql);
    assert!(!err.is_syntax());
    assert!(matches!(err.kind, ErrorKind::ColumnNotFound(_)));
    assert_eq!(&sql[err.span.start..err.span.end], "nmae");

    let err = compile_err("SELECT * FROM invoices");
    assert!(matches!(err.kind, ErrorKind::ObjectNotFound(_)));
}

#[test]
fn deepest_failure_is_reported() {
    let sql = "SELECT * FROM ((SELECT id FROM customers WHERE) AS d JOIN orders o ON d.id = o.id)";
    let err = compile_err(sql);
    assert!(matches!(err.kind, ErrorKind::UnexpectedToken { ref found, .. } if found == ")"));
    assert_eq!(err.span.start, sql.find(") AS").unwrap());
    assert!(err.depth >= 1);
}

#[test]
fn failed_alternatives_do_not_hide_name_errors() {
    let err = compile_err("SELECT * FROM ((SELECT idd FROM customers) AS d JOIN orders o ON d.id = o.id)");
    assert!(matches!(err.kind, ErrorKind::ColumnNotFound(_)));
}

#[test]
fn type_errors() {
    let err = compile_err("SELECT name + 1 FROM customers");
    assert!(matches!(err.kind, ErrorKind::WrongDataType(_)));

    let err = compile_err("SELECT id FROM customers WHERE name");
    assert!(matches!(err.kind, ErrorKind::WrongDataType(_)));

    let err = compile_err("SELECT ? FROM customers");
    assert!(matches!(err.kind, ErrorKind::UnresolvedParameterType));

    let err = compile_err("SELECT id FROM customers WHERE (id, name) = (1, 'a', 2)");
    assert!(matches!(err.kind, ErrorKind::DegreeMismatch { expected: 2, found: 3 }));

    let err = compile_err("SELECT id FROM customers WHERE id IN (SELECT id, name FROM customers)");
    assert!(matches!(err.kind, ErrorKind::DegreeMismatch { .. }));
}

#[test]
fn aggregates_in_where_are_rejected() {
    let err = compile_err("SELECT id FROM orders WHERE SUM(total) > 10");
    assert!(matches!(err.kind, ErrorKind::MisplacedAggregate(_)));
}

#[test]
fn duplicate_range_names_are_rejected() {
    let err = compile_err("SELECT 1 FROM customers c, orders c");
    assert!(matches!(err.kind, ErrorKind::DuplicateName(_)));
}

#[test]
fn nesting_limit_is_configurable() {
    let catalog = MemoryCatalog::new();
    let config = CompilerConfig {
        max_nesting_depth: 2,
        ..CompilerConfig::default()
    };
    let compiler = Compiler::new(&catalog).with_config(config);
    assert!(compiler
        .compile_one("SELECT (SELECT 1 FROM (VALUES (1)) w (y)) FROM (VALUES (2)) z (q)")
        .is_ok());

    let err = compiler
        .compile_one(
            "SELECT 1 FROM (VALUES (1)) a (x) WHERE EXISTS (SELECT 1 FROM (VALUES (1)) b (y) \
             WHERE EXISTS (SELECT 1 FROM (VALUES (1)) c (z)))",
        )
        .unwrap_err();
    assert!(matches!(err.kind, ErrorKind::NestingTooDeep(2)));
    assert_eq!(err.code(), "54001");
}

#[test]
fn errors_reset_the_session() {
    let catalog = catalog();
    let compiler = Compiler::new(&catalog);
    assert!(compiler.compile_one("SELECT nope FROM customers WHERE id = ?").is_err());
    let statement = compiler.compile_one("SELECT id FROM customers WHERE name = ?").unwrap();
    assert_eq!(statement.parameters().len(), 1);
    assert!(statement.subqueries().is_empty());
}

fn bracketed(depth: usize) -> String {
    format!("SELECT {}1{} FROM customers", "(".repeat(depth), ")".repeat(depth))
}

#[test]
fn deep_expressions_fail_with_an_error() {
    assert!(compile_all(&bracketed(40)).len() == 1);

    let err = compile_err(&bracketed(20_000));
    assert!(matches!(err.kind, ErrorKind::NestingTooDeep(128)));
    assert_eq!(err.code(), "54001");

    let sql = format!("SELECT id FROM customers WHERE {}TRUE", "NOT ".repeat(20_000));
    assert!(matches!(compile_err(&sql).kind, ErrorKind::NestingTooDeep(_)));

    let sql = format!("SELECT {}1 FROM customers", "- ".repeat(20_000));
    assert!(matches!(compile_err(&sql).kind, ErrorKind::NestingTooDeep(_)));
}

#[test]
fn expression_depth_limit_is_configurable() {
    let catalog = catalog();
    let config = CompilerConfig {
        max_expression_depth: 8,
        ..CompilerConfig::default()
    };
    let compiler = Compiler::new(&catalog).with_config(config);
    assert!(compiler.compile_one(&bracketed(3)).is_ok());
    let err = compiler.compile_one(&bracketed(12)).unwrap_err();
    assert!(matches!(err.kind, ErrorKind::NestingTooDeep(8)));
}
