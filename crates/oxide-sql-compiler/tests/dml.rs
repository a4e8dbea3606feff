mod common;

use common::*;
use oxide_sql_compiler::ast::{DataType, InsertSource, StatementKind};
use oxide_sql_compiler::catalog::Authorizer;
use oxide_sql_compiler::{ErrorKind, QualifiedName, StatementArgs};

#[test]
fn correlated_update_reads_other_tables() {
    let statement = compile(
        "UPDATE customers c SET city = (SELECT MAX(r.name) FROM sales.regions r WHERE r.id = c.id) \
         WHERE EXISTS (SELECT 1 FROM orders o WHERE o.customer_id = c.id AND o.total > ?)",
    );
    assert_eq!(statement.kind(), StatementKind::Update);
    assert_eq!(statement.write_tables(), &[name("CUSTOMERS")]);
    assert_eq!(
        statement.read_tables(),
        &[QualifiedName::new("SALES", "REGIONS"), name("ORDERS")]
    );
    assert!(statement.subqueries().iter().all(|s| s.correlated));
    assert_eq!(
        statement.parameters()[0].data_type,
        Some(DataType::Decimal {
            precision: Some(12),
            scale: Some(2)
        })
    );
}

#[test]
fn insert_select_checks_degree_and_types() {
    let statement = compile(
        "INSERT INTO items (order_id, sku, qty) \
         SELECT o.id, 'GIFT', 1 FROM orders o WHERE o.placed > DATE '2024-01-01'",
    );
    let StatementArgs::Insert(insert) = statement.args() else {
        panic!("not an insert");
    };
    assert!(matches!(insert.source, InsertSource::Query(_)));
    assert_eq!(statement.read_tables(), &[name("ORDERS")]);
    assert_eq!(statement.write_tables(), &[name("ITEMS")]);

    let err = compile_err("INSERT INTO items (order_id, sku) SELECT id FROM orders");
    assert!(matches!(err.kind, ErrorKind::ColumnCountMismatch { expected: 2, found: 1 }));

    let err = compile_err("INSERT INTO items (qty) SELECT placed FROM orders");
    assert!(matches!(err.kind, ErrorKind::WrongDataType(_)));
}

#[test]
fn identity_column_may_be_left_out() {
    let statement = compile("INSERT INTO customers (name, city) VALUES (:name, :city)");
    let names: Vec<_> = statement.parameters().iter().map(|p| p.name.clone()).collect();
    assert_eq!(names, vec![Some("name".to_string()), Some("city".to_string())]);
}

#[test]
fn sequence_values_are_dependencies() {
    let statement = compile("INSERT INTO orders (id, customer_id) VALUES (NEXT VALUE FOR order_seq, 7)");
    let uses: Vec<_> = statement
        .referenced_objects()
        .iter()
        .filter(|r| r.name == name("ORDER_SEQ"))
        .collect();
    assert_eq!(uses.len(), 1);
    assert!(statement.read_tables().is_empty());
}

#[test]
fn views_are_not_writable() {
    let err = compile_err("DELETE FROM big_orders");
    assert!(matches!(err.kind, ErrorKind::InvalidDefinition(_)));
    let err = compile_err("TRUNCATE TABLE big_orders");
    assert!(matches!(err.kind, ErrorKind::InvalidDefinition(_)));
}

struct NoOrders;

impl Authorizer for NoOrders {
    fn can_select(&self, table: &QualifiedName, _columns: &[String]) -> bool {
        table.name != "ORDERS"
    }
}

#[test]
fn reads_inside_subqueries_are_authorized() {
    let err = compile_with(
        "DELETE FROM customers c WHERE NOT EXISTS (SELECT 1 FROM orders o WHERE o.customer_id = c.id)",
        &NoOrders,
    )
    .unwrap_err();
    assert!(matches!(err.kind, ErrorKind::AccessDenied(_)));
    assert!(compile_with("DELETE FROM customers WHERE city = 'Oslo'", &NoOrders).is_ok());
}

#[test]
fn script_compiles_statement_by_statement() {
    let statements = compile_all(
        "INSERT INTO customers (name) VALUES ('Ada');\n\
         UPDATE customers SET city = 'London' WHERE name = 'Ada';\n\
         SELECT COUNT(*) FROM customers;\n\
         DELETE FROM customers WHERE city IS NULL;",
    );
    let kinds: Vec<StatementKind> = statements.iter().map(|s| s.kind()).collect();
    assert_eq!(
        kinds,
        vec![
            StatementKind::Insert,
            StatementKind::Update,
            StatementKind::Select,
            StatementKind::Delete
        ]
    );
    assert_eq!(statements[1].sql(), "UPDATE customers SET city = 'London' WHERE name = 'Ada'");
}
