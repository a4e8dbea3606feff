mod common;

use common::*;
use oxide_sql_compiler::ast::{
    ConstraintKind, DataType, ReferentialAction, StatementKind, TableKind, TriggerTiming,
};
use oxide_sql_compiler::catalog::MemoryCatalog;
use oxide_sql_compiler::{Compiler, CompilerConfig, ErrorKind, StatementArgs};

#[test]
fn view_text_recompiles_to_the_same_view() {
    let sql = "CREATE VIEW customer_totals (customer, amount) AS \
               SELECT c.name, SUM(o.total) FROM customers c \
               LEFT JOIN orders o ON o.customer_id = c.id GROUP BY c.name";
    let statement = compile(sql);
    let StatementArgs::CreateView(view) = statement.args() else {
        panic!("not a view");
    };
    assert_eq!(view.columns, vec!["CUSTOMER".to_string(), "AMOUNT".to_string()]);
    assert!(view.query_sql.starts_with("SELECT c.name"));

    let again = compile(&format!(
        "CREATE VIEW customer_totals (customer, amount) AS {}",
        view.query_sql
    ));
    let StatementArgs::CreateView(reparsed) = again.args() else {
        panic!("not a view");
    };
    assert_eq!(reparsed.query_sql, view.query_sql);
    assert_eq!(reparsed.query.columns, view.query.columns);
    assert_eq!(again.read_tables(), statement.read_tables());

    let select = compile(&view.query_sql);
    let StatementArgs::Query(query) = select.args() else {
        panic!("not a query");
    };
    let types: Vec<_> = query.columns.iter().map(|c| c.data_type.clone()).collect();
    let view_types: Vec<_> = view.query.columns.iter().map(|c| c.data_type.clone()).collect();
    assert_eq!(types, view_types);
}

#[test]
fn create_table_with_references_and_checks() {
    let statement = compile(
        "CREATE CACHED TABLE payments ( \
           id INTEGER GENERATED BY DEFAULT AS IDENTITY (START WITH 100) PRIMARY KEY, \
           order_id INTEGER NOT NULL REFERENCES orders ON DELETE CASCADE, \
           amount money CHECK (amount > 0), \
           paid_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP, \
           CONSTRAINT one_per_order UNIQUE (order_id))",
    );
    assert_eq!(statement.kind(), StatementKind::CreateTable);
    assert_eq!(statement.write_tables(), &[name("PAYMENTS")]);

    let StatementArgs::CreateTable(table) = statement.args() else {
        panic!("not a table");
    };
    assert_eq!(table.kind, TableKind::Cached);
    assert_eq!(
        table.columns[2].data_type,
        DataType::Decimal {
            precision: Some(12),
            scale: Some(2)
        }
    );
    assert_eq!(table.columns[2].domain, Some(name("MONEY")));

    let names: Vec<&str> = table.constraints.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names[0], "SYS_PK_PAYMENTS");
    assert!(names.contains(&"ONE_PER_ORDER"));

    let foreign_key = table
        .constraints
        .iter()
        .find_map(|c| match &c.kind {
            ConstraintKind::ForeignKey(fk) => Some(fk),
            _ => None,
        })
        .expect("foreign key");
    assert_eq!(foreign_key.referenced_table, name("ORDERS"));
    assert_eq!(foreign_key.referenced_columns, vec!["ID".to_string()]);
    assert_eq!(foreign_key.on_delete, ReferentialAction::Cascade);
}

#[test]
fn self_referencing_foreign_key() {
    let statement = compile(
        "CREATE TABLE staff (id INT PRIMARY KEY, boss INT, FOREIGN KEY (boss) REFERENCES staff)",
    );
    let StatementArgs::CreateTable(table) = statement.args() else {
        panic!("not a table");
    };
    assert_eq!(table.constraints.len(), 2);
}

#[test]
fn table_definition_errors() {
    let err = compile_err("CREATE TABLE orders (id INT)");
    assert!(matches!(err.kind, ErrorKind::ObjectExists(_)));
    assert_eq!(err.code(), "42504");

    let err = compile_err("CREATE TABLE t (a INT PRIMARY KEY, b INT, PRIMARY KEY (b))");
    assert!(matches!(err.kind, ErrorKind::DuplicatePrimaryKey(_)));

    let err = compile_err("CREATE TABLE t (a INT, b INT REFERENCES orders (id, customer_id))");
    assert!(matches!(err.kind, ErrorKind::ColumnCountMismatch { .. }));

    let err = compile_err("CREATE TABLE t (a INT CHECK (COUNT(*) > 1))");
    assert!(matches!(err.kind, ErrorKind::MisplacedAggregate(_)));

    assert!(compile_all("CREATE TABLE IF NOT EXISTS orders (id INT)").len() == 1);
}

#[test]
fn default_table_kind_comes_from_config() {
    let catalog = MemoryCatalog::new();
    let config = CompilerConfig {
        default_table_kind: TableKind::Cached,
        ..CompilerConfig::default()
    };
    let statement = Compiler::new(&catalog)
        .with_config(config)
        .compile_one("CREATE TABLE t (a INT)")
        .unwrap();
    let StatementArgs::CreateTable(table) = statement.args() else {
        panic!("not a table");
    };
    assert_eq!(table.kind, TableKind::Cached);
}

#[test]
fn create_table_as_query() {
    let statement = compile("CREATE TABLE recent (id, spent) AS (SELECT id, total FROM orders) WITH NO DATA");
    let StatementArgs::CreateTable(table) = statement.args() else {
        panic!("not a table");
    };
    let source = table.source.as_ref().expect("source");
    assert!(!source.with_data);
    assert_eq!(table.columns[1].name, "SPENT");
    assert_eq!(
        table.columns[1].data_type,
        DataType::Decimal {
            precision: Some(12),
            scale: Some(2)
        }
    );
    assert_eq!(statement.read_tables(), &[name("ORDERS")]);
}

#[test]
fn trigger_body_sees_transition_rows() {
    let statement = compile(
        "CREATE TRIGGER audit_total AFTER UPDATE OF total ON orders \
         REFERENCING OLD ROW AS was NEW ROW AS now FOR EACH ROW \
         WHEN (now.total > was.total) \
         BEGIN ATOMIC \
           INSERT INTO items (order_id, sku, qty) VALUES (now.id, 'RAISE', 1); \
           UPDATE customers SET city = NULL WHERE id = now.customer_id; \
         END",
    );
    let StatementArgs::CreateTrigger(trigger) = statement.args() else {
        panic!("not a trigger");
    };
    assert_eq!(trigger.timing, TriggerTiming::After);
    assert!(trigger.for_each_row);
    assert_eq!(trigger.body.len(), 2);
    assert_eq!(trigger.body[0].write_tables(), &[name("ITEMS")]);
    assert_eq!(trigger.body[1].write_tables(), &[name("CUSTOMERS")]);
    assert!(trigger.body_sql.starts_with("BEGIN ATOMIC"));

    let err = compile_err(
        "CREATE TRIGGER t AFTER INSERT ON orders REFERENCING NEW ROW AS n FOR EACH ROW \
         INSERT INTO items (order_id) VALUES (n.missing)",
    );
    assert!(matches!(err.kind, ErrorKind::ColumnNotFound(_)));
}

#[test]
fn schema_objects_and_access_control() {
    let statements = compile_all(
        "CREATE SEQUENCE invoice_seq AS INTEGER START WITH 1000 INCREMENT BY 1; \
         CREATE DOMAIN sku_code AS CHAR(8) CHECK (VALUE LIKE 'S%'); \
         CREATE INDEX orders_by_customer ON orders (customer_id, placed DESC); \
         CREATE ROLE auditor; \
         GRANT SELECT ON orders TO clerk WITH GRANT OPTION; \
         GRANT clerk TO alice; \
         REVOKE SELECT ON orders FROM clerk CASCADE; \
         ALTER TABLE orders ADD COLUMN note VARCHAR(200); \
         DROP VIEW big_orders IF EXISTS",
    );
    let kinds: Vec<StatementKind> = statements.iter().map(|s| s.kind()).collect();
    assert_eq!(
        kinds,
        vec![
            StatementKind::CreateSequence,
            StatementKind::CreateDomain,
            StatementKind::CreateIndex,
            StatementKind::CreateRole,
            StatementKind::Grant,
            StatementKind::GrantRole,
            StatementKind::Revoke,
            StatementKind::AlterTable,
            StatementKind::Drop,
        ]
    );
    assert!(kinds.iter().all(StatementKind::is_schema_change));
}

#[test]
fn sequence_options_are_validated() {
    let err = compile_err("CREATE SEQUENCE s INCREMENT BY 0");
    assert!(matches!(err.kind, ErrorKind::InvalidDefinition(_)));
    let err = compile_err("CREATE SEQUENCE s MINVALUE 10 START WITH 5");
    assert!(matches!(err.kind, ErrorKind::InvalidDefinition(_)));
    let err = compile_err("CREATE SEQUENCE s START WITH 1 START WITH 2");
    assert!(matches!(err.kind, ErrorKind::InvalidDefinition(_)));
}
