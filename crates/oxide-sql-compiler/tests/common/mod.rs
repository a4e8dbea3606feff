#![allow(dead_code)]

use oxide_sql_compiler::ast::{DataType, QualifiedName, QueryExpression, StatementArgs};
use oxide_sql_compiler::catalog::{
    Authorizer, ColumnDef, DomainDef, MemoryCatalog, SequenceDef, TableDef,
};
use oxide_sql_compiler::{CompileError, Compiler, Statement};

pub fn name(table: &str) -> QualifiedName {
    QualifiedName::new("PUBLIC", table)
}

/// A small shop schema shared by the integration tests.
pub fn catalog() -> MemoryCatalog {
    MemoryCatalog::new()
        .with_schema("SALES")
        .with_table(
            TableDef::new(name("CUSTOMERS"))
                .with_column(ColumnDef::new("ID", DataType::Integer).identity())
                .column("NAME", DataType::Varchar(Some(60)))
                .column("CITY", DataType::Varchar(Some(40)))
                .primary_key(&["ID"])
                .constraint("SYS_PK_CUSTOMERS"),
        )
        .with_table(
            TableDef::new(name("ORDERS"))
                .column("ID", DataType::Integer)
                .column("CUSTOMER_ID", DataType::Integer)
                .column("PLACED", DataType::Date)
                .column(
                    "TOTAL",
                    DataType::Decimal {
                        precision: Some(12),
                        scale: Some(2),
                    },
                )
                .primary_key(&["ID"])
                .constraint("SYS_PK_ORDERS"),
        )
        .with_table(
            TableDef::new(name("ITEMS"))
                .column("ORDER_ID", DataType::Integer)
                .column("SKU", DataType::Char(Some(8)))
                .column("QTY", DataType::Smallint),
        )
        .with_table(
            TableDef::new(QualifiedName::new("SALES", "REGIONS"))
                .column("ID", DataType::Integer)
                .column("NAME", DataType::Varchar(Some(20))),
        )
        .with_table(
            TableDef::new(name("BIG_ORDERS"))
                .column("ID", DataType::Integer)
                .column(
                    "TOTAL",
                    DataType::Decimal {
                        precision: Some(12),
                        scale: Some(2),
                    },
                )
                .as_view(),
        )
        .with_sequence(SequenceDef {
            name: name("ORDER_SEQ"),
            data_type: DataType::Bigint,
        })
        .with_domain(DomainDef {
            name: name("MONEY"),
            data_type: DataType::Decimal {
                precision: Some(12),
                scale: Some(2),
            },
            constraints: vec!["MONEY_POSITIVE".to_string()],
        })
        .with_user("ALICE")
        .with_role("CLERK")
}

pub fn compile(sql: &str) -> Statement {
    let catalog = catalog();
    Compiler::new(&catalog)
        .compile_one(sql)
        .unwrap_or_else(|e| panic!("Failed to compile: {sql}\nError: {e}"))
}

pub fn compile_all(sql: &str) -> Vec<Statement> {
    let catalog = catalog();
    Compiler::new(&catalog)
        .compile(sql)
        .unwrap_or_else(|e| panic!("Failed to compile: {sql}\nError: {e}"))
}

pub fn compile_err(sql: &str) -> CompileError {
    let catalog = catalog();
    match Compiler::new(&catalog).compile_one(sql) {
        Ok(statement) => panic!("Expected compile error for: {sql}\nGot: {statement:?}"),
        Err(err) => err,
    }
}

pub fn compile_with(sql: &str, authorizer: &dyn Authorizer) -> Result<Statement, CompileError> {
    let catalog = catalog();
    Compiler::new(&catalog).with_authorizer(authorizer).compile_one(sql)
}

pub fn query(sql: &str) -> QueryExpression {
    match compile(sql).args() {
        StatementArgs::Query(query) => query.clone(),
        other => panic!("Expected a query, got {other:?}"),
    }
}
