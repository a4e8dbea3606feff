//! # oxide-sql-compiler
//!
//! A SQL compiler front end: it turns SQL text into checked statement
//! objects, ready for an execution engine.
//!
//! This crate provides:
//! - A hand-written lexer and a recursive descent parser with Pratt
//!   expression parsing and speculative alternatives
//! - Name and scope resolution against a [`catalog::Catalog`], with
//!   correlated subqueries and a materialization order for them
//! - Type derivation, including types for dynamic parameters
//! - DML, DDL and access-control statements with their read and write sets
//!
//! ## Compiling a statement
//!
//! ```rust
//! use oxide_sql_compiler::ast::{DataType, QualifiedName, StatementKind};
//! use oxide_sql_compiler::catalog::{MemoryCatalog, TableDef};
//! use oxide_sql_compiler::Compiler;
//!
//! let catalog = MemoryCatalog::new()
//!     .with_table(
//!         TableDef::new(QualifiedName::new("PUBLIC", "ORDERS"))
//!             .column("ID", DataType::Integer)
//!             .column("CUSTOMER_ID", DataType::Integer)
//!             .primary_key(&["ID"]),
//!     )
//!     .with_table(
//!         TableDef::new(QualifiedName::new("PUBLIC", "CUSTOMERS"))
//!             .column("ID", DataType::Integer)
//!             .column("NAME", DataType::Varchar(Some(40))),
//!     );
//!
//! let statement = Compiler::new(&catalog)
//!     .compile_one(
//!         "DELETE FROM orders o WHERE NOT EXISTS \
//!          (SELECT 1 FROM customers c WHERE c.id = o.customer_id)",
//!     )
//!     .unwrap();
//!
//! assert_eq!(statement.kind(), StatementKind::Delete);
//! assert_eq!(statement.write_tables(), &[QualifiedName::new("PUBLIC", "ORDERS")]);
//! assert_eq!(statement.read_tables(), &[QualifiedName::new("PUBLIC", "CUSTOMERS")]);
//! assert!(statement.subqueries()[0].correlated);
//! ```
//!
//! ## Errors
//!
//! Every failure is a [`CompileError`] carrying an [`ErrorKind`], a stable
//! code and the span of the offending text:
//!
//! ```rust
//! use oxide_sql_compiler::catalog::MemoryCatalog;
//! use oxide_sql_compiler::{Compiler, ErrorKind};
//!
//! let catalog = MemoryCatalog::new();
//! let err = Compiler::new(&catalog).compile_one("SELECT * FROM nowhere").unwrap_err();
//!
//! assert!(matches!(err.kind, ErrorKind::ObjectNotFound(_)));
//! assert_eq!(err.code(), "42501");
//! ```

pub mod ast;
pub mod catalog;
pub mod compiler;
pub mod config;
pub mod error;
pub mod lexer;
pub mod parser;

pub use ast::{DataType, Expr, QualifiedName, Statement, StatementArgs, StatementKind};
pub use catalog::{AllowAll, Authorizer, Catalog, MemoryCatalog};
pub use compiler::Compiler;
pub use config::CompilerConfig;
pub use error::{CompileError, ErrorKind, Result};
pub use lexer::{Lexer, Span, Token, TokenKind};
pub use parser::Parser;
