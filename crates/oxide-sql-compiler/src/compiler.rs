//! Entry point for compiling SQL text against a catalog.

use tracing::debug;

use crate::ast::Statement;
use crate::catalog::{AllowAll, Authorizer, Catalog};
use crate::config::CompilerConfig;
use crate::error::Result;
use crate::parser::Parser;

static ALLOW_ALL: AllowAll = AllowAll;

/// Compiles SQL text into checked [`Statement`]s.
///
/// ```
/// use oxide_sql_compiler::catalog::{MemoryCatalog, TableDef};
/// use oxide_sql_compiler::ast::{DataType, QualifiedName, StatementKind};
/// use oxide_sql_compiler::Compiler;
///
/// let catalog = MemoryCatalog::new().with_table(
///     TableDef::new(QualifiedName::new("PUBLIC", "USERS"))
///         .column("ID", DataType::Integer)
///         .column("NAME", DataType::Varchar(Some(100))),
/// );
/// let statement = Compiler::new(&catalog)
///     .compile_one("SELECT name FROM users WHERE id = ?")
///     .unwrap();
///
/// assert_eq!(statement.kind(), StatementKind::Select);
/// assert_eq!(statement.parameters()[0].data_type, Some(DataType::Integer));
/// ```
#[derive(Clone)]
pub struct Compiler<'a> {
    catalog: &'a dyn Catalog,
    authorizer: &'a dyn Authorizer,
    config: CompilerConfig,
}

impl<'a> Compiler<'a> {
    /// A compiler that allows every operation and uses the default settings.
    #[must_use]
    pub fn new(catalog: &'a dyn Catalog) -> Self {
        Self {
            catalog,
            authorizer: &ALLOW_ALL,
            config: CompilerConfig::default(),
        }
    }

    /// Checks every access against `authorizer`.
    #[must_use]
    pub fn with_authorizer(mut self, authorizer: &'a dyn Authorizer) -> Self {
        self.authorizer = authorizer;
        self
    }

    #[must_use]
    pub fn with_config(mut self, config: CompilerConfig) -> Self {
        self.config = config;
        self
    }

    #[must_use]
    pub const fn config(&self) -> &CompilerConfig {
        &self.config
    }

    /// Compiles every `;`-separated statement of `sql`.
    ///
    /// # Errors
    ///
    /// Returns the error of the first statement that fails; statements
    /// before it are discarded.
    pub fn compile(&self, sql: &str) -> Result<Vec<Statement>> {
        let mut parser = self.parser(sql);
        let mut statements = Vec::new();
        while let Some(statement) = parser.next_statement()? {
            statements.push(statement);
        }
        debug!(count = statements.len(), "compiled");
        Ok(statements)
    }

    /// Compiles `sql`, which must hold exactly one statement.
    ///
    /// # Errors
    ///
    /// Returns the statement's error, or a syntax error if the text is
    /// empty or continues past the first statement.
    pub fn compile_one(&self, sql: &str) -> Result<Statement> {
        let mut parser = self.parser(sql);
        let statement = parser.expect_statement()?;
        parser.expect_end()?;
        Ok(statement)
    }

    fn parser<'s>(&'s self, sql: &'s str) -> Parser<'s> {
        Parser::new(sql, self.catalog, self.authorizer, &self.config)
    }
}
