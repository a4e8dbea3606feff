//! Schema definition and access control statements.
//!
//! Definitions are checked against the catalog while they are read: names
//! that must be new are new, names that must exist exist, and expressions
//! inside a definition are resolved against the columns they can see.

mod access;
mod alter;
mod objects;
mod table;
mod trigger;

use tracing::debug;

use super::resolve::{Clause, Env};
use super::Parser;
use crate::ast::{
    Access, DataType, DropBehavior, DropDefinition, Expr, ObjectKind, QualifiedName,
    RangeVariable, StatementArgs, StatementKind,
};
use crate::error::{ErrorKind, Result};
use crate::lexer::{Keyword, Span};

impl<'a> Parser<'a> {
    /// `CREATE <object> ...`
    pub(crate) fn parse_create(&mut self) -> Result<(StatementKind, StatementArgs)> {
        self.expect_keyword(Keyword::Create)?;
        match self.current().as_keyword() {
            Some(Keyword::Unique | Keyword::Index) => self.parse_create_index(),
            Some(
                Keyword::Global
                | Keyword::Local
                | Keyword::Temp
                | Keyword::Temporary
                | Keyword::Memory
                | Keyword::Cached
                | Keyword::Text
                | Keyword::Table,
            ) => self.parse_create_table(),
            Some(Keyword::View) => self.parse_create_view(),
            Some(Keyword::Sequence) => self.parse_create_sequence(),
            Some(Keyword::Domain) => self.parse_create_domain(),
            Some(Keyword::Trigger) => self.parse_create_trigger(),
            Some(Keyword::Schema) => self.parse_create_schema(),
            Some(Keyword::User) => self.parse_create_user(),
            Some(Keyword::Role) => self.parse_create_role(),
            Some(Keyword::Type) => self.parse_create_type(),
            Some(Keyword::Character) => self.parse_create_character_set(),
            _ => Err(self.unexpected("object kind")),
        }
    }

    /// `ALTER <object> ...`
    pub(crate) fn parse_alter(&mut self) -> Result<(StatementKind, StatementArgs)> {
        self.expect_keyword(Keyword::Alter)?;
        match self.current().as_keyword() {
            Some(Keyword::Table) => self.parse_alter_table(),
            Some(Keyword::Sequence) => self.parse_alter_sequence(),
            Some(Keyword::Domain) => self.parse_alter_domain(),
            Some(Keyword::User) => self.parse_alter_user(),
            Some(Keyword::Index) => self.parse_alter_index(),
            _ => Err(self.unexpected("object kind")),
        }
    }

    /// `DROP <kind> [IF EXISTS] name [IF EXISTS] [CASCADE | RESTRICT]`
    pub(crate) fn parse_drop(&mut self) -> Result<(StatementKind, StatementArgs)> {
        self.expect_keyword(Keyword::Drop)?;
        let kind = self.parse_object_kind()?;
        let mut if_exists = self.parse_if_exists();
        let position = self.position();
        let span = self.current().span;
        let name = self.parse_object_name(kind)?;
        if !if_exists {
            if_exists = self.parse_if_exists();
        }
        let behavior = self.parse_drop_behavior();

        let exists = match kind {
            // Either spelling of a routine drops whatever routine has the name.
            ObjectKind::Routine => self.catalog.routine(&name).is_some(),
            _ => self.catalog.object_exists(kind, &name),
        };
        if exists {
            self.check_owner(kind, &name, span)?;
            if matches!(kind, ObjectKind::Table | ObjectKind::View) {
                self.ctx.add_reference(kind, name.clone(), Access::Write, position);
            }
        } else if !if_exists {
            return Err(self.error_at(ErrorKind::ObjectNotFound(format!("{kind} {name}")), span));
        }
        debug!(%kind, %name, exists, "drop");

        Ok((
            StatementKind::Drop,
            StatementArgs::Drop(DropDefinition {
                kind,
                name,
                if_exists,
                behavior,
            }),
        ))
    }

    /// The object kind keyword(s) after DROP.
    fn parse_object_kind(&mut self) -> Result<ObjectKind> {
        let kind = match self.current().as_keyword() {
            Some(Keyword::Table) => ObjectKind::Table,
            Some(Keyword::View) => ObjectKind::View,
            Some(Keyword::Index) => ObjectKind::Index,
            Some(Keyword::Sequence) => ObjectKind::Sequence,
            Some(Keyword::Domain) => ObjectKind::Domain,
            Some(Keyword::Trigger) => ObjectKind::Trigger,
            Some(Keyword::Schema) => ObjectKind::Schema,
            Some(Keyword::User) => ObjectKind::User,
            Some(Keyword::Role) => ObjectKind::Role,
            Some(Keyword::Type) => ObjectKind::Type,
            Some(Keyword::Collation) => ObjectKind::Collation,
            Some(Keyword::Routine | Keyword::Function | Keyword::Procedure) => ObjectKind::Routine,
            Some(Keyword::Character) => {
                self.advance();
                self.expect_keyword(Keyword::Set)?;
                return Ok(ObjectKind::CharacterSet);
            }
            _ => return Err(self.unexpected("object kind")),
        };
        self.advance();
        Ok(kind)
    }

    /// Schemas, users and roles have simple names; everything else lives in
    /// a schema.
    pub(crate) fn parse_object_name(&mut self, kind: ObjectKind) -> Result<QualifiedName> {
        match kind {
            ObjectKind::Schema | ObjectKind::User | ObjectKind::Role => {
                self.expect_identifier().map(QualifiedName::bare)
            }
            _ => self.parse_qualified_name(),
        }
    }

    /// `IF EXISTS`, if present.
    fn parse_if_exists(&mut self) -> bool {
        if self.check_keyword(Keyword::If) && self.peek_keyword(1, Keyword::Exists) {
            self.advance();
            self.advance();
            return true;
        }
        false
    }

    /// `CASCADE | RESTRICT`, defaulting to RESTRICT.
    pub(crate) fn parse_drop_behavior(&mut self) -> DropBehavior {
        if self.consume_keyword(Keyword::Cascade) {
            DropBehavior::Cascade
        } else {
            self.consume_keyword(Keyword::Restrict);
            DropBehavior::Restrict
        }
    }

    // --- Checks shared by the definition statements ---

    /// Fails when an object of `kind` named `name` already exists. Tables
    /// and views share one namespace.
    pub(crate) fn check_new_object(&self, kind: ObjectKind, name: &QualifiedName, span: Span) -> Result<()> {
        let exists = match kind {
            ObjectKind::Table | ObjectKind::View => self.catalog.table(name).is_some(),
            _ => self.catalog.object_exists(kind, name),
        };
        if exists {
            return Err(self.error_at(ErrorKind::ObjectExists(format!("{kind} {name}")), span));
        }
        Ok(())
    }

    /// The schema of `name` exists and the session may define objects in it.
    pub(crate) fn check_define(&self, name: &QualifiedName, span: Span) -> Result<()> {
        let schema = name.schema.as_deref().unwrap_or(&self.config.default_schema);
        if !self.catalog.schema_exists(schema) {
            return Err(self.error_at(ErrorKind::ObjectNotFound(format!("SCHEMA {schema}")), span));
        }
        if !self.authorizer.can_define(schema) {
            return Err(self.error_at(ErrorKind::AccessDenied(format!("definition in schema {schema}")), span));
        }
        Ok(())
    }

    /// Changing or dropping an existing object needs definition rights in
    /// its schema; users, roles and schemas need an administrator.
    pub(crate) fn check_owner(&self, kind: ObjectKind, name: &QualifiedName, span: Span) -> Result<()> {
        match kind {
            ObjectKind::Schema | ObjectKind::User | ObjectKind::Role => self.require_admin(kind, span),
            _ => self.check_define(name, span),
        }
    }

    pub(crate) fn require_admin(&self, kind: ObjectKind, span: Span) -> Result<()> {
        if self.authorizer.is_admin() {
            Ok(())
        } else {
            Err(self.error_at(ErrorKind::AccessDenied(format!("{kind} administration")), span))
        }
    }

    /// Resolves an expression inside a definition against `ranges` only.
    pub(crate) fn resolve_definition_expr(
        &mut self,
        expr: &mut Expr,
        ranges: Vec<RangeVariable>,
        clause: Clause,
    ) -> Result<()> {
        let mut env = Env::new(ranges);
        match clause {
            Clause::Check | Clause::TriggerCondition => self.resolve_condition(expr, &mut env, clause),
            _ => self.resolve_expr(expr, &mut env, clause),
        }
    }

    /// A default value: no column references, typed by and assignable to
    /// `target`.
    pub(crate) fn resolve_default(&mut self, expr: &mut Expr, target: &DataType) -> Result<()> {
        self.resolve_definition_expr(expr, Vec::new(), Clause::Default)?;
        self.require_scalar(expr)?;
        self.pin(expr, target);
        self.check_assignable(expr, target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::Statement;
    use crate::catalog::{AllowAll, Authorizer, ColumnDef, MemoryCatalog, TableDef};
    use crate::config::CompilerConfig;

    pub(super) fn catalog() -> MemoryCatalog {
        MemoryCatalog::new()
            .with_table(
                TableDef::new(QualifiedName::new("PUBLIC", "CUSTOMER"))
                    .with_column(ColumnDef::new("ID", DataType::Integer).identity())
                    .column("NAME", DataType::Varchar(Some(40)))
                    .column("CITY", DataType::Varchar(Some(40)))
                    .primary_key(&["ID"])
                    .constraint("SYS_PK_CUSTOMER"),
            )
            .with_table(
                TableDef::new(QualifiedName::new("PUBLIC", "ORDERS"))
                    .column("ID", DataType::Integer)
                    .column("CUSTOMER_ID", DataType::Integer)
                    .column("TOTAL", DataType::Decimal {
                        precision: Some(10),
                        scale: Some(2),
                    })
                    .with_column(ColumnDef {
                        has_default: true,
                        ..ColumnDef::new("PLACED", DataType::Date)
                    }),
            )
            .with_table(
                TableDef::new(QualifiedName::new("PUBLIC", "BIG_SPENDERS"))
                    .column("ID", DataType::Integer)
                    .as_view(),
            )
            .with_sequence(crate::catalog::SequenceDef {
                name: QualifiedName::bare("SEQ"),
                data_type: DataType::Bigint,
            })
            .with_user("ALICE")
            .with_role("CLERK")
    }

    pub(super) fn compile_with(sql: &str, authorizer: &dyn Authorizer) -> Result<Statement> {
        let catalog = catalog();
        let config = CompilerConfig::default();
        let mut parser = Parser::new(sql, &catalog, authorizer, &config);
        parser.next_statement().map(|s| s.expect("statement"))
    }

    pub(super) fn compile(sql: &str) -> Result<Statement> {
        compile_with(sql, &AllowAll)
    }

    #[test]
    fn test_drop_existing_and_missing() {
        let statement = compile("DROP TABLE orders CASCADE").unwrap();
        assert_eq!(statement.write_tables(), &[QualifiedName::new("PUBLIC", "ORDERS")]);
        let StatementArgs::Drop(drop) = statement.args() else {
            panic!("not a drop");
        };
        assert_eq!(drop.kind, ObjectKind::Table);
        assert_eq!(drop.behavior, DropBehavior::Cascade);

        assert!(matches!(
            compile("DROP TABLE nothing").unwrap_err().kind,
            ErrorKind::ObjectNotFound(_)
        ));
        let statement = compile("DROP TABLE IF EXISTS nothing").unwrap();
        assert!(statement.write_tables().is_empty());
        assert!(compile("DROP TABLE nothing IF EXISTS RESTRICT").is_ok());
    }

    #[test]
    fn test_drop_kinds() {
        assert!(compile("DROP VIEW big_spenders").is_ok());
        assert!(compile("DROP SEQUENCE seq").is_ok());
        assert!(compile("DROP ROLE clerk").is_ok());
        assert!(compile("DROP USER alice").is_ok());
        assert!(compile("DROP SCHEMA public CASCADE").is_ok());
        // A view is not a table.
        assert!(matches!(
            compile("DROP TABLE big_spenders").unwrap_err().kind,
            ErrorKind::ObjectNotFound(_)
        ));
    }

    struct NoDefinitions;

    impl Authorizer for NoDefinitions {
        fn can_define(&self, _schema: &str) -> bool {
            false
        }

        fn is_admin(&self) -> bool {
            false
        }
    }

    #[test]
    fn test_definition_rights() {
        assert!(matches!(
            compile_with("DROP TABLE orders", &NoDefinitions).unwrap_err().kind,
            ErrorKind::AccessDenied(_)
        ));
        assert!(matches!(
            compile_with("DROP ROLE clerk", &NoDefinitions).unwrap_err().kind,
            ErrorKind::AccessDenied(_)
        ));
        assert!(matches!(
            compile_with("CREATE TABLE t (a INT)", &NoDefinitions).unwrap_err().kind,
            ErrorKind::AccessDenied(_)
        ));
    }
}
