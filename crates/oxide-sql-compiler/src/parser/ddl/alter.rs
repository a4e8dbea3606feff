//! ALTER TABLE, SEQUENCE, DOMAIN, USER and INDEX.

use tracing::debug;

use super::super::Parser;
use super::table::{catalog_columns, range_columns, ConstraintList};
use crate::ast::{
    Access, AlterTableAction, ColumnChange, ColumnGeneration, DomainChange, ObjectKind,
    QualifiedName, SequenceOptions, StatementArgs, StatementKind,
};
use crate::catalog::TableDef;
use crate::error::{ErrorKind, Result};
use crate::lexer::Keyword;

impl<'a> Parser<'a> {
    /// `ALTER TABLE name action`
    pub(super) fn parse_alter_table(&mut self) -> Result<(StatementKind, StatementArgs)> {
        self.expect_keyword(Keyword::Table)?;
        let position = self.position();
        let span = self.current().span;
        let name = self.parse_qualified_name()?;
        let catalog = self.catalog;
        let table = match catalog.table(&name) {
            Some(table) if !table.view => table,
            _ => return Err(self.error_at(ErrorKind::ObjectNotFound(format!("TABLE {name}")), span)),
        };
        self.check_define(&name, span)?;
        self.ctx.add_reference(ObjectKind::Table, name.clone(), Access::Write, position);

        let action = match self.current().as_keyword() {
            Some(Keyword::Add) => {
                self.advance();
                if self.starts_table_constraint() {
                    self.parse_add_constraint(&name, table, position)?
                } else {
                    self.consume_keyword(Keyword::Column);
                    self.parse_add_column(&name, table, position)?
                }
            }
            Some(Keyword::Drop) => {
                self.advance();
                if self.consume_keyword(Keyword::Constraint) {
                    let span = self.current().span;
                    let constraint = self.expect_identifier()?;
                    if !table.constraints.contains(&constraint) {
                        return Err(self.error_at(
                            ErrorKind::ObjectNotFound(format!("CONSTRAINT {constraint}")),
                            span,
                        ));
                    }
                    AlterTableAction::DropConstraint {
                        name: constraint,
                        behavior: self.parse_drop_behavior(),
                    }
                } else {
                    self.consume_keyword(Keyword::Column);
                    let span = self.current().span;
                    let column = self.parse_existing_column(&name, table)?;
                    if table.columns.len() == 1 {
                        return Err(self.error_at(
                            ErrorKind::InvalidDefinition(format!("cannot drop the only column of {name}")),
                            span,
                        ));
                    }
                    AlterTableAction::DropColumn {
                        name: column,
                        behavior: self.parse_drop_behavior(),
                    }
                }
            }
            Some(Keyword::Alter) => {
                self.advance();
                self.consume_keyword(Keyword::Column);
                self.parse_alter_column(&name, table)?
            }
            Some(Keyword::Rename) => {
                self.advance();
                self.expect_keyword(Keyword::To)?;
                let span = self.current().span;
                let new_name = self.parse_qualified_name()?;
                if new_name.schema != name.schema {
                    return Err(self.error_at(
                        ErrorKind::InvalidDefinition(format!("{new_name} is in another schema")),
                        span,
                    ));
                }
                self.check_new_object(ObjectKind::Table, &new_name, span)?;
                AlterTableAction::RenameTo(new_name)
            }
            _ => return Err(self.unexpected("ADD, DROP, ALTER or RENAME")),
        };

        debug!(table = %name, "alter table");
        Ok((StatementKind::AlterTable, StatementArgs::AlterTable { table: name, action }))
    }

    fn parse_existing_column(&mut self, table_name: &QualifiedName, table: &TableDef) -> Result<String> {
        let span = self.current().span;
        let column = self.expect_identifier()?;
        if table.find_column(&column).is_none() {
            return Err(self.error_at(
                ErrorKind::ColumnNotFound(format!("{}.{column}", table_name.name)),
                span,
            ));
        }
        Ok(column)
    }

    fn parse_add_constraint(
        &mut self,
        name: &QualifiedName,
        table: &TableDef,
        position: usize,
    ) -> Result<AlterTableAction> {
        let mut list = ConstraintList::for_table(table);
        self.parse_table_constraint(name, &mut list)?;
        let columns = catalog_columns(table);
        self.finish_constraints(name, &columns, &mut list, position)?;
        match list.into_definitions().pop() {
            Some(constraint) => Ok(AlterTableAction::AddConstraint(constraint)),
            None => Err(self.unexpected("constraint")),
        }
    }

    /// `ADD [COLUMN] definition [BEFORE column]`
    fn parse_add_column(
        &mut self,
        name: &QualifiedName,
        table: &TableDef,
        position: usize,
    ) -> Result<AlterTableAction> {
        let span = self.current().span;
        let mut list = ConstraintList::for_table(table);
        let mut column = self.parse_column_definition(name, &mut list)?;
        if table.find_column(&column.name).is_some() {
            return Err(self.error_at(ErrorKind::DuplicateName(column.name), span));
        }
        if matches!(column.generated, Some(ColumnGeneration::Identity { .. }))
            && table.columns.iter().any(|c| c.identity)
        {
            return Err(self.error_at(
                ErrorKind::InvalidDefinition(format!("{name} already has an identity column")),
                span,
            ));
        }
        if let Some(ColumnGeneration::Expression(expr)) = &column.generated {
            return Err(self.error_at(
                ErrorKind::Unsupported("adding a generated column".into()),
                expr.span,
            ));
        }
        let before = if self.consume_keyword(Keyword::Before) {
            Some(self.parse_existing_column(name, table)?)
        } else {
            None
        };

        let mut columns = catalog_columns(table);
        columns.extend(range_columns(std::slice::from_ref(&column)));
        self.finish_constraints(name, &columns, &mut list, position)?;
        if list.primary_key().is_some() {
            column.nullable = false;
        }

        Ok(AlterTableAction::AddColumn {
            column,
            constraints: list.into_definitions(),
            before,
        })
    }

    /// `ALTER [COLUMN] name {SET DEFAULT e | DROP DEFAULT | SET [NOT] NULL |
    /// SET DATA TYPE t | RESTART WITH n | RENAME TO new}`
    fn parse_alter_column(&mut self, name: &QualifiedName, table: &TableDef) -> Result<AlterTableAction> {
        let span = self.current().span;
        let column_name = self.parse_existing_column(name, table)?;
        let Some(column) = table.find_column(&column_name) else {
            return Err(self.error_at(ErrorKind::ColumnNotFound(column_name), span));
        };

        let change = match self.current().as_keyword() {
            Some(Keyword::Set) => {
                self.advance();
                match self.current().as_keyword() {
                    Some(Keyword::Default) => {
                        self.advance();
                        let mut default = self.parse_expression()?;
                        self.resolve_default(&mut default, &column.data_type)?;
                        ColumnChange::SetDefault(default)
                    }
                    Some(Keyword::Not) => {
                        self.advance();
                        self.expect_keyword(Keyword::Null)?;
                        ColumnChange::SetNullable(false)
                    }
                    Some(Keyword::Null) => {
                        self.advance();
                        if table.primary_key.contains(&column_name) || column.identity {
                            return Err(self.error_at(
                                ErrorKind::InvalidDefinition(format!("{column_name} cannot be nullable")),
                                span,
                            ));
                        }
                        ColumnChange::SetNullable(true)
                    }
                    Some(Keyword::Data) => {
                        self.advance();
                        self.expect_keyword(Keyword::Type)?;
                        let type_span = self.current().span;
                        let data_type = self.parse_data_type()?;
                        if !column.data_type.is_comparable_with(&data_type) {
                            return Err(self.error_at(
                                ErrorKind::WrongDataType(format!(
                                    "{} cannot become {}",
                                    column.data_type.to_sql(),
                                    data_type.to_sql()
                                )),
                                type_span,
                            ));
                        }
                        ColumnChange::SetDataType(data_type)
                    }
                    _ => return Err(self.unexpected("DEFAULT, NULL, NOT NULL or DATA TYPE")),
                }
            }
            Some(Keyword::Drop) => {
                self.advance();
                self.expect_keyword(Keyword::Default)?;
                ColumnChange::DropDefault
            }
            Some(Keyword::Restart) => {
                self.advance();
                self.expect_keyword(Keyword::With)?;
                let value = self.parse_integer()?;
                if !column.identity {
                    return Err(self.error_at(
                        ErrorKind::InvalidDefinition(format!("{column_name} is not an identity column")),
                        span,
                    ));
                }
                ColumnChange::RestartWith(value)
            }
            Some(Keyword::Rename) => {
                self.advance();
                self.expect_keyword(Keyword::To)?;
                let span = self.current().span;
                let new_name = self.expect_identifier()?;
                if table.find_column(&new_name).is_some() {
                    return Err(self.error_at(ErrorKind::DuplicateName(new_name), span));
                }
                ColumnChange::RenameTo(new_name)
            }
            _ => return Err(self.unexpected("SET, DROP, RESTART or RENAME")),
        };
        Ok(AlterTableAction::AlterColumn {
            name: column_name,
            change,
        })
    }

    /// `ALTER SEQUENCE name options`
    pub(super) fn parse_alter_sequence(&mut self) -> Result<(StatementKind, StatementArgs)> {
        self.expect_keyword(Keyword::Sequence)?;
        let span = self.current().span;
        let name = self.parse_existing(ObjectKind::Sequence)?;
        self.check_define(&name, span)?;
        let options_span = self.current().span;
        let mut options = self.parse_sequence_options(true)?;
        if options == SequenceOptions::default() {
            return Err(self.unexpected("sequence option"));
        }
        let span = options_span.merge(self.cursor.previous().span);
        options.data_type = self.catalog.sequence(&name).map(|s| s.data_type.clone());
        self.validate_sequence_options(&options, span)?;
        options.data_type = None;
        Ok((StatementKind::AlterSequence, StatementArgs::AlterSequence { name, options }))
    }

    /// `ALTER DOMAIN name {SET DEFAULT e | DROP DEFAULT | ADD constraint |
    /// DROP CONSTRAINT name}`
    pub(super) fn parse_alter_domain(&mut self) -> Result<(StatementKind, StatementArgs)> {
        self.expect_keyword(Keyword::Domain)?;
        let span = self.current().span;
        let name = self.parse_existing(ObjectKind::Domain)?;
        self.check_define(&name, span)?;
        let catalog = self.catalog;
        let Some(domain) = catalog.domain(&name) else {
            return Err(self.error_at(ErrorKind::ObjectNotFound(format!("DOMAIN {name}")), span));
        };

        let change = match self.current().as_keyword() {
            Some(Keyword::Set) => {
                self.advance();
                self.expect_keyword(Keyword::Default)?;
                let mut default = self.parse_expression()?;
                self.resolve_default(&mut default, &domain.data_type)?;
                DomainChange::SetDefault(default)
            }
            Some(Keyword::Drop) if self.peek_keyword(1, Keyword::Default) => {
                self.advance();
                self.advance();
                DomainChange::DropDefault
            }
            Some(Keyword::Drop) => {
                self.advance();
                self.expect_keyword(Keyword::Constraint)?;
                let span = self.current().span;
                let constraint = self.expect_identifier()?;
                if !domain.constraints.contains(&constraint) {
                    return Err(self.error_at(ErrorKind::ObjectNotFound(format!("CONSTRAINT {constraint}")), span));
                }
                DomainChange::DropConstraint(constraint)
            }
            Some(Keyword::Add) => {
                self.advance();
                let mut list = ConstraintList::new(&name.name);
                for taken in &domain.constraints {
                    list.reserve(taken);
                }
                self.ctx.set_domain(Some(domain.data_type.clone()));
                let parsed = self.parse_domain_check();
                self.ctx.set_domain(None);
                let (constraint_name, kind, span) = parsed?;
                list.add(constraint_name, kind, span).map_err(|kind| self.error_at(kind, span))?;
                match list.into_definitions().pop() {
                    Some(constraint) => DomainChange::AddConstraint(constraint),
                    None => return Err(self.unexpected("constraint")),
                }
            }
            _ => return Err(self.unexpected("SET, DROP or ADD")),
        };
        Ok((StatementKind::AlterDomain, StatementArgs::AlterDomain { name, change }))
    }

    /// `ALTER USER name SET PASSWORD 'secret'`
    pub(super) fn parse_alter_user(&mut self) -> Result<(StatementKind, StatementArgs)> {
        self.expect_keyword(Keyword::User)?;
        let span = self.current().span;
        let name = self.parse_existing(ObjectKind::User)?.name;
        self.require_admin(ObjectKind::User, span)?;
        self.expect_keyword(Keyword::Set)?;
        self.expect_keyword(Keyword::Password)?;
        let password = self.parse_string()?;
        Ok((StatementKind::AlterUser, StatementArgs::AlterUser { name, password }))
    }

    /// `ALTER INDEX name RENAME TO new`
    pub(super) fn parse_alter_index(&mut self) -> Result<(StatementKind, StatementArgs)> {
        self.expect_keyword(Keyword::Index)?;
        let position = self.position();
        let span = self.current().span;
        let name = self.parse_existing(ObjectKind::Index)?;
        self.check_define(&name, span)?;
        self.expect_keyword(Keyword::Rename)?;
        self.expect_keyword(Keyword::To)?;
        let new_span = self.current().span;
        let new_name = self.parse_qualified_name()?;
        self.check_new_object(ObjectKind::Index, &new_name, new_span)?;
        if let Some(index) = self.catalog.index(&name) {
            self.ctx
                .add_reference(ObjectKind::Table, index.table.clone(), Access::Write, position);
        }
        Ok((StatementKind::AlterIndex, StatementArgs::AlterIndex { name, new_name }))
    }
}

#[cfg(test)]
mod tests {
    use super::super::tests::compile;
    use super::*;
    use crate::ast::{ConstraintKind, DataType};

    fn action(sql: &str) -> AlterTableAction {
        match compile(sql).unwrap().args() {
            StatementArgs::AlterTable { action, .. } => action.clone(),
            other => panic!("not ALTER TABLE: {other:?}"),
        }
    }

    #[test]
    fn test_add_column() {
        let AlterTableAction::AddColumn { column, before, .. } =
            action("ALTER TABLE orders ADD COLUMN note VARCHAR(100) DEFAULT 'none' NOT NULL BEFORE total")
        else {
            panic!("not ADD COLUMN");
        };
        assert_eq!(column.name, "NOTE");
        assert!(!column.nullable);
        assert_eq!(before.as_deref(), Some("TOTAL"));
        assert!(matches!(
            compile("ALTER TABLE orders ADD id INT").unwrap_err().kind,
            ErrorKind::DuplicateName(_)
        ));
        assert!(matches!(
            compile("ALTER TABLE orders ADD extra INT IDENTITY").map(|_| ()),
            Ok(())
        ));
        assert!(matches!(
            compile("ALTER TABLE customer ADD extra INT IDENTITY").unwrap_err().kind,
            ErrorKind::InvalidDefinition(_)
        ));
    }

    #[test]
    fn test_add_constraints() {
        let AlterTableAction::AddConstraint(constraint) =
            action("ALTER TABLE orders ADD CONSTRAINT buyer FOREIGN KEY (customer_id) REFERENCES customer ON DELETE CASCADE")
        else {
            panic!("not ADD CONSTRAINT");
        };
        assert_eq!(constraint.name, "BUYER");
        let ConstraintKind::ForeignKey(key) = constraint.kind else {
            panic!("not a foreign key");
        };
        assert_eq!(key.referenced_columns, vec!["ID".to_string()]);

        let AlterTableAction::AddConstraint(check) = action("ALTER TABLE orders ADD CHECK (total >= 0)") else {
            panic!("not ADD CONSTRAINT");
        };
        assert!(check.generated_name);
        let ConstraintKind::Check(condition) = check.kind else {
            panic!("not a check");
        };
        assert_eq!(condition.data_type, Some(DataType::Boolean));

        assert_eq!(
            compile("ALTER TABLE customer ADD PRIMARY KEY (name)").unwrap_err().kind,
            ErrorKind::DuplicatePrimaryKey("CUSTOMER".into())
        );
        assert!(matches!(
            compile("ALTER TABLE customer ADD CONSTRAINT SYS_PK_CUSTOMER UNIQUE (name)").unwrap_err().kind,
            ErrorKind::DuplicateName(_)
        ));
    }

    #[test]
    fn test_drop_and_alter_columns() {
        assert!(matches!(
            action("ALTER TABLE orders DROP COLUMN total CASCADE"),
            AlterTableAction::DropColumn { .. }
        ));
        assert!(matches!(
            compile("ALTER TABLE orders DROP COLUMN missing").unwrap_err().kind,
            ErrorKind::ColumnNotFound(_)
        ));
        assert!(matches!(
            action("ALTER TABLE customer DROP CONSTRAINT SYS_PK_CUSTOMER"),
            AlterTableAction::DropConstraint { .. }
        ));
        assert!(matches!(
            compile("ALTER TABLE customer DROP CONSTRAINT nope").unwrap_err().kind,
            ErrorKind::ObjectNotFound(_)
        ));
        assert_eq!(
            action("ALTER TABLE customer ALTER COLUMN id RESTART WITH 100"),
            AlterTableAction::AlterColumn {
                name: "ID".into(),
                change: ColumnChange::RestartWith(100)
            }
        );
        assert!(matches!(
            compile("ALTER TABLE orders ALTER COLUMN total RESTART WITH 1").unwrap_err().kind,
            ErrorKind::InvalidDefinition(_)
        ));
        assert!(matches!(
            compile("ALTER TABLE customer ALTER name RENAME TO city").unwrap_err().kind,
            ErrorKind::DuplicateName(_)
        ));
        assert!(matches!(
            compile("ALTER TABLE orders ALTER total SET DEFAULT 'abc'").unwrap_err().kind,
            ErrorKind::WrongDataType(_)
        ));
        assert!(matches!(
            compile("ALTER TABLE orders RENAME TO customer").unwrap_err().kind,
            ErrorKind::ObjectExists(_)
        ));
        assert!(matches!(
            compile("ALTER TABLE big_spenders DROP COLUMN id").unwrap_err().kind,
            ErrorKind::ObjectNotFound(_)
        ));
    }

    #[test]
    fn test_alter_other_objects() {
        let statement = compile("ALTER SEQUENCE seq RESTART WITH 5 INCREMENT BY 2").unwrap();
        let StatementArgs::AlterSequence { options, .. } = statement.args() else {
            panic!("not ALTER SEQUENCE");
        };
        assert_eq!(options.restart, Some(Some(5)));
        assert!(matches!(
            compile("ALTER SEQUENCE seq INCREMENT BY 0").unwrap_err().kind,
            ErrorKind::InvalidDefinition(_)
        ));
        assert!(matches!(
            compile("ALTER SEQUENCE nothing RESTART").unwrap_err().kind,
            ErrorKind::ObjectNotFound(_)
        ));
        assert!(compile("ALTER USER alice SET PASSWORD 'secret'").is_ok());
        assert!(matches!(
            compile("ALTER INDEX nothing RENAME TO other").unwrap_err().kind,
            ErrorKind::ObjectNotFound(_)
        ));
    }
}
