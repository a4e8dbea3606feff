//! Sequences, domains, schemas, users, roles, types and character sets.

use tracing::debug;

use super::super::resolve::Clause;
use super::super::Parser;
use super::table::ConstraintList;
use crate::ast::{
    ConstraintKind, DataType, DomainDefinition, ObjectKind, QualifiedName, SequenceBound,
    SequenceDefinition, SequenceOptions, StatementArgs, StatementKind, TypeDefinition,
};
use crate::error::{ErrorKind, Result};
use crate::lexer::{Keyword, Span};

impl<'a> Parser<'a> {
    /// `CREATE SEQUENCE name [AS type] [options]`
    pub(super) fn parse_create_sequence(&mut self) -> Result<(StatementKind, StatementArgs)> {
        self.expect_keyword(Keyword::Sequence)?;
        let span = self.current().span;
        let name = self.parse_qualified_name()?;
        self.check_define(&name, span)?;
        self.check_new_object(ObjectKind::Sequence, &name, span)?;
        let options_span = self.current().span;
        let options = self.parse_sequence_options(false)?;
        self.validate_sequence_options(&options, options_span.merge(self.cursor.previous().span))?;
        debug!(%name, "create sequence");
        Ok((
            StatementKind::CreateSequence,
            StatementArgs::CreateSequence(SequenceDefinition { name, options }),
        ))
    }

    /// Sequence generator options in any order, each at most once.
    /// `RESTART` is only accepted when altering.
    pub(super) fn parse_sequence_options(&mut self, alter: bool) -> Result<SequenceOptions> {
        let mut options = SequenceOptions::default();
        loop {
            let span = self.current().span;
            match self.current().as_keyword() {
                Some(Keyword::As) if !alter => {
                    self.advance();
                    let data_type = self.parse_data_type()?;
                    self.set_option(&mut options.data_type, data_type, "AS", span)?;
                }
                Some(Keyword::Start) => {
                    self.advance();
                    self.expect_keyword(Keyword::With)?;
                    let value = self.parse_integer()?;
                    self.set_option(&mut options.start, value, "START WITH", span)?;
                }
                Some(Keyword::Restart) if alter => {
                    self.advance();
                    let value = if self.consume_keyword(Keyword::With) {
                        Some(self.parse_integer()?)
                    } else {
                        None
                    };
                    self.set_option(&mut options.restart, value, "RESTART", span)?;
                }
                Some(Keyword::Increment) => {
                    self.advance();
                    self.expect_keyword(Keyword::By)?;
                    let value = self.parse_integer()?;
                    self.set_option(&mut options.increment, value, "INCREMENT BY", span)?;
                }
                Some(Keyword::Minvalue) => {
                    self.advance();
                    let value = SequenceBound::Value(self.parse_integer()?);
                    self.set_option(&mut options.min_value, value, "MINVALUE", span)?;
                }
                Some(Keyword::Maxvalue) => {
                    self.advance();
                    let value = SequenceBound::Value(self.parse_integer()?);
                    self.set_option(&mut options.max_value, value, "MAXVALUE", span)?;
                }
                Some(Keyword::Cycle) => {
                    self.advance();
                    self.set_option(&mut options.cycle, true, "CYCLE", span)?;
                }
                Some(Keyword::No) => {
                    self.advance();
                    match self.current().as_keyword() {
                        Some(Keyword::Minvalue) => {
                            self.advance();
                            self.set_option(&mut options.min_value, SequenceBound::Unbounded, "MINVALUE", span)?;
                        }
                        Some(Keyword::Maxvalue) => {
                            self.advance();
                            self.set_option(&mut options.max_value, SequenceBound::Unbounded, "MAXVALUE", span)?;
                        }
                        Some(Keyword::Cycle) => {
                            self.advance();
                            self.set_option(&mut options.cycle, false, "CYCLE", span)?;
                        }
                        _ => return Err(self.unexpected("MINVALUE, MAXVALUE or CYCLE")),
                    }
                }
                _ => break,
            }
        }
        Ok(options)
    }

    fn set_option<T>(&self, slot: &mut Option<T>, value: T, option: &str, span: Span) -> Result<()> {
        if slot.is_some() {
            return Err(self.error_at(
                ErrorKind::InvalidDefinition(format!("duplicate option {option}")),
                span,
            ));
        }
        *slot = Some(value);
        Ok(())
    }

    /// A non-zero increment and `MINVALUE <= START <= MAXVALUE` within the
    /// range of the sequence's type.
    pub(super) fn validate_sequence_options(&self, options: &SequenceOptions, span: Span) -> Result<()> {
        let data_type = options.data_type.clone().unwrap_or(DataType::Integer);
        let Some((type_min, type_max)) = integral_range(&data_type) else {
            return Err(self.error_at(
                ErrorKind::WrongDataType(format!("sequence of type {}", data_type.to_sql())),
                span,
            ));
        };
        let invalid = |message: String| self.error_at(ErrorKind::InvalidDefinition(message), span);

        let increment = options.increment.unwrap_or(1);
        if increment == 0 {
            return Err(invalid("INCREMENT BY 0".into()));
        }
        let min = match options.min_value {
            Some(SequenceBound::Value(v)) => v,
            _ => type_min,
        };
        let max = match options.max_value {
            Some(SequenceBound::Value(v)) => v,
            _ => type_max,
        };
        if min < type_min || max > type_max {
            return Err(invalid(format!("bounds outside the range of {}", data_type.to_sql())));
        }
        if min > max {
            return Err(invalid(format!("MINVALUE {min} exceeds MAXVALUE {max}")));
        }
        for value in [options.start, options.restart.flatten()].into_iter().flatten() {
            if value < min || value > max {
                return Err(invalid(format!("start value {value} outside {min}..{max}")));
            }
        }
        Ok(())
    }

    /// `CREATE DOMAIN name [AS] type [DEFAULT expr] [[CONSTRAINT name] CHECK (condition)]...`
    pub(super) fn parse_create_domain(&mut self) -> Result<(StatementKind, StatementArgs)> {
        self.expect_keyword(Keyword::Domain)?;
        let span = self.current().span;
        let name = self.parse_qualified_name()?;
        self.check_define(&name, span)?;
        self.check_new_object(ObjectKind::Domain, &name, span)?;
        self.consume_keyword(Keyword::As);
        let Some(data_type) = self.parse_predefined_type()? else {
            return Err(self.unexpected("predefined type"));
        };

        let default = if self.consume_keyword(Keyword::Default) {
            let mut default = self.parse_expression()?;
            self.resolve_default(&mut default, &data_type)?;
            Some(default)
        } else {
            None
        };

        let mut list = ConstraintList::new(&name.name);
        self.ctx.set_domain(Some(data_type.clone()));
        let result = self.parse_domain_constraints(&mut list);
        self.ctx.set_domain(None);
        result?;

        debug!(%name, "create domain");
        Ok((
            StatementKind::CreateDomain,
            StatementArgs::CreateDomain(DomainDefinition {
                name,
                data_type,
                default,
                constraints: list.into_definitions(),
            }),
        ))
    }

    fn parse_domain_constraints(&mut self, list: &mut ConstraintList) -> Result<()> {
        while self.check_keyword(Keyword::Constraint) || self.check_keyword(Keyword::Check) {
            let (name, kind, span) = self.parse_domain_check()?;
            list.add(name, kind, span).map_err(|kind| self.error_at(kind, span))?;
        }
        Ok(())
    }

    /// `[CONSTRAINT name] CHECK (condition)` over `VALUE`; the domain type
    /// must be set in the context.
    pub(super) fn parse_domain_check(&mut self) -> Result<(Option<String>, ConstraintKind, Span)> {
        let start = self.current().span;
        let name = if self.consume_keyword(Keyword::Constraint) {
            Some(self.expect_identifier()?)
        } else {
            None
        };
        let mut condition = self.parse_check_condition()?;
        self.resolve_definition_expr(&mut condition, Vec::new(), Clause::Check)?;
        Ok((name, ConstraintKind::Check(condition), start.merge(self.cursor.previous().span)))
    }

    /// `CREATE SCHEMA name [AUTHORIZATION owner]`
    pub(super) fn parse_create_schema(&mut self) -> Result<(StatementKind, StatementArgs)> {
        self.expect_keyword(Keyword::Schema)?;
        let span = self.current().span;
        let name = self.expect_identifier()?;
        self.require_admin(ObjectKind::Schema, span)?;
        self.check_new_object(ObjectKind::Schema, &QualifiedName::bare(name.clone()), span)?;
        let authorization = if self.consume_keyword(Keyword::Authorization) {
            let span = self.current().span;
            let owner = self.expect_identifier()?;
            if !self.catalog.user_exists(&owner) && !self.catalog.role_exists(&owner) {
                return Err(self.error_at(ErrorKind::ObjectNotFound(format!("USER {owner}")), span));
            }
            Some(owner)
        } else {
            None
        };
        Ok((
            StatementKind::CreateSchema,
            StatementArgs::CreateSchema { name, authorization },
        ))
    }

    /// `CREATE USER name PASSWORD 'secret' [ADMIN]`
    pub(super) fn parse_create_user(&mut self) -> Result<(StatementKind, StatementArgs)> {
        self.expect_keyword(Keyword::User)?;
        let span = self.current().span;
        let name = self.expect_identifier()?;
        self.require_admin(ObjectKind::User, span)?;
        self.check_new_object(ObjectKind::User, &QualifiedName::bare(name.clone()), span)?;
        self.expect_keyword(Keyword::Password)?;
        let password = self.parse_string()?;
        let admin = self.consume_keyword(Keyword::Admin);
        Ok((
            StatementKind::CreateUser,
            StatementArgs::CreateUser { name, password, admin },
        ))
    }

    /// `CREATE ROLE name`
    pub(super) fn parse_create_role(&mut self) -> Result<(StatementKind, StatementArgs)> {
        self.expect_keyword(Keyword::Role)?;
        let span = self.current().span;
        let name = self.expect_identifier()?;
        self.require_admin(ObjectKind::Role, span)?;
        let qualified = QualifiedName::bare(name.clone());
        self.check_new_object(ObjectKind::Role, &qualified, span)?;
        // Roles and users share one namespace.
        self.check_new_object(ObjectKind::User, &qualified, span)?;
        Ok((StatementKind::CreateRole, StatementArgs::CreateRole(name)))
    }

    /// `CREATE TYPE name AS predefined-type`
    pub(super) fn parse_create_type(&mut self) -> Result<(StatementKind, StatementArgs)> {
        self.expect_keyword(Keyword::Type)?;
        let span = self.current().span;
        let name = self.parse_qualified_name()?;
        self.check_define(&name, span)?;
        self.check_new_object(ObjectKind::Type, &name, span)?;
        self.expect_keyword(Keyword::As)?;
        let Some(data_type) = self.parse_predefined_type()? else {
            return Err(self.unexpected("predefined type"));
        };
        Ok((
            StatementKind::CreateType,
            StatementArgs::CreateType(TypeDefinition { name, data_type }),
        ))
    }

    /// `CREATE CHARACTER SET name [AS] GET source [COLLATE FROM collation]`
    pub(super) fn parse_create_character_set(&mut self) -> Result<(StatementKind, StatementArgs)> {
        self.expect_keyword(Keyword::Character)?;
        self.expect_keyword(Keyword::Set)?;
        let span = self.current().span;
        let name = self.parse_qualified_name()?;
        self.check_define(&name, span)?;
        self.check_new_object(ObjectKind::CharacterSet, &name, span)?;
        self.consume_keyword(Keyword::As);
        self.expect_keyword(Keyword::Get)?;
        let source = self.parse_existing(ObjectKind::CharacterSet)?;
        let collation = if self.consume_keyword(Keyword::Collate) {
            self.expect_keyword(Keyword::From)?;
            Some(self.parse_existing(ObjectKind::Collation)?)
        } else {
            None
        };
        Ok((
            StatementKind::CreateCharacterSet,
            StatementArgs::CreateCharacterSet {
                name,
                source,
                collation,
            },
        ))
    }

    /// A name that must denote an existing object of `kind`; the statement
    /// records its use.
    pub(super) fn parse_existing(&mut self, kind: ObjectKind) -> Result<QualifiedName> {
        let position = self.position();
        let span = self.current().span;
        let name = self.parse_object_name(kind)?;
        if !self.catalog.object_exists(kind, &name) {
            return Err(self.error_at(ErrorKind::ObjectNotFound(format!("{kind} {name}")), span));
        }
        self.use_object(kind, &name, position, span)?;
        Ok(name)
    }
}

/// Values a sequence of `data_type` can produce.
fn integral_range(data_type: &DataType) -> Option<(i64, i64)> {
    match data_type {
        DataType::Tinyint => Some((i64::from(i8::MIN), i64::from(i8::MAX))),
        DataType::Smallint => Some((i64::from(i16::MIN), i64::from(i16::MAX))),
        DataType::Integer => Some((i64::from(i32::MIN), i64::from(i32::MAX))),
        DataType::Bigint => Some((i64::MIN, i64::MAX)),
        DataType::Decimal { scale: None | Some(0), .. } | DataType::Numeric { scale: None | Some(0), .. } => {
            Some((i64::MIN, i64::MAX))
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::super::tests::{compile, compile_with};
    use super::*;
    use crate::ast::ConstraintDefinition;
    use crate::catalog::Authorizer;

    #[test]
    fn test_create_sequence() {
        let statement = compile("CREATE SEQUENCE s AS BIGINT START WITH 10 INCREMENT BY -2 MINVALUE 0 NO CYCLE").unwrap();
        let StatementArgs::CreateSequence(sequence) = statement.args() else {
            panic!("not a sequence");
        };
        assert_eq!(sequence.name, QualifiedName::new("PUBLIC", "S"));
        assert_eq!(sequence.options.data_type, Some(DataType::Bigint));
        assert_eq!(sequence.options.start, Some(10));
        assert_eq!(sequence.options.increment, Some(-2));
        assert_eq!(sequence.options.min_value, Some(SequenceBound::Value(0)));
        assert_eq!(sequence.options.cycle, Some(false));
    }

    #[test]
    fn test_invalid_sequences() {
        for sql in [
            "CREATE SEQUENCE s INCREMENT BY 0",
            "CREATE SEQUENCE s START WITH 5 MINVALUE 10",
            "CREATE SEQUENCE s MINVALUE 10 MAXVALUE 1",
            "CREATE SEQUENCE s START WITH 1 START WITH 2",
            "CREATE SEQUENCE s AS SMALLINT MAXVALUE 100000",
        ] {
            assert!(
                matches!(compile(sql).unwrap_err().kind, ErrorKind::InvalidDefinition(_)),
                "{sql}"
            );
        }
        assert!(matches!(
            compile("CREATE SEQUENCE s AS VARCHAR(10)").unwrap_err().kind,
            ErrorKind::WrongDataType(_)
        ));
        assert!(matches!(
            compile("CREATE SEQUENCE seq").unwrap_err().kind,
            ErrorKind::ObjectExists(_)
        ));
    }

    #[test]
    fn test_create_domain_with_value_check() {
        let statement =
            compile("CREATE DOMAIN money AS DECIMAL(10,2) DEFAULT 0 CHECK (VALUE >= 0) CONSTRAINT cap CHECK (VALUE < 1000000)")
                .unwrap();
        let StatementArgs::CreateDomain(domain) = statement.args() else {
            panic!("not a domain");
        };
        assert_eq!(domain.constraints.len(), 2);
        let ConstraintDefinition {
            name,
            kind: ConstraintKind::Check(condition),
            generated_name,
        } = &domain.constraints[0]
        else {
            panic!("not a check");
        };
        assert!(*generated_name);
        assert!(name.starts_with("SYS_CT_"));
        assert_eq!(condition.data_type, Some(DataType::Boolean));
        assert_eq!(domain.constraints[1].name, "CAP");
        assert!(domain.default.is_some());
    }

    #[test]
    fn test_value_outside_domain_is_a_column() {
        let err = compile("SELECT VALUE FROM customer").unwrap_err();
        assert!(matches!(err.kind, ErrorKind::ColumnNotFound(_)));
        assert!(matches!(
            compile("CREATE DOMAIN d AS INT CHECK (price > 0)").unwrap_err().kind,
            ErrorKind::ColumnNotFound(_)
        ));
    }

    #[test]
    fn test_create_principals() {
        assert!(compile("CREATE USER bob PASSWORD 'pw' ADMIN").is_ok());
        assert!(matches!(
            compile("CREATE USER alice PASSWORD 'pw'").unwrap_err().kind,
            ErrorKind::ObjectExists(_)
        ));
        assert!(compile("CREATE ROLE auditor").is_ok());
        assert!(matches!(
            compile("CREATE ROLE alice").unwrap_err().kind,
            ErrorKind::ObjectExists(_)
        ));
        let statement = compile("CREATE SCHEMA sales AUTHORIZATION alice").unwrap();
        assert_eq!(
            statement.args(),
            &StatementArgs::CreateSchema {
                name: "SALES".into(),
                authorization: Some("ALICE".into())
            }
        );
        assert!(matches!(
            compile("CREATE SCHEMA sales AUTHORIZATION nobody").unwrap_err().kind,
            ErrorKind::ObjectNotFound(_)
        ));
    }

    struct NotAdmin;

    impl Authorizer for NotAdmin {
        fn is_admin(&self) -> bool {
            false
        }
    }

    #[test]
    fn test_principals_need_admin() {
        assert!(matches!(
            compile_with("CREATE ROLE auditor", &NotAdmin).unwrap_err().kind,
            ErrorKind::AccessDenied(_)
        ));
    }

    #[test]
    fn test_create_type_and_character_set() {
        let statement = compile("CREATE TYPE amount AS DECIMAL(12,2)").unwrap();
        assert!(matches!(statement.args(), StatementArgs::CreateType(_)));
        assert!(matches!(
            compile("CREATE CHARACTER SET latin GET missing").unwrap_err().kind,
            ErrorKind::ObjectNotFound(_)
        ));
    }
}
