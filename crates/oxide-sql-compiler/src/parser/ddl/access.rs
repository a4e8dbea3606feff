//! GRANT and REVOKE of object privileges and roles.

use tracing::debug;

use super::super::Parser;
use crate::ast::{
    Access, DropBehavior, GrantDefinition, Grantee, ObjectKind, Privilege, QualifiedName,
    RoleGrantDefinition, StatementArgs, StatementKind,
};
use crate::error::{ErrorKind, Result};
use crate::lexer::{Keyword, Span, TokenKind};

impl Privilege {
    const fn as_str(&self) -> &'static str {
        match self {
            Self::All => "ALL",
            Self::Select(_) => "SELECT",
            Self::Insert(_) => "INSERT",
            Self::Update(_) => "UPDATE",
            Self::References(_) => "REFERENCES",
            Self::Delete => "DELETE",
            Self::Trigger => "TRIGGER",
            Self::Usage => "USAGE",
            Self::Execute => "EXECUTE",
        }
    }

    /// Whether the privilege exists for objects of `kind`.
    const fn applies_to(&self, kind: ObjectKind) -> bool {
        match self {
            Self::All => true,
            Self::Select(_)
            | Self::Insert(_)
            | Self::Update(_)
            | Self::References(_)
            | Self::Delete
            | Self::Trigger => matches!(kind, ObjectKind::Table | ObjectKind::View),
            Self::Usage => matches!(
                kind,
                ObjectKind::Sequence
                    | ObjectKind::Domain
                    | ObjectKind::Type
                    | ObjectKind::CharacterSet
                    | ObjectKind::Collation
            ),
            Self::Execute => matches!(kind, ObjectKind::Routine),
        }
    }

    fn columns(&self) -> &[String] {
        match self {
            Self::Select(columns) | Self::Insert(columns) | Self::Update(columns) | Self::References(columns) => {
                columns
            }
            _ => &[],
        }
    }
}

impl<'a> Parser<'a> {
    /// `GRANT privileges ON object TO grantees ...` or `GRANT roles TO grantees ...`
    pub(crate) fn parse_grant(&mut self) -> Result<(StatementKind, StatementArgs)> {
        self.expect_keyword(Keyword::Grant)?;
        if self.privileges_follow(0) {
            let grant = self.parse_object_grant(false)?;
            Ok((StatementKind::Grant, StatementArgs::Grant(grant)))
        } else {
            let grant = self.parse_role_grant(false)?;
            Ok((StatementKind::GrantRole, StatementArgs::GrantRole(grant)))
        }
    }

    /// `REVOKE [GRANT OPTION FOR] privileges ON object FROM grantees ...` or
    /// `REVOKE [ADMIN OPTION FOR] roles FROM grantees ...`
    pub(crate) fn parse_revoke(&mut self) -> Result<(StatementKind, StatementArgs)> {
        self.expect_keyword(Keyword::Revoke)?;
        let skip = if self.peek_keyword(1, Keyword::Option) && self.peek_keyword(2, Keyword::For) {
            3
        } else {
            0
        };
        if self.privileges_follow(skip) {
            let grant = self.parse_object_grant(true)?;
            Ok((StatementKind::Revoke, StatementArgs::Revoke(grant)))
        } else {
            let grant = self.parse_role_grant(true)?;
            Ok((StatementKind::RevokeRole, StatementArgs::RevokeRole(grant)))
        }
    }

    /// Whether the token `n` ahead starts a privilege list rather than a
    /// list of role names.
    fn privileges_follow(&self, n: usize) -> bool {
        matches!(
            self.cursor.peek(n).as_keyword(),
            Some(
                Keyword::All
                    | Keyword::Select
                    | Keyword::Insert
                    | Keyword::Update
                    | Keyword::References
                    | Keyword::Delete
                    | Keyword::Trigger
                    | Keyword::Usage
                    | Keyword::Execute
            )
        )
    }

    fn parse_object_grant(&mut self, revoke: bool) -> Result<GrantDefinition> {
        let mut grant_option = revoke && self.parse_option_for(Keyword::Grant)?;
        let privileges = self.parse_privileges()?;
        self.expect_keyword(Keyword::On)?;
        let (object_kind, object) = self.parse_grant_object(&privileges)?;
        let grantees = self.parse_grantees(revoke)?;
        if !revoke {
            grant_option = self.parse_with_option(Keyword::Grant)?;
        }
        let granted_by = self.parse_granted_by()?;
        let behavior = if revoke {
            self.parse_drop_behavior()
        } else {
            DropBehavior::default()
        };
        debug!(%object, privileges = privileges.len(), revoke, "object privileges");
        Ok(GrantDefinition {
            privileges,
            object_kind,
            object,
            grantees,
            grant_option,
            granted_by,
            behavior,
        })
    }

    fn parse_role_grant(&mut self, revoke: bool) -> Result<RoleGrantDefinition> {
        let span = self.current().span;
        self.require_admin(ObjectKind::Role, span)?;
        let mut admin_option = revoke && self.parse_option_for(Keyword::Admin)?;
        let mut roles: Vec<String> = Vec::new();
        loop {
            let span = self.current().span;
            let role = self.expect_identifier()?;
            if !self.catalog.role_exists(&role) {
                return Err(self.error_at(ErrorKind::ObjectNotFound(format!("ROLE {role}")), span));
            }
            if roles.contains(&role) {
                return Err(self.error_at(ErrorKind::DuplicateName(role), span));
            }
            roles.push(role);
            if !self.consume(&TokenKind::Comma) {
                break;
            }
        }
        let grantees_span = self.current().span;
        let grantees = self.parse_grantees(revoke)?;
        if let Some(Grantee::Named(name)) = grantees
            .iter()
            .find(|g| matches!(g, Grantee::Named(n) if roles.contains(n)))
        {
            return Err(self.error_at(
                ErrorKind::InvalidDefinition(format!("role {name} granted to itself")),
                grantees_span,
            ));
        }
        if !revoke {
            admin_option = self.parse_with_option(Keyword::Admin)?;
        }
        let granted_by = self.parse_granted_by()?;
        let behavior = if revoke {
            self.parse_drop_behavior()
        } else {
            DropBehavior::default()
        };
        Ok(RoleGrantDefinition {
            roles,
            grantees,
            admin_option,
            granted_by,
            behavior,
        })
    }

    /// `GRANT OPTION FOR` / `ADMIN OPTION FOR` at the start of a REVOKE.
    fn parse_option_for(&mut self, keyword: Keyword) -> Result<bool> {
        if self.check_keyword(keyword) && self.peek_keyword(1, Keyword::Option) {
            self.advance();
            self.advance();
            self.expect_keyword(Keyword::For)?;
            return Ok(true);
        }
        Ok(false)
    }

    /// `WITH GRANT OPTION` / `WITH ADMIN OPTION` at the end of a GRANT.
    fn parse_with_option(&mut self, keyword: Keyword) -> Result<bool> {
        if !self.consume_keyword(Keyword::With) {
            return Ok(false);
        }
        self.expect_keyword(keyword)?;
        self.expect_keyword(Keyword::Option)?;
        Ok(true)
    }

    /// `ALL [PRIVILEGES]` or a list of privileges, some with column lists.
    fn parse_privileges(&mut self) -> Result<Vec<Privilege>> {
        if self.consume_keyword(Keyword::All) {
            self.consume_keyword(Keyword::Privileges);
            return Ok(vec![Privilege::All]);
        }
        let mut privileges: Vec<Privilege> = Vec::new();
        loop {
            let span = self.current().span;
            let keyword = self.current().as_keyword();
            let with_columns = matches!(
                keyword,
                Some(Keyword::Select | Keyword::Insert | Keyword::Update | Keyword::References)
            );
            let privilege = match keyword {
                Some(Keyword::Delete) => Privilege::Delete,
                Some(Keyword::Trigger) => Privilege::Trigger,
                Some(Keyword::Usage) => Privilege::Usage,
                Some(Keyword::Execute) => Privilege::Execute,
                Some(Keyword::Select) => Privilege::Select(Vec::new()),
                Some(Keyword::Insert) => Privilege::Insert(Vec::new()),
                Some(Keyword::Update) => Privilege::Update(Vec::new()),
                Some(Keyword::References) => Privilege::References(Vec::new()),
                _ => return Err(self.unexpected("privilege")),
            };
            self.advance();
            let privilege = if with_columns && self.check(&TokenKind::LeftParen) {
                let columns = self.parse_paren_identifier_list()?;
                match privilege {
                    Privilege::Select(_) => Privilege::Select(columns),
                    Privilege::Insert(_) => Privilege::Insert(columns),
                    Privilege::Update(_) => Privilege::Update(columns),
                    _ => Privilege::References(columns),
                }
            } else {
                privilege
            };
            if privileges.iter().any(|p| p.as_str() == privilege.as_str()) {
                return Err(self.error_at(ErrorKind::DuplicateName(privilege.as_str().to_string()), span));
            }
            privileges.push(privilege);
            if !self.consume(&TokenKind::Comma) {
                break;
            }
        }
        Ok(privileges)
    }

    /// `[TABLE | SEQUENCE | DOMAIN | TYPE | CHARACTER SET | COLLATION |
    /// ROUTINE | FUNCTION | PROCEDURE] name`, checked against the privileges.
    fn parse_grant_object(&mut self, privileges: &[Privilege]) -> Result<(ObjectKind, QualifiedName)> {
        let kind = match self.current().as_keyword() {
            Some(Keyword::Table) => Some(ObjectKind::Table),
            Some(Keyword::Sequence) => Some(ObjectKind::Sequence),
            Some(Keyword::Domain) => Some(ObjectKind::Domain),
            Some(Keyword::Type) => Some(ObjectKind::Type),
            Some(Keyword::Collation) => Some(ObjectKind::Collation),
            Some(Keyword::Routine | Keyword::Function | Keyword::Procedure) => Some(ObjectKind::Routine),
            Some(Keyword::Character) => {
                self.advance();
                Some(ObjectKind::CharacterSet)
            }
            _ => None,
        };
        if kind == Some(ObjectKind::CharacterSet) {
            self.expect_keyword(Keyword::Set)?;
        } else if kind.is_some() {
            self.advance();
        }
        let position = self.position();
        let span = self.current().span;
        let name = self.parse_qualified_name()?;

        let kind = match kind.unwrap_or(ObjectKind::Table) {
            ObjectKind::Table => match self.catalog.table(&name) {
                Some(table) => {
                    for privilege in privileges {
                        if let Some(missing) = privilege.columns().iter().find(|c| table.find_column(c).is_none()) {
                            return Err(self.error_at(
                                ErrorKind::ColumnNotFound(format!("{}.{missing}", name.name)),
                                span,
                            ));
                        }
                    }
                    if table.view {
                        ObjectKind::View
                    } else {
                        ObjectKind::Table
                    }
                }
                None => return Err(self.error_at(ErrorKind::ObjectNotFound(format!("TABLE {name}")), span)),
            },
            kind => {
                if !self.catalog.object_exists(kind, &name) {
                    return Err(self.error_at(ErrorKind::ObjectNotFound(format!("{kind} {name}")), span));
                }
                kind
            }
        };
        self.check_privileges(privileges, kind, span)?;
        self.check_define(&name, span)?;
        self.ctx.add_reference(kind, name.clone(), Access::Use, position);
        Ok((kind, name))
    }

    fn check_privileges(&self, privileges: &[Privilege], kind: ObjectKind, span: Span) -> Result<()> {
        match privileges.iter().find(|p| !p.applies_to(kind)) {
            Some(privilege) => Err(self.error_at(
                ErrorKind::InvalidDefinition(format!("{} privilege on {kind}", privilege.as_str())),
                span,
            )),
            None => Ok(()),
        }
    }

    /// `{TO | FROM} {PUBLIC | name}, ...`; names must be users or roles.
    fn parse_grantees(&mut self, revoke: bool) -> Result<Vec<Grantee>> {
        self.expect_keyword(if revoke { Keyword::From } else { Keyword::To })?;
        let mut grantees: Vec<Grantee> = Vec::new();
        loop {
            let span = self.current().span;
            let grantee = if self.consume_keyword(Keyword::Public) {
                Grantee::Public
            } else {
                let name = self.expect_identifier()?;
                if !self.catalog.user_exists(&name) && !self.catalog.role_exists(&name) {
                    return Err(self.error_at(ErrorKind::ObjectNotFound(format!("grantee {name}")), span));
                }
                Grantee::Named(name)
            };
            if grantees.contains(&grantee) {
                return Err(self.error_at(ErrorKind::DuplicateName(format!("{grantee:?}")), span));
            }
            grantees.push(grantee);
            if !self.consume(&TokenKind::Comma) {
                break;
            }
        }
        Ok(grantees)
    }

    /// `GRANTED BY {CURRENT_USER | name}`
    fn parse_granted_by(&mut self) -> Result<Option<String>> {
        if !self.consume_keyword(Keyword::Granted) {
            return Ok(None);
        }
        self.expect_keyword(Keyword::By)?;
        if self.consume_keyword(Keyword::CurrentUser) {
            return Ok(Some(Keyword::CurrentUser.as_str().to_string()));
        }
        let span = self.current().span;
        let name = self.expect_identifier()?;
        if !self.catalog.user_exists(&name) && !self.catalog.role_exists(&name) {
            return Err(self.error_at(ErrorKind::ObjectNotFound(format!("grantor {name}")), span));
        }
        Ok(Some(name))
    }
}

#[cfg(test)]
mod tests {
    use super::super::tests::compile;
    use super::*;

    #[test]
    fn test_grant_table_privileges() {
        let statement =
            compile("GRANT SELECT, UPDATE (name, city) ON customer TO alice, PUBLIC WITH GRANT OPTION").unwrap();
        assert_eq!(statement.kind(), StatementKind::Grant);
        let StatementArgs::Grant(grant) = statement.args() else {
            panic!("not a grant");
        };
        assert_eq!(
            grant.privileges,
            vec![
                Privilege::Select(Vec::new()),
                Privilege::Update(vec!["NAME".into(), "CITY".into()])
            ]
        );
        assert_eq!(grant.object_kind, ObjectKind::Table);
        assert_eq!(grant.grantees, vec![Grantee::Named("ALICE".into()), Grantee::Public]);
        assert!(grant.grant_option);
        assert!(statement.read_tables().is_empty());
        assert!(statement.write_tables().is_empty());
    }

    #[test]
    fn test_grant_errors() {
        assert!(matches!(
            compile("GRANT SELECT (missing) ON customer TO alice").unwrap_err().kind,
            ErrorKind::ColumnNotFound(_)
        ));
        assert!(matches!(
            compile("GRANT USAGE ON customer TO alice").unwrap_err().kind,
            ErrorKind::InvalidDefinition(_)
        ));
        assert!(matches!(
            compile("GRANT SELECT ON SEQUENCE seq TO alice").unwrap_err().kind,
            ErrorKind::InvalidDefinition(_)
        ));
        assert!(matches!(
            compile("GRANT SELECT ON nothing TO alice").unwrap_err().kind,
            ErrorKind::ObjectNotFound(_)
        ));
        assert!(matches!(
            compile("GRANT SELECT ON customer TO nobody").unwrap_err().kind,
            ErrorKind::ObjectNotFound(_)
        ));
    }

    #[test]
    fn test_grant_and_revoke_roles() {
        let statement = compile("GRANT clerk TO alice WITH ADMIN OPTION").unwrap();
        let StatementArgs::GrantRole(grant) = statement.args() else {
            panic!("not a role grant");
        };
        assert_eq!(grant.roles, vec!["CLERK".to_string()]);
        assert!(grant.admin_option);

        let statement = compile("REVOKE ADMIN OPTION FOR clerk FROM alice CASCADE").unwrap();
        let StatementArgs::RevokeRole(revoke) = statement.args() else {
            panic!("not a role revoke");
        };
        assert!(revoke.admin_option);
        assert_eq!(revoke.behavior, DropBehavior::Cascade);

        assert!(matches!(
            compile("GRANT nosuchrole TO alice").unwrap_err().kind,
            ErrorKind::ObjectNotFound(_)
        ));
    }

    #[test]
    fn test_revoke_privileges() {
        let statement =
            compile("REVOKE GRANT OPTION FOR ALL PRIVILEGES ON SEQUENCE seq FROM PUBLIC GRANTED BY CURRENT_USER RESTRICT")
                .unwrap();
        let StatementArgs::Revoke(revoke) = statement.args() else {
            panic!("not a revoke");
        };
        assert_eq!(revoke.privileges, vec![Privilege::All]);
        assert_eq!(revoke.object_kind, ObjectKind::Sequence);
        assert!(revoke.grant_option);
        assert_eq!(revoke.granted_by.as_deref(), Some("CURRENT_USER"));
    }
}
