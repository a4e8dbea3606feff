//! CREATE TABLE, CREATE INDEX, CREATE VIEW and the constraint grammar
//! shared with ALTER TABLE.

use tracing::{debug, trace};

use super::super::from::new_range;
use super::super::resolve::Clause;
use super::super::Parser;
use crate::ast::{
    Access, CheckOption, ColumnDefinition, ColumnGeneration, ConstraintDefinition, ConstraintKind,
    DataType, Expr, ForeignKey, IndexColumn, IndexDefinition, MatchType, ObjectKind, OnCommit,
    QualifiedName, RangeColumn, RangeSource, RangeVariable, ReferentialAction, SequenceOptions,
    StatementArgs, StatementKind, TableDefinition, TableKind, TableSource, ViewDefinition,
};
use crate::catalog::TableDef;
use crate::error::{ErrorKind, Result};
use crate::lexer::{Keyword, Span, TokenKind};

/// The constraints of one table, with generated names for unnamed ones.
pub(super) struct ConstraintList {
    table: String,
    /// Slot 0 holds the primary key.
    slots: Vec<Option<(ConstraintDefinition, Span)>>,
    /// Names already used by the table.
    taken: Vec<String>,
    has_primary_key: bool,
}

impl ConstraintList {
    pub(super) fn new(table: &str) -> Self {
        Self {
            table: table.to_string(),
            slots: vec![None],
            taken: Vec::new(),
            has_primary_key: false,
        }
    }

    /// Constraints added to an existing table.
    pub(super) fn for_table(table: &TableDef) -> Self {
        Self {
            table: table.name.name.clone(),
            slots: vec![None],
            taken: table.constraints.clone(),
            has_primary_key: !table.primary_key.is_empty(),
        }
    }

    /// Marks `name` as used without adding a constraint.
    pub(super) fn reserve(&mut self, name: &str) {
        self.taken.push(name.to_string());
    }

    pub(super) fn add(&mut self, name: Option<String>, kind: ConstraintKind, span: Span) -> std::result::Result<(), ErrorKind> {
        let is_key = matches!(kind, ConstraintKind::PrimaryKey(_));
        if is_key && (self.has_primary_key || self.slots[0].is_some()) {
            return Err(ErrorKind::DuplicatePrimaryKey(self.table.clone()));
        }
        let generated_name = name.is_none();
        let name = match name {
            Some(name) => {
                if self.is_taken(&name) {
                    return Err(ErrorKind::DuplicateName(name));
                }
                name
            }
            None if is_key => format!("SYS_PK_{}", self.table),
            None => self.generate_name(&kind),
        };
        let definition = ConstraintDefinition {
            name,
            kind,
            generated_name,
        };
        if is_key {
            self.slots[0] = Some((definition, span));
        } else {
            self.slots.push(Some((definition, span)));
        }
        Ok(())
    }

    fn is_taken(&self, name: &str) -> bool {
        self.taken.iter().any(|n| n == name)
            || self.slots.iter().flatten().any(|(c, _)| c.name == name)
    }

    fn generate_name(&self, kind: &ConstraintKind) -> String {
        let prefix = match kind {
            ConstraintKind::ForeignKey(_) => "SYS_FK_",
            _ => "SYS_CT_",
        };
        let mut n = self.taken.len() + self.slots.len();
        loop {
            let name = format!("{prefix}{n}");
            if !self.is_taken(&name) {
                return name;
            }
            n += 1;
        }
    }

    pub(super) fn primary_key(&self) -> Option<&[String]> {
        match &self.slots[0] {
            Some((ConstraintDefinition {
                kind: ConstraintKind::PrimaryKey(columns),
                ..
            }, _)) => Some(columns.as_slice()),
            _ => None,
        }
    }

    fn entries_mut(&mut self) -> impl Iterator<Item = &mut (ConstraintDefinition, Span)> {
        self.slots.iter_mut().flatten()
    }

    pub(super) fn into_definitions(self) -> Vec<ConstraintDefinition> {
        self.slots.into_iter().flatten().map(|(c, _)| c).collect()
    }
}

/// Columns of a table being defined or altered.
pub(super) fn range_columns(columns: &[ColumnDefinition]) -> Vec<RangeColumn> {
    columns
        .iter()
        .map(|c| RangeColumn {
            name: c.name.clone(),
            data_type: Some(c.data_type.clone()),
            merged: false,
        })
        .collect()
}

/// Columns of a table in the catalog.
pub(super) fn catalog_columns(table: &TableDef) -> Vec<RangeColumn> {
    table
        .columns
        .iter()
        .map(|c| RangeColumn {
            name: c.name.clone(),
            data_type: Some(c.data_type.clone()),
            merged: false,
        })
        .collect()
}

impl<'a> Parser<'a> {
    /// `CREATE [kind] TABLE [IF NOT EXISTS] name ( elements ) [ON COMMIT ...]`
    /// or `CREATE TABLE name [(columns)] AS (query) WITH [NO] DATA`.
    pub(super) fn parse_create_table(&mut self) -> Result<(StatementKind, StatementArgs)> {
        let kind_span = self.current().span;
        let kind = self.parse_table_kind()?;
        self.expect_keyword(Keyword::Table)?;
        let if_not_exists = if self.check_keyword(Keyword::If) {
            self.advance();
            self.expect_keyword(Keyword::Not)?;
            self.expect_keyword(Keyword::Exists)?;
            true
        } else {
            false
        };
        let position = self.position();
        let span = self.current().span;
        let name = self.parse_qualified_name()?;
        self.check_define(&name, span)?;
        if !if_not_exists {
            self.check_new_object(ObjectKind::Table, &name, span)?;
        }
        self.ctx.add_reference(ObjectKind::Table, name.clone(), Access::Write, position);

        let (columns, constraints, source) = self.first_of(&[
            &|p: &mut Self| p.parse_table_elements(&name, position),
            &|p: &mut Self| p.parse_table_source(),
        ])?;

        let on_commit = if self.consume_keyword(Keyword::On) {
            self.expect_keyword(Keyword::Commit)?;
            let action = if self.consume_keyword(Keyword::Delete) {
                OnCommit::DeleteRows
            } else {
                self.expect_keyword(Keyword::Preserve)?;
                OnCommit::PreserveRows
            };
            self.expect_keyword(Keyword::Rows)?;
            if !kind.is_temporary() {
                return Err(self.error_at(
                    ErrorKind::InvalidDefinition("ON COMMIT on a table that is not temporary".into()),
                    kind_span,
                ));
            }
            Some(action)
        } else {
            None
        };

        debug!(%name, columns = columns.len(), constraints = constraints.len(), "create table");
        Ok((
            StatementKind::CreateTable,
            StatementArgs::CreateTable(Box::new(TableDefinition {
                name,
                kind,
                if_not_exists,
                columns,
                constraints,
                on_commit,
                source,
            })),
        ))
    }

    fn parse_table_kind(&mut self) -> Result<TableKind> {
        let kind = match self.current().as_keyword() {
            Some(Keyword::Memory) => TableKind::Memory,
            Some(Keyword::Cached) => TableKind::Cached,
            Some(Keyword::Text) => TableKind::Text,
            Some(Keyword::Temp) => TableKind::GlobalTemporary,
            Some(Keyword::Global) => {
                self.advance();
                self.expect_keyword(Keyword::Temporary)?;
                return Ok(TableKind::GlobalTemporary);
            }
            Some(Keyword::Local) => {
                self.advance();
                self.expect_keyword(Keyword::Temporary)?;
                return Ok(TableKind::LocalTemporary);
            }
            Some(Keyword::Temporary) => TableKind::GlobalTemporary,
            _ => return Ok(self.config.default_table_kind),
        };
        self.advance();
        Ok(kind)
    }

    /// `( column-or-constraint, ... )`
    #[allow(clippy::type_complexity)]
    fn parse_table_elements(
        &mut self,
        name: &QualifiedName,
        position: usize,
    ) -> Result<(Vec<ColumnDefinition>, Vec<ConstraintDefinition>, Option<TableSource>)> {
        self.expect(&TokenKind::LeftParen)?;
        let mut columns: Vec<ColumnDefinition> = Vec::new();
        let mut list = ConstraintList::new(&name.name);
        loop {
            if self.starts_table_constraint() {
                self.parse_table_constraint(name, &mut list)?;
            } else {
                let span = self.current().span;
                let column = self.parse_column_definition(name, &mut list)?;
                if columns.iter().any(|c| c.name == column.name) {
                    return Err(self.error_at(ErrorKind::DuplicateName(column.name), span));
                }
                if column.generated.as_ref().is_some_and(|g| matches!(g, ColumnGeneration::Identity { .. }))
                    && columns.iter().any(|c| matches!(c.generated, Some(ColumnGeneration::Identity { .. })))
                {
                    return Err(self.error_at(
                        ErrorKind::InvalidDefinition(format!("second identity column {} in {name}", column.name)),
                        span,
                    ));
                }
                columns.push(column);
            }
            if !self.consume(&TokenKind::Comma) {
                break;
            }
        }
        self.expect(&TokenKind::RightParen)?;
        if columns.is_empty() {
            return Err(self.error(ErrorKind::InvalidDefinition(format!("{name} has no columns"))));
        }

        let visible = range_columns(&columns);
        self.finish_constraints(name, &visible, &mut list, position)?;
        if let Some(key) = list.primary_key() {
            for column in columns.iter_mut().filter(|c| key.contains(&c.name)) {
                column.nullable = false;
            }
        }
        self.resolve_generated_columns(name, &mut columns, position)?;
        Ok((columns, list.into_definitions(), None))
    }

    /// `[(columns)] AS (query) WITH [NO] DATA`
    #[allow(clippy::type_complexity)]
    fn parse_table_source(
        &mut self,
    ) -> Result<(Vec<ColumnDefinition>, Vec<ConstraintDefinition>, Option<TableSource>)> {
        let names = if self.check(&TokenKind::LeftParen) {
            Some(self.parse_paren_identifier_list()?)
        } else {
            None
        };
        self.expect_keyword(Keyword::As)?;
        let query = self.parse_query_expression()?;
        self.expect_keyword(Keyword::With)?;
        let with_data = !self.consume_keyword(Keyword::No);
        self.expect_keyword(Keyword::Data)?;

        let names = match names {
            Some(names) => {
                if names.len() != query.columns.len() {
                    return Err(self.error_at(
                        ErrorKind::ColumnCountMismatch {
                            expected: names.len(),
                            found: query.columns.len(),
                        },
                        query.span,
                    ));
                }
                names
            }
            None => {
                let names: Vec<String> = query.columns.iter().map(|c| c.name.clone()).collect();
                if let Some(repeated) = first_repeated(&names) {
                    return Err(self.error_at(ErrorKind::DuplicateName(repeated.to_string()), query.span));
                }
                names
            }
        };
        // Types are filled in once the query is resolved.
        let columns = names
            .into_iter()
            .map(|name| ColumnDefinition::new(name, DataType::Varchar(None)))
            .collect();
        Ok((columns, Vec::new(), Some(TableSource { query, with_data })))
    }

    pub(super) fn starts_table_constraint(&self) -> bool {
        matches!(
            self.current().as_keyword(),
            Some(Keyword::Constraint | Keyword::Primary | Keyword::Unique | Keyword::Check | Keyword::Foreign)
        )
    }

    /// `[CONSTRAINT name] { PRIMARY KEY | UNIQUE } (columns)`,
    /// `CHECK (condition)` or `FOREIGN KEY (columns) REFERENCES ...`.
    pub(super) fn parse_table_constraint(&mut self, table: &QualifiedName, list: &mut ConstraintList) -> Result<()> {
        let span = self.current().span;
        let name = self.parse_constraint_name()?;
        let kind = match self.current().as_keyword() {
            Some(Keyword::Primary) => {
                self.advance();
                self.expect_keyword(Keyword::Key)?;
                ConstraintKind::PrimaryKey(self.parse_paren_identifier_list()?)
            }
            Some(Keyword::Unique) => {
                self.advance();
                ConstraintKind::Unique(self.parse_paren_identifier_list()?)
            }
            Some(Keyword::Check) => ConstraintKind::Check(self.parse_check_condition()?),
            Some(Keyword::Foreign) => {
                self.advance();
                self.expect_keyword(Keyword::Key)?;
                let columns = self.parse_paren_identifier_list()?;
                ConstraintKind::ForeignKey(self.parse_references(table, columns)?)
            }
            _ => return Err(self.unexpected("constraint")),
        };
        let span = span.merge(self.cursor.previous().span);
        list.add(name, kind, span).map_err(|kind| self.error_at(kind, span))
    }

    fn parse_constraint_name(&mut self) -> Result<Option<String>> {
        if self.consume_keyword(Keyword::Constraint) {
            Ok(Some(self.expect_identifier()?))
        } else {
            Ok(None)
        }
    }

    /// `CHECK ( condition )`; resolved once the visible columns are known.
    pub(super) fn parse_check_condition(&mut self) -> Result<Expr> {
        self.expect_keyword(Keyword::Check)?;
        self.expect(&TokenKind::LeftParen)?;
        let condition = self.parse_expression()?;
        self.expect(&TokenKind::RightParen)?;
        Ok(condition)
    }

    /// `REFERENCES table [(columns)] [MATCH ...] [ON DELETE action] [ON UPDATE action]`
    fn parse_references(&mut self, table: &QualifiedName, columns: Vec<String>) -> Result<ForeignKey> {
        self.expect_keyword(Keyword::References)?;
        let position = self.position();
        let span = self.current().span;
        let referenced_table = self.parse_qualified_name()?;
        if &referenced_table != table {
            match self.catalog.table(&referenced_table) {
                Some(target) if target.view => {
                    return Err(self.error_at(
                        ErrorKind::InvalidDefinition(format!("{referenced_table} is a view")),
                        span,
                    ));
                }
                Some(_) => self.use_object(ObjectKind::Table, &referenced_table, position, span)?,
                None => {
                    return Err(self.error_at(ErrorKind::ObjectNotFound(referenced_table.to_string()), span));
                }
            }
        }
        let referenced_columns = if self.check(&TokenKind::LeftParen) {
            self.parse_paren_identifier_list()?
        } else {
            Vec::new()
        };
        let match_type = if self.consume_keyword(Keyword::Match) {
            let match_type = match self.current().as_keyword() {
                Some(Keyword::Full) => MatchType::Full,
                Some(Keyword::Partial) => MatchType::Partial,
                Some(Keyword::Simple) => MatchType::Simple,
                _ => return Err(self.unexpected("FULL, PARTIAL or SIMPLE")),
            };
            self.advance();
            match_type
        } else {
            MatchType::Simple
        };

        let mut on_delete: Option<ReferentialAction> = None;
        let mut on_update: Option<ReferentialAction> = None;
        while self.check_keyword(Keyword::On)
            && (self.peek_keyword(1, Keyword::Delete) || self.peek_keyword(1, Keyword::Update))
        {
            self.advance();
            let span = self.current().span;
            let slot = if self.consume_keyword(Keyword::Delete) {
                &mut on_delete
            } else {
                self.advance();
                &mut on_update
            };
            if slot.is_some() {
                return Err(self.error_at(ErrorKind::InvalidDefinition("repeated referential action".into()), span));
            }
            *slot = Some(self.parse_referential_action()?);
        }

        Ok(ForeignKey {
            columns,
            referenced_table,
            referenced_columns,
            match_type,
            on_delete: on_delete.unwrap_or_default(),
            on_update: on_update.unwrap_or_default(),
        })
    }

    fn parse_referential_action(&mut self) -> Result<ReferentialAction> {
        match self.current().as_keyword() {
            Some(Keyword::Cascade) => {
                self.advance();
                Ok(ReferentialAction::Cascade)
            }
            Some(Keyword::Restrict) => {
                self.advance();
                Ok(ReferentialAction::Restrict)
            }
            Some(Keyword::Set) => {
                self.advance();
                if self.consume_keyword(Keyword::Null) {
                    Ok(ReferentialAction::SetNull)
                } else {
                    self.expect_keyword(Keyword::Default)?;
                    Ok(ReferentialAction::SetDefault)
                }
            }
            Some(Keyword::No) => {
                self.advance();
                self.expect_keyword(Keyword::Action)?;
                Ok(ReferentialAction::NoAction)
            }
            _ => Err(self.unexpected("referential action")),
        }
    }

    /// `name type [DEFAULT expr | GENERATED ... | IDENTITY] [column constraints]`
    pub(super) fn parse_column_definition(
        &mut self,
        table: &QualifiedName,
        list: &mut ConstraintList,
    ) -> Result<ColumnDefinition> {
        let name = self.expect_identifier()?;
        let (data_type, domain) = self.parse_data_type_or_domain()?;
        let mut column = ColumnDefinition::new(name, data_type);
        column.domain = domain;

        if self.consume_keyword(Keyword::Default) {
            let mut default = self.parse_expression()?;
            self.resolve_default(&mut default, &column.data_type)?;
            column.default = Some(default);
        } else if self.check_keyword(Keyword::Generated) {
            column.generated = Some(self.parse_generation(&column)?);
        } else if self.consume_keyword(Keyword::Identity) {
            column.generated = Some(self.identity(&column, true, Default::default())?);
        }
        if matches!(column.generated, Some(ColumnGeneration::Identity { .. })) {
            column.nullable = false;
        }

        loop {
            let span = self.current().span;
            let constraint_name = self.parse_constraint_name()?;
            let kind = match self.current().as_keyword() {
                Some(Keyword::Not) => {
                    self.advance();
                    self.expect_keyword(Keyword::Null)?;
                    column.nullable = false;
                    continue;
                }
                Some(Keyword::Null) if constraint_name.is_none() => {
                    self.advance();
                    if matches!(column.generated, Some(ColumnGeneration::Identity { .. })) {
                        return Err(self.error_at(
                            ErrorKind::InvalidDefinition(format!("identity column {} cannot be nullable", column.name)),
                            span,
                        ));
                    }
                    column.nullable = true;
                    continue;
                }
                Some(Keyword::Primary) => {
                    self.advance();
                    self.expect_keyword(Keyword::Key)?;
                    ConstraintKind::PrimaryKey(vec![column.name.clone()])
                }
                Some(Keyword::Unique) => {
                    self.advance();
                    ConstraintKind::Unique(vec![column.name.clone()])
                }
                Some(Keyword::Check) => ConstraintKind::Check(self.parse_check_condition()?),
                Some(Keyword::References) => {
                    ConstraintKind::ForeignKey(self.parse_references(table, vec![column.name.clone()])?)
                }
                _ if constraint_name.is_some() => return Err(self.unexpected("column constraint")),
                _ => break,
            };
            let span = span.merge(self.cursor.previous().span);
            list.add(constraint_name, kind, span).map_err(|kind| self.error_at(kind, span))?;
        }
        trace!(column = %column.name, "column definition");
        Ok(column)
    }

    /// `GENERATED {ALWAYS | BY DEFAULT} AS {IDENTITY [(options)] | (expr)}`
    fn parse_generation(&mut self, column: &ColumnDefinition) -> Result<ColumnGeneration> {
        self.expect_keyword(Keyword::Generated)?;
        let span = self.current().span;
        let always = if self.consume_keyword(Keyword::Always) {
            true
        } else {
            self.expect_keyword(Keyword::By)?;
            self.expect_keyword(Keyword::Default)?;
            false
        };
        self.expect_keyword(Keyword::As)?;
        if self.consume_keyword(Keyword::Identity) {
            let options = if self.consume(&TokenKind::LeftParen) {
                let options = self.parse_sequence_options(false)?;
                self.expect(&TokenKind::RightParen)?;
                options
            } else {
                Default::default()
            };
            return self.identity(column, always, options);
        }
        if !always {
            return Err(self.error_at(
                ErrorKind::InvalidDefinition(format!("generated column {} must be ALWAYS", column.name)),
                span,
            ));
        }
        self.expect(&TokenKind::LeftParen)?;
        let expr = self.parse_expression()?;
        self.expect(&TokenKind::RightParen)?;
        Ok(ColumnGeneration::Expression(expr))
    }

    fn identity(
        &self,
        column: &ColumnDefinition,
        always: bool,
        mut options: SequenceOptions,
    ) -> Result<ColumnGeneration> {
        let span = self.cursor.previous().span;
        if !column.data_type.is_integral() && !has_zero_scale(&column.data_type) {
            return Err(self.error_at(
                ErrorKind::WrongDataType(format!(
                    "identity column {} of type {}",
                    column.name,
                    column.data_type.to_sql()
                )),
                span,
            ));
        }
        options.data_type = Some(column.data_type.clone());
        self.validate_sequence_options(&options, span)?;
        Ok(ColumnGeneration::Identity { always, options })
    }

    /// Checks constraint columns and foreign keys and resolves CHECK
    /// conditions against `columns`.
    pub(super) fn finish_constraints(
        &mut self,
        table: &QualifiedName,
        columns: &[RangeColumn],
        list: &mut ConstraintList,
        position: usize,
    ) -> Result<()> {
        let own_key: Vec<String> = match (list.primary_key(), self.catalog.table(table)) {
            (Some(key), _) => key.to_vec(),
            (None, Some(existing)) => existing.primary_key.clone(),
            (None, None) => Vec::new(),
        };
        let range = self.definition_range(table, columns.to_vec(), position);
        for (constraint, span) in list.entries_mut() {
            let span = *span;
            match &mut constraint.kind {
                ConstraintKind::PrimaryKey(names) | ConstraintKind::Unique(names) => {
                    self.check_columns_exist(table, columns, names, span)?;
                }
                ConstraintKind::Check(condition) => {
                    self.resolve_definition_expr(condition, vec![range.clone()], Clause::Check)?;
                }
                ConstraintKind::ForeignKey(key) => {
                    self.check_columns_exist(table, columns, &key.columns, span)?;
                    self.finish_foreign_key(table, columns, &own_key, key, span)?;
                }
            }
        }
        Ok(())
    }

    fn check_columns_exist(
        &self,
        table: &QualifiedName,
        columns: &[RangeColumn],
        names: &[String],
        span: Span,
    ) -> Result<()> {
        for name in names {
            if !columns.iter().any(|c| &c.name == name) {
                return Err(self.error_at(ErrorKind::ColumnNotFound(format!("{}.{name}", table.name)), span));
            }
        }
        Ok(())
    }

    /// Defaults the referenced columns to the target's primary key and
    /// checks both column lists agree.
    fn finish_foreign_key(
        &self,
        table: &QualifiedName,
        columns: &[RangeColumn],
        own_key: &[String],
        key: &mut ForeignKey,
        span: Span,
    ) -> Result<()> {
        let (target_columns, target_key): (Vec<(String, Option<DataType>)>, Vec<String>) =
            if &key.referenced_table == table {
                (
                    columns.iter().map(|c| (c.name.clone(), c.data_type.clone())).collect(),
                    own_key.to_vec(),
                )
            } else {
                let Some(target) = self.catalog.table(&key.referenced_table) else {
                    return Err(self.error_at(ErrorKind::ObjectNotFound(key.referenced_table.to_string()), span));
                };
                (
                    target
                        .columns
                        .iter()
                        .map(|c| (c.name.clone(), Some(c.data_type.clone())))
                        .collect(),
                    target.primary_key.clone(),
                )
            };

        if key.referenced_columns.is_empty() {
            if target_key.is_empty() {
                return Err(self.error_at(
                    ErrorKind::InvalidDefinition(format!("{} has no primary key", key.referenced_table)),
                    span,
                ));
            }
            key.referenced_columns = target_key;
        }
        if key.referenced_columns.len() != key.columns.len() {
            return Err(self.error_at(
                ErrorKind::ColumnCountMismatch {
                    expected: key.columns.len(),
                    found: key.referenced_columns.len(),
                },
                span,
            ));
        }
        for (local, referenced) in key.columns.iter().zip(&key.referenced_columns) {
            let Some((_, target_type)) = target_columns.iter().find(|(n, _)| n == referenced) else {
                return Err(self.error_at(
                    ErrorKind::ColumnNotFound(format!("{}.{referenced}", key.referenced_table.name)),
                    span,
                ));
            };
            let local_type = columns.iter().find(|c| &c.name == local).and_then(|c| c.data_type.as_ref());
            if let (Some(local_type), Some(target_type)) = (local_type, target_type) {
                if !local_type.is_comparable_with(target_type) {
                    return Err(self.error_at(
                        ErrorKind::WrongDataType(format!(
                            "{local} {} references {referenced} {}",
                            local_type.to_sql(),
                            target_type.to_sql()
                        )),
                        span,
                    ));
                }
            }
        }
        Ok(())
    }

    /// A range variable over the columns of a table being defined, for
    /// resolving CHECK and generation expressions.
    pub(super) fn definition_range(
        &mut self,
        table: &QualifiedName,
        columns: Vec<RangeColumn>,
        position: usize,
    ) -> RangeVariable {
        let mut range = new_range(
            RangeSource::Table(table.clone()),
            Some(table.clone()),
            None,
            columns,
            position,
        );
        self.ctx.register_range(&mut range);
        range
    }

    fn resolve_generated_columns(
        &mut self,
        table: &QualifiedName,
        columns: &mut [ColumnDefinition],
        position: usize,
    ) -> Result<()> {
        if !columns.iter().any(|c| matches!(c.generated, Some(ColumnGeneration::Expression(_)))) {
            return Ok(());
        }
        let range = self.definition_range(table, range_columns(columns), position);
        for column in columns.iter_mut() {
            if let Some(ColumnGeneration::Expression(expr)) = &mut column.generated {
                self.resolve_definition_expr(expr, vec![range.clone()], Clause::Generated)?;
                self.require_scalar(expr)?;
                self.pin(expr, &column.data_type);
                self.check_assignable(expr, &column.data_type)?;
            }
        }
        Ok(())
    }

    /// `CREATE [UNIQUE] INDEX name ON table (column [ASC | DESC], ...)`
    pub(super) fn parse_create_index(&mut self) -> Result<(StatementKind, StatementArgs)> {
        let unique = self.consume_keyword(Keyword::Unique);
        self.expect_keyword(Keyword::Index)?;
        let span = self.current().span;
        let mut name = self.parse_qualified_name()?;
        self.expect_keyword(Keyword::On)?;
        let position = self.position();
        let table_span = self.current().span;
        let table_name = self.parse_qualified_name()?;
        let catalog = self.catalog;
        let table = match catalog.table(&table_name) {
            Some(table) if !table.view => table,
            _ => return Err(self.error_at(ErrorKind::ObjectNotFound(format!("TABLE {table_name}")), table_span)),
        };
        // An index lives in the schema of its table.
        if name.schema != table_name.schema {
            name.schema.clone_from(&table_name.schema);
        }
        self.check_define(&name, span)?;
        self.check_new_object(ObjectKind::Index, &name, span)?;

        self.expect(&TokenKind::LeftParen)?;
        let mut columns: Vec<IndexColumn> = Vec::new();
        loop {
            let span = self.current().span;
            let column = self.expect_identifier()?;
            if table.find_column(&column).is_none() {
                return Err(self.error_at(ErrorKind::ColumnNotFound(format!("{}.{column}", table_name.name)), span));
            }
            if columns.iter().any(|c| c.name == column) {
                return Err(self.error_at(ErrorKind::DuplicateName(column), span));
            }
            let descending = if self.consume_keyword(Keyword::Desc) {
                true
            } else {
                self.consume_keyword(Keyword::Asc);
                false
            };
            columns.push(IndexColumn { name: column, descending });
            if !self.consume(&TokenKind::Comma) {
                break;
            }
        }
        self.expect(&TokenKind::RightParen)?;
        self.ctx.add_reference(ObjectKind::Table, table_name.clone(), Access::Write, position);

        Ok((
            StatementKind::CreateIndex,
            StatementArgs::CreateIndex(IndexDefinition {
                name,
                table: table_name,
                columns,
                unique,
            }),
        ))
    }

    /// `CREATE VIEW name [(columns)] AS query [WITH [CASCADED | LOCAL] CHECK OPTION]`
    pub(super) fn parse_create_view(&mut self) -> Result<(StatementKind, StatementArgs)> {
        self.expect_keyword(Keyword::View)?;
        let span = self.current().span;
        let name = self.parse_qualified_name()?;
        self.check_define(&name, span)?;
        self.check_new_object(ObjectKind::View, &name, span)?;
        let mut columns = if self.check(&TokenKind::LeftParen) {
            self.parse_paren_identifier_list()?
        } else {
            Vec::new()
        };
        self.expect_keyword(Keyword::As)?;

        let recording = self.cursor.start_recording();
        let query = self.parse_query_expression()?;
        let query_sql = self.cursor.recorded_sql(recording).to_string();

        if columns.is_empty() {
            let names: Vec<String> = query.columns.iter().map(|c| c.name.clone()).collect();
            if let Some(repeated) = first_repeated(&names) {
                return Err(self.error_at(ErrorKind::DuplicateName(repeated.to_string()), query.span));
            }
            columns = names;
        } else if columns.len() != query.columns.len() {
            return Err(self.error_at(
                ErrorKind::ColumnCountMismatch {
                    expected: columns.len(),
                    found: query.columns.len(),
                },
                query.span,
            ));
        }

        let check_option = if self.check_keyword(Keyword::With) {
            self.advance();
            let option = if self.consume_keyword(Keyword::Local) {
                CheckOption::Local
            } else {
                self.consume_keyword(Keyword::Cascaded);
                CheckOption::Cascaded
            };
            self.expect_keyword(Keyword::Check)?;
            self.expect_keyword(Keyword::Option)?;
            Some(option)
        } else {
            None
        };

        debug!(%name, sql = %query_sql, "create view");
        Ok((
            StatementKind::CreateView,
            StatementArgs::CreateView(Box::new(ViewDefinition {
                name,
                columns,
                query,
                query_sql,
                check_option,
            })),
        ))
    }
}

fn first_repeated(names: &[String]) -> Option<&str> {
    names
        .iter()
        .enumerate()
        .find(|(i, name)| names[..*i].contains(name))
        .map(|(_, name)| name.as_str())
}

const fn has_zero_scale(data_type: &DataType) -> bool {
    matches!(
        data_type,
        DataType::Decimal { scale: None | Some(0), .. } | DataType::Numeric { scale: None | Some(0), .. }
    )
}
