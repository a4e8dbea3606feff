//! INSERT, UPDATE, DELETE and TRUNCATE.

use tracing::trace;

use super::from::new_range;
use super::resolve::{row_items_mut, Clause, Env};
use super::Parser;
use crate::ast::{
    Access, Assignment, DataType, DeleteArgs, Expr, ExprKind, InsertArgs, InsertSource,
    ObjectKind, QualifiedName, RangeColumn, RangeSource, RangeVariable, StatementArgs,
    StatementKind, TableDefinition, UpdateArgs,
};
use crate::catalog::TableDef;
use crate::error::{ErrorKind, Result};
use crate::lexer::{Keyword, TokenKind};

impl<'a> Parser<'a> {
    /// A table named as the target of a data change; records the write.
    fn parse_target_table(&mut self) -> Result<(QualifiedName, &'a TableDef, usize)> {
        let position = self.position();
        let span = self.current().span;
        let name = self.parse_qualified_name()?;
        let catalog = self.catalog;
        let Some(table) = catalog.table(&name) else {
            return Err(self.error_at(ErrorKind::ObjectNotFound(name.to_string()), span));
        };
        if table.read_only {
            return Err(self.error_at(
                ErrorKind::InvalidDefinition(format!("{name} is not updatable")),
                span,
            ));
        }
        let kind = if table.view {
            ObjectKind::View
        } else {
            ObjectKind::Table
        };
        self.ctx.add_reference(kind, name.clone(), Access::Write, position);
        Ok((name, table, position))
    }

    /// The range variable of an UPDATE or DELETE target.
    fn target_range(&mut self, name: &QualifiedName, table: &TableDef, position: usize) -> Result<RangeVariable> {
        let alias = self.parse_optional_alias()?;
        let columns = table
            .columns
            .iter()
            .map(|c| RangeColumn {
                name: c.name.clone(),
                data_type: Some(c.data_type.clone()),
                merged: false,
            })
            .collect();
        let mut range = new_range(
            RangeSource::Table(name.clone()),
            Some(name.clone()),
            alias,
            columns,
            position,
        );
        self.ctx.register_range(&mut range);
        Ok(range)
    }

    /// `INSERT INTO t [(columns)] {VALUES rows | query | DEFAULT VALUES}`
    pub(crate) fn parse_insert(&mut self) -> Result<(StatementKind, StatementArgs)> {
        self.expect_keyword(Keyword::Insert)?;
        self.expect_keyword(Keyword::Into)?;
        let (name, table, _) = self.parse_target_table()?;

        let span = self.current().span;
        let names = if self.check(&TokenKind::LeftParen) && !self.query_follows_parens() {
            self.parse_paren_identifier_list()?
        } else {
            table.columns.iter().map(|c| c.name.clone()).collect()
        };
        let mut columns = Vec::with_capacity(names.len());
        for (i, column) in names.iter().enumerate() {
            if names[..i].contains(column) {
                return Err(self.error_at(ErrorKind::DuplicateName(column.clone()), span));
            }
            let Some(ordinal) = table.column_index(column) else {
                return Err(self.error_at(ErrorKind::ColumnNotFound(format!("{}.{column}", name.name)), span));
            };
            columns.push(ordinal);
        }
        if !self.authorizer.can_insert(&name, &names) {
            return Err(self.error_at(ErrorKind::AccessDenied(format!("INSERT on {name}")), span));
        }

        let source = if self.consume_keyword(Keyword::Default) {
            self.expect_keyword(Keyword::Values)?;
            InsertSource::DefaultValues
        } else if self.consume_keyword(Keyword::Values) {
            let previous = self.ctx.set_contextually_typed(true);
            let rows = self.parse_row_list();
            self.ctx.set_contextually_typed(previous);
            let rows = rows?;
            for row in &rows {
                let found = row_items(row);
                if found != columns.len() {
                    return Err(self.error_at(
                        ErrorKind::ColumnCountMismatch {
                            expected: columns.len(),
                            found,
                        },
                        row.span,
                    ));
                }
            }
            InsertSource::Values(rows)
        } else {
            let query = self.parse_query_expression()?;
            if query.degree() != columns.len() {
                return Err(self.error_at(
                    ErrorKind::ColumnCountMismatch {
                        expected: columns.len(),
                        found: query.degree(),
                    },
                    query.span,
                ));
            }
            InsertSource::Query(query)
        };

        trace!(table = %name, columns = columns.len(), "insert parsed");
        Ok((
            StatementKind::Insert,
            StatementArgs::Insert(InsertArgs {
                table: name,
                columns,
                source,
            }),
        ))
    }

    /// `UPDATE t [[AS] alias] SET assignments [WHERE condition]`
    pub(crate) fn parse_update(&mut self) -> Result<(StatementKind, StatementArgs)> {
        self.expect_keyword(Keyword::Update)?;
        let (name, table, position) = self.parse_target_table()?;
        let target = self.target_range(&name, table, position)?;
        self.expect_keyword(Keyword::Set)?;

        let mut assignments: Vec<Assignment> = Vec::new();
        loop {
            let span = self.current().span;
            let targets = if self.check(&TokenKind::LeftParen) {
                self.parse_paren_identifier_list()?
            } else {
                vec![self.expect_identifier()?]
            };
            self.expect(&TokenKind::Eq)?;
            let previous = self.ctx.set_contextually_typed(true);
            let value = self.parse_expression();
            self.ctx.set_contextually_typed(previous);
            let value = value?;

            let values = if targets.len() == 1 {
                vec![value]
            } else {
                match value.kind {
                    ExprKind::Row(items) if items.len() == targets.len() => items,
                    ExprKind::Row(items) => {
                        return Err(self.error_at(
                            ErrorKind::DegreeMismatch {
                                expected: targets.len(),
                                found: items.len(),
                            },
                            value.span,
                        ));
                    }
                    _ => {
                        return Err(self.error_at(
                            ErrorKind::Unsupported("multiple-column assignment from a subquery".into()),
                            value.span,
                        ));
                    }
                }
            };
            for (column, value) in targets.into_iter().zip(values) {
                let Some(ordinal) = table.column_index(&column) else {
                    return Err(self.error_at(ErrorKind::ColumnNotFound(format!("{}.{column}", name.name)), span));
                };
                if assignments.iter().any(|a| a.column == ordinal) {
                    return Err(self.error_at(ErrorKind::DuplicateName(column), span));
                }
                assignments.push(Assignment {
                    column: ordinal,
                    name: column,
                    value,
                });
            }
            if !self.consume(&TokenKind::Comma) {
                break;
            }
        }

        let names: Vec<String> = assignments.iter().map(|a| a.name.clone()).collect();
        if !self.authorizer.can_update(&name, &names) {
            return Err(self.error(ErrorKind::AccessDenied(format!("UPDATE on {name}"))));
        }
        let where_clause = self.parse_where_clause()?;

        Ok((
            StatementKind::Update,
            StatementArgs::Update(UpdateArgs {
                table: name,
                target,
                assignments,
                where_clause,
            }),
        ))
    }

    /// `DELETE FROM t [[AS] alias] [WHERE condition]`
    pub(crate) fn parse_delete(&mut self) -> Result<(StatementKind, StatementArgs)> {
        self.expect_keyword(Keyword::Delete)?;
        self.expect_keyword(Keyword::From)?;
        let span = self.current().span;
        let (name, table, position) = self.parse_target_table()?;
        if !self.authorizer.can_delete(&name) {
            return Err(self.error_at(ErrorKind::AccessDenied(format!("DELETE on {name}")), span));
        }
        let target = self.target_range(&name, table, position)?;
        let where_clause = self.parse_where_clause()?;
        Ok((
            StatementKind::Delete,
            StatementArgs::Delete(DeleteArgs {
                table: name,
                target,
                where_clause,
            }),
        ))
    }

    /// `TRUNCATE TABLE t [RESTART IDENTITY]`
    pub(crate) fn parse_truncate(&mut self) -> Result<(StatementKind, StatementArgs)> {
        self.expect_keyword(Keyword::Truncate)?;
        self.expect_keyword(Keyword::Table)?;
        let span = self.current().span;
        let (table, definition, _) = self.parse_target_table()?;
        if definition.view {
            return Err(self.error_at(
                ErrorKind::InvalidDefinition(format!("{table} is a view")),
                span,
            ));
        }
        if !self.authorizer.can_delete(&table) {
            return Err(self.error_at(ErrorKind::AccessDenied(format!("DELETE on {table}")), span));
        }
        let restart_identity = if self.consume_keyword(Keyword::Restart) {
            self.expect_keyword(Keyword::Identity)?;
            true
        } else {
            false
        };
        Ok((
            StatementKind::Truncate,
            StatementArgs::Truncate {
                table,
                restart_identity,
            },
        ))
    }

    fn parse_where_clause(&mut self) -> Result<Option<Expr>> {
        if self.consume_keyword(Keyword::Where) {
            self.parse_expression().map(Some)
        } else {
            Ok(None)
        }
    }

    /// Types INSERT values against the target columns.
    pub(crate) fn resolve_insert(&mut self, insert: &mut InsertArgs, env: &mut Env) -> Result<()> {
        let targets = self.target_types(&insert.table, &insert.columns);
        match &mut insert.source {
            InsertSource::Values(rows) => {
                for row in rows.iter_mut() {
                    self.resolve_expr(row, env, Clause::Values)?;
                    for (item, target) in row_items_mut(row).into_iter().zip(&targets) {
                        self.require_scalar(item)?;
                        self.pin(item, target);
                        self.check_assignable(item, target)?;
                    }
                }
            }
            InsertSource::Query(query) => {
                self.resolve_query(query, env)?;
                for (column, target) in query.columns.iter().zip(&targets) {
                    if let Some(data_type) = &column.data_type {
                        if !is_assignable(data_type, target) {
                            return Err(self.error_at(
                                ErrorKind::WrongDataType(format!(
                                    "{} cannot be stored in {}",
                                    data_type.to_sql(),
                                    target.to_sql()
                                )),
                                query.span,
                            ));
                        }
                    }
                }
            }
            InsertSource::DefaultValues => {}
        }
        Ok(())
    }

    /// Types UPDATE assignments and resolves the search condition against
    /// the target.
    pub(crate) fn resolve_update(&mut self, update: &mut UpdateArgs, env: &mut Env) -> Result<()> {
        let columns: Vec<usize> = update.assignments.iter().map(|a| a.column).collect();
        let targets = self.target_types(&update.table, &columns);
        env.push(vec![update.target.clone()]);
        let result = self.resolve_update_clauses(update, &targets, env);
        env.pop();
        result
    }

    fn resolve_update_clauses(&mut self, update: &mut UpdateArgs, targets: &[DataType], env: &mut Env) -> Result<()> {
        for (assignment, target) in update.assignments.iter_mut().zip(targets) {
            self.resolve_expr(&mut assignment.value, env, Clause::Assignment)?;
            self.require_scalar(&assignment.value)?;
            self.pin(&mut assignment.value, target);
            self.check_assignable(&assignment.value, target)?;
        }
        if let Some(condition) = &mut update.where_clause {
            self.resolve_condition(condition, env, Clause::Where)?;
        }
        Ok(())
    }

    /// Types the source query of `CREATE TABLE ... AS` and gives the new
    /// columns its types.
    pub(crate) fn resolve_table_source(&mut self, table: &mut TableDefinition, env: &mut Env) -> Result<()> {
        let Some(source) = &mut table.source else {
            return Ok(());
        };
        self.resolve_query(&mut source.query, env)?;
        for (column, output) in table.columns.iter_mut().zip(&source.query.columns) {
            match &output.data_type {
                Some(data_type) => column.data_type = data_type.clone(),
                None => {
                    return Err(self.error_at(
                        ErrorKind::WrongDataType(format!("no type for column {}", column.name)),
                        source.query.span,
                    ));
                }
            }
        }
        Ok(())
    }

    fn target_types(&self, table: &QualifiedName, columns: &[usize]) -> Vec<DataType> {
        let Some(definition) = self.catalog.table(table) else {
            return Vec::new();
        };
        columns
            .iter()
            .filter_map(|&i| definition.columns.get(i))
            .map(|c| c.data_type.clone())
            .collect()
    }

    /// A value stored into a column of type `target`.
    pub(crate) fn check_assignable(&self, value: &Expr, target: &DataType) -> Result<()> {
        match &value.data_type {
            Some(data_type) if !is_assignable(data_type, target) => Err(self.error_at(
                ErrorKind::WrongDataType(format!(
                    "{} cannot be stored in {}",
                    data_type.to_sql(),
                    target.to_sql()
                )),
                value.span,
            )),
            _ => Ok(()),
        }
    }
}

/// Character strings convert to datetime values on assignment.
fn is_assignable(source: &DataType, target: &DataType) -> bool {
    source.is_comparable_with(target) || (source.is_character() && target.is_datetime())
}

fn row_items(row: &Expr) -> usize {
    match &row.kind {
        ExprKind::Row(items) => items.len(),
        _ => 1,
    }
}
