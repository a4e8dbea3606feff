//! Name and scope resolution.
//!
//! Runs once a statement has been parsed. Every column reference is bound
//! to a range variable of the innermost query that exposes it, subqueries
//! are resolved where they are used, correlation is recorded, aggregate
//! placement and grouping are checked and every expression gets a type.

use std::mem;

use tracing::trace;

use super::Parser;
use crate::ast::{
    ColumnRef, DataType, Expr, ExprKind, QueryBody, QueryExpression, QuerySpecification,
    RangeColumn, RangeSource, RangeVariable, ResolvedColumn, SetOperation, SortAndSlice,
    StatementArgs, SubQueryId, SubQueryKind, TypeOp,
};
use crate::error::{ErrorKind, Result};
use crate::lexer::Span;

/// Clause an expression is resolved in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Clause {
    SelectList,
    Where,
    On,
    GroupBy,
    Having,
    OrderBy,
    Values,
    Assignment,
    Check,
    Default,
    Generated,
    TriggerCondition,
}

impl Clause {
    const fn allows_aggregates(self) -> bool {
        matches!(self, Self::SelectList | Self::Having | Self::OrderBy)
    }

    const fn as_str(self) -> &'static str {
        match self {
            Self::SelectList => "select list",
            Self::Where => "WHERE",
            Self::On => "ON",
            Self::GroupBy => "GROUP BY",
            Self::Having => "HAVING",
            Self::OrderBy => "ORDER BY",
            Self::Values => "VALUES",
            Self::Assignment => "SET",
            Self::Check => "CHECK",
            Self::Default => "DEFAULT",
            Self::Generated => "GENERATED",
            Self::TriggerCondition => "WHEN",
        }
    }
}

/// A subquery whose body is being resolved.
#[derive(Debug)]
struct OpenSubquery {
    id: SubQueryId,
    /// Number of scopes visible where the subquery is used.
    base: usize,
    /// CTE name, for recursive references to it.
    name: Option<String>,
    /// Column types of the first term of a recursive CTE.
    anchor: Option<Vec<Option<DataType>>>,
}

/// Range variables visible at a point of resolution, outermost scope first.
#[derive(Debug, Default)]
pub(crate) struct Env {
    scopes: Vec<Vec<RangeVariable>>,
    open: Vec<OpenSubquery>,
}

impl Env {
    /// An environment with one outer scope holding `ranges`.
    pub(crate) fn new(ranges: Vec<RangeVariable>) -> Self {
        Self {
            scopes: vec![ranges],
            open: Vec::new(),
        }
    }

    pub(crate) fn push(&mut self, ranges: Vec<RangeVariable>) {
        self.scopes.push(ranges);
    }

    pub(crate) fn pop(&mut self) {
        self.scopes.pop();
    }

    fn column(&self, resolved: ResolvedColumn) -> Option<&RangeColumn> {
        self.scopes
            .iter()
            .rev()
            .flatten()
            .find(|r| r.index == resolved.range)
            .and_then(|r| r.columns.get(resolved.column))
    }

    fn anchor(&self, name: &str) -> Option<&[Option<DataType>]> {
        self.open
            .iter()
            .rev()
            .find(|o| o.name.as_deref() == Some(name))
            .and_then(|o| o.anchor.as_deref())
    }
}

impl<'a> Parser<'a> {
    /// Resolves the statement's expressions and every subquery it owns.
    pub(crate) fn resolve_statement(&mut self, args: &mut StatementArgs) -> Result<()> {
        let mut env = Env::new(self.ctx.transitions().to_vec());
        match args {
            StatementArgs::Query(query) => self.resolve_query(query, &mut env)?,
            StatementArgs::Insert(insert) => self.resolve_insert(insert, &mut env)?,
            StatementArgs::Update(update) => self.resolve_update(update, &mut env)?,
            StatementArgs::Delete(delete) => {
                env.push(vec![delete.target.clone()]);
                if let Some(condition) = &mut delete.where_clause {
                    self.resolve_condition(condition, &mut env, Clause::Where)?;
                }
                env.pop();
            }
            StatementArgs::CreateTable(table) => self.resolve_table_source(table, &mut env)?,
            StatementArgs::CreateView(view) => self.resolve_query(&mut view.query, &mut env)?,
            _ => {}
        }
        // Subqueries not reachable from the statement's own expressions.
        for index in 0..self.ctx.subqueries().len() {
            self.resolve_subquery(SubQueryId(index), &mut env)?;
        }
        Ok(())
    }

    /// Resolves a query expression and types its result columns.
    pub(crate) fn resolve_query(&mut self, query: &mut QueryExpression, env: &mut Env) -> Result<()> {
        for id in query.with.clone() {
            self.resolve_subquery(id, env)?;
        }
        let QueryExpression {
            body,
            sort,
            columns,
            ..
        } = query;
        let types = match body {
            QueryBody::Select(spec) => {
                self.resolve_specification(spec, sort, env)?;
                spec.select_list
                    .iter()
                    .map(|item| item.expr.data_type.clone())
                    .collect()
            }
            QueryBody::Values(rows) => self.resolve_values(rows, env)?,
            QueryBody::SetOperation(operation) => self.resolve_set_operation(operation, env)?,
            QueryBody::Nested(inner) => {
                self.resolve_query(inner, env)?;
                inner.columns.iter().map(|c| c.data_type.clone()).collect()
            }
        };
        for (column, data_type) in columns.iter_mut().zip(types) {
            column.data_type = data_type;
        }
        for item in &mut sort.order_by {
            if let Some(position) = item.output_column {
                item.expr.data_type = columns.get(position).and_then(|c| c.data_type.clone());
            }
        }
        Ok(())
    }

    fn resolve_set_operation(
        &mut self,
        operation: &mut SetOperation,
        env: &mut Env,
    ) -> Result<Vec<Option<DataType>>> {
        self.resolve_query(&mut operation.left, env)?;
        if let Some(open) = env.open.last_mut() {
            if open.name.is_some() && open.anchor.is_none() {
                open.anchor = Some(
                    operation
                        .left
                        .columns
                        .iter()
                        .map(|c| c.data_type.clone())
                        .collect(),
                );
            }
        }
        self.resolve_query(&mut operation.right, env)?;

        let mut types = Vec::with_capacity(operation.left_columns.len());
        for (&l, &r) in operation.left_columns.iter().zip(&operation.right_columns) {
            let left = operation.left.columns.get(l).and_then(|c| c.data_type.clone());
            let right = operation.right.columns.get(r).and_then(|c| c.data_type.clone());
            types.push(match (left, right) {
                (Some(a), Some(b)) => Some(a.combine(&b, TypeOp::Union).ok_or_else(|| {
                    self.error_at(
                        ErrorKind::WrongDataType(format!(
                            "{} and {} in {}",
                            a.to_sql(),
                            b.to_sql(),
                            operation.operator.as_str()
                        )),
                        operation.right.span,
                    )
                })?),
                (a, b) => a.or(b),
            });
        }
        Ok(types)
    }

    fn resolve_values(&mut self, rows: &mut [Expr], env: &mut Env) -> Result<Vec<Option<DataType>>> {
        let mut types: Vec<Option<DataType>> = Vec::new();
        for row in rows.iter_mut() {
            self.resolve_expr(row, env, Clause::Values)?;
            let items = row_items(row);
            if types.is_empty() {
                types = vec![None; items.len()];
            }
            for (slot, item) in types.iter_mut().zip(items) {
                let Some(data_type) = &item.data_type else {
                    continue;
                };
                *slot = Some(match slot.take() {
                    None => data_type.clone(),
                    Some(previous) => previous.combine(data_type, TypeOp::Union).ok_or_else(|| {
                        self.error_at(
                            ErrorKind::WrongDataType(format!(
                                "{} and {} in VALUES",
                                previous.to_sql(),
                                data_type.to_sql()
                            )),
                            item.span,
                        )
                    })?,
                });
            }
        }
        for row in rows.iter_mut() {
            for (item, data_type) in row_items_mut(row).iter_mut().zip(&types) {
                if let Some(data_type) = data_type {
                    self.pin(item, data_type);
                }
            }
        }
        Ok(types)
    }

    fn resolve_specification(
        &mut self,
        spec: &mut QuerySpecification,
        sort: &mut SortAndSlice,
        env: &mut Env,
    ) -> Result<()> {
        // FROM sources cannot see the ranges of the specification itself.
        for range in &mut spec.from {
            match &range.source {
                RangeSource::SubQuery(id) => {
                    let id = *id;
                    self.resolve_subquery(id, env)?;
                    if let Some(subquery) = self.ctx.subquery(id) {
                        for (column, output) in range.columns.iter_mut().zip(subquery.columns()) {
                            column.data_type.clone_from(&output.data_type);
                        }
                    }
                }
                RangeSource::RecursiveReference(name) => {
                    if let Some(anchor) = env.anchor(name) {
                        for (column, data_type) in range.columns.iter_mut().zip(anchor) {
                            if column.data_type.is_none() {
                                column.data_type.clone_from(data_type);
                            }
                        }
                    }
                }
                RangeSource::Table(_) | RangeSource::Transition(_) => {}
            }
        }

        // An ON condition sees its join group up to its own right operand,
        // never the ranges joined after it.
        for i in 0..spec.from.len() {
            let Some(mut condition) = spec.from[i].condition.take() else {
                continue;
            };
            let scope = spec.from[i].scope.clone();
            let visible = spec.from.get(scope).unwrap_or_default().to_vec();
            env.push(visible);
            let result = self.resolve_condition(&mut condition, env, Clause::On);
            env.pop();
            spec.from[i].condition = Some(condition);
            result?;
        }

        env.push(spec.from.clone());
        let result = self.resolve_clauses(spec, sort, env);
        env.pop();
        result
    }

    fn resolve_clauses(
        &mut self,
        spec: &mut QuerySpecification,
        sort: &mut SortAndSlice,
        env: &mut Env,
    ) -> Result<()> {
        if let Some(condition) = &mut spec.where_clause {
            self.resolve_condition(condition, env, Clause::Where)?;
        }
        for expr in &mut spec.group_by {
            self.resolve_expr(expr, env, Clause::GroupBy)?;
        }
        if let Some(condition) = &mut spec.having {
            self.resolve_condition(condition, env, Clause::Having)?;
        }
        for item in &mut spec.select_list {
            self.resolve_expr(&mut item.expr, env, Clause::SelectList)?;
            self.require_scalar(&item.expr)?;
        }
        for item in &mut sort.order_by {
            if item.output_column.is_none() {
                self.resolve_expr(&mut item.expr, env, Clause::OrderBy)?;
            }
        }

        spec.aggregated = spec.aggregated
            || spec.having.is_some()
            || spec.select_list.iter().any(|i| i.expr.contains_aggregate())
            || sort
                .order_by
                .iter()
                .any(|i| i.output_column.is_none() && i.expr.contains_aggregate());
        if spec.aggregated {
            self.check_grouping(spec, sort)?;
        }
        Ok(())
    }

    /// Every column of this specification used outside a set function must
    /// be, or be inside, a grouping expression.
    fn check_grouping(&self, spec: &QuerySpecification, sort: &SortAndSlice) -> Result<()> {
        let local: Vec<usize> = spec.from.iter().map(|r| r.index).collect();
        let ordered = sort
            .order_by
            .iter()
            .filter(|i| i.output_column.is_none())
            .map(|i| &i.expr);
        let exprs = spec
            .select_list
            .iter()
            .map(|i| &i.expr)
            .chain(spec.having.iter())
            .chain(ordered);
        for expr in exprs {
            self.check_grouped(expr, &spec.group_by, &local)?;
        }
        Ok(())
    }

    fn check_grouped(&self, expr: &Expr, group_by: &[Expr], local: &[usize]) -> Result<()> {
        if group_by.iter().any(|g| same_expression(g, expr)) {
            return Ok(());
        }
        match &expr.kind {
            ExprKind::Aggregate { .. } => Ok(()),
            ExprKind::Column(column) => match column.resolved {
                Some(resolved) if local.contains(&resolved.range) => Err(self.error_at(
                    ErrorKind::NotGroupingColumn(column.display_name()),
                    expr.span,
                )),
                _ => Ok(()),
            },
            _ => expr
                .children()
                .into_iter()
                .try_for_each(|child| self.check_grouped(child, group_by, local)),
        }
    }

    /// Resolves the body of subquery `id` once, in the scopes where it is
    /// used.
    pub(crate) fn resolve_subquery(&mut self, id: SubQueryId, env: &mut Env) -> Result<()> {
        let Some(subquery) = self.ctx.subquery_mut(id) else {
            return Ok(());
        };
        if subquery.resolved {
            return Ok(());
        }
        subquery.resolved = true;
        let name = match subquery.kind {
            SubQueryKind::Cte => subquery.name.clone(),
            _ => None,
        };
        let mut query = mem::take(&mut subquery.query);

        env.open.push(OpenSubquery {
            id,
            base: env.scopes.len(),
            name,
            anchor: None,
        });
        let result = self.resolve_query(&mut query, env);
        env.open.pop();

        if let Some(subquery) = self.ctx.subquery_mut(id) {
            subquery.query = query;
            trace!(id = id.0, correlated = subquery.correlated, "subquery resolved");
        }
        result
    }

    /// Resolves a search condition and requires it to be boolean.
    pub(crate) fn resolve_condition(&mut self, expr: &mut Expr, env: &mut Env, clause: Clause) -> Result<()> {
        self.resolve_expr(expr, env, clause)?;
        self.require_boolean(expr)
    }

    /// Binds the column references of `expr` and types it bottom-up.
    pub(crate) fn resolve_expr(&mut self, expr: &mut Expr, env: &mut Env, clause: Clause) -> Result<()> {
        match &mut expr.kind {
            ExprKind::Column(column) => {
                expr.data_type = self.bind_column(column, expr.span, env)?;
                return Ok(());
            }
            ExprKind::Aggregate { .. } if !clause.allows_aggregates() => {
                return Err(self.error_at(
                    ErrorKind::MisplacedAggregate(clause.as_str().to_string()),
                    expr.span,
                ));
            }
            ExprKind::SubQuery(id)
            | ExprKind::Exists(id)
            | ExprKind::Unique(id)
            | ExprKind::Quantified { subquery: id, .. }
            | ExprKind::Match { subquery: id, .. } => {
                let id = *id;
                self.resolve_subquery(id, env)?;
            }
            _ => {}
        }
        for child in expr.children_mut() {
            self.resolve_expr(child, env, clause)?;
        }
        self.assign_type(expr)
    }

    /// Finds the range variable a column reference names, innermost scope
    /// first, and returns the column's type.
    fn bind_column(&mut self, column: &mut ColumnRef, span: Span, env: &Env) -> Result<Option<DataType>> {
        if let Some(resolved) = column.resolved {
            return Ok(env.column(resolved).and_then(|c| c.data_type.clone()));
        }
        for level in (0..env.scopes.len()).rev() {
            let mut found: Option<(ResolvedColumn, Option<DataType>)> = None;
            for range in &env.scopes[level] {
                let ordinal = match &column.table {
                    Some(table) => {
                        if !range.matches_qualifier(column.schema.as_deref(), table) {
                            continue;
                        }
                        range.find_column(&column.name, true)
                    }
                    None => range.find_column(&column.name, false),
                };
                let Some(ordinal) = ordinal else {
                    continue;
                };
                if found.is_some() {
                    return Err(self.error_at(ErrorKind::AmbiguousColumn(column.display_name()), span));
                }
                found = Some((
                    ResolvedColumn {
                        range: range.index,
                        column: ordinal,
                        depth: range.depth,
                    },
                    range.columns[ordinal].data_type.clone(),
                ));
            }
            if let Some((resolved, data_type)) = found {
                column.resolved = Some(resolved);
                for open in &env.open {
                    if level < open.base {
                        if let Some(subquery) = self.ctx.subquery_mut(open.id) {
                            subquery.correlated = true;
                        }
                    }
                }
                return Ok(data_type);
            }
        }
        Err(self.error_at(ErrorKind::ColumnNotFound(column.display_name()), span))
    }
}

fn row_items(row: &Expr) -> Vec<&Expr> {
    match &row.kind {
        ExprKind::Row(items) => items.iter().collect(),
        _ => vec![row],
    }
}

pub(crate) fn row_items_mut(row: &mut Expr) -> Vec<&mut Expr> {
    if !matches!(row.kind, ExprKind::Row(_)) {
        return vec![row];
    }
    match &mut row.kind {
        ExprKind::Row(items) => items.iter_mut().collect(),
        _ => Vec::new(),
    }
}

/// Structural equality that ignores spans, types and how a column was
/// qualified.
pub(crate) fn same_expression(a: &Expr, b: &Expr) -> bool {
    match (&a.kind, &b.kind) {
        (ExprKind::Column(x), ExprKind::Column(y)) => x.resolved.is_some() && x.resolved == y.resolved,
        _ => normalized(a) == normalized(b),
    }
}

fn normalized(expr: &Expr) -> Expr {
    let mut copy = expr.clone();
    normalize(&mut copy);
    copy
}

fn normalize(expr: &mut Expr) {
    expr.span = Span::default();
    expr.data_type = None;
    if let ExprKind::Column(column) = &mut expr.kind {
        if column.resolved.is_some() {
            column.schema = None;
            column.table = None;
        }
    }
    for child in expr.children_mut() {
        normalize(child);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{DataType, QualifiedName};
    use crate::catalog::{AllowAll, MemoryCatalog, TableDef};
    use crate::config::CompilerConfig;

    fn catalog() -> MemoryCatalog {
        MemoryCatalog::new()
            .with_table(
                TableDef::new(QualifiedName::new("PUBLIC", "T"))
                    .column("A", DataType::Integer)
                    .column("B", DataType::Varchar(Some(20))),
            )
            .with_table(
                TableDef::new(QualifiedName::new("PUBLIC", "U"))
                    .column("A", DataType::Integer)
                    .column("C", DataType::Date),
            )
    }

    fn compile(sql: &str) -> Result<crate::ast::Statement> {
        let catalog = catalog();
        let config = CompilerConfig::default();
        let mut parser = Parser::new(sql, &catalog, &AllowAll, &config);
        parser
            .next_statement()
            .map(|s| s.expect("one statement"))
    }

    fn error(sql: &str) -> ErrorKind {
        compile(sql).expect_err("should fail").kind
    }

    #[test]
    fn test_columns_get_table_types() {
        let statement = compile("SELECT a, b FROM t").unwrap();
        let query = statement.query().unwrap();
        assert_eq!(query.columns[0].data_type, Some(DataType::Integer));
        assert_eq!(query.columns[1].data_type, Some(DataType::Varchar(Some(20))));
    }

    #[test]
    fn test_unqualified_name_in_two_tables_is_ambiguous() {
        assert!(matches!(error("SELECT a FROM t, u"), ErrorKind::AmbiguousColumn(_)));
        assert!(compile("SELECT t.a, c FROM t, u").is_ok());
    }

    #[test]
    fn test_unknown_column() {
        assert_eq!(error("SELECT zz FROM t"), ErrorKind::ColumnNotFound("ZZ".into()));
        assert_eq!(error("SELECT u.b FROM t, u"), ErrorKind::ColumnNotFound("U.B".into()));
    }

    #[test]
    fn test_inner_scope_wins_and_marks_correlation() {
        let statement =
            compile("SELECT a FROM t WHERE EXISTS (SELECT a FROM u WHERE c IS NULL)").unwrap();
        assert!(!statement.subqueries()[0].correlated);

        let statement = compile("SELECT a FROM t WHERE EXISTS (SELECT c FROM u WHERE u.a = t.a)").unwrap();
        assert!(statement.subqueries()[0].correlated);
    }

    #[test]
    fn test_derived_table_cannot_see_siblings() {
        assert!(matches!(
            error("SELECT * FROM t, (SELECT t.b FROM u) d"),
            ErrorKind::ColumnNotFound(_)
        ));
    }

    #[test]
    fn test_derived_columns_are_typed() {
        let statement = compile("SELECT d.x + 1 FROM (SELECT a AS x FROM t) d").unwrap();
        let query = statement.query().unwrap();
        assert_eq!(query.columns[0].data_type, Some(DataType::Integer));
    }

    #[test]
    fn test_aggregate_placement() {
        assert_eq!(
            error("SELECT a FROM t WHERE COUNT(*) > 1"),
            ErrorKind::MisplacedAggregate("WHERE".into())
        );
        assert_eq!(
            error("SELECT a FROM t GROUP BY COUNT(*)"),
            ErrorKind::MisplacedAggregate("GROUP BY".into())
        );
        assert!(compile("SELECT a, COUNT(*) FROM t GROUP BY a HAVING COUNT(*) > 1").is_ok());
    }

    #[test]
    fn test_grouping_columns() {
        assert_eq!(
            error("SELECT a, b FROM t GROUP BY a"),
            ErrorKind::NotGroupingColumn("B".into())
        );
        assert_eq!(
            error("SELECT b, COUNT(*) FROM t"),
            ErrorKind::NotGroupingColumn("B".into())
        );
        assert!(compile("SELECT t.a + 1, MAX(b) FROM t GROUP BY a + 1").is_ok());
        assert!(compile("SELECT a FROM t GROUP BY a ORDER BY a").is_ok());
    }

    #[test]
    fn test_outer_reference_is_not_a_grouping_error() {
        assert!(compile("SELECT a FROM t WHERE 1 < (SELECT COUNT(*) + t.a FROM u)").is_ok());
    }

    #[test]
    fn test_on_condition_scope() {
        assert!(compile("SELECT * FROM t JOIN u ON t.a = u.a").is_ok());
        assert!(matches!(
            error("SELECT * FROM t JOIN u ON t.a = w.a, u w"),
            ErrorKind::ColumnNotFound(_)
        ));
    }

    #[test]
    fn test_recursive_reference_takes_anchor_types() {
        let statement = compile(
            "WITH RECURSIVE r (n) AS (VALUES (1) UNION ALL SELECT n + 1 FROM r WHERE n < 5) SELECT n FROM r",
        )
        .unwrap();
        let query = statement.query().unwrap();
        assert_eq!(query.columns[0].data_type, Some(DataType::Integer));
    }

    #[test]
    fn test_same_expression_ignores_qualifiers() {
        let statement = compile("SELECT t.a FROM t GROUP BY a").unwrap();
        let spec = statement.query().unwrap().specification().unwrap();
        assert!(same_expression(&spec.select_list[0].expr, &spec.group_by[0]));
    }
}
