//! Query expressions: WITH, set operations, query specifications, ORDER BY
//! and row limits.

use tracing::trace;

use super::context::NamedQuery;
use super::Parser;
use crate::ast::{
    DataType, Expr, ExprKind, Limit, Literal, OutputColumn, QueryBody, QueryExpression,
    QuerySpecification, RangeVariable, ResolvedColumn, SelectItem, SetOperation, SetOperator,
    SortAndSlice, SortItem, SubQueryId, SubQueryKind,
};
use crate::error::{ErrorKind, Result};
use crate::lexer::{Keyword, Span, TokenKind};

impl<'a> Parser<'a> {
    /// Parses `[WITH ...] body [ORDER BY ...] [LIMIT ...]`.
    pub(crate) fn parse_query_expression(&mut self) -> Result<QueryExpression> {
        let mark = self.ctx.named_mark();
        let result = self.parse_query_expression_inner();
        self.ctx.close_named(mark);
        result
    }

    fn parse_query_expression_inner(&mut self) -> Result<QueryExpression> {
        let start = self.position();
        let with = if self.check_keyword(Keyword::With) {
            self.parse_with_clause()?
        } else {
            Vec::new()
        };

        let body = self.parse_query_body()?;
        let sort = self.parse_sort_and_slice(&body)?;

        let mut query = if (!with.is_empty() || !sort.is_empty())
            && (!body.with.is_empty() || !body.sort.is_empty())
        {
            QueryExpression {
                with: Vec::new(),
                columns: body.columns.clone(),
                depth: body.depth,
                span: body.span,
                sort: SortAndSlice::default(),
                body: QueryBody::Nested(Box::new(body)),
            }
        } else {
            body
        };

        if !with.is_empty() {
            query.with = with;
        }
        if !sort.is_empty() {
            query.sort = sort;
        }
        self.hoist_select_limit(&mut query)?;
        query.span = self.span_from(start);
        Ok(query)
    }

    /// `WITH [RECURSIVE] name [(cols)] AS (query), ...`
    fn parse_with_clause(&mut self) -> Result<Vec<SubQueryId>> {
        self.expect_keyword(Keyword::With)?;
        let recursive = self.consume_keyword(Keyword::Recursive);
        let depth = self.ctx.depth();
        let mut names: Vec<String> = Vec::new();
        let mut ids = Vec::new();

        loop {
            let position = self.position();
            let name_span = self.current().span;
            let name = self.expect_identifier()?;
            if names.contains(&name) {
                return Err(self.error_at(ErrorKind::DuplicateName(name), name_span));
            }
            let columns = if self.check(&TokenKind::LeftParen) {
                self.parse_paren_identifier_list()?
            } else {
                Vec::new()
            };
            self.expect_keyword(Keyword::As)?;

            let id = self.open_subquery(SubQueryKind::Cte)?;
            if let Some(subquery) = self.ctx.subquery_mut(id) {
                subquery.name = Some(name.clone());
            }
            let named = NamedQuery {
                name: name.clone(),
                depth,
                subquery: id,
                columns: columns.clone(),
                pending: recursive,
                position,
            };
            if recursive {
                self.ctx.declare_named(named.clone());
            }
            self.close_subquery(id)?;
            self.rename_subquery_columns(id, &columns, name_span)?;
            if recursive {
                self.ctx.complete_named(id);
            } else {
                self.ctx.declare_named(named);
            }
            trace!(name = %name, id = id.0, recursive, "named query declared");

            names.push(name);
            ids.push(id);
            if !self.consume(&TokenKind::Comma) {
                break;
            }
        }
        Ok(ids)
    }

    /// Applies a column name list to a subquery's result columns.
    pub(crate) fn rename_subquery_columns(
        &mut self,
        id: SubQueryId,
        names: &[String],
        span: Span,
    ) -> Result<()> {
        let Some(subquery) = self.ctx.subquery(id) else {
            return Ok(());
        };
        if names.is_empty() {
            return self.check_output_names(&subquery.query.columns, span);
        }
        let found = subquery.query.columns.len();
        if names.len() != found {
            return Err(self.error_at(
                ErrorKind::ColumnCountMismatch {
                    expected: names.len(),
                    found,
                },
                span,
            ));
        }
        if let Some(subquery) = self.ctx.subquery_mut(id) {
            for (column, name) in subquery.query.columns.iter_mut().zip(names) {
                column.name.clone_from(name);
            }
        }
        Ok(())
    }

    /// Rejects repeated output names when names must be unique.
    pub(crate) fn check_output_names(&self, columns: &[OutputColumn], span: Span) -> Result<()> {
        if !self.config.strict_names {
            return Ok(());
        }
        for (i, column) in columns.iter().enumerate() {
            if columns[..i].iter().any(|c| c.name == column.name) {
                return Err(self.error_at(ErrorKind::DuplicateName(column.name.clone()), span));
            }
        }
        Ok(())
    }

    /// `term {UNION|EXCEPT} term ...`
    fn parse_query_body(&mut self) -> Result<QueryExpression> {
        let mut left = self.parse_query_term()?;
        if let QueryBody::Select(_) | QueryBody::Values(_) = left.body {
            let names: Vec<String> = left.columns.iter().map(|c| c.name.clone()).collect();
            self.ctx.adopt_anchor_columns(&names);
        }
        loop {
            let operator = match self.current().as_keyword() {
                Some(Keyword::Union) => SetOperator::Union,
                Some(Keyword::Except) => SetOperator::Except,
                _ => break,
            };
            self.advance();
            left = self.parse_set_operation(left, operator, Self::parse_query_term)?;
        }
        Ok(left)
    }

    /// `primary INTERSECT primary ...`
    fn parse_query_term(&mut self) -> Result<QueryExpression> {
        let mut left = self.parse_query_primary()?;
        while self.consume_keyword(Keyword::Intersect) {
            left = self.parse_set_operation(left, SetOperator::Intersect, Self::parse_query_primary)?;
        }
        Ok(left)
    }

    /// Parses what follows a set operator and combines both sides.
    fn parse_set_operation(
        &mut self,
        left: QueryExpression,
        operator: SetOperator,
        right_operand: fn(&mut Self) -> Result<QueryExpression>,
    ) -> Result<QueryExpression> {
        let operator_span = self.cursor.previous().span;
        let all = self.consume_keyword(Keyword::All);
        if !all {
            self.consume_keyword(Keyword::Distinct);
        }
        let corresponding = self.consume_keyword(Keyword::Corresponding);
        let by = if corresponding && self.consume_keyword(Keyword::By) {
            Some(self.parse_paren_identifier_list()?)
        } else {
            None
        };
        let right = right_operand(self)?;

        let (left_columns, right_columns) = if corresponding {
            self.corresponding_columns(&left, &right, by.as_deref(), operator_span)?
        } else {
            if left.degree() != right.degree() {
                return Err(self.error_at(
                    ErrorKind::ColumnCountMismatch {
                        expected: left.degree(),
                        found: right.degree(),
                    },
                    right.span,
                ));
            }
            ((0..left.degree()).collect(), (0..right.degree()).collect())
        };

        let columns = left_columns
            .iter()
            .map(|&i| OutputColumn {
                name: left.columns[i].name.clone(),
                data_type: None,
            })
            .collect();
        let span = left.span.merge(right.span);
        let depth = left.depth;
        Ok(QueryExpression {
            with: Vec::new(),
            body: QueryBody::SetOperation(Box::new(SetOperation {
                operator,
                all,
                corresponding,
                left,
                right,
                left_columns,
                right_columns,
            })),
            sort: SortAndSlice::default(),
            columns,
            depth,
            span,
        })
    }

    /// Column positions selected by `CORRESPONDING [BY (names)]`.
    fn corresponding_columns(
        &self,
        left: &QueryExpression,
        right: &QueryExpression,
        by: Option<&[String]>,
        span: Span,
    ) -> Result<(Vec<usize>, Vec<usize>)> {
        let position = |query: &QueryExpression, name: &str| {
            query.columns.iter().position(|c| c.name == name)
        };
        let names: Vec<String> = match by {
            Some(names) => names.to_vec(),
            None => left
                .columns
                .iter()
                .filter(|c| position(right, &c.name).is_some())
                .map(|c| c.name.clone())
                .collect(),
        };
        if names.is_empty() {
            return Err(self.error_at(
                ErrorKind::ColumnCountMismatch {
                    expected: left.degree(),
                    found: 0,
                },
                span,
            ));
        }

        let mut left_columns = Vec::with_capacity(names.len());
        let mut right_columns = Vec::with_capacity(names.len());
        for name in &names {
            match (position(left, name), position(right, name)) {
                (Some(l), Some(r)) => {
                    left_columns.push(l);
                    right_columns.push(r);
                }
                _ => return Err(self.error_at(ErrorKind::ColumnNotFound(name.clone()), span)),
            }
        }
        Ok((left_columns, right_columns))
    }

    /// `SELECT ...`, `VALUES ...`, `TABLE t` or `( query )`.
    fn parse_query_primary(&mut self) -> Result<QueryExpression> {
        let start = self.position();
        match self.current().as_keyword() {
            Some(Keyword::Select) => self.parse_query_specification(),
            Some(Keyword::Values) => {
                self.advance();
                let rows = self.parse_row_list()?;
                let degree = rows.first().map_or(0, super::expression::row_degree);
                let columns = (1..=degree)
                    .map(|n| OutputColumn {
                        name: format!("C{n}"),
                        data_type: None,
                    })
                    .collect();
                Ok(QueryExpression {
                    with: Vec::new(),
                    body: QueryBody::Values(rows),
                    sort: SortAndSlice::default(),
                    columns,
                    depth: self.ctx.depth(),
                    span: self.span_from(start),
                })
            }
            Some(Keyword::Table) => {
                self.advance();
                let range = self.parse_named_table()?;
                let span = self.span_from(start);
                let select_list = expand_star(std::slice::from_ref(&range), None, None, span);
                self.finish_specification(
                    QuerySpecification {
                        distinct: false,
                        select_list,
                        from: vec![range],
                        where_clause: None,
                        group_by: Vec::new(),
                        having: None,
                        aggregated: false,
                        limit: None,
                        depth: self.ctx.depth(),
                    },
                    start,
                )
            }
            _ if self.check(&TokenKind::LeftParen) => {
                self.advance();
                let inner = self.parse_query_expression()?;
                self.expect(&TokenKind::RightParen)?;
                Ok(inner)
            }
            _ => Err(self.unexpected("SELECT, VALUES, TABLE or (")),
        }
    }

    /// `SELECT [TOP n | LIMIT o c] [DISTINCT|ALL] list [FROM ...] [WHERE ...]
    /// [GROUP BY ...] [HAVING ...]`
    fn parse_query_specification(&mut self) -> Result<QueryExpression> {
        let start = self.position();
        self.expect_keyword(Keyword::Select)?;

        let limit = self.parse_select_clause_limit()?;
        let distinct = self.consume_keyword(Keyword::Distinct);
        if !distinct {
            self.consume_keyword(Keyword::All);
        }

        let mut items = vec![self.parse_select_item()?];
        while self.consume(&TokenKind::Comma) {
            items.push(self.parse_select_item()?);
        }

        let from = if self.consume_keyword(Keyword::From) {
            self.parse_from_clause()?
        } else {
            Vec::new()
        };
        let where_clause = if self.consume_keyword(Keyword::Where) {
            Some(self.parse_expression()?)
        } else {
            None
        };
        let group_by = if self.consume_keyword(Keyword::Group) {
            self.expect_keyword(Keyword::By)?;
            self.parse_expression_list()?
        } else {
            Vec::new()
        };
        let having = if self.consume_keyword(Keyword::Having) {
            Some(self.parse_expression()?)
        } else {
            None
        };

        // Expand `*` now that every range variable is known.
        let mut select_list = Vec::with_capacity(items.len());
        for item in items {
            match &item.expr.kind {
                ExprKind::Asterisk { schema, table } => {
                    let expanded = expand_star(&from, schema.as_deref(), table.as_deref(), item.expr.span);
                    if expanded.is_empty() {
                        let name = table.clone().unwrap_or_else(|| String::from("*"));
                        return Err(self.error_at(ErrorKind::ColumnNotFound(name), item.expr.span));
                    }
                    select_list.extend(expanded);
                }
                _ => select_list.push(item),
            }
        }

        let aggregated = !group_by.is_empty();
        self.finish_specification(
            QuerySpecification {
                distinct,
                select_list,
                from,
                where_clause,
                group_by,
                having,
                aggregated,
                limit,
                depth: self.ctx.depth(),
            },
            start,
        )
    }

    fn finish_specification(&self, spec: QuerySpecification, start: usize) -> Result<QueryExpression> {
        let columns = spec
            .select_list
            .iter()
            .enumerate()
            .map(|(i, item)| OutputColumn {
                name: output_name(item, i),
                data_type: None,
            })
            .collect();
        Ok(QueryExpression {
            with: Vec::new(),
            depth: spec.depth,
            body: QueryBody::Select(Box::new(spec)),
            sort: SortAndSlice::default(),
            columns,
            span: self.span_from(start),
        })
    }

    /// `expr [[AS] alias]`, `*` or `t.*`.
    fn parse_select_item(&mut self) -> Result<SelectItem> {
        let token = self.current().clone();
        if token.kind == TokenKind::Star {
            self.advance();
            let (schema, table) = match token.qualifiers.as_slice() {
                [] => (None, None),
                [table] => (None, Some(table.clone())),
                [.., schema, table] => (Some(schema.clone()), Some(table.clone())),
            };
            return Ok(SelectItem {
                expr: Expr::new(ExprKind::Asterisk { schema, table }, token.span),
                alias: None,
            });
        }

        let expr = self.parse_expression()?;
        let alias = if self.consume_keyword(Keyword::As) {
            Some(self.expect_identifier()?)
        } else if self.is_identifier()
            && !(self.check_keyword(Keyword::Limit) && self.lookahead(Self::parse_limit_clause))
        {
            Some(self.expect_identifier()?)
        } else {
            None
        };
        Ok(SelectItem { expr, alias })
    }

    /// `TOP n` or `LIMIT offset count` right after SELECT.
    fn parse_select_clause_limit(&mut self) -> Result<Option<Limit>> {
        if !self.config.allow_limit_in_select_clause {
            return Ok(None);
        }
        let span = self.current().span;
        if self.check_keyword(Keyword::Top) && self.limit_bound_follows(1) {
            self.advance();
            let count = self.parse_limit_bound()?;
            return Ok(Some(Limit {
                offset: zero(span),
                count: Some(count),
            }));
        }
        if self.check_keyword(Keyword::Limit) && self.limit_bound_follows(1) && self.limit_bound_follows(2) {
            self.advance();
            let offset = self.parse_limit_bound()?;
            let count = self.parse_limit_bound()?;
            return Ok(Some(Limit {
                offset,
                count: Some(count),
            }));
        }
        Ok(None)
    }

    fn limit_bound_follows(&self, n: usize) -> bool {
        let token = self.cursor.peek(n);
        matches!(token.kind, TokenKind::Integer(_)) || token.is_host_parameter()
    }

    /// `ORDER BY ...` followed by any of the row limit forms.
    fn parse_sort_and_slice(&mut self, query: &QueryExpression) -> Result<SortAndSlice> {
        let mut sort = SortAndSlice::default();
        if self.consume_keyword(Keyword::Order) {
            self.expect_keyword(Keyword::By)?;
            loop {
                sort.order_by.push(self.parse_sort_item(query)?);
                if !self.consume(&TokenKind::Comma) {
                    break;
                }
            }
        }
        if self.starts_limit_clause() {
            sort.limit = Some(self.parse_limit_clause()?);
        }
        Ok(sort)
    }

    fn starts_limit_clause(&self) -> bool {
        matches!(
            self.current().as_keyword(),
            Some(Keyword::Limit | Keyword::Offset | Keyword::Fetch)
        )
    }

    /// `expr [ASC|DESC] [NULLS {FIRST|LAST}]`
    fn parse_sort_item(&mut self, query: &QueryExpression) -> Result<SortItem> {
        let expr = self.parse_expression()?;
        let descending = if self.consume_keyword(Keyword::Desc) {
            true
        } else {
            self.consume_keyword(Keyword::Asc);
            false
        };
        let nulls_last = if self.consume_keyword(Keyword::Nulls) {
            if self.consume_keyword(Keyword::First) {
                Some(false)
            } else {
                self.expect_keyword(Keyword::Last)?;
                Some(true)
            }
        } else {
            None
        };

        let output_column = match &expr.kind {
            ExprKind::Literal(Literal::Integer(n)) => {
                let n = *n;
                match usize::try_from(n) {
                    Ok(position) if (1..=query.degree()).contains(&position) => Some(position - 1),
                    _ => return Err(self.error_at(ErrorKind::InvalidOrderPosition(n), expr.span)),
                }
            }
            ExprKind::Column(column) if column.table.is_none() => {
                let matches: Vec<usize> = query
                    .columns
                    .iter()
                    .enumerate()
                    .filter(|(_, c)| c.name == column.name)
                    .map(|(i, _)| i)
                    .collect();
                match matches.as_slice() {
                    [] => None,
                    [i] => Some(*i),
                    _ if query.specification().is_some() => None,
                    _ => {
                        return Err(self.error_at(ErrorKind::AmbiguousColumn(column.name.clone()), expr.span));
                    }
                }
            }
            _ => None,
        };
        if output_column.is_none() && query.specification().is_none() {
            let text = expr.span.text(self.cursor.sql()).to_string();
            return Err(self.error_at(ErrorKind::ColumnNotFound(text), expr.span));
        }

        Ok(SortItem {
            expr,
            descending,
            nulls_last,
            output_column,
        })
    }

    /// `LIMIT c [OFFSET o]`, `LIMIT o c`, `OFFSET o [ROWS] [FETCH ...|LIMIT c]`
    /// or `FETCH {FIRST|NEXT} [c] {ROW|ROWS} ONLY`, normalized to an
    /// offset and an optional count.
    pub(crate) fn parse_limit_clause(&mut self) -> Result<Limit> {
        let span = self.current().span;
        match self.current().as_keyword() {
            Some(Keyword::Limit) => {
                self.advance();
                let first = self.parse_limit_bound()?;
                if self.consume_keyword(Keyword::Offset) {
                    let offset = self.parse_limit_bound()?;
                    return Ok(Limit {
                        offset,
                        count: Some(first),
                    });
                }
                if self.limit_bound_follows(0) {
                    let count = self.parse_limit_bound()?;
                    return Ok(Limit {
                        offset: first,
                        count: Some(count),
                    });
                }
                Ok(Limit {
                    offset: zero(span),
                    count: Some(first),
                })
            }
            Some(Keyword::Offset) => {
                self.advance();
                let offset = self.parse_limit_bound()?;
                if !self.consume_keyword(Keyword::Rows) {
                    self.consume_keyword(Keyword::Row);
                }
                let count = if self.check_keyword(Keyword::Fetch) {
                    Some(self.parse_fetch()?)
                } else if self.consume_keyword(Keyword::Limit) {
                    Some(self.parse_limit_bound()?)
                } else {
                    None
                };
                Ok(Limit { offset, count })
            }
            Some(Keyword::Fetch) => {
                let count = self.parse_fetch()?;
                Ok(Limit {
                    offset: zero(span),
                    count: Some(count),
                })
            }
            _ => Err(self.unexpected("LIMIT, OFFSET or FETCH")),
        }
    }

    /// `FETCH {FIRST|NEXT} [count] {ROW|ROWS} ONLY`; the count defaults to 1.
    fn parse_fetch(&mut self) -> Result<Expr> {
        self.expect_keyword(Keyword::Fetch)?;
        if !self.consume_keyword(Keyword::First) {
            self.expect_keyword(Keyword::Next)?;
        }
        let span = self.current().span;
        let count = if self.check_keyword(Keyword::Row) || self.check_keyword(Keyword::Rows) {
            Expr::literal(Literal::Integer(1), span)
        } else {
            self.parse_limit_bound()?
        };
        if !self.consume_keyword(Keyword::Rows) {
            self.expect_keyword(Keyword::Row)?;
        }
        self.expect_keyword(Keyword::Only)?;
        Ok(count)
    }

    /// A non-negative integer literal or a parameter typed INTEGER.
    fn parse_limit_bound(&mut self) -> Result<Expr> {
        let token = self.current().clone();
        match token.kind {
            TokenKind::Integer(n) if n >= 0 => {
                self.advance();
                Ok(Expr::literal(Literal::Integer(n), token.span))
            }
            TokenKind::Question | TokenKind::NamedParameter(_) => {
                let position = self.position();
                self.advance();
                let name = match token.kind {
                    TokenKind::NamedParameter(name) => Some(name),
                    _ => None,
                };
                let index = self.ctx.add_parameter(name, position, token.span);
                let data_type = self.ctx.pin_parameter(index, &DataType::Integer);
                let mut expr = Expr::new(ExprKind::Parameter(index), token.span);
                expr.data_type = Some(data_type);
                Ok(expr)
            }
            TokenKind::Eof => Err(self.unexpected("row count")),
            _ => {
                let text = token.span.text(self.cursor.sql()).to_string();
                Err(self.error(ErrorKind::InvalidLimit(text)))
            }
        }
    }

    /// A `TOP`/`SELECT LIMIT` slice of a lone specification applies to the
    /// whole query expression.
    fn hoist_select_limit(&self, query: &mut QueryExpression) -> Result<()> {
        let QueryBody::Select(spec) = &mut query.body else {
            return Ok(());
        };
        let Some(limit) = spec.limit.take() else {
            return Ok(());
        };
        if query.sort.limit.is_some() {
            return Err(self.error_at(
                ErrorKind::InvalidLimit(String::from("row limit given twice")),
                limit.offset.span,
            ));
        }
        query.sort.limit = Some(limit);
        Ok(())
    }
}

fn zero(span: Span) -> Expr {
    Expr::literal(Literal::Integer(0), span)
}

/// Output column name of the `index`-th select item.
fn output_name(item: &SelectItem, index: usize) -> String {
    if let Some(alias) = &item.alias {
        return alias.clone();
    }
    match &item.expr.kind {
        ExprKind::Column(column) => column.name.clone(),
        _ => format!("C{}", index + 1),
    }
}

/// Expands `*` (all ranges, merged columns once) or `t.*` (one range, all
/// columns) into pre-resolved column references.
fn expand_star(
    ranges: &[RangeVariable],
    schema: Option<&str>,
    table: Option<&str>,
    span: Span,
) -> Vec<SelectItem> {
    let mut items = Vec::new();
    for range in ranges {
        let qualified = match table {
            Some(table) => {
                if !range.matches_qualifier(schema, table) {
                    continue;
                }
                true
            }
            None => false,
        };
        for (i, column) in range.columns.iter().enumerate() {
            if column.merged && !qualified {
                continue;
            }
            let mut expr = Expr::column(range.exposed_name().map(str::to_string), column.name.clone(), span);
            if let ExprKind::Column(reference) = &mut expr.kind {
                reference.resolved = Some(ResolvedColumn {
                    range: range.index,
                    column: i,
                    depth: range.depth,
                });
            }
            expr.data_type.clone_from(&column.data_type);
            items.push(SelectItem { expr, alias: None });
        }
    }
    items
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{AllowAll, MemoryCatalog, TableDef};
    use crate::config::CompilerConfig;
    use crate::ast::QualifiedName;

    fn catalog() -> MemoryCatalog {
        MemoryCatalog::new()
            .with_table(
                TableDef::new(QualifiedName::new("PUBLIC", "T"))
                    .column("A", DataType::Integer)
                    .column("B", DataType::Varchar(Some(10))),
            )
            .with_table(TableDef::new(QualifiedName::new("PUBLIC", "U")).column("X", DataType::Integer))
    }

    fn parse(sql: &str) -> Result<QueryExpression> {
        let catalog = catalog();
        let config = CompilerConfig::default();
        let mut parser = Parser::new(sql, &catalog, &AllowAll, &config);
        parser.parse_query_expression()
    }

    fn bounds(query: &QueryExpression) -> (Option<i64>, Option<i64>) {
        let limit = query.sort.limit.as_ref().expect("limit");
        (
            limit.offset.as_integer(),
            limit.count.as_ref().and_then(Expr::as_integer),
        )
    }

    #[test]
    fn test_limit_forms_normalize() {
        for sql in [
            "SELECT a FROM t LIMIT 5 10",
            "SELECT a FROM t OFFSET 5 ROWS FETCH NEXT 10 ROWS ONLY",
            "SELECT a FROM t LIMIT 10 OFFSET 5",
            "SELECT a FROM t OFFSET 5 LIMIT 10",
            "SELECT LIMIT 5 10 a FROM t",
        ] {
            assert_eq!(bounds(&parse(sql).unwrap()), (Some(5), Some(10)), "{sql}");
        }
        assert_eq!(bounds(&parse("SELECT TOP 3 a FROM t").unwrap()), (Some(0), Some(3)));
        assert_eq!(
            bounds(&parse("SELECT a FROM t FETCH FIRST ROW ONLY").unwrap()),
            (Some(0), Some(1))
        );
    }

    #[test]
    fn test_invalid_limit() {
        let err = parse("SELECT a FROM t LIMIT 'x'").unwrap_err();
        assert!(matches!(err.kind, ErrorKind::InvalidLimit(_)));
        let err = parse("SELECT a FROM t OFFSET -1 ROWS").unwrap_err();
        assert!(matches!(err.kind, ErrorKind::InvalidLimit(_)));
    }

    #[test]
    fn test_limit_is_not_an_alias() {
        let query = parse("SELECT a LIMIT FROM t LIMIT 2").unwrap();
        assert_eq!(query.columns[0].name, "LIMIT");
        assert!(query.sort.limit.is_some());
    }

    #[test]
    fn test_union_column_count_mismatch() {
        let err = parse("SELECT a, b FROM t UNION SELECT x FROM u").unwrap_err();
        assert!(matches!(err.kind, ErrorKind::ColumnCountMismatch { expected: 2, found: 1 }));
    }

    #[test]
    fn test_intersect_binds_tighter() {
        let query = parse("SELECT a FROM t UNION SELECT x FROM u INTERSECT SELECT a FROM t").unwrap();
        let QueryBody::SetOperation(op) = &query.body else {
            panic!("expected set operation");
        };
        assert_eq!(op.operator, SetOperator::Union);
        assert!(matches!(
            &op.right.body,
            QueryBody::SetOperation(inner) if inner.operator == SetOperator::Intersect
        ));
    }

    #[test]
    fn test_corresponding_selects_common_columns() {
        let query = parse("SELECT a, b FROM t UNION CORRESPONDING SELECT b, a AS z FROM t").unwrap();
        let QueryBody::SetOperation(op) = &query.body else {
            panic!("expected set operation");
        };
        assert_eq!(op.left_columns, vec![1]);
        assert_eq!(op.right_columns, vec![0]);
        assert_eq!(query.degree(), 1);
    }

    #[test]
    fn test_star_expansion_and_output_names() {
        let query = parse("SELECT *, a + 1, b AS name FROM t").unwrap();
        let names: Vec<&str> = query.columns.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["A", "B", "C3", "NAME"]);
        assert!(parse("SELECT v.* FROM t").is_err());
    }

    #[test]
    fn test_order_by_position_and_name() {
        let query = parse("SELECT a, b FROM t ORDER BY 2 DESC, a").unwrap();
        assert_eq!(query.sort.order_by[0].output_column, Some(1));
        assert!(query.sort.order_by[0].descending);
        assert_eq!(query.sort.order_by[1].output_column, Some(0));

        let err = parse("SELECT a FROM t ORDER BY 3").unwrap_err();
        assert!(matches!(err.kind, ErrorKind::InvalidOrderPosition(3)));
        for (sql, position) in [
            ("SELECT a FROM t ORDER BY 0", 0),
            ("SELECT a FROM t ORDER BY -1", -1),
            ("SELECT a FROM t ORDER BY 9223372036854775807", i64::MAX),
        ] {
            let err = parse(sql).unwrap_err();
            assert_eq!(err.kind, ErrorKind::InvalidOrderPosition(position), "{sql}");
        }

        assert!(parse("SELECT a FROM t UNION SELECT x FROM u ORDER BY a + 1").is_err());
        assert!(parse("SELECT a FROM t UNION SELECT x FROM u ORDER BY 1").is_ok());
    }

    #[test]
    fn test_values_columns() {
        let query = parse("VALUES (1, 'a'), (2, 'b')").unwrap();
        assert_eq!(query.degree(), 2);
        assert_eq!(query.columns[1].name, "C2");
        assert!(parse("VALUES (1, 2), (3)").is_err());
    }

    #[test]
    fn test_with_clause_column_list() {
        let query = parse("WITH w (p, q) AS (SELECT a, b FROM t) SELECT p FROM w").unwrap();
        assert_eq!(query.with.len(), 1);
        let err = parse("WITH w (p) AS (SELECT a, b FROM t) SELECT p FROM w").unwrap_err();
        assert!(matches!(err.kind, ErrorKind::ColumnCountMismatch { expected: 1, found: 2 }));
    }
}
