//! FROM clause: table references, derived tables and joins.

use std::ops::Range;

use super::Parser;
use crate::ast::{
    Access, BinaryOp, DataType, Expr, ExprKind, JoinKind, ObjectKind, QualifiedName, RangeColumn,
    RangeSource, RangeVariable, ResolvedColumn, SubQueryKind,
};
use crate::error::{ErrorKind, Result};
use crate::lexer::{Keyword, Span, TokenKind};

impl<'a> Parser<'a> {
    /// `table_reference, table_reference, ...`
    pub(crate) fn parse_from_clause(&mut self) -> Result<Vec<RangeVariable>> {
        let mut ranges = Vec::new();
        loop {
            self.parse_joined_table(&mut ranges)?;
            if !self.consume(&TokenKind::Comma) {
                break;
            }
        }
        self.check_exposed_names(&ranges)?;
        Ok(ranges)
    }

    /// One comma-separated item: a primary followed by any number of joins.
    fn parse_joined_table(&mut self, ranges: &mut Vec<RangeVariable>) -> Result<()> {
        let group_start = ranges.len();
        self.parse_table_primary(ranges)?;
        if let Some(first) = ranges.get_mut(group_start) {
            first.join = JoinKind::Cross;
            first.boundary = true;
        }

        loop {
            let join_span = self.current().span;
            let natural = self.consume_keyword(Keyword::Natural);
            let join = match self.current().as_keyword() {
                Some(Keyword::Join) => JoinKind::Inner,
                Some(Keyword::Inner) => {
                    self.advance();
                    JoinKind::Inner
                }
                Some(kw @ (Keyword::Left | Keyword::Right | Keyword::Full)) => {
                    self.advance();
                    self.consume_keyword(Keyword::Outer);
                    match kw {
                        Keyword::Left => JoinKind::Left,
                        Keyword::Right => JoinKind::Right,
                        _ => JoinKind::Full,
                    }
                }
                Some(Keyword::Cross) if !natural => {
                    self.advance();
                    JoinKind::Cross
                }
                Some(Keyword::Union) if !natural && self.peek_keyword(1, Keyword::Join) => {
                    self.advance();
                    JoinKind::Union
                }
                _ if natural => return Err(self.unexpected("JOIN")),
                _ => break,
            };
            self.expect_keyword(Keyword::Join)?;

            let left = group_start..ranges.len();
            self.parse_table_primary(ranges)?;
            let right = left.end..ranges.len();
            if let Some(first) = ranges.get_mut(right.start) {
                first.join = join;
                first.boundary = false;
            }

            let (condition, using) = match join {
                JoinKind::Cross | JoinKind::Union => (None, Vec::new()),
                _ if natural => self.join_on_common_columns(ranges, &left, &right, None, join_span)?,
                _ if self.consume_keyword(Keyword::On) => (Some(self.parse_expression()?), Vec::new()),
                _ if self.consume_keyword(Keyword::Using) => {
                    let using_span = self.current().span;
                    let names = self.parse_paren_identifier_list()?;
                    self.join_on_common_columns(ranges, &left, &right, Some(&names), using_span)?
                }
                _ => return Err(self.unexpected("ON or USING")),
            };
            if let Some(first) = ranges.get_mut(right.start) {
                first.condition = condition;
                first.using = using;
                first.natural = natural;
                first.scope = group_start..right.end;
            }

            let (left_nullable, right_nullable) = match join {
                JoinKind::Left => (false, true),
                JoinKind::Right => (true, false),
                JoinKind::Full | JoinKind::Union => (true, true),
                JoinKind::Cross | JoinKind::Inner => (false, false),
            };
            if left_nullable {
                ranges[left].iter_mut().for_each(|r| r.null_supplying = true);
            }
            if right_nullable {
                ranges[right].iter_mut().for_each(|r| r.null_supplying = true);
            }
        }
        Ok(())
    }

    /// A table name, a derived table or a parenthesized join.
    fn parse_table_primary(&mut self, ranges: &mut Vec<RangeVariable>) -> Result<()> {
        if !self.check(&TokenKind::LeftParen) {
            let range = self.parse_named_table()?;
            ranges.push(range);
            return Ok(());
        }

        let before = ranges.len();
        if self.query_follows_parens() {
            match self.speculate(Self::parse_derived_table) {
                Ok(range) => {
                    ranges.push(range);
                    return Ok(());
                }
                Err(err) => {
                    // `((SELECT ...) AS d JOIN u ON ...)`
                    let joined = self.speculate(|p| p.parse_parenthesized_join(ranges));
                    return joined.map_err(|other| {
                        ranges.truncate(before);
                        err.deepest(other)
                    });
                }
            }
        }
        self.parse_parenthesized_join(ranges).map_err(|err| {
            ranges.truncate(before);
            err
        })
    }

    fn parse_parenthesized_join(&mut self, ranges: &mut Vec<RangeVariable>) -> Result<()> {
        self.expect(&TokenKind::LeftParen)?;
        self.parse_joined_table(ranges)?;
        self.expect(&TokenKind::RightParen)
    }

    /// `( query ) [AS] alias [(columns)]`
    fn parse_derived_table(&mut self) -> Result<RangeVariable> {
        let position = self.position();
        let span = self.current().span;
        let id = self.parse_subquery(SubQueryKind::Derived)?;
        let alias = self.parse_optional_alias()?;
        let names = if alias.is_some() && self.check(&TokenKind::LeftParen) {
            self.parse_paren_identifier_list()?
        } else {
            Vec::new()
        };
        self.rename_subquery_columns(id, &names, span)?;

        let columns = match self.ctx.subquery_mut(id) {
            Some(subquery) => {
                subquery.name.clone_from(&alias);
                subquery
                    .columns()
                    .iter()
                    .map(|c| range_column(&c.name, c.data_type.clone()))
                    .collect()
            }
            None => Vec::new(),
        };
        let mut range = new_range(RangeSource::SubQuery(id), None, alias, columns, position);
        self.ctx.register_range(&mut range);
        Ok(range)
    }

    /// A table, view, `WITH` name or trigger transition table, with an
    /// optional alias and column alias list.
    pub(crate) fn parse_named_table(&mut self) -> Result<RangeVariable> {
        let position = self.position();
        let token = self.current().clone();

        let local = if token.is_qualified() {
            None
        } else {
            token.identifier_text().map(str::to_string)
        };
        let named = local.as_deref().and_then(|n| self.ctx.find_named(n).cloned());
        let transition = local.as_deref().and_then(|n| {
            self.ctx
                .transitions()
                .iter()
                .find(|t| t.alias.as_deref() == Some(n) && matches!(t.source, RangeSource::Transition(_)))
                .cloned()
        });

        let (source, table_name, columns) = if let (Some(named), Some(name)) = (named, local.clone()) {
            self.advance();
            if named.pending {
                let columns = named.columns.iter().map(|c| range_column(c, None)).collect();
                (RangeSource::RecursiveReference(name.clone()), Some(QualifiedName::bare(name)), columns)
            } else {
                let columns = self
                    .ctx
                    .subquery(named.subquery)
                    .map(|s| {
                        s.columns()
                            .iter()
                            .map(|c| range_column(&c.name, c.data_type.clone()))
                            .collect()
                    })
                    .unwrap_or_default();
                (RangeSource::SubQuery(named.subquery), Some(QualifiedName::bare(name)), columns)
            }
        } else if let Some(transition) = transition {
            self.advance();
            (transition.source, transition.table_name, transition.columns)
        } else {
            let name = self.parse_qualified_name()?;
            let Some(table) = self.catalog.table(&name) else {
                return Err(self.error_at(ErrorKind::ObjectNotFound(name.to_string()), token.span));
            };
            let kind = if table.view {
                ObjectKind::View
            } else {
                ObjectKind::Table
            };
            let column_names: Vec<String> = table.columns.iter().map(|c| c.name.clone()).collect();
            let columns = table
                .columns
                .iter()
                .map(|c| range_column(&c.name, Some(c.data_type.clone())))
                .collect();
            if !self.authorizer.can_select(&name, &column_names) {
                return Err(self.error_at(ErrorKind::AccessDenied(format!("SELECT on {name}")), token.span));
            }
            self.ctx.add_reference(kind, name.clone(), Access::Read, position);
            (RangeSource::Table(name.clone()), Some(name), columns)
        };

        let alias = self.parse_optional_alias()?;
        let mut range = new_range(source, table_name, alias, columns, position);
        if range.alias.is_some() && self.check(&TokenKind::LeftParen) {
            let span = self.current().span;
            let names = self.parse_paren_identifier_list()?;
            if names.len() != range.columns.len() {
                return Err(self.error_at(
                    ErrorKind::ColumnCountMismatch {
                        expected: range.columns.len(),
                        found: names.len(),
                    },
                    span,
                ));
            }
            for (column, name) in range.columns.iter_mut().zip(names) {
                column.name = name;
            }
        }
        self.ctx.register_range(&mut range);
        Ok(range)
    }

    /// `[AS] name`. A bare `LIMIT` that starts a row limit is not an alias.
    pub(crate) fn parse_optional_alias(&mut self) -> Result<Option<String>> {
        if self.consume_keyword(Keyword::As) {
            return self.expect_identifier().map(Some);
        }
        if self.is_identifier()
            && !(self.check_keyword(Keyword::Limit) && self.lookahead(Self::parse_limit_clause))
        {
            return self.expect_identifier().map(Some);
        }
        Ok(None)
    }

    /// Builds the equi-join for NATURAL (common visible names) or USING
    /// (`names`) and hides the right-hand copies of the join columns.
    fn join_on_common_columns(
        &self,
        ranges: &mut [RangeVariable],
        left: &Range<usize>,
        right: &Range<usize>,
        names: Option<&[String]>,
        span: Span,
    ) -> Result<(Option<Expr>, Vec<String>)> {
        let names: Vec<String> = match names {
            Some(names) => names.to_vec(),
            None => {
                let mut common: Vec<String> = Vec::new();
                for range in &ranges[left.clone()] {
                    for column in range.columns.iter().filter(|c| !c.merged) {
                        let on_right = ranges[right.clone()]
                            .iter()
                            .any(|r| r.find_column(&column.name, false).is_some());
                        if on_right && !common.contains(&column.name) {
                            common.push(column.name.clone());
                        }
                    }
                }
                common
            }
        };

        let mut condition: Option<Expr> = None;
        for name in &names {
            let (lr, lc) = self.find_join_column(ranges, left, name, span)?;
            let (rr, rc) = self.find_join_column(ranges, right, name, span)?;
            let equal = Expr::binary(
                BinaryOp::Eq,
                join_column(&ranges[lr], lc, span),
                join_column(&ranges[rr], rc, span),
            );
            condition = Some(match condition {
                Some(previous) => Expr::and(previous, equal),
                None => equal,
            });
            ranges[rr].columns[rc].merged = true;
        }
        Ok((condition, names))
    }

    /// The single visible column `name` among `ranges[part]`.
    fn find_join_column(
        &self,
        ranges: &[RangeVariable],
        part: &Range<usize>,
        name: &str,
        span: Span,
    ) -> Result<(usize, usize)> {
        let mut found = None;
        for i in part.clone() {
            if let Some(column) = ranges[i].find_column(name, false) {
                if found.is_some() {
                    return Err(self.error_at(ErrorKind::AmbiguousColumn(name.to_string()), span));
                }
                found = Some((i, column));
            }
        }
        found.ok_or_else(|| self.error_at(ErrorKind::ColumnNotFound(name.to_string()), span))
    }

    /// Two range variables of one FROM clause may not share a name.
    fn check_exposed_names(&self, ranges: &[RangeVariable]) -> Result<()> {
        let conflict = |a: &RangeVariable, b: &RangeVariable| {
            a.exposed_name().is_some()
                && a.exposed_name() == b.exposed_name()
                && (a.alias.is_some() || b.alias.is_some() || a.table_name == b.table_name)
        };
        for (i, range) in ranges.iter().enumerate() {
            if ranges[..i].iter().any(|r| conflict(r, range)) {
                let name = range.exposed_name().unwrap_or_default().to_string();
                let span = self.cursor.span_from(range.position);
                return Err(self.error_at(ErrorKind::DuplicateName(name), span));
            }
        }
        Ok(())
    }
}

fn range_column(name: &str, data_type: Option<DataType>) -> RangeColumn {
    RangeColumn {
        name: name.to_string(),
        data_type,
        merged: false,
    }
}

pub(crate) fn new_range(
    source: RangeSource,
    table_name: Option<QualifiedName>,
    alias: Option<String>,
    columns: Vec<RangeColumn>,
    position: usize,
) -> RangeVariable {
    RangeVariable {
        index: 0,
        source,
        table_name,
        alias,
        columns,
        join: JoinKind::Cross,
        condition: None,
        boundary: true,
        natural: false,
        using: Vec::new(),
        scope: 0..0,
        null_supplying: false,
        position,
        depth: 0,
    }
}

/// A pre-resolved reference to column `column` of `range`.
fn join_column(range: &RangeVariable, column: usize, span: Span) -> Expr {
    let data = &range.columns[column];
    let mut expr = Expr::column(range.exposed_name().map(str::to_string), data.name.clone(), span);
    if let ExprKind::Column(reference) = &mut expr.kind {
        reference.resolved = Some(ResolvedColumn {
            range: range.index,
            column,
            depth: range.depth,
        });
    }
    expr.data_type.clone_from(&data.data_type);
    expr
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{AllowAll, Authorizer, MemoryCatalog, TableDef};
    use crate::config::CompilerConfig;

    fn catalog() -> MemoryCatalog {
        MemoryCatalog::new()
            .with_table(
                TableDef::new(QualifiedName::new("PUBLIC", "A"))
                    .column("K", DataType::Integer)
                    .column("X", DataType::Integer),
            )
            .with_table(
                TableDef::new(QualifiedName::new("PUBLIC", "B"))
                    .column("K", DataType::Integer)
                    .column("Y", DataType::Integer),
            )
            .with_table(
                TableDef::new(QualifiedName::new("PUBLIC", "C"))
                    .column("K", DataType::Integer)
                    .column("Z", DataType::Integer),
            )
    }

    fn parse_with(sql: &str, authorizer: &dyn Authorizer) -> Result<Vec<RangeVariable>> {
        let catalog = catalog();
        let config = CompilerConfig::default();
        let mut parser = Parser::new(sql, &catalog, authorizer, &config);
        parser.parse_from_clause()
    }

    fn parse(sql: &str) -> Result<Vec<RangeVariable>> {
        parse_with(sql, &AllowAll)
    }

    #[test]
    fn test_comma_items_start_groups() {
        let ranges = parse("a, b x").unwrap();
        assert_eq!(ranges.len(), 2);
        assert!(ranges.iter().all(|r| r.boundary));
        assert_eq!(ranges[1].alias.as_deref(), Some("X"));
        assert_eq!(ranges[1].index, 1);
    }

    #[test]
    fn test_natural_join_merges_common_column() {
        let ranges = parse("a NATURAL JOIN b").unwrap();
        assert!(ranges[1].natural);
        assert_eq!(ranges[1].using, vec!["K".to_string()]);
        assert!(ranges[1].columns[0].merged);
        assert!(!ranges[0].columns[0].merged);
        assert!(matches!(
            ranges[1].condition.as_ref().map(|c| &c.kind),
            Some(ExprKind::Binary { op: BinaryOp::Eq, .. })
        ));
    }

    #[test]
    fn test_using_requires_column_on_both_sides() {
        assert!(parse("a JOIN b USING (k)").is_ok());
        let err = parse("a JOIN b USING (x)").unwrap_err();
        assert!(matches!(err.kind, ErrorKind::ColumnNotFound(_)));
        let err = parse("a JOIN b ON a.k = b.k JOIN c USING (k)").unwrap_err();
        assert!(matches!(err.kind, ErrorKind::AmbiguousColumn(_)));
    }

    #[test]
    fn test_outer_joins_mark_null_supplying_side() {
        let ranges = parse("a LEFT JOIN b ON a.k = b.k").unwrap();
        assert!(!ranges[0].null_supplying && ranges[1].null_supplying);
        let ranges = parse("a RIGHT OUTER JOIN b ON a.k = b.k").unwrap();
        assert!(ranges[0].null_supplying && !ranges[1].null_supplying);
        let ranges = parse("a FULL JOIN b ON a.k = b.k").unwrap();
        assert!(ranges.iter().all(|r| r.null_supplying));
    }

    #[test]
    fn test_parenthesized_join_is_flattened() {
        let ranges = parse("a JOIN (b JOIN c ON b.k = c.k) ON a.k = b.k").unwrap();
        assert_eq!(ranges.len(), 3);
        assert_eq!(ranges[1].join, JoinKind::Inner);
        assert!(ranges[2].condition.is_some());
    }

    #[test]
    fn test_join_condition_scope_stops_at_its_right_operand() {
        let ranges = parse("a JOIN b ON a.k = b.k JOIN c ON c.k = a.k, a a2").unwrap();
        assert_eq!(ranges[1].scope, 0..2);
        assert_eq!(ranges[2].scope, 0..3);
        assert!(ranges[3].condition.is_none());

        let ranges = parse("a JOIN (b JOIN c ON b.k = c.k) ON a.k = c.k").unwrap();
        assert_eq!(ranges[1].scope, 0..3);
        assert_eq!(ranges[2].scope, 1..3);
    }

    #[test]
    fn test_registered_ranges_match_the_from_list() {
        let catalog = catalog();
        let config = CompilerConfig::default();
        let mut parser = Parser::new("a LEFT JOIN b bb ON a.k = bb.k, c", &catalog, &AllowAll, &config);
        let ranges = parser.parse_from_clause().unwrap();
        let registered = parser.context().ranges();
        assert_eq!(registered.len(), ranges.len());
        for (entry, range) in registered.iter().zip(&ranges) {
            assert_eq!(entry.index, range.index);
            assert_eq!(entry.name.as_deref(), range.exposed_name());
            assert_eq!(entry.position, range.position);
        }
    }

    #[test]
    fn test_derived_table_with_column_aliases() {
        let ranges = parse("(SELECT k, x FROM a) AS d (p, q)").unwrap();
        assert_eq!(ranges[0].alias.as_deref(), Some("D"));
        let names: Vec<&str> = ranges[0].columns.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["P", "Q"]);
        let err = parse("(SELECT k, x FROM a) AS d (p)").unwrap_err();
        assert!(matches!(err.kind, ErrorKind::ColumnCountMismatch { .. }));
    }

    #[test]
    fn test_duplicate_exposed_names() {
        let err = parse("a, b a").unwrap_err();
        assert!(matches!(err.kind, ErrorKind::DuplicateName(_)));
        assert!(parse("a, a").is_err());
        assert!(parse("a, a a2").is_ok());
    }

    #[test]
    fn test_missing_table_and_access() {
        let err = parse("missing").unwrap_err();
        assert!(matches!(err.kind, ErrorKind::ObjectNotFound(_)));

        struct NoSelect;
        impl Authorizer for NoSelect {
            fn can_select(&self, _: &QualifiedName, _: &[String]) -> bool {
                false
            }
        }
        let err = parse_with("a", &NoSelect).unwrap_err();
        assert!(matches!(err.kind, ErrorKind::AccessDenied(_)));
    }
}
