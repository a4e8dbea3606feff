//! Subquery registration and materialization order.

use tracing::trace;

use super::Parser;
use crate::ast::{
    Expr, QueryBody, QueryExpression, RangeSource, SubQuery, SubQueryId, SubQueryKind,
};
use crate::error::{ErrorKind, Result};
use crate::lexer::TokenKind;

impl<'a> Parser<'a> {
    /// Parses `( query )`, registering it as a subquery of `kind`.
    ///
    /// The slot is reserved when the opening bracket is read, so ids follow
    /// the order in which subqueries begin in the text.
    pub(crate) fn parse_subquery(&mut self, kind: SubQueryKind) -> Result<SubQueryId> {
        let id = self.open_subquery(kind)?;
        self.close_subquery(id)?;
        Ok(id)
    }

    /// Reads `(`, enters a nesting level and reserves a slot.
    pub(crate) fn open_subquery(&mut self, kind: SubQueryKind) -> Result<SubQueryId> {
        let position = self.position();
        let span = self.current().span;
        self.expect(&TokenKind::LeftParen)?;
        let depth = self.ctx.enter_subquery();
        if depth > self.config.max_nesting_depth {
            return Err(self.error_at(ErrorKind::NestingTooDeep(self.config.max_nesting_depth), span));
        }
        let id = self.ctx.reserve_subquery(kind, position, span);
        trace!(id = id.0, ?kind, depth, "subquery opened");
        Ok(id)
    }

    /// Parses the body and the closing bracket of a reserved subquery.
    pub(crate) fn close_subquery(&mut self, id: SubQueryId) -> Result<()> {
        let start = self.position();
        let query = self.parse_query_expression()?;
        self.expect(&TokenKind::RightParen)?;
        let span = self.span_from(start);
        self.ctx.finish_subquery(id, query, span);
        self.ctx.leave_subquery();
        Ok(())
    }
}

/// Subqueries a query reads directly: those in its expressions, its FROM
/// items and its nested bodies, and the CTEs it declares.
pub(crate) fn direct_dependencies(query: &QueryExpression) -> Vec<SubQueryId> {
    let mut ids = Vec::new();
    collect_query(query, &mut ids);
    ids.sort_unstable();
    ids.dedup();
    ids
}

fn collect_query(query: &QueryExpression, ids: &mut Vec<SubQueryId>) {
    ids.extend(query.with.iter().copied());
    collect_body(&query.body, ids);
    for item in &query.sort.order_by {
        collect_expr(&item.expr, ids);
    }
    if let Some(limit) = &query.sort.limit {
        collect_expr(&limit.offset, ids);
        if let Some(count) = &limit.count {
            collect_expr(count, ids);
        }
    }
}

fn collect_body(body: &QueryBody, ids: &mut Vec<SubQueryId>) {
    match body {
        QueryBody::Select(spec) => {
            for item in &spec.select_list {
                collect_expr(&item.expr, ids);
            }
            for range in &spec.from {
                if let RangeSource::SubQuery(id) = range.source {
                    ids.push(id);
                }
                if let Some(condition) = &range.condition {
                    collect_expr(condition, ids);
                }
            }
            for expr in spec
                .where_clause
                .iter()
                .chain(&spec.group_by)
                .chain(spec.having.iter())
            {
                collect_expr(expr, ids);
            }
        }
        QueryBody::Values(rows) => {
            for row in rows {
                collect_expr(row, ids);
            }
        }
        QueryBody::SetOperation(op) => {
            collect_query(&op.left, ids);
            collect_query(&op.right, ids);
        }
        QueryBody::Nested(inner) => collect_query(inner, ids),
    }
}

fn collect_expr(expr: &Expr, ids: &mut Vec<SubQueryId>) {
    ids.extend(expr.subqueries());
}

/// Order in which the statement's subqueries must be materialized: every
/// subquery after the ones it depends on. Among independent subqueries the
/// deeper one comes first, then the later one.
pub(crate) fn materialization_order(subqueries: &[SubQuery]) -> Vec<SubQueryId> {
    let key = |id: &SubQueryId| {
        let depth = subqueries.get(id.0).map_or(0, |s| s.depth);
        (std::cmp::Reverse(depth), std::cmp::Reverse(*id))
    };

    let mut roots: Vec<SubQueryId> = subqueries.iter().map(|s| s.id).collect();
    roots.sort_by_key(key);

    let mut emitted = vec![false; subqueries.len()];
    let mut visiting = vec![false; subqueries.len()];
    let mut order = Vec::with_capacity(subqueries.len());
    for root in roots {
        visit(root, subqueries, &key, &mut emitted, &mut visiting, &mut order);
    }
    order
}

fn visit<K: Ord>(
    id: SubQueryId,
    subqueries: &[SubQuery],
    key: &impl Fn(&SubQueryId) -> K,
    emitted: &mut [bool],
    visiting: &mut [bool],
    order: &mut Vec<SubQueryId>,
) {
    let Some(subquery) = subqueries.get(id.0) else {
        return;
    };
    // A recursive CTE lists itself through its own body.
    if emitted[id.0] || visiting[id.0] {
        return;
    }
    visiting[id.0] = true;
    let mut dependencies = subquery.dependencies.clone();
    dependencies.sort_by_key(key);
    for dependency in dependencies {
        visit(dependency, subqueries, key, emitted, visiting, order);
    }
    visiting[id.0] = false;
    emitted[id.0] = true;
    order.push(id);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::Span;

    fn subquery(id: usize, depth: u32, dependencies: &[usize]) -> SubQuery {
        SubQuery {
            id: SubQueryId(id),
            kind: SubQueryKind::Scalar,
            depth,
            name: None,
            query: QueryExpression::default(),
            correlated: false,
            position: id,
            span: Span::default(),
            dependencies: dependencies.iter().map(|&d| SubQueryId(d)).collect(),
            resolved: false,
        }
    }

    #[test]
    fn dependencies_come_first() {
        // 0 contains 1, which contains 2.
        let subqueries = vec![subquery(0, 1, &[1]), subquery(1, 2, &[2]), subquery(2, 3, &[])];
        assert_eq!(
            materialization_order(&subqueries),
            vec![SubQueryId(2), SubQueryId(1), SubQueryId(0)]
        );
    }

    #[test]
    fn deeper_then_later_subqueries_first() {
        let subqueries = vec![subquery(0, 1, &[]), subquery(1, 1, &[]), subquery(2, 2, &[])];
        assert_eq!(
            materialization_order(&subqueries),
            vec![SubQueryId(2), SubQueryId(1), SubQueryId(0)]
        );
    }

    #[test]
    fn cte_used_twice_is_emitted_once() {
        // 0 is a CTE read by derived tables 1 and 2.
        let subqueries = vec![subquery(0, 1, &[]), subquery(1, 1, &[0]), subquery(2, 1, &[0])];
        let order = materialization_order(&subqueries);
        assert_eq!(order, vec![SubQueryId(0), SubQueryId(2), SubQueryId(1)]);
    }

    #[test]
    fn self_reference_terminates() {
        let subqueries = vec![subquery(0, 1, &[0])];
        assert_eq!(materialization_order(&subqueries), vec![SubQueryId(0)]);
    }
}
