//! Value expressions, predicates and row value constructors.

use super::pratt::{
    infix_binding_power, prefix_binding_power, token_to_binary_op, token_to_unary_op,
    COMPARISON_BP,
};
use super::Parser;
use crate::ast::{
    BinaryOp, DataType, Expr, ExprKind, Literal, MatchType, Quantifier, SubQueryKind, UnaryOp,
};
use crate::error::{ErrorKind, Result};
use crate::lexer::{Keyword, Span, Token, TokenKind};

impl<'a> Parser<'a> {
    /// Parses a complete expression, boolean or value.
    pub(crate) fn parse_expression(&mut self) -> Result<Expr> {
        self.parse_expression_bp(0)
    }

    /// Parses a comma-separated list of expressions.
    pub(crate) fn parse_expression_list(&mut self) -> Result<Vec<Expr>> {
        let mut exprs = vec![self.parse_expression()?];
        while self.consume(&TokenKind::Comma) {
            exprs.push(self.parse_expression()?);
        }
        Ok(exprs)
    }

    /// Parses an expression using Pratt parsing.
    ///
    /// Every nested expression passes through here, so this is where the
    /// expression depth limit is enforced.
    pub(crate) fn parse_expression_bp(&mut self, min_bp: u8) -> Result<Expr> {
        if self.expression_depth >= self.config.max_expression_depth {
            let limit = self.config.max_expression_depth;
            return Err(self.error_at(ErrorKind::NestingTooDeep(limit), self.current().span));
        }
        self.expression_depth += 1;
        let result = self.parse_operators(min_bp);
        self.expression_depth -= 1;
        result
    }

    fn parse_operators(&mut self, min_bp: u8) -> Result<Expr> {
        let mut lhs = self.parse_prefix()?;

        loop {
            let Some((l_bp, r_bp)) = infix_binding_power(&self.current().kind) else {
                break;
            };
            if l_bp < min_bp {
                break;
            }

            lhs = match &self.current().kind {
                TokenKind::Keyword(Keyword::Is) => self.parse_is(lhs, r_bp)?,
                TokenKind::Keyword(Keyword::Not) => {
                    // Only NOT IN / NOT LIKE / NOT BETWEEN continue an expression.
                    if !matches!(
                        self.cursor.peek(1).as_keyword(),
                        Some(Keyword::In | Keyword::Like | Keyword::Between)
                    ) {
                        break;
                    }
                    self.advance();
                    self.parse_predicate(lhs, true, r_bp)?
                }
                TokenKind::Keyword(
                    Keyword::In | Keyword::Like | Keyword::Between | Keyword::Match | Keyword::Overlaps,
                ) => self.parse_predicate(lhs, false, r_bp)?,
                kind => {
                    let Some(op) = token_to_binary_op(kind) else {
                        break;
                    };
                    self.advance();
                    if op.is_comparison() && self.starts_quantifier() {
                        self.parse_quantified(lhs, op)?
                    } else {
                        let rhs = self.parse_expression_bp(r_bp)?;
                        Expr::binary(op, lhs, rhs)
                    }
                }
            };
        }

        Ok(lhs)
    }

    /// Parses a prefix expression.
    fn parse_prefix(&mut self) -> Result<Expr> {
        let Some(bp) = prefix_binding_power(&self.current().kind) else {
            return self.parse_primary();
        };
        let start = self.position();
        let op = self.advance();
        let operand = self.parse_expression_bp(bp)?;
        let span = self.span_from(start);

        Ok(match token_to_unary_op(&op.kind) {
            None => operand,
            Some(UnaryOp::Neg) => match operand.kind {
                // Fold negative literals so bounds and defaults stay literals.
                ExprKind::Literal(Literal::Integer(n)) => {
                    Expr::literal(Literal::Integer(-n), span)
                }
                ExprKind::Literal(Literal::Decimal(text)) => {
                    Expr::literal(Literal::Decimal(format!("-{text}")), span)
                }
                ExprKind::Literal(Literal::Float(f)) => Expr::literal(Literal::Float(-f), span),
                kind => Expr::new(
                    ExprKind::Unary {
                        op: UnaryOp::Neg,
                        operand: Box::new(Expr { kind, ..operand }),
                    },
                    span,
                ),
            },
            Some(UnaryOp::Not) => {
                let mut not = Expr::not(operand);
                not.span = span;
                not
            }
        })
    }

    /// Parses a primary expression.
    fn parse_primary(&mut self) -> Result<Expr> {
        let token = self.current().clone();
        let span = token.span;

        match &token.kind {
            // Literals
            TokenKind::Integer(n) => {
                self.advance();
                Ok(Expr::literal(Literal::Integer(*n), span))
            }
            TokenKind::Decimal(text) => {
                self.advance();
                Ok(Expr::literal(Literal::Decimal(text.clone()), span))
            }
            TokenKind::Float(f) => {
                self.advance();
                Ok(Expr::literal(Literal::Float(*f), span))
            }
            TokenKind::String(s) => {
                self.advance();
                Ok(Expr::literal(Literal::String(s.clone()), span))
            }
            TokenKind::Blob(b) => {
                self.advance();
                Ok(Expr::literal(Literal::Binary(b.clone()), span))
            }
            TokenKind::Keyword(Keyword::True) => {
                self.advance();
                Ok(Expr::literal(Literal::Boolean(true), span))
            }
            TokenKind::Keyword(Keyword::False) => {
                self.advance();
                Ok(Expr::literal(Literal::Boolean(false), span))
            }
            TokenKind::Keyword(Keyword::Null) => {
                self.advance();
                Ok(Expr::null(span))
            }
            TokenKind::Keyword(kw @ (Keyword::Date | Keyword::Time | Keyword::Timestamp))
                if matches!(self.cursor.peek(1).kind, TokenKind::String(_)) =>
            {
                let data_type = match kw {
                    Keyword::Date => DataType::Date,
                    Keyword::Time => DataType::Time,
                    _ => DataType::Timestamp,
                };
                let start = self.position();
                self.advance();
                let text = self.parse_string()?;
                Ok(Expr::literal(Literal::Typed { data_type, text }, self.span_from(start)))
            }

            // Parameter placeholders
            TokenKind::Question => {
                let position = self.position();
                self.advance();
                let index = self.ctx.add_parameter(None, position, span);
                Ok(Expr::new(ExprKind::Parameter(index), span))
            }
            TokenKind::NamedParameter(name) => {
                let position = self.position();
                self.advance();
                let index = self.ctx.add_parameter(Some(name.clone()), position, span);
                Ok(Expr::new(ExprKind::Parameter(index), span))
            }

            // Parenthesized expression, row value or subquery
            TokenKind::LeftParen => {
                if self.query_follows_parens() {
                    self.first_of(&[&Self::parse_scalar_subquery, &Self::parse_parenthesized])
                } else {
                    self.parse_parenthesized()
                }
            }

            TokenKind::Keyword(Keyword::Row) => {
                self.advance();
                let start = self.position();
                self.expect(&TokenKind::LeftParen)?;
                let items = self.parse_expression_list()?;
                self.expect(&TokenKind::RightParen)?;
                Ok(Expr::new(ExprKind::Row(items), span.merge(self.span_from(start))))
            }

            TokenKind::Keyword(Keyword::Exists) => {
                self.advance();
                let id = self.parse_subquery(SubQueryKind::Exists)?;
                Ok(Expr::new(ExprKind::Exists(id), self.span_from_token(span)))
            }
            TokenKind::Keyword(Keyword::Unique)
                if matches!(self.cursor.peek(1).kind, TokenKind::LeftParen) =>
            {
                self.advance();
                let id = self.parse_subquery(SubQueryKind::Unique)?;
                Ok(Expr::new(ExprKind::Unique(id), self.span_from_token(span)))
            }

            TokenKind::Keyword(Keyword::Default) => {
                if !self.ctx.contextually_typed() {
                    return Err(self.error(ErrorKind::InvalidDefinition(String::from(
                        "DEFAULT is not allowed here",
                    ))));
                }
                self.advance();
                Ok(Expr::new(ExprKind::Default, span))
            }

            TokenKind::Keyword(Keyword::Value)
                if !token.is_qualified() && self.ctx.domain().is_some() =>
            {
                self.advance();
                let mut expr = Expr::new(ExprKind::DomainValue, span);
                expr.data_type = self.ctx.domain().cloned();
                Ok(expr)
            }

            TokenKind::Keyword(Keyword::Case) => self.parse_special_function(),

            TokenKind::Keyword(
                Keyword::Cast
                | Keyword::Coalesce
                | Keyword::Nullif
                | Keyword::Extract
                | Keyword::Substring
                | Keyword::Position
                | Keyword::Trim
                | Keyword::CurrentDate
                | Keyword::CurrentTime
                | Keyword::CurrentTimestamp
                | Keyword::CurrentUser
                | Keyword::SessionUser
                | Keyword::Localtime
                | Keyword::Localtimestamp
                | Keyword::Left
                | Keyword::Right
                | Keyword::Some
                | Keyword::Any,
            ) if !token.is_qualified()
                && (is_niladic(&token) || matches!(self.cursor.peek(1).kind, TokenKind::LeftParen)) =>
            {
                self.parse_special_function()
            }

            TokenKind::Keyword(Keyword::Next | Keyword::Current)
                if !token.is_qualified()
                    && self.peek_keyword(1, Keyword::Value)
                    && self.peek_keyword(2, Keyword::For) =>
            {
                self.parse_sequence_value()
            }

            TokenKind::Star => Err(self.unexpected("expression")),

            _ if token.identifier_text().is_some() => {
                if matches!(self.cursor.peek(1).kind, TokenKind::LeftParen) {
                    self.parse_function()
                } else {
                    self.advance();
                    Ok(column_from_token(&token))
                }
            }

            _ => Err(self.unexpected("expression")),
        }
    }

    /// Span from the token at `span` through the last consumed token.
    fn span_from_token(&self, span: Span) -> Span {
        span.merge(self.cursor.previous().span)
    }

    /// `( expr )` or `( expr, expr, ... )`.
    fn parse_parenthesized(&mut self) -> Result<Expr> {
        let start = self.position();
        self.expect(&TokenKind::LeftParen)?;
        let mut items = self.parse_expression_list()?;
        self.expect(&TokenKind::RightParen)?;
        let span = self.span_from(start);
        if items.len() == 1 {
            let mut inner = items.remove(0);
            inner.span = span;
            Ok(inner)
        } else {
            Ok(Expr::new(ExprKind::Row(items), span))
        }
    }

    /// `( query )` used as a value.
    fn parse_scalar_subquery(&mut self) -> Result<Expr> {
        let start = self.position();
        let id = self.parse_subquery(SubQueryKind::Scalar)?;
        Ok(Expr::new(ExprKind::SubQuery(id), self.span_from(start)))
    }

    fn starts_quantifier(&self) -> bool {
        matches!(
            self.current().as_keyword(),
            Some(Keyword::Any | Keyword::Some | Keyword::All)
        ) && matches!(self.cursor.peek(1).kind, TokenKind::LeftParen)
    }

    /// `lhs op {ANY|SOME|ALL} (subquery)`
    fn parse_quantified(&mut self, lhs: Expr, op: BinaryOp) -> Result<Expr> {
        let quantifier = if self.consume_keyword(Keyword::All) {
            Quantifier::All
        } else {
            self.advance();
            Quantifier::Any
        };
        let id = self.parse_subquery(SubQueryKind::Quantified)?;
        let span = self.span_from_token(lhs.span);
        Ok(Expr::new(
            ExprKind::Quantified {
                op,
                quantifier,
                operand: Box::new(lhs),
                subquery: id,
            },
            span,
        ))
    }

    /// `IS [NOT] {NULL | TRUE | FALSE | UNKNOWN | DISTINCT FROM expr}`
    fn parse_is(&mut self, lhs: Expr, r_bp: u8) -> Result<Expr> {
        self.expect_keyword(Keyword::Is)?;
        let negated = self.consume_keyword(Keyword::Not);
        let kind = match self.current().as_keyword() {
            Some(Keyword::Null) => {
                self.advance();
                ExprKind::IsNull {
                    operand: Box::new(lhs.clone()),
                    negated,
                }
            }
            Some(kw @ (Keyword::True | Keyword::False | Keyword::Unknown)) => {
                self.advance();
                let value = match kw {
                    Keyword::True => Some(true),
                    Keyword::False => Some(false),
                    _ => None,
                };
                ExprKind::IsTruth {
                    operand: Box::new(lhs.clone()),
                    value,
                    negated,
                }
            }
            Some(Keyword::Distinct) => {
                self.advance();
                self.expect_keyword(Keyword::From)?;
                let rhs = self.parse_expression_bp(r_bp)?;
                ExprKind::IsDistinctFrom {
                    left: Box::new(lhs.clone()),
                    right: Box::new(rhs),
                    negated,
                }
            }
            _ => return Err(self.unexpected("NULL, TRUE, FALSE, UNKNOWN or DISTINCT")),
        };
        Ok(Expr::new(kind, self.span_from_token(lhs.span)))
    }

    /// `[NOT] {IN | LIKE | BETWEEN}`, `MATCH` and `OVERLAPS`. A leading
    /// NOT has already been consumed when `negated` is set.
    fn parse_predicate(&mut self, lhs: Expr, negated: bool, r_bp: u8) -> Result<Expr> {
        let keyword = self.advance().as_keyword();
        let predicate = match keyword {
            Some(Keyword::In) => self.parse_in(lhs, negated)?,
            Some(Keyword::Like) => self.parse_like(lhs, negated, r_bp)?,
            Some(Keyword::Between) => self.parse_between(lhs, negated)?,
            Some(Keyword::Match) => self.parse_match(lhs)?,
            Some(Keyword::Overlaps) => self.parse_overlaps(lhs, r_bp)?,
            _ => return Err(self.unexpected("predicate")),
        };
        Ok(predicate)
    }

    /// `IN (subquery)` becomes `= ANY`; `IN (value, ...)` stays a list.
    fn parse_in(&mut self, lhs: Expr, negated: bool) -> Result<Expr> {
        if !self.check(&TokenKind::LeftParen) {
            return Err(self.unexpected("("));
        }
        if !self.query_follows_parens() {
            let list = self.parse_in_list(&lhs)?;
            return Ok(self.in_list(lhs, list, negated));
        }
        let id = match self.speculate(|p| p.parse_subquery(SubQueryKind::In)) {
            Ok(id) => id,
            Err(err) => {
                // `IN ((SELECT ...), 2)` is a value list.
                let list = self
                    .speculate(|p| p.parse_in_list(&lhs))
                    .map_err(|other| err.deepest(other))?;
                return Ok(self.in_list(lhs, list, negated));
            }
        };

        let span = self.span_from_token(lhs.span);
        let quantified = Expr::new(
            ExprKind::Quantified {
                op: BinaryOp::Eq,
                quantifier: Quantifier::Any,
                operand: Box::new(lhs),
                subquery: id,
            },
            span,
        );
        Ok(if negated {
            Expr::not(quantified)
        } else {
            quantified
        })
    }

    fn in_list(&self, lhs: Expr, list: Vec<Expr>, negated: bool) -> Expr {
        let span = self.span_from_token(lhs.span);
        Expr::new(
            ExprKind::InList {
                operand: Box::new(lhs),
                list,
                negated,
            },
            span,
        )
    }

    /// `( value, value, ... )`, each of the operand's degree.
    fn parse_in_list(&mut self, lhs: &Expr) -> Result<Vec<Expr>> {
        self.expect(&TokenKind::LeftParen)?;
        let list = self.parse_expression_list()?;
        self.expect(&TokenKind::RightParen)?;

        let expected = row_degree(lhs);
        for item in &list {
            let found = row_degree(item);
            if found != expected && !matches!(item.kind, ExprKind::SubQuery(_)) {
                return Err(self.error_at(ErrorKind::DegreeMismatch { expected, found }, item.span));
            }
        }
        Ok(list)
    }

    /// `LIKE pattern [ESCAPE char]`
    fn parse_like(&mut self, lhs: Expr, negated: bool, r_bp: u8) -> Result<Expr> {
        let pattern = self.parse_expression_bp(r_bp)?;
        let escape = if self.consume_keyword(Keyword::Escape) {
            let escape = self.parse_expression_bp(r_bp)?;
            if let ExprKind::Literal(Literal::String(s)) = &escape.kind {
                if s.chars().count() != 1 {
                    return Err(self.error_at(ErrorKind::InvalidEscape(s.clone()), escape.span));
                }
            }
            Some(Box::new(escape))
        } else {
            None
        };
        let span = self.span_from_token(lhs.span);
        Ok(Expr::new(
            ExprKind::Like {
                operand: Box::new(lhs),
                pattern: Box::new(pattern),
                escape,
                negated,
            },
            span,
        ))
    }

    /// `BETWEEN [ASYMMETRIC|SYMMETRIC] low AND high`, rewritten into
    /// comparisons.
    fn parse_between(&mut self, lhs: Expr, negated: bool) -> Result<Expr> {
        let symmetric = if self.consume_keyword(Keyword::Symmetric) {
            true
        } else {
            self.consume_keyword(Keyword::Asymmetric);
            false
        };
        // Bounds bind tighter than AND.
        let low = self.parse_expression_bp(COMPARISON_BP + 2)?;
        self.expect_keyword(Keyword::And)?;
        let high = self.parse_expression_bp(COMPARISON_BP + 2)?;

        let range = |low: Expr, high: Expr| {
            Expr::and(
                Expr::binary(BinaryOp::GtEq, lhs.clone(), low),
                Expr::binary(BinaryOp::LtEq, lhs.clone(), high),
            )
        };
        let mut rewritten = if symmetric {
            Expr::or(range(low.clone(), high.clone()), range(high, low))
        } else {
            range(low, high)
        };
        rewritten.span = self.span_from_token(lhs.span);
        Ok(if negated {
            Expr::not(rewritten)
        } else {
            rewritten
        })
    }

    /// `MATCH [UNIQUE] [SIMPLE|PARTIAL|FULL] (subquery)`
    fn parse_match(&mut self, lhs: Expr) -> Result<Expr> {
        let unique = self.consume_keyword(Keyword::Unique);
        let match_type = if self.consume_keyword(Keyword::Partial) {
            MatchType::Partial
        } else if self.consume_keyword(Keyword::Full) {
            MatchType::Full
        } else {
            self.consume_keyword(Keyword::Simple);
            MatchType::Simple
        };
        let id = self.parse_subquery(SubQueryKind::Match)?;
        let span = self.span_from_token(lhs.span);
        Ok(Expr::new(
            ExprKind::Match {
                operand: Box::new(lhs),
                subquery: id,
                unique,
                match_type,
            },
            span,
        ))
    }

    /// `(start, end) OVERLAPS (start, end)`
    fn parse_overlaps(&mut self, lhs: Expr, r_bp: u8) -> Result<Expr> {
        let rhs = self.parse_expression_bp(r_bp)?;
        for side in [&lhs, &rhs] {
            let found = row_degree(side);
            if found != 2 {
                return Err(self.error_at(ErrorKind::DegreeMismatch { expected: 2, found }, side.span));
            }
        }
        let span = self.span_from_token(lhs.span);
        Ok(Expr::new(
            ExprKind::Overlaps {
                left: Box::new(lhs),
                right: Box::new(rhs),
            },
            span,
        ))
    }

    /// `(v, ...), (v, ...)` rows of one degree; a bare value is a row of one.
    pub(crate) fn parse_row_list(&mut self) -> Result<Vec<Expr>> {
        let mut rows = Vec::new();
        let mut degree = None;
        loop {
            let value = self.parse_expression()?;
            let row = match value.kind {
                ExprKind::Row(_) => value,
                _ => {
                    let span = value.span;
                    Expr::new(ExprKind::Row(vec![value]), span)
                }
            };
            let found = row_degree(&row);
            match degree {
                None => degree = Some(found),
                Some(expected) if expected != found => {
                    return Err(self.error_at(ErrorKind::DegreeMismatch { expected, found }, row.span));
                }
                Some(_) => {}
            }
            rows.push(row);
            if !self.consume(&TokenKind::Comma) {
                break;
            }
        }
        Ok(rows)
    }
}

/// Datetime and user functions written without brackets.
fn is_niladic(token: &Token) -> bool {
    matches!(
        token.as_keyword(),
        Some(
            Keyword::CurrentDate
                | Keyword::CurrentTime
                | Keyword::CurrentTimestamp
                | Keyword::CurrentUser
                | Keyword::SessionUser
                | Keyword::Localtime
                | Keyword::Localtimestamp
        )
    )
}

/// Number of values in a row constructor; 1 for anything else.
pub(crate) fn row_degree(expr: &Expr) -> usize {
    match &expr.kind {
        ExprKind::Row(items) => items.len(),
        _ => 1,
    }
}

/// Builds a column reference from a (possibly qualified) name token.
pub(crate) fn column_from_token(token: &Token) -> Expr {
    let name = token.identifier_text().unwrap_or_default().to_string();
    let mut expr = Expr::column(None, name, token.span);
    if let ExprKind::Column(column) = &mut expr.kind {
        match token.qualifiers.as_slice() {
            [] => {}
            [table] => column.table = Some(table.clone()),
            [.., schema, table] => {
                column.schema = Some(schema.clone());
                column.table = Some(table.clone());
            }
        }
    }
    expr
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{AllowAll, MemoryCatalog};
    use crate::config::CompilerConfig;

    fn parse(sql: &str) -> Result<Expr> {
        let catalog = MemoryCatalog::new();
        let config = CompilerConfig::default();
        let mut parser = Parser::new(sql, &catalog, &AllowAll, &config);
        parser.parse_expression()
    }

    fn op_of(expr: &Expr) -> Option<BinaryOp> {
        match &expr.kind {
            ExprKind::Binary { op, .. } => Some(*op),
            _ => None,
        }
    }

    #[test]
    fn test_expression_precedence() {
        // 1 + 2 * 3 parses as 1 + (2 * 3)
        let expr = parse("1 + 2 * 3").unwrap();
        let ExprKind::Binary { op, right, .. } = &expr.kind else {
            panic!("expected binary");
        };
        assert_eq!(*op, BinaryOp::Add);
        assert_eq!(op_of(right), Some(BinaryOp::Mul));
    }

    #[test]
    fn test_concat_binds_looser_than_addition() {
        let expr = parse("a || b + 1").unwrap();
        let ExprKind::Binary { op, right, .. } = &expr.kind else {
            panic!("expected binary");
        };
        assert_eq!(*op, BinaryOp::Concat);
        assert_eq!(op_of(right), Some(BinaryOp::Add));
    }

    #[test]
    fn test_not_binds_looser_than_comparison() {
        let expr = parse("NOT a = 1 AND b = 2").unwrap();
        let ExprKind::Binary { op, left, .. } = &expr.kind else {
            panic!("expected binary");
        };
        assert_eq!(*op, BinaryOp::And);
        assert!(matches!(left.kind, ExprKind::Unary { op: UnaryOp::Not, .. }));
    }

    #[test]
    fn test_between_rewrites_to_comparisons() {
        let expr = parse("a BETWEEN 1 AND 5").unwrap();
        let ExprKind::Binary { op, left, right } = &expr.kind else {
            panic!("expected AND");
        };
        assert_eq!(*op, BinaryOp::And);
        assert_eq!(op_of(left), Some(BinaryOp::GtEq));
        assert_eq!(op_of(right), Some(BinaryOp::LtEq));

        let negated = parse("a NOT BETWEEN SYMMETRIC 1 AND 5").unwrap();
        let ExprKind::Unary { op: UnaryOp::Not, operand } = &negated.kind else {
            panic!("expected NOT");
        };
        assert_eq!(op_of(operand), Some(BinaryOp::Or));
    }

    #[test]
    fn test_in_list_and_degree() {
        let expr = parse("a NOT IN (1, 2, 3)").unwrap();
        assert!(matches!(
            &expr.kind,
            ExprKind::InList { list, negated: true, .. } if list.len() == 3
        ));
        let err = parse("(a, b) IN ((1, 2), 3)").unwrap_err();
        assert!(matches!(err.kind, ErrorKind::DegreeMismatch { expected: 2, found: 1 }));
    }

    #[test]
    fn test_like_escape_must_be_single_character() {
        assert!(parse("a LIKE 'x%' ESCAPE '!'").is_ok());
        let err = parse("a LIKE 'x%' ESCAPE '!!'").unwrap_err();
        assert!(matches!(err.kind, ErrorKind::InvalidEscape(_)));
    }

    #[test]
    fn test_is_predicates() {
        assert!(matches!(
            parse("a IS NOT NULL").unwrap().kind,
            ExprKind::IsNull { negated: true, .. }
        ));
        assert!(matches!(
            parse("a IS UNKNOWN").unwrap().kind,
            ExprKind::IsTruth { value: None, .. }
        ));
        assert!(matches!(
            parse("a IS DISTINCT FROM b").unwrap().kind,
            ExprKind::IsDistinctFrom { negated: false, .. }
        ));
    }

    #[test]
    fn test_row_and_parenthesized() {
        assert!(matches!(parse("(1, 2)").unwrap().kind, ExprKind::Row(ref items) if items.len() == 2));
        assert!(matches!(parse("(1)").unwrap().kind, ExprKind::Literal(Literal::Integer(1))));
        assert!(matches!(parse("-5").unwrap().kind, ExprKind::Literal(Literal::Integer(-5))));
    }

    #[test]
    fn test_qualified_column() {
        let expr = parse("s.t.c").unwrap();
        let ExprKind::Column(column) = &expr.kind else {
            panic!("expected column");
        };
        assert_eq!(column.schema.as_deref(), Some("S"));
        assert_eq!(column.table.as_deref(), Some("T"));
        assert_eq!(column.name, "C");
    }

    #[test]
    fn test_default_outside_values_is_rejected() {
        assert!(parse("DEFAULT").is_err());
    }

    #[test]
    fn test_overlaps_requires_pairs() {
        assert!(parse("(a, b) OVERLAPS (c, d)").is_ok());
        let err = parse("(a, b, c) OVERLAPS (c, d)").unwrap_err();
        assert!(matches!(err.kind, ErrorKind::DegreeMismatch { expected: 2, found: 3 }));
    }
}
