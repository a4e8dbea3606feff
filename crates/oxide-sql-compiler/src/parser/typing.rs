//! Type derivation for resolved expressions.
//!
//! Types flow bottom-up. Operands that carry no type of their own (dynamic
//! parameters, `NULL`, `DEFAULT`) take the type their context requires; a
//! parameter keeps the first type it is given.

use super::functions::builtin;
use super::Parser;
use crate::ast::{
    AggregateFunction, BinaryOp, DataType, Expr, ExprKind, FunctionCall, Literal, SubQueryId,
    SubQueryKind, TypeOp, UnaryOp,
};
use crate::error::{ErrorKind, Result};
use crate::lexer::Span;

impl<'a> Parser<'a> {
    /// Derives the type of `expr` from its typed children.
    pub(crate) fn assign_type(&mut self, expr: &mut Expr) -> Result<()> {
        let span = expr.span;
        let data_type = match &mut expr.kind {
            ExprKind::Literal(literal) => literal.data_type(),
            ExprKind::Column(_)
            | ExprKind::Default
            | ExprKind::NextValue(_)
            | ExprKind::CurrentValue(_) => expr.data_type.clone(),
            ExprKind::Parameter(index) => self
                .ctx
                .parameter(*index)
                .and_then(|p| p.data_type.clone()),
            ExprKind::DomainValue => self.ctx.domain().cloned(),
            ExprKind::Asterisk { .. } | ExprKind::Row(_) | ExprKind::Table(_) => None,
            ExprKind::Unary {
                op: UnaryOp::Neg,
                operand,
            } => {
                self.require_scalar(operand)?;
                match &operand.data_type {
                    Some(t) if !t.is_numeric() => {
                        return Err(self.error_at(
                            ErrorKind::WrongDataType(format!("- {}", t.to_sql())),
                            span,
                        ));
                    }
                    t => t.clone(),
                }
            }
            ExprKind::Unary {
                op: UnaryOp::Not,
                operand,
            } => {
                self.require_boolean(operand)?;
                Some(DataType::Boolean)
            }
            ExprKind::Binary { op, left, right } => {
                let op = *op;
                if op.is_logical() {
                    self.require_boolean(left)?;
                    self.require_boolean(right)?;
                    Some(DataType::Boolean)
                } else if op.is_comparison() {
                    self.compare_operands(left, right, span)?;
                    Some(DataType::Boolean)
                } else if op == BinaryOp::Concat {
                    self.concat_type(left, right, span)?
                } else {
                    self.arithmetic_type(op, left, right, span)?
                }
            }
            ExprKind::IsNull { .. } | ExprKind::Exists(_) | ExprKind::Unique(_) => Some(DataType::Boolean),
            ExprKind::IsTruth { operand, .. } => {
                self.require_boolean(operand)?;
                Some(DataType::Boolean)
            }
            ExprKind::IsDistinctFrom { left, right, .. } => {
                self.compare_operands(left, right, span)?;
                Some(DataType::Boolean)
            }
            ExprKind::Like {
                operand,
                pattern,
                escape,
                ..
            } => {
                self.like_operands(operand, pattern, escape.as_deref_mut())?;
                Some(DataType::Boolean)
            }
            ExprKind::InList { operand, list, .. } => {
                for item in list.iter_mut() {
                    self.compare_operands(operand, item, span)?;
                }
                Some(DataType::Boolean)
            }
            ExprKind::Quantified {
                operand, subquery, ..
            }
            | ExprKind::Match {
                operand, subquery, ..
            } => {
                let id = *subquery;
                self.compare_with_subquery(operand, id, span)?;
                Some(DataType::Boolean)
            }
            ExprKind::Overlaps { left, right } => {
                self.compare_operands(left, right, span)?;
                Some(DataType::Boolean)
            }
            ExprKind::SubQuery(id) => self.subquery_type(*id),
            ExprKind::Aggregate {
                function,
                argument,
                ..
            } => {
                let function = *function;
                self.aggregate_type(function, argument.as_deref_mut(), span)?
            }
            ExprKind::CaseWhen {
                condition,
                then,
                otherwise,
            } => {
                self.require_boolean(condition)?;
                self.union_type(then, otherwise, "CASE", span)?
            }
            ExprKind::Function(call) => self.function_type(call, span)?,
            ExprKind::Cast { operand, data_type } => {
                self.require_scalar(operand)?;
                self.pin(operand, data_type);
                Some(data_type.clone())
            }
        };
        expr.data_type = data_type;
        Ok(())
    }

    /// Gives an untyped operand the type `data_type`. Typed operands are left
    /// alone.
    pub(crate) fn pin(&mut self, expr: &mut Expr, data_type: &DataType) {
        if expr.data_type.is_some() {
            return;
        }
        match &mut expr.kind {
            ExprKind::Parameter(index) => {
                expr.data_type = Some(self.ctx.pin_parameter(*index, data_type));
            }
            ExprKind::Literal(Literal::Null) | ExprKind::Default => {
                expr.data_type = Some(data_type.clone());
            }
            ExprKind::CaseWhen { then, otherwise, .. } => {
                self.pin(then, data_type);
                self.pin(otherwise, data_type);
                expr.data_type = Some(data_type.clone());
            }
            ExprKind::Unary {
                op: UnaryOp::Neg,
                operand,
            } => {
                self.pin(operand, data_type);
                expr.data_type.clone_from(&operand.data_type);
            }
            ExprKind::Binary { op, left, right } if op.is_arithmetic() || *op == BinaryOp::Concat => {
                self.pin(left, data_type);
                self.pin(right, data_type);
                expr.data_type = Some(data_type.clone());
            }
            _ => {}
        }
    }

    /// Pins whichever side is untyped to the type of the other.
    fn pin_pair(&mut self, left: &mut Expr, right: &mut Expr) {
        match (&left.data_type, &right.data_type) {
            (None, Some(t)) => {
                let t = t.clone();
                self.pin(left, &t);
            }
            (Some(t), None) => {
                let t = t.clone();
                self.pin(right, &t);
            }
            _ => {}
        }
    }

    pub(crate) fn require_boolean(&mut self, expr: &mut Expr) -> Result<()> {
        self.pin(expr, &DataType::Boolean);
        match &expr.data_type {
            Some(t) if !t.is_boolean() => Err(self.error_at(
                ErrorKind::WrongDataType(format!("{} where BOOLEAN is required", t.to_sql())),
                expr.span,
            )),
            _ => Ok(()),
        }
    }

    /// Rejects rows and multi-column subqueries where one value is needed.
    pub(crate) fn require_scalar(&self, expr: &Expr) -> Result<()> {
        let degree = self.degree(expr);
        if degree == 1 {
            Ok(())
        } else {
            Err(self.error_at(
                ErrorKind::DegreeMismatch {
                    expected: 1,
                    found: degree,
                },
                expr.span,
            ))
        }
    }

    fn degree(&self, expr: &Expr) -> usize {
        match &expr.kind {
            ExprKind::Row(items) => items.len(),
            ExprKind::SubQuery(id) => self.ctx.subquery(*id).map_or(1, |s| s.query.degree()),
            _ => 1,
        }
    }

    fn subquery_types(&self, id: SubQueryId) -> Vec<Option<DataType>> {
        self.ctx.subquery(id).map_or_else(Vec::new, |s| {
            s.columns().iter().map(|c| c.data_type.clone()).collect()
        })
    }

    fn subquery_type(&self, id: SubQueryId) -> Option<DataType> {
        match self.subquery_types(id).as_slice() {
            [single] => single.clone(),
            _ => None,
        }
    }

    /// A scalar subquery compared with a row is a row subquery.
    fn mark_row_subquery(&mut self, id: SubQueryId) {
        if let Some(subquery) = self.ctx.subquery_mut(id) {
            if subquery.kind == SubQueryKind::Scalar {
                subquery.kind = SubQueryKind::Row;
            }
        }
    }

    fn comparable(&self, left: Option<&DataType>, right: Option<&DataType>, span: Span) -> Result<()> {
        match (left, right) {
            (Some(a), Some(b)) if !a.is_comparable_with(b) => Err(self.error_at(
                ErrorKind::WrongDataType(format!("{} compared with {}", a.to_sql(), b.to_sql())),
                span,
            )),
            _ => Ok(()),
        }
    }

    /// Checks that two operands of a comparison have equal degree and
    /// comparable types, pinning untyped ones.
    pub(crate) fn compare_operands(&mut self, left: &mut Expr, right: &mut Expr, span: Span) -> Result<()> {
        let (expected, found) = (self.degree(left), self.degree(right));
        if expected != found {
            return Err(self.error_at(ErrorKind::DegreeMismatch { expected, found }, span));
        }
        match (&mut left.kind, &mut right.kind) {
            (ExprKind::Row(l), ExprKind::Row(r)) => {
                for (a, b) in l.iter_mut().zip(r.iter_mut()) {
                    self.compare_operands(a, b, span)?;
                }
                return Ok(());
            }
            (ExprKind::Row(items), ExprKind::SubQuery(id))
            | (ExprKind::SubQuery(id), ExprKind::Row(items)) => {
                let id = *id;
                return self.compare_row_with_subquery(items, id, span);
            }
            (ExprKind::SubQuery(a), ExprKind::SubQuery(b)) if expected > 1 => {
                let (a, b) = (*a, *b);
                self.mark_row_subquery(a);
                self.mark_row_subquery(b);
                for (x, y) in self.subquery_types(a).iter().zip(&self.subquery_types(b)) {
                    self.comparable(x.as_ref(), y.as_ref(), span)?;
                }
                return Ok(());
            }
            _ => {}
        }
        self.pin_pair(left, right);
        self.comparable(left.data_type.as_ref(), right.data_type.as_ref(), span)
    }

    fn compare_row_with_subquery(&mut self, items: &mut [Expr], id: SubQueryId, span: Span) -> Result<()> {
        self.mark_row_subquery(id);
        let types = self.subquery_types(id);
        for (item, data_type) in items.iter_mut().zip(&types) {
            if let Some(data_type) = data_type {
                self.pin(item, data_type);
            }
            self.comparable(item.data_type.as_ref(), data_type.as_ref(), span)?;
        }
        Ok(())
    }

    /// `IN`, quantified and `MATCH` predicates: the operand against the
    /// columns of a table subquery.
    fn compare_with_subquery(&mut self, operand: &mut Expr, id: SubQueryId, span: Span) -> Result<()> {
        let types = self.subquery_types(id);
        let degree = self.degree(operand);
        if degree != types.len() {
            return Err(self.error_at(
                ErrorKind::DegreeMismatch {
                    expected: degree,
                    found: types.len(),
                },
                span,
            ));
        }
        if let ExprKind::Row(items) = &mut operand.kind {
            for (item, data_type) in items.iter_mut().zip(&types) {
                if let Some(data_type) = data_type {
                    self.pin(item, data_type);
                }
                self.comparable(item.data_type.as_ref(), data_type.as_ref(), span)?;
            }
            return Ok(());
        }
        let column = types.into_iter().next().flatten();
        if let Some(data_type) = &column {
            self.pin(operand, data_type);
        }
        self.comparable(operand.data_type.as_ref(), column.as_ref(), span)
    }

    fn arithmetic_type(
        &mut self,
        op: BinaryOp,
        left: &mut Expr,
        right: &mut Expr,
        span: Span,
    ) -> Result<Option<DataType>> {
        self.require_scalar(left)?;
        self.require_scalar(right)?;
        self.pin_pair(left, right);
        match (&left.data_type, &right.data_type) {
            (Some(a), Some(b)) => a.combine(b, TypeOp::Arithmetic).map(Some).ok_or_else(|| {
                self.error_at(
                    ErrorKind::WrongDataType(format!("{} {} {}", a.to_sql(), op.as_str(), b.to_sql())),
                    span,
                )
            }),
            _ => Ok(None),
        }
    }

    fn concat_type(&mut self, left: &mut Expr, right: &mut Expr, span: Span) -> Result<Option<DataType>> {
        self.require_scalar(left)?;
        self.require_scalar(right)?;
        self.pin_pair(left, right);
        let text = DataType::Varchar(None);
        self.pin(left, &text);
        self.pin(right, &text);
        match (&left.data_type, &right.data_type) {
            (Some(a), Some(b)) => a.combine(b, TypeOp::Concat).map(Some).ok_or_else(|| {
                self.error_at(
                    ErrorKind::WrongDataType(format!("{} || {}", a.to_sql(), b.to_sql())),
                    span,
                )
            }),
            _ => Ok(None),
        }
    }

    fn like_operands(&mut self, operand: &mut Expr, pattern: &mut Expr, escape: Option<&mut Expr>) -> Result<()> {
        self.pin_pair(operand, pattern);
        let text = DataType::Varchar(None);
        let mut parts = vec![operand, pattern];
        if let Some(escape) = escape {
            parts.push(escape);
        }
        for part in parts {
            self.pin(part, &text);
            if let Some(t) = &part.data_type {
                if !t.is_character() && !t.is_binary() {
                    return Err(self.error_at(
                        ErrorKind::WrongDataType(format!("{} in LIKE", t.to_sql())),
                        part.span,
                    ));
                }
            }
        }
        Ok(())
    }

    /// Result type of two alternatives: CASE branches, set operation columns.
    fn union_type(
        &mut self,
        first: &mut Expr,
        second: &mut Expr,
        context: &str,
        span: Span,
    ) -> Result<Option<DataType>> {
        self.pin_pair(first, second);
        match (&first.data_type, &second.data_type) {
            (Some(a), Some(b)) => a.combine(b, TypeOp::Union).map(Some).ok_or_else(|| {
                self.error_at(
                    ErrorKind::WrongDataType(format!("{} and {} in {context}", a.to_sql(), b.to_sql())),
                    span,
                )
            }),
            (a, b) => Ok(a.clone().or_else(|| b.clone())),
        }
    }

    fn aggregate_type(
        &mut self,
        function: AggregateFunction,
        argument: Option<&mut Expr>,
        span: Span,
    ) -> Result<Option<DataType>> {
        let Some(argument) = argument else {
            return Ok(Some(DataType::Bigint));
        };
        self.require_scalar(argument)?;
        Ok(match function {
            AggregateFunction::Count => Some(DataType::Bigint),
            AggregateFunction::Sum => match &argument.data_type {
                Some(t) => {
                    self.numeric_argument(function, t, span)?;
                    Some(if t.is_integral() { DataType::Bigint } else { t.clone() })
                }
                None => None,
            },
            AggregateFunction::Avg => match &argument.data_type {
                Some(t) => {
                    self.numeric_argument(function, t, span)?;
                    Some(t.clone())
                }
                None => None,
            },
            AggregateFunction::Min | AggregateFunction::Max => argument.data_type.clone(),
            AggregateFunction::Every | AggregateFunction::Some => {
                self.require_boolean(argument)?;
                Some(DataType::Boolean)
            }
            AggregateFunction::StddevPop
            | AggregateFunction::StddevSamp
            | AggregateFunction::VarPop
            | AggregateFunction::VarSamp => {
                if let Some(t) = &argument.data_type {
                    self.numeric_argument(function, t, span)?;
                }
                Some(DataType::Double)
            }
        })
    }

    fn numeric_argument(&self, function: AggregateFunction, data_type: &DataType, span: Span) -> Result<()> {
        if data_type.is_numeric() {
            Ok(())
        } else {
            Err(self.error_at(
                ErrorKind::WrongDataType(format!("{} of {}", function.as_str(), data_type.to_sql())),
                span,
            ))
        }
    }

    fn function_type(&mut self, call: &mut FunctionCall, span: Span) -> Result<Option<DataType>> {
        for arg in &call.args {
            self.require_scalar(arg)?;
        }
        if call.builtin {
            let Some(signature) = builtin(&call.name.name) else {
                return Ok(None);
            };
            for (n, arg) in call.args.iter_mut().enumerate() {
                if let Some(t) = signature.args.parameter_type() {
                    self.pin(arg, &t);
                }
                if let Some(t) = &arg.data_type {
                    if !signature.args.accepts(t) {
                        return Err(self.error_at(
                            ErrorKind::WrongDataType(format!(
                                "{} for argument {} of {}",
                                t.to_sql(),
                                n + 1,
                                signature.name
                            )),
                            arg.span,
                        ));
                    }
                }
            }
            return Ok(signature.result_type(&call.args));
        }

        let Some(routine) = self.catalog.routine(&call.name) else {
            return Err(self.error_at(ErrorKind::ObjectNotFound(call.name.to_string()), span));
        };
        for (arg, parameter) in call.args.iter_mut().zip(&routine.parameters) {
            self.pin(arg, parameter);
            if let Some(t) = &arg.data_type {
                if !t.is_comparable_with(parameter) {
                    return Err(self.error_at(
                        ErrorKind::WrongDataType(format!(
                            "{} for parameter of type {}",
                            t.to_sql(),
                            parameter.to_sql()
                        )),
                        arg.span,
                    ));
                }
            }
        }
        Ok(routine.returns.clone())
    }

    /// Every dynamic parameter must have a type by the end of the statement.
    pub(crate) fn check_parameter_types(&self) -> Result<()> {
        match self.ctx.parameters().iter().find(|p| p.data_type.is_none()) {
            Some(parameter) => Err(self.error_at(ErrorKind::UnresolvedParameterType, parameter.span)),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::ast::{DataType, QualifiedName, Statement};
    use crate::catalog::{AllowAll, MemoryCatalog, RoutineDef, TableDef};
    use crate::config::CompilerConfig;
    use crate::error::{ErrorKind, Result};
    use crate::parser::Parser;

    fn compile(sql: &str) -> Result<Statement> {
        let catalog = MemoryCatalog::new()
            .with_table(
                TableDef::new(QualifiedName::new("PUBLIC", "T"))
                    .column("I", DataType::Integer)
                    .column("D", DataType::Decimal {
                        precision: Some(10),
                        scale: Some(2),
                    })
                    .column("S", DataType::Varchar(Some(10)))
                    .column("F", DataType::Boolean),
            )
            .with_routine(RoutineDef {
                name: QualifiedName::new("PUBLIC", "TWICE"),
                parameters: vec![DataType::Integer],
                returns: Some(DataType::Integer),
            });
        let config = CompilerConfig::default();
        let mut parser = Parser::new(sql, &catalog, &AllowAll, &config);
        parser.next_statement().map(|s| s.expect("statement"))
    }

    fn column_type(sql: &str) -> Option<DataType> {
        compile(sql).unwrap().query().unwrap().columns[0].data_type.clone()
    }

    #[test]
    fn test_arithmetic_widens() {
        assert_eq!(column_type("SELECT i + 1 FROM t"), Some(DataType::Integer));
        assert_eq!(
            column_type("SELECT i * d FROM t"),
            Some(DataType::Decimal {
                precision: Some(10),
                scale: Some(2)
            })
        );
        assert!(matches!(
            compile("SELECT i + s FROM t").unwrap_err().kind,
            ErrorKind::WrongDataType(_)
        ));
    }

    #[test]
    fn test_parameters_take_operand_type() {
        let statement = compile("SELECT s FROM t WHERE i = ? AND s LIKE ?").unwrap();
        let types: Vec<_> = statement.parameters().iter().map(|p| p.data_type.clone()).collect();
        assert_eq!(types, vec![Some(DataType::Integer), Some(DataType::Varchar(Some(10)))]);
    }

    #[test]
    fn test_untyped_parameter_is_rejected() {
        assert_eq!(
            compile("SELECT ? FROM t").unwrap_err().kind,
            ErrorKind::UnresolvedParameterType
        );
        assert_eq!(
            compile("SELECT i FROM t WHERE ? = ?").unwrap_err().kind,
            ErrorKind::UnresolvedParameterType
        );
        assert!(compile("SELECT CAST(? AS INTEGER) FROM t").is_ok());
    }

    #[test]
    fn test_where_must_be_boolean() {
        assert!(matches!(
            compile("SELECT i FROM t WHERE i").unwrap_err().kind,
            ErrorKind::WrongDataType(_)
        ));
        assert!(compile("SELECT i FROM t WHERE f").is_ok());
    }

    #[test]
    fn test_aggregate_types() {
        assert_eq!(column_type("SELECT COUNT(*) FROM t"), Some(DataType::Bigint));
        assert_eq!(column_type("SELECT SUM(i) FROM t"), Some(DataType::Bigint));
        assert_eq!(
            column_type("SELECT SUM(d) FROM t"),
            Some(DataType::Decimal {
                precision: Some(10),
                scale: Some(2)
            })
        );
        assert_eq!(column_type("SELECT MAX(s) FROM t"), Some(DataType::Varchar(Some(10))));
        assert!(matches!(
            compile("SELECT AVG(s) FROM t").unwrap_err().kind,
            ErrorKind::WrongDataType(_)
        ));
    }

    #[test]
    fn test_case_branches_unify() {
        assert_eq!(
            column_type("SELECT CASE WHEN f THEN i ELSE NULL END FROM t"),
            Some(DataType::Integer)
        );
        assert!(matches!(
            compile("SELECT CASE WHEN f THEN i ELSE s END FROM t").unwrap_err().kind,
            ErrorKind::WrongDataType(_)
        ));
    }

    #[test]
    fn test_row_comparison_degree() {
        assert!(compile("SELECT i FROM t WHERE (i, s) = (1, 'a')").is_ok());
        assert!(matches!(
            compile("SELECT i FROM t WHERE (i, s) = (1, 'a', 2)").unwrap_err().kind,
            ErrorKind::DegreeMismatch { .. }
        ));
    }

    #[test]
    fn test_in_subquery_degree() {
        assert!(compile("SELECT i FROM t WHERE i IN (SELECT i FROM t)").is_ok());
        assert!(matches!(
            compile("SELECT i FROM t WHERE i IN (SELECT i, s FROM t)").unwrap_err().kind,
            ErrorKind::DegreeMismatch { .. }
        ));
    }

    #[test]
    fn test_routine_parameters_and_result() {
        let statement = compile("SELECT twice(?) FROM t").unwrap();
        assert_eq!(statement.parameters()[0].data_type, Some(DataType::Integer));
        assert_eq!(statement.query().unwrap().columns[0].data_type, Some(DataType::Integer));
    }

    #[test]
    fn test_builtin_argument_kinds() {
        assert_eq!(column_type("SELECT UPPER(s) FROM t"), Some(DataType::Varchar(Some(10))));
        assert!(matches!(
            compile("SELECT UPPER(i) FROM t").unwrap_err().kind,
            ErrorKind::WrongDataType(_)
        ));
    }
}
