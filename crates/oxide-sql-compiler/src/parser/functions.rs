//! Function calls, set functions and the SQL forms with special syntax.
//!
//! `COALESCE`, `NULLIF`, `IFNULL`, `NVL`, `DECODE`, `LEAST`, `GREATEST` and
//! both CASE forms compile to chains of [`ExprKind::CaseWhen`]; `CONCAT`
//! compiles to `||`.

use super::pratt::COMPARISON_BP;
use super::Parser;
use crate::ast::{
    AggregateFunction, BinaryOp, DataType, Expr, ExprKind, FunctionCall, Literal, ObjectKind,
    QualifiedName,
};
use crate::error::{ErrorKind, Result};
use crate::lexer::{Keyword, Span, TokenKind};

/// What a built-in accepts in each argument position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ArgKind {
    Any,
    Numeric,
    Integer,
    Character,
    Datetime,
}

impl ArgKind {
    /// Type given to a `?` in this position.
    pub(crate) const fn parameter_type(self) -> Option<DataType> {
        match self {
            Self::Any => None,
            Self::Numeric => Some(DataType::Double),
            Self::Integer => Some(DataType::Integer),
            Self::Character => Some(DataType::Varchar(None)),
            Self::Datetime => Some(DataType::Timestamp),
        }
    }

    pub(crate) fn accepts(self, data_type: &DataType) -> bool {
        match self {
            Self::Any => true,
            Self::Numeric => data_type.is_numeric(),
            Self::Integer => data_type.is_integral(),
            Self::Character => data_type.is_character(),
            Self::Datetime => data_type.is_datetime(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Returns {
    FirstArg,
    Integer,
    Bigint,
    Double,
    Varchar,
    Boolean,
    Date,
    Time,
    Timestamp,
}

/// Signature of a built-in function.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Builtin {
    pub name: &'static str,
    pub min_args: usize,
    pub max_args: usize,
    pub args: ArgKind,
    pub returns: Returns,
}

impl Builtin {
    /// Result type for the given (already typed) arguments.
    pub(crate) fn result_type(&self, args: &[Expr]) -> Option<DataType> {
        Some(match self.returns {
            Returns::FirstArg => return args.first().and_then(|a| a.data_type.clone()),
            Returns::Integer => DataType::Integer,
            Returns::Bigint => DataType::Bigint,
            Returns::Double => DataType::Double,
            Returns::Varchar => DataType::Varchar(None),
            Returns::Boolean => DataType::Boolean,
            Returns::Date => DataType::Date,
            Returns::Time => DataType::Time,
            Returns::Timestamp => DataType::Timestamp,
        })
    }
}

macro_rules! builtins {
    ($($name:literal => ($min:literal, $max:literal, $args:ident, $returns:ident)),+ $(,)?) => {
        const BUILTINS: &[Builtin] = &[
            $(Builtin {
                name: $name,
                min_args: $min,
                max_args: $max,
                args: ArgKind::$args,
                returns: Returns::$returns,
            },)+
        ];
    };
}

builtins! {
    "ABS" => (1, 1, Numeric, FirstArg),
    "MOD" => (2, 2, Numeric, FirstArg),
    "SIGN" => (1, 1, Numeric, Integer),
    "FLOOR" => (1, 1, Numeric, FirstArg),
    "CEIL" => (1, 1, Numeric, FirstArg),
    "CEILING" => (1, 1, Numeric, FirstArg),
    "ROUND" => (1, 2, Numeric, FirstArg),
    "TRUNCATE" => (1, 2, Numeric, FirstArg),
    "SQRT" => (1, 1, Numeric, Double),
    "EXP" => (1, 1, Numeric, Double),
    "LN" => (1, 1, Numeric, Double),
    "LOG10" => (1, 1, Numeric, Double),
    "POWER" => (2, 2, Numeric, Double),
    "RAND" => (0, 1, Integer, Double),
    "UPPER" => (1, 1, Character, FirstArg),
    "LOWER" => (1, 1, Character, FirstArg),
    "UCASE" => (1, 1, Character, FirstArg),
    "LCASE" => (1, 1, Character, FirstArg),
    "LTRIM" => (1, 1, Character, FirstArg),
    "RTRIM" => (1, 1, Character, FirstArg),
    "CHAR_LENGTH" => (1, 1, Character, Integer),
    "CHARACTER_LENGTH" => (1, 1, Character, Integer),
    "LENGTH" => (1, 1, Character, Integer),
    "OCTET_LENGTH" => (1, 1, Any, Bigint),
    "REPLACE" => (3, 3, Character, Varchar),
    "REPEAT" => (2, 2, Any, Varchar),
    "LEFT" => (2, 2, Any, Varchar),
    "RIGHT" => (2, 2, Any, Varchar),
    "LOCATE" => (2, 3, Any, Integer),
    "SUBSTRING" => (2, 3, Any, Varchar),
    "POSITION" => (2, 2, Character, Integer),
    "TRIM" => (3, 3, Character, Varchar),
    "EXTRACT" => (2, 2, Any, Integer),
    "REGEXP_MATCHES" => (2, 2, Character, Boolean),
    "NOW" => (0, 0, Any, Timestamp),
    "CURRENT_DATE" => (0, 0, Any, Date),
    "CURRENT_TIME" => (0, 0, Any, Time),
    "CURRENT_TIMESTAMP" => (0, 0, Any, Timestamp),
    "LOCALTIME" => (0, 0, Any, Time),
    "LOCALTIMESTAMP" => (0, 0, Any, Timestamp),
    "CURRENT_USER" => (0, 0, Any, Varchar),
    "SESSION_USER" => (0, 0, Any, Varchar),
    "DAYOFWEEK" => (1, 1, Datetime, Integer),
    "YEAR" => (1, 1, Datetime, Integer),
    "MONTH" => (1, 1, Datetime, Integer),
    "DAY" => (1, 1, Datetime, Integer),
}

/// Looks up a built-in function by its upper case name.
pub(crate) fn builtin(name: &str) -> Option<&'static Builtin> {
    BUILTINS.iter().find(|b| b.name == name)
}

impl<'a> Parser<'a> {
    /// Keywords with their own call syntax, or none at all.
    pub(crate) fn parse_special_function(&mut self) -> Result<Expr> {
        let start = self.position();
        let token = self.advance();
        let Some(keyword) = token.as_keyword() else {
            return Err(self.unexpected("function"));
        };

        match keyword {
            Keyword::Case => self.parse_case(start),
            Keyword::Cast => {
                self.expect(&TokenKind::LeftParen)?;
                let operand = self.parse_expression()?;
                self.expect_keyword(Keyword::As)?;
                let data_type = self.parse_data_type()?;
                self.expect(&TokenKind::RightParen)?;
                let mut expr = Expr::new(
                    ExprKind::Cast {
                        operand: Box::new(operand),
                        data_type: data_type.clone(),
                    },
                    self.span_from(start),
                );
                expr.data_type = Some(data_type);
                Ok(expr)
            }
            Keyword::Coalesce => {
                let args = self.parse_call_arguments(1)?;
                Ok(with_span(coalesce(args), self.span_from(start)))
            }
            Keyword::Nullif => {
                let args = self.parse_call_arguments(2)?;
                if args.len() != 2 {
                    return Err(self.arity_error("NULLIF", args.len(), start));
                }
                Ok(with_span(nullif(args), self.span_from(start)))
            }
            Keyword::Extract => {
                self.expect(&TokenKind::LeftParen)?;
                let field_span = self.current().span;
                let field = self.expect_identifier()?;
                self.expect_keyword(Keyword::From)?;
                let source = self.parse_expression()?;
                self.expect(&TokenKind::RightParen)?;
                let field = Expr::literal(Literal::String(field), field_span);
                Ok(self.builtin_call("EXTRACT", vec![field, source], start))
            }
            Keyword::Substring => {
                self.expect(&TokenKind::LeftParen)?;
                let mut args = vec![self.parse_expression()?];
                if self.consume_keyword(Keyword::From) {
                    args.push(self.parse_expression()?);
                    if self.consume_keyword(Keyword::For) {
                        args.push(self.parse_expression()?);
                    }
                } else {
                    while self.consume(&TokenKind::Comma) {
                        args.push(self.parse_expression()?);
                    }
                }
                self.expect(&TokenKind::RightParen)?;
                self.check_arity("SUBSTRING", args.len(), start)?;
                Ok(self.builtin_call("SUBSTRING", args, start))
            }
            Keyword::Position => {
                self.expect(&TokenKind::LeftParen)?;
                // The needle stops before IN.
                let needle = self.parse_expression_bp(COMPARISON_BP + 2)?;
                self.expect_keyword(Keyword::In)?;
                let haystack = self.parse_expression()?;
                self.expect(&TokenKind::RightParen)?;
                Ok(self.builtin_call("POSITION", vec![needle, haystack], start))
            }
            Keyword::Trim => self.parse_trim(start),
            Keyword::Left | Keyword::Right => {
                let args = self.parse_call_arguments(0)?;
                self.check_arity(keyword.as_str(), args.len(), start)?;
                Ok(self.builtin_call(keyword.as_str(), args, start))
            }
            Keyword::Some | Keyword::Any => self.parse_aggregate(AggregateFunction::Some, start),
            _ => {
                // CURRENT_DATE and friends; brackets are optional.
                if self.consume(&TokenKind::LeftParen) {
                    self.expect(&TokenKind::RightParen)?;
                }
                Ok(self.builtin_call(keyword.as_str(), Vec::new(), start))
            }
        }
    }

    /// `name ( args )` for built-ins, set functions and catalog routines.
    pub(crate) fn parse_function(&mut self) -> Result<Expr> {
        let start = self.position();
        let token = self.current().clone();
        let Some(name) = token.identifier_text().map(str::to_string) else {
            return Err(self.unexpected("function name"));
        };

        if !token.is_qualified() {
            if let Some(function) = AggregateFunction::from_name(&name) {
                self.advance();
                return self.parse_aggregate(function, start);
            }
            if let Some(expr) = self.parse_desugared_function(&name, start)? {
                return Ok(expr);
            }
            if builtin(&name).is_some() {
                self.advance();
                let args = self.parse_call_arguments(0)?;
                self.check_arity(&name, args.len(), start)?;
                return Ok(self.builtin_call(&name, args, start));
            }
        }

        let routine_name = self.parse_qualified_name()?;
        let Some(routine) = self.catalog.routine(&routine_name) else {
            return Err(self.error_at(ErrorKind::ObjectNotFound(routine_name.to_string()), token.span));
        };
        let expected = routine.parameters.len();
        self.use_object(ObjectKind::Routine, &routine_name, start, token.span)?;
        let args = self.parse_call_arguments(0)?;
        if args.len() != expected {
            return Err(self.error_at(
                ErrorKind::ColumnCountMismatch {
                    expected,
                    found: args.len(),
                },
                self.span_from(start),
            ));
        }
        Ok(Expr::new(
            ExprKind::Function(FunctionCall {
                name: routine_name,
                args,
                builtin: false,
            }),
            self.span_from(start),
        ))
    }

    /// Functions that compile to other expressions. Returns `None` without
    /// consuming anything when `name` is not one of them.
    fn parse_desugared_function(&mut self, name: &str, start: usize) -> Result<Option<Expr>> {
        let expr = match name {
            "IFNULL" | "NVL" => {
                self.advance();
                let args = self.parse_call_arguments(2)?;
                if args.len() != 2 {
                    return Err(self.arity_error(name, args.len(), start));
                }
                coalesce(args)
            }
            "CONCAT" => {
                self.advance();
                let args = self.parse_call_arguments(1)?;
                args.into_iter()
                    .reduce(|acc, arg| Expr::binary(BinaryOp::Concat, acc, arg))
                    .unwrap_or_else(|| Expr::null(Span::default()))
            }
            "LEAST" | "GREATEST" => {
                self.advance();
                let args = self.parse_call_arguments(1)?;
                let keep = if name == "LEAST" {
                    BinaryOp::LtEq
                } else {
                    BinaryOp::GtEq
                };
                extreme(args, keep)
            }
            "DECODE" => {
                self.advance();
                let args = self.parse_call_arguments(3)?;
                decode(args)
            }
            _ => return Ok(None),
        };
        Ok(Some(with_span(expr, self.span_from(start))))
    }

    /// `(*)` or `([DISTINCT|ALL] expr)` after a set function name.
    fn parse_aggregate(&mut self, function: AggregateFunction, start: usize) -> Result<Expr> {
        self.expect(&TokenKind::LeftParen)?;
        let (distinct, argument) = if function == AggregateFunction::Count && self.consume(&TokenKind::Star) {
            (false, None)
        } else {
            let distinct = self.consume_keyword(Keyword::Distinct);
            if !distinct {
                self.consume_keyword(Keyword::All);
            }
            let argument = self.parse_expression()?;
            if argument.contains_aggregate() {
                return Err(self.error_at(
                    ErrorKind::MisplacedAggregate(format!("argument of {}", function.as_str())),
                    argument.span,
                ));
            }
            (distinct, Some(Box::new(argument)))
        };
        self.expect(&TokenKind::RightParen)?;
        Ok(Expr::new(
            ExprKind::Aggregate {
                function,
                distinct,
                argument,
            },
            self.span_from(start),
        ))
    }

    /// `CASE` was consumed at `start`.
    fn parse_case(&mut self, start: usize) -> Result<Expr> {
        let operand = if self.check_keyword(Keyword::When) {
            None
        } else {
            Some(self.parse_expression()?)
        };

        let mut branches = Vec::new();
        while self.consume_keyword(Keyword::When) {
            let condition = match &operand {
                // Simple CASE: WHEN v1, v2 THEN ... compares the operand.
                Some(operand) => {
                    let values = self.parse_expression_list()?;
                    values
                        .into_iter()
                        .map(|v| Expr::binary(BinaryOp::Eq, operand.clone(), v))
                        .reduce(Expr::or)
                        .ok_or_else(|| self.unexpected("WHEN value"))?
                }
                None => self.parse_expression()?,
            };
            self.expect_keyword(Keyword::Then)?;
            let result = self.parse_expression()?;
            branches.push((condition, result));
        }
        if branches.is_empty() {
            return Err(self.unexpected("WHEN"));
        }
        let otherwise = if self.consume_keyword(Keyword::Else) {
            self.parse_expression()?
        } else {
            Expr::null(self.current().span)
        };
        self.expect_keyword(Keyword::End)?;

        let chain = branches
            .into_iter()
            .rev()
            .fold(otherwise, |acc, (condition, result)| Expr::case_when(condition, result, acc));
        Ok(with_span(chain, self.span_from(start)))
    }

    /// `TRIM([[LEADING|TRAILING|BOTH] [char] FROM] source)`
    fn parse_trim(&mut self, start: usize) -> Result<Expr> {
        self.expect(&TokenKind::LeftParen)?;
        let spec_span = self.current().span;
        let spec = match self.current().as_keyword() {
            Some(kw @ (Keyword::Leading | Keyword::Trailing | Keyword::Both)) => {
                self.advance();
                Some(kw.as_str())
            }
            _ => None,
        };

        let (character, source) = if spec.is_some() {
            let character = if self.check_keyword(Keyword::From) {
                None
            } else {
                Some(self.parse_expression()?)
            };
            self.expect_keyword(Keyword::From)?;
            (character, self.parse_expression()?)
        } else {
            let first = self.parse_expression()?;
            if self.consume_keyword(Keyword::From) {
                (Some(first), self.parse_expression()?)
            } else {
                (None, first)
            }
        };
        self.expect(&TokenKind::RightParen)?;

        let spec = Expr::literal(Literal::String(spec.unwrap_or("BOTH").to_string()), spec_span);
        let character =
            character.unwrap_or_else(|| Expr::literal(Literal::String(" ".to_string()), spec_span));
        if let ExprKind::Literal(Literal::String(s)) = &character.kind {
            if s.chars().count() != 1 {
                return Err(self.error_at(ErrorKind::InvalidEscape(s.clone()), character.span));
            }
        }
        Ok(self.builtin_call("TRIM", vec![spec, character, source], start))
    }

    /// `NEXT VALUE FOR seq` / `CURRENT VALUE FOR seq`
    pub(crate) fn parse_sequence_value(&mut self) -> Result<Expr> {
        let start = self.position();
        let next = self.consume_keyword(Keyword::Next);
        if !next {
            self.expect_keyword(Keyword::Current)?;
        }
        self.expect_keyword(Keyword::Value)?;
        self.expect_keyword(Keyword::For)?;
        let name_position = self.position();
        let name_span = self.current().span;
        let name = self.parse_qualified_name()?;
        let Some(sequence) = self.catalog.sequence(&name) else {
            return Err(self.error_at(ErrorKind::ObjectNotFound(name.to_string()), name_span));
        };
        let data_type = sequence.data_type.clone();
        self.use_object(ObjectKind::Sequence, &name, name_position, name_span)?;

        let kind = if next {
            ExprKind::NextValue(name)
        } else {
            ExprKind::CurrentValue(name)
        };
        let mut expr = Expr::new(kind, self.span_from(start));
        expr.data_type = Some(data_type);
        Ok(expr)
    }

    /// `( [arg, ...] )` with at least `min` arguments.
    fn parse_call_arguments(&mut self, min: usize) -> Result<Vec<Expr>> {
        self.expect(&TokenKind::LeftParen)?;
        let args = if self.check(&TokenKind::RightParen) {
            Vec::new()
        } else {
            self.parse_expression_list()?
        };
        if args.len() < min {
            return Err(self.unexpected("argument"));
        }
        self.expect(&TokenKind::RightParen)?;
        Ok(args)
    }

    fn check_arity(&self, name: &str, count: usize, start: usize) -> Result<()> {
        match builtin(name) {
            Some(b) if count < b.min_args || count > b.max_args => {
                Err(self.arity_error(name, count, start))
            }
            _ => Ok(()),
        }
    }

    fn arity_error(&self, name: &str, count: usize, start: usize) -> crate::error::CompileError {
        self.error_at(
            ErrorKind::Unsupported(format!("{name} with {count} arguments")),
            self.span_from(start),
        )
    }

    fn builtin_call(&self, name: &str, args: Vec<Expr>, start: usize) -> Expr {
        Expr::new(
            ExprKind::Function(FunctionCall {
                name: QualifiedName::bare(name),
                args,
                builtin: true,
            }),
            self.span_from(start),
        )
    }
}

fn with_span(mut expr: Expr, span: Span) -> Expr {
    expr.span = span;
    expr
}

/// `COALESCE(a, b, c)` as `CASE WHEN a IS NOT NULL THEN a ELSE ...`.
fn coalesce(mut args: Vec<Expr>) -> Expr {
    let Some(last) = args.pop() else {
        return Expr::null(Span::default());
    };
    args.into_iter().rev().fold(last, |acc, arg| {
        Expr::case_when(Expr::is_null(arg.clone(), true), arg, acc)
    })
}

/// `NULLIF(a, b)` as `CASE WHEN a = b THEN NULL ELSE a END`.
fn nullif(mut args: Vec<Expr>) -> Expr {
    let second = args.pop().unwrap_or_else(|| Expr::null(Span::default()));
    let first = args.pop().unwrap_or_else(|| Expr::null(Span::default()));
    let span = first.span;
    Expr::case_when(
        Expr::binary(BinaryOp::Eq, first.clone(), second),
        Expr::null(span),
        first,
    )
}

/// `LEAST`/`GREATEST` as a flat searched CASE. Branch `i` wins when `a_i` is
/// not NULL and `a_i keep a_j` holds for every later non-NULL `a_j`; earlier
/// arguments already lost their own branch. NULL arguments are skipped.
fn extreme(mut args: Vec<Expr>, keep: BinaryOp) -> Expr {
    let Some(last) = args.pop() else {
        return Expr::null(Span::default());
    };
    let mut branches = Vec::with_capacity(args.len());
    for (i, arg) in args.iter().enumerate() {
        let mut condition = Expr::is_null(arg.clone(), true);
        for other in args[i + 1..].iter().chain(std::iter::once(&last)) {
            let wins = Expr::or(
                Expr::is_null(other.clone(), false),
                Expr::binary(keep, arg.clone(), other.clone()),
            );
            condition = Expr::and(condition, wins);
        }
        branches.push(condition);
    }
    args.into_iter()
        .zip(branches)
        .rev()
        .fold(last, |acc, (arg, condition)| Expr::case_when(condition, arg, acc))
}

/// `DECODE(e, s1, r1, ..., [default])`; NULL matches NULL.
fn decode(mut args: Vec<Expr>) -> Expr {
    let subject = args.remove(0);
    let otherwise = if args.len() % 2 == 1 {
        args.pop()
    } else {
        None
    }
    .unwrap_or_else(|| Expr::null(subject.span));

    let mut pairs = Vec::new();
    let mut iter = args.into_iter();
    while let (Some(search), Some(result)) = (iter.next(), iter.next()) {
        pairs.push((search, result));
    }
    pairs.into_iter().rev().fold(otherwise, |acc, (search, result)| {
        let span = search.span;
        let condition = Expr::new(
            ExprKind::IsDistinctFrom {
                left: Box::new(subject.clone()),
                right: Box::new(search),
                negated: true,
            },
            span,
        );
        Expr::case_when(condition, result, acc)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{AllowAll, MemoryCatalog, RoutineDef, SequenceDef};
    use crate::config::CompilerConfig;

    fn parse_with(catalog: &MemoryCatalog, sql: &str) -> Result<Expr> {
        let config = CompilerConfig::default();
        let mut parser = Parser::new(sql, catalog, &AllowAll, &config);
        parser.parse_expression()
    }

    fn parse(sql: &str) -> Result<Expr> {
        parse_with(&MemoryCatalog::new(), sql)
    }

    fn case_depth(expr: &Expr) -> usize {
        match &expr.kind {
            ExprKind::CaseWhen { otherwise, .. } => 1 + case_depth(otherwise),
            _ => 0,
        }
    }

    #[test]
    fn test_coalesce_becomes_case_chain() {
        let expr = parse("COALESCE(a, b, c)").unwrap();
        assert_eq!(case_depth(&expr), 2);
        let ExprKind::CaseWhen { condition, .. } = &expr.kind else {
            panic!("expected CASE");
        };
        assert!(matches!(condition.kind, ExprKind::IsNull { negated: true, .. }));
    }

    #[test]
    fn test_case_without_else_yields_null() {
        let expr = parse("CASE WHEN a = 1 THEN 'x' WHEN a = 2 THEN 'y' END").unwrap();
        assert_eq!(case_depth(&expr), 2);
        let ExprKind::CaseWhen { otherwise, .. } = &expr.kind else {
            panic!("expected CASE");
        };
        let ExprKind::CaseWhen { otherwise, .. } = &otherwise.kind else {
            panic!("expected CASE");
        };
        assert!(otherwise.is_null_literal());
    }

    #[test]
    fn test_simple_case_compares_operand() {
        let expr = parse("CASE a WHEN 1, 2 THEN 'low' ELSE 'high' END").unwrap();
        let ExprKind::CaseWhen { condition, .. } = &expr.kind else {
            panic!("expected CASE");
        };
        assert!(matches!(condition.kind, ExprKind::Binary { op: BinaryOp::Or, .. }));
    }

    #[test]
    fn test_nullif_and_decode() {
        assert_eq!(case_depth(&parse("NULLIF(a, 0)").unwrap()), 1);
        assert_eq!(case_depth(&parse("DECODE(a, 1, 'one', 2, 'two', 'many')").unwrap()), 2);
        assert!(parse("NULLIF(a)").is_err());
    }

    fn node_count(expr: &Expr) -> usize {
        1 + expr.children().into_iter().map(node_count).sum::<usize>()
    }

    fn arguments(n: usize) -> String {
        (0..n).map(|i| format!("c{i}")).collect::<Vec<_>>().join(", ")
    }

    #[test]
    fn test_least_and_greatest_become_flat_case_chains() {
        let expr = parse("GREATEST(a, b, c)").unwrap();
        assert_eq!(case_depth(&expr), 2);
        let ExprKind::CaseWhen { condition, then, otherwise } = &expr.kind else {
            panic!("expected CASE");
        };
        assert!(matches!(&then.kind, ExprKind::Column(c) if c.name == "A"));
        assert!(matches!(condition.kind, ExprKind::Binary { op: BinaryOp::And, .. }));
        let ExprKind::CaseWhen { then, otherwise, .. } = &otherwise.kind else {
            panic!("expected CASE");
        };
        assert!(matches!(&then.kind, ExprKind::Column(c) if c.name == "B"));
        assert!(matches!(&otherwise.kind, ExprKind::Column(c) if c.name == "C"));

        let expr = parse("LEAST(a, b)").unwrap();
        let ExprKind::CaseWhen { condition, .. } = &expr.kind else {
            panic!("expected CASE");
        };
        let ExprKind::Binary { right, .. } = &condition.kind else {
            panic!("expected AND");
        };
        let ExprKind::Binary { right, .. } = &right.kind else {
            panic!("expected OR");
        };
        assert!(matches!(right.kind, ExprKind::Binary { op: BinaryOp::LtEq, .. }));
        assert!(matches!(parse("LEAST(a)").unwrap().kind, ExprKind::Column(_)));
    }

    #[test]
    fn test_greatest_size_does_not_double_per_argument() {
        let small = node_count(&parse(&format!("GREATEST({})", arguments(20))).unwrap());
        let large = node_count(&parse(&format!("GREATEST({})", arguments(40))).unwrap());
        assert_eq!(case_depth(&parse(&format!("GREATEST({})", arguments(40))).unwrap()), 39);
        assert!(small < 20 * 20 * 8, "{small}");
        assert!(large <= small * 5, "{small} -> {large}");
    }

    #[test]
    fn test_aggregates() {
        let expr = parse("COUNT(*)").unwrap();
        assert!(matches!(
            expr.kind,
            ExprKind::Aggregate { function: AggregateFunction::Count, argument: None, .. }
        ));
        let expr = parse("SUM(DISTINCT x)").unwrap();
        assert!(matches!(expr.kind, ExprKind::Aggregate { distinct: true, .. }));
        let err = parse("MAX(COUNT(x))").unwrap_err();
        assert!(matches!(err.kind, ErrorKind::MisplacedAggregate(_)));
    }

    #[test]
    fn test_special_syntax_functions() {
        for sql in [
            "SUBSTRING(name FROM 2 FOR 3)",
            "SUBSTRING(name, 2)",
            "POSITION('a' IN name)",
            "TRIM(LEADING '0' FROM code)",
            "TRIM(name)",
            "EXTRACT(YEAR FROM d)",
            "CAST(x AS VARCHAR(10))",
            "CURRENT_DATE",
        ] {
            assert!(parse(sql).is_ok(), "{sql}");
        }
        assert!(parse("ABS(1, 2)").is_err());
    }

    #[test]
    fn test_routines_and_sequences_come_from_catalog() {
        let catalog = MemoryCatalog::new()
            .with_routine(RoutineDef {
                name: QualifiedName::new("PUBLIC", "TAX"),
                parameters: vec![DataType::Integer],
                returns: Some(DataType::Integer),
            })
            .with_sequence(SequenceDef {
                name: QualifiedName::new("PUBLIC", "SEQ"),
                data_type: DataType::Bigint,
            });
        assert!(parse_with(&catalog, "TAX(1)").is_ok());
        assert!(parse_with(&catalog, "TAX(1, 2)").is_err());
        assert!(matches!(
            parse("MISSING(1)").unwrap_err().kind,
            ErrorKind::ObjectNotFound(_)
        ));

        let next = parse_with(&catalog, "NEXT VALUE FOR seq").unwrap();
        assert_eq!(next.data_type, Some(DataType::Bigint));
        assert!(parse("NEXT VALUE FOR seq").is_err());
    }
}
