//! Expression AST types.

use super::{DataType, QualifiedName, SubQueryId};
use crate::lexer::Span;

/// A literal value.
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    /// NULL literal.
    Null,
    /// TRUE / FALSE.
    Boolean(bool),
    /// Integer literal.
    Integer(i64),
    /// Exact numeric literal, kept as written.
    Decimal(String),
    /// Approximate numeric literal.
    Float(f64),
    /// Character string literal.
    String(String),
    /// Binary string literal.
    Binary(Vec<u8>),
    /// `DATE '...'`, `TIME '...'`, `TIMESTAMP '...'`.
    Typed {
        /// The literal's type.
        data_type: DataType,
        /// Text between the quotes.
        text: String,
    },
}

impl Literal {
    /// The type a literal carries on its own; NULL has none.
    #[must_use]
    pub fn data_type(&self) -> Option<DataType> {
        match self {
            Self::Null => None,
            Self::Boolean(_) => Some(DataType::Boolean),
            Self::Integer(i) => Some(if i32::try_from(*i).is_ok() {
                DataType::Integer
            } else {
                DataType::Bigint
            }),
            Self::Decimal(text) => Some(DataType::for_decimal_literal(text)),
            Self::Float(_) => Some(DataType::Double),
            Self::String(s) => Some(DataType::Char(u32::try_from(s.chars().count().max(1)).ok())),
            Self::Binary(b) => Some(DataType::Binary(u32::try_from(b.len().max(1)).ok())),
            Self::Typed { data_type, .. } => Some(data_type.clone()),
        }
    }
}

/// Binary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    // Arithmetic
    Add,
    Sub,
    Mul,
    Div,
    Mod,

    // Comparison
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,

    // Logical
    And,
    Or,

    // String
    Concat,
}

impl BinaryOp {
    /// Returns the SQL representation of the operator.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Add => "+",
            Self::Sub => "-",
            Self::Mul => "*",
            Self::Div => "/",
            Self::Mod => "%",
            Self::Eq => "=",
            Self::NotEq => "<>",
            Self::Lt => "<",
            Self::LtEq => "<=",
            Self::Gt => ">",
            Self::GtEq => ">=",
            Self::And => "AND",
            Self::Or => "OR",
            Self::Concat => "||",
        }
    }

    #[must_use]
    pub const fn is_comparison(&self) -> bool {
        matches!(
            self,
            Self::Eq | Self::NotEq | Self::Lt | Self::LtEq | Self::Gt | Self::GtEq
        )
    }

    #[must_use]
    pub const fn is_arithmetic(&self) -> bool {
        matches!(self, Self::Add | Self::Sub | Self::Mul | Self::Div | Self::Mod)
    }

    #[must_use]
    pub const fn is_logical(&self) -> bool {
        matches!(self, Self::And | Self::Or)
    }
}

/// Unary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    /// Negation (-)
    Neg,
    /// Logical NOT
    Not,
}

/// `ANY`/`SOME` versus `ALL` in a quantified comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Quantifier {
    Any,
    All,
}

/// Match semantics of a `MATCH` predicate or a foreign key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MatchType {
    #[default]
    Simple,
    Partial,
    Full,
}

/// Set functions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregateFunction {
    Count,
    Sum,
    Avg,
    Min,
    Max,
    Every,
    Some,
    StddevPop,
    StddevSamp,
    VarPop,
    VarSamp,
}

impl AggregateFunction {
    /// Recognises a set function by its (upper case) name.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "COUNT" => Self::Count,
            "SUM" => Self::Sum,
            "AVG" => Self::Avg,
            "MIN" => Self::Min,
            "MAX" => Self::Max,
            "EVERY" => Self::Every,
            "SOME" | "ANY" => Self::Some,
            "STDDEV_POP" => Self::StddevPop,
            "STDDEV_SAMP" => Self::StddevSamp,
            "VAR_POP" => Self::VarPop,
            "VAR_SAMP" => Self::VarSamp,
            _ => return None,
        })
    }

    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Count => "COUNT",
            Self::Sum => "SUM",
            Self::Avg => "AVG",
            Self::Min => "MIN",
            Self::Max => "MAX",
            Self::Every => "EVERY",
            Self::Some => "SOME",
            Self::StddevPop => "STDDEV_POP",
            Self::StddevSamp => "STDDEV_SAMP",
            Self::VarPop => "VAR_POP",
            Self::VarSamp => "VAR_SAMP",
        }
    }
}

/// Where a column reference was bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedColumn {
    /// Index of the range variable, as assigned by the compile context.
    pub range: usize,
    /// Ordinal of the column within the range variable.
    pub column: usize,
    /// Nesting depth of the query that owns the range variable.
    pub depth: u32,
}

/// A column reference, possibly qualified.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnRef {
    pub schema: Option<String>,
    pub table: Option<String>,
    pub name: String,
    /// Filled in by name resolution.
    pub resolved: Option<ResolvedColumn>,
}

impl ColumnRef {
    /// The reference as written, for messages.
    #[must_use]
    pub fn display_name(&self) -> String {
        [self.schema.as_deref(), self.table.as_deref(), Some(self.name.as_str())]
            .into_iter()
            .flatten()
            .collect::<Vec<_>>()
            .join(".")
    }
}

/// A function call that is not an aggregate and was not desugared.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionCall {
    /// Function name; built-ins carry no schema.
    pub name: QualifiedName,
    /// Arguments.
    pub args: Vec<Expr>,
    /// True for built-in functions, false for catalog routines.
    pub builtin: bool,
}

/// Expression variants.
#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    /// A literal value.
    Literal(Literal),
    /// A column reference.
    Column(ColumnRef),
    /// `*` or `t.*` in a select list, before expansion.
    Asterisk {
        schema: Option<String>,
        table: Option<String>,
    },
    /// A dynamic parameter, by its index in the statement's parameter list.
    Parameter(usize),
    /// `DEFAULT` in an insert or update source.
    Default,
    /// `VALUE` inside a domain constraint.
    DomainValue,
    /// Row value constructor.
    Row(Vec<Expr>),
    /// Table value constructor (`VALUES` rows, IN lists).
    Table(Vec<Expr>),
    /// Unary operation.
    Unary { op: UnaryOp, operand: Box<Expr> },
    /// Binary operation.
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    /// `IS [NOT] NULL`
    IsNull { operand: Box<Expr>, negated: bool },
    /// `IS [NOT] {TRUE|FALSE|UNKNOWN}`; `value` is `None` for UNKNOWN.
    IsTruth {
        operand: Box<Expr>,
        value: Option<bool>,
        negated: bool,
    },
    /// `IS [NOT] DISTINCT FROM`
    IsDistinctFrom {
        left: Box<Expr>,
        right: Box<Expr>,
        negated: bool,
    },
    /// `[NOT] LIKE pattern [ESCAPE e]`
    Like {
        operand: Box<Expr>,
        pattern: Box<Expr>,
        escape: Option<Box<Expr>>,
        negated: bool,
    },
    /// `[NOT] IN (value, ...)`
    InList {
        operand: Box<Expr>,
        list: Vec<Expr>,
        negated: bool,
    },
    /// `operand op {ANY|ALL} (subquery)`; `IN (subquery)` becomes `= ANY`.
    Quantified {
        op: BinaryOp,
        quantifier: Quantifier,
        operand: Box<Expr>,
        subquery: SubQueryId,
    },
    /// `EXISTS (subquery)`
    Exists(SubQueryId),
    /// `UNIQUE (subquery)`
    Unique(SubQueryId),
    /// `operand MATCH [UNIQUE] [SIMPLE|PARTIAL|FULL] (subquery)`
    Match {
        operand: Box<Expr>,
        subquery: SubQueryId,
        unique: bool,
        match_type: MatchType,
    },
    /// `(a, b) OVERLAPS (c, d)`
    Overlaps { left: Box<Expr>, right: Box<Expr> },
    /// Scalar, row or table subquery.
    SubQuery(SubQueryId),
    /// Set function; `argument` is `None` for `COUNT(*)`.
    Aggregate {
        function: AggregateFunction,
        distinct: bool,
        argument: Option<Box<Expr>>,
    },
    /// One link of a CASE chain.
    CaseWhen {
        condition: Box<Expr>,
        then: Box<Expr>,
        otherwise: Box<Expr>,
    },
    /// Function call.
    Function(FunctionCall),
    /// `CAST(operand AS type)`
    Cast {
        operand: Box<Expr>,
        data_type: DataType,
    },
    /// `NEXT VALUE FOR sequence`
    NextValue(QualifiedName),
    /// `CURRENT VALUE FOR sequence`
    CurrentValue(QualifiedName),
}

/// An expression node with its resolved type and source span.
#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    pub kind: ExprKind,
    /// Set by type resolution; `None` until then, and for untyped NULLs.
    pub data_type: Option<DataType>,
    pub span: Span,
}

impl Expr {
    /// Creates an untyped node.
    #[must_use]
    pub const fn new(kind: ExprKind, span: Span) -> Self {
        Self {
            kind,
            data_type: None,
            span,
        }
    }

    #[must_use]
    pub fn literal(literal: Literal, span: Span) -> Self {
        let data_type = literal.data_type();
        Self {
            kind: ExprKind::Literal(literal),
            data_type,
            span,
        }
    }

    #[must_use]
    pub const fn null(span: Span) -> Self {
        Self::new(ExprKind::Literal(Literal::Null), span)
    }

    #[must_use]
    pub fn column(table: Option<String>, name: impl Into<String>, span: Span) -> Self {
        Self::new(
            ExprKind::Column(ColumnRef {
                schema: None,
                table,
                name: name.into(),
                resolved: None,
            }),
            span,
        )
    }

    #[must_use]
    pub fn binary(op: BinaryOp, left: Self, right: Self) -> Self {
        let span = left.span.merge(right.span);
        Self::new(
            ExprKind::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
            },
            span,
        )
    }

    #[must_use]
    pub fn and(left: Self, right: Self) -> Self {
        Self::binary(BinaryOp::And, left, right)
    }

    #[must_use]
    pub fn or(left: Self, right: Self) -> Self {
        Self::binary(BinaryOp::Or, left, right)
    }

    #[must_use]
    pub fn not(operand: Self) -> Self {
        let span = operand.span;
        Self::new(
            ExprKind::Unary {
                op: UnaryOp::Not,
                operand: Box::new(operand),
            },
            span,
        )
    }

    #[must_use]
    pub fn is_null(operand: Self, negated: bool) -> Self {
        let span = operand.span;
        Self::new(
            ExprKind::IsNull {
                operand: Box::new(operand),
                negated,
            },
            span,
        )
    }

    #[must_use]
    pub fn case_when(condition: Self, then: Self, otherwise: Self) -> Self {
        let span = condition.span.merge(otherwise.span).merge(then.span);
        Self::new(
            ExprKind::CaseWhen {
                condition: Box::new(condition),
                then: Box::new(then),
                otherwise: Box::new(otherwise),
            },
            span,
        )
    }

    /// Returns true for a plain NULL literal.
    #[must_use]
    pub const fn is_null_literal(&self) -> bool {
        matches!(self.kind, ExprKind::Literal(Literal::Null))
    }

    /// The value of an integer literal, if this is one.
    #[must_use]
    pub const fn as_integer(&self) -> Option<i64> {
        match self.kind {
            ExprKind::Literal(Literal::Integer(i)) => Some(i),
            _ => None,
        }
    }

    /// Direct child expressions, in source order. Subquery bodies are not
    /// children; they live in the statement's subquery list.
    #[must_use]
    pub fn children(&self) -> Vec<&Self> {
        match &self.kind {
            ExprKind::Literal(_)
            | ExprKind::Column(_)
            | ExprKind::Asterisk { .. }
            | ExprKind::Parameter(_)
            | ExprKind::Default
            | ExprKind::DomainValue
            | ExprKind::Exists(_)
            | ExprKind::Unique(_)
            | ExprKind::SubQuery(_)
            | ExprKind::NextValue(_)
            | ExprKind::CurrentValue(_) => Vec::new(),
            ExprKind::Row(items) | ExprKind::Table(items) => items.iter().collect(),
            ExprKind::Unary { operand, .. }
            | ExprKind::IsNull { operand, .. }
            | ExprKind::IsTruth { operand, .. }
            | ExprKind::Quantified { operand, .. }
            | ExprKind::Match { operand, .. }
            | ExprKind::Cast { operand, .. } => vec![operand.as_ref()],
            ExprKind::Binary { left, right, .. }
            | ExprKind::IsDistinctFrom { left, right, .. }
            | ExprKind::Overlaps { left, right } => vec![left.as_ref(), right.as_ref()],
            ExprKind::Like {
                operand,
                pattern,
                escape,
                ..
            } => {
                let mut out = vec![operand.as_ref(), pattern.as_ref()];
                out.extend(escape.as_deref());
                out
            }
            ExprKind::InList { operand, list, .. } => {
                let mut out = vec![operand.as_ref()];
                out.extend(list.iter());
                out
            }
            ExprKind::Aggregate { argument, .. } => argument.as_deref().into_iter().collect(),
            ExprKind::CaseWhen {
                condition,
                then,
                otherwise,
            } => vec![condition.as_ref(), then.as_ref(), otherwise.as_ref()],
            ExprKind::Function(call) => call.args.iter().collect(),
        }
    }

    /// Mutable counterpart of [`Expr::children`].
    pub fn children_mut(&mut self) -> Vec<&mut Self> {
        match &mut self.kind {
            ExprKind::Literal(_)
            | ExprKind::Column(_)
            | ExprKind::Asterisk { .. }
            | ExprKind::Parameter(_)
            | ExprKind::Default
            | ExprKind::DomainValue
            | ExprKind::Exists(_)
            | ExprKind::Unique(_)
            | ExprKind::SubQuery(_)
            | ExprKind::NextValue(_)
            | ExprKind::CurrentValue(_) => Vec::new(),
            ExprKind::Row(items) | ExprKind::Table(items) => items.iter_mut().collect(),
            ExprKind::Unary { operand, .. }
            | ExprKind::IsNull { operand, .. }
            | ExprKind::IsTruth { operand, .. }
            | ExprKind::Quantified { operand, .. }
            | ExprKind::Match { operand, .. }
            | ExprKind::Cast { operand, .. } => vec![operand.as_mut()],
            ExprKind::Binary { left, right, .. }
            | ExprKind::IsDistinctFrom { left, right, .. }
            | ExprKind::Overlaps { left, right } => vec![left.as_mut(), right.as_mut()],
            ExprKind::Like {
                operand,
                pattern,
                escape,
                ..
            } => {
                let mut out = vec![operand.as_mut(), pattern.as_mut()];
                out.extend(escape.as_deref_mut());
                out
            }
            ExprKind::InList { operand, list, .. } => {
                let mut out = vec![operand.as_mut()];
                out.extend(list.iter_mut());
                out
            }
            ExprKind::Aggregate { argument, .. } => argument.as_deref_mut().into_iter().collect(),
            ExprKind::CaseWhen {
                condition,
                then,
                otherwise,
            } => vec![condition.as_mut(), then.as_mut(), otherwise.as_mut()],
            ExprKind::Function(call) => call.args.iter_mut().collect(),
        }
    }

    /// Visits this node and every descendant, parents first.
    pub fn walk<'e>(&'e self, visit: &mut dyn FnMut(&'e Self)) {
        visit(self);
        for child in self.children() {
            child.walk(visit);
        }
    }

    /// True if a set function appears outside any nested subquery.
    #[must_use]
    pub fn contains_aggregate(&self) -> bool {
        let mut found = false;
        self.walk(&mut |e| found |= matches!(e.kind, ExprKind::Aggregate { .. }));
        found
    }

    /// Subqueries referenced directly by this expression tree.
    #[must_use]
    pub fn subqueries(&self) -> Vec<SubQueryId> {
        let mut ids = Vec::new();
        self.walk(&mut |e| match &e.kind {
            ExprKind::Quantified { subquery, .. }
            | ExprKind::Match { subquery, .. }
            | ExprKind::Exists(subquery)
            | ExprKind::Unique(subquery)
            | ExprKind::SubQuery(subquery) => ids.push(*subquery),
            _ => {}
        });
        ids
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn col(name: &str) -> Expr {
        Expr::column(None, name, Span::default())
    }

    #[test]
    fn literal_types() {
        assert_eq!(Literal::Integer(7).data_type(), Some(DataType::Integer));
        assert_eq!(Literal::Integer(i64::MAX).data_type(), Some(DataType::Bigint));
        assert_eq!(Literal::Null.data_type(), None);
        assert_eq!(
            Literal::String("abc".into()).data_type(),
            Some(DataType::Char(Some(3)))
        );
    }

    #[test]
    fn walk_visits_all_nodes() {
        let expr = Expr::and(
            Expr::binary(BinaryOp::Eq, col("A"), col("B")),
            Expr::is_null(col("C"), true),
        );
        let mut names = Vec::new();
        expr.walk(&mut |e| {
            if let ExprKind::Column(c) = &e.kind {
                names.push(c.name.clone());
            }
        });
        assert_eq!(names, vec!["A", "B", "C"]);
    }

    #[test]
    fn aggregates_and_subqueries_are_found() {
        let agg = Expr::new(
            ExprKind::Aggregate {
                function: AggregateFunction::Count,
                distinct: false,
                argument: None,
            },
            Span::default(),
        );
        let sub = Expr::new(ExprKind::Exists(SubQueryId(3)), Span::default());
        let expr = Expr::or(agg, sub);
        assert!(expr.contains_aggregate());
        assert_eq!(expr.subqueries(), vec![SubQueryId(3)]);
        assert!(!col("X").contains_aggregate());
    }

    #[test]
    fn column_display_name() {
        let c = ColumnRef {
            schema: Some("S".into()),
            table: Some("T".into()),
            name: "C".into(),
            resolved: None,
        };
        assert_eq!(c.display_name(), "S.T.C");
    }
}
