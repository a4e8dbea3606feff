//! Query expressions, FROM-clause range variables and subqueries.

use std::ops::Range;

use super::{DataType, Expr, QualifiedName};
use crate::lexer::Span;

/// Identifies a subquery within one statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubQueryId(pub usize);

/// A named, typed column of a query result or range variable.
#[derive(Debug, Clone, PartialEq)]
pub struct OutputColumn {
    pub name: String,
    /// Filled in by type resolution.
    pub data_type: Option<DataType>,
}

/// One `ORDER BY` item.
#[derive(Debug, Clone, PartialEq)]
pub struct SortItem {
    pub expr: Expr,
    pub descending: bool,
    /// `NULLS FIRST` (false) / `NULLS LAST` (true), if written.
    pub nulls_last: Option<bool>,
    /// Zero-based select-list position when the item names an output column.
    pub output_column: Option<usize>,
}

/// Normalized `LIMIT` / `TOP` / `OFFSET ... FETCH` row slice.
#[derive(Debug, Clone, PartialEq)]
pub struct Limit {
    /// Rows to skip; a literal 0 when not written.
    pub offset: Expr,
    /// Rows to return; `None` when only an offset was written.
    pub count: Option<Expr>,
}

/// Ordering and slicing attached to a query expression.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SortAndSlice {
    pub order_by: Vec<SortItem>,
    pub limit: Option<Limit>,
}

impl SortAndSlice {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.order_by.is_empty() && self.limit.is_none()
    }
}

/// Set operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetOperator {
    Union,
    Intersect,
    Except,
}

impl SetOperator {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Union => "UNION",
            Self::Intersect => "INTERSECT",
            Self::Except => "EXCEPT",
        }
    }
}

/// `left op [ALL] [CORRESPONDING] right`.
#[derive(Debug, Clone, PartialEq)]
pub struct SetOperation {
    pub operator: SetOperator,
    pub all: bool,
    /// True when CORRESPONDING selected the columns.
    pub corresponding: bool,
    pub left: QueryExpression,
    pub right: QueryExpression,
    /// Positions of the participating columns in `left`.
    pub left_columns: Vec<usize>,
    /// Positions of the participating columns in `right`.
    pub right_columns: Vec<usize>,
}

/// Body of a query expression.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryBody {
    /// `SELECT ... FROM ...` (also `TABLE t`).
    Select(Box<QuerySpecification>),
    /// `VALUES row, row, ...`; every row is an [`super::ExprKind::Row`].
    Values(Vec<Expr>),
    /// Set operation.
    SetOperation(Box<SetOperation>),
    /// Parenthesized query expression carrying its own WITH/ORDER BY/LIMIT.
    Nested(Box<QueryExpression>),
}

/// A complete query expression with its result columns.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryExpression {
    /// CTEs declared by this query's `WITH` clause.
    pub with: Vec<SubQueryId>,
    pub body: QueryBody,
    pub sort: SortAndSlice,
    /// Result columns; names are known after parsing, types after resolution.
    pub columns: Vec<OutputColumn>,
    /// Nesting depth at which the query was parsed.
    pub depth: u32,
    pub span: Span,
}

impl Default for QueryExpression {
    fn default() -> Self {
        Self {
            with: Vec::new(),
            body: QueryBody::Values(Vec::new()),
            sort: SortAndSlice::default(),
            columns: Vec::new(),
            depth: 0,
            span: Span::default(),
        }
    }
}

impl QueryExpression {
    /// The single query specification, if the body is one.
    #[must_use]
    pub fn specification(&self) -> Option<&QuerySpecification> {
        match &self.body {
            QueryBody::Select(spec) => Some(spec),
            _ => None,
        }
    }

    /// Number of result columns.
    #[must_use]
    pub fn degree(&self) -> usize {
        self.columns.len()
    }
}

/// One item of a select list.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectItem {
    pub expr: Expr,
    pub alias: Option<String>,
}

/// `SELECT [DISTINCT] list FROM ... WHERE ... GROUP BY ... HAVING ...`.
#[derive(Debug, Clone, PartialEq)]
pub struct QuerySpecification {
    pub distinct: bool,
    /// Select list; `*` is already expanded.
    pub select_list: Vec<SelectItem>,
    pub from: Vec<RangeVariable>,
    pub where_clause: Option<Expr>,
    pub group_by: Vec<Expr>,
    pub having: Option<Expr>,
    /// Set when the specification uses GROUP BY or set functions.
    pub aggregated: bool,
    /// `TOP n` / `SELECT LIMIT` slice applying to this specification only,
    /// when it is an operand of a set operation.
    pub limit: Option<Limit>,
    pub depth: u32,
}

/// Join kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinKind {
    /// First FROM item, or an item after a comma.
    Cross,
    Inner,
    Left,
    Right,
    Full,
    Union,
}

/// What a range variable reads from.
#[derive(Debug, Clone, PartialEq)]
pub enum RangeSource {
    /// A base table or view from the catalog.
    Table(QualifiedName),
    /// A derived table or a reference to a CTE.
    SubQuery(SubQueryId),
    /// A recursive CTE referenced from inside its own definition.
    RecursiveReference(String),
    /// `OLD`/`NEW` row or table of a trigger.
    Transition(QualifiedName),
}

/// A column exposed by a range variable.
#[derive(Debug, Clone, PartialEq)]
pub struct RangeColumn {
    /// Visible name (after any column alias list).
    pub name: String,
    pub data_type: Option<DataType>,
    /// Hidden by a NATURAL/USING merge: reachable only through a qualifier.
    pub merged: bool,
}

/// A FROM-clause contributor.
#[derive(Debug, Clone, PartialEq)]
pub struct RangeVariable {
    /// Index assigned by the compile context.
    pub index: usize,
    pub source: RangeSource,
    /// Name the range variable is known by when no alias is given.
    pub table_name: Option<QualifiedName>,
    pub alias: Option<String>,
    pub columns: Vec<RangeColumn>,
    pub join: JoinKind,
    /// ON condition, or the equi-join synthesized for NATURAL/USING.
    pub condition: Option<Expr>,
    /// Starts a new comma-separated FROM item.
    pub boundary: bool,
    pub natural: bool,
    /// Column names listed in USING.
    pub using: Vec<String>,
    /// Positions in the FROM list the join condition may reference: its
    /// join group up to the last range of this join's right operand.
    pub scope: Range<usize>,
    /// Rows of this variable may be padded with NULLs by an outer join.
    pub null_supplying: bool,
    /// Token position where the reference starts.
    pub position: usize,
    pub depth: u32,
}

impl RangeVariable {
    /// The name qualifying this variable's columns: alias, else table name.
    #[must_use]
    pub fn exposed_name(&self) -> Option<&str> {
        self.alias
            .as_deref()
            .or_else(|| self.table_name.as_ref().map(|n| n.name.as_str()))
    }

    /// Whether `schema.table` (either part optional) designates this variable.
    #[must_use]
    pub fn matches_qualifier(&self, schema: Option<&str>, table: &str) -> bool {
        if self.alias.is_some() {
            return schema.is_none() && self.alias.as_deref() == Some(table);
        }
        match &self.table_name {
            Some(name) => {
                name.name == table
                    && schema.map_or(true, |s| name.schema.as_deref() == Some(s))
            }
            None => false,
        }
    }

    /// Ordinal of column `name`; merged columns only when `include_merged`.
    #[must_use]
    pub fn find_column(&self, name: &str, include_merged: bool) -> Option<usize> {
        self.columns
            .iter()
            .position(|c| c.name == name && (include_merged || !c.merged))
    }
}

/// Mode a subquery is used in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubQueryKind {
    /// Single value.
    Scalar,
    /// Single row of several values.
    Row,
    /// Whole table, e.g. the right side of a row comparison against a table.
    Table,
    Exists,
    Unique,
    /// `IN (subquery)`.
    In,
    /// `ANY`/`SOME`/`ALL` comparison.
    Quantified,
    /// `MATCH` predicate.
    Match,
    /// FROM-clause derived table.
    Derived,
    /// `WITH name AS (...)`.
    Cte,
    /// View body compiled for its column list.
    View,
}

/// A nested query expression owned by the statement.
#[derive(Debug, Clone, PartialEq)]
pub struct SubQuery {
    pub id: SubQueryId,
    pub kind: SubQueryKind,
    /// Nesting depth of the query body.
    pub depth: u32,
    /// CTE name, or derived table alias.
    pub name: Option<String>,
    pub query: QueryExpression,
    /// References a column of an enclosing query.
    pub correlated: bool,
    /// Token position of the opening bracket.
    pub position: usize,
    pub span: Span,
    /// Subqueries this one must be materialized after: the ones nested in
    /// it and the CTEs it reads.
    pub dependencies: Vec<SubQueryId>,
    /// Set once name resolution has processed the body.
    pub resolved: bool,
}

impl SubQuery {
    /// Result columns, usable as the column list of a FROM-clause source.
    #[must_use]
    pub fn columns(&self) -> &[OutputColumn] {
        &self.query.columns
    }
}
