//! Error types for statement compilation.

use crate::lexer::Span;

/// What went wrong while compiling a statement.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ErrorKind {
    /// A token that no production accepts at this point.
    #[error("unexpected token {found}, expected {expected}")]
    UnexpectedToken {
        /// What the grammar was looking for.
        expected: String,
        /// The token text that was found.
        found: String,
    },

    /// The statement ended early.
    #[error("unexpected end of statement, expected {0}")]
    UnexpectedEnd(String),

    /// The scanner could not form a token.
    #[error("malformed token: {0}")]
    MalformedToken(String),

    /// Table, sequence, domain or other schema object not found.
    #[error("object not found: {0}")]
    ObjectNotFound(String),

    /// Object with this name already exists.
    #[error("object already exists: {0}")]
    ObjectExists(String),

    /// A column reference matches no visible column.
    #[error("column not found: {0}")]
    ColumnNotFound(String),

    /// A column reference matches more than one visible column.
    #[error("ambiguous column reference: {0}")]
    AmbiguousColumn(String),

    /// A name is declared twice where names must be distinct.
    #[error("duplicate name: {0}")]
    DuplicateName(String),

    /// A second PRIMARY KEY in one table definition.
    #[error("table {0} already has a primary key")]
    DuplicatePrimaryKey(String),

    /// Column lists of unequal length.
    #[error("column count mismatch: expected {expected}, found {found}")]
    ColumnCountMismatch {
        /// Count required by the left side or target.
        expected: usize,
        /// Count supplied.
        found: usize,
    },

    /// Row values of unequal degree.
    #[error("row degree mismatch: expected {expected}, found {found}")]
    DegreeMismatch {
        /// Degree required.
        expected: usize,
        /// Degree supplied.
        found: usize,
    },

    /// Operand types cannot be combined.
    #[error("incompatible data type: {0}")]
    WrongDataType(String),

    /// A `?` whose type cannot be inferred from its surroundings.
    #[error("data type of dynamic parameter cannot be determined")]
    UnresolvedParameterType,

    /// ESCAPE literal that is not exactly one character.
    #[error("invalid escape character: {0}")]
    InvalidEscape(String),

    /// LIMIT/OFFSET/FETCH bound that is not a parameter or non-negative integer.
    #[error("invalid row limit: {0}")]
    InvalidLimit(String),

    /// Column reference outside aggregates that is not a grouping column.
    #[error("expression not in aggregate or GROUP BY columns: {0}")]
    NotGroupingColumn(String),

    /// Aggregate used where aggregates are not allowed.
    #[error("invalid use of aggregate function in {0}")]
    MisplacedAggregate(String),

    /// ORDER BY position outside the select list.
    #[error("ORDER BY position {0} is out of range")]
    InvalidOrderPosition(i64),

    /// Definition that is well-formed but inconsistent.
    #[error("invalid definition: {0}")]
    InvalidDefinition(String),

    /// The authorizer refused an operation.
    #[error("access denied: {0}")]
    AccessDenied(String),

    /// Subqueries or expressions nested deeper than the configured limit.
    #[error("nesting exceeds the limit of {0}")]
    NestingTooDeep(u32),

    /// Recognised syntax this compiler does not handle.
    #[error("unsupported feature: {0}")]
    Unsupported(String),
}

impl ErrorKind {
    /// Stable SQLSTATE-style code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::UnexpectedToken { .. } => "42581",
            Self::UnexpectedEnd(_) => "42590",
            Self::MalformedToken(_) => "42582",
            Self::ObjectNotFound(_) => "42501",
            Self::ObjectExists(_) => "42504",
            Self::ColumnNotFound(_) => "42703",
            Self::AmbiguousColumn(_) => "42702",
            Self::DuplicateName(_) => "42578",
            Self::DuplicatePrimaryKey(_) => "42532",
            Self::ColumnCountMismatch { .. } => "42594",
            Self::DegreeMismatch { .. } => "42564",
            Self::WrongDataType(_) => "42561",
            Self::UnresolvedParameterType => "42567",
            Self::InvalidEscape(_) => "22019",
            Self::InvalidLimit(_) => "2201W",
            Self::NotGroupingColumn(_) => "42574",
            Self::MisplacedAggregate(_) => "42572",
            Self::InvalidOrderPosition(_) => "42576",
            Self::InvalidDefinition(_) => "42513",
            Self::AccessDenied(_) => "42502",
            Self::NestingTooDeep(_) => "54001",
            Self::Unsupported(_) => "0A000",
        }
    }
}

/// A compilation failure with its location.
///
/// `depth` is the subquery nesting depth at which the error was raised; it
/// ranks errors from competing parse alternatives.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind} at position {}..{}", .span.start, .span.end)]
pub struct CompileError {
    /// The error category and detail.
    pub kind: ErrorKind,
    /// Where in the statement text.
    pub span: Span,
    /// Nesting depth when raised.
    pub depth: u32,
}

impl CompileError {
    /// Creates an error at `span`.
    #[must_use]
    pub const fn new(kind: ErrorKind, span: Span, depth: u32) -> Self {
        Self { kind, span, depth }
    }

    /// Stable SQLSTATE-style code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        self.kind.code()
    }

    /// True for errors raised by the grammar rather than by name or type checks.
    #[must_use]
    pub const fn is_syntax(&self) -> bool {
        matches!(
            self.kind,
            ErrorKind::UnexpectedToken { .. }
                | ErrorKind::UnexpectedEnd(_)
                | ErrorKind::MalformedToken(_)
        )
    }

    /// Ranks two failures: deeper nesting wins, then the later position.
    #[must_use]
    pub fn deepest(self, other: Self) -> Self {
        if (other.depth, other.span.start) > (self.depth, self.span.start) {
            other
        } else {
            self
        }
    }
}

/// Result type for compilation.
pub type Result<T> = std::result::Result<T, CompileError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_position() {
        let err = CompileError::new(
            ErrorKind::ColumnNotFound("X".into()),
            Span::new(7, 8),
            0,
        );
        assert_eq!(err.to_string(), "column not found: X at position 7..8");
        assert_eq!(err.code(), "42703");
        assert!(!err.is_syntax());
    }

    #[test]
    fn deepest_prefers_depth_then_position() {
        let shallow_late = CompileError::new(ErrorKind::UnexpectedEnd("x".into()), Span::new(30, 30), 0);
        let deep_early = CompileError::new(ErrorKind::UnexpectedEnd("y".into()), Span::new(10, 11), 1);
        let deep_late = CompileError::new(ErrorKind::UnexpectedEnd("z".into()), Span::new(12, 13), 1);

        assert_eq!(shallow_late.clone().deepest(deep_early.clone()), deep_early);
        assert_eq!(deep_early.deepest(deep_late.clone()), deep_late);
        assert!(deep_late.is_syntax());
    }
}
