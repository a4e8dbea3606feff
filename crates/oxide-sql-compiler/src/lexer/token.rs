//! Token types for the SQL lexer.

use std::fmt;

use super::Span;

macro_rules! keywords {
    ($($variant:ident => $text:literal),+ $(,)?) => {
        /// SQL keywords, reserved and non-reserved.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum Keyword {
            $($variant,)+
        }

        impl Keyword {
            /// Looks up a keyword, ignoring ASCII case.
            #[must_use]
            #[allow(clippy::should_implement_trait)]
            pub fn from_str(s: &str) -> Option<Self> {
                let upper = s.to_ascii_uppercase();
                match upper.as_str() {
                    $($text => Some(Self::$variant),)+
                    _ => None,
                }
            }

            /// Returns the canonical (upper case) spelling.
            #[must_use]
            pub const fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $text,)+
                }
            }
        }
    };
}

keywords! {
    Action => "ACTION",
    Add => "ADD",
    Admin => "ADMIN",
    After => "AFTER",
    All => "ALL",
    Alter => "ALTER",
    Always => "ALWAYS",
    And => "AND",
    Any => "ANY",
    As => "AS",
    Asc => "ASC",
    Asymmetric => "ASYMMETRIC",
    Atomic => "ATOMIC",
    Authorization => "AUTHORIZATION",
    Before => "BEFORE",
    Begin => "BEGIN",
    Between => "BETWEEN",
    Bigint => "BIGINT",
    Binary => "BINARY",
    Blob => "BLOB",
    Boolean => "BOOLEAN",
    Both => "BOTH",
    By => "BY",
    Cached => "CACHED",
    Cascade => "CASCADE",
    Cascaded => "CASCADED",
    Case => "CASE",
    Cast => "CAST",
    Char => "CHAR",
    Character => "CHARACTER",
    Check => "CHECK",
    Clob => "CLOB",
    Coalesce => "COALESCE",
    Collate => "COLLATE",
    Collation => "COLLATION",
    Column => "COLUMN",
    Commit => "COMMIT",
    Constraint => "CONSTRAINT",
    Corresponding => "CORRESPONDING",
    Create => "CREATE",
    Cross => "CROSS",
    Current => "CURRENT",
    CurrentDate => "CURRENT_DATE",
    CurrentTime => "CURRENT_TIME",
    CurrentTimestamp => "CURRENT_TIMESTAMP",
    CurrentUser => "CURRENT_USER",
    Cycle => "CYCLE",
    Data => "DATA",
    Date => "DATE",
    Datetime => "DATETIME",
    Decimal => "DECIMAL",
    Default => "DEFAULT",
    Delete => "DELETE",
    Desc => "DESC",
    Distinct => "DISTINCT",
    Domain => "DOMAIN",
    Double => "DOUBLE",
    Drop => "DROP",
    Each => "EACH",
    Else => "ELSE",
    End => "END",
    Escape => "ESCAPE",
    Except => "EXCEPT",
    Execute => "EXECUTE",
    Exists => "EXISTS",
    Extract => "EXTRACT",
    False => "FALSE",
    Fetch => "FETCH",
    First => "FIRST",
    Float => "FLOAT",
    For => "FOR",
    Foreign => "FOREIGN",
    From => "FROM",
    Full => "FULL",
    Function => "FUNCTION",
    Generated => "GENERATED",
    Get => "GET",
    Global => "GLOBAL",
    Grant => "GRANT",
    Granted => "GRANTED",
    Group => "GROUP",
    Having => "HAVING",
    Identity => "IDENTITY",
    If => "IF",
    In => "IN",
    Increment => "INCREMENT",
    Index => "INDEX",
    Inner => "INNER",
    Insert => "INSERT",
    Instead => "INSTEAD",
    Int => "INT",
    Integer => "INTEGER",
    Intersect => "INTERSECT",
    Into => "INTO",
    Is => "IS",
    Join => "JOIN",
    Key => "KEY",
    Last => "LAST",
    Leading => "LEADING",
    Left => "LEFT",
    Like => "LIKE",
    Limit => "LIMIT",
    Local => "LOCAL",
    Localtime => "LOCALTIME",
    Localtimestamp => "LOCALTIMESTAMP",
    Match => "MATCH",
    Maxvalue => "MAXVALUE",
    Memory => "MEMORY",
    Minvalue => "MINVALUE",
    Natural => "NATURAL",
    New => "NEW",
    Next => "NEXT",
    No => "NO",
    Not => "NOT",
    Null => "NULL",
    Nullif => "NULLIF",
    Nulls => "NULLS",
    Numeric => "NUMERIC",
    Of => "OF",
    Offset => "OFFSET",
    Old => "OLD",
    On => "ON",
    Only => "ONLY",
    Option => "OPTION",
    Or => "OR",
    Order => "ORDER",
    Outer => "OUTER",
    Overlaps => "OVERLAPS",
    Partial => "PARTIAL",
    Password => "PASSWORD",
    Position => "POSITION",
    Precision => "PRECISION",
    Preserve => "PRESERVE",
    Primary => "PRIMARY",
    Privileges => "PRIVILEGES",
    Procedure => "PROCEDURE",
    Public => "PUBLIC",
    Real => "REAL",
    Recursive => "RECURSIVE",
    References => "REFERENCES",
    Referencing => "REFERENCING",
    Rename => "RENAME",
    Restart => "RESTART",
    Restrict => "RESTRICT",
    Revoke => "REVOKE",
    Right => "RIGHT",
    Role => "ROLE",
    Routine => "ROUTINE",
    Row => "ROW",
    Rows => "ROWS",
    Schema => "SCHEMA",
    Select => "SELECT",
    Sequence => "SEQUENCE",
    SessionUser => "SESSION_USER",
    Set => "SET",
    Simple => "SIMPLE",
    Smallint => "SMALLINT",
    Some => "SOME",
    Start => "START",
    Statement => "STATEMENT",
    Substring => "SUBSTRING",
    Symmetric => "SYMMETRIC",
    Table => "TABLE",
    Temp => "TEMP",
    Temporary => "TEMPORARY",
    Text => "TEXT",
    Then => "THEN",
    Time => "TIME",
    Timestamp => "TIMESTAMP",
    Tinyint => "TINYINT",
    To => "TO",
    Top => "TOP",
    Trailing => "TRAILING",
    Trigger => "TRIGGER",
    Trim => "TRIM",
    True => "TRUE",
    Truncate => "TRUNCATE",
    Type => "TYPE",
    Union => "UNION",
    Unique => "UNIQUE",
    Unknown => "UNKNOWN",
    Update => "UPDATE",
    Usage => "USAGE",
    User => "USER",
    Using => "USING",
    Value => "VALUE",
    Values => "VALUES",
    Varbinary => "VARBINARY",
    Varchar => "VARCHAR",
    Varying => "VARYING",
    View => "VIEW",
    When => "WHEN",
    Where => "WHERE",
    With => "WITH",
}

impl Keyword {
    /// Reserved keywords can never stand in for an identifier unless quoted.
    #[must_use]
    pub const fn is_reserved(&self) -> bool {
        matches!(
            self,
            Self::All
                | Self::Alter
                | Self::And
                | Self::Any
                | Self::As
                | Self::Between
                | Self::Both
                | Self::By
                | Self::Case
                | Self::Cast
                | Self::Check
                | Self::Constraint
                | Self::Corresponding
                | Self::Create
                | Self::Cross
                | Self::CurrentDate
                | Self::CurrentTime
                | Self::CurrentTimestamp
                | Self::CurrentUser
                | Self::Default
                | Self::Delete
                | Self::Distinct
                | Self::Drop
                | Self::Else
                | Self::End
                | Self::Escape
                | Self::Except
                | Self::Exists
                | Self::False
                | Self::Fetch
                | Self::For
                | Self::Foreign
                | Self::From
                | Self::Full
                | Self::Grant
                | Self::Group
                | Self::Having
                | Self::In
                | Self::Inner
                | Self::Insert
                | Self::Intersect
                | Self::Into
                | Self::Is
                | Self::Join
                | Self::Leading
                | Self::Left
                | Self::Like
                | Self::Localtime
                | Self::Localtimestamp
                | Self::Natural
                | Self::Not
                | Self::Null
                | Self::Offset
                | Self::On
                | Self::Or
                | Self::Order
                | Self::Outer
                | Self::Overlaps
                | Self::Primary
                | Self::References
                | Self::Revoke
                | Self::Right
                | Self::Row
                | Self::Select
                | Self::SessionUser
                | Self::Set
                | Self::Some
                | Self::Symmetric
                | Self::Table
                | Self::Then
                | Self::To
                | Self::Trailing
                | Self::True
                | Self::Union
                | Self::Unique
                | Self::Unknown
                | Self::Update
                | Self::Using
                | Self::Values
                | Self::When
                | Self::Where
                | Self::With
        )
    }
}

impl fmt::Display for Keyword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The kind of token.
#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    // Literals
    /// Integer literal that fits in 64 bits (e.g., 42)
    Integer(i64),
    /// Exact numeric literal with a fraction or out of `i64` range (e.g., 3.14)
    Decimal(String),
    /// Approximate numeric literal with an exponent (e.g., 1e10)
    Float(f64),
    /// String literal (e.g., 'hello')
    String(String),
    /// Binary literal (e.g., X'1234')
    Blob(Vec<u8>),

    // Identifiers and keywords
    /// Identifier, folded to upper case unless quoted
    Identifier(String),
    /// SQL keyword
    Keyword(Keyword),

    // Parameters
    /// `?`
    Question,
    /// `:name`
    NamedParameter(String),

    // Operators
    /// +
    Plus,
    /// -
    Minus,
    /// *
    Star,
    /// /
    Slash,
    /// %
    Percent,
    /// =
    Eq,
    /// != or <>
    NotEq,
    /// <
    Lt,
    /// <=
    LtEq,
    /// >
    Gt,
    /// >=
    GtEq,
    /// ||
    Concat,

    // Delimiters
    /// (
    LeftParen,
    /// )
    RightParen,
    /// ,
    Comma,
    /// ;
    Semicolon,
    /// .
    Dot,

    // Special
    /// End of input
    Eof,
    /// Malformed input, carries the scanner's message
    Error(String),
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Integer(i) => write!(f, "{i}"),
            Self::Decimal(d) => f.write_str(d),
            Self::Float(v) => write!(f, "{v}"),
            Self::String(s) => write!(f, "'{s}'"),
            Self::Blob(_) => f.write_str("binary literal"),
            Self::Identifier(name) => f.write_str(name),
            Self::Keyword(kw) => f.write_str(kw.as_str()),
            Self::Question => f.write_str("?"),
            Self::NamedParameter(name) => write!(f, ":{name}"),
            Self::Plus => f.write_str("+"),
            Self::Minus => f.write_str("-"),
            Self::Star => f.write_str("*"),
            Self::Slash => f.write_str("/"),
            Self::Percent => f.write_str("%"),
            Self::Eq => f.write_str("="),
            Self::NotEq => f.write_str("<>"),
            Self::Lt => f.write_str("<"),
            Self::LtEq => f.write_str("<="),
            Self::Gt => f.write_str(">"),
            Self::GtEq => f.write_str(">="),
            Self::Concat => f.write_str("||"),
            Self::LeftParen => f.write_str("("),
            Self::RightParen => f.write_str(")"),
            Self::Comma => f.write_str(","),
            Self::Semicolon => f.write_str(";"),
            Self::Dot => f.write_str("."),
            Self::Eof => f.write_str("end of input"),
            Self::Error(message) => f.write_str(message),
        }
    }
}

/// A token with its span in the source code.
///
/// Dotted names (`s.t.c`, `t.*`) arrive as a single token whose `qualifiers`
/// hold the leading parts, outermost first.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    /// The kind of token.
    pub kind: TokenKind,
    /// The location in the source code.
    pub span: Span,
    /// The identifier was written between double quotes.
    pub quoted: bool,
    /// Qualifying name parts preceding the last one (at most three).
    pub qualifiers: Vec<String>,
}

impl Token {
    /// Creates a new unqualified token.
    #[must_use]
    pub const fn new(kind: TokenKind, span: Span) -> Self {
        Self {
            kind,
            span,
            quoted: false,
            qualifiers: Vec::new(),
        }
    }

    /// Returns true if this is an EOF token.
    #[must_use]
    pub const fn is_eof(&self) -> bool {
        matches!(self.kind, TokenKind::Eof)
    }

    /// Returns the keyword if this is a keyword token.
    #[must_use]
    pub const fn as_keyword(&self) -> Option<Keyword> {
        match &self.kind {
            TokenKind::Keyword(kw) => Some(*kw),
            _ => None,
        }
    }

    /// Returns true for `?` and `:name` placeholders.
    #[must_use]
    pub const fn is_host_parameter(&self) -> bool {
        matches!(self.kind, TokenKind::Question | TokenKind::NamedParameter(_))
    }

    /// Returns true if the token carries dotted qualifiers.
    #[must_use]
    pub fn is_qualified(&self) -> bool {
        !self.qualifiers.is_empty()
    }

    /// The text of an identifier-like token: identifiers, and non-reserved
    /// keywords that stand in for one.
    #[must_use]
    pub fn identifier_text(&self) -> Option<&str> {
        match &self.kind {
            TokenKind::Identifier(name) => Some(name),
            TokenKind::Keyword(kw) if !kw.is_reserved() => Some(kw.as_str()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keyword_lookup_ignores_case() {
        assert_eq!(Keyword::from_str("SELECT"), Some(Keyword::Select));
        assert_eq!(Keyword::from_str("current_date"), Some(Keyword::CurrentDate));
        assert_eq!(Keyword::from_str("SeLeCt"), Some(Keyword::Select));
        assert_eq!(Keyword::from_str("not_a_keyword"), None);
    }

    #[test]
    fn reserved_keywords_are_not_identifiers() {
        let select = Token::new(TokenKind::Keyword(Keyword::Select), Span::new(0, 6));
        let limit = Token::new(TokenKind::Keyword(Keyword::Limit), Span::new(0, 5));
        assert_eq!(select.identifier_text(), None);
        assert_eq!(limit.identifier_text(), Some("LIMIT"));
    }

    #[test]
    fn host_parameters() {
        let q = Token::new(TokenKind::Question, Span::new(0, 1));
        let named = Token::new(TokenKind::NamedParameter("id".into()), Span::new(0, 3));
        let plus = Token::new(TokenKind::Plus, Span::new(0, 1));
        assert!(q.is_host_parameter());
        assert!(named.is_host_parameter());
        assert!(!plus.is_host_parameter());
    }
}
