//! SQL data types and the small type algebra the compiler relies on.

use std::fmt;

use serde::{Deserialize, Serialize};

/// SQL data types.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DataType {
    /// Boolean.
    Boolean,

    // Exact numerics
    /// 1-byte integer.
    Tinyint,
    /// 2-byte integer.
    Smallint,
    /// 4-byte integer.
    Integer,
    /// 8-byte integer.
    Bigint,
    /// Decimal with precision and scale.
    Decimal {
        /// Total number of digits.
        precision: Option<u16>,
        /// Number of digits after the decimal point.
        scale: Option<u16>,
    },
    /// Numeric, identical to Decimal apart from its name.
    Numeric {
        /// Total number of digits.
        precision: Option<u16>,
        /// Number of digits after the decimal point.
        scale: Option<u16>,
    },

    // Approximate numerics
    /// 4-byte float.
    Real,
    /// 8-byte float.
    Double,

    // Character strings
    /// Fixed-length character string.
    Char(Option<u32>),
    /// Variable-length character string.
    Varchar(Option<u32>),
    /// Character large object.
    Clob,

    // Binary strings
    /// Fixed-length binary.
    Binary(Option<u32>),
    /// Variable-length binary.
    Varbinary(Option<u32>),
    /// Binary large object.
    Blob,

    // Datetime
    /// Date.
    Date,
    /// Time of day.
    Time,
    /// Date and time.
    Timestamp,

    /// User-defined distinct type, by qualified name.
    Distinct(String),
}

/// Type codes accepted by [`DataType::for_code`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeCode {
    Boolean,
    Tinyint,
    Smallint,
    Integer,
    Bigint,
    Decimal,
    Numeric,
    Real,
    Double,
    Char,
    Varchar,
    Clob,
    Binary,
    Varbinary,
    Blob,
    Date,
    Time,
    Timestamp,
}

/// The operation two operand types are combined for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeOp {
    /// `+ - * / %`
    Arithmetic,
    /// `||`
    Concat,
    /// Comparison predicates; the result is BOOLEAN.
    Compare,
    /// Set operations, CASE branches, VALUES rows.
    Union,
}

impl DataType {
    /// Builds a type from a code and the optional length/precision and scale.
    #[must_use]
    pub fn for_code(code: TypeCode, length: Option<u32>, scale: Option<u32>) -> Self {
        let precision = length.and_then(|l| u16::try_from(l).ok());
        let scale = scale.and_then(|s| u16::try_from(s).ok());
        match code {
            TypeCode::Boolean => Self::Boolean,
            TypeCode::Tinyint => Self::Tinyint,
            TypeCode::Smallint => Self::Smallint,
            TypeCode::Integer => Self::Integer,
            TypeCode::Bigint => Self::Bigint,
            TypeCode::Decimal => Self::Decimal { precision, scale },
            TypeCode::Numeric => Self::Numeric { precision, scale },
            TypeCode::Real => Self::Real,
            TypeCode::Double => Self::Double,
            TypeCode::Char => Self::Char(length.or(Some(1))),
            TypeCode::Varchar => Self::Varchar(length),
            TypeCode::Clob => Self::Clob,
            TypeCode::Binary => Self::Binary(length.or(Some(1))),
            TypeCode::Varbinary => Self::Varbinary(length),
            TypeCode::Blob => Self::Blob,
            TypeCode::Date => Self::Date,
            TypeCode::Time => Self::Time,
            TypeCode::Timestamp => Self::Timestamp,
        }
    }

    /// Type of an exact numeric literal such as `12.50`.
    #[must_use]
    pub fn for_decimal_literal(text: &str) -> Self {
        let digits = text.chars().filter(char::is_ascii_digit).count();
        let scale = text.split_once('.').map_or(0, |(_, frac)| frac.len());
        Self::Decimal {
            precision: u16::try_from(digits.max(1)).ok(),
            scale: u16::try_from(scale).ok(),
        }
    }

    #[must_use]
    pub const fn is_numeric(&self) -> bool {
        self.numeric_rank().is_some()
    }

    #[must_use]
    pub const fn is_integral(&self) -> bool {
        matches!(
            self,
            Self::Tinyint | Self::Smallint | Self::Integer | Self::Bigint
        )
    }

    #[must_use]
    pub const fn is_character(&self) -> bool {
        matches!(self, Self::Char(_) | Self::Varchar(_) | Self::Clob)
    }

    #[must_use]
    pub const fn is_binary(&self) -> bool {
        matches!(self, Self::Binary(_) | Self::Varbinary(_) | Self::Blob)
    }

    #[must_use]
    pub const fn is_boolean(&self) -> bool {
        matches!(self, Self::Boolean)
    }

    #[must_use]
    pub const fn is_datetime(&self) -> bool {
        matches!(self, Self::Date | Self::Time | Self::Timestamp)
    }

    const fn numeric_rank(&self) -> Option<u8> {
        match self {
            Self::Tinyint => Some(1),
            Self::Smallint => Some(2),
            Self::Integer => Some(3),
            Self::Bigint => Some(4),
            Self::Decimal { .. } | Self::Numeric { .. } => Some(5),
            Self::Real => Some(6),
            Self::Double => Some(7),
            _ => None,
        }
    }

    /// Whether values of the two types can be compared with each other.
    #[must_use]
    pub fn is_comparable_with(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Distinct(a), Self::Distinct(b)) => a == b,
            (Self::Date | Self::Timestamp, Self::Date | Self::Timestamp) => true,
            (Self::Time, Self::Time) => true,
            _ => {
                (self.is_numeric() && other.is_numeric())
                    || (self.is_character() && other.is_character())
                    || (self.is_binary() && other.is_binary())
                    || (self.is_boolean() && other.is_boolean())
            }
        }
    }

    /// Combines two operand types, or returns `None` when they are incompatible.
    #[must_use]
    pub fn combine(&self, other: &Self, op: TypeOp) -> Option<Self> {
        match op {
            TypeOp::Compare => self.is_comparable_with(other).then_some(Self::Boolean),
            TypeOp::Arithmetic => {
                if self.is_numeric() && other.is_numeric() {
                    Some(self.wider_numeric(other))
                } else if self.is_datetime() && other.is_numeric() {
                    Some(self.clone())
                } else if self.is_numeric() && other.is_datetime() {
                    Some(other.clone())
                } else {
                    None
                }
            }
            TypeOp::Concat => {
                if self.is_binary() && other.is_binary() {
                    Some(Self::Varbinary(add_lengths(self.length(), other.length())))
                } else if self.is_binary() || other.is_binary() {
                    None
                } else if self.is_character() || other.is_character() {
                    if matches!(self, Self::Clob) || matches!(other, Self::Clob) {
                        Some(Self::Clob)
                    } else {
                        Some(Self::Varchar(add_lengths(self.length(), other.length())))
                    }
                } else {
                    None
                }
            }
            TypeOp::Union => {
                if self == other {
                    Some(self.clone())
                } else if self.is_numeric() && other.is_numeric() {
                    Some(self.wider_numeric(other))
                } else if self.is_character() && other.is_character() {
                    Some(match (self, other) {
                        (Self::Clob, _) | (_, Self::Clob) => Self::Clob,
                        (Self::Char(a), Self::Char(b)) => Self::Char(max_length(*a, *b)),
                        _ => Self::Varchar(max_length(self.length(), other.length())),
                    })
                } else if self.is_binary() && other.is_binary() {
                    Some(match (self, other) {
                        (Self::Blob, _) | (_, Self::Blob) => Self::Blob,
                        _ => Self::Varbinary(max_length(self.length(), other.length())),
                    })
                } else if self.is_datetime() && other.is_datetime() {
                    self.is_comparable_with(other).then_some(Self::Timestamp)
                } else {
                    None
                }
            }
        }
    }

    fn wider_numeric(&self, other: &Self) -> Self {
        match (self, other) {
            (
                Self::Decimal { precision: p1, scale: s1 } | Self::Numeric { precision: p1, scale: s1 },
                Self::Decimal { precision: p2, scale: s2 } | Self::Numeric { precision: p2, scale: s2 },
            ) => Self::Decimal {
                precision: (*p1).max(*p2),
                scale: (*s1).max(*s2),
            },
            _ => {
                if other.numeric_rank() > self.numeric_rank() {
                    other.clone()
                } else {
                    self.clone()
                }
            }
        }
    }

    /// Declared length of a string type.
    #[must_use]
    pub const fn length(&self) -> Option<u32> {
        match self {
            Self::Char(n) | Self::Varchar(n) | Self::Binary(n) | Self::Varbinary(n) => *n,
            _ => None,
        }
    }

    /// Returns the SQL spelling of the type.
    #[must_use]
    pub fn to_sql(&self) -> String {
        let with_length = |name: &str, len: &Option<u32>| match len {
            Some(n) => format!("{name}({n})"),
            None => name.to_string(),
        };
        let with_precision = |name: &str, precision: &Option<u16>, scale: &Option<u16>| {
            match (precision, scale) {
                (Some(p), Some(s)) => format!("{name}({p},{s})"),
                (Some(p), None) => format!("{name}({p})"),
                _ => name.to_string(),
            }
        };
        match self {
            Self::Boolean => String::from("BOOLEAN"),
            Self::Tinyint => String::from("TINYINT"),
            Self::Smallint => String::from("SMALLINT"),
            Self::Integer => String::from("INTEGER"),
            Self::Bigint => String::from("BIGINT"),
            Self::Decimal { precision, scale } => with_precision("DECIMAL", precision, scale),
            Self::Numeric { precision, scale } => with_precision("NUMERIC", precision, scale),
            Self::Real => String::from("REAL"),
            Self::Double => String::from("DOUBLE"),
            Self::Char(len) => with_length("CHARACTER", len),
            Self::Varchar(len) => with_length("VARCHAR", len),
            Self::Clob => String::from("CLOB"),
            Self::Binary(len) => with_length("BINARY", len),
            Self::Varbinary(len) => with_length("VARBINARY", len),
            Self::Blob => String::from("BLOB"),
            Self::Date => String::from("DATE"),
            Self::Time => String::from("TIME"),
            Self::Timestamp => String::from("TIMESTAMP"),
            Self::Distinct(name) => name.clone(),
        }
    }
}

fn add_lengths(a: Option<u32>, b: Option<u32>) -> Option<u32> {
    a.zip(b).map(|(a, b)| a.saturating_add(b))
}

fn max_length(a: Option<u32>, b: Option<u32>) -> Option<u32> {
    a.zip(b).map(|(a, b)| a.max(b))
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_sql())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_type_to_sql() {
        assert_eq!(DataType::Integer.to_sql(), "INTEGER");
        assert_eq!(DataType::Varchar(Some(255)).to_sql(), "VARCHAR(255)");
        assert_eq!(
            DataType::for_code(TypeCode::Decimal, Some(10), Some(2)).to_sql(),
            "DECIMAL(10,2)"
        );
        assert_eq!(DataType::for_code(TypeCode::Char, None, None), DataType::Char(Some(1)));
    }

    #[test]
    fn arithmetic_widens() {
        assert_eq!(
            DataType::Integer.combine(&DataType::Bigint, TypeOp::Arithmetic),
            Some(DataType::Bigint)
        );
        assert_eq!(
            DataType::Smallint.combine(&DataType::Double, TypeOp::Arithmetic),
            Some(DataType::Double)
        );
        assert_eq!(
            DataType::Integer.combine(&DataType::Varchar(None), TypeOp::Arithmetic),
            None
        );
    }

    #[test]
    fn concat_and_union() {
        assert_eq!(
            DataType::Char(Some(3)).combine(&DataType::Varchar(Some(4)), TypeOp::Concat),
            Some(DataType::Varchar(Some(7)))
        );
        assert_eq!(
            DataType::Varchar(Some(3)).combine(&DataType::Varchar(Some(9)), TypeOp::Union),
            Some(DataType::Varchar(Some(9)))
        );
        assert_eq!(DataType::Boolean.combine(&DataType::Date, TypeOp::Union), None);
    }

    #[test]
    fn comparability() {
        assert!(DataType::Integer.is_comparable_with(&DataType::Decimal {
            precision: None,
            scale: None
        }));
        assert!(DataType::Date.is_comparable_with(&DataType::Timestamp));
        assert!(!DataType::Varchar(None).is_comparable_with(&DataType::Integer));
        assert_eq!(
            DataType::for_decimal_literal("12.50"),
            DataType::Decimal {
                precision: Some(4),
                scale: Some(2)
            }
        );
    }
}
