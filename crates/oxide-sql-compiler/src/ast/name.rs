//! Schema object names.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A possibly schema-qualified object name.
///
/// Names leave the parser schema-qualified; only catalog lookups built by
/// hand may omit the schema.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct QualifiedName {
    /// Schema, if given.
    pub schema: Option<String>,
    /// Object name.
    pub name: String,
}

impl QualifiedName {
    /// A name in `schema`.
    #[must_use]
    pub fn new(schema: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            schema: Some(schema.into()),
            name: name.into(),
        }
    }

    /// A name without schema.
    #[must_use]
    pub fn bare(name: impl Into<String>) -> Self {
        Self {
            schema: None,
            name: name.into(),
        }
    }

    /// Fills in `schema` when none was written.
    #[must_use]
    pub fn with_default_schema(mut self, schema: &str) -> Self {
        if self.schema.is_none() {
            self.schema = Some(schema.to_string());
        }
        self
    }
}

impl fmt::Display for QualifiedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.schema {
            Some(schema) => write!(f, "{schema}.{}", self.name),
            None => f.write_str(&self.name),
        }
    }
}

/// Kinds of schema objects a statement can name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ObjectKind {
    Table,
    View,
    Index,
    Sequence,
    Domain,
    Trigger,
    Schema,
    User,
    Role,
    Type,
    CharacterSet,
    Collation,
    Routine,
    Constraint,
}

impl ObjectKind {
    /// SQL spelling used in messages.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Table => "TABLE",
            Self::View => "VIEW",
            Self::Index => "INDEX",
            Self::Sequence => "SEQUENCE",
            Self::Domain => "DOMAIN",
            Self::Trigger => "TRIGGER",
            Self::Schema => "SCHEMA",
            Self::User => "USER",
            Self::Role => "ROLE",
            Self::Type => "TYPE",
            Self::CharacterSet => "CHARACTER SET",
            Self::Collation => "COLLATION",
            Self::Routine => "ROUTINE",
            Self::Constraint => "CONSTRAINT",
        }
    }
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
