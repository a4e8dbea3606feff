//! Schema lookups and authorization checks consumed by the compiler.
//!
//! The compiler never owns schema state. It asks a [`Catalog`] whether names
//! exist and what they look like, and an [`Authorizer`] whether the current
//! session may touch them. [`MemoryCatalog`] and [`AllowAll`] are simple
//! implementations used by the command-line tool and the tests.

mod memory;

pub use memory::MemoryCatalog;

use serde::{Deserialize, Serialize};

use crate::ast::{DataType, ObjectKind, QualifiedName, TableKind};

const fn yes() -> bool {
    true
}

/// A column of a catalog table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnDef {
    pub name: String,
    pub data_type: DataType,
    #[serde(default = "yes")]
    pub nullable: bool,
    /// Has a DEFAULT clause or identity generator.
    #[serde(default)]
    pub has_default: bool,
    #[serde(default)]
    pub identity: bool,
}

impl ColumnDef {
    #[must_use]
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            data_type,
            nullable: true,
            has_default: false,
            identity: false,
        }
    }

    /// Marks the column NOT NULL.
    #[must_use]
    pub const fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }

    /// Marks the column as an identity column.
    #[must_use]
    pub const fn identity(mut self) -> Self {
        self.identity = true;
        self.has_default = true;
        self.nullable = false;
        self
    }
}

/// A table or view known to the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableDef {
    pub name: QualifiedName,
    #[serde(default)]
    pub kind: TableKind,
    /// True for views.
    #[serde(default)]
    pub view: bool,
    pub columns: Vec<ColumnDef>,
    #[serde(default)]
    pub primary_key: Vec<String>,
    /// Names of the table's constraints.
    #[serde(default)]
    pub constraints: Vec<String>,
    /// Views that cannot be the target of INSERT/UPDATE/DELETE.
    #[serde(default)]
    pub read_only: bool,
}

impl TableDef {
    /// An empty base table.
    #[must_use]
    pub fn new(name: QualifiedName) -> Self {
        Self {
            name,
            kind: TableKind::Memory,
            view: false,
            columns: Vec::new(),
            primary_key: Vec::new(),
            constraints: Vec::new(),
            read_only: false,
        }
    }

    /// Adds a nullable column.
    #[must_use]
    pub fn column(mut self, name: impl Into<String>, data_type: DataType) -> Self {
        self.columns.push(ColumnDef::new(name, data_type));
        self
    }

    /// Adds a fully specified column.
    #[must_use]
    pub fn with_column(mut self, column: ColumnDef) -> Self {
        self.columns.push(column);
        self
    }

    /// Declares the primary key; its columns become NOT NULL.
    #[must_use]
    pub fn primary_key(mut self, columns: &[&str]) -> Self {
        self.primary_key = columns.iter().map(|c| (*c).to_string()).collect();
        for column in &mut self.columns {
            if self.primary_key.contains(&column.name) {
                column.nullable = false;
            }
        }
        self
    }

    /// Declares a named constraint.
    #[must_use]
    pub fn constraint(mut self, name: impl Into<String>) -> Self {
        self.constraints.push(name.into());
        self
    }

    /// Turns the definition into a read-only view.
    #[must_use]
    pub const fn as_view(mut self) -> Self {
        self.view = true;
        self.read_only = true;
        self
    }

    /// Ordinal of column `name`.
    #[must_use]
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    #[must_use]
    pub fn find_column(&self, name: &str) -> Option<&ColumnDef> {
        self.columns.iter().find(|c| c.name == name)
    }
}

/// A sequence generator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SequenceDef {
    pub name: QualifiedName,
    pub data_type: DataType,
}

/// A domain: a predefined type with default and constraints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomainDef {
    pub name: QualifiedName,
    pub data_type: DataType,
    #[serde(default)]
    pub constraints: Vec<String>,
}

/// A user-defined distinct type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserTypeDef {
    pub name: QualifiedName,
    pub data_type: DataType,
}

/// A callable routine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoutineDef {
    pub name: QualifiedName,
    pub parameters: Vec<DataType>,
    /// `None` for procedures.
    pub returns: Option<DataType>,
}

/// An index on a table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexDef {
    pub name: QualifiedName,
    pub table: QualifiedName,
}

/// Read-only view of the database schema.
///
/// Names passed in are schema-qualified by the compiler.
pub trait Catalog {
    fn schema_exists(&self, name: &str) -> bool;

    fn table(&self, name: &QualifiedName) -> Option<&TableDef>;

    fn sequence(&self, name: &QualifiedName) -> Option<&SequenceDef>;

    fn domain(&self, name: &QualifiedName) -> Option<&DomainDef>;

    fn user_type(&self, name: &QualifiedName) -> Option<&UserTypeDef>;

    fn routine(&self, name: &QualifiedName) -> Option<&RoutineDef>;

    fn index(&self, name: &QualifiedName) -> Option<&IndexDef>;

    fn user_exists(&self, name: &str) -> bool;

    fn role_exists(&self, name: &str) -> bool;

    /// Objects without a dedicated lookup: triggers, character sets,
    /// collations.
    fn other_object_exists(&self, kind: ObjectKind, name: &QualifiedName) -> bool;

    /// Generic existence check used by CREATE and DROP.
    fn object_exists(&self, kind: ObjectKind, name: &QualifiedName) -> bool {
        match kind {
            ObjectKind::Table => self.table(name).is_some_and(|t| !t.view),
            ObjectKind::View => self.table(name).is_some_and(|t| t.view),
            ObjectKind::Sequence => self.sequence(name).is_some(),
            ObjectKind::Domain => self.domain(name).is_some(),
            ObjectKind::Type => self.user_type(name).is_some(),
            ObjectKind::Routine => self.routine(name).is_some(),
            ObjectKind::Index => self.index(name).is_some(),
            ObjectKind::Schema => self.schema_exists(&name.name),
            ObjectKind::User => self.user_exists(&name.name),
            ObjectKind::Role => self.role_exists(&name.name),
            ObjectKind::Trigger
            | ObjectKind::CharacterSet
            | ObjectKind::Collation
            | ObjectKind::Constraint => self.other_object_exists(kind, name),
        }
    }
}

/// Capability checks for the compiling session.
///
/// Every method defaults to allowing the operation.
pub trait Authorizer {
    fn can_select(&self, _table: &QualifiedName, _columns: &[String]) -> bool {
        true
    }

    fn can_insert(&self, _table: &QualifiedName, _columns: &[String]) -> bool {
        true
    }

    fn can_update(&self, _table: &QualifiedName, _columns: &[String]) -> bool {
        true
    }

    fn can_delete(&self, _table: &QualifiedName) -> bool {
        true
    }

    /// USAGE on sequences, domains, types; EXECUTE on routines.
    fn can_use(&self, _kind: ObjectKind, _name: &QualifiedName) -> bool {
        true
    }

    /// Create, alter or drop objects in `schema`.
    fn can_define(&self, _schema: &str) -> bool {
        true
    }

    /// Manage users, roles and schemas.
    fn is_admin(&self) -> bool {
        true
    }
}

/// Authorizer that allows everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct AllowAll;

impl Authorizer for AllowAll {}
