//! Argument payloads of schema definition and access control statements.

use serde::{Deserialize, Serialize};

use super::{DataType, Expr, MatchType, ObjectKind, QualifiedName, QueryExpression, Statement};

/// Storage kind of a table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TableKind {
    #[default]
    Memory,
    Cached,
    Text,
    GlobalTemporary,
    LocalTemporary,
}

impl TableKind {
    #[must_use]
    pub const fn is_temporary(&self) -> bool {
        matches!(self, Self::GlobalTemporary | Self::LocalTemporary)
    }
}

/// `ON COMMIT` behaviour of a temporary table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OnCommit {
    DeleteRows,
    PreserveRows,
}

/// `MINVALUE n` / `NO MINVALUE` and the MAXVALUE counterparts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SequenceBound {
    Value(i64),
    Unbounded,
}

/// Options shared by CREATE/ALTER SEQUENCE and identity columns.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SequenceOptions {
    /// `AS type`
    pub data_type: Option<DataType>,
    pub start: Option<i64>,
    pub increment: Option<i64>,
    pub min_value: Option<SequenceBound>,
    pub max_value: Option<SequenceBound>,
    pub cycle: Option<bool>,
    /// `RESTART [WITH n]`; `Some(None)` restarts at the start value.
    pub restart: Option<Option<i64>>,
}

/// How a column gets values it is not given.
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnGeneration {
    /// `GENERATED {ALWAYS|BY DEFAULT} AS IDENTITY [(options)]`
    Identity {
        always: bool,
        options: SequenceOptions,
    },
    /// `GENERATED ALWAYS AS (expr)`
    Expression(Expr),
}

/// A column of CREATE TABLE or ALTER TABLE ADD COLUMN.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnDefinition {
    pub name: String,
    pub data_type: DataType,
    /// Domain the type came from, if any.
    pub domain: Option<QualifiedName>,
    pub default: Option<Expr>,
    pub nullable: bool,
    pub generated: Option<ColumnGeneration>,
}

impl ColumnDefinition {
    /// A nullable column without default.
    #[must_use]
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            data_type,
            domain: None,
            default: None,
            nullable: true,
            generated: None,
        }
    }
}

/// Referential actions of a foreign key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReferentialAction {
    #[default]
    NoAction,
    Restrict,
    Cascade,
    SetNull,
    SetDefault,
}

/// `FOREIGN KEY (cols) REFERENCES t (cols) ...`
#[derive(Debug, Clone, PartialEq)]
pub struct ForeignKey {
    pub columns: Vec<String>,
    pub referenced_table: QualifiedName,
    pub referenced_columns: Vec<String>,
    pub match_type: MatchType,
    pub on_delete: ReferentialAction,
    pub on_update: ReferentialAction,
}

/// Constraint variants.
#[derive(Debug, Clone, PartialEq)]
pub enum ConstraintKind {
    PrimaryKey(Vec<String>),
    Unique(Vec<String>),
    Check(Expr),
    ForeignKey(ForeignKey),
}

/// A named table or domain constraint.
#[derive(Debug, Clone, PartialEq)]
pub struct ConstraintDefinition {
    pub name: String,
    pub kind: ConstraintKind,
    /// The name was generated rather than written.
    pub generated_name: bool,
}

/// Payload of CREATE TABLE.
#[derive(Debug, Clone, PartialEq)]
pub struct TableDefinition {
    pub name: QualifiedName,
    pub kind: TableKind,
    pub if_not_exists: bool,
    pub columns: Vec<ColumnDefinition>,
    /// Primary key first when present, then the others in declaration order.
    pub constraints: Vec<ConstraintDefinition>,
    pub on_commit: Option<OnCommit>,
    /// `AS (query) WITH [NO] DATA`
    pub source: Option<TableSource>,
}

impl TableDefinition {
    /// The primary key constraint, if declared.
    #[must_use]
    pub fn primary_key(&self) -> Option<&ConstraintDefinition> {
        self.constraints
            .iter()
            .find(|c| matches!(c.kind, ConstraintKind::PrimaryKey(_)))
    }
}

/// Query a table is created from.
#[derive(Debug, Clone, PartialEq)]
pub struct TableSource {
    pub query: QueryExpression,
    pub with_data: bool,
}

/// An indexed column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexColumn {
    pub name: String,
    pub descending: bool,
}

/// Payload of CREATE INDEX.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexDefinition {
    pub name: QualifiedName,
    pub table: QualifiedName,
    pub columns: Vec<IndexColumn>,
    pub unique: bool,
}

/// `WITH [CASCADED|LOCAL] CHECK OPTION`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckOption {
    Cascaded,
    Local,
}

/// Payload of CREATE VIEW.
#[derive(Debug, Clone, PartialEq)]
pub struct ViewDefinition {
    pub name: QualifiedName,
    /// Column names, explicit or derived from the query.
    pub columns: Vec<String>,
    pub query: QueryExpression,
    /// The query text exactly as written.
    pub query_sql: String,
    pub check_option: Option<CheckOption>,
}

/// Payload of CREATE SEQUENCE.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SequenceDefinition {
    pub name: QualifiedName,
    pub options: SequenceOptions,
}

/// Payload of CREATE DOMAIN.
#[derive(Debug, Clone, PartialEq)]
pub struct DomainDefinition {
    pub name: QualifiedName,
    pub data_type: DataType,
    pub default: Option<Expr>,
    pub constraints: Vec<ConstraintDefinition>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerTiming {
    Before,
    After,
    InsteadOf,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TriggerEvent {
    Insert,
    Delete,
    /// `UPDATE [OF columns]`
    Update(Vec<String>),
}

/// Names bound by `REFERENCING`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TransitionNames {
    pub old_row: Option<String>,
    pub new_row: Option<String>,
    pub old_table: Option<String>,
    pub new_table: Option<String>,
}

/// Payload of CREATE TRIGGER.
#[derive(Debug, Clone, PartialEq)]
pub struct TriggerDefinition {
    pub name: QualifiedName,
    pub table: QualifiedName,
    pub timing: TriggerTiming,
    pub event: TriggerEvent,
    pub transitions: TransitionNames,
    pub for_each_row: bool,
    pub when: Option<Expr>,
    /// Compiled body statements.
    pub body: Vec<Statement>,
    /// Body text as written.
    pub body_sql: String,
}

/// `RESTRICT` (default) or `CASCADE`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DropBehavior {
    #[default]
    Restrict,
    Cascade,
}

/// Payload of DROP.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DropDefinition {
    pub kind: ObjectKind,
    pub name: QualifiedName,
    pub if_exists: bool,
    pub behavior: DropBehavior,
}

/// Change applied by `ALTER TABLE t ALTER COLUMN c ...`.
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnChange {
    SetDefault(Expr),
    DropDefault,
    SetNullable(bool),
    SetDataType(DataType),
    RestartWith(i64),
    RenameTo(String),
}

/// Payload of ALTER TABLE.
#[derive(Debug, Clone, PartialEq)]
pub enum AlterTableAction {
    AddColumn {
        column: ColumnDefinition,
        constraints: Vec<ConstraintDefinition>,
        before: Option<String>,
    },
    AddConstraint(ConstraintDefinition),
    DropColumn {
        name: String,
        behavior: DropBehavior,
    },
    DropConstraint {
        name: String,
        behavior: DropBehavior,
    },
    AlterColumn {
        name: String,
        change: ColumnChange,
    },
    RenameTo(QualifiedName),
}

/// Change applied by ALTER DOMAIN.
#[derive(Debug, Clone, PartialEq)]
pub enum DomainChange {
    SetDefault(Expr),
    DropDefault,
    AddConstraint(ConstraintDefinition),
    DropConstraint(String),
}

/// A privilege in GRANT/REVOKE; column lists are empty for the whole table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Privilege {
    All,
    Select(Vec<String>),
    Insert(Vec<String>),
    Update(Vec<String>),
    References(Vec<String>),
    Delete,
    Trigger,
    Usage,
    Execute,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Grantee {
    Public,
    Named(String),
}

/// Payload of GRANT / REVOKE on an object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GrantDefinition {
    pub privileges: Vec<Privilege>,
    pub object_kind: ObjectKind,
    pub object: QualifiedName,
    pub grantees: Vec<Grantee>,
    /// `WITH GRANT OPTION`, or `GRANT OPTION FOR` on revoke.
    pub grant_option: bool,
    pub granted_by: Option<String>,
    pub behavior: DropBehavior,
}

/// Payload of GRANT / REVOKE of roles.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleGrantDefinition {
    pub roles: Vec<String>,
    pub grantees: Vec<Grantee>,
    /// `WITH ADMIN OPTION`, or `ADMIN OPTION FOR` on revoke.
    pub admin_option: bool,
    pub granted_by: Option<String>,
    pub behavior: DropBehavior,
}

/// Payload of CREATE TYPE (a distinct type over a predefined type).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeDefinition {
    pub name: QualifiedName,
    pub data_type: DataType,
}
