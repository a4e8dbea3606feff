//! Compiled statements.

use super::{
    AlterTableAction, DataType, DomainChange, DomainDefinition, DropDefinition, Expr,
    GrantDefinition, IndexDefinition, ObjectKind, QualifiedName, QueryExpression, RangeVariable,
    RoleGrantDefinition, SequenceDefinition, SequenceOptions, SubQuery, TableDefinition,
    TriggerDefinition, TypeDefinition, ViewDefinition,
};
use crate::lexer::Span;

/// Statement type tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatementKind {
    Select,
    Insert,
    Update,
    Delete,
    Truncate,
    CreateTable,
    CreateIndex,
    CreateView,
    CreateSequence,
    CreateDomain,
    CreateTrigger,
    CreateSchema,
    CreateUser,
    CreateRole,
    CreateType,
    CreateCharacterSet,
    AlterTable,
    AlterSequence,
    AlterDomain,
    AlterUser,
    AlterIndex,
    Drop,
    Grant,
    Revoke,
    GrantRole,
    RevokeRole,
}

impl StatementKind {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Select => "SELECT",
            Self::Insert => "INSERT",
            Self::Update => "UPDATE",
            Self::Delete => "DELETE",
            Self::Truncate => "TRUNCATE",
            Self::CreateTable => "CREATE TABLE",
            Self::CreateIndex => "CREATE INDEX",
            Self::CreateView => "CREATE VIEW",
            Self::CreateSequence => "CREATE SEQUENCE",
            Self::CreateDomain => "CREATE DOMAIN",
            Self::CreateTrigger => "CREATE TRIGGER",
            Self::CreateSchema => "CREATE SCHEMA",
            Self::CreateUser => "CREATE USER",
            Self::CreateRole => "CREATE ROLE",
            Self::CreateType => "CREATE TYPE",
            Self::CreateCharacterSet => "CREATE CHARACTER SET",
            Self::AlterTable => "ALTER TABLE",
            Self::AlterSequence => "ALTER SEQUENCE",
            Self::AlterDomain => "ALTER DOMAIN",
            Self::AlterUser => "ALTER USER",
            Self::AlterIndex => "ALTER INDEX",
            Self::Drop => "DROP",
            Self::Grant => "GRANT",
            Self::Revoke => "REVOKE",
            Self::GrantRole => "GRANT ROLE",
            Self::RevokeRole => "REVOKE ROLE",
        }
    }

    /// True for statements that change the schema or access rights.
    #[must_use]
    pub const fn is_schema_change(&self) -> bool {
        !matches!(
            self,
            Self::Select | Self::Insert | Self::Update | Self::Delete | Self::Truncate
        )
    }
}

/// A dynamic parameter of a statement.
#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    /// Position in the statement's parameter list.
    pub index: usize,
    /// `:name` placeholders keep their name.
    pub name: Option<String>,
    /// Inferred type.
    pub data_type: Option<DataType>,
    /// Token position of the placeholder.
    pub position: usize,
    pub span: Span,
}

/// How a statement uses a schema object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Access {
    Read,
    Write,
    /// Sequences, routines, domains, types and other objects a statement depends on.
    Use,
}

/// A schema object a statement refers to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectReference {
    pub kind: ObjectKind,
    pub name: QualifiedName,
    pub access: Access,
    /// Token position where the name appeared.
    pub position: usize,
}

/// Where the rows of an INSERT come from.
#[derive(Debug, Clone, PartialEq)]
pub enum InsertSource {
    /// `VALUES` rows, each a row constructor of the target degree.
    Values(Vec<Expr>),
    Query(QueryExpression),
    DefaultValues,
}

#[derive(Debug, Clone, PartialEq)]
pub struct InsertArgs {
    pub table: QualifiedName,
    /// Ordinals of the target columns in the table.
    pub columns: Vec<usize>,
    pub source: InsertSource,
}

/// `column = value` of an UPDATE.
#[derive(Debug, Clone, PartialEq)]
pub struct Assignment {
    /// Ordinal of the column in the table.
    pub column: usize,
    pub name: String,
    pub value: Expr,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UpdateArgs {
    pub table: QualifiedName,
    pub target: RangeVariable,
    pub assignments: Vec<Assignment>,
    pub where_clause: Option<Expr>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DeleteArgs {
    pub table: QualifiedName,
    pub target: RangeVariable,
    pub where_clause: Option<Expr>,
}

/// Argument payload, one variant per statement family.
#[derive(Debug, Clone, PartialEq)]
pub enum StatementArgs {
    Query(QueryExpression),
    Insert(InsertArgs),
    Update(UpdateArgs),
    Delete(DeleteArgs),
    Truncate {
        table: QualifiedName,
        restart_identity: bool,
    },
    CreateTable(Box<TableDefinition>),
    CreateIndex(IndexDefinition),
    CreateView(Box<ViewDefinition>),
    CreateSequence(SequenceDefinition),
    CreateDomain(DomainDefinition),
    CreateTrigger(Box<TriggerDefinition>),
    CreateSchema {
        name: String,
        authorization: Option<String>,
    },
    CreateUser {
        name: String,
        password: String,
        admin: bool,
    },
    CreateRole(String),
    CreateType(TypeDefinition),
    CreateCharacterSet {
        name: QualifiedName,
        source: QualifiedName,
        collation: Option<QualifiedName>,
    },
    AlterTable {
        table: QualifiedName,
        action: AlterTableAction,
    },
    AlterSequence {
        name: QualifiedName,
        options: SequenceOptions,
    },
    AlterDomain {
        name: QualifiedName,
        change: DomainChange,
    },
    AlterUser {
        name: String,
        password: String,
    },
    AlterIndex {
        name: QualifiedName,
        new_name: QualifiedName,
    },
    Drop(DropDefinition),
    Grant(GrantDefinition),
    Revoke(GrantDefinition),
    GrantRole(RoleGrantDefinition),
    RevokeRole(RoleGrantDefinition),
}

/// A compiled statement: text, tag, arguments and everything the compile
/// context collected for it.
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub(crate) sql: String,
    pub(crate) kind: StatementKind,
    pub(crate) args: StatementArgs,
    pub(crate) read_tables: Vec<QualifiedName>,
    pub(crate) write_tables: Vec<QualifiedName>,
    pub(crate) subqueries: Vec<SubQuery>,
    pub(crate) parameters: Vec<Parameter>,
    pub(crate) references: Vec<ObjectReference>,
}

impl Statement {
    /// The statement text, without the terminating semicolon.
    #[must_use]
    pub fn sql(&self) -> &str {
        &self.sql
    }

    #[must_use]
    pub const fn kind(&self) -> StatementKind {
        self.kind
    }

    #[must_use]
    pub const fn args(&self) -> &StatementArgs {
        &self.args
    }

    /// Tables and views read, in first-use order.
    #[must_use]
    pub fn read_tables(&self) -> &[QualifiedName] {
        &self.read_tables
    }

    /// Tables written or whose definition changes.
    #[must_use]
    pub fn write_tables(&self) -> &[QualifiedName] {
        &self.write_tables
    }

    /// Subqueries in materialization order: each one before any that depends on it.
    #[must_use]
    pub fn subqueries(&self) -> &[SubQuery] {
        &self.subqueries
    }

    #[must_use]
    pub fn parameters(&self) -> &[Parameter] {
        &self.parameters
    }

    /// Every schema object the statement names, in source order.
    #[must_use]
    pub fn referenced_objects(&self) -> &[ObjectReference] {
        &self.references
    }

    /// The query, for SELECT statements.
    #[must_use]
    pub const fn query(&self) -> Option<&QueryExpression> {
        match &self.args {
            StatementArgs::Query(query) => Some(query),
            _ => None,
        }
    }

    /// Looks up a subquery by id.
    #[must_use]
    pub fn subquery(&self, id: super::SubQueryId) -> Option<&SubQuery> {
        self.subqueries.iter().find(|s| s.id == id)
    }
}
