//! Abstract Syntax Tree (AST) types for compiled SQL statements.

mod ddl;
mod expression;
mod name;
mod query;
mod statement;
mod types;

pub use ddl::{
    AlterTableAction, CheckOption, ColumnChange, ColumnDefinition, ColumnGeneration,
    ConstraintDefinition, ConstraintKind, DomainChange, DomainDefinition, DropBehavior,
    DropDefinition, ForeignKey, GrantDefinition, Grantee, IndexColumn, IndexDefinition, OnCommit,
    Privilege, ReferentialAction, RoleGrantDefinition, SequenceBound, SequenceDefinition,
    SequenceOptions, TableDefinition, TableKind, TableSource, TransitionNames, TriggerDefinition,
    TriggerEvent, TriggerTiming, TypeDefinition, ViewDefinition,
};
pub use expression::{
    AggregateFunction, BinaryOp, ColumnRef, Expr, ExprKind, FunctionCall, Literal, MatchType,
    Quantifier, ResolvedColumn, UnaryOp,
};
pub use name::{ObjectKind, QualifiedName};
pub use query::{
    JoinKind, Limit, OutputColumn, QueryBody, QueryExpression, QuerySpecification, RangeColumn,
    RangeSource, RangeVariable, SelectItem, SetOperation, SetOperator, SortAndSlice, SortItem,
    SubQuery, SubQueryId, SubQueryKind,
};
pub use statement::{
    Access, Assignment, DeleteArgs, InsertArgs, InsertSource, ObjectReference, Parameter,
    Statement, StatementArgs, StatementKind, UpdateArgs,
};
pub use types::{DataType, TypeCode, TypeOp};
