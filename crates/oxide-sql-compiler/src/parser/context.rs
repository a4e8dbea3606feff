//! Per-statement compile state shared by every grammar function.
//!
//! Everything registered here carries the token position it was created at.
//! [`CompileContext::rewind`] drops every entry at or after a position, which
//! is what lets speculative parsing undo its side effects exactly.

use crate::ast::{
    Access, DataType, ObjectKind, ObjectReference, Parameter, QualifiedName, QueryExpression,
    RangeVariable, SubQuery, SubQueryId, SubQueryKind,
};
use crate::lexer::Span;

/// A `WITH` name visible to the queries parsed after it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamedQuery {
    pub name: String,
    /// Nesting depth of the query that declared it.
    pub depth: u32,
    pub subquery: SubQueryId,
    /// Column names written after the CTE name.
    pub columns: Vec<String>,
    /// The body of a recursive CTE is still being parsed.
    pub pending: bool,
    pub position: usize,
}

/// Identity of a registered range variable. The variable itself lives in
/// the FROM list being built; only what rewinding and lookups need is kept.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisteredRange {
    pub index: usize,
    /// Alias, else table name.
    pub name: Option<String>,
    pub depth: u32,
    pub position: usize,
}

/// Restore point for speculative parsing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Checkpoint {
    pub position: usize,
    depth: u32,
    contextually_typed: bool,
}

/// Everything the parser learns about one statement while compiling it.
#[derive(Debug, Default)]
pub struct CompileContext {
    depth: u32,
    ranges: Vec<RegisteredRange>,
    subqueries: Vec<SubQuery>,
    named: Vec<NamedQuery>,
    parameters: Vec<Parameter>,
    references: Vec<ObjectReference>,
    /// Type of `VALUE` while compiling a domain constraint.
    domain: Option<DataType>,
    contextually_typed: bool,
    /// Trigger transition variables visible to every query of the statement.
    transitions: Vec<RangeVariable>,
}

/// What a finished statement takes over from the context.
#[derive(Debug, Default)]
pub struct Drained {
    pub subqueries: Vec<SubQuery>,
    pub parameters: Vec<Parameter>,
    pub references: Vec<ObjectReference>,
}

impl CompileContext {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current subquery nesting depth; 0 for the statement's own query.
    #[must_use]
    pub const fn depth(&self) -> u32 {
        self.depth
    }

    /// Enters a nested query and returns the new depth.
    pub fn enter_subquery(&mut self) -> u32 {
        self.depth += 1;
        self.depth
    }

    pub fn leave_subquery(&mut self) {
        self.depth = self.depth.saturating_sub(1);
    }

    /// Assigns the next range index and depth to `range` and records its
    /// identity.
    pub fn register_range(&mut self, range: &mut RangeVariable) -> usize {
        range.index = self.ranges.len();
        range.depth = self.depth;
        self.ranges.push(RegisteredRange {
            index: range.index,
            name: range.exposed_name().map(str::to_string),
            depth: range.depth,
            position: range.position,
        });
        range.index
    }

    #[must_use]
    pub fn ranges(&self) -> &[RegisteredRange] {
        &self.ranges
    }

    /// Index the next registered range variable will receive.
    #[must_use]
    pub fn next_range_index(&self) -> usize {
        self.ranges.len()
    }

    /// Creates an empty subquery slot in discovery order. The body is filled
    /// in by [`Self::finish_subquery`] once its closing bracket is read.
    pub fn reserve_subquery(&mut self, kind: SubQueryKind, position: usize, span: Span) -> SubQueryId {
        let id = SubQueryId(self.subqueries.len());
        self.subqueries.push(SubQuery {
            id,
            kind,
            depth: self.depth,
            name: None,
            query: QueryExpression::default(),
            correlated: false,
            position,
            span,
            dependencies: Vec::new(),
            resolved: false,
        });
        id
    }

    /// Stores the parsed body of a reserved subquery.
    pub fn finish_subquery(&mut self, id: SubQueryId, query: QueryExpression, span: Span) {
        if let Some(subquery) = self.subqueries.get_mut(id.0) {
            subquery.dependencies = super::subquery::direct_dependencies(&query);
            subquery.span = subquery.span.merge(span);
            subquery.query = query;
        }
    }

    #[must_use]
    pub fn subquery(&self, id: SubQueryId) -> Option<&SubQuery> {
        self.subqueries.get(id.0)
    }

    pub fn subquery_mut(&mut self, id: SubQueryId) -> Option<&mut SubQuery> {
        self.subqueries.get_mut(id.0)
    }

    #[must_use]
    pub fn subqueries(&self) -> &[SubQuery] {
        &self.subqueries
    }

    /// Makes `name` visible to the rest of the enclosing query expression.
    pub fn declare_named(&mut self, named: NamedQuery) {
        self.named.push(named);
    }

    /// Innermost `WITH` entry called `name`.
    #[must_use]
    pub fn find_named(&self, name: &str) -> Option<&NamedQuery> {
        self.named
            .iter()
            .rev()
            .find(|n| n.name == name && n.depth <= self.depth)
    }

    /// Marks a recursive CTE as fully parsed.
    pub fn complete_named(&mut self, id: SubQueryId) {
        for named in &mut self.named {
            if named.subquery == id {
                named.pending = false;
            }
        }
    }

    /// Gives a recursive CTE without a column list the column names of its
    /// first query term, once that term has been parsed.
    pub fn adopt_anchor_columns(&mut self, names: &[String]) {
        let depth = self.depth;
        if let Some(named) = self
            .named
            .iter_mut()
            .rev()
            .find(|n| n.pending && n.columns.is_empty() && n.depth + 1 == depth)
        {
            named.columns = names.to_vec();
        }
    }

    /// Number of visible `WITH` names; pass it to [`Self::close_named`] when
    /// the declaring query expression ends.
    #[must_use]
    pub fn named_mark(&self) -> usize {
        self.named.len()
    }

    pub fn close_named(&mut self, mark: usize) {
        self.named.truncate(mark);
    }

    /// Records a dynamic parameter and returns its index.
    pub fn add_parameter(&mut self, name: Option<String>, position: usize, span: Span) -> usize {
        let index = self.parameters.len();
        self.parameters.push(Parameter {
            index,
            name,
            data_type: None,
            position,
            span,
        });
        index
    }

    #[must_use]
    pub fn parameter(&self, index: usize) -> Option<&Parameter> {
        self.parameters.get(index)
    }

    /// Fixes the type of a parameter; the first type assigned wins.
    pub fn pin_parameter(&mut self, index: usize, data_type: &DataType) -> DataType {
        match self.parameters.get_mut(index) {
            Some(parameter) => parameter
                .data_type
                .get_or_insert_with(|| data_type.clone())
                .clone(),
            None => data_type.clone(),
        }
    }

    #[must_use]
    pub fn parameters(&self) -> &[Parameter] {
        &self.parameters
    }

    /// Notes that the statement uses a schema object. Repeats are dropped.
    pub fn add_reference(&mut self, kind: ObjectKind, name: QualifiedName, access: Access, position: usize) {
        let seen = self
            .references
            .iter()
            .any(|r| r.kind == kind && r.name == name && r.access == access);
        if !seen {
            self.references.push(ObjectReference {
                kind,
                name,
                access,
                position,
            });
        }
    }

    #[must_use]
    pub fn references(&self) -> &[ObjectReference] {
        &self.references
    }

    #[must_use]
    pub const fn domain(&self) -> Option<&DataType> {
        self.domain.as_ref()
    }

    pub fn set_domain(&mut self, domain: Option<DataType>) {
        self.domain = domain;
    }

    /// Whether `DEFAULT` and untyped values are acceptable right now.
    #[must_use]
    pub const fn contextually_typed(&self) -> bool {
        self.contextually_typed
    }

    /// Sets the flag and returns the previous value.
    pub fn set_contextually_typed(&mut self, value: bool) -> bool {
        std::mem::replace(&mut self.contextually_typed, value)
    }

    #[must_use]
    pub fn transitions(&self) -> &[RangeVariable] {
        &self.transitions
    }

    pub fn set_transitions(&mut self, transitions: Vec<RangeVariable>) {
        self.transitions = transitions;
    }

    #[must_use]
    pub const fn checkpoint(&self, position: usize) -> Checkpoint {
        Checkpoint {
            position,
            depth: self.depth,
            contextually_typed: self.contextually_typed,
        }
    }

    /// Undoes everything registered since `checkpoint` was taken.
    pub fn restore(&mut self, checkpoint: Checkpoint) {
        self.rewind(checkpoint.position);
        self.depth = checkpoint.depth;
        self.contextually_typed = checkpoint.contextually_typed;
    }

    /// Drops every entry registered at or after token `position`.
    pub fn rewind(&mut self, position: usize) {
        self.ranges.retain(|r| r.position < position);
        self.subqueries.retain(|s| s.position < position);
        self.named.retain(|n| n.position < position);
        self.parameters.retain(|p| p.position < position);
        self.references.retain(|r| r.position < position);
    }

    /// Clears all state before the next statement.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Hands the collected state to a finished statement and resets.
    pub fn drain(&mut self) -> Drained {
        let drained = Drained {
            subqueries: std::mem::take(&mut self.subqueries),
            parameters: std::mem::take(&mut self.parameters),
            references: std::mem::take(&mut self.references),
        };
        self.reset();
        drained
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{JoinKind, RangeSource};

    fn range(position: usize) -> RangeVariable {
        RangeVariable {
            index: 0,
            source: RangeSource::Table(QualifiedName::new("PUBLIC", "T")),
            table_name: Some(QualifiedName::new("PUBLIC", "T")),
            alias: None,
            columns: Vec::new(),
            join: JoinKind::Cross,
            condition: None,
            boundary: true,
            natural: false,
            using: Vec::new(),
            scope: 0..0,
            null_supplying: false,
            position,
            depth: 0,
        }
    }

    #[test]
    fn range_indexes_follow_registration_order() {
        let mut ctx = CompileContext::new();
        let mut a = range(1);
        let mut b = range(4);
        assert_eq!(ctx.register_range(&mut a), 0);
        assert_eq!(ctx.register_range(&mut b), 1);
        assert_eq!(b.index, 1);
        assert_eq!(ctx.next_range_index(), 2);
        assert_eq!(ctx.ranges()[1].name.as_deref(), Some("T"));
        assert_eq!(ctx.ranges()[1].position, 4);
    }

    #[test]
    fn rewind_restores_registries_exactly() {
        let mut ctx = CompileContext::new();
        ctx.register_range(&mut range(1));
        ctx.reserve_subquery(SubQueryKind::Scalar, 2, Span::default());
        ctx.add_parameter(None, 3, Span::default());
        ctx.add_reference(
            ObjectKind::Table,
            QualifiedName::new("PUBLIC", "T"),
            Access::Read,
            1,
        );

        let ranges = ctx.ranges().to_vec();
        let subqueries = ctx.subqueries().to_vec();
        let parameters = ctx.parameters().to_vec();
        let references = ctx.references().to_vec();

        let checkpoint = ctx.checkpoint(5);
        ctx.enter_subquery();
        ctx.reserve_subquery(SubQueryKind::Exists, 5, Span::default());
        ctx.register_range(&mut range(7));
        ctx.add_parameter(Some("X".into()), 9, Span::default());
        ctx.add_reference(
            ObjectKind::Sequence,
            QualifiedName::new("PUBLIC", "S"),
            Access::Use,
            8,
        );
        ctx.set_contextually_typed(true);

        ctx.restore(checkpoint);
        assert_eq!(ctx.ranges(), ranges.as_slice());
        assert_eq!(ctx.subqueries(), subqueries.as_slice());
        assert_eq!(ctx.parameters(), parameters.as_slice());
        assert_eq!(ctx.references(), references.as_slice());
        assert_eq!(ctx.depth(), 0);
        assert!(!ctx.contextually_typed());
    }

    #[test]
    fn named_queries_resolve_innermost_first() {
        let mut ctx = CompileContext::new();
        let outer = ctx.reserve_subquery(SubQueryKind::Cte, 1, Span::default());
        ctx.declare_named(NamedQuery {
            name: "X".into(),
            depth: 0,
            subquery: outer,
            columns: Vec::new(),
            pending: false,
            position: 1,
        });
        ctx.enter_subquery();
        let mark = ctx.named_mark();
        let inner = ctx.reserve_subquery(SubQueryKind::Cte, 6, Span::default());
        ctx.declare_named(NamedQuery {
            name: "X".into(),
            depth: 1,
            subquery: inner,
            columns: Vec::new(),
            pending: true,
            position: 6,
        });
        assert_eq!(ctx.find_named("X").map(|n| n.subquery), Some(inner));
        ctx.complete_named(inner);
        assert!(!ctx.find_named("X").is_some_and(|n| n.pending));

        ctx.close_named(mark);
        ctx.leave_subquery();
        assert_eq!(ctx.find_named("X").map(|n| n.subquery), Some(outer));
    }

    #[test]
    fn parameter_keeps_first_type() {
        let mut ctx = CompileContext::new();
        let i = ctx.add_parameter(None, 0, Span::default());
        assert_eq!(ctx.pin_parameter(i, &DataType::Integer), DataType::Integer);
        assert_eq!(ctx.pin_parameter(i, &DataType::Varchar(None)), DataType::Integer);
        assert_eq!(ctx.parameter(i).and_then(|p| p.data_type.clone()), Some(DataType::Integer));
    }

    #[test]
    fn drain_resets() {
        let mut ctx = CompileContext::new();
        ctx.add_parameter(None, 0, Span::default());
        ctx.enter_subquery();
        let drained = ctx.drain();
        assert_eq!(drained.parameters.len(), 1);
        assert!(ctx.parameters().is_empty());
        assert_eq!(ctx.depth(), 0);
    }
}
