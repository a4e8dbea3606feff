//! CREATE TRIGGER.

use tracing::debug;

use super::super::from::new_range;
use super::super::resolve::Clause;
use super::super::Parser;
use super::table::catalog_columns;
use crate::ast::{
    Access, ObjectKind, QualifiedName, RangeSource, RangeVariable, StatementArgs,
    StatementKind, TransitionNames, TriggerDefinition, TriggerEvent, TriggerTiming,
};
use crate::catalog::TableDef;
use crate::error::{ErrorKind, Result};
use crate::lexer::{Keyword, TokenKind};

/// Which transition a `REFERENCING` entry names.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Transition {
    OldRow,
    NewRow,
    OldTable,
    NewTable,
}

impl Transition {
    const fn as_str(self) -> &'static str {
        match self {
            Self::OldRow => "OLD ROW",
            Self::NewRow => "NEW ROW",
            Self::OldTable => "OLD TABLE",
            Self::NewTable => "NEW TABLE",
        }
    }

    const fn is_row(self) -> bool {
        matches!(self, Self::OldRow | Self::NewRow)
    }

    const fn is_old(self) -> bool {
        matches!(self, Self::OldRow | Self::OldTable)
    }
}

impl<'a> Parser<'a> {
    /// ```text
    /// CREATE TRIGGER name {BEFORE | AFTER | INSTEAD OF}
    ///     {INSERT | DELETE | UPDATE [OF columns]} ON table
    ///     [REFERENCING {OLD | NEW} [ROW | TABLE] [AS] name ...]
    ///     [FOR EACH {ROW | STATEMENT}] [WHEN (condition)]
    ///     {statement | BEGIN ATOMIC statement; ... END}
    /// ```
    pub(super) fn parse_create_trigger(&mut self) -> Result<(StatementKind, StatementArgs)> {
        self.expect_keyword(Keyword::Trigger)?;
        let start = self.position();
        let name_span = self.current().span;
        let name = self.parse_qualified_name()?;
        self.check_define(&name, name_span)?;
        self.check_new_object(ObjectKind::Trigger, &name, name_span)?;

        let timing_span = self.current().span;
        let timing = match self.current().as_keyword() {
            Some(Keyword::Before) => TriggerTiming::Before,
            Some(Keyword::After) => TriggerTiming::After,
            Some(Keyword::Instead) => {
                self.advance();
                self.expect_keyword(Keyword::Of)?;
                TriggerTiming::InsteadOf
            }
            _ => return Err(self.unexpected("BEFORE, AFTER or INSTEAD OF")),
        };
        if timing != TriggerTiming::InsteadOf {
            self.advance();
        }

        let event = match self.current().as_keyword() {
            Some(Keyword::Insert) => TriggerEvent::Insert,
            Some(Keyword::Delete) => TriggerEvent::Delete,
            Some(Keyword::Update) => TriggerEvent::Update(Vec::new()),
            _ => return Err(self.unexpected("INSERT, DELETE or UPDATE")),
        };
        self.advance();
        let event = match event {
            TriggerEvent::Update(_) if self.consume_keyword(Keyword::Of) => {
                TriggerEvent::Update(self.parse_identifier_list()?)
            }
            event => event,
        };

        self.expect_keyword(Keyword::On)?;
        let table_position = self.position();
        let table_span = self.current().span;
        let table_name = self.parse_qualified_name()?;
        let catalog = self.catalog;
        let Some(table) = catalog.table(&table_name) else {
            return Err(self.error_at(ErrorKind::ObjectNotFound(table_name.to_string()), table_span));
        };
        match (timing, table.view) {
            (TriggerTiming::InsteadOf, false) => {
                return Err(self.error_at(
                    ErrorKind::InvalidDefinition(format!("INSTEAD OF trigger on table {table_name}")),
                    timing_span,
                ));
            }
            (TriggerTiming::Before | TriggerTiming::After, true) => {
                return Err(self.error_at(
                    ErrorKind::InvalidDefinition(format!("BEFORE or AFTER trigger on view {table_name}")),
                    timing_span,
                ));
            }
            _ => {}
        }

        if let TriggerEvent::Update(columns) = &event {
            if let Some(missing) = columns.iter().find(|c| table.find_column(c).is_none()) {
                return Err(self.error_at(
                    ErrorKind::ColumnNotFound(format!("{}.{missing}", table_name.name)),
                    table_span,
                ));
            }
        }

        let referencing = self.parse_referencing(&event, timing)?;

        let for_each_row = if self.consume_keyword(Keyword::For) {
            self.expect_keyword(Keyword::Each)?;
            if self.consume_keyword(Keyword::Row) {
                true
            } else {
                self.expect_keyword(Keyword::Statement)?;
                false
            }
        } else {
            false
        };
        if let Some((transition, _)) = referencing.iter().find(|(t, _)| t.is_row()) {
            if !for_each_row {
                return Err(self.error_at(
                    ErrorKind::InvalidDefinition(format!("{} needs FOR EACH ROW", transition.as_str())),
                    timing_span,
                ));
            }
        }

        let mut transitions = TransitionNames::default();
        let mut ranges: Vec<RangeVariable> = Vec::new();
        for (transition, alias) in &referencing {
            let slot = match transition {
                Transition::OldRow => &mut transitions.old_row,
                Transition::NewRow => &mut transitions.new_row,
                Transition::OldTable => &mut transitions.old_table,
                Transition::NewTable => &mut transitions.new_table,
            };
            *slot = Some(alias.clone());
            ranges.push(transition_range(alias, &table_name, table, start));
        }
        for range in &mut ranges {
            self.ctx.register_range(range);
        }
        self.ctx.set_transitions(ranges.clone());

        let when = if self.consume_keyword(Keyword::When) {
            self.expect(&TokenKind::LeftParen)?;
            let mut condition = self.parse_expression()?;
            self.expect(&TokenKind::RightParen)?;
            self.resolve_definition_expr(&mut condition, ranges.clone(), Clause::TriggerCondition)?;
            Some(condition)
        } else {
            None
        };

        let recording = self.cursor.start_recording();
        let mut body = Vec::new();
        if self.check_keyword(Keyword::Begin) && self.peek_keyword(1, Keyword::Atomic) {
            self.advance();
            self.advance();
            while !self.check_keyword(Keyword::End) {
                body.push(self.compile_nested_statement(ranges.clone())?);
                self.expect(&TokenKind::Semicolon)?;
            }
            self.expect_keyword(Keyword::End)?;
        } else {
            body.push(self.compile_nested_statement(ranges)?);
        }
        let body_sql = self.cursor.recorded_sql(recording).to_string();

        self.ctx.add_reference(ObjectKind::Table, table_name.clone(), Access::Write, table_position);
        debug!(%name, table = %table_name, statements = body.len(), "create trigger");

        Ok((
            StatementKind::CreateTrigger,
            StatementArgs::CreateTrigger(Box::new(TriggerDefinition {
                name,
                table: table_name,
                timing,
                event,
                transitions,
                for_each_row,
                when,
                body,
                body_sql,
            })),
        ))
    }

    /// `REFERENCING {OLD | NEW} [ROW | TABLE] [AS] name ...`
    fn parse_referencing(&mut self, event: &TriggerEvent, timing: TriggerTiming) -> Result<Vec<(Transition, String)>> {
        let mut referencing: Vec<(Transition, String)> = Vec::new();
        if !self.consume_keyword(Keyword::Referencing) {
            return Ok(referencing);
        }
        while self.check_keyword(Keyword::Old) || self.check_keyword(Keyword::New) {
            let span = self.current().span;
            let old = self.consume_keyword(Keyword::Old);
            if !old {
                self.advance();
            }
            let table = if self.consume_keyword(Keyword::Table) {
                true
            } else {
                self.consume_keyword(Keyword::Row);
                false
            };
            let transition = match (old, table) {
                (true, false) => Transition::OldRow,
                (false, false) => Transition::NewRow,
                (true, true) => Transition::OldTable,
                (false, true) => Transition::NewTable,
            };
            self.consume_keyword(Keyword::As);
            let alias = self.expect_identifier()?;

            let invalid = match event {
                TriggerEvent::Insert if transition.is_old() => true,
                TriggerEvent::Delete if !transition.is_old() => true,
                _ => timing == TriggerTiming::Before && !transition.is_row(),
            };
            if invalid {
                return Err(self.error_at(
                    ErrorKind::InvalidDefinition(format!("{} not available to this trigger", transition.as_str())),
                    span,
                ));
            }
            if referencing.iter().any(|(t, _)| *t == transition) {
                return Err(self.error_at(
                    ErrorKind::InvalidDefinition(format!("{} named twice", transition.as_str())),
                    span,
                ));
            }
            if referencing.iter().any(|(_, a)| *a == alias) {
                return Err(self.error_at(ErrorKind::DuplicateName(alias), span));
            }
            referencing.push((transition, alias));
        }
        if referencing.is_empty() {
            return Err(self.unexpected("OLD or NEW"));
        }
        Ok(referencing)
    }
}

/// The row or table a transition name stands for, with the subject
/// table's columns.
fn transition_range(alias: &str, table_name: &QualifiedName, table: &TableDef, position: usize) -> RangeVariable {
    new_range(
        RangeSource::Transition(table_name.clone()),
        Some(QualifiedName::bare(alias)),
        Some(alias.to_string()),
        catalog_columns(table),
        position,
    )
}

#[cfg(test)]
mod tests {
    use super::super::tests::compile;
    use super::*;
    use crate::ast::DataType;

    fn trigger(sql: &str) -> TriggerDefinition {
        match compile(sql).unwrap().args() {
            StatementArgs::CreateTrigger(trigger) => (**trigger).clone(),
            other => panic!("not a trigger: {other:?}"),
        }
    }

    #[test]
    fn test_row_trigger_sees_transitions() {
        let definition = trigger(
            "CREATE TRIGGER audit AFTER UPDATE OF name ON customer \
             REFERENCING OLD ROW AS o NEW ROW AS n FOR EACH ROW \
             WHEN (o.name <> n.name) \
             INSERT INTO orders (id, customer_id) VALUES (n.id, o.id)",
        );
        assert_eq!(definition.timing, TriggerTiming::After);
        assert_eq!(definition.event, TriggerEvent::Update(vec!["NAME".into()]));
        assert_eq!(definition.transitions.old_row.as_deref(), Some("O"));
        assert_eq!(definition.transitions.new_row.as_deref(), Some("N"));
        assert!(definition.for_each_row);
        assert_eq!(
            definition.when.as_ref().and_then(|w| w.data_type.clone()),
            Some(DataType::Boolean)
        );
        assert_eq!(definition.body.len(), 1);
        assert_eq!(definition.body[0].kind(), StatementKind::Insert);
        assert!(definition.body_sql.starts_with("INSERT INTO orders"));
    }

    #[test]
    fn test_atomic_body() {
        let definition = trigger(
            "CREATE TRIGGER purge AFTER DELETE ON customer REFERENCING OLD AS gone FOR EACH ROW \
             BEGIN ATOMIC DELETE FROM orders WHERE customer_id = gone.id; \
             UPDATE orders SET total = 0 WHERE customer_id = gone.id; END",
        );
        assert_eq!(definition.body.len(), 2);
        assert!(definition.body_sql.starts_with("BEGIN ATOMIC"));
        assert!(definition.body_sql.ends_with("END"));
    }

    #[test]
    fn test_statement_trigger_with_transition_table() {
        let definition = trigger(
            "CREATE TRIGGER tally AFTER INSERT ON orders REFERENCING NEW TABLE AS added \
             FOR EACH STATEMENT INSERT INTO orders (id) SELECT COUNT(*) FROM added",
        );
        assert_eq!(definition.transitions.new_table.as_deref(), Some("ADDED"));
        assert!(!definition.for_each_row);
    }

    #[test]
    fn test_invalid_triggers() {
        let invalid = [
            "CREATE TRIGGER t1 AFTER INSERT ON customer REFERENCING OLD ROW AS o FOR EACH ROW DELETE FROM orders",
            "CREATE TRIGGER t1 AFTER DELETE ON customer REFERENCING NEW ROW AS n FOR EACH ROW DELETE FROM orders",
            "CREATE TRIGGER t1 AFTER UPDATE ON customer REFERENCING NEW ROW AS n DELETE FROM orders",
            "CREATE TRIGGER t1 INSTEAD OF INSERT ON customer DELETE FROM orders",
            "CREATE TRIGGER t1 BEFORE UPDATE ON customer REFERENCING NEW TABLE AS nt DELETE FROM orders",
            "CREATE TRIGGER t1 BEFORE INSERT ON big_spenders DELETE FROM orders",
        ];
        for sql in invalid {
            assert!(
                matches!(compile(sql).unwrap_err().kind, ErrorKind::InvalidDefinition(_)),
                "{sql}"
            );
        }
        assert!(matches!(
            compile("CREATE TRIGGER t1 AFTER UPDATE OF missing ON customer DELETE FROM orders")
                .unwrap_err()
                .kind,
            ErrorKind::ColumnNotFound(_)
        ));
        // Transition names are not visible without REFERENCING.
        assert!(matches!(
            compile("CREATE TRIGGER t1 AFTER INSERT ON customer FOR EACH ROW DELETE FROM orders WHERE id = n.id")
                .unwrap_err()
                .kind,
            ErrorKind::ColumnNotFound(_)
        ));
    }
}
