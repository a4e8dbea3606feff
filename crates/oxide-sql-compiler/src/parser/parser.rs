//! Parser state, token helpers, speculative-parsing combinators and the
//! statement dispatcher.
//!
//! The grammar is split across sibling modules, each adding its own
//! `impl Parser` block.

use tracing::{debug, trace};

use super::context::{Checkpoint, CompileContext};
use super::cursor::TokenCursor;
use super::subquery::materialization_order;
use crate::ast::{
    Access, DataType, ObjectKind, QualifiedName, RangeVariable, Statement, StatementArgs,
    StatementKind, TypeCode,
};
use crate::catalog::{Authorizer, Catalog};
use crate::config::CompilerConfig;
use crate::error::{CompileError, ErrorKind, Result};
use crate::lexer::{Keyword, Span, Token, TokenKind};

/// SQL compiler front end for one SQL text.
///
/// The parser owns the token cursor and the compile context and is reused
/// for every statement of the text.
pub struct Parser<'a> {
    pub(crate) cursor: TokenCursor<'a>,
    pub(crate) ctx: CompileContext,
    pub(crate) catalog: &'a dyn Catalog,
    pub(crate) authorizer: &'a dyn Authorizer,
    pub(crate) config: &'a CompilerConfig,
    /// Expressions currently being parsed, innermost included.
    pub(crate) expression_depth: u32,
}

impl<'a> Parser<'a> {
    /// Creates a parser over `sql`.
    #[must_use]
    pub fn new(
        sql: &'a str,
        catalog: &'a dyn Catalog,
        authorizer: &'a dyn Authorizer,
        config: &'a CompilerConfig,
    ) -> Self {
        Self {
            cursor: TokenCursor::new(sql),
            ctx: CompileContext::new(),
            catalog,
            authorizer,
            config,
            expression_depth: 0,
        }
    }

    /// The compile context of the statement being parsed.
    #[must_use]
    pub const fn context(&self) -> &CompileContext {
        &self.ctx
    }

    /// Compiles the next statement, or returns `None` once the text is
    /// exhausted. Empty statements (`;;`) are skipped.
    ///
    /// # Errors
    ///
    /// Returns the deepest error met while compiling the statement. The
    /// context is reset, so no partial state leaks into the next call.
    pub fn next_statement(&mut self) -> Result<Option<Statement>> {
        while self.consume(&TokenKind::Semicolon) {}
        if self.cursor.at_end() {
            return Ok(None);
        }
        match self.compile_statement() {
            Ok(statement) => {
                if !self.cursor.at_end() {
                    self.expect(&TokenKind::Semicolon)?;
                }
                Ok(Some(statement))
            }
            Err(err) => {
                debug!(code = err.code(), error = %err, "statement failed");
                self.ctx.reset();
                Err(err)
            }
        }
    }

    /// Compiles the next statement, failing if the text has none left.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::UnexpectedEnd`] at the end of the text, or the
    /// statement's own error.
    pub fn expect_statement(&mut self) -> Result<Statement> {
        match self.next_statement()? {
            Some(statement) => Ok(statement),
            None => Err(self.unexpected("statement")),
        }
    }

    /// Checks that only separators remain.
    ///
    /// # Errors
    ///
    /// Returns a syntax error at the first token of a further statement.
    pub fn expect_end(&mut self) -> Result<()> {
        while self.consume(&TokenKind::Semicolon) {}
        if self.cursor.at_end() {
            Ok(())
        } else {
            Err(self.unexpected("end of input"))
        }
    }

    fn compile_statement(&mut self) -> Result<Statement> {
        let recording = self.cursor.start_recording();
        debug!(position = self.cursor.position(), "compiling statement");
        let (kind, args) = self.parse_statement_body()?;
        if !self.check(&TokenKind::Semicolon) && !self.cursor.at_end() {
            return Err(self.unexpected("end of statement"));
        }
        let sql = self.cursor.recorded_sql(recording).to_string();
        self.finish_statement(kind, args, sql)
    }

    /// Compiles one statement inside another (trigger bodies) with a fresh
    /// context; the enclosing statement's context is put back afterwards.
    pub(crate) fn compile_nested_statement(
        &mut self,
        mut transitions: Vec<RangeVariable>,
    ) -> Result<Statement> {
        let outer = std::mem::take(&mut self.ctx);
        for transition in &mut transitions {
            self.ctx.register_range(transition);
        }
        self.ctx.set_transitions(transitions);
        let recording = self.cursor.start_recording();
        let result = self.parse_statement_body().and_then(|(kind, args)| {
            let sql = self.cursor.recorded_sql(recording).to_string();
            self.finish_statement(kind, args, sql)
        });
        self.ctx = outer;
        result
    }

    /// Dispatches on the leading keyword.
    pub(crate) fn parse_statement_body(&mut self) -> Result<(StatementKind, StatementArgs)> {
        match &self.current().kind {
            TokenKind::LeftParen
            | TokenKind::Keyword(Keyword::Select | Keyword::Values | Keyword::Table | Keyword::With) => {
                let query = self.parse_query_expression()?;
                Ok((StatementKind::Select, StatementArgs::Query(query)))
            }
            TokenKind::Keyword(Keyword::Insert) => self.parse_insert(),
            TokenKind::Keyword(Keyword::Update) => self.parse_update(),
            TokenKind::Keyword(Keyword::Delete) => self.parse_delete(),
            TokenKind::Keyword(Keyword::Truncate) => self.parse_truncate(),
            TokenKind::Keyword(Keyword::Create) => self.parse_create(),
            TokenKind::Keyword(Keyword::Alter) => self.parse_alter(),
            TokenKind::Keyword(Keyword::Drop) => self.parse_drop(),
            TokenKind::Keyword(Keyword::Grant) => self.parse_grant(),
            TokenKind::Keyword(Keyword::Revoke) => self.parse_revoke(),
            _ => Err(self.unexpected("statement")),
        }
    }

    /// Resolves names and types, orders subqueries and drains the context
    /// into an immutable statement.
    fn finish_statement(
        &mut self,
        kind: StatementKind,
        mut args: StatementArgs,
        sql: String,
    ) -> Result<Statement> {
        self.resolve_statement(&mut args)?;
        self.check_parameter_types()?;

        let order = materialization_order(self.ctx.subqueries());
        let drained = self.ctx.drain();
        let mut slots: Vec<Option<_>> = drained.subqueries.into_iter().map(Some).collect();
        let subqueries: Vec<_> = order
            .iter()
            .filter_map(|id| slots.get_mut(id.0).and_then(Option::take))
            .collect();

        let mut read_tables: Vec<QualifiedName> = Vec::new();
        let mut write_tables: Vec<QualifiedName> = Vec::new();
        for reference in &drained.references {
            if !matches!(reference.kind, ObjectKind::Table | ObjectKind::View) {
                continue;
            }
            let target = match reference.access {
                Access::Read => &mut read_tables,
                Access::Write => &mut write_tables,
                Access::Use => continue,
            };
            if !target.contains(&reference.name) {
                target.push(reference.name.clone());
            }
        }

        debug!(
            kind = kind.as_str(),
            subqueries = subqueries.len(),
            parameters = drained.parameters.len(),
            reads = read_tables.len(),
            writes = write_tables.len(),
            "compiled statement"
        );

        Ok(Statement {
            sql,
            kind,
            args,
            read_tables,
            write_tables,
            subqueries,
            parameters: drained.parameters,
            references: drained.references,
        })
    }

    // --- Speculative parsing ---

    /// Current cursor position and context state.
    pub(crate) fn checkpoint(&self) -> Checkpoint {
        self.ctx.checkpoint(self.cursor.position())
    }

    /// Returns cursor and context to `checkpoint`.
    pub(crate) fn restore(&mut self, checkpoint: Checkpoint) {
        trace!(from = self.cursor.position(), to = checkpoint.position, "rewind");
        self.cursor.rewind(checkpoint.position);
        self.ctx.restore(checkpoint);
    }

    /// Runs `attempt`; on failure undoes everything it consumed or
    /// registered and passes the error on.
    pub(crate) fn speculate<T>(&mut self, attempt: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
        let checkpoint = self.checkpoint();
        let result = attempt(self);
        if result.is_err() {
            self.restore(checkpoint);
        }
        result
    }

    /// Whether `attempt` would succeed here. Never consumes anything.
    pub(crate) fn lookahead<T>(&mut self, attempt: impl FnOnce(&mut Self) -> Result<T>) -> bool {
        let checkpoint = self.checkpoint();
        let ok = attempt(self).is_ok();
        self.restore(checkpoint);
        ok
    }

    /// Tries each alternative from the same starting point and returns the
    /// first success. When all fail, the deepest error is returned.
    pub(crate) fn first_of<T>(
        &mut self,
        alternatives: &[&dyn Fn(&mut Self) -> Result<T>],
    ) -> Result<T> {
        let mut deepest: Option<CompileError> = None;
        for (n, alternative) in alternatives.iter().enumerate() {
            match self.speculate(|p| alternative(p)) {
                Ok(value) => {
                    trace!(alternative = n, "alternative chosen");
                    return Ok(value);
                }
                Err(err) => {
                    deepest = Some(match deepest {
                        Some(previous) => previous.deepest(err),
                        None => err,
                    });
                }
            }
        }
        Err(deepest.unwrap_or_else(|| self.unexpected("alternative")))
    }

    /// Looks past any number of `(` for the start of a query expression.
    pub(crate) fn query_follows_parens(&self) -> bool {
        let mut n = 0;
        while matches!(self.cursor.peek(n).kind, TokenKind::LeftParen) {
            n += 1;
        }
        n > 0 && Self::starts_query(self.cursor.peek(n))
    }

    /// Whether `token` can begin a query expression.
    pub(crate) fn starts_query(token: &Token) -> bool {
        matches!(
            token.as_keyword(),
            Some(Keyword::Select | Keyword::Values | Keyword::Table | Keyword::With)
        )
    }

    // --- Token helpers ---

    pub(crate) fn current(&self) -> &Token {
        self.cursor.current()
    }

    pub(crate) fn position(&self) -> usize {
        self.cursor.position()
    }

    /// Advances to the next token, returning the one consumed.
    pub(crate) fn advance(&mut self) -> Token {
        self.cursor.read()
    }

    /// Checks if the current token matches the given kind.
    pub(crate) fn check(&self, kind: &TokenKind) -> bool {
        std::mem::discriminant(&self.current().kind) == std::mem::discriminant(kind)
    }

    /// Checks if the current token is the given keyword.
    pub(crate) fn check_keyword(&self, keyword: Keyword) -> bool {
        self.current().as_keyword() == Some(keyword)
    }

    /// Checks the keyword `n` tokens ahead.
    pub(crate) fn peek_keyword(&self, n: usize, keyword: Keyword) -> bool {
        self.cursor.peek(n).as_keyword() == Some(keyword)
    }

    pub(crate) fn consume(&mut self, kind: &TokenKind) -> bool {
        let matched = self.check(kind);
        if matched {
            self.advance();
        }
        matched
    }

    pub(crate) fn consume_keyword(&mut self, keyword: Keyword) -> bool {
        let matched = self.check_keyword(keyword);
        if matched {
            self.advance();
        }
        matched
    }

    /// Expects the current token to be the given kind.
    pub(crate) fn expect(&mut self, kind: &TokenKind) -> Result<()> {
        if self.consume(kind) {
            Ok(())
        } else {
            Err(self.unexpected(&kind.to_string()))
        }
    }

    /// Expects the current token to be the given keyword.
    pub(crate) fn expect_keyword(&mut self, keyword: Keyword) -> Result<()> {
        if self.consume_keyword(keyword) {
            Ok(())
        } else {
            Err(self.unexpected(keyword.as_str()))
        }
    }

    /// True if the current token is an unqualified identifier or a
    /// non-reserved keyword.
    pub(crate) fn is_identifier(&self) -> bool {
        let token = self.current();
        !token.is_qualified() && token.identifier_text().is_some()
    }

    /// Expects and returns an unqualified identifier.
    pub(crate) fn expect_identifier(&mut self) -> Result<String> {
        if !self.is_identifier() {
            return Err(self.unexpected("identifier"));
        }
        let token = self.advance();
        Ok(token.identifier_text().unwrap_or_default().to_string())
    }

    /// Parses `[schema.]name`, filling in the default schema.
    pub(crate) fn parse_qualified_name(&mut self) -> Result<QualifiedName> {
        let token = self.current().clone();
        let Some(name) = token.identifier_text() else {
            return Err(self.unexpected("name"));
        };
        let name = match token.qualifiers.as_slice() {
            [] => QualifiedName::bare(name),
            [schema] => QualifiedName::new(schema.clone(), name),
            _ => {
                return Err(self.error(ErrorKind::InvalidDefinition(format!(
                    "too many qualifiers in {}",
                    token.span.text(self.cursor.sql())
                ))))
            }
        };
        self.advance();
        Ok(name.with_default_schema(&self.config.default_schema))
    }

    /// Parses `name, name, ...` rejecting repeats.
    pub(crate) fn parse_identifier_list(&mut self) -> Result<Vec<String>> {
        let mut names: Vec<String> = Vec::new();
        loop {
            let span = self.current().span;
            let name = self.expect_identifier()?;
            if names.contains(&name) {
                return Err(self.error_at(ErrorKind::DuplicateName(name), span));
            }
            names.push(name);
            if !self.consume(&TokenKind::Comma) {
                break;
            }
        }
        Ok(names)
    }

    /// Parses `( name, name, ... )`.
    pub(crate) fn parse_paren_identifier_list(&mut self) -> Result<Vec<String>> {
        self.expect(&TokenKind::LeftParen)?;
        let names = self.parse_identifier_list()?;
        self.expect(&TokenKind::RightParen)?;
        Ok(names)
    }

    /// Parses an optionally signed integer literal.
    pub(crate) fn parse_integer(&mut self) -> Result<i64> {
        let negative = self.consume(&TokenKind::Minus);
        if !negative {
            self.consume(&TokenKind::Plus);
        }
        match self.current().kind {
            TokenKind::Integer(n) => {
                self.advance();
                Ok(if negative { -n } else { n })
            }
            _ => Err(self.unexpected("integer")),
        }
    }

    /// Parses a string literal.
    pub(crate) fn parse_string(&mut self) -> Result<String> {
        match &self.current().kind {
            TokenKind::String(s) => {
                let value = s.clone();
                self.advance();
                Ok(value)
            }
            _ => Err(self.unexpected("string literal")),
        }
    }

    // --- Errors ---

    /// Error at the current token.
    pub(crate) fn error(&self, kind: ErrorKind) -> CompileError {
        self.error_at(kind, self.current().span)
    }

    pub(crate) fn error_at(&self, kind: ErrorKind, span: Span) -> CompileError {
        CompileError::new(kind, span, self.ctx.depth())
    }

    /// Syntax error for the current token.
    pub(crate) fn unexpected(&self, expected: &str) -> CompileError {
        let token = self.current();
        let kind = match &token.kind {
            TokenKind::Eof => ErrorKind::UnexpectedEnd(expected.to_string()),
            TokenKind::Error(message) => ErrorKind::MalformedToken(message.clone()),
            _ => ErrorKind::UnexpectedToken {
                expected: expected.to_string(),
                found: token.span.text(self.cursor.sql()).to_string(),
            },
        };
        self.error(kind)
    }

    /// Span from token `position` through the last consumed token.
    pub(crate) fn span_from(&self, position: usize) -> Span {
        self.cursor.span_from(position)
    }

    // --- Data types ---

    /// Parses a predefined type, a domain or a user-defined type. Domains
    /// return their name alongside the underlying type.
    pub(crate) fn parse_data_type_or_domain(&mut self) -> Result<(DataType, Option<QualifiedName>)> {
        if let Some(data_type) = self.parse_predefined_type()? {
            return Ok((data_type, None));
        }
        let position = self.position();
        let span = self.current().span;
        let name = self.parse_qualified_name()?;
        if let Some(domain) = self.catalog.domain(&name) {
            let data_type = domain.data_type.clone();
            self.use_object(ObjectKind::Domain, &name, position, span)?;
            return Ok((data_type, Some(name)));
        }
        if self.catalog.user_type(&name).is_some() {
            self.use_object(ObjectKind::Type, &name, position, span)?;
            return Ok((DataType::Distinct(name.to_string()), None));
        }
        Err(self.error_at(ErrorKind::ObjectNotFound(name.to_string()), span))
    }

    /// Parses a data type, resolving domains to their underlying type.
    pub(crate) fn parse_data_type(&mut self) -> Result<DataType> {
        self.parse_data_type_or_domain().map(|(data_type, _)| data_type)
    }

    /// Parses a built-in type name, or returns `None` without consuming
    /// anything when the current token does not start one.
    pub(crate) fn parse_predefined_type(&mut self) -> Result<Option<DataType>> {
        let Some(keyword) = self.current().as_keyword() else {
            return Ok(None);
        };
        let code = match keyword {
            Keyword::Boolean => TypeCode::Boolean,
            Keyword::Tinyint => TypeCode::Tinyint,
            Keyword::Smallint => TypeCode::Smallint,
            Keyword::Int | Keyword::Integer => TypeCode::Integer,
            Keyword::Bigint => TypeCode::Bigint,
            Keyword::Decimal => TypeCode::Decimal,
            Keyword::Numeric => TypeCode::Numeric,
            Keyword::Real => TypeCode::Real,
            Keyword::Double | Keyword::Float => TypeCode::Double,
            Keyword::Char | Keyword::Character => TypeCode::Char,
            Keyword::Varchar => TypeCode::Varchar,
            Keyword::Clob => TypeCode::Clob,
            Keyword::Binary => TypeCode::Binary,
            Keyword::Varbinary => TypeCode::Varbinary,
            Keyword::Blob => TypeCode::Blob,
            Keyword::Date => TypeCode::Date,
            Keyword::Time => TypeCode::Time,
            Keyword::Timestamp | Keyword::Datetime => TypeCode::Timestamp,
            _ => return Ok(None),
        };
        self.advance();

        let code = match code {
            TypeCode::Double => {
                if keyword == Keyword::Double {
                    self.consume_keyword(Keyword::Precision);
                } else if self.check(&TokenKind::LeftParen) {
                    // FLOAT(p) keeps its double precision
                    self.parse_type_arguments()?;
                }
                return Ok(Some(DataType::for_code(TypeCode::Double, None, None)));
            }
            TypeCode::Char | TypeCode::Binary if self.consume_keyword(Keyword::Varying) => {
                if code == TypeCode::Char {
                    TypeCode::Varchar
                } else {
                    TypeCode::Varbinary
                }
            }
            other => other,
        };

        let (length, scale) = match code {
            TypeCode::Decimal
            | TypeCode::Numeric
            | TypeCode::Char
            | TypeCode::Varchar
            | TypeCode::Binary
            | TypeCode::Varbinary
            | TypeCode::Clob
            | TypeCode::Blob
            | TypeCode::Time
            | TypeCode::Timestamp => self.parse_type_arguments()?,
            _ => (None, None),
        };
        if scale.is_some() && !matches!(code, TypeCode::Decimal | TypeCode::Numeric) {
            return Err(self.error(ErrorKind::InvalidDefinition(String::from(
                "scale is only allowed for DECIMAL and NUMERIC",
            ))));
        }
        Ok(Some(DataType::for_code(code, length, scale)))
    }

    /// Parses optional `(length [, scale])`.
    fn parse_type_arguments(&mut self) -> Result<(Option<u32>, Option<u32>)> {
        if !self.consume(&TokenKind::LeftParen) {
            return Ok((None, None));
        }
        let length = self.parse_type_size()?;
        let scale = if self.consume(&TokenKind::Comma) {
            Some(self.parse_type_size()?)
        } else {
            None
        };
        self.expect(&TokenKind::RightParen)?;
        Ok((Some(length), scale))
    }

    fn parse_type_size(&mut self) -> Result<u32> {
        let span = self.current().span;
        let value = self.parse_integer()?;
        u32::try_from(value)
            .map_err(|_| self.error_at(ErrorKind::InvalidDefinition(format!("invalid size {value}")), span))
    }

    // --- Catalog access ---

    /// Records a USAGE/EXECUTE dependency after checking the authorizer.
    pub(crate) fn use_object(
        &mut self,
        kind: ObjectKind,
        name: &QualifiedName,
        position: usize,
        span: Span,
    ) -> Result<()> {
        if !self.authorizer.can_use(kind, name) {
            return Err(self.error_at(
                ErrorKind::AccessDenied(format!("{kind} {name}")),
                span,
            ));
        }
        self.ctx
            .add_reference(kind, name.clone(), Access::Use, position);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{AllowAll, MemoryCatalog};

    fn with_parser<T>(sql: &str, f: impl FnOnce(&mut Parser<'_>) -> T) -> T {
        let catalog = MemoryCatalog::new();
        let config = CompilerConfig::default();
        let mut parser = Parser::new(sql, &catalog, &AllowAll, &config);
        f(&mut parser)
    }

    #[test]
    fn test_qualified_name_gets_default_schema() {
        with_parser("orders s.items", |p| {
            assert_eq!(p.parse_qualified_name().unwrap(), QualifiedName::new("PUBLIC", "ORDERS"));
            assert_eq!(p.parse_qualified_name().unwrap(), QualifiedName::new("S", "ITEMS"));
        });
    }

    #[test]
    fn test_data_types() {
        with_parser(
            "VARCHAR(20) DECIMAL(10,2) CHARACTER VARYING(5) DOUBLE PRECISION INT",
            |p| {
                assert_eq!(p.parse_data_type().unwrap(), DataType::Varchar(Some(20)));
                assert_eq!(
                    p.parse_data_type().unwrap(),
                    DataType::Decimal {
                        precision: Some(10),
                        scale: Some(2)
                    }
                );
                assert_eq!(p.parse_data_type().unwrap(), DataType::Varchar(Some(5)));
                assert_eq!(p.parse_data_type().unwrap(), DataType::Double);
                assert_eq!(p.parse_data_type().unwrap(), DataType::Integer);
            },
        );
    }

    #[test]
    fn test_unknown_type_is_not_found() {
        with_parser("MONEY", |p| {
            let err = p.parse_data_type().unwrap_err();
            assert!(matches!(err.kind, ErrorKind::ObjectNotFound(_)));
        });
    }

    fn fail_after_one(p: &mut Parser<'_>) -> Result<()> {
        p.advance();
        Err(p.unexpected("one"))
    }

    fn fail_after_two(p: &mut Parser<'_>) -> Result<()> {
        p.advance();
        p.advance();
        Err(p.unexpected("two"))
    }

    #[test]
    fn test_first_of_keeps_deepest_error() {
        with_parser("a b c", |p| {
            let err = p.first_of(&[&fail_after_one, &fail_after_two]).unwrap_err();
            assert!(matches!(
                err.kind,
                ErrorKind::UnexpectedToken { ref expected, .. } if expected == "two"
            ));
            assert_eq!(p.position(), 0);
        });
    }

    #[test]
    fn test_lookahead_does_not_consume() {
        with_parser("x y", |p| {
            assert!(p.lookahead(|p| p.expect_identifier()));
            assert_eq!(p.position(), 0);
            assert!(!p.lookahead(|p| p.parse_integer()));
        });
    }

    #[test]
    fn test_unexpected_end() {
        with_parser("", |p| {
            let err = p.expect_identifier().unwrap_err();
            assert!(matches!(err.kind, ErrorKind::UnexpectedEnd(_)));
        });
    }
}
