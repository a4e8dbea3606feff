//! Rewindable cursor over the token stream of one SQL text.

use crate::lexer::{Lexer, Span, Token, TokenKind};

/// Most qualifiers a dotted name may carry (`catalog.schema.table.column`).
const MAX_QUALIFIERS: usize = 3;

/// Start of a recorded token run; see [`TokenCursor::recorded_sql`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Recording {
    start: usize,
}

/// Cursor over the tokens of a SQL text.
///
/// The whole text is scanned up front, so any earlier position can be
/// returned to with [`TokenCursor::rewind`] and replayed exactly.
pub struct TokenCursor<'a> {
    sql: &'a str,
    tokens: Vec<Token>,
    pos: usize,
}

impl<'a> TokenCursor<'a> {
    /// Scans `sql` and joins dotted names into single tokens.
    #[must_use]
    pub fn new(sql: &'a str) -> Self {
        let tokens = chain_qualified_names(Lexer::new(sql).tokenize());
        Self {
            sql,
            tokens,
            pos: 0,
        }
    }

    /// The text being compiled.
    #[must_use]
    pub const fn sql(&self) -> &'a str {
        self.sql
    }

    /// The current token. At the end this is the `Eof` token.
    #[must_use]
    pub fn current(&self) -> &Token {
        self.peek(0)
    }

    /// The token `n` places after the current one, saturating at `Eof`.
    #[must_use]
    pub fn peek(&self, n: usize) -> &Token {
        let last = self.tokens.len() - 1;
        &self.tokens[(self.pos + n).min(last)]
    }

    /// The token before the current one, or the current one at the start.
    #[must_use]
    pub fn previous(&self) -> &Token {
        &self.tokens[self.pos.saturating_sub(1)]
    }

    /// Consumes the current token and returns it. `Eof` is never consumed.
    pub fn read(&mut self) -> Token {
        let token = self.current().clone();
        if !token.is_eof() {
            self.pos += 1;
        }
        token
    }

    /// Absolute position of the current token.
    #[must_use]
    pub const fn position(&self) -> usize {
        self.pos
    }

    /// Moves back (or forward) to a position returned by [`Self::position`].
    pub fn rewind(&mut self, position: usize) {
        self.pos = position.min(self.tokens.len() - 1);
    }

    /// True once every token but `Eof` has been read.
    #[must_use]
    pub fn at_end(&self) -> bool {
        self.current().is_eof()
    }

    /// Marks the current token as the start of a recorded run.
    #[must_use]
    pub const fn start_recording(&self) -> Recording {
        Recording { start: self.pos }
    }

    /// Source text from the recording mark through the last consumed token.
    #[must_use]
    pub fn recorded_sql(&self, recording: Recording) -> &'a str {
        if self.pos <= recording.start {
            return "";
        }
        let span = self.tokens[recording.start]
            .span
            .merge(self.tokens[self.pos - 1].span);
        span.text(self.sql)
    }

    /// Span from the token at `position` through the last consumed token.
    #[must_use]
    pub fn span_from(&self, position: usize) -> Span {
        let start = self.tokens[position.min(self.tokens.len() - 1)].span;
        if self.pos <= position {
            return Span::new(start.start, start.start);
        }
        start.merge(self.tokens[self.pos - 1].span)
    }
}

/// Text of a token that may take part in a dotted name.
fn name_part(token: &Token, after_dot: bool) -> Option<String> {
    match &token.kind {
        TokenKind::Identifier(name) => Some(name.clone()),
        TokenKind::Keyword(kw) if after_dot || !kw.is_reserved() => Some(kw.as_str().to_string()),
        _ => None,
    }
}

/// Folds `a . b [. c [. d]]` and `a . *` into one token whose qualifiers
/// are the leading parts.
fn chain_qualified_names(tokens: Vec<Token>) -> Vec<Token> {
    let mut out: Vec<Token> = Vec::with_capacity(tokens.len());
    let mut iter = tokens.into_iter().peekable();

    while let Some(token) = iter.next() {
        let Some(first) = name_part(&token, false) else {
            out.push(token);
            continue;
        };
        if !matches!(iter.peek().map(|t| &t.kind), Some(TokenKind::Dot)) {
            out.push(token);
            continue;
        }

        let mut qualifiers = vec![first];
        let mut last = token;
        loop {
            if !matches!(iter.peek().map(|t| &t.kind), Some(TokenKind::Dot)) {
                break;
            }
            let dot = iter.next();
            let Some(next) = iter.next() else {
                out.extend(dot);
                break;
            };
            let span = last.span.merge(next.span);
            if matches!(next.kind, TokenKind::Star) {
                last = Token {
                    kind: TokenKind::Star,
                    span,
                    quoted: false,
                    qualifiers: Vec::new(),
                };
                break;
            }
            match name_part(&next, true) {
                Some(part) => {
                    qualifiers.push(part);
                    last = Token {
                        kind: next.kind,
                        span,
                        quoted: next.quoted,
                        qualifiers: Vec::new(),
                    };
                }
                None => {
                    last = Token::new(
                        TokenKind::Error(format!("invalid name after '.': {}", next.kind)),
                        span,
                    );
                    qualifiers.clear();
                    break;
                }
            }
        }

        match last.kind {
            TokenKind::Error(_) => {}
            TokenKind::Star => {}
            _ => {
                // The final part is the token itself, not a qualifier.
                qualifiers.pop();
                if let TokenKind::Keyword(kw) = last.kind {
                    last.kind = TokenKind::Identifier(kw.as_str().to_string());
                }
            }
        }
        if qualifiers.len() > MAX_QUALIFIERS {
            last = Token::new(
                TokenKind::Error(String::from("too many name qualifiers")),
                last.span,
            );
            qualifiers.clear();
        }
        last.qualifiers = qualifiers;
        out.push(last);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dotted_names_become_one_token() {
        let cursor = TokenCursor::new("SELECT s.t.c, t.*, x FROM s.t");
        let c = cursor.peek(1);
        assert_eq!(c.kind, TokenKind::Identifier("C".into()));
        assert_eq!(c.qualifiers, vec!["S".to_string(), "T".to_string()]);
        assert_eq!(c.span.text(cursor.sql()), "s.t.c");

        let star = cursor.peek(3);
        assert_eq!(star.kind, TokenKind::Star);
        assert_eq!(star.qualifiers, vec!["T".to_string()]);

        assert!(cursor.peek(5).qualifiers.is_empty());
        assert_eq!(cursor.peek(7).qualifiers, vec!["S".to_string()]);
    }

    #[test]
    fn keywords_after_dot_are_names() {
        let cursor = TokenCursor::new("t.value");
        assert_eq!(cursor.current().kind, TokenKind::Identifier("VALUE".into()));
        assert_eq!(cursor.current().qualifiers, vec!["T".to_string()]);
    }

    #[test]
    fn too_many_qualifiers_is_an_error_token() {
        let cursor = TokenCursor::new("a.b.c.d.e");
        assert!(matches!(cursor.current().kind, TokenKind::Error(_)));
        let ok = TokenCursor::new("a.b.c.d");
        assert_eq!(ok.current().qualifiers.len(), 3);
    }

    #[test]
    fn rewind_replays_exactly() {
        let mut cursor = TokenCursor::new("SELECT a FROM t");
        let start = cursor.position();
        let first: Vec<Token> = (0..4).map(|_| cursor.read()).collect();
        assert!(cursor.at_end());
        cursor.rewind(start);
        let second: Vec<Token> = (0..4).map(|_| cursor.read()).collect();
        assert_eq!(first, second);
        assert!(cursor.read().is_eof());
    }

    #[test]
    fn recording_captures_verbatim_text() {
        let mut cursor = TokenCursor::new("CREATE VIEW v AS SELECT  a,b FROM t ;");
        for _ in 0..4 {
            cursor.read();
        }
        let rec = cursor.start_recording();
        while !matches!(cursor.current().kind, TokenKind::Semicolon) {
            cursor.read();
        }
        assert_eq!(cursor.recorded_sql(rec), "SELECT  a,b FROM t");
    }
}
