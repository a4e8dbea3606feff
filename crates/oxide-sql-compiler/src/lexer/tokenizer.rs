//! SQL tokenizer.

use super::{Keyword, Span, Token, TokenKind};

/// A lexer that tokenizes SQL input.
pub struct Lexer<'a> {
    /// The input source code.
    input: &'a str,
    /// The current byte position.
    pos: usize,
    /// The byte position of the start of the current token.
    start: usize,
}

impl<'a> Lexer<'a> {
    /// Creates a new lexer for the given input.
    #[must_use]
    pub const fn new(input: &'a str) -> Self {
        Self {
            input,
            pos: 0,
            start: 0,
        }
    }

    fn peek(&self) -> Option<char> {
        self.input[self.pos..].chars().next()
    }

    fn peek_next(&self) -> Option<char> {
        let mut chars = self.input[self.pos..].chars();
        chars.next();
        chars.next()
    }

    fn advance(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn skip_whitespace_and_comments(&mut self) {
        loop {
            while self.peek().is_some_and(char::is_whitespace) {
                self.advance();
            }

            if self.peek() == Some('-') && self.peek_next() == Some('-') {
                while self.peek().is_some_and(|c| c != '\n') {
                    self.advance();
                }
                continue;
            }

            if self.peek() == Some('/') && self.peek_next() == Some('*') {
                self.advance();
                self.advance();
                loop {
                    match self.advance() {
                        Some('*') if self.peek() == Some('/') => {
                            self.advance();
                            break;
                        }
                        None => break,
                        _ => {}
                    }
                }
                continue;
            }

            break;
        }
    }

    fn make_token(&self, kind: TokenKind) -> Token {
        Token::new(kind, Span::new(self.start, self.pos))
    }

    fn error(&self, message: impl Into<String>) -> Token {
        self.make_token(TokenKind::Error(message.into()))
    }

    fn scan_word(&mut self) -> &'a str {
        let begin = self.pos;
        while self.peek().is_some_and(|c| c.is_alphanumeric() || c == '_') {
            self.advance();
        }
        &self.input[begin..self.pos]
    }

    /// Scans an identifier or keyword. Unquoted identifiers fold to upper case.
    fn scan_identifier(&mut self) -> Token {
        let text = self.scan_word();
        match Keyword::from_str(text) {
            Some(keyword) => self.make_token(TokenKind::Keyword(keyword)),
            None => self.make_token(TokenKind::Identifier(text.to_uppercase())),
        }
    }

    /// Scans a delimited identifier, keeping its case.
    fn scan_quoted_identifier(&mut self) -> Token {
        self.advance();
        let mut name = String::new();

        loop {
            match self.advance() {
                Some('"') if self.peek() == Some('"') => {
                    self.advance();
                    name.push('"');
                }
                Some('"') => break,
                Some(c) => name.push(c),
                None => return self.error("unterminated quoted identifier"),
            }
        }

        if name.is_empty() {
            return self.error("zero-length delimited identifier");
        }
        let mut token = self.make_token(TokenKind::Identifier(name));
        token.quoted = true;
        token
    }

    /// Scans a numeric literal.
    fn scan_number(&mut self) -> Token {
        let mut has_fraction = false;
        let mut has_exponent = false;

        while self.peek().is_some_and(|c| c.is_ascii_digit()) {
            self.advance();
        }

        if self.peek() == Some('.') && self.peek_next().is_some_and(|c| c.is_ascii_digit()) {
            has_fraction = true;
            self.advance();
            while self.peek().is_some_and(|c| c.is_ascii_digit()) {
                self.advance();
            }
        }

        if self.peek().is_some_and(|c| c == 'e' || c == 'E') {
            has_exponent = true;
            self.advance();
            if self.peek().is_some_and(|c| c == '+' || c == '-') {
                self.advance();
            }
            if !self.peek().is_some_and(|c| c.is_ascii_digit()) {
                return self.error("malformed numeric literal");
            }
            while self.peek().is_some_and(|c| c.is_ascii_digit()) {
                self.advance();
            }
        }

        if self.peek().is_some_and(|c| c.is_alphabetic() || c == '_') {
            self.scan_word();
            return self.error("malformed numeric literal");
        }

        let text = &self.input[self.start..self.pos];
        if has_exponent {
            return match text.parse::<f64>() {
                Ok(f) => self.make_token(TokenKind::Float(f)),
                Err(e) => self.error(format!("invalid float: {e}")),
            };
        }
        if has_fraction {
            return self.make_token(TokenKind::Decimal(text.to_string()));
        }
        match text.parse::<i64>() {
            Ok(i) => self.make_token(TokenKind::Integer(i)),
            Err(_) => self.make_token(TokenKind::Decimal(text.to_string())),
        }
    }

    /// Scans a string literal; `''` inside the literal is one quote.
    fn scan_string(&mut self) -> Token {
        self.advance();
        let mut value = String::new();

        loop {
            match self.advance() {
                Some('\'') if self.peek() == Some('\'') => {
                    self.advance();
                    value.push('\'');
                }
                Some('\'') => break,
                Some(c) => value.push(c),
                None => return self.error("unterminated string literal"),
            }
        }

        self.make_token(TokenKind::String(value))
    }

    /// Scans a binary literal (`X'...'`).
    fn scan_blob(&mut self) -> Token {
        self.advance();
        self.advance();

        let mut bytes = Vec::new();
        let mut pending: Option<u32> = None;

        loop {
            match self.advance() {
                Some('\'') => break,
                Some(c) if c.is_ascii_hexdigit() => {
                    let digit = c.to_digit(16).unwrap_or(0);
                    match pending.take() {
                        Some(high) => bytes.push(u8::try_from(high * 16 + digit).unwrap_or(0)),
                        None => pending = Some(digit),
                    }
                }
                Some(c) if c.is_whitespace() => {}
                Some(_) => return self.error("invalid character in binary literal"),
                None => return self.error("unterminated binary literal"),
            }
        }

        if pending.is_some() {
            return self.error("odd number of hex digits in binary literal");
        }
        self.make_token(TokenKind::Blob(bytes))
    }

    /// Scans the next token.
    #[must_use]
    pub fn next_token(&mut self) -> Token {
        self.skip_whitespace_and_comments();
        self.start = self.pos;

        let Some(c) = self.peek() else {
            return self.make_token(TokenKind::Eof);
        };

        match c {
            '\'' => return self.scan_string(),
            '"' => return self.scan_quoted_identifier(),
            'X' | 'x' if self.peek_next() == Some('\'') => return self.scan_blob(),
            c if c.is_ascii_digit() => return self.scan_number(),
            '.' if self.peek_next().is_some_and(|c| c.is_ascii_digit()) => {
                return self.scan_number();
            }
            c if c.is_alphabetic() || c == '_' => return self.scan_identifier(),
            _ => {}
        }

        self.advance();
        match c {
            '(' => self.make_token(TokenKind::LeftParen),
            ')' => self.make_token(TokenKind::RightParen),
            ',' => self.make_token(TokenKind::Comma),
            ';' => self.make_token(TokenKind::Semicolon),
            '+' => self.make_token(TokenKind::Plus),
            '-' => self.make_token(TokenKind::Minus),
            '*' => self.make_token(TokenKind::Star),
            '/' => self.make_token(TokenKind::Slash),
            '%' => self.make_token(TokenKind::Percent),
            '?' => self.make_token(TokenKind::Question),
            '.' => self.make_token(TokenKind::Dot),
            '=' => self.make_token(TokenKind::Eq),
            ':' if self.peek().is_some_and(|c| c.is_alphabetic() || c == '_') => {
                let name = self.scan_word().to_string();
                self.make_token(TokenKind::NamedParameter(name))
            }
            '<' => match self.peek() {
                Some('=') => {
                    self.advance();
                    self.make_token(TokenKind::LtEq)
                }
                Some('>') => {
                    self.advance();
                    self.make_token(TokenKind::NotEq)
                }
                _ => self.make_token(TokenKind::Lt),
            },
            '>' => {
                if self.peek() == Some('=') {
                    self.advance();
                    self.make_token(TokenKind::GtEq)
                } else {
                    self.make_token(TokenKind::Gt)
                }
            }
            '!' if self.peek() == Some('=') => {
                self.advance();
                self.make_token(TokenKind::NotEq)
            }
            '|' if self.peek() == Some('|') => {
                self.advance();
                self.make_token(TokenKind::Concat)
            }
            other => self.error(format!("unexpected character: {other}")),
        }
    }

    /// Tokenizes the entire input. The last token is always `Eof`.
    #[must_use]
    pub fn tokenize(&mut self) -> Vec<Token> {
        let mut tokens = Vec::new();
        loop {
            let token = self.next_token();
            let is_eof = token.is_eof();
            tokens.push(token);
            if is_eof {
                break;
            }
        }
        tokens
    }
}
