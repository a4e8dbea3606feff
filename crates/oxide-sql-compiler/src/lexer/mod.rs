//! SQL Lexer/Tokenizer
//!
//! A hand-written lexer producing the flat token stream consumed by
//! [`crate::parser::TokenCursor`].

mod span;
mod token;
mod tokenizer;

pub use span::Span;
pub use token::{Keyword, Token, TokenKind};
pub use tokenizer::Lexer;
