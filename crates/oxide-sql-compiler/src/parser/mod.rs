//! SQL compiler front end.
//!
//! A hand-written recursive descent parser with Pratt expression parsing,
//! speculative alternatives over a rewindable token cursor, and name and
//! type resolution once a statement has been read.

mod context;
mod cursor;
mod ddl;
mod dml;
mod expression;
mod from;
mod functions;
#[allow(clippy::module_inception)]
mod parser;
mod pratt;
mod query;
mod resolve;
mod subquery;
mod typing;

pub use context::{Checkpoint, CompileContext, Drained, NamedQuery, RegisteredRange};
pub use cursor::{Recording, TokenCursor};
pub use parser::Parser;
