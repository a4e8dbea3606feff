//! Error types for the explain tool.

use std::path::PathBuf;

use oxide_sql_compiler::CompileError;

/// Errors raised while loading inputs or compiling SQL.
#[derive(Debug, thiserror::Error)]
pub enum ExplainError {
    /// IO error reading SQL, catalog or config files.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A catalog or config file is not valid JSON for its type.
    #[error("Failed to load '{path}': {source}")]
    Load {
        /// The file being loaded.
        path: PathBuf,
        /// The JSON error.
        source: serde_json::Error,
    },

    /// A statement failed to compile.
    #[error("{error}\n  --> {line}:{column}: {excerpt}")]
    Compile {
        error: CompileError,
        /// 1-based line of the error start.
        line: usize,
        /// 1-based column of the error start.
        column: usize,
        /// Offending source text.
        excerpt: String,
    },
}

impl ExplainError {
    /// Attaches the source location of `error` within `sql`.
    #[must_use]
    pub fn compile(error: CompileError, sql: &str) -> Self {
        let start = error.span.start.min(sql.len());
        let before = sql.get(..start).unwrap_or(sql);
        let line = before.matches('\n').count() + 1;
        let column = before.rsplit('\n').next().map_or(0, |s| s.chars().count()) + 1;
        let excerpt = sql
            .get(error.span.start..error.span.end)
            .unwrap_or_default()
            .to_string();
        Self::Compile {
            error,
            line,
            column,
            excerpt,
        }
    }
}

/// Result type for the explain tool.
pub type Result<T> = std::result::Result<T, ExplainError>;
