//! Compile SQL against a catalog and explain the statements.
//!
//! `oxide-sql-explain` is a developer aid around `oxide-sql-compiler`: it
//! loads a catalog and compiler settings from JSON, compiles a script and
//! reports what each statement reads, writes and depends on.

pub mod error;
pub mod report;

use std::path::Path;

use serde::de::DeserializeOwned;

use oxide_sql_compiler::{Compiler, CompilerConfig, MemoryCatalog, Statement};

pub use error::{ExplainError, Result};
pub use report::StatementReport;

/// Reads a JSON document of type `T` from `path`.
///
/// # Errors
///
/// Fails if the file cannot be read or does not deserialize.
pub fn load_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let text = std::fs::read_to_string(path)?;
    serde_json::from_str(&text).map_err(|source| ExplainError::Load {
        path: path.to_path_buf(),
        source,
    })
}

/// Loads the catalog at `path`, or an empty one with just `PUBLIC`.
///
/// # Errors
///
/// See [`load_json`].
pub fn load_catalog(path: Option<&Path>) -> Result<MemoryCatalog> {
    path.map_or_else(|| Ok(MemoryCatalog::new()), load_json)
}

/// Loads compiler settings at `path`, or the defaults.
///
/// # Errors
///
/// See [`load_json`].
pub fn load_config(path: Option<&Path>) -> Result<CompilerConfig> {
    path.map_or_else(|| Ok(CompilerConfig::default()), load_json)
}

/// Compiles every statement of `sql`.
///
/// # Errors
///
/// Returns the first compile error with its line and column.
pub fn explain(sql: &str, catalog: &MemoryCatalog, config: CompilerConfig) -> Result<Vec<Statement>> {
    Compiler::new(catalog)
        .with_config(config)
        .compile(sql)
        .map_err(|err| ExplainError::compile(err, sql))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explain_reports_error_location() {
        let catalog: MemoryCatalog = serde_json::from_str(
            r#"{ "tables": [{
                "name": { "schema": "PUBLIC", "name": "T" },
                "columns": [{ "name": "A", "data_type": "INTEGER" }]
            }] }"#,
        )
        .unwrap();
        let err = explain("SELECT a FROM t;\nSELECT  missing FROM t", &catalog, CompilerConfig::default())
            .unwrap_err();
        match err {
            ExplainError::Compile {
                line,
                column,
                excerpt,
                ..
            } => {
                assert_eq!((line, column), (2, 9));
                assert_eq!(excerpt, "missing");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_missing_inputs_use_defaults() {
        let catalog = load_catalog(None).unwrap();
        assert_eq!(catalog.schemas, vec!["PUBLIC".to_string()]);
        assert_eq!(load_config(None).unwrap(), CompilerConfig::default());
    }

    #[test]
    fn test_load_json_names_the_file() {
        let err = load_json::<CompilerConfig>(Path::new(env!("CARGO_MANIFEST_DIR")).join("Cargo.toml").as_path())
            .unwrap_err();
        assert!(err.to_string().contains("Cargo.toml"));
    }
}
