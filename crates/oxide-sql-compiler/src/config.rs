//! Compiler settings.

use serde::{Deserialize, Serialize};

use crate::ast::TableKind;

/// Settings that shape how statements are compiled.
///
/// Every field has a default, so a partial JSON document is a valid config.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompilerConfig {
    /// Schema used for unqualified object names.
    pub default_schema: String,
    /// Deepest allowed subquery nesting.
    pub max_nesting_depth: u32,
    /// Deepest allowed expression nesting: brackets, prefix operators,
    /// function arguments and operator operands each add a level.
    pub max_expression_depth: u32,
    /// Accept `SELECT TOP n` and `SELECT LIMIT offset count` forms.
    pub allow_limit_in_select_clause: bool,
    /// Table kind for `CREATE TABLE` without an explicit kind.
    pub default_table_kind: TableKind,
    /// Reject duplicate output column names in views and derived tables.
    pub strict_names: bool,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            default_schema: String::from("PUBLIC"),
            max_nesting_depth: 64,
            max_expression_depth: 128,
            allow_limit_in_select_clause: true,
            default_table_kind: TableKind::Memory,
            strict_names: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_uses_defaults() {
        let config: CompilerConfig =
            serde_json::from_str(r#"{ "max_nesting_depth": 8 }"#).unwrap();
        assert_eq!(config.max_nesting_depth, 8);
        assert_eq!(config.max_expression_depth, 128);
        assert_eq!(config.default_schema, "PUBLIC");
        assert!(config.strict_names);
    }
}
