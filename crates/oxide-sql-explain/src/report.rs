//! Plain summaries of compiled statements.

use std::fmt;

use serde::Serialize;

use oxide_sql_compiler::ast::{Access, SubQueryKind};
use oxide_sql_compiler::Statement;

/// What one statement does, in printable form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatementReport {
    pub sql: String,
    pub kind: String,
    pub reads: Vec<String>,
    pub writes: Vec<String>,
    /// Sequences, domains, routines and other objects the statement uses.
    pub uses: Vec<String>,
    pub parameters: Vec<ParameterReport>,
    /// Subqueries in materialization order.
    pub subqueries: Vec<SubQueryReport>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParameterReport {
    pub index: usize,
    pub name: Option<String>,
    pub data_type: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubQueryReport {
    pub kind: &'static str,
    pub name: Option<String>,
    pub depth: u32,
    pub correlated: bool,
}

const fn kind_name(kind: SubQueryKind) -> &'static str {
    match kind {
        SubQueryKind::Scalar => "scalar",
        SubQueryKind::Row => "row",
        SubQueryKind::Table => "table",
        SubQueryKind::Exists => "exists",
        SubQueryKind::Unique => "unique",
        SubQueryKind::In => "in",
        SubQueryKind::Quantified => "quantified",
        SubQueryKind::Match => "match",
        SubQueryKind::Derived => "derived",
        SubQueryKind::Cte => "cte",
        SubQueryKind::View => "view",
    }
}

impl From<&Statement> for StatementReport {
    fn from(statement: &Statement) -> Self {
        let mut uses: Vec<String> = Vec::new();
        for reference in statement.referenced_objects() {
            if reference.access != Access::Use {
                continue;
            }
            let entry = format!("{} {}", reference.kind, reference.name);
            if !uses.contains(&entry) {
                uses.push(entry);
            }
        }
        Self {
            sql: statement.sql().to_string(),
            kind: statement.kind().as_str().to_string(),
            reads: statement.read_tables().iter().map(ToString::to_string).collect(),
            writes: statement.write_tables().iter().map(ToString::to_string).collect(),
            uses,
            parameters: statement
                .parameters()
                .iter()
                .map(|p| ParameterReport {
                    index: p.index,
                    name: p.name.clone(),
                    data_type: p.data_type.as_ref().map(ToString::to_string),
                })
                .collect(),
            subqueries: statement
                .subqueries()
                .iter()
                .map(|s| SubQueryReport {
                    kind: kind_name(s.kind),
                    name: s.name.clone(),
                    depth: s.depth,
                    correlated: s.correlated,
                })
                .collect(),
        }
    }
}

fn write_list(f: &mut fmt::Formatter<'_>, label: &str, items: &[String]) -> fmt::Result {
    if !items.is_empty() {
        writeln!(f, "  {label:<11}{}", items.join(", "))?;
    }
    Ok(())
}

impl fmt::Display for StatementReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}: {}", self.kind, self.sql)?;
        write_list(f, "reads:", &self.reads)?;
        write_list(f, "writes:", &self.writes)?;
        write_list(f, "uses:", &self.uses)?;
        for p in &self.parameters {
            let name = p.name.as_deref().map_or_else(|| "?".to_string(), |n| format!(":{n}"));
            let data_type = p.data_type.as_deref().unwrap_or("unknown");
            writeln!(f, "  param {:<5}{name} {data_type}", p.index)?;
        }
        for (n, s) in self.subqueries.iter().enumerate() {
            write!(f, "  subquery {n} {} depth {}", s.kind, s.depth)?;
            if let Some(name) = &s.name {
                write!(f, " {name}")?;
            }
            if s.correlated {
                write!(f, " correlated")?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use oxide_sql_compiler::ast::{DataType, QualifiedName};
    use oxide_sql_compiler::catalog::{MemoryCatalog, SequenceDef, TableDef};
    use oxide_sql_compiler::Compiler;

    fn catalog() -> MemoryCatalog {
        MemoryCatalog::new()
            .with_table(
                TableDef::new(QualifiedName::new("PUBLIC", "ITEMS"))
                    .column("ID", DataType::Integer)
                    .column("PRICE", DataType::Decimal {
                        precision: Some(10),
                        scale: Some(2),
                    }),
            )
            .with_sequence(SequenceDef {
                name: QualifiedName::new("PUBLIC", "ITEM_IDS"),
                data_type: DataType::Integer,
            })
    }

    #[test]
    fn test_report_lists_tables_and_parameters() {
        let catalog = catalog();
        let statement = Compiler::new(&catalog)
            .compile_one("INSERT INTO items (id, price) VALUES (NEXT VALUE FOR item_ids, :price)")
            .unwrap();
        let report = StatementReport::from(&statement);
        assert_eq!(report.kind, "INSERT");
        assert_eq!(report.writes, vec!["PUBLIC.ITEMS".to_string()]);
        assert_eq!(report.uses, vec!["SEQUENCE PUBLIC.ITEM_IDS".to_string()]);
        assert_eq!(report.parameters[0].name.as_deref(), Some("price"));
        assert_eq!(report.parameters[0].data_type.as_deref(), Some("DECIMAL(10,2)"));

        let text = report.to_string();
        assert!(text.starts_with("INSERT: INSERT INTO items"));
        assert!(text.contains("writes:    PUBLIC.ITEMS"));
    }

    #[test]
    fn test_report_orders_subqueries() {
        let catalog = catalog();
        let statement = Compiler::new(&catalog)
            .compile_one("SELECT id FROM items i WHERE price > (SELECT AVG(price) FROM items WHERE id <> i.id)")
            .unwrap();
        let report = StatementReport::from(&statement);
        assert_eq!(report.subqueries.len(), 1);
        assert_eq!(report.subqueries[0].kind, "scalar");
        assert!(report.subqueries[0].correlated);
        assert!(report.to_string().contains("subquery 0 scalar depth 1 correlated"));
    }
}
