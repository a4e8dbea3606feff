//! In-memory catalog.

use serde::{Deserialize, Serialize};

use super::{Catalog, DomainDef, IndexDef, RoutineDef, SequenceDef, TableDef, UserTypeDef};
use crate::ast::{ObjectKind, QualifiedName};

/// A catalog held in plain vectors, loadable from JSON.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MemoryCatalog {
    /// Schema assumed for names looked up without one.
    pub default_schema: String,
    pub schemas: Vec<String>,
    pub tables: Vec<TableDef>,
    pub sequences: Vec<SequenceDef>,
    pub domains: Vec<DomainDef>,
    pub types: Vec<UserTypeDef>,
    pub routines: Vec<RoutineDef>,
    pub indexes: Vec<IndexDef>,
    pub users: Vec<String>,
    pub roles: Vec<String>,
    /// Triggers, character sets and collations.
    pub objects: Vec<(ObjectKind, QualifiedName)>,
}

impl Default for MemoryCatalog {
    fn default() -> Self {
        Self {
            default_schema: String::from("PUBLIC"),
            schemas: vec![String::from("PUBLIC")],
            tables: Vec::new(),
            sequences: Vec::new(),
            domains: Vec::new(),
            types: Vec::new(),
            routines: Vec::new(),
            indexes: Vec::new(),
            users: Vec::new(),
            roles: Vec::new(),
            objects: Vec::new(),
        }
    }
}

impl MemoryCatalog {
    /// An empty catalog with the `PUBLIC` schema.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_schema(mut self, name: impl Into<String>) -> Self {
        self.schemas.push(name.into());
        self
    }

    /// Adds a table; an unqualified name lands in the default schema.
    #[must_use]
    pub fn with_table(mut self, mut table: TableDef) -> Self {
        table.name = self.qualify(&table.name);
        self.tables.push(table);
        self
    }

    #[must_use]
    pub fn with_sequence(mut self, mut sequence: SequenceDef) -> Self {
        sequence.name = self.qualify(&sequence.name);
        self.sequences.push(sequence);
        self
    }

    #[must_use]
    pub fn with_domain(mut self, mut domain: DomainDef) -> Self {
        domain.name = self.qualify(&domain.name);
        self.domains.push(domain);
        self
    }

    #[must_use]
    pub fn with_type(mut self, mut user_type: UserTypeDef) -> Self {
        user_type.name = self.qualify(&user_type.name);
        self.types.push(user_type);
        self
    }

    #[must_use]
    pub fn with_routine(mut self, mut routine: RoutineDef) -> Self {
        routine.name = self.qualify(&routine.name);
        self.routines.push(routine);
        self
    }

    #[must_use]
    pub fn with_index(mut self, mut index: IndexDef) -> Self {
        index.name = self.qualify(&index.name);
        index.table = self.qualify(&index.table);
        self.indexes.push(index);
        self
    }

    #[must_use]
    pub fn with_user(mut self, name: impl Into<String>) -> Self {
        self.users.push(name.into());
        self
    }

    #[must_use]
    pub fn with_role(mut self, name: impl Into<String>) -> Self {
        self.roles.push(name.into());
        self
    }

    #[must_use]
    pub fn with_object(mut self, kind: ObjectKind, name: &QualifiedName) -> Self {
        let name = self.qualify(name);
        self.objects.push((kind, name));
        self
    }

    fn qualify(&self, name: &QualifiedName) -> QualifiedName {
        name.clone().with_default_schema(&self.default_schema)
    }

    fn find<'a, T>(
        &self,
        items: &'a [T],
        name: &QualifiedName,
        key: impl Fn(&T) -> &QualifiedName,
    ) -> Option<&'a T> {
        let wanted = self.qualify(name);
        items.iter().find(|item| key(item) == &wanted)
    }
}

impl Catalog for MemoryCatalog {
    fn schema_exists(&self, name: &str) -> bool {
        self.schemas.iter().any(|s| s == name)
    }

    fn table(&self, name: &QualifiedName) -> Option<&TableDef> {
        self.find(&self.tables, name, |t| &t.name)
    }

    fn sequence(&self, name: &QualifiedName) -> Option<&SequenceDef> {
        self.find(&self.sequences, name, |s| &s.name)
    }

    fn domain(&self, name: &QualifiedName) -> Option<&DomainDef> {
        self.find(&self.domains, name, |d| &d.name)
    }

    fn user_type(&self, name: &QualifiedName) -> Option<&UserTypeDef> {
        self.find(&self.types, name, |t| &t.name)
    }

    fn routine(&self, name: &QualifiedName) -> Option<&RoutineDef> {
        self.find(&self.routines, name, |r| &r.name)
    }

    fn index(&self, name: &QualifiedName) -> Option<&IndexDef> {
        self.find(&self.indexes, name, |i| &i.name)
    }

    fn user_exists(&self, name: &str) -> bool {
        self.users.iter().any(|u| u == name)
    }

    fn role_exists(&self, name: &str) -> bool {
        self.roles.iter().any(|r| r == name)
    }

    fn other_object_exists(&self, kind: ObjectKind, name: &QualifiedName) -> bool {
        let wanted = self.qualify(name);
        self.objects.iter().any(|(k, n)| *k == kind && *n == wanted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::DataType;

    #[test]
    fn unqualified_names_use_default_schema() {
        let catalog = MemoryCatalog::new().with_table(
            TableDef::new(QualifiedName::bare("T"))
                .column("ID", DataType::Integer)
                .primary_key(&["ID"]),
        );
        assert!(catalog.table(&QualifiedName::bare("T")).is_some());
        assert!(catalog.table(&QualifiedName::new("PUBLIC", "T")).is_some());
        assert!(catalog.table(&QualifiedName::new("OTHER", "T")).is_none());
        assert!(!catalog.table(&QualifiedName::bare("T")).unwrap().columns[0].nullable);
    }

    #[test]
    fn object_exists_distinguishes_views() {
        let catalog = MemoryCatalog::new()
            .with_table(TableDef::new(QualifiedName::bare("V")).as_view())
            .with_object(ObjectKind::Trigger, &QualifiedName::bare("TRG"));
        let v = QualifiedName::bare("V");
        assert!(catalog.object_exists(ObjectKind::View, &v));
        assert!(!catalog.object_exists(ObjectKind::Table, &v));
        assert!(catalog.object_exists(ObjectKind::Trigger, &QualifiedName::bare("TRG")));
    }

    #[test]
    fn loads_from_json() {
        let json = r#"{
            "default_schema": "PUBLIC",
            "schemas": ["PUBLIC"],
            "tables": [{
                "name": { "schema": "PUBLIC", "name": "T" },
                "columns": [{ "name": "A", "data_type": "INTEGER" }]
            }]
        }"#;
        let catalog: MemoryCatalog = serde_json::from_str(json).unwrap();
        let table = catalog.table(&QualifiedName::bare("T")).unwrap();
        assert!(table.columns[0].nullable);
    }
}
