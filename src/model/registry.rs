//! Ordered, validated collection of table descriptors built from the explicit registration list.

use crate::error::ConfigError;
use crate::model::decl::EntityDecl;
use crate::model::descriptor::{ColumnKind, TableDescriptor};
use std::collections::HashMap;
use std::sync::Arc;

pub type TableRef = Arc<TableDescriptor>;

#[derive(Clone, Debug)]
pub struct Registry {
    tables: Vec<TableRef>,
    by_name: HashMap<String, usize>,
}

impl Registry {
    /// Build descriptors in declaration order. Seed loading and DDL rely on this order
    /// (lookup tables first), so it is never re-sorted.
    pub fn from_decls(decls: &[&EntityDecl]) -> Result<Self, ConfigError> {
        let mut tables = Vec::with_capacity(decls.len());
        let mut by_name = HashMap::new();
        for decl in decls {
            let table = TableDescriptor::from_decl(decl);
            validate_primary(&table)?;
            if by_name.insert(table.table_name.clone(), tables.len()).is_some() {
                return Err(ConfigError::DuplicateTable(table.table_name));
            }
            tracing::debug!(table = %table.table_name, columns = table.columns().len(), "registered table");
            tables.push(Arc::new(table));
        }
        let registry = Registry { tables, by_name };
        registry.validate_relations()?;
        Ok(registry)
    }

    pub fn tables(&self) -> &[TableRef] {
        &self.tables
    }

    pub fn get(&self, table_name: &str) -> Option<&TableRef> {
        self.by_name.get(table_name).map(|i| &self.tables[*i])
    }

    pub fn table_names(&self) -> Vec<&str> {
        self.tables.iter().map(|t| t.table_name.as_str()).collect()
    }

    fn validate_relations(&self) -> Result<(), ConfigError> {
        for table in &self.tables {
            for rel in table.relationships() {
                let target_name = rel.related_table.clone().unwrap_or_default();
                let target = self.get(&target_name).ok_or_else(|| ConfigError::UnknownRelation {
                    table: table.table_name.clone(),
                    relation: rel.name.clone(),
                    target: target_name.clone(),
                })?;
                if rel.is_to_many() {
                    let has_key = rel
                        .remote_key
                        .as_deref()
                        .and_then(|k| target.column(k))
                        .map(|c| c.is_stored())
                        .unwrap_or(false);
                    if !has_key {
                        return Err(ConfigError::MissingRemoteKey {
                            table: table.table_name.clone(),
                            relation: rel.name.clone(),
                            target: target_name,
                        });
                    }
                }
            }
        }
        Ok(())
    }
}

fn validate_primary(table: &TableDescriptor) -> Result<(), ConfigError> {
    let primaries: Vec<_> = table.primary_columns().collect();
    match primaries.as_slice() {
        [only] if only.name == "id" && only.kind == ColumnKind::Primary => Ok(()),
        _ => Err(ConfigError::MissingPrimaryKey(table.table_name.clone())),
    }
}

/// Collect every registered entity, in registration order.
pub fn discover_tables() -> Result<Registry, ConfigError> {
    Registry::from_decls(crate::models::ALL)
}
