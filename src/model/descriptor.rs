//! Table and column descriptors derived from entity declarations.

use crate::case::to_snake_case;
use crate::model::decl::{ColumnDefault, EntityDecl};
use crate::model::types::{self, DeclaredType, TypeMapping};
use std::collections::HashSet;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ColumnKind {
    Primary,
    Plain,
    Relationship,
}

#[derive(Clone, Debug)]
pub struct ColumnDescriptor {
    pub name: String,
    pub kind: ColumnKind,
    /// Raw backend type (e.g. "VARCHAR(64)"); None for relationships.
    pub declared_type: Option<String>,
    pub is_required: bool,
    pub related_table: Option<String>,
    pub is_collection: Option<bool>,
    /// FK column on the related table (to-many relationships).
    pub remote_key: Option<String>,
    pub nullable: bool,
    pub unique: bool,
    pub default: Option<ColumnDefault>,
    pub computed: Option<String>,
    pub touch_on_update: bool,
    pub doc: Option<String>,
}

impl ColumnDescriptor {
    pub fn is_relationship(&self) -> bool {
        self.kind == ColumnKind::Relationship
    }

    pub fn is_primary(&self) -> bool {
        self.kind == ColumnKind::Primary
    }

    pub fn is_computed(&self) -> bool {
        self.computed.is_some()
    }

    /// Stored scalar column: has a physical column in the table.
    pub fn is_stored(&self) -> bool {
        !self.is_relationship() && !self.is_computed()
    }

    pub fn type_mapping(&self) -> Option<&'static TypeMapping> {
        self.declared_type.as_deref().and_then(types::lookup)
    }

    pub fn is_decimal(&self) -> bool {
        self.type_mapping().map(|m| m.kind) == Some(types::ValueKind::Decimal)
    }

    /// Column type used in DDL. Decimals get TEXT affinity; NUMERIC affinity would round
    /// long values through REAL.
    pub fn storage_type(&self) -> &str {
        if self.is_decimal() {
            return "TEXT";
        }
        self.declared_type.as_deref().unwrap_or("TEXT")
    }

    pub fn max_length(&self) -> Option<usize> {
        self.declared_type
            .as_deref()
            .and_then(|t| DeclaredType::parse(t).max_length())
    }

    pub fn is_to_one(&self) -> bool {
        self.is_relationship() && self.is_collection == Some(false)
    }

    pub fn is_to_many(&self) -> bool {
        self.is_relationship() && self.is_collection == Some(true)
    }

    /// Scalar column that carries a to-one relationship's key.
    pub fn sibling_key(&self) -> String {
        format!("{}_id", self.name)
    }
}

#[derive(Clone, Debug)]
pub struct TableDescriptor {
    pub table_name: String,
    pub entity_name: String,
    pub doc_string: Option<String>,
    columns: Vec<ColumnDescriptor>,
}

impl TableDescriptor {
    /// Collect own then inherited columns (first declaration of a name wins) and classify
    /// relationships by the presence of a sibling `<name>_id` column.
    pub fn from_decl(decl: &EntityDecl) -> Self {
        let mut columns = Vec::new();
        let mut seen = HashSet::new();
        collect_chain(decl, &mut columns, &mut seen);

        let scalar_names: HashSet<String> = columns
            .iter()
            .filter(|c: &&ColumnDescriptor| !c.is_relationship())
            .map(|c| c.name.clone())
            .collect();
        for col in columns.iter_mut().filter(|c| c.is_relationship()) {
            let to_many = !scalar_names.contains(&col.sibling_key());
            col.is_collection = Some(to_many);
            col.is_required = !to_many;
            if !to_many {
                col.remote_key = None;
            }
        }

        TableDescriptor {
            table_name: to_snake_case(decl.entity_name),
            entity_name: decl.entity_name.to_string(),
            doc_string: decl.doc.map(str::to_string),
            columns,
        }
    }

    /// All columns in declaration order.
    pub fn columns(&self) -> &[ColumnDescriptor] {
        &self.columns
    }

    pub fn columns_of(&self, include_relationships: bool) -> Vec<&ColumnDescriptor> {
        self.columns
            .iter()
            .filter(|c| include_relationships || !c.is_relationship())
            .collect()
    }

    /// Columns sorted by name; used wherever document output must be deterministic.
    pub fn sorted_columns_of(&self, include_relationships: bool) -> Vec<&ColumnDescriptor> {
        let mut cols = self.columns_of(include_relationships);
        cols.sort_by(|a, b| a.name.cmp(&b.name));
        cols
    }

    pub fn column(&self, name: &str) -> Option<&ColumnDescriptor> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn primary_columns(&self) -> impl Iterator<Item = &ColumnDescriptor> {
        self.columns.iter().filter(|c| c.is_primary())
    }

    pub fn relationships(&self) -> impl Iterator<Item = &ColumnDescriptor> {
        self.columns.iter().filter(|c| c.is_relationship())
    }

    pub fn stored_columns(&self) -> impl Iterator<Item = &ColumnDescriptor> {
        self.columns.iter().filter(|c| c.is_stored())
    }

    /// Readable scalar columns: stored plus computed.
    pub fn scalar_columns(&self) -> impl Iterator<Item = &ColumnDescriptor> {
        self.columns.iter().filter(|c| !c.is_relationship())
    }

    /// Positional column order for seed rows: sorted writable names without id or utc* stamps.
    pub fn seed_column_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self
            .stored_columns()
            .map(|c| c.name.as_str())
            .filter(|n| !(n.starts_with("utc") || *n == "id"))
            .collect();
        names.sort_unstable();
        names
    }

    /// Related table referenced by a stored FK column, if the column backs a to-one relation.
    pub fn foreign_key(&self, column: &str) -> Option<&str> {
        self.relationships()
            .find(|r| r.is_to_one() && r.sibling_key() == column)
            .and_then(|r| r.related_table.as_deref())
    }
}

fn collect_chain(decl: &EntityDecl, out: &mut Vec<ColumnDescriptor>, seen: &mut HashSet<&'static str>) {
    for c in decl.columns {
        if !seen.insert(c.name) {
            continue;
        }
        let kind = if c.primary { ColumnKind::Primary } else { ColumnKind::Plain };
        let optional = c.nullable || c.default.is_some() || c.computed.is_some();
        out.push(ColumnDescriptor {
            name: c.name.to_string(),
            kind,
            declared_type: Some(c.declared_type.to_string()),
            is_required: kind == ColumnKind::Plain && !optional,
            related_table: None,
            is_collection: None,
            remote_key: None,
            nullable: c.nullable,
            unique: c.unique,
            default: c.default,
            computed: c.computed.map(str::to_string),
            touch_on_update: c.touch_on_update,
            doc: c.doc.map(str::to_string),
        });
    }
    for r in decl.relations {
        if !seen.insert(r.name) {
            continue;
        }
        out.push(ColumnDescriptor {
            name: r.name.to_string(),
            kind: ColumnKind::Relationship,
            declared_type: None,
            is_required: false,
            related_table: Some(to_snake_case(r.target)),
            is_collection: None,
            remote_key: r.remote_key.map(str::to_string),
            nullable: true,
            unique: false,
            default: None,
            computed: None,
            touch_on_update: false,
            doc: r.doc.map(str::to_string),
        });
    }
    for base in decl.bases {
        collect_chain(base, out, seen);
    }
}
