//! Entity model: static declarations, derived descriptors, type mapping, and the registry.

pub mod decl;
pub mod descriptor;
pub mod registry;
pub mod types;

pub use decl::{ColumnDecl, ColumnDefault, EntityDecl, RelationDecl};
pub use descriptor::{ColumnDescriptor, ColumnKind, TableDescriptor};
pub use registry::{discover_tables, Registry, TableRef};
pub use types::{lookup as lookup_type, DeclaredType, TypeMapping, ValueKind};
