//! Swagger document model and synthesis.

mod builder;
pub mod document;

pub use builder::{build_definition, build_paths, StagedDocs, SwaggerBuilder};
pub use document::{Info, Operation, Parameter, ParameterLocation, PathItem, ResponseSpec, Schema, SwaggerDocument, Tag};
