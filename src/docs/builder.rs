//! Swagger synthesis from table descriptors and route plans.
//!
//! `SwaggerBuilder` is only mutated while the API is being assembled; `seal` hands back the
//! immutable document served at request time. Staging and committing are split so the caller
//! can commit docs and routes for a table in the same step.

use crate::case::plural;
use crate::docs::document::{
    Info, Operation, Parameter, ParameterLocation, PathItem, ResponseSpec, Schema, SwaggerDocument, Tag,
};
use crate::error::ConfigError;
use crate::model::{types, TableDescriptor};
use crate::routes::plan::{Endpoint, RouteSpec, TableRoutes};
use std::collections::{BTreeMap, HashSet};

/// Object schema for one table. The flat variant is the writable payload shape: no id,
/// relationships or computed columns, plus a `required` list.
pub fn build_definition(
    table: &TableDescriptor,
    flat: bool,
    exclude_columns: &HashSet<String>,
) -> Result<Schema, ConfigError> {
    let mut properties = BTreeMap::new();
    let mut required = Vec::new();

    for col in table.sorted_columns_of(true) {
        if exclude_columns.contains(&col.name) {
            continue;
        }
        if flat && (col.is_primary() || col.is_relationship() || col.is_computed()) {
            continue;
        }
        let defn = if col.is_relationship() {
            let related = Schema::reference(col.related_table.as_deref().unwrap_or_default());
            if col.is_to_many() {
                Schema::array(related)
            } else {
                related
            }
        } else {
            let declared = col.declared_type.as_deref().unwrap_or_default();
            let mapping = types::lookup(declared).ok_or_else(|| ConfigError::UnmappedType {
                table: table.table_name.clone(),
                column: col.name.clone(),
                declared_type: declared.to_string(),
            })?;
            Schema::primitive(mapping.json_type, mapping.format)
        };
        if flat && col.is_required {
            required.push(col.name.clone());
        }
        properties.insert(col.name.clone(), defn.with_description(col.doc.as_deref()));
    }

    let mut schema = Schema::object();
    schema.properties = Some(properties);
    schema.required = required;
    Ok(schema)
}

/// Path items for every planned route of a table, keyed by documented path.
pub fn build_paths(table: &TableDescriptor, routes: &TableRoutes) -> Vec<(String, PathItem)> {
    routes
        .routes
        .iter()
        .map(|route| {
            let mut item = PathItem::default();
            if route.is_collection() {
                item.description = table.doc_string.clone();
            }
            for (method, endpoint) in &route.operations {
                item.operations
                    .insert(method.as_str().to_lowercase(), operation(table, route, *endpoint));
            }
            (route.path.clone(), item)
        })
        .collect()
}

fn operation(table: &TableDescriptor, route: &RouteSpec, endpoint: Endpoint) -> Operation {
    let name = table.table_name.as_str();
    let entity = table.entity_name.as_str();
    let (summary, parameters, status, response) = match endpoint {
        Endpoint::List => (
            format!("list all {}", plural(entity)),
            vec![query_param(), page_param(), per_page_param()],
            "200",
            ResponseSpec {
                description: format!("{} list", entity),
                schema: Some(Schema::array(Schema::reference(name))),
            },
        ),
        Endpoint::Create => (
            format!("create a new {}", entity),
            vec![body_param(format!("{} object to create", entity), name, true)],
            "201",
            ResponseSpec {
                description: format!("new {} created", entity),
                schema: Some(Schema::reference(name)),
            },
        ),
        Endpoint::PatchMany => (
            format!("update all matching {}", plural(entity)),
            vec![query_param(), body_param(format!("{} fields to set", entity), name, true)],
            "200",
            ResponseSpec {
                description: format!("number of {} updated", plural(entity)),
                schema: Some(count_schema("num_modified")),
            },
        ),
        Endpoint::Read => (
            format!("get {} by ID", entity),
            vec![id_param(route, format!("{} id", entity))],
            "200",
            ResponseSpec {
                description: "Success".into(),
                schema: Some(Schema::reference(name)),
            },
        ),
        Endpoint::Update => (
            format!("update {} by ID", entity),
            vec![
                id_param(route, format!("{} id to update", entity)),
                body_param(format!("{} fields to update", entity), name, false),
            ],
            "202",
            ResponseSpec {
                description: format!("{} updated", entity),
                schema: None,
            },
        ),
        Endpoint::Delete => (
            format!("delete {} by ID", entity),
            vec![id_param(route, format!("{} id to delete", entity))],
            "204",
            ResponseSpec {
                description: format!("{} deleted", entity),
                schema: None,
            },
        ),
        Endpoint::Evaluate => (
            format!("evaluate functions on {}", plural(entity)),
            vec![query_param()],
            "200",
            ResponseSpec {
                description: "function results".into(),
                schema: Some(Schema::object()),
            },
        ),
    };
    Operation {
        summary,
        tags: vec![name.to_string()],
        parameters,
        responses: BTreeMap::from([(status.to_string(), response)]),
    }
}

fn query_param() -> Parameter {
    Parameter {
        name: "q".into(),
        location: ParameterLocation::Query,
        description: "query string".into(),
        required: false,
        type_: Some("string".into()),
        schema: None,
    }
}

fn page_param() -> Parameter {
    Parameter {
        name: "page".into(),
        location: ParameterLocation::Query,
        description: "page number, starting at 1".into(),
        required: false,
        type_: Some("integer".into()),
        schema: None,
    }
}

fn per_page_param() -> Parameter {
    Parameter {
        name: "results_per_page".into(),
        location: ParameterLocation::Query,
        description: "page size".into(),
        required: false,
        type_: Some("integer".into()),
        schema: None,
    }
}

fn id_param(route: &RouteSpec, description: String) -> Parameter {
    Parameter {
        name: route.param.clone().unwrap_or_else(|| "id".into()),
        location: ParameterLocation::Path,
        description,
        required: true,
        type_: Some("integer".into()),
        schema: None,
    }
}

fn body_param(description: String, table_name: &str, required: bool) -> Parameter {
    Parameter {
        name: "body".into(),
        location: ParameterLocation::Body,
        description,
        required,
        type_: None,
        schema: Some(Schema::reference(&format!("{}_flat", table_name))),
    }
}

fn count_schema(field: &str) -> Schema {
    let mut schema = Schema::object();
    schema.properties = Some(BTreeMap::from([(
        field.to_string(),
        Schema::primitive("integer", None),
    )]));
    schema
}

/// Everything one table contributes to the document, computed before anything is committed.
#[derive(Clone, Debug)]
pub struct StagedDocs {
    table_name: String,
    full: Schema,
    flat: Schema,
    paths: Vec<(String, PathItem)>,
    tag: Tag,
}

pub struct SwaggerBuilder {
    doc: SwaggerDocument,
    exclude_columns: HashSet<String>,
}

impl SwaggerBuilder {
    pub fn new(info: Info, exclude_columns: &[String]) -> Self {
        SwaggerBuilder {
            doc: SwaggerDocument::new(info),
            exclude_columns: exclude_columns.iter().cloned().collect(),
        }
    }

    pub(crate) fn stage(&self, table: &TableDescriptor, routes: &TableRoutes) -> Result<StagedDocs, ConfigError> {
        Ok(StagedDocs {
            table_name: table.table_name.clone(),
            full: build_definition(table, false, &self.exclude_columns)?,
            flat: build_definition(table, true, &self.exclude_columns)?,
            paths: build_paths(table, routes),
            tag: Tag {
                name: table.table_name.clone(),
                description: format!("{} operations", table.entity_name),
            },
        })
    }

    pub(crate) fn commit(&mut self, staged: StagedDocs) {
        let StagedDocs {
            table_name,
            full,
            flat,
            paths,
            tag,
        } = staged;
        self.doc.definitions.insert(format!("{}_flat", table_name), flat);
        self.doc.definitions.insert(table_name, full);
        for (path, item) in paths {
            self.doc.paths.insert(path, item);
        }
        if !self.doc.tags.iter().any(|t| t.name == tag.name) {
            self.doc.tags.push(tag);
        }
    }

    pub fn document(&self) -> &SwaggerDocument {
        &self.doc
    }

    pub fn seal(self) -> SwaggerDocument {
        self.doc
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ApiConfig;
    use crate::model::{discover_tables, ColumnDecl, EntityDecl, Registry};
    use serde_json::json;

    static GADGET: EntityDecl = EntityDecl {
        entity_name: "Gadget",
        doc: None,
        columns: &[
            ColumnDecl::new("id", "INTEGER").primary(),
            ColumnDecl::new("label", "VARCHAR(120)"),
            ColumnDecl::new("weight", "NUMERIC"),
        ],
        relations: &[],
        bases: &[],
    };

    static BROKEN: EntityDecl = EntityDecl {
        entity_name: "Broken",
        doc: None,
        columns: &[
            ColumnDecl::new("id", "INTEGER").primary(),
            ColumnDecl::new("shape", "GEOMETRY"),
        ],
        relations: &[],
        bases: &[],
    };

    fn no_exclusions() -> HashSet<String> {
        HashSet::new()
    }

    #[test]
    fn maps_declared_types() {
        let registry = Registry::from_decls(&[&GADGET]).unwrap();
        let table = registry.get("gadget").unwrap();
        let defn = serde_json::to_value(build_definition(table, false, &no_exclusions()).unwrap()).unwrap();
        assert_eq!(defn["properties"]["label"], json!({"type": "string"}));
        assert_eq!(defn["properties"]["weight"], json!({"type": "number", "format": "number"}));
        assert_eq!(defn["properties"]["id"], json!({"type": "integer"}));
    }

    #[test]
    fn unmapped_type_fails_fast() {
        let registry = Registry::from_decls(&[&BROKEN]).unwrap();
        let err = build_definition(registry.get("broken").unwrap(), false, &no_exclusions()).unwrap_err();
        assert!(matches!(err, ConfigError::UnmappedType { declared_type, .. } if declared_type == "GEOMETRY"));
    }

    #[test]
    fn relationships_wrap_by_cardinality() {
        let registry = discover_tables().unwrap();
        let commodity_type = registry.get("commodity_type").unwrap();
        let defn = serde_json::to_value(build_definition(commodity_type, false, &no_exclusions()).unwrap()).unwrap();
        assert_eq!(defn["properties"]["group"], json!({"$ref": "#/definitions/commodity_group"}));
        assert_eq!(
            defn["properties"]["commodities"],
            json!({"type": "array", "items": {"$ref": "#/definitions/commodity"}})
        );
    }

    #[test]
    fn flat_definition_is_the_writable_shape() {
        let registry = discover_tables().unwrap();
        let person = registry.get("person").unwrap();
        let exclude: HashSet<String> = ["utc_created".to_string(), "utc_updated".to_string()].into();
        let flat = build_definition(person, true, &exclude).unwrap();
        let props = flat.properties.unwrap();
        assert!(!props.contains_key("id"));
        assert!(!props.contains_key("currency"));
        assert!(!props.contains_key("accounts"));
        assert!(!props.contains_key("full_name"));
        assert!(!props.contains_key("utc_created"));
        assert!(props.contains_key("currency_id"));
        assert!(flat.required.contains(&"email".to_string()));
    }

    #[test]
    fn tags_are_not_duplicated() {
        let registry = discover_tables().unwrap();
        let table = registry.get("commodity").unwrap();
        let routes = TableRoutes::plan(table, &ApiConfig::default());
        let mut builder = SwaggerBuilder::new(Info::default(), &[]);
        let staged = builder.stage(table, &routes).unwrap();
        builder.commit(staged.clone());
        builder.commit(staged);
        assert_eq!(builder.document().tag_names(), vec!["commodity"]);
    }

    #[test]
    fn operations_follow_endpoints() {
        let registry = discover_tables().unwrap();
        let table = registry.get("commodity").unwrap();
        let routes = TableRoutes::plan(table, &ApiConfig::default());
        let paths: BTreeMap<String, PathItem> = build_paths(table, &routes).into_iter().collect();
        let collection = serde_json::to_value(&paths["/commodity"]).unwrap();
        let item = serde_json::to_value(&paths["/commodity/{commodity_id}"]).unwrap();

        assert_eq!(collection["description"], "Tradable asset or currency");
        assert_eq!(collection["get"]["parameters"][0]["name"], "q");
        assert_eq!(
            collection["get"]["responses"]["200"]["schema"]["items"]["$ref"],
            "#/definitions/commodity"
        );
        assert_eq!(
            collection["post"]["parameters"][0]["schema"]["$ref"],
            "#/definitions/commodity_flat"
        );
        assert!(collection["post"]["responses"]["201"].is_object());
        assert!(item["patch"]["responses"]["202"].is_object());
        assert!(item["delete"]["responses"]["204"].is_object());
        assert_eq!(item["get"]["parameters"][0]["name"], "commodity_id");
        assert_eq!(item["get"]["parameters"][0]["required"], true);
    }
}
