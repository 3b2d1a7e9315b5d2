//! Swagger 2.0 document model. Serialized as-is by `GET /swagger.json`.

use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct Schema {
    #[serde(rename = "$ref", skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub type_: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub items: Option<Box<Schema>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub properties: Option<BTreeMap<String, Schema>>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub required: Vec<String>,
}

impl Schema {
    pub fn reference(definition: &str) -> Self {
        Schema {
            reference: Some(format!("#/definitions/{}", definition)),
            ..Default::default()
        }
    }

    pub fn array(items: Schema) -> Self {
        Schema {
            type_: Some("array".into()),
            items: Some(Box::new(items)),
            ..Default::default()
        }
    }

    pub fn object() -> Self {
        Schema {
            type_: Some("object".into()),
            properties: Some(BTreeMap::new()),
            ..Default::default()
        }
    }

    pub fn primitive(json_type: &str, format: Option<&str>) -> Self {
        Schema {
            type_: Some(json_type.into()),
            format: format.map(str::to_string),
            ..Default::default()
        }
    }

    pub fn with_description(mut self, description: Option<&str>) -> Self {
        self.description = description.map(str::to_string);
        self
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ParameterLocation {
    Query,
    Path,
    Body,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Parameter {
    pub name: String,
    #[serde(rename = "in")]
    pub location: ParameterLocation,
    pub description: String,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub required: bool,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub type_: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema: Option<Schema>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ResponseSpec {
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema: Option<Schema>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Operation {
    pub summary: String,
    pub tags: Vec<String>,
    pub parameters: Vec<Parameter>,
    pub responses: BTreeMap<String, ResponseSpec>,
}

/// Operations keyed by lowercase HTTP method.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct PathItem {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(flatten)]
    pub operations: BTreeMap<String, Operation>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Tag {
    pub name: String,
    pub description: String,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct Info {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SwaggerDocument {
    pub swagger: String,
    pub info: Info,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    pub tags: Vec<Tag>,
    pub schemes: Vec<String>,
    #[serde(rename = "basePath")]
    pub base_path: String,
    pub consumes: Vec<String>,
    pub produces: Vec<String>,
    pub paths: BTreeMap<String, PathItem>,
    pub definitions: BTreeMap<String, Schema>,
}

impl SwaggerDocument {
    pub fn new(info: Info) -> Self {
        SwaggerDocument {
            swagger: "2.0".into(),
            info,
            host: None,
            tags: Vec::new(),
            schemes: vec!["http".into(), "https".into()],
            base_path: "/".into(),
            consumes: vec!["application/json".into()],
            produces: vec!["application/json".into()],
            paths: BTreeMap::new(),
            definitions: BTreeMap::new(),
        }
    }

    /// Copy of the sealed document with `host` resolved for one request.
    pub fn with_host(&self, host: Option<String>) -> Self {
        let mut doc = self.clone();
        doc.host = host;
        doc
    }

    pub fn tag_names(&self) -> Vec<&str> {
        self.tags.iter().map(|t| t.name.as_str()).collect()
    }
}
