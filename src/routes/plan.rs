//! Route plan for one table: which paths exist and which endpoint each method reaches.
//! Both the router and the swagger paths are derived from the same plan.

use crate::config::ApiConfig;
use crate::model::TableDescriptor;
use axum::http::Method;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Endpoint {
    List,
    Create,
    PatchMany,
    Read,
    Update,
    Delete,
    Evaluate,
}

#[derive(Clone, Debug, PartialEq)]
pub struct RouteSpec {
    /// Documented form, e.g. `/commodity/{commodity_id}`.
    pub path: String,
    /// Name of the path parameter, for item routes.
    pub param: Option<String>,
    pub operations: Vec<(Method, Endpoint)>,
}

impl RouteSpec {
    fn new(path: String, param: Option<String>) -> Self {
        RouteSpec {
            path,
            param,
            operations: Vec::new(),
        }
    }

    fn push(&mut self, config: &ApiConfig, method: Method, endpoint: Endpoint) {
        if config.allows(&method) {
            self.operations.push((method, endpoint));
        }
    }

    pub fn is_collection(&self) -> bool {
        self.param.is_none()
            && self
                .operations
                .iter()
                .any(|(_, e)| matches!(e, Endpoint::List | Endpoint::Create | Endpoint::PatchMany))
    }

    /// Path in axum's `:param` syntax.
    pub fn axum_path(&self) -> String {
        match &self.param {
            Some(p) => self.path.replace(&format!("{{{}}}", p), &format!(":{}", p)),
            None => self.path.clone(),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct TableRoutes {
    pub table_name: String,
    pub routes: Vec<RouteSpec>,
}

impl TableRoutes {
    pub fn plan(table: &TableDescriptor, config: &ApiConfig) -> Self {
        let name = &table.table_name;
        let prefix = config.url_prefix.as_str();

        let mut collection = RouteSpec::new(format!("{}/{}", prefix, name), None);
        collection.push(config, Method::GET, Endpoint::List);
        collection.push(config, Method::POST, Endpoint::Create);
        if config.allow_patch_many {
            collection.push(config, Method::PATCH, Endpoint::PatchMany);
            collection.push(config, Method::PUT, Endpoint::PatchMany);
        }

        let param = format!("{}_id", name);
        let mut item = RouteSpec::new(format!("{}/{}/{{{}}}", prefix, name, param), Some(param));
        item.push(config, Method::GET, Endpoint::Read);
        item.push(config, Method::PATCH, Endpoint::Update);
        item.push(config, Method::PUT, Endpoint::Update);
        item.push(config, Method::DELETE, Endpoint::Delete);

        let mut eval = RouteSpec::new(format!("{}/eval/{}", prefix, name), None);
        if config.allow_functions {
            eval.push(config, Method::GET, Endpoint::Evaluate);
        }

        TableRoutes {
            table_name: name.clone(),
            routes: [collection, item, eval]
                .into_iter()
                .filter(|r| !r.operations.is_empty())
                .collect(),
        }
    }

    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.routes.iter().map(|r| r.path.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::discover_tables;

    #[test]
    fn default_plan() {
        let registry = discover_tables().unwrap();
        let plan = TableRoutes::plan(registry.get("price").unwrap(), &ApiConfig::default());
        let paths: Vec<&str> = plan.paths().collect();
        assert_eq!(paths, vec!["/price", "/price/{price_id}", "/eval/price"]);
        assert_eq!(plan.routes[1].axum_path(), "/price/:price_id");
        assert_eq!(plan.routes[0].operations.len(), 4);
        assert!(plan.routes[0].is_collection());
        assert!(!plan.routes[2].is_collection());
    }

    #[test]
    fn plan_respects_config() {
        let registry = discover_tables().unwrap();
        let config = ApiConfig {
            methods: vec![Method::GET],
            allow_functions: false,
            url_prefix: "/api".into(),
            ..ApiConfig::default()
        };
        let plan = TableRoutes::plan(registry.get("price").unwrap(), &config);
        let paths: Vec<&str> = plan.paths().collect();
        assert_eq!(paths, vec!["/api/price", "/api/price/{price_id}"]);
        assert_eq!(plan.routes[0].operations, vec![(Method::GET, Endpoint::List)]);
        assert_eq!(plan.routes[1].operations, vec![(Method::GET, Endpoint::Read)]);
    }
}
