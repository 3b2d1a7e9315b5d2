//! Table endpoints: docs and routes are registered together and sealed into an `Api`.

use crate::config::ApiConfig;
use crate::docs::{Info, SwaggerBuilder, SwaggerDocument};
use crate::error::{AppError, ConfigError};
use crate::handlers::entity;
use crate::model::{Registry, TableRef};
use crate::routes::plan::{Endpoint, TableRoutes};
use crate::state::AppState;
use axum::{
    http::Method,
    routing::{MethodFilter, MethodRouter},
    Extension, Router,
};
use std::collections::BTreeSet;
use std::sync::Arc;

pub struct ApiBuilder {
    config: ApiConfig,
    swagger: SwaggerBuilder,
    tables: Vec<(TableRef, TableRoutes)>,
}

impl ApiBuilder {
    pub fn new(info: Info, config: ApiConfig) -> Self {
        let swagger = SwaggerBuilder::new(info, &config.exclude_columns);
        ApiBuilder {
            config,
            swagger,
            tables: Vec::new(),
        }
    }

    /// Plan the table's routes and build its definitions; commit both only if every step
    /// succeeds.
    pub fn register(&mut self, table: TableRef) -> Result<(), ConfigError> {
        if self.tables.iter().any(|(t, _)| t.table_name == table.table_name) {
            return Err(ConfigError::DuplicateTable(table.table_name.clone()));
        }
        let plan = TableRoutes::plan(&table, &self.config);
        let staged = self.swagger.stage(&table, &plan)?;
        self.swagger.commit(staged);
        tracing::debug!(table = %table.table_name, paths = plan.routes.len(), "registered endpoints");
        self.tables.push((table, plan));
        Ok(())
    }

    pub fn register_all(&mut self, registry: &Registry) -> Result<(), ConfigError> {
        for table in registry.tables() {
            self.register(table.clone())?;
        }
        Ok(())
    }

    pub fn documented_paths(&self) -> BTreeSet<String> {
        self.swagger.document().paths.keys().cloned().collect()
    }

    pub fn planned_paths(&self) -> BTreeSet<String> {
        self.tables
            .iter()
            .flat_map(|(_, plan)| plan.paths().map(str::to_string))
            .collect()
    }

    pub fn seal(self) -> Api {
        Api {
            docs: Arc::new(self.swagger.seal()),
            tables: self.tables,
        }
    }
}

/// Sealed API: the immutable document plus the route plans it describes.
pub struct Api {
    pub docs: Arc<SwaggerDocument>,
    tables: Vec<(TableRef, TableRoutes)>,
}

impl Api {
    pub fn documented_paths(&self) -> BTreeSet<String> {
        self.docs.paths.keys().cloned().collect()
    }

    pub fn bound_paths(&self) -> BTreeSet<String> {
        self.tables
            .iter()
            .flat_map(|(_, plan)| plan.paths().map(str::to_string))
            .collect()
    }

    /// Bind exactly the planned routes. Each path gets its table as an `Extension`.
    pub fn router(&self) -> Router<AppState> {
        let mut router = Router::new();
        for (table, plan) in &self.tables {
            for route in &plan.routes {
                let mut methods: MethodRouter<AppState> = MethodRouter::new();
                for (method, endpoint) in &route.operations {
                    methods = bind(methods, method, *endpoint);
                }
                let methods = methods
                    .fallback(method_not_allowed)
                    .layer(Extension(table.clone()));
                router = router.route(&route.axum_path(), methods);
            }
        }
        router
    }
}

fn bind(methods: MethodRouter<AppState>, method: &Method, endpoint: Endpoint) -> MethodRouter<AppState> {
    let Ok(filter) = MethodFilter::try_from(method.clone()) else {
        return methods;
    };
    match endpoint {
        Endpoint::List => methods.on(filter, entity::list),
        Endpoint::Create => methods.on(filter, entity::create),
        Endpoint::PatchMany => methods.on(filter, entity::patch_many),
        Endpoint::Read => methods.on(filter, entity::read),
        Endpoint::Update => methods.on(filter, entity::update),
        Endpoint::Delete => methods.on(filter, entity::delete),
        Endpoint::Evaluate => methods.on(filter, entity::evaluate),
    }
}

async fn method_not_allowed(method: Method) -> AppError {
    AppError::MethodNotAllowed(method.to_string())
}

/// Register every table of `registry` and seal.
pub fn build_api(registry: &Registry, config: &ApiConfig) -> Result<Api, ConfigError> {
    let info = Info {
        title: Some("Prometheus API".into()),
        version: Some(env!("CARGO_PKG_VERSION").into()),
        description: Some("Portfolio tracking REST API".into()),
    };
    let mut builder = ApiBuilder::new(info, config.clone());
    builder.register_all(registry)?;
    Ok(builder.seal())
}
