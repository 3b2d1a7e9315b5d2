//! Prometheus API: declaration-driven CRUD REST backend with generated Swagger 2.0 docs.

pub mod app;
pub mod case;
pub mod config;
pub mod docs;
pub mod error;
pub mod handlers;
pub mod migration;
pub mod model;
pub mod models;
pub mod response;
pub mod routes;
pub mod seed;
pub mod service;
pub mod sql;
pub mod state;
pub mod store;

pub use app::{build_router, init, App};
pub use config::{ApiConfig, Mode, Settings};
pub use docs::SwaggerDocument;
pub use error::{AppError, ConfigError};
pub use model::{discover_tables, Registry, TableRef};
pub use response::{Encodable, Record};
pub use routes::{build_api, Api, ApiBuilder};
pub use service::CrudService;
pub use state::AppState;
