//! Shared application state for all routes. Everything behind an `Arc` is sealed at startup.

use crate::config::ApiConfig;
use crate::docs::SwaggerDocument;
use crate::model::Registry;
use sqlx::sqlite::SqlitePool;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub pool: SqlitePool,
    pub registry: Arc<Registry>,
    pub docs: Arc<SwaggerDocument>,
    pub api: Arc<ApiConfig>,
}
