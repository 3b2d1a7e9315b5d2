//! Startup: discover tables, connect, register endpoints, seal docs, build the router.

use crate::config::Settings;
use crate::error::AppError;
use crate::model::{discover_tables, Registry};
use crate::routes::{build_api, common_routes, Api};
use crate::state::AppState;
use crate::store;
use axum::{extract::DefaultBodyLimit, http::Uri, Router};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

pub const BODY_LIMIT_BYTES: usize = 2 * 1024 * 1024;

/// Everything needed to serve: the sealed API plus live state.
pub struct App {
    pub state: AppState,
    pub api: Api,
}

impl App {
    pub fn router(&self) -> Router {
        build_router(self.state.clone(), &self.api)
    }
}

/// Runs discovery, connects the pool and seals the API. Tables are not created here.
pub async fn init(settings: &Settings) -> Result<App, AppError> {
    init_with(settings, discover_tables()?).await
}

/// Same as [`init`] but against an explicit registry, for callers that declare their own tables.
pub async fn init_with(settings: &Settings, registry: Registry) -> Result<App, AppError> {
    let api = build_api(&registry, &settings.api)?;
    let pool = store::connect(&settings.database_url).await?;
    tracing::info!(
        mode = ?settings.mode,
        tables = registry.tables().len(),
        paths = api.bound_paths().len(),
        "api initialised"
    );
    let state = AppState {
        pool,
        registry: Arc::new(registry),
        docs: api.docs.clone(),
        api: Arc::new(settings.api.clone()),
    };
    Ok(App { state, api })
}

pub fn build_router(state: AppState, api: &Api) -> Router {
    let common = common_routes(&state.api);
    common
        .merge(api.router())
        .fallback(not_found)
        .layer(DefaultBodyLimit::max(BODY_LIMIT_BYTES))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn not_found(uri: Uri) -> AppError {
    AppError::NotFound(format!("no route for {}", uri.path()))
}
