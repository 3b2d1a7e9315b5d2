//! Operational routes: landing info, reset, seed keys and datasets, swagger.json.

use crate::config::ApiConfig;
use crate::handlers::site;
use crate::state::AppState;
use axum::{routing::get, Router};

/// GET /, /reset/, /keys/, /init_values/, /pop_values/ and `{swagger_url}/swagger.json`.
pub fn common_routes(api: &ApiConfig) -> Router<AppState> {
    Router::new()
        .route("/", get(site::index))
        .route("/reset/", get(site::reset))
        .route("/keys/", get(site::keys))
        .route("/init_values/", get(site::init_values))
        .route("/pop_values/", get(site::pop_values))
        .route(&api.swagger_json_path(), get(site::swagger))
}
