//! Operational handlers: landing info, table reset, seed keys and datasets, swagger document.

use crate::error::AppError;
use crate::migration;
use crate::response::envelope_json;
use crate::seed;
use crate::state::AppState;
use axum::{
    extract::State,
    http::{header, HeaderMap, StatusCode},
    response::Response,
};
use serde::Serialize;
use serde_json::json;

#[derive(Serialize)]
struct TableKeys<'a> {
    table: &'a str,
    columns: Vec<&'a str>,
}

pub async fn index(State(state): State<AppState>) -> Result<Response, AppError> {
    envelope_json(
        StatusCode::OK,
        &json!({
            "message": "Welcome to the Prometheus API!",
            "name": env!("CARGO_PKG_NAME"),
            "version": env!("CARGO_PKG_VERSION"),
            "swagger": state.api.swagger_json_path(),
            "tables": state.registry.table_names(),
        }),
    )
}

pub async fn reset(State(state): State<AppState>) -> Result<Response, AppError> {
    migration::reset_all(&state.pool, &state.registry).await?;
    tracing::info!("database reset");
    envelope_json(StatusCode::OK, &json!({"message": "Database reset!"}))
}

pub async fn keys(State(state): State<AppState>) -> Result<Response, AppError> {
    let keys: Vec<TableKeys> = state
        .registry
        .tables()
        .iter()
        .map(|t| TableKeys {
            table: &t.table_name,
            columns: t.seed_column_names(),
        })
        .collect();
    envelope_json(StatusCode::OK, &keys)
}

pub async fn init_values(State(state): State<AppState>) -> Result<Response, AppError> {
    let pieces = seed::process(&seed::init_values(), &state.registry)?;
    envelope_json(StatusCode::OK, &pieces)
}

pub async fn pop_values(State(state): State<AppState>) -> Result<Response, AppError> {
    let pieces = seed::process(&seed::pop_values(), &state.registry)?;
    envelope_json(StatusCode::OK, &pieces)
}

/// Sealed document with `host` taken from the request.
pub async fn swagger(State(state): State<AppState>, headers: HeaderMap) -> Result<Response, AppError> {
    let host = headers
        .get(header::HOST)
        .and_then(|h| h.to_str().ok())
        .map(str::to_string);
    envelope_json(StatusCode::OK, &state.docs.with_host(host))
}
