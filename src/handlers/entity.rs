//! Table handlers: list, read, create, update, patch-many, delete, eval.
//! Each route carries its table as an `Extension`.

use crate::error::AppError;
use crate::model::TableRef;
use crate::response::{envelope, no_content, Encodable, Record};
use crate::service::{CrudService, ListArgs, Listing, SearchParams};
use crate::state::AppState;
use axum::{
    body::Bytes,
    extract::{
        rejection::{BytesRejection, PathRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    response::Response,
    Extension,
};
use serde_json::Value;
use std::collections::HashMap;

fn parse_id(raw: &str) -> Result<i64, AppError> {
    raw.parse()
        .map_err(|_| AppError::BadRequest(format!("invalid id '{}'", raw)))
}

fn parse_body(body: &Bytes) -> Result<Value, AppError> {
    if body.is_empty() {
        return Err(AppError::BadRequest("request body is empty".into()));
    }
    serde_json::from_slice(body).map_err(|e| AppError::BadRequest(format!("invalid JSON body: {}", e)))
}

pub async fn list(
    State(state): State<AppState>,
    Extension(table): Extension<TableRef>,
    query: Result<Query<HashMap<String, String>>, QueryRejection>,
) -> Result<Response, AppError> {
    let Query(params) = query?;
    let args = ListArgs::from_query(&params)?;
    let body = match CrudService::list(&state.pool, &state.registry, &table, &args, &state.api).await? {
        Listing::Single(record) => Encodable::Record(record),
        Listing::Page(page) => Record::new()
            .with("num_results", page.num_results as i64)
            .with("objects", page.objects)
            .with("page", i64::from(page.page))
            .with("total_pages", page.total_pages as i64)
            .into(),
    };
    envelope(StatusCode::OK, &body)
}

pub async fn read(
    State(state): State<AppState>,
    Extension(table): Extension<TableRef>,
    id: Result<Path<String>, PathRejection>,
) -> Result<Response, AppError> {
    let Path(id) = id?;
    let id = parse_id(&id)?;
    let record = CrudService::read(&state.pool, &state.registry, &table, id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("{} {}", table.table_name, id)))?;
    envelope(StatusCode::OK, &record.into())
}

pub async fn create(
    State(state): State<AppState>,
    Extension(table): Extension<TableRef>,
    body: Result<Bytes, BytesRejection>,
) -> Result<Response, AppError> {
    let body = parse_body(&body?)?;
    let record = CrudService::create(&state.pool, &state.registry, &table, &body).await?;
    envelope(StatusCode::CREATED, &record.into())
}

pub async fn update(
    State(state): State<AppState>,
    Extension(table): Extension<TableRef>,
    id: Result<Path<String>, PathRejection>,
    body: Result<Bytes, BytesRejection>,
) -> Result<Response, AppError> {
    let Path(id) = id?;
    let id = parse_id(&id)?;
    let body = parse_body(&body?)?;
    let record = CrudService::update(&state.pool, &state.registry, &table, id, &body).await?;
    envelope(StatusCode::OK, &record.into())
}

pub async fn patch_many(
    State(state): State<AppState>,
    Extension(table): Extension<TableRef>,
    query: Result<Query<HashMap<String, String>>, QueryRejection>,
    body: Result<Bytes, BytesRejection>,
) -> Result<Response, AppError> {
    let Query(params) = query?;
    let search = SearchParams::parse(params.get("q").map(String::as_str))?;
    let body = parse_body(&body?)?;
    let modified = CrudService::update_many(&state.pool, &table, &search, &body).await?;
    envelope(
        StatusCode::OK,
        &Record::new().with("num_modified", modified as i64).into(),
    )
}

pub async fn delete(
    State(state): State<AppState>,
    Extension(table): Extension<TableRef>,
    id: Result<Path<String>, PathRejection>,
) -> Result<Response, AppError> {
    let Path(id) = id?;
    let id = parse_id(&id)?;
    if !CrudService::delete(&state.pool, &table, id).await? {
        return Err(AppError::NotFound(format!("{} {}", table.table_name, id)));
    }
    Ok(no_content())
}

pub async fn evaluate(
    State(state): State<AppState>,
    Extension(table): Extension<TableRef>,
    query: Result<Query<HashMap<String, String>>, QueryRejection>,
) -> Result<Response, AppError> {
    let Query(params) = query?;
    let search = SearchParams::parse(params.get("q").map(String::as_str))?;
    let results = CrudService::evaluate(&state.pool, &table, &search).await?;
    envelope(StatusCode::OK, &results.into())
}
