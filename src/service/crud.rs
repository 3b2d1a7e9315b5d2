//! Generic CRUD execution against SQLite. Every mutating call runs in one transaction.

use crate::config::ApiConfig;
use crate::error::AppError;
use crate::model::{ColumnDescriptor, Registry, TableDescriptor};
use crate::response::{Encodable, Record, ScalarValue};
use crate::service::query::{ListArgs, SearchParams};
use crate::service::validation::RequestValidator;
use crate::sql::{
    aggregate, count, decode_cell, decode_row, delete, insert, select_by_column_in, select_by_id, select_list,
    set_foreign_key, update, update_where, Aggregate, QueryBuf,
};
use serde_json::{Map, Value};
use sqlx::query::Query;
use sqlx::sqlite::{Sqlite, SqliteConnection, SqlitePool};
use sqlx::{Database, Row};
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;

type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, AppError>> + Send + 'a>>;

/// One page of a list query.
#[derive(Debug)]
pub struct ListPage {
    pub num_results: u64,
    pub objects: Vec<Record>,
    pub page: u32,
    pub total_pages: u64,
}

#[derive(Debug)]
pub enum Listing {
    Page(ListPage),
    Single(Record),
}

pub struct CrudService;

impl CrudService {
    /// Filtered, ordered, paginated list with relations embedded one level deep.
    pub async fn list(
        pool: &SqlitePool,
        registry: &Registry,
        table: &TableDescriptor,
        args: &ListArgs,
        api: &ApiConfig,
    ) -> Result<Listing, AppError> {
        let conditions = args.conditions(table)?;
        let order = args.search.order(table)?;
        let mut conn = pool.acquire().await?;

        if args.search.single {
            let q = select_list(table, &conditions, &order, Some(2), args.search.offset);
            let mut rows = fetch_all(&mut conn, table, &q).await?;
            return match rows.len() {
                0 => Err(AppError::NotFound(format!("no matching {}", table.table_name))),
                1 => {
                    embed(&mut conn, registry, table, &mut rows).await?;
                    Ok(Listing::Single(rows.remove(0)))
                }
                _ => Err(AppError::BadRequest("multiple results found".into())),
            };
        }

        let total = fetch_i64(&mut conn, &count(table, &conditions)).await?.max(0) as u64;
        let offset = u64::from(args.search.offset.unwrap_or(0));
        let mut window = total.saturating_sub(offset);
        if let Some(limit) = args.search.limit {
            window = window.min(u64::from(limit));
        }
        let per_page = u64::from(api.page_size(args.results_per_page));
        let skipped = u64::from(args.page.saturating_sub(1)) * per_page;
        let take = window.saturating_sub(skipped).min(per_page);

        let mut objects = if take == 0 {
            Vec::new()
        } else {
            let q = select_list(table, &conditions, &order, Some(take as u32), Some((offset + skipped) as u32));
            fetch_all(&mut conn, table, &q).await?
        };
        embed(&mut conn, registry, table, &mut objects).await?;
        Ok(Listing::Page(ListPage {
            num_results: window,
            objects,
            page: args.page,
            total_pages: window.div_ceil(per_page),
        }))
    }

    /// Fetch one row by id with relations embedded.
    pub async fn read(
        pool: &SqlitePool,
        registry: &Registry,
        table: &TableDescriptor,
        id: i64,
    ) -> Result<Option<Record>, AppError> {
        let mut conn = pool.acquire().await?;
        let mut rows = fetch_all(&mut conn, table, &select_by_id(table, id)).await?;
        embed(&mut conn, registry, table, &mut rows).await?;
        Ok(rows.pop())
    }

    /// Insert one payload (and any nested related rows). Returns the new id.
    pub async fn insert(
        pool: &SqlitePool,
        registry: &Registry,
        table: &TableDescriptor,
        body: &Value,
    ) -> Result<i64, AppError> {
        let obj = as_object(body)?;
        let mut tx = pool.begin().await?;
        let id = insert_tree(&mut tx, registry, table, obj.clone()).await?;
        tx.commit().await?;
        tracing::debug!(table = %table.table_name, id, "created");
        Ok(id)
    }

    /// Insert then read back the embedded object.
    pub async fn create(
        pool: &SqlitePool,
        registry: &Registry,
        table: &TableDescriptor,
        body: &Value,
    ) -> Result<Record, AppError> {
        let id = Self::insert(pool, registry, table, body).await?;
        Self::read(pool, registry, table, id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("{} {}", table.table_name, id)))
    }

    /// Partial update by id. Relation keys take `{"add": ...}`.
    pub async fn update(
        pool: &SqlitePool,
        registry: &Registry,
        table: &TableDescriptor,
        id: i64,
        body: &Value,
    ) -> Result<Record, AppError> {
        let obj = as_object(body)?;
        let mut tx = pool.begin().await?;
        if fetch_all(&mut tx, table, &select_by_id(table, id)).await?.is_empty() {
            return Err(AppError::NotFound(format!("{} {}", table.table_name, id)));
        }

        let (mut scalars, relations) = split_relations(table, obj.clone());
        for (rel, value) in relations {
            let added = match value {
                Value::Object(mut m) if m.len() == 1 && m.contains_key("add") => m.remove("add").unwrap_or_default(),
                _ => return Err(AppError::validation(&rel.name, "expected {\"add\": ...}")),
            };
            let related = related_table(registry, rel)?;
            if rel.is_to_one() {
                let Value::Object(target) = added else {
                    return Err(AppError::validation(&rel.name, "must add a single object"));
                };
                let related_id = link_or_create(&mut tx, registry, rel, related, target).await?;
                scalars.insert(rel.sibling_key(), Value::from(related_id));
            } else {
                attach_many(&mut tx, registry, rel, related, id, into_items(rel, added)?).await?;
            }
        }

        let values = RequestValidator::validate_partial(table, &scalars)?;
        execute(&mut tx, &update(table, id, &values)).await?;
        tx.commit().await?;
        tracing::debug!(table = %table.table_name, id, "updated");
        Self::read(pool, registry, table, id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("{} {}", table.table_name, id)))
    }

    /// Set scalar columns on every row matched by `search`. Returns the number of rows changed.
    pub async fn update_many(
        pool: &SqlitePool,
        table: &TableDescriptor,
        search: &SearchParams,
        body: &Value,
    ) -> Result<u64, AppError> {
        let values = RequestValidator::validate_partial(table, as_object(body)?)?;
        if values.is_empty() {
            return Err(AppError::BadRequest("no fields to update".into()));
        }
        let conditions = search.conditions(table)?;
        let mut tx = pool.begin().await?;
        let modified = execute(&mut tx, &update_where(table, &conditions, &values)).await?;
        tx.commit().await?;
        Ok(modified)
    }

    /// Delete by id. Returns false when no row had that id.
    pub async fn delete(pool: &SqlitePool, table: &TableDescriptor, id: i64) -> Result<bool, AppError> {
        let mut tx = pool.begin().await?;
        let affected = execute(&mut tx, &delete(table, id)).await?;
        tx.commit().await?;
        Ok(affected > 0)
    }

    /// Evaluate aggregate functions over the rows matched by `search`.
    pub async fn evaluate(
        pool: &SqlitePool,
        table: &TableDescriptor,
        search: &SearchParams,
    ) -> Result<Record, AppError> {
        let functions = search.aggregates(table)?;
        let conditions = search.conditions(table)?;
        let q = aggregate(table, &functions, &conditions);
        let mut conn = pool.acquire().await?;
        tracing::debug!(sql = %q.sql, params = ?q.params, "query");
        let row = bind_all(&q).fetch_one(&mut *conn).await?;
        let mut out = Record::new();
        for (i, (func, field)) in functions.iter().enumerate() {
            let kind = match func {
                Aggregate::Sum | Aggregate::Min | Aggregate::Max => {
                    table.column(field).and_then(|c| c.type_mapping()).map(|m| m.kind)
                }
                Aggregate::Count | Aggregate::Avg => None,
            };
            out.insert(format!("{}__{}", func.as_str(), field), decode_cell(&row, i, kind)?);
        }
        Ok(out)
    }
}

fn as_object(body: &Value) -> Result<&Map<String, Value>, AppError> {
    body.as_object()
        .ok_or_else(|| AppError::BadRequest("request body must be a JSON object".into()))
}

fn int_field(record: &Record, key: &str) -> Option<i64> {
    match record.get(key) {
        Some(Encodable::Scalar(ScalarValue::Int(n))) => Some(*n),
        _ => None,
    }
}

fn related_table<'r>(registry: &'r Registry, rel: &ColumnDescriptor) -> Result<&'r TableDescriptor, AppError> {
    rel.related_table
        .as_deref()
        .and_then(|name| registry.get(name))
        .map(|t| t.as_ref())
        .ok_or_else(|| AppError::validation(&rel.name, "unknown relation target"))
}

/// Split a payload into scalar fields and relation fields.
fn split_relations(table: &TableDescriptor, body: Map<String, Value>) -> (Map<String, Value>, Vec<(&ColumnDescriptor, Value)>) {
    let mut scalars = Map::new();
    let mut relations = Vec::new();
    for (key, value) in body {
        match table.column(&key).filter(|c| c.is_relationship()) {
            Some(rel) => relations.push((rel, value)),
            None => {
                scalars.insert(key, value);
            }
        }
    }
    (scalars, relations)
}

fn into_items(rel: &ColumnDescriptor, value: Value) -> Result<Vec<Value>, AppError> {
    match value {
        Value::Array(items) => Ok(items),
        obj @ Value::Object(_) => Ok(vec![obj]),
        Value::Null => Ok(Vec::new()),
        _ => Err(AppError::validation(&rel.name, "must be an object or a list of objects")),
    }
}

fn insert_tree<'a>(
    conn: &'a mut SqliteConnection,
    registry: &'a Registry,
    table: &'a TableDescriptor,
    body: Map<String, Value>,
) -> BoxFuture<'a, i64> {
    Box::pin(async move {
        let (mut scalars, relations) = split_relations(table, body);
        let mut to_many = Vec::new();
        for (rel, value) in relations {
            let related = related_table(registry, rel)?;
            if rel.is_to_many() {
                to_many.push((rel, related, into_items(rel, value)?));
                continue;
            }
            let related_id = match value {
                Value::Null => Value::Null,
                Value::Object(target) => Value::from(link_or_create(conn, registry, rel, related, target).await?),
                _ => return Err(AppError::validation(&rel.name, "must be an object")),
            };
            scalars.insert(rel.sibling_key(), related_id);
        }

        let values = RequestValidator::validate(table, &scalars)?;
        let id = fetch_i64(conn, &insert(table, &values)).await?;
        for (rel, related, items) in to_many {
            attach_many(conn, registry, rel, related, id, items).await?;
        }
        Ok(id)
    })
}

/// An object carrying `id` links the existing row; anything else is created first.
async fn link_or_create(
    conn: &mut SqliteConnection,
    registry: &Registry,
    rel: &ColumnDescriptor,
    related: &TableDescriptor,
    target: Map<String, Value>,
) -> Result<i64, AppError> {
    match target.get("id") {
        Some(raw) => {
            let id = raw
                .as_i64()
                .ok_or_else(|| AppError::validation(&rel.name, "id must be an integer"))?;
            if fetch_all(conn, related, &select_by_id(related, id)).await?.is_empty() {
                return Err(AppError::validation(
                    &rel.name,
                    format!("no {} with id {}", related.table_name, id),
                ));
            }
            Ok(id)
        }
        None => insert_tree(conn, registry, related, target).await,
    }
}

/// Point each item at `owner_id` through the relation's remote key.
async fn attach_many(
    conn: &mut SqliteConnection,
    registry: &Registry,
    rel: &ColumnDescriptor,
    related: &TableDescriptor,
    owner_id: i64,
    items: Vec<Value>,
) -> Result<(), AppError> {
    let remote_key = rel
        .remote_key
        .as_deref()
        .ok_or_else(|| AppError::validation(&rel.name, "relation has no remote key"))?;
    for item in items {
        let Value::Object(mut obj) = item else {
            return Err(AppError::validation(&rel.name, "items must be objects"));
        };
        match obj.get("id").map(Value::as_i64) {
            Some(Some(item_id)) => {
                let changed = execute(conn, &set_foreign_key(related, remote_key, owner_id, item_id)).await?;
                if changed == 0 {
                    return Err(AppError::validation(
                        &rel.name,
                        format!("no {} with id {}", related.table_name, item_id),
                    ));
                }
            }
            Some(None) => return Err(AppError::validation(&rel.name, "id must be an integer")),
            None => {
                obj.insert(remote_key.to_string(), Value::from(owner_id));
                insert_tree(conn, registry, related, obj).await?;
            }
        }
    }
    Ok(())
}

/// Embed to-one relations as objects and to-many relations as arrays, batched per relation.
async fn embed(
    conn: &mut SqliteConnection,
    registry: &Registry,
    table: &TableDescriptor,
    rows: &mut [Record],
) -> Result<(), AppError> {
    if rows.is_empty() {
        return Ok(());
    }
    for rel in table.relationships() {
        let related = related_table(registry, rel)?;
        if rel.is_to_one() {
            let key = rel.sibling_key();
            let mut ids: Vec<i64> = rows.iter().filter_map(|r| int_field(r, &key)).collect();
            ids.sort_unstable();
            ids.dedup();
            let found = fetch_all(conn, related, &select_by_column_in(related, "id", &ids)).await?;
            let by_id: HashMap<i64, Record> = found.into_iter().filter_map(|r| r.id().map(|id| (id, r))).collect();
            for row in rows.iter_mut() {
                let value = int_field(row, &key)
                    .and_then(|id| by_id.get(&id))
                    .cloned()
                    .map(Encodable::Record)
                    .unwrap_or_else(Encodable::null);
                row.insert(rel.name.clone(), value);
            }
        } else {
            let remote_key = rel.remote_key.as_deref().unwrap_or("id");
            let ids: Vec<i64> = rows.iter().filter_map(Record::id).collect();
            let found = fetch_all(conn, related, &select_by_column_in(related, remote_key, &ids)).await?;
            let mut grouped: HashMap<i64, Vec<Record>> = HashMap::new();
            for r in found {
                if let Some(owner) = int_field(&r, remote_key) {
                    grouped.entry(owner).or_default().push(r);
                }
            }
            for row in rows.iter_mut() {
                let items = row.id().and_then(|id| grouped.get(&id)).cloned().unwrap_or_default();
                row.insert(rel.name.clone(), Encodable::from(items));
            }
        }
    }
    Ok(())
}

fn bind_all(q: &QueryBuf) -> Query<'_, Sqlite, <Sqlite as Database>::Arguments<'_>> {
    let mut query = sqlx::query(&q.sql);
    for p in &q.params {
        query = query.bind(p.clone());
    }
    query
}

async fn fetch_all(conn: &mut SqliteConnection, table: &TableDescriptor, q: &QueryBuf) -> Result<Vec<Record>, AppError> {
    tracing::debug!(sql = %q.sql, params = ?q.params, "query");
    let rows = bind_all(q).fetch_all(&mut *conn).await?;
    rows.iter().map(|r| decode_row(table, r)).collect()
}

async fn fetch_i64(conn: &mut SqliteConnection, q: &QueryBuf) -> Result<i64, AppError> {
    tracing::debug!(sql = %q.sql, params = ?q.params, "query");
    let row = bind_all(q).fetch_one(&mut *conn).await?;
    Ok(row.try_get::<i64, _>(0)?)
}

async fn execute(conn: &mut SqliteConnection, q: &QueryBuf) -> Result<u64, AppError> {
    tracing::debug!(sql = %q.sql, params = ?q.params, "execute");
    Ok(bind_all(q).execute(&mut *conn).await?.rows_affected())
}
