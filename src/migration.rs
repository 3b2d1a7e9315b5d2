//! DDL for the registered tables. Tables are created in registry order (parents first) and
//! dropped in reverse.

use crate::error::AppError;
use crate::model::{Registry, TableDescriptor};
use sqlx::sqlite::SqlitePool;

fn quote(s: &str) -> String {
    format!("\"{}\"", s.replace('"', "\"\""))
}

/// `CREATE TABLE IF NOT EXISTS` for one table: stored columns only, to-one keys reference
/// their related table.
pub fn table_ddl(table: &TableDescriptor) -> String {
    let mut col_defs = Vec::new();
    for c in table.stored_columns() {
        if c.is_primary() {
            // AUTOINCREMENT keeps ids from being reused after deletes.
            col_defs.push(format!("{} INTEGER PRIMARY KEY AUTOINCREMENT", quote(&c.name)));
            continue;
        }
        let mut def = format!("{} {}", quote(&c.name), c.storage_type());
        if !c.nullable {
            def.push_str(" NOT NULL");
        }
        if let Some(default) = &c.default {
            def.push_str(" DEFAULT ");
            def.push_str(&default.sql());
        }
        if c.unique {
            def.push_str(" UNIQUE");
        }
        if let Some(related) = table.foreign_key(&c.name) {
            def.push_str(&format!(" REFERENCES {} ({})", quote(related), quote("id")));
        }
        col_defs.push(def);
    }
    format!(
        "CREATE TABLE IF NOT EXISTS {} (\n    {}\n)",
        quote(&table.table_name),
        col_defs.join(",\n    ")
    )
}

/// Create every missing table.
pub async fn create_all(pool: &SqlitePool, registry: &Registry) -> Result<(), AppError> {
    let mut conn = pool.acquire().await?;
    for table in registry.tables() {
        let ddl = table_ddl(table);
        tracing::debug!(table = %table.table_name, sql = %ddl, "create table");
        sqlx::query(&ddl).execute(&mut *conn).await?;
    }
    tracing::info!(tables = registry.tables().len(), "tables created");
    Ok(())
}

/// Drop every registered table, children first, with foreign keys off on the connection.
pub async fn drop_all(pool: &SqlitePool, registry: &Registry) -> Result<(), AppError> {
    let mut conn = pool.acquire().await?;
    sqlx::query("PRAGMA foreign_keys = OFF").execute(&mut *conn).await?;
    let mut result = Ok(());
    for table in registry.tables().iter().rev() {
        let sql = format!("DROP TABLE IF EXISTS {}", quote(&table.table_name));
        if let Err(e) = sqlx::query(&sql).execute(&mut *conn).await {
            result = Err(AppError::from(e));
            break;
        }
    }
    sqlx::query("PRAGMA foreign_keys = ON").execute(&mut *conn).await?;
    result?;
    tracing::info!(tables = registry.tables().len(), "tables dropped");
    Ok(())
}

/// Drop then recreate every table.
pub async fn reset_all(pool: &SqlitePool, registry: &Registry) -> Result<(), AppError> {
    drop_all(pool, registry).await?;
    create_all(pool, registry).await
}
