//! Builds parameterized SELECT, INSERT, UPDATE, DELETE for SQLite from table descriptors.
//! Identifiers only ever come from descriptors; values are always `?` parameters.

use crate::model::TableDescriptor;
use crate::sql::params::SqlValue;

/// Quote identifier (safe: only from descriptors).
fn quoted(s: &str) -> String {
    format!("\"{}\"", s.replace('"', "\"\""))
}

#[derive(Debug, Default)]
pub struct QueryBuf {
    pub sql: String,
    pub params: Vec<SqlValue>,
}

impl QueryBuf {
    fn new() -> Self {
        QueryBuf::default()
    }

    fn push_param(&mut self, v: SqlValue) -> &'static str {
        self.params.push(v);
        "?"
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FilterOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    In,
    NotIn,
    IsNull,
    IsNotNull,
    Like,
    ILike,
}

impl FilterOp {
    pub fn parse(op: &str) -> Option<Self> {
        Some(match op {
            "==" | "eq" | "equals" => FilterOp::Eq,
            "!=" | "neq" | "does_not_equal" | "not_equal_to" => FilterOp::Ne,
            "<" | "lt" => FilterOp::Lt,
            "<=" | "le" | "lte" => FilterOp::Le,
            ">" | "gt" => FilterOp::Gt,
            ">=" | "ge" | "gte" => FilterOp::Ge,
            "in" => FilterOp::In,
            "not_in" => FilterOp::NotIn,
            "is_null" => FilterOp::IsNull,
            "is_not_null" => FilterOp::IsNotNull,
            "like" => FilterOp::Like,
            "ilike" => FilterOp::ILike,
            _ => return None,
        })
    }

    pub fn takes_list(&self) -> bool {
        matches!(self, FilterOp::In | FilterOp::NotIn)
    }

    pub fn takes_value(&self) -> bool {
        !matches!(self, FilterOp::IsNull | FilterOp::IsNotNull)
    }
}

/// One validated `WHERE` term. `values` holds one value, a list for `in`/`not_in`, or nothing
/// for the null checks.
#[derive(Clone, Debug, PartialEq)]
pub struct Condition {
    pub column: String,
    pub op: FilterOp,
    pub values: Vec<SqlValue>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OrderBy {
    pub column: String,
    pub descending: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Aggregate {
    Count,
    Sum,
    Avg,
    Min,
    Max,
}

impl Aggregate {
    pub fn parse(name: &str) -> Option<Self> {
        Some(match name {
            "count" => Aggregate::Count,
            "sum" => Aggregate::Sum,
            "avg" => Aggregate::Avg,
            "min" => Aggregate::Min,
            "max" => Aggregate::Max,
            _ => return None,
        })
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Aggregate::Count => "count",
            Aggregate::Sum => "sum",
            Aggregate::Avg => "avg",
            Aggregate::Min => "min",
            Aggregate::Max => "max",
        }
    }
}

/// Column expression: stored columns by name, computed ones inline.
/// Column as used in WHERE, ORDER BY and aggregates. Decimals are stored as text, so they
/// compare and aggregate through a REAL cast.
fn column_expr(table: &TableDescriptor, name: &str) -> String {
    let Some(col) = table.column(name) else {
        return quoted(name);
    };
    match &col.computed {
        Some(expr) => format!("({})", expr),
        None if col.is_decimal() => format!("CAST({} AS REAL)", quoted(name)),
        None => quoted(name),
    }
}

/// SELECT list: stored columns as-is, computed columns aliased to their names.
fn select_column_list(table: &TableDescriptor) -> String {
    table
        .scalar_columns()
        .map(|c| match &c.computed {
            Some(expr) => format!("({}) AS {}", expr, quoted(&c.name)),
            None => quoted(&c.name),
        })
        .collect::<Vec<_>>()
        .join(", ")
}

fn where_clause(table: &TableDescriptor, q: &mut QueryBuf, conditions: &[Condition]) -> String {
    let parts: Vec<String> = conditions
        .iter()
        .map(|c| {
            let col = column_expr(table, &c.column);
            match c.op {
                FilterOp::IsNull => format!("{} IS NULL", col),
                FilterOp::IsNotNull => format!("{} IS NOT NULL", col),
                FilterOp::In | FilterOp::NotIn if c.values.is_empty() => {
                    if c.op == FilterOp::In { "1 = 0".into() } else { "1 = 1".into() }
                }
                FilterOp::In | FilterOp::NotIn => {
                    let phs: Vec<&str> = c.values.iter().map(|v| q.push_param(v.clone())).collect();
                    let kw = if c.op == FilterOp::In { "IN" } else { "NOT IN" };
                    format!("{} {} ({})", col, kw, phs.join(", "))
                }
                FilterOp::ILike => {
                    let ph = q.push_param(c.values.first().cloned().unwrap_or(SqlValue::Null));
                    format!("LOWER({}) LIKE LOWER({})", col, ph)
                }
                op => {
                    let sym = match op {
                        FilterOp::Eq => "=",
                        FilterOp::Ne => "!=",
                        FilterOp::Lt => "<",
                        FilterOp::Le => "<=",
                        FilterOp::Gt => ">",
                        FilterOp::Ge => ">=",
                        _ => "LIKE",
                    };
                    let ph = q.push_param(c.values.first().cloned().unwrap_or(SqlValue::Null));
                    format!("{} {} {}", col, sym, ph)
                }
            }
        })
        .collect();
    if parts.is_empty() {
        String::new()
    } else {
        format!(" WHERE {}", parts.join(" AND "))
    }
}

/// SELECT by primary key.
pub fn select_by_id(table: &TableDescriptor, id: i64) -> QueryBuf {
    let mut q = QueryBuf::new();
    let ph = q.push_param(SqlValue::Int(id));
    q.sql = format!(
        "SELECT {} FROM {} WHERE {} = {}",
        select_column_list(table),
        quoted(&table.table_name),
        quoted("id"),
        ph
    );
    q
}

/// SELECT with filters, ordering (default: id) and optional LIMIT/OFFSET.
pub fn select_list(
    table: &TableDescriptor,
    conditions: &[Condition],
    order_by: &[OrderBy],
    limit: Option<u32>,
    offset: Option<u32>,
) -> QueryBuf {
    let mut q = QueryBuf::new();
    let where_sql = where_clause(table, &mut q, conditions);
    let mut order_parts: Vec<String> = order_by
        .iter()
        .map(|o| format!("{} {}", column_expr(table, &o.column), if o.descending { "DESC" } else { "ASC" }))
        .collect();
    if !order_by.iter().any(|o| o.column == "id") {
        order_parts.push(quoted("id"));
    }
    // SQLite needs a LIMIT before OFFSET; -1 means unbounded.
    let limit_clause = match (limit, offset) {
        (Some(n), _) => format!(" LIMIT {}", n),
        (None, Some(_)) => " LIMIT -1".to_string(),
        (None, None) => String::new(),
    };
    let offset_clause = offset.map(|n| format!(" OFFSET {}", n)).unwrap_or_default();
    q.sql = format!(
        "SELECT {} FROM {}{} ORDER BY {}{}{}",
        select_column_list(table),
        quoted(&table.table_name),
        where_sql,
        order_parts.join(", "),
        limit_clause,
        offset_clause
    );
    q
}

pub fn count(table: &TableDescriptor, conditions: &[Condition]) -> QueryBuf {
    let mut q = QueryBuf::new();
    let where_sql = where_clause(table, &mut q, conditions);
    q.sql = format!("SELECT COUNT(*) FROM {}{}", quoted(&table.table_name), where_sql);
    q
}

/// SELECT rows whose `column` is in `values`, ordered by id. Used to batch-load relations.
pub fn select_by_column_in(table: &TableDescriptor, column: &str, values: &[i64]) -> QueryBuf {
    let mut q = QueryBuf::new();
    let cols = select_column_list(table);
    if values.is_empty() {
        q.sql = format!("SELECT {} FROM {} WHERE 1 = 0", cols, quoted(&table.table_name));
        return q;
    }
    let phs: Vec<&str> = values.iter().map(|v| q.push_param(SqlValue::Int(*v))).collect();
    q.sql = format!(
        "SELECT {} FROM {} WHERE {} IN ({}) ORDER BY {}",
        cols,
        quoted(&table.table_name),
        quoted(column),
        phs.join(", "),
        quoted("id")
    );
    q
}

/// INSERT the given stored columns; omitted ones take their store default. Returns the new id.
pub fn insert(table: &TableDescriptor, values: &[(String, SqlValue)]) -> QueryBuf {
    let mut q = QueryBuf::new();
    let table_sql = quoted(&table.table_name);
    if values.is_empty() {
        q.sql = format!("INSERT INTO {} DEFAULT VALUES RETURNING {}", table_sql, quoted("id"));
        return q;
    }
    let cols: Vec<String> = values.iter().map(|(c, _)| quoted(c)).collect();
    let phs: Vec<&str> = values.iter().map(|(_, v)| q.push_param(v.clone())).collect();
    q.sql = format!(
        "INSERT INTO {} ({}) VALUES ({}) RETURNING {}",
        table_sql,
        cols.join(", "),
        phs.join(", "),
        quoted("id")
    );
    q
}

fn set_clause(table: &TableDescriptor, q: &mut QueryBuf, values: &[(String, SqlValue)]) -> String {
    let mut sets: Vec<String> = values
        .iter()
        .map(|(c, v)| format!("{} = {}", quoted(c), q.push_param(v.clone())))
        .collect();
    for touch in table.stored_columns().filter(|c| c.touch_on_update) {
        if !values.iter().any(|(c, _)| *c == touch.name) {
            sets.push(format!("{} = CURRENT_TIMESTAMP", quoted(&touch.name)));
        }
    }
    sets.join(", ")
}

/// UPDATE by id. Touch-on-update columns are refreshed even when `values` is empty.
pub fn update(table: &TableDescriptor, id: i64, values: &[(String, SqlValue)]) -> QueryBuf {
    let mut q = QueryBuf::new();
    let sets = set_clause(table, &mut q, values);
    if sets.is_empty() {
        // Nothing to write; still report whether the row exists.
        let ph = q.push_param(SqlValue::Int(id));
        q.sql = format!("SELECT {} FROM {} WHERE {} = {}", quoted("id"), quoted(&table.table_name), quoted("id"), ph);
        return q;
    }
    let ph = q.push_param(SqlValue::Int(id));
    q.sql = format!(
        "UPDATE {} SET {} WHERE {} = {}",
        quoted(&table.table_name),
        sets,
        quoted("id"),
        ph
    );
    q
}

/// UPDATE every row matching `conditions`.
pub fn update_where(table: &TableDescriptor, conditions: &[Condition], values: &[(String, SqlValue)]) -> QueryBuf {
    let mut q = QueryBuf::new();
    let sets = set_clause(table, &mut q, values);
    let where_sql = where_clause(table, &mut q, conditions);
    q.sql = format!("UPDATE {} SET {}{}", quoted(&table.table_name), sets, where_sql);
    q
}

/// Point the to-many side at `owner_id`: `UPDATE related SET remote_key = ? WHERE id = ?`.
pub fn set_foreign_key(related: &TableDescriptor, remote_key: &str, owner_id: i64, row_id: i64) -> QueryBuf {
    let mut q = QueryBuf::new();
    let set_ph = q.push_param(SqlValue::Int(owner_id));
    let id_ph = q.push_param(SqlValue::Int(row_id));
    q.sql = format!(
        "UPDATE {} SET {} = {} WHERE {} = {}",
        quoted(&related.table_name),
        quoted(remote_key),
        set_ph,
        quoted("id"),
        id_ph
    );
    q
}

/// DELETE by id.
pub fn delete(table: &TableDescriptor, id: i64) -> QueryBuf {
    let mut q = QueryBuf::new();
    let ph = q.push_param(SqlValue::Int(id));
    q.sql = format!("DELETE FROM {} WHERE {} = {}", quoted(&table.table_name), quoted("id"), ph);
    q
}

/// One SELECT computing every requested aggregate, in order.
pub fn aggregate(table: &TableDescriptor, functions: &[(Aggregate, String)], conditions: &[Condition]) -> QueryBuf {
    let mut q = QueryBuf::new();
    let cols: Vec<String> = functions
        .iter()
        .map(|(f, field)| {
            let arg = if *f == Aggregate::Count && (field.is_empty() || field == "*") {
                "*".to_string()
            } else {
                column_expr(table, field)
            };
            format!("{}({})", f.as_str().to_uppercase(), arg)
        })
        .collect();
    let where_sql = where_clause(table, &mut q, conditions);
    q.sql = format!("SELECT {} FROM {}{}", cols.join(", "), quoted(&table.table_name), where_sql);
    q
}
