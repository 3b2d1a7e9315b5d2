//! Search parameters: the JSON `q` argument plus plain `column=value` filters.

use crate::error::AppError;
use crate::model::{ColumnDescriptor, TableDescriptor};
use crate::service::validation::coerce;
use crate::sql::{Aggregate, Condition, FilterOp, OrderBy, SqlValue};
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;

#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct FilterSpec {
    pub name: String,
    pub op: String,
    #[serde(default)]
    pub val: Value,
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct OrderSpec {
    pub field: String,
    #[serde(default)]
    pub direction: Option<String>,
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct FunctionSpec {
    pub name: String,
    #[serde(default)]
    pub field: String,
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
pub struct SearchParams {
    #[serde(default)]
    pub filters: Vec<FilterSpec>,
    #[serde(default)]
    pub order_by: Vec<OrderSpec>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
    #[serde(default)]
    pub single: bool,
    #[serde(default)]
    pub functions: Vec<FunctionSpec>,
}

impl SearchParams {
    pub fn parse(q: Option<&str>) -> Result<Self, AppError> {
        match q.map(str::trim).filter(|s| !s.is_empty()) {
            None => Ok(Self::default()),
            Some(raw) => serde_json::from_str(raw).map_err(|e| AppError::BadRequest(format!("invalid q: {}", e))),
        }
    }

    pub fn conditions(&self, table: &TableDescriptor) -> Result<Vec<Condition>, AppError> {
        self.filters.iter().map(|f| condition(table, f)).collect()
    }

    pub fn order(&self, table: &TableDescriptor) -> Result<Vec<OrderBy>, AppError> {
        self.order_by
            .iter()
            .map(|o| {
                scalar_column(table, &o.field)?;
                let descending = match o.direction.as_deref().map(str::to_ascii_lowercase).as_deref() {
                    None | Some("asc") => false,
                    Some("desc") => true,
                    Some(other) => return Err(AppError::BadRequest(format!("invalid direction '{}'", other))),
                };
                Ok(OrderBy {
                    column: o.field.clone(),
                    descending,
                })
            })
            .collect()
    }

    pub fn aggregates(&self, table: &TableDescriptor) -> Result<Vec<(Aggregate, String)>, AppError> {
        if self.functions.is_empty() {
            return Err(AppError::BadRequest("q.functions is required".into()));
        }
        self.functions
            .iter()
            .map(|f| {
                let agg = Aggregate::parse(&f.name)
                    .ok_or_else(|| AppError::BadRequest(format!("unknown function '{}'", f.name)))?;
                let count_all = agg == Aggregate::Count && (f.field.is_empty() || f.field == "*");
                if !count_all {
                    scalar_column(table, &f.field)?;
                }
                Ok((agg, f.field.clone()))
            })
            .collect()
    }
}

/// Pagination and plain filters taken from the raw query string.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ListArgs {
    pub search: SearchParams,
    pub page: u32,
    pub results_per_page: Option<u32>,
    pub exact: Vec<(String, String)>,
}

impl ListArgs {
    pub fn from_query(params: &HashMap<String, String>) -> Result<Self, AppError> {
        let search = SearchParams::parse(params.get("q").map(String::as_str))?;
        let page = match params.get("page") {
            Some(p) => p
                .parse::<u32>()
                .ok()
                .filter(|n| *n >= 1)
                .ok_or_else(|| AppError::BadRequest(format!("invalid page '{}'", p)))?,
            None => 1,
        };
        let results_per_page = params
            .get("results_per_page")
            .map(|n| {
                n.parse::<u32>()
                    .map_err(|_| AppError::BadRequest(format!("invalid results_per_page '{}'", n)))
            })
            .transpose()?;
        let mut exact: Vec<(String, String)> = params
            .iter()
            .filter(|(k, _)| !matches!(k.as_str(), "q" | "page" | "results_per_page"))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        exact.sort();
        Ok(ListArgs {
            search,
            page,
            results_per_page,
            exact,
        })
    }

    /// `q` filters followed by the plain equality filters.
    pub fn conditions(&self, table: &TableDescriptor) -> Result<Vec<Condition>, AppError> {
        let mut conditions = self.search.conditions(table)?;
        for (name, raw) in &self.exact {
            let col = scalar_column(table, name)?;
            // Query-string values are untyped; read them as JSON first, then as text.
            let v = serde_json::from_str::<Value>(raw)
                .ok()
                .filter(|v| !v.is_string() && coerce(col, v).is_ok())
                .unwrap_or_else(|| Value::String(raw.clone()));
            conditions.push(Condition {
                column: name.clone(),
                op: FilterOp::Eq,
                values: vec![filter_value(col, &v)?],
            });
        }
        Ok(conditions)
    }
}

fn scalar_column<'a>(table: &'a TableDescriptor, name: &str) -> Result<&'a ColumnDescriptor, AppError> {
    table
        .column(name)
        .filter(|c| !c.is_relationship())
        .ok_or_else(|| AppError::BadRequest(format!("unknown field '{}' on {}", name, table.table_name)))
}

fn filter_value(col: &ColumnDescriptor, v: &Value) -> Result<SqlValue, AppError> {
    coerce(col, v).map_err(|msg| AppError::BadRequest(format!("{}: {}", col.name, msg)))
}

fn condition(table: &TableDescriptor, f: &FilterSpec) -> Result<Condition, AppError> {
    let col = scalar_column(table, &f.name)?;
    let op = FilterOp::parse(&f.op).ok_or_else(|| AppError::BadRequest(format!("unknown operator '{}'", f.op)))?;
    let (op, values) = if !op.takes_value() {
        (op, Vec::new())
    } else if op.takes_list() {
        let items = f
            .val
            .as_array()
            .ok_or_else(|| AppError::BadRequest(format!("{}: '{}' needs a list", f.name, f.op)))?;
        (op, items.iter().map(|v| filter_value(col, v)).collect::<Result<_, _>>()?)
    } else if f.val.is_null() {
        match op {
            FilterOp::Eq => (FilterOp::IsNull, Vec::new()),
            FilterOp::Ne => (FilterOp::IsNotNull, Vec::new()),
            _ => return Err(AppError::BadRequest(format!("{}: '{}' needs a value", f.name, f.op))),
        }
    } else if matches!(op, FilterOp::Like | FilterOp::ILike) {
        let pattern = match &f.val {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        (op, vec![SqlValue::Text(pattern)])
    } else {
        (op, vec![filter_value(col, &f.val)?])
    };
    Ok(Condition {
        column: f.name.clone(),
        op,
        values,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::discover_tables;

    #[test]
    fn parses_q() {
        let q = r#"{"filters":[{"name":"symbol","op":"in","val":["USD","EUR"]},{"name":"exchange_id","op":"==","val":null}],"order_by":[{"field":"name","direction":"desc"}],"limit":5}"#;
        let search = SearchParams::parse(Some(q)).unwrap();
        let registry = discover_tables().unwrap();
        let t = registry.get("commodity").unwrap();
        let conditions = search.conditions(t).unwrap();
        assert_eq!(conditions[0].op, FilterOp::In);
        assert_eq!(conditions[0].values.len(), 2);
        assert_eq!(conditions[1].op, FilterOp::IsNull);
        assert!(search.order(t).unwrap()[0].descending);
        assert_eq!(search.limit, Some(5));
    }

    #[test]
    fn bad_q_is_bad_request() {
        assert!(matches!(SearchParams::parse(Some("{nope")), Err(AppError::BadRequest(_))));
        let registry = discover_tables().unwrap();
        let t = registry.get("commodity").unwrap();
        let search = SearchParams::parse(Some(r#"{"filters":[{"name":"type","op":"==","val":1}]}"#)).unwrap();
        assert!(matches!(search.conditions(t), Err(AppError::BadRequest(_))));
        let search = SearchParams::parse(Some(r#"{"filters":[{"name":"name","op":"~","val":1}]}"#)).unwrap();
        assert!(matches!(search.conditions(t), Err(AppError::BadRequest(_))));
    }

    #[test]
    fn list_args_from_query_string() {
        let registry = discover_tables().unwrap();
        let t = registry.get("commodity").unwrap();
        let params: HashMap<String, String> = [
            ("page", "2"),
            ("results_per_page", "3"),
            ("type_id", "5"),
            ("symbol", "USD"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
        let args = ListArgs::from_query(&params).unwrap();
        assert_eq!(args.page, 2);
        assert_eq!(args.results_per_page, Some(3));
        let conditions = args.conditions(t).unwrap();
        assert_eq!(conditions[0].values, vec![SqlValue::Text("USD".into())]);
        assert_eq!(conditions[1].values, vec![SqlValue::Int(5)]);
    }

    #[test]
    fn aggregates_need_known_fields() {
        let registry = discover_tables().unwrap();
        let t = registry.get("price").unwrap();
        let search = SearchParams::parse(Some(r#"{"functions":[{"name":"count","field":"id"},{"name":"sum","field":"close"}]}"#)).unwrap();
        assert_eq!(search.aggregates(t).unwrap().len(), 2);
        let search = SearchParams::parse(Some(r#"{"functions":[{"name":"median","field":"close"}]}"#)).unwrap();
        assert!(search.aggregates(t).is_err());
    }
}
