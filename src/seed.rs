//! Seed datasets. Rows are positional tuples over each table's seed columns (sorted stored
//! column names without `id` and `utc*` stamps); batches load in order so parents exist first.

use crate::error::{AppError, ConfigError};
use crate::model::Registry;
use crate::service::CrudService;
use serde::Serialize;
use serde_json::{json, Map, Value};
use sqlx::sqlite::SqlitePool;

/// One batch: tables in load order, each with its positional rows.
pub type Batch = Vec<(&'static str, Vec<Value>)>;

pub fn init_values() -> Vec<Batch> {
    vec![
        vec![
            (
                "exchange",
                vec![
                    json!(["New York Stock Exchange", "NYSE"]),
                    json!(["NASDAQ", "NASDAQ"]),
                    json!(["Over the counter", "OTC"]),
                    json!(["Currency", "N/A"]),
                ],
            ),
            ("account_type", vec![json!([0, "Brokerage"]), json!([0, "Roth IRA"])]),
            ("commodity_group", vec![json!(["Security"]), json!(["Currency"]), json!(["Other"])]),
            (
                "company",
                vec![
                    json!(["", "", "Scottrade", "", "", "https://trading.scottrade.com/", ""]),
                    json!(["", "", "Vanguard", "", "", "http://vanguard.com/", ""]),
                ],
            ),
            ("data_source", vec![json!(["Yahoo"]), json!(["Google"]), json!(["XE"])]),
            (
                "event_type",
                vec![
                    json!(["Dividend"]),
                    json!(["Special Dividend"]),
                    json!(["Stock Split"]),
                    json!(["Name Change"]),
                    json!(["Ticker Change"]),
                ],
            ),
            ("trxn_type", vec![json!(["Buy", "Buy"]), json!(["Sell", "Sell"])]),
        ],
        vec![(
            "commodity_type",
            vec![
                json!([1, "Stock"]),
                json!([1, "Bond"]),
                json!([1, "Mutual Fund"]),
                json!([1, "ETF"]),
                json!([2, "Currency"]),
                json!([3, "Descriptor"]),
            ],
        )],
        vec![(
            "commodity",
            vec![
                json!([3, 4, "US Dollar", "USD", 5]),
                json!([3, 4, "Euro", "EUR", 5]),
                json!([3, 4, "Pound Sterling", "GBP", 5]),
                json!([3, 4, "Canadian Dollar", "CAD", 5]),
                json!([3, 4, "Multiple", "Multiple", 6]),
                json!([1, 1, "Apple", "AAPL", 1]),
                json!([3, 4, "Text", "Text", 6]),
            ],
        )],
        vec![
            (
                "person",
                vec![json!(["", 1, "reubano@gmail.com", "Reuben", "Cummings", 0, 0, 0, ""])],
            ),
            (
                "account",
                vec![
                    json!([0, 1, 1, 0, "Scottrade", 1, 0, 1]),
                    json!([0, 2, 1, 0, "Vanguard IRA", 1, 0, 1]),
                ],
            ),
            ("holding", vec![json!([1, 6, ""])]),
        ],
    ]
}

pub fn pop_values() -> Vec<Batch> {
    vec![vec![
        (
            "commodity",
            vec![
                json!([1, 1, "International Business Machines", "IBM", 1]),
                json!([1, 1, "Wal-Mart", "WMT", 1]),
                json!([1, 1, "Caterpillar", "CAT", 1]),
            ],
        ),
        ("holding", vec![json!([1, 8, ""]), json!([1, 9, ""]), json!([1, 10, ""])]),
    ]]
}

/// Rows of one table as column-keyed objects.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TableData {
    pub table: String,
    pub data: Vec<Map<String, Value>>,
}

/// Zip every positional row with its table's seed columns. Batch order and table order are kept.
pub fn process(dataset: &[Batch], registry: &Registry) -> Result<Vec<TableData>, ConfigError> {
    let mut out = Vec::new();
    for batch in dataset {
        for (table_name, rows) in batch {
            let table = registry
                .get(table_name)
                .ok_or_else(|| ConfigError::Load(format!("seed data for unknown table {}", table_name)))?;
            let columns = table.seed_column_names();
            let mut data = Vec::with_capacity(rows.len());
            for row in rows {
                let values = row
                    .as_array()
                    .ok_or_else(|| ConfigError::Load(format!("{} seed row is not a list", table_name)))?;
                if values.len() != columns.len() {
                    return Err(ConfigError::Load(format!(
                        "{} seed row has {} values, expected {} ({})",
                        table_name,
                        values.len(),
                        columns.len(),
                        columns.join(", ")
                    )));
                }
                data.push(columns.iter().map(|c| c.to_string()).zip(values.iter().cloned()).collect());
            }
            out.push(TableData {
                table: table_name.to_string(),
                data,
            });
        }
    }
    Ok(out)
}

/// Insert processed seed data in order. Stops at the first failing row.
pub async fn load(pool: &SqlitePool, registry: &Registry, pieces: &[TableData]) -> Result<usize, AppError> {
    let mut inserted = 0;
    for piece in pieces {
        let table = registry
            .get(&piece.table)
            .ok_or_else(|| AppError::NotFound(format!("table {}", piece.table)))?;
        for row in &piece.data {
            CrudService::insert(pool, registry, table, &Value::Object(row.clone())).await?;
            inserted += 1;
        }
        tracing::info!(table = %piece.table, rows = piece.data.len(), "seeded");
    }
    Ok(inserted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::discover_tables;

    #[test]
    fn rows_zip_with_sorted_seed_columns() {
        let registry = discover_tables().unwrap();
        let pieces = process(&init_values(), &registry).unwrap();
        let tables: Vec<&str> = pieces.iter().map(|p| p.table.as_str()).collect();
        assert_eq!(tables.first(), Some(&"exchange"));
        assert_eq!(tables.last(), Some(&"holding"));

        let commodity = pieces.iter().find(|p| p.table == "commodity").unwrap();
        assert_eq!(commodity.data.len(), 7);
        assert_eq!(commodity.data[0]["symbol"], "USD");
        assert_eq!(commodity.data[0]["type_id"], 5);
        assert_eq!(commodity.data[0]["data_source_id"], 3);

        let person = pieces.iter().find(|p| p.table == "person").unwrap();
        assert_eq!(person.data[0]["email"], "reubano@gmail.com");
        assert_eq!(person.data[0]["phone"], "");
    }

    #[test]
    fn arity_mismatch_is_an_error() {
        let registry = discover_tables().unwrap();
        let bad = vec![vec![("exchange", vec![json!(["NYSE"])])]];
        assert!(matches!(process(&bad, &registry), Err(ConfigError::Load(_))));
    }

    #[test]
    fn pop_values_process() {
        let registry = discover_tables().unwrap();
        let pieces = process(&pop_values(), &registry).unwrap();
        assert_eq!(pieces[1].data[2]["commodity_id"], 10);
    }
}
