use super::base::ENTITY;
use crate::model::{ColumnDecl, ColumnDefault, EntityDecl, RelationDecl};

pub static COMMODITY: EntityDecl = EntityDecl {
    entity_name: "Commodity",
    doc: Some("Tradable asset or currency"),
    columns: &[
        ColumnDecl::new("symbol", "VARCHAR(12)"),
        ColumnDecl::new("name", "VARCHAR(64)"),
        ColumnDecl::new("type_id", "INTEGER"),
        ColumnDecl::new("data_source_id", "INTEGER"),
        ColumnDecl::new("exchange_id", "INTEGER"),
    ],
    relations: &[
        RelationDecl::to_one("type", "CommodityType"),
        RelationDecl::to_one("data_source", "DataSource"),
        RelationDecl::to_one("exchange", "Exchange"),
        RelationDecl::to_many("prices", "Price", "commodity_id"),
        RelationDecl::to_many("holdings", "Holding", "commodity_id"),
    ],
    bases: &[&ENTITY],
};

pub static EVENT: EntityDecl = EntityDecl {
    entity_name: "Event",
    doc: Some("Corporate action such as a dividend or split"),
    columns: &[
        ColumnDecl::new("type_id", "INTEGER"),
        ColumnDecl::new("commodity_id", "INTEGER"),
        ColumnDecl::new("currency_id", "INTEGER"),
        ColumnDecl::new("value", "NUMERIC"),
        ColumnDecl::new("date", "DATE").doc("Effective date"),
    ],
    relations: &[
        RelationDecl::to_one("type", "EventType"),
        RelationDecl::to_one("commodity", "Commodity"),
        RelationDecl::to_one("currency", "Commodity").doc("Currency the value is denominated in"),
    ],
    bases: &[&ENTITY],
};

pub static PRICE: EntityDecl = EntityDecl {
    entity_name: "Price",
    doc: Some("Daily closing price"),
    columns: &[
        ColumnDecl::new("commodity_id", "INTEGER"),
        ColumnDecl::new("currency_id", "INTEGER"),
        ColumnDecl::new("date", "DATE").default(ColumnDefault::CurrentDate),
        ColumnDecl::new("close", "NUMERIC"),
    ],
    relations: &[
        RelationDecl::to_one("commodity", "Commodity"),
        RelationDecl::to_one("currency", "Commodity"),
    ],
    bases: &[&ENTITY],
};
