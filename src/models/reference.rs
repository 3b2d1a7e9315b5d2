//! Lookup tables: loaded first, referenced by everything else.

use super::base::ENTITY;
use crate::model::{ColumnDecl, EntityDecl, RelationDecl};

pub static EXCHANGE: EntityDecl = EntityDecl {
    entity_name: "Exchange",
    doc: Some("Market on which commodities trade"),
    columns: &[
        ColumnDecl::new("name", "VARCHAR(64)"),
        ColumnDecl::new("symbol", "VARCHAR(12)"),
    ],
    relations: &[RelationDecl::to_many("commodities", "Commodity", "exchange_id")],
    bases: &[&ENTITY],
};

pub static ACCOUNT_TYPE: EntityDecl = EntityDecl {
    entity_name: "AccountType",
    doc: Some("Kind of brokerage or retirement account"),
    columns: &[
        ColumnDecl::new("name", "VARCHAR(64)"),
        ColumnDecl::new("is_tax_deferred", "BOOLEAN"),
    ],
    relations: &[RelationDecl::to_many("accounts", "Account", "type_id")],
    bases: &[&ENTITY],
};

pub static COMMODITY_GROUP: EntityDecl = EntityDecl {
    entity_name: "CommodityGroup",
    doc: Some("Top level commodity grouping, e.g. security or currency"),
    columns: &[ColumnDecl::new("name", "VARCHAR(64)")],
    relations: &[RelationDecl::to_many("types", "CommodityType", "group_id")],
    bases: &[&ENTITY],
};

pub static COMPANY: EntityDecl = EntityDecl {
    entity_name: "Company",
    doc: Some("Institution holding accounts"),
    columns: &[
        ColumnDecl::new("name", "VARCHAR(64)"),
        ColumnDecl::new("website", "VARCHAR(128)"),
        ColumnDecl::new("phone", "VARCHAR(16)"),
        ColumnDecl::new("address", "VARCHAR(128)"),
        ColumnDecl::new("city", "VARCHAR(64)"),
        ColumnDecl::new("state", "VARCHAR(32)"),
        ColumnDecl::new("zip_code", "VARCHAR(16)"),
    ],
    relations: &[RelationDecl::to_many("accounts", "Account", "company_id")],
    bases: &[&ENTITY],
};

pub static DATA_SOURCE: EntityDecl = EntityDecl {
    entity_name: "DataSource",
    doc: Some("Provider of price and event data"),
    columns: &[ColumnDecl::new("name", "VARCHAR(64)")],
    relations: &[RelationDecl::to_many("commodities", "Commodity", "data_source_id")],
    bases: &[&ENTITY],
};

pub static EVENT_TYPE: EntityDecl = EntityDecl {
    entity_name: "EventType",
    doc: None,
    columns: &[ColumnDecl::new("name", "VARCHAR(64)")],
    relations: &[RelationDecl::to_many("events", "Event", "type_id")],
    bases: &[&ENTITY],
};

pub static TRXN_TYPE: EntityDecl = EntityDecl {
    entity_name: "TrxnType",
    doc: None,
    columns: &[
        ColumnDecl::new("name", "VARCHAR(64)"),
        ColumnDecl::new("symbol", "VARCHAR(12)"),
    ],
    relations: &[RelationDecl::to_many("trxns", "Trxn", "type_id")],
    bases: &[&ENTITY],
};

pub static COMMODITY_TYPE: EntityDecl = EntityDecl {
    entity_name: "CommodityType",
    doc: Some("Commodity classification within a group, e.g. stock or bond"),
    columns: &[
        ColumnDecl::new("name", "VARCHAR(64)"),
        ColumnDecl::new("group_id", "INTEGER"),
    ],
    relations: &[
        RelationDecl::to_one("group", "CommodityGroup"),
        RelationDecl::to_many("commodities", "Commodity", "type_id"),
    ],
    bases: &[&ENTITY],
};
