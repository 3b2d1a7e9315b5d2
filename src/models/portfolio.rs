use super::base::ENTITY;
use crate::model::{ColumnDecl, ColumnDefault, EntityDecl, RelationDecl};

pub static PERSON: EntityDecl = EntityDecl {
    entity_name: "Person",
    doc: Some("Account owner"),
    columns: &[
        ColumnDecl::new("first_name", "VARCHAR(64)"),
        ColumnDecl::new("last_name", "VARCHAR(64)"),
        ColumnDecl::new("email", "VARCHAR(64)").unique(),
        ColumnDecl::new("phone", "VARCHAR(16)"),
        ColumnDecl::new("address", "VARCHAR(128)"),
        ColumnDecl::new("currency_id", "INTEGER").doc("Home currency"),
        ColumnDecl::new("monthly_income", "NUMERIC"),
        ColumnDecl::new("marginal_tax_rate", "NUMERIC"),
        ColumnDecl::new("net_worth", "NUMERIC"),
        ColumnDecl::new("full_name", "TEXT").computed("first_name || ' ' || last_name"),
    ],
    relations: &[
        RelationDecl::to_one("currency", "Commodity"),
        RelationDecl::to_many("accounts", "Account", "owner_id"),
    ],
    bases: &[&ENTITY],
};

pub static ACCOUNT: EntityDecl = EntityDecl {
    entity_name: "Account",
    doc: Some("Brokerage or retirement account"),
    columns: &[
        ColumnDecl::new("name", "VARCHAR(64)"),
        ColumnDecl::new("type_id", "INTEGER"),
        ColumnDecl::new("company_id", "INTEGER"),
        ColumnDecl::new("currency_id", "INTEGER"),
        ColumnDecl::new("owner_id", "INTEGER"),
        ColumnDecl::new("has_margin", "BOOLEAN"),
        ColumnDecl::new("balance", "NUMERIC"),
        ColumnDecl::new("trade_commission", "NUMERIC"),
    ],
    relations: &[
        RelationDecl::to_one("type", "AccountType"),
        RelationDecl::to_one("company", "Company"),
        RelationDecl::to_one("currency", "Commodity"),
        RelationDecl::to_one("owner", "Person"),
        RelationDecl::to_many("holdings", "Holding", "account_id"),
    ],
    bases: &[&ENTITY],
};

pub static HOLDING: EntityDecl = EntityDecl {
    entity_name: "Holding",
    doc: Some("Position in one commodity within an account"),
    columns: &[
        ColumnDecl::new("account_id", "INTEGER"),
        ColumnDecl::new("commodity_id", "INTEGER"),
        ColumnDecl::new("notes", "TEXT"),
    ],
    relations: &[
        RelationDecl::to_one("account", "Account"),
        RelationDecl::to_one("commodity", "Commodity"),
        RelationDecl::to_many("trxns", "Trxn", "holding_id"),
    ],
    bases: &[&ENTITY],
};

pub static TRXN: EntityDecl = EntityDecl {
    entity_name: "Trxn",
    doc: Some("Buy or sell against a holding"),
    columns: &[
        ColumnDecl::new("holding_id", "INTEGER"),
        ColumnDecl::new("type_id", "INTEGER"),
        ColumnDecl::new("date", "DATE").default(ColumnDefault::CurrentDate),
        ColumnDecl::new("shares", "NUMERIC"),
        ColumnDecl::new("price", "NUMERIC"),
        ColumnDecl::new("commission", "NUMERIC").default(ColumnDefault::Literal("0")),
    ],
    relations: &[
        RelationDecl::to_one("holding", "Holding"),
        RelationDecl::to_one("type", "TrxnType"),
    ],
    bases: &[&ENTITY],
};
