//! Application entities and the explicit registration list.
//!
//! `ALL` is ordered parents-before-dependents: tables are created and seeded in this order
//! and dropped in reverse.

mod base;
mod market;
mod portfolio;
mod reference;

use crate::model::EntityDecl;

pub use base::ENTITY;
pub use market::{COMMODITY, EVENT, PRICE};
pub use portfolio::{ACCOUNT, HOLDING, PERSON, TRXN};
pub use reference::{
    ACCOUNT_TYPE, COMMODITY_GROUP, COMMODITY_TYPE, COMPANY, DATA_SOURCE, EVENT_TYPE, EXCHANGE, TRXN_TYPE,
};

pub static ALL: &[&EntityDecl] = &[
    &EXCHANGE,
    &ACCOUNT_TYPE,
    &COMMODITY_GROUP,
    &COMPANY,
    &DATA_SOURCE,
    &EVENT_TYPE,
    &TRXN_TYPE,
    &COMMODITY_TYPE,
    &COMMODITY,
    &EVENT,
    &PRICE,
    &PERSON,
    &ACCOUNT,
    &HOLDING,
    &TRXN,
];
