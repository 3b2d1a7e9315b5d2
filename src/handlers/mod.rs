//! HTTP handlers for table endpoints and operational routes.

pub mod entity;
pub mod site;
