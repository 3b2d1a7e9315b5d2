//! CrudService: generic CRUD using the safe SQL builder.

mod crud;
pub mod query;
mod validation;
pub use crud::{CrudService, ListPage, Listing};
pub use query::{ListArgs, SearchParams};
pub use validation::{coerce, parse_date, parse_datetime, RequestValidator};
