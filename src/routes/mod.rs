//! Router assembly: operational routes plus the planned table endpoints.

mod api;
mod common;
pub mod plan;

pub use api::{build_api, Api, ApiBuilder};
pub use common::common_routes;
pub use plan::{Endpoint, RouteSpec, TableRoutes};
