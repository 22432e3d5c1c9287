//! REST API over the stock, price and event stores
//!
//! Routes (prefix defaults to `/api`):
//! - `GET /health`
//! - `/stocks`, `/stocks/:symbol`
//! - `/stocks/:symbol/prices`, `/stocks/:symbol/prices/batch`
//! - `/stocks/:symbol/events`
//! - `/events`, `/events/:id`

pub mod handlers;
mod server;
mod types;

pub use server::{router, ApiServer};
pub use types::{EventListQuery, HealthResponse, PriceBody, PriceRangeQuery, StockListQuery};
