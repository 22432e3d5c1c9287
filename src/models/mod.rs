//! Entity models shared by every store backend
//!
//! Stocks are keyed by symbol, prices by `(stock_symbol, date)`, events by a
//! generated opaque id. Input types (`*Create`, `*Update`) carry their own
//! validation so bad requests are rejected before a store is touched.

pub mod event;
pub mod stock;

pub use event::{DurationType, Event, EventCategory, EventCreate, EventUpdate, Impact};
pub use stock::{
    validate_symbol, DateRange, Stock, StockCreate, StockPrice, StockPriceCreate, StockUpdate,
};

use serde::{Deserialize, Deserializer};

/// Deserialize a nullable field of a partial update.
///
/// Missing field -> `None` (leave unchanged, via `#[serde(default)]`),
/// explicit `null` -> `Some(None)` (clear), value -> `Some(Some(v))`.
pub(crate) fn deserialize_nullable<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

pub(crate) fn require_non_empty(field: &str, value: &str) -> crate::error::Result<()> {
    if value.trim().is_empty() {
        return Err(crate::error::AppError::Validation(format!(
            "{} must not be empty",
            field
        )));
    }
    Ok(())
}
