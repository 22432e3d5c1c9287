//! Data-access layer
//!
//! Two adapters implement the same repository contract:
//! - [`sqlite::SqliteDb`] - relational tables with foreign keys
//! - [`file::FileStore`] / [`file::FileEventStore`] - JSON documents
//!   partitioned by stock symbol
//!
//! [`Stores`] binds each entity type to one adapter at startup and is the
//! only entry point callers use.

pub mod file;
pub mod filter;
pub mod seed;
pub mod sqlite;
mod selector;

pub use filter::{EventFilter, Pagination, StockFilter};
pub use selector::Stores;

use crate::error::{AppError, Result};
use crate::models::{
    DateRange, Event, EventCreate, EventUpdate, Stock, StockCreate, StockPrice, StockPriceCreate,
    StockUpdate,
};
use chrono::{DateTime, SubsecRound, Utc};
use std::fmt;
use std::str::FromStr;

/// Which storage medium backs an entity type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Sqlite,
    File,
}

impl StoreBackend {
    pub fn as_str(&self) -> &'static str {
        match self {
            StoreBackend::Sqlite => "sqlite",
            StoreBackend::File => "file",
        }
    }
}

impl fmt::Display for StoreBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StoreBackend {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sqlite" | "database" | "db" => Ok(StoreBackend::Sqlite),
            "file" | "json" | "mock" => Ok(StoreBackend::File),
            other => Err(AppError::Config(format!(
                "unknown store backend {:?} (expected \"sqlite\" or \"file\")",
                other
            ))),
        }
    }
}

/// Stock and price persistence
pub trait StockRepository: Send + Sync {
    fn backend(&self) -> StoreBackend;

    fn get(&self, symbol: &str) -> Result<Option<Stock>>;

    /// Filtered stocks ordered by symbol
    fn get_multi(&self, filter: &StockFilter, page: Pagination) -> Result<Vec<Stock>>;

    /// Fails with `Conflict` when the symbol already exists
    fn create(&self, input: StockCreate) -> Result<Stock>;

    /// Fails with `NotFound` when the symbol does not exist
    fn update(&self, symbol: &str, input: &StockUpdate) -> Result<Stock>;

    /// Fails with `NotFound` when missing and `Conflict` while prices remain
    fn remove(&self, symbol: &str) -> Result<Stock>;

    /// Prices within `range`, oldest first
    fn get_prices(&self, symbol: &str, range: DateRange) -> Result<Vec<StockPrice>>;

    /// Insert or replace the price for `(stock_symbol, date)`
    fn upsert_price(&self, input: StockPriceCreate) -> Result<StockPrice>;

    /// Upsert every input in one write per call
    fn batch_upsert_prices(&self, inputs: Vec<StockPriceCreate>) -> Result<Vec<StockPrice>>;

    fn has_prices(&self, symbol: &str) -> Result<bool>;
}

/// Event persistence
pub trait EventRepository: Send + Sync {
    fn backend(&self) -> StoreBackend;

    fn get(&self, id: &str) -> Result<Option<Event>>;

    /// Filtered events ordered by [`filter::compare_events`]
    fn get_multi(&self, filter: &EventFilter, page: Pagination) -> Result<Vec<Event>>;

    /// Assigns a fresh id and timestamps
    fn create(&self, input: EventCreate) -> Result<Event>;

    /// Fails with `NotFound` when the id does not exist
    fn update(&self, id: &str, input: &EventUpdate) -> Result<Event>;

    /// Hard delete; fails with `NotFound` when the id does not exist
    fn remove(&self, id: &str) -> Result<Event>;
}

/// Current time at the precision both backends persist
pub(crate) fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

pub(crate) fn stock_not_found(symbol: &str) -> AppError {
    AppError::NotFound(format!("Stock with symbol {} not found", symbol))
}

pub(crate) fn event_not_found(id: &str) -> AppError {
    AppError::NotFound(format!("Event not found: {}", id))
}
