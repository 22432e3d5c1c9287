//! Startup-built binding from entity type to adapter

use super::file::{FileEventStore, FileStore};
use super::sqlite::SqliteDb;
use super::{
    event_not_found, stock_not_found, EventFilter, EventRepository, Pagination, StockFilter,
    StockRepository, StoreBackend,
};
use crate::config::StoreConfig;
use crate::error::{AppError, Result};
use crate::models::{
    validate_symbol, DateRange, Event, EventCreate, EventUpdate, Stock, StockCreate, StockPrice,
    StockPriceCreate, StockUpdate,
};
use std::sync::Arc;
use tracing::{debug, info};

/// The stores every request goes through.
///
/// Validates input, checks references between entity types and then
/// delegates to whichever adapter was configured for that type.
#[derive(Clone)]
pub struct Stores {
    stocks: Arc<dyn StockRepository>,
    events: Arc<dyn EventRepository>,
}

impl Stores {
    pub fn new(stocks: Arc<dyn StockRepository>, events: Arc<dyn EventRepository>) -> Self {
        Self { stocks, events }
    }

    /// Open the configured backends; one SQLite pool is shared when both
    /// entity types use it.
    pub fn from_config(config: &StoreConfig) -> Result<Self> {
        config.validate()?;

        let sqlite = if config.stock_backend == StoreBackend::Sqlite
            || config.event_backend == StoreBackend::Sqlite
        {
            Some(Arc::new(SqliteDb::new(&config.database_path, config.pool_size)?))
        } else {
            None
        };

        let stocks: Arc<dyn StockRepository> = match (config.stock_backend, &sqlite) {
            (StoreBackend::Sqlite, Some(db)) => db.clone(),
            _ => Arc::new(FileStore::new(&config.data_dir)?),
        };

        let events: Arc<dyn EventRepository> = match (config.event_backend, &sqlite) {
            (StoreBackend::Sqlite, Some(db)) => db.clone(),
            _ => Arc::new(FileEventStore::new(&config.data_dir, stocks.clone())?),
        };

        info!(
            "Stores ready: stocks={}, events={}",
            stocks.backend(),
            events.backend()
        );
        Ok(Self::new(stocks, events))
    }

    pub fn stock_backend(&self) -> StoreBackend {
        self.stocks.backend()
    }

    pub fn event_backend(&self) -> StoreBackend {
        self.events.backend()
    }

    // ========== Stocks ==========

    pub fn get_stock(&self, symbol: &str) -> Result<Stock> {
        validate_symbol(symbol)?;
        self.stocks.get(symbol)?.ok_or_else(|| stock_not_found(symbol))
    }

    pub fn get_stocks(&self, filter: &StockFilter, page: Pagination) -> Result<Vec<Stock>> {
        let stocks = self.stocks.get_multi(filter, page)?;
        debug!("Listed {} stocks", stocks.len());
        Ok(stocks)
    }

    pub fn create_stock(&self, input: StockCreate) -> Result<Stock> {
        input.validate()?;
        let stock = self.stocks.create(input)?;
        info!("Created stock {}", stock.symbol);
        Ok(stock)
    }

    pub fn update_stock(&self, symbol: &str, input: &StockUpdate) -> Result<Stock> {
        validate_symbol(symbol)?;
        input.validate()?;
        if input.is_empty() {
            return self.get_stock(symbol);
        }
        let stock = self.stocks.update(symbol, input)?;
        info!("Updated stock {}", symbol);
        Ok(stock)
    }

    /// Refused with `Conflict` while the stock has events or prices
    pub fn remove_stock(&self, symbol: &str) -> Result<Stock> {
        validate_symbol(symbol)?;
        if self.stocks.get(symbol)?.is_none() {
            return Err(stock_not_found(symbol));
        }

        let has_events = !self
            .events
            .get_multi(&EventFilter::for_symbol(symbol), Pagination::new(0, 1)?)?
            .is_empty();
        if has_events {
            return Err(AppError::Conflict(format!(
                "Stock {} still has events; delete them first",
                symbol
            )));
        }
        if self.stocks.has_prices(symbol)? {
            return Err(AppError::Conflict(format!(
                "Stock {} still has prices; delete them first",
                symbol
            )));
        }

        let stock = self.stocks.remove(symbol)?;
        info!("Deleted stock {}", symbol);
        Ok(stock)
    }

    // ========== Prices ==========

    pub fn get_prices(&self, symbol: &str, range: DateRange) -> Result<Vec<StockPrice>> {
        self.get_stock(symbol)?;
        self.stocks.get_prices(symbol, range)
    }

    pub fn upsert_price(&self, input: StockPriceCreate) -> Result<StockPrice> {
        input.validate()?;
        let price = self.stocks.upsert_price(input)?;
        debug!("Upserted price {} {}", price.stock_symbol, price.date);
        Ok(price)
    }

    /// Every input is validated before anything is written
    pub fn batch_upsert_prices(&self, inputs: Vec<StockPriceCreate>) -> Result<Vec<StockPrice>> {
        for input in &inputs {
            input.validate()?;
        }
        if inputs.is_empty() {
            return Ok(Vec::new());
        }
        let prices = self.stocks.batch_upsert_prices(inputs)?;
        info!("Upserted {} prices", prices.len());
        Ok(prices)
    }

    // ========== Events ==========

    pub fn get_event(&self, id: &str) -> Result<Event> {
        self.events.get(id)?.ok_or_else(|| event_not_found(id))
    }

    pub fn get_events(&self, filter: &EventFilter, page: Pagination) -> Result<Vec<Event>> {
        filter.validate()?;
        let events = self.events.get_multi(filter, page)?;
        debug!("Listed {} events", events.len());
        Ok(events)
    }

    pub fn create_event(&self, input: EventCreate) -> Result<Event> {
        input.validate()?;
        if self.stocks.get(&input.stock_symbol)?.is_none() {
            return Err(stock_not_found(&input.stock_symbol));
        }
        let event = self.events.create(input)?;
        info!("Created event {} for {}", event.id, event.stock_symbol);
        Ok(event)
    }

    pub fn update_event(&self, id: &str, input: &EventUpdate) -> Result<Event> {
        input.validate()?;
        if let Some(symbol) = &input.stock_symbol {
            if self.stocks.get(symbol)?.is_none() {
                return Err(stock_not_found(symbol));
            }
        }
        let event = self.events.update(id, input)?;
        info!("Updated event {}", id);
        Ok(event)
    }

    pub fn remove_event(&self, id: &str) -> Result<Event> {
        let event = self.events.remove(id)?;
        info!("Deleted event {}", id);
        Ok(event)
    }
}
