//! SQLite database module

mod event;
mod migrations;
mod stock;

use crate::db::{
    EventFilter, EventRepository, Pagination, StockFilter, StockRepository, StoreBackend,
};
use crate::error::Result;
use crate::models::{
    DateRange, Event, EventCreate, EventUpdate, Stock, StockCreate, StockPrice, StockPriceCreate,
    StockUpdate,
};
use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::types::Type;
use rusqlite::{Connection, Row};
use std::path::Path;

const DATE_FORMAT: &str = "%Y-%m-%d";

/// SQLite database wrapper backed by a connection pool
pub struct SqliteDb {
    pool: Pool<SqliteConnectionManager>,
}

impl SqliteDb {
    /// Open (or create) the database file at `path`
    pub fn new(path: &Path, pool_size: u32) -> Result<Self> {
        let manager = SqliteConnectionManager::file(path).with_init(configure_connection);
        let pool = Pool::builder().max_size(pool_size.max(1)).build(manager)?;

        {
            // Journal mode is a property of the file, set it once
            let conn = pool.get()?;
            conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")?;
        }

        let db = Self { pool };
        db.run_migrations()?;

        tracing::info!("SQLite store opened at {}", path.display());
        Ok(db)
    }

    /// Private in-memory database; a single pooled connection keeps it alive
    pub fn open_in_memory() -> Result<Self> {
        let manager = SqliteConnectionManager::memory().with_init(configure_connection);
        let pool = Pool::builder()
            .max_size(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .build(manager)?;

        let db = Self { pool };
        db.run_migrations()?;
        Ok(db)
    }

    /// Run database migrations
    fn run_migrations(&self) -> Result<()> {
        let conn = self.conn()?;
        migrations::run_migrations(&conn)
    }

    fn conn(&self) -> Result<PooledConnection<SqliteConnectionManager>> {
        Ok(self.pool.get()?)
    }
}

fn configure_connection(conn: &mut Connection) -> rusqlite::Result<()> {
    conn.execute_batch("PRAGMA foreign_keys=ON; PRAGMA busy_timeout=5000;")
}

impl StockRepository for SqliteDb {
    fn backend(&self) -> StoreBackend {
        StoreBackend::Sqlite
    }

    fn get(&self, symbol: &str) -> Result<Option<Stock>> {
        let conn = self.conn()?;
        stock::get_stock(&conn, symbol)
    }

    fn get_multi(&self, filter: &StockFilter, page: Pagination) -> Result<Vec<Stock>> {
        let conn = self.conn()?;
        stock::get_stocks(&conn, filter, page)
    }

    fn create(&self, input: StockCreate) -> Result<Stock> {
        let conn = self.conn()?;
        stock::create_stock(&conn, input)
    }

    fn update(&self, symbol: &str, input: &StockUpdate) -> Result<Stock> {
        let conn = self.conn()?;
        stock::update_stock(&conn, symbol, input)
    }

    fn remove(&self, symbol: &str) -> Result<Stock> {
        let mut conn = self.conn()?;
        stock::delete_stock(&mut conn, symbol)
    }

    fn get_prices(&self, symbol: &str, range: DateRange) -> Result<Vec<StockPrice>> {
        let conn = self.conn()?;
        stock::get_prices(&conn, symbol, range)
    }

    fn upsert_price(&self, input: StockPriceCreate) -> Result<StockPrice> {
        let conn = self.conn()?;
        stock::upsert_price(&conn, input)
    }

    fn batch_upsert_prices(&self, inputs: Vec<StockPriceCreate>) -> Result<Vec<StockPrice>> {
        let mut conn = self.conn()?;
        stock::batch_upsert_prices(&mut conn, inputs)
    }

    fn has_prices(&self, symbol: &str) -> Result<bool> {
        let conn = self.conn()?;
        stock::has_prices(&conn, symbol)
    }
}

impl EventRepository for SqliteDb {
    fn backend(&self) -> StoreBackend {
        StoreBackend::Sqlite
    }

    fn get(&self, id: &str) -> Result<Option<Event>> {
        let conn = self.conn()?;
        event::get_event(&conn, id)
    }

    fn get_multi(&self, filter: &EventFilter, page: Pagination) -> Result<Vec<Event>> {
        let conn = self.conn()?;
        event::get_events(&conn, filter, page)
    }

    fn create(&self, input: EventCreate) -> Result<Event> {
        let conn = self.conn()?;
        event::create_event(&conn, input)
    }

    fn update(&self, id: &str, input: &EventUpdate) -> Result<Event> {
        let mut conn = self.conn()?;
        event::update_event(&mut conn, id, input)
    }

    fn remove(&self, id: &str) -> Result<Event> {
        let mut conn = self.conn()?;
        event::delete_event(&mut conn, id)
    }
}

// ========== Column conversions ==========

/// Fixed-width RFC 3339 with microseconds, so text order is time order
pub(crate) fn timestamp_to_sql(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub(crate) fn timestamp_from_row(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let text: String = row.get(idx)?;
    DateTime::parse_from_rfc3339(&text)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

pub(crate) fn date_to_sql(date: &NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

pub(crate) fn date_from_row(row: &Row<'_>, idx: usize) -> rusqlite::Result<NaiveDate> {
    let text: String = row.get(idx)?;
    NaiveDate::parse_from_str(&text, DATE_FORMAT)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}
