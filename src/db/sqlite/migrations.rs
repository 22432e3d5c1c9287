//! SQLite database migrations

use crate::error::Result;
use rusqlite::Connection;

/// Run all database migrations
pub fn run_migrations(conn: &Connection) -> Result<()> {
    // Create migrations table
    conn.execute(
        "CREATE TABLE IF NOT EXISTS migrations (
            id INTEGER PRIMARY KEY,
            name TEXT NOT NULL UNIQUE,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        )",
        [],
    )?;

    run_migration(conn, "001_stocks", CREATE_STOCKS_TABLE)?;
    run_migration(conn, "002_stock_prices", CREATE_STOCK_PRICES_TABLE)?;
    run_migration(conn, "003_events", CREATE_EVENTS_TABLE)?;

    tracing::debug!("Database migrations completed");
    Ok(())
}

fn run_migration(conn: &Connection, name: &str, sql: &str) -> Result<()> {
    let exists: bool = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM migrations WHERE name = ?)",
        [name],
        |row| row.get(0),
    )?;

    if !exists {
        tracing::info!("Running migration: {}", name);
        conn.execute_batch(sql)?;
        conn.execute("INSERT INTO migrations (name) VALUES (?)", [name])?;
    }

    Ok(())
}

const CREATE_STOCKS_TABLE: &str = r#"
CREATE TABLE stocks (
    symbol TEXT PRIMARY KEY NOT NULL,
    name TEXT NOT NULL,
    market TEXT NOT NULL,
    sector TEXT,
    industry TEXT,
    description TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);
CREATE INDEX idx_stocks_market ON stocks(market);
"#;

const CREATE_STOCK_PRICES_TABLE: &str = r#"
CREATE TABLE stock_prices (
    stock_symbol TEXT NOT NULL REFERENCES stocks(symbol) ON DELETE RESTRICT,
    date TEXT NOT NULL,
    open REAL NOT NULL CHECK (open > 0),
    high REAL NOT NULL CHECK (high > 0),
    low REAL NOT NULL CHECK (low > 0),
    close REAL NOT NULL CHECK (close > 0),
    volume INTEGER NOT NULL CHECK (volume >= 0),
    PRIMARY KEY (stock_symbol, date)
);
"#;

const CREATE_EVENTS_TABLE: &str = r#"
CREATE TABLE events (
    id TEXT PRIMARY KEY NOT NULL,
    title TEXT NOT NULL,
    description TEXT NOT NULL,
    start_time INTEGER NOT NULL,
    end_time INTEGER,
    level INTEGER NOT NULL CHECK (level BETWEEN 1 AND 5),
    stock_symbol TEXT NOT NULL REFERENCES stocks(symbol) ON DELETE RESTRICT,
    sources TEXT NOT NULL DEFAULT '[]',
    urls TEXT NOT NULL DEFAULT '[]',
    duration_type TEXT NOT NULL
        CHECK (duration_type IN ('continuous', 'temporary', 'sudden')),
    category TEXT NOT NULL
        CHECK (category IN ('company', 'industry', 'macroeconomic', 'market_sentiment')),
    impact TEXT CHECK (impact IS NULL OR impact IN ('positive', 'negative', 'neutral')),
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    CHECK (end_time IS NULL OR end_time >= start_time)
);
CREATE INDEX idx_events_stock_symbol ON events(stock_symbol);
CREATE INDEX idx_events_start_time ON events(start_time);
"#;
