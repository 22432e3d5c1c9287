//! Stock and daily price tables

use super::{date_from_row, date_to_sql, timestamp_from_row, timestamp_to_sql};
use crate::db::filter::STOCK_ORDER_SQL;
use crate::db::{now, stock_not_found, Pagination, StockFilter};
use crate::error::{AppError, Result};
use crate::models::{DateRange, Stock, StockCreate, StockPrice, StockPriceCreate, StockUpdate};
use rusqlite::{params, params_from_iter, Connection, ErrorCode, OptionalExtension, Row};

const STOCK_COLUMNS: &str =
    "symbol, name, market, sector, industry, description, created_at, updated_at";

const PRICE_COLUMNS: &str = "stock_symbol, date, open, high, low, close, volume";

fn row_to_stock(row: &Row<'_>) -> rusqlite::Result<Stock> {
    Ok(Stock {
        symbol: row.get(0)?,
        name: row.get(1)?,
        market: row.get(2)?,
        sector: row.get(3)?,
        industry: row.get(4)?,
        description: row.get(5)?,
        created_at: timestamp_from_row(row, 6)?,
        updated_at: timestamp_from_row(row, 7)?,
    })
}

fn row_to_price(row: &Row<'_>) -> rusqlite::Result<StockPrice> {
    Ok(StockPrice {
        stock_symbol: row.get(0)?,
        date: date_from_row(row, 1)?,
        open: row.get(2)?,
        high: row.get(3)?,
        low: row.get(4)?,
        close: row.get(5)?,
        volume: row.get(6)?,
    })
}

fn is_constraint_violation(err: &rusqlite::Error) -> bool {
    matches!(err, rusqlite::Error::SqliteFailure(e, _) if e.code == ErrorCode::ConstraintViolation)
}

/// Get a stock by symbol
pub fn get_stock(conn: &Connection, symbol: &str) -> Result<Option<Stock>> {
    let sql = format!("SELECT {} FROM stocks WHERE symbol = ?", STOCK_COLUMNS);
    Ok(conn.query_row(&sql, [symbol], row_to_stock).optional()?)
}

/// Get stocks matching `filter`, ordered by symbol
pub fn get_stocks(conn: &Connection, filter: &StockFilter, page: Pagination) -> Result<Vec<Stock>> {
    let clause = filter.to_sql();
    let sql = format!(
        "SELECT {} FROM stocks{} {} LIMIT ? OFFSET ?",
        STOCK_COLUMNS,
        clause.sql(),
        STOCK_ORDER_SQL
    );
    let mut values = clause.into_params();
    values.extend(page.sql_params());

    let mut stmt = conn.prepare(&sql)?;
    let stocks = stmt
        .query_map(params_from_iter(values.iter()), row_to_stock)?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(stocks)
}

/// Insert a new stock
pub fn create_stock(conn: &Connection, input: StockCreate) -> Result<Stock> {
    let stock = input.into_stock(now());
    let sql = format!(
        "INSERT INTO stocks ({}) VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        STOCK_COLUMNS
    );

    conn.execute(
        &sql,
        params![
            stock.symbol,
            stock.name,
            stock.market,
            stock.sector,
            stock.industry,
            stock.description,
            timestamp_to_sql(&stock.created_at),
            timestamp_to_sql(&stock.updated_at),
        ],
    )
    .map_err(|e| {
        if is_constraint_violation(&e) {
            AppError::Conflict(format!("Stock with symbol {} already exists", stock.symbol))
        } else {
            e.into()
        }
    })?;

    Ok(stock)
}

/// Update the supplied fields of a stock
pub fn update_stock(conn: &Connection, symbol: &str, input: &StockUpdate) -> Result<Stock> {
    let mut updates = Vec::new();
    let mut params: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

    if let Some(name) = &input.name {
        updates.push("name = ?");
        params.push(Box::new(name.clone()));
    }
    if let Some(market) = &input.market {
        updates.push("market = ?");
        params.push(Box::new(market.clone()));
    }
    if let Some(sector) = &input.sector {
        updates.push("sector = ?");
        params.push(Box::new(sector.clone()));
    }
    if let Some(industry) = &input.industry {
        updates.push("industry = ?");
        params.push(Box::new(industry.clone()));
    }
    if let Some(description) = &input.description {
        updates.push("description = ?");
        params.push(Box::new(description.clone()));
    }

    if updates.is_empty() {
        return get_stock(conn, symbol)?.ok_or_else(|| stock_not_found(symbol));
    }

    updates.push("updated_at = ?");
    params.push(Box::new(timestamp_to_sql(&now())));

    let sql = format!("UPDATE stocks SET {} WHERE symbol = ?", updates.join(", "));
    params.push(Box::new(symbol.to_string()));

    let params_refs: Vec<&dyn rusqlite::ToSql> = params.iter().map(|p| p.as_ref()).collect();
    let rows = conn.execute(&sql, params_refs.as_slice())?;

    if rows == 0 {
        return Err(stock_not_found(symbol));
    }

    get_stock(conn, symbol)?.ok_or_else(|| stock_not_found(symbol))
}

/// Delete a stock, refusing while prices or events still reference it
pub fn delete_stock(conn: &mut Connection, symbol: &str) -> Result<Stock> {
    let tx = conn.transaction()?;

    let stock = get_stock(&tx, symbol)?.ok_or_else(|| stock_not_found(symbol))?;
    tx.execute("DELETE FROM stocks WHERE symbol = ?", [symbol])
        .map_err(|e| {
            if is_constraint_violation(&e) {
                AppError::Conflict(format!(
                    "Stock {} still has prices or events; delete them first",
                    symbol
                ))
            } else {
                e.into()
            }
        })?;

    tx.commit()?;
    Ok(stock)
}

/// Prices for a stock within `range`, oldest first
pub fn get_prices(conn: &Connection, symbol: &str, range: DateRange) -> Result<Vec<StockPrice>> {
    let mut sql = format!("SELECT {} FROM stock_prices WHERE stock_symbol = ?", PRICE_COLUMNS);
    let mut values = vec![symbol.to_string()];

    if let Some(start) = range.start {
        sql.push_str(" AND date >= ?");
        values.push(date_to_sql(&start));
    }
    if let Some(end) = range.end {
        sql.push_str(" AND date <= ?");
        values.push(date_to_sql(&end));
    }
    sql.push_str(" ORDER BY date ASC");

    let mut stmt = conn.prepare(&sql)?;
    let prices = stmt
        .query_map(params_from_iter(values.iter()), row_to_price)?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(prices)
}

/// Insert or replace one daily price
pub fn upsert_price(conn: &Connection, input: StockPriceCreate) -> Result<StockPrice> {
    if get_stock(conn, &input.stock_symbol)?.is_none() {
        return Err(stock_not_found(&input.stock_symbol));
    }

    let price = input.into_price();
    let sql = format!(
        "INSERT INTO stock_prices ({}) VALUES (?, ?, ?, ?, ?, ?, ?)
         ON CONFLICT(stock_symbol, date) DO UPDATE SET
            open = excluded.open,
            high = excluded.high,
            low = excluded.low,
            close = excluded.close,
            volume = excluded.volume",
        PRICE_COLUMNS
    );
    conn.execute(
        &sql,
        params![
            price.stock_symbol,
            date_to_sql(&price.date),
            price.open,
            price.high,
            price.low,
            price.close,
            price.volume,
        ],
    )?;

    Ok(price)
}

/// Upsert many prices in a single transaction; nothing is written on error
pub fn batch_upsert_prices(
    conn: &mut Connection,
    inputs: Vec<StockPriceCreate>,
) -> Result<Vec<StockPrice>> {
    let tx = conn.transaction()?;

    let mut stored = Vec::with_capacity(inputs.len());
    for input in inputs {
        stored.push(upsert_price(&tx, input)?);
    }

    tx.commit()?;
    Ok(stored)
}

pub fn has_prices(conn: &Connection, symbol: &str) -> Result<bool> {
    let exists: bool = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM stock_prices WHERE stock_symbol = ?)",
        [symbol],
        |row| row.get(0),
    )?;
    Ok(exists)
}
