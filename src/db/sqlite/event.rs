//! Events table

use super::{timestamp_from_row, timestamp_to_sql};
use crate::db::filter::EVENT_ORDER_SQL;
use crate::db::{event_not_found, now, stock_not_found, EventFilter, Pagination};
use crate::error::{AppError, Result};
use crate::models::event::{DurationType, EventCategory, Impact};
use crate::models::{Event, EventCreate, EventUpdate};
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSqlOutput, Type, ValueRef};
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row, ToSql};

const EVENT_COLUMNS: &str = "id, title, description, start_time, end_time, level, stock_symbol, \
     sources, urls, duration_type, category, impact, created_at, updated_at";

macro_rules! sql_text_enum {
    ($($name:ident),+) => {
        $(
            impl ToSql for $name {
                fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
                    Ok(ToSqlOutput::from(self.as_str()))
                }
            }

            impl FromSql for $name {
                fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
                    value
                        .as_str()?
                        .parse()
                        .map_err(|e: AppError| FromSqlError::Other(Box::new(e)))
                }
            }
        )+
    };
}

sql_text_enum!(DurationType, EventCategory, Impact);

fn json_list_from_row(row: &Row<'_>, idx: usize) -> rusqlite::Result<Vec<String>> {
    let text: String = row.get(idx)?;
    serde_json::from_str(&text)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn row_to_event(row: &Row<'_>) -> rusqlite::Result<Event> {
    Ok(Event {
        id: row.get(0)?,
        title: row.get(1)?,
        description: row.get(2)?,
        start_time: row.get(3)?,
        end_time: row.get(4)?,
        level: row.get(5)?,
        stock_symbol: row.get(6)?,
        sources: json_list_from_row(row, 7)?,
        urls: json_list_from_row(row, 8)?,
        duration_type: row.get(9)?,
        category: row.get(10)?,
        impact: row.get(11)?,
        created_at: timestamp_from_row(row, 12)?,
        updated_at: timestamp_from_row(row, 13)?,
    })
}

fn stock_exists(conn: &Connection, symbol: &str) -> Result<bool> {
    let exists: bool = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM stocks WHERE symbol = ?)",
        [symbol],
        |row| row.get(0),
    )?;
    Ok(exists)
}

/// Get an event by id
pub fn get_event(conn: &Connection, id: &str) -> Result<Option<Event>> {
    let sql = format!("SELECT {} FROM events WHERE id = ?", EVENT_COLUMNS);
    Ok(conn.query_row(&sql, [id], row_to_event).optional()?)
}

/// Get events matching `filter`, newest first
pub fn get_events(conn: &Connection, filter: &EventFilter, page: Pagination) -> Result<Vec<Event>> {
    let clause = filter.to_sql();
    let sql = format!(
        "SELECT {} FROM events{} {} LIMIT ? OFFSET ?",
        EVENT_COLUMNS,
        clause.sql(),
        EVENT_ORDER_SQL
    );
    let mut values = clause.into_params();
    values.extend(page.sql_params());

    let mut stmt = conn.prepare(&sql)?;
    let events = stmt
        .query_map(params_from_iter(values.iter()), row_to_event)?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(events)
}

/// Insert a new event for an existing stock
pub fn create_event(conn: &Connection, input: EventCreate) -> Result<Event> {
    if !stock_exists(conn, &input.stock_symbol)? {
        return Err(stock_not_found(&input.stock_symbol));
    }

    let event = input.into_event(now());
    let sql = format!(
        "INSERT INTO events ({}) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        EVENT_COLUMNS
    );
    conn.execute(
        &sql,
        params![
            event.id,
            event.title,
            event.description,
            event.start_time,
            event.end_time,
            event.level,
            event.stock_symbol,
            serde_json::to_string(&event.sources)?,
            serde_json::to_string(&event.urls)?,
            event.duration_type,
            event.category,
            event.impact,
            timestamp_to_sql(&event.created_at),
            timestamp_to_sql(&event.updated_at),
        ],
    )?;

    Ok(event)
}

/// Merge `input` into the stored event and write every column back
pub fn update_event(conn: &mut Connection, id: &str, input: &EventUpdate) -> Result<Event> {
    let tx = conn.transaction()?;

    let existing = get_event(&tx, id)?.ok_or_else(|| event_not_found(id))?;
    let merged = input.apply_to(&existing, now())?;

    if merged.stock_symbol != existing.stock_symbol && !stock_exists(&tx, &merged.stock_symbol)? {
        return Err(stock_not_found(&merged.stock_symbol));
    }

    tx.execute(
        "UPDATE events SET
            title = ?, description = ?, start_time = ?, end_time = ?, level = ?,
            stock_symbol = ?, sources = ?, urls = ?, duration_type = ?, category = ?,
            impact = ?, updated_at = ?
         WHERE id = ?",
        params![
            merged.title,
            merged.description,
            merged.start_time,
            merged.end_time,
            merged.level,
            merged.stock_symbol,
            serde_json::to_string(&merged.sources)?,
            serde_json::to_string(&merged.urls)?,
            merged.duration_type,
            merged.category,
            merged.impact,
            timestamp_to_sql(&merged.updated_at),
            merged.id,
        ],
    )?;

    tx.commit()?;
    Ok(merged)
}

/// Delete an event, returning what was removed
pub fn delete_event(conn: &mut Connection, id: &str) -> Result<Event> {
    let tx = conn.transaction()?;

    let event = get_event(&tx, id)?.ok_or_else(|| event_not_found(id))?;
    tx.execute("DELETE FROM events WHERE id = ?", [id])?;

    tx.commit()?;
    Ok(event)
}
