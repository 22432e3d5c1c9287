//! Filtering, ordering and pagination shared by every backend
//!
//! Each filter has exactly one definition of its semantics. The file store
//! evaluates it in memory through `apply`; the SQLite store renders the same
//! predicates and ordering through `to_sql`. Parity between the two is
//! covered by tests in `tests/store_scenarios.rs`.

use crate::error::{AppError, Result};
use crate::models::event::{validate_level, DurationType, EventCategory, Impact};
use crate::models::{validate_symbol, Event, Stock};
use rusqlite::types::Value;
use std::cmp::Ordering;

pub const DEFAULT_LIMIT: i64 = 100;

/// Ordering applied to stocks in both backends
pub const STOCK_ORDER_SQL: &str = "ORDER BY symbol ASC";

/// Ordering applied to events in both backends; see [`compare_events`]
pub const EVENT_ORDER_SQL: &str = "ORDER BY start_time DESC, created_at ASC, id ASC";

/// `skip`/`limit` window applied after filtering and sorting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    skip: usize,
    limit: usize,
}

impl Pagination {
    /// Build from caller-supplied values; negatives are rejected
    pub fn new(skip: i64, limit: i64) -> Result<Self> {
        if skip < 0 {
            return Err(AppError::Validation(format!(
                "skip must be non-negative, got {}",
                skip
            )));
        }
        if limit < 0 {
            return Err(AppError::Validation(format!(
                "limit must be non-negative, got {}",
                limit
            )));
        }
        Ok(Self {
            skip: skip as usize,
            limit: limit as usize,
        })
    }

    pub fn skip(&self) -> usize {
        self.skip
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    pub fn apply<T>(&self, items: Vec<T>) -> Vec<T> {
        items.into_iter().skip(self.skip).take(self.limit).collect()
    }

    /// `LIMIT ? OFFSET ?` parameters
    pub(crate) fn sql_params(&self) -> [Value; 2] {
        [
            Value::Integer(self.limit.min(i64::MAX as usize) as i64),
            Value::Integer(self.skip.min(i64::MAX as usize) as i64),
        ]
    }
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            skip: 0,
            limit: DEFAULT_LIMIT as usize,
        }
    }
}

/// A rendered `WHERE` clause with positional parameters
#[derive(Debug, Default)]
pub(crate) struct SqlWhere {
    clauses: Vec<&'static str>,
    params: Vec<Value>,
}

impl SqlWhere {
    fn push(&mut self, clause: &'static str, param: Value) {
        self.clauses.push(clause);
        self.params.push(param);
    }

    /// `" WHERE a = ? AND b = ?"`, or empty when no filter applies
    pub(crate) fn sql(&self) -> String {
        if self.clauses.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", self.clauses.join(" AND "))
        }
    }

    pub(crate) fn into_params(self) -> Vec<Value> {
        self.params
    }
}

/// Optional equality filters on stocks
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StockFilter {
    pub market: Option<String>,
    pub sector: Option<String>,
    pub industry: Option<String>,
}

impl StockFilter {
    pub fn matches(&self, stock: &Stock) -> bool {
        self.market.as_ref().map_or(true, |m| &stock.market == m)
            && self
                .sector
                .as_ref()
                .map_or(true, |s| stock.sector.as_ref() == Some(s))
            && self
                .industry
                .as_ref()
                .map_or(true, |i| stock.industry.as_ref() == Some(i))
    }

    /// Filter, sort by symbol, then paginate
    pub fn apply(&self, stocks: Vec<Stock>, page: Pagination) -> Vec<Stock> {
        let mut matched: Vec<Stock> = stocks.into_iter().filter(|s| self.matches(s)).collect();
        matched.sort_by(|a, b| a.symbol.cmp(&b.symbol));
        page.apply(matched)
    }

    pub(crate) fn to_sql(&self) -> SqlWhere {
        let mut w = SqlWhere::default();
        if let Some(market) = &self.market {
            w.push("market = ?", Value::Text(market.clone()));
        }
        if let Some(sector) = &self.sector {
            w.push("sector = ?", Value::Text(sector.clone()));
        }
        if let Some(industry) = &self.industry {
            w.push("industry = ?", Value::Text(industry.clone()));
        }
        w
    }
}

/// Optional predicates on events.
///
/// `start_time`/`end_time` bound the event's own `start_time` (inclusive);
/// they are query bounds, not the event's end time.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventFilter {
    pub stock_symbol: Option<String>,
    pub min_level: Option<i32>,
    pub max_level: Option<i32>,
    pub start_time: Option<i64>,
    pub end_time: Option<i64>,
    pub duration_type: Option<DurationType>,
    pub category: Option<EventCategory>,
    pub impact: Option<Impact>,
}

impl EventFilter {
    pub fn for_symbol(symbol: impl Into<String>) -> Self {
        Self {
            stock_symbol: Some(symbol.into()),
            ..Default::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        if let Some(symbol) = &self.stock_symbol {
            validate_symbol(symbol)?;
        }
        if let Some(level) = self.min_level {
            validate_level("min_level", level)?;
        }
        if let Some(level) = self.max_level {
            validate_level("max_level", level)?;
        }
        Ok(())
    }

    pub fn matches(&self, event: &Event) -> bool {
        self.stock_symbol
            .as_ref()
            .map_or(true, |s| &event.stock_symbol == s)
            && self.min_level.map_or(true, |l| event.level >= l)
            && self.max_level.map_or(true, |l| event.level <= l)
            && self.start_time.map_or(true, |t| event.start_time >= t)
            && self.end_time.map_or(true, |t| event.start_time <= t)
            && self.duration_type.map_or(true, |d| event.duration_type == d)
            && self.category.map_or(true, |c| event.category == c)
            && self.impact.map_or(true, |i| event.impact == Some(i))
    }

    /// Filter, sort with [`compare_events`], then paginate
    pub fn apply(&self, events: Vec<Event>, page: Pagination) -> Vec<Event> {
        let mut matched: Vec<Event> = events.into_iter().filter(|e| self.matches(e)).collect();
        matched.sort_by(compare_events);
        page.apply(matched)
    }

    pub(crate) fn to_sql(&self) -> SqlWhere {
        let mut w = SqlWhere::default();
        if let Some(symbol) = &self.stock_symbol {
            w.push("stock_symbol = ?", Value::Text(symbol.clone()));
        }
        if let Some(level) = self.min_level {
            w.push("level >= ?", Value::Integer(level.into()));
        }
        if let Some(level) = self.max_level {
            w.push("level <= ?", Value::Integer(level.into()));
        }
        if let Some(t) = self.start_time {
            w.push("start_time >= ?", Value::Integer(t));
        }
        if let Some(t) = self.end_time {
            w.push("start_time <= ?", Value::Integer(t));
        }
        if let Some(d) = self.duration_type {
            w.push("duration_type = ?", Value::Text(d.as_str().to_string()));
        }
        if let Some(c) = self.category {
            w.push("category = ?", Value::Text(c.as_str().to_string()));
        }
        if let Some(i) = self.impact {
            w.push("impact = ?", Value::Text(i.as_str().to_string()));
        }
        w
    }
}

/// Newest `start_time` first; ties by `created_at` ascending, then by `id`.
pub fn compare_events(a: &Event, b: &Event) -> Ordering {
    b.start_time
        .cmp(&a.start_time)
        .then_with(|| a.created_at.cmp(&b.created_at))
        .then_with(|| a.id.cmp(&b.id))
}
