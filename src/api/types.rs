//! Request and response types for the REST API
//!
//! Query strings carry enum values as plain strings; they are parsed here so
//! an unknown value is reported as a validation error naming the field.

use crate::db::{EventFilter, Pagination, StockFilter, StoreBackend};
use crate::error::{AppError, Result};
use crate::models::{DateRange, StockPriceCreate};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

fn pagination(skip: Option<i64>, limit: Option<i64>) -> Result<Pagination> {
    let defaults = Pagination::default();
    Pagination::new(
        skip.unwrap_or(defaults.skip() as i64),
        limit.unwrap_or(defaults.limit() as i64),
    )
}

fn parse_opt<T: FromStr<Err = AppError>>(value: Option<String>) -> Result<Option<T>> {
    value.map(|v| v.parse()).transpose()
}

/// `GET /stocks` query
#[derive(Debug, Default, Deserialize)]
pub struct StockListQuery {
    pub skip: Option<i64>,
    pub limit: Option<i64>,
    pub market: Option<String>,
    pub sector: Option<String>,
    pub industry: Option<String>,
}

impl StockListQuery {
    pub fn into_parts(self) -> Result<(StockFilter, Pagination)> {
        let page = pagination(self.skip, self.limit)?;
        let filter = StockFilter {
            market: self.market,
            sector: self.sector,
            industry: self.industry,
        };
        Ok((filter, page))
    }
}

/// `GET /events` and `GET /stocks/:symbol/events` query
#[derive(Debug, Default, Deserialize)]
pub struct EventListQuery {
    pub skip: Option<i64>,
    pub limit: Option<i64>,
    pub stock_symbol: Option<String>,
    pub min_level: Option<i32>,
    pub max_level: Option<i32>,
    pub start_time: Option<i64>,
    pub end_time: Option<i64>,
    pub duration_type: Option<String>,
    pub category: Option<String>,
    pub impact: Option<String>,
}

impl EventListQuery {
    pub fn into_parts(self) -> Result<(EventFilter, Pagination)> {
        let page = pagination(self.skip, self.limit)?;
        let filter = EventFilter {
            stock_symbol: self.stock_symbol,
            min_level: self.min_level,
            max_level: self.max_level,
            start_time: self.start_time,
            end_time: self.end_time,
            duration_type: parse_opt(self.duration_type)?,
            category: parse_opt(self.category)?,
            impact: parse_opt(self.impact)?,
        };
        Ok((filter, page))
    }
}

/// `GET /stocks/:symbol/prices` query
#[derive(Debug, Default, Deserialize)]
pub struct PriceRangeQuery {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

impl From<PriceRangeQuery> for DateRange {
    fn from(q: PriceRangeQuery) -> Self {
        DateRange::new(q.start_date, q.end_date)
    }
}

/// Price posted under a stock path; `stock_symbol` may be omitted
#[derive(Debug, Clone, Deserialize)]
pub struct PriceBody {
    #[serde(default)]
    pub stock_symbol: Option<String>,
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: i64,
}

impl PriceBody {
    pub fn for_symbol(self, symbol: &str) -> Result<StockPriceCreate> {
        if let Some(body_symbol) = &self.stock_symbol {
            if body_symbol != symbol {
                return Err(AppError::Validation(format!(
                    "stock_symbol {} does not match path symbol {}",
                    body_symbol, symbol
                )));
            }
        }
        Ok(StockPriceCreate {
            stock_symbol: symbol.to_string(),
            date: self.date,
            open: self.open,
            high: self.high,
            low: self.low,
            close: self.close,
            volume: self.volume,
        })
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub stock_store: String,
    pub event_store: String,
}

impl HealthResponse {
    pub fn ok(stock_store: StoreBackend, event_store: StoreBackend) -> Self {
        Self {
            status: "ok".to_string(),
            stock_store: stock_store.to_string(),
            event_store: event_store.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::event::EventCategory;

    #[test]
    fn test_event_query_parses_enums() {
        let query = EventListQuery {
            category: Some("industry".to_string()),
            limit: Some(5),
            ..Default::default()
        };
        let (filter, page) = query.into_parts().unwrap();
        assert_eq!(filter.category, Some(EventCategory::Industry));
        assert_eq!(page.limit(), 5);
        assert_eq!(page.skip(), 0);

        let bad = EventListQuery {
            impact: Some("bullish".to_string()),
            ..Default::default()
        };
        assert!(matches!(bad.into_parts(), Err(AppError::Validation(_))));
    }

    #[test]
    fn test_negative_skip_rejected() {
        let query = StockListQuery {
            skip: Some(-1),
            ..Default::default()
        };
        assert!(matches!(query.into_parts(), Err(AppError::Validation(_))));
    }

    #[test]
    fn test_price_body_symbol_must_match_path() {
        let body: PriceBody = serde_json::from_str(
            r#"{"date":"2024-01-02","open":1,"high":2,"low":0.5,"close":1.5,"volume":9}"#,
        )
        .unwrap();
        assert_eq!(body.clone().for_symbol("TST").unwrap().stock_symbol, "TST");

        let mut other = body;
        other.stock_symbol = Some("XYZ".to_string());
        assert!(other.for_symbol("TST").is_err());
    }
}
