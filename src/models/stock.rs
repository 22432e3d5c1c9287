//! Stock and daily price models

use super::{deserialize_nullable, require_non_empty};
use crate::error::{AppError, Result};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

const MAX_SYMBOL_LEN: usize = 20;

/// Check that a symbol is usable as a primary key and as a partition file name.
pub fn validate_symbol(symbol: &str) -> Result<()> {
    if symbol.is_empty() || symbol.len() > MAX_SYMBOL_LEN {
        return Err(AppError::Validation(format!(
            "symbol must be 1-{} characters, got {:?}",
            MAX_SYMBOL_LEN, symbol
        )));
    }
    if symbol == "." || symbol == ".." {
        return Err(AppError::Validation(format!("invalid symbol {:?}", symbol)));
    }
    let allowed = |c: char| c.is_ascii_alphanumeric() || matches!(c, '.' | '^' | '=' | '_' | '-');
    if !symbol.chars().all(allowed) {
        return Err(AppError::Validation(format!(
            "symbol {:?} contains unsupported characters",
            symbol
        )));
    }
    Ok(())
}

/// Stock model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stock {
    pub symbol: String,
    pub name: String,
    pub market: String,
    pub sector: Option<String>,
    pub industry: Option<String>,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Create request for a stock
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StockCreate {
    pub symbol: String,
    pub name: String,
    pub market: String,
    #[serde(default)]
    pub sector: Option<String>,
    #[serde(default)]
    pub industry: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

impl StockCreate {
    pub fn validate(&self) -> Result<()> {
        validate_symbol(&self.symbol)?;
        require_non_empty("name", &self.name)?;
        require_non_empty("market", &self.market)
    }

    /// Build the stored entity, stamping both timestamps with `now`
    pub fn into_stock(self, now: DateTime<Utc>) -> Stock {
        Stock {
            symbol: self.symbol,
            name: self.name,
            market: self.market,
            sector: self.sector,
            industry: self.industry,
            description: self.description,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Partial update request for a stock; the symbol itself is immutable
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StockUpdate {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub market: Option<String>,
    #[serde(default, deserialize_with = "deserialize_nullable")]
    pub sector: Option<Option<String>>,
    #[serde(default, deserialize_with = "deserialize_nullable")]
    pub industry: Option<Option<String>>,
    #[serde(default, deserialize_with = "deserialize_nullable")]
    pub description: Option<Option<String>>,
}

impl StockUpdate {
    pub fn validate(&self) -> Result<()> {
        if let Some(name) = &self.name {
            require_non_empty("name", name)?;
        }
        if let Some(market) = &self.market {
            require_non_empty("market", market)?;
        }
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.market.is_none()
            && self.sector.is_none()
            && self.industry.is_none()
            && self.description.is_none()
    }

    /// Apply supplied fields to `stock` and refresh `updated_at`
    pub fn apply_to(&self, stock: &mut Stock, now: DateTime<Utc>) {
        if let Some(name) = &self.name {
            stock.name = name.clone();
        }
        if let Some(market) = &self.market {
            stock.market = market.clone();
        }
        if let Some(sector) = &self.sector {
            stock.sector = sector.clone();
        }
        if let Some(industry) = &self.industry {
            stock.industry = industry.clone();
        }
        if let Some(description) = &self.description {
            stock.description = description.clone();
        }
        stock.updated_at = now;
    }
}

/// One trading day of OHLCV data for a stock
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockPrice {
    pub stock_symbol: String,
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: i64,
}

/// Upsert request for a daily price
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StockPriceCreate {
    pub stock_symbol: String,
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: i64,
}

impl StockPriceCreate {
    pub fn validate(&self) -> Result<()> {
        validate_symbol(&self.stock_symbol)?;
        for (field, value) in [
            ("open", self.open),
            ("high", self.high),
            ("low", self.low),
            ("close", self.close),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(AppError::Validation(format!(
                    "{} must be a positive number, got {}",
                    field, value
                )));
            }
        }
        if self.volume < 0 {
            return Err(AppError::Validation(format!(
                "volume must be non-negative, got {}",
                self.volume
            )));
        }
        Ok(())
    }

    pub fn into_price(self) -> StockPrice {
        StockPrice {
            stock_symbol: self.stock_symbol,
            date: self.date,
            open: self.open,
            high: self.high,
            low: self.low,
            close: self.close,
            volume: self.volume,
        }
    }
}

/// Inclusive calendar-day window for price queries
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

impl DateRange {
    pub fn new(start: Option<NaiveDate>, end: Option<NaiveDate>) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start.map_or(true, |s| date >= s) && self.end.map_or(true, |e| date <= e)
    }
}
