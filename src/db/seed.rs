//! Sample data for an empty store

use super::{Pagination, StockFilter, Stores};
use crate::error::Result;
use crate::models::event::{DurationType, EventCategory, Impact};
use crate::models::{EventCreate, StockCreate};

const DAY: i64 = 86_400;

struct SampleStock {
    symbol: &'static str,
    name: &'static str,
    market: &'static str,
    sector: &'static str,
    industry: &'static str,
    description: &'static str,
}

const SAMPLE_STOCKS: &[SampleStock] = &[
    SampleStock {
        symbol: "AAPL",
        name: "Apple Inc.",
        market: "NASDAQ",
        sector: "Technology",
        industry: "Consumer Electronics",
        description: "Designs, manufactures and markets smartphones, personal computers, \
                      tablets, wearables and accessories worldwide.",
    },
    SampleStock {
        symbol: "MSFT",
        name: "Microsoft Corporation",
        market: "NASDAQ",
        sector: "Technology",
        industry: "Software - Infrastructure",
        description: "Develops, licenses and supports software, services, devices and \
                      solutions worldwide.",
    },
    SampleStock {
        symbol: "AMZN",
        name: "Amazon.com, Inc.",
        market: "NASDAQ",
        sector: "Consumer Cyclical",
        industry: "Internet Retail",
        description: "Retail sale of consumer products and subscriptions in North America \
                      and internationally.",
    },
    SampleStock {
        symbol: "BABA",
        name: "Alibaba Group Holding Limited",
        market: "NYSE",
        sector: "Consumer Cyclical",
        industry: "Internet Retail",
        description: "Technology infrastructure and marketing reach for merchants, brands \
                      and retailers in China and internationally.",
    },
    SampleStock {
        symbol: "TSLA",
        name: "Tesla, Inc.",
        market: "NASDAQ",
        sector: "Consumer Cyclical",
        industry: "Auto Manufacturers",
        description: "Designs, develops, manufactures, leases and sells electric vehicles \
                      and energy generation and storage systems.",
    },
];

/// (symbol, title, description, days ago, days until end, level, duration, category, impact)
type SampleEvent = (
    &'static str,
    &'static str,
    &'static str,
    i64,
    Option<i64>,
    i32,
    DurationType,
    EventCategory,
    Impact,
);

const SAMPLE_EVENTS: &[SampleEvent] = &[
    (
        "AAPL",
        "Q2 earnings release",
        "Net profit up 20% year over year, ahead of market expectations.",
        7,
        None,
        4,
        DurationType::Temporary,
        EventCategory::Company,
        Impact::Positive,
    ),
    (
        "AAPL",
        "Product launch announced",
        "A launch event next month is expected to introduce several new products.",
        3,
        Some(14),
        3,
        DurationType::Continuous,
        EventCategory::Company,
        Impact::Positive,
    ),
    (
        "AAPL",
        "Competition intensifies",
        "A major competitor shipped a comparable product; market share may fall.",
        5,
        None,
        2,
        DurationType::Continuous,
        EventCategory::Industry,
        Impact::Negative,
    ),
    (
        "MSFT",
        "Central bank rate cut",
        "The central bank cut rates, a likely tailwind for the technology sector.",
        10,
        None,
        3,
        DurationType::Sudden,
        EventCategory::Macroeconomic,
        Impact::Positive,
    ),
    (
        "MSFT",
        "Market sentiment swings",
        "International tensions left investors cautious and sentiment volatile.",
        2,
        None,
        2,
        DurationType::Temporary,
        EventCategory::MarketSentiment,
        Impact::Neutral,
    ),
];

/// Seed sample stocks and events when no stock exists yet.
///
/// Goes through [`Stores`] so validation applies whatever the backend.
/// Returns the number of records created.
pub fn seed_sample_data(stores: &Stores) -> Result<usize> {
    let existing = stores.get_stocks(&StockFilter::default(), Pagination::new(0, 1)?)?;
    if !existing.is_empty() {
        tracing::debug!("Store already has stocks, skipping sample data");
        return Ok(0);
    }

    let mut created = 0;
    for s in SAMPLE_STOCKS {
        stores.create_stock(StockCreate {
            symbol: s.symbol.to_string(),
            name: s.name.to_string(),
            market: s.market.to_string(),
            sector: Some(s.sector.to_string()),
            industry: Some(s.industry.to_string()),
            description: Some(s.description.to_string()),
        })?;
        created += 1;
    }

    let now = chrono::Utc::now().timestamp();
    for &(symbol, title, description, days_ago, ends_in, level, duration_type, category, impact) in
        SAMPLE_EVENTS
    {
        stores.create_event(EventCreate {
            title: title.to_string(),
            description: description.to_string(),
            start_time: now - days_ago * DAY,
            end_time: ends_in.map(|days| now + days * DAY),
            level,
            stock_symbol: symbol.to_string(),
            sources: vec!["Company filings".to_string(), "Financial news".to_string()],
            urls: vec![format!("https://example.com/news/{}", symbol.to_lowercase())],
            duration_type,
            category,
            impact: Some(impact),
        })?;
        created += 1;
    }

    tracing::info!("Seeded {} sample records", created);
    Ok(created)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StoreConfig;
    use crate::db::EventFilter;

    #[test]
    fn test_seed_once() {
        let dir = tempfile::tempdir().unwrap();
        let stores = Stores::from_config(&StoreConfig::file(dir.path())).unwrap();

        let created = seed_sample_data(&stores).unwrap();
        assert_eq!(created, SAMPLE_STOCKS.len() + SAMPLE_EVENTS.len());
        assert_eq!(seed_sample_data(&stores).unwrap(), 0);

        let aapl = stores
            .get_events(&EventFilter::for_symbol("AAPL"), Pagination::default())
            .unwrap();
        assert_eq!(aapl.len(), 3);
        assert!(aapl.windows(2).all(|w| w[0].start_time >= w[1].start_time));
    }
}
