//! Behaviour every backend combination must share

use chrono::NaiveDate;
use stock_events::config::StoreConfig;
use stock_events::db::{EventFilter, Pagination, StockFilter, StoreBackend, Stores};
use stock_events::error::AppError;
use stock_events::models::{
    DateRange, DurationType, Event, EventCategory, EventCreate, EventUpdate, Impact, StockCreate,
    StockPriceCreate, StockUpdate,
};
use tempfile::TempDir;

struct Backend {
    name: &'static str,
    dir: TempDir,
    stores: Stores,
}

fn open(name: &'static str, stocks: StoreBackend, events: StoreBackend) -> Backend {
    let dir = tempfile::tempdir().unwrap();
    let mut config = StoreConfig::file(dir.path().join("data"));
    config.stock_backend = stocks;
    config.event_backend = events;
    config.database_path = dir.path().join("stock_events.db");
    config.pool_size = 2;
    let stores = Stores::from_config(&config).unwrap();
    Backend { name, dir, stores }
}

fn backends() -> Vec<Backend> {
    vec![
        open("file", StoreBackend::File, StoreBackend::File),
        open("sqlite", StoreBackend::Sqlite, StoreBackend::Sqlite),
        open("mixed", StoreBackend::Sqlite, StoreBackend::File),
    ]
}

fn stock(symbol: &str, market: &str, sector: Option<&str>) -> StockCreate {
    StockCreate {
        symbol: symbol.to_string(),
        name: format!("{} Corp", symbol),
        market: market.to_string(),
        sector: sector.map(str::to_string),
        industry: None,
        description: None,
    }
}

fn event(symbol: &str, title: &str, start_time: i64, level: i32) -> EventCreate {
    EventCreate {
        title: title.to_string(),
        description: format!("{} description", title),
        start_time,
        end_time: None,
        level,
        stock_symbol: symbol.to_string(),
        sources: vec![],
        urls: vec![],
        duration_type: DurationType::Sudden,
        category: EventCategory::Company,
        impact: None,
    }
}

fn price(symbol: &str, day: u32, close: f64) -> StockPriceCreate {
    StockPriceCreate {
        stock_symbol: symbol.to_string(),
        date: NaiveDate::from_ymd_opt(2024, 2, day).unwrap(),
        open: 100.0,
        high: 110.0,
        low: 95.0,
        close,
        volume: 1_000_000,
    }
}

fn titles(events: &[Event]) -> Vec<&str> {
    events.iter().map(|e| e.title.as_str()).collect()
}

fn page(skip: i64, limit: i64) -> Pagination {
    Pagination::new(skip, limit).unwrap()
}

#[test]
fn tst_scenario() {
    for b in backends() {
        let stores = &b.stores;
        stores.create_stock(stock("TST", "US", None)).unwrap();

        let first = stores.create_event(event("TST", "X", 1000, 3)).unwrap();
        let listed = stores
            .get_events(&EventFilter::for_symbol("TST"), Pagination::default())
            .unwrap();
        assert_eq!(listed.len(), 1, "{}", b.name);
        assert_eq!(listed[0].impact, None, "{}", b.name);

        stores.create_event(event("TST", "Y", 2000, 3)).unwrap();
        let times: Vec<i64> = stores
            .get_events(&EventFilter::for_symbol("TST"), Pagination::default())
            .unwrap()
            .iter()
            .map(|e| e.start_time)
            .collect();
        assert_eq!(times, vec![2000, 1000], "{}", b.name);

        let update = EventUpdate {
            title: Some("Z".to_string()),
            ..Default::default()
        };
        assert!(
            matches!(stores.update_event("no-such-id", &update), Err(AppError::NotFound(_))),
            "{}",
            b.name
        );
        assert_eq!(stores.get_event(&first.id).unwrap().title, "X", "{}", b.name);

        let dup = stores.create_stock(stock("TST", "HK", None));
        assert!(matches!(dup, Err(AppError::Conflict(_))), "{}", b.name);
        let all = stores
            .get_stocks(&StockFilter::default(), Pagination::default())
            .unwrap();
        assert_eq!(all.len(), 1, "{}", b.name);
        assert_eq!(all[0].market, "US", "{}", b.name);
    }
}

#[test]
fn round_trip_preserves_fields() {
    for b in backends() {
        let stores = &b.stores;
        let created_stock = stores
            .create_stock(stock("RT", "NYSE", Some("Energy")))
            .unwrap();
        assert_eq!(created_stock.created_at, created_stock.updated_at);
        assert_eq!(stores.get_stock("RT").unwrap(), created_stock, "{}", b.name);

        let mut input = event("RT", "Full", 500, 5);
        input.end_time = Some(900);
        input.sources = vec!["Wire".to_string(), "Filing".to_string()];
        input.urls = vec!["https://example.com/1".to_string()];
        input.duration_type = DurationType::Continuous;
        input.category = EventCategory::MarketSentiment;
        input.impact = Some(Impact::Neutral);

        let created = stores.create_event(input).unwrap();
        assert!(!created.id.is_empty());
        assert_eq!(created.created_at, created.updated_at);
        assert_eq!(stores.get_event(&created.id).unwrap(), created, "{}", b.name);
    }
}

#[test]
fn level_out_of_range_is_rejected_and_not_stored() {
    for b in backends() {
        let stores = &b.stores;
        stores.create_stock(stock("LVL", "US", None)).unwrap();
        for level in [0, 6] {
            let err = stores.create_event(event("LVL", "bad", 1, level)).unwrap_err();
            assert!(matches!(err, AppError::Validation(_)), "{}", b.name);
        }
        let created = stores.create_event(event("LVL", "ok", 1, 2)).unwrap();
        let update = EventUpdate {
            level: Some(9),
            ..Default::default()
        };
        assert!(matches!(
            stores.update_event(&created.id, &update),
            Err(AppError::Validation(_))
        ));
        let stored = stores
            .get_events(&EventFilter::default(), Pagination::default())
            .unwrap();
        assert_eq!(titles(&stored), vec!["ok"], "{}", b.name);
        assert_eq!(stored[0].level, 2);
    }
}

#[test]
fn skip_past_end_is_empty() {
    for b in backends() {
        let stores = &b.stores;
        for symbol in ["A1", "A2", "A3"] {
            stores.create_stock(stock(symbol, "US", None)).unwrap();
            stores.create_event(event(symbol, symbol, 10, 1)).unwrap();
        }
        assert!(stores
            .get_stocks(&StockFilter::default(), page(3, 10))
            .unwrap()
            .is_empty());
        assert!(stores
            .get_events(&EventFilter::default(), page(7, 10))
            .unwrap()
            .is_empty());
        assert!(stores
            .get_events(&EventFilter::default(), page(0, 0))
            .unwrap()
            .is_empty());
    }
}

#[test]
fn upsert_same_day_keeps_latest() {
    for b in backends() {
        let stores = &b.stores;
        stores.create_stock(stock("PX", "US", None)).unwrap();
        stores.upsert_price(price("PX", 1, 101.0)).unwrap();
        stores.upsert_price(price("PX", 1, 102.5)).unwrap();

        let prices = stores.get_prices("PX", DateRange::default()).unwrap();
        assert_eq!(prices.len(), 1, "{}", b.name);
        assert_eq!(prices[0].close, 102.5, "{}", b.name);

        assert!(matches!(
            stores.upsert_price(price("NOPE", 1, 1.0)),
            Err(AppError::NotFound(_))
        ));
    }
}

#[test]
fn batch_prices_and_ranges() {
    for b in backends() {
        let stores = &b.stores;
        stores.create_stock(stock("BT", "US", None)).unwrap();
        let stored = stores
            .batch_upsert_prices(vec![price("BT", 5, 5.0), price("BT", 1, 1.0), price("BT", 3, 3.0)])
            .unwrap();
        assert_eq!(stored.len(), 3);

        let d = |day| NaiveDate::from_ymd_opt(2024, 2, day).unwrap();
        let ranged = stores
            .get_prices("BT", DateRange::new(Some(d(2)), Some(d(5))))
            .unwrap();
        let closes: Vec<f64> = ranged.iter().map(|p| p.close).collect();
        assert_eq!(closes, vec![3.0, 5.0], "{}", b.name);

        let inverted = stores
            .get_prices("BT", DateRange::new(Some(d(5)), Some(d(1))))
            .unwrap();
        assert!(inverted.is_empty(), "{}", b.name);

        let mut bad = price("BT", 9, 1.0);
        bad.volume = -1;
        assert!(matches!(
            stores.batch_upsert_prices(vec![price("BT", 8, 8.0), bad]),
            Err(AppError::Validation(_))
        ));
        assert_eq!(stores.get_prices("BT", DateRange::default()).unwrap().len(), 3);
    }
}

#[test]
fn filters_match_across_backends() {
    let mut results: Vec<(&'static str, Vec<Vec<String>>)> = Vec::new();

    for b in backends() {
        let stores = &b.stores;
        stores.create_stock(stock("AAA", "US", Some("Tech"))).unwrap();
        stores.create_stock(stock("BBB", "HK", Some("Retail"))).unwrap();
        stores.create_stock(stock("CCC", "US", None)).unwrap();

        let specs = [
            ("AAA", "a1", 100, 1, DurationType::Sudden, EventCategory::Company, None),
            ("AAA", "a2", 300, 3, DurationType::Temporary, EventCategory::Industry, Some(Impact::Positive)),
            ("AAA", "a3", 300, 5, DurationType::Continuous, EventCategory::Company, Some(Impact::Negative)),
            ("BBB", "b1", 200, 2, DurationType::Sudden, EventCategory::Macroeconomic, Some(Impact::Neutral)),
            ("BBB", "b2", 400, 4, DurationType::Temporary, EventCategory::MarketSentiment, None),
            ("CCC", "c1", 250, 3, DurationType::Sudden, EventCategory::Company, Some(Impact::Positive)),
        ];
        for (symbol, title, start, level, duration_type, category, impact) in specs {
            let mut input = event(symbol, title, start, level);
            input.duration_type = duration_type;
            input.category = category;
            input.impact = impact;
            stores.create_event(input).unwrap();
        }

        let filters = vec![
            EventFilter::default(),
            EventFilter::for_symbol("AAA"),
            EventFilter {
                min_level: Some(3),
                max_level: Some(4),
                ..Default::default()
            },
            EventFilter {
                start_time: Some(200),
                end_time: Some(300),
                ..Default::default()
            },
            EventFilter {
                start_time: Some(300),
                end_time: Some(200),
                ..Default::default()
            },
            EventFilter {
                duration_type: Some(DurationType::Sudden),
                ..Default::default()
            },
            EventFilter {
                category: Some(EventCategory::Company),
                impact: Some(Impact::Positive),
                ..Default::default()
            },
            EventFilter {
                min_level: Some(4),
                max_level: Some(2),
                ..Default::default()
            },
        ];

        let mut outputs: Vec<Vec<String>> = filters
            .iter()
            .map(|f| {
                titles(&stores.get_events(f, Pagination::default()).unwrap())
                    .into_iter()
                    .map(str::to_string)
                    .collect()
            })
            .collect();

        outputs.push(
            titles(&stores.get_events(&EventFilter::default(), page(1, 2)).unwrap())
                .into_iter()
                .map(str::to_string)
                .collect(),
        );

        let us = StockFilter {
            market: Some("US".to_string()),
            ..Default::default()
        };
        let retail = StockFilter {
            sector: Some("Retail".to_string()),
            ..Default::default()
        };
        for f in [us, retail] {
            outputs.push(
                stores
                    .get_stocks(&f, Pagination::default())
                    .unwrap()
                    .into_iter()
                    .map(|s| s.symbol)
                    .collect(),
            );
        }

        results.push((b.name, outputs));
    }

    let (_, expected) = &results[0];
    assert_eq!(expected[0], vec!["b2", "a2", "a3", "c1", "b1", "a1"]);
    assert_eq!(expected[1], vec!["a2", "a3", "a1"]);
    assert_eq!(expected[3], vec!["a2", "a3", "c1", "b1"]);
    assert!(expected[4].is_empty());
    assert!(expected[7].is_empty());
    assert_eq!(expected[8], vec!["a2", "a3"]);
    assert_eq!(expected[9], vec!["AAA", "CCC"]);
    for (name, outputs) in &results[1..] {
        assert_eq!(outputs, expected, "{} differs from file backend", name);
    }
}

#[test]
fn delete_with_dependents_is_conflict() {
    for b in backends() {
        let stores = &b.stores;
        stores.create_stock(stock("EV", "US", None)).unwrap();
        stores.create_stock(stock("PR", "US", None)).unwrap();
        let ev = stores.create_event(event("EV", "e", 1, 1)).unwrap();
        stores.upsert_price(price("PR", 1, 1.0)).unwrap();

        assert!(matches!(stores.remove_stock("EV"), Err(AppError::Conflict(_))), "{}", b.name);
        assert!(matches!(stores.remove_stock("PR"), Err(AppError::Conflict(_))), "{}", b.name);

        assert_eq!(stores.remove_event(&ev.id).unwrap().id, ev.id);
        assert_eq!(stores.remove_stock("EV").unwrap().symbol, "EV");
        assert!(matches!(stores.remove_stock("EV"), Err(AppError::NotFound(_))));
        assert!(matches!(stores.get_event(&ev.id), Err(AppError::NotFound(_))));
    }
}

#[test]
fn event_updates_move_between_stocks() {
    for b in backends() {
        let stores = &b.stores;
        stores.create_stock(stock("OLD", "US", None)).unwrap();
        stores.create_stock(stock("NEW", "US", None)).unwrap();
        let mut input = event("OLD", "moving", 100, 2);
        input.impact = Some(Impact::Positive);
        input.end_time = Some(150);
        let created = stores.create_event(input).unwrap();

        let update: EventUpdate =
            serde_json::from_str(r#"{"stock_symbol":"NEW","impact":null,"end_time":null}"#).unwrap();
        let updated = stores.update_event(&created.id, &update).unwrap();
        assert_eq!(updated.stock_symbol, "NEW");
        assert_eq!(updated.impact, None);
        assert_eq!(updated.end_time, None);
        assert_eq!(updated.created_at, created.created_at);
        assert!(updated.updated_at >= created.updated_at);

        assert!(stores
            .get_events(&EventFilter::for_symbol("OLD"), Pagination::default())
            .unwrap()
            .is_empty());
        assert_eq!(
            stores
                .get_events(&EventFilter::for_symbol("NEW"), Pagination::default())
                .unwrap(),
            vec![updated.clone()],
            "{}",
            b.name
        );

        let to_missing = EventUpdate {
            stock_symbol: Some("GONE".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            stores.update_event(&created.id, &to_missing),
            Err(AppError::NotFound(_))
        ));

        let bad_span = EventUpdate {
            end_time: Some(Some(50)),
            ..Default::default()
        };
        assert!(matches!(
            stores.update_event(&created.id, &bad_span),
            Err(AppError::Validation(_))
        ));
        assert_eq!(stores.get_event(&created.id).unwrap(), updated);
    }
}

#[test]
fn stock_partial_update() {
    for b in backends() {
        let stores = &b.stores;
        stores
            .create_stock(stock("UPD", "US", Some("Tech")))
            .unwrap();
        let update: StockUpdate =
            serde_json::from_str(r#"{"description":"Makes things","sector":null}"#).unwrap();
        let updated = stores.update_stock("UPD", &update).unwrap();
        assert_eq!(updated.description.as_deref(), Some("Makes things"));
        assert_eq!(updated.sector, None);
        assert_eq!(updated.market, "US");
        assert_eq!(stores.get_stock("UPD").unwrap(), updated, "{}", b.name);
        assert!(matches!(
            stores.update_stock("MISSING", &update),
            Err(AppError::NotFound(_))
        ));
    }
}

#[test]
fn empty_stock_update_changes_nothing() {
    for b in backends() {
        let stores = &b.stores;
        let created = stores.create_stock(stock("NOOP", "US", Some("Tech"))).unwrap();
        std::thread::sleep(std::time::Duration::from_millis(5));

        let unchanged = stores.update_stock("NOOP", &StockUpdate::default()).unwrap();
        assert_eq!(unchanged, created, "{}", b.name);
        assert_eq!(stores.get_stock("NOOP").unwrap().updated_at, created.updated_at, "{}", b.name);
        assert!(matches!(
            stores.update_stock("GONE", &StockUpdate::default()),
            Err(AppError::NotFound(_))
        ));
    }
}

#[test]
fn prices_read_back_bit_exact() {
    let start = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap();
    let mut seed: u64 = 0x2545_f491_4f6c_dd1d;
    let mut inputs = Vec::new();
    for day in 0..500 {
        seed = seed
            .wrapping_mul(6_364_136_223_846_793_005)
            .wrapping_add(1_442_695_040_888_963_407);
        let close = (seed >> 11) as f64 / (1u64 << 53) as f64 * 1000.0 + 0.01;
        inputs.push(StockPriceCreate {
            stock_symbol: "BITS".to_string(),
            date: start + chrono::Duration::days(day),
            open: close,
            high: close * 1.01,
            low: close / 3.0,
            close,
            volume: 1,
        });
    }

    for b in backends() {
        let stores = &b.stores;
        stores.create_stock(stock("BITS", "US", None)).unwrap();
        let written = stores.batch_upsert_prices(inputs.clone()).unwrap();
        let read = stores.get_prices("BITS", DateRange::default()).unwrap();
        assert_eq!(read.len(), inputs.len(), "{}", b.name);

        for (input, stored) in inputs.iter().zip(&read) {
            assert_eq!(stored.date, input.date);
            for (want, got) in [
                (input.open, stored.open),
                (input.high, stored.high),
                (input.low, stored.low),
                (input.close, stored.close),
            ] {
                assert_eq!(want.to_bits(), got.to_bits(), "{} on {}", b.name, input.date);
            }
        }
        let mut written = written;
        written.sort_by_key(|p| p.date);
        assert_eq!(written, read, "{}", b.name);
    }
}

#[test]
fn symbol_query_touches_only_its_partition() {
    let b = open("file", StoreBackend::File, StoreBackend::File);
    let stores = &b.stores;
    stores.create_stock(stock("AAPL", "NASDAQ", None)).unwrap();
    stores.create_stock(stock("MSFT", "NASDAQ", None)).unwrap();
    stores.create_event(event("MSFT", "msft", 5, 3)).unwrap();

    // Write the large partition in one go rather than through 1,000 rewrites
    let now = chrono::Utc::now();
    let aapl: Vec<Event> = (0..1000)
        .map(|i| event("AAPL", &format!("aapl-{}", i), i, 1 + (i as i32 % 5)).into_event(now))
        .collect();
    let partition = b.dir.path().join("data").join("events").join("AAPL.json");
    std::fs::write(&partition, serde_json::to_vec(&aapl).unwrap()).unwrap();

    let all_aapl = stores
        .get_events(&EventFilter::for_symbol("AAPL"), page(0, 5000))
        .unwrap();
    assert_eq!(all_aapl.len(), 1000);

    std::fs::write(&partition, b"not json").unwrap();

    let msft = stores
        .get_events(&EventFilter::for_symbol("MSFT"), Pagination::default())
        .unwrap();
    assert_eq!(titles(&msft), vec!["msft"]);
    assert!(matches!(
        stores.get_events(&EventFilter::for_symbol("AAPL"), Pagination::default()),
        Err(AppError::StoreUnavailable(_))
    ));
}

#[test]
fn file_writes_leave_no_temp_files() {
    let b = open("file", StoreBackend::File, StoreBackend::File);
    let stores = &b.stores;
    stores.create_stock(stock("TMP", "US", None)).unwrap();
    let ev = stores.create_event(event("TMP", "t", 1, 1)).unwrap();
    stores
        .update_event(
            &ev.id,
            &EventUpdate {
                title: Some("t2".to_string()),
                ..Default::default()
            },
        )
        .unwrap();
    stores.upsert_price(price("TMP", 1, 1.0)).unwrap();

    let data = b.dir.path().join("data");
    for sub in [data.clone(), data.join("events"), data.join("prices")] {
        for entry in std::fs::read_dir(&sub).unwrap() {
            let name = entry.unwrap().file_name().to_string_lossy().into_owned();
            assert!(!name.ends_with(".tmp"), "leftover temp file {} in {:?}", name, sub);
        }
    }
}

#[test]
fn sqlite_data_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let config = StoreConfig::sqlite(dir.path().join("persist.db"));
    let id = {
        let stores = Stores::from_config(&config).unwrap();
        stores.create_stock(stock("KEEP", "US", None)).unwrap();
        stores.create_event(event("KEEP", "kept", 42, 4)).unwrap().id
    };
    let stores = Stores::from_config(&config).unwrap();
    assert_eq!(stores.get_event(&id).unwrap().title, "kept");
}
