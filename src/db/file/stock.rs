//! Stock and price documents

use super::{read_records, write_records, FileStore};
use crate::db::{now, stock_not_found, Pagination, StockFilter, StockRepository, StoreBackend};
use crate::error::{AppError, Result};
use crate::models::{DateRange, Stock, StockCreate, StockPrice, StockPriceCreate, StockUpdate};
use std::collections::{BTreeMap, HashSet};

impl FileStore {
    fn load_stocks(&self) -> Result<Vec<Stock>> {
        read_records(&self.stocks_path())
    }

    fn load_prices(&self, symbol: &str) -> Result<Vec<StockPrice>> {
        read_records(&self.prices_path(symbol)?)
    }

    /// Merge `prices` into one symbol's partition; caller holds the guard
    fn merge_prices(&self, symbol: &str, prices: &[StockPrice]) -> Result<()> {
        let path = self.prices_path(symbol)?;
        let mut stored: Vec<StockPrice> = read_records(&path)?;

        for price in prices {
            match stored.iter_mut().find(|p| p.date == price.date) {
                Some(existing) => *existing = price.clone(),
                None => stored.push(price.clone()),
            }
        }
        stored.sort_by_key(|p| p.date);

        write_records(&path, &stored)
    }
}

impl StockRepository for FileStore {
    fn backend(&self) -> StoreBackend {
        StoreBackend::File
    }

    fn get(&self, symbol: &str) -> Result<Option<Stock>> {
        Ok(self.load_stocks()?.into_iter().find(|s| s.symbol == symbol))
    }

    fn get_multi(&self, filter: &StockFilter, page: Pagination) -> Result<Vec<Stock>> {
        Ok(filter.apply(self.load_stocks()?, page))
    }

    fn create(&self, input: StockCreate) -> Result<Stock> {
        let _guard = self.write_guard.lock();
        let mut stocks = self.load_stocks()?;

        if stocks.iter().any(|s| s.symbol == input.symbol) {
            return Err(AppError::Conflict(format!(
                "Stock with symbol {} already exists",
                input.symbol
            )));
        }

        let stock = input.into_stock(now());
        stocks.push(stock.clone());
        write_records(&self.stocks_path(), &stocks)?;

        Ok(stock)
    }

    fn update(&self, symbol: &str, input: &StockUpdate) -> Result<Stock> {
        let _guard = self.write_guard.lock();
        let mut stocks = self.load_stocks()?;

        let stock = stocks
            .iter_mut()
            .find(|s| s.symbol == symbol)
            .ok_or_else(|| stock_not_found(symbol))?;
        if input.is_empty() {
            return Ok(stock.clone());
        }
        input.apply_to(stock, now());
        let updated = stock.clone();

        write_records(&self.stocks_path(), &stocks)?;
        Ok(updated)
    }

    fn remove(&self, symbol: &str) -> Result<Stock> {
        let _guard = self.write_guard.lock();
        let mut stocks = self.load_stocks()?;

        let idx = stocks
            .iter()
            .position(|s| s.symbol == symbol)
            .ok_or_else(|| stock_not_found(symbol))?;
        if !self.load_prices(symbol)?.is_empty() {
            return Err(AppError::Conflict(format!(
                "Stock {} still has prices; delete them first",
                symbol
            )));
        }

        let removed = stocks.remove(idx);
        write_records(&self.stocks_path(), &stocks)?;
        Ok(removed)
    }

    fn get_prices(&self, symbol: &str, range: DateRange) -> Result<Vec<StockPrice>> {
        let mut prices: Vec<StockPrice> = self
            .load_prices(symbol)?
            .into_iter()
            .filter(|p| range.contains(p.date))
            .collect();
        prices.sort_by_key(|p| p.date);
        Ok(prices)
    }

    fn upsert_price(&self, input: StockPriceCreate) -> Result<StockPrice> {
        let _guard = self.write_guard.lock();

        if self.get(&input.stock_symbol)?.is_none() {
            return Err(stock_not_found(&input.stock_symbol));
        }

        let price = input.into_price();
        self.merge_prices(&price.stock_symbol, std::slice::from_ref(&price))?;
        Ok(price)
    }

    /// One rewrite per touched partition. Every symbol is checked before the
    /// first write, but a failure part-way through can leave earlier
    /// partitions updated.
    fn batch_upsert_prices(&self, inputs: Vec<StockPriceCreate>) -> Result<Vec<StockPrice>> {
        let _guard = self.write_guard.lock();

        let known: HashSet<String> = self.load_stocks()?.into_iter().map(|s| s.symbol).collect();
        if let Some(missing) = inputs.iter().find(|p| !known.contains(&p.stock_symbol)) {
            return Err(stock_not_found(&missing.stock_symbol));
        }

        let prices: Vec<StockPrice> = inputs.into_iter().map(StockPriceCreate::into_price).collect();
        let mut by_symbol: BTreeMap<&str, Vec<StockPrice>> = BTreeMap::new();
        for price in &prices {
            by_symbol
                .entry(price.stock_symbol.as_str())
                .or_default()
                .push(price.clone());
        }
        for (symbol, batch) in &by_symbol {
            self.merge_prices(symbol, batch)?;
        }

        Ok(prices)
    }

    fn has_prices(&self, symbol: &str) -> Result<bool> {
        Ok(!self.load_prices(symbol)?.is_empty())
    }
}
