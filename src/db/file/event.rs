//! Event documents, one partition per stock symbol
//!
//! Moving an event to another stock writes the destination partition
//! before the source. A crash between the two writes leaves the event in
//! both; lookups by id return the newer copy, while listings across all
//! partitions show both until the stale copy is removed.

use super::{list_partitions, partition_path, read_records, write_records, EVENTS_DIR};
use crate::db::{
    event_not_found, now, stock_not_found, EventFilter, EventRepository, Pagination,
    StockRepository, StoreBackend,
};
use crate::error::Result;
use crate::models::{Event, EventCreate, EventUpdate};
use parking_lot::Mutex;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Events stored as `<root>/events/<SYMBOL>.json`.
///
/// Holds the active stock repository so references are checked even when
/// stocks live in a different backend.
pub struct FileEventStore {
    dir: PathBuf,
    stocks: Arc<dyn StockRepository>,
    write_guard: Mutex<()>,
}

/// An event located by id, with the partition it was loaded from
struct Located {
    path: PathBuf,
    events: Vec<Event>,
    idx: usize,
}

impl FileEventStore {
    pub fn new(root: impl AsRef<Path>, stocks: Arc<dyn StockRepository>) -> Result<Self> {
        let dir = root.as_ref().join(EVENTS_DIR);
        fs::create_dir_all(&dir)?;
        Ok(Self {
            dir,
            stocks,
            write_guard: Mutex::new(()),
        })
    }

    fn partition(&self, symbol: &str) -> Result<PathBuf> {
        partition_path(&self.dir, symbol)
    }

    fn ensure_stock(&self, symbol: &str) -> Result<()> {
        match self.stocks.get(symbol)? {
            Some(_) => Ok(()),
            None => Err(stock_not_found(symbol)),
        }
    }

    /// Every event across all partitions
    fn scan(&self) -> Result<Vec<Event>> {
        let mut all = Vec::new();
        for path in list_partitions(&self.dir)? {
            all.extend(read_records::<Event>(&path)?);
        }
        Ok(all)
    }

    /// Find an event by id. An interrupted move can leave a copy in both
    /// partitions; the most recently updated copy wins.
    fn locate(&self, id: &str) -> Result<Option<Located>> {
        let mut found: Option<Located> = None;
        for path in list_partitions(&self.dir)? {
            let events: Vec<Event> = read_records(&path)?;
            if let Some(idx) = events.iter().position(|e| e.id == id) {
                let newer = found.as_ref().map_or(true, |f| {
                    events[idx].updated_at > f.events[f.idx].updated_at
                });
                if newer {
                    found = Some(Located { path, events, idx });
                }
            }
        }
        Ok(found)
    }
}

impl EventRepository for FileEventStore {
    fn backend(&self) -> StoreBackend {
        StoreBackend::File
    }

    fn get(&self, id: &str) -> Result<Option<Event>> {
        Ok(self
            .locate(id)?
            .map(|Located { mut events, idx, .. }| events.swap_remove(idx)))
    }

    fn get_multi(&self, filter: &EventFilter, page: Pagination) -> Result<Vec<Event>> {
        let events = match &filter.stock_symbol {
            Some(symbol) => read_records(&self.partition(symbol)?)?,
            None => self.scan()?,
        };
        Ok(filter.apply(events, page))
    }

    fn create(&self, input: EventCreate) -> Result<Event> {
        self.ensure_stock(&input.stock_symbol)?;

        let _guard = self.write_guard.lock();
        let path = self.partition(&input.stock_symbol)?;
        let mut events: Vec<Event> = read_records(&path)?;

        let event = input.into_event(now());
        events.push(event.clone());
        write_records(&path, &events)?;

        Ok(event)
    }

    fn update(&self, id: &str, input: &EventUpdate) -> Result<Event> {
        let _guard = self.write_guard.lock();
        let Located {
            path,
            mut events,
            idx,
        } = self.locate(id)?.ok_or_else(|| event_not_found(id))?;

        let merged = input.apply_to(&events[idx], now())?;

        if merged.stock_symbol == events[idx].stock_symbol {
            events[idx] = merged.clone();
            write_records(&path, &events)?;
            return Ok(merged);
        }

        // Destination first: a crash between the writes leaves a duplicate,
        // never a lost event.
        self.ensure_stock(&merged.stock_symbol)?;
        let target = self.partition(&merged.stock_symbol)?;
        let mut moved: Vec<Event> = read_records(&target)?;
        moved.push(merged.clone());
        write_records(&target, &moved)?;

        events.remove(idx);
        write_records(&path, &events)?;

        tracing::debug!("Moved event {} to partition {}", id, merged.stock_symbol);
        Ok(merged)
    }

    fn remove(&self, id: &str) -> Result<Event> {
        let _guard = self.write_guard.lock();
        let Located {
            path,
            mut events,
            idx,
        } = self.locate(id)?.ok_or_else(|| event_not_found(id))?;

        let removed = events.remove(idx);
        write_records(&path, &events)?;
        Ok(removed)
    }
}
