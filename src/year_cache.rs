use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Condvar, Mutex};

use anyhow::{anyhow, Result};
use rayon::prelude::*;

use crate::arcsets::{YearlyDataset, MAX_YEAR, MIN_YEAR};
use crate::players::{CountryIndex, PlayerDirectory};

/// Where yearly arc files, the country map and the player directory come
/// from. The binary wires in the HTTP source or the offline demo feed;
/// tests substitute counting stubs.
pub trait ArcSource: Send + Sync {
    fn fetch_year(&self, year: u16) -> Result<YearlyDataset>;
    fn fetch_country_index(&self) -> Result<CountryIndex>;
    fn fetch_player_directory(&self) -> Result<PlayerDirectory>;
}

#[derive(Default)]
struct CacheInner {
    entries: HashMap<u16, Arc<YearlyDataset>>,
    pending: HashSet<u16>,
}

/// Year-keyed memo over an [`ArcSource`]. Entries live for the whole
/// session; the 76-year range bounds the cache, so nothing is ever evicted.
/// A failed year stays absent and is fetched again on the next access.
pub struct YearDataCache {
    source: Arc<dyn ArcSource>,
    inner: Mutex<CacheInner>,
    cond: Condvar,
}

impl YearDataCache {
    pub fn new(source: Arc<dyn ArcSource>) -> Self {
        Self {
            source,
            inner: Mutex::new(CacheInner::default()),
            cond: Condvar::new(),
        }
    }

    /// Returns the dataset for a year, fetching it on first access.
    /// Concurrent callers for the same uncached year share one underlying
    /// fetch: latecomers block on the in-flight request instead of issuing
    /// their own.
    pub fn get(&self, year: u16) -> Result<Arc<YearlyDataset>> {
        if !(MIN_YEAR..=MAX_YEAR).contains(&year) {
            return Err(anyhow!("year {year} outside {MIN_YEAR}..={MAX_YEAR}"));
        }

        let mut inner = self.inner.lock().expect("year cache lock poisoned");
        loop {
            if let Some(dataset) = inner.entries.get(&year) {
                return Ok(dataset.clone());
            }
            if inner.pending.contains(&year) {
                inner = self.cond.wait(inner).expect("year cache lock poisoned");
                continue;
            }
            break;
        }
        inner.pending.insert(year);
        drop(inner);

        let fetched = self.source.fetch_year(year);

        let mut inner = self.inner.lock().expect("year cache lock poisoned");
        inner.pending.remove(&year);
        let result = match fetched {
            Ok(dataset) => {
                let dataset = Arc::new(dataset);
                inner.entries.insert(year, dataset.clone());
                Ok(dataset)
            }
            Err(err) => Err(err),
        };
        self.cond.notify_all();
        result
    }

    /// Non-blocking lookup; never triggers a fetch.
    pub fn peek(&self, year: u16) -> Option<Arc<YearlyDataset>> {
        let inner = self.inner.lock().expect("year cache lock poisoned");
        inner.entries.get(&year).cloned()
    }

    pub fn contains(&self, year: u16) -> bool {
        self.peek(year).is_some()
    }

    pub fn len(&self) -> usize {
        let inner = self.inner.lock().expect("year cache lock poisoned");
        inner.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// All cached datasets sorted by year, for the career fallback scan.
    pub fn snapshot(&self) -> Vec<Arc<YearlyDataset>> {
        let inner = self.inner.lock().expect("year cache lock poisoned");
        let mut datasets: Vec<Arc<YearlyDataset>> = inner.entries.values().cloned().collect();
        datasets.sort_by_key(|d| d.year);
        datasets
    }

    /// Fetches every uncached year in the range concurrently and settles
    /// once all constituent fetches have settled. Per-year failures are
    /// returned for logging; they never abort sibling fetches or disturb
    /// years already cached.
    pub fn preload_range(&self, min_year: u16, max_year: u16) -> Vec<(u16, anyhow::Error)> {
        let wanted: Vec<u16> = (min_year.max(MIN_YEAR)..=max_year.min(MAX_YEAR))
            .filter(|year| !self.contains(*year))
            .collect();

        wanted
            .par_iter()
            .filter_map(|year| match self.get(*year) {
                Ok(_) => None,
                Err(err) => Some((*year, err)),
            })
            .collect()
    }
}
