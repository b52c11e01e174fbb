use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use anyhow::{anyhow, Result};
use globe_transfers::arcsets::{TransferArc, YearlyDataset};
use globe_transfers::players::{CountryIndex, PlayerDirectory};
use globe_transfers::year_cache::{ArcSource, YearDataCache};

/// Counts fetches and fails for a configurable set of years.
struct StubSource {
    fetches: AtomicUsize,
    failing_years: Mutex<HashSet<u16>>,
    fetch_delay: Duration,
}

impl StubSource {
    fn new() -> Self {
        Self {
            fetches: AtomicUsize::new(0),
            failing_years: Mutex::new(HashSet::new()),
            fetch_delay: Duration::ZERO,
        }
    }

    fn with_delay(delay: Duration) -> Self {
        Self {
            fetch_delay: delay,
            ..Self::new()
        }
    }

    fn fail_year(&self, year: u16) {
        self.failing_years.lock().unwrap().insert(year);
    }

    fn heal_year(&self, year: u16) {
        self.failing_years.lock().unwrap().remove(&year);
    }

    fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

impl ArcSource for StubSource {
    fn fetch_year(&self, year: u16) -> Result<YearlyDataset> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        if !self.fetch_delay.is_zero() {
            thread::sleep(self.fetch_delay);
        }
        if self.failing_years.lock().unwrap().contains(&year) {
            return Err(anyhow!("synthetic failure for {year}"));
        }
        Ok(YearlyDataset {
            year,
            arcs: vec![TransferArc {
                from: "POR".to_string(),
                to: "ESP".to_string(),
                start_lat: 0.0,
                start_lng: 0.0,
                end_lat: 0.0,
                end_lng: 0.0,
                count: u32::from(year % 10),
                players: Vec::new(),
            }],
        })
    }

    fn fetch_country_index(&self) -> Result<CountryIndex> {
        Ok(CountryIndex::default())
    }

    fn fetch_player_directory(&self) -> Result<PlayerDirectory> {
        Ok(PlayerDirectory::default())
    }
}

#[test]
fn repeated_gets_trigger_exactly_one_fetch() {
    let source = Arc::new(StubSource::new());
    let cache = YearDataCache::new(source.clone());

    let first = cache.get(1975).expect("first get");
    let second = cache.get(1975).expect("second get");
    assert_eq!(first.year, 1975);
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(source.fetch_count(), 1);
}

#[test]
fn failed_year_stays_absent_and_is_retried_on_next_access() {
    let source = Arc::new(StubSource::new());
    let cache = YearDataCache::new(source.clone());

    source.fail_year(1960);
    assert!(cache.get(1960).is_err());
    assert!(cache.peek(1960).is_none());
    assert_eq!(source.fetch_count(), 1);

    source.heal_year(1960);
    assert!(cache.get(1960).is_ok());
    assert_eq!(source.fetch_count(), 2);
}

#[test]
fn one_failing_year_does_not_disturb_siblings() {
    let source = Arc::new(StubSource::new());
    let cache = YearDataCache::new(source.clone());

    source.fail_year(1957);
    let failures = cache.preload_range(1955, 1959);
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].0, 1957);

    for year in [1955, 1956, 1958, 1959] {
        assert!(cache.peek(year).is_some(), "year {year} should be cached");
    }
    assert!(cache.peek(1957).is_none());
    assert_eq!(cache.len(), 4);
}

#[test]
fn preload_skips_years_already_cached() {
    let source = Arc::new(StubSource::new());
    let cache = YearDataCache::new(source.clone());

    cache.get(1955).expect("seed");
    let failures = cache.preload_range(1955, 1957);
    assert!(failures.is_empty());
    assert_eq!(source.fetch_count(), 3);
}

#[test]
fn concurrent_gets_for_the_same_year_share_one_fetch() {
    let source = Arc::new(StubSource::with_delay(Duration::from_millis(50)));
    let cache = Arc::new(YearDataCache::new(source.clone()));

    let mut handles = Vec::new();
    for _ in 0..4 {
        let cache = cache.clone();
        handles.push(thread::spawn(move || cache.get(1980).map(|d| d.year)));
    }
    for handle in handles {
        assert_eq!(handle.join().expect("thread").expect("get"), 1980);
    }
    assert_eq!(source.fetch_count(), 1);
}

#[test]
fn out_of_range_years_are_rejected_without_a_fetch() {
    let source = Arc::new(StubSource::new());
    let cache = YearDataCache::new(source.clone());

    assert!(cache.get(1949).is_err());
    assert!(cache.get(2026).is_err());
    assert_eq!(source.fetch_count(), 0);
}

#[test]
fn snapshot_is_sorted_by_year() {
    let source = Arc::new(StubSource::new());
    let cache = YearDataCache::new(source);

    cache.get(1990).expect("get");
    cache.get(1950).expect("get");
    cache.get(1970).expect("get");

    let years: Vec<u16> = cache.snapshot().iter().map(|d| d.year).collect();
    assert_eq!(years, [1950, 1970, 1990]);
}
