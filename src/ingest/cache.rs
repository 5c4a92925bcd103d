//! Snapshot cache shared between concurrent analysis requests.

use super::{HireDataSource, IngestError, MemorySource};
use crate::data::{DateRange, Granularity};
use dashmap::DashMap;
use std::sync::Arc;
use tracing::debug;

pub type CacheKey = (DateRange, Granularity);

/// Thread-safe cache of fetched data keyed by (date range, granularity)
///
/// Snapshots are immutable and handed out as `Arc`s, so readers never
/// block each other.
#[derive(Debug, Default, Clone)]
pub struct IngestionCache {
    entries: Arc<DashMap<CacheKey, Arc<MemorySource>>>,
}

impl IngestionCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, range: &DateRange, granularity: Granularity) -> Option<Arc<MemorySource>> {
        self.entries.get(&(*range, granularity)).map(|r| Arc::clone(r.value()))
    }

    pub fn insert(&self, range: DateRange, granularity: Granularity, snapshot: MemorySource) -> Arc<MemorySource> {
        let snapshot = Arc::new(snapshot);
        self.entries.insert((range, granularity), Arc::clone(&snapshot));
        snapshot
    }

    /// Return the cached snapshot, or fetch one from `source` and cache it
    ///
    /// The fetch runs without holding a map lock; if two callers race,
    /// the later insert wins and both receive a valid snapshot.
    pub fn get_or_fetch<S: HireDataSource + ?Sized>(
        &self,
        source: &S,
        range: &DateRange,
        granularity: Granularity,
    ) -> Result<Arc<MemorySource>, IngestError> {
        if let Some(hit) = self.get(range, granularity) {
            debug!(%range, %granularity, "Ingestion cache hit");
            return Ok(hit);
        }

        debug!(%range, %granularity, "Ingestion cache miss");
        let snapshot = MemorySource::new(source.fetch_events(range)?, source.fetch_stations()?);
        Ok(self.insert(*range, granularity, snapshot))
    }

    pub fn invalidate(&self, range: &DateRange, granularity: Granularity) -> bool {
        self.entries.remove(&(*range, granularity)).is_some()
    }

    pub fn clear(&self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{HireEvent, Station};
    use chrono::{Duration, NaiveDate, TimeZone, Utc};
    use std::cell::Cell;

    struct CountingSource {
        inner: MemorySource,
        fetches: Cell<usize>,
    }

    impl HireDataSource for CountingSource {
        fn fetch_events(&self, range: &DateRange) -> Result<Vec<HireEvent>, IngestError> {
            self.fetches.set(self.fetches.get() + 1);
            self.inner.fetch_events(range)
        }

        fn fetch_stations(&self) -> Result<Vec<Station>, IngestError> {
            self.inner.fetch_stations()
        }
    }

    fn range(day: u32) -> DateRange {
        DateRange::new(
            NaiveDate::from_ymd_opt(2016, 6, day).unwrap(),
            NaiveDate::from_ymd_opt(2016, 6, day + 1).unwrap(),
        )
    }

    fn source() -> CountingSource {
        let at = Utc.with_ymd_and_hms(2016, 6, 1, 8, 0, 0).unwrap();
        CountingSource {
            inner: MemorySource::new(
                vec![HireEvent::new(1, 1, 1, 2, at, at + Duration::minutes(10))],
                vec![Station::new(1, "A", 10), Station::new(2, "B", 10)],
            ),
            fetches: Cell::new(0),
        }
    }

    #[test]
    fn test_second_request_served_from_cache() {
        let cache = IngestionCache::new();
        let source = source();

        let first = cache.get_or_fetch(&source, &range(1), Granularity::Hourly).unwrap();
        let second = cache.get_or_fetch(&source, &range(1), Granularity::Hourly).unwrap();

        assert_eq!(source.fetches.get(), 1);
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(first.event_count(), 1);
    }

    #[test]
    fn test_key_includes_granularity_and_range() {
        let cache = IngestionCache::new();
        let source = source();

        cache.get_or_fetch(&source, &range(1), Granularity::Hourly).unwrap();
        cache.get_or_fetch(&source, &range(1), Granularity::Daily).unwrap();
        cache.get_or_fetch(&source, &range(2), Granularity::Hourly).unwrap();

        assert_eq!(source.fetches.get(), 3);
        assert_eq!(cache.len(), 3);
        assert!(cache.invalidate(&range(2), Granularity::Hourly));
        assert!(cache.get(&range(2), Granularity::Hourly).is_none());
    }

    #[test]
    fn test_shared_across_threads() {
        let cache = IngestionCache::new();
        cache.insert(range(1), Granularity::Weekly, MemorySource::default());

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let cache = cache.clone();
                std::thread::spawn(move || cache.get(&range(1), Granularity::Weekly).is_some())
            })
            .collect();

        for handle in handles {
            assert!(handle.join().unwrap());
        }
    }
}
