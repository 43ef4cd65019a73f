// ⏱️ TTL cache around the ingestion pipeline
//
// Every interaction re-renders the dashboard; re-reading the backing store
// each time is wasteful, so the last successful ingestion is reused for a
// short freshness window. `invalidate()` is the manual refresh.

use crate::error::DashboardResult;
use crate::ingest::{ingest, IngestOutcome};
use crate::source::RecordSource;
use std::sync::Arc;
use std::time::{Duration, Instant};

pub const DEFAULT_TTL: Duration = Duration::from_secs(5);

pub struct IngestCache {
    source: Box<dyn RecordSource>,
    ttl: Duration,
    cached: Option<(Instant, Arc<IngestOutcome>)>,
}

impl IngestCache {
    pub fn new(source: Box<dyn RecordSource>, ttl: Duration) -> Self {
        IngestCache {
            source,
            ttl,
            cached: None,
        }
    }

    pub fn source(&self) -> &dyn RecordSource {
        self.source.as_ref()
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Cached outcome if still fresh, otherwise a new ingestion.
    /// Failures are returned as-is and never cached.
    pub fn load(&mut self) -> DashboardResult<Arc<IngestOutcome>> {
        self.load_at(Instant::now())
    }

    fn load_at(&mut self, now: Instant) -> DashboardResult<Arc<IngestOutcome>> {
        if let Some((loaded_at, outcome)) = &self.cached {
            if now.saturating_duration_since(*loaded_at) < self.ttl {
                log::debug!("Using cached ingestion of {}", self.source.location());
                return Ok(Arc::clone(outcome));
            }
        }

        let outcome = Arc::new(ingest(self.source.as_ref())?);
        self.cached = Some((now, Arc::clone(&outcome)));
        Ok(outcome)
    }

    /// Drop the cached result; the next `load` reads the store again.
    pub fn invalidate(&mut self) {
        if self.cached.take().is_some() {
            log::info!("Cache invalidated for {}", self.source.location());
        }
    }

    pub fn is_fresh(&self) -> bool {
        match &self.cached {
            Some((loaded_at, _)) => loaded_at.elapsed() < self.ttl,
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DashboardError;
    use crate::source::{SourceHandle, TableFormat};
    use std::cell::Cell;
    use std::rc::Rc;

    /// One CSV file; counts listings and can be switched off
    struct CountingSource {
        listings: Rc<Cell<usize>>,
        available: Rc<Cell<bool>>,
    }

    impl RecordSource for CountingSource {
        fn location(&self) -> String {
            "counting".to_string()
        }

        fn list_sources(&self) -> DashboardResult<Vec<SourceHandle>> {
            self.listings.set(self.listings.get() + 1);
            if !self.available.get() {
                return Err(DashboardError::StoreUnavailable("offline".to_string()));
            }
            Ok(vec![SourceHandle {
                id: "a.csv".to_string(),
                name: "a.csv".to_string(),
                format: TableFormat::Csv,
            }])
        }

        fn read(&self, _handle: &SourceHandle) -> DashboardResult<Vec<u8>> {
            Ok(b"monto\n7\n".to_vec())
        }
    }

    fn cache() -> (IngestCache, Rc<Cell<usize>>, Rc<Cell<bool>>) {
        let listings = Rc::new(Cell::new(0));
        let available = Rc::new(Cell::new(true));
        let source = CountingSource {
            listings: Rc::clone(&listings),
            available: Rc::clone(&available),
        };
        (IngestCache::new(Box::new(source), DEFAULT_TTL), listings, available)
    }

    #[test]
    fn test_reuses_result_within_window() {
        let (mut cache, listings, _) = cache();
        let start = Instant::now();

        let first = cache.load_at(start).unwrap();
        let second = cache.load_at(start + Duration::from_secs(4)).unwrap();

        assert_eq!(listings.get(), 1);
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn test_reloads_after_window() {
        let (mut cache, listings, _) = cache();
        let start = Instant::now();

        cache.load_at(start).unwrap();
        cache.load_at(start + Duration::from_secs(5)).unwrap();

        assert_eq!(listings.get(), 2);
    }

    #[test]
    fn test_invalidate_forces_reload() {
        let (mut cache, listings, _) = cache();
        let start = Instant::now();

        cache.load_at(start).unwrap();
        cache.invalidate();
        assert!(!cache.is_fresh());
        cache.load_at(start + Duration::from_millis(10)).unwrap();

        assert_eq!(listings.get(), 2);
    }

    #[test]
    fn test_failures_are_not_cached() {
        let (mut cache, listings, available) = cache();
        let start = Instant::now();

        available.set(false);
        assert!(cache.load_at(start).is_err());

        available.set(true);
        let outcome = cache.load_at(start + Duration::from_millis(10)).unwrap();

        assert_eq!(listings.get(), 2);
        assert_eq!(outcome.records.len(), 1);
    }
}
