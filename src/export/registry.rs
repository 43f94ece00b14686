use crate::error::{Error, Result};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tracing::debug;

/// Projects with an export in flight
#[derive(Debug, Default)]
pub struct ExportRegistry {
    in_flight: DashMap<String, Instant>,
}

impl ExportRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim the project for one export; a second claim fails with [`Error::Busy`]
    pub fn try_acquire(&self, project_id: &str) -> Result<ExportPermit<'_>> {
        match self.in_flight.entry(project_id.to_string()) {
            Entry::Occupied(_) => Err(Error::Busy(project_id.to_string())),
            Entry::Vacant(slot) => {
                slot.insert(Instant::now());
                debug!("Acquired export permit for '{}'", project_id);
                Ok(ExportPermit {
                    registry: self,
                    project_id: project_id.to_string(),
                })
            }
        }
    }

    pub fn is_in_flight(&self, project_id: &str) -> bool {
        self.in_flight.contains_key(project_id)
    }

    pub fn in_flight_count(&self) -> usize {
        self.in_flight.len()
    }
}

/// Released when dropped
#[derive(Debug)]
pub struct ExportPermit<'a> {
    registry: &'a ExportRegistry,
    project_id: String,
}

impl ExportPermit<'_> {
    pub fn project_id(&self) -> &str {
        &self.project_id
    }
}

impl Drop for ExportPermit<'_> {
    fn drop(&mut self) {
        if let Some((_, started)) = self.registry.in_flight.remove(&self.project_id) {
            debug!(
                "Released export permit for '{}' after {:?}",
                self.project_id,
                started.elapsed()
            );
        }
    }
}

/// Encoded frame bytes keyed by frame digest, shared by the workers of one job.
///
/// Holds at most `capacity` entries; once full, new frames are encoded but not
/// cached.
#[derive(Debug)]
pub struct FrameCache {
    entries: DashMap<String, Arc<Vec<u8>>>,
    capacity: usize,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl FrameCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: DashMap::new(),
            capacity,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Cached bytes for `digest`, or the result of `encode` (cached if there is room)
    pub fn get_or_try_insert<F>(&self, digest: &str, encode: F) -> Result<Arc<Vec<u8>>>
    where
        F: FnOnce() -> Result<Vec<u8>>,
    {
        if let Some(bytes) = self.entries.get(digest) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            return Ok(Arc::clone(bytes.value()));
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        let bytes = Arc::new(encode()?);
        if self.entries.len() < self.capacity {
            self.entries
                .entry(digest.to_string())
                .or_insert_with(|| Arc::clone(&bytes));
        }
        Ok(bytes)
    }

    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    pub fn misses(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
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

    #[test]
    fn test_second_permit_is_busy() {
        let registry = ExportRegistry::new();
        let permit = registry.try_acquire("demo").unwrap();
        assert_eq!(permit.project_id(), "demo");
        assert!(registry.is_in_flight("demo"));

        let err = registry.try_acquire("demo").unwrap_err();
        assert!(matches!(err, Error::Busy(ref id) if id == "demo"));

        // other projects are unaffected
        let other = registry.try_acquire("other").unwrap();
        assert_eq!(registry.in_flight_count(), 2);

        drop(permit);
        drop(other);
        assert!(!registry.is_in_flight("demo"));
        assert!(registry.try_acquire("demo").is_ok());
    }

    #[test]
    fn test_concurrent_acquire_has_one_winner() {
        let registry = ExportRegistry::new();
        let start = std::sync::Barrier::new(8);
        let tried = std::sync::Barrier::new(8);
        let winners = AtomicU64::new(0);

        std::thread::scope(|s| {
            for _ in 0..8 {
                s.spawn(|| {
                    start.wait();
                    let permit = registry.try_acquire("shared");
                    if permit.is_ok() {
                        winners.fetch_add(1, Ordering::SeqCst);
                    }
                    // hold the permit until every thread has tried
                    tried.wait();
                    drop(permit);
                });
            }
        });
        assert_eq!(winners.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_frame_cache_hits_and_capacity() {
        let cache = FrameCache::new(1);
        let first = cache.get_or_try_insert("a", || Ok(vec![1, 2, 3])).unwrap();
        let again = cache
            .get_or_try_insert("a", || panic!("cached frame re-encoded"))
            .unwrap();
        assert_eq!(first, again);
        assert_eq!((cache.hits(), cache.misses()), (1, 1));

        cache.get_or_try_insert("b", || Ok(vec![4])).unwrap();
        assert_eq!(cache.len(), 1);

        let err = cache.get_or_try_insert("c", || Err(Error::Cancelled)).unwrap_err();
        assert!(matches!(err, Error::Cancelled));
    }
}
