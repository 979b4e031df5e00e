use crate::error::Result;
use crate::logsignature::{make_lyndon_info, LogSignatureMode, LyndonInfo};
use ahash::AHashMap as HashMap;
use parking_lot::RwLock;
use std::sync::Arc;

type CacheKey = (usize, usize, LogSignatureMode);

/// Thread-safe memo of [`LyndonInfo`] keyed by (channels, depth, mode).
///
/// Every caller gets a shared, read-only view of the same data. Entries are
/// never mutated after insertion.
#[derive(Debug, Default)]
pub struct LyndonInfoCache {
    entries: RwLock<HashMap<CacheKey, Arc<LyndonInfo>>>,
}

impl LyndonInfoCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cached info, building and inserting it on first use.
    ///
    /// Concurrent misses for the same key may both build; the first insert
    /// wins and everyone receives that one.
    pub fn get_or_make(
        &self,
        channels: usize,
        depth: usize,
        mode: LogSignatureMode,
    ) -> Result<Arc<LyndonInfo>> {
        let key = (channels, depth, mode);
        if let Some(info) = self.entries.read().get(&key) {
            tracing::debug!(channels, depth, mode = %mode, "lyndon info cache hit");
            return Ok(Arc::clone(info));
        }

        tracing::debug!(channels, depth, mode = %mode, "lyndon info cache miss");
        let built = Arc::new(make_lyndon_info(channels, depth, mode)?);
        let mut entries = self.entries.write();
        Ok(Arc::clone(entries.entry(key).or_insert(built)))
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Drops every entry. Holders of an `Arc` keep their copy.
    pub fn clear(&self) {
        self.entries.write().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SignatureError;

    #[test]
    fn test_hit_returns_same_arc() {
        let cache = LyndonInfoCache::new();
        let a = cache.get_or_make(2, 3, LogSignatureMode::Brackets).unwrap();
        let b = cache.get_or_make(2, 3, LogSignatureMode::Brackets).unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_modes_are_separate() {
        let cache = LyndonInfoCache::new();
        cache.get_or_make(2, 3, LogSignatureMode::Words).unwrap();
        cache.get_or_make(2, 3, LogSignatureMode::Expand).unwrap();
        assert_eq!(cache.len(), 2);
        cache.clear();
        assert!(cache.is_empty());
    }

    #[test]
    fn test_invalid_not_cached() {
        let cache = LyndonInfoCache::new();
        assert!(matches!(
            cache.get_or_make(0, 3, LogSignatureMode::Words),
            Err(SignatureError::InvalidSpec(_))
        ));
        assert!(cache.is_empty());
    }

    #[test]
    fn test_shared_across_threads() {
        let cache = Arc::new(LyndonInfoCache::new());
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let cache = Arc::clone(&cache);
                std::thread::spawn(move || {
                    cache.get_or_make(3, 3, LogSignatureMode::Brackets).unwrap()
                })
            })
            .collect();
        let infos: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        for info in &infos[1..] {
            assert!(Arc::ptr_eq(&infos[0], info));
        }
    }
}
