//! Response cache adapters for the `ResponseCache` port.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use crate::error::PortError;
use crate::ports::ResponseCache;

/// Cache adapter that never stores anything.
pub struct PassthroughCache;

impl ResponseCache for PassthroughCache {
    fn get_or_fetch(
        &self,
        _key: &str,
        fetch: &mut dyn FnMut() -> Result<String, PortError>,
    ) -> Result<String, PortError> {
        fetch()
    }

    fn invalidate_all(&self) {}
}

/// In-process cache with a fixed time-to-live per entry.
pub struct TtlCache {
    ttl: Duration,
    entries: Mutex<HashMap<String, (Instant, String)>>,
}

impl TtlCache {
    /// Creates a cache whose entries expire after `ttl`.
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self { ttl, entries: Mutex::new(HashMap::new()) }
    }
}

impl ResponseCache for TtlCache {
    fn get_or_fetch(
        &self,
        key: &str,
        fetch: &mut dyn FnMut() -> Result<String, PortError>,
    ) -> Result<String, PortError> {
        let now = Instant::now();
        {
            let entries = self.entries.lock().map_err(|e| e.to_string())?;
            if let Some((stored_at, body)) = entries.get(key) {
                if now.duration_since(*stored_at) < self.ttl {
                    return Ok(body.clone());
                }
            }
        }
        let body = fetch()?;
        let mut entries = self.entries.lock().map_err(|e| e.to_string())?;
        entries.insert(key.to_string(), (now, body.clone()));
        Ok(body)
    }

    fn invalidate_all(&self) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.clear();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn counting_fetch(counter: &mut usize, body: &str) -> (usize, String) {
        *counter += 1;
        (*counter, body.to_string())
    }

    #[test]
    fn passthrough_always_fetches() {
        let cache = PassthroughCache;
        let mut calls = 0;
        for _ in 0..3 {
            let body = cache
                .get_or_fetch("k", &mut || {
                    let (_, body) = counting_fetch(&mut calls, "body");
                    Ok(body)
                })
                .unwrap();
            assert_eq!(body, "body");
        }
        assert_eq!(calls, 3);
    }

    #[test]
    fn ttl_cache_serves_fresh_entry_without_fetching() {
        let cache = TtlCache::new(Duration::from_secs(60));
        let mut calls = 0;
        for _ in 0..3 {
            let body = cache
                .get_or_fetch("k", &mut || {
                    let (_, body) = counting_fetch(&mut calls, "cached");
                    Ok(body)
                })
                .unwrap();
            assert_eq!(body, "cached");
        }
        assert_eq!(calls, 1);
    }

    #[test]
    fn ttl_cache_refetches_expired_entry() {
        let cache = TtlCache::new(Duration::ZERO);
        let mut calls = 0;
        for _ in 0..2 {
            cache
                .get_or_fetch("k", &mut || {
                    let (_, body) = counting_fetch(&mut calls, "stale");
                    Ok(body)
                })
                .unwrap();
        }
        assert_eq!(calls, 2);
    }

    #[test]
    fn invalidate_all_drops_entries() {
        let cache = TtlCache::new(Duration::from_secs(60));
        let mut calls = 0;
        cache
            .get_or_fetch("k", &mut || {
                let (_, body) = counting_fetch(&mut calls, "v1");
                Ok(body)
            })
            .unwrap();
        cache.invalidate_all();
        cache
            .get_or_fetch("k", &mut || {
                let (_, body) = counting_fetch(&mut calls, "v2");
                Ok(body)
            })
            .unwrap();
        assert_eq!(calls, 2);
    }

    #[test]
    fn fetch_errors_are_not_cached() {
        let cache = TtlCache::new(Duration::from_secs(60));
        let result = cache.get_or_fetch("k", &mut || Err("boom".into()));
        assert!(result.is_err());
        let mut calls = 0;
        let body = cache
            .get_or_fetch("k", &mut || {
                let (_, body) = counting_fetch(&mut calls, "recovered");
                Ok(body)
            })
            .unwrap();
        assert_eq!(body, "recovered");
        assert_eq!(calls, 1);
    }
}
