//! Read-through response cache port.
//!
//! Injected into transport adapters, never into the engine core: the core
//! always sees fresh-enough data and is unaware caching exists.

use crate::error::PortError;

/// Read-through cache over raw response bodies.
pub trait ResponseCache: Send + Sync {
    /// Returns the cached body for `key`, or invokes `fetch` and caches its
    /// result.
    ///
    /// # Errors
    ///
    /// Propagates the error returned by `fetch`; errors are never cached.
    fn get_or_fetch(
        &self,
        key: &str,
        fetch: &mut dyn FnMut() -> Result<String, PortError>,
    ) -> Result<String, PortError>;

    /// Drops every cached entry.
    fn invalidate_all(&self);
}
