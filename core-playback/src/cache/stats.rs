//! Cache statistics

use serde::{Deserialize, Serialize};

/// Point-in-time counters for a [`MediaCache`](super::MediaCache).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheStats {
    /// Acquisitions served from a live entry
    pub hits: u64,

    /// Acquisitions that started a fetch
    pub misses: u64,

    /// Fetches that failed and fell back to the remote locator
    pub fallbacks: u64,

    /// Entries removed to stay within capacity
    pub evictions: u64,

    /// Entries removed because they outlived the TTL
    pub expirations: u64,

    /// Entries currently resident
    pub entries: usize,

    /// Configured capacity
    pub capacity: usize,
}

impl CacheStats {
    /// Hits as a percentage of all acquisitions.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            return 0.0;
        }
        (self.hits as f64 / total as f64) * 100.0
    }

    pub fn is_full(&self) -> bool {
        self.entries >= self.capacity
    }
}
