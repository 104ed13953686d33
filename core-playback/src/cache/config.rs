//! Media cache configuration

use std::time::Duration;

/// Configuration for [`MediaCache`](super::MediaCache).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheConfig {
    /// Maximum number of resident entries (default: 50)
    pub capacity: usize,

    /// Age after which an entry is never served again (default: 24h)
    pub ttl: Duration,

    /// Delay before a prefetch starts fetching (default: 100ms)
    pub prefetch_delay: Duration,

    /// Timeout applied to each audio fetch (default: 60s)
    pub fetch_timeout: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            capacity: 50,
            ttl: Duration::from_secs(24 * 60 * 60),
            prefetch_delay: Duration::from_millis(100),
            fetch_timeout: Duration::from_secs(60),
        }
    }
}

impl CacheConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn with_prefetch_delay(mut self, delay: Duration) -> Self {
        self.prefetch_delay = delay;
        self
    }

    pub fn with_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = timeout;
        self
    }

    /// Validate configuration.
    pub fn validate(&self) -> Result<(), String> {
        if self.capacity == 0 {
            return Err("capacity must be at least 1".to_string());
        }

        if self.ttl.is_zero() {
            return Err("ttl must be greater than 0".to_string());
        }

        if self.fetch_timeout.is_zero() {
            return Err("fetch_timeout must be greater than 0".to_string());
        }

        Ok(())
    }
}
