//! # Media Cache
//!
//! Keeps recently fetched audio as locally-backed object URLs so replaying or
//! skipping back to a track does not hit the network again.
//!
//! - Entries are keyed by locator and served until they outlive the TTL
//! - Expired entries are purged lazily, whenever a new fetch is about to start
//! - At capacity the oldest entry (creation time, then insertion order) goes first
//! - Concurrent acquisitions of one locator share a single fetch
//! - A failed fetch degrades to the remote locator instead of failing playback

use crate::cache::{config::CacheConfig, handle::PlayableHandle, stats::CacheStats};
use crate::error::{PlaybackError, Result};
use bridge_traits::{BlobStore, Clock, HttpClient, HttpRequest, MediaSource, SystemClock};
use chrono::{DateTime, Utc};
use core_runtime::events::{CacheEvent, CoreEvent, EventBus, EvictionReason};
use core_runtime::logging::strip_query;
use futures::future::{BoxFuture, FutureExt, Shared};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Weak};
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

type InFlight = Shared<BoxFuture<'static, MediaSource>>;

struct CacheEntry {
    handle: PlayableHandle,
    created_at: DateTime<Utc>,
    seq: u64,
}

#[derive(Default)]
struct CacheState {
    entries: HashMap<String, CacheEntry>,
    in_flight: HashMap<String, InFlight>,
    next_seq: u64,
    hits: u64,
    misses: u64,
    fallbacks: u64,
    evictions: u64,
    expirations: u64,
}

struct CacheInner {
    config: CacheConfig,
    http_client: Arc<dyn HttpClient>,
    blob_store: Arc<dyn BlobStore>,
    clock: Arc<dyn Clock>,
    event_bus: Option<EventBus>,
    state: Mutex<CacheState>,
}

/// Entries removed under the lock; revoked after it is released.
type Removed = Vec<(String, CacheEntry, EvictionReason)>;

/// Bounded, time-limited cache of playable audio handles.
///
/// Cloning is cheap and shares the same entries.
#[derive(Clone)]
pub struct MediaCache {
    inner: Arc<CacheInner>,
}

impl MediaCache {
    /// Create a cache.
    ///
    /// # Errors
    ///
    /// Returns [`PlaybackError::CacheError`] when `config` fails validation.
    ///
    /// # Example
    ///
    /// ```rust,ignore
    /// use core_playback::cache::{CacheConfig, MediaCache};
    ///
    /// let cache = MediaCache::new(CacheConfig::default(), http_client, blob_store)?;
    /// let source = cache.acquire("https://cdn.example.com/track.mp3").await;
    /// media.load(&source).await?;
    /// ```
    pub fn new(
        config: CacheConfig,
        http_client: Arc<dyn HttpClient>,
        blob_store: Arc<dyn BlobStore>,
    ) -> Result<Self> {
        config.validate().map_err(PlaybackError::CacheError)?;

        Ok(Self {
            inner: Arc::new(CacheInner {
                config,
                http_client,
                blob_store,
                clock: Arc::new(SystemClock),
                event_bus: None,
                state: Mutex::new(CacheState::default()),
            }),
        })
    }

    /// Replace the time source used for entry timestamps and expiry.
    ///
    /// Must be called before the cache is cloned or shared.
    pub fn with_clock(self, clock: Arc<dyn Clock>) -> Self {
        self.rebuild(|inner| inner.clock = clock)
    }

    /// Publish population, fallback and eviction events.
    pub fn with_event_bus(self, event_bus: EventBus) -> Self {
        self.rebuild(|inner| inner.event_bus = Some(event_bus))
    }

    fn rebuild(self, apply: impl FnOnce(&mut CacheInner)) -> Self {
        match Arc::try_unwrap(self.inner) {
            Ok(mut inner) => {
                apply(&mut inner);
                Self {
                    inner: Arc::new(inner),
                }
            }
            Err(shared) => {
                warn!("Cache already shared; builder option ignored");
                Self { inner: shared }
            }
        }
    }

    pub fn config(&self) -> &CacheConfig {
        &self.inner.config
    }

    /// Resolve `locator` to something the media element can load.
    ///
    /// Never fails: a fetch or storage error yields
    /// [`MediaSource::Direct`] with the locator unchanged.
    #[instrument(skip(self, locator), fields(locator = %strip_query(locator)))]
    pub async fn acquire(&self, locator: &str) -> MediaSource {
        let now = self.inner.clock.now();
        let pending = {
            let mut state = self.inner.state.lock();

            let live_uri = state
                .entries
                .get(locator)
                .filter(|entry| !self.inner.is_expired(entry, now))
                .map(|entry| entry.handle.uri().to_string());

            if let Some(uri) = live_uri {
                state.hits += 1;
                debug!("Cache hit");
                return MediaSource::Cached { uri };
            }

            match state.in_flight.get(locator) {
                Some(pending) => {
                    debug!("Joining in-flight fetch");
                    pending.clone()
                }
                None => {
                    state.misses += 1;
                    let pending = populate(Arc::downgrade(&self.inner), locator.to_string())
                        .boxed()
                        .shared();
                    state
                        .in_flight
                        .insert(locator.to_string(), pending.clone());
                    pending
                }
            }
        };

        pending.await
    }

    /// Warm the cache for `locator` in the background.
    ///
    /// Starts after the configured prefetch delay. Returns `None` when called
    /// outside a tokio runtime, in which case nothing is scheduled.
    pub fn prefetch(&self, locator: &str) -> Option<JoinHandle<()>> {
        let runtime = match tokio::runtime::Handle::try_current() {
            Ok(runtime) => runtime,
            Err(_) => {
                debug!(locator = %strip_query(locator), "No runtime available; prefetch skipped");
                return None;
            }
        };

        let cache = self.clone();
        let locator = locator.to_string();
        let delay = self.inner.config.prefetch_delay;

        Some(runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            let source = cache.acquire(&locator).await;
            debug!(locator = %strip_query(&locator), cached = source.is_cached(), "Prefetch finished");
        }))
    }

    /// Live URI for `locator`, without fetching.
    pub fn cached_uri(&self, locator: &str) -> Option<String> {
        let now = self.inner.clock.now();
        let state = self.inner.state.lock();
        state
            .entries
            .get(locator)
            .filter(|entry| !self.inner.is_expired(entry, now))
            .map(|entry| entry.handle.uri().to_string())
    }

    /// Evict `locator` now. Returns `false` when nothing was cached.
    pub fn release(&self, locator: &str) -> bool {
        let removed = self.inner.state.lock().entries.remove(locator);
        match removed {
            Some(entry) => {
                self.inner
                    .finish_removal(vec![(locator.to_string(), entry, EvictionReason::Released)]);
                true
            }
            None => false,
        }
    }

    /// Drop every expired entry. Returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let removed = {
            let mut state = self.inner.state.lock();
            self.inner.take_expired(&mut state, self.inner.clock.now())
        };
        let count = removed.len();
        self.inner.finish_removal(removed);
        count
    }

    /// Release every entry.
    pub fn clear(&self) {
        let removed: Removed = {
            let mut state = self.inner.state.lock();
            state
                .entries
                .drain()
                .map(|(locator, entry)| (locator, entry, EvictionReason::Cleared))
                .collect()
        };
        if !removed.is_empty() {
            info!(count = removed.len(), "Media cache cleared");
        }
        self.inner.finish_removal(removed);
    }

    /// Resident entries, including expired ones not yet purged.
    pub fn len(&self) -> usize {
        self.inner.state.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> CacheStats {
        let state = self.inner.state.lock();
        CacheStats {
            hits: state.hits,
            misses: state.misses,
            fallbacks: state.fallbacks,
            evictions: state.evictions,
            expirations: state.expirations,
            entries: state.entries.len(),
            capacity: self.inner.config.capacity,
        }
    }
}

impl fmt::Debug for MediaCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MediaCache")
            .field("config", &self.inner.config)
            .field("stats", &self.stats())
            .finish()
    }
}

impl CacheInner {
    fn is_expired(&self, entry: &CacheEntry, now: DateTime<Utc>) -> bool {
        // A negative age (clock moved backwards) counts as fresh.
        match (now - entry.created_at).to_std() {
            Ok(age) => age > self.config.ttl,
            Err(_) => false,
        }
    }

    fn take_expired(&self, state: &mut CacheState, now: DateTime<Utc>) -> Removed {
        let expired: Vec<String> = state
            .entries
            .iter()
            .filter(|(_, entry)| self.is_expired(entry, now))
            .map(|(locator, _)| locator.clone())
            .collect();

        let mut removed = Vec::with_capacity(expired.len());
        for locator in expired {
            if let Some(entry) = state.entries.remove(&locator) {
                state.expirations += 1;
                removed.push((locator, entry, EvictionReason::Expired));
            }
        }
        removed
    }

    /// Evict oldest entries until one more fits.
    fn make_room(&self, state: &mut CacheState, removed: &mut Removed) {
        while state.entries.len() >= self.config.capacity {
            let oldest = state
                .entries
                .iter()
                .min_by_key(|(_, entry)| (entry.created_at, entry.seq))
                .map(|(locator, _)| locator.clone());

            let Some(locator) = oldest else { break };
            if let Some(entry) = state.entries.remove(&locator) {
                state.evictions += 1;
                removed.push((locator, entry, EvictionReason::Capacity));
            }
        }
    }

    /// Revoke removed handles outside the state lock and report them.
    fn finish_removal(&self, removed: Removed) {
        for (locator, entry, reason) in removed {
            debug!(locator = %strip_query(&locator), ?reason, "Evicting cache entry");
            entry.handle.release();
            self.emit(CacheEvent::Evicted { locator, reason });
        }
    }

    fn emit(&self, event: CacheEvent) {
        if let Some(bus) = &self.event_bus {
            let _ = bus.emit(CoreEvent::Cache(event));
        }
    }

    fn fallback(&self, locator: String, message: String) -> MediaSource {
        warn!(locator = %strip_query(&locator), error = %message, "Falling back to remote source");
        {
            let mut state = self.state.lock();
            state.fallbacks += 1;
            state.in_flight.remove(&locator);
        }
        self.emit(CacheEvent::Fallback {
            locator: locator.clone(),
            message,
        });
        MediaSource::Direct { locator }
    }
}

/// Single fetch for one locator, shared by every concurrent caller.
///
/// The future lives in the cache's in-flight map, so it only holds a weak
/// reference to the cache and never keeps it alive across an await.
async fn populate(cache: Weak<CacheInner>, locator: String) -> MediaSource {
    let (http_client, blob_store, fetch_timeout) = {
        let Some(inner) = cache.upgrade() else {
            return MediaSource::Direct { locator };
        };
        let removed = {
            let mut state = inner.state.lock();
            let mut removed = inner.take_expired(&mut state, inner.clock.now());
            inner.make_room(&mut state, &mut removed);
            removed
        };
        inner.finish_removal(removed);
        (
            inner.http_client.clone(),
            inner.blob_store.clone(),
            inner.config.fetch_timeout,
        )
    };

    let request = HttpRequest::get(locator.as_str()).timeout(fetch_timeout);
    let response = match http_client.fetch_bytes(request).await {
        Ok(response) => response,
        Err(e) => return fallback(&cache, locator, e.to_string()),
    };

    let bytes = response.body.len() as u64;
    let uri = match blob_store
        .create_object_url(response.body.clone(), response.content_type())
        .await
    {
        Ok(uri) => uri,
        Err(e) => return fallback(&cache, locator, e.to_string()),
    };

    let handle = PlayableHandle::new(uri.clone(), blob_store);
    let Some(inner) = cache.upgrade() else {
        debug!(locator = %strip_query(&locator), "Cache dropped during fetch");
        handle.release();
        return MediaSource::Direct { locator };
    };

    let now = inner.clock.now();
    let (removed, replaced) = {
        let mut state = inner.state.lock();
        state.in_flight.remove(&locator);

        let mut removed = inner.take_expired(&mut state, now);
        // Other locators may have been inserted while this fetch was running.
        let replaced = state.entries.remove(&locator);
        inner.make_room(&mut state, &mut removed);

        let seq = state.next_seq;
        state.next_seq += 1;
        state.entries.insert(
            locator.clone(),
            CacheEntry {
                handle,
                created_at: now,
                seq,
            },
        );
        (removed, replaced)
    };
    inner.finish_removal(removed);
    drop(replaced);

    info!(locator = %strip_query(&locator), bytes, "Media cached");
    inner.emit(CacheEvent::Populated {
        locator,
        uri: uri.clone(),
        bytes,
    });

    MediaSource::Cached { uri }
}

fn fallback(cache: &Weak<CacheInner>, locator: String, message: String) -> MediaSource {
    match cache.upgrade() {
        Some(inner) => inner.fallback(locator, message),
        None => MediaSource::Direct { locator },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use bridge_traits::error::{BridgeError, Result as BridgeResult};
    use bridge_traits::{HttpResponse, ManualClock};
    use bytes::Bytes;
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[derive(Default)]
    struct StubHttp {
        failing: HashSet<String>,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl HttpClient for StubHttp {
        async fn execute(&self, request: HttpRequest) -> BridgeResult<HttpResponse> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let status = if self.failing.contains(&request.url) {
                503
            } else {
                200
            };
            Ok(HttpResponse {
                status,
                headers: HashMap::new(),
                body: Bytes::from_static(b"audio"),
            })
        }
    }

    #[derive(Default)]
    struct StubBlobs {
        created: AtomicUsize,
        revoked: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl BlobStore for StubBlobs {
        async fn create_object_url(
            &self,
            _data: Bytes,
            _content_type: Option<&str>,
        ) -> BridgeResult<String> {
            let n = self.created.fetch_add(1, Ordering::SeqCst);
            Ok(format!("blob:{}", n))
        }

        fn revoke_object_url(&self, uri: &str) {
            self.revoked.lock().push(uri.to_string());
        }
    }

    struct BrokenBlobs;

    #[async_trait]
    impl BlobStore for BrokenBlobs {
        async fn create_object_url(
            &self,
            _data: Bytes,
            _content_type: Option<&str>,
        ) -> BridgeResult<String> {
            Err(BridgeError::NotAvailable("object urls".to_string()))
        }

        fn revoke_object_url(&self, _uri: &str) {}
    }

    fn cache_with(
        config: CacheConfig,
        http: Arc<StubHttp>,
        blobs: Arc<StubBlobs>,
        clock: Arc<ManualClock>,
    ) -> MediaCache {
        MediaCache::new(config, http, blobs)
            .unwrap()
            .with_clock(clock)
    }

    #[test]
    fn test_rejects_invalid_config() {
        let result = MediaCache::new(
            CacheConfig::default().with_capacity(0),
            Arc::new(StubHttp::default()),
            Arc::new(StubBlobs::default()),
        );
        assert!(matches!(result, Err(PlaybackError::CacheError(_))));
    }

    #[tokio::test]
    async fn test_hit_does_not_refetch() {
        let http = Arc::new(StubHttp::default());
        let blobs = Arc::new(StubBlobs::default());
        let cache = cache_with(
            CacheConfig::default(),
            http.clone(),
            blobs,
            Arc::new(ManualClock::default()),
        );

        let first = cache.acquire("https://cdn/a.mp3").await;
        let second = cache.acquire("https://cdn/a.mp3").await;

        assert_eq!(first, MediaSource::Cached { uri: "blob:0".into() });
        assert_eq!(first, second);
        assert_eq!(http.calls.load(Ordering::SeqCst), 1);

        let stats = cache.stats();
        assert_eq!((stats.hits, stats.misses, stats.entries), (1, 1, 1));
    }

    #[tokio::test]
    async fn test_failed_fetch_falls_back_to_locator() {
        let http = Arc::new(StubHttp {
            failing: HashSet::from(["https://cdn/down.mp3".to_string()]),
            ..Default::default()
        });
        let cache = cache_with(
            CacheConfig::default(),
            http,
            Arc::new(StubBlobs::default()),
            Arc::new(ManualClock::default()),
        );

        let source = cache.acquire("https://cdn/down.mp3").await;
        assert_eq!(
            source,
            MediaSource::Direct {
                locator: "https://cdn/down.mp3".into()
            }
        );
        assert!(cache.is_empty());
        assert_eq!(cache.stats().fallbacks, 1);
    }

    #[tokio::test]
    async fn test_blob_failure_falls_back() {
        let cache = MediaCache::new(
            CacheConfig::default(),
            Arc::new(StubHttp::default()),
            Arc::new(BrokenBlobs),
        )
        .unwrap();

        let source = cache.acquire("https://cdn/a.mp3").await;
        assert!(!source.is_cached());
        assert_eq!(cache.stats().fallbacks, 1);
    }

    #[tokio::test]
    async fn test_capacity_evicts_oldest() {
        let blobs = Arc::new(StubBlobs::default());
        let clock = Arc::new(ManualClock::default());
        let cache = cache_with(
            CacheConfig::default().with_capacity(2),
            Arc::new(StubHttp::default()),
            blobs.clone(),
            clock.clone(),
        );

        cache.acquire("a").await;
        clock.advance(chrono::Duration::seconds(1));
        cache.acquire("b").await;
        clock.advance(chrono::Duration::seconds(1));
        cache.acquire("c").await;

        assert_eq!(cache.len(), 2);
        assert!(cache.cached_uri("a").is_none());
        assert!(cache.cached_uri("b").is_some());
        assert_eq!(*blobs.revoked.lock(), vec!["blob:0".to_string()]);
        assert_eq!(cache.stats().evictions, 1);
    }

    #[tokio::test]
    async fn test_same_timestamp_ties_break_by_insertion() {
        let blobs = Arc::new(StubBlobs::default());
        let cache = cache_with(
            CacheConfig::default().with_capacity(2),
            Arc::new(StubHttp::default()),
            blobs.clone(),
            Arc::new(ManualClock::default()),
        );

        cache.acquire("a").await;
        cache.acquire("b").await;
        cache.acquire("c").await;

        assert!(cache.cached_uri("a").is_none());
        assert!(cache.cached_uri("b").is_some());
        assert!(cache.cached_uri("c").is_some());
    }

    #[tokio::test]
    async fn test_expired_entry_is_refetched() {
        let http = Arc::new(StubHttp::default());
        let blobs = Arc::new(StubBlobs::default());
        let clock = Arc::new(ManualClock::default());
        let cache = cache_with(
            CacheConfig::default().with_ttl(Duration::from_secs(60)),
            http.clone(),
            blobs.clone(),
            clock.clone(),
        );

        cache.acquire("a").await;
        clock.advance(chrono::Duration::seconds(60));
        assert!(cache.cached_uri("a").is_some());

        clock.advance(chrono::Duration::seconds(1));
        assert!(cache.cached_uri("a").is_none());

        let source = cache.acquire("a").await;
        assert_eq!(source.uri(), "blob:1");
        assert_eq!(http.calls.load(Ordering::SeqCst), 2);
        assert_eq!(*blobs.revoked.lock(), vec!["blob:0".to_string()]);
        assert_eq!(cache.stats().expirations, 1);
    }

    #[tokio::test]
    async fn test_release_and_clear_revoke_once() {
        let blobs = Arc::new(StubBlobs::default());
        let cache = cache_with(
            CacheConfig::default(),
            Arc::new(StubHttp::default()),
            blobs.clone(),
            Arc::new(ManualClock::default()),
        );

        cache.acquire("a").await;
        cache.acquire("b").await;

        assert!(cache.release("a"));
        assert!(!cache.release("a"));
        cache.clear();
        cache.clear();

        let mut revoked = blobs.revoked.lock().clone();
        revoked.sort();
        assert_eq!(revoked, vec!["blob:0".to_string(), "blob:1".to_string()]);
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn test_drop_revokes_remaining_entries() {
        let blobs = Arc::new(StubBlobs::default());
        {
            let cache = cache_with(
                CacheConfig::default(),
                Arc::new(StubHttp::default()),
                blobs.clone(),
                Arc::new(ManualClock::default()),
            );
            cache.acquire("a").await;
        }
        assert_eq!(blobs.revoked.lock().len(), 1);
    }

    #[tokio::test]
    async fn test_purge_expired_counts_removed() {
        let clock = Arc::new(ManualClock::default());
        let cache = cache_with(
            CacheConfig::default().with_ttl(Duration::from_secs(10)),
            Arc::new(StubHttp::default()),
            Arc::new(StubBlobs::default()),
            clock.clone(),
        );

        cache.acquire("a").await;
        cache.acquire("b").await;
        clock.advance(chrono::Duration::seconds(11));

        assert_eq!(cache.len(), 2);
        assert_eq!(cache.purge_expired(), 2);
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn test_events_are_published() {
        let bus = EventBus::new(16);
        let mut rx = bus.subscribe();
        let cache = MediaCache::new(
            CacheConfig::default(),
            Arc::new(StubHttp::default()),
            Arc::new(StubBlobs::default()),
        )
        .unwrap()
        .with_event_bus(bus);

        cache.acquire("a").await;
        cache.release("a");

        assert!(matches!(
            rx.recv().await.unwrap(),
            CoreEvent::Cache(CacheEvent::Populated { bytes: 5, .. })
        ));
        assert_eq!(
            rx.recv().await.unwrap(),
            CoreEvent::Cache(CacheEvent::Evicted {
                locator: "a".into(),
                reason: EvictionReason::Released
            })
        );
    }

    #[tokio::test]
    async fn test_prefetch_populates_after_delay() {
        let cache = MediaCache::new(
            CacheConfig::default().with_prefetch_delay(Duration::from_millis(5)),
            Arc::new(StubHttp::default()),
            Arc::new(StubBlobs::default()),
        )
        .unwrap();

        let task = cache.prefetch("a").unwrap();
        task.await.unwrap();

        assert!(cache.cached_uri("a").is_some());
    }

    #[test]
    fn test_prefetch_without_runtime_is_skipped() {
        let cache = MediaCache::new(
            CacheConfig::default(),
            Arc::new(StubHttp::default()),
            Arc::new(StubBlobs::default()),
        )
        .unwrap();

        assert!(cache.prefetch("a").is_none());
    }
}
