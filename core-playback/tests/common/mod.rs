//! Hand-written bridge doubles shared by the integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use bridge_traits::error::{BridgeError, Result};
use bridge_traits::{
    BlobStore, HttpClient, HttpRequest, HttpResponse, MediaElement, MediaInfo, MediaSource,
};
use bytes::Bytes;
use core_playback::Track;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;

pub fn track(id: &str) -> Track {
    Track::new(id, format!("Title {}", id), locator(id))
        .with_artwork(format!("https://cdn.test/{}.jpg", id))
}

pub fn tracks(ids: &[&str]) -> Vec<Track> {
    ids.iter().map(|id| track(id)).collect()
}

pub fn locator(id: &str) -> String {
    format!("https://cdn.test/{}.mp3", id)
}

/// URI the [`EchoBlobStore`] hands out for `id`'s audio.
pub fn blob_uri(id: &str) -> String {
    format!("blob:{}", locator(id))
}

/// Serves the request URL as the body. Locators can be made to fail or to
/// block until released.
#[derive(Default)]
pub struct FakeHttp {
    failing: Mutex<HashSet<String>>,
    gates: Mutex<HashMap<String, Arc<Notify>>>,
    calls: AtomicUsize,
}

impl FakeHttp {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn fail(&self, url: &str) {
        self.failing.lock().insert(url.to_string());
    }

    /// Hold requests for `url` until [`release`](Self::release).
    pub fn gate(&self, url: &str) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        self.gates.lock().insert(url.to_string(), gate.clone());
        gate
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl HttpClient for FakeHttp {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        let gate = self.gates.lock().get(&request.url).cloned();
        if let Some(gate) = gate {
            gate.notified().await;
        }

        if self.failing.lock().contains(&request.url) {
            return Err(BridgeError::OperationFailed(format!(
                "connection refused: {}",
                request.url
            )));
        }

        Ok(HttpResponse {
            status: 200,
            headers: HashMap::from([("Content-Type".to_string(), "audio/mpeg".to_string())]),
            body: Bytes::from(request.url.clone()),
        })
    }
}

/// Returns `blob:<body>` and records revocations.
#[derive(Default)]
pub struct EchoBlobStore {
    revoked: Mutex<Vec<String>>,
}

impl EchoBlobStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn revoked(&self) -> Vec<String> {
        self.revoked.lock().clone()
    }
}

#[async_trait]
impl BlobStore for EchoBlobStore {
    async fn create_object_url(&self, data: Bytes, _content_type: Option<&str>) -> Result<String> {
        Ok(format!("blob:{}", String::from_utf8_lossy(&data)))
    }

    fn revoke_object_url(&self, uri: &str) {
        self.revoked.lock().push(uri.to_string());
    }
}

/// Scriptable audio element.
pub struct FakeMedia {
    calls: Mutex<Vec<String>>,
    loads: Mutex<Vec<MediaSource>>,
    durations: Mutex<HashMap<String, f64>>,
    broken: Mutex<HashSet<String>>,
    gates: Mutex<HashMap<String, Arc<Notify>>>,
    reject_play: AtomicBool,
    default_duration: f64,
}

impl FakeMedia {
    pub fn new() -> Arc<Self> {
        Self::with_duration(180.0)
    }

    pub fn with_duration(default_duration: f64) -> Arc<Self> {
        Arc::new(Self {
            calls: Mutex::new(Vec::new()),
            loads: Mutex::new(Vec::new()),
            durations: Mutex::new(HashMap::new()),
            broken: Mutex::new(HashSet::new()),
            gates: Mutex::new(HashMap::new()),
            reject_play: AtomicBool::new(false),
            default_duration,
        })
    }

    pub fn set_duration(&self, uri: &str, duration: f64) {
        self.durations.lock().insert(uri.to_string(), duration);
    }

    pub fn break_source(&self, uri: &str) {
        self.broken.lock().insert(uri.to_string());
    }

    /// Hold `load` for `uri` until the returned gate is notified.
    pub fn gate(&self, uri: &str) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        self.gates.lock().insert(uri.to_string(), gate.clone());
        gate
    }

    pub fn reject_play(&self, reject: bool) {
        self.reject_play.store(reject, Ordering::SeqCst);
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    pub fn count(&self, call: &str) -> usize {
        self.calls.lock().iter().filter(|c| c.as_str() == call).count()
    }

    pub fn loads(&self) -> Vec<MediaSource> {
        self.loads.lock().clone()
    }

    pub fn was_loaded(&self, uri: &str) -> bool {
        self.loads.lock().iter().any(|s| s.uri() == uri)
    }
}

#[async_trait]
impl MediaElement for FakeMedia {
    async fn load(&self, source: &MediaSource) -> Result<MediaInfo> {
        self.loads.lock().push(source.clone());
        self.calls.lock().push(format!("load:{}", source.uri()));

        let gate = self.gates.lock().get(source.uri()).cloned();
        if let Some(gate) = gate {
            gate.notified().await;
        }

        if self.broken.lock().contains(source.uri()) {
            return Err(BridgeError::Media("unsupported format".to_string()));
        }

        let duration = self
            .durations
            .lock()
            .get(source.uri())
            .copied()
            .unwrap_or(self.default_duration);
        Ok(MediaInfo::new(duration))
    }

    async fn play(&self) -> Result<()> {
        self.calls.lock().push("play".to_string());
        if self.reject_play.load(Ordering::SeqCst) {
            return Err(BridgeError::Media("play() was blocked".to_string()));
        }
        Ok(())
    }

    fn pause(&self) {
        self.calls.lock().push("pause".to_string());
    }

    fn seek(&self, position: f64) {
        self.calls.lock().push(format!("seek:{}", position));
    }

    fn set_volume(&self, volume: f32) {
        self.calls.lock().push(format!("volume:{}", volume));
    }

    fn set_muted(&self, muted: bool) {
        self.calls.lock().push(format!("muted:{}", muted));
    }
}
