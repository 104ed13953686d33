//! # Catalog Client
//!
//! Fetches the ordered track list from the catalog endpoint.
//!
//! The endpoint returns a JSON array of track records. Records that are not
//! objects, or that lack a non-empty `title`, `audiofile` or `coverart`, are
//! skipped. Failed fetches are retried with exponential backoff (1s, 2s, 4s).

use crate::error::{CoreError, Result};
use bridge_traits::{HttpClient, HttpRequest, RetryPolicy};
use core_playback::Track;
use core_runtime::events::{CatalogEvent, CoreEvent, EventBus};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

const REQUIRED_FIELDS: [&str; 3] = ["title", "audiofile", "coverart"];

/// Catalog endpoint settings.
#[derive(Debug, Clone)]
pub struct CatalogConfig {
    pub url: String,
    /// Per-attempt timeout (default: 10s)
    pub timeout: Duration,
    /// Attempts and backoff between them (default: 4 attempts, 1s/2s/4s)
    pub retry: RetryPolicy,
}

impl CatalogConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            timeout: Duration::from_secs(10),
            retry: RetryPolicy {
                max_attempts: 4,
                base_delay: Duration::from_secs(1),
                max_delay: Duration::from_secs(4),
                use_exponential_backoff: true,
            },
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }
}

pub struct CatalogClient {
    config: CatalogConfig,
    http_client: Arc<dyn HttpClient>,
    event_bus: Option<EventBus>,
}

impl CatalogClient {
    pub fn new(config: CatalogConfig, http_client: Arc<dyn HttpClient>) -> Self {
        Self {
            config,
            http_client,
            event_bus: None,
        }
    }

    pub fn with_event_bus(mut self, event_bus: EventBus) -> Self {
        self.event_bus = Some(event_bus);
        self
    }

    pub fn config(&self) -> &CatalogConfig {
        &self.config
    }

    /// Fetch and validate the catalog, retrying on failure.
    ///
    /// # Errors
    ///
    /// [`CoreError::CatalogUnavailable`] once every attempt failed; it carries
    /// the last attempt's error message.
    #[instrument(skip(self), fields(url = %self.config.url))]
    pub async fn fetch_tracks(&self) -> Result<Vec<Track>> {
        let max_attempts = self.config.retry.max_attempts.max(1);
        let mut last_error = None;

        for attempt in 1..=max_attempts {
            self.emit(CatalogEvent::Loading {
                url: self.config.url.clone(),
                attempt,
            });

            match self.fetch_once().await {
                Ok(tracks) => {
                    info!(attempt, count = tracks.len(), "Catalog loaded");
                    self.emit(CatalogEvent::Loaded {
                        track_count: tracks.len(),
                    });
                    return Ok(tracks);
                }
                Err(e) => {
                    warn!(attempt, error = %e, "Catalog fetch failed");
                    last_error = Some(e);
                }
            }

            if attempt < max_attempts {
                let delay = self.config.retry.delay_for(attempt);
                debug!(?delay, "Retrying catalog fetch");
                tokio::time::sleep(delay).await;
            }
        }

        let message = last_error
            .map(|e| e.to_string())
            .unwrap_or_else(|| "Unknown error occurred".to_string());
        self.emit(CatalogEvent::Failed {
            message: message.clone(),
            attempts: max_attempts,
        });

        Err(CoreError::CatalogUnavailable {
            attempts: max_attempts,
            message,
        })
    }

    /// Single attempt, no retry.
    pub async fn fetch_once(&self) -> Result<Vec<Track>> {
        let request = HttpRequest::get(self.config.url.as_str())
            .header("Accept", "application/json")
            .header("Cache-Control", "no-cache")
            .timeout(self.config.timeout);

        let response = self.http_client.fetch_bytes(request).await?;
        let body: Value = response.json()?;
        parse_catalog(body)
    }

    fn emit(&self, event: CatalogEvent) {
        if let Some(bus) = &self.event_bus {
            let _ = bus.emit(CoreEvent::Catalog(event));
        }
    }
}

/// Validate a decoded catalog body and keep the playable records.
pub fn parse_catalog(body: Value) -> Result<Vec<Track>> {
    let Value::Array(records) = body else {
        return Err(CoreError::InvalidCatalog(
            "Invalid API response format".to_string(),
        ));
    };

    let tracks: Vec<Track> = records
        .into_iter()
        .filter(has_required_fields)
        .filter_map(|record| match serde_json::from_value::<Track>(record) {
            Ok(track) => Some(track),
            Err(e) => {
                warn!(error = %e, "Skipping malformed catalog record");
                None
            }
        })
        .collect();

    if tracks.is_empty() {
        return Err(CoreError::EmptyCatalog);
    }
    Ok(tracks)
}

fn has_required_fields(record: &Value) -> bool {
    let Some(object) = record.as_object() else {
        return false;
    };
    REQUIRED_FIELDS.iter().all(|field| {
        object
            .get(*field)
            .and_then(Value::as_str)
            .is_some_and(|value| !value.is_empty())
    })
}
