//! Core service façade and bootstrap helpers.
//!
//! This crate wires a validated [`CoreConfig`] and a host-provided
//! [`MediaElement`] into a ready-to-use player: media cache, playback engine,
//! catalog client and a shared event bus. Desktop apps typically enable the
//! `desktop-shims` feature so the configuration falls back to the adapters
//! from `bridge-desktop` for any bridge they do not inject.
//!
//! ```rust,ignore
//! use core_runtime::config::CoreConfig;
//! use core_service::PlayerService;
//!
//! let config = CoreConfig::builder()
//!     .catalog_url("https://example.com/api/music")
//!     .data_dir("/tmp/cadence")
//!     .build()
//!     .await?;
//!
//! let player = PlayerService::bootstrap(config, media_element).await?;
//! player.engine().play_track(0).await?;
//! ```

pub mod catalog;
pub mod error;

pub use catalog::{CatalogClient, CatalogConfig};
pub use error::{CoreError, Result};

use bridge_traits::MediaElement;
use core_playback::{CacheConfig, MediaCache, PlaybackEngine};
use core_runtime::config::CoreConfig;
use core_runtime::events::{EventBus, EventStream};
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{info, warn};

/// Primary façade exposed to host applications.
pub struct PlayerService {
    engine: Arc<PlaybackEngine>,
    catalog: CatalogClient,
    event_bus: EventBus,
    catalog_error: Mutex<Option<String>>,
}

impl PlayerService {
    /// Build the player from `config` and load the catalog.
    ///
    /// A catalog that cannot be loaded does not fail the bootstrap: the
    /// error is kept in [`catalog_error`](Self::catalog_error) and the host
    /// may call [`reload_catalog`](Self::reload_catalog).
    pub async fn bootstrap(config: CoreConfig, media: Arc<dyn MediaElement>) -> Result<Self> {
        Self::bootstrap_with_event_bus(config, media, EventBus::default()).await
    }

    /// Like [`bootstrap`](Self::bootstrap), publishing on a bus the host
    /// already subscribed to.
    pub async fn bootstrap_with_event_bus(
        config: CoreConfig,
        media: Arc<dyn MediaElement>,
        event_bus: EventBus,
    ) -> Result<Self> {
        config.validate()?;

        let cache_config = CacheConfig::new()
            .with_capacity(config.cache_capacity)
            .with_ttl(config.cache_ttl)
            .with_prefetch_delay(config.prefetch_delay)
            .with_fetch_timeout(config.fetch_timeout);
        let cache = MediaCache::new(
            cache_config,
            config.http_client.clone(),
            config.blob_store.clone(),
        )?
        .with_clock(config.clock.clone())
        .with_event_bus(event_bus.clone());

        let mut engine = PlaybackEngine::new(cache, media)
            .with_event_bus(event_bus.clone())
            .with_prefetch(config.features.enable_prefetch);
        if config.features.persist_volume {
            engine = engine.with_settings(config.settings_store.clone());
        }
        let engine = Arc::new(engine);
        engine.restore_volume().await;

        let catalog = CatalogClient::new(
            CatalogConfig::new(config.catalog_url.clone()).with_timeout(config.catalog_timeout),
            config.http_client.clone(),
        )
        .with_event_bus(event_bus.clone());

        let service = Self {
            engine,
            catalog,
            event_bus,
            catalog_error: Mutex::new(None),
        };

        if let Err(e) = service.reload_catalog().await {
            warn!(error = %e, "Starting without a catalog");
        }

        info!(tracks = service.engine.track_count(), "Player service ready");
        Ok(service)
    }

    /// Fetch the catalog again and reseed the engine. Returns the track count.
    pub async fn reload_catalog(&self) -> Result<usize> {
        match self.catalog.fetch_tracks().await {
            Ok(tracks) => {
                let count = tracks.len();
                self.engine.set_tracks(tracks);
                *self.catalog_error.lock() = None;
                Ok(count)
            }
            Err(e) => {
                *self.catalog_error.lock() = Some(e.to_string());
                Err(e)
            }
        }
    }

    pub fn engine(&self) -> &Arc<PlaybackEngine> {
        &self.engine
    }

    pub fn catalog(&self) -> &CatalogClient {
        &self.catalog
    }

    /// Message of the last failed catalog load, cleared by a successful one.
    pub fn catalog_error(&self) -> Option<String> {
        self.catalog_error.lock().clone()
    }

    pub fn event_bus(&self) -> &EventBus {
        &self.event_bus
    }

    pub fn subscribe(&self) -> EventStream {
        EventStream::new(self.event_bus.subscribe())
    }

    /// Stop playback and release every cached handle.
    pub fn shutdown(&self) {
        self.engine.pause();
        self.engine.cache().clear();
        info!("Player service shut down");
    }
}
