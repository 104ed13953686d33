//! Object URL abstraction.
//!
//! Browsers expose `URL.createObjectURL` / `URL.revokeObjectURL` to turn a blob
//! of fetched bytes into a locally-backed URI that the audio element can play
//! without touching the network again. [`BlobStore`] models that primitive so
//! the media cache can own the URI and revoke it deterministically.

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::Result;

/// Materializes fetched bytes into playable, revocable URIs.
///
/// Every URI returned by [`create_object_url`](BlobStore::create_object_url)
/// must eventually be passed to [`revoke_object_url`](BlobStore::revoke_object_url)
/// exactly once. The core guarantees this pairing; implementations only need
/// to free the backing storage when asked.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Store `data` and return a URI a [`MediaElement`](crate::MediaElement) can load.
    async fn create_object_url(&self, data: Bytes, content_type: Option<&str>) -> Result<String>;

    /// Release the storage behind `uri`.
    ///
    /// Synchronous so it can run from `Drop`. Revoking an unknown URI is a no-op.
    fn revoke_object_url(&self, uri: &str);
}
