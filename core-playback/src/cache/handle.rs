//! Owned object-URL handle.

use bridge_traits::BlobStore;
use std::fmt;
use std::sync::Arc;

/// A locally-backed URI that is revoked exactly once.
///
/// The handle owns the URI returned by [`BlobStore::create_object_url`].
/// Dropping it, or calling [`release`](PlayableHandle::release), revokes the
/// URI; the two paths share one guard so a handle can never be revoked twice.
pub struct PlayableHandle {
    uri: String,
    store: Option<Arc<dyn BlobStore>>,
}

impl PlayableHandle {
    pub fn new(uri: String, store: Arc<dyn BlobStore>) -> Self {
        Self {
            uri,
            store: Some(store),
        }
    }

    pub fn uri(&self) -> &str {
        &self.uri
    }

    /// Revoke now instead of at drop.
    pub fn release(mut self) {
        self.revoke();
    }

    fn revoke(&mut self) {
        if let Some(store) = self.store.take() {
            store.revoke_object_url(&self.uri);
        }
    }
}

impl Drop for PlayableHandle {
    fn drop(&mut self) {
        self.revoke();
    }
}

impl fmt::Debug for PlayableHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PlayableHandle")
            .field("uri", &self.uri)
            .field("live", &self.store.is_some())
            .finish()
    }
}
