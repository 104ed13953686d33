//! Object URLs backed by files on disk

use async_trait::async_trait;
use bridge_traits::{
    blob::BlobStore,
    error::{BridgeError, Result},
};
use bytes::Bytes;
use parking_lot::Mutex;
use std::collections::HashSet;
use std::path::PathBuf;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};
use uuid::Uuid;

const URI_SCHEME: &str = "file://";

/// [`BlobStore`] that writes each blob to its own file under a cache
/// directory and hands out `file://` URIs.
///
/// Revocation deletes the file. Files still outstanding when the store is
/// dropped are removed as well.
pub struct FileBlobStore {
    root: PathBuf,
    issued: Mutex<HashSet<String>>,
}

impl FileBlobStore {
    /// Store blobs under the platform cache directory.
    pub fn new() -> Self {
        let root = dirs::cache_dir()
            .unwrap_or_else(std::env::temp_dir)
            .join("cadence-player")
            .join("media");
        Self::with_directory(root)
    }

    /// Store blobs under a custom directory.
    pub fn with_directory(root: PathBuf) -> Self {
        Self {
            root,
            issued: Mutex::new(HashSet::new()),
        }
    }

    pub fn directory(&self) -> &PathBuf {
        &self.root
    }

    /// Number of URIs created and not yet revoked.
    pub fn outstanding(&self) -> usize {
        self.issued.lock().len()
    }

    fn extension_for(content_type: Option<&str>) -> &'static str {
        let essence = content_type
            .and_then(|ct| ct.split(';').next())
            .map(|ct| ct.trim().to_ascii_lowercase());
        match essence.as_deref() {
            Some("audio/mpeg") | Some("audio/mp3") => "mp3",
            Some("audio/ogg") => "ogg",
            Some("audio/wav") | Some("audio/x-wav") => "wav",
            Some("audio/flac") => "flac",
            Some("audio/aac") => "aac",
            Some("audio/mp4") => "m4a",
            _ => "bin",
        }
    }

    fn path_for(&self, uri: &str) -> Option<PathBuf> {
        let path = PathBuf::from(uri.strip_prefix(URI_SCHEME)?);
        path.starts_with(&self.root).then_some(path)
    }
}

impl Default for FileBlobStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BlobStore for FileBlobStore {
    async fn create_object_url(&self, data: Bytes, content_type: Option<&str>) -> Result<String> {
        fs::create_dir_all(&self.root).await?;

        let path = self.root.join(format!(
            "{}.{}",
            Uuid::new_v4(),
            Self::extension_for(content_type)
        ));

        let mut file = fs::File::create(&path).await?;
        file.write_all(&data).await?;
        file.flush().await?;

        let uri = format!("{}{}", URI_SCHEME, path.to_string_lossy());
        self.issued.lock().insert(uri.clone());
        debug!(uri = %uri, bytes = data.len(), "Created object URL");
        Ok(uri)
    }

    fn revoke_object_url(&self, uri: &str) {
        if !self.issued.lock().remove(uri) {
            return;
        }
        let Some(path) = self.path_for(uri) else {
            return;
        };
        match std::fs::remove_file(&path) {
            Ok(()) => debug!(uri, "Revoked object URL"),
            Err(e) => warn!(uri, error = %BridgeError::Io(e), "Failed to remove blob file"),
        }
    }
}

impl Drop for FileBlobStore {
    fn drop(&mut self) {
        let issued = std::mem::take(self.issued.get_mut());
        for uri in issued {
            let Some(path) = self.path_for(&uri) else {
                continue;
            };
            if let Err(e) = std::fs::remove_file(&path) {
                warn!(uri = %uri, error = %BridgeError::Io(e), "Failed to remove blob file on drop");
            }
        }
    }
}
