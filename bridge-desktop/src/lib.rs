//! # Desktop Bridge Implementations
//!
//! Default implementations of bridge traits for desktop platforms
//! (macOS, Windows, Linux).
//!
//! - [`ReqwestHttpClient`]: `HttpClient` using `reqwest` with rustls
//! - [`SqliteSettingsStore`]: `SettingsStore` on a SQLite key-value table
//! - [`FileBlobStore`]: `BlobStore` writing blobs under the cache directory
//!
//! There is no desktop `MediaElement`; the host supplies its own audio output.
//!
//! ## Usage
//!
//! ```ignore
//! use bridge_desktop::{FileBlobStore, ReqwestHttpClient, SqliteSettingsStore};
//!
//! #[tokio::main]
//! async fn main() -> bridge_traits::error::Result<()> {
//!     let http = ReqwestHttpClient::new();
//!     let blobs = FileBlobStore::new();
//!     let settings = SqliteSettingsStore::new("prefs.db".into()).await?;
//!     // Hand these to the core configuration
//!     Ok(())
//! }
//! ```

mod blob_store;
mod http;
mod settings;

pub use blob_store::FileBlobStore;
pub use http::ReqwestHttpClient;
pub use settings::SqliteSettingsStore;
