//! Storage Abstractions
//!
//! Provides the platform-agnostic preferences store. The player persists a
//! single value through it (the user's volume), but the contract is a general
//! typed key-value store so hosts can reuse their existing implementation.

use async_trait::async_trait;

use crate::error::Result;

/// Key-value settings storage trait
///
/// Persists user preferences across sessions:
/// - **Desktop**: SQLite-backed store (see `bridge-desktop`)
/// - **Web**: `localStorage`
/// - **Mobile**: UserDefaults / DataStore
///
/// # Example
///
/// ```ignore
/// use bridge_traits::storage::SettingsStore;
///
/// async fn save_volume(store: &dyn SettingsStore) -> Result<()> {
///     store.set_i64("player-volume", 70).await?;
///     Ok(())
/// }
/// ```
#[async_trait]
pub trait SettingsStore: Send + Sync {
    /// Store a string value
    async fn set_string(&self, key: &str, value: &str) -> Result<()>;

    /// Retrieve a string value
    async fn get_string(&self, key: &str) -> Result<Option<String>>;

    /// Store a boolean value
    async fn set_bool(&self, key: &str, value: bool) -> Result<()>;

    /// Retrieve a boolean value
    async fn get_bool(&self, key: &str) -> Result<Option<bool>>;

    /// Store an integer value
    async fn set_i64(&self, key: &str, value: i64) -> Result<()>;

    /// Retrieve an integer value
    async fn get_i64(&self, key: &str) -> Result<Option<i64>>;

    /// Delete a setting
    async fn delete(&self, key: &str) -> Result<()>;

    /// Check if a setting exists
    async fn has_key(&self, key: &str) -> Result<bool>;

    /// List all setting keys
    async fn list_keys(&self) -> Result<Vec<String>>;

    /// Clear all settings
    async fn clear_all(&self) -> Result<()>;
}
