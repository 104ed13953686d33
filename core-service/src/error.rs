use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Core initialization failed: {0}")]
    InitializationFailed(String),

    #[error("Configuration error: {0}")]
    Runtime(#[from] core_runtime::Error),

    #[error("Bridge error: {0}")]
    Bridge(#[from] bridge_traits::BridgeError),

    #[error("Playback error: {0}")]
    Playback(#[from] core_playback::PlaybackError),

    #[error("Invalid catalog: {0}")]
    InvalidCatalog(String),

    #[error("No valid tracks found in catalog")]
    EmptyCatalog,

    #[error("Catalog unavailable after {attempts} attempts: {message}")]
    CatalogUnavailable { attempts: u32, message: String },
}

impl CoreError {
    /// Returns `true` when asking again later may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            CoreError::Bridge(_) | CoreError::CatalogUnavailable { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, CoreError>;
