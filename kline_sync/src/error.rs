//! Error taxonomy for one sync unit.

use quote_ingestor::providers::{ErrorKind, ProviderError, ProviderInitError};
use quote_ingestor::session::CookieError;
use shared_utils::config::ConfigError;
use thiserror::Error;

use crate::cache::CacheError;
use crate::store::{SaveBarsError, StoreError};

/// Everything that can fail while syncing a symbol.
#[derive(Debug, Error)]
pub enum SyncError {
    /// The provider rejected the session cookie.
    #[error("auth error: {0}")]
    Auth(String),

    /// Cookie acquisition failed.
    #[error("browser error: {0}")]
    Browser(String),

    /// Transport failure, non-success status or malformed body.
    #[error("response error: {0}")]
    Response(String),

    /// A well-formed response lacked expected fields.
    #[error("data error: {0}")]
    Data(String),

    /// Store read or commit failure.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// A bar write failed after `committed` rows had already been made durable.
    #[error("store error after {committed} committed rows: {source}")]
    PartialWrite {
        /// Rows that stayed in the store.
        committed: usize,
        /// Cause.
        source: StoreError,
    },

    /// Blocking store work panicked or was cancelled.
    #[error("store task failed: {0}")]
    Task(String),

    /// Credential cache failure.
    #[error("cache error: {0}")]
    Cache(#[from] CacheError),

    /// Invalid configuration or request parameters.
    #[error("config error: {0}")]
    Config(String),
}

impl SyncError {
    /// True when a fresh cookie might fix the failure.
    pub fn is_auth(&self) -> bool {
        matches!(self, SyncError::Auth(_))
    }

    /// Rows persisted before a failed bar write; zero for every other failure.
    pub fn committed(&self) -> usize {
        match self {
            SyncError::PartialWrite { committed, .. } => *committed,
            _ => 0,
        }
    }
}


impl From<ProviderError> for SyncError {
    fn from(e: ProviderError) -> Self {
        let msg = e.to_string();
        match e.kind() {
            ErrorKind::Auth => SyncError::Auth(msg),
            ErrorKind::Response => SyncError::Response(msg),
            ErrorKind::Data => SyncError::Data(msg),
            ErrorKind::Invalid => SyncError::Config(msg),
        }
    }
}

impl From<ProviderInitError> for SyncError {
    fn from(e: ProviderInitError) -> Self {
        SyncError::Config(e.to_string())
    }
}

impl From<CookieError> for SyncError {
    fn from(e: CookieError) -> Self {
        match e {
            CookieError::Auth(m) => SyncError::Auth(m),
            CookieError::Browser(m) => SyncError::Browser(m),
        }
    }
}

impl From<SaveBarsError> for SyncError {
    fn from(e: SaveBarsError) -> Self {
        SyncError::PartialWrite {
            committed: e.committed,
            source: e.source,
        }
    }
}

impl From<tokio::task::JoinError> for SyncError {
    fn from(e: tokio::task::JoinError) -> Self {
        SyncError::Task(e.to_string())
    }
}

impl From<ConfigError> for SyncError {
    fn from(e: ConfigError) -> Self {
        SyncError::Config(e.to_string())
    }
}

impl From<diesel::ConnectionError> for SyncError {
    fn from(e: diesel::ConnectionError) -> Self {
        SyncError::Store(StoreError::Connection(e))
    }
}
