//! Memoized cookie acquisition.

use std::sync::Arc;
use std::time::Duration;

use quote_ingestor::session::{Cookie, CookieProvider};
use serde::Serialize;
use tracing::info;

use crate::cache::CredentialCache;
use crate::error::SyncError;

/// Cache identity for cookie acquisition results.
pub const COOKIE_IDENTITY: &str = "acquire_cookies";

#[derive(Serialize)]
struct CookieArgs<'a> {
    user_agent: &'a str,
}

/// A [`CookieProvider`] fronted by the shared [`CredentialCache`].
#[derive(Clone)]
pub struct CachedCookies {
    cache: Arc<CredentialCache>,
    provider: Arc<dyn CookieProvider>,
    ttl: Duration,
}

impl CachedCookies {
    /// Memoizes `provider` in `cache` for `ttl`.
    pub fn new(cache: Arc<CredentialCache>, provider: Arc<dyn CookieProvider>, ttl: Duration) -> Self {
        Self {
            cache,
            provider,
            ttl,
        }
    }

    /// Cookies for `user_agent`, acquired at most once per TTL window.
    pub async fn cookies(&self, user_agent: &str) -> Result<Vec<Cookie>, SyncError> {
        let provider = Arc::clone(&self.provider);
        self.cache
            .get_or_compute(
                COOKIE_IDENTITY,
                &CookieArgs { user_agent },
                self.ttl,
                || async move {
                    info!("acquiring session cookies");
                    provider
                        .acquire(user_agent)
                        .await
                        .map_err(SyncError::from)
                },
            )
            .await
    }

    /// Forgets the cached cookies for `user_agent` so the next call re-acquires.
    pub fn invalidate(&self, user_agent: &str) -> Result<(), SyncError> {
        self.cache
            .invalidate(COOKIE_IDENTITY, &CookieArgs { user_agent })?;
        Ok(())
    }
}
