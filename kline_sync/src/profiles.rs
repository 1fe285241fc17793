//! Memoized company profiles.
//!
//! Profiles change rarely and cost a round trip each, so they share the
//! [`CredentialCache`] with the session cookies under their own identity. The key
//! covers both the symbol and the user agent the lookup ran under.

use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use quote_ingestor::models::quote::CompanyProfile;
use quote_ingestor::providers::ReferenceApi;
use serde::Serialize;
use tracing::info;

use crate::cache::CredentialCache;
use crate::error::SyncError;
use crate::tz;

/// Cache identity for company profile lookups.
pub const PROFILE_IDENTITY: &str = "stock_profile";

#[derive(Serialize)]
struct ProfileArgs<'a> {
    symbol_code: &'a str,
    user_agent: &'a str,
}

/// Company profile lookups fronted by the shared [`CredentialCache`].
#[derive(Clone)]
pub struct CachedProfiles {
    cache: Arc<CredentialCache>,
    ttl: Duration,
}

impl CachedProfiles {
    /// Memoizes lookups in `cache` for `ttl`.
    pub fn new(cache: Arc<CredentialCache>, ttl: Duration) -> Self {
        Self { cache, ttl }
    }

    /// Profile of `symbol_code`, fetched through `api` at most once per TTL window.
    pub async fn profile(
        &self,
        api: &dyn ReferenceApi,
        symbol_code: &str,
        user_agent: &str,
    ) -> Result<CompanyProfile, SyncError> {
        self.cache
            .get_or_compute(
                PROFILE_IDENTITY,
                &ProfileArgs {
                    symbol_code,
                    user_agent,
                },
                self.ttl,
                || async move {
                    info!(symbol = symbol_code, "fetching company profile");
                    api.company_profile(symbol_code)
                        .await
                        .map_err(SyncError::from)
                },
            )
            .await
    }

    /// Exchange-local listing day, `None` when the profile does not carry one.
    pub async fn listing_date(
        &self,
        api: &dyn ReferenceApi,
        symbol_code: &str,
        user_agent: &str,
    ) -> Result<Option<NaiveDate>, SyncError> {
        let profile = self.profile(api, symbol_code, user_agent).await?;
        Ok(profile.listed_ts.and_then(tz::exchange_date))
    }

    /// Forgets the cached profile so the next lookup fetches again.
    pub fn invalidate(&self, symbol_code: &str, user_agent: &str) -> Result<(), SyncError> {
        self.cache.invalidate(
            PROFILE_IDENTITY,
            &ProfileArgs {
                symbol_code,
                user_agent,
            },
        )?;
        Ok(())
    }
}
