//! TTL memoization for expensive producers, keyed by identity plus arguments.
//!
//! [`CredentialCache`] is the one object shared by every sync worker. Reads and
//! writes go through a [`CacheBackend`]; misses for the same key are collapsed so the
//! producer runs once while other callers wait for its result.
//!
//! Keys are `"{identity}_{blake3(canonical json of args)}"`. `serde_json` maps are
//! ordered by key, so two argument maps with the same entries hash the same no
//! matter how they were built.

pub mod memory;
pub mod sqlite;

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Serialize, de::DeserializeOwned};
use serde_json::Value;
use tracing::debug;

pub use memory::MemoryCacheBackend;
pub use sqlite::SqliteCacheBackend;

/// Errors raised by cache backends.
#[derive(thiserror::Error, Debug)]
pub enum CacheError {
    /// Backend storage failure.
    #[error("cache storage: {0}")]
    Storage(String),

    /// A value or argument set could not be (de)serialized.
    #[error("cache serialization: {0}")]
    Serde(#[from] serde_json::Error),
}

impl From<diesel::result::Error> for CacheError {
    fn from(e: diesel::result::Error) -> Self {
        CacheError::Storage(e.to_string())
    }
}

/// Storage behind a [`CredentialCache`].
pub trait CacheBackend: Send + Sync {
    /// Returns the value for `key` if it has not expired at `now`. Expired entries
    /// are dropped.
    fn get(&self, key: &str, now: DateTime<Utc>) -> Result<Option<Value>, CacheError>;

    /// Stores `value` until `expires_at`, replacing any previous entry.
    fn put(&self, key: &str, value: &Value, expires_at: DateTime<Utc>) -> Result<(), CacheError>;

    /// Drops one entry; absent keys are not an error.
    fn remove(&self, key: &str) -> Result<(), CacheError>;

    /// Drops every entry.
    fn clear(&self) -> Result<(), CacheError>;
}

/// Builds the cache key for `identity` called with `args`.
pub fn cache_key<A: Serialize + ?Sized>(identity: &str, args: &A) -> Result<String, CacheError> {
    let canonical = serde_json::to_vec(&serde_json::to_value(args)?)?;
    Ok(format!("{identity}_{}", blake3::hash(&canonical).to_hex()))
}

/// Thread-safe memoizer with per-entry TTL.
pub struct CredentialCache {
    backend: Box<dyn CacheBackend>,
    inflight: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl CredentialCache {
    /// Wraps a backend.
    pub fn new(backend: impl CacheBackend + 'static) -> Self {
        Self {
            backend: Box::new(backend),
            inflight: Mutex::new(HashMap::new()),
        }
    }

    /// Returns the cached value for `(identity, args)` or runs `producer` and caches
    /// its result for `ttl`.
    ///
    /// Producer errors are returned as-is and nothing is cached.
    pub async fn get_or_compute<A, T, E, F, Fut>(
        &self,
        identity: &str,
        args: &A,
        ttl: Duration,
        producer: F,
    ) -> Result<T, E>
    where
        A: Serialize + ?Sized,
        T: Serialize + DeserializeOwned,
        E: From<CacheError>,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let key = cache_key(identity, args)?;
        if let Some(hit) = self.lookup::<T>(&key)? {
            debug!(identity, "cache hit");
            return Ok(hit);
        }

        let gate = self.gate(&key)?;
        let _held = gate.lock().await;

        // Another caller may have filled the entry while we waited.
        if let Some(hit) = self.lookup::<T>(&key)? {
            debug!(identity, "cache filled by concurrent caller");
            return Ok(hit);
        }

        debug!(identity, "cache miss");
        let value = producer().await?;
        let now = Utc::now();
        let expires_at = chrono::Duration::from_std(ttl)
            .ok()
            .and_then(|d| now.checked_add_signed(d))
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        self.backend
            .put(&key, &serde_json::to_value(&value).map_err(CacheError::from)?, expires_at)?;
        Ok(value)
    }

    /// Drops the entry for `(identity, args)`.
    pub fn invalidate<A: Serialize + ?Sized>(&self, identity: &str, args: &A) -> Result<(), CacheError> {
        let key = cache_key(identity, args)?;
        debug!(identity, "cache invalidate");
        self.backend.remove(&key)
    }

    /// Drops every entry.
    pub fn clear_all(&self) -> Result<(), CacheError> {
        self.backend.clear()
    }

    fn lookup<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, CacheError> {
        match self.backend.get(key, Utc::now())? {
            Some(v) => Ok(Some(serde_json::from_value(v)?)),
            None => Ok(None),
        }
    }

    fn gate(&self, key: &str) -> Result<Arc<tokio::sync::Mutex<()>>, CacheError> {
        let mut map = self
            .inflight
            .lock()
            .map_err(|_| CacheError::Storage("in-flight table poisoned".to_string()))?;
        Ok(map.entry(key.to_string()).or_default().clone())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use serde_json::json;

    use super::*;

    #[derive(Debug, thiserror::Error)]
    enum TestError {
        #[error("producer failed")]
        Producer,
        #[error(transparent)]
        Cache(#[from] CacheError),
    }

    fn counted(calls: &AtomicUsize) -> impl Future<Output = Result<String, TestError>> + '_ {
        async move {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            Ok(format!("cookie-{n}"))
        }
    }

    #[test]
    fn key_ignores_map_insertion_order() {
        let a = json!({ "user_agent": "ua", "site": "x" });
        let mut m = serde_json::Map::new();
        m.insert("site".into(), json!("x"));
        m.insert("user_agent".into(), json!("ua"));
        assert_eq!(cache_key("f", &a).unwrap(), cache_key("f", &m).unwrap());
        assert_ne!(cache_key("f", &a).unwrap(), cache_key("g", &a).unwrap());
        assert!(cache_key("f", &a).unwrap().starts_with("f_"));
    }

    #[tokio::test]
    async fn hit_within_ttl_skips_producer() {
        let cache = CredentialCache::new(MemoryCacheBackend::new());
        let calls = AtomicUsize::new(0);
        let ttl = Duration::from_secs(3600);

        let a: String = cache.get_or_compute("f", "ua", ttl, || counted(&calls)).await.unwrap();
        let b: String = cache.get_or_compute("f", "ua", ttl, || counted(&calls)).await.unwrap();
        assert_eq!(a, b);
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        cache.invalidate("f", "ua").unwrap();
        let c: String = cache.get_or_compute("f", "ua", ttl, || counted(&calls)).await.unwrap();
        assert_eq!(c, "cookie-1");
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn expired_entry_recomputes() {
        let cache = CredentialCache::new(MemoryCacheBackend::new());
        let calls = AtomicUsize::new(0);

        let _: String = cache
            .get_or_compute("f", "ua", Duration::ZERO, || counted(&calls))
            .await
            .unwrap();
        let _: String = cache
            .get_or_compute("f", "ua", Duration::ZERO, || counted(&calls))
            .await
            .unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn producer_errors_are_not_cached() {
        let cache = CredentialCache::new(MemoryCacheBackend::new());
        let ttl = Duration::from_secs(60);

        let err = cache
            .get_or_compute::<_, String, _, _, _>("f", "ua", ttl, || async {
                Err(TestError::Producer)
            })
            .await
            .unwrap_err();
        assert!(matches!(err, TestError::Producer));

        let ok: String = cache
            .get_or_compute("f", "ua", ttl, || async { Ok::<_, TestError>("fresh".to_string()) })
            .await
            .unwrap();
        assert_eq!(ok, "fresh");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_misses_run_producer_once() {
        let cache = Arc::new(CredentialCache::new(MemoryCacheBackend::new()));
        let calls = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let cache = Arc::clone(&cache);
            let calls = Arc::clone(&calls);
            handles.push(tokio::spawn(async move {
                cache
                    .get_or_compute("acquire", "ua", Duration::from_secs(60), || async {
                        tokio::time::sleep(Duration::from_millis(50)).await;
                        calls.fetch_add(1, Ordering::SeqCst);
                        Ok::<_, TestError>("shared".to_string())
                    })
                    .await
            }));
        }
        for h in handles {
            assert_eq!(h.await.unwrap().unwrap(), "shared");
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn clear_all_empties_cache() {
        let cache = CredentialCache::new(MemoryCacheBackend::new());
        let calls = AtomicUsize::new(0);
        let ttl = Duration::from_secs(60);
        let _: String = cache.get_or_compute("f", "a", ttl, || counted(&calls)).await.unwrap();
        let _: String = cache.get_or_compute("g", "b", ttl, || counted(&calls)).await.unwrap();
        cache.clear_all().unwrap();
        let _: String = cache.get_or_compute("f", "a", ttl, || counted(&calls)).await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }
}
