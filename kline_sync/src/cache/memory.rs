//! Process-local cache backend.

use std::collections::HashMap;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::cache::{CacheBackend, CacheError};

/// In-memory backend; entries are lost on exit.
#[derive(Debug, Default)]
pub struct MemoryCacheBackend {
    entries: Mutex<HashMap<String, (Value, DateTime<Utc>)>>,
}

impl MemoryCacheBackend {
    /// Empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(
        &self,
    ) -> Result<std::sync::MutexGuard<'_, HashMap<String, (Value, DateTime<Utc>)>>, CacheError> {
        self.entries
            .lock()
            .map_err(|_| CacheError::Storage("memory cache poisoned".to_string()))
    }
}

impl CacheBackend for MemoryCacheBackend {
    fn get(&self, key: &str, now: DateTime<Utc>) -> Result<Option<Value>, CacheError> {
        let mut entries = self.entries()?;
        let expired = match entries.get(key) {
            Some((value, expires_at)) if *expires_at > now => return Ok(Some(value.clone())),
            Some(_) => true,
            None => false,
        };
        if expired {
            entries.remove(key);
        }
        Ok(None)
    }

    fn put(&self, key: &str, value: &Value, expires_at: DateTime<Utc>) -> Result<(), CacheError> {
        self.entries()?
            .insert(key.to_string(), (value.clone(), expires_at));
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), CacheError> {
        self.entries()?.remove(key);
        Ok(())
    }

    fn clear(&self) -> Result<(), CacheError> {
        self.entries()?.clear();
        Ok(())
    }
}
