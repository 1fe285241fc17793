//! Durable cache backend in a local SQLite file.
//!
//! The table lives in its own database (`cache_url`), separate from the quote
//! store, and is created on open. Entries survive process restarts.

use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use diesel::connection::SimpleConnection;
use diesel::prelude::*;
use serde_json::Value;

use crate::cache::{CacheBackend, CacheError};
use crate::db::connection::connect_sqlite;
use crate::schema::credential_cache;

const CREATE_TABLE: &str = "CREATE TABLE IF NOT EXISTS credential_cache (
    cache_key TEXT PRIMARY KEY NOT NULL,
    value TEXT NOT NULL,
    expires_at BIGINT NOT NULL
);";

#[derive(Insertable, AsChangeset)]
#[diesel(table_name = credential_cache)]
struct EntryRow<'a> {
    cache_key: &'a str,
    value: String,
    expires_at: i64,
}

/// SQLite-backed cache. One connection, serialized behind a mutex.
pub struct SqliteCacheBackend {
    conn: Mutex<SqliteConnection>,
}

impl SqliteCacheBackend {
    /// Opens (creating if needed) the cache database at `url`.
    pub fn open(url: &str) -> Result<Self, CacheError> {
        let mut conn = connect_sqlite(url).map_err(|e| CacheError::Storage(e.to_string()))?;
        conn.batch_execute(CREATE_TABLE)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> Result<MutexGuard<'_, SqliteConnection>, CacheError> {
        self.conn
            .lock()
            .map_err(|_| CacheError::Storage("cache connection poisoned".to_string()))
    }
}

impl CacheBackend for SqliteCacheBackend {
    fn get(&self, key: &str, now: DateTime<Utc>) -> Result<Option<Value>, CacheError> {
        let mut conn = self.conn()?;
        let row = credential_cache::table
            .filter(credential_cache::cache_key.eq(key))
            .select((credential_cache::value, credential_cache::expires_at))
            .first::<(String, i64)>(&mut *conn)
            .optional()?;

        match row {
            Some((raw, expires_at)) if expires_at > now.timestamp_millis() => {
                Ok(Some(serde_json::from_str(&raw)?))
            }
            Some(_) => {
                diesel::delete(credential_cache::table.filter(credential_cache::cache_key.eq(key)))
                    .execute(&mut *conn)?;
                Ok(None)
            }
            None => Ok(None),
        }
    }

    fn put(&self, key: &str, value: &Value, expires_at: DateTime<Utc>) -> Result<(), CacheError> {
        let row = EntryRow {
            cache_key: key,
            value: serde_json::to_string(value)?,
            expires_at: expires_at.timestamp_millis(),
        };
        let mut conn = self.conn()?;
        diesel::insert_into(credential_cache::table)
            .values(&row)
            .on_conflict(credential_cache::cache_key)
            .do_update()
            .set(&row)
            .execute(&mut *conn)?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), CacheError> {
        let mut conn = self.conn()?;
        diesel::delete(credential_cache::table.filter(credential_cache::cache_key.eq(key)))
            .execute(&mut *conn)?;
        Ok(())
    }

    fn clear(&self) -> Result<(), CacheError> {
        let mut conn = self.conn()?;
        diesel::delete(credential_cache::table).execute(&mut *conn)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;
    use serde_json::json;
    use tempfile::TempDir;

    use super::*;

    #[test]
    fn entries_survive_reopen() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("cache.db");
        let url = path.to_string_lossy().to_string();
        let now = Utc::now();

        {
            let backend = SqliteCacheBackend::open(&url).unwrap();
            backend
                .put("k", &json!([{"name": "xq_a_token", "value": "t"}]), now + Duration::hours(1))
                .unwrap();
        }

        let backend = SqliteCacheBackend::open(&url).unwrap();
        let got = backend.get("k", now).unwrap();
        assert_eq!(got, Some(json!([{"name": "xq_a_token", "value": "t"}])));
    }

    #[test]
    fn expired_rows_are_dropped_on_read() {
        let dir = TempDir::new().unwrap();
        let url = dir.path().join("cache.db").to_string_lossy().to_string();
        let backend = SqliteCacheBackend::open(&url).unwrap();
        let now = Utc::now();

        backend.put("k", &json!("v"), now - Duration::seconds(1)).unwrap();
        assert_eq!(backend.get("k", now).unwrap(), None);

        backend.put("k", &json!("v2"), now + Duration::seconds(60)).unwrap();
        assert_eq!(backend.get("k", now).unwrap(), Some(json!("v2")));
        backend.remove("k").unwrap();
        assert_eq!(backend.get("k", now).unwrap(), None);
    }

    #[test]
    fn clear_drops_everything() {
        let dir = TempDir::new().unwrap();
        let url = dir.path().join("cache.db").to_string_lossy().to_string();
        let backend = SqliteCacheBackend::open(&url).unwrap();
        let later = Utc::now() + Duration::minutes(5);
        backend.put("a", &json!(1), later).unwrap();
        backend.put("b", &json!(2), later).unwrap();
        backend.clear().unwrap();
        assert_eq!(backend.get("a", Utc::now()).unwrap(), None);
        assert_eq!(backend.get("b", Utc::now()).unwrap(), None);
    }
}
