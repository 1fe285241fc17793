#![allow(dead_code)]

use std::collections::{HashMap, HashSet, VecDeque};
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use diesel::QueryableByName;
use diesel::prelude::*;
use diesel::sql_types::{Integer, Text};
use kline_sync::cache::{CredentialCache, MemoryCacheBackend};
use kline_sync::credentials::CachedCookies;
use kline_sync::db::{connection, migrate};
use kline_sync::error::SyncError;
use kline_sync::planner::SymbolSyncPlanner;
use kline_sync::worker::{SyncContext, WorkerFactory};
use quote_ingestor::models::bar::{Bar, BarBatch};
use quote_ingestor::models::market::MarketSegment;
use quote_ingestor::models::symbol::SymbolPage;
use quote_ingestor::providers::{AuthSnafu, ProviderError, QuoteApi, ShapeSnafu};
use quote_ingestor::session::{Cookie, CookieError, CookieProvider};
use rust_decimal::Decimal;
use serde_json::{Value, json};
use tempfile::TempDir;

/// 2024-01-01 00:00 in Asia/Shanghai.
pub const DAY0: i64 = 1_704_038_400_000;
pub const DAY_MS: i64 = 86_400_000;

pub fn day(n: i64) -> i64 {
    DAY0 + n * DAY_MS
}

#[derive(QueryableByName)]
struct JournalMode {
    #[diesel(sql_type = Text)]
    journal_mode: String,
}
#[derive(QueryableByName)]
struct ForeignKeys {
    #[diesel(sql_type = Integer)]
    foreign_keys: i32,
}
#[derive(QueryableByName)]
struct BusyTimeout {
    #[diesel(sql_type = Integer, column_name = "timeout")]
    busy_timeout: i32,
}

pub struct TestDb {
    _dir: TempDir,    // keep alive for the life of the test
    pub path: String, // <tmpdir>/test.db
}

pub fn setup_db() -> (TestDb, SqliteConnection) {
    let dir = TempDir::new().expect("tempdir");
    let mut p = PathBuf::from(dir.path());
    p.push("test.db");
    let path = p.to_string_lossy().to_string();

    migrate::run_all(&path).expect("migrations");

    let conn = connection::connect_sqlite(&path).expect("connect");
    (TestDb { _dir: dir, path }, conn)
}

pub fn assert_sqlite_pragmas(conn: &mut SqliteConnection) {
    use diesel::sql_query;

    let jm: JournalMode = sql_query("PRAGMA journal_mode;").get_result(conn).unwrap();
    assert_eq!(jm.journal_mode.to_lowercase(), "wal");

    let fk: ForeignKeys = sql_query("PRAGMA foreign_keys;").get_result(conn).unwrap();
    assert_eq!(fk.foreign_keys, 1);

    let bt: BusyTimeout = sql_query("PRAGMA busy_timeout;").get_result(conn).unwrap();
    assert_eq!(bt.busy_timeout, 5000);
}

/// A bar with a close price and a fixed volume.
pub fn bar(ts: i64, close: &str) -> Bar {
    Bar {
        timestamp: ts,
        volume: Some(1_000),
        close: Some(Decimal::from_str(close).unwrap()),
        ..Bar::default()
    }
}

/// Provider-shaped batch, rows in the order given.
pub fn batch(rows: &[(i64, String)]) -> BarBatch {
    BarBatch::new(
        vec!["timestamp".into(), "volume".into(), "close".into()],
        rows.iter()
            .map(|(ts, close)| vec![json!(ts), json!(1_000), json!(close)])
            .collect::<Vec<Vec<Value>>>(),
    )
}

/// `n` consecutive days starting at `first`, ascending, close = day index.
pub fn days(first: i64, n: i64) -> Vec<(i64, String)> {
    (first..first + n).map(|d| (day(d), format!("{d}.5"))).collect()
}

/// What the fake quote server knows, shared by every client built from it.
#[derive(Default)]
pub struct Market {
    /// Ascending `(timestamp, close)` per symbol, windowed like the real API.
    pub history: Mutex<HashMap<String, Vec<(i64, String)>>>,
    /// Canned responses served before falling back to `history`.
    pub scripted: Mutex<HashMap<String, VecDeque<BarBatch>>>,
    /// Every `fetch_bars` call as `(symbol, begin_ts, count)`.
    pub calls: Mutex<Vec<(String, i64, i32)>>,
    /// Cookie values the server refuses.
    pub stale_tokens: Mutex<HashSet<String>>,
    /// Symbols whose responses lack the expected sections.
    pub broken: Mutex<HashSet<String>>,
    /// Clients handed out.
    pub clients: AtomicUsize,
}

impl Market {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn set_history(&self, code: &str, rows: Vec<(i64, String)>) {
        self.history.lock().unwrap().insert(code.to_string(), rows);
    }

    pub fn script(&self, code: &str, pages: Vec<BarBatch>) {
        self.scripted
            .lock()
            .unwrap()
            .insert(code.to_string(), pages.into());
    }

    pub fn reject_token(&self, token: &str) {
        self.stale_tokens.lock().unwrap().insert(token.to_string());
    }

    pub fn break_symbol(&self, code: &str) {
        self.broken.lock().unwrap().insert(code.to_string());
    }

    pub fn calls_for(&self, code: &str) -> Vec<(i64, i32)> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(c, _, _)| c == code)
            .map(|(_, ts, n)| (*ts, *n))
            .collect()
    }

    pub fn client(self: &Arc<Self>, cookies: &[Cookie]) -> MockQuote {
        self.clients.fetch_add(1, Ordering::SeqCst);
        MockQuote {
            market: Arc::clone(self),
            cookies: cookies.to_vec(),
        }
    }

    fn window(&self, code: &str, begin_ts: i64, count: i32) -> Vec<(i64, String)> {
        let history = self.history.lock().unwrap();
        let Some(rows) = history.get(code) else {
            return Vec::new();
        };
        let n = count.unsigned_abs() as usize;
        if count < 0 {
            let older: Vec<(i64, String)> =
                rows.iter().filter(|(t, _)| *t < begin_ts).cloned().collect();
            older[older.len().saturating_sub(n)..].to_vec()
        } else {
            rows.iter()
                .filter(|(t, _)| *t >= begin_ts)
                .take(n)
                .cloned()
                .collect()
        }
    }
}

/// One client bound to one cookie set.
pub struct MockQuote {
    market: Arc<Market>,
    cookies: Vec<Cookie>,
}

#[async_trait]
impl QuoteApi for MockQuote {
    async fn list_symbols_page(
        &self,
        _segment: MarketSegment,
        _page: u32,
        _page_size: u32,
    ) -> Result<SymbolPage, ProviderError> {
        Ok(SymbolPage::default())
    }

    async fn fetch_bars(
        &self,
        symbol_code: &str,
        begin_ts: i64,
        count: i32,
    ) -> Result<BarBatch, ProviderError> {
        self.market
            .calls
            .lock()
            .unwrap()
            .push((symbol_code.to_string(), begin_ts, count));

        let stale = self.market.stale_tokens.lock().unwrap().clone();
        if self.cookies.iter().any(|c| stale.contains(&c.value)) {
            return AuthSnafu {
                status: 400u16,
                message: "token expired".to_string(),
            }
            .fail();
        }
        if self.market.broken.lock().unwrap().contains(symbol_code) {
            return ShapeSnafu {
                message: "missing `data`".to_string(),
            }
            .fail();
        }

        let scripted = self
            .market
            .scripted
            .lock()
            .unwrap()
            .get_mut(symbol_code)
            .and_then(VecDeque::pop_front);
        if let Some(page) = scripted {
            return Ok(page);
        }
        Ok(batch(&self.market.window(symbol_code, begin_ts, count)))
    }
}

/// Cookie provider that hands out `token-0`, `token-1`, ...
#[derive(Default)]
pub struct CountingCookies {
    pub calls: AtomicUsize,
}

impl CountingCookies {
    pub fn count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CookieProvider for CountingCookies {
    async fn acquire(&self, _user_agent: &str) -> Result<Vec<Cookie>, CookieError> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(vec![Cookie::new("xq_a_token", format!("token-{n}"))])
    }
}

/// Opens real SQLite connections and fake quote clients.
pub struct MockFactory {
    pub database_url: String,
    pub market: Arc<Market>,
}

impl WorkerFactory for MockFactory {
    fn open_store(&self) -> Result<SqliteConnection, SyncError> {
        Ok(connection::connect_sqlite(&self.database_url)?)
    }

    fn open_api(&self, cookies: &[Cookie]) -> Result<Box<dyn QuoteApi>, SyncError> {
        Ok(Box::new(self.market.client(cookies)))
    }
}

/// A context wired to `market`, a memory cookie cache and default windows.
pub fn context(
    db: &TestDb,
    market: &Arc<Market>,
    cookies: &Arc<CountingCookies>,
) -> SyncContext {
    let cache = Arc::new(CredentialCache::new(MemoryCacheBackend::new()));
    SyncContext {
        factory: Arc::new(MockFactory {
            database_url: db.path.clone(),
            market: Arc::clone(market),
        }),
        cookies: CachedCookies::new(cache, cookies.clone(), Duration::from_secs(3600)),
        user_agent: "test-agent".to_string(),
        planner: SymbolSyncPlanner::default(),
        commit_batch_size: 500,
    }
}
