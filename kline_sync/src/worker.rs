//! One symbol's sync cycle: credentials, fetch, upsert.
//!
//! Each unit opens its own store connection and API client through a
//! [`WorkerFactory`]; nothing but the cookie cache is shared between units. The
//! resources live in a [`WorkerResources`] guard that is dropped on every exit
//! path, including early returns through `?` and panics.
//!
//! Diesel is synchronous and a write may sit on the SQLite lock for the whole busy
//! timeout, so every store call runs on tokio's blocking pool. Runtime threads stay
//! free for the other units' network I/O.

use std::sync::Arc;

use diesel::SqliteConnection;
use quote_ingestor::providers::QuoteApi;
use quote_ingestor::providers::xueqiu::{SharedLimiter, XueqiuClient, XueqiuConfig, rate_limiter};
use quote_ingestor::session::Cookie;
use tokio::task;
use tracing::{debug, info, warn};

use crate::credentials::CachedCookies;
use crate::db::connection::connect_sqlite;
use crate::error::SyncError;
use crate::models::SymbolRef;
use crate::planner::{SymbolSyncPlanner, SyncPlan};
use crate::store::{KlineRepo, SaveBarsOptions, SqliteKlineRepo};
use crate::tz;

/// Builds the per-unit resources.
pub trait WorkerFactory: Send + Sync {
    /// A fresh store connection.
    fn open_store(&self) -> Result<SqliteConnection, SyncError>;

    /// A fresh API client carrying `cookies`.
    fn open_api(&self, cookies: &[Cookie]) -> Result<Box<dyn QuoteApi>, SyncError>;
}

/// Production factory: SQLite file plus Xueqiu REST client.
///
/// Every client it builds draws on one rate limiter, so `requests_per_minute`
/// bounds the whole run rather than each worker.
pub struct DefaultWorkerFactory {
    database_url: String,
    xueqiu: XueqiuConfig,
    limiter: SharedLimiter,
}

impl DefaultWorkerFactory {
    /// Factory for the store at `database_url` and clients built from `xueqiu`.
    pub fn new(database_url: impl Into<String>, xueqiu: XueqiuConfig) -> Result<Self, SyncError> {
        let limiter = rate_limiter(xueqiu.requests_per_minute)?;
        Ok(Self {
            database_url: database_url.into(),
            xueqiu,
            limiter,
        })
    }

    /// A concrete client on the shared limiter.
    pub fn client(&self, cookies: &[Cookie]) -> Result<XueqiuClient, SyncError> {
        Ok(XueqiuClient::with_limiter(
            self.xueqiu.clone(),
            cookies,
            Arc::clone(&self.limiter),
        )?)
    }
}

impl WorkerFactory for DefaultWorkerFactory {
    fn open_store(&self) -> Result<SqliteConnection, SyncError> {
        Ok(connect_sqlite(&self.database_url)?)
    }

    fn open_api(&self, cookies: &[Cookie]) -> Result<Box<dyn QuoteApi>, SyncError> {
        Ok(Box::new(self.client(cookies)?))
    }
}

/// Scoped ownership of one unit's connection and client.
pub struct WorkerResources {
    symbol: String,
    // Lent to the blocking pool for the duration of each store call.
    conn: Option<SqliteConnection>,
    api: Box<dyn QuoteApi>,
}

impl WorkerResources {
    /// Takes ownership of the unit's resources.
    pub fn new(symbol: &str, conn: SqliteConnection, api: Box<dyn QuoteApi>) -> Self {
        debug!(symbol, "worker resources acquired");
        Self {
            symbol: symbol.to_string(),
            conn: Some(conn),
            api,
        }
    }

    /// Runs `work` against the unit's connection on the blocking pool.
    ///
    /// If `work` panics the connection is lost and later store calls fail with
    /// [`SyncError::Task`].
    pub async fn with_store<T, F>(&mut self, work: F) -> Result<T, SyncError>
    where
        T: Send + 'static,
        F: FnOnce(&mut SqliteConnection) -> Result<T, SyncError> + Send + 'static,
    {
        let mut conn = self
            .conn
            .take()
            .ok_or_else(|| SyncError::Task("store connection lost".to_string()))?;
        let (conn, out) = task::spawn_blocking(move || {
            let out = work(&mut conn);
            (conn, out)
        })
        .await?;
        self.conn = Some(conn);
        out
    }

    /// API client.
    pub fn api(&self) -> &dyn QuoteApi {
        self.api.as_ref()
    }

    /// Swaps in a client built with fresh credentials; the old one is dropped.
    pub fn replace_api(&mut self, api: Box<dyn QuoteApi>) {
        self.api = api;
    }
}

impl Drop for WorkerResources {
    fn drop(&mut self) {
        debug!(symbol = %self.symbol, "worker resources released");
    }
}

/// Everything a unit of work needs besides its own resources.
#[derive(Clone)]
pub struct SyncContext {
    /// Resource factory.
    pub factory: Arc<dyn WorkerFactory>,
    /// Shared cookie cache.
    pub cookies: CachedCookies,
    /// User agent used for cookies and requests.
    pub user_agent: String,
    /// Cold/warm planner.
    pub planner: SymbolSyncPlanner,
    /// Written rows per commit.
    pub commit_batch_size: usize,
}

impl SyncContext {
    async fn open_api(&self) -> Result<Box<dyn QuoteApi>, SyncError> {
        let cookies = self.cookies.cookies(&self.user_agent).await?;
        self.factory.open_api(&cookies)
    }
}

/// Runs one full sync cycle for `symbol` and returns the rows written.
///
/// A session rejection invalidates the cached cookies and retries the fetch once
/// with a freshly acquired set before giving up.
pub async fn sync_symbol(ctx: &SyncContext, symbol: &SymbolRef) -> Result<usize, SyncError> {
    let repo = SqliteKlineRepo::new();
    let factory = Arc::clone(&ctx.factory);
    let conn = task::spawn_blocking(move || factory.open_store()).await??;
    let api = ctx.open_api().await?;
    let mut res = WorkerResources::new(&symbol.code, conn, api);

    let planner = ctx.planner;
    let code = symbol.code.clone();
    let plan = res
        .with_store(move |conn| Ok(planner.plan(&repo, conn, &code, tz::now_millis())?))
        .await?;
    log_plan(symbol, &plan);

    let bars = match plan.fetch(res.api(), &symbol.code).await {
        Ok(bars) => bars,
        Err(e) => {
            let err = SyncError::from(e);
            if !err.is_auth() {
                return Err(err);
            }
            warn!(symbol = %symbol.code, error = %err, "session rejected, refreshing cookies");
            ctx.cookies.invalidate(&ctx.user_agent)?;
            res.replace_api(ctx.open_api().await?);
            plan.fetch(res.api(), &symbol.code).await?
        }
    };

    let opts = SaveBarsOptions {
        upsert: plan.upsert(),
        batch_size: ctx.commit_batch_size,
    };
    let fetched = bars.len();
    let target = symbol.clone();
    let written = res
        .with_store(move |conn| Ok(repo.save_bars(conn, &bars, &target, opts)?))
        .await?;
    info!(
        symbol = %symbol.code,
        fetched,
        written,
        "symbol synced"
    );
    Ok(written)
}

fn log_plan(symbol: &SymbolRef, plan: &SyncPlan) {
    match plan {
        SyncPlan::Backfill { begin_ts, count } => {
            info!(symbol = %symbol.code, begin_ts, count, "cold: full backfill")
        }
        SyncPlan::TopUp { begin_ts, count } => {
            debug!(symbol = %symbol.code, begin_ts, count, "warm: top-up")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clients_draw_on_the_factory_limiter() {
        let factory = DefaultWorkerFactory::new("unused.db", XueqiuConfig::default()).unwrap();
        let a = factory.client(&[]).unwrap();
        let b = factory.client(&[Cookie::new("xq_a_token", "t")]).unwrap();
        assert_eq!(Arc::strong_count(&factory.limiter), 3);
        drop((a, b));
        assert_eq!(Arc::strong_count(&factory.limiter), 1);
    }

    #[test]
    fn zero_budget_is_a_config_error() {
        let xueqiu = XueqiuConfig {
            requests_per_minute: 0,
            ..XueqiuConfig::default()
        };
        assert!(matches!(
            DefaultWorkerFactory::new("unused.db", xueqiu),
            Err(SyncError::Config(_))
        ));
    }
}
