//! Cold/warm plan selection for one symbol.
//!
//! A symbol with no stored bars is **cold** and gets a full backward backfill from
//! the present. A symbol with bars is **warm** and gets a small forward top-up
//! starting at its newest stored bar, re-requesting that overlapping tail so
//! late provider corrections overwrite what was stored.

use diesel::SqliteConnection;
use quote_ingestor::models::bar::Bar;
use quote_ingestor::providers::paging::{fetch_all_history, fetch_window};
use quote_ingestor::providers::{ProviderError, QuoteApi};

use crate::store::{KlineRepo, StoreResult};

/// Window sizes used when planning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlanSettings {
    /// Bars per backward page during a backfill.
    pub backfill_page: u32,
    /// Bars requested by a top-up.
    pub top_up_window: u32,
}

impl Default for PlanSettings {
    fn default() -> Self {
        Self {
            backfill_page: 284,
            top_up_window: 10,
        }
    }
}

/// What to fetch for one symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncPlan {
    /// Walk the whole history backward from `begin_ts`; `count` is negative.
    Backfill {
        /// Starting cursor, epoch millis.
        begin_ts: i64,
        /// Negative page size.
        count: i32,
    },
    /// One forward window from `begin_ts`; `count` is positive.
    TopUp {
        /// Newest stored bar time.
        begin_ts: i64,
        /// Window size.
        count: i32,
    },
}

impl SyncPlan {
    /// Whether stored rows should be overwritten by fetched ones.
    pub fn upsert(&self) -> bool {
        matches!(self, SyncPlan::TopUp { .. })
    }

    /// Signed window size passed to the provider.
    pub fn count(&self) -> i32 {
        match *self {
            SyncPlan::Backfill { count, .. } | SyncPlan::TopUp { count, .. } => count,
        }
    }

    /// Starting cursor.
    pub fn begin_ts(&self) -> i64 {
        match *self {
            SyncPlan::Backfill { begin_ts, .. } | SyncPlan::TopUp { begin_ts, .. } => begin_ts,
        }
    }

    /// Runs the plan: a full walk for a backfill, a single call for a top-up.
    pub async fn fetch<A>(&self, api: &A, symbol_code: &str) -> Result<Vec<Bar>, ProviderError>
    where
        A: QuoteApi + ?Sized,
    {
        match *self {
            SyncPlan::Backfill { begin_ts, count } => {
                fetch_all_history(api, symbol_code, begin_ts, count).await
            }
            SyncPlan::TopUp { begin_ts, count } => {
                fetch_window(api, symbol_code, begin_ts, count).await
            }
        }
    }
}

fn to_count(n: u32) -> i32 {
    i32::try_from(n.max(1)).unwrap_or(i32::MAX)
}

/// Picks a [`SyncPlan`] from a symbol's sync state.
#[derive(Debug, Clone, Copy, Default)]
pub struct SymbolSyncPlanner {
    settings: PlanSettings,
}

impl SymbolSyncPlanner {
    /// Planner with the given window sizes.
    pub fn new(settings: PlanSettings) -> Self {
        Self { settings }
    }

    /// Plan for a symbol whose newest stored bar is `last_ts`.
    pub fn plan_for(&self, last_ts: Option<i64>, now_ms: i64) -> SyncPlan {
        match last_ts {
            None => SyncPlan::Backfill {
                begin_ts: now_ms,
                count: -to_count(self.settings.backfill_page),
            },
            Some(ts) => SyncPlan::TopUp {
                begin_ts: ts,
                count: to_count(self.settings.top_up_window),
            },
        }
    }

    /// Reads the sync state of `code` from the store and plans accordingly.
    pub fn plan<R: KlineRepo + ?Sized>(
        &self,
        repo: &R,
        conn: &mut SqliteConnection,
        code: &str,
        now_ms: i64,
    ) -> StoreResult<SyncPlan> {
        let last = repo.last_bar_timestamp(conn, code)?;
        Ok(self.plan_for(last, now_ms))
    }
}
