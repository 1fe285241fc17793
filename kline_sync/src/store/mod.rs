//! Symbol and bar persistence (SQLite).
use quote_ingestor::models::{bar::Bar, symbol::SymbolRecord};

use crate::models::{StoredBar, SymbolRef};

pub mod repo;

pub use repo::SqliteKlineRepo;

#[derive(thiserror::Error, Debug)]
/// Errors raised by the store.
pub enum StoreError {
    #[error("database error: {0}")]
    /// Query or commit failure.
    Diesel(#[from] diesel::result::Error),

    #[error("cannot open database: {0}")]
    /// Connection could not be established.
    Connection(#[from] diesel::ConnectionError),

    #[error("column `{column}` holds unreadable value `{value}`")]
    /// A persisted value does not parse back into its domain type.
    Corrupt {
        /// Column name.
        column: &'static str,
        /// Raw stored text.
        value: String,
    },
}

/// A bar write that failed part way.
///
/// Segments committed before the failure stay in the database; `committed` says
/// how many rows they hold.
#[derive(thiserror::Error, Debug)]
#[error("bar write failed after {committed} committed rows: {source}")]
pub struct SaveBarsError {
    /// Rows durably written before the failing segment.
    pub committed: usize,
    /// Cause.
    #[source]
    pub source: StoreError,
}

/// Result type used throughout the store for fallible operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Options for one [`KlineRepo::save_bars`] call.
#[derive(Debug, Clone, Copy)]
pub struct SaveBarsOptions {
    /// Overwrite rows whose timestamp is already stored instead of skipping them.
    pub upsert: bool,
    /// Written rows per commit.
    pub batch_size: usize,
}

/// Portable surface, SQLite implementation lives in `repo.rs`.
pub trait KlineRepo {
    /// Inserts or fully replaces every record, keyed by code, in one transaction.
    ///
    /// On error nothing from the batch is kept.
    fn save_symbols(
        &self,
        conn: &mut diesel::SqliteConnection,
        records: &[SymbolRecord],
    ) -> StoreResult<usize>;

    /// Writes `bars` for one symbol and returns the rows inserted or updated.
    ///
    /// Existing timestamps are skipped unless `opts.upsert` is set, in which case
    /// the stored row is overwritten. A timestamp written earlier in the same call
    /// counts as existing. Commits happen every `opts.batch_size` written rows.
    fn save_bars(
        &self,
        conn: &mut diesel::SqliteConnection,
        bars: &[Bar],
        symbol: &SymbolRef,
        opts: SaveBarsOptions,
    ) -> Result<usize, SaveBarsError>;

    /// Newest stored bar time for `code`; `None` means the symbol has never synced.
    fn last_bar_timestamp(
        &self,
        conn: &mut diesel::SqliteConnection,
        code: &str,
    ) -> StoreResult<Option<i64>>;

    /// Every listed symbol, ordered by code.
    fn list_symbols(&self, conn: &mut diesel::SqliteConnection) -> StoreResult<Vec<SymbolRef>>;

    /// Number of stored bars for `code`.
    fn bar_count(&self, conn: &mut diesel::SqliteConnection, code: &str) -> StoreResult<i64>;

    /// Stored bars for `code`, newest first.
    fn load_bars(
        &self,
        conn: &mut diesel::SqliteConnection,
        code: &str,
    ) -> StoreResult<Vec<StoredBar>>;
}
