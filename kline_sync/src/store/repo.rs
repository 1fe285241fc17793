//! Diesel implementation of [`KlineRepo`](crate::store::KlineRepo).

use std::collections::HashSet;

use chrono::Utc;
use diesel::dsl::{count_star, max};
use diesel::prelude::*;
use quote_ingestor::models::{bar::Bar, symbol::SymbolRecord};
use tracing::{debug, error};

use crate::models::{BarWrite, StoredBar, StoredBarRow, SymbolRef, SymbolWrite};
use crate::schema::{kline_bar, stock_symbol};
use crate::store::{KlineRepo, SaveBarsError, SaveBarsOptions, StoreError, StoreResult};
use crate::tz;

/// What a single incoming bar turns into.
enum BarOp<'b> {
    Insert(&'b Bar),
    Update(&'b Bar),
}

/// Repository for symbols and bars in a SQLite database.
#[derive(Debug, Default, Clone, Copy)]
pub struct SqliteKlineRepo;

impl SqliteKlineRepo {
    /// Creates the repository. It is stateless; connections are passed per call.
    pub fn new() -> Self {
        Self
    }

    fn existing_timestamps(
        &self,
        conn: &mut SqliteConnection,
        code: &str,
    ) -> StoreResult<HashSet<i64>> {
        let stamps: Vec<i64> = kline_bar::table
            .filter(kline_bar::symbol_code.eq(code))
            .select(kline_bar::timestamp)
            .load(conn)?;
        Ok(stamps.into_iter().collect())
    }

    fn write_segment(
        conn: &mut SqliteConnection,
        segment: &[BarOp<'_>],
        symbol: &SymbolRef,
    ) -> StoreResult<()> {
        conn.immediate_transaction::<_, StoreError, _>(|c| {
            for write in segment {
                match write {
                    BarOp::Insert(bar) => {
                        let row = BarWrite::from_bar(bar, &symbol.code, &symbol.name)?;
                        diesel::insert_into(kline_bar::table)
                            .values(&row)
                            .execute(c)?;
                    }
                    BarOp::Update(bar) => {
                        let row = BarWrite::from_bar(bar, &symbol.code, &symbol.name)?;
                        diesel::update(
                            kline_bar::table
                                .filter(kline_bar::symbol_code.eq(&symbol.code))
                                .filter(kline_bar::timestamp.eq(bar.timestamp)),
                        )
                        .set(&row)
                        .execute(c)?;
                    }
                }
            }
            Ok(())
        })
    }
}

impl KlineRepo for SqliteKlineRepo {
    fn save_symbols(
        &self,
        conn: &mut SqliteConnection,
        records: &[SymbolRecord],
    ) -> StoreResult<usize> {
        let stamp = tz::to_rfc3339_millis(Utc::now());
        let result = conn.immediate_transaction::<_, StoreError, _>(|c| {
            for record in records {
                let row = SymbolWrite::from_record(record, &stamp);
                diesel::insert_into(stock_symbol::table)
                    .values(&row)
                    .on_conflict(stock_symbol::code)
                    .do_update()
                    .set(&row)
                    .execute(c)?;
            }
            Ok(records.len())
        });

        match result {
            Ok(n) => {
                debug!(rows = n, "symbols saved");
                Ok(n)
            }
            Err(e) => {
                error!(error = %e, rows = records.len(), "symbol batch rolled back");
                Err(e)
            }
        }
    }

    fn save_bars(
        &self,
        conn: &mut SqliteConnection,
        bars: &[Bar],
        symbol: &SymbolRef,
        opts: SaveBarsOptions,
    ) -> Result<usize, SaveBarsError> {
        let mut seen = self
            .existing_timestamps(conn, &symbol.code)
            .map_err(|source| SaveBarsError {
                committed: 0,
                source,
            })?;

        let mut writes: Vec<BarOp<'_>> = Vec::with_capacity(bars.len());
        for bar in bars {
            if seen.contains(&bar.timestamp) {
                if opts.upsert {
                    writes.push(BarOp::Update(bar));
                }
            } else {
                seen.insert(bar.timestamp);
                writes.push(BarOp::Insert(bar));
            }
        }

        let mut committed = 0usize;
        for segment in writes.chunks(opts.batch_size.max(1)) {
            if let Err(source) = Self::write_segment(conn, segment, symbol) {
                error!(
                    symbol = %symbol.code,
                    committed,
                    error = %source,
                    "bar segment rolled back"
                );
                return Err(SaveBarsError { committed, source });
            }
            committed += segment.len();
            debug!(symbol = %symbol.code, committed, "bar segment committed");
        }
        Ok(committed)
    }

    fn last_bar_timestamp(
        &self,
        conn: &mut SqliteConnection,
        code: &str,
    ) -> StoreResult<Option<i64>> {
        let last = kline_bar::table
            .filter(kline_bar::symbol_code.eq(code))
            .select(max(kline_bar::timestamp))
            .first::<Option<i64>>(conn)?;
        Ok(last)
    }

    fn list_symbols(&self, conn: &mut SqliteConnection) -> StoreResult<Vec<SymbolRef>> {
        let rows = stock_symbol::table
            .order(stock_symbol::code.asc())
            .select(SymbolRef::as_select())
            .load(conn)?;
        Ok(rows)
    }

    fn bar_count(&self, conn: &mut SqliteConnection, code: &str) -> StoreResult<i64> {
        let n = kline_bar::table
            .filter(kline_bar::symbol_code.eq(code))
            .select(count_star())
            .first::<i64>(conn)?;
        Ok(n)
    }

    fn load_bars(&self, conn: &mut SqliteConnection, code: &str) -> StoreResult<Vec<StoredBar>> {
        let rows = kline_bar::table
            .filter(kline_bar::symbol_code.eq(code))
            .order(kline_bar::timestamp.desc())
            .select(StoredBarRow::as_select())
            .load(conn)?;
        rows.into_iter().map(StoredBar::try_from).collect()
    }
}
