//! Multi-call walks over a [`QuoteApi`].
//!
//! Both walks are all-or-nothing: the first failed call aborts the walk and the
//! partially accumulated result is dropped.

use std::collections::BTreeMap;

use snafu::{ResultExt, ensure};
use tracing::debug;

use crate::models::{bar::Bar, market::MarketSegment, symbol::SymbolRecord};
use crate::providers::{DecodeSnafu, ProviderError, QuoteApi, ValidationSnafu};

/// Direction of a history walk, derived from the sign of `count`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// `count < 0`: bars strictly before the cursor, newest first.
    Backward,
    /// `count > 0`: bars at or after the cursor, oldest first.
    Forward,
}

impl Direction {
    pub fn from_count(count: i32) -> Option<Self> {
        match count {
            0 => None,
            c if c < 0 => Some(Direction::Backward),
            _ => Some(Direction::Forward),
        }
    }
}

/// Collapses rows sharing a timestamp (last seen wins) and orders the page for
/// `direction`.
pub fn dedup_page(bars: Vec<Bar>, direction: Direction) -> Vec<Bar> {
    let mut by_ts: BTreeMap<i64, Bar> = BTreeMap::new();
    for bar in bars {
        by_ts.insert(bar.timestamp, bar);
    }
    match direction {
        Direction::Forward => by_ts.into_values().collect(),
        Direction::Backward => by_ts.into_values().rev().collect(),
    }
}

/// Enumerates every listing page of `segment`.
///
/// Pages are requested from 1 until the cumulative record count reaches the total
/// the provider reports. An empty page ends the walk even if the total was not
/// reached.
pub async fn list_all_symbols<A>(
    api: &A,
    segment: MarketSegment,
    page_size: u32,
) -> Result<Vec<SymbolRecord>, ProviderError>
where
    A: QuoteApi + ?Sized,
{
    ensure!(
        page_size > 0,
        ValidationSnafu {
            message: "page_size must be positive".to_string()
        }
    );

    let mut out: Vec<SymbolRecord> = Vec::new();
    let mut page = 1u32;
    loop {
        let batch = api.list_symbols_page(segment, page, page_size).await?;
        let total = batch.count;
        let received = batch.list.len();
        out.extend(batch.list);
        debug!(%segment, page, received, total, "listing page");

        if received == 0 || out.len() as u64 >= total {
            break;
        }
        page += 1;
    }
    Ok(out)
}

/// One [`QuoteApi::fetch_bars`] call, decoded and ordered like a page of
/// [`fetch_all_history`].
pub async fn fetch_window<A>(
    api: &A,
    symbol_code: &str,
    begin_ts: i64,
    count: i32,
) -> Result<Vec<Bar>, ProviderError>
where
    A: QuoteApi + ?Sized,
{
    let Some(direction) = Direction::from_count(count) else {
        return ValidationSnafu {
            message: "count must be non-zero".to_string(),
        }
        .fail();
    };
    let batch = api.fetch_bars(symbol_code, begin_ts, count).await?;
    Ok(dedup_page(batch.into_bars().context(DecodeSnafu)?, direction))
}

/// Walks the bar history of `symbol_code` from `begin_ts` until the provider runs
/// out of data.
///
/// Each page is deduplicated by timestamp and ordered for the walk direction
/// (descending when `count < 0`, ascending when `count > 0`), then appended to
/// the result. The cursor moves to the last timestamp of the page. The walk stops on
/// an empty page or on a page with fewer raw rows than `|count|`.
pub async fn fetch_all_history<A>(
    api: &A,
    symbol_code: &str,
    begin_ts: i64,
    count: i32,
) -> Result<Vec<Bar>, ProviderError>
where
    A: QuoteApi + ?Sized,
{
    let Some(direction) = Direction::from_count(count) else {
        return ValidationSnafu {
            message: "count must be non-zero".to_string(),
        }
        .fail();
    };
    let window = count.unsigned_abs() as usize;

    let mut out: Vec<Bar> = Vec::new();
    let mut cursor = begin_ts;
    let mut calls = 0u32;
    loop {
        let batch = api.fetch_bars(symbol_code, cursor, count).await?;
        calls += 1;
        let raw_len = batch.len();
        if raw_len == 0 {
            break;
        }

        let page = dedup_page(batch.into_bars().context(DecodeSnafu)?, direction);
        let next = match page.last() {
            Some(bar) => bar.timestamp,
            None => break,
        };
        debug!(
            symbol = symbol_code,
            call = calls,
            rows = raw_len,
            first = page.first().map(|b| b.timestamp),
            last = next,
            "history page"
        );
        out.extend(page);

        // A cursor that does not move would re-request the same window forever.
        if raw_len < window || next == cursor {
            break;
        }
        cursor = next;
    }
    debug!(symbol = symbol_code, calls, bars = out.len(), "history walk done");
    Ok(out)
}
