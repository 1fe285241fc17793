//! Refresh of the listed-symbol universe.

use diesel::SqliteConnection;
use quote_ingestor::models::market::MarketSegment;
use quote_ingestor::providers::QuoteApi;
use quote_ingestor::providers::paging::list_all_symbols;
use tracing::info;

use crate::error::SyncError;
use crate::store::KlineRepo;

/// Enumerates every segment and saves the listings, one transaction per segment.
///
/// Returns the number of records saved across all segments. A failing segment
/// aborts the refresh; segments saved before it are kept.
pub async fn collect_symbol_lists<A, R>(
    api: &A,
    repo: &R,
    conn: &mut SqliteConnection,
    segments: &[MarketSegment],
    page_size: u32,
) -> Result<usize, SyncError>
where
    A: QuoteApi + ?Sized,
    R: KlineRepo + ?Sized,
{
    let mut saved = 0;
    for &segment in segments {
        let records = list_all_symbols(api, segment, page_size).await?;
        let n = repo.save_symbols(conn, &records)?;
        info!(%segment, listed = records.len(), saved = n, "segment listing saved");
        saved += n;
    }
    Ok(saved)
}
