//! Diesel row types and their mapping to the provider models.
//!
//! Decimals are persisted as their canonical text so no precision is lost; the
//! conversions here are the only place that crosses between the two forms.

use std::str::FromStr;

use diesel::prelude::*;
use quote_ingestor::models::{bar::Bar, symbol::SymbolRecord};
use rust_decimal::Decimal;

use crate::schema::{kline_bar, stock_symbol};
use crate::store::StoreError;
use crate::tz;

fn text(d: Option<Decimal>) -> Option<String> {
    d.map(|d| d.normalize().to_string())
}

fn decimal(column: &'static str, raw: Option<String>) -> Result<Option<Decimal>, StoreError> {
    raw.map(|s| {
        Decimal::from_str(&s).map_err(|_| StoreError::Corrupt { column, value: s })
    })
    .transpose()
}

/// Full replacement row for `stock_symbol`. `None` fields are written as NULL.
#[derive(Insertable, AsChangeset, Debug)]
#[diesel(table_name = stock_symbol, treat_none_as_null = true)]
pub struct SymbolWrite {
    /// See [`SymbolRecord::code`].
    pub code: String,
    /// Display name.
    pub name: String,
    /// Provider type code.
    pub kind: i32,
    /// Follow flag.
    pub has_follow: bool,
    /// Last price.
    pub current: Option<String>,
    /// Percent change.
    pub percent: Option<String>,
    /// Absolute change.
    pub change: Option<String>,
    /// Amplitude.
    pub amplitude: Option<String>,
    /// Traded value.
    pub amount: Option<String>,
    /// Volume.
    pub volume: Option<i64>,
    /// Volume ratio.
    pub volume_ratio: Option<String>,
    /// Turnover rate.
    pub turnover_rate: Option<String>,
    /// Tick size.
    pub tick_size: Option<String>,
    /// Lot size.
    pub lot_size: Option<i64>,
    /// Trailing P/E.
    pub pe_ttm: Option<String>,
    /// P/B.
    pub pb: Option<String>,
    /// Trailing P/B.
    pub pb_ttm: Option<String>,
    /// P/S.
    pub ps: Option<String>,
    /// P/CF.
    pub pcf: Option<String>,
    /// EPS.
    pub eps: Option<String>,
    /// Trailing ROE.
    pub roe_ttm: Option<String>,
    /// Dividend yield.
    pub dividend_yield: Option<String>,
    /// Net profit CAGR.
    pub net_profit_cagr: Option<String>,
    /// Revenue CAGR.
    pub income_cagr: Option<String>,
    /// Market capital.
    pub market_capital: Option<String>,
    /// Float market capital.
    pub float_market_capital: Option<String>,
    /// Float shares.
    pub float_shares: Option<i64>,
    /// Total shares.
    pub total_shares: i64,
    /// YTD percent.
    pub current_year_percent: Option<String>,
    /// Percent since listing.
    pub total_percent: Option<String>,
    /// Five-minute percent.
    pub percent5m: Option<String>,
    /// First-day percent.
    pub first_percent: Option<String>,
    /// Main net inflows.
    pub main_net_inflows: Option<String>,
    /// Northbound net inflow.
    pub north_net_inflow: Option<String>,
    /// Northbound figure time.
    pub north_net_inflow_time: Option<i64>,
    /// Mapped quote price.
    pub mapping_quote_current: Option<String>,
    /// Dual-counter symbol.
    pub dual_counter_mapping_symbol: Option<String>,
    /// Followers.
    pub followers: i64,
    /// Limit-up streak.
    pub limitup_days: i64,
    /// Listing date millis.
    pub issue_date_ts: Option<i64>,
    /// Refresh time.
    pub updated_at: String,
}

impl SymbolWrite {
    /// Maps a listing record, stamping it with `updated_at`.
    pub fn from_record(r: &SymbolRecord, updated_at: &str) -> Self {
        Self {
            code: r.code.clone(),
            name: r.name.clone(),
            kind: r.kind,
            has_follow: r.has_follow,
            current: text(r.current),
            percent: text(r.percent),
            change: text(r.change),
            amplitude: text(r.amplitude),
            amount: text(r.amount),
            volume: r.volume,
            volume_ratio: text(r.volume_ratio),
            turnover_rate: text(r.turnover_rate),
            tick_size: text(r.tick_size),
            lot_size: r.lot_size,
            pe_ttm: text(r.pe_ttm),
            pb: text(r.pb),
            pb_ttm: text(r.pb_ttm),
            ps: text(r.ps),
            pcf: text(r.pcf),
            eps: text(r.eps),
            roe_ttm: text(r.roe_ttm),
            dividend_yield: text(r.dividend_yield),
            net_profit_cagr: text(r.net_profit_cagr),
            income_cagr: text(r.income_cagr),
            market_capital: text(r.market_capital),
            float_market_capital: text(r.float_market_capital),
            float_shares: r.float_shares,
            total_shares: r.total_shares,
            current_year_percent: text(r.current_year_percent),
            total_percent: text(r.total_percent),
            percent5m: text(r.percent5m),
            first_percent: text(r.first_percent),
            main_net_inflows: text(r.main_net_inflows),
            north_net_inflow: text(r.north_net_inflow),
            north_net_inflow_time: r.north_net_inflow_time,
            mapping_quote_current: text(r.mapping_quote_current),
            dual_counter_mapping_symbol: r.dual_counter_mapping_symbol.clone(),
            followers: r.followers,
            limitup_days: r.limitup_days,
            issue_date_ts: r.issue_date_ts,
            updated_at: updated_at.to_string(),
        }
    }
}

/// Identity columns of `stock_symbol`, enough to schedule a sync.
#[derive(Queryable, Selectable, Debug, Clone, PartialEq, Eq)]
#[diesel(table_name = stock_symbol)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct SymbolRef {
    /// Symbol code.
    pub code: String,
    /// Display name.
    pub name: String,
}

impl SymbolRef {
    /// Builds a reference from parts.
    pub fn new(code: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            name: name.into(),
        }
    }
}

/// Full replacement row for `kline_bar`. `None` fields are written as NULL.
#[derive(Insertable, AsChangeset, Debug)]
#[diesel(table_name = kline_bar, treat_none_as_null = true)]
pub struct BarWrite<'a> {
    /// Owning symbol.
    pub symbol_code: &'a str,
    /// Symbol name.
    pub name: &'a str,
    /// Epoch millis.
    pub timestamp: i64,
    /// Exchange-local date.
    pub trade_date: String,
    /// Volume.
    pub volume: Option<i64>,
    /// Open.
    pub open: Option<String>,
    /// High.
    pub high: Option<String>,
    /// Low.
    pub low: Option<String>,
    /// Close.
    pub close: Option<String>,
    /// Change.
    pub change: Option<String>,
    /// Percent.
    pub percent: Option<String>,
    /// Turnover rate.
    pub turnover_rate: Option<String>,
    /// Amount.
    pub amount: Option<String>,
    /// After-hours volume.
    pub volume_post: Option<String>,
    /// After-hours amount.
    pub amount_post: Option<String>,
    /// P/E.
    pub pe: Option<String>,
    /// P/B.
    pub pb: Option<String>,
    /// P/S.
    pub ps: Option<String>,
    /// P/CF.
    pub pcf: Option<String>,
    /// Market capital.
    pub market_capital: Option<String>,
    /// Margin balance.
    pub balance: Option<String>,
    /// Northbound holding volume.
    pub hold_volume_cn: Option<String>,
    /// Northbound holding ratio.
    pub hold_ratio_cn: Option<String>,
    /// Northbound net volume.
    pub net_volume_cn: Option<String>,
    /// Southbound holding volume.
    pub hold_volume_hk: Option<String>,
    /// Southbound holding ratio.
    pub hold_ratio_hk: Option<String>,
    /// Southbound net volume.
    pub net_volume_hk: Option<String>,
}

impl<'a> BarWrite<'a> {
    /// Maps a fetched bar onto its row for `symbol_code`.
    pub fn from_bar(bar: &Bar, symbol_code: &'a str, name: &'a str) -> Result<Self, StoreError> {
        let trade_date = tz::exchange_date(bar.timestamp)
            .ok_or_else(|| StoreError::Corrupt {
                column: "timestamp",
                value: bar.timestamp.to_string(),
            })?
            .format("%Y-%m-%d")
            .to_string();
        Ok(Self {
            symbol_code,
            name,
            timestamp: bar.timestamp,
            trade_date,
            volume: bar.volume,
            open: text(bar.open),
            high: text(bar.high),
            low: text(bar.low),
            close: text(bar.close),
            change: text(bar.change),
            percent: text(bar.percent),
            turnover_rate: text(bar.turnover_rate),
            amount: text(bar.amount),
            volume_post: text(bar.volume_post),
            amount_post: text(bar.amount_post),
            pe: text(bar.pe),
            pb: text(bar.pb),
            ps: text(bar.ps),
            pcf: text(bar.pcf),
            market_capital: text(bar.market_capital),
            balance: text(bar.balance),
            hold_volume_cn: text(bar.hold_volume_cn),
            hold_ratio_cn: text(bar.hold_ratio_cn),
            net_volume_cn: text(bar.net_volume_cn),
            hold_volume_hk: text(bar.hold_volume_hk),
            hold_ratio_hk: text(bar.hold_ratio_hk),
            net_volume_hk: text(bar.net_volume_hk),
        })
    }
}

/// Price columns of a stored bar, as read back for inspection.
#[derive(Queryable, Selectable, Debug, Clone, PartialEq)]
#[diesel(table_name = kline_bar)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct StoredBarRow {
    /// Epoch millis.
    pub timestamp: i64,
    /// Exchange-local date.
    pub trade_date: String,
    /// Volume.
    pub volume: Option<i64>,
    /// Open.
    pub open: Option<String>,
    /// High.
    pub high: Option<String>,
    /// Low.
    pub low: Option<String>,
    /// Close.
    pub close: Option<String>,
}

/// Decoded form of [`StoredBarRow`].
#[derive(Debug, Clone, PartialEq)]
pub struct StoredBar {
    /// Epoch millis.
    pub timestamp: i64,
    /// Exchange-local date.
    pub trade_date: String,
    /// Volume.
    pub volume: Option<i64>,
    /// Open.
    pub open: Option<Decimal>,
    /// High.
    pub high: Option<Decimal>,
    /// Low.
    pub low: Option<Decimal>,
    /// Close.
    pub close: Option<Decimal>,
}

impl TryFrom<StoredBarRow> for StoredBar {
    type Error = StoreError;

    fn try_from(row: StoredBarRow) -> Result<Self, Self::Error> {
        Ok(Self {
            timestamp: row.timestamp,
            trade_date: row.trade_date,
            volume: row.volume,
            open: decimal("open", row.open)?,
            high: decimal("high", row.high)?,
            low: decimal("low", row.low)?,
            close: decimal("close", row.close)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decimals_are_written_in_canonical_form() {
        let bar = Bar {
            timestamp: 1_713_196_800_000,
            close: Some(Decimal::new(71000, 4)),
            pe: Some(Decimal::new(-125, 2)),
            ..Bar::default()
        };
        let row = BarWrite::from_bar(&bar, "SH600000", "浦发银行").unwrap();
        assert_eq!(row.close.as_deref(), Some("7.1"));
        assert_eq!(row.pe.as_deref(), Some("-1.25"));
        assert_eq!(row.open, None);
        assert_eq!(row.trade_date, "2024-04-16");
    }

    #[test]
    fn unreadable_decimal_is_corrupt() {
        let row = StoredBarRow {
            timestamp: 1,
            trade_date: "1970-01-01".into(),
            volume: None,
            open: Some("abc".into()),
            high: None,
            low: None,
            close: None,
        };
        let err = StoredBar::try_from(row).unwrap_err();
        assert!(matches!(err, StoreError::Corrupt { column: "open", .. }));
    }
}
