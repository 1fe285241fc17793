//! Reference snapshot of one listed symbol, as returned by the screener listing.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::decode::{
    DecodeError, FieldSource, opt_bool, opt_decimal, opt_i64, opt_string, req_string,
};

/// Point-in-time reference attributes for a symbol. `code` is the identity
/// (e.g. `SH600000`); every other attribute is overwritten on each refresh.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SymbolRecord {
    pub code: String,
    pub name: String,
    /// Provider security type code.
    pub kind: i32,
    pub has_follow: bool,
    pub current: Option<Decimal>,
    pub percent: Option<Decimal>,
    pub change: Option<Decimal>,
    pub amplitude: Option<Decimal>,
    pub amount: Option<Decimal>,
    pub volume: Option<i64>,
    pub volume_ratio: Option<Decimal>,
    pub turnover_rate: Option<Decimal>,
    pub tick_size: Option<Decimal>,
    pub lot_size: Option<i64>,
    pub pe_ttm: Option<Decimal>,
    pub pb: Option<Decimal>,
    pub pb_ttm: Option<Decimal>,
    pub ps: Option<Decimal>,
    pub pcf: Option<Decimal>,
    pub eps: Option<Decimal>,
    pub roe_ttm: Option<Decimal>,
    pub dividend_yield: Option<Decimal>,
    pub net_profit_cagr: Option<Decimal>,
    pub income_cagr: Option<Decimal>,
    pub market_capital: Option<Decimal>,
    pub float_market_capital: Option<Decimal>,
    pub float_shares: Option<i64>,
    pub total_shares: i64,
    pub current_year_percent: Option<Decimal>,
    pub total_percent: Option<Decimal>,
    pub percent5m: Option<Decimal>,
    pub first_percent: Option<Decimal>,
    pub main_net_inflows: Option<Decimal>,
    pub north_net_inflow: Option<Decimal>,
    /// Epoch millis of the northbound inflow figure.
    pub north_net_inflow_time: Option<i64>,
    pub mapping_quote_current: Option<Decimal>,
    pub dual_counter_mapping_symbol: Option<String>,
    pub followers: i64,
    pub limitup_days: i64,
    pub issue_date_ts: Option<i64>,
}

impl SymbolRecord {
    pub fn new(code: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            name: name.into(),
            ..Default::default()
        }
    }

    /// Decodes one listing entry. Only `symbol` and `name` are mandatory; counters
    /// that the store keeps non-null default to zero.
    pub fn from_fields<S: FieldSource + ?Sized>(src: &S) -> Result<Self, DecodeError> {
        let kind = opt_i64(src, "type")?.unwrap_or(0);
        Ok(Self {
            code: req_string(src, "symbol")?,
            name: req_string(src, "name")?,
            kind: i32::try_from(kind).map_err(|e| DecodeError::new("type", e.to_string()))?,
            has_follow: opt_bool(src, "has_follow")?.unwrap_or(false),
            current: opt_decimal(src, "current")?,
            percent: opt_decimal(src, "percent")?,
            change: opt_decimal(src, "chg")?,
            amplitude: opt_decimal(src, "amplitude")?,
            amount: opt_decimal(src, "amount")?,
            volume: opt_i64(src, "volume")?,
            volume_ratio: opt_decimal(src, "volume_ratio")?,
            turnover_rate: opt_decimal(src, "turnover_rate")?,
            tick_size: opt_decimal(src, "tick_size")?,
            lot_size: opt_i64(src, "lot_size")?,
            pe_ttm: opt_decimal(src, "pe_ttm")?,
            pb: opt_decimal(src, "pb")?,
            pb_ttm: opt_decimal(src, "pb_ttm")?,
            ps: opt_decimal(src, "ps")?,
            pcf: opt_decimal(src, "pcf")?,
            eps: opt_decimal(src, "eps")?,
            roe_ttm: opt_decimal(src, "roe_ttm")?,
            dividend_yield: opt_decimal(src, "dividend_yield")?,
            net_profit_cagr: opt_decimal(src, "net_profit_cagr")?,
            income_cagr: opt_decimal(src, "income_cagr")?,
            market_capital: opt_decimal(src, "market_capital")?,
            float_market_capital: opt_decimal(src, "float_market_capital")?,
            float_shares: opt_i64(src, "float_shares")?,
            total_shares: opt_i64(src, "total_shares")?.unwrap_or(0),
            current_year_percent: opt_decimal(src, "current_year_percent")?,
            total_percent: opt_decimal(src, "total_percent")?,
            percent5m: opt_decimal(src, "percent5m")?,
            first_percent: opt_decimal(src, "first_percent")?,
            main_net_inflows: opt_decimal(src, "main_net_inflows")?,
            north_net_inflow: opt_decimal(src, "north_net_inflow")?,
            north_net_inflow_time: opt_i64(src, "north_net_inflow_time")?,
            mapping_quote_current: opt_decimal(src, "mapping_quote_current")?,
            dual_counter_mapping_symbol: opt_string(src, "dual_counter_mapping_symbol")?,
            followers: opt_i64(src, "followers")?.unwrap_or(0),
            limitup_days: opt_i64(src, "limitup_days")?.unwrap_or(0),
            issue_date_ts: opt_i64(src, "issue_date_ts")?,
        })
    }
}

/// One page of the screener listing.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SymbolPage {
    /// Total number of records the provider reports for the whole listing.
    pub count: u64,
    pub list: Vec<SymbolRecord>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn decodes_listing_entry_with_defaults() {
        let raw = json!({
            "symbol": "SH600000",
            "name": "浦发银行",
            "type": 11,
            "current": 8.12,
            "pe_ttm": "",
            "float_shares": 29352080397i64,
            "followers": null,
            "has_follow": false,
            "north_net_inflow_time": 1713196800000i64
        });
        let rec = SymbolRecord::from_fields(raw.as_object().unwrap()).unwrap();
        assert_eq!(rec.code, "SH600000");
        assert_eq!(rec.kind, 11);
        assert_eq!(rec.current, Some(Decimal::new(812, 2)));
        assert_eq!(rec.pe_ttm, None);
        assert_eq!(rec.float_shares, Some(29_352_080_397));
        assert_eq!(rec.followers, 0);
        assert_eq!(rec.total_shares, 0);
        assert_eq!(rec.north_net_inflow_time, Some(1_713_196_800_000));
    }

    #[test]
    fn symbol_code_is_mandatory() {
        let raw = json!({ "name": "no code" });
        assert!(SymbolRecord::from_fields(raw.as_object().unwrap()).is_err());
    }
}
