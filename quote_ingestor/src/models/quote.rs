//! Point-in-time quote snapshots and company profiles.
//!
//! Both endpoints return wide, loosely typed objects that change between site
//! releases. The typed fields cover what callers read; the raw object is kept in
//! `fields` so nothing the site sent is lost.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::decode::{DecodeError, opt_decimal, opt_i64, opt_string, req_string};

/// The `quote` section of a quote, batch-quote or detail response.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct QuoteSnapshot {
    pub code: String,
    pub name: Option<String>,
    pub current: Option<Decimal>,
    pub percent: Option<Decimal>,
    pub change: Option<Decimal>,
    pub open: Option<Decimal>,
    pub high: Option<Decimal>,
    pub low: Option<Decimal>,
    pub last_close: Option<Decimal>,
    pub volume: Option<i64>,
    pub amount: Option<Decimal>,
    pub market_capital: Option<Decimal>,
    /// Epoch millis of the quote.
    pub timestamp: Option<i64>,
    pub fields: Map<String, Value>,
}

impl QuoteSnapshot {
    /// Decodes one `quote` object. Only `symbol` is mandatory.
    pub fn from_fields(src: &Map<String, Value>) -> Result<Self, DecodeError> {
        Ok(Self {
            code: req_string(src, "symbol")?,
            name: opt_string(src, "name")?,
            current: opt_decimal(src, "current")?,
            percent: opt_decimal(src, "percent")?,
            change: opt_decimal(src, "chg")?,
            open: opt_decimal(src, "open")?,
            high: opt_decimal(src, "high")?,
            low: opt_decimal(src, "low")?,
            last_close: opt_decimal(src, "last_close")?,
            volume: opt_i64(src, "volume")?,
            amount: opt_decimal(src, "amount")?,
            market_capital: opt_decimal(src, "market_capital")?,
            timestamp: opt_i64(src, "timestamp")?,
            fields: src.clone(),
        })
    }
}

/// Company introduction ("company profile") of a listed symbol.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CompanyProfile {
    pub code: String,
    pub org_name: Option<String>,
    pub short_name: Option<String>,
    pub main_business: Option<String>,
    /// Epoch millis of incorporation.
    pub established_ts: Option<i64>,
    /// Epoch millis of the listing day.
    pub listed_ts: Option<i64>,
    pub fields: Map<String, Value>,
}

impl CompanyProfile {
    /// Decodes the `company` object of the profile endpoint for `code`.
    pub fn from_fields(code: &str, src: &Map<String, Value>) -> Result<Self, DecodeError> {
        Ok(Self {
            code: code.to_string(),
            org_name: opt_string(src, "org_name_cn")?,
            short_name: opt_string(src, "org_short_name_cn")?,
            main_business: opt_string(src, "main_operation_business")?,
            established_ts: opt_i64(src, "established_date")?,
            listed_ts: opt_i64(src, "listed_date")?,
            fields: src.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn object(v: Value) -> Map<String, Value> {
        match v {
            Value::Object(m) => m,
            _ => unreachable!("test input is an object"),
        }
    }

    #[test]
    fn quote_keeps_untyped_fields() {
        let src = object(json!({
            "symbol": "SH600000",
            "name": "浦发银行",
            "current": 7.1,
            "chg": "-0.05",
            "volume": 4.1234567E7,
            "last_close": null,
            "limit_up": 7.81
        }));
        let q = QuoteSnapshot::from_fields(&src).unwrap();
        assert_eq!(q.code, "SH600000");
        assert_eq!(q.change.map(|d| d.to_string()).as_deref(), Some("-0.05"));
        assert_eq!(q.volume, Some(41_234_567));
        assert_eq!(q.last_close, None);
        assert_eq!(q.fields.get("limit_up"), Some(&json!(7.81)));
    }

    #[test]
    fn quote_without_symbol_is_rejected() {
        let err = QuoteSnapshot::from_fields(&object(json!({ "current": 1 }))).unwrap_err();
        assert_eq!(err.field, "symbol");
    }

    #[test]
    fn profile_reads_listing_day() {
        let src = object(json!({
            "org_name_cn": "上海浦东发展银行股份有限公司",
            "listed_date": 941_990_400_000i64,
            "established_date": ""
        }));
        let p = CompanyProfile::from_fields("SH600000", &src).unwrap();
        assert_eq!(p.listed_ts, Some(941_990_400_000));
        assert_eq!(p.established_ts, None);
        assert_eq!(p.short_name, None);
    }
}
