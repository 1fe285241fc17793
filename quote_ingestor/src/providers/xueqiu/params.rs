use crate::models::{kline::KlineOptions, market::MarketSegment};

pub const KLINE_PATH: &str = "/v5/stock/chart/kline.json";
pub const LISTING_PATH: &str = "/v5/stock/screener/quote/list.json";
pub const QUOTE_PATH: &str = "/v5/stock/quote.json";
pub const BATCH_QUOTE_PATH: &str = "/v5/stock/batch/quote.json";
pub const COMPANY_PATH: &str = "/v5/stock/f10/cn/company.json";

/// Query for one K-line window.
pub fn kline_query(
    symbol_code: &str,
    begin_ts: i64,
    count: i32,
    options: &KlineOptions,
) -> Vec<(&'static str, String)> {
    vec![
        ("symbol", symbol_code.to_string()),
        ("begin", begin_ts.to_string()),
        ("period", options.period.as_param().to_string()),
        ("type", options.adjustment.as_param().to_string()),
        ("count", count.to_string()),
        ("indicator", options.indicator.clone()),
    ]
}

/// Query for one screener page, ordered the way the site orders it.
pub fn listing_query(segment: MarketSegment, page: u32, page_size: u32) -> Vec<(&'static str, String)> {
    vec![
        ("page", page.to_string()),
        ("size", page_size.to_string()),
        ("order", "desc".to_string()),
        ("order_by", "percent".to_string()),
        ("market", "CN".to_string()),
        ("type", segment.as_code().to_string()),
    ]
}

/// Query for a single quote; `detail` asks for the extended field set.
pub fn quote_query(symbol_code: &str, detail: bool) -> Vec<(&'static str, String)> {
    let mut q = vec![("symbol", symbol_code.to_string())];
    if detail {
        q.push(("extend", "detail".to_string()));
    }
    q
}

/// Query for several quotes in one call.
pub fn batch_quote_query(symbol_codes: &[String]) -> Vec<(&'static str, String)> {
    vec![("symbol", symbol_codes.join(","))]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::kline::{Adjustment, Period};

    #[test]
    fn default_kline_query_matches_site_defaults() {
        let q = kline_query("SH600000", 1_713_196_800_000, -284, &KlineOptions::default());
        assert_eq!(
            q,
            vec![
                ("symbol", "SH600000".to_string()),
                ("begin", "1713196800000".to_string()),
                ("period", "day".to_string()),
                ("type", "before".to_string()),
                ("count", "-284".to_string()),
                ("indicator", "kline,pe,pb,ps,pcf,market_capital,agt,ggt,balance".to_string()),
            ]
        );
    }

    #[test]
    fn options_flow_into_query() {
        let opts = KlineOptions {
            period: Period::Week,
            adjustment: Adjustment::Normal,
            indicator: "kline".to_string(),
        };
        let q = kline_query("SZ000001", 0, 10, &opts);
        assert!(q.contains(&("period", "week".to_string())));
        assert!(q.contains(&("type", "normal".to_string())));
        assert!(q.contains(&("indicator", "kline".to_string())));
    }

    #[test]
    fn listing_query_uses_segment_code() {
        let q = listing_query(MarketSegment::Bj, 3, 90);
        assert!(q.contains(&("type", "bj".to_string())));
        assert!(q.contains(&("page", "3".to_string())));
    }

    #[test]
    fn batch_query_joins_codes() {
        let codes = vec!["SH600000".to_string(), "SZ000001".to_string()];
        assert_eq!(
            batch_quote_query(&codes),
            vec![("symbol", "SH600000,SZ000001".to_string())]
        );
        assert_eq!(quote_query("SH600000", true).len(), 2);
        assert_eq!(quote_query("SH600000", false).len(), 1);
    }
}
