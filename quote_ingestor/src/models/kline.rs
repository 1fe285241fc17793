//! Request options for the K-line chart endpoint.

use serde::{Deserialize, Serialize};

/// Bar period. Intraday "minute chart" periods (`1d`, `5d`) live on a different
/// endpoint and are not modelled here.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Period {
    #[default]
    Day,
    Week,
    Month,
    Quarter,
    Year,
    #[serde(rename = "1m")]
    Min1,
    #[serde(rename = "5m")]
    Min5,
    #[serde(rename = "15m")]
    Min15,
    #[serde(rename = "30m")]
    Min30,
    #[serde(rename = "60m")]
    Min60,
    #[serde(rename = "120m")]
    Min120,
}

impl Period {
    pub fn as_param(self) -> &'static str {
        match self {
            Period::Day => "day",
            Period::Week => "week",
            Period::Month => "month",
            Period::Quarter => "quarter",
            Period::Year => "year",
            Period::Min1 => "1m",
            Period::Min5 => "5m",
            Period::Min15 => "15m",
            Period::Min30 => "30m",
            Period::Min60 => "60m",
            Period::Min120 => "120m",
        }
    }
}

/// Price adjustment for corporate actions.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Adjustment {
    /// Forward-adjusted (the provider's default).
    #[default]
    Before,
    /// Backward-adjusted.
    After,
    /// Unadjusted.
    Normal,
}

impl Adjustment {
    pub fn as_param(self) -> &'static str {
        match self {
            Adjustment::Before => "before",
            Adjustment::After => "after",
            Adjustment::Normal => "normal",
        }
    }
}

/// Indicator columns requested alongside the plain K-line.
pub const DEFAULT_INDICATORS: &str = "kline,pe,pb,ps,pcf,market_capital,agt,ggt,balance";

/// Options applied to every K-line request made by a client.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KlineOptions {
    pub period: Period,
    pub adjustment: Adjustment,
    pub indicator: String,
}

impl Default for KlineOptions {
    fn default() -> Self {
        Self {
            period: Period::Day,
            adjustment: Adjustment::Before,
            indicator: DEFAULT_INDICATORS.to_string(),
        }
    }
}
