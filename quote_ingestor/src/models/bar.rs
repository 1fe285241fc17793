//! Daily K-line bars and the column-oriented batches the provider returns them in.

use indexmap::IndexMap;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::decode::{DecodeError, FieldSource, opt_decimal, opt_i64, req_i64};

/// One trading period's aggregated price/volume record.
///
/// `timestamp` is epoch milliseconds of the exchange-local trading day; it is the
/// bar's identity within a symbol. Everything else is optional because the
/// provider omits indicators it has no value for.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Bar {
    pub timestamp: i64,
    pub volume: Option<i64>,
    pub open: Option<Decimal>,
    pub high: Option<Decimal>,
    pub low: Option<Decimal>,
    pub close: Option<Decimal>,
    pub change: Option<Decimal>,
    pub percent: Option<Decimal>,
    pub turnover_rate: Option<Decimal>,
    pub amount: Option<Decimal>,
    pub volume_post: Option<Decimal>,
    pub amount_post: Option<Decimal>,
    pub pe: Option<Decimal>,
    pub pb: Option<Decimal>,
    pub ps: Option<Decimal>,
    pub pcf: Option<Decimal>,
    pub market_capital: Option<Decimal>,
    pub balance: Option<Decimal>,
    /// Northbound (Stock Connect) holding metrics.
    pub hold_volume_cn: Option<Decimal>,
    pub hold_ratio_cn: Option<Decimal>,
    pub net_volume_cn: Option<Decimal>,
    /// Southbound holding metrics.
    pub hold_volume_hk: Option<Decimal>,
    pub hold_ratio_hk: Option<Decimal>,
    pub net_volume_hk: Option<Decimal>,
}

impl Bar {
    /// Builds a bar from one keyed row. Column names follow the provider
    /// (`chg`, `turnoverrate`); field names follow this crate.
    pub fn from_fields<S: FieldSource + ?Sized>(row: &S) -> Result<Self, DecodeError> {
        Ok(Self {
            timestamp: req_i64(row, "timestamp")?,
            volume: opt_i64(row, "volume")?,
            open: opt_decimal(row, "open")?,
            high: opt_decimal(row, "high")?,
            low: opt_decimal(row, "low")?,
            close: opt_decimal(row, "close")?,
            change: opt_decimal(row, "chg")?,
            percent: opt_decimal(row, "percent")?,
            turnover_rate: opt_decimal(row, "turnoverrate")?,
            amount: opt_decimal(row, "amount")?,
            volume_post: opt_decimal(row, "volume_post")?,
            amount_post: opt_decimal(row, "amount_post")?,
            pe: opt_decimal(row, "pe")?,
            pb: opt_decimal(row, "pb")?,
            ps: opt_decimal(row, "ps")?,
            pcf: opt_decimal(row, "pcf")?,
            market_capital: opt_decimal(row, "market_capital")?,
            balance: opt_decimal(row, "balance")?,
            hold_volume_cn: opt_decimal(row, "hold_volume_cn")?,
            hold_ratio_cn: opt_decimal(row, "hold_ratio_cn")?,
            net_volume_cn: opt_decimal(row, "net_volume_cn")?,
            hold_volume_hk: opt_decimal(row, "hold_volume_hk")?,
            hold_ratio_hk: opt_decimal(row, "hold_ratio_hk")?,
            net_volume_hk: opt_decimal(row, "net_volume_hk")?,
        })
    }
}

/// One windowed K-line response: a column-name list plus positional row tuples.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct BarBatch {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

impl BarBatch {
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Value>>) -> Self {
        Self { columns, rows }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Zips every row with the column list and decodes it.
    ///
    /// Rows shorter than the column list leave the trailing fields absent; extra
    /// trailing values are ignored.
    pub fn into_bars(self) -> Result<Vec<Bar>, DecodeError> {
        if !self.rows.is_empty() && !self.columns.iter().any(|c| c == "timestamp") {
            return Err(DecodeError::new("timestamp", "column not present in batch"));
        }
        self.rows
            .iter()
            .map(|row| {
                let keyed: IndexMap<&str, &Value> = self
                    .columns
                    .iter()
                    .map(String::as_str)
                    .zip(row.iter())
                    .collect();
                Bar::from_fields(&keyed)
            })
            .collect()
    }
}
