use serde::Deserialize;
use serde_json::{Map, Value};

/// Error code the site uses for an expired or missing token cookie.
pub const TOKEN_REJECTED: i64 = 400016;

/// Outer shape shared by every endpoint.
#[derive(Deserialize, Debug)]
pub struct Envelope {
    #[serde(default)]
    pub data: Option<Value>,
    #[serde(default)]
    pub error_code: i64,
    #[serde(default)]
    pub error_description: Option<String>,
}

#[derive(Deserialize, Debug)]
pub struct ListingData {
    pub count: Option<u64>,
    pub list: Option<Vec<Map<String, Value>>>,
}

#[derive(Deserialize, Debug)]
pub struct KlineData {
    #[serde(default)]
    pub symbol: Option<String>,
    pub column: Option<Vec<String>>,
    pub item: Option<Vec<Vec<Value>>>,
}

#[derive(Deserialize, Debug)]
pub struct QuoteData {
    pub quote: Option<Map<String, Value>>,
}

#[derive(Deserialize, Debug)]
pub struct BatchQuoteData {
    pub items: Option<Vec<QuoteData>>,
}

#[derive(Deserialize, Debug)]
pub struct CompanyData {
    pub company: Option<Map<String, Value>>,
}
