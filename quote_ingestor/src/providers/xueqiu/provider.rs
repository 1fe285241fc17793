use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use nonzero_ext::nonzero;
use reqwest::{Client, StatusCode, header};
use secrecy::{ExposeSecret, SecretString};
use serde_json::Value;
use snafu::{OptionExt, ResultExt};
use tracing::{debug, warn};

use crate::models::{
    bar::BarBatch,
    kline::KlineOptions,
    market::MarketSegment,
    quote::{CompanyProfile, QuoteSnapshot},
    symbol::{SymbolPage, SymbolRecord},
};
use crate::providers::xueqiu::{
    params::{
        BATCH_QUOTE_PATH, COMPANY_PATH, KLINE_PATH, LISTING_PATH, QUOTE_PATH, batch_quote_query,
        kline_query, listing_query, quote_query,
    },
    response::{
        BatchQuoteData, CompanyData, Envelope, KlineData, ListingData, QuoteData, TOKEN_REJECTED,
    },
};
use crate::providers::{
    ApiSnafu, AuthSnafu, ClientBuildSnafu, DecodeSnafu, InvalidHeaderSnafu, MalformedSnafu,
    ProviderError, ProviderInitError, QuoteApi, ReferenceApi, ReqwestSnafu, SettingSnafu,
    ShapeSnafu, ValidationSnafu,
};
use crate::session::{Cookie, cookie_header};

pub const DEFAULT_BASE_URL: &str = "https://stock.xueqiu.com";

/// Connection settings for [`XueqiuClient`].
#[derive(Clone, Debug)]
pub struct XueqiuConfig {
    pub base_url: String,
    pub user_agent: String,
    /// Request budget of one limiter. Clients built with
    /// [`XueqiuClient::with_limiter`] share it; `0` is rejected at construction.
    pub requests_per_minute: u32,
    pub kline: KlineOptions,
}

impl Default for XueqiuConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:128.0) Gecko/20100101 Firefox/128.0"
                .to_string(),
            requests_per_minute: 120,
            kline: KlineOptions::default(),
        }
    }
}

/// Rate limiter handle shared between clients.
pub type SharedLimiter = Arc<DefaultDirectRateLimiter>;

/// Builds a limiter allowing `requests_per_minute` with a burst of at most 10.
///
/// Hand the same limiter to every client of a run so the budget holds across
/// workers.
pub fn rate_limiter(requests_per_minute: u32) -> Result<SharedLimiter, ProviderInitError> {
    let rpm = NonZeroU32::new(requests_per_minute).context(SettingSnafu {
        message: "requests_per_minute must be positive".to_string(),
    })?;
    let quota = Quota::per_minute(rpm).allow_burst(nonzero!(10u32).min(rpm));
    Ok(Arc::new(RateLimiter::direct(quota)))
}

/// REST client bound to one cookie set. Build one per unit of work.
pub struct XueqiuClient {
    client: Client,
    base_url: String,
    kline: KlineOptions,
    limiter: SharedLimiter,
    _cookie: SecretString,
}

impl XueqiuClient {
    /// Creates a client with its own limiter that sends `cookies` and
    /// `config.user_agent` on every request.
    pub fn new(config: XueqiuConfig, cookies: &[Cookie]) -> Result<Self, ProviderInitError> {
        let limiter = rate_limiter(config.requests_per_minute)?;
        Self::with_limiter(config, cookies, limiter)
    }

    /// Like [`XueqiuClient::new`] but draws on a shared limiter.
    pub fn with_limiter(
        config: XueqiuConfig,
        cookies: &[Cookie],
        limiter: SharedLimiter,
    ) -> Result<Self, ProviderInitError> {
        let cookie = SecretString::new(cookie_header(cookies).into());

        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::USER_AGENT,
            header::HeaderValue::from_str(&config.user_agent).context(InvalidHeaderSnafu)?,
        );
        headers.insert(
            header::ACCEPT,
            header::HeaderValue::from_static("application/json, text/plain, */*"),
        );
        if !cookies.is_empty() {
            let mut value =
                header::HeaderValue::from_str(cookie.expose_secret()).context(InvalidHeaderSnafu)?;
            value.set_sensitive(true);
            headers.insert(header::COOKIE, value);
        }

        let client = Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(30))
            .build()
            .context(ClientBuildSnafu)?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            kline: config.kline,
            limiter,
            _cookie: cookie,
        })
    }

    /// Points the client at another host, e.g. a mock server.
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    /// Issues one GET and returns the envelope's `data` section.
    async fn get_data(
        &self,
        path: &str,
        query: &[(&'static str, String)],
    ) -> Result<Value, ProviderError> {
        self.limiter.until_ready().await;

        let url = format!("{}{}", self.base_url, path);
        let response = self
            .client
            .get(&url)
            .query(query)
            .send()
            .await
            .context(ReqwestSnafu)?;
        let status = response.status();
        let body = response.text().await.context(ReqwestSnafu)?;

        // Anything but a plain 200 is a failure, including other 2xx codes.
        if status != StatusCode::OK {
            let code = serde_json::from_str::<Envelope>(&body)
                .map(|e| e.error_code)
                .unwrap_or_default();
            let message = if body.is_empty() {
                status.to_string()
            } else {
                body
            };
            if status == StatusCode::UNAUTHORIZED
                || status == StatusCode::FORBIDDEN
                || code == TOKEN_REJECTED
            {
                warn!(%url, %status, "session rejected");
                return AuthSnafu {
                    status: status.as_u16(),
                    message,
                }
                .fail();
            }
            return ApiSnafu {
                status: status.as_u16(),
                message,
            }
            .fail();
        }

        let envelope: Envelope = serde_json::from_str(&body).context(MalformedSnafu)?;
        if envelope.error_code != 0 {
            let message = envelope
                .error_description
                .unwrap_or_else(|| format!("error_code {}", envelope.error_code));
            if envelope.error_code == TOKEN_REJECTED {
                return AuthSnafu {
                    status: status.as_u16(),
                    message,
                }
                .fail();
            }
            return ApiSnafu {
                status: status.as_u16(),
                message,
            }
            .fail();
        }
        envelope.data.context(ShapeSnafu {
            message: format!("{path}: response has no data section"),
        })
    }
}

#[async_trait]
impl QuoteApi for XueqiuClient {
    async fn list_symbols_page(
        &self,
        segment: MarketSegment,
        page: u32,
        page_size: u32,
    ) -> Result<SymbolPage, ProviderError> {
        let data = self
            .get_data(LISTING_PATH, &listing_query(segment, page, page_size))
            .await?;
        let listing: ListingData = serde_json::from_value(data).map_err(|e| {
            ShapeSnafu {
                message: format!("listing: {e}"),
            }
            .build()
        })?;

        let count = listing.count.context(ShapeSnafu {
            message: "listing: missing count".to_string(),
        })?;
        let raw = listing.list.context(ShapeSnafu {
            message: "listing: missing list".to_string(),
        })?;
        let list = raw
            .iter()
            .map(SymbolRecord::from_fields)
            .collect::<Result<Vec<_>, _>>()
            .context(DecodeSnafu)?;

        debug!(%segment, page, count, received = list.len(), "listing page fetched");
        Ok(SymbolPage { count, list })
    }

    async fn fetch_bars(
        &self,
        symbol_code: &str,
        begin_ts: i64,
        count: i32,
    ) -> Result<BarBatch, ProviderError> {
        let data = self
            .get_data(
                KLINE_PATH,
                &kline_query(symbol_code, begin_ts, count, &self.kline),
            )
            .await?;
        let kline: KlineData = serde_json::from_value(data).map_err(|e| {
            ShapeSnafu {
                message: format!("kline {symbol_code}: {e}"),
            }
            .build()
        })?;

        let columns = kline.column.context(ShapeSnafu {
            message: format!("kline {symbol_code}: missing column"),
        })?;
        let rows = kline.item.context(ShapeSnafu {
            message: format!("kline {symbol_code}: missing item"),
        })?;
        if !rows.is_empty() && !columns.iter().any(|c| c == "timestamp") {
            return ShapeSnafu {
                message: format!("kline {symbol_code}: no timestamp column"),
            }
            .fail();
        }

        debug!(symbol = symbol_code, begin_ts, count, rows = rows.len(), "kline window fetched");
        Ok(BarBatch::new(columns, rows))
    }
}

#[async_trait]
impl ReferenceApi for XueqiuClient {
    async fn quote(&self, symbol_code: &str) -> Result<QuoteSnapshot, ProviderError> {
        self.quote_section(symbol_code, false).await
    }

    async fn batch_quote(
        &self,
        symbol_codes: &[String],
    ) -> Result<Vec<QuoteSnapshot>, ProviderError> {
        if symbol_codes.is_empty() {
            return ValidationSnafu {
                message: "batch quote needs at least one symbol".to_string(),
            }
            .fail();
        }
        let data = self
            .get_data(BATCH_QUOTE_PATH, &batch_quote_query(symbol_codes))
            .await?;
        let batch: BatchQuoteData = serde_json::from_value(data).map_err(|e| {
            ShapeSnafu {
                message: format!("batch quote: {e}"),
            }
            .build()
        })?;
        let items = batch.items.context(ShapeSnafu {
            message: "batch quote: missing items".to_string(),
        })?;
        let quotes = items
            .into_iter()
            .filter_map(|item| item.quote)
            .map(|q| QuoteSnapshot::from_fields(&q))
            .collect::<Result<Vec<_>, _>>()
            .context(DecodeSnafu)?;
        debug!(asked = symbol_codes.len(), received = quotes.len(), "batch quote fetched");
        Ok(quotes)
    }

    async fn detail(&self, symbol_code: &str) -> Result<QuoteSnapshot, ProviderError> {
        self.quote_section(symbol_code, true).await
    }

    async fn company_profile(&self, symbol_code: &str) -> Result<CompanyProfile, ProviderError> {
        let data = self
            .get_data(COMPANY_PATH, &[("symbol", symbol_code.to_string())])
            .await?;
        let company: CompanyData = serde_json::from_value(data).map_err(|e| {
            ShapeSnafu {
                message: format!("profile {symbol_code}: {e}"),
            }
            .build()
        })?;
        let fields = company.company.context(ShapeSnafu {
            message: format!("profile {symbol_code}: missing company"),
        })?;
        CompanyProfile::from_fields(symbol_code, &fields).context(DecodeSnafu)
    }
}

impl XueqiuClient {
    async fn quote_section(
        &self,
        symbol_code: &str,
        detail: bool,
    ) -> Result<QuoteSnapshot, ProviderError> {
        let data = self
            .get_data(QUOTE_PATH, &quote_query(symbol_code, detail))
            .await?;
        let quote: QuoteData = serde_json::from_value(data).map_err(|e| {
            ShapeSnafu {
                message: format!("quote {symbol_code}: {e}"),
            }
            .build()
        })?;
        let fields = quote.quote.context(ShapeSnafu {
            message: format!("quote {symbol_code}: missing quote"),
        })?;
        QuoteSnapshot::from_fields(&fields).context(DecodeSnafu)
    }
}
