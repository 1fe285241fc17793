//! Provider abstraction for the quote source.
//!
//! [`QuoteApi`] exposes the two one-call primitives of the provider's REST surface:
//! a page of the symbol listing and one window of K-line bars. The multi-call
//! walks built on top of them ([`paging::list_all_symbols`],
//! [`paging::fetch_all_history`]) are generic over any implementation, so the
//! pagination rules are shared between the real client and test doubles.
//!
//! [`ReferenceApi`] covers the lookups that are not part of a sync run: quote
//! snapshots, detail quotes and company profiles.
//!
//! The trait is async and object safe; callers usually hold a
//! `Box<dyn QuoteApi>` built per unit of work.
//!
//! # Example
//!
//! ```rust
//! use async_trait::async_trait;
//! use quote_ingestor::models::{bar::BarBatch, market::MarketSegment, symbol::SymbolPage};
//! use quote_ingestor::providers::{ProviderError, QuoteApi};
//!
//! struct Offline;
//!
//! #[async_trait]
//! impl QuoteApi for Offline {
//!     async fn list_symbols_page(
//!         &self,
//!         _segment: MarketSegment,
//!         _page: u32,
//!         _page_size: u32,
//!     ) -> Result<SymbolPage, ProviderError> {
//!         Ok(SymbolPage::default())
//!     }
//!
//!     async fn fetch_bars(
//!         &self,
//!         _symbol_code: &str,
//!         _begin_ts: i64,
//!         _count: i32,
//!     ) -> Result<BarBatch, ProviderError> {
//!         Ok(BarBatch::default())
//!     }
//! }
//! ```

pub mod paging;
pub mod xueqiu;

use async_trait::async_trait;
use shared_utils::env::MissingEnvVarError;
use snafu::{Backtrace, Snafu};

use crate::decode::DecodeError;
use crate::models::quote::{CompanyProfile, QuoteSnapshot};
use crate::models::{bar::BarBatch, market::MarketSegment, symbol::SymbolPage};

/// One-call primitives of the quote provider.
#[async_trait]
pub trait QuoteApi: Send + Sync {
    /// Fetches page `page` (1-based) of the listing for `segment`.
    async fn list_symbols_page(
        &self,
        segment: MarketSegment,
        page: u32,
        page_size: u32,
    ) -> Result<SymbolPage, ProviderError>;

    /// Fetches one window of bars.
    ///
    /// * `count < 0` - up to `|count|` bars strictly before `begin_ts`.
    /// * `count > 0` - up to `count` bars at or after `begin_ts`.
    async fn fetch_bars(
        &self,
        symbol_code: &str,
        begin_ts: i64,
        count: i32,
    ) -> Result<BarBatch, ProviderError>;
}

/// Reference lookups outside the sync path: quote snapshots and company profiles.
#[async_trait]
pub trait ReferenceApi: Send + Sync {
    /// Latest quote for one symbol.
    async fn quote(&self, symbol_code: &str) -> Result<QuoteSnapshot, ProviderError>;

    /// Latest quotes for several symbols in one request, in the provider's order.
    async fn batch_quote(&self, symbol_codes: &[String])
    -> Result<Vec<QuoteSnapshot>, ProviderError>;

    /// Quote with the extended detail field set.
    async fn detail(&self, symbol_code: &str) -> Result<QuoteSnapshot, ProviderError>;

    /// Company introduction, including the listing day.
    async fn company_profile(&self, symbol_code: &str) -> Result<CompanyProfile, ProviderError>;
}

/// Coarse classification used by callers that decide on retries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Session credential rejected; a fresh cookie may fix it.
    Auth,
    /// Transport failure, non-success status or malformed body.
    Response,
    /// Well-formed response missing or mangling expected fields.
    Data,
    /// The request or client setup was invalid.
    Invalid,
}

/// Errors that can occur during the creation of a provider instance
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum ProviderInitError {
    /// missed environment variable.
    #[snafu(display("Missing environment variable: {source}"))]
    MissingEnvVar {
        source: MissingEnvVarError,
        backtrace: Backtrace,
    },

    /// failed to init reqwest client
    #[snafu(display("Failed to build HTTP client: {source}"))]
    ClientBuild {
        source: reqwest::Error,
        backtrace: Backtrace,
    },

    /// Cookie or user agent contains characters not allowed in a header.
    #[snafu(display("Invalid header value: {source}"))]
    InvalidHeader {
        source: reqwest::header::InvalidHeaderValue,
        backtrace: Backtrace,
    },

    /// A configured parameter is out of range.
    #[snafu(display("Invalid provider setting: {message}"))]
    Setting {
        message: String,
        backtrace: Backtrace,
    },
}

/// Errors that can occur within a [`QuoteApi`] implementation.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum ProviderError {
    /// An error during an API request (e.g., network failure, timeout).
    #[snafu(display("API request failed: {source}"))]
    Reqwest {
        source: reqwest::Error,
        backtrace: Backtrace,
    },

    /// The provider rejected the session cookie.
    #[snafu(display("Session rejected ({status}): {message}"))]
    Auth {
        status: u16,
        message: String,
        backtrace: Backtrace,
    },

    /// The provider answered with a non-success status.
    #[snafu(display("API error ({status}): {message}"))]
    Api {
        status: u16,
        message: String,
        backtrace: Backtrace,
    },

    /// The body was not valid JSON of the expected envelope shape.
    #[snafu(display("Malformed response body: {source}"))]
    Malformed {
        source: serde_json::Error,
        backtrace: Backtrace,
    },

    /// The response lacked a section the protocol requires.
    #[snafu(display("Unexpected response shape: {message}"))]
    Shape {
        message: String,
        backtrace: Backtrace,
    },

    /// A record could not be decoded.
    #[snafu(display("Could not decode record: {source}"))]
    Decode {
        source: DecodeError,
        backtrace: Backtrace,
    },

    /// The request parameters were invalid for this provider.
    #[snafu(display("Invalid parameters for provider: {message}"))]
    Validation {
        message: String,
        backtrace: Backtrace,
    },

    /// An error during provider configuration or initialization.
    #[snafu(display("Provider initialization error: {source}"))]
    Init {
        #[snafu(backtrace)]
        source: ProviderInitError,
    },
}

impl ProviderError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ProviderError::Auth { .. } => ErrorKind::Auth,
            ProviderError::Reqwest { .. }
            | ProviderError::Api { .. }
            | ProviderError::Malformed { .. } => ErrorKind::Response,
            ProviderError::Shape { .. } | ProviderError::Decode { .. } => ErrorKind::Data,
            ProviderError::Validation { .. } | ProviderError::Init { .. } => ErrorKind::Invalid,
        }
    }

    pub fn is_auth(&self) -> bool {
        self.kind() == ErrorKind::Auth
    }
}
