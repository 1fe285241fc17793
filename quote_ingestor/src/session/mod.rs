//! Web-session cookie acquisition.
//!
//! The quote API only answers requests that carry the cookies a browser receives
//! when it first visits the site. A [`CookieProvider`] produces that cookie set for
//! a given user agent. Acquisition is slow, so callers memoize it.

pub mod http;
pub mod static_cookie;

use async_trait::async_trait;
use cookie::Cookie as RawCookie;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use http::HttpCookieProvider;
pub use static_cookie::StaticCookieProvider;

/// One `name=value` pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Cookie {
    pub name: String,
    pub value: String,
}

impl Cookie {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum CookieError {
    /// The site refused to establish a session.
    #[error("session not established: {0}")]
    Auth(String),

    /// The acquisition machinery itself failed.
    #[error("cookie acquisition failed: {0}")]
    Browser(String),
}

#[async_trait]
pub trait CookieProvider: Send + Sync {
    async fn acquire(&self, user_agent: &str) -> Result<Vec<Cookie>, CookieError>;
}

/// Splits a `Cookie:` request header (`a=1; b=2`) into pairs. Malformed segments
/// are dropped.
pub fn parse_cookie_header(raw: &str) -> Vec<Cookie> {
    RawCookie::split_parse(raw)
        .filter_map(Result::ok)
        .map(|c| Cookie::new(c.name(), c.value()))
        .collect()
}

/// Renders cookies as a `Cookie:` request header value.
pub fn cookie_header(cookies: &[Cookie]) -> String {
    cookies
        .iter()
        .map(|c| RawCookie::new(c.name.as_str(), c.value.as_str()).stripped().to_string())
        .collect::<Vec<_>>()
        .join("; ")
}
