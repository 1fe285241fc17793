use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::cookie::{CookieStore, Jar};
use reqwest::{Client, Url, header};
use tracing::debug;

use crate::providers::{ProviderInitError, SettingSnafu};
use crate::session::{Cookie, CookieError, CookieProvider, parse_cookie_header};

/// Public site that hands out session cookies.
pub const DEFAULT_SITE_URL: &str = "https://xueqiu.com";

/// Quote page visited after the home page; it sets the API token cookies.
const QUOTE_PAGE: &str = "/S/SH000001";

/// Establishes a session by visiting the site like a browser would and keeping the
/// cookies it hands out.
///
/// Every acquisition starts from an empty [`Jar`], so expiry, deletion
/// (`Max-Age=0`) and path scoping follow the cookie store rules rather than
/// whatever an earlier session left behind.
pub struct HttpCookieProvider {
    site_url: Url,
}

impl HttpCookieProvider {
    pub fn new(site_url: impl Into<String>) -> Result<Self, ProviderInitError> {
        let raw = site_url.into();
        let site_url = Url::parse(raw.trim_end_matches('/')).map_err(|e| {
            SettingSnafu {
                message: format!("site url {raw:?}: {e}"),
            }
            .build()
        })?;
        Ok(Self { site_url })
    }

    fn page(&self, path: &str) -> Result<Url, CookieError> {
        self.site_url
            .join(path)
            .map_err(|e| CookieError::Browser(format!("page {path}: {e}")))
    }

    fn session_client(jar: Arc<Jar>) -> Result<Client, CookieError> {
        Client::builder()
            .cookie_provider(jar)
            .timeout(Duration::from_secs(30))
            .redirect(reqwest::redirect::Policy::limited(5))
            .build()
            .map_err(|e| CookieError::Browser(format!("client: {e}")))
    }

    async fn visit(&self, client: &Client, url: Url, user_agent: &str) -> Result<(), CookieError> {
        let response = client
            .get(url.clone())
            .header(header::USER_AGENT, user_agent)
            .header(header::ACCEPT, "text/html,application/xhtml+xml")
            .send()
            .await
            .map_err(|e| CookieError::Browser(format!("GET {url}: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(CookieError::Auth(format!("GET {url} returned {status}")));
        }
        debug!(%url, %status, "visited");
        Ok(())
    }
}

#[async_trait]
impl CookieProvider for HttpCookieProvider {
    async fn acquire(&self, user_agent: &str) -> Result<Vec<Cookie>, CookieError> {
        let jar = Arc::new(Jar::default());
        let client = Self::session_client(Arc::clone(&jar))?;

        self.visit(&client, self.page("/")?, user_agent).await?;
        let quote = self.page(QUOTE_PAGE)?;
        self.visit(&client, quote.clone(), user_agent).await?;

        // Everything the jar would send to the quote page: live, in scope, deduplicated.
        let mut cookies = jar
            .cookies(&quote)
            .and_then(|value| value.to_str().map(parse_cookie_header).ok())
            .unwrap_or_default();
        if cookies.is_empty() {
            return Err(CookieError::Auth("site set no cookies".to_string()));
        }
        cookies.sort_by(|a, b| a.name.cmp(&b.name));
        debug!(cookies = cookies.len(), "session established");
        Ok(cookies)
    }
}
