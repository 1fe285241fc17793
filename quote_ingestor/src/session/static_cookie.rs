use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use shared_utils::env::get_env_var;
use snafu::ResultExt;

use crate::providers::{MissingEnvVarSnafu, ProviderInitError};
use crate::session::{Cookie, CookieError, CookieProvider, parse_cookie_header};

/// Environment variable read by [`StaticCookieProvider::from_env`].
pub const COOKIE_ENV_VAR: &str = "XUEQIU_COOKIE";

/// Serves a cookie header obtained out of band, e.g. copied from a logged-in browser.
pub struct StaticCookieProvider {
    header: SecretString,
}

impl StaticCookieProvider {
    pub fn new(header: impl Into<String>) -> Self {
        Self {
            header: SecretString::new(header.into().into()),
        }
    }

    /// Reads the header from `XUEQIU_COOKIE`.
    pub fn from_env() -> Result<Self, ProviderInitError> {
        let raw = get_env_var(COOKIE_ENV_VAR).context(MissingEnvVarSnafu)?;
        Ok(Self::new(raw))
    }
}

#[async_trait]
impl CookieProvider for StaticCookieProvider {
    async fn acquire(&self, _user_agent: &str) -> Result<Vec<Cookie>, CookieError> {
        let cookies = parse_cookie_header(self.header.expose_secret());
        if cookies.is_empty() {
            return Err(CookieError::Auth(
                "configured cookie header has no name=value pairs".to_string(),
            ));
        }
        Ok(cookies)
    }
}
