//! Runtime configuration: TOML file, then environment overrides, then validation.
//!
//! Every key is optional in the file; missing keys take the defaults below.
//!
//! | key | env | default |
//! |---|---|---|
//! | `database_url` | `DATABASE_URL` | `stock.db` |
//! | `cache_url` | `KLINE_CACHE_URL` | `cache.db` |
//! | `base_url` | `XUEQIU_BASE_URL` | `https://stock.xueqiu.com` |
//! | `site_url` | `XUEQIU_SITE_URL` | `https://xueqiu.com` |
//! | `user_agent` | `KLINE_USER_AGENT` | desktop Firefox |
//! | `cookie_source` | `KLINE_COOKIE_SOURCE` | `http` |
//! | `workers` | `KLINE_WORKERS` | 10 |
//! | `top_up_window` | `KLINE_TOP_UP_WINDOW` | 10 |
//! | `backfill_page` | `KLINE_BACKFILL_PAGE` | 284 |
//! | `list_page_size` | | 90 |
//! | `cookie_ttl_secs` | `KLINE_COOKIE_TTL_SECS` | 3600 |
//! | `commit_batch_size` | `KLINE_COMMIT_BATCH_SIZE` | 500 |
//! | `requests_per_minute` | | 120, shared by all workers |
//! | `log_dir` | `KLINE_LOG_DIR` | `logs` |
//!
//! A `[kline]` table sets the request options (`period`, `adjustment`,
//! `indicator`).

use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, bail};
use quote_ingestor::models::kline::KlineOptions;
use quote_ingestor::providers::xueqiu::XueqiuConfig;
use quote_ingestor::providers::xueqiu::provider::DEFAULT_BASE_URL;
use quote_ingestor::session::http::DEFAULT_SITE_URL;
use serde::{Deserialize, Serialize};
use shared_utils::config::{ConfigError, apply_env_override};

use crate::planner::PlanSettings;

/// Where session cookies come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CookieSource {
    /// Visit the site and harvest `Set-Cookie` headers.
    #[default]
    Http,
    /// Read a cookie header from `XUEQIU_COOKIE`.
    Env,
}

impl fmt::Display for CookieSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CookieSource::Http => f.write_str("http"),
            CookieSource::Env => f.write_str("env"),
        }
    }
}

impl FromStr for CookieSource {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "http" => Ok(CookieSource::Http),
            "env" => Ok(CookieSource::Env),
            other => Err(format!("unknown cookie source: {other}")),
        }
    }
}

/// Settings for one `kline-sync` process.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SyncConfig {
    /// Quote store.
    pub database_url: String,
    /// Credential cache store.
    pub cache_url: String,
    /// Quote API origin.
    pub base_url: String,
    /// Site visited to obtain cookies.
    pub site_url: String,
    /// User agent for cookie acquisition and API calls.
    pub user_agent: String,
    /// Cookie acquisition strategy.
    pub cookie_source: CookieSource,
    /// Maximum symbols synced at once.
    pub workers: usize,
    /// Bars requested by a warm top-up.
    pub top_up_window: u32,
    /// Bars per page during a cold backfill.
    pub backfill_page: u32,
    /// Records per listing page.
    pub list_page_size: u32,
    /// Lifetime of cached cookies, in seconds.
    pub cookie_ttl_secs: u64,
    /// Written rows per commit.
    pub commit_batch_size: usize,
    /// Client-side request budget per API client.
    pub requests_per_minute: u32,
    /// Directory for the daily log file.
    pub log_dir: String,
    /// K-line request options.
    pub kline: KlineOptions,
}

impl Default for SyncConfig {
    fn default() -> Self {
        let xueqiu = XueqiuConfig::default();
        Self {
            database_url: "stock.db".to_string(),
            cache_url: "cache.db".to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            site_url: DEFAULT_SITE_URL.to_string(),
            user_agent: xueqiu.user_agent,
            cookie_source: CookieSource::default(),
            workers: 10,
            top_up_window: 10,
            backfill_page: 284,
            list_page_size: 90,
            cookie_ttl_secs: 3600,
            commit_batch_size: 500,
            requests_per_minute: xueqiu.requests_per_minute,
            log_dir: "logs".to_string(),
            kline: KlineOptions::default(),
        }
    }
}

impl SyncConfig {
    /// Parses a TOML document. Unknown keys are rejected.
    pub fn from_toml_str(s: &str) -> anyhow::Result<Self> {
        toml::from_str(s).context("failed to parse config TOML")
    }

    /// Reads and parses a TOML file.
    pub fn from_path(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())
            .with_context(|| format!("read config file {}", path.as_ref().display()))?;
        Self::from_toml_str(&text)
    }

    /// File (if any) plus environment, validated.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let mut cfg = match path {
            Some(p) => Self::from_path(p)?,
            None => Self::default(),
        };
        cfg.apply_env().context("invalid environment override")?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Overwrites fields from their environment variables when set.
    pub fn apply_env(&mut self) -> Result<(), ConfigError> {
        apply_env_override(&mut self.database_url, "DATABASE_URL")?;
        apply_env_override(&mut self.cache_url, "KLINE_CACHE_URL")?;
        apply_env_override(&mut self.base_url, "XUEQIU_BASE_URL")?;
        apply_env_override(&mut self.site_url, "XUEQIU_SITE_URL")?;
        apply_env_override(&mut self.user_agent, "KLINE_USER_AGENT")?;
        apply_env_override(&mut self.cookie_source, "KLINE_COOKIE_SOURCE")?;
        apply_env_override(&mut self.workers, "KLINE_WORKERS")?;
        apply_env_override(&mut self.top_up_window, "KLINE_TOP_UP_WINDOW")?;
        apply_env_override(&mut self.backfill_page, "KLINE_BACKFILL_PAGE")?;
        apply_env_override(&mut self.cookie_ttl_secs, "KLINE_COOKIE_TTL_SECS")?;
        apply_env_override(&mut self.commit_batch_size, "KLINE_COMMIT_BATCH_SIZE")?;
        apply_env_override(&mut self.log_dir, "KLINE_LOG_DIR")?;
        Ok(())
    }

    /// Rejects sizes that would stall or misdirect a run.
    pub fn validate(&self) -> anyhow::Result<()> {
        let positive = [
            ("workers", self.workers as u64),
            ("top_up_window", u64::from(self.top_up_window)),
            ("backfill_page", u64::from(self.backfill_page)),
            ("list_page_size", u64::from(self.list_page_size)),
            ("commit_batch_size", self.commit_batch_size as u64),
            ("requests_per_minute", u64::from(self.requests_per_minute)),
        ];
        for (name, value) in positive {
            if value == 0 {
                bail!("{name} must be positive");
            }
        }
        if i32::try_from(self.backfill_page).is_err() || i32::try_from(self.top_up_window).is_err() {
            bail!("window sizes must fit in a signed 32-bit count");
        }
        if self.database_url.trim().is_empty() {
            bail!("database_url cannot be empty");
        }
        Ok(())
    }

    /// Client settings derived from this config.
    pub fn xueqiu_config(&self) -> XueqiuConfig {
        XueqiuConfig {
            base_url: self.base_url.clone(),
            user_agent: self.user_agent.clone(),
            requests_per_minute: self.requests_per_minute,
            kline: self.kline.clone(),
        }
    }

    /// Planner windows.
    pub fn plan_settings(&self) -> PlanSettings {
        PlanSettings {
            backfill_page: self.backfill_page,
            top_up_window: self.top_up_window,
        }
    }

    /// Cookie cache lifetime.
    pub fn cookie_ttl(&self) -> Duration {
        Duration::from_secs(self.cookie_ttl_secs)
    }
}
