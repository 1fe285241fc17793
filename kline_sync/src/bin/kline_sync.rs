use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use kline_sync::cache::{CredentialCache, SqliteCacheBackend};
use kline_sync::config::{CookieSource, SyncConfig};
use kline_sync::coordinator::{ParallelSyncCoordinator, SyncOutcome};
use kline_sync::credentials::CachedCookies;
use kline_sync::db::{connection::connect_sqlite, migrate};
use kline_sync::logging;
use kline_sync::models::SymbolRef;
use kline_sync::error::SyncError;
use kline_sync::planner::SymbolSyncPlanner;
use kline_sync::profiles::CachedProfiles;
use kline_sync::store::{KlineRepo, SqliteKlineRepo};
use kline_sync::symbols::collect_symbol_lists;
use kline_sync::worker::{DefaultWorkerFactory, SyncContext, WorkerFactory, sync_symbol};
use quote_ingestor::models::market::MarketSegment;
use quote_ingestor::models::quote::QuoteSnapshot;
use quote_ingestor::providers::ReferenceApi;
use quote_ingestor::session::{CookieProvider, HttpCookieProvider, StaticCookieProvider};
use tracing::{info, warn};

#[derive(Parser)]
#[command(version, about = "Incremental K-line sync CLI")]
struct Cli {
    /// TOML config file; defaults and environment apply without one.
    #[arg(long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /// Log to stderr only.
    #[arg(long, global = true)]
    no_log_file: bool,

    #[command(subcommand)]
    cmd: Cmd,
}

#[derive(Subcommand)]
enum Cmd {
    /// Apply pending schema migrations.
    Migrate,
    /// Refresh the listed-symbol universe.
    Symbols,
    /// Sync bars for every listed symbol, or only the given ones.
    Bars(BarsArgs),
    /// Refresh symbols, then sync bars for all of them.
    Sync,
    /// Print current quotes as JSON.
    Quote(QuoteArgs),
    /// Print a company profile as JSON.
    Profile(ProfileArgs),
    /// Credential cache maintenance.
    Cache(CacheCmd),
}

#[derive(Args)]
struct BarsArgs {
    /// Symbol code, e.g. SH600000. Repeatable.
    #[arg(long = "symbol", value_name = "CODE")]
    symbols: Vec<String>,
}

#[derive(Args)]
struct QuoteArgs {
    /// Symbol code. Repeatable; several codes go out as one batch request.
    #[arg(long = "symbol", value_name = "CODE", required = true)]
    symbols: Vec<String>,

    /// Include the extended detail fields (one request per symbol).
    #[arg(long)]
    detail: bool,
}

#[derive(Args)]
struct ProfileArgs {
    /// Symbol code, e.g. SH600000.
    #[arg(long = "symbol", value_name = "CODE")]
    symbol: String,
}

#[derive(Args)]
struct CacheCmd {
    #[command(subcommand)]
    sub: CacheSub,
}

#[derive(Subcommand)]
enum CacheSub {
    /// Drop every cached credential.
    Clear,
}

struct App {
    cfg: SyncConfig,
    cookies: CachedCookies,
    profiles: CachedProfiles,
    // One factory per process, so every client shares its rate limiter.
    factory: Arc<DefaultWorkerFactory>,
}

impl App {
    fn build(cfg: SyncConfig) -> Result<Self> {
        let cache = Arc::new(open_cache(&cfg)?);
        let provider: Arc<dyn CookieProvider> = match cfg.cookie_source {
            CookieSource::Http => Arc::new(HttpCookieProvider::new(cfg.site_url.clone())?),
            CookieSource::Env => Arc::new(StaticCookieProvider::from_env()?),
        };
        let cookies = CachedCookies::new(Arc::clone(&cache), provider, cfg.cookie_ttl());
        let profiles = CachedProfiles::new(cache, cfg.cookie_ttl());
        let factory = Arc::new(DefaultWorkerFactory::new(
            cfg.database_url.clone(),
            cfg.xueqiu_config(),
        )?);
        Ok(Self {
            cfg,
            cookies,
            profiles,
            factory,
        })
    }

    fn factory(&self) -> Arc<dyn WorkerFactory> {
        Arc::clone(&self.factory) as Arc<dyn WorkerFactory>
    }

    /// Drops the cached session after a rejection so the next run starts fresh.
    fn forget_rejected_session<T>(&self, result: &Result<T, SyncError>) -> Result<()> {
        if let Err(e) = result {
            if e.is_auth() {
                warn!(error = %e, "session rejected, cached cookies dropped for the next run");
                self.cookies.invalidate(&self.cfg.user_agent)?;
            }
        }
        Ok(())
    }

    async fn quotes(&self, codes: &[String], detail: bool) -> Result<serde_json::Value> {
        let client = self
            .factory
            .client(&self.cookies.cookies(&self.cfg.user_agent).await?)?;
        let result = fetch_quotes(&client, codes, detail).await;
        self.forget_rejected_session(&result)?;
        Ok(serde_json::to_value(result?)?)
    }

    async fn profile(&self, code: &str) -> Result<serde_json::Value> {
        let ua = &self.cfg.user_agent;
        let client = self.factory.client(&self.cookies.cookies(ua).await?)?;
        let result = self.profiles.profile(&client, code, ua).await;
        self.forget_rejected_session(&result)?;
        let profile = result?;
        // Served from the entry the lookup above just cached.
        let listed = self.profiles.listing_date(&client, code, ua).await?;
        Ok(serde_json::json!({ "listing_date": listed, "profile": profile }))
    }

    async fn refresh_symbols(&self) -> Result<usize> {
        let factory = self.factory();
        let ua = &self.cfg.user_agent;
        let api = factory.open_api(&self.cookies.cookies(ua).await?)?;
        let mut conn = factory.open_store()?;

        let result = collect_symbol_lists(
            api.as_ref(),
            &SqliteKlineRepo::new(),
            &mut conn,
            &MarketSegment::ALL,
            self.cfg.list_page_size,
        )
        .await;
        self.forget_rejected_session(&result)?;
        Ok(result?)
    }

    async fn sync_bars(&self, only: &[String]) -> Result<SyncOutcome> {
        let repo = SqliteKlineRepo::new();
        let mut conn = connect_sqlite(&self.cfg.database_url)?;
        let listed = repo.list_symbols(&mut conn)?;
        drop(conn);

        let targets = if only.is_empty() {
            listed
        } else {
            select_symbols(&listed, only)
        };

        let ctx = SyncContext {
            factory: self.factory(),
            cookies: self.cookies.clone(),
            user_agent: self.cfg.user_agent.clone(),
            planner: SymbolSyncPlanner::new(self.cfg.plan_settings()),
            commit_batch_size: self.cfg.commit_batch_size,
        };
        let coordinator = ParallelSyncCoordinator::new(self.cfg.workers);
        let outcome = coordinator
            .run(targets, move |symbol| {
                let ctx = ctx.clone();
                async move { sync_symbol(&ctx, &symbol).await }
            })
            .await;
        Ok(outcome)
    }
}

async fn fetch_quotes(
    api: &dyn ReferenceApi,
    codes: &[String],
    detail: bool,
) -> Result<Vec<QuoteSnapshot>, SyncError> {
    if detail {
        let mut out = Vec::with_capacity(codes.len());
        for code in codes {
            out.push(api.detail(code).await?);
        }
        return Ok(out);
    }
    match codes {
        [code] => Ok(vec![api.quote(code).await?]),
        _ => Ok(api.batch_quote(codes).await?),
    }
}

fn open_cache(cfg: &SyncConfig) -> Result<CredentialCache> {
    let backend = SqliteCacheBackend::open(&cfg.cache_url)
        .with_context(|| format!("open credential cache {}", cfg.cache_url))?;
    Ok(CredentialCache::new(backend))
}

/// Requested codes, named from the listing where possible.
fn select_symbols(listed: &[SymbolRef], codes: &[String]) -> Vec<SymbolRef> {
    codes
        .iter()
        .map(|code| {
            let code = code.trim().to_uppercase();
            match listed.iter().find(|s| s.code == code) {
                Some(s) => s.clone(),
                None => {
                    warn!(symbol = %code, "symbol not listed, syncing with its code as name");
                    SymbolRef::new(code.clone(), code)
                }
            }
        })
        .collect()
}

fn print_summary(outcome: &SyncOutcome) {
    println!(
        "synced {} symbols: {} succeeded, {} failed",
        outcome.total(),
        outcome.succeeded,
        outcome.failed
    );
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let cfg = SyncConfig::load(cli.config.as_deref())?;

    let log_dir = (!cli.no_log_file).then(|| PathBuf::from(&cfg.log_dir));
    if let Some(path) = logging::init(log_dir.as_deref())? {
        info!(path = %path.display(), "logging to file");
    }

    migrate::run_all(&cfg.database_url)?;

    match cli.cmd {
        Cmd::Migrate => {
            info!(database = %cfg.database_url, "migrations applied");
        }
        Cmd::Symbols => {
            let app = App::build(cfg)?;
            let saved = app.refresh_symbols().await?;
            println!("saved {saved} symbols");
        }
        Cmd::Bars(BarsArgs { symbols }) => {
            let app = App::build(cfg)?;
            let outcome = app.sync_bars(&symbols).await?;
            print_summary(&outcome);
        }
        Cmd::Sync => {
            let app = App::build(cfg)?;
            let saved = app.refresh_symbols().await?;
            info!(saved, "symbol listing refreshed");
            let outcome = app.sync_bars(&[]).await?;
            print_summary(&outcome);
        }
        Cmd::Quote(QuoteArgs { symbols, detail }) => {
            let app = App::build(cfg)?;
            let codes: Vec<String> = symbols.iter().map(|c| c.trim().to_uppercase()).collect();
            let quotes = app.quotes(&codes, detail).await?;
            println!("{}", serde_json::to_string_pretty(&quotes)?);
        }
        Cmd::Profile(ProfileArgs { symbol }) => {
            let app = App::build(cfg)?;
            let profile = app.profile(&symbol.trim().to_uppercase()).await?;
            println!("{}", serde_json::to_string_pretty(&profile)?);
        }
        Cmd::Cache(CacheCmd { sub: CacheSub::Clear }) => {
            open_cache(&cfg)?.clear_all()?;
            println!("credential cache cleared");
        }
    }

    Ok(())
}
