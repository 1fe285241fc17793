//! Subscriber setup for the binary.

use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::Utc;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

use crate::tz::EXCHANGE_TZ;

/// Name of today's log file, `app-YYYY-MM-DD.log` in exchange-local time.
pub fn daily_log_name() -> String {
    let today = Utc::now().with_timezone(&EXCHANGE_TZ).date_naive();
    format!("app-{}.log", today.format("%Y-%m-%d"))
}

/// Installs the global subscriber.
///
/// Output goes to stderr and, when `log_dir` is given, is appended to today's
/// file in that directory. `RUST_LOG` overrides the default `info` filter.
/// Returns the log file path when one was opened.
pub fn init(log_dir: Option<&Path>) -> anyhow::Result<Option<PathBuf>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let (file_layer, path) = match log_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)?;
            let path = dir.join(daily_log_name());
            let file = OpenOptions::new().create(true).append(true).open(&path)?;
            let layer = fmt::layer()
                .with_ansi(false)
                .with_writer(Mutex::new(file));
            (Some(layer), Some(path))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(file_layer)
        .try_init()?;
    Ok(path)
}
