//! set up migrations

use anyhow::anyhow;
use diesel::{Connection, SqliteConnection, connection::SimpleConnection};
use diesel_migrations::{EmbeddedMigrations, MigrationHarness, embed_migrations};

use crate::db::connection::sqlite_path;

/// Embedded Diesel migrations bundled with this crate.
///
/// These are applied by `run_sqlite` to bring the database schema up to date.
pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

/// Runs pending Diesel migrations on a SQLite database at the given URL.
///
/// This sets the SQLite journal mode to WAL and applies all embedded migrations, returning an error on failure.
pub fn run_sqlite(url: &str) -> anyhow::Result<()> {
    let mut conn = SqliteConnection::establish(sqlite_path(url))?;
    conn.batch_execute("PRAGMA journal_mode=WAL;")?;
    conn.run_pending_migrations(MIGRATIONS)
        .map_err(|e| anyhow!(e))?;

    Ok(())
}

/// Runs pending migrations for the given database URL.
///
/// Server databases are rejected; bare paths and `sqlite:` URLs are migrated with [`run_sqlite`].
pub fn run_all(database_url: &str) -> anyhow::Result<()> {
    if database_url.starts_with("postgres://") || database_url.starts_with("postgresql://") {
        anyhow::bail!("Unsupported DATABASE_URL: {database_url}");
    }
    run_sqlite(database_url)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn migrations_apply_on_temp_file() {
        let temp = tempfile::NamedTempFile::new().unwrap();
        let path = temp.path().to_string_lossy().to_string();

        crate::db::migrate::run_sqlite(&path).expect("migration run");

        let mut conn = SqliteConnection::establish(&path).unwrap();

        conn.batch_execute(
            "INSERT INTO kline_bar (symbol_code, name, timestamp, trade_date) \
             VALUES ('SH600000', 'x', 1, '1970-01-01')",
        )
        .unwrap();
        let dup = conn.batch_execute(
            "INSERT INTO kline_bar (symbol_code, name, timestamp, trade_date) \
             VALUES ('SH600000', 'x', 1, '1970-01-01')",
        );
        assert!(dup.is_err(), "(symbol_code, timestamp) must be unique");
    }

    #[test]
    fn rerunning_is_a_no_op() {
        let temp = tempfile::NamedTempFile::new().unwrap();
        let path = temp.path().to_string_lossy().to_string();
        run_all(&path).unwrap();
        run_all(&path).unwrap();
    }

    #[test]
    fn server_urls_are_rejected() {
        assert!(run_all("postgres://localhost/kline").is_err());
    }
}
