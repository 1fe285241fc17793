//! SQLite connection helpers.
//!
//! Every unit of work opens its own connection through [`connect_sqlite`]; connections
//! are never shared between workers. WAL plus a busy timeout lets the parallel
//! writers queue on the database lock instead of failing.

use diesel::{Connection, RunQueryDsl, SqliteConnection, sql_query};

/// Strips an optional `sqlite:` / `sqlite://` prefix so both URL and path forms work.
pub fn sqlite_path(database_url: &str) -> &str {
    database_url
        .strip_prefix("sqlite://")
        .or_else(|| database_url.strip_prefix("sqlite:"))
        .unwrap_or(database_url)
}

/// Open a SQLite connection and apply connection-wide PRAGMAs.
pub fn connect_sqlite(database_url: &str) -> Result<SqliteConnection, diesel::ConnectionError> {
    let mut conn = SqliteConnection::establish(sqlite_path(database_url))?;

    let pragmas = [
        "PRAGMA journal_mode=WAL;",
        "PRAGMA foreign_keys=ON;",
        "PRAGMA busy_timeout=5000;",
    ];
    for pragma in pragmas {
        sql_query(pragma)
            .execute(&mut conn)
            .map_err(|e| diesel::ConnectionError::BadConnection(format!("{pragma} {e}")))?;
    }
    Ok(conn)
}
