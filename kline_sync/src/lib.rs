//! Incremental K-line synchronization into SQLite.
//!
//! A run lists the symbol universe, then syncs every symbol in parallel: cold
//! symbols get a full backward backfill, warm ones a short forward top-up that
//! overwrites the overlapping tail. Session cookies are memoized in a
//! [`cache::CredentialCache`] shared by all workers; everything else is owned by
//! the unit of work that uses it.
//!
//! Company profiles are memoized in the same cache under their own identity; see
//! [`profiles`].

#![deny(missing_docs)]

pub mod cache;
pub mod config;
pub mod coordinator;
pub mod credentials;
pub mod db;
pub mod error;
pub mod logging;
pub mod models;
pub mod planner;
pub mod profiles;
/// Diesel table definitions.
pub mod schema;
pub mod store;
pub mod symbols;
pub mod tz;
pub mod worker;
