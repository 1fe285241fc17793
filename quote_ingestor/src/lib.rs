//! Quote-provider side of the K-line pipeline.
//!
//! - [`models`]: vendor-agnostic bars, symbol records and request options.
//! - [`decode`]: uniform optional-numeric decoding for loosely typed JSON payloads.
//! - [`providers`]: the [`providers::QuoteApi`] trait, pagination walks and the
//!   Xueqiu REST implementation.
//! - [`session`]: cookie acquisition adapters for the provider's web session.

pub mod decode;
pub mod models;
pub mod providers;
pub mod session;
