//! Xueqiu REST implementation of [`QuoteApi`](crate::providers::QuoteApi) and
//! [`ReferenceApi`](crate::providers::ReferenceApi).

pub mod params;
pub mod provider;
pub mod response;

pub use provider::{SharedLimiter, XueqiuClient, XueqiuConfig, rate_limiter};
