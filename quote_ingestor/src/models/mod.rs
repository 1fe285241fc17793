pub mod bar;
pub mod kline;
pub mod market;
pub mod quote;
pub mod symbol;
