//! Token stats feed implementations

pub mod http;

pub use http::HttpPriceFeed;
