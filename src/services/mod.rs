pub mod fetcher;
pub mod fuzzy;
pub mod m3u_parser;
pub mod metrics;
pub mod provider;
