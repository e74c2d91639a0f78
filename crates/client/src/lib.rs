//! HTTP client for offcache.
//!
//! This crate provides the network fetch primitive behind the [`Fetcher`]
//! trait, so the engine and its tests can inject fakes.

pub mod fetch;

pub use fetch::{BYPASS_HEADER, CacheMode, CredentialsMode, FetchConfig, FetchRequest, Fetcher, HttpFetcher};
