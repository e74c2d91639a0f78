//! Core types and shared functionality for offcache.
//!
//! This crate provides:
//! - Manifest model and text parser
//! - SQLite-backed version, association, and content-cache stores
//! - Unified error types
//! - Configuration structures

pub mod cache;
pub mod config;
pub mod error;
pub mod manifest;
pub mod response;

pub use cache::CacheDb;
pub use config::AppConfig;
pub use error::Error;
pub use manifest::{Manifest, ManifestVersion};
pub use response::CapturedResponse;
