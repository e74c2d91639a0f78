//! SQLite-backed stores for manifest versions, consumer state, and cached
//! response content.
//!
//! This module provides the persistent state shared by the updater, the
//! resolver, and the garbage collector:
//!
//! - Append-only version history per manifest URL (last entry = current)
//! - Consumer-to-manifest associations and session-to-version pins
//! - Content-addressed response cache namespaced by version hash
//! - Automatic schema migrations, WAL mode for concurrent access
//!
//! Multi-step read-modify-write sequences run inside a single connection
//! call as one transaction, which serializes same-key updates.

pub mod associations;
pub mod connection;
pub mod entries;
pub mod hash;
pub mod migrations;
pub mod versions;

pub use crate::Error;

pub use connection::CacheDb;
pub use hash::version_hash;
