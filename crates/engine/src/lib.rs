//! The offcache engine: manifest version updates, request resolution, and
//! cache garbage collection over injected capabilities.
//!
//! The host wires two entry points into its request-interception mechanism:
//! [`Engine::ensure_current_and_associate`] once per page load, and
//! [`Engine::resolve`] once per intercepted request. After navigation-driven
//! resolutions the host triggers [`Engine::sweep`] to reclaim versions no
//! live consumer needs anymore.

pub mod consumers;
pub mod gc;
pub mod resolver;
pub mod updater;

use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use offcache_client::Fetcher;
use offcache_core::{AppConfig, CacheDb, Error};

pub use consumers::{ConsumerEnumerator, SharedConsumers};
pub use gc::SweepStats;

/// The engine: holds the store handle and the injected capabilities.
///
/// Cheap to share behind an `Arc`; all methods take `&self`.
pub struct Engine {
    db: CacheDb,
    fetcher: Arc<dyn Fetcher>,
    consumers: Arc<dyn ConsumerEnumerator>,
    config: AppConfig,
    sweep_in_flight: AtomicBool,
}

impl Engine {
    pub fn new(
        db: CacheDb, fetcher: Arc<dyn Fetcher>, consumers: Arc<dyn ConsumerEnumerator>, config: AppConfig,
    ) -> Self {
        Self { db, fetcher, consumers, config, sweep_in_flight: AtomicBool::new(false) }
    }

    /// Bring the manifest up to date and bind the consumer to it.
    ///
    /// Called once per page load. The association is insert-once: a consumer
    /// URL that registered before keeps its original manifest binding.
    ///
    /// # Errors
    ///
    /// Propagates manifest fetch and parse failures from
    /// [`Engine::ensure_current`]; per-resource materialization failures are
    /// absorbed there and never surface here.
    pub async fn ensure_current_and_associate(&self, manifest_url: &str, consumer_url: &str) -> Result<String, Error> {
        let hash = self.ensure_current(manifest_url).await?;
        self.db.associate_consumer(consumer_url, manifest_url).await?;
        Ok(hash)
    }

    /// The underlying store handle.
    pub fn db(&self) -> &CacheDb {
        &self.db
    }

    /// The active configuration.
    pub fn config(&self) -> &AppConfig {
        &self.config
    }
}
