//! Cache garbage collection.
//!
//! A sweep reconciles the live-consumer set against stored session pins and
//! reclaims versions that are both superseded and unpinned. A version still
//! pinned by an active session is never touched, however old. Sweeps are
//! single-flight: one in progress makes a new request a no-op rather than
//! queueing. Duplicate cleanups are wasted work, never unsafe.

use std::collections::HashSet;
use std::sync::atomic::Ordering;

use offcache_core::Error;

use crate::Engine;

/// What a sweep did, for the host's logging.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SweepStats {
    /// True when another sweep was already in flight and this one did nothing.
    pub skipped: bool,
    pub stale_pins_removed: u64,
    pub versions_deleted: u64,
    pub entries_deleted: u64,
}

impl SweepStats {
    fn skipped() -> Self {
        Self { skipped: true, ..Default::default() }
    }
}

impl Engine {
    /// Sweep using the injected consumer enumerator's live-session set.
    pub async fn sweep(&self) -> Result<SweepStats, Error> {
        if self
            .sweep_in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            tracing::debug!("sweep already in flight, skipping");
            return Ok(SweepStats::skipped());
        }

        let result = async {
            let active = self.consumers.active_sessions().await?;
            self.sweep_inner(&active).await
        }
        .await;

        self.sweep_in_flight.store(false, Ordering::Release);
        result
    }

    async fn sweep_inner(&self, active_sessions: &HashSet<String>) -> Result<SweepStats, Error> {
        let mut stats = SweepStats::default();

        let stale: Vec<String> = self
            .db()
            .all_pins()
            .await?
            .into_iter()
            .filter(|(session_id, _)| !active_sessions.contains(session_id))
            .map(|(session_id, _)| session_id)
            .collect();
        stats.stale_pins_removed = self.db().remove_pins(&stale).await?;

        // Pins surviving the reap are the only thing keeping superseded
        // versions alive.
        let pinned = self.db().pinned_hashes().await?;

        for manifest_url in self.db().manifest_urls().await? {
            for hash in self.db().superseded_hashes(&manifest_url).await? {
                if pinned.contains(&hash) {
                    tracing::debug!(manifest_url, hash, "superseded version still pinned, retaining");
                    continue;
                }
                stats.entries_deleted += self.db().delete_namespace(&hash).await?;
                self.db().remove_version(&hash).await?;
                stats.versions_deleted += 1;
                tracing::info!(manifest_url, hash, "reclaimed superseded version");
            }
        }

        tracing::info!(
            stale_pins = stats.stale_pins_removed,
            versions = stats.versions_deleted,
            entries = stats.entries_deleted,
            "sweep complete"
        );
        Ok(stats)
    }
}
