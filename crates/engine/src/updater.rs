//! Manifest version updates.
//!
//! `ensure_current` fetches and hashes a manifest, and on change parses it,
//! resolves its entries to absolute URLs, appends the new version to the
//! history, and materializes the version's cache set. Re-running it against
//! an unchanged manifest body is a no-op returning the existing hash.

use std::collections::BTreeSet;

use offcache_client::{CacheMode, FetchRequest};
use offcache_core::cache::version_hash;
use offcache_core::manifest::{self, Manifest};
use offcache_core::{CapturedResponse, Error};

use crate::Engine;

/// Statuses that mean a resource is definitively gone; the URL is skipped
/// without error during materialization.
const GONE_STATUSES: [u16; 2] = [404, 410];

impl Engine {
    /// Bring a manifest's version history up to date.
    ///
    /// Returns the hash of the current version, newly appended or already
    /// known. Manifest fetch and parse failures propagate; per-resource
    /// materialization failures degrade to carrying the previous version's
    /// cached copy forward.
    pub async fn ensure_current(&self, manifest_url: &str) -> Result<String, Error> {
        let base_url = manifest::parse_manifest_url(manifest_url)?;

        let response = self.fetch_manifest(manifest_url).await?;
        let text = String::from_utf8_lossy(&response.body).into_owned();
        let hash = version_hash(manifest_url, &text);

        let history = self.db().version_history(manifest_url).await?;
        if history.iter().any(|v| v.hash == hash) {
            tracing::debug!(manifest_url, hash, "manifest unchanged, no update needed");
            return Ok(hash);
        }

        let parsed = manifest::parse(&text)?.resolve(&base_url);

        // The previous current version, captured before the append, feeds the
        // continuity carry-forward during materialization.
        let previous_hash = history.last().map(|v| v.hash.clone());

        if !self.db().append_version(manifest_url, &hash, &parsed).await? {
            // A concurrent update appended the same hash first.
            tracing::debug!(manifest_url, hash, "version already appended concurrently");
            return Ok(hash);
        }

        tracing::info!(manifest_url, hash, "new manifest version discovered");
        self.materialize(manifest_url, &hash, previous_hash.as_deref(), &parsed).await?;

        Ok(hash)
    }

    /// Fetch the manifest text, re-fetching with caching bypassed when the
    /// served copy is older than the configured staleness threshold.
    async fn fetch_manifest(&self, manifest_url: &str) -> Result<CapturedResponse, Error> {
        let request = FetchRequest::internal(manifest_url);
        let response = self
            .fetcher
            .fetch(&request)
            .await
            .map_err(|e| Error::ManifestFetch(e.to_string()))?;

        if !response.is_success() {
            return Err(Error::ManifestFetch(format!("{manifest_url}: status {}", response.status)));
        }

        let stale = response
            .date()
            .is_some_and(|date| chrono::Utc::now() - date > self.config.manifest_staleness());
        if !stale {
            return Ok(response);
        }

        tracing::info!(manifest_url, "manifest served from a stale intermediate cache, re-fetching");
        let bypass = FetchRequest::internal(manifest_url).with_cache_mode(CacheMode::NoCache);
        match self.fetcher.fetch(&bypass).await {
            Ok(fresh) if fresh.is_success() => Ok(fresh),
            Ok(fresh) => {
                tracing::warn!(manifest_url, status = fresh.status, "cache-bypass re-fetch failed, using stale copy");
                Ok(response)
            }
            Err(e) => {
                tracing::warn!(manifest_url, error = %e, "cache-bypass re-fetch failed, using stale copy");
                Ok(response)
            }
        }
    }

    /// Populate the content cache for a freshly appended version.
    ///
    /// The URL set is the manifest's cache list, the fallback targets, and
    /// every consumer URL ever associated with this manifest (master
    /// entries). Failures never abort the update.
    async fn materialize(
        &self, manifest_url: &str, hash: &str, previous_hash: Option<&str>, parsed: &Manifest,
    ) -> Result<(), Error> {
        let mut urls: BTreeSet<String> = parsed.cache.iter().cloned().collect();
        urls.extend(parsed.fallback.values().cloned());
        urls.extend(self.db().consumers_of_manifest(manifest_url).await?);

        let mut stored = 0usize;
        let mut carried = 0usize;
        let mut skipped = 0usize;

        for url in &urls {
            let request = FetchRequest::internal(url);
            match self.fetcher.fetch(&request).await {
                Ok(response) if response.declares_no_store() => {
                    tracing::debug!(url, "resource declares no-store, skipping");
                    skipped += 1;
                }
                Ok(response) if response.is_success() => {
                    self.db().put_entry(hash, url, &response).await?;
                    stored += 1;
                }
                Ok(response) if GONE_STATUSES.contains(&response.status) => {
                    tracing::debug!(url, status = response.status, "resource gone, skipping");
                    skipped += 1;
                }
                Ok(response) => {
                    tracing::warn!(url, status = response.status, "unexpected status during materialization");
                    carried += self.carry_forward(previous_hash, hash, url).await? as usize;
                }
                Err(e) => {
                    tracing::warn!(url, error = %e, "fetch failed during materialization");
                    carried += self.carry_forward(previous_hash, hash, url).await? as usize;
                }
            }
        }

        tracing::info!(manifest_url, hash, stored, carried, skipped, total = urls.len(), "version materialized");
        Ok(())
    }

    /// Copy the previous version's cached entry for a URL the update could
    /// not refresh. Returns whether an entry was carried.
    async fn carry_forward(&self, previous_hash: Option<&str>, hash: &str, url: &str) -> Result<bool, Error> {
        let Some(previous) = previous_hash else {
            return Ok(false);
        };
        let carried = self.db().copy_entry_from(previous, hash, url).await?;
        if carried {
            tracing::debug!(url, "carried forward previous version's entry");
        }
        Ok(carried)
    }
}
