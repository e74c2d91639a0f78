//! Request resolution.
//!
//! Given an intercepted request and the session's pinned manifest version,
//! decide whether to serve a cached response, fetch with a fallback
//! substitute, pass through to the network, or block. The decision itself is
//! a pure function over the parsed manifest; the async wrapper performs the
//! fetches and cache lookups it calls for.

use url::Url;

use offcache_client::FetchRequest;
use offcache_core::manifest::{Manifest, ManifestVersion};
use offcache_core::{CapturedResponse, Error};

use crate::Engine;

/// Outcome of the pure decision algorithm, before any IO.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision<'a> {
    /// Serve the cached entry for the request URL.
    CacheHit,
    /// Fetch the real request; on failure substitute the cached entry for
    /// this fallback target.
    Fallback { target: &'a str },
    /// Pass through to the network.
    Network,
    /// Nothing matched; the request is blocked.
    Block,
}

/// Apply the precedence rules: cache section (or the consumer's own URL)
/// first, then longest-prefix fallback, then the network section or its
/// wildcard, else block.
pub fn decide<'a>(manifest: &'a Manifest, request_url: &str, consumer_url: &str) -> Decision<'a> {
    if manifest.caches_url(request_url) || request_url == consumer_url {
        return Decision::CacheHit;
    }
    if let Some((_, target)) = manifest.longest_fallback_match(request_url) {
        return Decision::Fallback { target };
    }
    if manifest.allows_network(request_url) {
        return Decision::Network;
    }
    Decision::Block
}

/// Whether two absolute URLs share scheme, host, and port.
pub fn same_origin(a: &str, b: &str) -> bool {
    match (Url::parse(a), Url::parse(b)) {
        (Ok(a), Ok(b)) => a.origin() == b.origin(),
        _ => false,
    }
}

fn same_scheme(a: &str, b: &str) -> bool {
    match (Url::parse(a), Url::parse(b)) {
        (Ok(a), Ok(b)) => a.scheme() == b.scheme(),
        _ => false,
    }
}

impl Engine {
    /// Resolve one intercepted request.
    ///
    /// Always produces a response value for expected conditions, possibly
    /// the synthetic network-error response, so the host's interception
    /// layer can apply its own final fallback. `Err` is reserved for store
    /// failures.
    pub async fn resolve(
        &self, request: &FetchRequest, session_id: &str, consumer_url: &str,
    ) -> Result<CapturedResponse, Error> {
        // Internal fetches, non-GET methods, and scheme-crossing requests are
        // exempt from manifest logic entirely.
        if request.has_bypass_marker() || !request.is_get() || !same_scheme(&request.url, consumer_url) {
            return Ok(self.direct_fetch(request).await);
        }

        let Some(manifest_url) = self.db().manifest_for_consumer(consumer_url).await? else {
            return self.resolve_without_manifest(request).await;
        };

        let Some(version) = self.version_for_session(session_id, &manifest_url).await? else {
            // Associated but no version recorded yet.
            return Ok(self.direct_fetch(request).await);
        };

        match decide(&version.manifest, &request.url, consumer_url) {
            Decision::CacheHit => {
                if let Some(cached) = self.db().match_entry(&version.hash, &request.url).await? {
                    tracing::debug!(url = request.url, hash = version.hash, "cache hit");
                    Ok(cached)
                } else {
                    tracing::debug!(url = request.url, hash = version.hash, "cache-listed entry missing");
                    Ok(self.direct_fetch(request).await)
                }
            }
            Decision::Fallback { target } => {
                let target = target.to_string();
                Ok(self.fetch_with_fallback(request, &version.hash, &target).await?)
            }
            Decision::Network => Ok(self.direct_fetch(request).await),
            Decision::Block => {
                tracing::debug!(url = request.url, "request matches no manifest section, blocking");
                Ok(CapturedResponse::network_error(&request.url))
            }
        }
    }

    /// The version a session resolves against: its pin if one exists, else
    /// the manifest's current version, pinning the session to it.
    async fn version_for_session(&self, session_id: &str, manifest_url: &str) -> Result<Option<ManifestVersion>, Error> {
        if let Some(pinned_hash) = self.db().pinned_version(session_id).await?
            && let Some(version) = self.db().find_version(&pinned_hash).await?
        {
            return Ok(Some(version));
        }

        let Some(current) = self.db().current_version(manifest_url).await? else {
            return Ok(None);
        };

        // First request of the session: commit it to the version it sees now.
        self.db().pin_session(session_id, &current.hash).await?;
        tracing::debug!(session_id, hash = current.hash, "session pinned");
        Ok(Some(current))
    }

    /// Fetch the real request; on network error, non-success status, or a
    /// redirect landing on a different origin, substitute the cached
    /// fallback target.
    async fn fetch_with_fallback(
        &self, request: &FetchRequest, version_hash: &str, target: &str,
    ) -> Result<CapturedResponse, Error> {
        let live = self.direct_fetch(request).await;
        if live.is_success() && same_origin(&request.url, &live.final_url) {
            return Ok(live);
        }

        tracing::debug!(url = request.url, target, "live fetch failed, serving fallback");
        match self.db().match_entry(version_hash, target).await? {
            Some(cached) => Ok(cached),
            None => Ok(CapturedResponse::network_error(&request.url)),
        }
    }

    /// No manifest bound to the consumer: scan every manifest's current
    /// version for a fallback-prefix match. The longest prefix wins; length
    /// ties keep the later manifest in the lexicographic scan order.
    async fn resolve_without_manifest(&self, request: &FetchRequest) -> Result<CapturedResponse, Error> {
        let mut winner: Option<(usize, String, String)> = None;

        for manifest_url in self.db().manifest_urls().await? {
            let Some(version) = self.db().current_version(&manifest_url).await? else {
                continue;
            };
            if let Some((prefix, target)) = version.manifest.longest_fallback_match(&request.url)
                && winner.as_ref().is_none_or(|(len, _, _)| prefix.len() >= *len)
            {
                winner = Some((prefix.len(), version.hash.clone(), target.to_string()));
            }
        }

        match winner {
            Some((_, hash, target)) => {
                tracing::debug!(url = request.url, target, "cross-manifest fallback match");
                self.fetch_with_fallback(request, &hash, &target).await
            }
            None => Ok(self.direct_fetch(request).await),
        }
    }

    /// Perform a network fetch with the bypass marker set, degrading fetch
    /// errors to the synthetic network-error response.
    async fn direct_fetch(&self, request: &FetchRequest) -> CapturedResponse {
        let mut outward = request.clone();
        if !outward.has_bypass_marker() {
            outward.headers.push((offcache_client::BYPASS_HEADER.to_string(), "1".to_string()));
        }

        match self.fetcher.fetch(&outward).await {
            Ok(response) => response,
            Err(e) => {
                tracing::debug!(url = request.url, error = %e, "direct fetch failed");
                CapturedResponse::network_error(&request.url)
            }
        }
    }
}
