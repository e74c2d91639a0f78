//! Manifest model: the three declarative rule lists and their versioning.
//!
//! A manifest has three sections: URLs to cache ahead of time, URLs that must
//! always hit the network, and URL-prefix to fallback-URL mappings. All URLs
//! are resolved against the manifest's own URL, so two pages sharing a
//! manifest resolve relative entries identically.

pub mod parse;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::Error;

pub use parse::parse;

/// The network-section wildcard. Passes through URL resolution unchanged.
pub const NETWORK_WILDCARD: &str = "*";

/// A parsed manifest: three rule lists with raw or resolved URL strings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    /// URLs cached ahead of time, in declaration order.
    pub cache: Vec<String>,
    /// URLs that always bypass the cache, or the `"*"` wildcard.
    pub network: Vec<String>,
    /// URL-prefix to fallback-URL mapping. Keys are unique; the map order
    /// (lexicographic) is the documented tie-break for equal-length prefixes.
    pub fallback: BTreeMap<String, String>,
}

impl Manifest {
    /// Resolve every relative URL against the manifest's own URL.
    ///
    /// The network wildcard passes through unresolved. Entries that fail to
    /// resolve are dropped with a warning rather than failing the whole
    /// manifest, matching the lenient parsing of the legacy format.
    pub fn resolve(&self, manifest_url: &Url) -> Manifest {
        let resolve_one = |raw: &str| -> Option<String> {
            match manifest_url.join(raw) {
                Ok(abs) => Some(abs.to_string()),
                Err(e) => {
                    tracing::warn!(entry = raw, error = %e, "dropping unresolvable manifest entry");
                    None
                }
            }
        };

        let cache = self.cache.iter().filter_map(|u| resolve_one(u)).collect();

        let network = self
            .network
            .iter()
            .filter_map(|u| {
                if u == NETWORK_WILDCARD { Some(NETWORK_WILDCARD.to_string()) } else { resolve_one(u) }
            })
            .collect();

        let mut fallback = BTreeMap::new();
        for (prefix, target) in &self.fallback {
            if let Some(prefix) = resolve_one(prefix)
                && let Some(target) = resolve_one(target)
            {
                fallback.insert(prefix, target);
            }
        }

        Manifest { cache, network, fallback }
    }

    /// Whether the cache section lists this exact URL.
    pub fn caches_url(&self, url: &str) -> bool {
        self.cache.iter().any(|u| u == url)
    }

    /// Whether the network section lists this exact URL or carries the wildcard.
    pub fn allows_network(&self, url: &str) -> bool {
        self.network.iter().any(|u| u == url || u == NETWORK_WILDCARD)
    }

    /// The longest fallback key that is a string-prefix of `url`, with its
    /// target.
    pub fn longest_fallback_match(&self, url: &str) -> Option<(&str, &str)> {
        let mut best: Option<(&str, &str)> = None;
        for (prefix, target) in &self.fallback {
            if url.starts_with(prefix.as_str())
                && best.is_none_or(|(b, _)| prefix.len() >= b.len())
            {
                best = Some((prefix, target));
            }
        }
        best
    }
}

/// One discovered version of a manifest: its content hash and parsed rules.
///
/// Immutable once created. Owned by the version-history entry for its
/// manifest URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestVersion {
    pub hash: String,
    pub manifest: Manifest,
}

/// Parse an absolute manifest URL, mapping failures to [`Error::InvalidUrl`].
pub fn parse_manifest_url(manifest_url: &str) -> Result<Url, Error> {
    Url::parse(manifest_url).map_err(|e| Error::InvalidUrl(format!("{manifest_url}: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manifest_url() -> Url {
        Url::parse("https://example.com/app/cache.manifest").unwrap()
    }

    #[test]
    fn test_resolve_relative_entries() {
        let manifest = Manifest {
            cache: vec!["a.js".into(), "/b.css".into()],
            network: vec!["api/".into()],
            fallback: BTreeMap::from([("img/".to_string(), "offline.png".to_string())]),
        };

        let resolved = manifest.resolve(&manifest_url());
        assert_eq!(resolved.cache, vec!["https://example.com/app/a.js", "https://example.com/b.css"]);
        assert_eq!(resolved.network, vec!["https://example.com/app/api/"]);
        assert_eq!(
            resolved.fallback.get("https://example.com/app/img/").map(String::as_str),
            Some("https://example.com/app/offline.png")
        );
    }

    #[test]
    fn test_resolve_wildcard_passthrough() {
        let manifest = Manifest { network: vec!["*".into()], ..Default::default() };
        let resolved = manifest.resolve(&manifest_url());
        assert_eq!(resolved.network, vec!["*"]);
    }

    #[test]
    fn test_resolve_against_manifest_url_not_page_url() {
        // Relative entries resolve against the manifest's directory.
        let manifest = Manifest { cache: vec!["style.css".into()], ..Default::default() };
        let resolved = manifest.resolve(&manifest_url());
        assert_eq!(resolved.cache, vec!["https://example.com/app/style.css"]);
    }

    #[test]
    fn test_allows_network_wildcard() {
        let manifest = Manifest { network: vec!["*".into()], ..Default::default() };
        assert!(manifest.allows_network("https://example.com/anything"));
    }

    #[test]
    fn test_longest_fallback_match_prefers_longest() {
        let manifest = Manifest {
            fallback: BTreeMap::from([
                ("https://x/a/".to_string(), "https://x/short.html".to_string()),
                ("https://x/a/b/".to_string(), "https://x/long.html".to_string()),
            ]),
            ..Default::default()
        };

        let (prefix, target) = manifest.longest_fallback_match("https://x/a/b/c").unwrap();
        assert_eq!(prefix, "https://x/a/b/");
        assert_eq!(target, "https://x/long.html");

        let (prefix, target) = manifest.longest_fallback_match("https://x/a/x").unwrap();
        assert_eq!(prefix, "https://x/a/");
        assert_eq!(target, "https://x/short.html");
    }

    #[test]
    fn test_longest_fallback_match_none() {
        let manifest = Manifest::default();
        assert!(manifest.longest_fallback_match("https://x/anything").is_none());
    }

    #[test]
    fn test_parse_manifest_url_rejects_relative() {
        assert!(matches!(parse_manifest_url("app/cache.manifest"), Err(Error::InvalidUrl(_))));
    }
}
