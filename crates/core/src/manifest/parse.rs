//! Parser for the legacy manifest text format.
//!
//! The format is line-oriented:
//!
//! ```text
//! CACHE MANIFEST
//! # a comment
//! /a.js
//! NETWORK:
//! *
//! FALLBACK:
//! /api/ /offline.html
//! ```
//!
//! Section headers (`CACHE:`, `NETWORK:`, `FALLBACK:`) switch the active
//! section; entries before any header belong to CACHE. Unknown section
//! headers switch to an ignored section rather than erroring, and malformed
//! entries are skipped, matching the lenient behavior of the format.
//! Output URLs are raw, possibly relative; resolution against the manifest
//! URL is a separate step ([`Manifest::resolve`]).

use crate::Error;

use super::Manifest;

/// Required first-line signature of a manifest document.
const MAGIC: &str = "CACHE MANIFEST";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Cache,
    Network,
    Fallback,
    Ignored,
}

/// Parse manifest text into its three raw rule lists.
///
/// # Errors
///
/// Returns `Error::ManifestParse` if the document does not start with the
/// `CACHE MANIFEST` signature.
pub fn parse(text: &str) -> Result<Manifest, Error> {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    let mut lines = text.lines();

    let first = lines
        .by_ref()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .ok_or_else(|| Error::ManifestParse("empty document".into()))?;

    // The signature line may carry a trailing comment but nothing else.
    if first != MAGIC && !first.strip_prefix(MAGIC).is_some_and(|rest| rest.starts_with([' ', '\t', '#'])) {
        return Err(Error::ManifestParse(format!("missing {MAGIC} signature")));
    }

    let mut manifest = Manifest::default();
    let mut section = Section::Cache;

    for line in lines {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        if let Some(header) = line.strip_suffix(':') {
            section = match header.trim() {
                "CACHE" => Section::Cache,
                "NETWORK" => Section::Network,
                "FALLBACK" => Section::Fallback,
                _ => Section::Ignored,
            };
            continue;
        }

        match section {
            Section::Cache => {
                if let Some(entry) = line.split_whitespace().next() {
                    manifest.cache.push(entry.to_string());
                }
            }
            Section::Network => {
                if let Some(entry) = line.split_whitespace().next() {
                    manifest.network.push(entry.to_string());
                }
            }
            Section::Fallback => {
                let mut parts = line.split_whitespace();
                if let (Some(prefix), Some(target)) = (parts.next(), parts.next()) {
                    // Duplicate prefixes: last declaration wins.
                    manifest.fallback.insert(prefix.to_string(), target.to_string());
                } else {
                    tracing::warn!(line, "skipping malformed fallback entry");
                }
            }
            Section::Ignored => {}
        }
    }

    Ok(manifest)
}
