//! Captured HTTP responses: the stored and served value type.
//!
//! Resolution never fails for expected conditions; a request that matches no
//! manifest rule yields the synthetic network-error value (status 0) so the
//! host's interception layer can apply its own final fallback.

use bytes::Bytes;
use chrono::{DateTime, Utc};

/// A captured HTTP response: status, headers, body, and the final URL after
/// redirects (used for origin comparison).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedResponse {
    /// The URL the request was issued for.
    pub url: String,
    /// The final URL after redirects.
    pub final_url: String,
    /// HTTP status code; 0 marks a synthetic network-error response.
    pub status: u16,
    /// Response headers in arrival order.
    pub headers: Vec<(String, String)>,
    /// Response body bytes.
    pub body: Bytes,
}

impl CapturedResponse {
    /// The synthetic network-error response for `url`: status 0, no body.
    pub fn network_error(url: &str) -> Self {
        Self { url: url.to_string(), final_url: url.to_string(), status: 0, headers: Vec::new(), body: Bytes::new() }
    }

    /// Whether this is the synthetic network-error value.
    pub fn is_network_error(&self) -> bool {
        self.status == 0
    }

    /// Whether the status is in the 2xx range.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// First header value with the given name, case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// The `Date` header parsed as an RFC 2822 timestamp.
    pub fn date(&self) -> Option<DateTime<Utc>> {
        self.header("date")
            .and_then(|v| DateTime::parse_from_rfc2822(v).ok())
            .map(|dt| dt.with_timezone(&Utc))
    }

    /// Whether the response declares itself non-cacheable
    /// (`Cache-Control: no-store`).
    pub fn declares_no_store(&self) -> bool {
        self.header("cache-control")
            .is_some_and(|v| v.split(',').any(|d| d.trim().eq_ignore_ascii_case("no-store")))
    }
}
