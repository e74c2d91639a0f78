//! HTTP fetch primitive.
//!
//! ### Request descriptors
//! - Method, headers, credentials mode, and cache mode travel with each
//!   request so a single client serves both resolution-time fetches and the
//!   updater's materialization fetches.
//! - Internal fetches carry a sentinel header ([`BYPASS_HEADER`]) so the
//!   host's interception layer can let them through without re-applying
//!   cache logic.
//!
//! ### Limits
//! - Max redirects: 5 (the final URL is captured for origin comparison)
//! - Max body bytes: 5MB (configurable)
//!
//! Non-success statuses are returned as captured responses, not errors;
//! callers decide what a 404 means for their flow.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{Client, header};

use offcache_core::{CapturedResponse, Error};

/// Sentinel header marking a direct, interception-bypassing fetch.
pub const BYPASS_HEADER: &str = "x-offcache-bypass";

/// Credentials mode for a request, mirroring the fetch API notion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialsMode {
    Omit,
    Include,
}

/// Cache mode for a request. `NoCache` forces revalidation through any
/// intermediate HTTP cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheMode {
    Default,
    NoCache,
}

/// A request descriptor: everything the fetch primitive needs to issue it.
#[derive(Debug, Clone)]
pub struct FetchRequest {
    pub url: String,
    pub method: String,
    pub headers: Vec<(String, String)>,
    pub credentials: CredentialsMode,
    pub cache_mode: CacheMode,
}

impl FetchRequest {
    /// A plain GET request.
    pub fn get(url: &str) -> Self {
        Self {
            url: url.to_string(),
            method: "GET".to_string(),
            headers: Vec::new(),
            credentials: CredentialsMode::Include,
            cache_mode: CacheMode::Default,
        }
    }

    /// An internal GET: credentials included and the bypass marker set, so
    /// the interception layer passes it straight through.
    pub fn internal(url: &str) -> Self {
        let mut request = Self::get(url);
        request.headers.push((BYPASS_HEADER.to_string(), "1".to_string()));
        request
    }

    /// Switch the cache mode, consuming self.
    pub fn with_cache_mode(mut self, cache_mode: CacheMode) -> Self {
        self.cache_mode = cache_mode;
        self
    }

    /// First header value with the given name, case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Whether this request carries the internal bypass marker.
    pub fn has_bypass_marker(&self) -> bool {
        self.header(BYPASS_HEADER).is_some()
    }

    /// Whether this is a GET request.
    pub fn is_get(&self) -> bool {
        self.method.eq_ignore_ascii_case("GET")
    }
}

/// The network fetch capability. Implemented by [`HttpFetcher`] for real
/// traffic and by scripted fakes in tests.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, request: &FetchRequest) -> Result<CapturedResponse, Error>;
}

/// Configuration for the fetch client.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// User agent string (default: "offcache/0.1")
    pub user_agent: String,

    /// Maximum response body size in bytes (default: 5MB)
    pub max_bytes: usize,

    /// Request timeout (default: 20s)
    pub timeout: Duration,

    /// Maximum number of redirects to follow (default: 5)
    pub max_redirects: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agent: "offcache/0.1".to_string(),
            max_bytes: 5 * 1024 * 1024,
            timeout: Duration::from_millis(20000),
            max_redirects: 5,
        }
    }
}

/// HTTP fetch client backed by reqwest.
pub struct HttpFetcher {
    http: Client,
    config: FetchConfig,
}

impl HttpFetcher {
    /// Create a new fetch client with the given configuration.
    pub fn new(config: FetchConfig) -> Result<Self, Error> {
        let http = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(config.timeout)
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .use_rustls_tls()
            .cookie_store(true)
            .gzip(true)
            .brotli(true)
            .deflate(true)
            .build()
            .map_err(|e| Error::HttpError(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self { http, config })
    }

    /// Get reference to the configuration.
    pub fn config(&self) -> &FetchConfig {
        &self.config
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, request: &FetchRequest) -> Result<CapturedResponse, Error> {
        let start = Instant::now();

        let method = reqwest::Method::from_bytes(request.method.as_bytes())
            .map_err(|_| Error::HttpError(format!("unsupported method {}", request.method)))?;

        let mut builder = self.http.request(method, request.url.as_str());
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if request.cache_mode == CacheMode::NoCache {
            builder = builder
                .header(header::CACHE_CONTROL, "no-cache")
                .header(header::PRAGMA, "no-cache");
        }

        let response = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                Error::FetchTimeout(format!("{}: {}", request.url, e))
            } else {
                Error::HttpError(format!("network error: {}", e))
            }
        })?;

        let status = response.status().as_u16();
        let final_url = response.url().to_string();

        if let Some(len) = response.content_length()
            && len as usize > self.config.max_bytes
        {
            return Err(Error::FetchTooLarge(format!("{} bytes exceeds {}", len, self.config.max_bytes)));
        }

        let headers: Vec<(String, String)> = response
            .headers()
            .iter()
            .filter_map(|(k, v)| v.to_str().ok().map(|v| (k.as_str().to_string(), v.to_string())))
            .collect();

        let body: Bytes = response
            .bytes()
            .await
            .map_err(|e| Error::HttpError(format!("failed to read response: {}", e)))?;

        if body.len() > self.config.max_bytes {
            return Err(Error::FetchTooLarge(format!("{} bytes exceeds {}", body.len(), self.config.max_bytes)));
        }

        tracing::debug!(
            "fetched {} -> {} status {} in {}ms ({} bytes)",
            request.url,
            final_url,
            status,
            start.elapsed().as_millis(),
            body.len()
        );

        Ok(CapturedResponse { url: request.url.clone(), final_url, status, headers, body })
    }
}
