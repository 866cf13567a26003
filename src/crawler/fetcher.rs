//! HTTP fetcher implementation
//!
//! This module handles all HTTP requests for the crawler, including:
//! - Building HTTP clients with proper user agent strings and timeouts
//! - GET requests returning raw bytes
//! - Content-Type based classification of the payload
//! - Retry logic for transient failures
//! - Error classification

use crate::config::{Config, CrawlerConfig};
use crate::crawler::Classification;
use reqwest::{redirect::Policy, Client};
use std::time::Duration;
use thiserror::Error;
use tracing::debug;
use url::Url;

/// Redirect hops followed before a fetch is abandoned
const MAX_REDIRECTS: usize = 10;

/// A successfully fetched resource
#[derive(Debug, Clone)]
pub struct FetchedResource {
    /// Final URL after redirects
    pub final_url: Url,
    /// HTTP status code
    pub status_code: u16,
    /// Lowercased Content-Type header value, empty when absent
    pub content_type: String,
    /// Raw payload
    pub bytes: Vec<u8>,
    /// Classification derived from the content type
    pub class: Classification,
}

/// Reasons a single fetch can fail
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Request timeout: {url}")]
    Timeout { url: String },

    #[error("Connection failed for {url}: {message}")]
    Connect { url: String, message: String },

    #[error("HTTP {status} for {url}")]
    Status { url: String, status: u16 },

    #[error("Failed to read body of {url}: {message}")]
    Body { url: String, message: String },

    #[error("Request failed for {url}: {message}")]
    Request { url: String, message: String },
}

impl FetchError {
    /// Returns true if another attempt may succeed (timeouts and 5xx responses)
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Timeout { .. } => true,
            Self::Status { status, .. } => *status >= 500,
            _ => false,
        }
    }

    fn from_reqwest(url: &Url, e: reqwest::Error) -> Self {
        let url = url.to_string();
        if e.is_timeout() {
            Self::Timeout { url }
        } else if e.is_connect() {
            Self::Connect {
                url,
                message: e.to_string(),
            }
        } else if e.is_body() || e.is_decode() {
            Self::Body {
                url,
                message: e.to_string(),
            }
        } else {
            Self::Request {
                url,
                message: e.to_string(),
            }
        }
    }
}

/// Builds an HTTP client with proper configuration
///
/// # Arguments
///
/// * `config` - The full configuration (user agent and timeouts)
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Failed to build client
///
/// # Example
///
/// ```no_run
/// use sumi_mirror::config::Config;
/// use sumi_mirror::crawler::build_http_client;
///
/// let client = build_http_client(&Config::default()).unwrap();
/// ```
pub fn build_http_client(config: &Config) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(config.user_agent.header_value())
        .timeout(Duration::from_millis(config.crawler.request_timeout_ms))
        .connect_timeout(Duration::from_millis(config.crawler.connect_timeout_ms))
        .redirect(Policy::limited(MAX_REDIRECTS))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Fetches URLs with bounded per-fetch retries
#[derive(Debug, Clone)]
pub struct Fetcher {
    client: Client,
    max_retries: u32,
    retry_delay: Duration,
}

impl Fetcher {
    pub fn new(client: Client, crawler: &CrawlerConfig) -> Self {
        Self {
            client,
            max_retries: crawler.max_retries,
            retry_delay: Duration::from_millis(crawler.retry_delay_ms),
        }
    }

    /// Builds the client from the configuration and wraps it
    pub fn from_config(config: &Config) -> Result<Self, reqwest::Error> {
        Ok(Self::new(build_http_client(config)?, &config.crawler))
    }

    /// Fetches a URL and classifies the payload
    ///
    /// # Retry Logic
    ///
    /// | Condition | Action |
    /// |-----------|--------|
    /// | HTTP 2xx | Success |
    /// | HTTP 5xx | Retry up to `max-retries` times |
    /// | Timeout | Retry up to `max-retries` times |
    /// | Other HTTP status | Immediate failure |
    /// | Connection error | Immediate failure |
    ///
    /// # Arguments
    ///
    /// * `url` - The URL to fetch
    ///
    /// # Returns
    ///
    /// The fetched resource, or the error of the last attempt
    pub async fn fetch(&self, url: &Url) -> Result<FetchedResource, FetchError> {
        let mut attempt = 0;
        loop {
            match self.fetch_once(url).await {
                Ok(resource) => return Ok(resource),
                Err(e) if e.is_retryable() && attempt < self.max_retries => {
                    attempt += 1;
                    debug!(
                        "Retrying {} ({}/{}) after: {}",
                        url, attempt, self.max_retries, e
                    );
                    tokio::time::sleep(self.retry_delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn fetch_once(&self, url: &Url) -> Result<FetchedResource, FetchError> {
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| FetchError::from_reqwest(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let final_url = response.url().clone();
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_ascii_lowercase();

        let bytes = response
            .bytes()
            .await
            .map_err(|e| FetchError::from_reqwest(url, e))?
            .to_vec();

        let class = Classification::from_content_type(&content_type, &final_url);

        Ok(FetchedResource {
            final_url,
            status_code: status.as_u16(),
            content_type,
            bytes,
            class,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn fetcher(max_retries: u32, timeout_ms: u64) -> Fetcher {
        let mut config = Config::default();
        config.crawler.max_retries = max_retries;
        config.crawler.retry_delay_ms = 10;
        config.crawler.request_timeout_ms = timeout_ms;
        Fetcher::from_config(&config).unwrap()
    }

    fn url(server: &MockServer, p: &str) -> Url {
        Url::parse(&format!("{}{}", server.uri(), p)).unwrap()
    }

    #[test]
    fn test_build_http_client() {
        assert!(build_http_client(&Config::default()).is_ok());
    }

    #[test]
    fn test_retryable_errors() {
        let url = "https://example.test/".to_string();
        assert!(FetchError::Timeout { url: url.clone() }.is_retryable());
        assert!(FetchError::Status { url: url.clone(), status: 503 }.is_retryable());
        assert!(!FetchError::Status { url: url.clone(), status: 404 }.is_retryable());
        assert!(!FetchError::Connect {
            url,
            message: "refused".to_string()
        }
        .is_retryable());
    }

    #[tokio::test]
    async fn test_fetch_classifies_payload() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/site.css"))
            .respond_with(
                ResponseTemplate::new(200).set_body_raw("body { color: red }", "text/css"),
            )
            .mount(&server)
            .await;

        let resource = fetcher(0, 5_000)
            .fetch(&url(&server, "/site.css"))
            .await
            .unwrap();

        assert_eq!(resource.status_code, 200);
        assert_eq!(resource.class, Classification::Css);
        assert_eq!(resource.bytes, b"body { color: red }".to_vec());
        assert!(resource.content_type.starts_with("text/css"));
    }

    #[tokio::test]
    async fn test_fetch_reports_http_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/missing"))
            .respond_with(ResponseTemplate::new(404))
            .expect(1)
            .mount(&server)
            .await;

        let err = fetcher(3, 5_000)
            .fetch(&url(&server, "/missing"))
            .await
            .unwrap_err();

        assert!(matches!(err, FetchError::Status { status: 404, .. }));
    }

    #[tokio::test]
    async fn test_fetch_retries_server_errors() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/flaky"))
            .respond_with(ResponseTemplate::new(503))
            .expect(3)
            .mount(&server)
            .await;

        let err = fetcher(2, 5_000)
            .fetch(&url(&server, "/flaky"))
            .await
            .unwrap_err();

        assert!(matches!(err, FetchError::Status { status: 503, .. }));
    }

    #[tokio::test]
    async fn test_fetch_times_out() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/slow"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(3)))
            .mount(&server)
            .await;

        let err = fetcher(0, 200)
            .fetch(&url(&server, "/slow"))
            .await
            .unwrap_err();

        assert!(matches!(err, FetchError::Timeout { .. }));
    }
}
