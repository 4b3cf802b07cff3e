//! Upstream HTTP source.
//!
//! Downloads the registry listing from a fixed URL.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};
use url::Url;

use ouilookup_core::constants::{DEFAULT_FETCH_TIMEOUT_SECONDS, DEFAULT_UPSTREAM_URL};
use ouilookup_core::error::{OuiError, Result};
use ouilookup_core::traits::DatasetSource;

/// HTTP source configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct HttpSourceConfig {
    /// Registry listing URL
    pub url: String,
    /// Request timeout in seconds
    pub timeout_seconds: u64,
}

impl Default for HttpSourceConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_UPSTREAM_URL.into(),
            timeout_seconds: DEFAULT_FETCH_TIMEOUT_SECONDS,
        }
    }
}

impl HttpSourceConfig {
    /// Creates config for the given URL with the default timeout.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }
}

/// Fetches the registry from a fixed HTTP endpoint.
pub struct HttpSource {
    url: Url,
    http_client: reqwest::Client,
}

impl HttpSource {
    /// Creates a source for the given URL.
    pub fn new(url: impl Into<String>) -> Result<Self> {
        Self::with_config(HttpSourceConfig::new(url))
    }

    /// Creates a source with custom configuration.
    pub fn with_config(config: HttpSourceConfig) -> Result<Self> {
        let url = Url::parse(&config.url)
            .map_err(|e| OuiError::Config(format!("invalid upstream URL '{}': {}", config.url, e)))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(OuiError::Config(format!(
                "upstream URL must be http or https, got '{}'",
                url.scheme()
            )));
        }

        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| OuiError::Config(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self { url, http_client })
    }

    /// The configured endpoint.
    pub fn url(&self) -> &Url {
        &self.url
    }
}

#[async_trait]
impl DatasetSource for HttpSource {
    #[instrument(skip(self), fields(url = %self.url))]
    async fn fetch(&self) -> Result<Bytes> {
        let response = self
            .http_client
            .get(self.url.clone())
            .send()
            .await
            .map_err(|e| OuiError::SourceUnavailable(e.to_string()))?;

        if !response.status().is_success() {
            return Err(OuiError::SourceUnavailable(format!(
                "{} returned HTTP {}",
                self.url,
                response.status()
            )));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| OuiError::SourceUnavailable(e.to_string()))?;

        debug!(bytes = body.len(), "Downloaded registry");
        Ok(body)
    }

    fn describe(&self) -> String {
        self.url.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_rejects_invalid_url() {
        assert!(matches!(HttpSource::new("not a url"), Err(OuiError::Config(_))));
        assert!(matches!(HttpSource::new("ftp://example.com/oui.txt"), Err(OuiError::Config(_))));
    }

    #[test]
    fn test_default_config() {
        let config = HttpSourceConfig::default();
        assert_eq!(config.url, DEFAULT_UPSTREAM_URL);
        assert_eq!(config.timeout_seconds, 30);
    }

    #[tokio::test]
    async fn test_fetch_success() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/oui.txt"))
            .respond_with(ResponseTemplate::new(200).set_body_string("AB-CD-EF   (hex)\t\tAcme\n"))
            .expect(1)
            .mount(&server)
            .await;

        let source = HttpSource::new(format!("{}/oui.txt", server.uri())).unwrap();
        let body = source.fetch().await.unwrap();
        assert!(body.starts_with(b"AB-CD-EF"));
    }

    #[tokio::test]
    async fn test_fetch_http_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let source = HttpSource::new(format!("{}/oui.txt", server.uri())).unwrap();
        match source.fetch().await {
            Err(OuiError::SourceUnavailable(msg)) => assert!(msg.contains("503")),
            other => panic!("expected SourceUnavailable, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_fetch_times_out() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(3)))
            .mount(&server)
            .await;

        let source = HttpSource::with_config(HttpSourceConfig {
            url: format!("{}/oui.txt", server.uri()),
            timeout_seconds: 1,
        })
        .unwrap();
        assert!(matches!(source.fetch().await, Err(OuiError::SourceUnavailable(_))));
    }
}
