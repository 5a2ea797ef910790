//! HTTP client implementation.

use std::sync::Arc;
use std::time::Duration;

use http::header::{ACCEPT, AUTHORIZATION, HeaderMap, HeaderValue};

use super::request::HttpRequestBuilder;
use crate::error::Result;

/// Configuration for the HTTP client.
#[derive(Clone, Debug)]
pub struct HttpClientConfig {
    /// Base URL every request path is appended to, without a trailing slash.
    pub base_url: String,
    /// Request timeout.
    pub timeout: Option<Duration>,
    /// Connect timeout.
    pub connect_timeout: Option<Duration>,
    /// User agent sent with every request.
    pub user_agent: Option<String>,
}

/// Builder for creating an HTTP client with custom configuration.
pub struct HttpClientBuilder {
    config: HttpClientConfig,
    bearer_token: Option<String>,
}

impl HttpClientBuilder {
    /// Create a new builder for the service at `base_url`.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            config: HttpClientConfig {
                base_url: base_url.into(),
                timeout: Some(Duration::from_secs(30)),
                connect_timeout: Some(Duration::from_secs(10)),
                user_agent: Some(format!("Partscope/{} (Rust)", env!("CARGO_PKG_VERSION"))),
            },
            bearer_token: None,
        }
    }

    /// Set the request timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = Some(timeout);
        self
    }

    /// Disable request timeout.
    pub fn no_timeout(mut self) -> Self {
        self.config.timeout = None;
        self
    }

    /// Set the connect timeout.
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.config.connect_timeout = Some(timeout);
        self
    }

    /// Set the user agent string.
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.config.user_agent = Some(user_agent.into());
        self
    }

    /// Send `Authorization: Bearer <token>` with every request.
    pub fn bearer_auth(mut self, token: impl Into<String>) -> Self {
        self.bearer_token = Some(token.into());
        self
    }

    /// Build the HTTP client.
    ///
    /// Fails with [`NetworkError::InvalidUrl`](crate::NetworkError::InvalidUrl)
    /// when the base URL does not parse and with
    /// [`NetworkError::InvalidHeader`](crate::NetworkError::InvalidHeader) when
    /// the token cannot be sent as a header value.
    pub fn build(mut self) -> Result<HttpClient> {
        let base_url = self.config.base_url.trim().trim_end_matches('/').to_string();
        url::Url::parse(&base_url)?;
        self.config.base_url = base_url;

        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        if let Some(token) = &self.bearer_token {
            let mut value = HeaderValue::from_str(&format!("Bearer {token}"))?;
            value.set_sensitive(true);
            headers.insert(AUTHORIZATION, value);
        }

        let mut builder = reqwest::Client::builder().default_headers(headers);
        if let Some(timeout) = self.config.timeout {
            builder = builder.timeout(timeout);
        }
        if let Some(connect_timeout) = self.config.connect_timeout {
            builder = builder.connect_timeout(connect_timeout);
        }
        if let Some(ref ua) = self.config.user_agent {
            builder = builder.user_agent(ua);
        }

        let client = builder.build()?;

        Ok(HttpClient {
            inner: Arc::new(HttpClientInner {
                client,
                config: self.config,
                has_auth: self.bearer_token.is_some(),
            }),
        })
    }
}

/// Internal state for the HTTP client.
struct HttpClientInner {
    client: reqwest::Client,
    config: HttpClientConfig,
    has_auth: bool,
}

/// An HTTP client bound to the catalog service's base URL.
///
/// The client is cheaply cloneable and thread-safe. Clones share the same
/// underlying connection pool and configuration.
#[derive(Clone)]
pub struct HttpClient {
    inner: Arc<HttpClientInner>,
}

impl HttpClient {
    /// Create a client for `base_url` with default configuration.
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        HttpClientBuilder::new(base_url).build()
    }

    /// Create a builder for a client of the service at `base_url`.
    pub fn builder(base_url: impl Into<String>) -> HttpClientBuilder {
        HttpClientBuilder::new(base_url)
    }

    /// Get the client's configuration.
    pub fn config(&self) -> &HttpClientConfig {
        &self.inner.config
    }

    /// Get the base URL.
    pub fn base_url(&self) -> &str {
        &self.inner.config.base_url
    }

    /// Whether requests carry a bearer token.
    pub fn has_auth(&self) -> bool {
        self.inner.has_auth
    }

    /// Create a GET request builder for `path` below the base URL.
    pub fn get(&self, path: &str) -> HttpRequestBuilder {
        let path = path.trim_start_matches('/');
        let url = format!("{}/{}", self.inner.config.base_url, path);
        HttpRequestBuilder::new(self.clone(), url)
    }

    /// Get a reference to the underlying reqwest client.
    pub(crate) fn reqwest_client(&self) -> &reqwest::Client {
        &self.inner.client
    }
}

impl std::fmt::Debug for HttpClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpClient")
            .field("config", &self.inner.config)
            .field("has_auth", &self.inner.has_auth)
            .finish()
    }
}
