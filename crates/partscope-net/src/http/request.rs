//! HTTP request types and builder.

use partscope_core::logging::targets;

use super::client::HttpClient;
use super::response::HttpResponse;
use crate::error::Result;

/// A built GET request ready to be sent.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HttpRequest {
    /// The request URL, without query parameters.
    pub url: String,
    /// Query parameters in the order they were added.
    pub query: Vec<(String, String)>,
}

impl HttpRequest {
    /// The full URL including query parameters.
    pub fn full_url(&self) -> Result<url::Url> {
        let mut url = url::Url::parse(&self.url)?;
        if !self.query.is_empty() {
            url.query_pairs_mut().extend_pairs(&self.query);
        }
        Ok(url)
    }

    /// Send this request through `client`.
    pub(crate) async fn execute(self, client: &HttpClient) -> Result<HttpResponse> {
        let url = self.full_url()?;
        tracing::trace!(target: targets::HTTP, %url, "sending request");

        let response = client.reqwest_client().get(url).send().await?;
        tracing::trace!(target: targets::HTTP, status = response.status().as_u16(), "response received");
        Ok(HttpResponse::from_reqwest(response))
    }
}

/// Builder for constructing GET requests.
pub struct HttpRequestBuilder {
    client: HttpClient,
    request: HttpRequest,
}

impl HttpRequestBuilder {
    pub(crate) fn new(client: HttpClient, url: String) -> Self {
        Self {
            client,
            request: HttpRequest {
                url,
                query: Vec::new(),
            },
        }
    }

    /// Add a query parameter.
    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.request.query.push((key.into(), value.into()));
        self
    }

    /// Add multiple query parameters.
    pub fn query_pairs(mut self, pairs: impl IntoIterator<Item = (String, String)>) -> Self {
        self.request.query.extend(pairs);
        self
    }

    /// Build the request without sending it.
    pub fn build(self) -> HttpRequest {
        self.request
    }

    /// Send the request and wait for the response.
    pub async fn send(self) -> Result<HttpResponse> {
        self.request.execute(&self.client).await
    }
}
