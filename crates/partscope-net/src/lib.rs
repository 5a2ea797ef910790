//! Networking module for Partscope.
//!
//! This crate provides the data access side of the catalog engine:
//!
//! - **HTTP Client**: a `reqwest`-based GET client bound to the catalog
//!   service's base URL
//! - **Catalog Provider**: fetches records, categories, suppliers and
//!   relationships, normalizing every response shape to typed lists
//! - **Remote Data Cache**: time-to-live memoization with request coalescing
//!
//! # HTTP Client
//!
//! ```ignore
//! use partscope_net::http::HttpClient;
//!
//! let client = HttpClient::builder("https://catalog.example.com/api")
//!     .bearer_auth("token")
//!     .build()?;
//!
//! let response = client.get("/categories").send().await?;
//! let body: serde_json::Value = response.error_for_status_with_body().await?.json().await?;
//! ```
//!
//! # Remote Data Cache
//!
//! ```ignore
//! use partscope_net::catalog::{CatalogCache, HttpRecordProvider, ProviderConfig};
//!
//! let cache = CatalogCache::new(HttpRecordProvider::new(ProviderConfig::with_base_url(url))?);
//! let records = cache.fetch_all().await?;
//! ```

pub mod catalog;
mod error;
pub mod http;

pub use error::{NetworkError, Result};

pub use catalog::{
    CacheKey, CacheStats, CatalogCache, CatalogError, CatalogResult, HttpRecordProvider,
    ProviderConfig, RecordProvider, RecordQuery, TtlCache,
};
pub use http::{
    HttpClient, HttpClientBuilder, HttpClientConfig, HttpRequest, HttpRequestBuilder, HttpResponse,
};
