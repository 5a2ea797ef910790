//! HTTP access to the catalog service.
//!
//! A thin layer over `reqwest` used by the catalog provider. Every request is
//! a `GET` against a path below one base URL, carrying the same `Accept` and
//! `Authorization` headers.
//!
//! # Example
//!
//! ```ignore
//! use partscope_net::http::HttpClient;
//!
//! let client = HttpClient::builder("https://catalog.example.com/api")
//!     .bearer_auth("token")
//!     .build()?;
//!
//! let response = client.get("/components").query("page", "2").send().await?;
//! let body: serde_json::Value = response.error_for_status_with_body().await?.json().await?;
//! ```

mod client;
mod request;
mod response;

pub use client::{HttpClient, HttpClientBuilder, HttpClientConfig};
pub use request::{HttpRequest, HttpRequestBuilder};
pub use response::HttpResponse;
