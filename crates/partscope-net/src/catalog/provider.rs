//! Catalog providers.
//!
//! A [`RecordProvider`] is the external collaborator the remote data cache
//! delegates to. [`HttpRecordProvider`] talks to the catalog REST service.

use std::future::Future;
use std::time::Duration;

use partscope_core::logging::targets;
use partscope_core::{Category, Record, Relationship, Supplier};
use serde::de::DeserializeOwned;
use serde_json::Value;

use super::error::{CatalogError, CatalogResult};
use super::payload::{
    CATEGORY_FIELDS, Page, RECORD_FIELDS, RELATIONSHIP_FIELDS, SUPPLIER_FIELDS, normalize,
};
use super::query::RecordQuery;
use crate::http::HttpClient;

/// Source of catalog data.
///
/// Only the record listing is required; the secondary lists default to
/// empty.
pub trait RecordProvider: Send + Sync + 'static {
    /// Fetch the records matching `query`, in display order.
    fn fetch_records(
        &self,
        query: &RecordQuery,
    ) -> impl Future<Output = CatalogResult<Vec<Record>>> + Send;

    /// Fetch the category list.
    fn fetch_categories(&self) -> impl Future<Output = CatalogResult<Vec<Category>>> + Send {
        async { Ok(Vec::new()) }
    }

    /// Fetch the supplier list.
    fn fetch_suppliers(&self) -> impl Future<Output = CatalogResult<Vec<Supplier>>> + Send {
        async { Ok(Vec::new()) }
    }

    /// Fetch the supply-chain relationships.
    fn fetch_relationships(
        &self,
    ) -> impl Future<Output = CatalogResult<Vec<Relationship>>> + Send {
        async { Ok(Vec::new()) }
    }
}

/// Endpoint layout and limits of the catalog REST service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderConfig {
    /// Base URL of the service; required.
    pub base_url: Option<String>,
    /// Per-request timeout.
    pub timeout: Duration,
    /// Bearer token sent with every request.
    pub bearer_token: Option<String>,
    /// Full listing endpoint.
    pub records_path: String,
    /// Server-side search endpoint.
    pub search_path: String,
    /// Category list endpoint.
    pub categories_path: String,
    /// Supplier list endpoint.
    pub suppliers_path: String,
    /// Relationship list endpoint.
    pub relationships_path: String,
    /// Page size requested from the listing endpoint.
    pub page_size: u32,
    /// Upper bound on pages followed for one listing.
    pub max_pages: u32,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            timeout: Duration::from_secs(30),
            bearer_token: None,
            records_path: "/components".to_string(),
            search_path: "/components/search".to_string(),
            categories_path: "/categories".to_string(),
            suppliers_path: "/suppliers".to_string(),
            relationships_path: "/relationships".to_string(),
            page_size: 200,
            max_pages: 50,
        }
    }
}

impl ProviderConfig {
    /// Configuration pointing at `base_url` with default endpoints.
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            base_url: Some(base_url.into()),
            ..Self::default()
        }
    }
}

/// [`RecordProvider`] backed by the catalog REST service.
#[derive(Debug, Clone)]
pub struct HttpRecordProvider {
    client: HttpClient,
    config: ProviderConfig,
}

impl HttpRecordProvider {
    /// Build a provider from `config`.
    ///
    /// Fails with [`CatalogError::ConfigurationMissing`] when no base URL is
    /// configured or the URL does not parse.
    pub fn new(config: ProviderConfig) -> CatalogResult<Self> {
        let base_url = config
            .base_url
            .as_deref()
            .map(str::trim)
            .filter(|url| !url.is_empty())
            .ok_or_else(|| CatalogError::not_configured("no catalog service URL configured"))?;

        let mut builder = HttpClient::builder(base_url).timeout(config.timeout);
        if let Some(token) = &config.bearer_token {
            builder = builder.bearer_auth(token.clone());
        }
        let client = builder.build()?;

        tracing::debug!(target: targets::CATALOG, base_url = client.base_url(), "catalog provider ready");
        Ok(Self { client, config })
    }

    /// Wrap an already configured HTTP client.
    pub fn with_client(client: HttpClient, config: ProviderConfig) -> Self {
        Self { client, config }
    }

    /// The provider configuration.
    pub fn config(&self) -> &ProviderConfig {
        &self.config
    }

    async fn get_page<T: DeserializeOwned>(
        &self,
        path: &str,
        fields: &[&str],
        query: Vec<(String, String)>,
    ) -> CatalogResult<Page<T>> {
        let response = self.client.get(path).query_pairs(query).send().await?;
        let status = response.status();
        let body: Value = response.error_for_status_with_body().await?.json().await?;
        normalize(body, fields, status)
    }

    async fn get_list<T: DeserializeOwned>(
        &self,
        path: &str,
        fields: &[&str],
    ) -> CatalogResult<Vec<T>> {
        Ok(self.get_page(path, fields, Vec::new()).await?.items)
    }

    /// Fetch the full listing, following pagination.
    async fn fetch_all_pages(&self) -> CatalogResult<Vec<Record>> {
        let path = &self.config.records_path;
        let mut records = Vec::new();
        let mut page = 1u32;

        loop {
            let query = vec![
                ("page".to_string(), page.to_string()),
                ("limit".to_string(), self.config.page_size.to_string()),
            ];
            let Page { items, pagination } = self.get_page(path, RECORD_FIELDS, query).await?;
            records.extend(items);

            match pagination {
                Some(p) if p.has_next() => {
                    if page >= self.config.max_pages {
                        tracing::warn!(
                            target: targets::CATALOG,
                            pages = p.pages,
                            max_pages = self.config.max_pages,
                            "listing truncated at page limit"
                        );
                        break;
                    }
                    page += 1;
                }
                _ => break,
            }
        }

        Ok(records)
    }
}

impl RecordProvider for HttpRecordProvider {
    async fn fetch_records(&self, query: &RecordQuery) -> CatalogResult<Vec<Record>> {
        let records = if query.is_all() {
            self.fetch_all_pages().await?
        } else {
            self.get_page(&self.config.search_path, RECORD_FIELDS, query.to_query_pairs())
                .await?
                .items
        };
        tracing::info!(target: targets::CATALOG, %query, count = records.len(), "records fetched");
        Ok(records)
    }

    async fn fetch_categories(&self) -> CatalogResult<Vec<Category>> {
        self.get_list(&self.config.categories_path, CATEGORY_FIELDS).await
    }

    async fn fetch_suppliers(&self) -> CatalogResult<Vec<Supplier>> {
        self.get_list(&self.config.suppliers_path, SUPPLIER_FIELDS).await
    }

    async fn fetch_relationships(&self) -> CatalogResult<Vec<Relationship>> {
        self.get_list(&self.config.relationships_path, RELATIONSHIP_FIELDS)
            .await
    }
}

static_assertions::assert_impl_all!(HttpRecordProvider: Send, Sync);
