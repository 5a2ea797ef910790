//! Catalog data access.
//!
//! - [`RecordProvider`]: the source of records, categories, suppliers and
//!   relationships. [`HttpRecordProvider`] implements it over REST.
//! - [`CatalogCache`]: the remote data cache with a time-to-live and request
//!   coalescing.
//! - [`CatalogError`]: the error taxonomy surfaced to callers.
//!
//! # Example
//!
//! ```ignore
//! use partscope_net::catalog::{CatalogCache, HttpRecordProvider, ProviderConfig};
//!
//! let provider = HttpRecordProvider::new(ProviderConfig::with_base_url("https://catalog.example.com/api"))?;
//! let cache = CatalogCache::new(provider);
//!
//! let records = cache.fetch_all().await?;   // network
//! let again = cache.fetch_all().await?;     // memory, within five minutes
//! assert!(records.ptr_eq(&again));
//! ```

mod cache;
mod error;
pub mod payload;
mod provider;
mod query;

pub use cache::{CacheStats, CatalogCache, DEFAULT_TTL, TtlCache};
pub use error::{CatalogError, CatalogResult};
pub use provider::{HttpRecordProvider, ProviderConfig, RecordProvider};
pub use query::{CacheKey, RecordQuery};
