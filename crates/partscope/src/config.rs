//! Engine configuration.
//!
//! Configuration is read from TOML. Every field has a default, so an empty
//! file is a valid configuration (one that cannot reach a catalog service
//! until `api.base_url` is set).
//!
//! ```toml
//! [api]
//! base_url = "https://catalog.example.com/api"
//! timeout_secs = 30
//!
//! [cache]
//! ttl_secs = 300
//!
//! [list]
//! item_height = 48.0
//! viewport_height = 400.0
//! overscan = 5
//!
//! [search]
//! debounce_ms = 200
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use partscope_core::logging::targets;
use partscope_net::{CatalogError, ProviderConfig};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::view::{DEFAULT_OVERSCAN, WindowError, WindowParams};

/// Environment variable that overrides `api.base_url`.
pub const API_URL_ENV: &str = "PARTSCOPE_API_URL";

/// Errors raised while loading or saving configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file could not be read or written.
    #[error("failed to access config file {path}: {source}")]
    Io {
        /// File involved.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// The file is not valid TOML or does not fit the schema.
    #[error("invalid configuration: {0}")]
    Parse(#[from] toml::de::Error),
    /// The configuration could not be serialized.
    #[error("failed to serialize configuration: {0}")]
    Serialize(#[from] toml::ser::Error),
    /// The list geometry is unusable.
    #[error("invalid list geometry: {0}")]
    Geometry(#[from] WindowError),
    /// The catalog provider could not be built from the `api` section.
    #[error(transparent)]
    Catalog(#[from] CatalogError),
}

/// Catalog service endpoint settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Base URL of the catalog service.
    pub base_url: Option<String>,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
    /// Bearer token sent with every request.
    pub bearer_token: Option<String>,
    /// Path of the full record listing.
    pub records_path: String,
    /// Path of the server-side record search.
    pub search_path: String,
    /// Path of the category lookup.
    pub categories_path: String,
    /// Path of the supplier lookup.
    pub suppliers_path: String,
    /// Path of the relationship index.
    pub relationships_path: String,
    /// Records requested per page.
    pub page_size: u32,
    /// Upper bound on pages followed for one listing.
    pub max_pages: u32,
}

impl Default for ApiConfig {
    fn default() -> Self {
        let provider = ProviderConfig::default();
        Self {
            base_url: provider.base_url,
            timeout_secs: provider.timeout.as_secs(),
            bearer_token: provider.bearer_token,
            records_path: provider.records_path,
            search_path: provider.search_path,
            categories_path: provider.categories_path,
            suppliers_path: provider.suppliers_path,
            relationships_path: provider.relationships_path,
            page_size: provider.page_size,
            max_pages: provider.max_pages,
        }
    }
}

impl ApiConfig {
    /// Provider settings for these endpoints.
    pub fn provider_config(&self) -> ProviderConfig {
        ProviderConfig {
            base_url: self.base_url.clone(),
            timeout: Duration::from_secs(self.timeout_secs),
            bearer_token: self.bearer_token.clone(),
            records_path: self.records_path.clone(),
            search_path: self.search_path.clone(),
            categories_path: self.categories_path.clone(),
            suppliers_path: self.suppliers_path.clone(),
            relationships_path: self.relationships_path.clone(),
            page_size: self.page_size,
            max_pages: self.max_pages,
        }
    }
}

/// Remote data cache settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Time-to-live of cached responses in seconds.
    pub ttl_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_secs: partscope_net::catalog::DEFAULT_TTL.as_secs(),
        }
    }
}

impl CacheConfig {
    /// The time-to-live.
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}

/// Virtual list geometry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ListConfig {
    /// Row height in pixels.
    pub item_height: f64,
    /// Viewport height in pixels.
    pub viewport_height: f64,
    /// Extra rows rendered on each side of the viewport.
    pub overscan: usize,
}

impl Default for ListConfig {
    fn default() -> Self {
        Self {
            item_height: 48.0,
            viewport_height: 400.0,
            overscan: DEFAULT_OVERSCAN,
        }
    }
}

/// Search field settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Debounce delay in milliseconds. 200 for general search fields, 300 in
    /// the slower profile.
    pub debounce_ms: u64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self { debounce_ms: 200 }
    }
}

impl SearchConfig {
    /// The debounce delay.
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

/// Complete engine configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Catalog service endpoints (`[api]`).
    pub api: ApiConfig,
    /// Remote data cache (`[cache]`).
    pub cache: CacheConfig,
    /// Virtual list geometry (`[list]`).
    pub list: ListConfig,
    /// Search field debounce (`[search]`).
    pub search: SearchConfig,
}

impl EngineConfig {
    /// Parse a TOML document.
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml_str(&source)?;
        tracing::debug!(target: targets::ENGINE, path = %path.display(), "configuration loaded");
        Ok(config)
    }

    /// Render as TOML.
    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Write as TOML.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        std::fs::write(path, self.to_toml_string()?).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Check that the list geometry is usable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        WindowParams::new(
            0,
            self.list.item_height,
            self.list.viewport_height,
            0.0,
            self.list.overscan,
        )?;
        Ok(())
    }

    /// Apply overrides from the process environment (`PARTSCOPE_API_URL`).
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides_from(|key| std::env::var(key).ok())
    }

    /// Apply overrides from `lookup`, which maps a variable name to its value.
    pub fn with_overrides_from(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(url) = lookup(API_URL_ENV).filter(|url| !url.trim().is_empty()) {
            tracing::debug!(target: targets::ENGINE, %url, "catalog URL taken from environment");
            self.api.base_url = Some(url);
        }
        self
    }

    /// Provider settings for the configured service.
    pub fn provider_config(&self) -> ProviderConfig {
        self.api.provider_config()
    }
}
