//! Partscope - a client-side catalog engine.
//!
//! This is the main umbrella crate that re-exports all public APIs.
//!
//! # Example
//!
//! ```no_run
//! use partscope::{CatalogEngine, EngineConfig};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let config = EngineConfig::load("partscope.toml")?.with_env_overrides();
//! let engine = CatalogEngine::from_config(&config)?;
//!
//! engine.fetch_all().await?;
//! engine.set_search_term("brake");
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod engine;
pub mod prelude;
pub mod view;

pub use partscope_core::*;

pub use config::{ConfigError, EngineConfig};
pub use engine::{CatalogEngine, LoadState};

/// Catalog data access and HTTP plumbing.
pub mod net {
    pub use partscope_net::*;
}
