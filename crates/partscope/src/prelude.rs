//! Prelude module for Partscope.
//!
//! This module re-exports the most commonly used types for convenient importing:
//!
//! ```ignore
//! use partscope::prelude::*;
//! ```

// ============================================================================
// Engine
// ============================================================================

pub use crate::config::EngineConfig;
pub use crate::engine::{CatalogEngine, LoadState};

// ============================================================================
// Signal/Slot and Property System
// ============================================================================

pub use partscope_core::{ConnectionGuard, ConnectionId, Property, Signal};

// ============================================================================
// Records
// ============================================================================

pub use partscope_core::{Record, RecordId, RecordSet};

// ============================================================================
// Views
// ============================================================================

pub use crate::view::{
    FilterPipeline, ScrollHost, SelectionSource, SelectionStore, VirtualList, VisibleWindow,
    WindowParams, compute_window,
};

// ============================================================================
// Data Access
// ============================================================================

pub use partscope_net::catalog::{CatalogCache, CatalogError, RecordProvider, RecordQuery};
