//! Logging and performance tracing for Partscope.
//!
//! Partscope uses the `tracing` crate for instrumentation. Nothing is printed
//! unless the host application installs a subscriber:
//!
//! ```ignore
//! tracing_subscriber::fmt()
//!     .with_env_filter("partscope::filter=debug,partscope_net::catalog=trace")
//!     .init();
//! ```
//!
//! Every event is emitted with one of the [`targets`] below so a subsystem can
//! be enabled on its own.

/// Target names for log filtering.
///
/// Use these with `tracing` directives to filter logs by subsystem.
pub mod targets {
    /// Core crate target.
    pub const CORE: &str = "partscope_core";
    /// Signal emission.
    pub const SIGNAL: &str = "partscope_core::signal";
    /// Single-shot timers.
    pub const TIMER: &str = "partscope_core::timer";
    /// Raw HTTP traffic.
    pub const HTTP: &str = "partscope_net::http";
    /// Catalog provider and remote data cache.
    pub const CATALOG: &str = "partscope_net::catalog";
    /// Window calculation and the virtual list host.
    pub const WINDOW: &str = "partscope::window";
    /// Debounced filter pipeline.
    pub const FILTER: &str = "partscope::filter";
    /// Selection synchronizer.
    pub const SELECTION: &str = "partscope::selection";
    /// Engine orchestration.
    pub const ENGINE: &str = "partscope::engine";
    /// Performance spans.
    pub const PERF: &str = "partscope::perf";
}

/// Span names used for performance tracing.
pub mod span_names {
    /// Remote fetch of the primary record listing.
    pub const FETCH: &str = "partscope::fetch";
    /// Replacement of the current record set.
    pub const REPLACE_RECORDS: &str = "partscope::replace_records";
    /// Filter recomputation span.
    pub const RECOMPUTE: &str = "partscope::recompute";
}

/// A guard that keeps a tracing span entered until dropped.
///
/// Useful for timing a synchronous operation such as a filter pass.
#[derive(Debug)]
pub struct PerfSpan {
    #[allow(dead_code)]
    span: tracing::span::EnteredSpan,
}

impl PerfSpan {
    /// Enter a new performance span for `operation`.
    pub fn new(operation: &'static str) -> Self {
        let span = tracing::info_span!(target: targets::PERF, "perf", operation);
        Self {
            span: span.entered(),
        }
    }
}
