//! View-side state: list windowing, search filtering and selection.

mod filter;
mod selection;
mod window;

pub use filter::{DEFAULT_DEBOUNCE, FilterPipeline, filter_records, matches};
pub use selection::{
    HighlightKey, RECORD_KIND, ScrollSync, SelectionChange, SelectionSource, SelectionState,
    SelectionStore, Subscription,
};
pub use window::{
    DEFAULT_OVERSCAN, ScrollHost, VirtualList, VisibleWindow, WindowError, WindowParams,
    compute_window,
};
