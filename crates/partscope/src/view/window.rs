//! Virtualized list windowing.
//!
//! [`compute_window`] maps a scroll position to the contiguous range of rows
//! that must be materialized. It is a pure O(1) function and may be called on
//! every scroll event.
//!
//! The lower bound is floored and the upper bound ceiled, then both are
//! widened by the overscan count, so boundaries always over-render rather
//! than leave a gap during fast scrolling.
//!
//! [`VirtualList`] is the host container: it owns the scroll position and item
//! count of one list and republishes the window whenever it changes.

use std::ops::RangeInclusive;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use partscope_core::logging::targets;
use partscope_core::Signal;
use thiserror::Error;

/// Overscan used when none is configured.
pub const DEFAULT_OVERSCAN: usize = 5;

/// Precondition violations of the window calculation.
#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum WindowError {
    /// Item height was zero, negative or not finite.
    #[error("item height must be a positive finite number, got {0}")]
    InvalidItemHeight(f64),
    /// Viewport height was zero, negative or not finite.
    #[error("viewport height must be a positive finite number, got {0}")]
    InvalidViewportHeight(f64),
    /// Scroll offset was negative or not finite.
    #[error("scroll offset must be a non-negative finite number, got {0}")]
    InvalidScrollOffset(f64),
}

fn positive(value: f64) -> bool {
    value.is_finite() && value > 0.0
}

/// Validated inputs of [`compute_window`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WindowParams {
    item_count: usize,
    item_height: f64,
    viewport_height: f64,
    scroll_offset: f64,
    overscan: usize,
}

impl WindowParams {
    /// Validate and bundle window inputs.
    pub fn new(
        item_count: usize,
        item_height: f64,
        viewport_height: f64,
        scroll_offset: f64,
        overscan: usize,
    ) -> Result<Self, WindowError> {
        if !positive(item_height) {
            return Err(WindowError::InvalidItemHeight(item_height));
        }
        if !positive(viewport_height) {
            return Err(WindowError::InvalidViewportHeight(viewport_height));
        }
        if !scroll_offset.is_finite() || scroll_offset < 0.0 {
            return Err(WindowError::InvalidScrollOffset(scroll_offset));
        }
        Ok(Self {
            item_count,
            item_height,
            viewport_height,
            scroll_offset,
            overscan,
        })
    }

    /// Number of rows.
    pub fn item_count(&self) -> usize {
        self.item_count
    }

    /// Height of one row in pixels.
    pub fn item_height(&self) -> f64 {
        self.item_height
    }

    /// Height of the viewport in pixels.
    pub fn viewport_height(&self) -> f64 {
        self.viewport_height
    }

    /// Scroll offset in pixels.
    pub fn scroll_offset(&self) -> f64 {
        self.scroll_offset
    }

    /// Extra rows rendered on each side.
    pub fn overscan(&self) -> usize {
        self.overscan
    }
}

/// The rows to materialize for one scroll position.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VisibleWindow {
    bounds: Option<(usize, usize)>,
    /// Number of rows in the list.
    pub item_count: usize,
    /// Scrollable height of the whole list.
    pub total_extent: f64,
    /// Pixel offset of the first materialized row.
    pub offset: f64,
}

impl VisibleWindow {
    /// The window of an empty list.
    pub const EMPTY: Self = Self {
        bounds: None,
        item_count: 0,
        total_extent: 0.0,
        offset: 0.0,
    };

    /// Whether no rows are materialized.
    pub fn is_empty(&self) -> bool {
        self.bounds.is_none()
    }

    /// First materialized index.
    pub fn start(&self) -> Option<usize> {
        self.bounds.map(|(start, _)| start)
    }

    /// Last materialized index (inclusive).
    pub fn end(&self) -> Option<usize> {
        self.bounds.map(|(_, end)| end)
    }

    /// The materialized index range.
    pub fn range(&self) -> Option<RangeInclusive<usize>> {
        self.bounds.map(|(start, end)| start..=end)
    }

    /// Number of materialized rows.
    pub fn len(&self) -> usize {
        self.bounds.map_or(0, |(start, end)| end - start + 1)
    }

    /// Whether `index` is materialized.
    pub fn contains(&self, index: usize) -> bool {
        self.bounds
            .is_some_and(|(start, end)| (start..=end).contains(&index))
    }

    /// Iterate the materialized indices.
    pub fn indices(&self) -> impl Iterator<Item = usize> {
        self.range().into_iter().flatten()
    }
}

/// Compute the rows to materialize.
///
/// `start = max(0, floor(S / H) - O)`, `end = min(N - 1, ceil((S + V) / H) + O)`.
/// An offset past the end of the list still yields `start <= end`.
pub fn compute_window(params: &WindowParams) -> VisibleWindow {
    let count = params.item_count;
    if count == 0 {
        return VisibleWindow::EMPTY;
    }

    let height = params.item_height;
    let first_visible = (params.scroll_offset / height).floor() as usize;
    let last_visible = ((params.scroll_offset + params.viewport_height) / height).ceil() as usize;

    let end = last_visible.saturating_add(params.overscan).min(count - 1);
    let start = first_visible.saturating_sub(params.overscan).min(end);

    VisibleWindow {
        bounds: Some((start, end)),
        item_count: count,
        total_extent: count as f64 * height,
        offset: start as f64 * height,
    }
}

/// A container that can bring a row into view.
pub trait ScrollHost: Send + Sync {
    /// Scroll so that row `index` is visible.
    fn scroll_to_index(&self, index: usize);
}

#[derive(Debug)]
struct ListState {
    item_count: usize,
    item_height: f64,
    viewport_height: f64,
    overscan: usize,
    scroll_offset: f64,
    last_window: VisibleWindow,
}

impl ListState {
    fn params(&self) -> WindowParams {
        WindowParams {
            item_count: self.item_count,
            item_height: self.item_height,
            viewport_height: self.viewport_height,
            scroll_offset: self.scroll_offset,
            overscan: self.overscan,
        }
    }

    fn max_scroll_offset(&self) -> f64 {
        (self.item_count as f64 * self.item_height - self.viewport_height).max(0.0)
    }

    fn clamp_offset(&mut self) {
        self.scroll_offset = self.scroll_offset.clamp(0.0, self.max_scroll_offset());
    }

    /// Recompute the window, returning it if it differs from the last one.
    fn refresh(&mut self) -> Option<VisibleWindow> {
        let window = compute_window(&self.params());
        if window == self.last_window {
            None
        } else {
            self.last_window = window;
            Some(window)
        }
    }
}

/// Host container of a virtualized list.
///
/// # Signals
///
/// - `window_changed`: emitted with the new [`VisibleWindow`] whenever the
///   materialized range or extent changes
pub struct VirtualList {
    state: Mutex<ListState>,
    scroll_requests: AtomicU64,
    /// Emitted when the visible window changes.
    pub window_changed: Signal<VisibleWindow>,
}

impl VirtualList {
    /// Create an empty list with the given geometry.
    pub fn new(item_height: f64, viewport_height: f64, overscan: usize) -> Result<Self, WindowError> {
        let params = WindowParams::new(0, item_height, viewport_height, 0.0, overscan)?;
        Ok(Self {
            state: Mutex::new(ListState {
                item_count: 0,
                item_height: params.item_height,
                viewport_height: params.viewport_height,
                overscan: params.overscan,
                scroll_offset: 0.0,
                last_window: VisibleWindow::EMPTY,
            }),
            scroll_requests: AtomicU64::new(0),
            window_changed: Signal::new(),
        })
    }

    /// The current window.
    pub fn window(&self) -> VisibleWindow {
        compute_window(&self.state.lock().params())
    }

    /// The current window inputs.
    pub fn params(&self) -> WindowParams {
        self.state.lock().params()
    }

    /// Number of rows.
    pub fn item_count(&self) -> usize {
        self.state.lock().item_count
    }

    /// Current scroll offset in pixels.
    pub fn scroll_offset(&self) -> f64 {
        self.state.lock().scroll_offset
    }

    /// Largest valid scroll offset.
    pub fn max_scroll_offset(&self) -> f64 {
        self.state.lock().max_scroll_offset()
    }

    /// Number of programmatic scroll-to-index requests received.
    pub fn scroll_requests(&self) -> u64 {
        self.scroll_requests.load(Ordering::SeqCst)
    }

    /// Apply `update` to the state and publish the window if it changed.
    fn update(&self, update: impl FnOnce(&mut ListState)) -> VisibleWindow {
        let (window, changed) = {
            let mut state = self.state.lock();
            update(&mut state);
            state.clamp_offset();
            let changed = state.refresh();
            (state.last_window, changed)
        };
        if let Some(window) = changed {
            tracing::trace!(target: targets::WINDOW, start = ?window.start(), end = ?window.end(), "window changed");
            self.window_changed.emit(window);
        }
        window
    }

    /// Set the number of rows, e.g. after the filtered set changed.
    pub fn set_item_count(&self, item_count: usize) -> VisibleWindow {
        self.update(|state| state.item_count = item_count)
    }

    /// Set the scroll offset. Offsets outside the scrollable range are clamped.
    pub fn set_scroll_offset(&self, offset: f64) -> Result<VisibleWindow, WindowError> {
        if !offset.is_finite() {
            return Err(WindowError::InvalidScrollOffset(offset));
        }
        Ok(self.update(|state| state.scroll_offset = offset))
    }

    /// Resize the viewport.
    pub fn set_viewport_height(&self, viewport_height: f64) -> Result<VisibleWindow, WindowError> {
        if !positive(viewport_height) {
            return Err(WindowError::InvalidViewportHeight(viewport_height));
        }
        Ok(self.update(|state| state.viewport_height = viewport_height))
    }
}

impl ScrollHost for VirtualList {
    /// Bring `index` into view with the smallest scroll movement.
    fn scroll_to_index(&self, index: usize) {
        self.scroll_requests.fetch_add(1, Ordering::SeqCst);
        self.update(|state| {
            if index >= state.item_count {
                tracing::debug!(target: targets::WINDOW, index, item_count = state.item_count, "scroll target out of range");
                return;
            }
            let item_top = index as f64 * state.item_height;
            let item_bottom = item_top + state.item_height;
            let viewport_bottom = state.scroll_offset + state.viewport_height;

            if item_top < state.scroll_offset {
                state.scroll_offset = item_top;
            } else if item_bottom > viewport_bottom {
                state.scroll_offset = item_bottom - state.viewport_height;
            }
        });
    }
}

impl std::fmt::Debug for VirtualList {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VirtualList")
            .field("state", &*self.state.lock())
            .finish_non_exhaustive()
    }
}

static_assertions::assert_impl_all!(VirtualList: Send, Sync);
