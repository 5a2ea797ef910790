//! Debounced free-text filtering of a record set.
//!
//! The search term has two values: the *live* term, updated on every input
//! event, and the *settled* term, which only catches up once the live term
//! has stopped changing for one debounce interval. Only the settled term
//! drives filtering.
//!
//! Filtering is a case-insensitive substring match over a fixed set of
//! record fields (see [`Record::searchable_fields`]) and preserves the order
//! of the source set.

use std::sync::{Arc, Weak};
use std::time::Duration;

use parking_lot::Mutex;
use partscope_core::logging::{span_names, targets};
use partscope_core::{PerfSpan, Record, RecordSet, Signal, SingleShotTimer};

/// Debounce delay for general search fields.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(200);

fn normalize_term(term: &str) -> String {
    term.trim().to_lowercase()
}

fn matches_normalized(record: &Record, needle: &str) -> bool {
    needle.is_empty()
        || record
            .searchable_fields()
            .into_iter()
            .flatten()
            .any(|field| field.to_lowercase().contains(needle))
}

/// Whether `record` matches the search `term`.
///
/// An empty (or whitespace-only) term matches everything. Missing fields
/// never match.
pub fn matches(record: &Record, term: &str) -> bool {
    matches_normalized(record, &normalize_term(term))
}

/// Filter `records` by `term`, preserving order.
///
/// An empty term returns the same set (`ptr_eq` holds), so consumers that
/// compare by reference see no change.
pub fn filter_records(records: &RecordSet, term: &str) -> RecordSet {
    let needle = normalize_term(term);
    if needle.is_empty() {
        return records.clone();
    }
    records
        .iter()
        .filter(|record| matches_normalized(record, &needle))
        .cloned()
        .collect()
}

#[derive(Debug, Default)]
struct FilterState {
    records: RecordSet,
    live_term: String,
    settled_term: String,
    filtered: RecordSet,
    recompute_count: u64,
    term_generation: u64,
}

impl FilterState {
    fn recompute(&mut self) -> RecordSet {
        let _span = PerfSpan::new(span_names::RECOMPUTE);
        self.filtered = filter_records(&self.records, &self.settled_term);
        self.recompute_count += 1;
        tracing::debug!(
            target: targets::FILTER,
            term = %self.settled_term,
            total = self.records.len(),
            matched = self.filtered.len(),
            "filter recomputed"
        );
        self.filtered.clone()
    }
}

/// State shared with the pending debounce shot.
#[derive(Default)]
struct FilterShared {
    state: Mutex<FilterState>,
    filtered_changed: Signal<RecordSet>,
}

impl FilterShared {
    /// Record `term` as the live term and return its generation.
    fn set_live_term(&self, term: String) -> u64 {
        let mut state = self.state.lock();
        state.live_term = term;
        state.term_generation += 1;
        state.term_generation
    }

    /// Settle on behalf of the shot scheduled for `generation`. A newer term
    /// owns its own shot, so an older one settles nothing.
    fn settle_generation(&self, generation: u64) {
        self.settle_if(|state| state.term_generation == generation);
    }

    /// Promote the live term to the settled term and publish the result.
    fn settle(&self) {
        self.settle_if(|_| true);
    }

    fn settle_if(&self, current: impl FnOnce(&FilterState) -> bool) {
        let published = {
            let mut state = self.state.lock();
            if !current(&*state) {
                tracing::trace!(target: targets::FILTER, "superseded shot ignored");
                None
            } else if state.settled_term == state.live_term {
                None
            } else {
                state.settled_term = state.live_term.clone();
                Some(state.recompute())
            }
        };
        if let Some(filtered) = published {
            self.filtered_changed.emit(filtered);
        }
    }
}

/// Filters a record set against a debounced search term.
///
/// # Signals
///
/// - `filtered_changed`: emitted with the new filtered set after every
///   recompute
///
/// # Example
///
/// ```no_run
/// use std::time::Duration;
/// use partscope::view::FilterPipeline;
/// use partscope_core::{Record, RecordSet};
///
/// # async fn demo() {
/// let pipeline = FilterPipeline::new(Duration::from_millis(200));
/// pipeline.set_records(RecordSet::from(vec![Record::new(1, "Brake Caliper")]));
/// pipeline.set_search_term("bra");
/// pipeline.set_search_term("brake");
/// // ... 200 ms later, exactly one recompute for "brake".
/// # }
/// ```
pub struct FilterPipeline {
    shared: Arc<FilterShared>,
    timer: SingleShotTimer,
    delay: Duration,
}

impl Default for FilterPipeline {
    fn default() -> Self {
        Self::new(DEFAULT_DEBOUNCE)
    }
}

impl FilterPipeline {
    /// Create a pipeline with an empty record set and the given debounce delay.
    pub fn new(delay: Duration) -> Self {
        Self {
            shared: Arc::new(FilterShared::default()),
            timer: SingleShotTimer::new(),
            delay,
        }
    }

    /// The debounce delay.
    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Signal emitted with every newly published filtered set.
    pub fn filtered_changed(&self) -> &Signal<RecordSet> {
        &self.shared.filtered_changed
    }

    /// Record a new raw search term.
    ///
    /// Restarts the debounce delay; a shot scheduled for an earlier term is
    /// cancelled and never publishes. A zero delay settles immediately, and
    /// so does any delay when no tokio runtime is available to wait it out.
    pub fn set_search_term(&self, term: impl Into<String>) {
        let term = term.into();
        tracing::trace!(target: targets::FILTER, %term, "search term updated");
        let generation = self.shared.set_live_term(term);

        if self.delay.is_zero() {
            self.timer.cancel();
            self.shared.settle();
            return;
        }

        let shared: Weak<FilterShared> = Arc::downgrade(&self.shared);
        let scheduled = self.timer.start(self.delay, move || {
            if let Some(shared) = shared.upgrade() {
                shared.settle_generation(generation);
            }
        });
        if let Err(error) = scheduled {
            tracing::debug!(target: targets::FILTER, %error, "cannot debounce, settling now");
            self.shared.settle();
        }
    }

    /// Replace the record set and recompute against the settled term.
    ///
    /// Record replacement is not debounced.
    pub fn set_records(&self, records: RecordSet) {
        let filtered = {
            let mut state = self.shared.state.lock();
            state.records = records;
            state.recompute()
        };
        self.shared.filtered_changed.emit(filtered);
    }

    /// Settle the live term now instead of waiting for the delay.
    pub fn flush(&self) {
        self.timer.cancel();
        self.shared.settle();
    }

    /// Cancel any pending recompute. Also happens on drop.
    pub fn teardown(&self) {
        if self.timer.cancel() {
            tracing::debug!(target: targets::FILTER, "pending recompute cancelled on teardown");
        }
    }

    /// Whether a debounced recompute is scheduled.
    pub fn is_pending(&self) -> bool {
        self.timer.is_pending()
    }

    /// The most recent raw term.
    pub fn live_term(&self) -> String {
        self.shared.state.lock().live_term.clone()
    }

    /// The term the current filtered set was computed from.
    pub fn settled_term(&self) -> String {
        self.shared.state.lock().settled_term.clone()
    }

    /// The full record set.
    pub fn records(&self) -> RecordSet {
        self.shared.state.lock().records.clone()
    }

    /// The current filtered set.
    pub fn filtered(&self) -> RecordSet {
        self.shared.state.lock().filtered.clone()
    }

    /// Number of recomputes performed so far.
    pub fn recompute_count(&self) -> u64 {
        self.shared.state.lock().recompute_count
    }
}

impl Drop for FilterPipeline {
    fn drop(&mut self) {
        self.teardown();
    }
}

impl std::fmt::Debug for FilterPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FilterPipeline")
            .field("state", &*self.shared.state.lock())
            .field("delay", &self.delay)
            .field("pending", &self.timer.is_pending())
            .finish()
    }
}

static_assertions::assert_impl_all!(FilterPipeline: Send, Sync);

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn parts() -> RecordSet {
        RecordSet::from(vec![
            Record::new(1, "Brake Caliper Assembly")
                .with_part_number("BC-100")
                .with_category("Brakes"),
            Record::new(2, "Throttle Body").with_supplier("Bosch", "Germany"),
            Record::new(3, "Brake Pad Set").with_supplier("Brembo", "Italy"),
            Record::new(4, "Wheel Hub"),
        ])
    }

    fn ids(set: &RecordSet) -> Vec<String> {
        set.iter().map(|record| record.id.to_string()).collect()
    }

    #[test]
    fn test_brake_matches_case_insensitively() {
        let records = RecordSet::from(vec![
            Record::new(1, "Brake Caliper Assembly"),
            Record::new(2, "Throttle Body"),
        ]);
        let filtered = filter_records(&records, "brake");
        assert_eq!(ids(&filtered), vec!["1"]);
        assert_eq!(ids(&filter_records(&records, "BRAKE")), vec!["1"]);
    }

    #[test]
    fn test_matches_any_searchable_field() {
        let records = parts();
        assert_eq!(ids(&filter_records(&records, "bc-1")), vec!["1"]);
        assert_eq!(ids(&filter_records(&records, "germany")), vec!["2"]);
        assert_eq!(ids(&filter_records(&records, "brem")), vec!["3"]);
        assert!(filter_records(&records, "nothing like this").is_empty());
    }

    #[test]
    fn test_missing_fields_do_not_match() {
        let hub = Record::new(4, "Wheel Hub");
        assert!(!matches(&hub, "brakes"));
        assert!(matches(&hub, "hub"));
    }

    #[test]
    fn test_empty_term_returns_same_set() {
        let records = parts();
        assert!(filter_records(&records, "").ptr_eq(&records));
        assert!(filter_records(&records, "   ").ptr_eq(&records));
    }

    #[test]
    fn test_filter_preserves_order() {
        let records = parts();
        let filtered = filter_records(&records, "b");
        let positions: Vec<usize> = filtered
            .iter()
            .map(|record| records.position_of(&record.id).unwrap())
            .collect();
        assert!(positions.windows(2).all(|pair| pair[0] < pair[1]));
        assert_eq!(ids(&filtered), vec!["1", "2", "3", "4"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rapid_updates_recompute_once() {
        let pipeline = FilterPipeline::new(Duration::from_millis(200));
        pipeline.set_records(parts());
        assert_eq!(pipeline.recompute_count(), 1);

        for term in ["b", "br", "bra", "brak", "brake"] {
            pipeline.set_search_term(term);
            tokio::time::sleep(Duration::from_millis(150)).await;
        }
        assert_eq!(pipeline.recompute_count(), 1);
        assert_eq!(pipeline.settled_term(), "");
        assert_eq!(pipeline.live_term(), "brake");

        // 150 ms have already passed since the last update.
        tokio::time::sleep(Duration::from_millis(49)).await;
        assert_eq!(pipeline.recompute_count(), 1);

        tokio::time::sleep(Duration::from_millis(2)).await;
        assert_eq!(pipeline.recompute_count(), 2);
        assert_eq!(pipeline.settled_term(), "brake");
        assert_eq!(ids(&pipeline.filtered()), vec!["1", "3"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_filtered_changed_is_emitted_once_per_settle() {
        let pipeline = FilterPipeline::new(Duration::from_millis(300));
        pipeline.set_records(parts());

        let emitted = Arc::new(AtomicUsize::new(0));
        let counter = emitted.clone();
        pipeline.filtered_changed().connect(move |set: &RecordSet| {
            assert_eq!(set.len(), 1);
            counter.fetch_add(1, Ordering::SeqCst);
        });

        pipeline.set_search_term("throttle");
        pipeline.set_search_term("Throttle");
        tokio::time::sleep(Duration::from_millis(301)).await;
        assert_eq!(emitted.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_teardown_cancels_pending_recompute() {
        let pipeline = FilterPipeline::new(Duration::from_millis(200));
        pipeline.set_records(parts());
        pipeline.set_search_term("hub");
        assert!(pipeline.is_pending());

        pipeline.teardown();
        tokio::time::sleep(Duration::from_millis(500)).await;
        assert_eq!(pipeline.recompute_count(), 1);
        assert_eq!(pipeline.settled_term(), "");
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropped_pipeline_never_fires() {
        let pipeline = FilterPipeline::new(Duration::from_millis(200));
        let emitted = Arc::new(AtomicUsize::new(0));
        let counter = emitted.clone();
        pipeline.filtered_changed().connect(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        pipeline.set_search_term("hub");
        drop(pipeline);

        tokio::time::sleep(Duration::from_millis(500)).await;
        assert_eq!(emitted.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_set_records_recomputes_against_settled_term() {
        let pipeline = FilterPipeline::new(Duration::from_millis(200));
        pipeline.set_search_term("brake");
        pipeline.flush();
        assert_eq!(pipeline.settled_term(), "brake");

        pipeline.set_records(parts());
        assert_eq!(ids(&pipeline.filtered()), vec!["1", "3"]);

        // Records replaced while a term is pending keep the old settled term.
        pipeline.set_search_term("hub");
        pipeline.set_records(parts());
        assert_eq!(ids(&pipeline.filtered()), vec!["1", "3"]);
    }

    #[test]
    fn test_zero_delay_settles_without_runtime() {
        let pipeline = FilterPipeline::new(Duration::ZERO);
        pipeline.set_records(parts());
        pipeline.set_search_term("wheel");
        assert_eq!(ids(&pipeline.filtered()), vec!["4"]);
    }

    #[test]
    fn test_without_runtime_settles_immediately() {
        let pipeline = FilterPipeline::default();
        pipeline.set_records(parts());
        pipeline.set_search_term("wheel");

        assert!(!pipeline.is_pending());
        assert_eq!(pipeline.settled_term(), "wheel");
        assert_eq!(pipeline.live_term(), pipeline.settled_term());
        assert_eq!(ids(&pipeline.filtered()), vec!["4"]);
    }

    #[test]
    fn test_superseded_shot_does_not_settle() {
        let shared = FilterShared::default();
        shared.state.lock().records = parts();

        let first = shared.set_live_term("brake".into());
        let second = shared.set_live_term("hub".into());

        // The shot for "brake" was claimed before "hub" arrived.
        shared.settle_generation(first);
        assert_eq!(shared.state.lock().settled_term, "");
        assert_eq!(shared.state.lock().recompute_count, 0);

        shared.settle_generation(second);
        assert_eq!(shared.state.lock().settled_term, "hub");
        assert_eq!(ids(&shared.state.lock().filtered), vec!["4"]);
    }
}
