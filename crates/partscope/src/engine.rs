//! The catalog engine facade.
//!
//! [`CatalogEngine`] wires the four parts together:
//!
//! ```text
//! CatalogCache ──records──▶ FilterPipeline ──filtered──▶ VirtualList
//!                                │                          ▲
//!                                └──────▶ SelectionStore ───┘ (ScrollSync)
//! ```
//!
//! The cache supplies the full record set, the filter derives the visible
//! subset from the settled search term, the list windows that subset, and
//! selection changes made outside the table scroll the list to the selected
//! row.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use parking_lot::Mutex;
use partscope_core::logging::{span_names, targets};
use partscope_core::{
    Category, ConnectionGuard, PerfSpan, Property, Record, RecordId, RecordSet, Signal, Supplier,
};
use partscope_net::catalog::{
    CacheStats, CatalogCache, CatalogError, CatalogResult, HttpRecordProvider, RecordProvider,
    RecordQuery,
};
use tracing::Instrument;

use crate::config::{ConfigError, EngineConfig};
use crate::view::{
    FilterPipeline, ScrollSync, SelectionChange, SelectionSource, SelectionState, SelectionStore,
    Subscription, VirtualList, VisibleWindow, WindowError, WindowParams, compute_window,
};

/// Progress of the primary record listing.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum LoadState {
    /// Nothing requested yet.
    #[default]
    Idle,
    /// A fetch is in progress. Previously loaded records stay visible.
    Loading,
    /// The record set is loaded.
    Ready,
    /// The last fetch failed.
    Failed {
        /// What went wrong.
        error: CatalogError,
        /// Whether records from an earlier fetch are still shown.
        has_data: bool,
    },
}

impl LoadState {
    /// Whether a fetch is in progress.
    pub fn is_loading(&self) -> bool {
        matches!(self, Self::Loading)
    }

    /// The error of a failed fetch.
    pub fn error(&self) -> Option<&CatalogError> {
        match self {
            Self::Failed { error, .. } => Some(error),
            _ => None,
        }
    }
}

/// Client-side catalog engine over a [`RecordProvider`].
///
/// # Signals
///
/// - `load_state_changed()`: emitted with the new [`LoadState`]
/// - `filtered_changed()`: emitted with each newly published filtered set
/// - `window_changed()`: emitted when the list window moves
pub struct CatalogEngine<P> {
    cache: CatalogCache<P>,
    filter: Arc<FilterPipeline>,
    selection: SelectionStore,
    list: Arc<VirtualList>,
    load_state: Property<LoadState>,
    load_state_changed: Signal<LoadState>,
    has_data: AtomicBool,
    fetch_ticket: AtomicU64,
    applied_ticket: Mutex<u64>,
    _scroll_sync: ScrollSync,
    _list_link: ConnectionGuard<RecordSet>,
}

impl CatalogEngine<HttpRecordProvider> {
    /// Build an engine talking to the catalog service named in `config`.
    ///
    /// Fails with [`CatalogError::ConfigurationMissing`] (wrapped in
    /// [`ConfigError::Catalog`]) if `api.base_url` is not set.
    pub fn from_config(config: &EngineConfig) -> Result<Self, ConfigError> {
        let provider = HttpRecordProvider::new(config.provider_config())?;
        Self::new(provider, config)
    }
}

impl<P: RecordProvider> CatalogEngine<P> {
    /// Build an engine over `provider`.
    pub fn new(provider: P, config: &EngineConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let list = Arc::new(VirtualList::new(
            config.list.item_height,
            config.list.viewport_height,
            config.list.overscan,
        )?);
        let filter = Arc::new(FilterPipeline::new(config.search.debounce()));
        let selection = SelectionStore::new();

        let list_link = {
            let list = Arc::clone(&list);
            filter
                .filtered_changed()
                .connect_scoped(move |filtered: &RecordSet| {
                    list.set_item_count(filtered.len());
                })
        };

        let scroll_sync = {
            let filter = Arc::clone(&filter);
            ScrollSync::new(&selection, move || filter.filtered(), Arc::clone(&list))
        };

        Ok(Self {
            cache: CatalogCache::with_ttl(provider, config.cache.ttl()),
            filter,
            selection,
            list,
            load_state: Property::default(),
            load_state_changed: Signal::new(),
            has_data: AtomicBool::new(false),
            fetch_ticket: AtomicU64::new(0),
            applied_ticket: Mutex::new(0),
            _scroll_sync: scroll_sync,
            _list_link: list_link,
        })
    }

    fn set_load_state(&self, state: LoadState) {
        if self.load_state.set(state.clone()) {
            self.load_state_changed.emit(state);
        }
    }

    /// Fetch the full record listing and make it the current record set.
    ///
    /// Served from the cache within its time-to-live. On failure the previous
    /// record set is kept and the error is both returned and reflected in
    /// [`load_state`](Self::load_state).
    ///
    /// Calls are ordered by when they started. Once a later call has been
    /// applied, the outcome of an earlier one that finishes afterwards is
    /// returned to its caller but leaves the engine untouched.
    pub async fn fetch_all(&self) -> CatalogResult<RecordSet> {
        let ticket = self.fetch_ticket.fetch_add(1, Ordering::SeqCst) + 1;

        if let Some(records) = self.cache.cached(&RecordQuery::all()) {
            let result = Ok(records);
            self.finish_fetch(ticket, &result);
            return result;
        }

        self.set_load_state(LoadState::Loading);
        let result = self
            .cache
            .fetch_all()
            .instrument(tracing::info_span!(target: targets::ENGINE, span_names::FETCH, ticket))
            .await;
        self.finish_fetch(ticket, &result);
        result
    }

    fn finish_fetch(&self, ticket: u64, result: &CatalogResult<RecordSet>) {
        let mut applied = self.applied_ticket.lock();
        if *applied > ticket {
            tracing::debug!(
                target: targets::ENGINE,
                ticket,
                applied = *applied,
                "fetch superseded by a newer one, result not applied"
            );
            return;
        }
        *applied = ticket;

        match result {
            Ok(records) => self.apply_records(records),
            Err(error) => {
                let has_data = self.has_data.load(Ordering::SeqCst);
                tracing::warn!(target: targets::ENGINE, %error, has_data, "record fetch failed");
                self.set_load_state(LoadState::Failed {
                    error: error.clone(),
                    has_data,
                });
            }
        }
    }

    fn apply_records(&self, records: &RecordSet) {
        if !self.filter.records().ptr_eq(records) {
            let _span = PerfSpan::new(span_names::REPLACE_RECORDS);
            tracing::info!(target: targets::ENGINE, count = records.len(), "record set replaced");
            self.filter.set_records(records.clone());
            self.selection.reconcile(records);
        }
        self.has_data.store(true, Ordering::SeqCst);
        self.set_load_state(LoadState::Ready);
    }

    /// Load the relationship index used for selection highlights.
    pub async fn load_relationships(&self) {
        let relationships = self.cache.relationships().await;
        self.selection.set_relationships(relationships);
    }

    /// Drop every cached response. The current record set stays.
    pub fn clear_cache(&self) {
        tracing::debug!(target: targets::ENGINE, "clearing cache");
        self.cache.clear();
    }

    /// Run a server-side search. The current record set is not replaced.
    pub async fn search_remote(&self, query: &RecordQuery) -> CatalogResult<RecordSet> {
        self.cache.fetch(query).await
    }

    /// The category list; empty if unavailable.
    pub async fn categories(&self) -> Arc<[Category]> {
        self.cache.categories().await
    }

    /// The supplier list; empty if unavailable.
    pub async fn suppliers(&self) -> Arc<[Supplier]> {
        self.cache.suppliers().await
    }

    /// Progress of the primary listing.
    pub fn load_state(&self) -> LoadState {
        self.load_state.get()
    }

    /// Signal emitted with every load state transition.
    pub fn load_state_changed(&self) -> &Signal<LoadState> {
        &self.load_state_changed
    }

    /// The full, unfiltered record set.
    pub fn records(&self) -> RecordSet {
        self.filter.records()
    }

    /// Record a raw search term; the filtered set follows after the debounce
    /// delay.
    pub fn set_search_term(&self, term: impl Into<String>) {
        self.filter.set_search_term(term);
    }

    /// Apply the pending search term immediately.
    pub fn flush_search(&self) {
        self.filter.flush();
    }

    /// The current filtered set.
    pub fn filtered(&self) -> RecordSet {
        self.filter.filtered()
    }

    /// Signal emitted with each newly published filtered set.
    pub fn filtered_changed(&self) -> &Signal<RecordSet> {
        self.filter.filtered_changed()
    }

    /// The filter pipeline.
    pub fn filter(&self) -> &FilterPipeline {
        &self.filter
    }

    /// Window for arbitrary inputs.
    pub fn compute_window(&self, params: &WindowParams) -> VisibleWindow {
        compute_window(params)
    }

    /// Window of the filtered list at the current scroll position.
    pub fn window(&self) -> VisibleWindow {
        self.list.window()
    }

    /// Scroll the list.
    pub fn set_scroll_offset(&self, offset: f64) -> Result<VisibleWindow, WindowError> {
        self.list.set_scroll_offset(offset)
    }

    /// Resize the list viewport.
    pub fn set_viewport_height(&self, height: f64) -> Result<VisibleWindow, WindowError> {
        self.list.set_viewport_height(height)
    }

    /// Signal emitted when the list window changes.
    pub fn window_changed(&self) -> &Signal<VisibleWindow> {
        &self.list.window_changed
    }

    /// The list host.
    pub fn list(&self) -> &VirtualList {
        &self.list
    }

    /// Select a record, or clear the selection with `None`.
    ///
    /// The record is looked up by id in the current record set and the loaded
    /// copy is stored. Returns `None` without touching the selection when the
    /// id is not loaded.
    pub fn select(
        &self,
        record: Option<&Record>,
        source: SelectionSource,
    ) -> Option<Arc<SelectionState>> {
        let Some(record) = record else {
            return Some(self.selection.select(None, source));
        };
        let records = self.records();
        match records.find(&record.id) {
            Some(loaded) => Some(self.selection.select(Some(loaded), source)),
            None => {
                tracing::debug!(target: targets::ENGINE, id = %record.id, "select ignored, record not loaded");
                None
            }
        }
    }

    /// Select a loaded record by identifier.
    pub fn select_id(&self, id: &RecordId, source: SelectionSource) -> bool {
        self.selection.select_id(id, &self.records(), source)
    }

    /// The current selection.
    pub fn selection_state(&self) -> Arc<SelectionState> {
        self.selection.state()
    }

    /// Register a selection listener; drop the returned handle to unsubscribe.
    pub fn subscribe_selection<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&SelectionChange) + Send + Sync + 'static,
    {
        self.selection.subscribe(listener)
    }

    /// The selection store.
    pub fn selection(&self) -> &SelectionStore {
        &self.selection
    }

    /// The remote data cache.
    pub fn cache(&self) -> &CatalogCache<P> {
        &self.cache
    }

    /// Cache counters.
    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }
}

impl<P> std::fmt::Debug for CatalogEngine<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CatalogEngine")
            .field("cache", &self.cache)
            .field("filter", &self.filter)
            .field("selection", &self.selection)
            .field("list", &self.list)
            .field("load_state", &self.load_state)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    #[derive(Default)]
    struct StubProvider {
        records: Mutex<Vec<Record>>,
        latency: Mutex<Duration>,
        fail: AtomicBool,
        calls: AtomicUsize,
    }

    impl StubProvider {
        fn with_records(records: Vec<Record>) -> Self {
            Self {
                records: Mutex::new(records),
                ..Self::default()
            }
        }
    }

    impl RecordProvider for StubProvider {
        async fn fetch_records(&self, _query: &RecordQuery) -> CatalogResult<Vec<Record>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let outcome = if self.fail.load(Ordering::SeqCst) {
                Err(CatalogError::unavailable("connection refused"))
            } else {
                Ok(self.records.lock().clone())
            };
            let latency = *self.latency.lock();
            if !latency.is_zero() {
                tokio::time::sleep(latency).await;
            }
            outcome
        }
    }

    fn ids(records: &RecordSet) -> Vec<RecordId> {
        records.iter().map(|r| r.id.clone()).collect()
    }

    fn catalog(count: i64) -> Vec<Record> {
        (1..=count)
            .map(|id| match id {
                42 => Record::new(id, "Brake Caliper Assembly"),
                _ => Record::new(id, format!("Throttle Body {id}")),
            })
            .collect()
    }

    fn engine(records: Vec<Record>) -> CatalogEngine<StubProvider> {
        CatalogEngine::new(StubProvider::with_records(records), &EngineConfig::default()).unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn test_fetch_populates_filter_and_list() {
        let engine = engine(catalog(100));
        assert_eq!(engine.load_state(), LoadState::Idle);

        let records = engine.fetch_all().await.unwrap();
        assert_eq!(records.len(), 100);
        assert_eq!(engine.load_state(), LoadState::Ready);
        assert!(engine.records().ptr_eq(&records));
        assert_eq!(engine.filtered().len(), 100);
        assert_eq!(engine.list().item_count(), 100);
        assert_eq!(engine.window().range(), Some(0..=14));
    }

    #[tokio::test(start_paused = true)]
    async fn test_second_fetch_is_cached() {
        let engine = engine(catalog(3));
        let first = engine.fetch_all().await.unwrap();
        let second = engine.fetch_all().await.unwrap();
        assert!(first.ptr_eq(&second));
        assert_eq!(engine.cache().provider().calls.load(Ordering::SeqCst), 1);

        engine.clear_cache();
        engine.fetch_all().await.unwrap();
        assert_eq!(engine.cache().provider().calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_refresh_keeps_previous_records() {
        let engine = engine(catalog(3));
        let loaded = engine.fetch_all().await.unwrap();

        engine.clear_cache();
        engine.cache().provider().fail.store(true, Ordering::SeqCst);
        let err = engine.fetch_all().await.unwrap_err();

        assert!(matches!(err, CatalogError::ProviderUnavailable { .. }));
        assert_eq!(
            engine.load_state(),
            LoadState::Failed {
                error: err,
                has_data: true
            }
        );
        assert!(engine.records().ptr_eq(&loaded));
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_fetch_failure_has_no_data() {
        let engine = engine(catalog(3));
        engine.cache().provider().fail.store(true, Ordering::SeqCst);

        let states = Arc::new(Mutex::new(Vec::new()));
        let sink = states.clone();
        engine
            .load_state_changed()
            .connect(move |state: &LoadState| sink.lock().push(state.clone()));

        engine.fetch_all().await.unwrap_err();
        let states = states.lock();
        assert_eq!(states[0], LoadState::Loading);
        assert!(matches!(states[1], LoadState::Failed { has_data: false, .. }));
        assert!(engine.records().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_search_then_select_hidden_record() {
        let engine = engine(catalog(100));
        engine.fetch_all().await.unwrap();

        engine.set_search_term("throttle");
        tokio::time::sleep(Duration::from_millis(201)).await;
        assert_eq!(engine.filtered().len(), 99);

        let hidden = engine.records().find(&RecordId::Int(42)).cloned().unwrap();
        assert!(engine.select(Some(&hidden), SelectionSource::Graph).is_some());

        assert_eq!(engine.selection_state().selected_id(), Some(&RecordId::Int(42)));
        assert_eq!(engine.list().scroll_requests(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_select_rejects_record_outside_current_set() {
        let engine = engine(catalog(3));
        engine.fetch_all().await.unwrap();

        let notified = Arc::new(AtomicUsize::new(0));
        let counter = notified.clone();
        let _subscription = engine.subscribe_selection(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        let ghost = Record::new(999, "Ghost Part");
        assert!(engine.select(Some(&ghost), SelectionSource::Graph).is_none());
        assert!(engine.selection_state().is_empty());
        assert_eq!(notified.load(Ordering::SeqCst), 0);

        let outdated = Record::new(2, "Renamed Elsewhere");
        let state = engine.select(Some(&outdated), SelectionSource::Graph).unwrap();
        assert_eq!(
            state.selected().and_then(|r| r.part_name.as_deref()),
            Some("Throttle Body 2")
        );
        assert_eq!(notified.load(Ordering::SeqCst), 1);

        assert!(engine.select(None, SelectionSource::Graph).unwrap().is_empty());
        assert_eq!(notified.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_superseded_fetch_does_not_overwrite_newer_records() {
        let engine = engine(catalog(1));
        *engine.cache().provider().latency.lock() = Duration::from_millis(100);

        let refresh = async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            engine.clear_cache();
            let provider = engine.cache().provider();
            *provider.records.lock() = vec![Record::new(2, "Brake Rotor")];
            *provider.latency.lock() = Duration::ZERO;
            engine.fetch_all().await
        };
        let (stale, fresh) = tokio::join!(engine.fetch_all(), refresh);

        assert_eq!(ids(&stale.unwrap()), vec![RecordId::Int(1)]);
        assert_eq!(ids(&fresh.unwrap()), vec![RecordId::Int(2)]);
        assert_eq!(ids(&engine.records()), vec![RecordId::Int(2)]);
        assert_eq!(
            ids(&engine.cache().cached(&RecordQuery::all()).unwrap()),
            vec![RecordId::Int(2)]
        );
        assert_eq!(engine.load_state(), LoadState::Ready);
    }

    #[tokio::test(start_paused = true)]
    async fn test_superseded_failure_keeps_ready_state() {
        let engine = engine(catalog(1));
        let provider = engine.cache().provider();
        *provider.latency.lock() = Duration::from_millis(100);
        provider.fail.store(true, Ordering::SeqCst);

        let refresh = async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            engine.clear_cache();
            *provider.latency.lock() = Duration::ZERO;
            provider.fail.store(false, Ordering::SeqCst);
            engine.fetch_all().await
        };
        let (stale, fresh) = tokio::join!(engine.fetch_all(), refresh);

        assert!(fresh.is_ok());
        assert!(matches!(stale, Err(CatalogError::ProviderUnavailable { .. })));
        assert_eq!(engine.load_state(), LoadState::Ready);
        assert_eq!(ids(&engine.records()), vec![RecordId::Int(1)]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_graph_selection_scrolls_the_list() {
        let engine = engine(catalog(100));
        engine.fetch_all().await.unwrap();

        assert!(engine.select_id(&RecordId::Int(60), SelectionSource::Graph));
        assert_eq!(engine.list().scroll_requests(), 1);
        assert!(engine.window().contains(59));

        engine.select_id(&RecordId::Int(1), SelectionSource::Table);
        assert_eq!(engine.list().scroll_requests(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_new_record_set_clears_dangling_selection() {
        let engine = engine(catalog(50));
        engine.fetch_all().await.unwrap();
        engine.select_id(&RecordId::Int(42), SelectionSource::Detail);

        *engine.cache().provider().records.lock() = catalog(10);
        engine.clear_cache();
        engine.fetch_all().await.unwrap();

        assert!(engine.selection_state().is_empty());
    }

    #[test]
    fn test_invalid_geometry() {
        let mut config = EngineConfig::default();
        config.list.viewport_height = 0.0;
        let err = CatalogEngine::new(StubProvider::default(), &config).unwrap_err();
        assert!(matches!(err, ConfigError::Geometry(_)));
    }

    #[test]
    fn test_from_config_requires_base_url() {
        let err = CatalogEngine::from_config(&EngineConfig::default()).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Catalog(CatalogError::ConfigurationMissing { .. })
        ));
    }
}
