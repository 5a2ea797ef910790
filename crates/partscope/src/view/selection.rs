//! Shared selection state.
//!
//! [`SelectionStore`] holds the one selected record and the highlight set
//! derived from it. Every view that can select calls [`SelectionStore::select`];
//! every view that reacts to the selection subscribes. Notifications are
//! delivered synchronously, in subscription order, before `select` returns.
//!
//! [`ScrollSync`] is the subscriber that keeps the list in step: a selection
//! made anywhere but the table scrolls the table to the selected row, if the
//! row survives the current filter.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use partscope_core::logging::targets;
use partscope_core::{ConnectionGuard, Record, RecordId, RecordSet, Relationship, Signal};

use super::window::ScrollHost;

/// Entity kind of catalog records in relationship data.
pub const RECORD_KIND: &str = "component";

/// Where a selection change came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SelectionSource {
    /// A row click in the table itself.
    Table,
    /// A node click in the network graph.
    Graph,
    /// A link or node click in the flow diagram.
    Diagram,
    /// The detail panel.
    Detail,
    /// The store cleared or refreshed the selection after new data arrived.
    Reconcile,
    /// Application code.
    Programmatic,
}

impl SelectionSource {
    /// Whether a change from this source should scroll the table.
    pub fn requests_scroll(self) -> bool {
        !matches!(self, Self::Table | Self::Reconcile)
    }
}

/// Identifies an entity emphasized because of the current selection.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum HighlightKey {
    /// A graph node (`component_42`, `supplier_7`, ...).
    Node {
        /// Entity kind.
        kind: String,
        /// Entity identifier.
        id: RecordId,
    },
    /// A supplier by name.
    Supplier(String),
    /// A category by name.
    Category(String),
}

impl HighlightKey {
    /// Node key of a catalog record.
    pub fn record(id: &RecordId) -> Self {
        Self::Node {
            kind: RECORD_KIND.to_string(),
            id: id.clone(),
        }
    }
}

impl fmt::Display for HighlightKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Node { kind, id } => write!(f, "{kind}_{id}"),
            Self::Supplier(name) => write!(f, "supplier:{name}"),
            Self::Category(name) => write!(f, "category:{name}"),
        }
    }
}

/// The selected record and its highlight set.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SelectionState {
    selected: Option<Record>,
    highlights: BTreeSet<HighlightKey>,
}

impl SelectionState {
    fn derive(record: Option<&Record>, relationships: &[Relationship]) -> Self {
        let Some(record) = record else {
            return Self::default();
        };

        let mut highlights = BTreeSet::new();
        highlights.insert(HighlightKey::record(&record.id));
        for relationship in relationships {
            if let Some((kind, id)) = relationship.other_end(RECORD_KIND, &record.id) {
                highlights.insert(HighlightKey::Node {
                    kind: kind.to_string(),
                    id: id.clone(),
                });
            }
        }
        if let Some(supplier) = &record.original_supplier {
            highlights.insert(HighlightKey::Supplier(supplier.clone()));
        }
        if let Some(category) = &record.category_name {
            highlights.insert(HighlightKey::Category(category.clone()));
        }

        Self {
            selected: Some(record.clone()),
            highlights,
        }
    }

    /// The selected record.
    pub fn selected(&self) -> Option<&Record> {
        self.selected.as_ref()
    }

    /// Identifier of the selected record.
    pub fn selected_id(&self) -> Option<&RecordId> {
        self.selected.as_ref().map(|record| &record.id)
    }

    /// Whether `id` is the selected record.
    pub fn is_selected(&self, id: &RecordId) -> bool {
        self.selected_id() == Some(id)
    }

    /// Whether nothing is selected.
    pub fn is_empty(&self) -> bool {
        self.selected.is_none()
    }

    /// The derived highlight set.
    pub fn highlights(&self) -> &BTreeSet<HighlightKey> {
        &self.highlights
    }

    /// Whether `key` is highlighted.
    pub fn is_highlighted(&self, key: &HighlightKey) -> bool {
        self.highlights.contains(key)
    }
}

/// A published selection change.
#[derive(Debug, Clone)]
pub struct SelectionChange {
    /// The new state.
    pub state: Arc<SelectionState>,
    /// Identifier selected before this change.
    pub previous: Option<RecordId>,
    /// Who made the change.
    pub source: SelectionSource,
}

/// A selection listener registration. Dropping it unsubscribes.
#[must_use = "dropping a Subscription unsubscribes immediately"]
#[derive(Debug)]
pub struct Subscription(ConnectionGuard<SelectionChange>);

impl Subscription {
    /// Whether the listener is still registered.
    pub fn is_active(&self) -> bool {
        self.0.is_connected()
    }

    /// Remove the listener.
    pub fn unsubscribe(self) {
        self.0.disconnect();
    }
}

/// The single source of truth for the selected record.
///
/// The store is constructed explicitly and handed to every view that needs
/// it; there is no global instance.
///
/// # Signals
///
/// - `selection_changed`: see [`SelectionStore::subscribe`]
pub struct SelectionStore {
    state: Mutex<Arc<SelectionState>>,
    relationships: RwLock<Arc<[Relationship]>>,
    selection_changed: Signal<SelectionChange>,
}

impl Default for SelectionStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SelectionStore {
    /// Create a store with nothing selected.
    pub fn new() -> Self {
        Self {
            state: Mutex::new(Arc::new(SelectionState::default())),
            relationships: RwLock::new(Arc::from(Vec::new())),
            selection_changed: Signal::new(),
        }
    }

    /// Replace the selection and notify every subscriber before returning.
    ///
    /// Selecting the already-selected record notifies again. Clearing an
    /// empty selection does not.
    pub fn select(&self, record: Option<&Record>, source: SelectionSource) -> Arc<SelectionState> {
        let relationships = self.relationships.read().clone();
        let next = Arc::new(SelectionState::derive(record, &relationships));
        self.publish(next, source)
    }

    /// Select the record with `id` from `records`.
    ///
    /// Returns `false` without touching the selection if `records` has no
    /// such record.
    pub fn select_id(&self, id: &RecordId, records: &RecordSet, source: SelectionSource) -> bool {
        match records.find(id) {
            Some(record) => {
                self.select(Some(record), source);
                true
            }
            None => {
                tracing::debug!(target: targets::SELECTION, %id, "select_id ignored, record not loaded");
                false
            }
        }
    }

    /// Clear the selection.
    pub fn clear(&self, source: SelectionSource) {
        self.select(None, source);
    }

    fn publish(&self, next: Arc<SelectionState>, source: SelectionSource) -> Arc<SelectionState> {
        let previous = {
            let mut state = self.state.lock();
            if state.is_empty() && next.is_empty() {
                return state.clone();
            }
            std::mem::replace(&mut *state, next.clone())
        };

        tracing::debug!(
            target: targets::SELECTION,
            ?source,
            previous = ?previous.selected_id(),
            selected = ?next.selected_id(),
            "selection changed"
        );
        self.selection_changed.emit(SelectionChange {
            state: next.clone(),
            previous: previous.selected_id().cloned(),
            source,
        });
        next
    }

    /// The current state.
    pub fn state(&self) -> Arc<SelectionState> {
        self.state.lock().clone()
    }

    /// The selected record.
    pub fn selected(&self) -> Option<Record> {
        self.state.lock().selected().cloned()
    }

    /// Identifier of the selected record.
    pub fn selected_id(&self) -> Option<RecordId> {
        self.state.lock().selected_id().cloned()
    }

    /// Register a listener. Listeners run in subscription order.
    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&SelectionChange) + Send + Sync + 'static,
    {
        Subscription(self.selection_changed.connect_scoped(listener))
    }

    /// Number of registered listeners.
    pub fn subscriber_count(&self) -> usize {
        self.selection_changed.connection_count()
    }

    /// Bring the selection in line with a newly arrived record set.
    ///
    /// A selected id that is no longer present is cleared (source
    /// [`SelectionSource::Reconcile`]) and `true` is returned. A selected id
    /// that is still present keeps its selection with the fresh record data;
    /// subscribers hear about it, again with `Reconcile`, only when the record
    /// or its highlights differ from what they last saw.
    pub fn reconcile(&self, records: &RecordSet) -> bool {
        let current = self.state();
        let Some(id) = current.selected_id().cloned() else {
            return false;
        };
        match records.find(&id) {
            Some(fresh) => {
                let relationships = self.relationships.read().clone();
                let next = SelectionState::derive(Some(fresh), &relationships);
                if next != *current {
                    tracing::debug!(target: targets::SELECTION, %id, "selected record refreshed");
                    self.publish(Arc::new(next), SelectionSource::Reconcile);
                }
                false
            }
            None => {
                tracing::debug!(target: targets::SELECTION, %id, "selected record gone, clearing");
                self.select(None, SelectionSource::Reconcile);
                true
            }
        }
    }

    /// Replace the relationship index used to derive highlights.
    ///
    /// If the highlight set of the current selection changes, subscribers are
    /// notified with source [`SelectionSource::Reconcile`].
    pub fn set_relationships(&self, relationships: Arc<[Relationship]>) {
        *self.relationships.write() = relationships.clone();
        let current = self.state();
        if current.is_empty() {
            return;
        }
        let next = SelectionState::derive(current.selected(), &relationships);
        if next != *current {
            self.publish(Arc::new(next), SelectionSource::Reconcile);
        }
    }
}

impl fmt::Debug for SelectionStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SelectionStore")
            .field("state", &*self.state.lock())
            .field("relationships", &self.relationships.read().len())
            .field("subscribers", &self.selection_changed.connection_count())
            .finish()
    }
}

/// Scrolls a list to the selected record when another view selects it.
///
/// Stays connected for as long as it is alive.
pub struct ScrollSync {
    subscription: Subscription,
}

impl ScrollSync {
    /// Connect `store` to `host`.
    ///
    /// `filtered` must return the set currently shown by the host; the row
    /// index is looked up in it on every change.
    pub fn new<H, F>(store: &SelectionStore, filtered: F, host: Arc<H>) -> Self
    where
        H: ScrollHost + ?Sized + 'static,
        F: Fn() -> RecordSet + Send + Sync + 'static,
    {
        let subscription = store.subscribe(move |change| {
            if !change.source.requests_scroll() {
                return;
            }
            let Some(id) = change.state.selected_id() else {
                return;
            };
            match filtered().position_of(id) {
                Some(index) => {
                    tracing::trace!(target: targets::SELECTION, %id, index, "scrolling to selection");
                    host.scroll_to_index(index);
                }
                None => {
                    tracing::trace!(target: targets::SELECTION, %id, "selection hidden by filter, not scrolling");
                }
            }
        });
        Self { subscription }
    }

    /// Whether the sync is still connected.
    pub fn is_active(&self) -> bool {
        self.subscription.is_active()
    }
}

impl fmt::Debug for ScrollSync {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScrollSync")
            .field("active", &self.is_active())
            .finish()
    }
}

static_assertions::assert_impl_all!(SelectionStore: Send, Sync);
static_assertions::assert_impl_all!(ScrollSync: Send, Sync);

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct RecordingHost {
        requests: Mutex<Vec<usize>>,
    }

    impl ScrollHost for RecordingHost {
        fn scroll_to_index(&self, index: usize) {
            self.requests.lock().push(index);
        }
    }

    fn records() -> RecordSet {
        RecordSet::from(vec![
            Record::new(7, "Throttle Body").with_supplier("Bosch", "Germany"),
            Record::new(42, "Brake Caliper Assembly")
                .with_supplier("Brembo", "Italy")
                .with_category("Brakes"),
            Record::new(99, "Wheel Hub"),
        ])
    }

    fn record(id: i64) -> Record {
        records().find(&RecordId::Int(id)).cloned().unwrap()
    }

    fn log_changes(store: &SelectionStore) -> (Arc<Mutex<Vec<SelectionChange>>>, Subscription) {
        let log = Arc::new(Mutex::new(Vec::new()));
        let sink = log.clone();
        let subscription = store.subscribe(move |change| sink.lock().push(change.clone()));
        (log, subscription)
    }

    #[test]
    fn test_select_notifies_before_returning() {
        let store = SelectionStore::new();
        let (log, _sub) = log_changes(&store);

        store.select(Some(&record(42)), SelectionSource::Graph);

        let log = log.lock();
        assert_eq!(log.len(), 1);
        assert_eq!(log[0].state.selected_id(), Some(&RecordId::Int(42)));
        assert_eq!(log[0].previous, None);
        assert_eq!(log[0].source, SelectionSource::Graph);
    }

    #[test]
    fn test_listeners_run_in_subscription_order() {
        let store = SelectionStore::new();
        let order = Arc::new(Mutex::new(Vec::new()));

        let subs: Vec<Subscription> = (0..3)
            .map(|n| {
                let order = order.clone();
                store.subscribe(move |_| order.lock().push(n))
            })
            .collect();

        store.select(Some(&record(7)), SelectionSource::Table);
        assert_eq!(*order.lock(), vec![0, 1, 2]);
        drop(subs);
    }

    #[test]
    fn test_direct_transition_between_records() {
        let store = SelectionStore::new();
        let (log, _sub) = log_changes(&store);

        store.select(Some(&record(7)), SelectionSource::Table);
        store.select(Some(&record(42)), SelectionSource::Table);

        let log = log.lock();
        assert_eq!(log.len(), 2);
        assert!(log.iter().all(|change| !change.state.is_empty()));
        assert_eq!(log[1].previous, Some(RecordId::Int(7)));
    }

    #[test]
    fn test_reselect_same_record_notifies() {
        let store = SelectionStore::new();
        let (log, _sub) = log_changes(&store);

        store.select(Some(&record(42)), SelectionSource::Graph);
        store.select(Some(&record(42)), SelectionSource::Graph);
        assert_eq!(log.lock().len(), 2);

        store.clear(SelectionSource::Programmatic);
        store.clear(SelectionSource::Programmatic);
        assert_eq!(log.lock().len(), 3);
    }

    #[test]
    fn test_unsubscribe() {
        let store = SelectionStore::new();
        let (log, sub) = log_changes(&store);
        assert_eq!(store.subscriber_count(), 1);

        sub.unsubscribe();
        assert_eq!(store.subscriber_count(), 0);
        store.select(Some(&record(7)), SelectionSource::Table);
        assert!(log.lock().is_empty());
    }

    #[test]
    fn test_highlights_include_related_entities() {
        let store = SelectionStore::new();
        store.set_relationships(Arc::from(vec![Relationship {
            id: None,
            source_type: "supplier".into(),
            source_id: RecordId::Int(3),
            target_type: RECORD_KIND.into(),
            target_id: RecordId::Int(42),
            relationship_type: Some("supplies".into()),
            value: None,
        }]));

        let state = store.select(Some(&record(42)), SelectionSource::Diagram);
        let keys: Vec<String> = state.highlights().iter().map(ToString::to_string).collect();
        assert_eq!(
            keys,
            vec!["component_42", "supplier_3", "supplier:Brembo", "category:Brakes"]
        );
    }

    #[test]
    fn test_set_relationships_refreshes_highlights() {
        let store = SelectionStore::new();
        store.select(Some(&record(99)), SelectionSource::Table);
        let (log, _sub) = log_changes(&store);

        store.set_relationships(Arc::from(vec![Relationship {
            id: Some(RecordId::Int(1)),
            source_type: RECORD_KIND.into(),
            source_id: RecordId::Int(99),
            target_type: RECORD_KIND.into(),
            target_id: RecordId::Int(7),
            relationship_type: None,
            value: None,
        }]));

        let log = log.lock();
        assert_eq!(log.len(), 1);
        assert_eq!(log[0].source, SelectionSource::Reconcile);
        assert!(log[0].state.is_highlighted(&HighlightKey::record(&RecordId::Int(7))));
    }

    #[test]
    fn test_reconcile_clears_dangling_selection() {
        let store = SelectionStore::new();
        store.select(Some(&record(42)), SelectionSource::Table);
        let (log, _sub) = log_changes(&store);

        // Still present and unchanged: kept, no notification.
        assert!(!store.reconcile(&records()));
        assert_eq!(store.selected_id(), Some(RecordId::Int(42)));
        assert!(log.lock().is_empty());

        let without_42 = RecordSet::from(vec![record(7)]);
        assert!(store.reconcile(&without_42));
        assert_eq!(store.selected_id(), None);

        let log = log.lock();
        assert_eq!(log.len(), 1);
        assert_eq!(log[0].source, SelectionSource::Reconcile);
        assert_eq!(log[0].previous, Some(RecordId::Int(42)));
    }

    #[test]
    fn test_reconcile_publishes_refreshed_record() {
        let store = SelectionStore::new();
        store.select(Some(&record(42)), SelectionSource::Graph);
        let (log, _sub) = log_changes(&store);

        let refreshed = RecordSet::from(vec![
            Record::new(42, "Brake Caliper Assembly")
                .with_supplier("Akebono", "Japan")
                .with_category("Brakes"),
        ]);
        assert!(!store.reconcile(&refreshed));

        let state = store.state();
        assert!(state.is_highlighted(&HighlightKey::Supplier("Akebono".into())));
        assert!(!state.is_highlighted(&HighlightKey::Supplier("Brembo".into())));

        let log = log.lock();
        assert_eq!(log.len(), 1);
        assert_eq!(log[0].source, SelectionSource::Reconcile);
        assert_eq!(log[0].previous, Some(RecordId::Int(42)));
        assert!(Arc::ptr_eq(&log[0].state, &state));
    }

    #[test]
    fn test_select_id_requires_loaded_record() {
        let store = SelectionStore::new();
        assert!(store.select_id(&RecordId::Int(42), &records(), SelectionSource::Detail));
        assert!(!store.select_id(&RecordId::Int(1234), &records(), SelectionSource::Detail));
        assert_eq!(store.selected_id(), Some(RecordId::Int(42)));
    }

    #[test]
    fn test_scroll_sync_scrolls_for_other_views() {
        let store = SelectionStore::new();
        let host = Arc::new(RecordingHost::default());
        let _sync = ScrollSync::new(&store, records, host.clone());

        store.select(Some(&record(42)), SelectionSource::Graph);
        store.select(Some(&record(99)), SelectionSource::Table);
        store.select(Some(&record(99)), SelectionSource::Diagram);

        assert_eq!(*host.requests.lock(), vec![1, 2]);
    }

    #[test]
    fn test_filtered_out_selection_does_not_scroll() {
        let store = SelectionStore::new();
        let host = Arc::new(RecordingHost::default());
        let filtered = || RecordSet::from(vec![record(7), record(99)]);
        let _sync = ScrollSync::new(&store, filtered, host.clone());

        store.select(Some(&record(42)), SelectionSource::Graph);

        assert_eq!(store.selected_id(), Some(RecordId::Int(42)));
        assert!(host.requests.lock().is_empty());
    }

    #[test]
    fn test_dropped_scroll_sync_disconnects() {
        let store = SelectionStore::new();
        let host = Arc::new(RecordingHost::default());
        let sync = ScrollSync::new(&store, records, host.clone());
        assert!(sync.is_active());
        drop(sync);

        store.select(Some(&record(42)), SelectionSource::Graph);
        assert!(host.requests.lock().is_empty());
    }
}
