//! Events are emitted under the published subsystem targets.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use partscope::logging::targets;
use partscope::view::{FilterPipeline, SelectionSource, SelectionStore};
use partscope::{Record, RecordId, RecordSet};
use tracing_subscriber::layer::{Context, SubscriberExt};

#[derive(Clone, Default)]
struct TargetRecorder(Arc<Mutex<Vec<String>>>);

impl<S: tracing::Subscriber> tracing_subscriber::Layer<S> for TargetRecorder {
    fn on_event(&self, event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
        self.0.lock().push(event.metadata().target().to_string());
    }
}

#[test]
fn test_events_use_subsystem_targets() {
    let recorder = TargetRecorder::default();
    let subscriber = tracing_subscriber::registry().with(recorder.clone());

    tracing::subscriber::with_default(subscriber, || {
        let records = RecordSet::from(vec![
            Record::new(1, "Brake Caliper Assembly"),
            Record::new(2, "Wheel Hub"),
        ]);

        let pipeline = FilterPipeline::new(Duration::ZERO);
        pipeline.set_records(records.clone());
        pipeline.set_search_term("hub");

        let store = SelectionStore::new();
        store.select(records.find(&RecordId::Int(1)), SelectionSource::Graph);
    });

    let known = [
        targets::SIGNAL,
        targets::TIMER,
        targets::HTTP,
        targets::CATALOG,
        targets::WINDOW,
        targets::FILTER,
        targets::SELECTION,
        targets::ENGINE,
    ];
    let seen = recorder.0.lock();
    assert!(seen.iter().any(|target| target == targets::FILTER));
    assert!(seen.iter().any(|target| target == targets::SELECTION));
    assert!(seen.iter().all(|target| known.contains(&target.as_str())));
}
