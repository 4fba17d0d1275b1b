//! An in-memory [`RecordSink`].

use std::sync::Arc;

use camino::Utf8PathBuf;
use parking_lot::Mutex;
use rf_core::{InputName, Record, RecordSink};

#[derive(Debug, Default)]
struct State {
    destinations: Vec<InputName>,
    records: Vec<(Option<Utf8PathBuf>, Record)>,
    disposed: bool,
}

/// Collects forwarded records in memory.
///
/// Clones share the same storage, so a clone kept by the caller observes
/// everything the processor hands to the boxed original. Used for dry runs
/// and tests.
///
/// # Examples
///
/// ```
/// use rf_core::{InputName, Record, RecordSink};
/// use rf_rules::MemorySink;
///
/// let sink = MemorySink::new();
/// let mut boxed: Box<dyn RecordSink> = Box::new(sink.clone());
///
/// let input = InputName::parse("in/acme_people_1.csv", "csv").unwrap();
/// boxed.change_destination(&input);
/// boxed.add_record(Record::from_pairs([("A", "1")]));
///
/// assert_eq!(sink.records_for("acme_people_1.csv").len(), 1);
/// ```
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    state: Arc<Mutex<State>>,
}

impl MemorySink {
    /// Creates an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Every record received, in order.
    #[must_use]
    pub fn records(&self) -> Vec<Record> {
        self.state
            .lock()
            .records
            .iter()
            .map(|(_, record)| record.clone())
            .collect()
    }

    /// Records received while `file_name` was the destination's input.
    #[must_use]
    pub fn records_for(&self, file_name: &str) -> Vec<Record> {
        self.state
            .lock()
            .records
            .iter()
            .filter(|(input, _)| input.as_ref().and_then(|p| p.file_name()) == Some(file_name))
            .map(|(_, record)| record.clone())
            .collect()
    }

    /// Every destination change, in order.
    #[must_use]
    pub fn destinations(&self) -> Vec<InputName> {
        self.state.lock().destinations.clone()
    }

    /// Returns `true` once [`dispose`](RecordSink::dispose) was called.
    #[must_use]
    pub fn is_disposed(&self) -> bool {
        self.state.lock().disposed
    }
}

impl RecordSink for MemorySink {
    fn change_destination(&mut self, input: &InputName) {
        self.state.lock().destinations.push(input.clone());
    }

    fn add_record(&mut self, record: Record) {
        let mut state = self.state.lock();
        let current = state
            .destinations
            .last()
            .map(|input| input.path().to_owned());
        state.records.push((current, record));
    }

    fn dispose(&mut self) {
        self.state.lock().disposed = true;
    }
}
