//! The output seam between the rule engine and the writers.

use crate::types::{InputName, Record};

/// A destination for the records an action forwards.
///
/// Implementations buffer and persist records in whatever way suits them;
/// the rule engine only announces which input file is being processed and
/// hands over records in order. Failures while persisting are reported by
/// the implementation itself (logged), never to the caller.
///
/// # Examples
///
/// ```
/// use rf_core::{InputName, Record, RecordSink};
///
/// #[derive(Default)]
/// struct Collect(Vec<String>);
///
/// impl RecordSink for Collect {
///     fn change_destination(&mut self, _input: &InputName) {}
///     fn add_record(&mut self, record: Record) {
///         self.0.push(record.to_csv_line());
///     }
///     fn dispose(&mut self) {}
/// }
///
/// let mut sink = Collect::default();
/// sink.add_record(Record::from_pairs([("A", "1")]));
/// assert_eq!(sink.0, ["1"]);
/// ```
pub trait RecordSink: Send {
    /// Switches to the destination derived from `input`.
    ///
    /// Records buffered for the previous destination are written there
    /// first.
    fn change_destination(&mut self, input: &InputName);

    /// Queues a record for the current destination.
    fn add_record(&mut self, record: Record);

    /// Writes everything still buffered and releases the destination.
    fn dispose(&mut self);
}

impl<S: RecordSink + ?Sized> RecordSink for Box<S> {
    fn change_destination(&mut self, input: &InputName) {
        (**self).change_destination(input);
    }

    fn add_record(&mut self, record: Record) {
        (**self).add_record(record);
    }

    fn dispose(&mut self) {
        (**self).dispose();
    }
}
