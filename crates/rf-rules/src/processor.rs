//! The rule engine: every configured action, driven per input file.

use std::sync::Arc;

use rf_core::{ActionConfig, InputName, Record, RecordSink};

use crate::action::Action;
use crate::error::RuleError;
use crate::stats::ProcessStats;

/// Runs records through every action that applies to the current input.
///
/// Call [`change_output`](Self::change_output) when a new input file
/// starts, then [`process`](Self::process) for each of its records.
/// Records processed before the first `change_output` go nowhere.
///
/// # Examples
///
/// ```
/// use rf_core::{ActionConfig, ActionKind, ConditionConfig, InputName, Record, RecordSink};
/// use rf_rules::{ActionProcessor, MemorySink, RuleError};
///
/// let mut config = ActionConfig::new(ActionKind::Group);
/// config.conditions.push(ConditionConfig::IsAllowed {
///     field: "FirstName".to_owned(),
///     value: "John".to_owned(),
/// });
///
/// let sink = MemorySink::new();
/// let factory_sink = sink.clone();
/// let mut processor = ActionProcessor::new(&[config], |_| {
///     Ok::<_, RuleError>(Box::new(factory_sink.clone()) as Box<dyn RecordSink>)
/// })?;
///
/// processor.change_output(&InputName::parse("in/acme_people_1.csv", "csv").unwrap());
/// processor.process(&Record::from_pairs([("FirstName", "John")]));
/// processor.process(&Record::from_pairs([("FirstName", "Jane")]));
/// processor.dispose();
///
/// assert_eq!(sink.records().len(), 1);
/// # Ok::<(), RuleError>(())
/// ```
pub struct ActionProcessor {
    actions: Vec<Action>,
    /// Indexes into `actions` that apply to the current input.
    active: Vec<usize>,
    current: Option<InputName>,
    stats: Arc<ProcessStats>,
    disposed: bool,
}

impl std::fmt::Debug for ActionProcessor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActionProcessor")
            .field("actions", &self.actions.len())
            .field("active", &self.active)
            .field("current", &self.current.as_ref().map(InputName::file_name))
            .field("disposed", &self.disposed)
            .finish_non_exhaustive()
    }
}

impl ActionProcessor {
    /// Builds one action per configuration entry, in order, asking
    /// `sink_factory` for each action's output.
    ///
    /// # Errors
    ///
    /// Returns [`RuleError::InvalidCondition`] for an invalid condition and
    /// [`RuleError::Sink`] when the factory fails. Sinks already created
    /// are disposed before returning.
    pub fn new<F, E>(configs: &[ActionConfig], mut sink_factory: F) -> Result<Self, RuleError>
    where
        F: FnMut(&ActionConfig) -> Result<Box<dyn RecordSink>, E>,
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        let mut actions = Vec::with_capacity(configs.len());
        for config in configs {
            let built = sink_factory(config)
                .map_err(|err| RuleError::sink(config.group_name.as_str(), err))
                .and_then(|sink| Action::from_config(config, sink));

            match built {
                Ok(action) => {
                    tracing::debug!(
                        kind = %action.kind(),
                        group = action.group_name(),
                        conditions = action.conditions().len(),
                        "Action configured"
                    );
                    actions.push(action);
                }
                Err(err) => {
                    for action in actions.iter_mut().rev() {
                        action.dispose();
                    }
                    return Err(err);
                }
            }
        }
        Ok(Self::from_actions(actions))
    }

    /// Wraps already-built actions.
    #[must_use]
    pub fn from_actions(actions: Vec<Action>) -> Self {
        Self {
            actions,
            active: Vec::new(),
            current: None,
            stats: Arc::new(ProcessStats::new()),
            disposed: false,
        }
    }

    /// Starts a new input file: selects the actions that apply to it,
    /// points their outputs at it, and resets their conditions.
    ///
    /// Returns the number of actions that apply.
    pub fn change_output(&mut self, input: &InputName) -> usize {
        self.stats.increment_files_started();
        self.active.clear();
        for (index, action) in self.actions.iter_mut().enumerate() {
            if action.applies_to(input) {
                action.change_output(input);
                self.active.push(index);
            }
        }

        tracing::debug!(
            input = input.file_name(),
            customer = input.customer(),
            record_type = input.record_type(),
            actions = self.active.len(),
            "Output changed"
        );
        if self.active.is_empty() {
            tracing::info!(input = input.file_name(), "No action applies to input");
        }

        self.current = Some(input.clone());
        self.active.len()
    }

    /// Runs `record` through the actions of the current input, in
    /// configuration order. Returns how many actions forwarded it.
    pub fn process(&mut self, record: &Record) -> usize {
        self.stats.increment_records_evaluated();
        let mut forwarded = 0;
        for &index in &self.active {
            if self.actions[index].process(record) {
                forwarded += 1;
            }
        }
        self.stats.add_records_forwarded(forwarded as u64);
        forwarded
    }

    /// Processes every record of `records`. Returns the number processed.
    pub fn process_all<I>(&mut self, records: I) -> usize
    where
        I: IntoIterator<Item = Record>,
    {
        let mut processed = 0;
        for record in records {
            self.process(&record);
            processed += 1;
        }
        processed
    }

    /// Disposes every action in reverse configuration order. Further calls
    /// do nothing.
    pub fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        self.disposed = true;
        for action in self.actions.iter_mut().rev() {
            action.dispose();
        }
        self.active.clear();
        tracing::debug!(actions = self.actions.len(), "Actions disposed");
    }

    /// The configured actions.
    #[inline]
    #[must_use]
    pub fn actions(&self) -> &[Action] {
        &self.actions
    }

    /// The actions that apply to the current input.
    pub fn active_actions(&self) -> impl Iterator<Item = &Action> {
        self.active.iter().map(|&index| &self.actions[index])
    }

    /// The input file currently being processed.
    #[inline]
    #[must_use]
    pub fn current_input(&self) -> Option<&InputName> {
        self.current.as_ref()
    }

    /// The processing counters.
    #[inline]
    #[must_use]
    pub fn stats(&self) -> &Arc<ProcessStats> {
        &self.stats
    }

    /// Returns `true` once [`dispose`](Self::dispose) has run.
    #[inline]
    #[must_use]
    pub fn is_disposed(&self) -> bool {
        self.disposed
    }
}

impl Drop for ActionProcessor {
    fn drop(&mut self) {
        self.dispose();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemorySink;
    use parking_lot::Mutex;
    use rf_core::{ActionKind, ConditionConfig};

    fn input(name: &str) -> InputName {
        InputName::parse(format!("in/{name}"), "csv").unwrap()
    }

    fn person(first: &str, age: &str) -> Record {
        Record::from_lines("FirstName,Age", &format!("{first},{age}")).unwrap()
    }

    /// Builds a processor whose sinks are returned, in config order.
    fn build(configs: &[ActionConfig]) -> (ActionProcessor, Vec<MemorySink>) {
        let mut sinks = Vec::new();
        let processor = ActionProcessor::new(configs, |_| {
            let sink = MemorySink::new();
            sinks.push(sink.clone());
            Ok::<_, RuleError>(Box::new(sink) as Box<dyn RecordSink>)
        })
        .unwrap();
        (processor, sinks)
    }

    fn adults_named_john() -> ActionConfig {
        let mut config = ActionConfig::new(ActionKind::Group);
        config.group_name = "Adults".to_owned();
        config.conditions = vec![
            ConditionConfig::IsAllowed {
                field: "FirstName".to_owned(),
                value: "John".to_owned(),
            },
            ConditionConfig::IsInRange {
                field: "Age".to_owned(),
                range_start: 18,
                range_end: 100,
            },
        ];
        config
    }

    #[test]
    fn test_group_by_name_and_age() {
        let (mut processor, sinks) = build(&[adults_named_john()]);

        processor.change_output(&input("acme_people_20240101.csv"));
        let forwarded: Vec<usize> = [
            person("John", "32"),
            person("Jane", "40"),
            person("John", "12"),
            person("John", "18"),
        ]
        .iter()
        .map(|record| processor.process(record))
        .collect();
        processor.dispose();

        assert_eq!(forwarded, [1, 0, 0, 1]);
        assert_eq!(
            sinks[0].records(),
            vec![person("John", "32"), person("John", "18")]
        );
        assert!(sinks[0].is_disposed());
    }

    #[test]
    fn test_remove_keeps_the_rest() {
        let mut config = adults_named_john();
        config.kind = ActionKind::Remove;
        let (mut processor, sinks) = build(&[config]);

        processor.change_output(&input("acme_people_1.csv"));
        processor.process_all([person("John", "32"), person("Jane", "40")]);

        assert_eq!(sinks[0].records(), vec![person("Jane", "40")]);
    }

    #[test]
    fn test_duplicates_scoped_per_input() {
        let mut config = ActionConfig::new(ActionKind::Group);
        config.group_name = "Repeats".to_owned();
        config.conditions = vec![ConditionConfig::IsDuplicate {
            field: "FirstName".to_owned(),
        }];
        let (mut processor, sinks) = build(&[config]);

        processor.change_output(&input("acme_people_1.csv"));
        processor.process_all([person("John", "1"), person("John", "2"), person("Jane", "3")]);
        processor.change_output(&input("acme_people_2.csv"));
        processor.process_all([person("John", "4")]);

        assert_eq!(
            sinks[0].records_for("acme_people_1.csv"),
            vec![person("John", "2")]
        );
        assert!(sinks[0].records_for("acme_people_2.csv").is_empty());
    }

    #[test]
    fn test_only_applicable_actions_run() {
        let mut acme = ActionConfig::new(ActionKind::Group);
        acme.customer = "acme".to_owned();
        let mut orders = ActionConfig::new(ActionKind::Group);
        orders.input_record_type = "orders".to_owned();
        let everyone = ActionConfig::new(ActionKind::Group);
        let (mut processor, sinks) = build(&[acme, orders, everyone]);

        assert_eq!(processor.change_output(&input("acme_people_1.csv")), 2);
        processor.process(&person("John", "1"));
        assert_eq!(processor.change_output(&input("globex_orders_1.csv")), 2);
        processor.process(&person("Jane", "2"));

        assert_eq!(sinks[0].records(), vec![person("John", "1")]);
        assert_eq!(sinks[1].records(), vec![person("Jane", "2")]);
        assert_eq!(sinks[2].records().len(), 2);
        assert_eq!(sinks[0].destinations().len(), 1);
        assert_eq!(sinks[2].destinations().len(), 2);
    }

    #[test]
    fn test_records_before_change_output_go_nowhere() {
        let (mut processor, sinks) = build(&[ActionConfig::new(ActionKind::Group)]);
        assert_eq!(processor.process(&person("John", "1")), 0);
        assert!(sinks[0].records().is_empty());
        assert!(processor.current_input().is_none());
    }

    #[test]
    fn test_stats_track_processing() {
        let (mut processor, _sinks) = build(&[
            ActionConfig::new(ActionKind::Group),
            ActionConfig::new(ActionKind::Group),
        ]);
        processor.change_output(&input("acme_people_1.csv"));
        processor.process_all([person("A", "1"), person("B", "2")]);

        let snap = processor.stats().snapshot();
        assert_eq!(snap.files_started, 1);
        assert_eq!(snap.records_evaluated, 2);
        assert_eq!(snap.records_forwarded, 4);
    }

    /// Logs every dispose so ordering can be checked.
    struct OrderedSink {
        name: String,
        log: Arc<Mutex<Vec<String>>>,
    }

    impl RecordSink for OrderedSink {
        fn change_destination(&mut self, _input: &InputName) {}
        fn add_record(&mut self, _record: Record) {}
        fn dispose(&mut self) {
            self.log.lock().push(self.name.clone());
        }
    }

    fn named(group: &str) -> ActionConfig {
        let mut config = ActionConfig::new(ActionKind::Group);
        config.group_name = group.to_owned();
        config
    }

    #[test]
    fn test_dispose_runs_in_reverse_order_once() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut processor = ActionProcessor::new(&[named("a"), named("b"), named("c")], |config| {
            Ok::<_, RuleError>(Box::new(OrderedSink {
                name: config.group_name.clone(),
                log: Arc::clone(&log),
            }) as Box<dyn RecordSink>)
        })
        .unwrap();

        processor.dispose();
        processor.dispose();
        drop(processor);

        assert_eq!(*log.lock(), ["c", "b", "a"]);
    }

    #[test]
    fn test_factory_failure_disposes_built_sinks() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let result = ActionProcessor::new(&[named("a"), named("b")], |config| {
            if config.group_name == "b" {
                return Err(std::io::Error::other("disk full"));
            }
            Ok(Box::new(OrderedSink {
                name: config.group_name.clone(),
                log: Arc::clone(&log),
            }) as Box<dyn RecordSink>)
        });

        match result {
            Err(RuleError::Sink { group, .. }) => assert_eq!(group, "b"),
            other => panic!("expected sink error, got {other:?}"),
        }
        assert_eq!(*log.lock(), ["a"]);
    }
}
