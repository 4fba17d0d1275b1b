//! Actions: a group of conditions bound to one output.
//!
//! An [`Action`] evaluates its conditions against every record of the
//! inputs it applies to and forwards the record to its [`RecordSink`]:
//!
//! - [`ActionKind::Group`] forwards records that meet every condition
//! - [`ActionKind::Remove`] forwards records that fail at least one
//!
//! Conditions are evaluated in order and evaluation stops at the first
//! condition that is not met, so a later stateful condition (such as
//! `isDuplicate`) only sees records that passed the earlier ones.

use rf_core::{ActionConfig, ActionKind, InputName, Record, RecordSink, split_list};
use smallvec::SmallVec;

use crate::condition::Condition;
use crate::error::RuleError;

/// Which inputs an action applies to, by customer and record type.
///
/// An empty list matches every value.
///
/// # Examples
///
/// ```
/// use rf_rules::Applicability;
///
/// let only_acme = Applicability::new(["acme"], Vec::<String>::new());
/// assert!(only_acme.applies_to("acme", "people"));
/// assert!(!only_acme.applies_to("globex", "people"));
///
/// assert!(Applicability::all().applies_to("anyone", "anything"));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Applicability {
    customers: SmallVec<[String; 4]>,
    record_types: SmallVec<[String; 4]>,
}

impl Applicability {
    /// Creates an applicability restricted to the given values.
    pub fn new<C, R>(customers: C, record_types: R) -> Self
    where
        C: IntoIterator,
        C::Item: Into<String>,
        R: IntoIterator,
        R::Item: Into<String>,
    {
        Self {
            customers: customers.into_iter().map(Into::into).collect(),
            record_types: record_types.into_iter().map(Into::into).collect(),
        }
    }

    /// Matches every input.
    #[must_use]
    pub fn all() -> Self {
        Self::default()
    }

    /// Reads the comma-separated `customer` and `inputRecordType` settings.
    #[must_use]
    pub fn from_config(config: &ActionConfig) -> Self {
        Self::new(split_list(&config.customer), split_list(&config.input_record_type))
    }

    /// Returns `true` if both lists admit the given values.
    #[must_use]
    pub fn applies_to(&self, customer: &str, record_type: &str) -> bool {
        admits(&self.customers, customer) && admits(&self.record_types, record_type)
    }

    /// Returns `true` if this applicability admits `input`.
    #[inline]
    #[must_use]
    pub fn applies_to_input(&self, input: &InputName) -> bool {
        self.applies_to(input.customer(), input.record_type())
    }
}

fn admits(list: &[String], value: &str) -> bool {
    list.is_empty() || list.iter().any(|entry| entry == value)
}

/// A configured action with its conditions and output.
pub struct Action {
    kind: ActionKind,
    group_name: String,
    applicability: Applicability,
    conditions: SmallVec<[Condition; 4]>,
    sink: Box<dyn RecordSink>,
}

impl std::fmt::Debug for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Action")
            .field("kind", &self.kind)
            .field("group_name", &self.group_name)
            .field("applicability", &self.applicability)
            .field("conditions", &self.conditions)
            .finish_non_exhaustive()
    }
}

impl Action {
    /// Creates an action from its parts.
    pub fn new(
        kind: ActionKind,
        group_name: impl Into<String>,
        applicability: Applicability,
        conditions: impl IntoIterator<Item = Condition>,
        sink: Box<dyn RecordSink>,
    ) -> Self {
        Self {
            kind,
            group_name: group_name.into(),
            applicability,
            conditions: conditions.into_iter().collect(),
            sink,
        }
    }

    /// Builds an action from configuration, writing to `sink`.
    ///
    /// # Errors
    ///
    /// Returns [`RuleError::InvalidCondition`] if any condition is invalid.
    pub fn from_config(config: &ActionConfig, sink: Box<dyn RecordSink>) -> Result<Self, RuleError> {
        let conditions = config
            .conditions
            .iter()
            .map(Condition::from_config)
            .collect::<Result<SmallVec<[Condition; 4]>, _>>()?;

        Ok(Self::new(
            config.kind,
            config.group_name.as_str(),
            Applicability::from_config(config),
            conditions,
            sink,
        ))
    }

    /// The action kind.
    #[inline]
    #[must_use]
    pub const fn kind(&self) -> ActionKind {
        self.kind
    }

    /// The group name used in output file names.
    #[inline]
    #[must_use]
    pub fn group_name(&self) -> &str {
        &self.group_name
    }

    /// Which inputs the action applies to.
    #[inline]
    #[must_use]
    pub fn applicability(&self) -> &Applicability {
        &self.applicability
    }

    /// The action's conditions, in evaluation order.
    #[inline]
    #[must_use]
    pub fn conditions(&self) -> &[Condition] {
        &self.conditions
    }

    /// Returns `true` if the action applies to `input`.
    #[inline]
    #[must_use]
    pub fn applies_to(&self, input: &InputName) -> bool {
        self.applicability.applies_to_input(input)
    }

    /// Evaluates the conditions in order, stopping at the first one that
    /// is not met. An action without conditions is always met.
    pub fn conditions_met(&mut self, record: &Record) -> bool {
        self.conditions
            .iter_mut()
            .all(|condition| condition.is_met(record))
    }

    /// Evaluates `record` and forwards it to the sink if the action kind
    /// selects it. Returns `true` if the record was forwarded.
    pub fn process(&mut self, record: &Record) -> bool {
        let met = self.conditions_met(record);
        let forward = match self.kind {
            ActionKind::Group => met,
            ActionKind::Remove => !met,
        };
        if forward {
            self.sink.add_record(record.clone());
        }
        forward
    }

    /// Points the output at the file derived from `input` and clears
    /// per-input condition history.
    pub fn change_output(&mut self, input: &InputName) {
        self.sink.change_destination(input);
        for condition in &mut self.conditions {
            condition.reset();
        }
    }

    /// Flushes and releases the output.
    pub fn dispose(&mut self) {
        self.sink.dispose();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemorySink;
    use rf_core::ConditionConfig;

    fn input(name: &str) -> InputName {
        InputName::parse(format!("in/{name}"), "csv").unwrap()
    }

    fn person(first: &str, age: &str) -> Record {
        Record::from_pairs([("FirstName", first), ("Age", age)])
    }

    #[test]
    fn test_applicability_lists() {
        let applicability = Applicability::new(["acme", "globex"], ["people"]);
        assert!(applicability.applies_to("acme", "people"));
        assert!(applicability.applies_to("globex", "people"));
        assert!(!applicability.applies_to("acme", "orders"));
        assert!(!applicability.applies_to("initech", "people"));
        assert!(applicability.applies_to_input(&input("acme_people_1.csv")));
    }

    #[test]
    fn test_applicability_from_config_trims_entries() {
        let mut config = ActionConfig::new(ActionKind::Group);
        config.customer = " acme , globex ".to_owned();
        let applicability = Applicability::from_config(&config);
        assert!(applicability.applies_to("globex", "anything"));
        assert!(!applicability.applies_to("initech", "anything"));
    }

    #[test]
    fn test_group_and_remove_are_complements() {
        let sample = [person("John", "32"), person("Jane", "12"), person("Bob", "40")];
        let adult = || Condition::ranged("Age", 18, 100).unwrap();

        let grouped = MemorySink::new();
        let removed = MemorySink::new();
        let mut group = Action::new(
            ActionKind::Group,
            "Adults",
            Applicability::all(),
            [adult()],
            Box::new(grouped.clone()),
        );
        let mut remove = Action::new(
            ActionKind::Remove,
            "Minors",
            Applicability::all(),
            [adult()],
            Box::new(removed.clone()),
        );

        for record in &sample {
            assert_ne!(group.process(record), remove.process(record));
        }
        assert_eq!(grouped.records().len(), 2);
        assert_eq!(removed.records(), vec![person("Jane", "12")]);
    }

    #[test]
    fn test_no_conditions_forwards_everything_for_group() {
        let sink = MemorySink::new();
        let mut action = Action::new(
            ActionKind::Group,
            "All",
            Applicability::all(),
            [],
            Box::new(sink.clone()),
        );
        assert!(action.process(&person("John", "1")));
        assert_eq!(sink.records().len(), 1);
    }

    #[test]
    fn test_later_conditions_skipped_after_failure() {
        let mut action = Action::new(
            ActionKind::Group,
            "Adults",
            Applicability::all(),
            [
                Condition::ranged("Age", 18, 100).unwrap(),
                Condition::duplicate(["FirstName"]).unwrap(),
            ],
            Box::new(MemorySink::new()),
        );

        // The minor never reaches the duplicate check.
        assert!(!action.process(&person("John", "12")));
        assert!(!action.process(&person("John", "32")));
        assert!(action.process(&person("John", "33")));
    }

    #[test]
    fn test_change_output_resets_conditions() {
        let sink = MemorySink::new();
        let mut action = Action::new(
            ActionKind::Group,
            "Repeats",
            Applicability::all(),
            [Condition::duplicate(["FirstName"]).unwrap()],
            Box::new(sink.clone()),
        );

        action.change_output(&input("acme_people_1.csv"));
        assert!(!action.process(&person("John", "1")));
        assert!(action.process(&person("John", "1")));

        action.change_output(&input("acme_people_2.csv"));
        assert!(!action.process(&person("John", "1")));

        assert_eq!(sink.destinations().len(), 2);
        assert_eq!(sink.records_for("acme_people_1.csv").len(), 1);
        assert!(sink.records_for("acme_people_2.csv").is_empty());
    }

    #[test]
    fn test_from_config_rejects_invalid_condition() {
        let mut config = ActionConfig::new(ActionKind::Group);
        config.conditions.push(ConditionConfig::IsInRange {
            field: "Age".to_owned(),
            range_start: 10,
            range_end: 1,
        });
        let result = Action::from_config(&config, Box::new(MemorySink::new()));
        assert!(matches!(result, Err(RuleError::InvalidCondition { .. })));
    }

    #[test]
    fn test_dispose_reaches_sink() {
        let sink = MemorySink::new();
        let mut action = Action::new(
            ActionKind::Remove,
            "X",
            Applicability::all(),
            [],
            Box::new(sink.clone()),
        );
        action.dispose();
        assert!(sink.is_disposed());
    }
}
