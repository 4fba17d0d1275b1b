//! Record conditions.
//!
//! A [`Condition`] answers one yes/no question about a record. Conditions
//! are built from [`ConditionConfig`] by [`Condition::from_config`], the
//! single place that maps configured condition types to implementations.
//!
//! | type           | met when                                                  |
//! |----------------|-----------------------------------------------------------|
//! | `allInclusive` | always                                                    |
//! | `isAllowed`    | the field exists and its value is one of the listed values |
//! | `isInRange`    | the field, read as an integer, lies in the inclusive range |
//! | `isDuplicate`  | the same key fields were seen earlier in this input file   |
//!
//! A missing field never meets a condition (other than `allInclusive`).

use rf_core::{ConditionConfig, FxHashMap, FxHashSet, Record, fx_hash_map, split_list};
use smallvec::SmallVec;

use crate::error::RuleError;

/// Separator appended after each value in a duplicate key.
const KEY_SEPARATOR: char = '|';

/// Tracks which key-field combinations have been seen in the current input.
///
/// # Examples
///
/// ```
/// use rf_core::Record;
/// use rf_rules::DuplicateDetector;
///
/// let mut detector = DuplicateDetector::new(["FirstName"]).unwrap();
/// let john = Record::from_pairs([("FirstName", "John")]);
///
/// assert!(!detector.observe(&john));
/// assert!(detector.observe(&john));
/// assert_eq!(detector.seen_count(&john), 2);
///
/// detector.reset();
/// assert!(!detector.observe(&john));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DuplicateDetector {
    fields: SmallVec<[String; 4]>,
    seen: FxHashMap<String, usize>,
}

impl DuplicateDetector {
    /// Creates a detector keyed on `fields`.
    ///
    /// # Errors
    ///
    /// Returns [`RuleError::InvalidCondition`] when no field is given.
    pub fn new<I, S>(fields: I) -> Result<Self, RuleError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let fields: SmallVec<[String; 4]> = fields.into_iter().map(Into::into).collect();
        if fields.is_empty() {
            return Err(RuleError::invalid_condition(
                "isDuplicate",
                "at least one field is required",
            ));
        }
        Ok(Self {
            fields,
            seen: fx_hash_map(),
        })
    }

    /// Builds the key of `record`: each key field present on the record,
    /// followed by `|`. Absent fields contribute nothing.
    #[must_use]
    pub fn key(&self, record: &Record) -> String {
        let mut key = String::new();
        for value in self.fields.iter().filter_map(|field| record.get(field)) {
            key.push_str(value);
            key.push(KEY_SEPARATOR);
        }
        key
    }

    /// Records one occurrence of `record`'s key. Returns `true` if the key
    /// had been seen before.
    pub fn observe(&mut self, record: &Record) -> bool {
        let count = self.seen.entry(self.key(record)).or_insert(0);
        *count += 1;
        *count > 1
    }

    /// How often `record`'s key has been observed since the last reset.
    #[must_use]
    pub fn seen_count(&self, record: &Record) -> usize {
        self.seen.get(&self.key(record)).copied().unwrap_or(0)
    }

    /// Number of distinct keys seen since the last reset.
    #[must_use]
    pub fn distinct_keys(&self) -> usize {
        self.seen.len()
    }

    /// The key fields.
    #[must_use]
    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    /// Forgets every key.
    pub fn reset(&mut self) {
        self.seen.clear();
    }
}

/// One boolean test applied to each record.
///
/// # Examples
///
/// ```
/// use rf_core::{ConditionConfig, Record};
/// use rf_rules::Condition;
///
/// let config = ConditionConfig::IsInRange {
///     field: "Age".to_owned(),
///     range_start: 18,
///     range_end: 100,
/// };
/// let mut adult = Condition::from_config(&config).unwrap();
///
/// assert!(adult.is_met(&Record::from_pairs([("Age", "32")])));
/// assert!(!adult.is_met(&Record::from_pairs([("Age", "12")])));
/// assert!(!adult.is_met(&Record::from_pairs([("Name", "John")])));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Condition {
    /// Always met.
    AllInclusive,
    /// Met when the field's value is one of `values` (exact match).
    Allowed {
        /// Field to inspect.
        field: String,
        /// Accepted values.
        values: FxHashSet<String>,
    },
    /// Met when the field's integer value lies in `start..=end`.
    Ranged {
        /// Field to inspect.
        field: String,
        /// Inclusive lower bound.
        start: i64,
        /// Inclusive upper bound.
        end: i64,
    },
    /// Met when the record's key fields repeat an earlier record of the
    /// same input.
    Duplicate(DuplicateDetector),
}

impl Condition {
    /// Builds a condition from its configuration.
    ///
    /// # Errors
    ///
    /// Returns [`RuleError::InvalidCondition`] for an empty field, an empty
    /// value list, or a range whose start is greater than its end.
    pub fn from_config(config: &ConditionConfig) -> Result<Self, RuleError> {
        match config {
            ConditionConfig::AllInclusive { .. } => Ok(Self::AllInclusive),
            ConditionConfig::IsAllowed { field, value } => {
                Self::allowed(field.as_str(), value.split(','))
            }
            ConditionConfig::IsInRange {
                field,
                range_start,
                range_end,
            } => Self::ranged(field.as_str(), *range_start, *range_end),
            ConditionConfig::IsDuplicate { field } => {
                Ok(Self::Duplicate(DuplicateDetector::new(split_list(field))?))
            }
        }
    }

    /// Creates an [`Allowed`](Self::Allowed) condition.
    ///
    /// # Errors
    ///
    /// Returns [`RuleError::InvalidCondition`] when the field is empty or
    /// every value is empty.
    pub fn allowed<I, S>(field: impl Into<String>, values: I) -> Result<Self, RuleError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let field = required_field("isAllowed", field.into())?;
        let values: FxHashSet<String> = values.into_iter().map(Into::into).collect();
        if values.iter().all(String::is_empty) {
            return Err(RuleError::invalid_condition(
                "isAllowed",
                format!("no allowed values given for field '{field}'"),
            ));
        }
        Ok(Self::Allowed { field, values })
    }

    /// Creates a [`Ranged`](Self::Ranged) condition.
    ///
    /// # Errors
    ///
    /// Returns [`RuleError::InvalidCondition`] when the field is empty or
    /// `start > end`.
    pub fn ranged(field: impl Into<String>, start: i64, end: i64) -> Result<Self, RuleError> {
        let field = required_field("isInRange", field.into())?;
        if start > end {
            return Err(RuleError::invalid_condition(
                "isInRange",
                format!("rangeStart {start} is greater than rangeEnd {end}"),
            ));
        }
        Ok(Self::Ranged { field, start, end })
    }

    /// Creates a [`Duplicate`](Self::Duplicate) condition keyed on `fields`.
    ///
    /// # Errors
    ///
    /// Returns [`RuleError::InvalidCondition`] when no field is given.
    pub fn duplicate<I, S>(fields: I) -> Result<Self, RuleError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Ok(Self::Duplicate(DuplicateDetector::new(fields)?))
    }

    /// Evaluates the condition against `record`.
    ///
    /// Only [`Duplicate`](Self::Duplicate) mutates state: it records the
    /// record's key.
    pub fn is_met(&mut self, record: &Record) -> bool {
        match self {
            Self::AllInclusive => true,
            Self::Allowed { field, values } => {
                record.get(field).is_some_and(|value| values.contains(value))
            }
            Self::Ranged { field, start, end } => record
                .get(field)
                .and_then(parse_number)
                .is_some_and(|number| (*start..=*end).contains(&number)),
            Self::Duplicate(detector) => detector.observe(record),
        }
    }

    /// Clears history scoped to one input file.
    pub fn reset(&mut self) {
        if let Self::Duplicate(detector) = self {
            detector.reset();
        }
    }

    /// Returns `true` if evaluation depends on earlier records.
    #[must_use]
    pub const fn is_stateful(&self) -> bool {
        matches!(self, Self::Duplicate(_))
    }

    /// Configuration name of this condition type.
    #[must_use]
    pub const fn type_name(&self) -> &'static str {
        match self {
            Self::AllInclusive => "allInclusive",
            Self::Allowed { .. } => "isAllowed",
            Self::Ranged { .. } => "isInRange",
            Self::Duplicate(_) => "isDuplicate",
        }
    }
}

fn required_field(condition: &'static str, field: String) -> Result<String, RuleError> {
    if field.trim().is_empty() {
        return Err(RuleError::invalid_condition(condition, "field must not be empty"));
    }
    Ok(field)
}

/// Reads a field value as an integer. Values that do not parse as a whole
/// are reduced to their ASCII digits (so `"$1,200"` reads as `1200`).
fn parse_number(value: &str) -> Option<i64> {
    value.parse().ok().or_else(|| {
        let digits: String = value.chars().filter(char::is_ascii_digit).collect();
        digits.parse().ok()
    })
}
