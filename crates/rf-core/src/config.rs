//! Configuration structures for the record-filter service.
//!
//! - [`WatchConfig`] - Input directory watching (debounce, extension)
//! - [`ReaderConfig`] - Chunk size and open/read retry policy
//! - [`OutputConfig`] - Buffered writer flush interval
//! - [`ActionConfig`] / [`ConditionConfig`] - The ordered rule list
//! - [`Config`] - Root configuration, loaded from JSON
//!
//! Keys are camelCase in the JSON file. Every section except `actions`
//! falls back to its [`Default`] when omitted.

use std::time::Duration;

use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Group name used when an action does not configure one.
pub const DEFAULT_GROUP_NAME: &str = "Default";

/// Configuration for the input directory crawler.
///
/// # Examples
///
/// ```
/// use rf_core::WatchConfig;
///
/// let config = WatchConfig::default();
/// assert_eq!(config.debounce_ms, 50);
/// assert_eq!(config.extension, "csv");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct WatchConfig {
    /// Quiet period after the last file event before a notice is sent.
    pub debounce_ms: u64,

    /// Input file extension, without the leading dot. Matched
    /// case-insensitively.
    pub extension: String,
}

impl WatchConfig {
    /// The debounce window as a [`Duration`].
    #[inline]
    #[must_use]
    pub const fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            debounce_ms: 50,
            extension: "csv".to_owned(),
        }
    }
}

/// Configuration for the record reader.
///
/// # Examples
///
/// ```
/// use rf_core::ReaderConfig;
///
/// let config = ReaderConfig::default();
/// assert_eq!(config.chunk_size, 100);
/// assert_eq!(config.max_attempts, 5);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ReaderConfig {
    /// Number of lines pulled from the file per chunk.
    pub chunk_size: usize,

    /// Attempts made to open the file and read its header.
    pub max_attempts: u32,

    /// Pause between attempts, in milliseconds.
    pub retry_delay_ms: u64,
}

impl ReaderConfig {
    /// The pause between attempts as a [`Duration`].
    #[inline]
    #[must_use]
    pub const fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            chunk_size: 100,
            max_attempts: 5,
            retry_delay_ms: 10,
        }
    }
}

/// Configuration for the buffered writers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct OutputConfig {
    /// Period of each writer's flush ticker, in milliseconds.
    pub flush_interval_ms: u64,

    /// Buffer records and write them on the ticker. When `false`, every
    /// record is written as it arrives.
    pub buffer_output: bool,
}

impl OutputConfig {
    /// The flush period as a [`Duration`].
    #[inline]
    #[must_use]
    pub const fn flush_interval(&self) -> Duration {
        Duration::from_millis(self.flush_interval_ms)
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            flush_interval_ms: 50,
            buffer_output: true,
        }
    }
}

/// What an action does with the records its conditions select.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ActionKind {
    /// Forward records for which every condition is met.
    Group,
    /// Forward records for which at least one condition is not met.
    Remove,
}

impl ActionKind {
    /// Returns the configuration name of this kind.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Group => "group",
            Self::Remove => "remove",
        }
    }
}

impl std::fmt::Display for ActionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One configured condition, tagged by `type`.
///
/// ```
/// use rf_core::ConditionConfig;
///
/// let json = r#"{ "type": "isInRange", "field": "Age", "rangeStart": 18, "rangeEnd": 100 }"#;
/// let condition: ConditionConfig = serde_json::from_str(json).unwrap();
/// assert_eq!(condition.type_name(), "isInRange");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum ConditionConfig {
    /// Field value must be one of the comma-separated values.
    IsAllowed {
        /// Field to inspect.
        field: String,
        /// Comma-separated allowed values.
        value: String,
    },
    /// Record is a repeat of an earlier record in the same input file,
    /// compared on the comma-separated fields.
    IsDuplicate {
        /// Comma-separated key fields.
        field: String,
    },
    /// Field value, read as an integer, lies in `rangeStart..=rangeEnd`.
    IsInRange {
        /// Field to inspect.
        field: String,
        /// Inclusive lower bound.
        range_start: i64,
        /// Inclusive upper bound.
        range_end: i64,
    },
    /// Always met.
    AllInclusive {
        /// Ignored.
        #[serde(default)]
        field: Option<String>,
    },
}

impl ConditionConfig {
    /// Returns the configuration name of this condition type.
    #[must_use]
    pub const fn type_name(&self) -> &'static str {
        match self {
            Self::IsAllowed { .. } => "isAllowed",
            Self::IsDuplicate { .. } => "isDuplicate",
            Self::IsInRange { .. } => "isInRange",
            Self::AllInclusive { .. } => "allInclusive",
        }
    }
}

fn default_group_name() -> String {
    DEFAULT_GROUP_NAME.to_owned()
}

/// One configured action.
///
/// `customer` and `inputRecordType` are comma-separated lists; an empty list
/// applies the action to every input for that dimension.
///
/// # Examples
///
/// ```
/// use rf_core::{ActionConfig, ActionKind};
///
/// let json = r#"{ "type": "remove", "customer": "acme, globex" }"#;
/// let action: ActionConfig = serde_json::from_str(json).unwrap();
/// assert_eq!(action.kind, ActionKind::Remove);
/// assert_eq!(action.group_name, "Default");
/// assert_eq!(action.customers(), vec!["acme", "globex"]);
/// assert!(action.record_types().is_empty());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionConfig {
    /// Group or remove.
    #[serde(rename = "type")]
    pub kind: ActionKind,

    /// Suffix used in output file names.
    #[serde(default = "default_group_name")]
    pub group_name: String,

    /// Comma-separated customers this action applies to.
    #[serde(default)]
    pub customer: String,

    /// Comma-separated record types this action applies to.
    #[serde(default)]
    pub input_record_type: String,

    /// Conditions, evaluated in order.
    #[serde(default)]
    pub conditions: Vec<ConditionConfig>,
}

impl ActionConfig {
    /// Creates an action with the default group and no filters.
    #[must_use]
    pub fn new(kind: ActionKind) -> Self {
        Self {
            kind,
            group_name: default_group_name(),
            customer: String::new(),
            input_record_type: String::new(),
            conditions: Vec::new(),
        }
    }

    /// Customers this action is restricted to.
    #[must_use]
    pub fn customers(&self) -> Vec<&str> {
        split_list(&self.customer)
    }

    /// Record types this action is restricted to.
    #[must_use]
    pub fn record_types(&self) -> Vec<&str> {
        split_list(&self.input_record_type)
    }
}

/// Splits a comma-separated list, trimming entries and dropping empty ones.
#[must_use]
pub fn split_list(list: &str) -> Vec<&str> {
    list.split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .collect()
}

/// Root configuration for the record-filter service.
///
/// # Examples
///
/// ```
/// use rf_core::Config;
///
/// let json = r#"{
///     "inputFolder": "/data/in",
///     "outputFolder": "/data/out",
///     "actions": [ { "type": "group", "conditions": [ { "type": "allInclusive" } ] } ]
/// }"#;
/// let config: Config = serde_json::from_str(json).unwrap();
/// assert_eq!(config.actions.len(), 1);
/// assert_eq!(config.watch.debounce_ms, 50);
/// assert!(config.log_folder.is_none());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Config {
    /// Directory watched for input files.
    pub input_folder: Utf8PathBuf,

    /// Directory output files are written to.
    pub output_folder: Utf8PathBuf,

    /// Directory for the rolling log file, if any.
    pub log_folder: Option<Utf8PathBuf>,

    /// Crawler configuration.
    pub watch: WatchConfig,

    /// Reader configuration.
    pub reader: ReaderConfig,

    /// Writer configuration.
    pub output: OutputConfig,

    /// Ordered action list.
    pub actions: Vec<ActionConfig>,
}

impl Config {
    /// Reads and parses a JSON configuration file.
    ///
    /// The result is not validated; call [`Config::validate`] once any
    /// command-line overrides have been applied.
    pub fn load(path: &Utf8Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }

    /// Checks the settings that must hold before the service starts.
    ///
    /// Condition-level checks (empty fields, inverted ranges) happen when
    /// the rules are built.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.input_folder.as_str().is_empty() {
            return Err(ConfigError::invalid_option("inputFolder", "must be set"));
        }
        if self.output_folder.as_str().is_empty() {
            return Err(ConfigError::invalid_option("outputFolder", "must be set"));
        }
        if !self.input_folder.is_dir() {
            return Err(ConfigError::MissingDirectory(self.input_folder.clone()));
        }
        if let Some(log_folder) = &self.log_folder {
            if log_folder.as_str().is_empty() {
                return Err(ConfigError::InvalidPath {
                    path: log_folder.clone(),
                    reason: "path is empty".to_owned(),
                });
            }
        }
        if self.watch.extension.trim_start_matches('.').is_empty() {
            return Err(ConfigError::invalid_option("watch.extension", "must not be empty"));
        }
        if self.reader.chunk_size == 0 {
            return Err(ConfigError::invalid_option("reader.chunkSize", "must be positive"));
        }
        if self.reader.max_attempts == 0 {
            return Err(ConfigError::invalid_option("reader.maxAttempts", "must be positive"));
        }
        if self.output.flush_interval_ms == 0 {
            return Err(ConfigError::invalid_option(
                "output.flushIntervalMs",
                "must be positive",
            ));
        }
        if self.actions.is_empty() {
            return Err(ConfigError::invalid_option("actions", "at least one action is required"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_config(input: &Utf8Path) -> Config {
        Config {
            input_folder: input.to_owned(),
            output_folder: input.join("out"),
            actions: vec![ActionConfig::new(ActionKind::Group)],
            ..Config::default()
        }
    }

    #[test]
    fn test_section_defaults() {
        let config = Config::default();
        assert_eq!(config.watch.debounce_ms, 50);
        assert_eq!(config.reader.chunk_size, 100);
        assert_eq!(config.reader.max_attempts, 5);
        assert_eq!(config.reader.retry_delay(), Duration::from_millis(10));
        assert_eq!(config.output.flush_interval(), Duration::from_millis(50));
    }

    #[test]
    fn test_full_document() {
        let json = r#"{
            "inputFolder": "/data/in",
            "outputFolder": "/data/out",
            "logFolder": "/data/log",
            "watch": { "debounceMs": 20 },
            "reader": { "chunkSize": 10 },
            "actions": [
                { "type": "group", "groupName": "Adults", "customer": "acme",
                  "inputRecordType": "people",
                  "conditions": [
                    { "type": "isAllowed", "field": "FirstName", "value": "John" },
                    { "type": "isInRange", "field": "Age", "rangeStart": 18, "rangeEnd": 100 },
                    { "type": "isDuplicate", "field": "FirstName,LastName" },
                    { "type": "allInclusive" }
                  ] }
            ]
        }"#;
        let config: Config = serde_json::from_str(json).unwrap();
        assert_eq!(config.log_folder.as_deref(), Some(Utf8Path::new("/data/log")));
        assert_eq!(config.watch.debounce_ms, 20);
        assert_eq!(config.watch.extension, "csv");
        assert_eq!(config.reader.chunk_size, 10);
        assert_eq!(config.reader.max_attempts, 5);

        let action = &config.actions[0];
        assert_eq!(action.kind, ActionKind::Group);
        assert_eq!(action.group_name, "Adults");
        assert_eq!(action.customers(), vec!["acme"]);
        assert_eq!(action.conditions.len(), 4);
        assert_eq!(
            action.conditions[1],
            ConditionConfig::IsInRange {
                field: "Age".to_owned(),
                range_start: 18,
                range_end: 100,
            }
        );
        assert_eq!(action.conditions[3], ConditionConfig::AllInclusive { field: None });
    }

    #[test]
    fn test_unknown_action_type_is_rejected() {
        let json = r#"{ "actions": [ { "type": "archive" } ] }"#;
        assert!(serde_json::from_str::<Config>(json).is_err());
    }

    #[test]
    fn test_missing_action_type_is_rejected() {
        let json = r#"{ "actions": [ { "groupName": "x" } ] }"#;
        assert!(serde_json::from_str::<Config>(json).is_err());
    }

    #[test]
    fn test_unknown_condition_type_is_rejected() {
        let json = r#"{ "actions": [ { "type": "group",
            "conditions": [ { "type": "isSpecial", "field": "A" } ] } ] }"#;
        assert!(serde_json::from_str::<Config>(json).is_err());
    }

    #[test]
    fn test_split_list() {
        assert_eq!(split_list(" a, b ,,c "), vec!["a", "b", "c"]);
        assert!(split_list("").is_empty());
        assert!(split_list(" , ").is_empty());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = Utf8PathBuf::from_path_buf(dir.path().join("config.json")).unwrap();
        std::fs::write(&path, r#"{ "inputFolder": "in", "actions": [] }"#).unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.input_folder, Utf8Path::new("in"));
    }

    #[test]
    fn test_load_errors() {
        let dir = tempfile::tempdir().unwrap();
        let missing = Utf8PathBuf::from_path_buf(dir.path().join("absent.json")).unwrap();
        assert!(matches!(Config::load(&missing), Err(ConfigError::Io(_))));

        let broken = Utf8PathBuf::from_path_buf(dir.path().join("broken.json")).unwrap();
        std::fs::write(&broken, "{ not json").unwrap();
        assert!(matches!(Config::load(&broken), Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_validate() {
        let dir = tempfile::tempdir().unwrap();
        let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap();

        assert!(valid_config(&root).validate().is_ok());

        let mut config = valid_config(&root);
        config.input_folder = root.join("nope");
        assert!(matches!(config.validate(), Err(ConfigError::MissingDirectory(_))));

        let mut config = valid_config(&root);
        config.output_folder = Utf8PathBuf::new();
        assert!(matches!(config.validate(), Err(ConfigError::InvalidOption { .. })));

        let mut config = valid_config(&root);
        config.actions.clear();
        assert!(matches!(config.validate(), Err(ConfigError::InvalidOption { .. })));

        let mut config = valid_config(&root);
        config.reader.chunk_size = 0;
        assert!(matches!(config.validate(), Err(ConfigError::InvalidOption { .. })));
    }
}
