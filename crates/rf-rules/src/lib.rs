//! Condition/action rule engine for record filtering.
//!
//! Records read from an input file are run through every configured
//! [`Action`] that applies to that file. Each action tests its
//! [`Condition`]s and forwards the record to its own output:
//!
//! - `group` actions forward records that meet every condition
//! - `remove` actions forward records that fail at least one
//!
//! The [`ActionProcessor`] owns the actions, switches their outputs when a
//! new input file starts, and disposes them on shutdown.
//!
//! # Crate Dependencies
//!
//! ```text
//! rf-cli ──► rf-service ──► rf-rules ──► rf-core
//! ```
//!
//! # Example
//!
//! ```
//! use rf_core::{ActionConfig, ActionKind, ConditionConfig, InputName, Record, RecordSink};
//! use rf_rules::{ActionProcessor, MemorySink, RuleError};
//!
//! let mut config = ActionConfig::new(ActionKind::Remove);
//! config.conditions.push(ConditionConfig::IsDuplicate { field: "Id".to_owned() });
//!
//! let unique = MemorySink::new();
//! let handle = unique.clone();
//! let mut processor = ActionProcessor::new(&[config], move |_| {
//!     Ok::<_, RuleError>(Box::new(handle.clone()) as Box<dyn RecordSink>)
//! })?;
//!
//! processor.change_output(&InputName::parse("in/acme_orders_1.csv", "csv").unwrap());
//! for id in ["1", "2", "1"] {
//!     processor.process(&Record::from_pairs([("Id", id)]));
//! }
//!
//! assert_eq!(unique.records().len(), 2);
//! # Ok::<(), RuleError>(())
//! ```

#![deny(clippy::all)]
#![warn(missing_docs)]

pub mod action;
pub mod condition;
pub mod error;
pub mod memory;
pub mod processor;
pub mod stats;

pub use action::{Action, Applicability};
pub use condition::{Condition, DuplicateDetector};
pub use error::RuleError;
pub use memory::MemorySink;
pub use processor::ActionProcessor;
pub use stats::{ProcessStats, StatsSnapshot};
