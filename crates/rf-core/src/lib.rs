//! Core types, errors, and configuration for the record-filter service.
//!
//! This crate provides the foundational types used across the workspace:
//!
//! - [`Record`] and [`Header`] for delimited input rows
//! - [`InputName`] for the `<customer>_<recordtype>_<date>` file convention
//! - [`Config`] and its sections, loaded from JSON
//! - [`RecordSink`], the seam between rules and writers
//! - Error types and `FxHashMap`/`FxHashSet` aliases

#![deny(clippy::all)]
#![warn(missing_docs)]

pub mod config;
pub mod error;
pub mod hash;
pub mod sink;
pub mod types;

pub use config::{
    ActionConfig, ActionKind, ConditionConfig, Config, DEFAULT_GROUP_NAME, OutputConfig,
    ReaderConfig, WatchConfig, split_list,
};
pub use error::{ConfigError, RecordError};
pub use hash::{FxHashMap, FxHashSet, fx_hash_map, fx_hash_map_with_capacity, fx_hash_set};
pub use sink::RecordSink;
pub use types::{FIELD_DELIMITER, Header, InputName, NAME_SEPARATOR, Record};
