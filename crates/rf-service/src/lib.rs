//! The record-filter service: crawler, reader, rule engine and writers
//! wired together.
//!
//! - [`run`] watches the input folder until a shutdown future resolves
//! - [`run_once`] processes the files present now and returns
//! - [`check`] validates a configuration without touching the disk
//! - [`Worker`] is the processing loop shared by both run modes
//!
//! # Crate Dependencies
//!
//! ```text
//! rf-cli ──► rf-service ──► rf-watcher
//!                      ├──► rf-reader
//!                      ├──► rf-rules
//!                      └──► rf-output ──► rf-core
//! ```

#![deny(clippy::all)]
#![warn(missing_docs)]

pub mod service;
pub mod worker;

pub use service::{build_processor, check, run, run_once};
pub use worker::{FileReport, Worker};
