//! Lazy, retry-tolerant reading of delimited record files.
//!
//! This crate turns an input file into a stream of [`Record`]s:
//!
//! - The first line is the header; every record shares it
//! - Data lines are pulled in chunks (default 100 lines), so memory use does
//!   not grow with file size
//! - Opening the file and reading the header are retried (default 5
//!   attempts, 10 ms apart) to ride out files that are still being written
//! - Malformed lines are reported with their line number and skipped
//!
//! # Example
//!
//! ```no_run
//! use rf_core::{InputName, ReaderConfig};
//! use rf_reader::RecordReader;
//!
//! # fn example() -> Result<(), rf_reader::ReadError> {
//! let input = InputName::parse("/data/in/acme_people_20240101.csv", "csv").unwrap();
//! let records: Vec<_> = RecordReader::open(input, &ReaderConfig::default())?
//!     .filter_map(Result::ok)
//!     .collect();
//! println!("{} records", records.len());
//! # Ok(())
//! # }
//! ```
//!
//! [`Record`]: rf_core::Record

#![deny(clippy::all)]
#![warn(missing_docs)]

pub mod error;
pub mod reader;

pub use error::ReadError;
pub use reader::RecordReader;
