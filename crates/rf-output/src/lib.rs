//! Buffered, timer-flushed output files for record-filter.
//!
//! Each configured action owns one [`BufferedWriter`]. The writer follows
//! the input file being processed: for input `acme_people_20240101.csv` and
//! group `Adults` it writes `<output>/acme_people_20240101_groupAdults.csv`,
//! header first, then the forwarded records in order.
//!
//! # Overview
//!
//! - [`BufferedWriter`] queues records and flushes them from a per-writer
//!   Tokio ticker (default every 50 ms) on the blocking pool
//! - [`WriterFactory`] creates writers from configuration
//! - [`output_path`] derives the output file name
//!
//! # Crate Dependencies
//!
//! ```text
//! rf-cli ──► rf-service ──► rf-output ──► rf-core
//! ```

#![deny(clippy::all)]
#![warn(missing_docs)]

pub mod error;
pub mod factory;
pub mod writer;

pub use error::WriteError;
pub use factory::WriterFactory;
pub use writer::{BufferedWriter, output_path};
