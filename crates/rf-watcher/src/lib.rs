//! Input directory crawling with debounced availability notices.
//!
//! This crate watches the input folder through the `notify` crate, keeps a
//! queue of input files that are waiting to be processed, and tells the
//! consumer over a channel when files are ready.
//!
//! # Overview
//!
//! - [`Crawler`] lists the directory on start, then tracks creates, writes,
//!   deletes and renames
//! - [`PendingQueue`] is the shared FIFO of waiting [`InputName`]s
//! - [`Notices`] receives one notice per quiet period (default 50 ms)
//!   after the last qualifying event
//! - [`FileFilter`] / [`InputFileFilter`] decide which files qualify
//!
//! # Crate Dependencies
//!
//! ```text
//! rf-cli ──► rf-service ──► rf-watcher ──► rf-core
//! ```
//!
//! # Error Handling
//!
//! ```
//! use rf_watcher::WatchError;
//!
//! fn handle_watch_error(err: WatchError) {
//!     if err.is_fatal() {
//!         eprintln!("Fatal crawler error: {}", err);
//!     } else {
//!         eprintln!("Warning: {}", err);
//!     }
//! }
//! ```
//!
//! [`InputName`]: rf_core::InputName

#![deny(clippy::all)]
#![warn(missing_docs)]

pub mod crawler;
pub mod error;
pub mod events;
pub mod filter;
pub mod queue;

pub use crawler::{Crawler, Notice, Notices, scan_inputs};
pub use error::WatchError;
pub use events::{QueueChange, QueueChanges, classify};
pub use filter::{FileFilter, InputFileFilter};
pub use queue::PendingQueue;
