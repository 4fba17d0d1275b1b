//! Processing statistics with atomic counters.
//!
//! [`ProcessStats`] is shared (behind an [`Arc`](std::sync::Arc)) between the
//! rule engine, the worker that feeds it, and whoever reports progress.
//! [`StatsSnapshot`] is a point-in-time copy for logging or display.
//!
//! Counters use [`Relaxed`](std::sync::atomic::Ordering::Relaxed) ordering;
//! they are informational only.
//!
//! # Examples
//!
//! ```
//! use rf_rules::ProcessStats;
//!
//! let stats = ProcessStats::new();
//! stats.increment_files_started();
//! stats.increment_records_evaluated();
//! stats.add_records_forwarded(2);
//!
//! let snapshot = stats.snapshot();
//! println!("{} files, {} records", snapshot.files_started, snapshot.records_evaluated);
//! ```

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

/// Atomic counters for record processing.
#[derive(Debug, Default)]
pub struct ProcessStats {
    /// Input files whose processing started.
    files_started: AtomicU64,
    /// Input files skipped because they could not be read.
    files_failed: AtomicU64,
    /// Records handed to the rule engine.
    records_evaluated: AtomicU64,
    /// Records forwarded to an output, counted once per receiving action.
    records_forwarded: AtomicU64,
    /// Data lines skipped as malformed.
    malformed_lines: AtomicU64,
}

impl ProcessStats {
    /// Creates a new [`ProcessStats`] with all counters at zero.
    ///
    /// ```
    /// use rf_rules::ProcessStats;
    ///
    /// assert_eq!(ProcessStats::new().snapshot().records_evaluated, 0);
    /// ```
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Increments the started files counter.
    #[inline]
    pub fn increment_files_started(&self) {
        self.files_started.fetch_add(1, Ordering::Relaxed);
    }

    /// Increments the failed files counter.
    #[inline]
    pub fn increment_files_failed(&self) {
        self.files_failed.fetch_add(1, Ordering::Relaxed);
    }

    /// Increments the evaluated records counter.
    #[inline]
    pub fn increment_records_evaluated(&self) {
        self.records_evaluated.fetch_add(1, Ordering::Relaxed);
    }

    /// Adds `count` to the forwarded records counter.
    #[inline]
    pub fn add_records_forwarded(&self, count: u64) {
        self.records_forwarded.fetch_add(count, Ordering::Relaxed);
    }

    /// Increments the malformed lines counter.
    #[inline]
    pub fn increment_malformed_lines(&self) {
        self.malformed_lines.fetch_add(1, Ordering::Relaxed);
    }

    /// Returns a point-in-time snapshot of all counters.
    #[must_use]
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            files_started: self.files_started.load(Ordering::Relaxed),
            files_failed: self.files_failed.load(Ordering::Relaxed),
            records_evaluated: self.records_evaluated.load(Ordering::Relaxed),
            records_forwarded: self.records_forwarded.load(Ordering::Relaxed),
            malformed_lines: self.malformed_lines.load(Ordering::Relaxed),
        }
    }

    /// Resets all counters to zero.
    pub fn reset(&self) {
        self.files_started.store(0, Ordering::Relaxed);
        self.files_failed.store(0, Ordering::Relaxed);
        self.records_evaluated.store(0, Ordering::Relaxed);
        self.records_forwarded.store(0, Ordering::Relaxed);
        self.malformed_lines.store(0, Ordering::Relaxed);
    }
}

/// A point-in-time copy of [`ProcessStats`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StatsSnapshot {
    /// Input files whose processing started.
    pub files_started: u64,
    /// Input files skipped because they could not be read.
    pub files_failed: u64,
    /// Records handed to the rule engine.
    pub records_evaluated: u64,
    /// Records forwarded to an output, counted once per receiving action.
    pub records_forwarded: u64,
    /// Data lines skipped as malformed.
    pub malformed_lines: u64,
}

impl StatsSnapshot {
    /// Counter deltas from `earlier` to `self`.
    ///
    /// ```
    /// use rf_rules::StatsSnapshot;
    ///
    /// let before = StatsSnapshot { records_evaluated: 10, ..Default::default() };
    /// let after = StatsSnapshot { records_evaluated: 25, ..Default::default() };
    /// assert_eq!(after.since(&before).records_evaluated, 15);
    /// ```
    #[must_use]
    pub const fn since(&self, earlier: &Self) -> Self {
        Self {
            files_started: self.files_started.saturating_sub(earlier.files_started),
            files_failed: self.files_failed.saturating_sub(earlier.files_failed),
            records_evaluated: self
                .records_evaluated
                .saturating_sub(earlier.records_evaluated),
            records_forwarded: self
                .records_forwarded
                .saturating_sub(earlier.records_forwarded),
            malformed_lines: self.malformed_lines.saturating_sub(earlier.malformed_lines),
        }
    }
}
