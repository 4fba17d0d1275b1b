//! The processing loop: input files from the queue through the rule engine.

use std::time::{Duration, Instant};

use rf_core::{InputName, ReaderConfig};
use rf_reader::{ReadError, RecordReader};
use rf_rules::{ActionProcessor, StatsSnapshot};
use rf_watcher::{Notices, PendingQueue};

/// Outcome of processing one input file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FileReport {
    /// Records read and evaluated.
    pub records: usize,
    /// Forwards to outputs, counted once per receiving action.
    pub forwarded: usize,
    /// Data lines skipped as malformed.
    pub malformed: usize,
    /// Wall time spent on the file.
    pub elapsed: Duration,
}

/// Drains the pending queue file by file into an [`ActionProcessor`].
///
/// The worker is synchronous; [`run_blocking`](Self::run_blocking) is meant
/// for a blocking thread (`tokio::task::spawn_blocking`). It never runs
/// concurrently with itself.
#[derive(Debug)]
pub struct Worker {
    processor: ActionProcessor,
    queue: PendingQueue,
    reader: ReaderConfig,
}

impl Worker {
    /// Creates a worker that takes files from `queue`.
    #[must_use]
    pub fn new(processor: ActionProcessor, queue: PendingQueue, reader: ReaderConfig) -> Self {
        Self {
            processor,
            queue,
            reader,
        }
    }

    /// The queue this worker drains.
    #[inline]
    #[must_use]
    pub fn queue(&self) -> &PendingQueue {
        &self.queue
    }

    /// The rule engine.
    #[inline]
    #[must_use]
    pub fn processor(&self) -> &ActionProcessor {
        &self.processor
    }

    /// Drains the queue on every notice until the notice channel closes,
    /// then disposes the processor (flushing every output).
    ///
    /// Must not be called from within an async context.
    pub fn run_blocking(mut self, mut notices: Notices) -> StatsSnapshot {
        tracing::debug!("Worker started");
        while let Some(notice) = notices.blocking_recv() {
            tracing::debug!(pending = notice.pending, "Input files available");
            self.drain();
        }
        self.finish()
    }

    /// Processes queued files until the queue is empty. Files that cannot
    /// be read are logged and skipped. Returns the number of files taken.
    pub fn drain(&mut self) -> usize {
        let mut taken = 0;
        while let Some(input) = self.queue.pop() {
            taken += 1;
            if let Err(err) = self.process_file(input) {
                tracing::error!(path = %err.path(), error = %err, "Skipping input file");
            }
        }
        taken
    }

    /// Streams one input file through the rule engine.
    ///
    /// Malformed lines are logged and skipped.
    ///
    /// # Errors
    ///
    /// Returns the [`ReadError`] that stopped the file: an open failure
    /// (nothing was processed) or a read failure part-way (records before it
    /// were processed).
    pub fn process_file(&mut self, input: InputName) -> Result<FileReport, ReadError> {
        let started = Instant::now();
        let stats = std::sync::Arc::clone(self.processor.stats());
        tracing::info!(path = %input.path(), "Processing started");

        let reader = match RecordReader::open(input, &self.reader) {
            Ok(reader) => reader,
            Err(err) => {
                stats.increment_files_failed();
                return Err(err);
            }
        };
        let input = reader.input().clone();
        self.processor.change_output(&input);

        let mut report = FileReport::default();
        for result in reader {
            match result {
                Ok(record) => {
                    report.records += 1;
                    report.forwarded += self.processor.process(&record);
                }
                Err(err) if err.is_recoverable() => {
                    report.malformed += 1;
                    stats.increment_malformed_lines();
                    tracing::warn!(error = %err, "Skipping malformed line");
                }
                Err(err) => {
                    stats.increment_files_failed();
                    return Err(err);
                }
            }
        }

        report.elapsed = started.elapsed();
        tracing::info!(
            path = %input.path(),
            records = report.records,
            forwarded = report.forwarded,
            malformed = report.malformed,
            elapsed = ?report.elapsed,
            "Processing finished"
        );
        Ok(report)
    }

    /// Disposes the processor and returns the final counters.
    pub fn finish(mut self) -> StatsSnapshot {
        self.processor.dispose();
        let snapshot = self.processor.stats().snapshot();
        tracing::info!(
            files = snapshot.files_started,
            failed = snapshot.files_failed,
            records = snapshot.records_evaluated,
            forwarded = snapshot.records_forwarded,
            malformed = snapshot.malformed_lines,
            "Worker finished"
        );
        snapshot
    }
}
