//! Timer-flushed writer for one action's output files.
//!
//! A [`BufferedWriter`] queues records in memory and a Tokio interval task
//! owned by the writer drains the queue to disk, one batched write per
//! tick. The output file follows the input file being processed: changing
//! the destination starts a fresh file (`<stem>_group<group>.<ext>` in the
//! output folder) whose first line is the record header.
//!
//! # Examples
//!
//! ```no_run
//! use rf_core::{InputName, OutputConfig, Record};
//! use rf_output::BufferedWriter;
//!
//! # async fn example() -> Result<(), rf_output::WriteError> {
//! let mut writer = BufferedWriter::new("/data/out", "Adults", &OutputConfig::default())?;
//! let input = InputName::parse("/data/in/acme_people_20240101.csv", "csv").unwrap();
//!
//! writer.change_output_destination(&input);
//! writer.add_record(Record::from_lines("FirstName,Age", "John,32").unwrap());
//! writer.dispose();
//! # Ok(())
//! # }
//! ```

use std::collections::VecDeque;
use std::fs::OpenOptions;
use std::io::{self, Write as _};
use std::sync::Arc;
use std::time::Duration;

use camino::{Utf8Path, Utf8PathBuf};
use parking_lot::Mutex;
use rf_core::{InputName, OutputConfig, Record, RecordSink};
use tokio::runtime::Handle;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::error::WriteError;

/// Line terminator for output files.
const LINE_ENDING: &str = "\n";

/// Shortest ticker period accepted.
const MIN_FLUSH_INTERVAL: Duration = Duration::from_millis(1);

/// Output file for `input` in `container`: `<stem>_group<group>.<ext>`.
///
/// # Examples
///
/// ```
/// use camino::Utf8Path;
/// use rf_core::InputName;
/// use rf_output::output_path;
///
/// let input = InputName::parse("in/acme_people_20240101.csv", "csv").unwrap();
/// let path = output_path(Utf8Path::new("out"), &input, "Adults");
/// assert_eq!(path.as_str(), "out/acme_people_20240101_groupAdults.csv");
/// ```
#[must_use]
pub fn output_path(container: &Utf8Path, input: &InputName, group: &str) -> Utf8PathBuf {
    container.join(format!(
        "{}_group{}.{}",
        input.stem(),
        group,
        input.extension()
    ))
}

/// Where records currently go.
#[derive(Debug)]
struct Destination {
    container: Utf8PathBuf,
    group: String,
    path: Option<Utf8PathBuf>,
    /// The next flush truncates (or creates) the file.
    changed: bool,
    /// The next records written must be preceded by the header line.
    needs_header: bool,
}

/// State shared between the writer and its ticker.
///
/// Lock order: `destination` before `queue`.
#[derive(Debug)]
struct Shared {
    queue: Mutex<VecDeque<Record>>,
    destination: Mutex<Destination>,
}

impl Shared {
    /// Returns `true` if a flush would touch the file.
    fn has_work(&self) -> bool {
        let destination = self.destination.lock();
        destination.path.is_some() && (destination.changed || !self.queue.lock().is_empty())
    }

    fn flush(&self) -> Result<usize, WriteError> {
        let mut destination = self.destination.lock();
        self.flush_locked(&mut destination)
    }

    /// Writes every queued record. The destination lock is held across the
    /// existence check, the append/truncate decision and the write.
    fn flush_locked(&self, destination: &mut Destination) -> Result<usize, WriteError> {
        let Some(path) = destination.path.clone() else {
            if self.queue.lock().is_empty() {
                return Ok(0);
            }
            return Err(WriteError::NoDestination {
                group: destination.group.clone(),
            });
        };

        let records: Vec<Record> = self.queue.lock().drain(..).collect();
        let truncate = destination.changed || !path.exists();
        if !truncate && records.is_empty() {
            return Ok(0);
        }

        let mut text = String::new();
        if let Some(first) = records.first() {
            if truncate || destination.needs_header {
                text.push_str(&first.header_line());
                text.push_str(LINE_ENDING);
            }
        }
        for record in &records {
            text.push_str(&record.to_csv_line());
            text.push_str(LINE_ENDING);
        }

        write_file(&path, truncate, &text).map_err(|source| WriteError::write(&path, source))?;

        destination.changed = false;
        if !records.is_empty() {
            destination.needs_header = false;
        } else if truncate {
            destination.needs_header = true;
        }

        tracing::debug!(
            path = %path,
            records = records.len(),
            truncate,
            "Output flushed"
        );
        Ok(records.len())
    }
}

fn write_file(path: &Utf8Path, truncate: bool, text: &str) -> io::Result<()> {
    let mut options = OpenOptions::new();
    options.create(true);
    if truncate {
        options.write(true).truncate(true);
    } else {
        options.append(true);
    }
    let mut file = options.open(path)?;
    file.write_all(text.as_bytes())?;
    file.flush()
}

fn ensure_dir(container: &Utf8Path) -> Result<(), WriteError> {
    std::fs::create_dir_all(container).map_err(|source| WriteError::create_dir(container, source))
}

/// The flush ticker task and its shutdown signal.
#[derive(Debug)]
struct Ticker {
    shutdown_tx: Option<oneshot::Sender<()>>,
    _task_handle: JoinHandle<()>,
}

impl Ticker {
    fn spawn(handle: &Handle, shared: Arc<Shared>, period: Duration) -> Self {
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let task_handle = handle.spawn(run_ticker(shared, period.max(MIN_FLUSH_INTERVAL), shutdown_rx));
        Self {
            shutdown_tx: Some(shutdown_tx),
            _task_handle: task_handle,
        }
    }

    fn stop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

async fn run_ticker(shared: Arc<Shared>, period: Duration, mut shutdown_rx: oneshot::Receiver<()>) {
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = &mut shutdown_rx => break,
            _ = interval.tick() => {
                if !shared.has_work() {
                    continue;
                }
                let task_shared = Arc::clone(&shared);
                match tokio::task::spawn_blocking(move || task_shared.flush()).await {
                    Ok(Ok(_)) => {}
                    Ok(Err(err)) => tracing::error!(error = %err, "Scheduled flush failed"),
                    Err(err) => tracing::error!(error = %err, "Flush task failed"),
                }
            }
        }
    }
    tracing::trace!("Flush ticker stopped");
}

/// Buffers records for one output group and writes them on a timer.
///
/// Created in a Tokio runtime when buffering is enabled (the default); the
/// ticker runs until [`dispose`](Self::dispose) or drop, both of which
/// flush what is still queued.
pub struct BufferedWriter {
    shared: Arc<Shared>,
    ticker: Option<Ticker>,
    buffered: bool,
    disposed: bool,
}

impl std::fmt::Debug for BufferedWriter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BufferedWriter")
            .field("group", &self.group())
            .field("output_path", &self.output_path())
            .field("pending", &self.pending())
            .field("buffered", &self.buffered)
            .field("disposed", &self.disposed)
            .finish_non_exhaustive()
    }
}

impl BufferedWriter {
    /// Creates a writer for `group` in `container`, creating the directory
    /// if needed.
    ///
    /// No destination is set until
    /// [`change_output_destination`](Self::change_output_destination) is
    /// called.
    ///
    /// # Errors
    ///
    /// Returns [`WriteError::CreateDir`] if the directory cannot be created
    /// and [`WriteError::NoRuntime`] if buffering is enabled outside a Tokio
    /// runtime.
    pub fn new(
        container: impl Into<Utf8PathBuf>,
        group: impl Into<String>,
        config: &OutputConfig,
    ) -> Result<Self, WriteError> {
        let container = container.into();
        let group = group.into();
        ensure_dir(&container)?;

        let shared = Arc::new(Shared {
            queue: Mutex::new(VecDeque::new()),
            destination: Mutex::new(Destination {
                container,
                group,
                path: None,
                changed: false,
                needs_header: true,
            }),
        });

        let ticker = if config.buffer_output {
            let handle = Handle::try_current().map_err(|_| WriteError::NoRuntime)?;
            Some(Ticker::spawn(
                &handle,
                Arc::clone(&shared),
                config.flush_interval(),
            ))
        } else {
            None
        };

        let writer = Self {
            shared,
            ticker,
            buffered: config.buffer_output,
            disposed: false,
        };
        tracing::debug!(
            group = %writer.group(),
            buffered = writer.buffered,
            "Writer created"
        );
        Ok(writer)
    }

    /// Points the writer at the output file for `input`.
    ///
    /// Records queued for the previous destination are written there first.
    /// The next flush truncates the new file, even if it has no records.
    pub fn change_output_destination(&mut self, input: &InputName) {
        self.retarget(input, None);
    }

    /// Like [`change_output_destination`](Self::change_output_destination),
    /// also moving the writer to another directory and group.
    ///
    /// # Errors
    ///
    /// Returns [`WriteError::CreateDir`] if `container` cannot be created;
    /// the destination is then left unchanged.
    pub fn change_output_destination_in(
        &mut self,
        input: &InputName,
        container: impl Into<Utf8PathBuf>,
        group: impl Into<String>,
    ) -> Result<(), WriteError> {
        let container = container.into();
        ensure_dir(&container)?;
        self.retarget(input, Some((container, group.into())));
        Ok(())
    }

    fn retarget(&mut self, input: &InputName, target: Option<(Utf8PathBuf, String)>) {
        {
            let mut destination = self.shared.destination.lock();
            if destination.path.is_some() {
                if let Err(err) = self.shared.flush_locked(&mut destination) {
                    tracing::error!(
                        group = %destination.group,
                        error = %err,
                        "Failed to flush previous output"
                    );
                }
            }

            if let Some((container, group)) = target {
                destination.container = container;
                destination.group = group;
            }
            let path = output_path(&destination.container, input, &destination.group);
            tracing::debug!(
                group = %destination.group,
                input = input.file_name(),
                path = %path,
                "Output destination changed"
            );
            destination.path = Some(path);
            destination.changed = true;
            destination.needs_header = true;
        }

        if !self.buffered {
            self.flush_now();
        }
    }

    /// Queues `record` for the current destination.
    pub fn add_record(&mut self, record: Record) {
        self.shared.queue.lock().push_back(record);
        if !self.buffered || self.disposed {
            self.flush_now();
        }
    }

    /// Writes every queued record now. Returns the number written.
    ///
    /// # Errors
    ///
    /// Returns [`WriteError::NoDestination`] if records are queued but no
    /// destination was set (they stay queued), and [`WriteError::Write`]
    /// if the file cannot be written (the records are dropped).
    pub fn flush(&self) -> Result<usize, WriteError> {
        self.shared.flush()
    }

    fn flush_now(&self) {
        if let Err(err) = self.shared.flush() {
            tracing::error!(group = %self.group(), error = %err, "Flush failed");
        }
    }

    /// Stops the ticker and writes everything still queued. Further calls
    /// do nothing.
    pub fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        self.disposed = true;
        if let Some(mut ticker) = self.ticker.take() {
            ticker.stop();
        }
        self.flush_now();
        tracing::debug!(group = %self.group(), "Writer disposed");
    }

    /// The current output file, once a destination is set.
    #[must_use]
    pub fn output_path(&self) -> Option<Utf8PathBuf> {
        self.shared.destination.lock().path.clone()
    }

    /// The output directory.
    #[must_use]
    pub fn container(&self) -> Utf8PathBuf {
        self.shared.destination.lock().container.clone()
    }

    /// The group name used in output file names.
    #[must_use]
    pub fn group(&self) -> String {
        self.shared.destination.lock().group.clone()
    }

    /// Number of records waiting to be written.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.shared.queue.lock().len()
    }

    /// Returns `true` if records are written by the ticker.
    #[inline]
    #[must_use]
    pub const fn is_buffered(&self) -> bool {
        self.buffered
    }

    /// Returns `true` once [`dispose`](Self::dispose) has run.
    #[inline]
    #[must_use]
    pub const fn is_disposed(&self) -> bool {
        self.disposed
    }
}

impl RecordSink for BufferedWriter {
    fn change_destination(&mut self, input: &InputName) {
        self.change_output_destination(input);
    }

    fn add_record(&mut self, record: Record) {
        Self::add_record(self, record);
    }

    fn dispose(&mut self) {
        Self::dispose(self);
    }
}

impl Drop for BufferedWriter {
    fn drop(&mut self) {
        self.dispose();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn utf8(dir: &TempDir) -> Utf8PathBuf {
        Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap()
    }

    fn input(name: &str) -> InputName {
        InputName::parse(format!("in/{name}"), "csv").unwrap()
    }

    fn person(first: &str, age: &str) -> Record {
        Record::from_lines("FirstName,Age", &format!("{first},{age}")).unwrap()
    }

    fn unbuffered() -> OutputConfig {
        OutputConfig {
            buffer_output: false,
            ..OutputConfig::default()
        }
    }

    fn buffered(flush_interval_ms: u64) -> OutputConfig {
        OutputConfig {
            flush_interval_ms,
            buffer_output: true,
        }
    }

    #[test]
    fn test_output_path_keeps_extension() {
        let path = output_path(
            Utf8Path::new("/out"),
            &InputName::parse("in/a_b_c.CSV", "csv").unwrap(),
            "Minors",
        );
        assert_eq!(path.as_str(), "/out/a_b_c_groupMinors.CSV");
    }

    #[test]
    fn test_new_creates_container() {
        let dir = TempDir::new().unwrap();
        let container = utf8(&dir).join("nested/out");
        let writer = BufferedWriter::new(&container, "Adults", &unbuffered()).unwrap();
        assert!(container.is_dir());
        assert_eq!(writer.container(), container);
        assert_eq!(writer.group(), "Adults");
        assert!(writer.output_path().is_none());
    }

    #[test]
    fn test_new_fails_when_container_is_a_file() {
        let dir = TempDir::new().unwrap();
        let file = utf8(&dir).join("taken");
        fs::write(&file, "x").unwrap();
        assert!(matches!(
            BufferedWriter::new(&file, "Adults", &unbuffered()),
            Err(WriteError::CreateDir { .. })
        ));
    }

    #[test]
    fn test_buffered_writer_needs_runtime() {
        let dir = TempDir::new().unwrap();
        assert!(matches!(
            BufferedWriter::new(utf8(&dir), "Adults", &buffered(50)),
            Err(WriteError::NoRuntime)
        ));
    }

    #[test]
    fn test_flush_without_destination_keeps_records() {
        let dir = TempDir::new().unwrap();
        let mut writer = BufferedWriter::new(utf8(&dir), "Adults", &unbuffered()).unwrap();
        writer.add_record(person("John", "32"));
        assert!(matches!(
            writer.flush(),
            Err(WriteError::NoDestination { .. })
        ));
        assert_eq!(writer.pending(), 1);

        writer.change_output_destination(&input("acme_people_1.csv"));
        let path = writer.output_path().unwrap();
        assert_eq!(
            fs::read_to_string(path).unwrap(),
            "FirstName,Age\nJohn,32\n"
        );
    }

    #[test]
    fn test_header_follows_empty_truncation() {
        let dir = TempDir::new().unwrap();
        let mut writer = BufferedWriter::new(utf8(&dir), "Adults", &unbuffered()).unwrap();
        writer.change_output_destination(&input("acme_people_1.csv"));
        let path = writer.output_path().unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "");

        writer.add_record(person("John", "32"));
        writer.add_record(person("Bob", "40"));
        assert_eq!(
            fs::read_to_string(&path).unwrap(),
            "FirstName,Age\nJohn,32\nBob,40\n"
        );
    }

    #[test]
    fn test_change_destination_truncates_existing_file() {
        let dir = TempDir::new().unwrap();
        let container = utf8(&dir);
        let stale = container.join("acme_people_1_groupAdults.csv");
        fs::write(&stale, "Old\nstale\n").unwrap();

        let mut writer = BufferedWriter::new(&container, "Adults", &unbuffered()).unwrap();
        writer.change_output_destination(&input("acme_people_1.csv"));
        writer.add_record(person("Jane", "40"));
        writer.dispose();

        assert_eq!(fs::read_to_string(stale).unwrap(), "FirstName,Age\nJane,40\n");
    }

    #[test]
    fn test_change_destination_in_moves_writer() {
        let dir = TempDir::new().unwrap();
        let other = utf8(&dir).join("other");
        let mut writer = BufferedWriter::new(utf8(&dir), "Adults", &unbuffered()).unwrap();
        writer
            .change_output_destination_in(&input("acme_people_1.csv"), &other, "Kids")
            .unwrap();
        assert_eq!(
            writer.output_path().unwrap(),
            other.join("acme_people_1_groupKids.csv")
        );
        assert!(other.join("acme_people_1_groupKids.csv").is_file());
    }

    #[tokio::test]
    async fn test_write_then_read_round_trip() {
        let dir = TempDir::new().unwrap();
        let rows = [person("John", "32"), person("Jane", "12"), person("Bob", "40")];

        let mut writer = BufferedWriter::new(utf8(&dir), "All", &buffered(50)).unwrap();
        writer.change_output_destination(&input("acme_people_20240101.csv"));
        for row in &rows {
            writer.add_record(row.clone());
        }
        writer.dispose();

        let path = utf8(&dir).join("acme_people_20240101_groupAll.csv");
        let contents = fs::read_to_string(path).unwrap();
        let mut lines = contents.lines();
        let header = lines.next().unwrap();
        let read: Vec<Record> = lines
            .map(|line| Record::from_lines(header, line).unwrap())
            .collect();
        assert_eq!(read, rows);
    }

    #[tokio::test]
    async fn test_ticker_flushes_in_background() {
        let dir = TempDir::new().unwrap();
        let mut writer = BufferedWriter::new(utf8(&dir), "All", &buffered(10)).unwrap();
        writer.change_output_destination(&input("acme_people_1.csv"));
        writer.add_record(person("John", "32"));

        let path = writer.output_path().unwrap();
        let mut contents = String::new();
        for _ in 0..100 {
            tokio::time::sleep(Duration::from_millis(10)).await;
            contents = fs::read_to_string(&path).unwrap_or_default();
            if contents.contains("John") {
                break;
            }
        }
        assert_eq!(contents, "FirstName,Age\nJohn,32\n");
        assert_eq!(writer.pending(), 0);
        assert!(!writer.is_disposed());
    }

    #[tokio::test]
    async fn test_previous_destination_flushed_on_change() {
        let dir = TempDir::new().unwrap();
        let container = utf8(&dir);
        // Long interval so only explicit flushes write.
        let mut writer = BufferedWriter::new(&container, "All", &buffered(60_000)).unwrap();

        writer.change_output_destination(&input("acme_people_1.csv"));
        writer.add_record(person("John", "32"));
        writer.add_record(person("Jane", "12"));
        writer.change_output_destination(&input("acme_people_2.csv"));

        let first = container.join("acme_people_1_groupAll.csv");
        assert_eq!(
            fs::read_to_string(first).unwrap(),
            "FirstName,Age\nJohn,32\nJane,12\n"
        );

        writer.add_record(person("Bob", "40"));
        drop(writer);
        let second = container.join("acme_people_2_groupAll.csv");
        assert_eq!(fs::read_to_string(second).unwrap(), "FirstName,Age\nBob,40\n");
    }

    #[tokio::test]
    async fn test_input_without_records_leaves_empty_file() {
        let dir = TempDir::new().unwrap();
        let mut writer = BufferedWriter::new(utf8(&dir), "All", &buffered(60_000)).unwrap();
        writer.change_output_destination(&input("acme_people_1.csv"));
        writer.dispose();
        writer.dispose();

        let path = utf8(&dir).join("acme_people_1_groupAll.csv");
        assert_eq!(fs::read_to_string(path).unwrap(), "");
    }
}
