//! The input directory crawler.
//!
//! [`Crawler`] keeps a [`PendingQueue`] of input files in sync with the
//! watched directory and tells the consumer, over a [`Notices`] channel,
//! when files are waiting.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────┐  unbounded   ┌───────────────────────────────┐
//! │ RecommendedWatcher   │ ───────────► │ debounce loop (tokio task)    │
//! │ (notify thread)      │   events     │  classify → queue             │
//! └──────────────────────┘              │  re-arm deadline              │
//!                                       │  deadline → Notice (coalesced)│
//!   resume() ── Rearm ────────────────► │                               │
//!   stop()   ── shutdown (oneshot) ───► └──────────────┬────────────────┘
//!                                                      │ try_send
//!                                                      ▼
//!                                       Notices (capacity 1) → worker
//! ```
//!
//! # Usage
//!
//! ```no_run
//! use rf_core::WatchConfig;
//! use rf_watcher::Crawler;
//!
//! # async fn example() -> Result<(), rf_watcher::WatchError> {
//! let (mut crawler, mut notices) = Crawler::new("/data/in", &WatchConfig::default());
//! crawler.start().await?;
//!
//! while notices.recv().await.is_some() {
//!     while let Some(input) = crawler.next_pending() {
//!         println!("ready: {input}");
//!     }
//! }
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use camino::{Utf8Path, Utf8PathBuf};
use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use rf_core::{InputName, WatchConfig};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{Duration, Instant, sleep_until};

use crate::error::WatchError;
use crate::events::{QueueChange, classify};
use crate::filter::{FileFilter, InputFileFilter};
use crate::queue::PendingQueue;

/// Notice channel capacity. One waiting notice is enough to wake the
/// consumer, so further notices are coalesced into it.
const NOTICE_CAPACITY: usize = 1;

/// A signal that input files are waiting in the queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Notice {
    /// Queue length when the notice was sent.
    pub pending: usize,
}

/// Receiving end of the crawler's availability notices.
///
/// The channel closes when the crawler is shut down or dropped.
#[derive(Debug)]
pub struct Notices {
    rx: mpsc::Receiver<Notice>,
}

impl Notices {
    /// Waits for the next notice. Returns `None` once the crawler is gone.
    pub async fn recv(&mut self) -> Option<Notice> {
        self.rx.recv().await
    }

    /// Blocking variant of [`recv`](Self::recv) for use on a blocking thread.
    ///
    /// Must not be called from within an async context.
    pub fn blocking_recv(&mut self) -> Option<Notice> {
        self.rx.blocking_recv()
    }

    /// Takes a waiting notice without blocking.
    pub fn try_recv(&mut self) -> Result<Notice, mpsc::error::TryRecvError> {
        self.rx.try_recv()
    }
}

/// Messages from the crawler handle to its debounce loop.
#[derive(Debug, Clone, Copy)]
enum Control {
    Rearm,
}

/// State shared between the crawler handle and its debounce loop.
struct Shared<F> {
    directory: Utf8PathBuf,
    extension: String,
    debounce: Duration,
    filter: F,
    queue: PendingQueue,
    paused: AtomicBool,
    notice_tx: mpsc::Sender<Notice>,
}

impl<F: FileFilter> Shared<F> {
    /// Queues `path` if it passes the filter. Returns `true` if the path is
    /// an input file, whether or not it was already queued.
    fn enqueue(&self, path: Utf8PathBuf) -> bool {
        if !self.filter.should_process(&path) {
            tracing::trace!(path = %path, "Ignoring non-input file");
            return false;
        }
        let Some(input) = InputName::parse(path, &self.extension) else {
            return false;
        };
        let path = input.path().to_owned();
        if self.queue.push_unique(input) {
            tracing::debug!(path = %path, pending = self.queue.len(), "File enqueued");
        }
        true
    }

    fn remove(&self, path: &Utf8Path) {
        if self.queue.remove(path) {
            tracing::debug!(path = %path, pending = self.queue.len(), "File removed from queue");
        }
    }

    /// Applies one raw event. Returns `true` if the debounce timer should be
    /// (re)armed.
    fn apply(&self, event: &notify::Event) -> bool {
        let mut rearm = false;
        for change in classify(event) {
            match change {
                QueueChange::Enqueue(path) => rearm |= self.enqueue(path),
                QueueChange::Remove(path) => self.remove(&path),
            }
        }
        rearm
    }

    /// Sends a notice if files are waiting and notices are enabled.
    fn notify(&self) {
        if self.paused.load(Ordering::Acquire) {
            tracing::trace!("Crawler paused, notice withheld");
            return;
        }
        let pending = self.queue.len();
        if pending == 0 {
            return;
        }
        match self.notice_tx.try_send(Notice { pending }) {
            Ok(()) => tracing::debug!(pending, "Notice sent"),
            Err(mpsc::error::TrySendError::Full(_)) => {
                tracing::trace!(pending, "Notice already waiting");
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                tracing::debug!("Notice receiver dropped");
            }
        }
    }
}

/// Handles of a started crawler.
struct Running {
    /// Dropping the watcher stops the notify thread.
    _watcher: RecommendedWatcher,
    shutdown_tx: Option<oneshot::Sender<()>>,
    control_tx: mpsc::UnboundedSender<Control>,
    task_handle: JoinHandle<()>,
}

/// Watches one directory and queues the input files that appear in it.
///
/// # Lifecycle
///
/// 1. **Creation**: [`Crawler::new`] returns the crawler and its [`Notices`]
///    receiver. Nothing is watched yet.
///
/// 2. **Start**: [`Crawler::start`] lists the directory, queues every input
///    file, starts watching, and sends a notice if anything was queued.
///
/// 3. **Pause / resume**: gate notices only. The queue keeps tracking the
///    directory while paused.
///
/// 4. **Stop / shutdown**: [`Crawler::stop`] stops watching and empties the
///    queue; a later `start` re-lists the directory. [`Crawler::shutdown`]
///    also closes the notice channel. Dropping the crawler signals the loop
///    to stop as well.
pub struct Crawler<F: FileFilter = InputFileFilter> {
    shared: Arc<Shared<F>>,
    running: Option<Running>,
}

impl<F: FileFilter> std::fmt::Debug for Crawler<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Crawler")
            .field("directory", &self.shared.directory)
            .field("pending", &self.shared.queue.len())
            .field("paused", &self.is_paused())
            .field("is_running", &self.is_running())
            .finish_non_exhaustive()
    }
}

impl Crawler<InputFileFilter> {
    /// Creates a crawler for `directory` accepting input files with the
    /// configured extension.
    pub fn new(directory: impl Into<Utf8PathBuf>, config: &WatchConfig) -> (Self, Notices) {
        Self::with_filter(directory, config, InputFileFilter::new(config.extension.as_str()))
    }
}

impl<F: FileFilter> Crawler<F> {
    /// Creates a crawler with an additional filter. Files must pass the
    /// filter and follow the input naming convention to be queued.
    pub fn with_filter(
        directory: impl Into<Utf8PathBuf>,
        config: &WatchConfig,
        filter: F,
    ) -> (Self, Notices) {
        let (notice_tx, rx) = mpsc::channel(NOTICE_CAPACITY);
        let shared = Arc::new(Shared {
            directory: directory.into(),
            extension: config.extension.trim_start_matches('.').to_owned(),
            debounce: config.debounce(),
            filter,
            queue: PendingQueue::new(),
            paused: AtomicBool::new(false),
            notice_tx,
        });
        (
            Self {
                shared,
                running: None,
            },
            Notices { rx },
        )
    }

    /// Starts crawling.
    ///
    /// A missing directory leaves the crawler idle; this is logged and is not
    /// an error. Starting a running crawler restarts it.
    ///
    /// # Errors
    ///
    /// Returns [`WatchError::Io`] if the directory cannot be resolved and
    /// [`WatchError::Notify`] if the watcher cannot be started.
    pub async fn start(&mut self) -> Result<(), WatchError> {
        if self.running.is_some() {
            self.stop().await;
        }

        let directory = &self.shared.directory;
        if !directory.is_dir() {
            tracing::warn!(path = %directory, "Input directory does not exist, crawler idle");
            return Ok(());
        }
        let canonical = directory
            .canonicalize_utf8()
            .map_err(|source| WatchError::io(directory.clone(), source))?;

        self.shared.queue.clear();

        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let mut watcher = notify::recommended_watcher(move |result: notify::Result<notify::Event>| {
            // The loop may already be gone during shutdown.
            let _ = event_tx.send(result);
        })?;
        watcher.watch(canonical.as_std_path(), RecursiveMode::NonRecursive)?;

        for path in list_directory(&canonical) {
            self.shared.enqueue(path);
        }

        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let (control_tx, control_rx) = mpsc::unbounded_channel();
        let task_handle = tokio::spawn(run_debounce_loop(
            Arc::clone(&self.shared),
            event_rx,
            control_rx,
            shutdown_rx,
        ));

        self.running = Some(Running {
            _watcher: watcher,
            shutdown_tx: Some(shutdown_tx),
            control_tx,
            task_handle,
        });

        tracing::info!(
            path = %canonical,
            pending = self.shared.queue.len(),
            "Crawler started"
        );

        self.shared.notify();
        Ok(())
    }

    /// Stops watching and empties the queue.
    pub async fn stop(&mut self) {
        if let Some(mut running) = self.running.take() {
            if let Some(tx) = running.shutdown_tx.take() {
                let _ = tx.send(());
            }
            if let Err(error) = running.task_handle.await {
                tracing::warn!(error = %error, "Crawler loop ended abnormally");
            }
            tracing::info!(path = %self.shared.directory, "Crawler stopped");
        }
        self.shared.queue.clear();
    }

    /// Stops the crawler and closes the notice channel.
    pub async fn shutdown(mut self) {
        self.stop().await;
    }

    /// Withholds notices until [`resume`](Self::resume) is called.
    pub fn pause(&self) {
        if !self.shared.paused.swap(true, Ordering::AcqRel) {
            tracing::info!(path = %self.shared.directory, "Crawler paused");
        }
    }

    /// Re-enables notices. If the crawler is running, the debounce timer is
    /// re-armed so files queued while paused produce a notice after one
    /// debounce interval.
    pub fn resume(&self) {
        if self.shared.paused.swap(false, Ordering::AcqRel) {
            tracing::info!(path = %self.shared.directory, "Crawler resumed");
        }
        if let Some(running) = &self.running {
            if running.control_tx.send(Control::Rearm).is_err() {
                tracing::warn!(error = %WatchError::ChannelClosed, "Could not re-arm crawler");
            }
        }
    }

    /// Returns `true` if notices are withheld.
    #[must_use]
    pub fn is_paused(&self) -> bool {
        self.shared.paused.load(Ordering::Acquire)
    }

    /// Returns `true` if the crawler is watching its directory.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.running
            .as_ref()
            .is_some_and(|running| !running.task_handle.is_finished())
    }

    /// Returns `true` if input files are waiting.
    #[must_use]
    pub fn has_pending(&self) -> bool {
        !self.shared.queue.is_empty()
    }

    /// Takes the next waiting input file.
    pub fn next_pending(&self) -> Option<InputName> {
        self.shared.queue.pop()
    }

    /// A handle to the pending queue, for consumers on other threads.
    #[must_use]
    pub fn queue(&self) -> PendingQueue {
        self.shared.queue.clone()
    }

    /// The directory this crawler watches, as configured.
    #[must_use]
    pub fn directory(&self) -> &Utf8Path {
        &self.shared.directory
    }
}

impl<F: FileFilter> Drop for Crawler<F> {
    fn drop(&mut self) {
        if let Some(running) = self.running.as_mut() {
            if let Some(tx) = running.shutdown_tx.take() {
                let _ = tx.send(());
            }
        }
    }
}

/// Lists the input files currently in `directory`, in file name order.
///
/// Used for one-shot runs that process what is present and exit.
///
/// # Errors
///
/// Returns [`WatchError::Io`] if the directory cannot be resolved.
pub fn scan_inputs(directory: &Utf8Path, extension: &str) -> Result<Vec<InputName>, WatchError> {
    let canonical = directory
        .canonicalize_utf8()
        .map_err(|source| WatchError::io(directory, source))?;
    Ok(list_directory(&canonical)
        .into_iter()
        .filter_map(|path| InputName::parse(path, extension))
        .collect())
}

/// Regular files directly inside `directory`, sorted by name.
fn list_directory(directory: &Utf8Path) -> Vec<Utf8PathBuf> {
    let walker = ignore::WalkBuilder::new(directory)
        .max_depth(Some(1))
        .standard_filters(false)
        .sort_by_file_name(|a, b| a.cmp(b))
        .build();

    let mut paths = Vec::new();
    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(error) => {
                tracing::warn!(path = %directory, error = %error, "Skipping unreadable entry");
                continue;
            }
        };
        if entry.depth() == 0 || !entry.file_type().is_some_and(|kind| kind.is_file()) {
            continue;
        }
        match Utf8PathBuf::from_path_buf(entry.into_path()) {
            Ok(path) => paths.push(path),
            Err(path) => {
                let error = WatchError::non_utf8_path(path);
                tracing::warn!(error = %error, "Skipping directory entry");
            }
        }
    }
    paths
}

/// Applies file events to the queue and sends a notice once events have
/// been quiet for one debounce interval.
async fn run_debounce_loop<F: FileFilter>(
    shared: Arc<Shared<F>>,
    mut event_rx: mpsc::UnboundedReceiver<notify::Result<notify::Event>>,
    mut control_rx: mpsc::UnboundedReceiver<Control>,
    mut shutdown_rx: oneshot::Receiver<()>,
) {
    let mut deadline: Option<Instant> = None;

    loop {
        tokio::select! {
            _ = &mut shutdown_rx => break,
            Some(result) = event_rx.recv() => match result {
                Ok(event) => {
                    if shared.apply(&event) {
                        deadline = Some(Instant::now() + shared.debounce);
                    }
                }
                Err(error) => tracing::warn!(error = %error, "File watcher error"),
            },
            Some(Control::Rearm) = control_rx.recv() => {
                deadline = Some(Instant::now() + shared.debounce);
            }
            () = sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                deadline = None;
                shared.notify();
            }
        }
    }
}
