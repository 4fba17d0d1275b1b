//! Error types for the rf-watcher crate.
//!
//! This module provides the [`WatchError`] type for errors that can occur
//! while crawling and watching the input directory.

use camino::Utf8PathBuf;

/// Errors that can occur while crawling and watching the input directory.
///
/// # Error Recovery Strategy
///
/// - **Notify errors** ([`WatchError::Notify`]): Fatal - the watcher cannot run
/// - **I/O errors** ([`WatchError::Io`]): Fatal - the directory cannot be resolved
/// - **Channel closed** ([`WatchError::ChannelClosed`]): Fatal - the debounce loop is gone
/// - **Non-UTF-8 path** ([`WatchError::NonUtf8Path`]): Recoverable - the entry is skipped
///
/// # Examples
///
/// ```
/// use rf_watcher::WatchError;
///
/// fn handle_error(err: &WatchError) {
///     if err.is_recoverable() {
///         eprintln!("skipping: {err}");
///     } else {
///         eprintln!("crawler stopped: {err}");
///     }
/// }
/// ```
#[derive(Debug, thiserror::Error)]
pub enum WatchError {
    /// Failed to initialize or operate the notify watcher.
    #[error("notify watcher error: {0}")]
    Notify(#[from] notify::Error),

    /// An I/O error occurred while resolving or listing the directory.
    #[error("I/O error on '{path}': {source}")]
    Io {
        /// The path involved.
        path: Utf8PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    /// A path is not valid UTF-8.
    #[error("path is not valid UTF-8: {}", _0.display())]
    NonUtf8Path(std::path::PathBuf),

    /// The debounce loop stopped unexpectedly.
    #[error("crawler loop stopped unexpectedly")]
    ChannelClosed,
}

impl WatchError {
    /// Creates a new [`WatchError::Io`] error.
    #[inline]
    pub fn io(path: impl Into<Utf8PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Creates a new [`WatchError::NonUtf8Path`] error.
    #[inline]
    pub fn non_utf8_path(path: impl Into<std::path::PathBuf>) -> Self {
        Self::NonUtf8Path(path.into())
    }

    /// Returns `true` if crawling can continue after this error.
    #[inline]
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        matches!(self, Self::NonUtf8Path(_))
    }

    /// Returns `true` if this error is fatal (crawling should stop).
    #[inline]
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        !self.is_recoverable()
    }

    /// Returns the directory path associated with this error, if any.
    #[must_use]
    pub fn path(&self) -> Option<&Utf8PathBuf> {
        match self {
            Self::Io { path, .. } => Some(path),
            Self::Notify(_) | Self::ChannelClosed | Self::NonUtf8Path(_) => None,
        }
    }
}
