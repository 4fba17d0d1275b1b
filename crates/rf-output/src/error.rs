//! Error types for the rf-output crate.

use camino::Utf8PathBuf;

/// Errors that can occur while configuring or flushing an output file.
///
/// # Error Recovery Strategy
///
/// - **Directory errors** ([`WriteError::CreateDir`]): fatal for the action
///   that owns the writer; raised while the writer is configured
/// - **Write errors** ([`WriteError::Write`]): logged by the flush that hit
///   them; the records of that flush are lost
/// - **No destination** ([`WriteError::NoDestination`]): records stay
///   buffered until a destination is set
/// - **No runtime** ([`WriteError::NoRuntime`]): a buffered writer was
///   created outside a Tokio runtime
#[derive(Debug, thiserror::Error)]
pub enum WriteError {
    /// The output directory could not be created.
    #[error("failed to create output directory {path}: {source}")]
    CreateDir {
        /// The directory.
        path: Utf8PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Writing an output file failed.
    #[error("failed to write {path}: {source}")]
    Write {
        /// The output file.
        path: Utf8PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Records were flushed before any destination was set.
    #[error("no output destination set for group '{group}'")]
    NoDestination {
        /// Group name of the writer.
        group: String,
    },

    /// Buffered writers need a Tokio runtime for their flush ticker.
    #[error("buffered writer requires a Tokio runtime")]
    NoRuntime,
}

impl WriteError {
    /// Creates a new [`WriteError::CreateDir`] error.
    #[inline]
    pub fn create_dir(path: impl Into<Utf8PathBuf>, source: std::io::Error) -> Self {
        Self::CreateDir {
            path: path.into(),
            source,
        }
    }

    /// Creates a new [`WriteError::Write`] error.
    #[inline]
    pub fn write(path: impl Into<Utf8PathBuf>, source: std::io::Error) -> Self {
        Self::Write {
            path: path.into(),
            source,
        }
    }

    /// Returns `true` if later flushes may succeed.
    #[inline]
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        matches!(self, Self::Write { .. } | Self::NoDestination { .. })
    }

    /// Returns the file or directory this error refers to, if any.
    #[must_use]
    pub fn path(&self) -> Option<&Utf8PathBuf> {
        match self {
            Self::CreateDir { path, .. } | Self::Write { path, .. } => Some(path),
            Self::NoDestination { .. } | Self::NoRuntime => None,
        }
    }
}
