//! Error types for the rf-reader crate.
//!
//! This module provides the [`ReadError`] type for errors that can occur
//! while opening and streaming an input file.

use camino::Utf8PathBuf;
use rf_core::RecordError;

/// Errors that can occur while reading records from an input file.
///
/// # Error Recovery Strategy
///
/// - **Open errors** ([`ReadError::Open`]): Skip the file - every attempt failed
/// - **Read errors** ([`ReadError::Read`]): Skip the rest of the file
/// - **Empty header** ([`ReadError::EmptyHeader`]): Skip the file
/// - **Malformed lines** ([`ReadError::Malformed`]): Log, skip the line, continue
///
/// # Examples
///
/// ```
/// use rf_reader::ReadError;
///
/// fn handle_error(err: ReadError) {
///     match err {
///         ReadError::Open { path, attempts, .. } => eprintln!("gave up on {path} after {attempts}"),
///         ReadError::Read { path, .. } => eprintln!("read error: {path}"),
///         ReadError::EmptyHeader { path } => eprintln!("no header: {path}"),
///         ReadError::Malformed { path, line, .. } => eprintln!("bad line {line} in {path}"),
///     }
/// }
/// ```
#[derive(Debug, thiserror::Error)]
pub enum ReadError {
    /// The file could not be opened, or its header read, within the
    /// configured number of attempts.
    #[error("failed to open {path} after {attempts} attempt(s): {source}")]
    Open {
        /// The input file.
        path: Utf8PathBuf,
        /// Attempts made.
        attempts: u32,
        /// The last I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Reading failed after the header was read.
    #[error("failed to read {path}: {source}")]
    Read {
        /// The input file.
        path: Utf8PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The file is empty or its first line is blank.
    #[error("missing header line in {path}")]
    EmptyHeader {
        /// The input file.
        path: Utf8PathBuf,
    },

    /// A data line does not form a record.
    #[error("malformed record at {path}:{line}: {source}")]
    Malformed {
        /// The input file.
        path: Utf8PathBuf,
        /// 1-based line number, counting the header as line 1.
        line: usize,
        /// Why the line was rejected.
        #[source]
        source: RecordError,
    },
}

impl ReadError {
    /// Creates a new [`ReadError::Read`] error.
    #[inline]
    pub fn read(path: impl Into<Utf8PathBuf>, source: std::io::Error) -> Self {
        Self::Read {
            path: path.into(),
            source,
        }
    }

    /// Creates a new [`ReadError::Malformed`] error.
    #[inline]
    pub fn malformed(path: impl Into<Utf8PathBuf>, line: usize, source: RecordError) -> Self {
        Self::Malformed {
            path: path.into(),
            line,
            source,
        }
    }

    /// Returns `true` if reading can continue with the next line.
    #[inline]
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        matches!(self, Self::Malformed { .. })
    }

    /// Returns `true` if the rest of the file cannot be read.
    #[inline]
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        !self.is_recoverable()
    }

    /// Returns the input file this error refers to.
    #[must_use]
    pub fn path(&self) -> &Utf8PathBuf {
        match self {
            Self::Open { path, .. }
            | Self::Read { path, .. }
            | Self::EmptyHeader { path }
            | Self::Malformed { path, .. } => path,
        }
    }
}
