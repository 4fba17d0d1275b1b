//! Error types for the rf-core crate.
//!
//! - [`ConfigError`] for configuration loading and validation
//! - [`RecordError`] for header and data lines that cannot form a record

use camino::Utf8PathBuf;

/// Errors that can occur during configuration loading and validation.
///
/// All of these are fatal at startup.
///
/// # Examples
///
/// ```
/// use rf_core::ConfigError;
/// use camino::Utf8PathBuf;
///
/// let error = ConfigError::MissingDirectory(Utf8PathBuf::from("/some/path"));
/// assert!(error.to_string().contains("/some/path"));
/// ```
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The provided path is invalid or malformed.
    #[error("invalid path '{path}': {reason}")]
    InvalidPath {
        /// The invalid path.
        path: Utf8PathBuf,
        /// Explanation of why the path is invalid.
        reason: String,
    },

    /// A required directory does not exist.
    #[error("missing required directory: {0}")]
    MissingDirectory(Utf8PathBuf),

    /// A configuration option has an invalid value.
    #[error("invalid configuration option '{option}': {reason}")]
    InvalidOption {
        /// The name of the invalid option.
        option: String,
        /// Explanation of why the option is invalid.
        reason: String,
    },

    /// An I/O error occurred while reading configuration.
    #[error("failed to read configuration: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to parse the configuration file.
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] serde_json::Error),
}

impl ConfigError {
    /// Creates an [`InvalidOption`](Self::InvalidOption) error.
    #[must_use]
    pub fn invalid_option(option: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidOption {
            option: option.into(),
            reason: reason.into(),
        }
    }
}

/// Errors produced while turning delimited lines into a [`Record`](crate::Record).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RecordError {
    /// The header line is empty.
    #[error("header line is empty")]
    EmptyHeader,

    /// The data line is empty.
    #[error("data line is empty")]
    EmptyLine,

    /// The data line has a different number of fields than the header.
    #[error("expected {expected} fields, found {found}")]
    FieldCountMismatch {
        /// Number of header fields.
        expected: usize,
        /// Number of fields on the data line.
        found: usize,
    },

    /// The data line is not valid UTF-8.
    #[error("line is not valid UTF-8")]
    InvalidEncoding,
}
