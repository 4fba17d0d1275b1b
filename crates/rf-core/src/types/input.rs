//! Input file names following the `<customer>_<recordtype>_<date>.<ext>`
//! convention.

use std::fmt;

use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};

/// Separator between the parts of an input file stem.
pub const NAME_SEPARATOR: char = '_';

/// A pending input file together with the metadata encoded in its name.
///
/// # Examples
///
/// ```
/// use rf_core::InputName;
///
/// let input = InputName::parse("/in/acme_people_20240101.csv", "csv").unwrap();
/// assert_eq!(input.customer(), "acme");
/// assert_eq!(input.record_type(), "people");
/// assert_eq!(input.date(), "20240101");
///
/// assert!(InputName::parse("/in/readme.txt", "csv").is_none());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InputName {
    path: Utf8PathBuf,
    customer: String,
    record_type: String,
    date: String,
}

impl InputName {
    /// Parses `path` if its file name follows the input naming convention.
    ///
    /// The extension is compared case-insensitively. Empty `_`-separated
    /// parts are ignored, and exactly three parts must remain.
    #[must_use]
    pub fn parse(path: impl Into<Utf8PathBuf>, extension: &str) -> Option<Self> {
        let path = path.into();
        let (customer, record_type, date) = Self::split_name(&path, extension)?;
        Some(Self {
            customer: customer.to_owned(),
            record_type: record_type.to_owned(),
            date: date.to_owned(),
            path,
        })
    }

    /// Returns `true` if `path` follows the naming convention.
    #[must_use]
    pub fn matches(path: &Utf8Path, extension: &str) -> bool {
        Self::split_name(path, extension).is_some()
    }

    fn split_name<'a>(path: &'a Utf8Path, extension: &str) -> Option<(&'a str, &'a str, &'a str)> {
        let ext = path.extension()?;
        if !ext.eq_ignore_ascii_case(extension.trim_start_matches('.')) {
            return None;
        }

        let mut parts = path
            .file_stem()?
            .split(NAME_SEPARATOR)
            .filter(|part| !part.is_empty());
        let customer = parts.next()?;
        let record_type = parts.next()?;
        let date = parts.next()?;
        if parts.next().is_some() {
            return None;
        }
        Some((customer, record_type, date))
    }

    /// Full path of the input file.
    #[inline]
    #[must_use]
    pub fn path(&self) -> &Utf8Path {
        &self.path
    }

    /// Customer part of the name.
    #[inline]
    #[must_use]
    pub fn customer(&self) -> &str {
        &self.customer
    }

    /// Record type part of the name.
    #[inline]
    #[must_use]
    pub fn record_type(&self) -> &str {
        &self.record_type
    }

    /// Date part of the name, as written.
    #[inline]
    #[must_use]
    pub fn date(&self) -> &str {
        &self.date
    }

    /// File name without its extension.
    #[must_use]
    pub fn stem(&self) -> &str {
        self.path.file_stem().unwrap_or_default()
    }

    /// Extension as written in the file name.
    #[must_use]
    pub fn extension(&self) -> &str {
        self.path.extension().unwrap_or_default()
    }

    /// File name including the extension.
    #[must_use]
    pub fn file_name(&self) -> &str {
        self.path.file_name().unwrap_or_default()
    }
}

impl fmt::Display for InputName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.path)
    }
}
