//! File filtering for the crawler.
//!
//! A [`FileFilter`] decides which directory entries and file events are
//! worth queueing. [`InputFileFilter`] implements the
//! `<customer>_<recordtype>_<date>.<ext>` naming convention.
//!
//! # Examples
//!
//! ```
//! use rf_watcher::{FileFilter, InputFileFilter};
//! use camino::Utf8Path;
//!
//! let filter = InputFileFilter::new("csv");
//!
//! assert!(filter.should_process(Utf8Path::new("in/acme_people_20240101.csv")));
//! assert!(filter.should_process(Utf8Path::new("in/acme_people_20240101.CSV")));
//!
//! assert!(!filter.should_process(Utf8Path::new("in/acme_people.csv")));
//! assert!(!filter.should_process(Utf8Path::new("in/acme_people_20240101.txt")));
//! ```

use camino::Utf8Path;
use rf_core::InputName;

/// A filter for determining which files the crawler queues.
///
/// Filters must be [`Send`] and [`Sync`] because they are shared with the
/// debounce task.
///
/// # Examples
///
/// ```
/// use rf_watcher::FileFilter;
/// use camino::Utf8Path;
///
/// struct NoArchive;
///
/// impl FileFilter for NoArchive {
///     fn should_process(&self, path: &Utf8Path) -> bool {
///         !path.as_str().contains("archive")
///     }
/// }
/// ```
pub trait FileFilter: Send + Sync + 'static {
    /// Returns `true` if the file at `path` should be queued.
    fn should_process(&self, path: &Utf8Path) -> bool;
}

/// Accepts file names following the input naming convention with the
/// configured extension.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputFileFilter {
    extension: String,
}

impl InputFileFilter {
    /// Creates a filter for the given extension (with or without the dot).
    #[must_use]
    pub fn new(extension: impl Into<String>) -> Self {
        let extension: String = extension.into();
        Self {
            extension: extension.trim_start_matches('.').to_owned(),
        }
    }

    /// The accepted extension, without the leading dot.
    #[inline]
    #[must_use]
    pub fn extension(&self) -> &str {
        &self.extension
    }
}

impl Default for InputFileFilter {
    fn default() -> Self {
        Self::new("csv")
    }
}

impl FileFilter for InputFileFilter {
    #[inline]
    fn should_process(&self, path: &Utf8Path) -> bool {
        InputName::matches(path, &self.extension)
    }
}

impl<F: FileFilter + ?Sized> FileFilter for Box<F> {
    fn should_process(&self, path: &Utf8Path) -> bool {
        (**self).should_process(path)
    }
}

impl<F: FileFilter + ?Sized> FileFilter for std::sync::Arc<F> {
    fn should_process(&self, path: &Utf8Path) -> bool {
        (**self).should_process(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_input_filter_convention() {
        let filter = InputFileFilter::default();
        assert!(filter.should_process(Utf8Path::new("/in/acme_people_20240101.csv")));
        assert!(!filter.should_process(Utf8Path::new("/in/acme_people_20240101_x.csv")));
        assert!(!filter.should_process(Utf8Path::new("/in/acme_people_20240101_groupA.csv")));
        assert!(!filter.should_process(Utf8Path::new("/in/notes.txt")));
    }

    #[test]
    fn test_input_filter_custom_extension() {
        let filter = InputFileFilter::new(".tsv");
        assert_eq!(filter.extension(), "tsv");
        assert!(filter.should_process(Utf8Path::new("a_b_c.tsv")));
        assert!(!filter.should_process(Utf8Path::new("a_b_c.csv")));
    }

    #[test]
    fn test_boxed_filter() {
        let filter: Box<dyn FileFilter> = Box::new(InputFileFilter::default());
        assert!(filter.should_process(Utf8Path::new("a_b_c.csv")));
        assert!(!filter.should_process(Utf8Path::new("abc.csv")));
    }
}
