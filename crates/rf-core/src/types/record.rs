//! Delimited records and the shared header they are read against.
//!
//! A [`Header`] is parsed once per input file and shared by every [`Record`]
//! read from that file, so field lookups by name are a single hash probe and
//! cloning a record only bumps two reference counts.

use std::fmt;
use std::sync::Arc;

use crate::error::RecordError;
use crate::hash::{FxHashMap, fx_hash_map_with_capacity};

/// Field delimiter for headers and data lines.
pub const FIELD_DELIMITER: char = ',';

/// Ordered field names with an index for name lookups.
///
/// When a name appears more than once, lookups resolve to its first position.
///
/// # Examples
///
/// ```
/// use rf_core::Header;
///
/// let header = Header::parse("FirstName,Age").unwrap();
/// assert_eq!(header.len(), 2);
/// assert_eq!(header.position("Age"), Some(1));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    names: Vec<String>,
    index: FxHashMap<String, usize>,
}

impl Header {
    /// Parses a comma-delimited header line.
    ///
    /// # Errors
    ///
    /// Returns [`RecordError::EmptyHeader`] when the line is empty.
    pub fn parse(line: &str) -> Result<Self, RecordError> {
        let line = line.trim_end_matches('\r');
        if line.is_empty() {
            return Err(RecordError::EmptyHeader);
        }
        Ok(Self::from_names(line.split(FIELD_DELIMITER)))
    }

    /// Builds a header from already split names.
    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let names: Vec<String> = names.into_iter().map(Into::into).collect();
        let mut index = fx_hash_map_with_capacity(names.len());
        for (position, name) in names.iter().enumerate() {
            index.entry(name.clone()).or_insert(position);
        }
        Self { names, index }
    }

    /// Number of fields.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Returns `true` if the header has no fields.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Position of `name`, if the header contains it.
    #[inline]
    #[must_use]
    pub fn position(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    /// Field names in declaration order.
    #[inline]
    #[must_use]
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// The header rendered back to a comma-delimited line.
    #[must_use]
    pub fn to_line(&self) -> String {
        self.names.join(",")
    }
}

/// One data row paired with the header it was read against.
///
/// Invariant: the number of values always equals the number of header names.
///
/// # Examples
///
/// ```
/// use rf_core::Record;
///
/// let record = Record::from_lines("FirstName,Age", "John,32").unwrap();
/// assert_eq!(record.get("FirstName"), Some("John"));
/// assert_eq!(record.get("LastName"), None);
/// assert_eq!(record.to_csv_line(), "John,32");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    header: Arc<Header>,
    values: Arc<[String]>,
}

impl Record {
    /// Parses a data line against a shared header.
    ///
    /// # Errors
    ///
    /// Returns [`RecordError::EmptyLine`] for an empty line and
    /// [`RecordError::FieldCountMismatch`] when the arity differs from the
    /// header.
    pub fn parse(header: &Arc<Header>, line: &str) -> Result<Self, RecordError> {
        let line = line.trim_end_matches('\r');
        if line.is_empty() {
            return Err(RecordError::EmptyLine);
        }

        let values: Vec<String> = line.split(FIELD_DELIMITER).map(str::to_owned).collect();
        if values.len() != header.len() {
            return Err(RecordError::FieldCountMismatch {
                expected: header.len(),
                found: values.len(),
            });
        }

        Ok(Self {
            header: Arc::clone(header),
            values: values.into(),
        })
    }

    /// Parses a header line and a data line in one step.
    ///
    /// # Errors
    ///
    /// See [`Header::parse`] and [`Record::parse`].
    pub fn from_lines(header: &str, line: &str) -> Result<Self, RecordError> {
        let header = Arc::new(Header::parse(header)?);
        Self::parse(&header, line)
    }

    /// Builds a record from `(name, value)` pairs.
    ///
    /// ```
    /// use rf_core::Record;
    ///
    /// let record = Record::from_pairs([("Age", "18")]);
    /// assert_eq!(record.header_line(), "Age");
    /// ```
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let (names, values): (Vec<String>, Vec<String>) = pairs
            .into_iter()
            .map(|(name, value)| (name.into(), value.into()))
            .unzip();
        Self {
            header: Arc::new(Header::from_names(names)),
            values: values.into(),
        }
    }

    /// Value of `field`, or `None` if the record has no such field.
    #[inline]
    #[must_use]
    pub fn get(&self, field: &str) -> Option<&str> {
        self.header
            .position(field)
            .and_then(|position| self.values.get(position))
            .map(String::as_str)
    }

    /// Returns `true` if the record has a field called `field`.
    #[inline]
    #[must_use]
    pub fn contains(&self, field: &str) -> bool {
        self.header.position(field).is_some()
    }

    /// `(name, value)` pairs in field order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.header
            .names()
            .iter()
            .map(String::as_str)
            .zip(self.values.iter().map(String::as_str))
    }

    /// Field names in order.
    #[inline]
    #[must_use]
    pub fn field_names(&self) -> &[String] {
        self.header.names()
    }

    /// Values in field order.
    #[inline]
    #[must_use]
    pub fn values(&self) -> &[String] {
        &self.values
    }

    /// Number of fields.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns `true` if the record has no fields.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// The shared header.
    #[inline]
    #[must_use]
    pub fn header(&self) -> &Arc<Header> {
        &self.header
    }

    /// Values joined back into a data line.
    #[must_use]
    pub fn to_csv_line(&self) -> String {
        self.values.join(",")
    }

    /// Field names joined into a header line.
    #[must_use]
    pub fn header_line(&self) -> String {
        self.header.to_line()
    }
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_csv_line())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_parse() {
        let header = Header::parse("FirstName,LastName,Age\r").unwrap();
        assert_eq!(header.names(), ["FirstName", "LastName", "Age"]);
        assert_eq!(header.position("Age"), Some(2));
        assert_eq!(header.position("Missing"), None);
    }

    #[test]
    fn test_header_empty_is_error() {
        assert!(matches!(Header::parse(""), Err(RecordError::EmptyHeader)));
    }

    #[test]
    fn test_header_duplicate_name_resolves_first() {
        let header = Header::parse("A,B,A").unwrap();
        assert_eq!(header.len(), 3);
        assert_eq!(header.position("A"), Some(0));
    }

    #[test]
    fn test_record_lookup() {
        let record = Record::from_lines("FirstName,Age", "John,32").unwrap();
        assert_eq!(record.get("FirstName"), Some("John"));
        assert_eq!(record.get("Age"), Some("32"));
        assert!(record.contains("Age"));
        assert!(!record.contains("age"));
        assert_eq!(record.len(), 2);
    }

    #[test]
    fn test_record_arity_mismatch() {
        let err = Record::from_lines("A,B,C", "1,2").unwrap_err();
        assert!(matches!(
            err,
            RecordError::FieldCountMismatch {
                expected: 3,
                found: 2
            }
        ));
    }

    #[test]
    fn test_record_empty_line() {
        assert!(matches!(
            Record::from_lines("A", ""),
            Err(RecordError::EmptyLine)
        ));
    }

    #[test]
    fn test_record_keeps_empty_values() {
        let record = Record::from_lines("A,B,C", "1,,3").unwrap();
        assert_eq!(record.get("B"), Some(""));
        assert_eq!(record.to_csv_line(), "1,,3");
    }

    #[test]
    fn test_record_iter_in_field_order() {
        let record = Record::from_pairs([("B", "2"), ("A", "1")]);
        let pairs: Vec<_> = record.iter().collect();
        assert_eq!(pairs, vec![("B", "2"), ("A", "1")]);
        assert_eq!(record.header_line(), "B,A");
    }

    #[test]
    fn test_records_share_header() {
        let header = Arc::new(Header::parse("A,B").unwrap());
        let first = Record::parse(&header, "1,2").unwrap();
        let second = Record::parse(&header, "3,4").unwrap();
        assert!(Arc::ptr_eq(first.header(), second.header()));
        assert_eq!(second.to_string(), "3,4");
    }
}
