//! Lazy, chunked record reading with open retry.
//!
//! [`RecordReader`] opens an input file, reads the header (retrying while
//! the file is still locked or being written), then pulls data lines in
//! chunks and yields one [`Record`] per non-empty line.
//!
//! # Examples
//!
//! ```no_run
//! use rf_core::{InputName, ReaderConfig};
//! use rf_reader::RecordReader;
//!
//! # fn example() -> Result<(), rf_reader::ReadError> {
//! let input = InputName::parse("/data/in/acme_people_20240101.csv", "csv").unwrap();
//! let reader = RecordReader::open(input, &ReaderConfig::default())?;
//!
//! for record in reader {
//!     match record {
//!         Ok(record) => println!("{record}"),
//!         Err(err) if err.is_recoverable() => eprintln!("skipped: {err}"),
//!         Err(err) => return Err(err),
//!     }
//! }
//! # Ok(())
//! # }
//! ```

use std::collections::VecDeque;
use std::fs::File;
use std::io::{self, BufRead, BufReader, Lines};
use std::sync::Arc;

use rf_core::{Header, InputName, ReaderConfig, Record, RecordError};

use crate::error::ReadError;

/// Streams the records of one input file.
///
/// The iterator is single-pass: once [`is_exhausted`](Self::is_exhausted)
/// returns `true` it yields nothing more. A malformed line, including one
/// that is not valid UTF-8, yields a recoverable [`ReadError::Malformed`] and
/// reading continues. Any other read failure yields [`ReadError::Read`] once,
/// after the lines buffered before it, and ends the iteration.
pub struct RecordReader {
    input: InputName,
    header: Arc<Header>,
    lines: Lines<BufReader<File>>,
    chunk: VecDeque<(usize, Result<String, RecordError>)>,
    chunk_size: usize,
    lines_read: usize,
    end_of_file: bool,
    failure: Option<ReadError>,
}

impl std::fmt::Debug for RecordReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordReader")
            .field("input", &self.input.path())
            .field("fields", &self.header.len())
            .field("lines_read", &self.lines_read)
            .field("is_exhausted", &self.is_exhausted())
            .finish_non_exhaustive()
    }
}

impl RecordReader {
    /// Opens `input` and reads its header line.
    ///
    /// Opening and reading the header are attempted up to
    /// `config.max_attempts` times, pausing `config.retry_delay()` between
    /// attempts.
    ///
    /// # Errors
    ///
    /// Returns [`ReadError::Open`] with the last I/O error when every
    /// attempt fails, and [`ReadError::EmptyHeader`] when the file has no
    /// header line.
    pub fn open(input: InputName, config: &ReaderConfig) -> Result<Self, ReadError> {
        let max_attempts = config.max_attempts.max(1);
        let mut attempt = 1;

        let (lines, header_line) = loop {
            match open_with_header(&input) {
                Ok(opened) => break opened,
                Err(source) if attempt < max_attempts => {
                    tracing::debug!(
                        path = %input.path(),
                        attempt,
                        error = %source,
                        "Input not readable yet, retrying"
                    );
                    std::thread::sleep(config.retry_delay());
                    attempt += 1;
                }
                Err(source) => {
                    return Err(ReadError::Open {
                        path: input.path().to_owned(),
                        attempts: attempt,
                        source,
                    });
                }
            }
        };

        let Some(header_line) = header_line else {
            return Err(ReadError::EmptyHeader {
                path: input.path().to_owned(),
            });
        };
        let header = Header::parse(&header_line).map_err(|_| ReadError::EmptyHeader {
            path: input.path().to_owned(),
        })?;

        Ok(Self {
            input,
            header: Arc::new(header),
            lines,
            chunk: VecDeque::with_capacity(config.chunk_size),
            chunk_size: config.chunk_size.max(1),
            lines_read: 0,
            end_of_file: false,
            failure: None,
        })
    }

    /// The input file being read.
    #[inline]
    #[must_use]
    pub fn input(&self) -> &InputName {
        &self.input
    }

    /// The header shared by every record from this file.
    #[inline]
    #[must_use]
    pub fn header(&self) -> &Arc<Header> {
        &self.header
    }

    /// Number of data lines pulled from the file so far, blank ones included.
    #[inline]
    #[must_use]
    pub fn lines_read(&self) -> usize {
        self.lines_read
    }

    /// Returns `true` once the whole file has been read and yielded.
    #[inline]
    #[must_use]
    pub fn is_exhausted(&self) -> bool {
        self.end_of_file && self.chunk.is_empty() && self.failure.is_none()
    }

    /// Pulls the next chunk of lines into the buffer.
    ///
    /// A line that is not valid UTF-8 has already been consumed by the
    /// underlying reader, so it is buffered as an error and reading goes on.
    /// Any other I/O error stops the file; it is kept in `failure` and
    /// reported once the lines before it have been yielded.
    fn fill_chunk(&mut self) {
        while self.chunk.len() < self.chunk_size {
            match self.lines.next() {
                Some(Ok(line)) => {
                    self.lines_read += 1;
                    // The header is line 1.
                    self.chunk.push_back((self.lines_read + 1, Ok(line)));
                }
                Some(Err(source)) if source.kind() == io::ErrorKind::InvalidData => {
                    self.lines_read += 1;
                    self.chunk
                        .push_back((self.lines_read + 1, Err(RecordError::InvalidEncoding)));
                }
                Some(Err(source)) => {
                    self.end_of_file = true;
                    self.failure = Some(ReadError::read(self.input.path(), source));
                    break;
                }
                None => {
                    self.end_of_file = true;
                    break;
                }
            }
        }
        tracing::trace!(
            path = %self.input.path(),
            buffered = self.chunk.len(),
            lines_read = self.lines_read,
            "Chunk loaded"
        );
    }
}

impl Iterator for RecordReader {
    type Item = Result<Record, ReadError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.chunk.is_empty() {
                if self.end_of_file {
                    return self.failure.take().map(Err);
                }
                self.fill_chunk();
                continue;
            }

            let (line_number, line) = self.chunk.pop_front()?;
            let parsed = line.and_then(|line| {
                if line.trim_end_matches('\r').is_empty() {
                    Ok(None)
                } else {
                    Record::parse(&self.header, &line).map(Some)
                }
            });
            match parsed {
                Ok(None) => {}
                Ok(Some(record)) => return Some(Ok(record)),
                Err(source) => {
                    return Some(Err(ReadError::malformed(
                        self.input.path(),
                        line_number,
                        source,
                    )));
                }
            }
        }
    }
}

impl std::iter::FusedIterator for RecordReader {}

/// Opens the file and reads its first line. `None` means the file is empty.
fn open_with_header(input: &InputName) -> io::Result<(Lines<BufReader<File>>, Option<String>)> {
    let file = File::open(input.path())?;
    let mut lines = BufReader::new(file).lines();
    let header = lines.next().transpose()?;
    Ok((lines, header))
}

#[cfg(test)]
mod tests {
    use super::*;
    use camino::Utf8PathBuf;
    use std::fs;
    use tempfile::TempDir;

    fn write_input(dir: &TempDir, name: &str, contents: &str) -> InputName {
        let path = Utf8PathBuf::from_path_buf(dir.path().join(name)).unwrap();
        fs::write(&path, contents).unwrap();
        InputName::parse(path, "csv").unwrap()
    }

    fn config(chunk_size: usize) -> ReaderConfig {
        ReaderConfig {
            chunk_size,
            max_attempts: 2,
            retry_delay_ms: 1,
        }
    }

    #[test]
    fn test_reads_all_records_across_chunks() {
        let dir = TempDir::new().unwrap();
        let mut contents = String::from("Id,Name\n");
        for i in 0..25 {
            contents.push_str(&format!("{i},name{i}\n"));
        }
        let input = write_input(&dir, "acme_people_1.csv", &contents);

        let reader = RecordReader::open(input, &config(10)).unwrap();
        let records: Vec<Record> = reader.map(Result::unwrap).collect();
        assert_eq!(records.len(), 25);
        assert_eq!(records[0].get("Id"), Some("0"));
        assert_eq!(records[24].get("Name"), Some("name24"));
    }

    #[test]
    fn test_blank_lines_are_skipped() {
        let dir = TempDir::new().unwrap();
        let input = write_input(&dir, "a_b_c.csv", "A,B\r\n1,2\r\n\r\n\n3,4\r\n");

        let mut reader = RecordReader::open(input, &config(100)).unwrap();
        let first = reader.next().unwrap().unwrap();
        let second = reader.next().unwrap().unwrap();
        assert_eq!(first.to_csv_line(), "1,2");
        assert_eq!(second.get("B"), Some("4"));
        assert!(reader.next().is_none());
        assert!(reader.is_exhausted());
        assert_eq!(reader.lines_read(), 4);
    }

    #[test]
    fn test_malformed_line_reports_line_number_and_continues() {
        let dir = TempDir::new().unwrap();
        let input = write_input(&dir, "a_b_c.csv", "A,B,C\n1,2,3\n4,5\n6,7,8\n");

        let results: Vec<_> = RecordReader::open(input, &config(2)).unwrap().collect();
        assert_eq!(results.len(), 3);
        assert!(results[0].is_ok());
        match &results[1] {
            Err(ReadError::Malformed { line, source, .. }) => {
                assert_eq!(*line, 3);
                assert_eq!(
                    *source,
                    RecordError::FieldCountMismatch {
                        expected: 3,
                        found: 2
                    }
                );
            }
            other => panic!("expected malformed line, got {other:?}"),
        }
        assert_eq!(results[2].as_ref().unwrap().get("C"), Some("8"));
    }

    #[test]
    fn test_invalid_utf8_line_is_skipped_without_losing_the_chunk() {
        let dir = TempDir::new().unwrap();
        let path = Utf8PathBuf::from_path_buf(dir.path().join("a_b_c.csv")).unwrap();
        fs::write(&path, b"A,B\n1,2\n3,4\n5,\xff\n7,8\n").unwrap();
        let input = InputName::parse(path, "csv").unwrap();

        let mut reader = RecordReader::open(input, &config(100)).unwrap();
        assert_eq!(reader.next().unwrap().unwrap().to_csv_line(), "1,2");
        assert_eq!(reader.next().unwrap().unwrap().to_csv_line(), "3,4");
        match reader.next() {
            Some(Err(err @ ReadError::Malformed { .. })) => {
                assert!(err.is_recoverable());
                assert!(matches!(
                    err,
                    ReadError::Malformed {
                        line: 4,
                        source: RecordError::InvalidEncoding,
                        ..
                    }
                ));
            }
            other => panic!("expected malformed line, got {other:?}"),
        }
        assert_eq!(reader.next().unwrap().unwrap().get("A"), Some("7"));
        assert!(reader.next().is_none());
        assert!(reader.is_exhausted());
        assert_eq!(reader.lines_read(), 4);
    }

    #[test]
    fn test_read_failure_is_reported_after_buffered_lines() {
        let dir = TempDir::new().unwrap();
        let input = write_input(&dir, "a_b_c.csv", "A,B\n1,2\n3,4\n");

        let mut reader = RecordReader::open(input, &config(100)).unwrap();
        reader.chunk.push_back((2, Ok("1,2".to_owned())));
        reader.chunk.push_back((3, Ok("3,4".to_owned())));
        reader.end_of_file = true;
        reader.failure = Some(ReadError::read(
            reader.input().path(),
            io::Error::other("device gone"),
        ));

        let results: Vec<_> = reader.by_ref().collect();
        assert_eq!(results.len(), 3);
        assert_eq!(results[0].as_ref().unwrap().to_csv_line(), "1,2");
        assert_eq!(results[1].as_ref().unwrap().to_csv_line(), "3,4");
        assert!(matches!(&results[2], Err(ReadError::Read { .. })));
        assert!(reader.next().is_none());
        assert!(reader.is_exhausted());
    }

    #[test]
    fn test_empty_file_has_no_header() {
        let dir = TempDir::new().unwrap();
        let input = write_input(&dir, "a_b_c.csv", "");
        assert!(matches!(
            RecordReader::open(input, &config(10)),
            Err(ReadError::EmptyHeader { .. })
        ));

        let input = write_input(&dir, "d_e_f.csv", "\n1,2\n");
        assert!(matches!(
            RecordReader::open(input, &config(10)),
            Err(ReadError::EmptyHeader { .. })
        ));
    }

    #[test]
    fn test_header_only_file_yields_nothing() {
        let dir = TempDir::new().unwrap();
        let input = write_input(&dir, "a_b_c.csv", "A,B\n");
        let mut reader = RecordReader::open(input, &config(10)).unwrap();
        assert_eq!(reader.header().names(), ["A", "B"]);
        assert!(reader.next().is_none());
        assert!(reader.is_exhausted());
    }

    #[test]
    fn test_missing_file_fails_after_all_attempts() {
        let dir = TempDir::new().unwrap();
        let path = Utf8PathBuf::from_path_buf(dir.path().join("a_b_c.csv")).unwrap();
        let input = InputName::parse(path, "csv").unwrap();

        match RecordReader::open(input, &config(10)) {
            Err(ReadError::Open { attempts, source, .. }) => {
                assert_eq!(attempts, 2);
                assert_eq!(source.kind(), io::ErrorKind::NotFound);
            }
            other => panic!("expected open failure, got {other:?}"),
        }
    }

    #[test]
    fn test_input_metadata_is_exposed() {
        let dir = TempDir::new().unwrap();
        let input = write_input(&dir, "acme_people_20240101.csv", "A\n1\n");
        let reader = RecordReader::open(input, &config(10)).unwrap();
        assert_eq!(reader.input().customer(), "acme");
        assert_eq!(reader.input().record_type(), "people");
        assert_eq!(reader.input().date(), "20240101");
    }
}
