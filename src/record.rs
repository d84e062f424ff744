//! Records and the streaming record reader
//!
//! A [`Record`] is one input line with its terminator stripped, together with
//! the fields obtained by splitting it on the configured separator. Fields are
//! computed once, when the record is read, and never change afterwards.

use crate::error::{SortError, SortResult};
use std::io::{BufRead, Write};

/// One input line and its pre-split fields
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    original: String,
    fields: Vec<String>,
}

impl Record {
    /// Build a record from a line without its terminator.
    ///
    /// An empty `separator` splits on runs of whitespace and drops empty
    /// leading and trailing fields; any other separator splits literally, so
    /// adjacent separators produce empty fields.
    pub fn new(original: String, separator: &str) -> Self {
        let fields = if separator.is_empty() {
            original.split_whitespace().map(str::to_owned).collect()
        } else {
            original.split(separator).map(str::to_owned).collect()
        };
        Self { original, fields }
    }

    /// The verbatim line
    pub fn original(&self) -> &str {
        &self.original
    }

    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    /// Field `index` (1-based), if the record has that many fields
    pub fn field(&self, index: usize) -> Option<&str> {
        index
            .checked_sub(1)
            .and_then(|i| self.fields.get(i))
            .map(String::as_str)
    }

    pub fn into_original(self) -> String {
        self.original
    }
}

/// Lazy, single-pass reader producing one [`Record`] per line
pub struct RecordReader<R> {
    reader: R,
    separator: String,
    buffer: String,
    strip_cr: bool,
    finished: bool,
}

impl<R: BufRead> RecordReader<R> {
    /// Reader for caller input: `\n` and `\r\n` both end a record
    pub fn new(reader: R, separator: &str) -> Self {
        Self {
            reader,
            separator: separator.to_string(),
            buffer: String::with_capacity(256),
            strip_cr: true,
            finished: false,
        }
    }

    /// Reader for data this crate wrote itself: only `\n` is removed, so
    /// every record reads back exactly as it was written
    pub fn verbatim(reader: R, separator: &str) -> Self {
        Self {
            strip_cr: false,
            ..Self::new(reader, separator)
        }
    }

    /// Read the next record, `Ok(None)` at end of input
    pub fn next_record(&mut self) -> std::io::Result<Option<Record>> {
        self.buffer.clear();
        if self.reader.read_line(&mut self.buffer)? == 0 {
            return Ok(None);
        }

        if self.buffer.ends_with('\n') {
            self.buffer.pop();
        }
        if self.strip_cr && self.buffer.ends_with('\r') {
            self.buffer.pop();
        }

        let line = std::mem::replace(&mut self.buffer, String::with_capacity(256));
        Ok(Some(Record::new(line, &self.separator)))
    }
}

impl<R: BufRead> Iterator for RecordReader<R> {
    type Item = SortResult<Record>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        match self.next_record() {
            Ok(Some(record)) => Some(Ok(record)),
            Ok(None) => {
                self.finished = true;
                None
            }
            Err(err) => {
                self.finished = true;
                Some(Err(SortError::read(err)))
            }
        }
    }
}

/// Read every record from `reader` into memory
pub fn read_records<R: BufRead>(reader: R, separator: &str) -> SortResult<Vec<Record>> {
    RecordReader::new(reader, separator).collect()
}

/// Write one record and its terminator
#[inline]
pub fn write_record<W: Write + ?Sized>(record: &Record, output: &mut W) -> std::io::Result<()> {
    output.write_all(record.original().as_bytes())?;
    output.write_all(b"\n")
}

/// Write records to `output`, one per line, and flush
pub fn write_records<'a, I, W>(records: I, output: &mut W) -> SortResult<()>
where
    I: IntoIterator<Item = &'a Record>,
    W: Write + ?Sized,
{
    for record in records {
        write_record(record, output).map_err(SortError::write)?;
    }
    output.flush().map_err(SortError::write)
}
