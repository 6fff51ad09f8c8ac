//! Record Reader
//!
//! Streams delimited records out of a buffered reader, one at a time.

use std::io::BufRead;

use crate::error::{HotKvError, Result};

use super::{DELIMITER, QUOTE};

/// One parsed record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    /// 1-based line on which the record starts
    pub line: usize,

    /// Unescaped field contents
    pub fields: Vec<String>,
}

/// Reads records from a delimited text stream
pub struct RecordReader<R> {
    inner: R,

    /// Lines consumed so far
    line: usize,

    /// Raw bytes of the current physical line, terminator included
    buf: Vec<u8>,

    /// Set once an error has been returned
    failed: bool,
}

impl<R: BufRead> RecordReader<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            line: 0,
            buf: Vec::new(),
            failed: false,
        }
    }

    /// Read the next record
    ///
    /// Returns `Ok(None)` at end of stream. Blank lines are skipped.
    pub fn next_record(&mut self) -> Result<Option<Record>> {
        if self.failed {
            return Ok(None);
        }
        let result = self.read_record();
        if result.is_err() {
            self.failed = true;
        }
        result
    }

    /// Number of physical lines consumed so far
    pub fn lines_read(&self) -> usize {
        self.line
    }

    /// Give back the underlying reader
    pub fn into_inner(self) -> R {
        self.inner
    }

    fn read_record(&mut self) -> Result<Option<Record>> {
        // Skip blank lines
        loop {
            if !self.read_line()? {
                return Ok(None);
            }
            if content_end(&self.buf) > 0 {
                break;
            }
        }

        let start_line = self.line;
        let mut fields = Vec::new();
        let mut pos = 0;

        loop {
            let end = content_end(&self.buf);

            if pos < end && self.buf[pos] == QUOTE {
                let (field, next) = self.read_quoted(pos + 1, start_line)?;
                fields.push(into_string(field, start_line)?);

                let end = content_end(&self.buf);
                if next == end {
                    break;
                }
                if self.buf[next] != DELIMITER {
                    return Err(HotKvError::invalid_format(
                        self.line,
                        format!("unexpected {:?} after closing quote", self.buf[next] as char),
                    ));
                }
                pos = next + 1;
            } else {
                let stop = self.buf[pos..end]
                    .iter()
                    .position(|&b| b == DELIMITER)
                    .map_or(end, |i| pos + i);
                let raw = &self.buf[pos..stop];
                if raw.contains(&QUOTE) {
                    return Err(HotKvError::invalid_format(
                        self.line,
                        "bare quote in unquoted field",
                    ));
                }
                fields.push(into_string(raw.to_vec(), start_line)?);

                if stop == end {
                    break;
                }
                pos = stop + 1;
            }
        }

        Ok(Some(Record {
            line: start_line,
            fields,
        }))
    }

    /// Read the body of a quoted field starting just past the opening quote
    ///
    /// Continues onto following lines until the closing quote. Returns the
    /// unescaped bytes and the offset just past the closing quote within
    /// the (possibly refreshed) current line.
    fn read_quoted(&mut self, mut pos: usize, start_line: usize) -> Result<(Vec<u8>, usize)> {
        let mut field = Vec::new();

        loop {
            match self.buf[pos..].iter().position(|&b| b == QUOTE) {
                Some(i) => {
                    field.extend_from_slice(&self.buf[pos..pos + i]);
                    pos += i + 1;
                    if self.buf.get(pos) == Some(&QUOTE) {
                        field.push(QUOTE);
                        pos += 1;
                    } else {
                        return Ok((field, pos));
                    }
                }
                None => {
                    // Line break belongs to the field
                    field.extend_from_slice(&self.buf[pos..]);
                    if !self.read_line()? {
                        return Err(HotKvError::invalid_format(
                            start_line,
                            "unterminated quoted field",
                        ));
                    }
                    pos = 0;
                }
            }
        }
    }

    /// Load the next physical line into `buf`; false at end of stream
    fn read_line(&mut self) -> Result<bool> {
        self.buf.clear();
        let n = self.inner.read_until(b'\n', &mut self.buf)?;
        if n == 0 {
            return Ok(false);
        }
        self.line += 1;
        Ok(true)
    }
}

impl<R: BufRead> Iterator for RecordReader<R> {
    type Item = Result<Record>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_record().transpose()
    }
}

/// Length of the line without its LF or CRLF terminator
fn content_end(line: &[u8]) -> usize {
    if line.ends_with(b"\r\n") {
        line.len() - 2
    } else if line.ends_with(b"\n") {
        line.len() - 1
    } else {
        line.len()
    }
}

fn into_string(bytes: Vec<u8>, line: usize) -> Result<String> {
    String::from_utf8(bytes)
        .map_err(|_| HotKvError::invalid_format(line, "field is not valid UTF-8"))
}
