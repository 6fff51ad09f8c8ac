//! Record Decoder Module
//!
//! Parses the two-column mapping document into validated key/value pairs.
//!
//! ## Format
//! ```text
//! ┌────────────────────────────────────────┐
//! │ key , value \n                         │
//! │ key , "value, with ""quotes""" \n      │
//! │ ... (one record per line, no header)   │
//! └────────────────────────────────────────┘
//! ```
//!
//! - Fields are separated by [`DELIMITER`]
//! - A field wrapped in [`QUOTE`] may contain delimiters, line breaks and
//!   doubled quotes
//! - Blank lines are skipped, LF and CRLF line endings are accepted
//! - Every record must have exactly two fields
//!
//! Decoding is all-or-nothing: the first malformed record fails the whole
//! document and no pairs are returned.

mod reader;
mod writer;

use std::io::{BufReader, Read};

use crate::error::{HotKvError, Result};

pub use reader::{Record, RecordReader};
pub use writer::{encode, write_records};

/// Field separator
pub const DELIMITER: u8 = b',';

/// Quote character for fields containing special bytes
pub const QUOTE: u8 = b'"';

/// Decode a whole document into key/value pairs, in document order
///
/// Fails with `InvalidFormat` on the first record that does not have
/// exactly two fields or is malformed, and with `Io` when the stream
/// cannot be read to the end.
pub fn decode<R: Read>(reader: R) -> Result<Vec<(String, String)>> {
    let mut records = RecordReader::new(BufReader::new(reader));
    let mut pairs = Vec::new();

    while let Some(record) = records.next_record()? {
        let line = record.line;
        match <[String; 2]>::try_from(record.fields) {
            Ok([key, value]) => pairs.push((key, value)),
            Err(fields) => {
                return Err(HotKvError::invalid_format(
                    line,
                    format!("expected 2 fields, found {}", fields.len()),
                ))
            }
        }
    }

    Ok(pairs)
}
