//! Record Writer
//!
//! Inverse of the reader: renders key/value pairs as a two-column document.

use std::io::Write;

use crate::error::Result;

use super::{DELIMITER, QUOTE};

/// Render pairs as a two-column document, one LF-terminated record per pair
pub fn encode<I, K, V>(pairs: I) -> String
where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: AsRef<str>,
{
    let mut out = String::new();
    for (key, value) in pairs {
        push_field(&mut out, key.as_ref());
        out.push(DELIMITER as char);
        push_field(&mut out, value.as_ref());
        out.push('\n');
    }
    out
}

/// Write pairs as a two-column document to `writer`
pub fn write_records<W, I, K, V>(writer: &mut W, pairs: I) -> Result<()>
where
    W: Write,
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: AsRef<str>,
{
    writer.write_all(encode(pairs).as_bytes())?;
    writer.flush()?;
    Ok(())
}

fn needs_quotes(field: &str) -> bool {
    field.starts_with([' ', '\t'])
        || field
            .bytes()
            .any(|b| b == DELIMITER || b == QUOTE || b == b'\r' || b == b'\n')
}

fn push_field(out: &mut String, field: &str) {
    if !needs_quotes(field) {
        out.push_str(field);
        return;
    }
    out.push(QUOTE as char);
    for c in field.chars() {
        if c == QUOTE as char {
            out.push(QUOTE as char);
        }
        out.push(c);
    }
    out.push(QUOTE as char);
}
