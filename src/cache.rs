//! Writes to the project cache of the `velocitas` CLI.
//!
//! The CLI scans a component's stdout for lines of the form
//! `key='value' >> VELOCITAS_CACHE` and stores them; later components read them
//! back through `VELOCITAS_CACHE_DATA`.

use std::io::{self, Write};

use tracing::debug;

/// Quotes `value` the way the CLI parses it back: single quotes, or double
/// quotes when the value itself contains a single quote but no double quote.
fn quote(value: &str) -> String {
    let delimiter = if value.contains('\'') && !value.contains('"') {
        '"'
    } else {
        '\''
    };
    let mut quoted = String::with_capacity(value.len() + 2);
    quoted.push(delimiter);
    for c in value.chars() {
        match c {
            '\\' => quoted.push_str("\\\\"),
            '\n' => quoted.push_str("\\n"),
            '\t' => quoted.push_str("\\t"),
            '\r' => quoted.push_str("\\r"),
            c if c == delimiter => {
                quoted.push('\\');
                quoted.push(c);
            }
            c => quoted.push(c),
        }
    }
    quoted.push(delimiter);
    quoted
}

pub fn cache_line(key: &str, value: &str) -> String {
    format!("{key}={} >> VELOCITAS_CACHE", quote(value))
}

pub fn write_cache_entry<W: Write>(out: &mut W, key: &str, value: &str) -> io::Result<()> {
    debug!(key, value, "Writing cache entry");
    writeln!(out, "{}", cache_line(key, value))
}
