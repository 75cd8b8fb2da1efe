//! Writes the collected records as one indented JSON document.

use crate::error::OutputError;
use crate::record::Record;
use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use std::path::Path;

/// Serialize `records` to `path` in a single write, replacing any previous file.
pub fn write_records(path: &Path, records: &[Record]) -> Result<(), OutputError> {
    let mut buf = Vec::new();
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, PrettyFormatter::with_indent(b"    "));
    records.serialize(&mut ser)?;
    std::fs::write(path, buf)?;
    Ok(())
}
