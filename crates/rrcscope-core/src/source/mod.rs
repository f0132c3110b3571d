//! Input sources for the pipeline. All file I/O lives here so the
//! analysis layer stays side-effect free.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed packet record at line {line}: {message}")]
    Malformed { line: usize, message: String },
}

/// Packet-derived record produced by the upstream capture classifier.
///
/// `time` stays optional at this boundary: a record without a timestamp
/// is a programming invariant violation and the merge stage fails fast on
/// it instead of silently dropping the record.
#[derive(Debug, Clone, Deserialize)]
pub struct PacketRecord {
    #[serde(default)]
    pub time: Option<i64>,
    pub destination: String,
    pub is_candidate: bool,
}

/// Read a trace file into lines. Records are line-oriented and traces are
/// processed as a whole, so the file is materialized up front.
pub fn read_trace_lines(path: &Path) -> Result<Vec<String>, SourceError> {
    let file = File::open(path)?;
    let mut lines = Vec::new();
    for line in BufReader::new(file).lines() {
        lines.push(line?);
    }
    Ok(lines)
}

/// Read packet records from a JSON Lines file; blank lines are allowed.
pub fn read_packet_records(path: &Path) -> Result<Vec<PacketRecord>, SourceError> {
    let file = File::open(path)?;
    let mut records = Vec::new();
    for (index, line) in BufReader::new(file).lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let record =
            serde_json::from_str(&line).map_err(|err| SourceError::Malformed {
                line: index + 1,
                message: err.to_string(),
            })?;
        records.push(record);
    }
    Ok(records)
}
