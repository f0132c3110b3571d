//! Signal-strength extraction from pipe-delimited diagnostic lines.

use crate::event::SignalSnapshot;

const MIN_FIELDS: usize = 10;

/// Parse a pipe-delimited measurement line into a signal snapshot.
///
/// Lines with fewer than ten fields are not measurement lines. Two column
/// layouts exist and the sign of field 2 selects between them: a
/// non-negative value means the row is shifted by one column. Any
/// non-numeric field, or a zero RSRQ, invalidates the whole line; the
/// snapshot is published atomically or not at all.
pub(crate) fn parse_signal_line(line: &str) -> Option<SignalSnapshot> {
    let fields: Vec<&str> = line.split('|').collect();
    if fields.len() < MIN_FIELDS {
        return None;
    }

    let probe = parse_field(fields[2])?;
    let (rssi, rsrp, rsrq) = if probe >= 0.0 {
        (
            parse_field(fields[3])?,
            parse_field(fields[4])?,
            parse_field(fields[7])?,
        )
    } else {
        (probe, parse_field(fields[3])?, parse_field(fields[6])?)
    };
    if rsrq == 0.0 {
        return None;
    }

    Some(SignalSnapshot {
        rssi,
        rsrp,
        rsrq,
        power_ratio: rsrp / rsrq,
    })
}

fn parse_field(field: &str) -> Option<f64> {
    field.trim().parse::<f64>().ok()
}
