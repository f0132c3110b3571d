//! Chronological merge of trace and packet event streams.
//!
//! Events are bucketed by timestamp and the buckets visited in increasing
//! order; within a bucket, discovery order is preserved (trace events
//! before packet events, each in input order). Forward fill then repairs
//! the state fields of events that never carried explicit state
//! information, so the segmenter can always classify them.

use std::collections::BTreeMap;

use thiserror::Error;

use crate::event::{Event, PACKET_OTHER, PACKET_RCV, PACKET_SENT};
use crate::source::PacketRecord;

#[derive(Debug, Error)]
pub enum MergeError {
    /// A packet record without a timestamp is an upstream invariant
    /// violation, not a data-quality issue.
    #[error("packet record {index} has no timestamp")]
    MissingTimestamp { index: usize },
}

/// Convert classified packet records into events.
pub(crate) fn packet_events(
    records: &[PacketRecord],
    local_addr: Option<&str>,
) -> Result<Vec<Event>, MergeError> {
    records
        .iter()
        .enumerate()
        .map(|(index, record)| {
            let time = record
                .time
                .ok_or(MergeError::MissingTimestamp { index })?;
            let kind = if !record.is_candidate {
                PACKET_OTHER
            } else if local_addr == Some(record.destination.as_str()) {
                PACKET_SENT
            } else {
                PACKET_RCV
            };
            Ok(Event::new(kind, time))
        })
        .collect()
}

/// Merge the two streams into one non-decreasing sequence, stable within
/// equal timestamps.
pub(crate) fn merge_ordered(trace: Vec<Event>, packets: Vec<Event>) -> Vec<Event> {
    let mut buckets: BTreeMap<i64, Vec<Event>> = BTreeMap::new();
    for event in trace.into_iter().chain(packets) {
        buckets.entry(event.time).or_default().push(event);
    }
    buckets.into_values().flatten().collect()
}

/// Fill missing state fields from the most recent non-null value seen
/// earlier in the sequence, independently for before and after.
/// Idempotent: a second pass changes nothing.
pub(crate) fn forward_fill(events: &mut [Event]) {
    let mut last_before: Option<String> = None;
    let mut last_after: Option<String> = None;
    for event in events {
        match &event.before_state {
            Some(state) => last_before = Some(state.clone()),
            None => event.before_state = last_before.clone(),
        }
        match &event.after_state {
            Some(state) => last_after = Some(state.clone()),
            None => event.after_state = last_after.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(time: Option<i64>, destination: &str, is_candidate: bool) -> PacketRecord {
        PacketRecord {
            time,
            destination: destination.to_string(),
            is_candidate,
        }
    }

    #[test]
    fn packet_records_map_to_packet_kinds() {
        let records = [
            record(Some(10), "10.0.0.9", false),
            record(Some(20), "10.0.0.1", true),
            record(Some(30), "10.0.0.9", true),
        ];
        let events = packet_events(&records, Some("10.0.0.1")).unwrap();
        assert_eq!(events[0].kind, PACKET_OTHER);
        assert_eq!(events[1].kind, PACKET_SENT);
        assert_eq!(events[2].kind, PACKET_RCV);
        assert_eq!(events[1].time, 20);
    }

    #[test]
    fn missing_packet_timestamp_fails_fast() {
        let records = [record(None, "10.0.0.1", true)];
        let err = packet_events(&records, Some("10.0.0.1")).unwrap_err();
        assert!(matches!(err, MergeError::MissingTimestamp { index: 0 }));
    }

    #[test]
    fn merge_is_ordered_and_stable_within_ties() {
        let mut a = Event::new("A", 200);
        a.subtype = Some("trace".to_string());
        let b = Event::new("B", 100);
        let mut p = Event::new(PACKET_RCV, 200);
        p.subtype = Some("packet".to_string());

        let merged = merge_ordered(vec![a, b], vec![p]);
        let times: Vec<i64> = merged.iter().map(|e| e.time).collect();
        assert_eq!(times, vec![100, 200, 200]);
        // Trace events precede packet events at equal timestamps.
        assert_eq!(merged[1].subtype.as_deref(), Some("trace"));
        assert_eq!(merged[2].subtype.as_deref(), Some("packet"));
    }

    #[test]
    fn forward_fill_repairs_and_is_idempotent() {
        let mut events = vec![Event::new("A", 0), Event::new("B", 1), Event::new("C", 2)];
        events[0].before_state = Some("Idle".to_string());
        events[0].after_state = Some("Connected".to_string());

        forward_fill(&mut events);
        assert_eq!(events[1].before_state.as_deref(), Some("Idle"));
        assert_eq!(events[2].after_state.as_deref(), Some("Connected"));

        let snapshot = events.clone();
        forward_fill(&mut events);
        assert_eq!(events, snapshot);
    }

    #[test]
    fn forward_fill_tracks_before_and_after_independently() {
        let mut events = vec![Event::new("A", 0), Event::new("B", 1)];
        events[0].after_state = Some("Connected".to_string());

        forward_fill(&mut events);
        assert_eq!(events[1].before_state, None);
        assert_eq!(events[1].after_state.as_deref(), Some("Connected"));
    }
}
