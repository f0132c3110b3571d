//! State-transition segmentation.
//!
//! A single-pass fold over the ordered event sequence maintains one open
//! [`Transition`]. An event whose after-state differs from the open
//! span's state (and that is not a packet event) closes the span and
//! opens the next one at its own state and time; the closing event
//! belongs to the boundary, not to either span's between list.

use std::collections::BTreeMap;

use crate::event::{
    AttrValue, Event, SignalSnapshot, is_packet_kind, transition_label,
};

/// Run-length entry of the between list: consecutive repeats of one kind
/// collapse onto the first occurrence, which stays the representative.
#[derive(Debug, Clone)]
pub(crate) struct BetweenEntry {
    pub kind: String,
    pub count: u64,
    pub event: Event,
}

/// A maximal span during which the connectivity state is constant (or
/// only jitters through packet events).
///
/// The per-kind maps start empty; an absent key means "never observed in
/// this span", which is distinct from an explicit zero. Aggregation
/// iterates the global distinct-kind set, so spans stay comparable across
/// the whole run.
#[derive(Debug, Clone)]
pub(crate) struct Transition {
    pub state: Option<String>,
    pub begin_time: i64,
    /// Zero until the span is closed.
    pub end_time: i64,
    /// How the span was entered, set by the first non-packet member.
    pub entered: Option<String>,
    /// How the span was exited, set once at close time.
    pub exited: Option<String>,
    pub between: Vec<BetweenEntry>,
    /// Offset of each kind's first occurrence from the span start.
    pub time_to_reach_first: BTreeMap<String, i64>,
    /// Offset of each kind's last occurrence back from the span end.
    pub time_to_reach_last: BTreeMap<String, i64>,
    pub duplicates_first: BTreeMap<String, u64>,
    pub duplicates_last: BTreeMap<String, u64>,
    pub duplicates_all: BTreeMap<String, u64>,
    pub attributes_first: BTreeMap<String, BTreeMap<String, AttrValue>>,
    pub attributes_last: BTreeMap<String, BTreeMap<String, AttrValue>>,
    pub attributes_all: BTreeMap<String, BTreeMap<String, Vec<AttrValue>>>,
    /// Last-write-wins snapshot from member events.
    pub signal: Option<SignalSnapshot>,
}

impl Transition {
    fn open(state: Option<String>, time: i64) -> Self {
        Transition {
            state,
            begin_time: time,
            end_time: 0,
            entered: None,
            exited: None,
            between: Vec::new(),
            time_to_reach_first: BTreeMap::new(),
            time_to_reach_last: BTreeMap::new(),
            duplicates_first: BTreeMap::new(),
            duplicates_last: BTreeMap::new(),
            duplicates_all: BTreeMap::new(),
            attributes_first: BTreeMap::new(),
            attributes_last: BTreeMap::new(),
            attributes_all: BTreeMap::new(),
            signal: None,
        }
    }

    /// Span duration in milliseconds; meaningful once closed.
    pub(crate) fn duration(&self) -> i64 {
        self.end_time - self.begin_time
    }

    /// Grouping label; present only for spans with a real entry and exit.
    pub(crate) fn group_label(&self) -> Option<String> {
        match (&self.entered, &self.exited) {
            (Some(entered), Some(exited)) => Some(format!("{} {}", entered, exited)),
            _ => None,
        }
    }

    /// Convert the between list into first/last offsets, duplicate counts
    /// and merged attribute lists. Each run-length entry is visited once,
    /// independently of the others.
    fn finalize(&mut self) {
        for entry in &self.between {
            let kind = entry.kind.clone();
            if !self.time_to_reach_first.contains_key(&kind) {
                self.time_to_reach_first
                    .insert(kind.clone(), entry.event.time - self.begin_time);
                self.duplicates_first.insert(kind.clone(), entry.count);
                self.attributes_first
                    .insert(kind.clone(), entry.event.attributes.clone());
            }
            self.time_to_reach_last
                .insert(kind.clone(), self.end_time - entry.event.time);
            self.duplicates_last.insert(kind.clone(), entry.count);
            self.attributes_last
                .insert(kind.clone(), entry.event.attributes.clone());
            *self.duplicates_all.entry(kind.clone()).or_insert(0) += entry.count;

            let merged = self.attributes_all.entry(kind).or_default();
            crate::stats::merge_values(
                merged,
                entry
                    .event
                    .attributes
                    .iter()
                    .map(|(label, value)| (label.clone(), value.clone())),
            );
        }
    }
}

/// Folds the ordered event sequence into closed transitions, filed by
/// group label.
pub(crate) struct Segmenter {
    open: Transition,
    groups: BTreeMap<String, Vec<Transition>>,
}

impl Segmenter {
    pub(crate) fn new() -> Self {
        Segmenter {
            // The sentinel unknown state; the first real state change
            // closes this span unfiled.
            open: Transition::open(None, 0),
            groups: BTreeMap::new(),
        }
    }

    pub(crate) fn push(&mut self, event: &Event) {
        if let Some(signal) = event.signal {
            self.open.signal = Some(signal);
        }

        let packet = is_packet_kind(&event.kind);
        if event.after_state != self.open.state && !packet {
            // Boundary: this event exits the open span and stamps the
            // next one; it joins neither between list.
            self.open.exited = Some(transition_label(
                event.before_state.as_deref(),
                event.after_state.as_deref(),
            ));
            self.open.end_time = event.time;
            self.open.finalize();

            let next = Transition::open(event.after_state.clone(), event.time);
            let closed = std::mem::replace(&mut self.open, next);
            if let Some(label) = closed.group_label() {
                self.groups.entry(label).or_default().push(closed);
            }
            return;
        }

        match self.open.between.last_mut() {
            Some(tail) if tail.kind == event.kind => tail.count += 1,
            _ => self.open.between.push(BetweenEntry {
                kind: event.kind.clone(),
                count: 1,
                event: event.clone(),
            }),
        }
        if !packet {
            self.open.state = event.after_state.clone();
            if self.open.entered.is_none() {
                self.open.entered = Some(transition_label(
                    event.before_state.as_deref(),
                    event.after_state.as_deref(),
                ));
            }
        }
    }

    /// The trailing open span never closed and is discarded.
    pub(crate) fn finish(self) -> BTreeMap<String, Vec<Transition>> {
        self.groups
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{PACKET_RCV, PACKET_SENT};

    fn event(kind: &str, time: i64, before: Option<&str>, after: Option<&str>) -> Event {
        let mut event = Event::new(kind, time);
        event.before_state = before.map(str::to_string);
        event.after_state = after.map(str::to_string);
        event
    }

    fn segment(events: &[Event]) -> BTreeMap<String, Vec<Transition>> {
        let mut segmenter = Segmenter::new();
        for event in events {
            segmenter.push(event);
        }
        segmenter.finish()
    }

    /// State sequence A (t=0) -> B (t=100) -> C (t=250) with three X and
    /// one Y inside the first span and one Z inside the second.
    fn scenario_events() -> Vec<Event> {
        vec![
            event("STATE_CHANGE_IND", 0, None, Some("A")),
            event("X_EVENT", 10, None, Some("A")),
            event("X_EVENT", 20, None, Some("A")),
            event(PACKET_SENT, 25, None, Some("A")),
            event("X_EVENT", 30, None, Some("A")),
            event("Y_EVENT", 60, None, Some("A")),
            event("STATE_CHANGE_IND", 100, Some("A"), Some("B")),
            event("Z_EVENT", 180, Some("A"), Some("B")),
            event("STATE_CHANGE_IND", 250, Some("B"), Some("C")),
        ]
    }

    #[test]
    fn scenario_yields_exactly_two_finalized_transitions() {
        let groups = segment(&scenario_events());
        let labels: Vec<&String> = groups.keys().collect();
        assert_eq!(
            labels,
            vec!["A -> B B -> C", "None -> A A -> B"]
        );

        let first = &groups["None -> A A -> B"][0];
        assert_eq!(first.entered.as_deref(), Some("None -> A"));
        assert_eq!(first.exited.as_deref(), Some("A -> B"));
        assert_eq!(first.duplicates_all["X_EVENT"], 3);
        assert_eq!(first.duplicates_all["Y_EVENT"], 1);
        assert_eq!(first.time_to_reach_first["X_EVENT"], 10);
        assert_eq!(first.begin_time, 0);
        assert_eq!(first.end_time, 100);

        let second = &groups["A -> B B -> C"][0];
        assert_eq!(second.duplicates_all["Z_EVENT"], 1);
        assert_eq!(second.begin_time, 100);
        assert_eq!(second.end_time, 250);
    }

    #[test]
    fn packet_events_never_close_a_span_or_advance_its_state() {
        let events = vec![
            event("STATE_CHANGE_IND", 0, None, Some("A")),
            event("X_EVENT", 10, None, Some("A")),
            // A packet whose filled after-state still lags behind.
            event(PACKET_RCV, 20, None, None),
            event(PACKET_SENT, 30, None, Some("A")),
            event("STATE_CHANGE_IND", 100, Some("A"), Some("B")),
            event("STATE_CHANGE_IND", 200, Some("B"), Some("C")),
        ];
        let groups = segment(&events);
        let span = &groups["None -> A A -> B"][0];
        assert_eq!(span.state.as_deref(), Some("A"));
        assert_eq!(span.duplicates_all[PACKET_RCV], 1);
        assert_eq!(span.duplicates_all[PACKET_SENT], 1);
    }

    #[test]
    fn consecutive_repeats_run_length_encode_on_the_first_occurrence() {
        let events = vec![
            event("STATE_CHANGE_IND", 0, None, Some("A")),
            event("X_EVENT", 10, None, Some("A")),
            event("X_EVENT", 40, None, Some("A")),
            event("Y_EVENT", 50, None, Some("A")),
            event("X_EVENT", 60, None, Some("A")),
            event("STATE_CHANGE_IND", 100, Some("A"), Some("B")),
            event("STATE_CHANGE_IND", 200, Some("B"), Some("C")),
        ];
        let groups = segment(&events);
        let span = &groups["None -> A A -> B"][0];

        // Two runs of X: [X x2, Y, X], first/last anchored per run.
        assert_eq!(span.duplicates_all["X_EVENT"], 3);
        assert_eq!(span.duplicates_first["X_EVENT"], 2);
        assert_eq!(span.duplicates_last["X_EVENT"], 1);
        assert_eq!(span.time_to_reach_first["X_EVENT"], 10);
        assert_eq!(span.time_to_reach_last["X_EVENT"], 40);
    }

    #[test]
    fn offsets_stay_within_the_span() {
        let groups = segment(&scenario_events());
        for spans in groups.values() {
            for span in spans {
                assert!(span.end_time >= span.begin_time);
                let duration = span.duration();
                for offset in span.time_to_reach_first.values() {
                    assert!((0..=duration).contains(offset));
                }
                for offset in span.time_to_reach_last.values() {
                    assert!((0..=duration).contains(offset));
                }
            }
        }
    }

    #[test]
    fn signal_snapshots_last_write_wins_onto_the_open_span() {
        let snapshot = SignalSnapshot {
            rssi: -60.0,
            rsrp: -95.0,
            rsrq: -10.0,
            power_ratio: 9.5,
        };
        let mut carrier = event("X_EVENT", 10, None, Some("A"));
        carrier.signal = Some(snapshot);
        let events = vec![
            event("STATE_CHANGE_IND", 0, None, Some("A")),
            carrier,
            event("STATE_CHANGE_IND", 100, Some("A"), Some("B")),
            event("STATE_CHANGE_IND", 200, Some("B"), Some("C")),
        ];
        let groups = segment(&events);
        let span = &groups["None -> A A -> B"][0];
        assert_eq!(span.signal, Some(snapshot));
    }

    #[test]
    fn spans_without_a_real_entry_or_exit_are_not_filed() {
        // Only one state change: the sentinel span closes with no entry
        // label and the successor never closes.
        let events = vec![
            event("STATE_CHANGE_IND", 0, None, Some("A")),
            event("X_EVENT", 10, None, Some("A")),
        ];
        assert!(segment(&events).is_empty());
    }
}
