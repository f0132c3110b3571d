//! Per-family connectivity-state trackers.
//!
//! LTE and WCDMA traces announce state changes in different shapes, and
//! the two trackers share no mutable state: each keeps its own last-known
//! state and only reacts to its own state-change event kind.

use regex::Regex;

use crate::event::Event;

const PAYLOAD_MARKER: &str = "Payload String";
const WCDMA_MARKER: &str = "Payload String = Previous state:";

/// LTE announces only the new state; the previous one is context. A
/// repeated announcement of the current state is not a transition.
pub(crate) struct LteStateTracker {
    last: Option<String>,
    state: Regex,
}

impl LteStateTracker {
    pub(crate) fn new() -> Self {
        LteStateTracker {
            last: None,
            state: Regex::new("RRC State = ([A-Za-z_ ]+)").expect("LTE state pattern"),
        }
    }

    pub(crate) fn observe(&mut self, event: &mut Event, line: &str) {
        if event.kind != "EVENT_LTE_RRC_STATE_CHANGE" || !line.starts_with(PAYLOAD_MARKER) {
            return;
        }
        let Some(caps) = self.state.captures(line) else {
            return;
        };
        let after = caps[1].to_string();
        if self.last.as_deref() == Some(after.as_str()) {
            return;
        }
        event.before_state = self.last.clone();
        event.after_state = Some(after.clone());
        self.last = Some(after);
    }
}

/// WCDMA announces both states on one line. The comma-separated form is
/// authoritative; older traces only carry the two state tokens, so a
/// token-pair fallback takes the first and last.
pub(crate) struct WcdmaStateTracker {
    #[allow(dead_code)]
    last: Option<String>,
    strict: Regex,
    token: Regex,
}

impl WcdmaStateTracker {
    pub(crate) fn new() -> Self {
        WcdmaStateTracker {
            last: None,
            strict: Regex::new("Previous state: ([A-Za-z_ ]+), New state: ([A-Za-z_ ]+)")
                .expect("WCDMA state pattern"),
            token: Regex::new("[A-Z]+(?:_[A-Z]+)+").expect("WCDMA token pattern"),
        }
    }

    pub(crate) fn observe(&mut self, event: &mut Event, line: &str) {
        if event.kind != "EVENT_WCDMA_RRC_STATE" || !line.starts_with(WCDMA_MARKER) {
            return;
        }
        if let Some(caps) = self.strict.captures(line) {
            event.before_state = Some(caps[1].to_string());
            event.after_state = Some(caps[2].to_string());
        } else {
            let tokens: Vec<&str> = self.token.find_iter(line).map(|m| m.as_str()).collect();
            if tokens.len() >= 2 {
                event.before_state = Some(tokens[0].to_string());
                event.after_state = Some(tokens[tokens.len() - 1].to_string());
            }
        }
        // Unlike LTE, the last-known state follows every announcement.
        self.last = event.after_state.clone();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(kind: &str) -> Event {
        Event::new(kind, 0)
    }

    #[test]
    fn lte_records_transition_and_updates_context() {
        let mut tracker = LteStateTracker::new();

        let mut first = event("EVENT_LTE_RRC_STATE_CHANGE");
        tracker.observe(&mut first, "Payload String = RRC State = Idle Camped");
        assert_eq!(first.before_state, None);
        assert_eq!(first.after_state.as_deref(), Some("Idle Camped"));

        let mut second = event("EVENT_LTE_RRC_STATE_CHANGE");
        tracker.observe(&mut second, "Payload String = RRC State = Connecting");
        assert_eq!(second.before_state.as_deref(), Some("Idle Camped"));
        assert_eq!(second.after_state.as_deref(), Some("Connecting"));
    }

    #[test]
    fn lte_ignores_repeated_state_announcements() {
        let mut tracker = LteStateTracker::new();

        let mut first = event("EVENT_LTE_RRC_STATE_CHANGE");
        tracker.observe(&mut first, "Payload String = RRC State = Connected");

        let mut repeat = event("EVENT_LTE_RRC_STATE_CHANGE");
        tracker.observe(&mut repeat, "Payload String = RRC State = Connected");
        assert_eq!(repeat.before_state, None);
        assert_eq!(repeat.after_state, None);
    }

    #[test]
    fn lte_ignores_other_kinds_and_non_payload_lines() {
        let mut tracker = LteStateTracker::new();

        let mut other = event("EVENT_LTE_RRC_DL_MSG");
        tracker.observe(&mut other, "Payload String = RRC State = Connected");
        assert_eq!(other.after_state, None);

        let mut no_marker = event("EVENT_LTE_RRC_STATE_CHANGE");
        tracker.observe(&mut no_marker, "RRC State = Connected");
        assert_eq!(no_marker.after_state, None);
    }

    #[test]
    fn wcdma_prefers_the_strict_pattern() {
        let mut tracker = WcdmaStateTracker::new();

        let mut change = event("EVENT_WCDMA_RRC_STATE");
        tracker.observe(
            &mut change,
            "Payload String = Previous state: CELL_FACH, New state: CELL_DCH",
        );
        assert_eq!(change.before_state.as_deref(), Some("CELL_FACH"));
        assert_eq!(change.after_state.as_deref(), Some("CELL_DCH"));
    }

    #[test]
    fn wcdma_falls_back_to_token_pairs() {
        let mut tracker = WcdmaStateTracker::new();

        let mut change = event("EVENT_WCDMA_RRC_STATE");
        tracker.observe(
            &mut change,
            "Payload String = Previous state: CELL_PCH to CELL_FACH",
        );
        assert_eq!(change.before_state.as_deref(), Some("CELL_PCH"));
        assert_eq!(change.after_state.as_deref(), Some("CELL_FACH"));
    }

    #[test]
    fn wcdma_updates_last_known_state_unconditionally() {
        let mut tracker = WcdmaStateTracker::new();

        let mut change = event("EVENT_WCDMA_RRC_STATE");
        tracker.observe(
            &mut change,
            "Payload String = Previous state: CELL_DCH, New state: CELL_FACH",
        );
        assert_eq!(tracker.last.as_deref(), Some("CELL_FACH"));

        let mut unreadable = event("EVENT_WCDMA_RRC_STATE");
        tracker.observe(&mut unreadable, "Payload String = Previous state: ???");
        assert_eq!(tracker.last, None);
    }

    #[test]
    fn families_do_not_share_state() {
        let mut lte = LteStateTracker::new();
        let mut wcdma = WcdmaStateTracker::new();

        let mut lte_change = event("EVENT_LTE_RRC_STATE_CHANGE");
        lte.observe(&mut lte_change, "Payload String = RRC State = Connected");

        let mut wcdma_change = event("EVENT_WCDMA_RRC_STATE");
        wcdma.observe(
            &mut wcdma_change,
            "Payload String = Previous state: CELL_FACH, New state: CELL_DCH",
        );
        // The WCDMA before-state comes from its own line, not from the
        // LTE tracker's context.
        assert_eq!(wcdma_change.before_state.as_deref(), Some("CELL_FACH"));

        let mut lte_next = event("EVENT_LTE_RRC_STATE_CHANGE");
        lte.observe(&mut lte_next, "Payload String = RRC State = Closing");
        assert_eq!(lte_next.before_state.as_deref(), Some("Connected"));
    }
}
