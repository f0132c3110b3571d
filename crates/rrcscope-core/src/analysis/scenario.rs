//! Per-scenario correlation feature export.
//!
//! A fixed set of recognized transition labels — one per radio
//! technology/scenario — maps to a feature-vector layout: total duration,
//! indicator bits for the scenario's occasional events, the final signal
//! snapshot, and timing deltas for the scenario's event-kind pairs. The
//! whole mapping is one static table looked up per group label.

use crate::analysis::segment::Transition;

/// One end of a timing pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum PairEnd {
    /// Span start.
    Begin,
    /// Span end.
    End,
    Kind(&'static str),
}

use PairEnd::{Begin, End, Kind};

#[derive(Debug, PartialEq)]
pub(crate) struct Scenario {
    /// File suffix for the exported rows.
    pub tag: &'static str,
    /// Substring matched against the group label.
    pub pattern: &'static str,
    pub case_insensitive: bool,
    /// Kinds reported as presence bits (substring match on the kind).
    pub occasionals: &'static [&'static str],
    /// Timing pairs, resolved per transition.
    pub pairs: &'static [(PairEnd, PairEnd)],
    /// Kinds whose first-to-last rebound (`first offset − last offset`)
    /// is appended, `-1` when the kind never occurred.
    pub rebounds: &'static [&'static str],
    /// `(kind, attribute)` whose numeric first-occurrence value is
    /// appended, `-1` when absent or non-numeric.
    pub first_attr: Option<(&'static str, &'static str)>,
}

pub(crate) static SCENARIOS: &[Scenario] = &[
    Scenario {
        tag: "connecting",
        pattern: "camped -> connecting connecting -> connected",
        case_insensitive: true,
        occasionals: &[
            "EVENT_LTE_EMM_INCOMING_MSG",
            "EVENT_LTE_EMM_TIMER_EXPIRY",
            "EVENT_LTE_RACH_ACCESS_START",
            "EVENT_LTE_EMM_TIMER_START",
        ],
        pairs: &[
            (
                Kind("EVENT_LTE_RRC_STATE_CHANGE_TRIGGER"),
                Kind("EVENT_LTE_RACH_RAID_MATCH"),
            ),
            (
                Kind("EVENT_LTE_RRC_STATE_CHANGE_TRIGGER"),
                Kind("EVENT_LTE_MAC_TIMER"),
            ),
            (
                Kind("EVENT_LTE_RACH_RAID_MATCH"),
                Kind("EVENT_LTE_RACH_ACCESS_RESULT"),
            ),
            (Kind("EVENT_LTE_RRC_UL_MSG"), Kind("EVENT_LTE_RRC_DL_MSG")),
            (
                Kind("EVENT_LTE_RRC_STATE_CHANGE_TRIGGER"),
                Kind("EVENT_LTE_RRC_UL_MSG"),
            ),
            (
                Kind("EVENT_LTE_RRC_STATE_CHANGE_TRIGGER"),
                Kind("EVENT_LTE_RRC_PAGING_DRX_CYCLE"),
            ),
        ],
        rebounds: &[],
        first_attr: None,
    },
    Scenario {
        tag: "closing",
        pattern: "connected -> closing closing ->",
        case_insensitive: true,
        occasionals: &[
            "EVENT_LTE_ESM_OUTGOING_MSG",
            "EVENT_LTE_RACH_ACCESS_RESULT",
            "EVENT_LTE_UL_OUT_OF_SYNC",
            "EVENT_LTE_RACH_ACCESS_START",
            "EVENT_LTE_EMM_TIMER_START",
            "EVENT_LTE_EMM_INCOMING_MSG",
            "EVENT_LTE_CM_OUTGOING_MSG",
            "EVENT_LTE_RACH_RAID_MATCH",
            "EVENT_LTE_TIMING_ADVANCE",
            "EVENT_LTE_ML1_PHR_REPORT",
            "EVENT_LTE_BSR_SR_REQUEST",
            "EVENT_SLOTTED_MODE_OPERATION",
            "EVENT_SD_EVENT_ACTION",
            "EVENT_IDLE_HANDOFF",
        ],
        pairs: &[
            (
                Kind("EVENT_LTE_RRC_STATE_CHANGE_TRIGGER"),
                Kind("EVENT_LTE_MAC_TIMER"),
            ),
            (
                Kind("EVENT_LTE_RRC_STATE_CHANGE_TRIGGER"),
                Kind("EVENT_LTE_RRC_TIMER_STATUS"),
            ),
            (
                Kind("EVENT_LTE_MAC_TIMER"),
                Kind("EVENT_LTE_RRC_TIMER_STATUS"),
            ),
        ],
        rebounds: &["EVENT_LTE_MAC_TIMER", "EVENT_LTE_RRC_TIMER_STATUS"],
        first_attr: None,
    },
    Scenario {
        tag: "idle_nc",
        pattern: "closing -> idle not camped idle not camped -> idle camped",
        case_insensitive: true,
        occasionals: &[
            "EVENT_LTE_EMM_TIMER_START",
            "EVENT_LTE_EMM_INCOMING_MSG",
            "EVENT_IPV6_SM_EVENT",
            "EVENT_LTE_RRC_DL_MSG",
            "EVENT_LTE_ESM_OUTGOING_MSG",
        ],
        pairs: &[
            (
                Kind("EVENT_LTE_RRC_STATE_CHANGE_TRIGGER"),
                Kind("EVENT_LTE_EMM_TIMER_START"),
            ),
            (
                Kind("EVENT_LTE_RRC_STATE_CHANGE_TRIGGER"),
                Kind("EVENT_LTE_EMM_INCOMING_MSG"),
            ),
            (
                Kind("EVENT_LTE_RRC_STATE_CHANGE_TRIGGER"),
                Kind("EVENT_LTE_RRC_TIMER_STATUS"),
            ),
            (
                Kind("EVENT_LTE_RRC_STATE_CHANGE_TRIGGER"),
                Kind("EVENT_LTE_RRC_NEW_CELL_IND"),
            ),
        ],
        rebounds: &[],
        first_attr: Some(("EVENT_LTE_RRC_TIMER_STATUS", "Timer Value")),
    },
    Scenario {
        tag: "fach_promote",
        pattern: "CELL_PCH -> CELL_FACH CELL_FACH -> CELL_DCH",
        case_insensitive: false,
        occasionals: &["CELL_UPDATE_MSG", "MEASUREMENT_REPORT_MSG"],
        pairs: &[
            (Begin, Kind("RADIO_BEARER_RECONFIGURATION_MSG")),
            (
                Kind("RADIO_BEARER_RECONFIGURATION_MSG"),
                Kind("RADIO_BEARER_RECONFIGURATION_COMPLETE_MSG"),
            ),
            (Begin, Kind("CELL_UPDATE_CONFIRM_MSG")),
            (Kind("RADIO_BEARER_RECONFIGURATION_COMPLETE_MSG"), End),
        ],
        rebounds: &[],
        first_attr: None,
    },
    Scenario {
        tag: "fach_temp",
        pattern: "CELL_DCH -> CELL_FACH CELL_FACH -> CELL_DCH",
        case_insensitive: false,
        occasionals: &[],
        pairs: &[
            (Begin, Kind("EVENT_WCDMA_RLC_CONFIG")),
            (
                Kind("EVENT_WCDMA_RLC_CONFIG"),
                Kind("EVENT_WCDMA_RLC_CONFIG"),
            ),
            (Kind("EVENT_WCDMA_RLC_CONFIG"), End),
            (Kind("RADIO_BEARER_RECONFIGURATION_MSG"), End),
            (
                Kind("RADIO_BEARER_RECONFIGURATION_MSG"),
                Kind("RADIO_BEARER_RECONFIGURATION_COMPLETE_MSG"),
            ),
        ],
        rebounds: &[],
        first_attr: None,
    },
    Scenario {
        tag: "fach_demote",
        pattern: "CELL_DCH -> CELL_FACH CELL_FACH -> CELL_PCH",
        case_insensitive: false,
        occasionals: &[],
        pairs: &[
            (Begin, Kind("RADIO_BEARER_RECONFIGURATION_COMPLETE_MSG")),
            (Kind("PHYSICAL_CHANNEL_RECONFIGURATION_MSG"), End),
            (Begin, Kind("EVENT_WCDMA_RLC_CONFIG")),
            (
                Kind("PHYSICAL_CHANNEL_RECONFIGURATION_MSG"),
                Kind("PHYSICAL_CHANNEL_RECONFIGURATION_COMPLETE_MSG"),
            ),
            (Kind("PHYSICAL_CHANNEL_RECONFIGURATION_COMPLETE_MSG"), End),
        ],
        rebounds: &[],
        first_attr: None,
    },
    Scenario {
        tag: "hspdap_connecting",
        pattern: "Disconnected -> Connecting Connecting -> CELL_DCH",
        case_insensitive: false,
        occasionals: &[
            "PACKET_RCV",
            "RRC_CONNECTION_REJECT_MSG",
            "RRC_CONNECTION_REQUEST_MSG",
        ],
        pairs: &[
            (Begin, Kind("EVENT_WCDMA_PRACH")),
            (Begin, Kind("RRC_CONNECTION_REQUEST_MSG")),
            (Begin, Kind("EVENT_WCDMA_L1_STATE")),
            (Kind("RRC_CONNECTION_REQUEST_MSG"), End),
            (Kind("EVENT_WCDMA_RRC_URNTI"), End),
            (
                Kind("RRC_CONNECTION_SETUP_MSG"),
                Kind("RRC_CONNECTION_SETUP_COMPLETE_MSG"),
            ),
            (
                Kind("EVENT_WCDMA_L1_STATE"),
                Kind("EVENT_WCDMA_RRC_URNTI"),
            ),
            (Begin, Kind("EVENT_WCDMA_ASET")),
            (Kind("EVENT_WCDMA_ASET"), End),
            (
                Kind("EVENT_WCDMA_RRC_URNTI"),
                Kind("EVENT_WCDMA_ASET"),
            ),
        ],
        rebounds: &[],
        first_attr: None,
    },
    Scenario {
        tag: "hspdap_disconnected",
        pattern: "CELL_DCH -> Disconnected Disconnected -> Connecting",
        case_insensitive: false,
        occasionals: &[
            "PAGING_TYPE_1_MSG",
            "EVENT_WCDMA_RRCCSP_SCAN_START",
            "PACKET_RCV",
            "EVENT_LTE_EMM_TIMER_EXPIRY",
        ],
        pairs: &[
            (Kind("EVENT_GMM_STATE"), End),
            (Kind("EVENT_WCDMA_CONN_REQ_CAUSE"), End),
            (Begin, Kind("EVENT_WCDMA_L1_ACQ_SUBSTATE")),
            (Begin, Kind("EVENT_WCDMA_RRCCSP_SCAN_START")),
            (
                Kind("EVENT_WCDMA_RRCCSP_SCAN_START"),
                Kind("EVENT_WCDMA_L1_STATE"),
            ),
            (
                Kind("EVENT_WCDMA_L1_STATE"),
                Kind("EVENT_WCDMA_L1_ACQ_SUBSTATE"),
            ),
            (
                Kind("EVENT_WCDMA_L1_ACQ_SUBSTATE"),
                Kind("EVENT_WCDMA_L1_STATE"),
            ),
            (
                Kind("EVENT_WCDMA_L1_ACQ_SUBSTATE"),
                Kind("EVENT_WCDMA_L1_ACQ_SUBSTATE"),
            ),
            (
                Kind("EVENT_WCDMA_CONN_REL_CAUSE"),
                Kind("EVENT_WCDMA_L1_ACQ_SUBSTATE"),
            ),
            (
                Kind("EVENT_PLMN_INFORMATION"),
                Kind("EVENT_WCDMA_L1_ACQ_SUBSTATE"),
            ),
            (Begin, Kind("EVENT_WCDMA_L1_STATE")),
            (Begin, Kind("EVENT_MM_STATE")),
            (Begin, Kind("EVENT_WCDMA_CONN_REL_CAUSE")),
            (Begin, Kind("EVENT_PLMN_INFORMATION")),
            (Kind("RRC_CONNECTION_REQUEST_MSG"), End),
            (
                Kind("EVENT_WCDMA_CONN_REQ_CAUSE"),
                Kind("RRC_CONNECTION_REQUEST_MSG"),
            ),
            (
                Kind("EVENT_GMM_STATE"),
                Kind("RRC_CONNECTION_REQUEST_MSG"),
            ),
        ],
        rebounds: &[],
        first_attr: None,
    },
    Scenario {
        tag: "hspdap_dch",
        pattern: "Connecting -> CELL_DCH CELL_DCH -> Disconnected",
        case_insensitive: false,
        occasionals: &[
            "DOWNLINK_DIRECT_TRANSFER_MSG",
            "UPLINK_DIRECT_TRANSFER_MSG",
        ],
        pairs: &[
            (Begin, Kind("EVENT_CM_CELL_SRV_IND")),
            (Begin, Kind("INITIAL_DIRECT_TRANSFER_MSG")),
            (Begin, Kind("EVENT_CM_COUNTRY_SELECTED")),
            (Begin, Kind("EVENT_NAS_MESSAGE_SENT")),
            (Begin, Kind("EVENT_LTE_EMM_TIMER_START")),
            (Begin, Kind("ACTIVE_SET_UPDATE_MSG")),
            (Begin, Kind("ACTIVE_SET_UPDATE_COMPLETE_MSG")),
            (Begin, Kind("SECURITY_MODE_COMMAND_MSG")),
            (Begin, Kind("EVENT_WCDMA_ASET")),
            (Begin, Kind("SECURITY_MODE_COMPLETE_MSG")),
            (Begin, Kind("EVENT_GMM_STATE")),
            (Begin, Kind("EVENT_NAS_MESSAGE_RECEIVED")),
            (Kind("SIGNALLING_CONNECTION_RELEASE_INDICATION_MSG"), End),
            (Kind("EVENT_IPV6_SM_EVENT"), End),
            (Kind("RRC_CONNECTION_RELEASE_COMPLETE_MSG"), End),
            (Kind("EVENT_EUL_RECONFIG_OR_ASU"), End),
            (Kind("EVENT_HS_DSCH_STATUS"), End),
            (Kind("EVENT_WCDMA_L1_STATE"), End),
            (
                Kind("SECURITY_MODE_COMMAND_MSG"),
                Kind("SECURITY_MODE_COMPLETE_MSG"),
            ),
            (
                Kind("EVENT_NAS_MESSAGE_SENT"),
                Kind("EVENT_NAS_MESSAGE_RECEIVED"),
            ),
            (
                Kind("ACTIVE_SET_UPDATE_MSG"),
                Kind("ACTIVE_SET_UPDATE_COMPLETE_MSG"),
            ),
        ],
        rebounds: &[],
        first_attr: None,
    },
];

/// Every scenario tag, in table order. The CLI uses this to clear stale
/// artifacts before writing fresh ones.
pub fn scenario_tags() -> Vec<&'static str> {
    SCENARIOS.iter().map(|scenario| scenario.tag).collect()
}

/// First scenario whose pattern is contained in the group label.
pub(crate) fn match_scenario(label: &str) -> Option<&'static Scenario> {
    SCENARIOS.iter().find(|scenario| {
        if scenario.case_insensitive {
            label.to_lowercase().contains(scenario.pattern)
        } else {
            label.contains(scenario.pattern)
        }
    })
}

/// Fixed-width feature row for one transition.
pub(crate) fn feature_row(scenario: &Scenario, transition: &Transition) -> Vec<f64> {
    let duration = transition.duration() as f64;
    let mut row = Vec::with_capacity(
        3 + scenario.occasionals.len()
            + scenario.pairs.len()
            + scenario.rebounds.len()
            + usize::from(scenario.first_attr.is_some()),
    );
    row.push(duration);

    for occasional in scenario.occasionals {
        let hit = transition
            .duplicates_all
            .iter()
            .any(|(kind, &count)| kind.contains(occasional) && count > 0);
        row.push(if hit { 1.0 } else { 0.0 });
    }

    row.push(transition.signal.map_or(f64::NAN, |s| s.rssi));
    row.push(transition.signal.map_or(f64::NAN, |s| s.power_ratio));

    for (start, end) in scenario.pairs {
        row.push(resolve_pair(transition, *start, *end, duration));
    }

    for kind in scenario.rebounds {
        let first = transition.time_to_reach_first.get(*kind);
        let last = transition.time_to_reach_last.get(*kind);
        row.push(match (first, last) {
            (Some(first), Some(last)) => (first - last) as f64,
            _ => -1.0,
        });
    }

    if let Some((kind, attribute)) = scenario.first_attr {
        let value = transition
            .attributes_first
            .get(kind)
            .and_then(|attrs| attrs.get(attribute))
            .and_then(|value| value.as_num());
        row.push(value.map_or(-1.0, |n| n as f64));
    }

    row
}

fn resolve_pair(transition: &Transition, start: PairEnd, end: PairEnd, duration: f64) -> f64 {
    let first = |kind: &str| transition.time_to_reach_first.get(kind).copied();
    let last = |kind: &str| transition.time_to_reach_last.get(kind).copied();

    match (start, end) {
        // Same kind on both ends: span between its first and last
        // occurrence.
        (PairEnd::Kind(s), PairEnd::Kind(e)) if s == e => match (first(s), last(e)) {
            (Some(first), Some(last)) => (duration - last as f64) - first as f64,
            _ => -1.0,
        },
        (PairEnd::Kind(s), PairEnd::Kind(e)) => match (first(s), first(e)) {
            (Some(from), Some(to)) => (to - from) as f64,
            _ => -1.0,
        },
        (PairEnd::Begin, PairEnd::Kind(e)) => first(e).map_or(-1.0, |offset| offset as f64),
        (PairEnd::Kind(s), PairEnd::End) => last(s).map_or(-1.0, |offset| offset as f64),
        _ => -1.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::segment::Segmenter;
    use crate::event::Event;

    fn event(kind: &str, time: i64, before: Option<&str>, after: Option<&str>) -> Event {
        let mut event = Event::new(kind, time);
        event.before_state = before.map(str::to_string);
        event.after_state = after.map(str::to_string);
        event
    }

    fn closed_transition(kinds: &[(&str, i64)]) -> Transition {
        let mut segmenter = Segmenter::new();
        segmenter.push(&event("BOUNDARY_IND", 0, None, Some("A")));
        for (kind, time) in kinds {
            segmenter.push(&event(kind, *time, None, Some("A")));
        }
        segmenter.push(&event("BOUNDARY_IND", 1000, Some("A"), Some("B")));
        segmenter.push(&event("BOUNDARY_IND", 2000, Some("B"), Some("C")));
        let mut groups = segmenter.finish();
        groups
            .remove("None -> A A -> B")
            .expect("closed span")
            .remove(0)
    }

    #[test]
    fn label_matching_honors_case_rules() {
        assert_eq!(
            match_scenario("Idle Camped -> Connecting Connecting -> Connected")
                .map(|s| s.tag),
            Some("connecting")
        );
        assert_eq!(
            match_scenario("CELL_PCH -> CELL_FACH CELL_FACH -> CELL_DCH").map(|s| s.tag),
            Some("fach_promote")
        );
        // WCDMA patterns are case sensitive.
        assert_eq!(match_scenario("cell_pch -> cell_fach cell_fach -> cell_dch"), None);
        assert_eq!(match_scenario("None -> A A -> B"), None);
    }

    #[test]
    fn pair_resolution_covers_all_modes() {
        let transition = closed_transition(&[
            ("EVENT_WCDMA_RLC_CONFIG", 100),
            ("RADIO_BEARER_RECONFIGURATION_MSG", 300),
            ("EVENT_WCDMA_RLC_CONFIG", 600),
        ]);
        let duration = 1000.0;

        // Same kind: first at 100, last at 600 -> span of 500.
        assert_eq!(
            resolve_pair(
                &transition,
                Kind("EVENT_WCDMA_RLC_CONFIG"),
                Kind("EVENT_WCDMA_RLC_CONFIG"),
                duration
            ),
            500.0
        );
        // First-to-first.
        assert_eq!(
            resolve_pair(
                &transition,
                Kind("EVENT_WCDMA_RLC_CONFIG"),
                Kind("RADIO_BEARER_RECONFIGURATION_MSG"),
                duration
            ),
            200.0
        );
        // Begin sentinel: plain first offset.
        assert_eq!(
            resolve_pair(
                &transition,
                Begin,
                Kind("RADIO_BEARER_RECONFIGURATION_MSG"),
                duration
            ),
            300.0
        );
        // End sentinel: last occurrence measured back from the end.
        assert_eq!(
            resolve_pair(
                &transition,
                Kind("RADIO_BEARER_RECONFIGURATION_MSG"),
                End,
                duration
            ),
            700.0
        );
        // Unknown kind: undefined for this transition.
        assert_eq!(
            resolve_pair(&transition, Kind("NO_SUCH_KIND"), End, duration),
            -1.0
        );
    }

    #[test]
    fn feature_rows_are_fixed_width() {
        let scenario = match_scenario("CELL_DCH -> CELL_FACH CELL_FACH -> CELL_DCH").unwrap();
        let transition = closed_transition(&[("EVENT_WCDMA_RLC_CONFIG", 100)]);
        let row = feature_row(scenario, &transition);
        // duration + 0 occasionals + rssi + ratio + 5 pairs.
        assert_eq!(row.len(), 8);
        assert_eq!(row[0], 1000.0);
        assert!(row[1].is_nan());
        assert!(row[2].is_nan());

        let empty = closed_transition(&[]);
        assert_eq!(feature_row(scenario, &empty).len(), 8);
    }

    #[test]
    fn occasional_bits_use_substring_matching() {
        let scenario = match_scenario("Idle Camped -> Connecting Connecting -> Connected")
            .unwrap();
        let transition = closed_transition(&[("EVENT_LTE_RACH_ACCESS_START", 50)]);
        let row = feature_row(scenario, &transition);
        // occasionals: incoming, expiry, access start, timer start.
        assert_eq!(&row[1..5], &[0.0, 0.0, 1.0, 0.0]);
    }

    #[test]
    fn rebound_and_first_attr_extras_default_to_minus_one() {
        let scenario = match_scenario(
            "Closing -> Idle Not Camped Idle Not Camped -> Idle Camped",
        )
        .unwrap();
        assert_eq!(scenario.tag, "idle_nc");
        let transition = closed_transition(&[]);
        let row = feature_row(scenario, &transition);
        assert_eq!(*row.last().unwrap(), -1.0);
    }
}
