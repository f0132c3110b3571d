//! Declarative secondary-attribute rules, keyed by event kind.
//!
//! Each entry maps an event kind to an ordered list of alternatives; the
//! first alternative whose pattern matches the payload line binds its
//! capture groups to the paired labels. The table is built once at parser
//! construction so every entry stays independently testable.

use std::collections::BTreeMap;
use std::collections::HashMap;

use regex::Regex;

use crate::event::AttrValue;

/// Result of applying the rule table to a payload line.
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum RuleOutcome {
    /// Capture groups were bound into the attribute map.
    Captured,
    /// The event kind must be replaced (channel-qualified message names).
    Renamed(String),
    /// Every alternative failed: a reporting condition, never fatal.
    Unmatched,
    /// The kind has no rule; nothing to do.
    NoRule,
}

struct Alternative {
    pattern: Regex,
    labels: &'static [&'static str],
}

enum Rule {
    Capture(Vec<Alternative>),
    /// Replace the event kind with the last token of the payload line.
    RenameFromLastToken,
}

pub(crate) struct RuleTable {
    rules: HashMap<&'static str, Rule>,
}

fn capture(alternatives: &[(&'static str, &'static [&'static str])]) -> Rule {
    Rule::Capture(
        alternatives
            .iter()
            .map(|&(pattern, labels)| Alternative {
                pattern: Regex::new(pattern).expect("attribute rule pattern"),
                labels,
            })
            .collect(),
    )
}

impl RuleTable {
    pub(crate) fn new() -> Self {
        let mut rules: HashMap<&'static str, Rule> = HashMap::new();

        rules.insert("EVENT_RRC_MESSAGE_RECEIVED", Rule::RenameFromLastToken);
        rules.insert("EVENT_RRC_MESSAGE_SENT", Rule::RenameFromLastToken);

        rules.insert(
            "EVENT_LTE_RRC_TIMER_STATUS",
            capture(&[(
                "Timer Name = ([A-Za-z0-9 _]+), Timer Value = ([0-9]+), Timer State = ([A-Za-z0-9 _]+)",
                &["Timer Name", "Timer Value", "Timer State"],
            )]),
        );
        // EMM timers report either a symbolic or a bare numeric timer id.
        for kind in ["EVENT_LTE_EMM_TIMER_START", "EVENT_LTE_EMM_TIMER_EXPIRY"] {
            rules.insert(
                kind,
                capture(&[
                    ("Timer ID = TIMER (T[0-9]+)", &["Timer ID"]),
                    ("(Timer ID = [0-9]+)", &["Timer ID"]),
                ]),
            );
        }
        rules.insert(
            "EVENT_LTE_RRC_STATE_CHANGE_TRIGGER",
            capture(&[("RRC State Change Trigger = ([A-Za-z0-9 _]+)", &["Trigger"])]),
        );
        for kind in [
            "EVENT_LTE_EMM_OUTGOING_MSG",
            "EVENT_LTE_EMM_OTA_OUTGOING_MSG",
            "EVENT_LTE_ESM_OUTGOING_MSG",
            "EVENT_LTE_EMM_INCOMING_MSG",
            "EVENT_LTE_CM_OUTGOING_MSG",
        ] {
            rules.insert(
                kind,
                capture(&[("Message ID = ([A-Za-z0-9 _]+)", &["Message ID"])]),
            );
        }
        rules.insert(
            "EVENT_LTE_RRC_UL_MSG",
            capture(&[("Message Type = ([A-Za-z0-9 _]+)", &["Message Type"])]),
        );
        rules.insert(
            "EVENT_LTE_RRC_DL_MSG",
            capture(&[(
                "Channel Type = ([A-Za-z0-9 _]+), Message Type = ([A-Za-z0-9 _]+)",
                &["Channel Type", "Message Type"],
            )]),
        );
        rules.insert(
            "EVENT_LTE_RACH_ACCESS_START",
            capture(&[(
                "RACH Cause = ([A-Za-z0-9 _]+), RACH Contention = ([A-Za-z0-9 _]+)",
                &["RACH Cause", "RACH Contention"],
            )]),
        );
        rules.insert(
            "EVENT_LTE_RRC_PAGING_DRX_CYCLE",
            capture(&[("DRX Cycle = ([0-9]+)", &["DRX_CYCLE"])]),
        );
        rules.insert(
            "EVENT_LTE_RACH_RAID_MATCH",
            capture(&[("Match = ([0-9]+)", &["Match"])]),
        );
        rules.insert(
            "EVENT_LTE_TIMING_ADVANCE",
            capture(&[(
                "Timer Value = ([0-9]+), Timing Advance = ([0-9]+)",
                &["Timer Value", "Timing Advance"],
            )]),
        );
        rules.insert(
            "EVENT_LTE_MAC_TIMER",
            capture(&[(
                "Timer type = ([A-Za-z0-9 _]+), Action = ([A-Za-z0-9 _]+)",
                &["Timer type", "Action"],
            )]),
        );
        rules.insert(
            "EVENT_LTE_MAC_RESET",
            capture(&[("Cause = ([A-Za-z0-9 _]+)", &["Cause"])]),
        );
        rules.insert(
            "EVENT_LTE_RACH_ACCESS_RESULT",
            capture(&[("Result = ([A-Za-z0-9 _]+)", &["Result"])]),
        );
        rules.insert(
            "EVENT_LTE_ML1_PHR_REPORT",
            capture(&[(
                "Power Headroom = ([-A-Za-z0-9 _]+), PHR Trigger = ([A-Za-z0-9 _]+)",
                &["Power Headroom", "PHR Trigger"],
            )]),
        );
        rules.insert(
            "EVENT_LTE_BSR_SR_REQUEST",
            capture(&[(
                "Is BSR Timer Expired = ([0-9]+), Is Higher Priority Data Arrial = ([0-9]+), \
                 Is Retx BSR Timer Expired = ([0-9]+), Is Request To Include BSR Report = ([0-9]+), \
                 Is Request To Send SR = ([0-9]+)",
                &[
                    "Is BSR Timer Expired",
                    "Is Higher Priority Data Arrial",
                    "Is Retx BSR Timer Expired",
                    "Is Request To Include BSR Report",
                    "Is Request To Send SR",
                ],
            )]),
        );
        rules.insert(
            "EVENT_LTE_RRC_SECURITY_CONFIG",
            capture(&[("Status = ([A-Za-z0-9 _]+)", &["Status"])]),
        );
        rules.insert(
            "EVENT_LTE_RRC_NEW_CELL_IND",
            capture(&[(
                "Cause = ([A-Za-z0-9 _]+), Frequency = ([0-9]+), Cell ID = ([0-9]+)",
                &["Cause", "Frequency", "Cell ID"],
            )]),
        );

        RuleTable { rules }
    }

    /// Apply the rule for `kind` to a payload line, binding captures into
    /// `attributes`.
    pub(crate) fn apply(
        &self,
        kind: &str,
        line: &str,
        attributes: &mut BTreeMap<String, AttrValue>,
    ) -> RuleOutcome {
        match self.rules.get(kind) {
            None => RuleOutcome::NoRule,
            Some(Rule::RenameFromLastToken) => match line.split_whitespace().last() {
                Some(token) => RuleOutcome::Renamed(token.to_string()),
                None => RuleOutcome::Unmatched,
            },
            Some(Rule::Capture(alternatives)) => {
                for alternative in alternatives {
                    let Some(caps) = alternative.pattern.captures(line) else {
                        continue;
                    };
                    for (i, label) in alternative.labels.iter().enumerate() {
                        if let Some(group) = caps.get(i + 1) {
                            attributes
                                .insert(label.to_string(), AttrValue::parse(group.as_str()));
                        }
                    }
                    return RuleOutcome::Captured;
                }
                RuleOutcome::Unmatched
            }
        }
    }
}
