//! Event model shared across the pipeline.
//!
//! Every stage operates on [`Event`] values: extraction emits them from
//! trace records, the merge stage interleaves them with packet-derived
//! events, and segmentation folds them into transitions. Events are
//! immutable after the merge stage except for state forward fill, which
//! runs exactly once during ordering.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Kind assigned to packet records that were not classified as candidate
/// traffic upstream.
pub const PACKET_OTHER: &str = "PACKET_OTHER";
/// Kind assigned to candidate packets whose destination is the local
/// device address.
pub const PACKET_SENT: &str = "PACKET_SENT";
/// Kind assigned to all remaining candidate packets.
pub const PACKET_RCV: &str = "PACKET_RCV";

/// Packet-derived events jitter inside a span: they never open or close a
/// transition and never advance its state.
pub fn is_packet_kind(kind: &str) -> bool {
    kind.starts_with("PACKET")
}

/// Secondary-attribute value, resolved to numeric or text at ingestion
/// time.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttrValue {
    Num(i64),
    Text(String),
}

impl AttrValue {
    /// Classify a captured attribute string.
    pub fn parse(raw: &str) -> Self {
        match raw.trim().parse::<i64>() {
            Ok(n) => AttrValue::Num(n),
            Err(_) => AttrValue::Text(raw.to_string()),
        }
    }

    pub fn as_num(&self) -> Option<i64> {
        match self {
            AttrValue::Num(n) => Some(*n),
            AttrValue::Text(_) => None,
        }
    }
}

impl fmt::Display for AttrValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttrValue::Num(n) => write!(f, "{}", n),
            AttrValue::Text(s) => write!(f, "{}", s),
        }
    }
}

/// Signal-strength snapshot carried forward from the most recent
/// reporting line until superseded.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SignalSnapshot {
    pub rssi: f64,
    pub rsrp: f64,
    pub rsrq: f64,
    /// RSRP / RSRQ, published together with the raw fields.
    pub power_ratio: f64,
}

/// One observed occurrence extracted from a trace record or packet
/// record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// Milliseconds since the trace epoch.
    pub time: i64,
    /// Stable all-caps underscored identifier, or a fallback derived from
    /// the trailing words of an unparseable line.
    pub kind: String,
    /// Free-form annotation (direction arrow for the message
    /// received/sent variants).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subtype: Option<String>,
    /// `None` means "unknown, inherit from context" until forward fill.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub before_state: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub after_state: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: BTreeMap<String, AttrValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signal: Option<SignalSnapshot>,
}

impl Event {
    pub fn new(kind: impl Into<String>, time: i64) -> Self {
        Event {
            time,
            kind: kind.into(),
            subtype: None,
            before_state: None,
            after_state: None,
            attributes: BTreeMap::new(),
            signal: None,
        }
    }
}

/// Render an optional state for transition labels; the unknown state
/// prints as the literal `None`.
pub fn state_name(state: Option<&str>) -> &str {
    state.unwrap_or("None")
}

/// `"<before> -> <after>"` label describing how a span was entered or
/// exited.
pub fn transition_label(before: Option<&str>, after: Option<&str>) -> String {
    format!("{} -> {}", state_name(before), state_name(after))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attr_value_resolves_numeric_and_text() {
        assert_eq!(AttrValue::parse("1000"), AttrValue::Num(1000));
        assert_eq!(AttrValue::parse("-40"), AttrValue::Num(-40));
        assert_eq!(
            AttrValue::parse("Running"),
            AttrValue::Text("Running".to_string())
        );
        assert_eq!(AttrValue::parse("42").as_num(), Some(42));
        assert_eq!(AttrValue::parse("T310").as_num(), None);
    }

    #[test]
    fn packet_kinds_are_recognized() {
        assert!(is_packet_kind(PACKET_SENT));
        assert!(is_packet_kind(PACKET_RCV));
        assert!(is_packet_kind(PACKET_OTHER));
        assert!(!is_packet_kind("EVENT_LTE_RRC_STATE_CHANGE"));
    }

    #[test]
    fn labels_render_unknown_state_as_none() {
        assert_eq!(transition_label(None, Some("Connected")), "None -> Connected");
        assert_eq!(
            transition_label(Some("Connecting"), Some("Connected")),
            "Connecting -> Connected"
        );
    }
}
