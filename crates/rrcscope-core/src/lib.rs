//! rrcscope core library for post-mortem RRC trace analysis.
//!
//! This crate implements the offline analysis pipeline used by the CLI:
//! line-oriented LTE/WCDMA diagnostic traces are extracted into structured
//! events, merged chronologically with an optional packet-derived record
//! stream, segmented into connectivity-state transitions, and aggregated
//! into a deterministic report plus per-scenario correlation features.
//! Extraction is rule-driven and side-effect free; all I/O is isolated in
//! the `source` module.
//!
//! Invariants:
//! - Report and feature outputs are deterministic and stable across runs.
//! - Merged events are visited in non-decreasing timestamp order, ties in
//!   discovery order.
//! - Timestamps are milliseconds within one trace epoch; traces crossing
//!   a day boundary are out of scope.
//!
//! # Examples
//! ```
//! use rrcscope_core::{AnalyzeOptions, analyze_lines};
//!
//! let trace = [
//!     "2013 Jan  1  00:00:01.000  EVENT_LTE_RRC_STATE_CHANGE",
//!     "Payload String = RRC State = Connected",
//! ];
//! let report = analyze_lines(trace, &[], &AnalyzeOptions::default())?;
//! assert_eq!(report.report_version, rrcscope_core::REPORT_VERSION);
//! # Ok::<(), rrcscope_core::AnalysisError>(())
//! ```

use serde::{Deserialize, Serialize};

mod analysis;
mod event;
mod extract;
mod source;
pub mod stats;

pub use analysis::{
    AnalysisError, AnalyzeOptions, MergeError, analyze_lines, analyze_trace_file,
    format_feature_row, render_text, scenario_tags,
};
pub use event::{AttrValue, Event, SignalSnapshot};
pub use extract::DEFAULT_DATE_PREFIX;
pub use source::{PacketRecord, SourceError, read_packet_records, read_trace_lines};

/// Current report schema version.
pub const REPORT_VERSION: u32 = 1;

/// Aggregated analysis report with deterministic ordering.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    /// Report schema version (not the binary version).
    pub report_version: u32,
    /// Tool identification metadata.
    pub tool: ToolInfo,
    /// Trace clock of the last merged event, `H:MM:SS.mmm`.
    pub generated_at: String,
    /// Input trace metadata.
    pub input: InputInfo,
    /// Every distinct event kind observed, in stable order.
    pub event_kinds: Vec<String>,
    /// Per-transition-group statistics in stable label order.
    pub groups: Vec<TransitionGroupSummary>,
    /// Per-scenario correlation feature rows in stable tag order.
    pub features: Vec<ScenarioFeatures>,
}

/// Tool metadata embedded in reports.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolInfo {
    pub name: String,
    /// Tool version (semver).
    pub version: String,
}

/// Input metadata embedded in reports.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputInfo {
    /// Trace path as provided to the analyzer.
    pub path: String,
    /// Trace size in bytes.
    pub bytes: u64,
    /// Packet-record path, when one was supplied.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub packets_path: Option<String>,
}

/// Statistics for one transition group (all spans sharing an entry/exit
/// label pair).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransitionGroupSummary {
    /// `"<entered> <exited>"` group label.
    pub label: String,
    /// Number of transitions in the group.
    pub count: u64,
    /// Span durations in filing order, for the interval dump.
    pub durations_ms: Vec<i64>,
    pub duration_mean_ms: f64,
    pub duration_stdev_ms: f64,
    pub duration_min_ms: i64,
    /// 5th-percentile duration ("min-ish").
    pub duration_p5_ms: f64,
    /// Signal snapshot of the group's most recent transition.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signal: Option<SignalSnapshot>,
    /// Per-kind summaries; kinds never observed in the group are omitted.
    pub kinds: Vec<EventKindSummary>,
}

/// Per-kind statistics inside one group: first occurrences, all
/// occurrences, last occurrences.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventKindSummary {
    pub kind: String,
    pub first: SectionSummary,
    pub all: SectionSummary,
    pub last: SectionSummary,
}

/// One section (first/all/last) of a kind summary.
///
/// Offset statistics exclude transitions where the kind never occurred;
/// duplicate statistics count those transitions as zero.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SectionSummary {
    /// Mean offset into (or back from the end of) the span; absent for
    /// the `all` section.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offset_mean_ms: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offset_stdev_ms: Option<f64>,
    /// Share of transitions in the group containing the kind at least
    /// once.
    pub presence_fraction: f64,
    pub duplicates_mean: f64,
    pub duplicates_stdev: f64,
    pub duplicates_min: u64,
    /// Number of transitions contributing to this section.
    pub samples: u64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attributes: Vec<AttributeSummary>,
}

/// Distribution of one secondary attribute across a group.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttributeSummary {
    pub label: String,
    pub stats: AttributeStats,
}

/// Numeric attributes report mean and standard deviation; everything
/// else reports its three most frequent values.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttributeStats {
    Numeric { mean: f64, stdev: f64 },
    Frequent { values: Vec<FrequentValue> },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FrequentValue {
    pub value: String,
    pub count: u64,
}

/// Feature rows for one recognized scenario, one row per transition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioFeatures {
    /// Scenario tag, used as the artifact file suffix.
    pub tag: String,
    pub rows: Vec<Vec<f64>>,
}
