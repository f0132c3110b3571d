//! Group statistics and report assembly.
//!
//! Filed transitions are grouped by label; for each group and each
//! globally-known event kind the aggregator computes presence fractions,
//! offset and duplicate statistics (missing values excluded, not zero)
//! and attribute summaries. Output ordering is deterministic throughout:
//! labels, kinds and attribute keys are sorted, and top-value ties break
//! on the value string.

use std::collections::{BTreeMap, BTreeSet};

use crate::analysis::scenario::{feature_row, match_scenario};
use crate::analysis::segment::Transition;
use crate::event::AttrValue;
use crate::stats;
use crate::{
    AttributeStats, AttributeSummary, EventKindSummary, FrequentValue, Report,
    ScenarioFeatures, SectionSummary, TransitionGroupSummary,
};

pub(crate) fn build_groups(
    groups: &BTreeMap<String, Vec<Transition>>,
    kinds: &BTreeSet<String>,
) -> Vec<TransitionGroupSummary> {
    groups
        .iter()
        .map(|(label, transitions)| summarize_group(label, transitions, kinds))
        .collect()
}

fn summarize_group(
    label: &str,
    transitions: &[Transition],
    kinds: &BTreeSet<String>,
) -> TransitionGroupSummary {
    let durations_ms: Vec<i64> = transitions.iter().map(Transition::duration).collect();
    let durations: Vec<f64> = durations_ms.iter().map(|&d| d as f64).collect();

    TransitionGroupSummary {
        label: label.to_string(),
        count: transitions.len() as u64,
        duration_mean_ms: stats::mean(&durations),
        duration_stdev_ms: stats::stdev(&durations),
        duration_min_ms: durations_ms.iter().copied().min().unwrap_or(0),
        duration_p5_ms: stats::quartiles(&durations)[0],
        signal: transitions.last().and_then(|t| t.signal),
        kinds: kinds
            .iter()
            .filter_map(|kind| summarize_kind(kind, transitions))
            .collect(),
        durations_ms,
    }
}

fn summarize_kind(kind: &str, transitions: &[Transition]) -> Option<EventKindSummary> {
    let dup_first = duplicate_counts(transitions, kind, |t| &t.duplicates_first);
    let dup_last = duplicate_counts(transitions, kind, |t| &t.duplicates_last);
    let dup_all = duplicate_counts(transitions, kind, |t| &t.duplicates_all);

    // Never observed anywhere in the group: absent from the report.
    if dup_first.iter().max() == Some(&0) && dup_last.iter().max() == Some(&0) {
        return None;
    }

    let first_offsets = offsets(transitions, kind, |t| &t.time_to_reach_first);
    let last_offsets = offsets(transitions, kind, |t| &t.time_to_reach_last);

    let merged_first = merge_single_attributes(transitions, kind, |t| &t.attributes_first);
    let merged_last = merge_single_attributes(transitions, kind, |t| &t.attributes_last);
    let merged_all = merge_list_attributes(transitions, kind);

    Some(EventKindSummary {
        kind: kind.to_string(),
        first: section(Some(&first_offsets), &dup_first, &merged_first),
        all: section(None, &dup_all, &merged_all),
        last: section(Some(&last_offsets), &dup_last, &merged_last),
    })
}

fn section(
    offsets: Option<&[f64]>,
    duplicates: &[u64],
    attributes: &BTreeMap<String, Vec<AttrValue>>,
) -> SectionSummary {
    let dup_values: Vec<f64> = duplicates.iter().map(|&d| d as f64).collect();
    let indicators: Vec<f64> = duplicates
        .iter()
        .map(|&d| if d >= 1 { 1.0 } else { 0.0 })
        .collect();

    SectionSummary {
        offset_mean_ms: offsets.map(stats::mean),
        offset_stdev_ms: offsets.map(stats::stdev),
        presence_fraction: stats::mean(&indicators),
        duplicates_mean: stats::mean(&dup_values),
        duplicates_stdev: stats::stdev(&dup_values),
        duplicates_min: duplicates.iter().copied().min().unwrap_or(0),
        samples: duplicates.len() as u64,
        attributes: summarize_attributes(attributes),
    }
}

fn duplicate_counts(
    transitions: &[Transition],
    kind: &str,
    map: impl Fn(&Transition) -> &BTreeMap<String, u64>,
) -> Vec<u64> {
    transitions
        .iter()
        .map(|t| map(t).get(kind).copied().unwrap_or(0))
        .collect()
}

fn offsets(
    transitions: &[Transition],
    kind: &str,
    map: impl Fn(&Transition) -> &BTreeMap<String, i64>,
) -> Vec<f64> {
    transitions
        .iter()
        .filter_map(|t| map(t).get(kind).map(|&offset| offset as f64))
        .collect()
}

fn merge_single_attributes(
    transitions: &[Transition],
    kind: &str,
    map: impl Fn(&Transition) -> &BTreeMap<String, BTreeMap<String, AttrValue>>,
) -> BTreeMap<String, Vec<AttrValue>> {
    let mut merged: BTreeMap<String, Vec<AttrValue>> = BTreeMap::new();
    for transition in transitions {
        if let Some(attrs) = map(transition).get(kind) {
            stats::merge_values(
                &mut merged,
                attrs.iter().map(|(label, value)| (label.clone(), value.clone())),
            );
        }
    }
    merged
}

fn merge_list_attributes(
    transitions: &[Transition],
    kind: &str,
) -> BTreeMap<String, Vec<AttrValue>> {
    let mut merged: BTreeMap<String, Vec<AttrValue>> = BTreeMap::new();
    for transition in transitions {
        if let Some(attrs) = transition.attributes_all.get(kind) {
            stats::merge_value_lists(
                &mut merged,
                attrs
                    .iter()
                    .map(|(label, values)| (label.clone(), values.clone())),
            );
        }
    }
    merged
}

fn summarize_attributes(
    merged: &BTreeMap<String, Vec<AttrValue>>,
) -> Vec<AttributeSummary> {
    merged
        .iter()
        .map(|(label, values)| {
            let nums: Vec<f64> = values
                .iter()
                .filter_map(|v| v.as_num().map(|n| n as f64))
                .collect();
            let stats = if !values.is_empty() && nums.len() == values.len() {
                AttributeStats::Numeric {
                    mean: stats::mean(&nums),
                    stdev: stats::stdev(&nums),
                }
            } else {
                let mut counts: BTreeMap<String, u64> = BTreeMap::new();
                for value in values {
                    *counts.entry(value.to_string()).or_insert(0) += 1;
                }
                let mut ranked: Vec<(String, u64)> = counts.into_iter().collect();
                ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
                AttributeStats::Frequent {
                    values: ranked
                        .into_iter()
                        .take(3)
                        .map(|(value, count)| FrequentValue { value, count })
                        .collect(),
                }
            };
            AttributeSummary {
                label: label.clone(),
                stats,
            }
        })
        .collect()
}

/// Feature rows for every group whose label matches a scenario, in label
/// order, one row per transition.
pub(crate) fn build_features(
    groups: &BTreeMap<String, Vec<Transition>>,
) -> Vec<ScenarioFeatures> {
    let mut features: BTreeMap<&'static str, Vec<Vec<f64>>> = BTreeMap::new();
    for (label, transitions) in groups {
        let Some(scenario) = match_scenario(label) else {
            continue;
        };
        let rows = features.entry(scenario.tag).or_default();
        for transition in transitions {
            rows.push(feature_row(scenario, transition));
        }
    }
    features
        .into_iter()
        .map(|(tag, rows)| ScenarioFeatures {
            tag: tag.to_string(),
            rows,
        })
        .collect()
}

/// Space-separated feature row: integral values print without a decimal
/// point, an unknown signal prints as `nan`.
pub fn format_feature_row(row: &[f64]) -> String {
    row.iter()
        .map(|&value| format_feature(value))
        .collect::<Vec<_>>()
        .join(" ")
}

fn format_feature(value: f64) -> String {
    if value.is_nan() {
        "nan".to_string()
    } else if value.fract() == 0.0 && value.abs() < 9.0e15 {
        format!("{}", value as i64)
    } else {
        format!("{}", value)
    }
}

/// Render the human-readable per-group statistics.
pub fn render_text(report: &Report) -> String {
    let mut out = String::new();
    let push = |out: &mut String, line: &str| {
        out.push_str(line);
        out.push('\n');
    };

    for group in &report.groups {
        push(
            &mut out,
            &format!("== {} ({} transitions) ==", group.label, group.count),
        );
        push(
            &mut out,
            &format!(
                "  duration: mean {:.2} ms, stdev {:.2} ms, min {} ms, p5 {:.2} ms",
                group.duration_mean_ms,
                group.duration_stdev_ms,
                group.duration_min_ms,
                group.duration_p5_ms
            ),
        );
        if let Some(signal) = &group.signal {
            push(
                &mut out,
                &format!(
                    "  signal: RSSI {:.2}, power ratio {:.3}",
                    signal.rssi, signal.power_ratio
                ),
            );
        }
        for kind in &group.kinds {
            push(&mut out, &format!("  {}", kind.kind));
            render_section(&mut out, "BEGIN", &kind.first);
            render_section(&mut out, "ALL", &kind.all);
            render_section(&mut out, "END", &kind.last);
        }
        push(&mut out, "");
    }
    out
}

fn render_section(out: &mut String, name: &str, section: &SectionSummary) {
    let mut line = format!("    {}:", name);
    if let Some(offset) = section.offset_mean_ms {
        line.push_str(&format!(" offset mean {:.2} ms |", offset));
    }
    line.push_str(&format!(
        " present {:.2} | duplicates mean {:.2} min {} | samples {}",
        section.presence_fraction,
        section.duplicates_mean,
        section.duplicates_min,
        section.samples
    ));
    out.push_str(&line);
    out.push('\n');
    if !section.attributes.is_empty() {
        out.push_str("      attributes:\n");
        for attribute in &section.attributes {
            match &attribute.stats {
                AttributeStats::Numeric { mean, stdev } => {
                    out.push_str(&format!(
                        "        {} | mean {:.2} stdev {:.2}\n",
                        attribute.label, mean, stdev
                    ));
                }
                AttributeStats::Frequent { values } => {
                    let rendered: Vec<String> = values
                        .iter()
                        .map(|v| format!("{}: {}", v.value, v.count))
                        .collect();
                    out.push_str(&format!(
                        "        {} | {}\n",
                        attribute.label,
                        rendered.join(" | ")
                    ));
                }
            }
        }
    }
}
