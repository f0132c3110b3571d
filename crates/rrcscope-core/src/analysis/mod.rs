//! Analysis pipeline: extraction, merge, segmentation, aggregation.

mod aggregate;
mod merge;
mod scenario;
mod segment;

pub use aggregate::{format_feature_row, render_text};
pub use merge::MergeError;
pub use scenario::scenario_tags;

use std::path::Path;

use thiserror::Error;

use crate::extract::{ParserContext, TraceExtractor};
use crate::source::{self, PacketRecord, SourceError};
use crate::stats::format_clock;
use crate::{InputInfo, REPORT_VERSION, Report, ToolInfo};

#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("source error: {0}")]
    Source(#[from] SourceError),
    #[error("merge error: {0}")]
    Merge(#[from] MergeError),
}

/// Pipeline configuration.
#[derive(Debug, Clone)]
pub struct AnalyzeOptions {
    /// Record-boundary prefix of the trace corpus.
    pub date_prefix: String,
    /// Local device address used to classify candidate packets as sent.
    pub local_addr: Option<String>,
}

impl Default for AnalyzeOptions {
    fn default() -> Self {
        AnalyzeOptions {
            date_prefix: crate::extract::DEFAULT_DATE_PREFIX.to_string(),
            local_addr: None,
        }
    }
}

/// Analyze a trace file together with an optional packet-record file.
pub fn analyze_trace_file(
    trace: &Path,
    packets: Option<&Path>,
    options: &AnalyzeOptions,
) -> Result<Report, AnalysisError> {
    let lines = source::read_trace_lines(trace)?;
    let records = match packets {
        Some(path) => source::read_packet_records(path)?,
        None => Vec::new(),
    };
    let mut report = analyze_lines(lines.iter().map(String::as_str), &records, options)?;
    report.input = InputInfo {
        path: trace.display().to_string(),
        bytes: trace.metadata()?.len(),
        packets_path: packets.map(|path| path.display().to_string()),
    };
    Ok(report)
}

/// Analyze in-memory trace lines and packet records.
pub fn analyze_lines<'a, I>(
    lines: I,
    records: &[PacketRecord],
    options: &AnalyzeOptions,
) -> Result<Report, AnalysisError>
where
    I: IntoIterator<Item = &'a str>,
{
    let extractor = TraceExtractor::new(&options.date_prefix);
    let mut ctx = ParserContext::new();
    for line in lines {
        extractor.push_line(&mut ctx, line);
    }
    extractor.finish(&mut ctx);

    let packet_events = merge::packet_events(records, options.local_addr.as_deref())?;
    let mut events = merge::merge_ordered(ctx.events, packet_events);
    merge::forward_fill(&mut events);

    let mut segmenter = segment::Segmenter::new();
    for event in &events {
        segmenter.push(event);
    }
    let groups = segmenter.finish();

    let generated_at = events
        .last()
        .map_or_else(|| format_clock(0), |event| format_clock(event.time));

    Ok(Report {
        report_version: REPORT_VERSION,
        tool: ToolInfo {
            name: "rrcscope".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        },
        generated_at,
        input: InputInfo {
            path: "<memory>".to_string(),
            bytes: 0,
            packets_path: None,
        },
        event_kinds: ctx.distinct.iter().cloned().collect(),
        groups: aggregate::build_groups(&groups, &ctx.distinct),
        features: aggregate::build_features(&groups),
    })
}
