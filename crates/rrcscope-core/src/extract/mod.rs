//! Trace-record extraction.
//!
//! A record starts at a line whose prefix matches the trace's date marker
//! and spans every line up to the next boundary. Each line of the current
//! record runs through the extraction steps (timestamp, state change,
//! signal strength, secondary attributes); every step skips lines it does
//! not recognize instead of failing. All mutable parse state lives in an
//! explicit [`ParserContext`] owned by the pipeline driver.

mod rules;
mod signal;
mod state;

use std::collections::BTreeSet;

use log::{debug, warn};
use regex::Regex;

use crate::event::{Event, PACKET_OTHER, PACKET_RCV, PACKET_SENT, SignalSnapshot};
use rules::{RuleOutcome, RuleTable};
use state::{LteStateTracker, WcdmaStateTracker};

/// Default record-boundary prefix for the supported trace corpus.
pub const DEFAULT_DATE_PREFIX: &str = "2013";

const PAYLOAD_MARKER: &str = "Payload String";
/// Column offset of the fallback kind words on unparseable record lines.
const FALLBACK_WORD_OFFSET: usize = 6;

/// Event under construction. An empty kind means "no recognizable type
/// yet"; such records still feed the signal context but are dropped at
/// seal time.
struct PendingEvent {
    event: Event,
    time_seen: bool,
}

/// All mutable state of a parse: the event under construction, the
/// per-family state trackers, the last known signal snapshot and the
/// distinct-kind set. One context per run, threaded through every step.
pub(crate) struct ParserContext {
    current: Option<PendingEvent>,
    lte: LteStateTracker,
    wcdma: WcdmaStateTracker,
    last_signal: Option<SignalSnapshot>,
    pub(crate) distinct: BTreeSet<String>,
    pub(crate) events: Vec<Event>,
}

impl ParserContext {
    pub(crate) fn new() -> Self {
        // Packet kinds are part of every report's kind universe even when
        // no packet stream is supplied.
        let distinct = [PACKET_SENT, PACKET_RCV, PACKET_OTHER]
            .into_iter()
            .map(str::to_string)
            .collect();
        ParserContext {
            current: None,
            lte: LteStateTracker::new(),
            wcdma: WcdmaStateTracker::new(),
            last_signal: None,
            distinct,
            events: Vec::new(),
        }
    }
}

/// Immutable extraction machinery: compiled patterns and the attribute
/// rule table.
pub(crate) struct TraceExtractor {
    date_prefix: String,
    kind_token: Regex,
    clock: Regex,
    rules: RuleTable,
}

impl TraceExtractor {
    pub(crate) fn new(date_prefix: &str) -> Self {
        TraceExtractor {
            date_prefix: date_prefix.to_string(),
            kind_token: Regex::new("[A-Z]+(?:_+[A-Z0-9]+)+").expect("kind token pattern"),
            clock: Regex::new(r"(\d+):(\d+):(\d+)\.(\d+)").expect("clock pattern"),
            rules: RuleTable::new(),
        }
    }

    /// Feed one raw trace line.
    pub(crate) fn push_line(&self, ctx: &mut ParserContext, raw: &str) {
        let line = raw.trim();
        if line.starts_with('%') {
            return;
        }

        if line.starts_with(&self.date_prefix) {
            self.seal(ctx);
            let (kind, subtype) = self.detect_kind(line);
            let mut event = Event::new(kind, 0);
            event.subtype = subtype;
            event.signal = ctx.last_signal;
            ctx.current = Some(PendingEvent {
                event,
                time_seen: false,
            });
        }

        let Some(pending) = ctx.current.as_mut() else {
            return;
        };

        // The boundary line itself carries the record timestamp; later
        // time-shaped substrings (payload text) must not displace it.
        if !pending.time_seen {
            if let Some(caps) = self.clock.captures(line) {
                pending.event.time = clock_millis(&caps);
                pending.time_seen = true;
            }
        }

        if pending.event.kind.contains("WCDMA") {
            ctx.wcdma.observe(&mut pending.event, line);
        } else {
            ctx.lte.observe(&mut pending.event, line);
        }

        if let Some(snapshot) = signal::parse_signal_line(line) {
            pending.event.signal = Some(snapshot);
            ctx.last_signal = Some(snapshot);
        }

        if line.contains(PAYLOAD_MARKER) && !pending.event.kind.is_empty() {
            match self
                .rules
                .apply(&pending.event.kind, line, &mut pending.event.attributes)
            {
                RuleOutcome::Renamed(name) => pending.event.kind = name,
                RuleOutcome::Unmatched => {
                    warn!(
                        "no attribute alternative matched for {}: {}",
                        pending.event.kind, line
                    );
                }
                RuleOutcome::Captured | RuleOutcome::NoRule => {}
            }
        }
    }

    /// Seal the trailing record once the input is exhausted.
    pub(crate) fn finish(&self, ctx: &mut ParserContext) {
        self.seal(ctx);
    }

    fn seal(&self, ctx: &mut ParserContext) {
        let Some(pending) = ctx.current.take() else {
            return;
        };
        if pending.event.kind.is_empty() {
            debug!("dropping record without a recognizable event kind");
            return;
        }
        ctx.distinct.insert(pending.event.kind.clone());
        ctx.events.push(pending.event);
    }

    fn detect_kind(&self, line: &str) -> (String, Option<String>) {
        if let Some(token) = self.kind_token.find(line) {
            let kind = token.as_str().to_string();
            let subtype = match kind.as_str() {
                "EVENT_RRC_MESSAGE_RECEIVED" => Some(" <---- ".to_string()),
                "EVENT_RRC_MESSAGE_SENT" => Some(" ----> ".to_string()),
                _ => None,
            };
            return (kind, subtype);
        }
        let words: Vec<&str> = line.split_whitespace().collect();
        if words.len() > FALLBACK_WORD_OFFSET {
            (words[FALLBACK_WORD_OFFSET..].join("_"), None)
        } else {
            (String::new(), None)
        }
    }
}

fn clock_millis(caps: &regex::Captures<'_>) -> i64 {
    let field = |i: usize| caps[i].parse::<i64>().unwrap_or(0);
    field(1) * 3_600_000 + field(2) * 60_000 + field(3) * 1_000 + field(4)
}
