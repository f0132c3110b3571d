use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use glob::glob;

use rrcscope_core::{AnalyzeOptions, Report};

#[derive(Parser, Debug)]
#[command(name = "rrcscope")]
#[command(version)]
#[command(
    about = "Offline analyzer for cellular RRC diagnostic traces (LTE / WCDMA).",
    long_about = None,
    after_help = "Examples:\n  rrcscope trace analyse qxdm.txt -o report.json\n  rrcscope trace analyze qxdm.txt --packets packets.jsonl --local-addr 10.0.0.1 --out-prefix run1"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbosity (can be repeated: -v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Operations on diagnostic trace files (offline-first).
    Trace {
        #[command(subcommand)]
        command: TraceCommands,
    },
}

#[derive(Subcommand, Debug)]
enum TraceCommands {
    /// Analyse a trace and report per-transition statistics.
    #[command(alias = "analyze")]
    #[command(
        after_help = "Examples:\n  rrcscope trace analyse qxdm.txt -o report.json\n  rrcscope trace analyse qxdm.txt --out-prefix run1 --quiet"
    )]
    Analyse {
        /// Path to a trace file (glob patterns accepted)
        input: PathBuf,

        /// Packet-record file (JSON Lines: time, destination, is_candidate)
        #[arg(long)]
        packets: Option<PathBuf>,

        /// Local device address for packet direction classification
        #[arg(long, requires = "packets")]
        local_addr: Option<String>,

        /// Record-boundary date prefix
        #[arg(long, default_value = rrcscope_core::DEFAULT_DATE_PREFIX)]
        date_prefix: String,

        /// Output report path (JSON)
        #[arg(short = 'o', long)]
        report: Option<PathBuf>,

        /// Write JSON report to stdout instead of the text summary
        #[arg(long, conflicts_with = "report")]
        stdout: bool,

        /// Pretty-print JSON output
        #[arg(long, conflicts_with = "compact")]
        pretty: bool,

        /// Compact JSON output (default)
        #[arg(long)]
        compact: bool,

        /// Prefix for per-scenario feature files and the interval dump
        #[arg(long)]
        out_prefix: Option<PathBuf>,

        /// Suppress non-error output
        #[arg(long)]
        quiet: bool,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Commands::Trace { command } => match command {
            TraceCommands::Analyse {
                input,
                packets,
                local_addr,
                date_prefix,
                report,
                stdout,
                pretty,
                compact,
                out_prefix,
                quiet,
            } => cmd_trace_analyse(
                input,
                packets,
                local_addr,
                date_prefix,
                report,
                stdout,
                pretty,
                compact,
                out_prefix,
                quiet,
            ),
        },
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {}", err.message);
            if let Some(hint) = err.hint {
                eprintln!("hint: {}", hint);
            }
            ExitCode::from(2)
        }
    }
}

#[derive(Debug)]
struct CliError {
    message: String,
    hint: Option<String>,
}

impl CliError {
    fn new(message: impl Into<String>, hint: Option<String>) -> Self {
        Self {
            message: message.into(),
            hint,
        }
    }
}

impl std::fmt::Display for CliError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

impl From<anyhow::Error> for CliError {
    fn from(err: anyhow::Error) -> Self {
        CliError::new(err.to_string(), None)
    }
}

fn cmd_trace_analyse(
    input: PathBuf,
    packets: Option<PathBuf>,
    local_addr: Option<String>,
    date_prefix: String,
    report: Option<PathBuf>,
    stdout: bool,
    pretty: bool,
    compact: bool,
    out_prefix: Option<PathBuf>,
    quiet: bool,
) -> Result<(), CliError> {
    let resolved_input = resolve_input_path(&input)?;
    if !resolved_input.exists() {
        return Err(CliError::new(
            format!("input file not found: {}", resolved_input.display()),
            Some("pass a line-oriented RRC trace file".to_string()),
        ));
    }
    let meta = fs::metadata(&resolved_input)
        .with_context(|| format!("Failed to read input file: {}", resolved_input.display()))?;
    if !meta.is_file() {
        return Err(CliError::new(
            format!("input is not a file: {}", resolved_input.display()),
            Some("pass a line-oriented RRC trace file".to_string()),
        ));
    }

    if let Some(report_path) = report.as_ref() {
        if fs::canonicalize(report_path).ok() == fs::canonicalize(&resolved_input).ok()
            && report_path.exists()
        {
            return Err(CliError::new(
                format!(
                    "report path must differ from input: {}",
                    report_path.display()
                ),
                Some("choose a different output path".to_string()),
            ));
        }
    }

    let options = AnalyzeOptions {
        date_prefix,
        local_addr,
    };
    let rep = rrcscope_core::analyze_trace_file(
        &resolved_input,
        packets.as_deref(),
        &options,
    )
    .context("trace analysis failed")?;

    if let Some(report_path) = report.as_ref() {
        let json = serialize_report(&rep, pretty, compact)?;
        if let Some(parent) = report_path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).with_context(|| {
                    format!("Failed to create output directory: {}", parent.display())
                })?;
            }
        }
        fs::write(report_path, json)
            .with_context(|| format!("Failed to write report: {}", report_path.display()))?;
        if !quiet {
            eprintln!("OK: report written -> {}", report_path.display());
        }
    }

    if let Some(prefix) = out_prefix.as_ref() {
        write_artifacts(prefix, &rep, quiet)?;
    }

    if stdout {
        let json = serialize_report(&rep, pretty, compact)?;
        print!("{}", json);
    } else if !quiet {
        print!("{}", rrcscope_core::render_text(&rep));
    }

    Ok(())
}

fn serialize_report(rep: &Report, pretty: bool, compact: bool) -> Result<String, CliError> {
    if pretty && compact {
        return Err(CliError::new(
            "cannot use --pretty and --compact together",
            Some("choose one output format".to_string()),
        ));
    }
    if pretty {
        serde_json::to_string_pretty(rep)
            .context("JSON serialization failed")
            .map_err(Into::into)
    } else {
        serde_json::to_string(rep)
            .context("JSON serialization failed")
            .map_err(Into::into)
    }
}

/// Write the per-scenario feature files and the interval dump. Stale
/// artifacts from an earlier run are removed first so reruns are
/// byte-identical.
fn write_artifacts(prefix: &PathBuf, rep: &Report, quiet: bool) -> Result<(), CliError> {
    let artifact = |suffix: &str| {
        let mut name = prefix.as_os_str().to_os_string();
        name.push(format!("_{}.txt", suffix));
        PathBuf::from(name)
    };

    for tag in rrcscope_core::scenario_tags() {
        let path = artifact(tag);
        if path.exists() {
            fs::remove_file(&path).with_context(|| {
                format!("Failed to remove stale artifact: {}", path.display())
            })?;
        }
    }

    for features in &rep.features {
        let path = artifact(&features.tag);
        let mut body = String::new();
        for row in &features.rows {
            body.push_str(&rrcscope_core::format_feature_row(row));
            body.push('\n');
        }
        fs::write(&path, body)
            .with_context(|| format!("Failed to write features: {}", path.display()))?;
        if !quiet {
            eprintln!(
                "OK: {} feature rows -> {}",
                features.rows.len(),
                path.display()
            );
        }
    }

    let intervals = artifact("intervals");
    let mut body = String::new();
    for group in &rep.groups {
        body.push_str(&group.label);
        body.push('\n');
        for duration in &group.durations_ms {
            body.push_str(&duration.to_string());
            body.push('\n');
        }
    }
    fs::write(&intervals, body)
        .with_context(|| format!("Failed to write intervals: {}", intervals.display()))?;
    if !quiet {
        eprintln!("OK: interval dump -> {}", intervals.display());
    }
    Ok(())
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };
    env_logger::Builder::from_default_env()
        .filter_level(level)
        .format_timestamp(None)
        .init();
}

fn resolve_input_path(input: &PathBuf) -> Result<PathBuf, CliError> {
    let pattern = input.to_string_lossy();
    if !is_glob_pattern(&pattern) {
        return Ok(input.clone());
    }

    let mut matches = Vec::new();
    let paths = glob(&pattern).map_err(|err| {
        CliError::new(
            format!("invalid input pattern '{}'", pattern),
            Some(format!("pattern error: {}", err.msg)),
        )
    })?;
    for entry in paths {
        let path = entry.map_err(|err| {
            CliError::new(
                format!("invalid input pattern '{}'", pattern),
                Some(format!("pattern error: {}", err)),
            )
        })?;
        if path.is_file() {
            matches.push(path);
        }
    }

    if matches.is_empty() {
        return Err(CliError::new(
            format!("no files match pattern '{}'", pattern),
            Some("check the path or quote the pattern".to_string()),
        ));
    }
    if matches.len() > 1 {
        let listed = matches
            .iter()
            .take(3)
            .map(|p| p.display().to_string())
            .collect::<Vec<_>>()
            .join(", ");
        let mut message = format!(
            "multiple files match pattern '{}' ({} matches); matches: {}",
            pattern,
            matches.len(),
            listed
        );
        if matches.len() > 3 {
            message.push_str(", ...");
        }
        return Err(CliError::new(
            message,
            Some("pass a single trace file, or run once per file".to_string()),
        ));
    }

    Ok(matches.remove(0))
}

fn is_glob_pattern(input: &str) -> bool {
    input.contains('*') || input.contains('?') || input.contains('[')
}
