use std::io;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::Context;
use clap::{ArgAction, CommandFactory, Parser};
use csitrace_core::PcapFileSource;
use glob::glob;
use tracing::info;
use tracing_subscriber::EnvFilter;

const LONG_VERSION: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    " (",
    env!("CSITRACE_BUILD_COMMIT"),
    " ",
    env!("CSITRACE_BUILD_DATE"),
    ")"
);

#[derive(Parser, Debug)]
#[command(name = "csitrace")]
#[command(version, long_version = LONG_VERSION)]
#[command(
    about = "Decode CSI gRPC calls from a packet capture into NDJSON records.",
    long_about = None,
    after_help = "Examples:\n  csitrace csi.pcap > calls.ndjson\n  csitrace -vv 'captures/node-*.pcapng'\n  RUST_LOG=csitrace_core=trace csitrace csi.pcap"
)]
struct Cli {
    /// Path (or glob matching exactly one file) of a .pcap/.pcapng capture
    capture: Option<PathBuf>,

    /// Increase log verbosity on stderr (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let Some(capture) = cli.capture else {
        eprintln!("{}", Cli::command().render_help());
        return ExitCode::SUCCESS;
    };

    match cmd_trace(&capture) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {}", err.message);
            if let Some(hint) = err.hint {
                eprintln!("hint: {hint}");
            }
            ExitCode::from(2)
        }
    }
}

fn init_tracing(verbose: u8) {
    let filter = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()))
        .with_writer(io::stderr)
        .init();
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
        CliError::new(format!("{err:#}"), None)
    }
}

fn cmd_trace(capture: &Path) -> Result<(), CliError> {
    let input = resolve_input_path(capture)?;
    validate_input_file(&input)?;

    // Library errors already render their cause; anyhow's chain would repeat it.
    let report = csitrace_core::analyze_pcap_file(&input).map_err(|err| {
        CliError::new(
            format!("analysis of {} failed: {err}", input.display()),
            Some("rerun with -vv for per-flow decoding details".to_string()),
        )
    })?;

    let stdout = io::stdout();
    let mut out = io::BufWriter::new(stdout.lock());
    report
        .write_ndjson(&mut out)
        .context("failed to write records to stdout")?;

    info!(
        input = %input.display(),
        records = report.records.len(),
        "records written"
    );
    Ok(())
}

fn validate_input_file(input: &Path) -> Result<(), CliError> {
    if !input.exists() {
        return Err(CliError::new(
            format!("input file not found: {}", input.display()),
            Some("pass the path of a pcap or pcapng capture".to_string()),
        ));
    }
    if !input.is_file() {
        return Err(CliError::new(
            format!("input is not a file: {}", input.display()),
            Some("pass the path of a pcap or pcapng capture".to_string()),
        ));
    }
    if !matches!(PcapFileSource::detect(input), Ok(Some(_))) {
        return Err(CliError::new(
            format!("not a pcap or pcapng capture: {}", input.display()),
            Some("the file must start with a pcap or pcapng magic number".to_string()),
        ));
    }
    Ok(())
}

fn resolve_input_path(input: &Path) -> Result<PathBuf, CliError> {
    let pattern = input.to_string_lossy();
    if !is_glob_pattern(&pattern) {
        return Ok(input.to_path_buf());
    }

    let paths = glob(&pattern).map_err(|err| {
        CliError::new(
            format!("invalid input pattern '{pattern}'"),
            Some(format!("pattern error: {}", err.msg)),
        )
    })?;
    let mut matches = Vec::new();
    for entry in paths {
        let path = entry.map_err(|err| {
            CliError::new(
                format!("invalid input pattern '{pattern}'"),
                Some(format!("pattern error: {err}")),
            )
        })?;
        if path.is_file() {
            matches.push(path);
        }
    }

    match matches.len() {
        0 => Err(CliError::new(
            format!("no files match pattern '{pattern}'"),
            Some("check the path or quote the pattern; expected .pcap or .pcapng".to_string()),
        )),
        1 => Ok(matches.remove(0)),
        count => {
            let mut listed = matches
                .iter()
                .take(3)
                .map(|p| p.display().to_string())
                .collect::<Vec<_>>()
                .join(", ");
            if count > 3 {
                listed.push_str(", ...");
            }
            Err(CliError::new(
                format!("multiple files match pattern '{pattern}' ({count} matches); matches: {listed}"),
                Some("pass a single capture file, or run once per file".to_string()),
            ))
        }
    }
}

fn is_glob_pattern(input: &str) -> bool {
    input.contains('*') || input.contains('?') || input.contains('[')
}
