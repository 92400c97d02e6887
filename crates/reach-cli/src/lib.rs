//! Shared plumbing for the stage binaries.
//!
//! Every stage follows the same discipline: parse flags, initialize
//! logging, run, print exactly one summary line on success, and exit with
//! `0` (success), `1` (invalid input), or `2` (fatal runtime error).

use std::process::ExitCode;

/// Exit discipline shared by all stages.
pub enum StageError {
    /// Bad paths, malformed columns, impossible flag combinations.
    Input(String),
    /// Anything that failed after inputs validated.
    Runtime(String),
}

impl StageError {
    pub fn input(msg: impl Into<String>) -> Self {
        StageError::Input(msg.into())
    }

    pub fn runtime(msg: impl Into<String>) -> Self {
        StageError::Runtime(msg.into())
    }
}

impl<E: std::error::Error> From<E> for StageError {
    fn from(e: E) -> Self {
        StageError::Runtime(e.to_string())
    }
}

/// Parse CLI flags with the stage exit contract: help/version exit 0,
/// anything malformed exits 1.
pub fn parse_or_exit<T: clap::Parser>() -> Result<T, ExitCode> {
    use clap::error::ErrorKind;
    match T::try_parse() {
        Ok(args) => Ok(args),
        Err(e) if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            print!("{e}");
            Err(ExitCode::SUCCESS)
        }
        Err(e) => {
            eprintln!("{e}");
            Err(ExitCode::from(1))
        }
    }
}

/// Initialize tracing from `RUST_LOG` (default `info`).
pub fn init_logging() {
    use tracing_subscriber::EnvFilter;
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();
}

/// Run a stage body and translate its outcome into the exit contract.
/// The single-line diagnostic goes to stderr; the summary to stdout.
pub fn run_stage(body: impl FnOnce() -> Result<String, StageError>) -> ExitCode {
    match body() {
        Ok(summary) => {
            println!("{summary}");
            ExitCode::SUCCESS
        }
        Err(StageError::Input(msg)) => {
            eprintln!("error: {msg}");
            ExitCode::from(1)
        }
        Err(StageError::Runtime(msg)) => {
            eprintln!("fatal: {msg}");
            ExitCode::from(2)
        }
    }
}

/// Percentile of an ascending-sorted slice (nearest-rank).
pub fn percentile_u16(sorted: &[u16], q: f64) -> Option<u16> {
    (!sorted.is_empty()).then(|| sorted[((sorted.len() - 1) as f64 * q).round() as usize])
}

/// `p50_s=… p95_s=…` fragment used by several summaries.
pub fn seconds_summary(sorted: &[u16]) -> String {
    match (percentile_u16(sorted, 0.50), percentile_u16(sorted, 0.95)) {
        (Some(p50), Some(p95)) => format!("p50_s={p50} p95_s={p95}"),
        _ => "p50_s=nan p95_s=nan".to_owned(),
    }
}

/// Today's date as `YYYY-MM-DD` (snapshot stamps).
pub fn snapshot_ts() -> String {
    chrono::Utc::now().date_naive().to_string()
}
