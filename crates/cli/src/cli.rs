use clap::Parser;
use clap_verbosity_flag::{Verbosity, WarnLevel};
use config::{Config, ReportKind};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// pesieve-rs: scan a live process with pe-sieve
///
/// Loads the pe-sieve engine DLL, scans one process for implants, hollowing,
/// hooks and in-memory patches, and prints the summary report. With
/// `--report`, the detailed JSON report of the scan is printed as well.
#[derive(Debug, Parser, Clone)]
#[command(about, long_about, version)]
pub struct Cli {
    /// PID of the process to scan.
    ///
    /// Defaults to the PID from the configuration, then to this process.
    #[arg(short, long)]
    pub pid: Option<u32>,

    /// Path to configuration file.
    #[arg(short, long, value_parser = validate_file)]
    pub conffile: Option<PathBuf>,

    /// Directory holding the engine DLL.
    ///
    /// Overrides `PESIEVE_DIR` and the configuration file.
    #[arg(short, long, value_parser = validate_dir)]
    pub engine_dir: Option<PathBuf>,

    /// Detailed report to fetch: none, scanned, dumped or all.
    #[arg(short, long, value_parser = parse_report_kind)]
    pub report: Option<ReportKind>,

    /// Capacity of the detail buffer, in bytes.
    #[arg(short = 's', long)]
    pub max_detail_size: Option<u32>,

    /// Scan once more with a large enough buffer if the detail was truncated.
    #[arg(long)]
    pub refetch: bool,

    /// Print the engine's own help and exit.
    #[arg(long)]
    pub engine_help: bool,

    /// Print the effective configuration as TOML and exit.
    #[arg(long)]
    pub print_config: bool,

    /// Give up waiting for the scan after this many seconds.
    #[arg(short, long, value_parser = validate_timeout)]
    pub timeout: Option<Duration>,

    #[command(flatten)]
    pub verbosity: Verbosity<WarnLevel>,
}

impl Cli {
    /// Command line flags take precedence over the file and the environment.
    pub fn apply(&self, config: &mut Config) {
        if let Some(dir) = &self.engine_dir {
            config.engine.dir = Some(dir.clone());
        }
        config.scan.pid = match self.pid {
            Some(pid) => pid,
            None if config.scan.pid == 0 => std::process::id(),
            None => config.scan.pid,
        };
        if let Some(report) = self.report {
            config.detail.report = report;
        }
        if let Some(size) = self.max_detail_size {
            config.detail.max_size = size;
        }
        config.detail.refetch |= self.refetch;
    }
}

/// Check if the file exists.
#[inline(always)]
fn validate_file(file: &str) -> Result<PathBuf, String> {
    let path = Path::new(file);
    if path.is_file() {
        Ok(path.to_owned())
    } else {
        Err(format!("File not found: {:?}", path))
    }
}

/// Check if the directory exists.
#[inline(always)]
fn validate_dir(dir: &str) -> Result<PathBuf, String> {
    let path = Path::new(dir);
    if path.is_dir() {
        Ok(path.to_owned())
    } else {
        Err(format!("Directory not found: {:?}", path))
    }
}

#[inline(always)]
fn parse_report_kind(kind: &str) -> Result<ReportKind, String> {
    kind.parse().map_err(|err: config::Error| err.to_string())
}

/// Validate timeout in seconds
#[inline(always)]
fn validate_timeout(secs: &str) -> Result<Duration, String> {
    let secs: u64 = secs
        .parse()
        .map_err(|_| format!("`{secs}` is not a valid number of seconds"))?;
    if secs == 0 {
        Err("Timeout must be at least one second".to_string())
    } else {
        Ok(Duration::from_secs(secs))
    }
}
