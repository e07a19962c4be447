use anyhow::Context;
use clap::Parser;
use config::Config;
use engine::{Scanner, Verdict};
use flume::bounded;
use pesieve_rs::{
    cli::Cli,
    session::{Outcome, Session},
    signals::wait_for_signal,
    summary,
};
use std::io::{self, Write};
use tracing::{debug, error};
use tracing_log::AsTrace;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    tracing_subscriber::fmt()
        .with_max_level(cli.verbosity.log_level_filter().as_trace())
        .with_level(true)
        .with_file(true)
        .with_line_number(true)
        .with_writer(io::stderr)
        .init();

    debug!(config = ?cli);

    // An abandoned engine call may still be running; exit without waiting
    // for the runtime to join it.
    let code = match run(cli).await {
        Ok(verdict) => verdict.code(),
        Err(err) => {
            error!(error = ?err, "scan failed");
            Verdict::Error.code()
        }
    };
    std::process::exit(code);
}

async fn run(cli: Cli) -> anyhow::Result<Verdict> {
    let mut config = match &cli.conffile {
        Some(path) => Config::load(path)?,
        None => Config::from_env()?,
    };
    cli.apply(&mut config);
    debug!(?config, "effective configuration");

    if cli.print_config {
        io::stdout().lock().write_all(config.to_toml()?.as_bytes())?;
        return Ok(Verdict::Info);
    }

    let scanner = Scanner::native(&config.engine).context("failed to bind the engine")?;
    if cli.engine_help {
        scanner.help();
        return Ok(Verdict::Info);
    }

    let (events_tx, events_rx) = bounded(8);
    tokio::spawn(async move {
        if let Err(err) = wait_for_signal(&events_tx).await {
            error!(error = ?err, "Error while waiting for signal");
        }
    });

    let outcome = Session::new(&config, cli.timeout)
        .run(scanner, &events_rx)
        .await
        .with_context(|| format!("scan of process {} failed", config.scan.pid))?;

    let mut stdout = io::stdout().lock();
    summary::write_report(&mut stdout, outcome.report())?;
    if let Outcome::Extended(out) = &outcome {
        summary::write_detail(&mut stdout, &out.detail)?;
    }
    stdout.flush()?;

    Ok(outcome.verdict())
}
