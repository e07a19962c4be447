//! One scan request, run off the async runtime.

use crate::error::Error;
use crate::signals::SignalEvent;
use config::{Config, DetailParams, ReportKind, ScanParams};
use engine::{Completeness, Report, ScanExOutput, Scanner, Verdict};
use flume::Receiver;
use std::{future, time::Duration};
use tokio::{task, time};
use tracing::{info, warn};

#[derive(Debug, Clone)]
pub enum Outcome {
    Basic(Report),
    Extended(ScanExOutput),
}

impl Outcome {
    pub fn report(&self) -> &Report {
        match self {
            Self::Basic(report) => report,
            Self::Extended(out) => &out.report,
        }
    }

    pub fn verdict(&self) -> Verdict {
        self.report().verdict()
    }
}

#[derive(Debug, Clone)]
pub struct Session {
    pub params: ScanParams,
    pub detail: DetailParams,
    pub timeout: Option<Duration>,
}

impl Session {
    pub fn new(config: &Config, timeout: Option<Duration>) -> Self {
        Self {
            params: config.scan.clone(),
            detail: config.detail,
            timeout,
        }
    }

    /// Runs the scan, racing it against `events` and the timeout.
    ///
    /// The engine call cannot be cancelled. On interrupt or timeout the
    /// blocking task is left behind and the caller is expected to exit.
    pub async fn run(
        self,
        scanner: Scanner<'static>,
        events: &Receiver<SignalEvent>,
    ) -> Result<Outcome, Error> {
        let Self {
            params,
            detail,
            timeout,
        } = self;
        let scan = task::spawn_blocking(move || scan_blocking(scanner, &params, detail));

        let deadline = async {
            match timeout {
                Some(timeout) => time::sleep(timeout).await,
                None => future::pending().await,
            }
        };

        tokio::select! {
            result = scan => Ok(result??),
            Ok(event) = events.recv_async() => {
                warn!(?event, "abandoning scan");
                Err(Error::Interrupted { event })
            }
            _ = deadline => {
                warn!(?timeout, "scan timed out");
                Err(Error::TimedOut(timeout.unwrap_or_default()))
            }
        }
    }
}

fn scan_blocking(
    scanner: Scanner<'static>,
    params: &ScanParams,
    detail: DetailParams,
) -> Result<Outcome, engine::Error> {
    if detail.report == ReportKind::None {
        return Ok(Outcome::Basic(scanner.scan(params)?));
    }

    let out = scanner.scan_ex(params, detail.report, detail.max_size)?;
    match out.detail.completeness() {
        Completeness::Truncated { needed, .. } if detail.refetch => {
            info!(needed, "refetching detail");
            Ok(Outcome::Extended(
                scanner.scan_ex(params, detail.report, needed)?,
            ))
        }
        _ => Ok(Outcome::Extended(out)),
    }
}
