use crate::abi::{RawParams, RawReport};
use crate::detail::{Completeness, Detail, DetailBuffer};
use crate::error::Error;
use crate::library::NativeEngine;
use crate::marshal::Marshaled;
use crate::report::{Report, ScanStatus};
use crate::wire::WireEnum;
use config::{EngineConfig, ReportKind, ScanParams};
use parking_lot::Mutex;
use std::ptr;
use tracing::{debug, warn};

/// The three entry points of a scanning engine, at the record level.
///
/// Implementations write into `report` (and `detail`) in place. An `Err` means
/// the call itself failed; whatever was written must not be used.
pub trait Engine: Send + Sync {
    /// Prints identification and usage. Never fails observably.
    fn help(&self);

    fn scan(&self, report: &mut RawReport, params: &RawParams) -> Result<(), Error>;

    /// Writes up to `detail.len()` bytes of the requested report and stores
    /// the full report size in `needed`. Returns the address of the report the
    /// engine filled in.
    fn scan_ex(
        &self,
        report: &mut RawReport,
        params: &RawParams,
        report_kind: u32,
        detail: &mut [u8],
        needed: &mut u32,
    ) -> Result<usize, Error>;
}

// The engine is not known to be reentrant: one call at a time, process-wide.
static CALL_LOCK: Mutex<()> = Mutex::new(());

#[derive(Debug, Clone)]
pub struct ScanExOutput {
    pub report: Report,
    pub detail: Detail,
}

/// Runs scans against an [`Engine`], one at a time.
#[derive(Clone, Copy)]
pub struct Scanner<'e> {
    engine: &'e dyn Engine,
}

impl Scanner<'static> {
    /// A scanner bound to the engine DLL.
    pub fn native(config: &EngineConfig) -> Result<Self, Error> {
        Ok(Self::new(NativeEngine::global(config)?))
    }
}

impl<'e> Scanner<'e> {
    pub fn new(engine: &'e dyn Engine) -> Self {
        Self { engine }
    }

    pub fn help(&self) {
        let _guard = CALL_LOCK.lock();
        self.engine.help();
    }

    /// Basic scan: the summary report only.
    pub fn scan(&self, params: &ScanParams) -> Result<Report, Error> {
        let span = tracing::debug_span!("scan", pid = params.pid);
        let _enter = span.enter();

        debug!("marshaling");
        let marshaled = Marshaled::new(params)?;
        let mut raw = RawReport::zeroed();

        debug!("invoking");
        {
            let _guard = CALL_LOCK.lock();
            self.engine.scan(&mut raw, marshaled.raw())?;
        }

        Ok(unmarshal(raw))
    }

    /// Extended scan: the summary report plus up to `max_detail_size` bytes
    /// of the `report_kind` report.
    ///
    /// A report larger than the buffer is not an error. It comes back as
    /// [`Completeness::Truncated`] with the size a retry would need.
    pub fn scan_ex(
        &self,
        params: &ScanParams,
        report_kind: ReportKind,
        max_detail_size: u32,
    ) -> Result<ScanExOutput, Error> {
        let span = tracing::debug_span!("scan_ex", pid = params.pid, %report_kind, max_detail_size);
        let _enter = span.enter();

        debug!("marshaling");
        let marshaled = Marshaled::new(params)?;
        let mut raw = RawReport::zeroed();
        let mut buffer = DetailBuffer::new(max_detail_size);
        let mut needed = 0u32;

        debug!("invoking");
        let returned = {
            let _guard = CALL_LOCK.lock();
            self.engine.scan_ex(
                &mut raw,
                marshaled.raw(),
                report_kind.to_wire(),
                buffer.as_mut_slice(),
                &mut needed,
            )?
        };

        let expected = ptr::addr_of!(raw) as usize;
        if returned != expected {
            return Err(Error::IdentityMismatch { expected, returned });
        }

        let detail = buffer.into_detail(needed);
        match detail.completeness() {
            Completeness::Complete => debug!(needed, "detail complete"),
            Completeness::Truncated { needed, capacity } => {
                warn!(needed, capacity, "detail truncated, buffer too small")
            }
        }

        Ok(ScanExOutput {
            report: unmarshal(raw),
            detail,
        })
    }
}

fn unmarshal(raw: RawReport) -> Report {
    let report = Report::from(raw);
    match report.status() {
        ScanStatus::NotPerformed => warn!(pid = report.pid, "engine performed no scan"),
        ScanStatus::Partial { errors } => debug!(errors, "some elements could not be scanned"),
        ScanStatus::Complete => {}
    }
    debug!(?report, "scan finished");
    report
}
