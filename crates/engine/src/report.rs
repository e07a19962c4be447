use crate::abi::{ERROR_SCAN_FAILURE, RawReport};
use crate::error::Error;

/// Summary of one scan, as filled in by the engine.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Report {
    pub pid: u32,
    /// The process is managed (.NET).
    pub is_managed: bool,
    pub is_64bit: bool,
    /// The scan ran on a process reflection.
    pub is_reflection: bool,
    /// Number of all scanned modules.
    pub scanned: u32,
    /// General summary of suspicious modules.
    pub suspicious: u32,
    /// PE file replaced in memory (probably hollowed).
    pub replaced: u32,
    /// PE header modified but not replaced.
    pub hdr_modified: u32,
    /// The file backing a module could not be read.
    pub unreachable_file: u32,
    /// Modifications in the code.
    pub patched: u32,
    pub iat_hooked: u32,
    /// All implants: shellcodes and PEs.
    pub implanted: u32,
    /// Manually loaded PEs.
    pub implanted_pe: u32,
    pub implanted_shc: u32,
    /// Other indicators.
    pub other: u32,
    /// Modules that had to be skipped, e.g. managed code.
    pub skipped: u32,
    /// Elements that could not be scanned, or [`ERROR_SCAN_FAILURE`].
    pub errors: u32,
}

impl From<RawReport> for Report {
    fn from(raw: RawReport) -> Self {
        Self {
            pid: raw.pid,
            is_managed: raw.is_managed != 0,
            is_64bit: raw.is_64bit != 0,
            is_reflection: raw.is_reflection != 0,
            scanned: raw.scanned,
            suspicious: raw.suspicious,
            replaced: raw.replaced,
            hdr_modified: raw.hdr_mod,
            unreachable_file: raw.unreachable_file,
            patched: raw.patched,
            iat_hooked: raw.iat_hooked,
            implanted: raw.implanted,
            implanted_pe: raw.implanted_pe,
            implanted_shc: raw.implanted_shc,
            other: raw.other,
            skipped: raw.skipped,
            errors: raw.errors,
        }
    }
}

/// How much of the process a report covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanStatus {
    /// Nothing was scanned; every counter is meaningless.
    NotPerformed,
    /// Some elements could not be scanned.
    Partial { errors: u32 },
    Complete,
}

/// Outcome codes of the engine (`t_pesieve_res`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Error,
    /// Only help was displayed.
    Info,
    NotDetected,
    Detected,
}

impl Verdict {
    pub fn code(self) -> i32 {
        match self {
            Self::Error => -1,
            Self::Info => 0,
            Self::NotDetected => 1,
            Self::Detected => 2,
        }
    }
}

impl Report {
    pub fn status(&self) -> ScanStatus {
        match self.errors {
            ERROR_SCAN_FAILURE => ScanStatus::NotPerformed,
            0 => ScanStatus::Complete,
            errors => ScanStatus::Partial { errors },
        }
    }

    pub fn is_performed(&self) -> bool {
        self.status() != ScanStatus::NotPerformed
    }

    /// Turns a report of a scan that never ran into an error.
    pub fn into_performed(self) -> Result<Self, Error> {
        if self.is_performed() {
            Ok(self)
        } else {
            Err(Error::ScanNotPerformed { pid: self.pid })
        }
    }

    pub fn verdict(&self) -> Verdict {
        if !self.is_performed() {
            Verdict::Error
        } else if self.suspicious > 0 {
            Verdict::Detected
        } else {
            Verdict::NotDetected
        }
    }
}
