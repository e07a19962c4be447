#![forbid(unsafe_code)]

use crate::modes::{
    DataScanMode, DotnetPolicy, DumpMode, IatScanMode, ImprecMode, JsonLevel, OutputFilter,
};
use serde::{Deserialize, Serialize};
use serde_with::{StringWithSeparator, formats::SemicolonSeparator, serde_as};
use std::path::PathBuf;

/// One scan request.
///
/// Built per request and left untouched while a call is in flight. Field
/// order follows the engine's parameter record.
#[serde_as]
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ScanParams {
    /// PID of the process to scan. Liveness is checked by the engine.
    pub pid: u32,

    pub dotnet_policy: DotnetPolicy,

    pub imprec_mode: ImprecMode,

    /// Do not log on stdout during the scan.
    pub quiet: bool,

    pub out_filter: OutputFilter,

    /// Don't scan for hooks.
    pub no_hooks: bool,

    /// Detect shellcode implants.
    pub shellcode: bool,

    pub threads: bool,

    pub iat: IatScanMode,

    pub data: DataScanMode,

    /// Minidump the whole process when something is detected.
    pub minidump: bool,

    pub dump_mode: DumpMode,

    /// Print the final summary as JSON.
    pub json_output: bool,

    /// Scan a frozen reflection of the process instead of the live one.
    pub make_reflection: bool,

    pub use_cache: bool,

    pub json_lvl: JsonLevel,

    /// Root directory of the output. `None` means the current directory.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_dir: Option<PathBuf>,

    /// Module names that will not be scanned.
    #[serde_as(as = "StringWithSeparator::<SemicolonSeparator, String>")]
    pub modules_ignored: Vec<String>,
}

impl ScanParams {
    pub fn new(pid: u32) -> Self {
        Self {
            pid,
            ..Default::default()
        }
    }

    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = Some(dir.into());
        self
    }

    pub fn with_ignored_module(mut self, name: impl Into<String>) -> Self {
        self.modules_ignored.push(name.into());
        self
    }
}
