#![forbid(unsafe_code)]

//! Closed sets of engine behaviours.
//!
//! The variant order mirrors the engine headers. The numeric encoding itself is
//! owned by the `engine` crate, which maps every variant explicitly.

use serde::{Deserialize, Serialize};

/// Policy for scanning managed (.NET) processes.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum DotnetPolicy {
    /// Treat managed processes the same as native ones.
    #[default]
    None,
    /// Skip mapping mismatch in .NET modules.
    SkipMapping,
    /// Skip shellcode in all modules of the managed process.
    SkipShellcode,
    /// Skip hooked modules in the managed process.
    SkipHooks,
    /// Skip all of the above.
    SkipAll,
}

/// Import table recovery mode used when dumping.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum ImprecMode {
    #[default]
    None,
    /// Let the engine pick the most suitable mode.
    Auto,
    /// Recover erased parts of a damaged import table.
    Unerase,
    /// Rebuild from found IATs, terminated blocks only.
    Rebuild0,
    /// Rebuild from terminated blocks or blocks with more than one thunk.
    Rebuild1,
    /// Rebuild from every found block.
    Rebuild2,
}

/// How much output material the engine writes to disk.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum OutputFilter {
    /// Dump everything.
    #[default]
    Full,
    /// Save the report, but don't dump modified PEs.
    NoDumps,
    /// Don't write any files.
    NoDir,
}

/// Format of dumped PE implants.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum DumpMode {
    #[default]
    Auto,
    /// As it is in memory.
    Virtual,
    /// Converted to raw using the raw section headers.
    Unmap,
    /// Converted to raw by realigning raw headers to the virtual ones.
    Realign,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum IatScanMode {
    #[default]
    None,
    /// Filter hooks that lead to unpatched system modules.
    CleanSysFiltered,
    /// Filter hooks that lead to any system module.
    AllSysFiltered,
    Unfiltered,
}

/// Whether non-executable pages get scanned.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum DataScanMode {
    #[default]
    NoScan,
    ScanDotnet,
    ScanNoDep,
    ScanAlways,
    /// Also inaccessible pages, when running on a reflection.
    ScanInaccessible,
    ScanInaccessibleOnly,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum JsonLevel {
    #[default]
    Basic,
    /// Basic list of patches.
    Details,
    /// Extended list of patches.
    Details2,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize)]
    struct Probe {
        dotnet: DotnetPolicy,
        data: DataScanMode,
        json: JsonLevel,
    }

    #[test]
    fn defaults_are_first_variants() {
        assert_eq!(DotnetPolicy::default(), DotnetPolicy::None);
        assert_eq!(ImprecMode::default(), ImprecMode::None);
        assert_eq!(OutputFilter::default(), OutputFilter::Full);
        assert_eq!(DumpMode::default(), DumpMode::Auto);
        assert_eq!(IatScanMode::default(), IatScanMode::None);
        assert_eq!(DataScanMode::default(), DataScanMode::NoScan);
        assert_eq!(JsonLevel::default(), JsonLevel::Basic);
    }

    #[test]
    fn names_are_snake_case() {
        let probe: Probe = toml_edit::de::from_str(
            r#"
            dotnet = "skip_shellcode"
            data = "scan_inaccessible_only"
            json = "details2"
            "#,
        )
        .unwrap();
        assert_eq!(probe.dotnet, DotnetPolicy::SkipShellcode);
        assert_eq!(probe.data, DataScanMode::ScanInaccessibleOnly);
        assert_eq!(probe.json, JsonLevel::Details2);
    }

    #[test]
    fn unknown_names_are_rejected() {
        let res: Result<Probe, _> = toml_edit::de::from_str(
            r#"
            dotnet = "skip_everything"
            data = "no_scan"
            json = "basic"
            "#,
        );
        assert!(res.is_err());
    }
}
