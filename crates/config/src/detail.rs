#![forbid(unsafe_code)]

use crate::Error;
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

/// Which textual report an extended scan should hand back.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum ReportKind {
    #[default]
    None,
    Scanned,
    Dumped,
    All,
}

impl ReportKind {
    fn as_str(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Scanned => "scanned",
            Self::Dumped => "dumped",
            Self::All => "all",
        }
    }
}

impl fmt::Display for ReportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReportKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "none" => Ok(Self::None),
            "scanned" => Ok(Self::Scanned),
            "dumped" => Ok(Self::Dumped),
            "all" => Ok(Self::All),
            _ => Err(Error::UnknownReportKind(s.to_owned())),
        }
    }
}

/// Settings for retrieving the detailed report of an extended scan.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct DetailParams {
    pub report: ReportKind,

    /// Capacity of the caller-owned detail buffer, in bytes.
    pub max_size: u32,

    /// Fetch once more with a buffer of the reported size when truncated.
    pub refetch: bool,
}

impl Default for DetailParams {
    fn default() -> Self {
        Self {
            report: ReportKind::All,
            max_size: 0x1000,
            refetch: false,
        }
    }
}
