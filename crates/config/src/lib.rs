#![forbid(unsafe_code)]

mod detail;
mod error;
mod modes;
mod scan_params;

pub use detail::{DetailParams, ReportKind};
pub use error::Error;
pub use modes::{
    DataScanMode, DotnetPolicy, DumpMode, IatScanMode, ImprecMode, JsonLevel, OutputFilter,
};
pub use scan_params::ScanParams;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable naming the directory that holds the engine DLL.
pub const ENGINE_DIR_ENV: &str = "PESIEVE_DIR";

/// Where to find the scanning engine.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct EngineConfig {
    /// Directory holding `pe-sieve32.dll`/`pe-sieve64.dll`. `None` means
    /// `PESIEVE_DIR`, then the current working directory.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Config {
    pub engine: EngineConfig,
    pub scan: ScanParams,
    pub detail: DetailParams,
}

impl Config {
    /// Built-in defaults, without looking at files or the environment.
    pub fn new() -> Self {
        Self::default()
    }

    /// Defaults overridden by the environment.
    pub fn from_env() -> Result<Self, Error> {
        Ok(Self::figment().merge(Self::env()).extract()?)
    }

    /// Defaults, then the TOML file at `path`, then the environment.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, Error> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(Error::InvalidPath(path.to_owned()));
        }
        Ok(Self::figment()
            .merge(Toml::file(path))
            .merge(Self::env())
            .extract()?)
    }

    pub fn to_toml(&self) -> Result<String, Error> {
        Ok(toml_edit::ser::to_string_pretty(self)?)
    }

    fn figment() -> Figment {
        Figment::from(Serialized::defaults(Self::default()))
    }

    fn env() -> Env {
        Env::raw()
            .only(&[ENGINE_DIR_ENV])
            .map(|_| "engine.dir".into())
    }
}
