use std::path::PathBuf;

/// A scan configuration the engine would misread. Raised before anything is
/// marshaled.
#[derive(Debug, thiserror::Error)]
pub enum ConfigurationError {
    #[error("output directory is {len} bytes long, the engine accepts at most {max}")]
    OutputDirTooLong { len: usize, max: usize },

    #[error("output directory is not valid UTF-8: {0:?}")]
    NonUtf8Path(PathBuf),

    #[error("{field} contains a NUL byte")]
    InteriorNul { field: &'static str },

    #[error("module name {0:?} contains the list separator")]
    SeparatorInModuleName(String),

    #[error("ignored module list contains an empty name")]
    EmptyModuleName,

    #[error("ignored module list is too long: {0} bytes")]
    ModulesTooLong(usize),

    #[error("{code} is not a valid {field} code")]
    EnumOutOfRange { field: &'static str, code: u32 },
}

/// Represents all possible errors that can occur in this crate.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The host pointer width has no matching engine build.
    #[error("no engine build for {bits}-bit hosts")]
    UnsupportedWordSize { bits: u32 },

    #[error("failed to resolve the working directory: {0}")]
    WorkingDir(#[source] std::io::Error),

    /// The engine DLL could not be loaded (missing, wrong architecture, ...).
    #[error("failed to load engine from {path:?}: {source}")]
    LibraryLoad {
        path: PathBuf,
        #[source]
        source: libloading::Error,
    },

    #[error("engine does not export {symbol}: {source}")]
    MissingEntryPoint {
        symbol: &'static str,
        #[source]
        source: libloading::Error,
    },

    /// The call itself failed. No report from this call can be trusted.
    #[error("{entry_point} failed: {reason}")]
    Invocation {
        entry_point: &'static str,
        reason: String,
    },

    /// The engine handed back something other than the report it was given.
    #[error("engine returned {returned:#x} instead of the report at {expected:#x}")]
    IdentityMismatch { expected: usize, returned: usize },

    #[error("invalid scan configuration: {0}")]
    Configuration(#[from] ConfigurationError),

    /// The engine ran but reported that no scan took place.
    #[error("no scan was performed on process {pid}")]
    ScanNotPerformed { pid: u32 },
}

impl Error {
    /// Whether the engine never got bound.
    pub fn is_binding(&self) -> bool {
        matches!(
            self,
            Self::UnsupportedWordSize { .. }
                | Self::WorkingDir(_)
                | Self::LibraryLoad { .. }
                | Self::MissingEntryPoint { .. }
        )
    }
}
