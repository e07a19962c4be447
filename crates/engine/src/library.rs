//! Process-wide binding to the engine DLL.

use crate::abi::{RawParams, RawReport};
use crate::error::Error;
use crate::protocol::Engine;
use config::{ENGINE_DIR_ENV, EngineConfig};
use libloading::Library;
use parking_lot::Mutex;
use std::{
    any::Any,
    env,
    ffi::OsString,
    fmt,
    panic::{self, AssertUnwindSafe},
    path::{Path, PathBuf},
    ptr,
    sync::OnceLock,
};
use tracing::{info, warn};

pub const HELP_SYMBOL: &str = "PESieve_help";
pub const SCAN_SYMBOL: &str = "PESieve_scan";
pub const SCAN_EX_SYMBOL: &str = "PESieve_scan_ex";
pub const VERSION_SYMBOL: &str = "PESieve_version";

/// Engine build the records in [`crate::abi`] are laid out for.
pub const PINNED_VERSION: EngineVersion = EngineVersion(0x0002_0805);

// The engine returns `t_report` by value and takes `t_params` by value. With
// the Windows x64 convention both travel as pointers: the hidden return slot
// first, then the argument. The returned pointer is the return slot. 32-bit
// stdcall copies `t_params` onto the stack instead, so only 64-bit hosts bind.
type HelpFn = unsafe extern "system-unwind" fn();
type ScanFn = unsafe extern "system-unwind" fn(*mut RawReport, *const RawParams) -> *mut RawReport;
type ScanExFn = unsafe extern "system-unwind" fn(
    *mut RawReport,
    *const RawParams,
    u32,
    *mut u8,
    u32,
    *mut u32,
) -> *mut RawReport;

static ENGINE: OnceLock<NativeEngine> = OnceLock::new();
static BIND_LOCK: Mutex<()> = Mutex::new(());

/// File name of the engine build matching the host pointer width.
pub fn component_file_name() -> Result<&'static str, Error> {
    match usize::BITS {
        64 => Ok("pe-sieve64.dll"),
        32 => Ok("pe-sieve32.dll"),
        bits => Err(Error::UnsupportedWordSize { bits }),
    }
}

/// `{engine.dir | $PESIEVE_DIR | cwd}/{component_file_name}`.
pub fn component_path(config: &EngineConfig) -> Result<PathBuf, Error> {
    let dir = resolve_dir(config, env::var_os(ENGINE_DIR_ENV))?;
    Ok(dir.join(component_file_name()?))
}

fn resolve_dir(config: &EngineConfig, env_dir: Option<OsString>) -> Result<PathBuf, Error> {
    match (&config.dir, env_dir) {
        (Some(dir), _) => Ok(dir.clone()),
        (None, Some(dir)) if !dir.is_empty() => Ok(PathBuf::from(dir)),
        _ => env::current_dir().map_err(Error::WorkingDir),
    }
}

/// The entry point signatures above only hold for the x64 convention.
fn check_word_size(bits: u32) -> Result<(), Error> {
    match bits {
        64 => Ok(()),
        bits => Err(Error::UnsupportedWordSize { bits }),
    }
}

/// Logs the bound engine version. Returns whether it is the pinned one.
fn check_version(version: Option<EngineVersion>) -> bool {
    match version {
        Some(version) if version == PINNED_VERSION => {
            info!(%version, "engine bound");
            true
        }
        Some(version) => {
            warn!(%version, pinned = %PINNED_VERSION, "engine version differs from the pinned one");
            false
        }
        None => {
            warn!(pinned = %PINNED_VERSION, "engine bound, but it does not export {VERSION_SYMBOL}");
            false
        }
    }
}

/// Engine build identifier, one version component per byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineVersion(pub u32);

impl fmt::Display for EngineVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c, d] = self.0.to_be_bytes();
        write!(f, "{a}.{b}.{c}.{d}")
    }
}

/// The loaded engine and its resolved entry points.
#[derive(Debug)]
pub struct NativeEngine {
    path: PathBuf,
    version: Option<EngineVersion>,
    help: HelpFn,
    scan: ScanFn,
    scan_ex: ScanExFn,
    // keeps the entry points above mapped
    _library: Library,
}

impl NativeEngine {
    /// Returns the process-wide engine, binding it on first use.
    ///
    /// A failed bind is not remembered; the next call tries again. Once bound,
    /// `config` is ignored.
    pub fn global(config: &EngineConfig) -> Result<&'static Self, Error> {
        if let Some(engine) = ENGINE.get() {
            return Ok(engine);
        }

        let _guard = BIND_LOCK.lock();
        if let Some(engine) = ENGINE.get() {
            return Ok(engine);
        }
        let engine = Self::bind(component_path(config)?)?;
        Ok(ENGINE.get_or_init(|| engine))
    }

    /// The engine, if some earlier call bound it.
    pub fn bound() -> Option<&'static Self> {
        ENGINE.get()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn version(&self) -> Option<EngineVersion> {
        self.version
    }

    fn bind(path: PathBuf) -> Result<Self, Error> {
        let span = tracing::debug_span!("engine_bind", ?path);
        let _enter = span.enter();

        check_word_size(usize::BITS)?;

        // SAFETY: the engine's DllMain does nothing but return TRUE.
        let library = unsafe { Library::new(&path) }.map_err(|source| Error::LibraryLoad {
            path: path.clone(),
            source,
        })?;

        // SAFETY: the signatures match the exports declared in pe_sieve_api.h.
        let (help, scan, scan_ex) = unsafe {
            (
                entry_point::<HelpFn>(&library, HELP_SYMBOL)?,
                entry_point::<ScanFn>(&library, SCAN_SYMBOL)?,
                entry_point::<ScanExFn>(&library, SCAN_EX_SYMBOL)?,
            )
        };

        // SAFETY: `PESieve_version` is an exported `const DWORD`.
        let version = unsafe {
            library
                .get::<*const u32>(VERSION_SYMBOL.as_bytes())
                .ok()
                .map(|symbol| EngineVersion(ptr::read(*symbol)))
        };
        check_version(version);

        Ok(Self {
            path,
            version,
            help,
            scan,
            scan_ex,
            _library: library,
        })
    }
}

/// # Safety
///
/// `T` must be the exact type of the exported symbol.
unsafe fn entry_point<T: Copy>(library: &Library, symbol: &'static str) -> Result<T, Error> {
    // SAFETY: forwarded to the caller.
    unsafe { library.get::<T>(symbol.as_bytes()) }
        .map(|symbol| *symbol)
        .map_err(|source| Error::MissingEntryPoint { symbol, source })
}

/// Runs `call`, turning an unwind out of the engine into an error.
///
/// Only unwinding exceptions are mapped. Structured exceptions such as access
/// violations are not caught here, and a foreign C++ exception may still
/// abort the process.
fn invoke<T>(entry_point: &'static str, call: impl FnOnce() -> T) -> Result<T, Error> {
    panic::catch_unwind(AssertUnwindSafe(call)).map_err(|payload| Error::Invocation {
        entry_point,
        reason: describe_unwind(payload.as_ref()),
    })
}

fn describe_unwind(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_owned()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "the engine raised an exception".to_owned()
    }
}

impl Engine for NativeEngine {
    fn help(&self) {
        let help = self.help;
        // SAFETY: takes no arguments and only writes to stdout.
        if let Err(err) = invoke(HELP_SYMBOL, || unsafe { help() }) {
            warn!(error = %err, "engine help failed");
        }
    }

    fn scan(&self, report: &mut RawReport, params: &RawParams) -> Result<(), Error> {
        let scan = self.scan;
        let out: *mut RawReport = report;
        let args: *const RawParams = params;
        // SAFETY: both records are valid, correctly laid out and outlive the
        // call; the engine keeps no reference to them afterwards.
        let returned = invoke(SCAN_SYMBOL, || unsafe { scan(out, args) })?;
        if returned.is_null() {
            return Err(Error::Invocation {
                entry_point: SCAN_SYMBOL,
                reason: "returned no report".to_owned(),
            });
        }
        Ok(())
    }

    fn scan_ex(
        &self,
        report: &mut RawReport,
        params: &RawParams,
        report_kind: u32,
        detail: &mut [u8],
        needed: &mut u32,
    ) -> Result<usize, Error> {
        let scan_ex = self.scan_ex;
        let out: *mut RawReport = report;
        let args: *const RawParams = params;
        let (buffer, capacity) = if detail.is_empty() {
            (ptr::null_mut(), 0)
        } else {
            // understating the capacity is always safe
            (
                detail.as_mut_ptr(),
                u32::try_from(detail.len()).unwrap_or(u32::MAX),
            )
        };
        let needed: *mut u32 = needed;
        // SAFETY: as for `scan`; `buffer` is valid for `capacity` bytes and
        // exclusively borrowed until the call returns.
        let returned = invoke(SCAN_EX_SYMBOL, || unsafe {
            scan_ex(out, args, report_kind, buffer, capacity, needed)
        })?;
        Ok(returned as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_name_follows_pointer_width() {
        let name = component_file_name().unwrap();
        if cfg!(target_pointer_width = "64") {
            assert_eq!(name, "pe-sieve64.dll");
        } else {
            assert_eq!(name, "pe-sieve32.dll");
        }
    }

    #[test]
    fn configured_dir_wins_over_env_and_cwd() {
        let config = EngineConfig {
            dir: Some(PathBuf::from("/opt/pe-sieve")),
        };
        let dir = resolve_dir(&config, Some("/srv/other".into())).unwrap();
        assert_eq!(dir, Path::new("/opt/pe-sieve"));

        let path = component_path(&config).unwrap();
        assert_eq!(path.parent(), Some(Path::new("/opt/pe-sieve")));
    }

    #[test]
    fn env_dir_wins_over_cwd() {
        let default = EngineConfig::default();
        let dir = resolve_dir(&default, Some("/opt/pesieve-env".into())).unwrap();
        assert_eq!(dir, Path::new("/opt/pesieve-env"));

        let cwd = env::current_dir().unwrap();
        assert_eq!(resolve_dir(&default, None).unwrap(), cwd);
        assert_eq!(resolve_dir(&default, Some(OsString::new())).unwrap(), cwd);
    }

    #[test]
    fn only_64bit_hosts_bind() {
        assert!(check_word_size(64).is_ok());
        assert!(matches!(
            check_word_size(32),
            Err(Error::UnsupportedWordSize { bits: 32 })
        ));
    }

    #[test]
    fn version_is_checked_against_pinned() {
        assert_eq!(PINNED_VERSION.to_string(), "0.2.8.5");
        assert!(check_version(Some(EngineVersion(0x0002_0805))));
        assert!(!check_version(Some(EngineVersion(0x0003_0900))));
        assert!(!check_version(None));
    }

    #[test]
    fn missing_engine_is_a_binding_error() {
        let config = EngineConfig {
            dir: Some(PathBuf::from("/nonexistent/pe-sieve")),
        };
        let err = NativeEngine::global(&config).unwrap_err();
        assert!(err.is_binding(), "{err}");
        assert!(matches!(err, Error::LibraryLoad { .. }));
        // not cached
        assert!(NativeEngine::bound().is_none());
        assert!(NativeEngine::global(&config).unwrap_err().is_binding());
    }

    #[test]
    fn version_prints_one_component_per_byte() {
        assert_eq!(EngineVersion(0x0002_0805).to_string(), "0.2.8.5");
        assert_eq!(EngineVersion(0x0003_0900).to_string(), "0.3.9.0");
    }

    #[test]
    fn unwinding_calls_become_invocation_errors() {
        let err = invoke(SCAN_SYMBOL, || -> u32 { panic!("engine unwound") }).unwrap_err();
        assert!(matches!(
            err,
            Error::Invocation { entry_point: SCAN_SYMBOL, ref reason } if reason == "engine unwound"
        ));
    }
}
