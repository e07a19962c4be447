use crate::abi::{MAX_PATH, PARAM_LIST_SEPARATOR, ParamString, RawParams};
use crate::error::ConfigurationError;
use crate::wire::WireEnum;
use config::ScanParams;
use std::{ffi::CString, path::Path};

/// A `RawParams` together with the storage its pointers refer to.
///
/// `modules_ignored.buffer` points into `_modules`, which lives on the heap, so
/// the value may be moved freely while the pointer stays valid.
#[derive(Debug)]
pub(crate) struct Marshaled {
    raw: RawParams,
    _modules: Option<CString>,
}

impl Marshaled {
    pub(crate) fn new(params: &ScanParams) -> Result<Self, ConfigurationError> {
        let modules = encode_modules(&params.modules_ignored)?;

        let mut raw = RawParams::zeroed();
        raw.pid = params.pid;
        raw.dotnet_policy = params.dotnet_policy.to_wire();
        raw.imprec_mode = params.imprec_mode.to_wire();
        raw.quiet = params.quiet.into();
        raw.out_filter = params.out_filter.to_wire();
        raw.no_hooks = params.no_hooks.into();
        raw.shellcode = params.shellcode.into();
        raw.threads = params.threads.into();
        raw.iat = params.iat.to_wire();
        raw.data = params.data.to_wire();
        raw.minidump = params.minidump.into();
        raw.dump_mode = params.dump_mode.to_wire();
        raw.json_output = params.json_output.into();
        raw.make_reflection = params.make_reflection.into();
        raw.use_cache = params.use_cache.into();
        raw.json_lvl = params.json_lvl.to_wire();
        raw.output_dir = encode_output_dir(params.output_dir.as_deref())?;
        if let Some(modules) = &modules {
            raw.modules_ignored = ParamString {
                length: modules.as_bytes().len() as u32,
                buffer: modules.as_ptr(),
            };
        }
        raw.validate()?;

        Ok(Self {
            raw,
            _modules: modules,
        })
    }

    pub(crate) fn raw(&self) -> &RawParams {
        &self.raw
    }
}

fn encode_output_dir(dir: Option<&Path>) -> Result<[u8; MAX_PATH + 1], ConfigurationError> {
    let mut out = [0u8; MAX_PATH + 1];
    let Some(dir) = dir else {
        return Ok(out);
    };

    let dir = dir
        .to_str()
        .ok_or_else(|| ConfigurationError::NonUtf8Path(dir.to_owned()))?
        .as_bytes();
    if dir.contains(&0) {
        return Err(ConfigurationError::InteriorNul { field: "output_dir" });
    }
    if dir.len() > MAX_PATH {
        return Err(ConfigurationError::OutputDirTooLong {
            len: dir.len(),
            max: MAX_PATH,
        });
    }
    // the last byte always stays NUL
    out[..dir.len()].copy_from_slice(dir);
    Ok(out)
}

fn encode_modules(names: &[String]) -> Result<Option<CString>, ConfigurationError> {
    if names.is_empty() {
        return Ok(None);
    }
    for name in names {
        if name.is_empty() {
            return Err(ConfigurationError::EmptyModuleName);
        }
        if name.contains(PARAM_LIST_SEPARATOR) {
            return Err(ConfigurationError::SeparatorInModuleName(name.clone()));
        }
    }

    let mut separator = [0; 4];
    let separator: &str = PARAM_LIST_SEPARATOR.encode_utf8(&mut separator);
    let joined = names.join(separator);
    if u32::try_from(joined.len()).is_err() {
        return Err(ConfigurationError::ModulesTooLong(joined.len()));
    }
    CString::new(joined)
        .map(Some)
        .map_err(|_| ConfigurationError::InteriorNul {
            field: "modules_ignored",
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use config::{DataScanMode, DumpMode, ImprecMode, JsonLevel};
    use pretty_assertions::assert_eq;

    #[test]
    fn fields_land_in_their_slots() {
        let mut params = ScanParams::new(0x1234);
        params.imprec_mode = ImprecMode::Rebuild1;
        params.quiet = true;
        params.threads = true;
        params.data = DataScanMode::ScanInaccessible;
        params.dump_mode = DumpMode::Realign;
        params.make_reflection = true;
        params.json_lvl = JsonLevel::Details2;

        let marshaled = Marshaled::new(&params).unwrap();
        let raw = marshaled.raw();
        assert_eq!({ raw.pid }, 0x1234);
        assert_eq!({ raw.dotnet_policy }, 0);
        assert_eq!({ raw.imprec_mode }, 4);
        assert_eq!(raw.quiet, 1);
        assert_eq!(raw.no_hooks, 0);
        assert_eq!(raw.threads, 1);
        assert_eq!({ raw.data }, 4);
        assert_eq!({ raw.dump_mode }, 3);
        assert_eq!(raw.make_reflection, 1);
        assert_eq!(raw.use_cache, 0);
        assert_eq!({ raw.json_lvl }, 2);
        assert!(raw.output_dir.iter().all(|&b| b == 0));
        assert!({ raw.modules_ignored.buffer }.is_null());
    }

    #[test]
    fn output_dir_is_nul_terminated() {
        let params = ScanParams::new(1).with_output_dir("C:\\dumps");
        let marshaled = Marshaled::new(&params).unwrap();
        let dir = marshaled.raw().output_dir;
        assert_eq!(&dir[..9], b"C:\\dumps\0");
    }

    #[test]
    fn output_dir_fills_max_path() {
        let longest = "d".repeat(MAX_PATH);
        let marshaled = Marshaled::new(&ScanParams::new(1).with_output_dir(&longest)).unwrap();
        let dir = marshaled.raw().output_dir;
        assert_eq!(&dir[..MAX_PATH], longest.as_bytes());
        assert_eq!(dir[MAX_PATH], 0);

        let too_long = "d".repeat(MAX_PATH + 1);
        assert!(matches!(
            Marshaled::new(&ScanParams::new(1).with_output_dir(too_long)),
            Err(ConfigurationError::OutputDirTooLong { len: 261, max: MAX_PATH })
        ));
    }

    #[test]
    fn modules_are_joined_with_separator() {
        let params = ScanParams::new(1)
            .with_ignored_module("kernel32.dll")
            .with_ignored_module("user32.dll");
        let marshaled = Marshaled::new(&params).unwrap();

        let modules = marshaled._modules.as_ref().unwrap();
        assert_eq!(modules.to_str().unwrap(), "kernel32.dll;user32.dll");

        let encoded = marshaled.raw().modules_ignored;
        assert_eq!({ encoded.length }, 23);
        assert_eq!({ encoded.buffer }, modules.as_ptr());
    }

    #[test]
    fn module_pointer_survives_moves() {
        let params = ScanParams::new(1).with_ignored_module("a.dll");
        let marshaled = Marshaled::new(&params).unwrap();
        let before = { marshaled.raw().modules_ignored.buffer };
        let moved = Box::new(marshaled);
        assert_eq!({ moved.raw().modules_ignored.buffer }, before);
    }

    #[test]
    fn bad_module_names_are_rejected() {
        let params = ScanParams::new(1).with_ignored_module("a.dll;b.dll");
        assert!(matches!(
            Marshaled::new(&params),
            Err(ConfigurationError::SeparatorInModuleName(name)) if name == "a.dll;b.dll"
        ));

        let params = ScanParams::new(1).with_ignored_module("");
        assert!(matches!(
            Marshaled::new(&params),
            Err(ConfigurationError::EmptyModuleName)
        ));

        let params = ScanParams::new(1).with_ignored_module("a\0.dll");
        assert!(matches!(
            Marshaled::new(&params),
            Err(ConfigurationError::InteriorNul { field: "modules_ignored" })
        ));
    }
}
