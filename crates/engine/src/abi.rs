//! Records exchanged with the engine.
//!
//! Both records are declared by the engine inside `pshpack4.h`, i.e. packed to
//! 4 bytes. Every padding byte the C compiler would insert is spelled out here
//! so the Rust layout has no implicit holes. Do not reorder or resize fields
//! without moving to a new engine build and updating the layout tests.

use crate::error::ConfigurationError;
use crate::wire::WireEnum;
use config::{
    DataScanMode, DotnetPolicy, DumpMode, IatScanMode, ImprecMode, JsonLevel, OutputFilter,
};
use std::{ffi::c_char, mem::size_of, ptr};

/// `MAX_PATH` as used by the engine for `output_dir`, excluding the NUL.
pub const MAX_PATH: usize = 260;

/// `errors` value meaning no scan was performed at all: `(DWORD)-1`.
pub const ERROR_SCAN_FAILURE: u32 = u32::MAX;

/// Separator between module names in `modules_ignored`.
pub const PARAM_LIST_SEPARATOR: char = ';';

pub const PARAMS_SIZE: usize = 316 + size_of::<*const c_char>();

pub const REPORT_SIZE: usize = 60;

const _: () = assert!(size_of::<RawParams>() == PARAMS_SIZE);
const _: () = assert!(size_of::<RawReport>() == REPORT_SIZE);

/// `PARAM_STRING`: a length-prefixed, NUL-terminated byte string.
#[repr(C, packed(4))]
#[derive(Debug, Clone, Copy)]
pub struct ParamString {
    /// Length in bytes, without the terminating NUL.
    pub length: u32,
    pub buffer: *const c_char,
}

impl ParamString {
    pub const EMPTY: Self = Self {
        length: 0,
        buffer: ptr::null(),
    };
}

/// `t_params`.
#[repr(C, packed(4))]
#[derive(Debug, Clone, Copy)]
pub struct RawParams {
    pub pid: u32,
    pub dotnet_policy: u32,
    pub imprec_mode: u32,
    pub quiet: u8,
    _pad0: [u8; 3],
    pub out_filter: u32,
    pub no_hooks: u8,
    pub shellcode: u8,
    pub threads: u8,
    _pad1: u8,
    pub iat: u32,
    pub data: u32,
    pub minidump: u8,
    _pad2: [u8; 3],
    pub dump_mode: u32,
    pub json_output: u8,
    pub make_reflection: u8,
    pub use_cache: u8,
    _pad3: u8,
    pub json_lvl: u32,
    pub output_dir: [u8; MAX_PATH + 1],
    _pad4: [u8; 3],
    pub modules_ignored: ParamString,
}

impl RawParams {
    pub const fn zeroed() -> Self {
        Self {
            pid: 0,
            dotnet_policy: 0,
            imprec_mode: 0,
            quiet: 0,
            _pad0: [0; 3],
            out_filter: 0,
            no_hooks: 0,
            shellcode: 0,
            threads: 0,
            _pad1: 0,
            iat: 0,
            data: 0,
            minidump: 0,
            _pad2: [0; 3],
            dump_mode: 0,
            json_output: 0,
            make_reflection: 0,
            use_cache: 0,
            _pad3: 0,
            json_lvl: 0,
            output_dir: [0; MAX_PATH + 1],
            _pad4: [0; 3],
            modules_ignored: ParamString::EMPTY,
        }
    }

    /// Rejects any enumeration code the engine does not know.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        DotnetPolicy::from_wire(self.dotnet_policy)?;
        ImprecMode::from_wire(self.imprec_mode)?;
        OutputFilter::from_wire(self.out_filter)?;
        IatScanMode::from_wire(self.iat)?;
        DataScanMode::from_wire(self.data)?;
        DumpMode::from_wire(self.dump_mode)?;
        JsonLevel::from_wire(self.json_lvl)?;
        Ok(())
    }
}

impl Default for RawParams {
    fn default() -> Self {
        Self::zeroed()
    }
}

/// `t_report`.
#[repr(C, packed(4))]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RawReport {
    pub pid: u32,
    pub is_managed: u8,
    pub is_64bit: u8,
    pub is_reflection: u8,
    _pad0: u8,
    pub scanned: u32,
    pub suspicious: u32,
    pub replaced: u32,
    pub hdr_mod: u32,
    pub unreachable_file: u32,
    pub patched: u32,
    pub iat_hooked: u32,
    pub implanted: u32,
    pub implanted_pe: u32,
    pub implanted_shc: u32,
    pub other: u32,
    pub skipped: u32,
    pub errors: u32,
}

impl RawReport {
    pub fn zeroed() -> Self {
        Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zeroed_params_are_valid_defaults() {
        let raw = RawParams::zeroed();
        assert!(raw.validate().is_ok());
        assert!(raw.output_dir.iter().all(|&b| b == 0));
        let modules = raw.modules_ignored;
        assert_eq!({ modules.length }, 0);
        assert!({ modules.buffer }.is_null());
    }

    #[test]
    fn validate_names_the_bad_field() {
        let mut raw = RawParams::zeroed();
        raw.data = 6;
        assert!(matches!(
            raw.validate(),
            Err(ConfigurationError::EnumOutOfRange { field: "data", code: 6 })
        ));

        let mut raw = RawParams::zeroed();
        raw.json_lvl = u32::MAX;
        assert!(matches!(
            raw.validate(),
            Err(ConfigurationError::EnumOutOfRange { field: "json_lvl", .. })
        ));
    }
}
