//! Numeric encoding of the closed enumerations.
//!
//! The codes below are the engine's compiled enum values. Each mapping is
//! written out twice (to and from the wire) by the same macro invocation, so a
//! variant added to the `config` crate fails to compile here until it gets a
//! code.

use crate::error::ConfigurationError;
use config::{
    DataScanMode, DotnetPolicy, DumpMode, IatScanMode, ImprecMode, JsonLevel, OutputFilter,
    ReportKind,
};

pub trait WireEnum: Copy + Sized + 'static {
    /// Engine field carrying the value.
    const FIELD: &'static str;

    /// Every variant, ordered by code.
    const VARIANTS: &'static [Self];

    fn to_wire(self) -> u32;

    fn from_wire(code: u32) -> Result<Self, ConfigurationError>;
}

macro_rules! wire_enum {
    ($ty:ident, $field:literal, { $($variant:ident = $code:literal),+ $(,)? }) => {
        impl WireEnum for $ty {
            const FIELD: &'static str = $field;

            const VARIANTS: &'static [Self] = &[$($ty::$variant),+];

            fn to_wire(self) -> u32 {
                match self {
                    $($ty::$variant => $code,)+
                }
            }

            fn from_wire(code: u32) -> Result<Self, ConfigurationError> {
                match code {
                    $($code => Ok($ty::$variant),)+
                    _ => Err(ConfigurationError::EnumOutOfRange {
                        field: Self::FIELD,
                        code,
                    }),
                }
            }
        }
    };
}

wire_enum!(DotnetPolicy, "dotnet_policy", {
    None = 0,
    SkipMapping = 1,
    SkipShellcode = 2,
    SkipHooks = 3,
    SkipAll = 4,
});

wire_enum!(ImprecMode, "imprec_mode", {
    None = 0,
    Auto = 1,
    Unerase = 2,
    Rebuild0 = 3,
    Rebuild1 = 4,
    Rebuild2 = 5,
});

wire_enum!(OutputFilter, "out_filter", {
    Full = 0,
    NoDumps = 1,
    NoDir = 2,
});

wire_enum!(DumpMode, "dump_mode", {
    Auto = 0,
    Virtual = 1,
    Unmap = 2,
    Realign = 3,
});

wire_enum!(IatScanMode, "iat", {
    None = 0,
    CleanSysFiltered = 1,
    AllSysFiltered = 2,
    Unfiltered = 3,
});

wire_enum!(DataScanMode, "data", {
    NoScan = 0,
    ScanDotnet = 1,
    ScanNoDep = 2,
    ScanAlways = 3,
    ScanInaccessible = 4,
    ScanInaccessibleOnly = 5,
});

wire_enum!(JsonLevel, "json_lvl", {
    Basic = 0,
    Details = 1,
    Details2 = 2,
});

wire_enum!(ReportKind, "report_type", {
    None = 0,
    Scanned = 1,
    Dumped = 2,
    All = 3,
});

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    /// `*_COUNT` members of the engine enums.
    fn check_closed<E: WireEnum + PartialEq + std::fmt::Debug>(count: u32) {
        assert_eq!(E::VARIANTS.len() as u32, count, "{} variant count", E::FIELD);
        for (code, variant) in E::VARIANTS.iter().enumerate() {
            assert_eq!(variant.to_wire(), code as u32);
            assert_eq!(E::from_wire(code as u32).unwrap(), *variant);
        }
        assert!(E::from_wire(count).is_err(), "{} accepts its count", E::FIELD);
    }

    #[test]
    fn codes_match_engine_headers() {
        check_closed::<DotnetPolicy>(5);
        check_closed::<ImprecMode>(6);
        check_closed::<OutputFilter>(3);
        check_closed::<DumpMode>(4);
        check_closed::<IatScanMode>(4);
        check_closed::<DataScanMode>(6);
        check_closed::<JsonLevel>(3);
        check_closed::<ReportKind>(4);
    }

    #[test]
    fn defaults_encode_as_zero() {
        assert_eq!(DotnetPolicy::default().to_wire(), 0);
        assert_eq!(ImprecMode::default().to_wire(), 0);
        assert_eq!(OutputFilter::default().to_wire(), 0);
        assert_eq!(DumpMode::default().to_wire(), 0);
        assert_eq!(IatScanMode::default().to_wire(), 0);
        assert_eq!(DataScanMode::default().to_wire(), 0);
        assert_eq!(JsonLevel::default().to_wire(), 0);
    }

    proptest! {
        #[test]
        fn out_of_range_codes_are_rejected(code in 6u32..) {
            let rejected = matches!(
                DataScanMode::from_wire(code),
                Err(ConfigurationError::EnumOutOfRange { field: "data", code: c }) if c == code
            );
            prop_assert!(rejected);
            prop_assert!(ImprecMode::from_wire(code).is_err());
            prop_assert!(DotnetPolicy::from_wire(code).is_err());
            prop_assert!(JsonLevel::from_wire(code).is_err());
        }
    }
}
