//! Boundary layer around the pe-sieve scanning engine.
//!
//! A [`config::ScanParams`] is marshaled into the engine's fixed-layout
//! [`abi::RawParams`], handed to the engine through the [`Engine`] entry points
//! and the filled [`abi::RawReport`] comes back as a [`Report`]. Extended scans
//! also return the engine's detailed report text as a [`Detail`].

pub mod abi;
mod detail;
mod error;
pub mod library;
mod marshal;
mod protocol;
mod report;
mod wire;

pub use detail::{Completeness, Detail};
pub use error::{ConfigurationError, Error};
pub use library::{EngineVersion, NativeEngine};
pub use protocol::{Engine, ScanExOutput, Scanner};
pub use report::{Report, ScanStatus, Verdict};
pub use wire::WireEnum;
