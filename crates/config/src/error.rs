#![forbid(unsafe_code)]

use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to extract config: {0}")]
    Extract(#[from] figment::Error),

    #[error("failed to serialize TOML: {0}")]
    TomlSer(#[from] toml_edit::ser::Error),

    #[error("invalid path: {0}")]
    InvalidPath(PathBuf),

    #[error("unknown report kind: {0:?}")]
    UnknownReportKind(String),
}
