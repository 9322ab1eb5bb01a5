//! Error types shared across the shim.

use std::fmt::{Display, Formatter};

/// Shared shim result type.
pub type Result<T> = std::result::Result<T, AppError>;

/// Error enumeration covering every failure mode of request setup and output.
///
/// Only [`AppError::MalformedQueryString`] aborts request setup. The
/// `MalformedPostField` and `MalformedFileAttribute` variants are recorded as
/// diagnostics by the decoders and never propagated.
#[derive(Debug)]
pub enum AppError {
    /// Configuration parsing or validation failure.
    Config(String),
    /// File-system, stdin or stdout failure.
    Io(String),
    /// A `QUERY_STRING` segment did not split into exactly one key and value.
    MalformedQueryString(String),
    /// A POST body segment did not split into exactly one key and value.
    MalformedPostField(String),
    /// A file descriptor attribute did not split into exactly one key and value.
    MalformedFileAttribute(String),
    /// Session store failure.
    Session(String),
    /// Upload parsing or temp-file failure.
    Upload(String),
}

impl Display for AppError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Config(msg) => write!(f, "config: {msg}"),
            Self::Io(msg) => write!(f, "io: {msg}"),
            Self::MalformedQueryString(msg) => write!(f, "malformed query string: {msg}"),
            Self::MalformedPostField(msg) => write!(f, "malformed post field: {msg}"),
            Self::MalformedFileAttribute(msg) => write!(f, "malformed file attribute: {msg}"),
            Self::Session(msg) => write!(f, "session: {msg}"),
            Self::Upload(msg) => write!(f, "upload: {msg}"),
        }
    }
}

impl std::error::Error for AppError {}

impl From<toml::de::Error> for AppError {
    fn from(err: toml::de::Error) -> Self {
        Self::Config(format!("invalid config: {err}"))
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}
