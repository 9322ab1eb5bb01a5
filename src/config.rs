//! Shim configuration parsing and validation.
//!
//! Every field has a default so a missing or empty config file yields the
//! behaviour the scripts were written against: sessions and uploads under
//! `/tmp`, the `DUKSID` cookie and an 8 MiB request cap.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::{AppError, Result};

const MEGABYTE: usize = 1_048_576;

/// Request body and upload limits.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case", default)]
pub struct PostConfig {
    /// Largest accepted `CONTENT_LENGTH` in bytes.
    pub max_size: usize,
    /// Largest single uploaded file in bytes.
    pub max_file_size: usize,
    /// Directory receiving uploaded files.
    pub upload_dir: PathBuf,
    /// File name prefix for uploaded files; previous uploads with this
    /// prefix are removed before a new one is written.
    pub upload_prefix: String,
}

impl Default for PostConfig {
    fn default() -> Self {
        Self {
            max_size: 8 * MEGABYTE,
            max_file_size: 2 * MEGABYTE,
            upload_dir: PathBuf::from("/tmp"),
            upload_prefix: "jst_post_".into(),
        }
    }
}

/// Global configuration parsed from `cgi-shim.toml`.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case", default)]
pub struct ShimConfig {
    /// Directory holding one file per session.
    pub session_dir: PathBuf,
    /// Name of the cookie carrying the session id.
    pub session_cookie: String,
    /// Content type emitted when a script never sets one.
    pub default_content_type: String,
    /// Request body limits.
    pub post: PostConfig,
}

impl Default for ShimConfig {
    fn default() -> Self {
        Self {
            session_dir: PathBuf::from("/tmp"),
            session_cookie: "DUKSID".into(),
            default_content_type: "text/html".into(),
            post: PostConfig::default(),
        }
    }
}

impl ShimConfig {
    /// Load and validate configuration from a TOML file path.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if the file cannot be read or contains
    /// invalid TOML, or if validation fails.
    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .map_err(|err| AppError::Config(format!("failed to read config: {err}")))?;
        Self::from_toml_str(&raw)
    }

    /// Parse configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if parsing or validation fails.
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let config: Self = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.session_cookie.is_empty() {
            return Err(AppError::Config("session_cookie must not be empty".into()));
        }

        if self
            .session_cookie
            .chars()
            .any(|c| c == '=' || c == ';' || c.is_whitespace())
        {
            return Err(AppError::Config(format!(
                "session_cookie {:?} contains a reserved character",
                self.session_cookie
            )));
        }

        if self.post.max_file_size > self.post.max_size {
            return Err(AppError::Config(
                "post.max_file_size must not exceed post.max_size".into(),
            ));
        }

        Ok(())
    }
}
