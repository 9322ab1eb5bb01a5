//! Persisting uploaded files and describing them for `$_FILES`.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use super::multipart::Part;
use crate::config::PostConfig;
use crate::{AppError, Result};

/// Upload status codes, numbered like PHP's `UPLOAD_ERR_*` constants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadStatus {
    /// File stored.
    Ok = 0,
    /// The field was submitted without a file.
    NoFile = 4,
    /// The upload directory does not exist.
    NoTmpDir = 5,
    /// Too large, or writing the temp file failed.
    FailedWrite = 6,
}

impl UploadStatus {
    /// Numeric code written to the descriptor.
    #[must_use]
    pub fn code(self) -> u8 {
        self as u8
    }
}

/// A file part after the upload step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredUpload {
    /// Form field name.
    pub field: String,
    /// Client-side file name.
    pub filename: String,
    /// Declared content type, `text/plain` when none was sent.
    pub content_type: String,
    /// Body length in bytes.
    pub size: usize,
    /// Where the body was written, if it was.
    pub tmp_path: Option<PathBuf>,
    /// Upload outcome.
    pub status: UploadStatus,
}

impl StoredUpload {
    /// Serialize as one descriptor segment.
    ///
    /// The field name comes first since the `$_FILES` decoder keys each file
    /// by its first pair. Values are percent-encoded.
    #[must_use]
    pub fn descriptor(&self) -> String {
        let tmp = self
            .tmp_path
            .as_deref()
            .map(|p| p.to_string_lossy().into_owned())
            .unwrap_or_default();
        format!(
            "id={}&name={}&type={}&size={}&tmp_name={}&error={}",
            urlencoding::encode(&self.field),
            urlencoding::encode(&self.filename),
            urlencoding::encode(&self.content_type),
            self.size,
            urlencoding::encode(&tmp),
            self.status.code()
        )
    }
}

/// Writes file parts into the configured upload directory.
#[derive(Debug)]
pub struct Uploader<'a> {
    config: &'a PostConfig,
    cleaned: bool,
}

impl<'a> Uploader<'a> {
    /// Uploader honouring `config`'s directory, prefix and size limit.
    #[must_use]
    pub fn new(config: &'a PostConfig) -> Self {
        Self {
            config,
            cleaned: false,
        }
    }

    /// Store one file part. Failures are reported in the returned status.
    pub fn store(&mut self, part: &Part<'_>, filename: &str) -> StoredUpload {
        let mut upload = StoredUpload {
            field: part.name.clone(),
            filename: filename.to_owned(),
            content_type: part
                .content_type
                .clone()
                .unwrap_or_else(|| "text/plain".into()),
            size: part.body.len(),
            tmp_path: None,
            status: UploadStatus::Ok,
        };

        if filename.is_empty() {
            upload.status = UploadStatus::NoFile;
            return upload;
        }

        if part.body.len() > self.config.max_file_size {
            warn!(
                field = %upload.field,
                size = part.body.len(),
                limit = self.config.max_file_size,
                "upload exceeds size limit"
            );
            upload.status = UploadStatus::FailedWrite;
            return upload;
        }

        if !self.config.upload_dir.is_dir() {
            warn!(dir = %self.config.upload_dir.display(), "upload directory missing");
            upload.status = UploadStatus::NoTmpDir;
            return upload;
        }

        if !self.cleaned {
            self.cleaned = true;
            remove_previous_uploads(&self.config.upload_dir, &self.config.upload_prefix);
        }

        match self.write(part.body) {
            Ok(path) => {
                info!(field = %upload.field, path = %path.display(), "file uploaded");
                upload.tmp_path = Some(path);
            }
            Err(err) => {
                warn!(field = %upload.field, %err, "failed to write upload");
                upload.status = UploadStatus::FailedWrite;
            }
        }
        upload
    }

    fn write(&self, body: &[u8]) -> Result<PathBuf> {
        let mut file = tempfile::Builder::new()
            .prefix(&self.config.upload_prefix)
            .tempfile_in(&self.config.upload_dir)?;
        file.write_all(body)?;
        file.flush()?;
        let (_, path) = file
            .keep()
            .map_err(|err| AppError::Upload(format!("failed to keep temp file: {err}")))?;
        Ok(path)
    }
}

/// Remove files in `dir` whose name starts with `prefix`.
fn remove_previous_uploads(dir: &Path, prefix: &str) {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(err) => {
            warn!(dir = %dir.display(), %err, "failed to list upload directory");
            return;
        }
    };

    for entry in entries.flatten() {
        let path = entry.path();
        let is_upload = entry.file_name().to_string_lossy().starts_with(prefix)
            && entry.file_type().is_ok_and(|t| t.is_file());
        if !is_upload {
            continue;
        }
        info!(path = %path.display(), "removing previous upload");
        if let Err(err) = fs::remove_file(&path) {
            warn!(path = %path.display(), %err, "failed to remove previous upload");
        }
    }
}
