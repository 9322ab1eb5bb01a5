//! Raw request input.
//!
//! Reads the request body from stdin according to `CONTENT_LENGTH` and
//! `CONTENT_TYPE` and produces the two strings the superglobal decoders
//! consume: the URL-encoded POST body and the serialized file descriptors.
//! Multipart bodies are split here, file parts are written to disk and
//! plain fields are re-encoded as a URL-encoded body.

pub mod multipart;
pub mod upload;

use std::io::Read;

use tracing::{debug, info, warn};

use crate::config::PostConfig;
use crate::env::ServerVars;
use multipart::ContentType;
use upload::Uploader;

/// Raw POST and FILES input for one request.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RequestInput {
    /// URL-encoded POST body.
    pub body: Option<String>,
    /// `;`-separated file descriptors.
    pub files: Option<String>,
}

impl RequestInput {
    /// Input with a plain POST body and no files.
    #[must_use]
    pub fn with_body(body: impl Into<String>) -> Self {
        Self {
            body: Some(body.into()),
            files: None,
        }
    }

    /// Read the request body from `reader`.
    ///
    /// Nothing here fails the request: oversized or short bodies, bad
    /// multipart framing and upload failures are logged and degrade to
    /// missing input.
    pub fn read(server: &ServerVars, reader: &mut impl Read, config: &PostConfig) -> Self {
        let length = server
            .get("CONTENT_LENGTH")
            .and_then(|raw| raw.trim().parse::<usize>().ok())
            .unwrap_or(0);
        if length == 0 {
            return Self::default();
        }
        if length > config.max_size {
            warn!(length, limit = config.max_size, "post size exceeds limit");
            return Self::default();
        }

        let mut content = Vec::with_capacity(length);
        match reader.take(u64::try_from(length).unwrap_or(u64::MAX)).read_to_end(&mut content) {
            Ok(read) if read != length => warn!(read, length, "short read of post data"),
            Ok(_) => {}
            Err(err) => warn!(%err, "failed to read post data"),
        }

        match multipart::parse_content_type(server.get("CONTENT_TYPE").as_deref()) {
            ContentType::Plain => Self::with_body(String::from_utf8_lossy(&content)),
            ContentType::Malformed => {
                warn!("failed to parse content type header");
                Self::with_body(String::from_utf8_lossy(&content))
            }
            ContentType::MissingBoundary => {
                warn!("multipart request without boundary");
                Self::default()
            }
            ContentType::Multipart { delimiter } => from_multipart(&content, &delimiter, config),
        }
    }
}

fn from_multipart(content: &[u8], delimiter: &str, config: &PostConfig) -> RequestInput {
    let parts = multipart::split_parts(content, delimiter);
    info!(parts = parts.len(), "multipart body parsed");

    let mut uploader = Uploader::new(config);
    let mut descriptors = Vec::new();
    let mut fields = Vec::new();

    for part in &parts {
        match &part.filename {
            Some(filename) => descriptors.push(uploader.store(part, filename).descriptor()),
            None => fields.push(format!(
                "{}={}",
                part.name,
                urlencoding::encode(&String::from_utf8_lossy(part.body))
            )),
        }
    }

    let input = RequestInput {
        body: (!fields.is_empty()).then(|| fields.join("&")),
        files: (!descriptors.is_empty()).then(|| descriptors.join(";")),
    };
    debug!(post = ?input.body, files = ?input.files, "multipart input");
    input
}
