//! File-backed session store.
//!
//! Each session lives in `<session_dir>/<id>`. The file holds one record per
//! key in the form `key|type|value;` where `type` is `s` (string), `n`
//! (number) or `b` (boolean):
//!
//! ```text
//! fruit|s|apple;quantity|n|12.000000000000;organic|b|1;
//! ```

use std::fs::{self, FileTimes};
use std::io::Write;
use std::path::PathBuf;
use std::time::SystemTime;

use serde_json::Value;
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::store::{SessionData, SessionStore};
use crate::{AppError, Result};

/// Fixed prefix of every generated session id.
pub const SESSION_ID_PREFIX: &str = "jst_sess";

/// Number of random characters following [`SESSION_ID_PREFIX`].
pub const SESSION_ID_RANDOM_LEN: usize = 32;

/// Total session id length.
pub const SESSION_ID_LEN: usize = SESSION_ID_PREFIX.len() + SESSION_ID_RANDOM_LEN;

const NUMBER_PRECISION: usize = 12;

const DIGITS_PER_UUID: usize = 16;

const BASE: u128 = 62;

const ID_ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// Session store keeping one file per session in a directory.
#[derive(Debug)]
pub struct FileSessionStore {
    dir: PathBuf,
    cookie_name: String,
    cookie_header: Option<String>,
    id: Option<String>,
}

impl FileSessionStore {
    /// Construct a store rooted at `dir`.
    ///
    /// `cookie_header` is the request's raw `HTTP_COOKIE` value, searched by
    /// [`SessionStore::start`] for `cookie_name`.
    #[must_use]
    pub fn new(
        dir: impl Into<PathBuf>,
        cookie_name: impl Into<String>,
        cookie_header: Option<String>,
    ) -> Self {
        Self {
            dir: dir.into(),
            cookie_name: cookie_name.into(),
            cookie_header,
            id: None,
        }
    }

    /// Path of the file for session `id`.
    #[must_use]
    pub fn session_path(&self, id: &str) -> PathBuf {
        self.dir.join(id)
    }

    fn held_path(&self) -> Result<PathBuf> {
        self.id
            .as_deref()
            .map(|id| self.session_path(id))
            .ok_or_else(|| AppError::Session("session not started".into()))
    }

    /// Extract a well-formed session id from the cookie header.
    ///
    /// The last `<cookie_name>=` occurrence wins. The value must be at least
    /// [`SESSION_ID_LEN`] characters long with an alphanumeric random part;
    /// only its first [`SESSION_ID_LEN`] characters are used.
    fn cookie_session_id(&self) -> Option<String> {
        let header = self.cookie_header.as_deref()?;
        let needle = format!("{}=", self.cookie_name);
        let start = header.rfind(&needle)? + needle.len();
        let value = header[start..].split(';').next().unwrap_or_default();

        if value.len() < SESSION_ID_LEN || !value.is_char_boundary(SESSION_ID_LEN) {
            warn!("session cookie too short");
            return None;
        }
        if !value.is_char_boundary(SESSION_ID_PREFIX.len()) {
            warn!("session cookie carries an invalid id");
            return None;
        }

        let candidate = &value[..SESSION_ID_LEN];
        let (prefix, random) = candidate.split_at(SESSION_ID_PREFIX.len());
        if !random.bytes().all(|b| b.is_ascii_alphanumeric())
            || prefix.contains(['/', '\\', '.'])
        {
            warn!("session cookie carries an invalid id");
            return None;
        }

        Some(candidate.to_owned())
    }
}

impl SessionStore for FileSessionStore {
    fn start(&mut self) -> Result<bool> {
        if self.id.is_some() {
            let path = self.held_path()?;
            let now = SystemTime::now();
            let touched = fs::File::options()
                .write(true)
                .open(&path)
                .and_then(|file| file.set_times(FileTimes::new().set_accessed(now).set_modified(now)));
            return match touched {
                Ok(()) => Ok(true),
                Err(err) => {
                    warn!(path = %path.display(), %err, "failed to refresh session file");
                    Ok(false)
                }
            };
        }

        let Some(id) = self.cookie_session_id() else {
            debug!("no resumable session in request cookie");
            return Ok(false);
        };

        let path = self.session_path(&id);
        if !path.is_file() {
            warn!(path = %path.display(), "session file not found");
            return Ok(false);
        }

        info!(session_id = %id, "session resumed");
        self.id = Some(id);
        Ok(true)
    }

    fn create(&mut self) -> Result<bool> {
        let id = generate_session_id();
        info!(session_id = %id, "session created");
        self.id = Some(id);
        Ok(true)
    }

    fn id(&self) -> Option<String> {
        self.id.clone()
    }

    fn data(&self) -> Result<SessionData> {
        let path = self.held_path()?;
        match fs::read_to_string(&path) {
            Ok(contents) => Ok(parse_records(&contents).unwrap_or_else(|| {
                warn!(path = %path.display(), "invalid session file, starting empty");
                SessionData::new()
            })),
            Err(err) => {
                debug!(path = %path.display(), %err, "session file unreadable, starting empty");
                Ok(SessionData::new())
            }
        }
    }

    fn set_data(&mut self, data: &SessionData) -> Result<()> {
        let path = self.held_path()?;
        let mut tmp = NamedTempFile::new_in(&self.dir).map_err(|err| {
            AppError::Session(format!("failed to create temporary session file: {err}"))
        })?;
        tmp.write_all(serialize_records(data).as_bytes())
            .map_err(|err| {
                AppError::Session(format!("failed to write temporary session file: {err}"))
            })?;
        tmp.persist(&path).map_err(|err| {
            AppError::Session(format!("failed to persist {}: {err}", path.display()))
        })?;
        debug!(path = %path.display(), keys = data.len(), "session data written");
        Ok(())
    }

    fn status(&self) -> bool {
        self.id.is_some()
    }

    fn destroy(&mut self) -> Result<bool> {
        let Some(id) = self.id.take() else {
            return Ok(false);
        };
        let path = self.session_path(&id);
        if let Err(err) = fs::remove_file(&path) {
            warn!(path = %path.display(), %err, "failed to remove session file");
        }
        info!(session_id = %id, "session destroyed");
        Ok(true)
    }
}

/// Generate `jst_sess` followed by 32 random alphanumeric characters.
///
/// Each half of the random part is the low 16 base-62 digits of a v4 UUID,
/// which carries 122 random bits. 62^16 is about 2^95, so every character is
/// drawn from the random bits with negligible bias.
#[must_use]
pub fn generate_session_id() -> String {
    let mut id = String::with_capacity(SESSION_ID_LEN);
    id.push_str(SESSION_ID_PREFIX);
    for _ in 0..SESSION_ID_RANDOM_LEN / DIGITS_PER_UUID {
        let mut n = Uuid::new_v4().as_u128();
        for _ in 0..DIGITS_PER_UUID {
            let digit = usize::try_from(n % BASE).unwrap_or_default();
            id.push(char::from(ID_ALPHABET[digit]));
            n /= BASE;
        }
    }
    id
}

/// Serialize session data into the record format.
///
/// Values other than strings, numbers and booleans are skipped.
#[must_use]
pub fn serialize_records(data: &SessionData) -> String {
    let mut out = String::new();
    for (key, value) in data {
        match value {
            Value::String(s) => out.push_str(&format!("{key}|s|{s};")),
            Value::Number(n) => {
                let n = n.as_f64().unwrap_or_default();
                out.push_str(&format!("{key}|n|{n:.prec$};", prec = NUMBER_PRECISION));
            }
            Value::Bool(b) => out.push_str(&format!("{key}|b|{};", u8::from(*b))),
            other => warn!(key, kind = value_kind(other), "unsupported session value skipped"),
        }
    }
    out
}

/// Parse the record format.
///
/// Returns `None` unless every record is valid and nothing but whitespace
/// follows the last one. Numbers are truncated to integers.
#[must_use]
pub fn parse_records(contents: &str) -> Option<SessionData> {
    let mut data = SessionData::new();
    let mut rest = contents;

    loop {
        let (key, after_key) = rest.split_once('|')?;
        let (kind, after_kind) = after_key.split_once('|')?;
        let (value, after_value) = after_kind.split_once(';')?;

        let value = match kind {
            "s" => Value::String(value.to_owned()),
            "n" => Value::from(truncate(value.trim().parse::<f64>().unwrap_or_default())),
            "b" => Value::Bool(value.trim().parse::<i64>().is_ok_and(|n| n != 0)),
            _ => return None,
        };
        data.insert(key.to_owned(), value);

        if after_value.trim().is_empty() {
            return Some(data);
        }
        rest = after_value;
    }
}

#[allow(clippy::cast_possible_truncation)]
fn truncate(n: f64) -> i64 {
    n.trunc() as i64
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
