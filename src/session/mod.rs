//! Session lifecycle and the live `$_SESSION` view.
//!
//! [`SessionManager`] moves through `Unstarted -> Active -> Destroyed`. While
//! active, [`SessionManager::view`] hands out a [`SessionView`] that reads
//! from the in-memory mapping and writes every mutation straight through to
//! the [`SessionStore`].

pub mod file_store;
pub mod memory;
pub mod store;

use serde_json::Value;
use tracing::{debug, info, warn};

pub use file_store::FileSessionStore;
pub use memory::MemorySessionStore;
pub use store::{SessionData, SessionStore};

use crate::output::ResponseBuffer;
use crate::Result;

/// Lifecycle state of the request's session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No session opened yet.
    Unstarted,
    /// A session is open and `$_SESSION` is live.
    Active,
    /// The session was destroyed during this request.
    Destroyed,
}

#[derive(Debug, Clone, Copy)]
enum Open {
    Start,
    Create,
}

/// Mutation-observing view over the session mapping.
///
/// Every successful [`set`](Self::set) and every [`delete`](Self::delete) of
/// a present key pushes the whole mapping to the store exactly once.
pub struct SessionView<'a> {
    data: &'a mut SessionData,
    store: &'a mut dyn SessionStore,
}

impl SessionView<'_> {
    /// Read `key`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.data.get(key)
    }

    /// Whether `key` is set.
    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.data.contains_key(key)
    }

    /// Number of keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the session holds no keys.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Iterate entries in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.data.iter()
    }

    /// Set `key` to `value` and persist the full mapping.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Session` if the store rejects the write. The
    /// in-memory mapping keeps the new value either way.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Result<()> {
        self.data.insert(key.into(), value.into());
        self.store.set_data(self.data)
    }

    /// Remove `key`, persisting only if it was present.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Session` if the store rejects the write.
    pub fn delete(&mut self, key: &str) -> Result<bool> {
        if self.data.remove(key).is_none() {
            return Ok(false);
        }
        self.store.set_data(self.data)?;
        Ok(true)
    }
}

impl std::fmt::Debug for SessionView<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_map().entries(self.data.iter()).finish()
    }
}

/// Owns the session for one request.
pub struct SessionManager {
    store: Box<dyn SessionStore>,
    cookie_name: String,
    state: SessionState,
    data: SessionData,
}

impl SessionManager {
    /// Manage sessions in `store`, naming the cookie `cookie_name`.
    #[must_use]
    pub fn new(store: impl SessionStore + 'static, cookie_name: impl Into<String>) -> Self {
        Self {
            store: Box::new(store),
            cookie_name: cookie_name.into(),
            state: SessionState::Unstarted,
            data: SessionData::new(),
        }
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Resume the session named by the request cookie.
    ///
    /// Does nothing while a session is active. On success a `Set-Cookie`
    /// header is buffered and the stored data becomes the live view. Returns
    /// whether a session is active afterwards.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Session` if the store fails.
    pub fn start(&mut self, response: &mut ResponseBuffer, secure: bool) -> Result<bool> {
        if self.state == SessionState::Active {
            debug!("session already active");
            return Ok(true);
        }
        self.open(Open::Start, response, secure)
    }

    /// Open a brand-new session, replacing any active one.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Session` if the store fails.
    pub fn create(&mut self, response: &mut ResponseBuffer, secure: bool) -> Result<bool> {
        self.open(Open::Create, response, secure)
    }

    fn open(&mut self, how: Open, response: &mut ResponseBuffer, secure: bool) -> Result<bool> {
        let opened = match how {
            Open::Start => self.store.start()?,
            Open::Create => self.store.create()?,
        };
        let Some(id) = self.store.id().filter(|_| opened) else {
            warn!(?how, "session store did not open a session");
            return Ok(false);
        };

        response.header(&cookie_header(&self.cookie_name, &id, secure));
        self.data = self.store.data()?;
        self.state = SessionState::Active;
        info!(?how, keys = self.data.len(), "session active");
        Ok(true)
    }

    /// Live view over the session data, `None` unless a session is active.
    pub fn view(&mut self) -> Option<SessionView<'_>> {
        if self.state != SessionState::Active {
            return None;
        }
        Some(SessionView {
            data: &mut self.data,
            store: self.store.as_mut(),
        })
    }

    /// The `session_id()` builtin.
    #[must_use]
    pub fn id(&self) -> Option<String> {
        self.store.id()
    }

    /// The `session_status()` builtin.
    #[must_use]
    pub fn status(&self) -> bool {
        self.store.status()
    }

    /// Remove every key, persisting once if anything was removed.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Session` if the store rejects the write.
    pub fn unset(&mut self) -> Result<()> {
        if self.state != SessionState::Active || self.data.is_empty() {
            return Ok(());
        }
        self.data.clear();
        self.store.set_data(&self.data)
    }

    /// Drop the in-memory session and ask the store to discard it.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Session` if the store fails.
    pub fn destroy(&mut self) -> Result<bool> {
        self.data.clear();
        self.state = SessionState::Destroyed;
        self.store.destroy()
    }

    /// Session entries as `key=value` lines for `session_print()`.
    #[must_use]
    pub fn print_lines(&self) -> Vec<String> {
        self.data
            .iter()
            .map(|(key, value)| match value {
                Value::String(s) => format!("{key}={s}"),
                other => format!("{key}={other}"),
            })
            .collect()
    }
}

impl std::fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionManager")
            .field("cookie_name", &self.cookie_name)
            .field("state", &self.state)
            .field("keys", &self.data.len())
            .finish_non_exhaustive()
    }
}

/// Render the session cookie header line.
#[must_use]
pub fn cookie_header(name: &str, id: &str, secure: bool) -> String {
    if secure {
        format!("Set-Cookie: {name}={id}; secure; httponly")
    } else {
        format!("Set-Cookie: {name}={id}; httponly")
    }
}
