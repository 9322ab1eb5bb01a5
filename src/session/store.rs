//! Persistence primitives behind `$_SESSION`.

use std::collections::BTreeMap;

use serde_json::Value;

use crate::Result;

/// Session key/value data. Values are strings, numbers or booleans in
/// practice; other JSON values are accepted but a store may drop them.
pub type SessionData = BTreeMap<String, Value>;

/// Backing store for a single request's session.
///
/// A store tracks at most one session id at a time. The
/// [`super::SessionManager`] drives it; script code never sees it directly.
pub trait SessionStore {
    /// Resume the session named by the request's cookie.
    ///
    /// Returns `false` when there is no valid session to resume. Calling it
    /// again while a session is held refreshes that session.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Session` if the store itself is unusable.
    fn start(&mut self) -> Result<bool>;

    /// Open a brand-new session with a fresh id.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Session` if no id could be generated.
    fn create(&mut self) -> Result<bool>;

    /// Id of the session currently held, if any.
    fn id(&self) -> Option<String>;

    /// Load the stored data; an unknown or unreadable session is empty.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Session` if no session is held.
    fn data(&self) -> Result<SessionData>;

    /// Replace the stored data with `data`.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Session` if no session is held or the write fails.
    fn set_data(&mut self, data: &SessionData) -> Result<()>;

    /// Whether a session is currently held.
    fn status(&self) -> bool;

    /// Discard the held session and its data. Returns `false` if there was
    /// nothing to discard.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Session` if the stored data could not be removed.
    fn destroy(&mut self) -> Result<bool>;
}
