//! In-memory session store.
//!
//! Clones share state, so a caller can keep a handle while the
//! [`super::SessionManager`] owns another and inspect every push afterwards.

use std::cell::RefCell;
use std::rc::Rc;

use super::store::{SessionData, SessionStore};
use crate::{AppError, Result};

#[derive(Debug, Default)]
struct MemoryState {
    id: Option<String>,
    resumable: Option<(String, SessionData)>,
    data: SessionData,
    pushes: Vec<SessionData>,
    next_id: u32,
}

/// Session store holding everything in process memory.
#[derive(Debug, Default, Clone)]
pub struct MemorySessionStore {
    state: Rc<RefCell<MemoryState>>,
}

impl MemorySessionStore {
    /// Empty store with nothing to resume.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store whose `start` resumes session `id` holding `data`.
    #[must_use]
    pub fn with_existing(id: impl Into<String>, data: SessionData) -> Self {
        let store = Self::default();
        store.state.borrow_mut().resumable = Some((id.into(), data));
        store
    }

    /// Every mapping passed to `set_data`, oldest first.
    #[must_use]
    pub fn pushes(&self) -> Vec<SessionData> {
        self.state.borrow().pushes.clone()
    }

    /// Currently stored data.
    #[must_use]
    pub fn stored(&self) -> SessionData {
        self.state.borrow().data.clone()
    }
}

impl SessionStore for MemorySessionStore {
    fn start(&mut self) -> Result<bool> {
        let mut state = self.state.borrow_mut();
        if state.id.is_some() {
            return Ok(true);
        }
        match state.resumable.clone() {
            Some((id, data)) => {
                state.id = Some(id);
                state.data = data;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn create(&mut self) -> Result<bool> {
        let mut state = self.state.borrow_mut();
        state.next_id += 1;
        state.id = Some(format!("mem{:037}", state.next_id));
        state.data = SessionData::new();
        Ok(true)
    }

    fn id(&self) -> Option<String> {
        self.state.borrow().id.clone()
    }

    fn data(&self) -> Result<SessionData> {
        let state = self.state.borrow();
        if state.id.is_none() {
            return Err(AppError::Session("session not started".into()));
        }
        Ok(state.data.clone())
    }

    fn set_data(&mut self, data: &SessionData) -> Result<()> {
        let mut state = self.state.borrow_mut();
        if state.id.is_none() {
            return Err(AppError::Session("session not started".into()));
        }
        state.data = data.clone();
        state.pushes.push(data.clone());
        Ok(())
    }

    fn status(&self) -> bool {
        self.state.borrow().id.is_some()
    }

    fn destroy(&mut self) -> Result<bool> {
        let mut state = self.state.borrow_mut();
        if state.id.take().is_none() {
            return Ok(false);
        }
        state.data.clear();
        state.resumable = None;
        Ok(true)
    }
}
