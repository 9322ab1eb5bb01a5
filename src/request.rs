//! Request-scoped state handed to script code.
//!
//! A [`RequestContext`] is built once per invocation. Building it decodes the
//! superglobals, and script builtins (`header`, `echo`, `session_*`,
//! `include`) are methods on it.

use std::path::Path;

use serde_json::Value;
use tracing::{debug, info, warn};

use crate::decode::files::{decode_files, FileMap};
use crate::decode::{body::decode_body, query::decode_query, ParamMap};
use crate::env::ServerVars;
use crate::input::RequestInput;
use crate::output::{OutputSink, ResponseBuffer};
use crate::session::{SessionManager, SessionState, SessionView};
use crate::Result;

/// Diagnostic written for each rejected POST segment.
pub const POST_DIAGNOSTIC: &str = "unexpected post data\n";

/// Diagnostic written for each rejected file attribute.
pub const FILES_DIAGNOSTIC: &str = "unexpected file data\n";

/// Executes `include()` on behalf of the shim.
pub trait ScriptHost {
    /// Load and run the script at `path` in the current request.
    ///
    /// # Errors
    ///
    /// Returns whatever the host reports for a missing or failing script.
    fn include(&mut self, ctx: &mut RequestContext, path: &Path) -> Result<()>;
}

/// Everything a script can reach during one request.
pub struct RequestContext {
    /// `$_GET`.
    pub get: ParamMap,
    /// `$_POST`.
    pub post: ParamMap,
    /// `$_FILES`.
    pub files: FileMap,
    server: ServerVars,
    response: ResponseBuffer,
    session: SessionManager,
    sink: Box<dyn OutputSink>,
    malformed_input: bool,
}

impl RequestContext {
    /// Decode the request and build its context.
    ///
    /// POST is decoded first, then FILES, then GET. POST and FILES problems
    /// are written to `sink` immediately, ahead of any buffered output, and a
    /// POST problem suppresses the next [`session_start`](Self::session_start).
    ///
    /// # Errors
    ///
    /// Returns `AppError::MalformedQueryString` if `QUERY_STRING` is
    /// malformed, or `AppError::Io` if a diagnostic cannot be written.
    pub fn bootstrap(
        server: ServerVars,
        input: RequestInput,
        session: SessionManager,
        response: ResponseBuffer,
        sink: impl OutputSink + 'static,
    ) -> Result<Self> {
        let mut sink: Box<dyn OutputSink> = Box::new(sink);

        let post = decode_body(input.body.as_deref());
        for err in &post.errors {
            warn!(%err, "rejected post segment");
            sink.write(POST_DIAGNOSTIC)?;
        }
        let malformed_input = post.has_errors();

        let files = decode_files(input.files.as_deref());
        for err in &files.errors {
            warn!(%err, "rejected file attribute");
            sink.write(FILES_DIAGNOSTIC)?;
        }

        let get = decode_query(server.get("QUERY_STRING").as_deref())?;

        info!(
            get = get.len(),
            post = post.value.len(),
            files = files.value.len(),
            malformed_input,
            "request decoded"
        );

        Ok(Self {
            get,
            post: post.value,
            files: files.value,
            server,
            response,
            session,
            sink,
            malformed_input,
        })
    }

    /// `$_SERVER`.
    #[must_use]
    pub fn server(&self) -> &ServerVars {
        &self.server
    }

    /// Whether a POST problem is still waiting to suppress `session_start`.
    #[must_use]
    pub fn malformed_input(&self) -> bool {
        self.malformed_input
    }

    /// The `header()` builtin.
    pub fn header(&mut self, line: &str) {
        self.response.header(line);
    }

    /// The `echo()` builtin.
    pub fn echo<T: std::fmt::Display + ?Sized>(&mut self, value: Option<&T>) {
        self.response.echo(value);
    }

    /// Buffered response so far.
    #[must_use]
    pub fn response(&self) -> &ResponseBuffer {
        &self.response
    }

    /// The `session_start()` builtin.
    ///
    /// A no-op while a session is active. Otherwise skipped once, consuming
    /// the flag, after a malformed POST body.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Session` if the store fails.
    pub fn session_start(&mut self) -> Result<bool> {
        if self.session.state() == SessionState::Active {
            return Ok(true);
        }
        if self.malformed_input {
            self.malformed_input = false;
            info!("session start suppressed after malformed post data");
            return Ok(false);
        }
        let secure = self.https();
        self.session.start(&mut self.response, secure)
    }

    /// The `session_create()` builtin. Ignores the malformed-input flag.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Session` if the store fails.
    pub fn session_create(&mut self) -> Result<bool> {
        let secure = self.https();
        self.session.create(&mut self.response, secure)
    }

    /// `$_SESSION`, present only while a session is active.
    pub fn session(&mut self) -> Option<SessionView<'_>> {
        self.session.view()
    }

    /// The session manager itself.
    #[must_use]
    pub fn session_manager(&self) -> &SessionManager {
        &self.session
    }

    /// The `session_id()` builtin.
    #[must_use]
    pub fn session_id(&self) -> Option<String> {
        self.session.id()
    }

    /// The `session_status()` builtin.
    #[must_use]
    pub fn session_status(&self) -> bool {
        self.session.status()
    }

    /// The `session_unset()` builtin.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Session` if the store rejects the write.
    pub fn session_unset(&mut self) -> Result<()> {
        self.session.unset()
    }

    /// The `session_destroy()` builtin.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Session` if the store fails.
    pub fn session_destroy(&mut self) -> Result<bool> {
        self.session.destroy()
    }

    /// The `session_print()` builtin; writes straight to the sink.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Io` if the sink rejects a write.
    pub fn session_print(&mut self) -> Result<()> {
        for line in self.session.print_lines() {
            self.sink.write(&format!("{line}\n"))?;
        }
        Ok(())
    }

    /// The `include()` builtin, delegated to the host unchanged.
    ///
    /// # Errors
    ///
    /// Propagates the host's error.
    pub fn include(&mut self, host: &mut dyn ScriptHost, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        debug!(path = %path.display(), "include");
        host.include(self, path)
    }

    /// Session values as JSON, for diagnostics and probes.
    #[must_use]
    pub fn session_snapshot(&mut self) -> Option<Value> {
        self.session.view().map(|view| {
            Value::Object(
                view.iter()
                    .map(|(k, v)| (k.clone(), v.clone()))
                    .collect(),
            )
        })
    }

    /// Flush the buffered response to the sink. Runs once per request.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Io` if the sink rejects the write.
    pub fn finish(self) -> Result<()> {
        let Self {
            response, mut sink, ..
        } = self;
        response.finish(sink.as_mut())
    }

    /// `HTTPS` counts as off when absent, empty or `0`.
    fn https(&self) -> bool {
        self.server
            .get("HTTPS")
            .is_some_and(|v| !v.is_empty() && v != "0")
    }
}

impl std::fmt::Debug for RequestContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestContext")
            .field("get", &self.get)
            .field("post", &self.post)
            .field("files", &self.files)
            .field("session", &self.session)
            .field("malformed_input", &self.malformed_input)
            .finish_non_exhaustive()
    }
}
