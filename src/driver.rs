//! Top-level request driver.
//!
//! [`open_request`] assembles a [`RequestContext`] from configuration, the
//! environment and stdin. [`run`] executes a script against it and flushes
//! the response exactly once, whether the script returned or called
//! `exit()`.

use std::io::Read;

use tracing::{error, info, info_span};

use crate::config::ShimConfig;
use crate::env::{EnvSource, ServerVars};
use crate::exit::{Interrupt, ScriptResult};
use crate::input::RequestInput;
use crate::output::{OutputSink, ResponseBuffer};
use crate::request::RequestContext;
use crate::session::{FileSessionStore, SessionManager};
use crate::Result;

/// Build the context for one request.
///
/// Sessions are file-backed under `config.session_dir` and resumed from the
/// request's `HTTP_COOKIE`.
///
/// # Errors
///
/// Returns `AppError::MalformedQueryString` if `QUERY_STRING` is malformed,
/// or `AppError::Io` if a decoder diagnostic cannot be written.
pub fn open_request(
    config: &ShimConfig,
    env: impl EnvSource + 'static,
    stdin: &mut impl Read,
    sink: impl OutputSink + 'static,
) -> Result<RequestContext> {
    let server = ServerVars::new(env);
    let input = RequestInput::read(&server, stdin, &config.post);
    let store = FileSessionStore::new(
        config.session_dir.clone(),
        config.session_cookie.clone(),
        server.get("HTTP_COOKIE"),
    );
    let session = SessionManager::new(store, config.session_cookie.clone());
    RequestContext::bootstrap(
        server,
        input,
        session,
        ResponseBuffer::new(config.default_content_type.clone()),
        sink,
    )
}

/// Run `script` and finish the response.
///
/// Normal completion yields exit code `0`; `exit(code)` yields `code`. Both
/// paths flush the buffered response once. A fatal error is returned without
/// flushing.
///
/// # Errors
///
/// Returns the script's fatal error, or `AppError::Io` if the response
/// cannot be written.
pub fn run<F>(mut ctx: RequestContext, script: F) -> Result<i64>
where
    F: FnOnce(&mut RequestContext) -> ScriptResult,
{
    let span = info_span!("script");
    let _guard = span.enter();

    let code = match script(&mut ctx) {
        Ok(()) => 0,
        Err(Interrupt::Exit(signal)) => {
            info!(code = signal.code, "script exited early");
            signal.code
        }
        Err(Interrupt::Fatal(err)) => {
            error!(%err, "script failed");
            return Err(err);
        }
    };

    ctx.finish()?;
    Ok(code)
}
