#![forbid(unsafe_code)]

//! `cgi-shim`: CGI probe built on the shim.
//!
//! Decodes the current request exactly as a script would see it and answers
//! with a JSON dump of the superglobals. Logs go to stderr; stdout carries
//! only the CGI response.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, ValueEnum};
use serde_json::{json, Map, Value};
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

use cgi_shim::config::ShimConfig;
use cgi_shim::driver;
use cgi_shim::env::ProcessEnv;
use cgi_shim::output::StdoutSink;
use cgi_shim::{AppError, Result};

/// Server variables echoed back by the probe.
const PROBED_SERVER_VARS: &[&str] = &[
    "REQUEST_METHOD",
    "QUERY_STRING",
    "CONTENT_TYPE",
    "CONTENT_LENGTH",
    "SCRIPT_NAME",
    "REMOTE_ADDR",
    "HTTPS",
];

#[derive(Debug, Copy, Clone, Eq, PartialEq, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Debug, Parser)]
#[command(name = "cgi-shim", about = "CGI superglobal probe", version, long_about = None)]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Log output format (text or json).
    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,

    /// Resume the caller's session and include it in the dump.
    #[arg(long)]
    session: bool,
}

fn main() -> Result<ExitCode> {
    let args = Cli::parse();
    init_tracing(args.log_format)?;

    let config = match &args.config {
        Some(path) => ShimConfig::load_from_path(path)?,
        None => ShimConfig::default(),
    };
    info!(session_dir = %config.session_dir.display(), "configuration loaded");

    let ctx = driver::open_request(&config, ProcessEnv, &mut std::io::stdin().lock(), StdoutSink)?;
    let code = driver::run(ctx, |ctx| {
        let session = if args.session {
            ctx.session_start()?;
            ctx.session_snapshot()
        } else {
            None
        };

        let server: Map<String, Value> = PROBED_SERVER_VARS
            .iter()
            .filter_map(|name| ctx.server().get(name).map(|v| ((*name).to_owned(), json!(v))))
            .collect();
        let dump = json!({
            "get": ctx.get,
            "post": ctx.post,
            "files": ctx.files,
            "server": server,
            "session": session,
        });
        let body = serde_json::to_string_pretty(&dump)
            .map_err(|err| AppError::Io(format!("failed to render probe: {err}")))?;

        ctx.header("Content-Type: text/plain; charset=utf-8");
        ctx.echo(Some(&body));
        Ok(())
    })?;

    Ok(ExitCode::from(u8::try_from(code).unwrap_or(1)))
}

fn init_tracing(log_format: LogFormat) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let subscriber = fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr);

    match log_format {
        LogFormat::Text => subscriber
            .try_init()
            .map_err(|err| AppError::Config(format!("failed to init tracing: {err}")))?,
        LogFormat::Json => subscriber
            .json()
            .try_init()
            .map_err(|err| AppError::Config(format!("failed to init tracing: {err}")))?,
    }

    Ok(())
}
