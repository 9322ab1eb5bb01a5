#![forbid(unsafe_code)]

//! Request/response shim between a script host and a CGI environment.
//!
//! Builds `$_GET`, `$_POST`, `$_FILES`, `$_SERVER` and `$_SESSION` from the
//! process environment and stdin, buffers headers and body, and writes the
//! whole response once the script returns or calls `exit()`.

pub mod config;
pub mod decode;
pub mod driver;
pub mod env;
pub mod errors;
pub mod exit;
pub mod input;
pub mod output;
pub mod request;
pub mod session;

pub use config::ShimConfig;
pub use errors::{AppError, Result};
pub use request::RequestContext;
