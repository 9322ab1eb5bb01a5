//! Early termination of script code.
//!
//! `exit()` does not unwind the stack itself. It produces an
//! [`Interrupt::Exit`] that script code returns with `?` or `Err(..)`, and
//! the driver in [`crate::driver`] turns it into a finished response.

use serde_json::Value;

use crate::AppError;

/// A request to stop the script and send what has been buffered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExitSignal {
    /// Exit code reported to the host.
    pub code: i64,
}

impl ExitSignal {
    /// Build a signal from a script value.
    ///
    /// Numbers are truncated to an integer code; anything else, including
    /// numeric-looking strings, becomes `0`.
    #[must_use]
    pub fn from_value(value: Option<&Value>) -> Self {
        let code = match value {
            Some(Value::Number(n)) => n.as_i64().or_else(|| n.as_f64().map(truncate)),
            _ => None,
        };
        Self {
            code: code.unwrap_or(0),
        }
    }
}

#[allow(clippy::cast_possible_truncation)]
fn truncate(n: f64) -> i64 {
    n.trunc() as i64
}

/// Why script execution stopped before returning normally.
#[derive(Debug)]
pub enum Interrupt {
    /// The script called `exit()`.
    Exit(ExitSignal),
    /// A fatal error escaped the script.
    Fatal(AppError),
}

impl From<AppError> for Interrupt {
    fn from(err: AppError) -> Self {
        Self::Fatal(err)
    }
}

impl From<ExitSignal> for Interrupt {
    fn from(signal: ExitSignal) -> Self {
        Self::Exit(signal)
    }
}

/// Result type for script bodies run by the driver.
pub type ScriptResult = std::result::Result<(), Interrupt>;

/// The `exit()` script builtin.
///
/// ```
/// use cgi_shim::exit::{exit, ScriptResult};
///
/// fn script(done: bool) -> ScriptResult {
///     if done {
///         return Err(exit(Some(&serde_json::json!(5))));
///     }
///     Ok(())
/// }
///
/// assert!(script(true).is_err());
/// ```
#[must_use]
pub fn exit(code: Option<&Value>) -> Interrupt {
    Interrupt::Exit(ExitSignal::from_value(code))
}
