//! Decoders that build the `$_GET`, `$_POST` and `$_FILES` superglobals.
//!
//! All three formats are `&`-separated `key=value` lists, but they disagree on
//! what happens to a bad segment:
//!
//! | Decoder | Bad segment | Values |
//! |---------|-------------|--------|
//! | [`query`] | fatal, whole decode fails | raw |
//! | [`body`] | diagnostic + session suppression | `+` to space, percent-decoded |
//! | [`files`] | diagnostic only | percent-decoded |

use std::collections::BTreeMap;

use crate::AppError;

pub mod body;
pub mod files;
pub mod query;

/// Decoded GET or POST parameters.
pub type ParamMap = BTreeMap<String, String>;

/// Output of a decoder that tolerates bad input.
#[derive(Debug, Default)]
pub struct Decoded<T> {
    /// Everything that decoded cleanly.
    pub value: T,
    /// One entry per rejected segment, in input order.
    pub errors: Vec<AppError>,
}

impl<T> Decoded<T> {
    /// Whether any segment was rejected.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }
}

/// Split `segment` on `=` into exactly a key and a value.
///
/// `"a"` and `"a=b=c"` both yield `None`.
pub(crate) fn split_pair(segment: &str) -> Option<(&str, &str)> {
    let mut tokens = segment.split('=');
    match (tokens.next(), tokens.next(), tokens.next()) {
        (Some(key), Some(value), None) => Some((key, value)),
        _ => None,
    }
}

/// Percent-decode a component, failing when the result is not valid UTF-8.
pub(crate) fn percent_decode(raw: &str) -> std::result::Result<String, String> {
    urlencoding::decode(raw)
        .map(std::borrow::Cow::into_owned)
        .map_err(|err| format!("{raw:?} does not decode to utf-8: {err}"))
}
