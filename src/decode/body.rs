//! URL-encoded POST body decoding for `$_POST`.

use super::{percent_decode, split_pair, Decoded, ParamMap};
use crate::AppError;

/// Decode a raw POST body.
///
/// Each `key=value` segment has `+` rewritten to a space and is then
/// percent-decoded; keys are kept as sent. Segments that do not split into
/// exactly two tokens, or whose value is not valid UTF-8 once decoded, are
/// reported in [`Decoded::errors`] while the rest of the body still decodes.
#[must_use]
pub fn decode_body(raw: Option<&str>) -> Decoded<ParamMap> {
    let mut decoded = Decoded::<ParamMap>::default();
    let Some(raw) = raw.filter(|body| !body.is_empty()) else {
        return decoded;
    };

    for segment in raw.split('&') {
        let Some((key, value)) = split_pair(segment) else {
            decoded
                .errors
                .push(AppError::MalformedPostField(format!("invalid segment {segment:?}")));
            continue;
        };

        match percent_decode(&value.replace('+', " ")) {
            Ok(value) => {
                decoded.value.insert(key.to_owned(), value);
            }
            Err(msg) => decoded.errors.push(AppError::MalformedPostField(msg)),
        }
    }

    decoded
}
