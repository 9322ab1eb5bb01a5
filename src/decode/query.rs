//! `QUERY_STRING` decoding for `$_GET`.

use super::{split_pair, ParamMap};
use crate::{AppError, Result};

/// Decode a query string into raw parameter values.
///
/// Values are stored exactly as they appear; no percent-decoding is applied.
/// An absent or empty query string yields an empty map.
///
/// # Errors
///
/// Returns `AppError::MalformedQueryString` for the first segment that does
/// not split into exactly one key and one value. No partial map is returned.
pub fn decode_query(raw: Option<&str>) -> Result<ParamMap> {
    let mut params = ParamMap::new();
    let Some(raw) = raw.filter(|qs| !qs.is_empty()) else {
        return Ok(params);
    };

    for segment in raw.split('&') {
        let (key, value) = split_pair(segment).ok_or_else(|| {
            AppError::MalformedQueryString(format!("invalid segment {segment:?}"))
        })?;
        params.insert(key.to_owned(), value.to_owned());
    }

    Ok(params)
}
