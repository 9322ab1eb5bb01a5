//! Uploaded-file descriptor decoding for `$_FILES`.
//!
//! The descriptor stream is produced by [`crate::input`]: one `;`-separated
//! segment per uploaded file, each a `&`-separated attribute list whose first
//! pair names the form field, e.g.
//! `id=avatar&name=me.png&type=image/png&size=512&tmp_name=/tmp/jst_post_x&error=0`.

use std::collections::BTreeMap;

use super::{percent_decode, split_pair, Decoded};
use crate::AppError;

/// Attribute name to value for one uploaded file.
pub type FileDescriptor = BTreeMap<String, String>;

/// Field identifier to file attributes.
pub type FileMap = BTreeMap<String, FileDescriptor>;

/// Decode a serialized file-descriptor stream.
///
/// The first well-formed pair of a segment claims it: its decoded value
/// becomes the file id and its key is dropped. An empty id does not claim the
/// segment, so the next well-formed pair is tried as the id again. Later pairs
/// are decoded on both sides and stored as attributes. Bad pairs are reported
/// in [`Decoded::errors`] and skipped.
#[must_use]
pub fn decode_files(raw: Option<&str>) -> Decoded<FileMap> {
    let mut decoded = Decoded::<FileMap>::default();
    let Some(raw) = raw.filter(|files| !files.is_empty()) else {
        return decoded;
    };

    for segment in raw.split(';') {
        let mut file_id: Option<String> = None;

        for pair in segment.split('&') {
            let Some((key, value)) = split_pair(pair) else {
                decoded
                    .errors
                    .push(AppError::MalformedFileAttribute(format!("invalid pair {pair:?}")));
                continue;
            };

            match file_id.as_deref() {
                Some(id) if !id.is_empty() => {
                    let attribute =
                        percent_decode(key).and_then(|k| percent_decode(value).map(|v| (k, v)));
                    match attribute {
                        Ok((k, v)) => {
                            if let Some(descriptor) = decoded.value.get_mut(id) {
                                descriptor.insert(k, v);
                            }
                        }
                        Err(msg) => decoded.errors.push(AppError::MalformedFileAttribute(msg)),
                    }
                }
                _ => match percent_decode(value) {
                    Ok(id) => {
                        decoded.value.insert(id.clone(), FileDescriptor::new());
                        file_id = Some(id);
                    }
                    Err(msg) => decoded.errors.push(AppError::MalformedFileAttribute(msg)),
                },
            }
        }
    }

    decoded
}
