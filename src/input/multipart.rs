//! `multipart/form-data` body splitting.

use tracing::{debug, warn};

/// One form part.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Part<'a> {
    /// Form field name from `Content-Disposition`.
    pub name: String,
    /// Uploaded file name; `None` for plain fields.
    pub filename: Option<String>,
    /// Value of the part's `Content-Type` header.
    pub content_type: Option<String>,
    /// Raw part body.
    pub body: &'a [u8],
}

/// Outcome of inspecting `CONTENT_TYPE`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentType {
    /// Anything that is not multipart; the body is used as-is.
    Plain,
    /// Multipart with its `--`-prefixed delimiter.
    Multipart {
        /// Delimiter line, `--` followed by the boundary.
        delimiter: String,
    },
    /// Multipart without a boundary parameter; the body is dropped.
    MissingBoundary,
    /// A quoted boundary with no closing quote; the body is used as-is.
    Malformed,
}

/// Classify a `CONTENT_TYPE` value.
#[must_use]
pub fn parse_content_type(value: Option<&str>) -> ContentType {
    let Some(value) = value.filter(|v| v.contains("multipart/form-data")) else {
        return ContentType::Plain;
    };

    let Some(param) = value
        .find("boundary")
        .and_then(|at| value[at..].find('=').map(|eq| &value[at + eq + 1..]))
    else {
        return ContentType::MissingBoundary;
    };

    let boundary = if let Some(quoted) = param.strip_prefix('"') {
        match quoted.split_once('"') {
            Some((boundary, _)) => boundary,
            None => return ContentType::Malformed,
        }
    } else {
        param.split([',', ';']).next().unwrap_or_default()
    };

    ContentType::Multipart {
        delimiter: format!("--{boundary}"),
    }
}

/// Split `content` on `delimiter` into named parts.
///
/// Parts without a `name` are skipped. A part's body ends at the CRLF that
/// precedes the next delimiter; a delimiter followed by `--` closes the body.
#[must_use]
pub fn split_parts<'a>(content: &'a [u8], delimiter: &str) -> Vec<Part<'a>> {
    let delimiter = delimiter.as_bytes();
    let mut parts = Vec::new();
    let Some(mut cursor) = find(content, delimiter, 0) else {
        warn!("multipart body has no delimiter");
        return parts;
    };

    loop {
        cursor += delimiter.len();
        if content[cursor..].starts_with(b"--") {
            break;
        }

        let Some(line_end) = find(content, b"\r\n", cursor) else {
            break;
        };
        let mut line_start = line_end + 2;

        let mut name = None;
        let mut filename = None;
        let mut content_type = None;
        while let Some(end) = find(content, b"\r\n", line_start) {
            let line = String::from_utf8_lossy(&content[line_start..end]);
            line_start = end + 2;
            if line.is_empty() {
                break;
            }
            let Some((header, value)) = line.split_once(':') else {
                continue;
            };
            if header.trim().eq_ignore_ascii_case("content-disposition") {
                (name, filename) = parse_disposition(value);
            } else if header.trim().eq_ignore_ascii_case("content-type") {
                content_type = Some(value.trim().to_owned());
            }
        }

        let next = find(content, delimiter, line_start);
        let body_end = match next {
            Some(at) if content[..at].ends_with(b"\r\n") && at - 2 >= line_start => at - 2,
            Some(at) => at,
            None => content.len(),
        };
        let body = &content[line_start.min(body_end)..body_end];

        match name {
            Some(name) => {
                debug!(name, filename = ?filename, len = body.len(), "multipart part");
                parts.push(Part {
                    name,
                    filename,
                    content_type,
                    body,
                });
            }
            None => warn!("multipart part without a name skipped"),
        }

        match next {
            Some(at) => cursor = at,
            None => break,
        }
    }

    parts
}

/// Read `name` and `filename` from a `Content-Disposition` value such as
/// `form-data; name="file"; filename="backup.cfg"`.
fn parse_disposition(value: &str) -> (Option<String>, Option<String>) {
    let mut name = None;
    let mut filename = None;
    let Some((_, params)) = value.split_once("form-data") else {
        return (name, filename);
    };

    for param in params.split(';') {
        let Some((key, raw)) = param.split_once('=') else {
            continue;
        };
        let raw = raw.trim();
        let unquoted = raw
            .strip_prefix('"')
            .map_or(raw, |inner| inner.split('"').next().unwrap_or_default());
        match key.trim() {
            "name" => name = Some(unquoted.to_owned()),
            "filename" => filename = Some(unquoted.to_owned()),
            _ => {}
        }
    }

    (name, filename)
}

fn find(haystack: &[u8], needle: &[u8], from: usize) -> Option<usize> {
    if from > haystack.len() || needle.is_empty() {
        return None;
    }
    haystack[from..]
        .windows(needle.len())
        .position(|window| window == needle)
        .map(|at| at + from)
}
