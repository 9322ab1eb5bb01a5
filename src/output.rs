//! Response buffering.
//!
//! Scripts never write to stdout themselves. `header()` and `echo()` fill a
//! [`ResponseBuffer`], and [`ResponseBuffer::finish`] writes the whole
//! response to an [`OutputSink`] in one call once the script is done.

use std::cell::RefCell;
use std::io::Write;
use std::rc::Rc;

use tracing::debug;

use crate::Result;

const CRLF: &str = "\r\n";

/// Destination of the rendered response.
pub trait OutputSink {
    /// Write `text` as-is.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Io` if the underlying stream rejects the write.
    fn write(&mut self, text: &str) -> Result<()>;
}

/// Writes to the process's standard output and flushes after each call.
#[derive(Debug, Default)]
pub struct StdoutSink;

impl OutputSink for StdoutSink {
    fn write(&mut self, text: &str) -> Result<()> {
        let mut out = std::io::stdout().lock();
        out.write_all(text.as_bytes())?;
        out.flush()?;
        Ok(())
    }
}

/// Collects everything written, for embedding and tests.
///
/// Clones share one buffer, so a handle kept by the caller sees what was
/// written through a clone moved into a [`crate::request::RequestContext`].
#[derive(Debug, Default, Clone)]
pub struct BufferSink {
    captured: Rc<RefCell<Vec<String>>>,
}

impl BufferSink {
    /// Empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Concatenation of every write so far.
    #[must_use]
    pub fn written(&self) -> String {
        self.captured.borrow().concat()
    }

    /// Number of write calls so far.
    #[must_use]
    pub fn writes(&self) -> usize {
        self.captured.borrow().len()
    }
}

impl OutputSink for BufferSink {
    fn write(&mut self, text: &str) -> Result<()> {
        self.captured.borrow_mut().push(text.to_owned());
        Ok(())
    }
}

/// Accumulated response header lines.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct HeaderBuffer {
    raw: String,
    content_type_set: bool,
}

impl HeaderBuffer {
    /// Add one header line.
    ///
    /// A `Location:` header throws away everything buffered so far and
    /// replaces it with a `302` status prologue followed by the line itself.
    /// A `Content-Type:` header marks the content type as set; a JSON content
    /// type is additionally preceded by a forced `Content-Type: text/html`
    /// line and both lines are kept.
    pub fn push(&mut self, line: &str) {
        let lower = line.to_ascii_lowercase();

        if lower.starts_with("location:") {
            debug!(line, "redirect header replaces buffered headers");
            self.raw.clear();
            self.raw.push_str("HTTP/1.0 302 Ok\r\n");
            self.raw.push_str("Status: 302 Moved\r\n");
        } else if lower.starts_with("content-type:") {
            self.content_type_set = true;
            if lower.contains("application/json") {
                self.raw.push_str("Content-Type: text/html\r\n");
            }
        }

        self.raw.push_str(line);
        self.raw.push_str(CRLF);
    }

    /// Whether a script supplied its own `Content-Type` header.
    #[must_use]
    pub fn content_type_set(&self) -> bool {
        self.content_type_set
    }

    /// Buffered header block, each line CRLF-terminated.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Buffered header lines without their terminators.
    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.raw.split_terminator(CRLF)
    }
}

/// Append-only response body.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct OutputBody {
    raw: String,
}

impl OutputBody {
    /// Append one fragment.
    pub fn push(&mut self, fragment: &str) {
        self.raw.push_str(fragment);
    }

    /// Body text so far.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

/// Headers and body of the response being built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseBuffer {
    headers: HeaderBuffer,
    body: OutputBody,
    default_content_type: String,
}

impl Default for ResponseBuffer {
    fn default() -> Self {
        Self::new("text/html")
    }
}

impl ResponseBuffer {
    /// Empty buffer that falls back to `default_content_type`.
    #[must_use]
    pub fn new(default_content_type: impl Into<String>) -> Self {
        Self {
            headers: HeaderBuffer::default(),
            body: OutputBody::default(),
            default_content_type: default_content_type.into(),
        }
    }

    /// The `header()` script builtin.
    pub fn header(&mut self, line: &str) {
        self.headers.push(line);
    }

    /// The `echo()` script builtin. `None` appends nothing.
    pub fn echo<T: std::fmt::Display + ?Sized>(&mut self, value: Option<&T>) {
        if let Some(value) = value {
            self.body.push(&value.to_string());
        }
    }

    /// Buffered headers.
    #[must_use]
    pub fn headers(&self) -> &HeaderBuffer {
        &self.headers
    }

    /// Buffered body.
    #[must_use]
    pub fn body(&self) -> &OutputBody {
        &self.body
    }

    /// Render the complete response.
    ///
    /// Layout: the default `Content-type` line when no content type was set,
    /// then the header block, a blank CRLF line and the body.
    #[must_use]
    pub fn render(&self) -> String {
        let mut out = String::with_capacity(
            self.headers.as_str().len() + self.body.as_str().len() + 32,
        );
        if !self.headers.content_type_set() {
            out.push_str("Content-type: ");
            out.push_str(&self.default_content_type);
            out.push_str("\r\n");
        }
        out.push_str(self.headers.as_str());
        out.push_str(CRLF);
        out.push_str(self.body.as_str());
        out
    }

    /// Write the rendered response to `sink` in a single call.
    ///
    /// Consumes the buffer so a response can only be finished once.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Io` if the sink rejects the write.
    pub fn finish(self, sink: &mut dyn OutputSink) -> Result<()> {
        let rendered = self.render();
        debug!(
            bytes = rendered.len(),
            content_type_set = self.headers.content_type_set(),
            "flushing response"
        );
        sink.write(&rendered)
    }
}
