//! Unit tests for header and body buffering.

use cgi_shim::output::{BufferSink, ResponseBuffer};

#[test]
fn headers_are_crlf_terminated_in_order() {
    let mut buffer = ResponseBuffer::default();
    buffer.header("X-One: 1");
    buffer.header("X-Two: 2");
    assert_eq!(buffer.headers().as_str(), "X-One: 1\r\nX-Two: 2\r\n");
    assert!(!buffer.headers().content_type_set());
}

#[test]
fn location_discards_prior_headers() {
    let mut buffer = ResponseBuffer::default();
    buffer.header("X-One: 1");
    buffer.header("Set-Cookie: a=b");
    buffer.header("Location: /next");
    assert_eq!(
        buffer.headers().as_str(),
        "HTTP/1.0 302 Ok\r\nStatus: 302 Moved\r\nLocation: /next\r\n"
    );
}

#[test]
fn location_match_is_case_insensitive() {
    let mut buffer = ResponseBuffer::default();
    buffer.header("X-One: 1");
    buffer.header("LOCATION: /up");
    assert_eq!(
        buffer.headers().lines().collect::<Vec<_>>(),
        ["HTTP/1.0 302 Ok", "Status: 302 Moved", "LOCATION: /up"]
    );
}

#[test]
fn headers_after_redirect_are_appended() {
    let mut buffer = ResponseBuffer::default();
    buffer.header("Location: /next");
    buffer.header("X-After: 1");
    assert_eq!(buffer.headers().lines().count(), 4);
}

#[test]
fn content_type_marks_set() {
    let mut buffer = ResponseBuffer::default();
    buffer.header("content-type: text/plain");
    assert!(buffer.headers().content_type_set());
    assert_eq!(buffer.headers().as_str(), "content-type: text/plain\r\n");
}

#[test]
fn json_content_type_gets_forced_html_line_first() {
    let mut buffer = ResponseBuffer::default();
    buffer.header("Content-Type: application/json");
    assert_eq!(
        buffer.headers().as_str(),
        "Content-Type: text/html\r\nContent-Type: application/json\r\n"
    );
    assert!(buffer.headers().content_type_set());
}

#[test]
fn finish_without_content_type_prepends_default() {
    let mut buffer = ResponseBuffer::default();
    buffer.header("X-One: 1");
    buffer.echo(Some("hello"));
    let sink = BufferSink::new();
    buffer.finish(&mut sink.clone()).expect("finish");
    assert_eq!(
        sink.written(),
        "Content-type: text/html\r\nX-One: 1\r\n\r\nhello"
    );
    assert_eq!(sink.writes(), 1);
}

#[test]
fn finish_with_content_type_omits_default() {
    let mut buffer = ResponseBuffer::default();
    buffer.header("Content-Type: text/plain");
    buffer.echo(Some("x"));
    assert_eq!(buffer.render(), "Content-Type: text/plain\r\n\r\nx");
}

#[test]
fn default_content_type_is_configurable() {
    let buffer = ResponseBuffer::new("text/plain");
    assert_eq!(buffer.render(), "Content-type: text/plain\r\n\r\n");
}

#[test]
fn echo_accumulates_in_call_order() {
    let mut buffer = ResponseBuffer::default();
    buffer.echo(Some("a"));
    buffer.echo::<str>(None);
    buffer.echo(Some(&1.5));
    buffer.echo(Some("z"));
    assert_eq!(buffer.body().as_str(), "a1.5z");
}
