//! Unit tests for `$_GET` decoding.

use cgi_shim::decode::query::decode_query;
use cgi_shim::AppError;

#[test]
fn absent_query_is_empty() {
    assert!(decode_query(None).expect("absent decodes").is_empty());
    assert!(decode_query(Some("")).expect("empty decodes").is_empty());
}

#[test]
fn pairs_are_stored_raw() {
    let params = decode_query(Some("name=Ada%20L&tag=a+b&empty=")).expect("decodes");
    assert_eq!(params.len(), 3);
    assert_eq!(params["name"], "Ada%20L");
    assert_eq!(params["tag"], "a+b");
    assert_eq!(params["empty"], "");
}

#[test]
fn duplicate_keys_keep_last_value() {
    let params = decode_query(Some("a=1&a=2")).expect("decodes");
    assert_eq!(params["a"], "2");
}

#[test]
fn segment_without_separator_is_fatal() {
    let result = decode_query(Some("a=1&flag"));
    assert!(matches!(result, Err(AppError::MalformedQueryString(_))));
}

#[test]
fn segment_with_two_separators_is_fatal() {
    let result = decode_query(Some("a=1=2"));
    assert!(matches!(result, Err(AppError::MalformedQueryString(_))));
}

#[test]
fn trailing_ampersand_is_fatal() {
    assert!(decode_query(Some("a=1&")).is_err());
}
