//! Unit tests for `$_FILES` descriptor decoding.

use cgi_shim::decode::files::decode_files;
use cgi_shim::AppError;

#[test]
fn absent_descriptor_is_empty() {
    assert!(decode_files(None).value.is_empty());
    assert!(decode_files(Some("")).value.is_empty());
}

#[test]
fn first_pair_value_becomes_file_id() {
    let decoded = decode_files(Some("a=f1&b=x;a=f2&c=y"));
    assert!(!decoded.has_errors());
    assert_eq!(decoded.value.len(), 2);
    assert_eq!(decoded.value["f1"].len(), 1);
    assert_eq!(decoded.value["f1"]["b"], "x");
    assert_eq!(decoded.value["f2"].len(), 1);
    assert_eq!(decoded.value["f2"]["c"], "y");
}

#[test]
fn full_upload_descriptor() {
    let decoded = decode_files(Some(
        "id=cfg&name=backup%20one.cfg&type=application%2Foctet-stream&size=231424&tmp_name=%2Ftmp%2Fjst_post_ab12&error=0",
    ));
    let cfg = &decoded.value["cfg"];
    assert_eq!(cfg["name"], "backup one.cfg");
    assert_eq!(cfg["type"], "application/octet-stream");
    assert_eq!(cfg["size"], "231424");
    assert_eq!(cfg["tmp_name"], "/tmp/jst_post_ab12");
    assert_eq!(cfg["error"], "0");
}

#[test]
fn malformed_pair_is_skipped() {
    let decoded = decode_files(Some("id=f1&broken&size=3"));
    assert_eq!(decoded.errors.len(), 1);
    assert!(matches!(decoded.errors[0], AppError::MalformedFileAttribute(_)));
    assert_eq!(decoded.value["f1"]["size"], "3");
}

#[test]
fn malformed_first_pair_defers_the_id() {
    let decoded = decode_files(Some("broken&id=f1&size=3"));
    assert_eq!(decoded.errors.len(), 1);
    assert_eq!(decoded.value["f1"]["size"], "3");
}

#[test]
fn repeated_file_id_restarts_attributes() {
    let decoded = decode_files(Some("id=f&a=1;id=f&b=2"));
    assert_eq!(decoded.value.len(), 1);
    assert!(!decoded.value["f"].contains_key("a"));
    assert_eq!(decoded.value["f"]["b"], "2");
}
