//! Unit tests for `$_SERVER` access.

use cgi_shim::env::{MapEnv, ProcessEnv, ServerVars};
use serial_test::serial;

#[test]
fn absent_variable_is_none() {
    let server = ServerVars::new(MapEnv::new().with("REQUEST_METHOD", "GET"));
    assert_eq!(server.get("REQUEST_METHOD").as_deref(), Some("GET"));
    assert_eq!(server.get("HTTPS"), None);
    assert!(!server.contains("HTTPS"));
}

#[test]
fn empty_variable_is_present() {
    let server: ServerVars = ServerVars::new([("HTTPS", "")].into_iter().collect::<MapEnv>());
    assert!(server.contains("HTTPS"));
    assert_eq!(server.get("HTTPS").as_deref(), Some(""));
}

#[test]
#[serial]
fn process_env_is_read_on_every_access() {
    let server = ServerVars::new(ProcessEnv);
    std::env::remove_var("CGI_SHIM_TEST_VAR");
    assert_eq!(server.get("CGI_SHIM_TEST_VAR"), None);

    std::env::set_var("CGI_SHIM_TEST_VAR", "one");
    assert_eq!(server.get("CGI_SHIM_TEST_VAR").as_deref(), Some("one"));

    std::env::set_var("CGI_SHIM_TEST_VAR", "two");
    assert_eq!(server.get("CGI_SHIM_TEST_VAR").as_deref(), Some("two"));

    std::env::remove_var("CGI_SHIM_TEST_VAR");
}
