//! Unit tests for the file-backed session store.

use std::fs;

use cgi_shim::session::file_store::{SESSION_ID_LEN, SESSION_ID_PREFIX};
use cgi_shim::session::{FileSessionStore, SessionData, SessionStore};
use serde_json::json;

const VALID_ID: &str = "jst_sessABCDEFGHIJKLMNOPQRSTUVWXYZ012345";

fn store_with_cookie(dir: &tempfile::TempDir, cookie: &str) -> FileSessionStore {
    FileSessionStore::new(dir.path(), "DUKSID", Some(cookie.to_owned()))
}

#[test]
fn fixture_id_has_the_session_id_shape() {
    assert_eq!(VALID_ID.len(), SESSION_ID_LEN);
    assert!(VALID_ID.starts_with(SESSION_ID_PREFIX));
}

#[test]
fn start_resumes_existing_session_file() {
    let dir = tempfile::tempdir().expect("tempdir");
    fs::write(dir.path().join(VALID_ID), "user|s|ada;").expect("seed");

    let mut store = store_with_cookie(&dir, &format!("DUKSID={VALID_ID}"));
    assert!(store.start().expect("start"));
    assert_eq!(store.id().as_deref(), Some(VALID_ID));
    assert!(store.status());
    assert_eq!(store.data().expect("data")["user"], json!("ada"));
}

#[test]
fn start_refuses_missing_file() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut store = store_with_cookie(&dir, &format!("DUKSID={VALID_ID}"));
    assert!(!store.start().expect("start"));
    assert_eq!(store.id(), None);
}

#[test]
fn start_without_cookie_header() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut store = FileSessionStore::new(dir.path(), "DUKSID", None);
    assert!(!store.start().expect("start"));
    assert!(!store.status());
}

#[test]
fn short_or_invalid_cookies_are_rejected() {
    let dir = tempfile::tempdir().expect("tempdir");
    let traversal = "jst_s../ABCDEFGHIJKLMNOPQRSTUVWXYZ012345";
    fs::write(dir.path().join("jst_sessshort"), "").expect("seed");

    for cookie in [
        "DUKSID=jst_sessshort".to_owned(),
        format!("DUKSID={}", VALID_ID.replace('Z', "-")),
        format!("DUKSID={traversal}"),
        format!("OTHER={VALID_ID}"),
    ] {
        let mut store = store_with_cookie(&dir, &cookie);
        assert!(!store.start().expect("start"), "cookie {cookie:?} accepted");
    }
}

#[test]
fn last_cookie_occurrence_wins_and_extra_chars_are_cut() {
    let dir = tempfile::tempdir().expect("tempdir");
    fs::write(dir.path().join(VALID_ID), "").expect("seed");

    let cookie = format!("DUKSID=jst_sessstale; theme=dark; DUKSID={VALID_ID}trailing; lang=en");
    let mut store = store_with_cookie(&dir, &cookie);
    assert!(store.start().expect("start"));
    assert_eq!(store.id().as_deref(), Some(VALID_ID));
}

#[test]
fn created_session_round_trips_through_its_file() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut store = FileSessionStore::new(dir.path(), "DUKSID", None);
    assert!(store.create().expect("create"));
    let id = store.id().expect("id");
    assert!(id.starts_with(SESSION_ID_PREFIX));

    let mut data = SessionData::new();
    data.insert("name".into(), json!("ada"));
    data.insert("visits".into(), json!(3));
    data.insert("admin".into(), json!(false));
    store.set_data(&data).expect("set_data");

    let raw = fs::read_to_string(store.session_path(&id)).expect("file");
    assert_eq!(raw, "admin|b|0;name|s|ada;visits|n|3.000000000000;");
    assert_eq!(store.data().expect("data"), data);
}

#[test]
fn fractional_numbers_come_back_truncated() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut store = FileSessionStore::new(dir.path(), "DUKSID", None);
    store.create().expect("create");

    let mut data = SessionData::new();
    data.insert("ratio".into(), json!(2.75));
    store.set_data(&data).expect("set_data");
    assert_eq!(store.data().expect("data")["ratio"], json!(2));
}

#[test]
fn invalid_file_loads_as_empty() {
    let dir = tempfile::tempdir().expect("tempdir");
    fs::write(dir.path().join(VALID_ID), "garbage without records").expect("seed");

    let mut store = store_with_cookie(&dir, &format!("DUKSID={VALID_ID}"));
    assert!(store.start().expect("start"));
    assert!(store.data().expect("data").is_empty());
}

#[test]
fn data_requires_a_session() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut store = FileSessionStore::new(dir.path(), "DUKSID", None);
    assert!(store.data().is_err());
    assert!(store.set_data(&SessionData::new()).is_err());
}

#[test]
fn destroy_removes_file() {
    let dir = tempfile::tempdir().expect("tempdir");
    fs::write(dir.path().join(VALID_ID), "a|s|b;").expect("seed");

    let mut store = store_with_cookie(&dir, &format!("DUKSID={VALID_ID}"));
    store.start().expect("start");
    assert!(store.destroy().expect("destroy"));
    assert!(!dir.path().join(VALID_ID).exists());
    assert!(!store.status());
    assert!(!store.destroy().expect("second destroy"));
}

#[test]
fn second_start_refreshes_held_session() {
    let dir = tempfile::tempdir().expect("tempdir");
    fs::write(dir.path().join(VALID_ID), "").expect("seed");

    let mut store = store_with_cookie(&dir, &format!("DUKSID={VALID_ID}"));
    assert!(store.start().expect("start"));
    assert!(store.start().expect("refresh"));
}

#[test]
fn multibyte_character_inside_prefix_is_rejected() {
    let dir = tempfile::tempdir().expect("tempdir");
    let cookie = format!("DUKSID=jst_se€{}", "a".repeat(40));
    let mut store = store_with_cookie(&dir, &cookie);
    assert!(!store.start().expect("start"));
    assert_eq!(store.id(), None);
}

#[test]
fn set_data_replaces_file_without_leftovers() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut store = FileSessionStore::new(dir.path(), "DUKSID", None);
    store.create().expect("create");
    let id = store.id().expect("id");

    let mut data = SessionData::new();
    data.insert("step".into(), json!("one"));
    store.set_data(&data).expect("first write");
    data.insert("step".into(), json!("two"));
    store.set_data(&data).expect("second write");

    let entries: Vec<_> = fs::read_dir(dir.path())
        .expect("read_dir")
        .map(|entry| entry.expect("entry").file_name())
        .collect();
    assert_eq!(entries, [std::ffi::OsString::from(&id)]);
    assert_eq!(
        fs::read_to_string(store.session_path(&id)).expect("file"),
        "step|s|two;"
    );
}

#[test]
fn set_data_into_missing_directory_fails() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut store = FileSessionStore::new(dir.path().join("gone"), "DUKSID", None);
    store.create().expect("create");
    assert!(store.set_data(&SessionData::new()).is_err());
}
