use super::common::*;

use crate::workflows::onboarding::uploads::{DiskUploadStore, UploadError};

#[test]
fn storing_same_name_twice_keeps_latest_content() {
    let root = tempfile::tempdir().expect("uploads tempdir");
    let store = DiskUploadStore::new(root.path());

    let first = store
        .store(EMAIL, &upload("resume", "cv.pdf", b"first draft"))
        .expect("first write");
    let stored = store
        .store(EMAIL, &upload("resume", "cv.pdf", b"final"))
        .expect("second write");

    assert!(first.created);
    assert!(!stored.created);
    assert_eq!(stored.relative_path, format!("{EMAIL}/cv.pdf"));
    assert_eq!(store.read(&stored).expect("read back"), b"final".to_vec());
}

#[test]
fn first_dynamic_upload_lands_in_shared_directory() {
    let root = tempfile::tempdir().expect("uploads tempdir");
    let store = DiskUploadStore::new(root.path());

    let stored = store
        .store(EMAIL, &upload("dynamicField1", "mtech.pdf", b"mtech"))
        .expect("write");

    assert_eq!(stored.relative_path, "postgraduation/mtech.pdf");
    assert!(root.path().join("postgraduation").join("mtech.pdf").is_file());
}

#[test]
fn client_path_segments_are_stripped() {
    let root = tempfile::tempdir().expect("uploads tempdir");
    let store = DiskUploadStore::new(root.path());

    let stored = store
        .store(EMAIL, &upload("aadharcard", "../../escape.pdf", b"id"))
        .expect("write");

    assert_eq!(stored.relative_path, format!("{EMAIL}/escape.pdf"));
    assert!(!root.path().parent().expect("tempdir parent").join("escape.pdf").exists());
}

#[test]
fn remove_tolerates_missing_files() {
    let root = tempfile::tempdir().expect("uploads tempdir");
    let store = DiskUploadStore::new(root.path());
    let stored = store
        .store(EMAIL, &upload("resume", "cv.pdf", b"cv"))
        .expect("write");

    store.remove(&stored).expect("first remove");
    store.remove(&stored).expect("second remove is a no-op");
    assert!(matches!(store.read(&stored), Err(UploadError::Io { .. })));
}

#[test]
fn unusable_email_is_rejected_before_writing() {
    let root = tempfile::tempdir().expect("uploads tempdir");
    let store = DiskUploadStore::new(root.path());

    let err = store
        .store("../outside@example.com", &upload("resume", "cv.pdf", b"cv"))
        .expect_err("email rejected");

    assert!(err.is_client_error());
    assert!(std::fs::read_dir(root.path()).expect("root readable").next().is_none());
}
