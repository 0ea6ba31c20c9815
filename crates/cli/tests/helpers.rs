use std::fs;

use libsym::{log_level, sha256_file};
use tempfile::tempdir;

#[test]
fn sha256_file_hashes_contents() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("blob.bin");
    fs::write(&path, b"abc").expect("write blob");
    assert_eq!(
        sha256_file(&path).expect("hash"),
        "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
    );
}

#[test]
fn sha256_file_reports_missing_files() {
    let dir = tempdir().expect("tempdir");
    let err = sha256_file(&dir.path().join("missing.bin")).unwrap_err();
    assert!(err.to_string().contains("Failed to open binary for hashing"));
}

#[test]
fn verbose_raises_log_level() {
    assert_eq!(log_level(true), log::LevelFilter::Debug);
    assert_eq!(log_level(false), log::LevelFilter::Warn);
}
