use std::{fs, thread::sleep, time::Duration};

use serial_test::serial;
use tempfile::tempdir;

#[test]
#[serial]
fn writes_log_file_and_ignores_reinit() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("log.txt");
    let other = dir.path().join("other.txt");

    socratic_lens::logging::init(true, Some(path.clone()));
    socratic_lens::logging::init(false, Some(other.clone()));
    tracing::info!("overlay ready");

    sleep(Duration::from_millis(100));

    assert!(path.exists(), "log file was not created");
    let contents = fs::read_to_string(path).unwrap();
    assert!(contents.contains("overlay ready"));
    assert!(!other.exists(), "a later init must not install a new writer");
}
