use std::fs;
use tempfile::TempDir;
use walkdir::WalkDir;

const FIXTURE: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/testdata/site");

/// Copies the fixture project into a fresh temporary directory so tests can
/// modify it.
pub fn project() -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    for entry in WalkDir::new(FIXTURE) {
        let entry = entry.unwrap();
        let target = dir.path().join(entry.path().strip_prefix(FIXTURE).unwrap());
        if entry.file_type().is_dir() {
            fs::create_dir_all(&target).unwrap();
        } else {
            fs::copy(entry.path(), &target).unwrap();
        }
    }
    dir
}
