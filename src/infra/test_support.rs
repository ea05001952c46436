use std::os::unix::fs::PermissionsExt;
use std::path::PathBuf;

// Also compiled into the integration tests through tests/common.rs.

/// The script lives as long as the returned directory.
pub fn fake_executable(name: &str, script: &str) -> (tempfile::TempDir, PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join(name);

    std::fs::write(&path, format!("#!/bin/sh\n{script}\n")).unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();

    (dir, path)
}
