use serde_json::json;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

/// Creates a unique temporary directory holding a `session.json` for the given
/// user and token, the way the surrounding app leaves it after sign-in.
///
/// Keep the returned `TempDir` in scope for as long as you need the file.
pub fn setup_session_file(user_id: &str, token: &str) -> (TempDir, PathBuf) {
    let tmp = TempDir::new().expect("failed to create tempdir");
    let path = tmp.path().join("session.json");
    let body = json!({
        "user": {
            "userId": user_id,
            "firstName": "Test",
            "lastName": "Staff",
            "role": "staff"
        },
        "token": token
    });
    fs::write(&path, body.to_string()).expect("failed to write session file");
    (tmp, path)
}
