use crate::error::ContextError;
use crate::traits::context::SessionContextProvider;
use crate::types::{SessionContext, UserRecord};
use serde::Deserialize;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Session persisted by the surrounding app as `{"user": {...}, "token": "..."}`.
///
/// The file is re-read on every call, so signing in again between attempts
/// takes effect without restarting the station.
#[derive(Debug, Clone)]
pub struct FileSessionStore {
    path: PathBuf,
}

#[derive(Deserialize)]
struct Stored {
    user: Option<UserRecord>,
    token: Option<String>,
}

impl FileSessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store at `SESSION_STORE_PATH`.
    pub fn from_config() -> Self {
        Self::new(util::config::session_store_path())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SessionContextProvider for FileSessionStore {
    fn current(&self) -> Result<SessionContext, ContextError> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return Err(ContextError::NotSignedIn),
            Err(e) => {
                return Err(ContextError::Unreadable(format!(
                    "{}: {e}",
                    self.path.display()
                )));
            }
        };

        let stored: Stored = serde_json::from_str(&raw)
            .map_err(|e| ContextError::Unreadable(format!("{}: {e}", self.path.display())))?;

        match (stored.user, stored.token) {
            (Some(user), Some(token))
                if !user.user_id.trim().is_empty() && !token.trim().is_empty() =>
            {
                Ok(SessionContext { user, token })
            }
            _ => Err(ContextError::NotSignedIn),
        }
    }
}
